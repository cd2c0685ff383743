//! The [`Composer`] (§4.F): static, pre-run validation over a shard
//! sequence — type inference, the Set/Ref/Update/Push exclusion table, and
//! required/exposed variable resolution.

use crate::error::ComposeError;
use crate::shard::{InstanceData, MutationKind, RequiredVariables, Shard};
use indexmap::IndexMap;
use loom_core::{match_types, type_to_son, ExposedTypes, Type};

/// The accumulated outcome of composing one wire's shard sequence.
pub struct ComposeResult {
    pub output_type: Type,
    pub exposed: IndexMap<String, Type>,
    pub required: Vec<(String, Type)>,
    pub diagnostics: Vec<ComposeError>,
    pub failed: bool,
    pub flow_stopping: bool,
    pub wire_input_type: Type,
    pub ignore_input_type_check: bool,
}

const FLOW_STOPPERS: &[&str] = &["Stop", "Restart", "Return", "Fail"];

/// `composeWire` (§4.F): threads `previousOutputType` through the shard
/// sequence, starting from `declared_input_type` (the wire's nominal input,
/// before the §4.F "wire input typing" adjustment below is applied).
pub fn compose_wire(shards: &mut [Box<dyn Shard>], declared_input_type: Type, inherited: &dyn ExposedTypes) -> ComposeResult {
    let wire_input_type = infer_wire_input_type(shards, &declared_input_type);
    let ignore_input_type_check = shards.first().map(|s| s.name().starts_with("Expect")).unwrap_or(false);

    let mut exposed: IndexMap<String, Type> = IndexMap::new();
    let mut mutation_history: IndexMap<String, MutationKind> = IndexMap::new();
    let mut required: Vec<(String, Type)> = Vec::new();
    let mut diagnostics: Vec<ComposeError> = Vec::new();
    let mut failed = false;

    let all_input_types: Vec<Vec<Type>> = shards.iter().map(|s| s.input_types()).collect();
    let mut previous_output = wire_input_type.clone();

    for (i, shard) in shards.iter_mut().enumerate() {
        let effective_input = match shard.name() {
            "Input" | "And" | "Or" => wire_input_type.clone(),
            _ => previous_output.clone(),
        };

        let accepted = &all_input_types[i];
        let accepts_anything = accepted.is_empty() || (accepted.len() == 1 && accepted[0].kind == loom_core::Kind::None);
        if !accepts_anything && !accepted.iter().any(|t| match_types(&effective_input, t, false, true)) {
            let accepted_list: Vec<String> = accepted.iter().map(type_to_son).collect();
            diagnostics.push(ComposeError::fatal(
                shard.name().to_string(),
                shard.line(),
                shard.column(),
                format!("input type mismatch: {} does not accept this input; expected one of [{}]", shard.name(), accepted_list.join(", ")),
            ));
            failed = true;
        }

        let next_input_types: &[Type] = all_input_types.get(i + 1).map(Vec::as_slice).unwrap_or(&[]);
        let mut required_agg = RequiredVariables::default();
        let output = {
            let mut data = InstanceData {
                input_type: effective_input.clone(),
                shared: &exposed,
                next_input_types,
                wants_worker_thread: false,
                required: &mut required_agg,
            };
            match shard.compose(&mut data) {
                Some(Ok(ty)) => ty,
                Some(Err(e)) => {
                    diagnostics.push(e);
                    failed = true;
                    Type::any()
                }
                None => infer_output(shard.as_ref(), accepted, &previous_output),
            }
        };
        previous_output = output;

        for (name, ty, kind) in shard.exposed_variables() {
            if let Some(prior) = mutation_history.get(&name) {
                if mutation_conflict(kind, *prior) {
                    diagnostics.push(ComposeError::fatal(
                        shard.name().to_string(),
                        shard.line(),
                        shard.column(),
                        format!("variable `{name}` was previously {prior:?} and cannot now be {kind:?}"),
                    ));
                    failed = true;
                    continue;
                }
            }
            mutation_history.insert(name.clone(), kind);
            exposed.insert(name, ty);
        }

        let mut declared_required = shard.required_variables();
        declared_required.extend(required_agg.0);
        for (name, ty) in declared_required {
            let exposed_here = exposed.contains_key(&name);
            let found = exposed.get(&name).cloned().or_else(|| inherited.lookup(&name));
            match found {
                Some(found_ty) => {
                    if !match_types(&found_ty, &ty, false, true) && !match_types(&ty, &found_ty, false, true) {
                        diagnostics.push(ComposeError::fatal(
                            shard.name().to_string(),
                            shard.line(),
                            shard.column(),
                            format!("required variable `{name}` has an incompatible type"),
                        ));
                        failed = true;
                    } else if !exposed_here {
                        required.push((name, ty));
                    }
                }
                None => {
                    diagnostics.push(ComposeError::fatal(
                        shard.name().to_string(),
                        shard.line(),
                        shard.column(),
                        format!("required variable `{name}` is not exposed by any prior shard or inherited scope"),
                    ));
                    failed = true;
                }
            }
        }
    }

    let flow_stopping = shards.last().map(|s| FLOW_STOPPERS.contains(&s.name())).unwrap_or(false);

    ComposeResult {
        output_type: previous_output,
        exposed,
        required,
        diagnostics,
        failed,
        flow_stopping,
        wire_input_type,
        ignore_input_type_check,
    }
}

fn infer_wire_input_type(shards: &[Box<dyn Shard>], declared: &Type) -> Type {
    let Some(first) = shards.first() else {
        return declared.clone();
    };
    if first.name().starts_with("Expect") {
        return Type::any();
    }
    let first_inputs = first.input_types();
    let first_is_none_only = first_inputs.len() == 1 && first_inputs[0].kind == loom_core::Kind::None;
    let has_input_shard = shards.iter().any(|s| s.name() == "Input");
    if first_is_none_only && !has_input_shard {
        return Type::none();
    }
    declared.clone()
}

/// §4.C's inference rule, used when a shard does not implement `compose`.
fn infer_output(shard: &dyn Shard, accepted: &[Type], previous_output: &Type) -> Type {
    let outputs = shard.output_types();
    match outputs.as_slice() {
        [only] if !only.is_any() => only.clone(),
        [only] if only.is_any() => {
            let accepts_single_non_any = accepted.len() == 1 && !accepted[0].is_any();
            let accepts_single_any = accepted.len() == 1 && accepted[0].is_any();
            if accepts_single_non_any {
                Type::any()
            } else if accepts_single_any {
                previous_output.clone()
            } else {
                Type::any()
            }
        }
        _ => {
            let _ = shard;
            Type::any()
        }
    }
}

fn mutation_conflict(current: MutationKind, prior: MutationKind) -> bool {
    (current == MutationKind::Ref) != (prior == MutationKind::Ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::ActivationError;
    use loom_core::{Type, Value};
    use std::collections::HashMap;

    struct ConstShard(Type);
    impl Shard for ConstShard {
        fn name(&self) -> &str {
            "Const"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![Type::none()]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![self.0.clone()]
        }
        fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
            Ok(Value::None)
        }
    }

    struct MathAdd;
    impl Shard for MathAdd {
        fn name(&self) -> &str {
            "Math.Add"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![Type::int(), Type::float()]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![Type::any()]
        }
        fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
            Ok(input.clone())
        }
    }

    struct SetShard(&'static str, MutationKind);
    impl Shard for SetShard {
        fn name(&self) -> &str {
            "Set"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![Type::any()]
        }
        fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
            vec![(self.0.to_string(), Type::int(), self.1)]
        }
        fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
            Ok(input.clone())
        }
    }

    struct RefShard(&'static str);
    impl Shard for RefShard {
        fn name(&self) -> &str {
            "Ref"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![Type::any()]
        }
        fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
            vec![(self.0.to_string(), Type::int(), MutationKind::Ref)]
        }
        fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
            Ok(input.clone())
        }
    }

    #[test]
    fn s5_type_mismatch_fails_with_a_named_shard() {
        let mut shards: Vec<Box<dyn Shard>> = vec![Box::new(ConstShard(Type::string())), Box::new(MathAdd)];
        let inherited: HashMap<String, Type> = HashMap::new();
        let result = compose_wire(&mut shards, Type::none(), &inherited);
        assert!(result.failed);
        assert!(result.diagnostics.iter().any(|d| d.shard == "Math.Add"));
    }

    #[test]
    fn set_then_ref_on_same_name_fails() {
        let mut shards: Vec<Box<dyn Shard>> = vec![Box::new(SetShard("x", MutationKind::Set)), Box::new(RefShard("x"))];
        let inherited: HashMap<String, Type> = HashMap::new();
        let result = compose_wire(&mut shards, Type::none(), &inherited);
        assert!(result.failed);
    }

    #[test]
    fn set_then_update_on_same_name_succeeds() {
        let mut shards: Vec<Box<dyn Shard>> = vec![Box::new(SetShard("x", MutationKind::Set)), Box::new(SetShard("x", MutationKind::Update))];
        let inherited: HashMap<String, Type> = HashMap::new();
        let result = compose_wire(&mut shards, Type::none(), &inherited);
        assert!(!result.failed);
    }

    #[test]
    fn last_shard_stop_marks_flow_stopping() {
        struct Stop;
        impl Shard for Stop {
            fn name(&self) -> &str {
                "Stop"
            }
            fn input_types(&self) -> Vec<Type> {
                vec![]
            }
            fn output_types(&self) -> Vec<Type> {
                vec![Type::any()]
            }
            fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
                ctx.stop_flow(input.clone());
                Ok(input.clone())
            }
        }
        let mut shards: Vec<Box<dyn Shard>> = vec![Box::new(ConstShard(Type::int())), Box::new(Stop)];
        let inherited: HashMap<String, Type> = HashMap::new();
        let result = compose_wire(&mut shards, Type::none(), &inherited);
        assert!(result.flow_stopping);
    }
}
