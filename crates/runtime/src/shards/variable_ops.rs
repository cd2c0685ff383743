//! Variable operators (§4.C, §4.E, §4.F): shards that expose or require a
//! named cell in a wire's local scope, or — when their `Global` parameter is
//! set — the owning mesh's shared scope.
//!
//! Every shard here follows the same runtime shape: `warmup` resolves the
//! named cell once via `reference_named` and holds the resulting
//! [`VariableRef`] for the shard's lifetime; `activate` reads/writes through
//! that handle; `cleanup` releases it. This mirrors how `Wire::warmup`/
//! `Wire::cleanup` bracket a shard's own lifecycle (§4.G), rather than
//! resolving and releasing a handle on every activation, which would let the
//! refcount hit zero and destroy the value between iterations.

use crate::context::Context;
use crate::error::{ActivationError, InvalidParameterIndex, WarmupError};
use crate::mesh::Mesh;
use crate::shard::{MutationKind, ParamInfo, Shard};
use crate::wire::{reference_named, release_variable, VariableRef};
use loom_core::{Type, Value};
use std::sync::Arc;

fn mesh_of(ctx: &Context) -> Option<Arc<Mesh>> {
    ctx.current_wire().and_then(|w| w.mesh())
}

/// The `Name`/`Global` parameter pair shared by every shard in this module.
#[derive(Default, Clone)]
struct NameGlobal {
    name: String,
    global: bool,
}

impl NameGlobal {
    fn parameters() -> Vec<ParamInfo> {
        vec![
            ParamInfo { name: "Name", help: "variable name", accepted_types: vec![Type::string()], default: Value::String(String::new()) },
            ParamInfo {
                name: "Global",
                help: "bind to the mesh's shared scope instead of this wire's",
                accepted_types: vec![Type::bool_()],
                default: Value::Bool(false),
            },
        ]
    }

    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        match index {
            0 => {
                if let Value::String(s) = value {
                    self.name = s;
                }
                Ok(())
            }
            1 => {
                if let Value::Bool(b) = value {
                    self.global = b;
                }
                Ok(())
            }
            _ => Err(InvalidParameterIndex { index, len: 2 }),
        }
    }

    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        match index {
            0 => Ok(Value::String(self.name.clone())),
            1 => Ok(Value::Bool(self.global)),
            _ => Err(InvalidParameterIndex { index, len: 2 }),
        }
    }

    fn warmup(&self, ctx: &mut Context) -> VariableRef {
        let mesh = mesh_of(ctx);
        reference_named(ctx, mesh.as_ref(), &self.name, self.global)
    }
}

/// Declares and writes a named variable, passing `input` through unchanged.
#[derive(Default)]
pub struct Set {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Set {
    fn name(&self) -> &str {
        "Set"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
        vec![(self.ng.name.clone(), Type::any(), MutationKind::Set)]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if let Some(h) = &self.handle {
            h.set(input.clone());
            h.mark_exposed();
        }
        Ok(input.clone())
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Exposes a named variable without copying `input` into a fresh cell on
/// every activation — a simplified stand-in for true pointer aliasing, which
/// would need a second indirection layer this model does not have. In
/// practice it behaves like `Set` with a different mutation discipline, which
/// is enough to drive the Set/Ref exclusion table (§4.F).
#[derive(Default)]
pub struct Ref {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Ref {
    fn name(&self) -> &str {
        "Ref"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
        vec![(self.ng.name.clone(), Type::any(), MutationKind::Ref)]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if let Some(h) = &self.handle {
            h.set(input.clone());
        }
        Ok(input.clone())
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Writes a variable that was already exposed by a prior `Set`/`Ref`/`Update`
/// in the same scope; allowed to chain after either (§4.F conflict table).
#[derive(Default)]
pub struct Update {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Update {
    fn name(&self) -> &str {
        "Update"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
        vec![(self.ng.name.clone(), Type::any(), MutationKind::Update)]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if let Some(h) = &self.handle {
            h.set(input.clone());
            h.mark_exposed();
        }
        Ok(input.clone())
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Appends `input` to a `Sequence`-typed variable, creating it empty on first
/// use. Outputs the sequence after the append.
#[derive(Default)]
pub struct Push {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Push {
    fn name(&self) -> &str {
        "Push"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
        vec![(self.ng.name.clone(), Type::sequence_of(vec![Type::any()]), MutationKind::Push)]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        let h = self.handle.as_ref().expect("Push activated before warmup");
        let mut items = match h.get() {
            Value::Sequence(items) => items,
            Value::None => Vec::new(),
            _ => return Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Push target is not a Sequence".to_string() }),
        };
        items.push(input.clone());
        h.set(Value::Sequence(items.clone()));
        Ok(Value::Sequence(items))
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Removes and returns the last element of a `Sequence`-typed variable
/// exposed earlier in scope; `None` on an empty or uninitialised sequence.
#[derive(Default)]
pub struct Pop {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Pop {
    fn name(&self) -> &str {
        "Pop"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn required_variables(&self) -> Vec<(String, Type)> {
        vec![(self.ng.name.clone(), Type::any())]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        let h = self.handle.as_ref().expect("Pop activated before warmup");
        match h.get() {
            Value::Sequence(mut items) => {
                let popped = items.pop().unwrap_or(Value::None);
                h.set(Value::Sequence(items));
                Ok(popped)
            }
            Value::None => Ok(Value::None),
            _ => Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Pop target is not a Sequence".to_string() }),
        }
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Removes and returns the first element of a `Sequence`-typed variable
/// exposed earlier in scope — the FIFO counterpart to `Pop`'s LIFO.
#[derive(Default)]
pub struct Take {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Take {
    fn name(&self) -> &str {
        "Take"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn required_variables(&self) -> Vec<(String, Type)> {
        vec![(self.ng.name.clone(), Type::any())]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        let h = self.handle.as_ref().expect("Take activated before warmup");
        match h.get() {
            Value::Sequence(mut items) => {
                if items.is_empty() {
                    Ok(Value::None)
                } else {
                    let front = items.remove(0);
                    h.set(Value::Sequence(items));
                    Ok(front)
                }
            }
            Value::None => Ok(Value::None),
            _ => Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Take target is not a Sequence".to_string() }),
        }
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Reads a named variable exposed earlier in scope without consuming it.
#[derive(Default)]
pub struct Get {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Get {
    fn name(&self) -> &str {
        "Get"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn required_variables(&self) -> Vec<(String, Type)> {
        vec![(self.ng.name.clone(), Type::any())]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        Ok(self.handle.as_ref().expect("Get activated before warmup").get())
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Resets a named variable exposed earlier in scope back to `None`.
#[derive(Default)]
pub struct Clear {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Clear {
    fn name(&self) -> &str {
        "Clear"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn required_variables(&self) -> Vec<(String, Type)> {
        vec![(self.ng.name.clone(), Type::any())]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if let Some(h) = &self.handle {
            h.set(Value::None);
        }
        let _ = input;
        Ok(Value::None)
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Returns the element count of a `Sequence`, `Set`, or `Table` variable
/// exposed earlier in scope; `0` for `None`.
#[derive(Default)]
pub struct Count {
    ng: NameGlobal,
    handle: Option<VariableRef>,
}

impl Shard for Count {
    fn name(&self) -> &str {
        "Count"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::int()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        NameGlobal::parameters()
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        self.ng.set_param(index, value)
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        self.ng.get_param(index)
    }
    fn required_variables(&self) -> Vec<(String, Type)> {
        vec![(self.ng.name.clone(), Type::any())]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        self.handle = Some(self.ng.warmup(ctx));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        let h = self.handle.as_ref().expect("Count activated before warmup");
        let count = match h.get() {
            Value::Sequence(items) => items.len(),
            Value::Set(items) => items.len(),
            Value::Table(items) => items.len(),
            Value::None => 0,
            _ => return Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Count target has no length".to_string() }),
        };
        Ok(Value::Int(count as i64))
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle.take() {
            release_variable(h);
        }
    }
}

/// Exchanges the values held by two named variables exposed earlier in
/// scope, passing `input` through unchanged.
#[derive(Default)]
pub struct Swap {
    name_a: String,
    name_b: String,
    global: bool,
    handle_a: Option<VariableRef>,
    handle_b: Option<VariableRef>,
}

impl Shard for Swap {
    fn name(&self) -> &str {
        "Swap"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![
            ParamInfo { name: "Name", help: "first variable name", accepted_types: vec![Type::string()], default: Value::String(String::new()) },
            ParamInfo { name: "Other", help: "second variable name", accepted_types: vec![Type::string()], default: Value::String(String::new()) },
            ParamInfo { name: "Global", help: "bind both to the mesh's shared scope", accepted_types: vec![Type::bool_()], default: Value::Bool(false) },
        ]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        match index {
            0 => {
                if let Value::String(s) = value {
                    self.name_a = s;
                }
                Ok(())
            }
            1 => {
                if let Value::String(s) = value {
                    self.name_b = s;
                }
                Ok(())
            }
            2 => {
                if let Value::Bool(b) = value {
                    self.global = b;
                }
                Ok(())
            }
            _ => Err(InvalidParameterIndex { index, len: 3 }),
        }
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        match index {
            0 => Ok(Value::String(self.name_a.clone())),
            1 => Ok(Value::String(self.name_b.clone())),
            2 => Ok(Value::Bool(self.global)),
            _ => Err(InvalidParameterIndex { index, len: 3 }),
        }
    }
    fn required_variables(&self) -> Vec<(String, Type)> {
        vec![(self.name_a.clone(), Type::any()), (self.name_b.clone(), Type::any())]
    }
    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        let mesh = mesh_of(ctx);
        self.handle_a = Some(reference_named(ctx, mesh.as_ref(), &self.name_a, self.global));
        self.handle_b = Some(reference_named(ctx, mesh.as_ref(), &self.name_b, self.global));
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if let (Some(a), Some(b)) = (&self.handle_a, &self.handle_b) {
            let va = a.get();
            let vb = b.get();
            a.set(vb);
            b.set(va);
        }
        Ok(input.clone())
    }
    fn cleanup(&mut self) {
        if let Some(h) = self.handle_a.take() {
            release_variable(h);
        }
        if let Some(h) = self.handle_b.take() {
            release_variable(h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::wire::Wire;
    use std::sync::Arc;

    fn ctx_with_wire() -> (Context, Arc<Wire>) {
        let wire = Arc::new(Wire::new("w"));
        let mut ctx = Context::new();
        ctx.push_wire(Arc::clone(&wire));
        (ctx, wire)
    }

    #[test]
    fn set_then_get_round_trips_through_local_scope() {
        let (mut ctx, _wire) = ctx_with_wire();
        let mut set = Set::default();
        set.set_param(0, Value::String("x".into())).unwrap();
        set.warmup(&mut ctx).unwrap();
        set.activate(&mut ctx, &Value::Int(7)).unwrap();

        let mut get = Get::default();
        get.set_param(0, Value::String("x".into())).unwrap();
        get.warmup(&mut ctx).unwrap();
        assert_eq!(get.activate(&mut ctx, &Value::None).unwrap(), Value::Int(7));

        get.cleanup();
        set.cleanup();
    }

    #[test]
    fn push_pop_take_behave_as_a_deque() {
        let (mut ctx, _wire) = ctx_with_wire();
        let mut push = Push::default();
        push.set_param(0, Value::String("q".into())).unwrap();
        push.warmup(&mut ctx).unwrap();
        push.activate(&mut ctx, &Value::Int(1)).unwrap();
        push.activate(&mut ctx, &Value::Int(2)).unwrap();
        push.activate(&mut ctx, &Value::Int(3)).unwrap();

        let mut take = Take::default();
        take.set_param(0, Value::String("q".into())).unwrap();
        take.warmup(&mut ctx).unwrap();
        assert_eq!(take.activate(&mut ctx, &Value::None).unwrap(), Value::Int(1));

        let mut pop = Pop::default();
        pop.set_param(0, Value::String("q".into())).unwrap();
        pop.warmup(&mut ctx).unwrap();
        assert_eq!(pop.activate(&mut ctx, &Value::None).unwrap(), Value::Int(3));

        push.cleanup();
        take.cleanup();
        pop.cleanup();
    }

    #[test]
    fn count_reports_sequence_length() {
        let (mut ctx, _wire) = ctx_with_wire();
        let mut push = Push::default();
        push.set_param(0, Value::String("q".into())).unwrap();
        push.warmup(&mut ctx).unwrap();
        push.activate(&mut ctx, &Value::Int(1)).unwrap();
        push.activate(&mut ctx, &Value::Int(2)).unwrap();

        let mut count = Count::default();
        count.set_param(0, Value::String("q".into())).unwrap();
        count.warmup(&mut ctx).unwrap();
        assert_eq!(count.activate(&mut ctx, &Value::None).unwrap(), Value::Int(2));

        push.cleanup();
        count.cleanup();
    }

    #[test]
    fn swap_exchanges_two_variables() {
        let (mut ctx, _wire) = ctx_with_wire();
        let mut set_a = Set::default();
        set_a.set_param(0, Value::String("a".into())).unwrap();
        set_a.warmup(&mut ctx).unwrap();
        set_a.activate(&mut ctx, &Value::Int(1)).unwrap();

        let mut set_b = Set::default();
        set_b.set_param(0, Value::String("b".into())).unwrap();
        set_b.warmup(&mut ctx).unwrap();
        set_b.activate(&mut ctx, &Value::Int(2)).unwrap();

        let mut swap = Swap::default();
        swap.set_param(0, Value::String("a".into())).unwrap();
        swap.set_param(1, Value::String("b".into())).unwrap();
        swap.warmup(&mut ctx).unwrap();
        swap.activate(&mut ctx, &Value::None).unwrap();

        let mut get_a = Get::default();
        get_a.set_param(0, Value::String("a".into())).unwrap();
        get_a.warmup(&mut ctx).unwrap();
        assert_eq!(get_a.activate(&mut ctx, &Value::None).unwrap(), Value::Int(2));

        let mut get_b = Get::default();
        get_b.set_param(0, Value::String("b".into())).unwrap();
        get_b.warmup(&mut ctx).unwrap();
        assert_eq!(get_b.activate(&mut ctx, &Value::None).unwrap(), Value::Int(1));

        set_a.cleanup();
        set_b.cleanup();
        swap.cleanup();
        get_a.cleanup();
        get_b.cleanup();
    }

    #[test]
    fn set_with_global_true_reaches_the_mesh_scope() {
        let mesh = Mesh::new("m");
        let wire = Arc::new(Wire::new("w"));
        wire.bind_to_mesh(&mesh);
        let mut ctx = Context::new();
        ctx.push_wire(Arc::clone(&wire));

        let mut set = Set::default();
        set.set_param(0, Value::String("q".into())).unwrap();
        set.set_param(1, Value::Bool(true)).unwrap();
        set.warmup(&mut ctx).unwrap();
        set.activate(&mut ctx, &Value::Int(99)).unwrap();
        set.cleanup();

        assert_eq!(mesh.get_global_variable("q"), Some(Value::Int(99)));
    }
}
