//! Structural operators (§4.C): shards that operate on a nested wire or
//! reorder a composite value in place.

use crate::context::Context;
use crate::error::{ActivationError, ComposeError, InvalidParameterIndex};
use crate::shard::{InstanceData, ParamInfo, Shard};
use loom_core::value::WireHandle;
use loom_core::{Kind, Type, Value};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::wire::Wire;

/// A runaway-loop backstop for `Repeat`'s condition-driven mode, mirroring
/// `Mesh::run_until_idle`'s `max_ticks` parameter.
const MAX_REPEAT_ITERATIONS: usize = 10_000;

fn resolve_wire(handle: &WireHandle) -> Option<Arc<Wire>> {
    let strong: Arc<dyn Any + Send + Sync> = handle.0.upgrade()?;
    strong.downcast::<Wire>().ok()
}

/// Runs a nested wire repeatedly, feeding each run's `finishedOutput` back in
/// as the next run's input. `Times > 0` runs a fixed count; `Times == 0` runs
/// until the nested wire's output is `Bool(false)` (or the iteration
/// backstop is hit).
#[derive(Default)]
pub struct Repeat {
    wire_handle: Option<WireHandle>,
    times: i64,
}

impl Shard for Repeat {
    fn name(&self) -> &str {
        "Repeat"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![
            ParamInfo { name: "Wire", help: "nested wire to run repeatedly", accepted_types: vec![Type::of_kind(Kind::WireRef)], default: Value::None },
            ParamInfo { name: "Times", help: "fixed iteration count; 0 loops until the nested wire returns false", accepted_types: vec![Type::int()], default: Value::Int(1) },
        ]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        match index {
            0 => {
                if let Value::WireRef(handle) = value {
                    self.wire_handle = Some(handle);
                }
                Ok(())
            }
            1 => {
                if let Value::Int(n) = value {
                    self.times = n;
                }
                Ok(())
            }
            _ => Err(InvalidParameterIndex { index, len: 2 }),
        }
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        match index {
            0 => Ok(self.wire_handle.clone().map(Value::WireRef).unwrap_or(Value::None)),
            1 => Ok(Value::Int(self.times)),
            _ => Err(InvalidParameterIndex { index, len: 2 }),
        }
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        let handle = self
            .wire_handle
            .as_ref()
            .ok_or_else(|| ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Repeat has no Wire parameter set".to_string() })?;
        let wire = resolve_wire(handle)
            .ok_or_else(|| ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Repeat's Wire reference no longer exists".to_string() })?;

        let mut current = input.clone();
        let fixed = self.times > 0;
        let iterations = if fixed { self.times as usize } else { MAX_REPEAT_ITERATIONS };

        for _ in 0..iterations {
            wire.reset();
            wire.run(ctx, current.clone());
            if let Some(message) = wire.finished_error() {
                return Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message });
            }
            current = wire.finished_output();
            if !fixed && matches!(current, Value::Bool(false)) {
                break;
            }
        }
        Ok(current)
    }
}

/// The subset of `Kind`s `Value::compare` actually orders; everything else
/// (`Object`, `Enum`, `Color`, `Image`, `Audio`, `Set`, the ref kinds, `Any`,
/// `None`) has no total order and is rejected at compose time rather than
/// surfacing as a runtime surprise.
fn is_orderable(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Bool | Kind::Int | Kind::IntVec | Kind::Float | Kind::FloatVec | Kind::Bytes | Kind::String | Kind::Path | Kind::Sequence | Kind::Table
    )
}

/// In-place sort of a `Sequence` value. Rejects element kinds with no total
/// order at compose time (§9 design notes); a well-typed sequence whose
/// elements still fail to compare at runtime (e.g. `NaN` floats) surfaces as
/// an `ActivationError` rather than panicking.
#[derive(Default)]
pub struct Sort {
    descending: bool,
}

impl Shard for Sort {
    fn name(&self) -> &str {
        "Sort"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::sequence_of(vec![Type::any()])]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Descending", help: "sort largest-first", accepted_types: vec![Type::bool_()], default: Value::Bool(false) }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        if let Value::Bool(b) = value {
            self.descending = b;
        }
        Ok(())
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        Ok(Value::Bool(self.descending))
    }
    fn compose(&mut self, data: &mut InstanceData) -> Option<Result<Type, ComposeError>> {
        if data.input_type.kind != Kind::Sequence {
            return Some(Err(ComposeError::fatal(self.name().to_string(), self.line(), self.column(), "Sort requires a Sequence input")));
        }
        if let Some(elem) = data.input_type.element_types.first() {
            if !elem.is_any() && !is_orderable(elem.kind) {
                return Some(Err(ComposeError::fatal(
                    self.name().to_string(),
                    self.line(),
                    self.column(),
                    format!("Sequence element kind {:?} has no total order", elem.kind),
                )));
            }
        }
        Some(Ok(data.input_type.clone()))
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        let Value::Sequence(items) = input else {
            return Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "Sort input is not a Sequence".to_string() });
        };
        let mut sorted = items.clone();
        let mut error = None;
        sorted.sort_by(|a, b| match a.compare(b) {
            Ok(ordering) => {
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
            Err(e) => {
                error.get_or_insert(e);
                Ordering::Equal
            }
        });
        if let Some(e) = error {
            return Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: e.to_string() });
        }
        Ok(Value::Sequence(sorted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActivationError as AE;

    #[test]
    fn sort_ascending_orders_ints() {
        let mut shard = Sort::default();
        let mut ctx = Context::new();
        let input = Value::Sequence(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        let out = shard.activate(&mut ctx, &input).unwrap();
        assert_eq!(out, Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn sort_descending_reverses_order() {
        let mut shard = Sort::default();
        shard.set_param(0, Value::Bool(true)).unwrap();
        let mut ctx = Context::new();
        let input = Value::Sequence(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        let out = shard.activate(&mut ctx, &input).unwrap();
        assert_eq!(out, Value::Sequence(vec![Value::Int(3), Value::Int(2), Value::Int(1)]));
    }

    #[test]
    fn sort_compose_rejects_unorderable_element_kind() {
        let mut shard = Sort::default();
        let mut required = crate::shard::RequiredVariables::default();
        let exposed: indexmap::IndexMap<String, Type> = indexmap::IndexMap::new();
        let mut data = InstanceData {
            input_type: Type::sequence_of(vec![Type::object(1, 1)]),
            shared: &exposed,
            next_input_types: &[],
            wants_worker_thread: false,
            required: &mut required,
        };
        let result = shard.compose(&mut data);
        assert!(matches!(result, Some(Err(_))));
    }

    struct AlwaysFalse;
    impl Shard for AlwaysFalse {
        fn name(&self) -> &str {
            "AlwaysFalse"
        }
        fn input_types(&self) -> Vec<Type> {
            vec![Type::any()]
        }
        fn output_types(&self) -> Vec<Type> {
            vec![Type::bool_()]
        }
        fn activate(&mut self, ctx: &mut Context, _input: &Value) -> Result<Value, AE> {
            ctx.stop_flow(Value::Bool(false));
            Ok(Value::Bool(false))
        }
    }

    #[test]
    fn repeat_condition_mode_stops_on_false() {
        let mut wire = Wire::new("inner");
        wire.add_shard(Box::new(AlwaysFalse));
        let wire: Arc<Wire> = Arc::new(wire);
        let weak: std::sync::Weak<dyn Any + Send + Sync> = Arc::downgrade(&wire);

        let mut repeat = Repeat::default();
        repeat.set_param(0, Value::WireRef(WireHandle(weak))).unwrap();
        repeat.set_param(1, Value::Int(0)).unwrap();

        let mut ctx = Context::new();
        let out = repeat.activate(&mut ctx, &Value::Int(0)).unwrap();
        assert_eq!(out, Value::Bool(false));
    }
}
