//! Flow-control shards: the primitives the iterate loop reacts to, plus two
//! boolean short-circuit gates and a guarded-action wrapper (§4.C, §4.H).

use crate::context::{Context, FlowState};
use crate::error::{ActivationError, InvalidParameterIndex};
use crate::shard::{ParamInfo, Shard};
use loom_core::{Type, Value};

/// Halts the wire, publishing `input` (or the `Value` parameter, if set) as
/// `finishedOutput`.
#[derive(Default)]
pub struct Stop {
    value: Option<Value>,
}

impl Shard for Stop {
    fn name(&self) -> &str {
        "Stop"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Value", help: "overrides the propagated output; defaults to the input", accepted_types: vec![Type::any()], default: Value::None }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.value = Some(value);
        Ok(())
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        let out = self.value.clone().unwrap_or_else(|| input.clone());
        ctx.stop_flow(out.clone());
        Ok(out)
    }
}

/// Rebases `currentInput` back to the wire's original `wireInput` and loops,
/// regardless of whether the wire is `looped` (§4.G `run`).
#[derive(Default)]
pub struct Restart;

impl Shard for Restart {
    fn name(&self) -> &str {
        "Restart"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        ctx.restart_flow(ctx.wire_input.clone());
        Ok(input.clone())
    }
}

/// Ends the current iteration early as though the shard chain had run to
/// completion — the non-looping counterpart to reaching the last shard.
#[derive(Default)]
pub struct Return;

impl Shard for Return {
    fn name(&self) -> &str {
        "Return"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        ctx.flow_state = FlowState::Return;
        Ok(input.clone())
    }
}

/// Unconditionally fails activation with the given message, driving the wire
/// to `Failed` the same way any other `ActivationError` would.
#[derive(Default)]
pub struct Fail {
    message: String,
}

impl Shard for Fail {
    fn name(&self) -> &str {
        "Fail"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Message", help: "failure message", accepted_types: vec![Type::string()], default: Value::String(String::new()) }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        if let Value::String(s) = value {
            self.message = s;
        }
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: self.message.clone() })
    }
}

/// Boolean guard: a `false` input ends the iteration early via `Return`,
/// otherwise passes the input through unchanged (chainable condition gate).
#[derive(Default)]
pub struct And;

impl Shard for And {
    fn name(&self) -> &str {
        "And"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if matches!(input, Value::Bool(false)) {
            ctx.flow_state = FlowState::Return;
        }
        Ok(input.clone())
    }
}

/// Boolean guard: a `true` input ends the iteration early via `Return`,
/// otherwise passes the input through unchanged.
#[derive(Default)]
pub struct Or;

impl Shard for Or {
    fn name(&self) -> &str {
        "Or"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if matches!(input, Value::Bool(true)) {
            ctx.flow_state = FlowState::Return;
        }
        Ok(input.clone())
    }
}

/// Restores the wire's original `wireInput`, discarding whatever the chain
/// has computed since — the counterpart to `Const` for "go back to the top".
#[derive(Default)]
pub struct Input;

impl Shard for Input {
    fn name(&self) -> &str {
        "Input"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn activate(&mut self, ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        Ok(ctx.wire_input.clone())
    }
}

/// Guards one of the unconditional flow actions on a `Bool` input: when the
/// input is `true`, applies the named action (`Stop`/`Restart`/`Return`/
/// `Fail`); otherwise passes the input through untouched.
pub struct When {
    action: String,
}

impl Default for When {
    fn default() -> Self {
        When { action: "Return".to_string() }
    }
}

impl Shard for When {
    fn name(&self) -> &str {
        "When"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo {
            name: "Action",
            help: "one of Stop, Restart, Return, Fail",
            accepted_types: vec![Type::string()],
            default: Value::String("Return".to_string()),
        }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        if let Value::String(s) = value {
            self.action = s;
        }
        Ok(())
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        if !matches!(input, Value::Bool(true)) {
            return Ok(input.clone());
        }
        match self.action.as_str() {
            "Stop" => {
                ctx.stop_flow(ctx.wire_input.clone());
                Ok(ctx.wire_input.clone())
            }
            "Restart" => {
                ctx.restart_flow(ctx.wire_input.clone());
                Ok(ctx.wire_input.clone())
            }
            "Fail" => Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "When guarded a Fail action".to_string() }),
            _ => {
                ctx.flow_state = FlowState::Return;
                Ok(input.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_publishes_input_by_default() {
        let mut shard = Stop::default();
        let mut ctx = Context::new();
        let out = shard.activate(&mut ctx, &Value::Int(9)).unwrap();
        assert_eq!(out, Value::Int(9));
        assert_eq!(ctx.flow_state, FlowState::Stop);
        assert_eq!(ctx.flow_storage, Value::Int(9));
    }

    #[test]
    fn and_returns_on_false_and_passes_through_on_true() {
        let mut shard = And;
        let mut ctx = Context::new();
        shard.activate(&mut ctx, &Value::Bool(false)).unwrap();
        assert_eq!(ctx.flow_state, FlowState::Return);

        let mut ctx2 = Context::new();
        let out = shard.activate(&mut ctx2, &Value::Bool(true)).unwrap();
        assert_eq!(out, Value::Bool(true));
        assert_eq!(ctx2.flow_state, FlowState::Continue);
    }

    #[test]
    fn when_restart_only_fires_on_true_input() {
        let mut shard = When::default();
        shard.set_param(0, Value::String("Restart".to_string())).unwrap();

        let mut ctx = Context::new();
        ctx.wire_input = Value::Int(0);
        shard.activate(&mut ctx, &Value::Bool(false)).unwrap();
        assert_eq!(ctx.flow_state, FlowState::Continue);

        shard.activate(&mut ctx, &Value::Bool(true)).unwrap();
        assert_eq!(ctx.flow_state, FlowState::Restart);
    }
}
