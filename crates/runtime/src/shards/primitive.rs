//! Primitive operators: constants, logging, sleeping, arithmetic, comparison.

use crate::context::Context;
use crate::error::{ActivationError, ComposeError, InvalidParameterIndex};
use crate::shard::{InstanceData, ParamInfo, Shard};
use loom_core::{derive_type_info, Type, Value};
use std::cmp::Ordering;

#[derive(Default)]
pub struct Const {
    value: Value,
}

impl Shard for Const {
    fn name(&self) -> &str {
        "Const"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::none()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Value", help: "the constant value to emit", accepted_types: vec![Type::any()], default: Value::None }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.value = value;
        Ok(())
    }
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        Ok(self.value.clone())
    }
    fn compose(&mut self, data: &mut InstanceData) -> Option<Result<Type, ComposeError>> {
        Some(derive_type_info(&self.value, data.shared).map_err(ComposeError::from))
    }
    fn activate(&mut self, _ctx: &mut Context, _input: &Value) -> Result<Value, ActivationError> {
        Ok(self.value.clone())
    }
}

#[derive(Default)]
pub struct Log {
    prefix: Value,
}

impl Shard for Log {
    fn name(&self) -> &str {
        "Log"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Prefix", help: "optional label for the log line", accepted_types: vec![Type::any()], default: Value::None }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.prefix = value;
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        tracing::info!(prefix = ?self.prefix, value = ?input, "Log");
        Ok(input.clone())
    }
}

#[derive(Default)]
pub struct Sleep {
    seconds: f64,
}

impl Shard for Sleep {
    fn name(&self) -> &str {
        "Sleep"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Seconds", help: "duration to suspend for", accepted_types: vec![Type::float()], default: Value::Float(0.0) }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.seconds = match value {
            Value::Float(f) => f,
            Value::Int(i) => i as f64,
            _ => self.seconds,
        };
        Ok(())
    }
    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        ctx.suspend(self.seconds);
        Ok(input.clone())
    }
}

fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// True if `a` and `b` are both `Value::Int` — the arithmetic shards stay in
/// integer space only when neither operand forces a float promotion.
fn both_int(a: &Value, b: &Value) -> bool {
    matches!((a, b), (Value::Int(_), Value::Int(_)))
}

macro_rules! math_shard {
    ($ty:ident, $name:literal, $op:tt, $default:expr) => {
        #[derive(Default)]
        pub struct $ty {
            operand: Value,
        }

        impl Shard for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn input_types(&self) -> Vec<Type> {
                vec![Type::int(), Type::float()]
            }
            fn output_types(&self) -> Vec<Type> {
                vec![Type::any()]
            }
            fn parameters(&self) -> Vec<ParamInfo> {
                vec![ParamInfo {
                    name: "Operand",
                    help: "right-hand operand",
                    accepted_types: vec![Type::int(), Type::float()],
                    default: $default,
                }]
            }
            fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
                if index != 0 {
                    return Err(InvalidParameterIndex { index, len: 1 });
                }
                self.operand = value;
                Ok(())
            }
            fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
                let lhs = numeric(input).ok_or_else(|| ActivationError {
                    shard: $name.to_string(),
                    line: 0,
                    column: 0,
                    message: "input is not numeric".to_string(),
                })?;
                let rhs = numeric(&self.operand).ok_or_else(|| ActivationError {
                    shard: $name.to_string(),
                    line: 0,
                    column: 0,
                    message: "operand is not numeric".to_string(),
                })?;
                if both_int(input, &self.operand) {
                    Ok(Value::Int((lhs $op rhs) as i64))
                } else {
                    Ok(Value::Float(lhs $op rhs))
                }
            }
        }
    };
}

math_shard!(MathAdd, "Math.Add", +, Value::Int(0));
math_shard!(MathSubtract, "Math.Subtract", -, Value::Int(0));
math_shard!(MathMultiply, "Math.Multiply", *, Value::Int(1));

#[derive(Default)]
pub struct MathDivide {
    operand: Value,
}

impl Shard for MathDivide {
    fn name(&self) -> &str {
        "Math.Divide"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::int(), Type::float()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Operand", help: "divisor", accepted_types: vec![Type::int(), Type::float()], default: Value::Int(1) }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.operand = value;
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        let lhs = numeric(input).ok_or_else(|| ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "input is not numeric".to_string() })?;
        let rhs = numeric(&self.operand).ok_or_else(|| ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "operand is not numeric".to_string() })?;
        if rhs == 0.0 {
            return Err(ActivationError { shard: self.name().to_string(), line: 0, column: 0, message: "division by zero".to_string() });
        }
        if both_int(input, &self.operand) {
            Ok(Value::Int((lhs / rhs) as i64))
        } else {
            Ok(Value::Float(lhs / rhs))
        }
    }
}

macro_rules! compare_shard {
    ($ty:ident, $name:literal, $matches:expr) => {
        #[derive(Default)]
        pub struct $ty {
            operand: Value,
        }

        impl Shard for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn input_types(&self) -> Vec<Type> {
                vec![Type::any()]
            }
            fn output_types(&self) -> Vec<Type> {
                vec![Type::bool_()]
            }
            fn parameters(&self) -> Vec<ParamInfo> {
                vec![ParamInfo { name: "Operand", help: "value to compare against", accepted_types: vec![Type::any()], default: Value::None }]
            }
            fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
                if index != 0 {
                    return Err(InvalidParameterIndex { index, len: 1 });
                }
                self.operand = value;
                Ok(())
            }
            fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
                let matcher: fn(Ordering) -> bool = $matches;
                match input.compare(&self.operand) {
                    Ok(ordering) => Ok(Value::Bool(matcher(ordering))),
                    Err(e) => Err(ActivationError { shard: $name.to_string(), line: 0, column: 0, message: e.to_string() }),
                }
            }
        }
    };
}

#[derive(Default)]
pub struct Is {
    operand: Value,
}
impl Shard for Is {
    fn name(&self) -> &str {
        "Is"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Operand", help: "value to compare against", accepted_types: vec![Type::any()], default: Value::None }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.operand = value;
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        Ok(Value::Bool(input.values_equal(&self.operand)))
    }
}

#[derive(Default)]
pub struct IsNot {
    operand: Value,
}
impl Shard for IsNot {
    fn name(&self) -> &str {
        "IsNot"
    }
    fn input_types(&self) -> Vec<Type> {
        vec![Type::any()]
    }
    fn output_types(&self) -> Vec<Type> {
        vec![Type::bool_()]
    }
    fn parameters(&self) -> Vec<ParamInfo> {
        vec![ParamInfo { name: "Operand", help: "value to compare against", accepted_types: vec![Type::any()], default: Value::None }]
    }
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        if index != 0 {
            return Err(InvalidParameterIndex { index, len: 1 });
        }
        self.operand = value;
        Ok(())
    }
    fn activate(&mut self, _ctx: &mut Context, input: &Value) -> Result<Value, ActivationError> {
        Ok(Value::Bool(!input.values_equal(&self.operand)))
    }
}

compare_shard!(IsLess, "IsLess", |o: Ordering| o == Ordering::Less);
compare_shard!(IsMore, "IsMore", |o: Ordering| o == Ordering::Greater);
compare_shard!(IsLessEqual, "IsLessEqual", |o: Ordering| o != Ordering::Greater);
compare_shard!(IsMoreEqual, "IsMoreEqual", |o: Ordering| o != Ordering::Less);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_activate_returns_its_param() {
        let mut shard = Const::default();
        shard.set_param(0, Value::Int(42)).unwrap();
        let mut ctx = Context::new();
        assert_eq!(shard.activate(&mut ctx, &Value::None).unwrap(), Value::Int(42));
    }

    #[test]
    fn math_add_stays_in_integer_space() {
        let mut shard = MathAdd::default();
        shard.set_param(0, Value::Int(2)).unwrap();
        let mut ctx = Context::new();
        assert_eq!(shard.activate(&mut ctx, &Value::Int(40)).unwrap(), Value::Int(42));
    }

    #[test]
    fn math_divide_by_zero_fails() {
        let mut shard = MathDivide::default();
        shard.set_param(0, Value::Int(0)).unwrap();
        let mut ctx = Context::new();
        assert!(shard.activate(&mut ctx, &Value::Int(1)).is_err());
    }

    #[test]
    fn is_less_compares_operand() {
        let mut shard = IsLess::default();
        shard.set_param(0, Value::Int(10)).unwrap();
        let mut ctx = Context::new();
        assert_eq!(shard.activate(&mut ctx, &Value::Int(3)).unwrap(), Value::Bool(true));
        assert_eq!(shard.activate(&mut ctx, &Value::Int(30)).unwrap(), Value::Bool(false));
    }
}
