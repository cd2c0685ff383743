//! The standard shard library (§4.C): primitive operators, flow control,
//! variable operators, and structural operators.

mod flow;
mod primitive;
mod structural;
mod variable_ops;

pub use flow::{And, Fail, Input, Or, Restart, Return, Stop, When};
pub use primitive::{Const, Is, IsLess, IsLessEqual, IsMore, IsMoreEqual, IsNot, Log, MathAdd, MathDivide, MathMultiply, MathSubtract, Sleep};
pub use structural::{Repeat, Sort};
pub use variable_ops::{Clear, Count, Get, Pop, Push, Ref, Set, Swap, Take, Update};

use crate::registry::Registry;

/// Registers every standard shard's constructor with the process-wide
/// registry (§4.D). Idempotent — re-running it just overwrites with the same
/// constructors and logs a warning, same as any other re-registration.
pub fn register_all() {
    let registry = Registry::global();
    registry.register_shard("Const", || Box::new(Const::default()));
    registry.register_shard("Log", || Box::new(Log::default()));
    registry.register_shard("Sleep", || Box::new(Sleep::default()));
    registry.register_shard("Math.Add", || Box::new(MathAdd::default()));
    registry.register_shard("Math.Subtract", || Box::new(MathSubtract::default()));
    registry.register_shard("Math.Multiply", || Box::new(MathMultiply::default()));
    registry.register_shard("Math.Divide", || Box::new(MathDivide::default()));
    registry.register_shard("Is", || Box::new(Is::default()));
    registry.register_shard("IsNot", || Box::new(IsNot::default()));
    registry.register_shard("IsLess", || Box::new(IsLess::default()));
    registry.register_shard("IsMore", || Box::new(IsMore::default()));
    registry.register_shard("IsLessEqual", || Box::new(IsLessEqual::default()));
    registry.register_shard("IsMoreEqual", || Box::new(IsMoreEqual::default()));
    registry.register_shard("Stop", || Box::new(Stop::default()));
    registry.register_shard("Restart", || Box::new(Restart));
    registry.register_shard("Return", || Box::new(Return));
    registry.register_shard("Fail", || Box::new(Fail::default()));
    registry.register_shard("And", || Box::new(And));
    registry.register_shard("Or", || Box::new(Or));
    registry.register_shard("Input", || Box::new(Input));
    registry.register_shard("When", || Box::new(When::default()));
    registry.register_shard("Set", || Box::new(Set::default()));
    registry.register_shard("Ref", || Box::new(Ref::default()));
    registry.register_shard("Update", || Box::new(Update::default()));
    registry.register_shard("Push", || Box::new(Push::default()));
    registry.register_shard("Pop", || Box::new(Pop::default()));
    registry.register_shard("Get", || Box::new(Get::default()));
    registry.register_shard("Clear", || Box::new(Clear::default()));
    registry.register_shard("Count", || Box::new(Count::default()));
    registry.register_shard("Swap", || Box::new(Swap::default()));
    registry.register_shard("Take", || Box::new(Take::default()));
    registry.register_shard("Sort", || Box::new(Sort::default()));
    registry.register_shard("Repeat", || Box::new(Repeat::default()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn every_standard_shard_constructs() {
        register_all();
        let registry = Registry::global();
        for name in [
            "Const", "Log", "Sleep", "Math.Add", "Math.Subtract", "Math.Multiply", "Math.Divide", "Is", "IsNot", "IsLess", "IsMore",
            "IsLessEqual", "IsMoreEqual", "Stop", "Restart", "Return", "Fail", "And", "Or", "Input", "When", "Set", "Ref", "Update",
            "Push", "Pop", "Get", "Clear", "Count", "Swap", "Take", "Sort", "Repeat",
        ] {
            assert!(registry.construct_shard(name).is_some(), "{name} should construct");
        }
    }
}
