//! The [`Shard`] trait: the polymorphic unit of computation (§4.C).
//!
//! A closed, compile-time-known vocabulary (see `shards/`) is implemented as
//! one struct per shard rather than a single tagged enum, because several
//! shards carry non-trivial internal state (e.g. `Repeat`'s nested wire) that
//! would otherwise force every variant to carry every other variant's
//! payload. `Box<dyn Shard>` plays the role the spec's vtable/capability-table
//! plays in the source (§9 design notes).

use crate::context::Context;
use crate::error::{ActivationError, ComposeError, InvalidParameterIndex, WarmupError};
use loom_core::hash::{Digest, Hash128};
use loom_core::{ExposedTypes, Type, Value};

/// One entry in a shard's parameter schema (§4.C).
#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: &'static str,
    pub help: &'static str,
    pub accepted_types: Vec<Type>,
    pub default: Value,
}

/// How a shard's exposed variable may be mutated — drives the Set/Ref
/// exclusion table in §4.F.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Set,
    Ref,
    Update,
    Push,
}

/// Accumulates `requiredVariables` across a wire's shard sequence during
/// compose, so the composer can resolve them against the exposed/inherited
/// scope in one pass (§4.F step 6).
#[derive(Debug, Default)]
pub struct RequiredVariables(pub Vec<(String, Type)>);

impl RequiredVariables {
    pub fn require(&mut self, name: impl Into<String>, ty: Type) {
        self.0.push((name.into(), ty));
    }
}

/// What a shard's `compose` hook receives (§4.C compose contract).
pub struct InstanceData<'a> {
    pub input_type: Type,
    pub shared: &'a dyn ExposedTypes,
    /// The next shard's accepted input types, for shards that negotiate their
    /// output type against what follows (e.g. an optional passthrough).
    pub next_input_types: &'a [Type],
    pub wants_worker_thread: bool,
    pub required: &'a mut RequiredVariables,
}

/// The polymorphic unit of computation (§4.C). `warmup`/`compose` default to
/// no-ops/`None` so most shards only implement `activate`.
pub trait Shard: Send + Sync {
    fn name(&self) -> &str;

    /// Diagnostic position, for `ActivationError`/`ComposeError` messages.
    fn line(&self) -> u32 {
        0
    }
    fn column(&self) -> u32 {
        0
    }

    fn input_types(&self) -> Vec<Type>;
    fn output_types(&self) -> Vec<Type>;

    fn parameters(&self) -> Vec<ParamInfo> {
        Vec::new()
    }

    /// Deep-clones `value` into the owned parameter slot (§4.C).
    fn set_param(&mut self, index: usize, value: Value) -> Result<(), InvalidParameterIndex> {
        let len = self.parameters().len();
        if index >= len {
            return Err(InvalidParameterIndex { index, len });
        }
        let _ = value;
        Ok(())
    }

    /// Returns a copy of the owned parameter slot.
    fn get_param(&self, index: usize) -> Result<Value, InvalidParameterIndex> {
        let params = self.parameters();
        params.get(index).map(|p| p.default.clone()).ok_or(InvalidParameterIndex { index, len: params.len() })
    }

    /// When present, supersedes the inference rule in §4.C and may mutate
    /// internal state to specialise for `data.input_type`.
    fn compose(&mut self, data: &mut InstanceData) -> Option<Result<Type, ComposeError>> {
        let _ = data;
        None
    }

    /// Names + types this shard creates for later shards/outer scopes, with
    /// the mutation discipline the composer enforces (§4.F).
    fn exposed_variables(&self) -> Vec<(String, Type, MutationKind)> {
        Vec::new()
    }

    /// Names + types this shard reads from the surrounding scope.
    fn required_variables(&self) -> Vec<(String, Type)> {
        Vec::new()
    }

    fn warmup(&mut self, ctx: &mut Context) -> Result<(), WarmupError> {
        let _ = ctx;
        Ok(())
    }

    fn activate(&mut self, ctx: &mut Context, input: &Value) -> Result<Value, ActivationError>;

    fn cleanup(&mut self) {}

    /// Deterministic hash over the shard's identity + parameter state,
    /// default-derived from its name; shards with meaningful parameters
    /// should override this.
    fn hash(&self) -> Hash128 {
        let mut d = Digest::new();
        d.update(self.name().as_bytes());
        d.finish()
    }
}
