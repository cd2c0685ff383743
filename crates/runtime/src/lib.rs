//! loom-runtime: shard dispatch, wire iteration, and mesh scheduling built on
//! `loom-core`'s Value/Type model.
//!
//! A [`Shard`] is the unit of computation; a [`Wire`] is an ordered sequence
//! of shards plus its own variable scope; a [`Mesh`] owns a set of
//! concurrently-scheduled wires and drives them cooperatively over stackful
//! coroutines (`may`). [`composer::compose_wire`] performs the static
//! validation pass — type inference and the Set/Ref/Update/Push exclusion
//! table — that a wire must pass before a mesh will ever run it.
//!
//! # Modules
//!
//! - `shard`: the `Shard` trait and its compose-time companions
//! - `shards`: the standard shard library (§4.C)
//! - `context`: per-activation state and flow control (§4.H)
//! - `variable`: refcounted cell storage backing wire/mesh scopes (§4.E)
//! - `wire`: `Wire`, variable reference/release, the wire lifecycle (§4.G)
//! - `mesh`: `Mesh`, the cooperative scheduler and global scope (§4.I)
//! - `composer`: static wire validation (§4.F)
//! - `registry`: the process-wide shard/type/wire registry (§4.D)
//! - `event`: the observer dispatcher shared by `Wire`/`Mesh`/`Registry`
//! - `config`: environment- and TOML-driven runtime tunables
//! - `error`: the runtime's error taxonomy (§7)
//! - `pool`: the worker pool backing `asyncActivate` (§5)
//! - `abi`: the C-callable ABI surface (§6)

pub mod abi;
pub mod composer;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod mesh;
pub mod pool;
pub mod registry;
pub mod shard;
pub mod shards;
pub mod variable;
pub mod wire;

pub use composer::{compose_wire, ComposeResult};
pub use config::RuntimeConfig;
pub use context::{Context, FlowState};
pub use error::RuntimeError;
pub use mesh::Mesh;
pub use registry::Registry;
pub use shard::{InstanceData, MutationKind, ParamInfo, RequiredVariables, Shard};
pub use wire::{reference_named, reference_variable, release_variable, VariableRef, Wire, WireState};
