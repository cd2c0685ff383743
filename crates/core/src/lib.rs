//! loom-core: the Value and Type model shared by every piece of the loom runtime.
//!
//! A [`Value`] is the dynamic data shards pass to one another; a [`Type`] is
//! the structural descriptor the composer checks values against before a wire
//! ever runs. Both live here, independent of scheduling or shard dispatch, so
//! that `loom-runtime` (and eventually out-of-tree shard crates) can depend on
//! a small, stable foundation.
//!
//! # Modules
//!
//! - `hash`: deterministic 128-bit hashing shared by `Value` and `Type`
//! - `value`: the tagged `Value` variant and its equality/order/hash/clone contract
//! - `type_`: structural `Type` descriptors, matching, derivation, hashing
//! - `son`: stable textual diagnostic encoding for `Value`/`Type` snapshots

pub mod hash;
pub mod son;
pub mod type_;
pub mod value;

pub use hash::Hash128;
pub use son::{value_to_son, type_to_son, SonConfig};
pub use type_::{derive_type_info, match_types, ExposedTypes, Kind, Type, TypeError};
pub use value::{
    ArrayValue, AudioValue, Color, EnumValue, ImageValue, ObjectValue, ObjectVTable, ShardHandle, Value, ValueError,
    WireHandle,
};
