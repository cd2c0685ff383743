//! Structural [`Type`] descriptors: the compose-time shape that a [`Value`]
//! is checked against before a wire is allowed to run.

use crate::hash::{Digest, Hash128, hash_unordered};
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    None,
    Any,
    Bool,
    Int,
    IntVec,
    Float,
    FloatVec,
    Color,
    Bytes,
    String,
    Path,
    ContextVar,
    Enum,
    Object,
    Image,
    Audio,
    Sequence,
    Table,
    Set,
    WireRef,
    ShardRef,
    TypeRef,
    Array,
}

impl Kind {
    pub fn of_value(v: &Value) -> Kind {
        match v {
            Value::None => Kind::None,
            Value::Any => Kind::Any,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::IntVec(_) => Kind::IntVec,
            Value::Float(_) => Kind::Float,
            Value::FloatVec(_) => Kind::FloatVec,
            Value::Color(_) => Kind::Color,
            Value::Bytes(_) => Kind::Bytes,
            Value::String(_) => Kind::String,
            Value::Path(_) => Kind::Path,
            Value::ContextVar(_) => Kind::ContextVar,
            Value::Enum(_) => Kind::Enum,
            Value::Object(_) => Kind::Object,
            Value::Image(_) => Kind::Image,
            Value::Audio(_) => Kind::Audio,
            Value::Sequence(_) => Kind::Sequence,
            Value::Table(_) => Kind::Table,
            Value::Set(_) => Kind::Set,
            Value::WireRef(_) => Kind::WireRef,
            Value::ShardRef(_) => Kind::ShardRef,
            Value::TypeRef(_) => Kind::TypeRef,
            Value::Array(_) => Kind::Array,
        }
    }
}

/// A structural type descriptor. Most kinds only need `kind` (and, for
/// Object/Enum, `vendor`/`type_id`); Sequence/Table/Set carry the element
/// refinements the composer matches against.
#[derive(Debug, Clone)]
pub struct Type {
    pub kind: Kind,
    pub vendor: u32,
    pub type_id: u32,
    /// Nonzero only for Sequence: a lower bound on the input's length that a
    /// receiver may demand.
    pub fixed_size: u32,
    /// Allowed element types for Sequence/Set. Empty means "no constraint"
    /// for a receiver (see `match_types` rule 4) — and "no elements seen
    /// yet" when derived from an empty Sequence/Set value.
    pub element_types: Vec<Type>,
    /// Parallel arrays for Table: `table_keys[i]` has type `table_types[i]`.
    /// A trailing key equal to `Value::String(String::new())` is the
    /// "extra keys allowed" sentinel (§4.B rule 5b).
    pub table_keys: Vec<Value>,
    pub table_types: Vec<Type>,
    /// Marks a self-referential position in a recursive type; `type_hash`
    /// encodes this as a single bit rather than recursing (§4.B).
    pub recursive_self: bool,
}

impl Type {
    pub fn of_kind(kind: Kind) -> Type {
        Type {
            kind,
            vendor: 0,
            type_id: 0,
            fixed_size: 0,
            element_types: Vec::new(),
            table_keys: Vec::new(),
            table_types: Vec::new(),
            recursive_self: false,
        }
    }

    pub fn any() -> Type {
        Type::of_kind(Kind::Any)
    }
    pub fn none() -> Type {
        Type::of_kind(Kind::None)
    }
    pub fn int() -> Type {
        Type::of_kind(Kind::Int)
    }
    pub fn float() -> Type {
        Type::of_kind(Kind::Float)
    }
    pub fn string() -> Type {
        Type::of_kind(Kind::String)
    }
    pub fn bool_() -> Type {
        Type::of_kind(Kind::Bool)
    }

    pub fn object(vendor: u32, type_id: u32) -> Type {
        let mut t = Type::of_kind(Kind::Object);
        t.vendor = vendor;
        t.type_id = type_id;
        t
    }

    pub fn enum_(vendor: u32, type_id: u32) -> Type {
        let mut t = Type::of_kind(Kind::Enum);
        t.vendor = vendor;
        t.type_id = type_id;
        t
    }

    pub fn sequence_of(element_types: Vec<Type>) -> Type {
        let mut t = Type::of_kind(Kind::Sequence);
        t.element_types = element_types;
        t
    }

    pub fn recursive_self_marker() -> Type {
        let mut t = Type::of_kind(Kind::Any);
        t.recursive_self = true;
        t
    }

    /// The sentinel key marking "any extra input keys accepted" in a Table
    /// type's `table_keys` (§4.B rule 5b).
    pub fn extra_keys_sentinel() -> Value {
        Value::String(String::new())
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, Kind::Any) && !self.recursive_self
    }

    /// Deterministic hash, stable under permutation of `element_types` and
    /// of Set-kind types, and collapsing a recursive marker to one bit.
    pub fn type_hash(&self) -> Hash128 {
        if self.recursive_self {
            let mut d = Digest::new();
            d.update_u8(0xFF);
            return d.finish();
        }
        let mut d = Digest::new();
        d.update_u8(self.kind.tag());
        d.update_u32(self.vendor).update_u32(self.type_id).update_u32(self.fixed_size);
        match self.kind {
            Kind::Sequence | Kind::Set => {
                let digests: Vec<Hash128> = self.element_types.iter().map(|t| t.type_hash()).collect();
                d.update_hash128(hash_unordered(digests));
            }
            Kind::Table => {
                for (k, t) in self.table_keys.iter().zip(self.table_types.iter()) {
                    d.update_hash128(k.value_hash());
                    d.update_hash128(t.type_hash());
                }
            }
            _ => {}
        }
        d.finish()
    }
}

impl Kind {
    fn tag(self) -> u8 {
        self as u8
    }
}

/// Structural equality with order-insensitive element sets (§3: "Type
/// equality is structural with order-insensitive element sets").
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        if self.recursive_self || other.recursive_self {
            return self.recursive_self == other.recursive_self;
        }
        if self.kind != other.kind
            || self.vendor != other.vendor
            || self.type_id != other.type_id
            || self.fixed_size != other.fixed_size
        {
            return false;
        }
        match self.kind {
            Kind::Sequence | Kind::Set => {
                self.element_types.len() == other.element_types.len()
                    && self.element_types.iter().all(|t| other.element_types.contains(t))
            }
            Kind::Table => {
                if self.table_keys.len() != other.table_keys.len() {
                    return false;
                }
                self.table_keys.iter().zip(self.table_types.iter()).all(|(k, t)| {
                    other
                        .table_keys
                        .iter()
                        .zip(other.table_types.iter())
                        .any(|(ok, ot)| ok.values_equal(k) && ot == t)
                })
            }
            _ => true,
        }
    }
}
impl Eq for Type {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// `deriveTypeInfo` saw a `ContextVar` with no binding in the exposed set.
    UnresolvedContextVar(String),
    /// A receiver demanded ordering but its element kind has none.
    NotOrderable(&'static str),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UnresolvedContextVar(name) => {
                write!(f, "unresolved context variable `{name}`")
            }
            TypeError::NotOrderable(kind) => write!(f, "type of kind {kind} has no total order"),
        }
    }
}
impl std::error::Error for TypeError {}

/// Anything that can answer "what Type is this exposed variable?" — the
/// composer's scope and the variable environment both implement this; core
/// only needs the lookup shape, not their concrete representation.
pub trait ExposedTypes {
    fn lookup(&self, name: &str) -> Option<Type>;
}

impl ExposedTypes for std::collections::HashMap<String, Type> {
    fn lookup(&self, name: &str) -> Option<Type> {
        self.get(name).cloned()
    }
}

impl ExposedTypes for indexmap::IndexMap<String, Type> {
    fn lookup(&self, name: &str) -> Option<Type> {
        self.get(name).cloned()
    }
}

/// `matchTypes(input, receiver, isParameter, strict)` — §4.B.
pub fn match_types(input: &Type, receiver: &Type, is_parameter: bool, strict: bool) -> bool {
    let _ = is_parameter;
    if receiver.is_any() {
        return true;
    }
    if input.kind != receiver.kind {
        return false;
    }
    match receiver.kind {
        Kind::Object | Kind::Enum => {
            if receiver.vendor == 0 && receiver.type_id == 0 {
                true
            } else {
                input.vendor == receiver.vendor && input.type_id == receiver.type_id
            }
        }
        Kind::Sequence => {
            if !strict {
                return true;
            }
            if receiver.fixed_size != 0 && input.fixed_size < receiver.fixed_size {
                return false;
            }
            if input.element_types.is_empty() {
                return receiver.element_types.iter().any(|t| t.is_any());
            }
            input
                .element_types
                .iter()
                .all(|it| receiver.element_types.iter().any(|rt| match_types(it, rt, false, strict)))
        }
        Kind::Set => {
            if !strict {
                return true;
            }
            if input.element_types.is_empty() {
                return receiver.element_types.iter().any(|t| t.is_any());
            }
            input
                .element_types
                .iter()
                .all(|it| receiver.element_types.iter().any(|rt| match_types(it, rt, false, strict)))
        }
        Kind::Table => {
            if !strict {
                return true;
            }
            if receiver.table_keys.is_empty() {
                return input
                    .table_types
                    .iter()
                    .all(|it| receiver.table_types.iter().any(|rt| match_types(it, rt, false, strict)));
            }
            let sentinel = Type::extra_keys_sentinel();
            let has_sentinel = receiver.table_keys.last().map(|k| k.values_equal(&sentinel)).unwrap_or(false);
            for (ik, it) in input.table_keys.iter().zip(input.table_types.iter()) {
                let pos = receiver.table_keys.iter().position(|rk| rk.values_equal(ik));
                match pos {
                    Some(i) => {
                        if !match_types(it, &receiver.table_types[i], false, strict) {
                            return false;
                        }
                    }
                    None => {
                        if has_sentinel {
                            let sentinel_ty = receiver.table_types.last().unwrap();
                            if !match_types(it, sentinel_ty, false, strict) {
                                return false;
                            }
                        } else {
                            return false;
                        }
                    }
                }
            }
            true
        }
        _ => true,
    }
}

/// `deriveTypeInfo(value, shared)` — §4.B. Produces the narrowest Type that
/// describes `value`, resolving `ContextVar` against `shared`.
pub fn derive_type_info(value: &Value, shared: &dyn ExposedTypes) -> Result<Type, TypeError> {
    Ok(match value {
        Value::None => Type::none(),
        Value::Any => Type::any(),
        Value::Bool(_) => Type::bool_(),
        Value::Int(_) => Type::int(),
        Value::IntVec(v) => {
            let mut t = Type::of_kind(Kind::IntVec);
            t.fixed_size = v.len() as u32;
            t
        }
        Value::Float(_) => Type::float(),
        Value::FloatVec(v) => {
            let mut t = Type::of_kind(Kind::FloatVec);
            t.fixed_size = v.len() as u32;
            t
        }
        Value::Color(_) => Type::of_kind(Kind::Color),
        Value::Bytes(_) => Type::of_kind(Kind::Bytes),
        Value::String(_) => Type::string(),
        Value::Path(_) => Type::of_kind(Kind::Path),
        Value::ContextVar(name) => shared
            .lookup(name)
            .ok_or_else(|| TypeError::UnresolvedContextVar(name.clone()))?,
        Value::Enum(e) => Type::enum_(e.vendor, e.type_id),
        Value::Object(o) => Type::object(o.vendor, o.type_id),
        Value::Image(_) => Type::of_kind(Kind::Image),
        Value::Audio(_) => Type::of_kind(Kind::Audio),
        Value::Sequence(items) => {
            let mut elem_types: Vec<Type> = Vec::new();
            for item in items {
                let t = derive_type_info(item, shared)?;
                if !elem_types.iter().any(|e| *e == t) {
                    elem_types.push(t);
                }
            }
            Type::sequence_of(elem_types)
        }
        Value::Table(map) => {
            let mut t = Type::of_kind(Kind::Table);
            for (k, v) in map {
                t.table_keys.push(k.clone());
                t.table_types.push(derive_type_info(v, shared)?);
            }
            t
        }
        Value::Set(items) => {
            let mut elem_types: Vec<Type> = Vec::new();
            for item in items {
                let t = derive_type_info(item, shared)?;
                if !elem_types.iter().any(|e| *e == t) {
                    elem_types.push(t);
                }
            }
            let mut t = Type::of_kind(Kind::Set);
            t.element_types = elem_types;
            t
        }
        Value::WireRef(_) => Type::of_kind(Kind::WireRef),
        Value::ShardRef(_) => Type::of_kind(Kind::ShardRef),
        Value::TypeRef(_) => Type::of_kind(Kind::TypeRef),
        Value::Array(arr) => {
            let mut t = Type::of_kind(Kind::Array);
            t.element_types = vec![Type::of_kind(*arr.elem_kind)];
            t
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_receiver_absorbs_everything() {
        assert!(match_types(&Type::int(), &Type::any(), false, true));
        assert!(match_types(&Type::sequence_of(vec![]), &Type::any(), false, true));
    }

    #[test]
    fn match_is_reflexive_on_concrete_types() {
        let t = Type::int();
        assert!(match_types(&t, &t, false, true));
        let seq = Type::sequence_of(vec![Type::int()]);
        assert!(match_types(&seq, &seq, false, true));
    }

    #[test]
    fn mismatched_kinds_never_match() {
        assert!(!match_types(&Type::int(), &Type::string(), false, true));
    }

    #[test]
    fn object_vendor_zero_receiver_accepts_any_object() {
        let wildcard = Type::object(0, 0);
        let concrete = Type::object(7, 3);
        assert!(match_types(&concrete, &wildcard, false, true));
        let other = Type::object(1, 1);
        assert!(!match_types(&other, &concrete, false, true));
    }

    #[test]
    fn sequence_fixed_size_is_a_lower_bound() {
        let mut receiver = Type::sequence_of(vec![Type::int()]);
        receiver.fixed_size = 3;
        let mut short = Type::sequence_of(vec![Type::int()]);
        short.fixed_size = 2;
        assert!(!match_types(&short, &receiver, false, true));
        let mut long_enough = Type::sequence_of(vec![Type::int()]);
        long_enough.fixed_size = 3;
        assert!(match_types(&long_enough, &receiver, false, true));
    }

    #[test]
    fn table_sentinel_allows_extra_keys() {
        let mut receiver = Type::of_kind(Kind::Table);
        receiver.table_keys = vec![Value::String("x".into()), Type::extra_keys_sentinel()];
        receiver.table_types = vec![Type::int(), Type::any()];

        let mut input = Type::of_kind(Kind::Table);
        input.table_keys = vec![Value::String("x".into()), Value::String("y".into())];
        input.table_types = vec![Type::int(), Type::string()];

        assert!(match_types(&input, &receiver, false, true));
    }

    #[test]
    fn table_without_sentinel_rejects_unknown_keys() {
        let mut receiver = Type::of_kind(Kind::Table);
        receiver.table_keys = vec![Value::String("x".into())];
        receiver.table_types = vec![Type::int()];

        let mut input = Type::of_kind(Kind::Table);
        input.table_keys = vec![Value::String("x".into()), Value::String("y".into())];
        input.table_types = vec![Type::int(), Type::string()];

        assert!(!match_types(&input, &receiver, false, true));
    }

    #[test]
    fn derive_type_info_resolves_context_var() {
        let mut shared = std::collections::HashMap::new();
        shared.insert("x".to_string(), Type::int());
        let v = Value::ContextVar("x".to_string());
        assert_eq!(derive_type_info(&v, &shared).unwrap(), Type::int());
    }

    #[test]
    fn derive_type_info_fails_on_unresolved_context_var() {
        let shared = std::collections::HashMap::new();
        let v = Value::ContextVar("missing".to_string());
        assert!(matches!(
            derive_type_info(&v, &shared),
            Err(TypeError::UnresolvedContextVar(_))
        ));
    }

    #[test]
    fn type_hash_is_invariant_under_sequence_element_permutation() {
        let a = Type::sequence_of(vec![Type::int(), Type::string()]);
        let b = Type::sequence_of(vec![Type::string(), Type::int()]);
        assert_eq!(a.type_hash(), b.type_hash());
    }

    #[test]
    fn recursive_marker_hashes_as_single_bit() {
        let a = Type::recursive_self_marker();
        let b = Type::recursive_self_marker();
        assert_eq!(a.type_hash(), b.type_hash());
        assert_ne!(a.type_hash(), Type::any().type_hash());
    }
}
