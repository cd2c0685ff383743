//! The dynamic [`Value`] variant.
//!
//! `Value` is pure data: it owns its payload and never points back into the
//! scheduler. Refcounting, flag bits and the mutation-version counter that
//! the specification attaches to "a Value" live one layer up, on the
//! variable cell that wraps a `Value` inside a wire or mesh scope (see
//! `loom_runtime::variable::Cell`) — mirroring how the teacher crate keeps
//! its own `Value` free of stack-node bookkeeping.

use crate::hash::{Digest, Hash128, hash_unordered};
use indexmap::{IndexMap, IndexSet};
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Weak};

/// Epsilon used for float/float-vector equality, matching the "within one
/// machine epsilon" rule in the spec.
pub const FLOAT_EPSILON: f64 = f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub vendor: u32,
    pub type_id: u32,
    pub value: i64,
}

/// An opaque foreign object. Compared and hashed by pointer identity, as the
/// spec requires ("Object compares pointer identity"). The optional vtable
/// hook lets a foreign type plug custom clone/destroy behavior in later
/// without loom-core needing to know about it.
#[derive(Clone)]
pub struct ObjectValue {
    pub vendor: u32,
    pub type_id: u32,
    pub data: Arc<dyn std::any::Any + Send + Sync>,
    pub vtable: Option<Arc<dyn ObjectVTable>>,
}

pub trait ObjectVTable: Send + Sync {
    fn clone_object(&self, data: &Arc<dyn std::any::Any + Send + Sync>) -> Arc<dyn std::any::Any + Send + Sync>;
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValue")
            .field("vendor", &self.vendor)
            .field("type_id", &self.type_id)
            .field("ptr", &Arc::as_ptr(&self.data))
            .finish()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}
impl Eq for ObjectValue {}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageValue {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub flags: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioValue {
    pub rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioValue {
    pub fn nsamples(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// A weak handle to a wire living in some mesh. `loom-core` cannot name
/// `loom_runtime::Wire` directly (runtime depends on core, not the reverse),
/// so the handle is a type-erased weak pointer that the runtime downcasts.
#[derive(Clone)]
pub struct WireHandle(pub Weak<dyn std::any::Any + Send + Sync>);

impl fmt::Debug for WireHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireHandle({:p})", self.0.as_ptr())
    }
}
impl PartialEq for WireHandle {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for WireHandle {}

/// A strong handle to a shard instance. Shards are exclusively owned by
/// refcount (per the spec); a `ShardRef` value is one more strong reference.
#[derive(Clone)]
pub struct ShardHandle(pub Arc<dyn std::any::Any + Send + Sync>);

impl fmt::Debug for ShardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardHandle({:p})", Arc::as_ptr(&self.0))
    }
}
impl PartialEq for ShardHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for ShardHandle {}

/// A packed homogeneous array: every element shares `elem_kind`. This is the
/// Rust stand-in for the source's packed-payload `Array` kind; loom does not
/// reproduce the C layout, only the "all elements share one kind" contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub elem_kind: Box<crate::type_::Kind>,
    pub elements: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Any,
    Bool(bool),
    Int(i64),
    /// Int2..Int16: a fixed-width integer vector, length in {2,3,4,8,16}.
    IntVec(Vec<i64>),
    Float(f64),
    /// Float2..Float4: length in {2,3,4}.
    FloatVec(Vec<f64>),
    Color(Color),
    Bytes(Vec<u8>),
    String(String),
    Path(String),
    /// An unresolved reference to an exposed variable by name; resolved at
    /// compose time via `deriveTypeInfo`.
    ContextVar(String),
    Enum(EnumValue),
    Object(ObjectValue),
    Image(ImageValue),
    Audio(AudioValue),
    Sequence(Vec<Value>),
    Table(IndexMap<Value, Value>),
    Set(IndexSet<Value>),
    WireRef(WireHandle),
    ShardRef(ShardHandle),
    TypeRef(Box<crate::type_::Type>),
    Array(ArrayValue),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Comparing (via `<`) two values of a kind that has no total order
    /// (Object, ShardRef, WireRef, Any).
    NotOrderable { kind: &'static str },
    /// `<` between two Bytes of differing length.
    IncomparableLength,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::NotOrderable { kind } => write!(f, "values of kind {kind} have no total order"),
            ValueError::IncomparableLength => write!(f, "byte strings of different length are not comparable"),
        }
    }
}
impl std::error::Error for ValueError {}

fn float_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= FLOAT_EPSILON
}

fn vec_eq<T: Copy + PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

fn float_vec_eq(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| float_eq(*x, *y))
}

impl Value {
    /// Structural equality per §4.A. `PartialEq`/`Eq` below delegate here so
    /// `Value` can be used directly as an `IndexMap`/`IndexSet` key for
    /// `Table`/`Set`.
    pub fn values_equal(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (Any, Any) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (IntVec(a), IntVec(b)) => vec_eq(a, b),
            (Float(a), Float(b)) => float_eq(*a, *b),
            (FloatVec(a), FloatVec(b)) => float_vec_eq(a, b),
            (Color(a), Color(b)) => a == b,
            (Bytes(a), Bytes(b)) => a.len() == b.len() && a == b,
            (String(a), String(b)) => std::ptr::eq(a.as_str(), b.as_str()) || a == b,
            (Path(a), Path(b)) => a == b,
            (ContextVar(a), ContextVar(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            (Image(a), Image(b)) => {
                a.width == b.width
                    && a.height == b.height
                    && a.channels == b.channels
                    && a.data == b.data
            }
            (Audio(a), Audio(b)) => {
                a.rate == b.rate && a.channels == b.channels && a.nsamples() == b.nsamples() && a.samples == b.samples
            }
            (Sequence(a), Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.values_equal(y))
            }
            (Table(a), Table(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka.values_equal(kb) && va.values_equal(vb))
            }
            (Set(a), Set(b)) => {
                a.len() == b.len() && {
                    let ha: std::collections::HashSet<u128> =
                        a.iter().map(|v| v.value_hash().as_u128()).collect();
                    let hb: std::collections::HashSet<u128> =
                        b.iter().map(|v| v.value_hash().as_u128()).collect();
                    ha == hb
                }
            }
            (WireRef(a), WireRef(b)) => a == b,
            (ShardRef(a), ShardRef(b)) => a == b,
            (TypeRef(a), TypeRef(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            _ => false,
        }
    }

    /// Total order where one exists, per §4.A's ordering table.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ValueError> {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => Ok(a.cmp(b)),
            (Int(a), Int(b)) => Ok(a.cmp(b)),
            (IntVec(a), IntVec(b)) => {
                // "all lanes strictly less" normalisation (§9 open question),
                // same as `FloatVec` below.
                if a.len() != b.len() {
                    return Err(ValueError::IncomparableLength);
                }
                if a.iter().zip(b).all(|(x, y)| x < y) {
                    Ok(Ordering::Less)
                } else if a.iter().zip(b).all(|(x, y)| x > y) {
                    Ok(Ordering::Greater)
                } else if vec_eq(a, b) {
                    Ok(Ordering::Equal)
                } else {
                    Err(ValueError::NotOrderable { kind: "IntVec" })
                }
            }
            (Float(a), Float(b)) => a.partial_cmp(b).ok_or(ValueError::NotOrderable { kind: "Float" }),
            (FloatVec(a), FloatVec(b)) => {
                // "all lanes strictly less" normalisation (§9 open question).
                if a.len() != b.len() {
                    return Err(ValueError::IncomparableLength);
                }
                if a.iter().zip(b).all(|(x, y)| x < y) {
                    Ok(Ordering::Less)
                } else if a.iter().zip(b).all(|(x, y)| x > y) {
                    Ok(Ordering::Greater)
                } else if float_vec_eq(a, b) {
                    Ok(Ordering::Equal)
                } else {
                    Err(ValueError::NotOrderable { kind: "FloatVec" })
                }
            }
            (Bytes(a), Bytes(b)) => {
                if a.len() != b.len() {
                    Err(ValueError::IncomparableLength)
                } else {
                    Ok(a.cmp(b))
                }
            }
            (String(a), String(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            (Path(a), Path(b)) => Ok(a.as_bytes().cmp(b.as_bytes())),
            (Sequence(a), Sequence(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        other => return Ok(other),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (Table(a), Table(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    match ka.compare(kb)? {
                        Ordering::Equal => {}
                        other => return Ok(other),
                    }
                    match va.compare(vb)? {
                        Ordering::Equal => continue,
                        other => return Ok(other),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => {
                Err(ValueError::NotOrderable { kind: a.kind_name() })
            }
            _ => Err(ValueError::NotOrderable { kind: "mismatched" }),
        }
    }

    /// Deterministic XXH3-128 hash per §4.A: kind byte first, then body.
    pub fn value_hash(&self) -> Hash128 {
        let mut d = Digest::new();
        d.update_u8(self.kind_tag());
        match self {
            Value::None | Value::Any => {}
            Value::Bool(b) => {
                d.update_u8(*b as u8);
            }
            Value::Int(i) => {
                d.update_i64(*i);
            }
            Value::IntVec(v) => {
                for x in v {
                    d.update_i64(*x);
                }
            }
            Value::Float(f) => {
                d.update_f64(*f);
            }
            Value::FloatVec(v) => {
                for x in v {
                    d.update_f64(*x);
                }
            }
            Value::Color(c) => {
                d.update(&[c.r, c.g, c.b, c.a]);
            }
            Value::Bytes(b) => {
                d.update_u64(b.len() as u64);
                d.update(b);
            }
            Value::String(s) | Value::Path(s) | Value::ContextVar(s) => {
                d.update(s.as_bytes());
            }
            Value::Enum(e) => {
                d.update_u32(e.vendor).update_u32(e.type_id).update_i64(e.value);
            }
            Value::Object(o) => {
                d.update_u64(Arc::as_ptr(&o.data) as *const () as u64);
            }
            Value::Image(img) => {
                d.update_u32(img.width)
                    .update_u32(img.height)
                    .update_u8(img.channels)
                    .update(&img.data);
            }
            Value::Audio(a) => {
                d.update_u32(a.rate);
                for s in &a.samples {
                    d.update_f64(*s as f64);
                }
            }
            Value::Sequence(seq) => {
                for v in seq {
                    d.update_hash128(v.value_hash());
                }
            }
            Value::Table(map) => {
                for (k, v) in map {
                    d.update_hash128(k.value_hash());
                    d.update_hash128(v.value_hash());
                }
            }
            Value::Set(set) => {
                let digests: Vec<Hash128> = set.iter().map(|v| v.value_hash()).collect();
                d.update_hash128(hash_unordered(digests));
            }
            Value::WireRef(w) => {
                d.update_u64(w.0.as_ptr() as *const () as u64);
            }
            Value::ShardRef(s) => {
                d.update_u64(Arc::as_ptr(&s.0) as *const () as u64);
            }
            Value::TypeRef(t) => {
                d.update_hash128(t.type_hash());
            }
            Value::Array(arr) => {
                for v in &arr.elements {
                    d.update_hash128(v.value_hash());
                }
            }
        }
        d.finish()
    }

    fn kind_tag(&self) -> u8 {
        match self {
            Value::None => 0,
            Value::Any => 1,
            Value::Bool(_) => 2,
            Value::Int(_) => 3,
            Value::IntVec(_) => 4,
            Value::Float(_) => 5,
            Value::FloatVec(_) => 6,
            Value::Color(_) => 7,
            Value::Bytes(_) => 8,
            Value::String(_) => 9,
            Value::Path(_) => 10,
            Value::ContextVar(_) => 11,
            Value::Enum(_) => 12,
            Value::Object(_) => 13,
            Value::Image(_) => 14,
            Value::Audio(_) => 15,
            Value::Sequence(_) => 16,
            Value::Table(_) => 17,
            Value::Set(_) => 18,
            Value::WireRef(_) => 19,
            Value::ShardRef(_) => 20,
            Value::TypeRef(_) => 21,
            Value::Array(_) => 22,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Any => "Any",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::IntVec(_) => "IntVec",
            Value::Float(_) => "Float",
            Value::FloatVec(_) => "FloatVec",
            Value::Color(_) => "Color",
            Value::Bytes(_) => "Bytes",
            Value::String(_) => "String",
            Value::Path(_) => "Path",
            Value::ContextVar(_) => "ContextVar",
            Value::Enum(_) => "Enum",
            Value::Object(_) => "Object",
            Value::Image(_) => "Image",
            Value::Audio(_) => "Audio",
            Value::Sequence(_) => "Sequence",
            Value::Table(_) => "Table",
            Value::Set(_) => "Set",
            Value::WireRef(_) => "WireRef",
            Value::ShardRef(_) => "ShardRef",
            Value::TypeRef(_) => "TypeRef",
            Value::Array(_) => "Array",
        }
    }

    /// Deep clone that reuses `dest`'s existing allocation when the kinds
    /// match, instead of always allocating fresh — the "slot reuse" half of
    /// the clone contract in §4.A. `foreign` slots may not be cloned into.
    pub fn clone_into_slot(&self, dest: &mut Value, dest_is_foreign: bool) {
        assert!(!dest_is_foreign, "cannot clone into a foreign-flagged slot");
        match (self, &mut *dest) {
            (Value::String(src), Value::String(d)) => d.clone_from(src),
            (Value::Bytes(src), Value::Bytes(d)) => d.clone_from(src),
            (Value::IntVec(src), Value::IntVec(d)) => d.clone_from(src),
            (Value::FloatVec(src), Value::FloatVec(d)) => d.clone_from(src),
            (Value::Sequence(src), Value::Sequence(d)) => {
                d.resize_with(src.len(), || Value::None);
                for (s, slot) in src.iter().zip(d.iter_mut()) {
                    s.clone_into_slot(slot, false);
                }
            }
            (Value::Table(_), Value::Table(d)) => {
                // Same container instance is reused when the destination
                // already owns one (§4.A clone algorithm).
                let src_table = match self {
                    Value::Table(t) => t,
                    _ => unreachable!(),
                };
                d.clone_from(src_table);
            }
            (Value::Set(_), Value::Set(d)) => {
                let src_set = match self {
                    Value::Set(s) => s,
                    _ => unreachable!(),
                };
                d.clone_from(src_set);
            }
            _ => {
                *dest = self.clone();
            }
        }
    }

    /// Destroy is a no-op beyond ordinary drop glue in safe Rust — there is
    /// no separate "already destroyed" state to guard against, since an
    /// owned `Value` can't be dropped twice. Kept for vocabulary parity with
    /// the spec's explicit `destroy` verb.
    pub fn destroy(self) {
        drop(self)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }
}

impl PartialEq<Value> for &Value {
    fn eq(&self, other: &Value) -> bool {
        self.values_equal(other)
    }
}

impl Eq for Value {}

// Table/Set need Value to be a well-behaved map/set key. We delegate to the
// spec's own equality/hash (§8 property 3's "Table: insertion-order
// sensitive" and "Set: order-insensitive" guarantees come from `IndexMap`'s
// and `IndexSet`'s own insertion-order iteration plus these two impls).
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u128(self.value_hash().as_u128());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_equals_only_none() {
        assert!(Value::None.values_equal(&Value::None));
        assert!(!Value::None.values_equal(&Value::Any));
        assert!(!Value::None.values_equal(&Value::Int(0)));
    }

    #[test]
    fn float_equality_is_epsilon_tolerant() {
        let a = Value::Float(1.0);
        let b = Value::Float(1.0 + f64::EPSILON / 2.0);
        assert!(a.values_equal(&b));
    }

    #[test]
    fn equality_is_reflexive_and_symmetric_per_kind() {
        let samples = vec![
            Value::None,
            Value::Any,
            Value::Bool(true),
            Value::Int(42),
            Value::Float(3.5),
            Value::String("hi".into()),
            Value::Bytes(vec![1, 2, 3]),
            Value::Sequence(vec![Value::Int(1), Value::Int(2)]),
        ];
        for v in &samples {
            assert!(v.values_equal(v), "{:?} should equal itself", v);
        }
        for a in &samples {
            for b in &samples {
                assert_eq!(a.values_equal(b), b.values_equal(a));
            }
        }
    }

    #[test]
    fn sequence_equality_is_length_then_elementwise() {
        let a = Value::Sequence(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::Sequence(vec![Value::Int(1), Value::Int(2)]);
        let c = Value::Sequence(vec![Value::Int(1)]);
        assert!(a.values_equal(&b));
        assert!(!a.values_equal(&c));
    }

    #[test]
    fn clone_round_trip_preserves_source() {
        let src = Value::Sequence(vec![Value::String("a".into()), Value::Int(7)]);
        let cloned = src.clone();
        assert!(src.values_equal(&cloned));
        cloned.destroy();
        // source untouched by destroying the clone
        assert!(matches!(src, Value::Sequence(ref s) if s.len() == 2));
    }

    #[test]
    fn clone_into_slot_reuses_string_capacity() {
        let mut dest = Value::String(String::with_capacity(64));
        let cap_before = match &dest {
            Value::String(s) => s.capacity(),
            _ => unreachable!(),
        };
        let src = Value::String("short".into());
        src.clone_into_slot(&mut dest, false);
        let cap_after = match &dest {
            Value::String(s) => s.capacity(),
            _ => unreachable!(),
        };
        assert_eq!(cap_before, cap_after);
        assert!(dest.values_equal(&src));
    }

    #[test]
    fn hash_is_invariant_under_set_permutation() {
        let mut a = IndexSet::new();
        a.insert(Value::Int(1));
        a.insert(Value::Int(2));
        a.insert(Value::Int(3));
        let mut b = IndexSet::new();
        b.insert(Value::Int(3));
        b.insert(Value::Int(1));
        b.insert(Value::Int(2));
        let va = Value::Set(a);
        let vb = Value::Set(b);
        assert!(va.values_equal(&vb));
        assert_eq!(va.value_hash(), vb.value_hash());
    }

    #[test]
    fn hash_is_sensitive_to_table_insertion_order_but_stable_within_it() {
        let mut a = IndexMap::new();
        a.insert(Value::String("k1".into()), Value::Int(1));
        a.insert(Value::String("k2".into()), Value::Int(2));
        let mut a2 = IndexMap::new();
        a2.insert(Value::String("k1".into()), Value::Int(1));
        a2.insert(Value::String("k2".into()), Value::Int(2));
        assert_eq!(Value::Table(a).value_hash(), Value::Table(a2).value_hash());
    }

    #[test]
    fn ordering_raises_on_unorderable_kinds() {
        let err = Value::Any.compare(&Value::Any).unwrap_err();
        assert!(matches!(err, ValueError::NotOrderable { .. }));
    }

    #[test]
    fn bytes_of_differing_length_are_not_comparable() {
        let a = Value::Bytes(vec![1, 2]);
        let b = Value::Bytes(vec![1, 2, 3]);
        assert_eq!(a.compare(&b), Err(ValueError::IncomparableLength));
    }

    #[test]
    fn float_vector_ordering_is_all_lanes_strictly_less() {
        let a = Value::FloatVec(vec![1.0, 1.0]);
        let b = Value::FloatVec(vec![2.0, 2.0]);
        assert_eq!(a.compare(&b), Ok(Ordering::Less));
        let c = Value::FloatVec(vec![1.0, 3.0]);
        assert!(a.compare(&c).is_err());
    }

    #[test]
    fn int_vector_ordering_is_all_lanes_strictly_less() {
        let a = Value::IntVec(vec![1, 1]);
        let b = Value::IntVec(vec![2, 2]);
        assert_eq!(a.compare(&b), Ok(Ordering::Less));
        // Neither lane dominates — [1,5] vs [2,3] is not a lexicographic
        // comparison, it's incomparable under all-lanes ordering.
        let mixed_a = Value::IntVec(vec![1, 5]);
        let mixed_b = Value::IntVec(vec![2, 3]);
        assert!(mixed_a.compare(&mixed_b).is_err());
    }
}
