//! Deterministic 128-bit hashing used by both `Value` and `Type`.
//!
//! Everything funnels through XXH3-128 so that two independently-built
//! `Value`s (or `Type`s) that compare equal always hash equal, across
//! processes and platforms — the composer and the variable environment both
//! rely on this for their hash-keyed caches.

use xxhash_rust::xxh3::Xxh3;

/// A 128-bit digest. Wrapping the raw `u128` keeps call sites from
/// accidentally mixing a content hash with an unrelated integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash128(pub u128);

impl Hash128 {
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

/// Incremental digest builder. Kind-specific hash implementations feed their
/// payload through this in a fixed order (tag byte first, then body) so the
/// resulting digest is sensitive to type confusion (`Int(1)` and `Bool(true)`
/// never collide even though their payload bytes may coincide).
pub struct Digest(Xxh3);

impl Digest {
    pub fn new() -> Self {
        Digest(Xxh3::new())
    }

    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update(bytes);
        self
    }

    pub fn update_u8(&mut self, v: u8) -> &mut Self {
        self.update(&[v])
    }

    pub fn update_u32(&mut self, v: u32) -> &mut Self {
        self.update(&v.to_le_bytes())
    }

    pub fn update_u64(&mut self, v: u64) -> &mut Self {
        self.update(&v.to_le_bytes())
    }

    pub fn update_i64(&mut self, v: i64) -> &mut Self {
        self.update(&v.to_le_bytes())
    }

    pub fn update_f64(&mut self, v: f64) -> &mut Self {
        // NaN has many bit patterns; canonicalize so hash(v) is stable for
        // any NaN even though NaN never compares equal to itself under the
        // value model's own equality (see `Value::values_equal`).
        let bits = if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() };
        self.update(&bits.to_le_bytes())
    }

    pub fn update_hash128(&mut self, h: Hash128) -> &mut Self {
        self.update(&h.0.to_le_bytes())
    }

    pub fn finish(&self) -> Hash128 {
        Hash128(self.0.digest128())
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a set of element digests order-insensitively (used by `Set` and, for
/// type hashing, by `Sequence`/`Set` type element sets). Sorting the digests
/// before feeding them into the outer hasher makes the result invariant under
/// any permutation of the elements.
pub fn hash_unordered(mut digests: Vec<Hash128>) -> Hash128 {
    digests.sort_unstable();
    let mut d = Digest::new();
    for h in digests {
        d.update_hash128(h);
    }
    d.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let mut a = Digest::new();
        a.update_u8(1).update_i64(42);
        let mut b = Digest::new();
        b.update_u8(1).update_i64(42);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn digest_distinguishes_tag_from_payload() {
        let mut int_one = Digest::new();
        int_one.update_u8(0).update_i64(1);
        let mut bool_true = Digest::new();
        bool_true.update_u8(1).update_i64(1);
        assert_ne!(int_one.finish(), bool_true.finish());
    }

    #[test]
    fn hash_unordered_ignores_permutation() {
        let a = Hash128(1);
        let b = Hash128(2);
        let c = Hash128(3);
        assert_eq!(
            hash_unordered(vec![a, b, c]),
            hash_unordered(vec![c, a, b])
        );
    }

    #[test]
    fn nan_hashes_stably() {
        let mut a = Digest::new();
        a.update_f64(f64::NAN);
        let mut b = Digest::new();
        b.update_f64(-f64::NAN);
        assert_eq!(a.finish(), b.finish());
    }
}
