//! Fast, non-cryptographic hashing for small keys like handles and native
//! object ids.

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hasher};

/// A `HashMap` using a fast, non-cryptographic hash algorithm.
pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FxHasher>>;
/// A `HashSet` using a fast, non-cryptographic hash algorithm.
pub type FastHashSet<K> = HashSet<K, BuildHasherDefault<FxHasher>>;

const SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

/// The hash algorithm used in rustc, based on FireFox's string hasher. It is
/// not resistant against hash flooding, but we only feed it device-internal
/// keys (handles, native ids), never untrusted input.
#[derive(Default)]
pub struct FxHasher {
    hash: u64,
}

impl FxHasher {
    #[inline]
    fn add_to_hash(&mut self, i: u64) {
        self.hash = (self.hash.rotate_left(5) ^ i).wrapping_mul(SEED);
    }
}

impl Hasher for FxHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.add_to_hash(u64::from(*byte));
        }
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.add_to_hash(u64::from(i));
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.add_to_hash(u64::from(i));
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.add_to_hash(u64::from(i));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.add_to_hash(i);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.add_to_hash(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }
}

#[cfg(test)]
mod test {
    use std::hash::Hash;

    use super::*;

    fn hash64<T: Hash>(t: &T) -> u64 {
        let mut s = FxHasher::default();
        t.hash(&mut s);
        s.finish()
    }

    #[test]
    fn deterministic() {
        assert_eq!(hash64(&(1u32, 2u32)), hash64(&(1u32, 2u32)));
        assert_ne!(hash64(&(1u32, 2u32)), hash64(&(2u32, 1u32)));
    }

    #[test]
    fn collections() {
        let mut set = FastHashSet::default();
        set.insert("radiant");
        set.insert("radiant");
        assert_eq!(set.len(), 1);
    }
}
