//! Module implement 32-bit FNV-1a hashing.
//!
//! The same digest serves two purposes in the shared-memory cache,
//! bucket selection for the hash index and per-record integrity
//! checksums, so the algorithm is part of the on-disk format and is
//! implemented here rather than pulled from a crate that only ships
//! the 64-bit variant.

use std::hash::{BuildHasher, Hasher};

pub const FNV32_INIT: u32 = 2_166_136_261;
pub const FNV32_PRIME: u32 = 16_777_619;

/// Fold `bytes` into a 32-bit FNV-1a digest, xor each byte then
/// multiply by the FNV prime.
pub fn fnv32a(bytes: &[u8]) -> u32 {
    let mut digest = FNV32_INIT;

    for byte in bytes.iter() {
        digest ^= u32::from(*byte);
        digest = digest.wrapping_mul(FNV32_PRIME);
    }

    digest
}

/// Type implement [BuildHasher] and [Hasher] over [fnv32a], for
/// callers that want to plug the same digest into std collections.
#[derive(Clone, Copy)]
pub struct Fnv32a {
    digest: u32,
}

impl Default for Fnv32a {
    fn default() -> Fnv32a {
        Fnv32a { digest: FNV32_INIT }
    }
}

impl Fnv32a {
    pub fn new() -> Fnv32a {
        Fnv32a::default()
    }
}

impl BuildHasher for Fnv32a {
    type Hasher = Self;

    #[inline]
    fn build_hasher(&self) -> Self {
        *self
    }
}

impl Hasher for Fnv32a {
    fn finish(&self) -> u64 {
        u64::from(self.digest)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter() {
            self.digest ^= u32::from(*byte);
            self.digest = self.digest.wrapping_mul(FNV32_PRIME);
        }
    }
}

#[cfg(test)]
#[path = "hash_test.rs"]
mod hash_test;
