use std::hash::{BuildHasher, Hasher};

use super::*;

#[test]
fn test_fnv32a() {
    // digests for the canonical FNV-1a test vectors.
    assert_eq!(fnv32a(b""), 0x811c9dc5);
    assert_eq!(fnv32a(b"a"), 0xe40c292c);
    assert_eq!(fnv32a(b"foobar"), 0xbf9cf968);
}

#[test]
fn test_fnv32a_sensitivity() {
    let digest = fnv32a(b"hello-world");

    let mut corrupt = b"hello-world".to_vec();
    corrupt[3] ^= 0x01;
    assert_ne!(digest, fnv32a(&corrupt));
}

#[test]
fn test_fnv32a_hasher() {
    let mut hasher = Fnv32a::new().build_hasher();
    hasher.write(b"foobar");
    assert_eq!(hasher.finish(), u64::from(fnv32a(b"foobar")));
}
