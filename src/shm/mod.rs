//! Module implement the shared-memory cache and queue.
//!
//! All state lives inside a memory-mapped file so that a process
//! restart, clean or not, loses nothing that can be verified. Links
//! between records are byte *offsets* from the start of the record
//! region, never pointers, so any process mapping the file at any
//! address can walk them. Offset 0 always means none.
//!
//! The record region is carved into fixed-size records by the
//! [alloc::Allocator]. Each record is one flag byte followed by an
//! *entry*, the entry header carries the evict-list links, the hash
//! chain link, a 32-bit FNV-1a checksum over the payload and an
//! expiration timestamp, then the fixed-size item payload. Integer
//! fields are host-native, the files are not portable across
//! architectures.
//!
//! On reopen nothing in the header is trusted beyond the metadata,
//! the hash index and evict list are rebuilt by walking every record
//! and dropping the ones whose stored checksum disagrees with their
//! payload bytes, refer [cache::ShmCache].

use std::{cmp::Ordering, convert::TryInto};

pub mod alloc;
pub mod cache;
pub mod evict;
pub mod index;
pub mod mmap;
#[cfg(unix)]
pub mod queue;

pub use cache::ShmCache;
#[cfg(unix)]
pub use queue::ShmQueue;

/// native word width, the offset fields in the file are this wide.
pub(crate) const W: usize = std::mem::size_of::<usize>();

// file header layout.
pub(crate) const HDR_MAGIC0: usize = 0;
pub(crate) const HDR_MAGIC1: usize = 1;
pub(crate) const HDR_LEN: usize = 2;
pub(crate) const HDR_MAX_BUCKET: usize = 2 + W;
pub(crate) const HDR_ITEM_SIZE: usize = 2 + 2 * W;
pub(crate) const HDR_EVICT_HEAD: usize = 2 + 3 * W;
pub(crate) const HDR_EVICT_TAIL: usize = 2 + 4 * W;
pub(crate) const HDR_BUCKETS: usize = 2 + 5 * W;

// entry layout, relative to the entry offset (record start + 1).
pub(crate) const ENT_EVICT_PREV: usize = 0;
pub(crate) const ENT_EVICT_NEXT: usize = W;
pub(crate) const ENT_KEY_NEXT: usize = 2 * W;
pub(crate) const ENT_CHECKSUM: usize = 3 * W;
pub(crate) const ENT_EXP_TIME: usize = 3 * W + 4;
pub(crate) const ENT_PAYLOAD: usize = 3 * W + 12;

// record flags. record 0 keeps flag 0, it only anchors the free list.
pub(crate) const FLAG_FREE: u8 = 0x01;
pub(crate) const FLAG_USED: u8 = 0x02;

/// Bytes one record occupies for `item_size`-byte items, flag byte
/// plus entry header plus payload. Useful to size a region for a
/// record count, remembering that record 0 is reserved.
pub fn record_size(item_size: usize) -> usize {
    1 + ENT_PAYLOAD + item_size
}

/// Whether an [cache::ShmCache::init] call created the file fresh or
/// reused an existing one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Opened {
    Created,
    Reused,
}

/// Trait supply the shared-memory cache callbacks, over fixed-size
/// byte payloads.
///
/// `hash` picks the bucket, the stock choice is [crate::hash::fnv32a]
/// over the item's key bytes. `compare` must treat two payloads with
/// the same key as Equal. The dump hooks feed [cache::ShmCache]'s
/// diagnostic walks and default to nothing.
pub trait ShmHandler {
    type Out;

    fn hash(&self, item: &[u8]) -> u32;

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    fn on_hit(&self, item: &[u8], out: &mut Self::Out);

    fn on_destroy(&self, _item: &[u8]) {}

    fn on_dump_hash(&self, _bucket: usize, _item: &[u8]) {}

    fn on_dump_evict(&self, _exp_time: i64, _item: &[u8]) {}
}

// field accessors over mapped bytes, host-native encoding.

pub(crate) fn read_word(buf: &[u8], off: usize) -> usize {
    usize::from_ne_bytes(buf[off..off + W].try_into().unwrap())
}

pub(crate) fn write_word(buf: &mut [u8], off: usize, val: usize) {
    buf[off..off + W].copy_from_slice(&val.to_ne_bytes())
}

pub(crate) fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_ne_bytes(buf[off..off + 4].try_into().unwrap())
}

pub(crate) fn write_u32(buf: &mut [u8], off: usize, val: u32) {
    buf[off..off + 4].copy_from_slice(&val.to_ne_bytes())
}

pub(crate) fn read_i64(buf: &[u8], off: usize) -> i64 {
    i64::from_ne_bytes(buf[off..off + 8].try_into().unwrap())
}

pub(crate) fn write_i64(buf: &mut [u8], off: usize, val: i64) {
    buf[off..off + 8].copy_from_slice(&val.to_ne_bytes())
}

pub(crate) fn read_i32(buf: &[u8], off: usize) -> i32 {
    i32::from_ne_bytes(buf[off..off + 4].try_into().unwrap())
}

pub(crate) fn write_i32(buf: &mut [u8], off: usize, val: i32) {
    buf[off..off + 4].copy_from_slice(&val.to_ne_bytes())
}
