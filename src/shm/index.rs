//! Module implement the chained hash index living inside the mapped
//! file.
//!
//! A fixed array of bucket offsets sits in the file header, each
//! bucket heading a singly-linked chain of USED records through the
//! entry's `key_next` field. The bucket is picked by the handler's
//! hash over the payload, modulo the bucket count.

use std::cmp::Ordering;

use crate::shm::{read_word, write_word, ShmHandler, ENT_KEY_NEXT, ENT_PAYLOAD, HDR_BUCKETS, W};

/// Hash index over a mapped region, buckets in the header.
pub struct HashIndex {
    max_bucket: usize,
    item_size: usize,
    n_count: usize,
}

impl HashIndex {
    pub fn new(max_bucket: usize, item_size: usize) -> HashIndex {
        HashIndex { max_bucket, item_size, n_count: 0 }
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    #[inline]
    pub fn max_bucket(&self) -> usize {
        self.max_bucket
    }

    #[inline]
    pub fn bucket_off(&self, bucket: usize) -> usize {
        HDR_BUCKETS + bucket * W
    }

    #[inline]
    pub fn payload_of<'a>(&self, region: &'a [u8], off: usize) -> &'a [u8] {
        &region[off + ENT_PAYLOAD..off + ENT_PAYLOAD + self.item_size]
    }

    /// Recount the live entries by walking every chain, used after a
    /// rebuild from a cold mapping.
    pub fn attach(&mut self, hdr: &[u8], region: &[u8]) {
        self.n_count = 0;
        for bucket in 0..self.max_bucket {
            let mut off = read_word(hdr, self.bucket_off(bucket));
            while off > 0 {
                self.n_count += 1;
                off = read_word(region, off + ENT_KEY_NEXT);
            }
        }
    }

    /// Prepend the entry at `off` to its bucket's chain.
    pub fn put<H>(&mut self, hdr: &mut [u8], region: &mut [u8], handler: &H, off: usize)
    where
        H: ShmHandler,
    {
        let bucket = {
            let payload = self.payload_of(region, off);
            (handler.hash(payload) as usize) % self.max_bucket
        };

        let head = read_word(hdr, self.bucket_off(bucket));
        write_word(region, off + ENT_KEY_NEXT, head);
        write_word(hdr, self.bucket_off(bucket), off);

        self.n_count += 1;
    }

    /// Walk the chain for `key`, return the entry offset on a match.
    pub fn get<H>(&self, hdr: &[u8], region: &[u8], handler: &H, key: &[u8]) -> Option<usize>
    where
        H: ShmHandler,
    {
        let bucket = (handler.hash(key) as usize) % self.max_bucket;

        let mut off = read_word(hdr, self.bucket_off(bucket));
        while off > 0 {
            if handler.compare(self.payload_of(region, off), key) == Ordering::Equal {
                return Some(off);
            }
            off = read_word(region, off + ENT_KEY_NEXT);
        }

        None
    }

    /// Unlink the entry matching `key` from its chain and return its
    /// offset. The record itself is left to the caller.
    pub fn remove<H>(
        &mut self,
        hdr: &mut [u8],
        region: &mut [u8],
        handler: &H,
        key: &[u8],
    ) -> Option<usize>
    where
        H: ShmHandler,
    {
        let bucket = (handler.hash(key) as usize) % self.max_bucket;

        // the link being rewritten is either the bucket slot in the
        // header or a predecessor's key_next in the region.
        let mut link_in_hdr = true;
        let mut link_off = self.bucket_off(bucket);
        loop {
            let cur = if link_in_hdr {
                read_word(hdr, link_off)
            } else {
                read_word(region, link_off)
            };
            if cur == 0 {
                return None;
            }

            if handler.compare(self.payload_of(region, cur), key) == Ordering::Equal {
                let next = read_word(region, cur + ENT_KEY_NEXT);
                if link_in_hdr {
                    write_word(hdr, link_off, next);
                } else {
                    write_word(region, link_off, next);
                }
                write_word(region, cur + ENT_KEY_NEXT, 0);
                self.n_count -= 1;
                return Some(cur);
            }

            link_in_hdr = false;
            link_off = cur + ENT_KEY_NEXT;
        }
    }
}
