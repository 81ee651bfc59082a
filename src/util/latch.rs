//! Module `latch` implement a read-write latch-and-spin lock.
//!
//! Cache operations that need exclusion are short, a handful of pointer
//! rewrites and one comparator walk, so waiting callers spin instead of
//! parking. Readers enter whenever no writer holds or wants the latch.
//! A writer first flips the latch bit, which stops new readers, then
//! spins for the active readers to drain before flipping the lock bit
//! and entering alone.

use std::{
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
    result,
    sync::atomic::{AtomicU32, AtomicUsize, Ordering::SeqCst},
};

/// Type implement latch-and-spin read-write exclusion around a value.
///
/// The `u32` state packs a reader count in the low bits, the latch flag
/// at bit 30 and the lock flag at bit 31.
pub struct RwLatch<T> {
    state: AtomicU32,
    n_reads: AtomicUsize,
    n_writes: AtomicUsize,
    n_conflicts: AtomicUsize,

    value: UnsafeCell<T>,
}

// Guards hand out &T/&mut T only under the latch protocol.
unsafe impl<T: Send> Send for RwLatch<T> {}
unsafe impl<T: Send + Sync> Sync for RwLatch<T> {}

impl<T> RwLatch<T> {
    const LATCH_FLAG: u32 = 0x4000_0000;
    const LOCK_FLAG: u32 = 0x8000_0000;
    const LATCH_LOCK_FLAG: u32 = 0xC000_0000;
    const READERS_FLAG: u32 = 0x3FFF_FFFF;

    pub fn new(value: T) -> RwLatch<T> {
        RwLatch {
            state: AtomicU32::new(0),
            n_reads: AtomicUsize::new(0),
            n_writes: AtomicUsize::new(0),
            n_conflicts: AtomicUsize::new(0),

            value: UnsafeCell::new(value),
        }
    }

    /// Consume the latch and return the protected value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Spin until read permission is granted.
    pub fn read(&self) -> ReadGuard<T> {
        loop {
            let old = self.state.load(SeqCst);
            if (old & Self::LATCH_LOCK_FLAG) == 0 {
                // no writer holds or waits for the latch.
                if self.state.compare_exchange(old, old + 1, SeqCst, SeqCst).is_ok() {
                    self.n_reads.fetch_add(1, SeqCst);
                    break ReadGuard { door: self };
                }
            }
            self.n_conflicts.fetch_add(1, SeqCst);
        }
    }

    /// Spin until exclusive write permission is granted.
    pub fn write(&self) -> WriteGuard<T> {
        // phase one, acquire the latch and stop new readers.
        loop {
            let old = self.state.load(SeqCst);
            if (old & Self::LATCH_FLAG) == 0 {
                if (old & Self::LOCK_FLAG) != 0 {
                    panic!("latch off while lock on, call the programmer");
                }
                let new = old | Self::LATCH_FLAG;
                if self.state.compare_exchange(old, new, SeqCst, SeqCst).is_ok() {
                    break;
                }
            }
            self.n_conflicts.fetch_add(1, SeqCst);
        }
        // phase two, wait for live readers to drain, then lock.
        loop {
            let old = self.state.load(SeqCst);
            if (old & Self::READERS_FLAG) == 0 {
                let new = old | Self::LOCK_FLAG;
                if self.state.compare_exchange(old, new, SeqCst, SeqCst).is_ok() {
                    self.n_writes.fetch_add(1, SeqCst);
                    break WriteGuard { door: self };
                }
                panic!("latch on, zero readers, lock failed, call the programmer");
            }
            self.n_conflicts.fetch_add(1, SeqCst);
        }
    }

    pub fn to_stats(&self) -> Stats {
        Stats {
            state: self.state.load(SeqCst),
            n_reads: self.n_reads.load(SeqCst),
            n_writes: self.n_writes.load(SeqCst),
            n_conflicts: self.n_conflicts.load(SeqCst),
        }
    }
}

/// Type handle read permission, latch is released when guard is dropped.
pub struct ReadGuard<'a, T> {
    door: &'a RwLatch<T>,
}

impl<'a, T> Deref for ReadGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.door.value.get() }
    }
}

impl<'a, T> Drop for ReadGuard<'a, T> {
    fn drop(&mut self) {
        self.door.state.fetch_sub(1, SeqCst);
    }
}

/// Type handle write permission, latch and lock are released when
/// guard is dropped.
pub struct WriteGuard<'a, T> {
    door: &'a RwLatch<T>,
}

impl<'a, T> Deref for WriteGuard<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.door.value.get() }
    }
}

impl<'a, T> DerefMut for WriteGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.door.value.get() }
    }
}

impl<'a, T> Drop for WriteGuard<'a, T> {
    fn drop(&mut self) {
        let old = self.door.state.load(SeqCst);
        if (old & RwLatch::<T>::READERS_FLAG) > 0 {
            panic!("active readers while lock held, call the programmer");
        }
        if self.door.state.compare_exchange(old, 0, SeqCst, SeqCst).is_err() {
            panic!("state changed under an exclusive lock, call the programmer");
        }
    }
}

/// Statistic type, to capture [RwLatch] metrics.
#[derive(Default)]
pub struct Stats {
    /// Raw latch state when [RwLatch::to_stats] was called.
    pub state: u32,
    /// Total number of read permits granted so far.
    pub n_reads: usize,
    /// Total number of write permits granted so far.
    pub n_writes: usize,
    /// Total number of spins while acquiring either permit.
    pub n_conflicts: usize,
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            "{{ state = {:X}, n_reads = {}, n_writes = {}, n_conflicts = {} }}",
            self.state, self.n_reads, self.n_writes, self.n_conflicts,
        )
    }
}

#[cfg(test)]
#[path = "latch_test.rs"]
mod latch_test;
