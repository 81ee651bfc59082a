// Module implement the recency list, a doubly-linked list of cache
// entries threaded through a slab of slots. Slot 0 is reserved so 0
// can mean none, the same convention the shared-memory evict list
// uses for offsets.

use std::sync::{atomic::Ordering::SeqCst, Arc};

use crate::{cache::Entry, Error, Result};

struct Slot<T> {
    prev: usize,
    next: usize,
    entry: Option<Arc<Entry<T>>>,
}

impl<T> Slot<T> {
    fn empty() -> Slot<T> {
        Slot { prev: 0, next: 0, entry: None }
    }
}

pub struct RList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    n_count: usize,
}

impl<T> RList<T> {
    pub fn new() -> RList<T> {
        RList {
            slots: vec![Slot::empty()],
            free: Vec::new(),
            head: 0,
            tail: 0,
            n_count: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    /// Place `entry` at the tail and record its slot in the entry.
    pub fn append(&mut self, entry: Arc<Entry<T>>) -> usize {
        let slot = self.alloc_slot();

        self.slots[slot].prev = self.tail;
        self.slots[slot].next = 0;
        entry.slot.store(slot, SeqCst);
        self.slots[slot].entry = Some(entry);

        if self.tail == 0 {
            self.head = slot;
        } else {
            self.slots[self.tail].next = slot;
        }
        self.tail = slot;

        self.n_count += 1;
        slot
    }

    /// Splice the entry at `slot` out of the list.
    pub fn remove(&mut self, slot: usize) -> Arc<Entry<T>> {
        let (prev, next) = (self.slots[slot].prev, self.slots[slot].next);
        let entry = match self.slots[slot].entry.take() {
            Some(entry) => entry,
            None => unreachable!(),
        };

        if prev == 0 {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }
        if next == 0 {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }

        self.slots[slot].prev = 0;
        self.slots[slot].next = 0;
        self.free.push(slot);

        self.n_count -= 1;
        entry
    }

    /// Move the entry at `slot` to the tail, LRU touch.
    pub fn update(&mut self, slot: usize) -> usize {
        let entry = self.remove(slot);
        self.append(entry)
    }

    /// Entry at the head, next in eviction order.
    pub fn head_entry(&self) -> Option<Arc<Entry<T>>> {
        match self.head {
            0 => None,
            slot => self.slots[slot].entry.as_ref().map(Arc::clone),
        }
    }

    pub fn entry_at(&self, slot: usize) -> Option<&Arc<Entry<T>>> {
        match self.slots.get(slot) {
            Some(s) => s.entry.as_ref(),
            None => None,
        }
    }

    /// Walk the chain and confirm the links agree with the occupied
    /// slots and the recorded count.
    pub fn validate(&self) -> Result<()> {
        let mut n = 0;
        let (mut cur, mut prev) = (self.head, 0);
        while cur != 0 {
            let slot = &self.slots[cur];
            if slot.entry.is_none() {
                err_at!(Fatal, msg: "rlist empty slot {} in chain", cur)?;
            }
            if slot.prev != prev {
                err_at!(Fatal, msg: "rlist prev {} at {}, want {}", slot.prev, cur, prev)?;
            }
            prev = cur;
            cur = slot.next;
            n += 1;
        }
        if prev != self.tail {
            err_at!(Fatal, msg: "rlist tail {} != {}", self.tail, prev)?;
        }
        if n != self.n_count {
            err_at!(Fatal, msg: "rlist count {} != {}", n, self.n_count)?;
        }

        let occupied = self.slots.iter().filter(|s| s.entry.is_some()).count();
        if occupied != self.n_count {
            err_at!(Fatal, msg: "rlist occupancy {} != {}", occupied, self.n_count)?;
        }

        Ok(())
    }
}

impl<T> RList<T> {
    fn alloc_slot(&mut self) -> usize {
        match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::empty());
                self.slots.len() - 1
            }
        }
    }
}
