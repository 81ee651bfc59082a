//! Module implement the multi-process circle queue.
//!
//! A fixed-capacity ring of fixed-size items inside a mapped file,
//! coordinated across processes by a SysV semaphore set of three
//! slots keyed off the file path: a mutex (initial 1), pop-available
//! (initial count) and push-space (initial capacity - count).
//! Producers block on push-space, consumers on pop-available, so a
//! full queue stalls producers and an empty one stalls consumers
//! without spinning.
//!
//! Reopening a non-empty queue recomputes the live count from the
//! stored head and tail, repairing and logging a stored count that
//! disagrees. The semaphore set persists in the kernel, it is stamped
//! with initial values only by the process that creates it.

use memmap2::MmapMut;

use std::{ffi, ffi::CString, io, os::unix::ffi::OsStrExt};

use crate::{
    shm::{mmap, read_i32, write_i32},
    Error, Result,
};

// queue header layout, i32 fields.
const QHDR_MAGIC0: usize = 0;
const QHDR_MAGIC1: usize = 1;
const QHDR_LEN: usize = 2;
const QHDR_ITEM_SIZE: usize = 6;
const QHDR_MAX_COUNT: usize = 10;
const QHDR_COUNT: usize = 14;
const QHDR_HEAD: usize = 18;
const QHDR_TAIL: usize = 22;
const QHDR_DATA: usize = 26;

// semaphore slots.
const SEM_LOCK: u16 = 0;
const SEM_POP: u16 = 1;
const SEM_PUSH: u16 = 2;

/// Index type implementing the multi-process bounded queue.
pub struct ShmQueue {
    map: MmapMut,
    sem: SemSet,
    item_size: usize,
    max_count: usize,
}

impl ShmQueue {
    /// Map `path` as a ring of `max_count` items of `item_size` bytes,
    /// creating file and semaphore set when missing.
    pub fn init(path: &ffi::OsStr, max_count: usize, item_size: usize) -> Result<ShmQueue> {
        if max_count == 0 || item_size == 0 {
            err_at!(InvalidInput, msg: "queue geometry {} x {}", max_count, item_size)?;
        }

        let total = QHDR_DATA + max_count * item_size;
        let (_file, mut map, is_new) = mmap::open_or_create(path, total)?;

        if is_new {
            map[QHDR_MAGIC0] = b'P';
            map[QHDR_MAGIC1] = b'Q';
            write_i32(&mut map, QHDR_LEN, total as i32);
            write_i32(&mut map, QHDR_ITEM_SIZE, item_size as i32);
            write_i32(&mut map, QHDR_MAX_COUNT, max_count as i32);
            write_i32(&mut map, QHDR_COUNT, 0);
            write_i32(&mut map, QHDR_HEAD, 0);
            write_i32(&mut map, QHDR_TAIL, 0);
        } else {
            if map[QHDR_MAGIC0] != b'P' || map[QHDR_MAGIC1] != b'Q' {
                let (a, b) = (map[QHDR_MAGIC0], map[QHDR_MAGIC1]);
                err_at!(InvalidFile, msg: "bad queue magic {:x} {:x}", a, b)?;
            }
            let (got_len, got_item, got_max) = (
                read_i32(&map, QHDR_LEN),
                read_i32(&map, QHDR_ITEM_SIZE),
                read_i32(&map, QHDR_MAX_COUNT),
            );
            if got_len != total as i32
                || got_item != item_size as i32
                || got_max != max_count as i32
            {
                err_at!(
                    InvalidFile,
                    msg: "queue metadata len {} {}, item {} {}, max {} {}",
                    got_len, total, got_item, item_size, got_max, max_count
                )?;
            }
            recompute_count(&mut map);
        }

        let count = read_i32(&map, QHDR_COUNT) as usize;
        let sem = SemSet::open(path, count, max_count - count)?;

        Ok(ShmQueue { map, sem, item_size, max_count })
    }

    /// Copy `item` into the ring, blocking while the queue is full.
    pub fn push(&mut self, item: &[u8]) -> Result<()> {
        if item.len() != self.item_size {
            err_at!(InvalidInput, msg: "item size {} != {}", item.len(), self.item_size)?;
        }

        self.sem.wait(SEM_PUSH)?;
        self.sem.wait(SEM_LOCK)?;
        let res = self.raw_push(item);
        self.sem.post(SEM_LOCK)?;
        match res {
            Ok(()) => self.sem.post(SEM_POP),
            Err(err) => Err(err),
        }
    }

    /// Copy the oldest item out into `out`, blocking while the queue
    /// is empty.
    pub fn pop(&mut self, out: &mut [u8]) -> Result<()> {
        if out.len() != self.item_size {
            err_at!(InvalidInput, msg: "holder size {} != {}", out.len(), self.item_size)?;
        }

        self.sem.wait(SEM_POP)?;
        self.sem.wait(SEM_LOCK)?;
        let res = self.raw_pop(out);
        self.sem.post(SEM_LOCK)?;
        match res {
            Ok(()) => self.sem.post(SEM_PUSH),
            Err(err) => Err(err),
        }
    }

    /// Items currently queued.
    pub fn len(&self) -> usize {
        read_i32(&self.map, QHDR_COUNT) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn to_max_count(&self) -> usize {
        self.max_count
    }
}

impl ShmQueue {
    // the push-space semaphore guarantees room, a full ring here is
    // corruption.
    fn raw_push(&mut self, item: &[u8]) -> Result<()> {
        let count = read_i32(&self.map, QHDR_COUNT);
        let max = read_i32(&self.map, QHDR_MAX_COUNT);
        if count >= max {
            return err_at!(Fatal, msg: "queue over-full {}/{}", count, max);
        }

        let head = read_i32(&self.map, QHDR_HEAD);
        let off = QHDR_DATA + (head as usize) * self.item_size;
        self.map[off..off + self.item_size].copy_from_slice(item);

        write_i32(&mut self.map, QHDR_COUNT, count + 1);
        write_i32(&mut self.map, QHDR_HEAD, (head + 1) % max);
        Ok(())
    }

    fn raw_pop(&mut self, out: &mut [u8]) -> Result<()> {
        let count = read_i32(&self.map, QHDR_COUNT);
        let max = read_i32(&self.map, QHDR_MAX_COUNT);
        if count <= 0 {
            return err_at!(Fatal, msg: "queue under-empty {}", count);
        }

        let tail = read_i32(&self.map, QHDR_TAIL);
        let off = QHDR_DATA + (tail as usize) * self.item_size;
        out.copy_from_slice(&self.map[off..off + self.item_size]);

        write_i32(&mut self.map, QHDR_COUNT, count - 1);
        write_i32(&mut self.map, QHDR_TAIL, (tail + 1) % max);
        Ok(())
    }
}

// count is derivable from head and tail except when the ring is
// exactly full, the stored count disambiguates that case. A stored
// count disagreeing with the links is repaired and logged.
fn recompute_count(map: &mut [u8]) {
    let max = read_i32(map, QHDR_MAX_COUNT);
    let stored = read_i32(map, QHDR_COUNT);
    let head = read_i32(map, QHDR_HEAD);
    let tail = read_i32(map, QHDR_TAIL);

    let count = if head == tail {
        if stored > 0 {
            max
        } else {
            0
        }
    } else if head > tail {
        head - tail
    } else {
        max + head - tail
    };

    if stored != count {
        log::warn!(
            "queue count {} disagrees with head {} tail {}, repairing to {}",
            stored, head, tail, count
        );
        write_i32(map, QHDR_COUNT, count);
    }
}

// SysV semaphore set keyed by the queue's file path.
struct SemSet {
    id: libc::c_int,
}

impl SemSet {
    fn open(path: &ffi::OsStr, pop_init: usize, push_init: usize) -> Result<SemSet> {
        let c_path = err_at!(InvalidInput, CString::new(path.as_bytes()))?;

        let key = unsafe { libc::ftok(c_path.as_ptr(), i32::from(b'Q')) };
        if key == -1 {
            err_at!(IOError, Err(io::Error::last_os_error()), "ftok {:?}", path)?;
        }

        // exclusive create stamps the initial values exactly once.
        let id = unsafe { libc::semget(key, 3, libc::IPC_CREAT | libc::IPC_EXCL | 0o666) };
        if id >= 0 {
            let sem = SemSet { id };
            sem.set_value(SEM_LOCK, 1)?;
            sem.set_value(SEM_POP, pop_init as i32)?;
            sem.set_value(SEM_PUSH, push_init as i32)?;
            return Ok(sem);
        }

        match io::Error::last_os_error() {
            err if err.raw_os_error() == Some(libc::EEXIST) => {
                let id = unsafe { libc::semget(key, 3, 0o666) };
                if id == -1 {
                    err_at!(IOError, Err(io::Error::last_os_error()), "semget")?;
                }
                Ok(SemSet { id })
            }
            err => err_at!(IOError, Err(err), "semget create"),
        }
    }

    fn set_value(&self, num: u16, val: i32) -> Result<()> {
        let res = unsafe { libc::semctl(self.id, i32::from(num), libc::SETVAL, val) };
        if res == -1 {
            err_at!(IOError, Err(io::Error::last_os_error()), "semctl SETVAL")?;
        }
        Ok(())
    }

    fn wait(&self, num: u16) -> Result<()> {
        self.op(num, -1)
    }

    fn post(&self, num: u16) -> Result<()> {
        self.op(num, 1)
    }

    fn op(&self, num: u16, delta: i16) -> Result<()> {
        let mut buf = libc::sembuf { sem_num: num, sem_op: delta, sem_flg: 0 };
        loop {
            let res = unsafe { libc::semop(self.id, &mut buf, 1) };
            if res == 0 {
                return Ok(());
            }
            match io::Error::last_os_error() {
                err if err.raw_os_error() == Some(libc::EINTR) => continue,
                err => return err_at!(IOError, Err(err), "semop {} {}", num, delta),
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
