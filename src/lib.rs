//! Odict provide a collection of ordered dictionary engines and caches
//! built on top of them, all under one key,value interface.
//!
//! Five engines are available - binary-search-tree, red-black-tree,
//! btree, skip-list and sorted-array - each implemented in its own
//! module and exposing the same set of operations: insert, search,
//! remove, len and in-order iteration. The [dict::Dict] factory type
//! picks an engine by [dict::Kind] tag. Items are opaque to the engine,
//! ordering is supplied by the caller through the [dict::Handler] trait
//! and ownership of an item moves into the engine on insert and moves
//! back to the caller on remove.
//!
//! On top of the engines, the [cache] module supply an in-memory
//! FIFO/LRU cache with per-entry expiration, and the [shm] module
//! supply a persistent variant of the same cache whose entire state
//! lives in a memory-mapped file, along with a multi-process bounded
//! queue coordinated by a semaphore set. Shared-memory state survives
//! process restart, a reopening process rebuilds the index by walking
//! the mapped records and dropping the ones whose checksum disagree.
//!
//! Concurrency is opt-in. Engine and cache cores are single threaded,
//! thread-safety comes from the [cache::SyncCache] wrapper which
//! serializes callers behind a read-write latch.

use std::{error, fmt, result};

/// Type alias for Result return type, used by all odict API.
pub type Result<T> = result::Result<T, Error>;

/// Error variants returned by odict API.
///
/// Each variant carry a prefix, typically the file:line where the
/// error was raised, and a human readable message.
#[derive(Clone, PartialEq)]
pub enum Error {
    Fatal(String, String),
    FailConvert(String, String),
    IOError(String, String),
    InvalidFile(String, String),
    InvalidInput(String, String),
    OutOfMemory(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::*;

        match self {
            Fatal(p, m) => write!(f, "{} Fatal: {}", p, m),
            FailConvert(p, m) => write!(f, "{} FailConvert: {}", p, m),
            IOError(p, m) => write!(f, "{} IOError: {}", p, m),
            InvalidFile(p, m) => write!(f, "{} InvalidFile: {}", p, m),
            InvalidInput(p, m) => write!(f, "{} InvalidInput: {}", p, m),
            OutOfMemory(p, m) => write!(f, "{} OutOfMemory: {}", p, m),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}", self)
    }
}

impl error::Error for Error {}

#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

pub mod bst;
pub mod btree;
pub mod cache;
pub mod dict;
pub mod hash;
pub mod rbt;
pub mod sarray;
pub mod shm;
pub mod skiplist;
pub mod util;

pub use crate::dict::{Dict, Handler, Kind, NaturalOrd};
pub use crate::hash::fnv32a;
