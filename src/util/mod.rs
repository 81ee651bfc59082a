//! Module implement common utility functions and types.

use std::{
    convert::TryFrom,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{Error, Result};

pub mod files;
pub mod latch;

pub use latch::RwLatch;

/// Return wall-clock time as seconds since UNIX epoch. Expiration
/// timestamps across the cache modules are compared against this.
pub fn epoch_secs() -> Result<i64> {
    let elapsed = err_at!(Fatal, SystemTime::now().duration_since(UNIX_EPOCH))?;
    err_at!(FailConvert, i64::try_from(elapsed.as_secs()))
}
