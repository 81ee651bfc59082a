//! Module implement the file-mapping shim, the single place OS
//! mapping specifics live.
//!
//! [open_or_create] hands back a read-write shared mapping of exactly
//! the requested length, creating and zero-filling the file when it
//! does not exist and refusing files whose size disagrees. Releasing
//! a mapping is dropping the returned [MmapMut].

use memmap2::MmapMut;

use std::{
    cmp, ffi,
    fs::{self, OpenOptions},
    io::{ErrorKind, Seek, SeekFrom, Write},
    path,
};

use crate::{Error, Result};

/// Open `path` as a read-write shared mapping of exactly `len` bytes.
/// Returns the backing file, the mapping and whether the file was
/// created by this call.
pub fn open_or_create(path: &ffi::OsStr, len: usize) -> Result<(fs::File, MmapMut, bool)> {
    let os_path = path::Path::new(path);

    let (file, is_new) = match OpenOptions::new().read(true).write(true).open(os_path) {
        Ok(file) => (file, false),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let opts = {
                let mut opts = OpenOptions::new();
                opts.read(true).write(true).create_new(true);
                opts
            };
            let mut file = err_at!(IOError, opts.open(os_path), "create {:?}", os_path)?;

            // zero a page at a time, then settle on the exact length.
            let zeros = [0_u8; 1024];
            let mut n = 0;
            while n < len {
                let m = cmp::min(zeros.len(), len - n);
                err_at!(IOError, file.write_all(&zeros[..m]))?;
                n += m;
            }
            err_at!(IOError, file.set_len(len as u64))?;
            err_at!(IOError, file.seek(SeekFrom::Start(0)))?;

            (file, true)
        }
        Err(err) => return err_at!(IOError, Err(err), "open {:?}", os_path),
    };

    let file_len = err_at!(IOError, file.metadata())?.len();
    if file_len != len as u64 {
        err_at!(InvalidFile, msg: "file {:?} size {}, want {}", os_path, file_len, len)?;
    }

    let map = err_at!(IOError, unsafe { MmapMut::map_mut(&file) })?;
    Ok((file, map, is_new))
}

#[cfg(test)]
#[path = "mmap_test.rs"]
mod mmap_test;
