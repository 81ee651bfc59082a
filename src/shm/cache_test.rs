use rand::prelude::random;

use std::{cell::RefCell, cmp::Ordering, ffi, fs, io::{Read, Seek, SeekFrom, Write}};

use super::*;
use crate::shm::FLAG_USED;

const ITEM_SIZE: usize = 16;
const MAX_BUCKET: usize = 16;

// item layout, 4 key bytes then 12 value bytes.
struct UserHandler {
    evict_dump: RefCell<Vec<(i64, u32)>>,
}

impl UserHandler {
    fn new() -> UserHandler {
        UserHandler { evict_dump: RefCell::new(Vec::new()) }
    }
}

impl ShmHandler for UserHandler {
    type Out = Vec<u8>;

    fn hash(&self, item: &[u8]) -> u32 {
        fnv32a(&item[..4])
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a[..4].cmp(&b[..4])
    }

    fn on_hit(&self, item: &[u8], out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(item);
    }

    fn on_dump_evict(&self, exp_time: i64, item: &[u8]) {
        self.evict_dump.borrow_mut().push((exp_time, key_of(item)));
    }
}

fn item(key: u32, value: u64) -> Vec<u8> {
    let mut buf = vec![0_u8; ITEM_SIZE];
    buf[..4].copy_from_slice(&key.to_le_bytes());
    buf[4..12].copy_from_slice(&value.to_le_bytes());
    buf
}

fn key_of(payload: &[u8]) -> u32 {
    u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]])
}

fn record_size() -> usize {
    1 + ENT_PAYLOAD + ITEM_SIZE
}

fn region_len(n_records: usize) -> usize {
    record_size() * n_records
}

fn scratch_path(name: &str) -> ffi::OsString {
    let mut path = std::env::temp_dir();
    path.push(format!("{}-{}.shm", name, random::<u64>()));
    fs::remove_file(&path).ok();
    path.into_os_string()
}

#[test]
fn test_shm_cache_basic() {
    let path = scratch_path("test-shm-cache-basic");
    let len = region_len(64);

    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);

    let mut out = Vec::new();
    assert_eq!(cache.put(&item(1, 10), 0).unwrap(), Wr::New);
    assert_eq!(cache.put(&item(2, 20), 0).unwrap(), Wr::New);
    assert_eq!(cache.put(&item(1, 11), 0).unwrap(), Wr::Update);
    assert_eq!(cache.len(), 2);

    assert!(cache.get(&item(1, 0), &mut out).unwrap());
    assert_eq!(out, item(1, 11));
    assert!(!cache.get(&item(3, 0), &mut out).unwrap());

    assert!(cache.erase(&item(2, 0)).unwrap());
    assert!(!cache.erase(&item(2, 0)).unwrap());
    assert_eq!(cache.len(), 1);

    cache.self_check().unwrap();

    let stats = cache.to_stats();
    assert_eq!(stats.accesses, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.size, 1);

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_recovery() {
    let path = scratch_path("test-shm-cache-recovery");
    let len = region_len(128);

    {
        let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
        assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);
        for key in 0..100_u32 {
            assert_eq!(cache.put(&item(key, u64::from(key)), 0).unwrap(), Wr::New);
        }
        cache.self_check().unwrap();
    }

    // reopen with matching metadata rebuilds the full live set.
    {
        let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
        assert_eq!(cache.init(&path, len).unwrap(), Opened::Reused);
        assert_eq!(cache.len(), 100);
        cache.self_check().unwrap();

        let mut out = Vec::new();
        for key in 0..100_u32 {
            assert!(cache.get(&item(key, 0), &mut out).unwrap(), "key {}", key);
            assert_eq!(out, item(key, u64::from(key)));
        }
    }

    // corrupt one payload byte off-process.
    {
        let header_len = HDR_BUCKETS + MAX_BUCKET * W;
        let mut file = fs::OpenOptions::new().read(true).write(true).open(&path).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();

        let used = (1..128)
            .find(|i| bytes[header_len + i * record_size()] == FLAG_USED)
            .unwrap();
        let off = header_len + used * record_size() + 1 + ENT_PAYLOAD + ITEM_SIZE - 1;
        file.seek(SeekFrom::Start(off as u64)).unwrap();
        file.write_all(&[bytes[off] ^ 0xFF]).unwrap();
    }

    // the corrupted record is dropped, the other 99 survive.
    {
        let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
        assert_eq!(cache.init(&path, len).unwrap(), Opened::Reused);
        assert_eq!(cache.len(), 99);
        cache.self_check().unwrap();

        let mut out = Vec::new();
        let mut hits = 0;
        for key in 0..100_u32 {
            if cache.get(&item(key, 0), &mut out).unwrap() {
                assert_eq!(out, item(key, u64::from(key)));
                hits += 1;
            }
        }
        assert_eq!(hits, 99);
    }

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_metadata_mismatch() {
    let path = scratch_path("test-shm-cache-meta");
    let len = region_len(32);

    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);
    cache.put(&item(1, 1), 0).unwrap();
    drop(cache);

    // different bucket count, same total file length.
    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET * 2, ITEM_SIZE).unwrap();
    let header_delta = MAX_BUCKET * W;
    match cache.init(&path, len - header_delta) {
        Err(Error::InvalidFile(_, _)) => (),
        res => panic!("{:?}", res.map(|_| ())),
    }

    // the file survives for inspection and still reopens correctly.
    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Reused);
    assert_eq!(cache.len(), 1);

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_oom() {
    let path = scratch_path("test-shm-cache-oom");
    // record 0 reserved, ten allocatable records.
    let len = region_len(11);

    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);

    for key in 0..10_u32 {
        assert_eq!(cache.put(&item(key, 1), 0).unwrap(), Wr::New);
    }

    // unexpired entries are never reclaimed by put.
    match cache.put(&item(10, 1), 0) {
        Err(Error::OutOfMemory(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let mut out = Vec::new();
    assert!(cache.get(&item(0, 0), &mut out).unwrap());
    assert_eq!(cache.len(), 10);
    cache.self_check().unwrap();

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_oom_expired_head() {
    let path = scratch_path("test-shm-cache-oom-expired");
    let len = region_len(11);

    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);

    let past = crate::util::epoch_secs().unwrap() - 10;
    assert_eq!(cache.put(&item(0, 1), past).unwrap(), Wr::New);
    for key in 1..10_u32 {
        assert_eq!(cache.put(&item(key, 1), 0).unwrap(), Wr::New);
    }

    // the expired head is reclaimed and the put retried.
    assert_eq!(cache.put(&item(10, 1), 0).unwrap(), Wr::New);
    assert_eq!(cache.len(), 10);

    let mut out = Vec::new();
    assert!(!cache.get(&item(0, 0), &mut out).unwrap());
    assert!(cache.get(&item(10, 0), &mut out).unwrap());
    cache.self_check().unwrap();

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_expiration() {
    let path = scratch_path("test-shm-cache-exp");
    let len = region_len(16);

    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);

    let past = crate::util::epoch_secs().unwrap() - 5;
    cache.put(&item(1, 1), past).unwrap();
    cache.put(&item(2, 2), 0).unwrap();
    assert_eq!(cache.len(), 2);

    // the expired entry is erased by the get that trips over it.
    let mut out = Vec::new();
    assert!(!cache.get(&item(1, 0), &mut out).unwrap());
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&item(2, 0), &mut out).unwrap());
    cache.self_check().unwrap();

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_recency() {
    let path = scratch_path("test-shm-cache-recency");
    let len = region_len(16);

    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    cache.set_evict_algo(Policy::Lru);
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);

    cache.put(&item(1, 1), 0).unwrap();
    cache.put(&item(2, 2), 0).unwrap();
    cache.put(&item(3, 3), 0).unwrap();

    let mut out = Vec::new();
    assert!(cache.get(&item(2, 0), &mut out).unwrap());

    // the LRU touch moved key 2 to the tail.
    cache.dump_evict().unwrap();
    let dumped: Vec<u32> =
        cache.handler.evict_dump.borrow().iter().map(|(_, k)| *k).collect();
    assert_eq!(dumped, vec![1, 3, 2]);

    fs::remove_file(&path).ok();
}

#[test]
fn test_shm_cache_recovery_order() {
    let path = scratch_path("test-shm-cache-recovery-order");
    let len = region_len(16);

    let far = crate::util::epoch_secs().unwrap() + 100_000;
    {
        let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
        assert_eq!(cache.init(&path, len).unwrap(), Opened::Created);
        cache.put(&item(1, 1), far + 30).unwrap();
        cache.put(&item(2, 2), far + 10).unwrap();
        cache.put(&item(3, 3), far + 20).unwrap();
    }

    // rebuilt recency runs in ascending expiration order.
    let mut cache = ShmCache::new(UserHandler::new(), MAX_BUCKET, ITEM_SIZE).unwrap();
    assert_eq!(cache.init(&path, len).unwrap(), Opened::Reused);
    cache.dump_evict().unwrap();
    let dumped: Vec<u32> =
        cache.handler.evict_dump.borrow().iter().map(|(_, k)| *k).collect();
    assert_eq!(dumped, vec![2, 3, 1]);
    cache.self_check().unwrap();

    fs::remove_file(&path).ok();
}
