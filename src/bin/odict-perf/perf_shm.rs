use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{cmp::Ordering, ffi, time};

use odict::{
    cache::Policy,
    dict::ToJson,
    fnv32a,
    shm::{self, ShmCache, ShmHandler},
    Result,
};

use crate::SubCommand;

const ITEM_SIZE: usize = 32;

// item layout, 8 key bytes then 24 value bytes.
struct UserHandler;

impl ShmHandler for UserHandler {
    type Out = Vec<u8>;

    fn hash(&self, item: &[u8]) -> u32 {
        fnv32a(&item[..8])
    }

    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a[..8].cmp(&b[..8])
    }

    fn on_hit(&self, item: &[u8], out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(item);
    }
}

fn item(key: u64) -> Vec<u8> {
    let mut buf = vec![0_u8; ITEM_SIZE];
    buf[..8].copy_from_slice(&key.to_le_bytes());
    buf[8..16].copy_from_slice(&(key ^ 0xA5A5_A5A5).to_le_bytes());
    buf
}

pub fn perf(subcmd: SubCommand) -> Result<()> {
    let (algo, count, size, path, mut seed) = match subcmd {
        SubCommand::Shmcache { algo, count, size, path, seed } => {
            (algo, count, size, path, seed)
        }
        _ => unreachable!(),
    };
    if seed == 0 {
        seed = random();
    }
    println!("odict: starting shmcache workload, seed = {}", seed);

    let path: ffi::OsString = if path.is_empty() {
        let mut p = std::env::temp_dir();
        p.push(format!("odict-perf-shm-{}.shm", random::<u64>()));
        p.into_os_string()
    } else {
        path.into()
    };

    let policy: Policy = algo.parse()?;
    let region_len = shm::record_size(ITEM_SIZE) * (size + 1);

    let mut cache = ShmCache::new(UserHandler, 1024, ITEM_SIZE)?;
    cache.set_evict_algo(policy);
    let opened = cache.init(&path, region_len)?;
    println!("odict: {:?} {:?}, {} records", opened, path, size);

    let mut rng = SmallRng::seed_from_u64(seed);
    let mut out = Vec::new();
    let (mut n_oom, mut n_hits) = (0, 0);

    let start = time::Instant::now();
    for _i in 0..count {
        let key = rng.gen::<u64>() % ((size * 2) as u64);
        match rng.gen::<u8>() % 4 {
            0 | 1 => match cache.put(&item(key), 0) {
                Ok(_) => (),
                Err(odict::Error::OutOfMemory(_, _)) => {
                    n_oom += 1;
                    cache.erase(&item(key ^ 1))?;
                }
                Err(err) => return Err(err),
            },
            2 => {
                if cache.get(&item(key), &mut out)? {
                    n_hits += 1;
                }
            }
            3 => {
                cache.erase(&item(key))?;
            }
            _ => unreachable!(),
        }
    }
    println!(
        "odict: {} shmcache, {} ops in {:?}, hits:{} oom:{}",
        policy,
        count,
        start.elapsed(),
        n_hits,
        n_oom
    );
    println!("odict: stats {}", cache.to_stats().to_json());

    cache.self_check()
}
