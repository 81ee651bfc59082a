use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{cmp::Ordering, thread, time};

use odict::{
    cache::{Cache, CacheHandler, Policy, SyncCache},
    dict::{Handler, ToJson},
    Result,
};

use crate::SubCommand;

type Item = (u64, u64);

#[derive(Clone, Copy)]
struct UserHandler;

impl Handler<Item> for UserHandler {
    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        a.0.cmp(&b.0)
    }
}

impl CacheHandler<Item> for UserHandler {
    type Out = u64;

    fn on_hit(&self, item: &Item, out: &mut u64) {
        *out = item.1;
    }
}

pub fn perf(subcmd: SubCommand) -> Result<()> {
    let (algo, count, size, threads, mut seed) = match subcmd {
        SubCommand::Cache { algo, count, size, threads, seed } => {
            (algo, count, size, threads, seed)
        }
        _ => unreachable!(),
    };
    if seed == 0 {
        seed = random();
    }
    println!("odict: starting cache workload, seed = {}", seed);

    let policy: Policy = algo.parse()?;

    if threads == 0 {
        single_threaded(policy, count, size, seed)
    } else {
        multi_threaded(policy, count, size, threads, seed)
    }
}

fn single_threaded(policy: Policy, count: usize, size: usize, seed: u64) -> Result<()> {
    let mut cache = Cache::new(policy, size, UserHandler)?;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut out = 0_u64;

    let start = time::Instant::now();
    for _i in 0..count {
        let key = rng.gen::<u64>() % ((size * 4) as u64);
        match rng.gen::<u8>() % 2 {
            0 => {
                cache.put((key, key), 0);
            }
            1 => {
                cache.get(&(key, 0), &mut out)?;
            }
            _ => unreachable!(),
        }
    }
    println!("odict: {} cache, {} ops in {:?}", policy, count, start.elapsed());
    println!("odict: stats {}", cache.to_stats().to_json());

    cache.validate()
}

fn multi_threaded(
    policy: Policy,
    count: usize,
    size: usize,
    threads: usize,
    seed: u64,
) -> Result<()> {
    let cache: SyncCache<Item, UserHandler> = SyncCache::new(policy, size, UserHandler)?;

    let start = time::Instant::now();
    let mut handles = vec![];
    for t in 0..threads {
        let cache = cache.clone();
        let seed = seed + (t as u64 * 100);
        let n = count / threads;
        handles.push(thread::spawn(move || -> Result<()> {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut out = 0_u64;
            for _i in 0..n {
                let key = rng.gen::<u64>() % ((size * 4) as u64);
                match rng.gen::<u8>() % 2 {
                    0 => {
                        cache.put((key, key), 0);
                    }
                    1 => {
                        cache.get(&(key, 0), &mut out)?;
                    }
                    _ => unreachable!(),
                }
            }
            Ok(())
        }));
    }
    for handle in handles.into_iter() {
        handle.join().unwrap()?;
    }
    println!(
        "odict: {} sync-cache, {} threads, {} ops in {:?}",
        policy,
        threads,
        count,
        start.elapsed()
    );
    println!("odict: stats {}", cache.to_stats().to_json());

    cache.validate()
}
