use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{collections::BTreeMap, thread, time};

use super::*;
use crate::util;

type Item = (u32, u64);

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

fn key(k: u32) -> Item {
    (k, 0)
}

#[test]
fn test_cache_lru_eviction() {
    let mut cache = Cache::new(Policy::Lru, 2, UserHandler).unwrap();
    let mut out = 0_u64;

    let (a, b, c) = ((1_u32, 100_u64), (2, 200), (3, 300));

    assert_eq!(cache.put(a, 0), Wr::New);
    assert_eq!(cache.put(b, 0), Wr::New);
    assert!(cache.get(&key(1), &mut out).unwrap());
    assert_eq!(cache.put(c, 0), Wr::New);

    // the get refreshed A, so B was the least recently touched.
    assert!(cache.get(&key(1), &mut out).unwrap());
    assert_eq!(out, 100);
    assert!(!cache.get(&key(2), &mut out).unwrap());
    assert!(cache.get(&key(3), &mut out).unwrap());
    assert_eq!(out, 300);

    assert_eq!(cache.len(), 2);
    cache.validate().unwrap();

    let stats = cache.to_stats();
    assert_eq!(stats.accesses, 4);
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.size, 2);
}

#[test]
fn test_cache_fifo_eviction() {
    let mut cache = Cache::new(Policy::Fifo, 2, UserHandler).unwrap();
    let mut out = 0_u64;

    let (a, b, c) = ((1_u32, 100_u64), (2, 200), (3, 300));

    assert_eq!(cache.put(a, 0), Wr::New);
    assert_eq!(cache.put(b, 0), Wr::New);
    assert!(cache.get(&key(1), &mut out).unwrap());
    assert_eq!(cache.put(c, 0), Wr::New);

    // FIFO ignores the touch, A was first in and first out.
    assert!(!cache.get(&key(1), &mut out).unwrap());
    assert!(cache.get(&key(2), &mut out).unwrap());
    assert_eq!(out, 200);
    assert!(cache.get(&key(3), &mut out).unwrap());

    assert_eq!(cache.len(), 2);
    cache.validate().unwrap();
}

#[test]
fn test_cache_expiration() {
    let mut cache = Cache::new(Policy::Lru, 8, UserHandler).unwrap();
    let mut out = 0_u64;

    let now = util::epoch_secs().unwrap();
    cache.put((1, 100), now + 1);
    cache.put((2, 200), 0);
    assert_eq!(cache.len(), 2);

    thread::sleep(time::Duration::from_secs(2));

    // nothing scanned proactively, the get trips the expiry.
    assert_eq!(cache.len(), 2);
    assert!(!cache.get(&key(1), &mut out).unwrap());
    assert_eq!(cache.len(), 1);
    assert!(cache.get(&key(2), &mut out).unwrap());

    cache.validate().unwrap();
}

#[test]
fn test_cache_put_replace() {
    let mut cache = Cache::new(Policy::Lru, 4, UserHandler).unwrap();
    let mut out = 0_u64;

    assert_eq!(cache.put((7, 1), 0), Wr::New);
    assert_eq!(cache.put((7, 2), 0), Wr::Update);
    assert_eq!(cache.len(), 1);

    assert!(cache.get(&key(7), &mut out).unwrap());
    assert_eq!(out, 2);
}

#[test]
fn test_cache_remove() {
    let mut cache = Cache::new(Policy::Fifo, 4, UserHandler).unwrap();

    cache.put((7, 1), 42);
    assert_eq!(cache.remove(&key(7)), Some(((7, 1), 42)));
    assert_eq!(cache.remove(&key(7)), None);
    assert_eq!(cache.len(), 0);

    cache.put((8, 2), 0);
    assert!(cache.erase(&key(8)));
    assert!(!cache.erase(&key(8)));
    cache.validate().unwrap();
}

#[test]
fn test_cache_capacity_zero() {
    // capacity 0 disables eviction.
    let mut cache = Cache::new(Policy::Lru, 0, UserHandler).unwrap();
    for k in 0..1000_u32 {
        cache.put((k, u64::from(k)), 0);
    }
    assert_eq!(cache.len(), 1000);
    cache.validate().unwrap();
}

// reference model carrying the same recency rules, every eviction
// decision must match it.
#[test]
fn test_cache_model() {
    let seed: u64 = random();
    println!("test_cache_model seed:{}", seed);

    for policy in [Policy::Fifo, Policy::Lru].iter() {
        let mut rng = SmallRng::seed_from_u64(seed);
        let max_items = 32;

        let mut cache = Cache::new(*policy, max_items, UserHandler).unwrap();
        let mut model_map: BTreeMap<u32, u64> = BTreeMap::new();
        let mut model_order: Vec<u32> = Vec::new(); // head first
        let mut out = 0_u64;

        for _i in 0..20_000 {
            let k = rng.gen::<u32>() % 64;
            let v = rng.gen::<u64>();
            match rng.gen::<u8>() % 3 {
                0 | 1 => {
                    cache.put((k, v), 0);
                    if model_map.insert(k, v).is_some() {
                        model_order.retain(|x| *x != k);
                    }
                    model_order.push(k);
                    while model_map.len() > max_items {
                        let victim = model_order.remove(0);
                        model_map.remove(&victim);
                    }
                }
                2 => {
                    let hit = cache.get(&key(k), &mut out).unwrap();
                    assert_eq!(hit, model_map.contains_key(&k), "key {}", k);
                    if hit {
                        assert_eq!(out, model_map[&k]);
                        if let Policy::Lru = policy {
                            model_order.retain(|x| *x != k);
                            model_order.push(k);
                        }
                    }
                }
                _ => unreachable!(),
            }

            assert_eq!(cache.len(), model_map.len());
            assert!(cache.len() <= max_items);
        }

        cache.validate().unwrap();

        // membership settled identically.
        for k in model_map.keys() {
            assert!(cache.get(&key(*k), &mut out).unwrap(), "key {}", k);
        }
    }
}
