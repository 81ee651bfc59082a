use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{cmp::Ordering, collections::BTreeMap};

use super::*;
use crate::dict::Handler;

// items are (key, value) pairs, ordered by key alone so that
// insert-over-existing replaces the value.
#[derive(Clone, Copy)]
struct KeyOrd;

impl Handler<(u16, u64)> for KeyOrd {
    fn compare(&self, a: &(u16, u64), b: &(u16, u64)) -> Ordering {
        a.0.cmp(&b.0)
    }
}

#[test]
fn test_sarray() {
    let seed: u64 = random();
    println!("test_sarray seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: Index<(u16, u64), KeyOrd> = Index::new(KeyOrd);
    let mut btmap: BTreeMap<u16, u64> = BTreeMap::new();

    for _i in 0..20_000 {
        let (key, value) = (rng.gen::<u16>(), rng.gen::<u64>());
        match rng.gen::<u8>() % 3 {
            0 | 1 => {
                let old = index.insert((key, value));
                assert_eq!(old.map(|(_, v)| v), btmap.insert(key, value), "key {}", key);
            }
            2 => {
                let old = index.remove(&(key, 0));
                assert_eq!(old.map(|(_, v)| v), btmap.remove(&key), "key {}", key);
            }
            _ => unreachable!(),
        };
        assert_eq!(index.len(), btmap.len());
    }

    index.validate().unwrap();

    for (key, value) in btmap.iter() {
        let item = index.search(&(*key, 0)).unwrap();
        assert_eq!(item.1, *value, "key {}", key);
    }

    let items: Vec<(u16, u64)> = index.iter().cloned().collect();
    let expect: Vec<(u16, u64)> = btmap.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(items, expect);
}

#[test]
fn test_sarray_replace() {
    let mut index: Index<(u16, u64), KeyOrd> = Index::new(KeyOrd);

    assert!(index.insert((10, 1)).is_none());
    assert!(index.insert((20, 2)).is_none());
    assert_eq!(index.insert((10, 3)), Some((10, 1)));
    assert_eq!(index.len(), 2);
    assert_eq!(index.search(&(10, 0)).unwrap().1, 3);

    assert_eq!(index.remove(&(10, 0)), Some((10, 3)));
    assert_eq!(index.remove(&(10, 0)), None);
    assert_eq!(index.search(&(10, 0)), None);
    assert_eq!(index.len(), 1);
}

#[test]
fn test_sarray_insert_point() {
    let mut index: Index<(u16, u64), KeyOrd> = Index::new(KeyOrd);
    for key in [10_u16, 20, 30].iter() {
        index.insert((*key, u64::from(*key)));
    }

    // misses land on the stable insertion point of [first, first+size).
    assert_eq!(binary_search(&index.items, &|x| x.0.cmp(&5)), Err(0));
    assert_eq!(binary_search(&index.items, &|x| x.0.cmp(&15)), Err(1));
    assert_eq!(binary_search(&index.items, &|x| x.0.cmp(&25)), Err(2));
    assert_eq!(binary_search(&index.items, &|x| x.0.cmp(&35)), Err(3));
    assert_eq!(binary_search(&index.items, &|x| x.0.cmp(&20)), Ok(1));
}
