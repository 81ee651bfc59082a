use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::{cmp::Ordering, collections::BTreeMap};

use super::*;
use crate::dict::Handler;

#[derive(Clone, Copy)]
struct KeyOrd;

impl Handler<(u16, u64)> for KeyOrd {
    fn compare(&self, a: &(u16, u64), b: &(u16, u64)) -> Ordering {
        a.0.cmp(&b.0)
    }
}

#[test]
fn test_bst() {
    let seed: u64 = random();
    println!("test_bst seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut index: Index<(u16, u64), KeyOrd> = Index::new(KeyOrd);
    let mut btmap: BTreeMap<u16, u64> = BTreeMap::new();

    for _i in 0..50_000 {
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
        assert_eq!(index.search(&(*key, 0)).unwrap().1, *value, "key {}", key);
    }

    let items: Vec<(u16, u64)> = index.iter().cloned().collect();
    let expect: Vec<(u16, u64)> = btmap.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(items, expect);
}

#[test]
fn test_bst_remove_two_children() {
    let mut index: Index<(u16, u64), KeyOrd> = Index::new(KeyOrd);

    // shape the tree so 50's removal splices its in-order successor.
    for key in [50_u16, 30, 70, 60, 80, 65].iter() {
        index.insert((*key, u64::from(*key)));
    }

    assert_eq!(index.remove(&(50, 0)), Some((50, 50)));
    index.validate().unwrap();

    let keys: Vec<u16> = index.iter().map(|item| item.0).collect();
    assert_eq!(keys, vec![30, 60, 65, 70, 80]);

    // removed top had a successor with a right child of its own.
    assert_eq!(index.remove(&(60, 0)), Some((60, 60)));
    index.validate().unwrap();
    let keys: Vec<u16> = index.iter().map(|item| item.0).collect();
    assert_eq!(keys, vec![30, 65, 70, 80]);
}

#[test]
fn test_bst_degenerate() {
    // sorted input degrades to a right spine, behavior stays correct.
    let mut index: Index<(u16, u64), KeyOrd> = Index::new(KeyOrd);
    for key in 0..1000_u16 {
        assert!(index.insert((key, u64::from(key))).is_none());
    }
    assert_eq!(index.len(), 1000);
    index.validate().unwrap();

    for key in 0..1000_u16 {
        assert_eq!(index.search(&(key, 0)).unwrap().1, u64::from(key));
    }
    for key in (0..1000_u16).rev() {
        assert_eq!(index.remove(&(key, 0)), Some((key, u64::from(key))));
    }
    assert!(index.is_empty());
}
