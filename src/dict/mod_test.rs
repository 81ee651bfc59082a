use arbitrary::{Arbitrary, Unstructured};
use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use std::collections::BTreeMap;

use super::*;

const KINDS: [Kind; 5] =
    [Kind::Bst, Kind::Rbt, Kind::Btree, Kind::SkipList, Kind::SortedArray];

#[test]
fn test_kind() {
    for kind in KINDS.iter() {
        let s = kind.to_string();
        assert_eq!(s.parse::<Kind>().unwrap(), *kind);
    }
    assert_eq!("rb".parse::<Kind>().unwrap(), Kind::Rbt);
    assert_eq!("bt".parse::<Kind>().unwrap(), Kind::Btree);
    assert_eq!("sl".parse::<Kind>().unwrap(), Kind::SkipList);
    assert_eq!("sa".parse::<Kind>().unwrap(), Kind::SortedArray);
    assert!("quux".parse::<Kind>().is_err());
}

// every engine, same random workload, same observable behavior.
#[test]
fn test_dict_engines() {
    let seed: u64 = random();
    println!("test_dict_engines seed:{}", seed);

    for kind in KINDS.iter() {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut dict: Dict<u16, NaturalOrd> = Dict::new(*kind, NaturalOrd).unwrap();
        let mut btmap: BTreeMap<u16, ()> = BTreeMap::new();

        assert_eq!(dict.to_kind(), *kind);

        for _i in 0..20_000 {
            let key = rng.gen::<u16>();
            match rng.gen::<u8>() % 4 {
                0 | 1 => {
                    let old = dict.insert(key);
                    assert_eq!(old.is_some(), btmap.insert(key, ()).is_some());
                }
                2 => {
                    let old = dict.remove(&key);
                    assert_eq!(old.is_some(), btmap.remove(&key).is_some());
                }
                3 => {
                    assert_eq!(dict.search(&key).is_some(), btmap.contains_key(&key));
                }
                _ => unreachable!(),
            };
            assert_eq!(dict.len(), btmap.len(), "kind {}", kind);
        }

        dict.validate().unwrap();

        // round-trip, iteration yields the live set in order, once.
        let keys: Vec<u16> = dict.iter().cloned().collect();
        let expect: Vec<u16> = btmap.keys().cloned().collect();
        assert_eq!(keys, expect, "kind {}", kind);
    }
}

// insert/search/remove contract, driven from arbitrary bytes.
#[test]
fn test_dict_ops_contract() {
    let seed: u64 = random();
    println!("test_dict_ops_contract seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut raw = vec![0_u8; 1024 * 64];
    rng.fill(raw.as_mut_slice());
    let mut uns = Unstructured::new(&raw);

    for kind in KINDS.iter() {
        let mut dict: Dict<u8, NaturalOrd> = Dict::new(*kind, NaturalOrd).unwrap();

        for _i in 0..2000 {
            let key = u8::arbitrary(&mut uns).unwrap();
            let n = dict.len();
            let present = dict.search(&key).is_some();

            // insert then search returns the item, count moves only
            // on fresh inserts.
            let replaced = dict.insert(key).is_some();
            assert_eq!(replaced, present);
            assert_eq!(dict.len(), if present { n } else { n + 1 });
            assert_eq!(dict.search(&key), Some(&key));

            if u8::arbitrary(&mut uns).unwrap() % 2 == 0 {
                // insert then remove returns the item, search misses.
                assert_eq!(dict.remove(&key), Some(key));
                assert_eq!(dict.search(&key), None);
                assert_eq!(dict.remove(&key), None);
            }
        }

        dict.validate().unwrap();
    }
}

#[test]
fn test_dict_parametrized() {
    let mut dict: Dict<u32, NaturalOrd> = Dict::new_btree(8, NaturalOrd).unwrap();
    for key in 0..1000_u32 {
        dict.insert(key);
    }
    assert_eq!(dict.len(), 1000);
    dict.validate().unwrap();

    let mut dict: Dict<u32, NaturalOrd> = Dict::new_skip_list(24, NaturalOrd).unwrap();
    for key in 0..1000_u32 {
        dict.insert(key);
    }
    assert_eq!(dict.len(), 1000);
    dict.validate().unwrap();

    assert!(Dict::<u32, NaturalOrd>::new_btree(1, NaturalOrd).is_err());
    assert!(Dict::<u32, NaturalOrd>::new_skip_list(0, NaturalOrd).is_err());
}
