use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};
use serde::Deserialize;

use std::time;

use odict::{dict::Kind, util, Dict, NaturalOrd, Result};

use crate::SubCommand;

/// Workload mix, overridable from a toml profile.
#[derive(Clone, Deserialize)]
pub struct Profile {
    inserts: usize,
    gets: usize,
    removes: usize,
    validate: bool,
}

impl Default for Profile {
    fn default() -> Profile {
        Profile { inserts: 2, gets: 2, removes: 1, validate: true }
    }
}

pub fn perf(subcmd: SubCommand) -> Result<()> {
    let (typ, count, mut seed, profile) = match subcmd {
        SubCommand::Dict { typ, count, seed, profile } => (typ, count, seed, profile),
        _ => unreachable!(),
    };
    if seed == 0 {
        seed = random();
    }
    println!("odict: starting dict workload, seed = {}", seed);

    let p: Profile = if profile.is_empty() {
        Profile::default()
    } else {
        util::files::load_toml(&profile)?
    };

    let kind: Kind = typ.parse()?;
    let mut dict: Dict<u64, NaturalOrd> = Dict::new(kind, NaturalOrd)?;
    let mut rng = SmallRng::seed_from_u64(seed);

    let total = p.inserts + p.gets + p.removes;
    let (mut n_ins, mut n_get, mut n_rem, mut n_hit) = (0, 0, 0, 0);

    let start = time::Instant::now();
    for _i in 0..count {
        let key = rng.gen::<u64>() % (count as u64);
        match rng.gen::<usize>() % total {
            n if n < p.inserts => {
                dict.insert(key);
                n_ins += 1;
            }
            n if n < p.inserts + p.gets => {
                if dict.search(&key).is_some() {
                    n_hit += 1;
                }
                n_get += 1;
            }
            _ => {
                dict.remove(&key);
                n_rem += 1;
            }
        }
    }
    println!(
        "odict: {} engine, {} ops in {:?}, ins:{} get:{}/{} rem:{}",
        kind,
        count,
        start.elapsed(),
        n_ins,
        n_hit,
        n_get,
        n_rem
    );

    let start = time::Instant::now();
    let n: usize = dict.iter().map(|_| 1_usize).sum();
    assert!(n == dict.len(), "{} != {}", n, dict.len());
    println!("odict: iterated {} items in {:?}", n, start.elapsed());

    if p.validate {
        print!("odict: validating {} items ... ", dict.len());
        dict.validate()?;
        println!("ok");
    }

    Ok(())
}
