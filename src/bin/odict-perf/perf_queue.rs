use rand::prelude::random;

use std::{ffi, thread, time};

use odict::{shm::ShmQueue, Result};

use crate::SubCommand;

pub fn perf(subcmd: SubCommand) -> Result<()> {
    let (count, size, path) = match subcmd {
        SubCommand::Shmqueue { count, size, path } => (count, size, path),
        _ => unreachable!(),
    };

    let path: ffi::OsString = if path.is_empty() {
        let mut p = std::env::temp_dir();
        p.push(format!("odict-perf-queue-{}.q", random::<u64>()));
        p.into_os_string()
    } else {
        path.into()
    };

    println!("odict: starting shmqueue workload, {:?}", path);

    // the producer creates the file, the consumer opens it.
    let mut queue = ShmQueue::init(&path, 1024, size)?;

    let consumer = {
        let path = path.clone();
        thread::spawn(move || -> Result<u64> {
            let mut queue = ShmQueue::init(&path, 1024, size)?;
            let mut out = vec![0_u8; size];
            let mut folded = 0_u64;
            for _i in 0..count {
                queue.pop(&mut out)?;
                folded = folded.wrapping_add(u64::from(out[0]));
            }
            Ok(folded)
        })
    };
    let start = time::Instant::now();
    let mut folded = 0_u64;
    for i in 0..count {
        let fill = (i % 251) as u8;
        folded = folded.wrapping_add(u64::from(fill));
        queue.push(&vec![fill; size])?;
    }

    let consumed = consumer.join().unwrap()?;
    println!(
        "odict: queue, {} items of {} bytes in {:?}",
        count,
        size,
        start.elapsed()
    );
    assert!(folded == consumed, "{} != {}", folded, consumed);
    assert_eq!(queue.len(), 0);

    Ok(())
}
