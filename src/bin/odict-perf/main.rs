use structopt::StructOpt;

mod perf_cache;
mod perf_dict;
#[cfg(unix)]
mod perf_queue;
mod perf_shm;

/// Command line options.
#[derive(Clone, StructOpt)]
pub struct Opt {
    #[structopt(subcommand)]
    subcmd: SubCommand,
}

#[derive(Clone, StructOpt)]
pub enum SubCommand {
    /// dict-subcommand, random workload over a chosen engine.
    Dict {
        /// engine, one of bst, rb, bt, sl, sa.
        #[structopt(short = "t", long = "typ", default_value = "rb")]
        typ: String,

        /// number of operations to run.
        #[structopt(short = "c", long = "count", default_value = "1000000")]
        count: usize,

        #[structopt(long = "seed", default_value = "0")]
        seed: u64,

        /// optional toml profile overriding the workload mix.
        #[structopt(long = "profile", default_value = "")]
        profile: String,
    },
    /// cache-subcommand, random workload over the in-memory cache.
    Cache {
        /// eviction algorithm, FIFO or LRU.
        #[structopt(short = "a", long = "algo", default_value = "LRU")]
        algo: String,

        #[structopt(short = "c", long = "count", default_value = "1000000")]
        count: usize,

        /// cache capacity in items.
        #[structopt(short = "s", long = "size", default_value = "10000")]
        size: usize,

        /// hammer the thread-safe wrapper with this many threads,
        /// zero runs the single-threaded core.
        #[structopt(long = "threads", default_value = "0")]
        threads: usize,

        #[structopt(long = "seed", default_value = "0")]
        seed: u64,
    },
    /// shmcache-subcommand, workload over the shared-memory cache.
    Shmcache {
        #[structopt(short = "a", long = "algo", default_value = "FIFO")]
        algo: String,

        #[structopt(short = "c", long = "count", default_value = "100000")]
        count: usize,

        /// record capacity of the mapped region.
        #[structopt(short = "s", long = "size", default_value = "10000")]
        size: usize,

        /// backing file, a scratch file when left empty.
        #[structopt(long = "path", default_value = "")]
        path: String,

        #[structopt(long = "seed", default_value = "0")]
        seed: u64,
    },
    /// shmqueue-subcommand, producer/consumer over the mapped queue.
    #[cfg(unix)]
    Shmqueue {
        #[structopt(short = "c", long = "count", default_value = "100000")]
        count: usize,

        /// queue item size in bytes.
        #[structopt(short = "s", long = "size", default_value = "64")]
        size: usize,

        #[structopt(long = "path", default_value = "")]
        path: String,
    },
}

fn main() {
    env_logger::init();

    let opts = Opt::from_iter(std::env::args_os());
    let res = match opts.subcmd {
        SubCommand::Dict { .. } => perf_dict::perf(opts.subcmd),
        SubCommand::Cache { .. } => perf_cache::perf(opts.subcmd),
        SubCommand::Shmcache { .. } => perf_shm::perf(opts.subcmd),
        #[cfg(unix)]
        SubCommand::Shmqueue { .. } => perf_queue::perf(opts.subcmd),
    };

    if let Err(err) = res {
        println!("odict: error {}", err);
        std::process::exit(1);
    }
}
