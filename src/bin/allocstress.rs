//! Stress and time an allocator from several threads at once.
//!
//! ```text
//! allocstress                                     # 4 threads x 30000 x 5 iterations against malloc
//! allocstress "mmap_threshold:131072,arena_max:2" # glibc tunables, applied before anything is allocated
//! allocstress "fail_above:65536"                  # prove exhaustion is caught
//! allocstress "reuse_live:1000"                   # prove corruption is caught
//! RUST_LOG=debug allocstress --threads 8 --warmup-ms 500
//! ```

use allocstress::*;
use allocstress::allocator::adapt::Counting;
use allocstress::allocator::debug::{FailAbove, Null, ReuseLive};
use allocstress::stress::RunConfig;

use clap::{Parser, ValueEnum};

use std::time::Duration;



/// What the harness always drives: fault injection layers on top of statistics on top of the allocator under test.
type Stack<A> = ReuseLive<FailAbove<Counting<A>>>;

fn stack<A>(allocator: A) -> Stack<A> { ReuseLive::new(FailAbove::new(Counting::new(allocator))) }

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)] enum Allocator {
    /// libc `malloc` / `free` (or whatever replaces it in this process)
    #[cfg(feature = "c")] Malloc,
    /// `HeapAlloc` / `HeapFree` on `GetProcessHeap()`
    #[cfg(all(windows, feature = "win32"))] Heap,
    /// Never allocates anything
    Null,
}

#[derive(Parser, Debug)] #[command(version, about)] struct Args {
    /// Allocator configuration string (`key:value,...`), applied before anything is allocated
    #[arg(env = "ALLOCSTRESS_CONF")]
    conf: Option<String>,

    /// Worker threads
    #[arg(long, default_value_t = RunConfig::default().threads)]
    threads: usize,

    /// Each iteration makes slightly less than this many allocations per worker
    #[arg(long, default_value_t = RunConfig::default().max_allocs)]
    max_allocs: usize,

    /// Iterations per worker
    #[arg(long, default_value_t = RunConfig::default().iterations)]
    iterations: usize,

    /// How long workers spin to warm up before timing starts
    #[arg(long, default_value_t = RunConfig::default().warmup.as_millis() as u64)]
    warmup_ms: u64,

    /// Allocator under test
    #[cfg_attr(feature = "c", arg(long, value_enum, default_value = "malloc"))]
    #[cfg_attr(not(feature = "c"), arg(long, value_enum, default_value = "null"))]
    allocator: Allocator,

    /// Statistics flags: `g` omits general info, `b` small size classes, `l` large size classes
    #[arg(long, default_value_t = RunConfig::default().stats_opts)]
    stats_opts: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    log::debug!("{args:?}");

    let config = RunConfig {
        threads:    args.threads,
        max_allocs: args.max_allocs,
        iterations: args.iterations,
        warmup:     Duration::from_millis(args.warmup_ms),
        stats_opts: args.stats_opts,
        conf:       args.conf,
    };

    let report = match args.allocator {
        #[cfg(feature = "c")] Allocator::Malloc => stress::run(&stack(allocator::c::Malloc), &config),
        #[cfg(all(windows, feature = "win32"))] Allocator::Heap => stress::run(&stack(allocator::win32::ProcessHeap), &config),
        Allocator::Null => stress::run(&stack(Null), &config),
    };

    std::process::exit(report.exit_code())
}
