use super::*;
use crate::*;
use crate::error::ConfError;

use std::time::{Duration, Instant};



/// Fixed parameters of a run.
#[derive(Clone, Debug, PartialEq, Eq)] pub struct RunConfig {
    /// Worker threads to spawn
    pub threads:        usize,
    /// Each iteration makes slightly less than this many allocations
    pub max_allocs:     usize,
    /// Iterations per worker
    pub iterations:     usize,
    /// How long workers spin before the timed phase starts
    pub warmup:         Duration,
    /// [`StatsPrint`](stats::StatsPrint) flags for the final report
    pub stats_opts:     String,
    /// Allocator configuration string, applied before anything is allocated
    pub conf:           Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threads:        4,
            max_allocs:     30000,
            iterations:     5,
            warmup:         Duration::from_secs(2),
            stats_opts:     "blam".into(),
            conf:           None,
        }
    }
}

/// The outcome of a run that wasn't terminated by a [`Fault`].
#[derive(Clone, Debug, PartialEq, Eq)] pub struct RunReport {
    /// Wall clock time from the end of warmup until the last worker was joined
    pub elapsed:        Duration,
    /// The warmup accumulator, as last published by any worker
    pub guard:          i32,
    /// Configuration pairs the allocator rejected
    pub conf_errors:    Vec<ConfError>,
    pub workers:        Vec<WorkerReport>,
}

impl RunReport {
    /// Process exit status: `0`, or `1` if the warmup accumulator ended up as the [`GUARD_SENTINEL`].
    pub fn exit_code(&self) -> i32 { (self.guard == GUARD_SENTINEL) as i32 }

    /// Allocations made by every worker in the timed phase.
    pub fn allocations(&self) -> u64 { self.workers.iter().map(|w| w.allocations).sum() }
}

/// Drive `allocator` through a full run:
///
/// 1.  apply `config.conf` (rejected pairs are reported on stderr, then ignored)
/// 2.  prime the allocator and print the banner
/// 3.  spawn `config.threads` workers, which spin on the [`WarmupBarrier`]
/// 4.  sleep `config.warmup`, end warmup, and start the clock
/// 5.  join every worker, stop the clock, print the elapsed time
/// 6.  print the allocator's statistics with `config.stats_opts`
///
/// Any [`Fault`] in a worker terminates the process before this returns.
pub fn run<A>(allocator: &A, config: &RunConfig) -> RunReport where A : thin::Alloc + thin::Free + conf::Configure + stats::StatsPrint + Sync {
    let conf_errors = conf::apply(allocator, config.conf.as_deref().unwrap_or(""));
    for err in &conf_errors { eprintln!("<allocstress>: {err}") }

    if let Ok(ptr) = allocator.alloc_uninit(1) {
        // SAFETY: ✔️ `ptr` was just allocated by `allocator` and is never touched again
        unsafe { allocator.free(ptr) };
    }

    println!("Starting {} threads x {} x {} iterations...", config.threads, config.max_allocs, config.iterations);

    let barrier = WarmupBarrier::new();
    let (elapsed, workers) = std::thread::scope(|scope| {
        let handles = (0 .. config.threads).map(|thread| {
            let barrier = &barrier;
            std::thread::Builder::new()
                .name(format!("allocstress-{thread}"))
                .spawn_scoped(scope, move || Worker::new(thread, allocator, config.max_allocs).run(barrier, config.iterations))
        }).collect::<Result<Vec<_>, _>>();

        // without every worker, there's nothing meaningful to time
        let handles = match handles {
            Ok(handles) => handles,
            Err(err) => {
                eprintln!("<allocstress>: unable to spawn worker threads: {err}");
                barrier.finish();
                std::process::exit(2)
            },
        };

        log::debug!("{} workers spawned, warming up for {:?}", handles.len(), config.warmup);
        std::thread::sleep(config.warmup);
        barrier.finish();
        let start = Instant::now();

        let workers = handles.into_iter().map(|h| match h.join() {
            Ok(report)  => report,
            Err(panic)  => std::panic::resume_unwind(panic),
        }).collect::<Vec<_>>();
        (start.elapsed(), workers)
    });

    println!("\nDone. Run time: {} ms", elapsed.as_millis());
    allocator.stats_print(&mut |chunk| print!("{chunk}"), &config.stats_opts);

    let report = RunReport { elapsed, guard: barrier.guard(), conf_errors, workers };
    log::debug!("{} allocations in {:?}, warmup guard {}", report.allocations(), report.elapsed, report.guard);
    report
}



#[cfg(all(test, feature = "c"))] mod tests {
    use super::*;
    use crate::allocator::adapt::Counting;
    use crate::allocator::c::Malloc;
    use crate::allocator::debug::{FailAbove, ReuseLive};
    use crate::error::ConfErrorKind;

    fn small(conf: Option<&str>) -> RunConfig {
        RunConfig { threads: 4, max_allocs: 100, iterations: 3, warmup: Duration::from_millis(20), conf: conf.map(String::from), .. RunConfig::default() }
    }

    #[test] fn defaults() {
        let c = RunConfig::default();
        assert_eq!((c.threads, c.max_allocs, c.iterations, c.warmup), (4, 30000, 5, Duration::from_secs(2)));
        assert_eq!(c.stats_opts, "blam");
        assert_eq!(c.conf, None);
    }

    #[test] fn completes() {
        let a = ReuseLive::new(FailAbove::new(Counting::new(Malloc)));
        let report = run(&a, &small(None));
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.workers.len(), 4);
        assert!(report.workers.iter().enumerate().all(|(i, w)| w.thread == i));
        assert!(report.conf_errors.is_empty());

        let s = a.inner().inner().stats();
        assert_eq!(s.nmalloc, report.allocations() + 1 + 4); // + coordinator and worker priming
        assert_eq!(s.live(), 0);
        assert_eq!(s.nfailed, 0);
    }

    #[test] fn empty_conf_is_no_conf() {
        let none    = Counting::new(Malloc);
        let empty   = Counting::new(Malloc);
        let a = run(&none,  &small(None));
        let b = run(&empty, &small(Some("")));
        assert!(a.conf_errors.is_empty() && b.conf_errors.is_empty());
        assert_eq!(a.allocations(), b.allocations());
        assert_eq!(none.stats().requested, empty.stats().requested);
    }

    #[test] fn conf_errors_reported() {
        let a = ReuseLive::new(FailAbove::new(Counting::new(Malloc)));
        let report = run(&a, &small(Some("bogus:1,fail_above:lots")));
        let kinds = report.conf_errors.iter().map(|e| e.kind).collect::<Vec<_>>();
        assert_eq!(kinds, [ConfErrorKind::UnknownKey, ConfErrorKind::InvalidValue]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test] fn exit_code() {
        let report = |guard| RunReport { elapsed: Duration::ZERO, guard, conf_errors: Vec::new(), workers: Vec::new() };
        assert_eq!(report(0).exit_code(), 0);
        assert_eq!(report(12345).exit_code(), 0);
        assert_eq!(report(GUARD_SENTINEL).exit_code(), 1);
    }
}
