use super::SIZES;

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;



/// A worker's deterministic stream of [`SIZES`] indices.
///
/// Seeded only from the worker's thread index: the same index always reproduces the same workload,
/// regardless of how many other workers run alongside it.
#[derive(Clone, Debug)] pub struct Workload {
    rng:    StdRng,
    dist:   Uniform<usize>,
}

impl Workload {
    /// The timed allocate/free stream for `thread`.
    pub fn new(thread: usize) -> Self {
        Self {
            rng:    StdRng::seed_from_u64((thread as u64).wrapping_mul(17)),
            dist:   Uniform::new(0, SIZES.len()),
        }
    }

    /// The warmup spin stream for `thread`: starts from the same state as the timed stream, but is consumed independently.
    ///
    /// Its values are only ever summed into the [`WarmupBarrier`](super::WarmupBarrier) accumulator.
    pub fn warmup(thread: usize) -> Self { Self::new(thread) }

    /// Next index into [`SIZES`].
    #[inline] pub fn next_index(&mut self) -> usize { self.dist.sample(&mut self.rng) }

    /// Next `(index, size)` from [`SIZES`].
    #[inline] pub fn next_size(&mut self) -> (usize, usize) {
        let index = self.next_index();
        (index, SIZES[index])
    }

    /// How many allocations to make this iteration: slightly less than `max`.
    pub fn next_count(&mut self, max: usize) -> usize { max.saturating_sub(self.next_index()) }
}



#[cfg(test)] fn indices(mut w: Workload, n: usize) -> Vec<usize> { (0 .. n).map(|_| w.next_index()).collect() }

#[test] fn reproducible() {
    for thread in [0, 1, 2, 3, 17, 1000] {
        assert_eq!(indices(Workload::new(thread), 256), indices(Workload::new(thread), 256), "thread {thread}");
    }
}

#[test] fn distinct_per_thread() {
    let streams = (0 .. 16).map(|thread| indices(Workload::new(thread), 64)).collect::<Vec<_>>();
    for i in 0 .. streams.len() {
        for j in i+1 .. streams.len() {
            assert_ne!(streams[i], streams[j], "threads {i} and {j} share a workload");
        }
    }
}

#[test] fn warmup_independent() {
    let mut timed  = Workload::new(5);
    let mut warmup = Workload::warmup(5);
    for _ in 0 .. 1000 { warmup.next_index(); }
    let actual = (0 .. 32).map(|_| timed.next_index()).collect::<Vec<_>>();
    assert_eq!(indices(Workload::new(5), 32), actual, "consuming the warmup stream must not perturb the timed stream");
}

#[test] fn ranges() {
    let mut w = Workload::new(9);
    let mut seen = [false; SIZES.len()];
    for _ in 0 .. 10_000 {
        let (index, size) = w.next_size();
        assert_eq!(SIZES[index], size);
        seen[index] = true;
    }
    assert!(seen.iter().all(|&s| s), "uniform over the whole palette");

    for _ in 0 .. 1000 {
        let n = w.next_count(30000);
        assert!((30000 - SIZES.len() + 1 ..= 30000).contains(&n));
    }
    assert_eq!(w.next_count(0), 0);
}
