use super::*;
use crate::*;

use core::mem::MaybeUninit;
use std::hint::black_box;



/// One worker thread's context: its identity, workload streams, and outstanding allocations.
///
/// Created on (and never leaves) the thread it works on.  Allocations are never shared with other workers.
pub struct Worker<'a, A> {
    thread:         usize,
    allocator:      &'a A,
    workload:       Workload,
    warmup:         Workload,
    max_allocs:     usize,
    outstanding:    Vec<Outstanding>,
}

/// A live allocation made this iteration, and the size it was requested with.
struct Outstanding {
    ptr:    AllocNN,
    size:   usize,
}

/// What a worker did, once it's done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)] pub struct WorkerReport {
    pub thread:         usize,
    pub warmup_steps:   u64,
    pub allocations:    u64,
}

impl<'a, A: thin::Alloc + thin::Free> Worker<'a, A> {
    pub fn new(thread: usize, allocator: &'a A, max_allocs: usize) -> Self {
        Self {
            thread,
            allocator,
            workload:       Workload::new(thread),
            warmup:         Workload::warmup(thread),
            max_allocs,
            outstanding:    Vec::with_capacity(max_allocs),
        }
    }

    pub fn thread(&self) -> usize { self.thread }

    /// Prime the allocator's per-thread state, then spin until `barrier` releases every worker.
    pub fn warm_up(&mut self, barrier: &WarmupBarrier) -> u64 {
        if let Ok(ptr) = self.allocator.alloc_uninit(1) {
            // SAFETY: ✔️ `ptr` was just allocated by `self.allocator` and is never touched again
            unsafe { self.allocator.free(ptr) };
        }
        let warmup = &mut self.warmup;
        let steps = barrier.spin(|| warmup.next_index() as i32);
        log::debug!("thread {}: warmed up ({steps} spins)", self.thread);
        steps
    }

    /// Run one allocate / fill / verify / free cycle, returning how many allocations were made.
    ///
    /// Every allocation is filled with this worker's [`fingerprint`] as soon as it's made,
    /// but only verified once the whole batch exists, so later allocations that stomp on earlier ones get caught.
    /// Each allocation is freed right after it's verified.
    ///
    /// Returns the first [`Fault`] immediately: nothing more is allocated, verified, or freed this iteration,
    /// and the worker must not be reused.
    pub fn iteration(&mut self, iteration: usize) -> Result<usize, Fault> {
        let thread  = self.thread;
        let count   = self.workload.next_count(self.max_allocs);
        debug_assert!(self.outstanding.is_empty(), "bug: worker reused after a fault");

        for alloc in 0 .. count {
            let (palette_index, size) = self.workload.next_size();
            let Ok(ptr) = self.allocator.alloc_uninit(size) else {
                return Err(Fault::Exhausted { thread, iteration, alloc, size, palette_index });
            };
            // SAFETY: ✔️ `ptr` is a fresh allocation of at least `size` bytes, exclusively ours
            let bytes = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), size) };
            for (offset, byte) in bytes.iter_mut().enumerate() { *byte = MaybeUninit::new(fingerprint(thread, offset)) }
            self.outstanding.push(Outstanding { ptr, size });
        }

        for (alloc, Outstanding { ptr, size }) in self.outstanding.drain(..).enumerate() {
            let ptr = black_box(ptr); // force the verify to actually re-read memory
            // SAFETY: ✔️ `ptr` is still live and every one of its `size` bytes was initialized above
            let bytes = unsafe { core::slice::from_raw_parts(ptr.as_ptr().cast::<u8>(), size) };
            for (offset, &actual) in bytes.iter().enumerate() {
                let expected = fingerprint(thread, offset);
                if actual != expected { return Err(Fault::Corrupted { thread, iteration, alloc, offset, expected, actual }) }
            }
            // SAFETY: ✔️ `ptr` was allocated by `self.allocator`, and is removed from `outstanding` so it's never touched again
            unsafe { self.allocator.free(ptr) };
        }

        log::trace!("thread {thread}, iter {iteration}: {count} allocations verified");
        Ok(count)
    }

    /// Warm up, then run `iterations` cycles.  Any [`Fault`] [terminates](Fault::terminate) the process.
    pub fn run(mut self, barrier: &WarmupBarrier, iterations: usize) -> WorkerReport {
        let warmup_steps = self.warm_up(barrier);
        let mut allocations = 0;
        for iteration in 0 .. iterations {
            match self.iteration(iteration) {
                Ok(n)       => allocations += n as u64,
                Err(fault)  => fault.terminate(),
            }
        }
        WorkerReport { thread: self.thread, warmup_steps, allocations }
    }
}



#[cfg(all(test, feature = "c"))] mod tests {
    use super::*;
    use crate::allocator::adapt::Counting;
    use crate::allocator::c::Malloc;
    use crate::allocator::debug::{FailAbove, ReuseLive};

    #[test] fn iterations_balance() {
        let a = Counting::new(Malloc);
        let mut w = Worker::new(3, &a, 200);
        let mut total = 0;
        for i in 0 .. 5 {
            let n = w.iteration(i).expect("Malloc shouldn't fault");
            assert!((200 - SIZES.len() + 1 ..= 200).contains(&n));
            total += n as u64;
        }
        let s = a.stats();
        assert_eq!((s.nmalloc, s.ndalloc, s.allocated), (total, total, 0));
    }

    #[test] fn reproducible_sizes() {
        let a = Counting::new(Malloc);
        let b = Counting::new(Malloc);
        Worker::new(1, &a, 100).iteration(0).unwrap();
        Worker::new(1, &b, 100).iteration(0).unwrap();
        assert_eq!(a.stats(), b.stats());
    }

    #[test] fn run_after_barrier() {
        let a = Counting::new(Malloc);
        let barrier = WarmupBarrier::new();
        barrier.finish();
        let report = Worker::new(0, &a, 50).run(&barrier, 3);
        assert_eq!(report.thread, 0);
        assert_eq!(report.warmup_steps, 0);
        assert_eq!(report.allocations, a.stats().nmalloc - 1); // minus the priming allocation
        assert_eq!(a.stats().live(), 0);
    }

    #[test] fn allocator_sees_palette_sizes() {
        let a = ReuseLive::new(FailAbove::new(Counting::new(thin::test::Recording::new(Malloc))));
        let n = Worker::new(0, &a, 500).iteration(0).unwrap();

        let mut replay = Workload::new(0);
        assert_eq!(replay.next_count(500), n);
        let expected = (0 .. n).map(|_| replay.next_size().1).collect::<Vec<_>>();
        let requests = a.inner().inner().inner().requests();
        assert_eq!(requests, expected);
        assert!(SIZES.iter().all(|size| requests.contains(size)), "{requests:?}");
    }

    #[test] fn exhaustion() {
        let a = FailAbove::with_threshold(Malloc, 1024);
        let mut w = Worker::new(2, &a, 1000);
        match w.iteration(0) {
            Err(Fault::Exhausted { thread, iteration, size, palette_index, .. }) => {
                assert_eq!((thread, iteration), (2, 0));
                assert!(size > 1024);
                assert_eq!(SIZES[palette_index], size);
            },
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test] fn exhaustion_reports_first_failure() {
        // replay thread 4's workload to find where the first oversized request lands
        let mut replay = Workload::new(4);
        let _count = replay.next_count(1000);
        let first = (0usize ..).find(|_| replay.next_size().1 > 1024).unwrap();

        let a = FailAbove::with_threshold(Malloc, 1024);
        let fault = Worker::new(4, &a, 1000).iteration(0).unwrap_err();
        assert!(matches!(fault, Fault::Exhausted { alloc, .. } if alloc == first), "{fault:?} vs alloc {first}");
    }

    #[test] fn corruption() {
        let a = ReuseLive::with_every(Malloc, 2);
        let mut w = Worker::new(5, &a, 100);
        match w.iteration(0) {
            Err(Fault::Corrupted { thread, iteration, offset, expected, actual, .. }) => {
                assert_eq!((thread, iteration, offset), (5, 0, 1));
                assert_eq!(expected, fingerprint(5, 1));
                assert_eq!(actual,   fingerprint(5, 0));
            },
            other => panic!("expected corruption, got {other:?}"),
        }
    }
}
