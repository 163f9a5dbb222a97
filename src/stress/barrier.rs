use core::sync::atomic::{AtomicBool, AtomicI32, Ordering::{Acquire, Relaxed, Release}};



/// The accumulator value that indicates the warmup spin was optimized out.
pub const GUARD_SENTINEL : i32 = -1;

/// Workers spin (warming CPU caches, branch predictors, and clocks) until the coordinator ends warmup,
/// then cross into their timed work together.
///
/// The accumulator gives the spin a side effect visible to the coordinator, so it can't be discarded as dead code.
#[derive(Debug)] pub struct WarmupBarrier {
    warming:        AtomicBool,
    accumulator:    AtomicI32,
}

impl Default for WarmupBarrier { fn default() -> Self { Self::new() } }

impl WarmupBarrier {
    pub const fn new() -> Self { Self { warming: AtomicBool::new(true), accumulator: AtomicI32::new(0) } }

    /// `true` until [`finish`](Self::finish) is called.  Transitions exactly once.
    #[inline(always)] pub fn warming(&self) -> bool { self.warming.load(Acquire) }

    /// End warmup for every worker.
    pub fn finish(&self) { self.warming.store(false, Release) }

    /// Spin on `step` until warmup ends, publishing the wrapping sum of its results.  Returns how many steps were taken.
    pub fn spin(&self, mut step: impl FnMut() -> i32) -> u64 {
        let mut sum = 0i32;
        let mut steps = 0u64;
        while self.warming() {
            sum = sum.wrapping_add(step());
            steps += 1;
        }
        self.accumulator.store(sum, Relaxed);
        steps
    }

    /// The last published warmup sum.  Only meaningful once every worker has been joined.
    pub fn guard(&self) -> i32 { self.accumulator.load(Relaxed) }

    /// `true` if [`guard`](Self::guard) holds the [`GUARD_SENTINEL`].
    pub fn guard_tripped(&self) -> bool { self.guard() == GUARD_SENTINEL }
}



#[test] fn spin_until_finished() {
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    let barrier = WarmupBarrier::new();
    let steps = AtomicU64::new(0);
    std::thread::scope(|s| {
        let spinner = s.spawn(|| barrier.spin(|| { steps.fetch_add(1, Relaxed); 2 }));
        std::thread::sleep(Duration::from_millis(20));
        assert!(barrier.warming());
        barrier.finish();
        let n = spinner.join().unwrap();
        assert_eq!(n, steps.load(Relaxed));
        assert_eq!(barrier.guard(), (n as i32).wrapping_mul(2));
    });
    assert!(!barrier.warming());
}

#[test] fn finished_before_spin() {
    let barrier = WarmupBarrier::new();
    barrier.finish();
    assert_eq!(barrier.spin(|| 1), 0);
    assert_eq!(barrier.guard(), 0);
    assert!(!barrier.guard_tripped());
}

#[test] fn sentinel() {
    let barrier = WarmupBarrier::new();
    let mut first = true;
    barrier.spin(|| if core::mem::take(&mut first) { barrier.finish(); -1 } else { 0 });
    assert!(barrier.guard_tripped());
}
