use crate::*;
use crate::error::*;
use crate::meta::Meta;

use core::sync::atomic::{AtomicUsize, Ordering::Relaxed};



/// Fail allocations larger than a configurable threshold (`fail_above:N`) without ever reaching `A`.
///
/// Disabled (everything is forwarded to `A`) until configured.
#[derive(Debug)] pub struct FailAbove<A> {
    inner:      A,
    threshold:  AtomicUsize,
}

impl<A> FailAbove<A> {
    pub const fn new(inner: A) -> Self { Self { inner, threshold: AtomicUsize::new(usize::MAX) } }

    /// Fail allocations of more than `threshold` bytes.
    pub fn with_threshold(inner: A, threshold: usize) -> Self { Self { inner, threshold: AtomicUsize::new(threshold) } }

    pub fn inner(&self) -> &A { &self.inner }
}

impl<A: Meta> Meta for FailAbove<A> {
    type Error                  = Option<A::Error>;
    const MAX_ALIGN : usize     = A::MAX_ALIGN;
    const MAX_SIZE  : usize     = A::MAX_SIZE;
}

// SAFETY: ✔️ either forwards to `A`, or fails
unsafe impl<A: thin::Alloc> thin::Alloc for FailAbove<A> {
    fn alloc_uninit(&self, size: usize) -> Result<AllocNN, Self::Error> {
        if size > self.threshold.load(Relaxed) { return Err(None) }
        self.inner.alloc_uninit(size).map_err(Some)
    }
}

// SAFETY: ✔️ every allocation we hand out came from `A`
unsafe impl<A: thin::Free> thin::Free for FailAbove<A> {
    unsafe fn free(&self, ptr: AllocNN) { unsafe { self.inner.free(ptr) } }
}

impl<A: conf::Configure> conf::Configure for FailAbove<A> {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> {
        match key {
            "fail_above" => {
                self.threshold.store(conf::parse_usize(key, value)?, Relaxed);
                Ok(true)
            },
            _ => self.inner.configure(key, value),
        }
    }
}

impl<A: stats::StatsPrint> stats::StatsPrint for FailAbove<A> {
    fn stats_print(&self, sink: &mut dyn FnMut(&str), opts: &str) { self.inner.stats_print(sink, opts) }
}



#[cfg(feature = "c")] #[test] fn thin_threshold() {
    use crate::allocator::c::Malloc;
    use conf::Configure;
    use thin::{Alloc, Free};

    let a = FailAbove::new(Malloc);
    thin::test::palette_round_trip(&a);

    assert_eq!(a.configure("fail_above", "64k"), Ok(true));
    assert_eq!(a.alloc_uninit(99999), Err(None));
    assert_eq!(a.alloc_uninit(128 * 1024), Err(None));
    let ok = a.alloc_uninit(64 * 1024).expect("at the threshold");
    unsafe { a.free(ok) };

    assert_eq!(a.configure("fail_above", "big").map_err(|e| e.kind), Err(ConfErrorKind::InvalidValue));
    assert_eq!(a.configure("nope", "1"), Ok(false));
}

#[test] fn thin_forwards_inner_errors() {
    use crate::allocator::debug::Null;
    use thin::Alloc;
    assert_eq!(FailAbove::new(Null).alloc_uninit(16), Err(Some(())));
    assert_eq!(FailAbove::with_threshold(Null, 8).alloc_uninit(16), Err(None));
}
