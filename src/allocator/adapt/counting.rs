use crate::*;
use crate::error::*;
use crate::meta::Meta;
use crate::util::bytes::Pretty;

use core::fmt::Write;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};



/// Requests of at most this many bytes are reported as "small" size classes ("bins"), anything larger as "large".
pub const LARGE_MIN : usize = 16 << 10;

/// Power of two size classes: class `n` holds allocations of `(2ⁿ⁻¹, 2ⁿ]` bytes (class `0` holds `0` and `1` byte allocations.)
const CLASSES : usize = usize::BITS as usize + 1;

/// Counter shards.  Threads are assigned shards round robin, so up to this many threads never share a counter.
const SHARDS : usize = 64;

fn class_of(size: usize) -> usize { if size <= 1 { 0 } else { (usize::BITS - (size - 1).leading_zeros()) as usize } }
fn class_size(class: usize) -> u64 { 1u64.checked_shl(class as u32).unwrap_or(u64::MAX) }

fn shard() -> usize {
    static NEXT : AtomicUsize = AtomicUsize::new(0);
    thread_local! { static SHARD : usize = NEXT.fetch_add(1, Relaxed) % SHARDS; }
    SHARD.with(|s| *s)
}



/// Adapt `A` to track allocation statistics, reported through [`stats::StatsPrint`].
///
/// Requests are forwarded to `A` unchanged: no headers, no padding.
/// Allocations are attributed to size classes by their usable size, as reported by <code>[thin::SizeOfDebug]::[size_of](thin::SizeOfDebug::size_of)</code>.
/// Allocations `A` can't report a size for are only counted, not attributed.
///
/// Counters are relaxed atomics, sharded per thread, so workers don't contend on them.
#[derive(Debug)] pub struct Counting<A> {
    inner:      A,
    shards:     Box<[Shard]>,
}

#[derive(Debug)] #[repr(align(128))] struct Shard {
    nmalloc:    AtomicU64,
    ndalloc:    AtomicU64,
    nfailed:    AtomicU64,
    requested:  AtomicU64,
    allocated:  AtomicUsize, // wraps if this shard's thread frees memory another thread allocated
    classes:    [Class; CLASSES],
}

#[derive(Debug)] struct Class {
    nmalloc:    AtomicU64,
    ndalloc:    AtomicU64,
}

impl Shard {
    fn new() -> Self {
        Self {
            nmalloc:    AtomicU64::new(0),
            ndalloc:    AtomicU64::new(0),
            nfailed:    AtomicU64::new(0),
            requested:  AtomicU64::new(0),
            allocated:  AtomicUsize::new(0),
            classes:    [const { Class { nmalloc: AtomicU64::new(0), ndalloc: AtomicU64::new(0) } }; CLASSES],
        }
    }
}

/// A snapshot of [`Counting`]'s totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)] pub struct Stats {
    /// Successful allocations
    pub nmalloc:    u64,
    /// Frees
    pub ndalloc:    u64,
    /// Allocations `A` failed
    pub nfailed:    u64,
    /// Bytes requested by successful allocations, ever
    pub requested:  u64,
    /// Usable bytes currently allocated (of allocations `A` could report a size for)
    pub allocated:  usize,
}

impl Stats {
    /// Allocations not yet freed
    pub fn live(&self) -> u64 { self.nmalloc.saturating_sub(self.ndalloc) }
}

impl<A> Counting<A> {
    pub fn new(inner: A) -> Self { Self { inner, shards: (0 .. SHARDS).map(|_| Shard::new()).collect() } }

    pub fn inner(&self) -> &A { &self.inner }

    pub fn stats(&self) -> Stats {
        let mut s = Stats::default();
        for shard in self.shards.iter() {
            s.nmalloc   += shard.nmalloc.load(Relaxed);
            s.ndalloc   += shard.ndalloc.load(Relaxed);
            s.nfailed   += shard.nfailed.load(Relaxed);
            s.requested += shard.requested.load(Relaxed);
            s.allocated  = s.allocated.wrapping_add(shard.allocated.load(Relaxed));
        }
        s
    }

    fn local(&self) -> &Shard { &self.shards[shard()] }

    /// `(nmalloc, ndalloc)` of `class`, summed over every shard.
    fn class_counts(&self, class: usize) -> (u64, u64) {
        self.shards.iter().map(|s| &s.classes[class]).fold((0, 0), |(m, d), c| (m + c.nmalloc.load(Relaxed), d + c.ndalloc.load(Relaxed)))
    }
}

impl<A: Meta> Meta for Counting<A> {
    type Error                  = A::Error;
    const MAX_ALIGN : usize     = A::MAX_ALIGN;
    const MAX_SIZE  : usize     = A::MAX_SIZE;
}

// SAFETY: ✔️ allocations are `A`'s, unmodified
unsafe impl<A: thin::Alloc + thin::SizeOfDebug> thin::Alloc for Counting<A> {
    fn alloc_uninit(&self, size: usize) -> Result<AllocNN, Self::Error> {
        let shard = self.local();
        let alloc = self.inner.alloc_uninit(size).map_err(|err| {
            shard.nfailed.fetch_add(1, Relaxed);
            err
        })?;
        shard.nmalloc.fetch_add(1, Relaxed);
        shard.requested.fetch_add(size as u64, Relaxed);
        // SAFETY: ✔️ `alloc` was just allocated by `self.inner`
        if let Some(usable) = unsafe { self.inner.size_of(alloc) } {
            shard.classes[class_of(usable)].nmalloc.fetch_add(1, Relaxed);
            shard.allocated.fetch_add(usable, Relaxed);
        }
        Ok(alloc)
    }
}

// SAFETY: ✔️ every allocation we hand out came from `A`
unsafe impl<A: thin::Free + thin::SizeOfDebug> thin::Free for Counting<A> {
    unsafe fn free(&self, ptr: AllocNN) {
        let shard = self.local();
        shard.ndalloc.fetch_add(1, Relaxed);
        // SAFETY: ✔️ `ptr` belongs to `self` per thin::Free::free's documented safety preconditions, and thus to `self.inner`
        if let Some(usable) = unsafe { self.inner.size_of(ptr) } {
            shard.classes[class_of(usable)].ndalloc.fetch_add(1, Relaxed);
            shard.allocated.fetch_sub(usable, Relaxed);
        }
        // SAFETY: ✔️ `ptr` came from `A`
        unsafe { self.inner.free(ptr) }
    }
}

// SAFETY: ✔️ forwards to `A`, which owns every allocation
unsafe impl<A: thin::SizeOfDebug> thin::SizeOfDebug for Counting<A> {
    unsafe fn size_of(&self, ptr: AllocNN) -> Option<usize> { unsafe { self.inner.size_of(ptr) } }
}

impl<A: conf::Configure> conf::Configure for Counting<A> {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> { self.inner.configure(key, value) }
}

impl<A: Meta> stats::StatsPrint for Counting<A> {
    fn stats_print(&self, sink: &mut dyn FnMut(&str), opts: &str) {
        let _ = self.write_report(&mut stats::Sink(sink), opts);
    }
}

impl<A: Meta> Counting<A> {
    fn write_report(&self, w: &mut impl Write, opts: &str) -> core::fmt::Result {
        let general = !opts.contains('g');
        let bins    = !opts.contains('b');
        let large   = !opts.contains('l');
        let s       = self.stats();

        writeln!(w, "___ Begin allocstress statistics ___")?;
        if general {
            writeln!(w, "Allocator: {}", core::any::type_name::<A>())?;
            writeln!(w, "Alignment: {}", A::MAX_ALIGN)?;
            writeln!(w, "Assertions {}", if cfg!(debug_assertions) { "enabled" } else { "disabled" })?;
        }
        writeln!(w, "Allocated: {}, requested: {}", Pretty(s.allocated as u64), Pretty(s.requested))?;
        writeln!(w, "Allocations: nmalloc: {}, ndalloc: {}, nfailed: {}, live: {}", s.nmalloc, s.ndalloc, s.nfailed, s.live())?;
        if bins  { self.write_classes(w, "bins:",  "curregs",     |size| size <= LARGE_MIN as u64)? }
        if large { self.write_classes(w, "large:", "curlextents", |size| size >  LARGE_MIN as u64)? }
        writeln!(w, "___ End allocstress statistics ___")
    }

    fn write_classes(&self, w: &mut impl Write, title: &str, cur: &str, include: impl Fn(u64) -> bool) -> core::fmt::Result {
        writeln!(w, "{title: <8}{: >12}{: >14}{: >14}{: >14}", "size", "nmalloc", "ndalloc", cur)?;
        for class in 0 .. CLASSES {
            let size = class_size(class);
            if !include(size) { continue }
            let (nmalloc, ndalloc) = self.class_counts(class);
            if nmalloc == 0 && ndalloc == 0 { continue }
            writeln!(w, "{: <8}{: >12}{: >14}{: >14}{: >14}", "", Pretty(size).to_string(), nmalloc, ndalloc, nmalloc.saturating_sub(ndalloc))?;
        }
        Ok(())
    }
}



#[test] fn classes() {
    assert_eq!(class_of(0), 0);
    assert_eq!(class_of(1), 0);
    assert_eq!(class_of(2), 1);
    assert_eq!(class_of(16), 4);
    assert_eq!(class_of(17), 5);
    assert_eq!(class_of(99999), 17);
    assert_eq!(class_of(128 * 1024), 17);
    assert_eq!(class_of(usize::MAX), CLASSES - 1);
    assert_eq!(class_size(17), 128 * 1024);
}

#[cfg(feature = "c")] #[test] fn thin_palette() {
    use crate::allocator::c::Malloc;
    thin::test::palette_round_trip(Counting::new(Malloc));
    thin::test::largest_palette_size(Counting::new(Malloc));
    thin::test::exclusive(Counting::new(Malloc));
    thin::test::size_of_covers_request(Counting::new(Malloc));
}

#[cfg(feature = "c")] #[test] fn forwards_exact_sizes() {
    use crate::allocator::c::Malloc;
    use crate::stress::SIZES;
    use thin::{Alloc, Free};

    let a = Counting::new(thin::test::Recording::new(Malloc));
    let allocs = SIZES.iter().map(|&size| a.alloc_uninit(size).unwrap()).collect::<Vec<_>>();
    for alloc in allocs { unsafe { a.free(alloc) } }
    assert_eq!(a.inner().requests(), SIZES);
}

#[cfg(feature = "c")] #[test] fn counts() {
    use crate::allocator::c::Malloc;
    use thin::{Alloc, Free, SizeOfDebug};

    let a = Counting::new(Malloc);
    let x = a.alloc_uninit(60).unwrap();
    let y = a.alloc_uninit(99999).unwrap();
    let usable = |p| unsafe { a.size_of(p) }.unwrap_or(0);
    let (ux, uy) = (usable(x), usable(y));
    assert_eq!(a.stats(), Stats { nmalloc: 2, ndalloc: 0, nfailed: 0, requested: 100059, allocated: ux + uy });
    unsafe { a.free(y) };
    assert_eq!(a.stats().allocated, ux);
    let z = a.alloc_uninit(16).unwrap();
    unsafe { a.free(x) };
    unsafe { a.free(z) };
    let s = a.stats();
    assert_eq!((s.nmalloc, s.ndalloc, s.live(), s.allocated, s.requested), (3, 3, 0, 0, 100075));
}

#[cfg(feature = "c")] #[test] fn counts_across_threads() {
    use crate::allocator::c::Malloc;
    use thin::{Alloc, Free};

    let a = Counting::new(Malloc);
    std::thread::scope(|s| {
        for _ in 0 .. 8 {
            s.spawn(|| for _ in 0 .. 100 {
                let p = a.alloc_uninit(120).unwrap();
                unsafe { a.free(p) };
            });
        }
    });
    let s = a.stats();
    assert_eq!((s.nmalloc, s.ndalloc, s.allocated, s.requested), (800, 800, 0, 800 * 120));
}

#[test] fn counts_failures() {
    use crate::allocator::debug::Null;
    use thin::Alloc;
    let a = Counting::new(Null);
    assert_eq!(a.alloc_uninit(16), Err(()));
    assert_eq!(a.alloc_uninit(usize::MAX), Err(()));
    assert_eq!(a.stats().nfailed, 2);
    assert_eq!(a.stats().nmalloc, 0);
}

#[test] fn report_null() {
    use crate::allocator::debug::Null;
    let report = stats::to_string(&Counting::new(Null), "");
    assert!(report.contains(&format!("\nAlignment: {}\n", 2 * core::mem::size_of::<usize>())), "{report}");
    assert!(report.contains("\nAllocated: 0 B, requested: 0 B\n"), "{report}");
}

#[cfg(feature = "c")] #[test] fn report() {
    use crate::allocator::c::Malloc;
    use thin::{Alloc, Free, SizeOfDebug};

    let a = Counting::new(Malloc);
    let small = a.alloc_uninit(60).unwrap();
    let large = a.alloc_uninit(99999).unwrap();
    let usable = unsafe { a.size_of(small) }.unwrap_or(0) + unsafe { a.size_of(large) }.unwrap_or(0);

    let full = stats::to_string(&a, "");
    assert!(full.starts_with("___ Begin allocstress statistics ___\n"));
    assert!(full.ends_with("___ End allocstress statistics ___\n"));
    assert!(full.contains("Allocator: "));
    assert!(full.contains(&format!("\nAllocated: {}, requested: 100059 B\n", Pretty(usable as u64))), "{full}");
    assert!(full.contains("Allocations: nmalloc: 2, ndalloc: 0, nfailed: 0, live: 2"));
    assert!(full.contains("bins:"));
    assert!(full.contains("large:"));

    let brief = stats::to_string(&a, "blam");
    assert!(!brief.contains("bins:"));
    assert!(!brief.contains("large:"));
    assert!(brief.contains("Allocator: "));
    assert!(brief.contains("Allocations: nmalloc: 2"));

    assert!(!stats::to_string(&a, "g").contains("Allocator: "));

    unsafe { a.free(small) };
    unsafe { a.free(large) };
}
