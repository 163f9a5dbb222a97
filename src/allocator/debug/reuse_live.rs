use crate::*;
use crate::error::*;
use crate::meta::Meta;

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering::{Acquire, Relaxed, Release}};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::thread::ThreadId;



/// Simulate an allocator that reuses memory before it's released (`reuse_live:N`).
///
/// Every `N`th allocation a thread makes is satisfied by aliasing one byte into that same thread's most recent allocation,
/// if it's still live and the request fits, instead of fresh memory from `A`.  Freeing an alias is a noop.
///
/// Aliasing stays within a thread (like a misbehaving thread cache would) so the corruption is reported deterministically by its victim.
///
/// Disabled until configured, in which case no locks are taken and everything is forwarded to `A`.
/// The alias stays inside memory we own, so while the *harness* sees corruption, nothing is actually undefined behavior.
#[derive(Debug)] pub struct ReuseLive<A> {
    inner:      A,
    every:      AtomicUsize,
    aliased:    AtomicBool, // set once any alias has been handed out, never cleared
    state:      Mutex<State>,
}

#[derive(Debug, Default)] struct State {
    threads:    HashMap<ThreadId, Local>,
    aliases:    Vec<usize>,
}

#[derive(Debug, Default)] struct Local {
    count:      usize,
    last:       Option<(usize, usize)>, // (addr, size) of this thread's most recent live allocation from `A`
}

impl<A> ReuseLive<A> {
    pub fn new(inner: A) -> Self { Self { inner, every: AtomicUsize::new(0), aliased: AtomicBool::new(false), state: Default::default() } }

    /// Alias every `every`th allocation (`0` disables.)
    pub fn with_every(inner: A, every: usize) -> Self {
        let r = Self::new(inner);
        r.every.store(every, Relaxed);
        r
    }

    pub fn inner(&self) -> &A { &self.inner }

    fn state(&self) -> MutexGuard<'_, State> {
        // a worker that panicked mid-update leaves nothing half-written worth refusing
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

impl<A: Meta> Meta for ReuseLive<A> {
    type Error                  = A::Error;
    const MAX_ALIGN : usize     = 1; // aliases are offset by a byte
    const MAX_SIZE  : usize     = A::MAX_SIZE;
}

// SAFETY: ⚠️ deliberately *not* exclusive when enabled - that's the point.  Aliases stay within memory owned by `self`.
unsafe impl<A: thin::Alloc> thin::Alloc for ReuseLive<A> {
    fn alloc_uninit(&self, size: usize) -> Result<AllocNN, Self::Error> {
        let every = self.every.load(Relaxed);
        if every == 0 { return self.inner.alloc_uninit(size) }

        let mut guard = self.state();
        let state = &mut *guard;
        let local = state.threads.entry(std::thread::current().id()).or_default();
        local.count += 1;
        if local.count % every == 0 {
            if let Some((addr, last_size)) = local.last.filter(|&(_, last_size)| size < last_size) {
                let alias = addr + 1;
                state.aliases.push(alias);
                self.aliased.store(true, Release);
                log::debug!("reuse_live: aliasing {size} bytes into live allocation {addr:#x} ({last_size} bytes)");
                // SAFETY: ✔️ `addr` is a live allocation, so `addr + 1` is nonzero
                return Ok(unsafe { AllocNN::new_unchecked(alias as *mut _) });
            }
        }

        let alloc = self.inner.alloc_uninit(size)?;
        local.last = Some((alloc.as_ptr() as usize, size));
        Ok(alloc)
    }
}

// SAFETY: ✔️ aliases are never forwarded to `A`, everything else came from `A`
unsafe impl<A: thin::Free> thin::Free for ReuseLive<A> {
    unsafe fn free(&self, ptr: AllocNN) {
        if self.every.load(Relaxed) != 0 || self.aliased.load(Acquire) {
            let addr = ptr.as_ptr() as usize;
            let mut state = self.state();
            if let Some(i) = state.aliases.iter().position(|&a| a == addr) {
                state.aliases.swap_remove(i);
                return;
            }
            for local in state.threads.values_mut() {
                if local.last.map(|(last, _)| last) == Some(addr) { local.last = None }
            }
        }
        // SAFETY: ✔️ not an alias, so `ptr` came from `A`
        unsafe { self.inner.free(ptr) }
    }
}

impl<A: conf::Configure> conf::Configure for ReuseLive<A> {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> {
        match key {
            "reuse_live" => {
                self.every.store(conf::parse_usize(key, value)?, Relaxed);
                Ok(true)
            },
            _ => self.inner.configure(key, value),
        }
    }
}

impl<A: stats::StatsPrint> stats::StatsPrint for ReuseLive<A> {
    fn stats_print(&self, sink: &mut dyn FnMut(&str), opts: &str) { self.inner.stats_print(sink, opts) }
}



#[cfg(feature = "c")] #[test] fn thin_disabled_is_exclusive() {
    use crate::allocator::c::Malloc;
    thin::test::exclusive(ReuseLive::new(Malloc));
    thin::test::palette_round_trip(ReuseLive::new(Malloc));
}

#[cfg(feature = "c")] #[test] fn thin_aliases_live_allocation() {
    use crate::allocator::c::Malloc;
    use thin::{Alloc, Free};

    let a = ReuseLive::with_every(Malloc, 2);
    let first   = a.alloc_uninit(100).unwrap();
    let second  = a.alloc_uninit(50).unwrap();
    assert_eq!(second.as_ptr() as usize, first.as_ptr() as usize + 1);

    let third   = a.alloc_uninit(50).unwrap();  // odd: fresh memory
    let fourth  = a.alloc_uninit(100).unwrap(); // even, but too big to alias `third`
    assert_ne!(fourth.as_ptr() as usize, third.as_ptr() as usize + 1);

    unsafe { a.free(second) };                  // alias: noop
    for p in [first, third, fourth] { unsafe { a.free(p) } }
    assert!(a.state().aliases.is_empty());
}

#[cfg(feature = "c")] #[test] fn aliases_outlive_reconfiguration() {
    use crate::allocator::c::Malloc;
    use conf::Configure;
    use thin::{Alloc, Free};

    let a = ReuseLive::with_every(Malloc, 2);
    let first = a.alloc_uninit(100).unwrap();
    let alias = a.alloc_uninit(50).unwrap();
    assert_eq!(alias.as_ptr() as usize, first.as_ptr() as usize + 1);

    assert_eq!(a.configure("reuse_live", "0"), Ok(true));
    unsafe { a.free(alias) };                   // still recognized as an alias: never reaches `free`
    assert!(a.state().aliases.is_empty());
    unsafe { a.free(first) };
}

#[cfg(feature = "c")] #[test] fn thin_never_aliases_across_threads() {
    use crate::allocator::c::Malloc;
    use thin::{Alloc, Free};

    let a = ReuseLive::with_every(Malloc, 2);
    let first = a.alloc_uninit(100).unwrap();
    let other = std::thread::scope(|s| s.spawn(|| {
        let x = a.alloc_uninit(50).unwrap(); // this thread's 1st: fresh
        let y = a.alloc_uninit(50).unwrap(); // this thread's 2nd: too big to alias `x`
        let addrs = (x.as_ptr() as usize, y.as_ptr() as usize);
        unsafe { a.free(x) };
        unsafe { a.free(y) };
        addrs
    }).join().unwrap());
    assert_ne!(other.0, first.as_ptr() as usize + 1);
    assert_ne!(other.1, first.as_ptr() as usize + 1);
    unsafe { a.free(first) };
}

#[cfg(feature = "c")] #[test] fn conf_keys() {
    use crate::allocator::c::Malloc;
    use conf::Configure;
    let a = ReuseLive::new(Malloc);
    assert_eq!(a.configure("reuse_live", "3"), Ok(true));
    assert_eq!(a.every.load(Relaxed), 3);
    assert_eq!(a.configure("reuse_live", "x").map_err(|e| e.kind), Err(ConfErrorKind::InvalidValue));
    assert_eq!(a.configure("bogus", "1"), Ok(false));
}
