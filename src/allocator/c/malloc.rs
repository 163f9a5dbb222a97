use crate::*;
use crate::error::*;
use crate::meta::*;

use libc::*;

use core::mem::MaybeUninit;
use core::ptr::NonNull;



/// [`malloc`](https://en.cppreference.com/w/c/memory/malloc) / [`free`]
///
/// Whatever `malloc` the process links against is the allocator under test:
/// the platform C runtime by default, or e.g. jemalloc / tcmalloc / mimalloc when preloaded or linked in its place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)] #[repr(transparent)] pub struct Malloc;



// meta::*

impl Meta for Malloc {
    type Error = ();

    /// | Platform          | Value     |
    /// | ------------------| ----------|
    /// | Windows 32-bit    | [`8` according to Microsoft](https://learn.microsoft.com/en-us/cpp/c-runtime-library/reference/malloc#return-value)
    /// | Windows 64-bit    | [`16` according to Microsoft](https://learn.microsoft.com/en-us/cpp/c-runtime-library/reference/malloc#return-value)
    /// | glibc             | `2 * sizeof(size_t)`
    ///
    /// Many systems allow the developer to customize their implementation of `malloc`.
    /// Such custom implementations *could* provide less alignment than this.
    /// I consider such a thing to be a bug and undefined behavior *by the customizer*.
    const MAX_ALIGN : usize = 2 * core::mem::size_of::<usize>();

    const MAX_SIZE : usize = usize::MAX; // *slightly* less in practice
}



/// | Safety Item   | Description   |
/// | --------------| --------------|
/// | `exclusive`   | ✔️ Allocations by [`malloc`](https://en.cppreference.com/w/c/memory/malloc) are exclusive/unique ("Each such allocation shall yield a pointer to an object disjoint from any other object." C89 § 7.20.3 ¶ 1) - and if they're not, that's exactly what the harness is here to catch.
/// | `threads`     | ⚠️ thread-unsafe stdlibs existed once upon a time.  I consider linking them in a multithreaded program defacto undefined behavior beyond the scope of this to guard against.
///
// SAFETY: per above
unsafe impl thin::Alloc for Malloc {
    #[track_caller] fn alloc_uninit(&self, size: usize) -> Result<NonNull<MaybeUninit<u8>>, Self::Error> {
        // SAFETY: ✔️ this "should" be safe for all `size`.
        let alloc = unsafe { malloc(size) };
        NonNull::new(alloc.cast()).ok_or(())
    }
}

/// | Safety Item   | Description   |
/// | --------------| --------------|
/// | `compatible`  | ✔️ [`free`] is compatible with [`malloc`](https://en.cppreference.com/w/c/memory/malloc) (C89 § 7.20.3.2 ¶ 2)
/// | `exceptions`  | ✔️ [`free`] throws no exceptions (it's C) and returns no errors (C89 § 7.20.3.2 ¶ 3)
///
#[allow(clippy::missing_safety_doc)]
// SAFETY: per above
unsafe impl thin::Free for Malloc {
    #[track_caller] unsafe fn free(&self, ptr: NonNull<MaybeUninit<u8>>) {
        // SAFETY: ✔️ `ptr` belongs to `self` per [`thin::Free::free`]'s documented safety preconditions
        unsafe { free(ptr.as_ptr().cast()) }
    }
}



/// | Platform          | Size query                |
/// | ------------------| --------------------------|
/// | Linux             | [`malloc_usable_size`](https://man7.org/linux/man-pages/man3/malloc_usable_size.3.html)
/// | Apple             | `malloc_size`
/// | MSVC              | [`_msize`](https://learn.microsoft.com/en-us/cpp/c-runtime-library/reference/msize)
/// | Other             | [`None`]
///
#[allow(clippy::missing_safety_doc)]
// SAFETY: ✔️ each query reports the usable size of a live `malloc` allocation
unsafe impl thin::SizeOfDebug for Malloc {
    unsafe fn size_of(&self, _ptr: NonNull<MaybeUninit<u8>>) -> Option<usize> {
        #[cfg(target_os = "linux")] {
            // SAFETY: ✔️ `ptr` belongs to `self` per thin::SizeOfDebug's documented safety preconditions, and thus was allocated with `malloc`
            Some(unsafe { malloc_usable_size(_ptr.as_ptr().cast()) })
        }
        #[cfg(any(target_os = "macos", target_os = "ios"))] {
            // SAFETY: ✔️ `ptr` belongs to `self` per thin::SizeOfDebug's documented safety preconditions, and thus was allocated with `malloc`
            Some(unsafe { malloc_size(_ptr.as_ptr().cast_const().cast()) })
        }
        #[cfg(target_env = "msvc")] {
            extern "C" { fn _msize(memblock: *mut c_void) -> size_t; }
            // SAFETY: ✔️ `ptr` belongs to `self` per thin::SizeOfDebug's documented safety preconditions, and thus was allocated with `malloc`
            let size = unsafe { _msize(_ptr.as_ptr().cast()) };
            if size == !0 { return None }
            Some(size)
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios", target_env = "msvc")))] {
            None
        }
    }
}



// conf::*

/// glibc exposes its tunables through [`mallopt`](https://man7.org/linux/man-pages/man3/mallopt.3.html):
///
/// | Key               | `mallopt` param       |
/// | ------------------| ----------------------|
/// | `arena_max`       | `M_ARENA_MAX`
/// | `arena_test`      | `M_ARENA_TEST`
/// | `mmap_max`        | `M_MMAP_MAX`
/// | `mmap_threshold`  | `M_MMAP_THRESHOLD`
/// | `perturb`         | `M_PERTURB`
/// | `top_pad`         | `M_TOP_PAD`
/// | `trim_threshold`  | `M_TRIM_THRESHOLD`
///
/// Other C runtimes recognize no keys.
impl conf::Configure for Malloc {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> {
        #[cfg(all(target_os = "linux", target_env = "gnu"))] {
            let param = match key {
                "arena_max"         => M_ARENA_MAX,
                "arena_test"        => M_ARENA_TEST,
                "mmap_max"          => M_MMAP_MAX,
                "mmap_threshold"    => M_MMAP_THRESHOLD,
                "perturb"           => M_PERTURB,
                "top_pad"           => M_TOP_PAD,
                "trim_threshold"    => M_TRIM_THRESHOLD,
                _                   => return Ok(false),
            };
            let n = conf::parse_usize(key, value)?;
            let n = c_int::try_from(n).map_err(|_| ConfError::invalid(key, value))?;
            // SAFETY: ✔️ `mallopt` validates `param`/`n` itself, returning 0 on error.  Configuration happens before any worker thread allocates.
            if unsafe { mallopt(param, n) } == 0 { return Err(ConfError::invalid(key, value)) }
            log::debug!("mallopt({key}, {n})");
            Ok(true)
        }
        #[cfg(not(all(target_os = "linux", target_env = "gnu")))] {
            let _ = (key, value);
            Ok(false)
        }
    }
}



#[test] fn thin_palette()           { thin::test::palette_round_trip(Malloc) }
#[test] fn thin_largest()           { thin::test::largest_palette_size(Malloc) }
#[test] fn thin_exclusive()         { thin::test::exclusive(Malloc) }
#[test] fn thin_size_of()           { thin::test::size_of_covers_request(Malloc) }

#[test] fn conf_unknown_key() {
    assert_eq!(conf::Configure::configure(&Malloc, "bogus", "1"), Ok(false));
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
#[test] fn conf_mallopt() {
    use conf::Configure;
    assert_eq!(Malloc.configure("top_pad", "128k"), Ok(true));
    assert_eq!(Malloc.configure("top_pad", "lots").map_err(|e| e.kind), Err(ConfErrorKind::InvalidValue));
    assert_eq!(Malloc.configure("top_pad", "0x100000000").map_err(|e| e.kind), Err(ConfErrorKind::InvalidValue));
    thin::test::palette_round_trip(Malloc);
}
