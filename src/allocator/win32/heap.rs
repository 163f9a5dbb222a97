use crate::*;
use crate::error::*;

use winapi::um::heapapi::{HeapAlloc, HeapFree, HeapSize, GetProcessHeap};

use core::mem::MaybeUninit;
use core::ptr::NonNull;



/// [`HeapAlloc`] / [`HeapFree`] on <code>[GetProcessHeap]\(\)</code>
///
/// | Rust                                      | C                     |
/// | ------------------------------------------| ----------------------|
/// | [`thin::Alloc::alloc_uninit`]             | <code>[HeapAlloc]\([GetProcessHeap]\(\), 0, size\)</code>
/// | [`thin::Free::free`]                      | <code>[HeapFree]\([GetProcessHeap]\(\), 0, ptr\)</code>
///
/// The process heap is always serialized (never `HEAP_NO_SERIALIZE`), so it's safe to hammer from every worker at once.
///
/// [`HeapAlloc`]:      https://learn.microsoft.com/en-us/windows/win32/api/heapapi/nf-heapapi-heapalloc
/// [`HeapFree`]:       https://learn.microsoft.com/en-us/windows/win32/api/heapapi/nf-heapapi-heapfree
/// [GetProcessHeap]:   https://learn.microsoft.com/en-us/windows/win32/api/heapapi/nf-heapapi-getprocessheap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)] #[repr(transparent)] pub struct ProcessHeap;

impl meta::Meta for ProcessHeap {
    type Error = ();

    /// The alignment of memory returned by `HeapAlloc` is `MEMORY_ALLOCATION_ALIGNMENT` in WinNT.h:
    /// ```cpp
    /// #if defined(_WIN64) || defined(_M_ALPHA)
    /// #define MEMORY_ALLOCATION_ALIGNMENT 16
    /// #else
    /// #define MEMORY_ALLOCATION_ALIGNMENT 8
    /// #endif
    /// ```
    ///
    /// <https://learn.microsoft.com/en-us/windows/win32/api/heapapi/nf-heapapi-heapalloc#remarks>
    const MAX_ALIGN : usize     = super::MEMORY_ALLOCATION_ALIGNMENT;
    const MAX_SIZE  : usize     = usize::MAX/2;
}

// SAFETY: ✔️ `HeapAlloc` allocations are exclusive, and the process heap is serialized
unsafe impl thin::Alloc for ProcessHeap {
    fn alloc_uninit(&self, size: usize) -> Result<AllocNN, Self::Error> {
        // SAFETY: ⚠️ `GetProcessHeap()` is valid for the lifetime of the process, as any code closing it presumably invokes undefined behavior by third party injected DLLs.
        // SAFETY: ✔️ thread safe - we don't use HEAP_NO_SERIALIZE
        let alloc = unsafe { HeapAlloc(GetProcessHeap(), 0, size) };
        NonNull::new(alloc.cast()).ok_or(())
    }
}

// SAFETY: ✔️ compatible with `impl thin::Alloc for ProcessHeap`
unsafe impl thin::Free for ProcessHeap {
    unsafe fn free(&self, ptr: NonNull<MaybeUninit<u8>>) {
        // SAFETY: ✔️ thread safe - we don't use HEAP_NO_SERIALIZE
        // SAFETY: ✔️ `ptr` belongs to `self` per thin::Free::free's documented safety preconditions - and thus was allocated with `HeapAlloc`
        if unsafe { HeapFree(GetProcessHeap(), 0, ptr.as_ptr().cast()) } == 0 && cfg!(debug_assertions) { bug::ub::invalid_ptr_for_allocator(ptr) }
    }
}

// SAFETY: ✔️ `HeapSize` reports the size of a live `HeapAlloc` allocation
unsafe impl thin::SizeOfDebug for ProcessHeap {
    unsafe fn size_of(&self, ptr: AllocNN) -> Option<usize> {
        // SAFETY: ✔️ `ptr` belongs to `self` per thin::SizeOfDebug's documented safety preconditions, and thus was allocated with `HeapAlloc`
        let size = unsafe { HeapSize(GetProcessHeap(), 0, ptr.as_ptr().cast()) };
        if size == !0 { return None }
        Some(size)
    }
}

/// The process heap has no knobs worth exposing to the harness.
impl conf::Configure for ProcessHeap {
    fn configure(&self, _key: &str, _value: &str) -> Result<bool, ConfError> { Ok(false) }
}



#[test] fn thin_palette()   { thin::test::palette_round_trip(ProcessHeap) }
#[test] fn thin_largest()   { thin::test::largest_palette_size(ProcessHeap) }
#[test] fn thin_exclusive() { thin::test::exclusive(ProcessHeap) }
#[test] fn thin_size_of()   { thin::test::size_of_covers_request(ProcessHeap) }
