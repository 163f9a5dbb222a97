//! C/C++y allocator traits operating on thin pointers, implying alignment, etc.
//!
//! C and C++ allocators often merely accept a pointer for free.
//! The stress harness only ever needs `malloc` / `free` shaped access, so this is the interface it drives.

use crate::*;
use crate::meta::Meta;

use core::mem::MaybeUninit;
use core::ptr::NonNull;



/// Allocation function with alignment (up to <code>[Meta]::[MAX_ALIGN](Meta::MAX_ALIGN)</code>) implied by size:
/// <code>
/// fn [alloc_uninit](Self::alloc_uninit)(size: [usize]) -> [Result]&lt;[NonNull]&lt;\_&gt;, \_&gt;
/// </code><br>
///
/// ### Safety
/// *   Successful allocations must be exclusive: no two live allocations may overlap.
/// *   Implementations must be safe to call from multiple threads simultaniously if `Self : Sync`.
pub unsafe trait Alloc : Meta {
    /// Allocate at least `size` bytes of uninitialized memory.
    ///
    /// The resulting allocation can typically be freed with <code>[Free]::[free](Free::free)</code>
    fn alloc_uninit(&self, size: usize) -> Result<NonNull<MaybeUninit<u8>>, Self::Error>;
}



/// Deallocation function:<br>
/// <code>[free](Self::free)(ptr: [NonNull]<[MaybeUninit]<[u8]>>)</code><br>
/// <br>
pub unsafe trait Free : Meta {
    /// Deallocate an allocation, `ptr`, belonging to `self`.
    ///
    /// ### Safety
    /// *   `ptr` must belong to `self`
    /// *   `ptr` will no longer be accessible after free
    unsafe fn free(&self, ptr: NonNull<MaybeUninit<u8>>);
}



/// Allocation size query (unreliable / for debug purpouses only):<br>
/// <code>[size_of](Self::size_of)(ptr: [NonNull]<[MaybeUninit]<[u8]>>) -> [Option]<[usize]></code><br>
/// <br>
///
/// This trait may fail (returning [`None`]) even if `ptr` is a thin allocation belonging to `self`.
/// The result is the *usable* size of the allocation, which may exceed the size originally requested.
/// For a given `ptr`, implementations must answer the same way for as long as `ptr` is live.
pub unsafe trait SizeOfDebug : Meta {
    /// Attempt to retrieve the size of the allocation `ptr`, owned by `self`.
    ///
    /// ### Safety
    /// *   May exhibit UB if `ptr` is not an allocation belonging to `self`.
    /// *   Returns the allocation size, but some or all of the data in said allocation might be uninitialized.
    unsafe fn size_of(&self, ptr: NonNull<MaybeUninit<u8>>) -> Option<usize>;
}



unsafe impl<'a, A: Alloc> Alloc for &'a A {
    fn alloc_uninit(&self, size: usize) -> Result<NonNull<MaybeUninit<u8>>, Self::Error> { A::alloc_uninit(self, size) }
}

unsafe impl<'a, A: Free> Free for &'a A {
    unsafe fn free(&self, ptr: NonNull<MaybeUninit<u8>>) { unsafe { A::free(self, ptr) } }
}

unsafe impl<'a, A: SizeOfDebug> SizeOfDebug for &'a A {
    unsafe fn size_of(&self, ptr: NonNull<MaybeUninit<u8>>) -> Option<usize> { unsafe { A::size_of(self, ptr) } }
}



/// Testing functions to verify implementations of [`thin`] traits hold up to the harness workload.
pub mod test {
    use super::*;
    use crate::stress::{fingerprint, SIZES};

    /// Allocate `size` bytes, fill with `thread`'s fingerprint, read it back, and free.
    #[track_caller] pub fn fingerprint_round_trip<A: Alloc + Free>(allocator: &A, thread: usize, size: usize) {
        let alloc = allocator.alloc_uninit(size).unwrap_or_else(|err| panic!("unable to allocate {size} bytes: {err:?}"));
        assert_eq!(alloc.as_ptr() as usize % A::MAX_ALIGN.min(size.next_power_of_two()).max(1), 0, "{size} byte allocation underaligned");
        // SAFETY: ✔️ we just allocated `size` bytes at `alloc`
        let bytes = unsafe { core::slice::from_raw_parts_mut(alloc.as_ptr(), size) };
        for (offset, byte) in bytes.iter_mut().enumerate() { *byte = MaybeUninit::new(fingerprint(thread, offset)) }
        for (offset, byte) in bytes.iter().enumerate() {
            // SAFETY: ✔️ every byte was initialized by the loop above
            let actual = unsafe { byte.assume_init() };
            assert_eq!(actual, fingerprint(thread, offset), "{size} byte allocation mismatched @ {offset}");
        }
        // SAFETY: ✔️ `alloc` belongs to `allocator` and is no longer accessed
        unsafe { allocator.free(alloc) };
    }

    /// Forwards everything to `A`, recording every size requested from it.
    pub struct Recording<A> {
        inner:      A,
        requests:   std::sync::Mutex<Vec<usize>>,
    }

    impl<A> Recording<A> {
        pub fn new(inner: A) -> Self { Self { inner, requests: Default::default() } }

        /// Every size requested so far, in order.
        pub fn requests(&self) -> Vec<usize> { self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone() }
    }

    impl<A: Meta> Meta for Recording<A> {
        type Error                  = A::Error;
        const MAX_ALIGN : usize     = A::MAX_ALIGN;
        const MAX_SIZE  : usize     = A::MAX_SIZE;
    }

    // SAFETY: ✔️ forwards to `A`
    unsafe impl<A: Alloc> Alloc for Recording<A> {
        fn alloc_uninit(&self, size: usize) -> Result<NonNull<MaybeUninit<u8>>, Self::Error> {
            self.requests.lock().unwrap_or_else(|p| p.into_inner()).push(size);
            self.inner.alloc_uninit(size)
        }
    }

    // SAFETY: ✔️ forwards to `A`
    unsafe impl<A: Free> Free for Recording<A> {
        unsafe fn free(&self, ptr: NonNull<MaybeUninit<u8>>) { unsafe { self.inner.free(ptr) } }
    }

    // SAFETY: ✔️ forwards to `A`
    unsafe impl<A: SizeOfDebug> SizeOfDebug for Recording<A> {
        unsafe fn size_of(&self, ptr: NonNull<MaybeUninit<u8>>) -> Option<usize> { unsafe { self.inner.size_of(ptr) } }
    }

    /// Assert [`SizeOfDebug::size_of`], when it answers, covers at least the requested size of every palette allocation.
    #[track_caller] pub fn size_of_covers_request<A: Alloc + Free + SizeOfDebug>(allocator: A) {
        for size in SIZES {
            let alloc = allocator.alloc_uninit(size).unwrap_or_else(|err| panic!("unable to allocate {size} bytes: {err:?}"));
            // SAFETY: ✔️ `alloc` belongs to `allocator`
            let usable = unsafe { allocator.size_of(alloc) };
            if let Some(usable) = usable { assert!(usable >= size, "{size} byte allocation reports only {usable} usable bytes") }
            // SAFETY: ✔️ `alloc` belongs to `allocator` and is no longer accessed
            unsafe { allocator.free(alloc) };
        }
    }

    /// Assert every palette size can be written and read back without mismatch.
    #[track_caller] pub fn palette_round_trip<A: Alloc + Free>(allocator: A) {
        for thread in [0, 1, 3, 255] {
            for size in SIZES { fingerprint_round_trip(&allocator, thread, size) }
        }
    }

    /// Assert the largest palette size succeeds and is fully verifiable (large-object code paths.)
    #[track_caller] pub fn largest_palette_size<A: Alloc + Free>(allocator: A) {
        let largest = SIZES.iter().copied().max().unwrap_or(0);
        assert_eq!(largest, 128 * 1024);
        fingerprint_round_trip(&allocator, 7, largest);
    }

    /// Assert `allocator` hands out non-overlapping allocations while several are live at once.
    #[track_caller] pub fn exclusive<A: Alloc + Free>(allocator: A) {
        let allocs = SIZES.iter().map(|&size| (allocator.alloc_uninit(size).expect("allocation failed"), size)).collect::<Vec<_>>();
        for (i, &(a, asize)) in allocs.iter().enumerate() {
            for &(b, bsize) in &allocs[i+1..] {
                let (a, b) = (a.as_ptr() as usize, b.as_ptr() as usize);
                assert!(a + asize <= b || b + bsize <= a, "allocations overlap: {a:#x}+{asize} vs {b:#x}+{bsize}");
            }
        }
        // SAFETY: ✔️ every pointer belongs to `allocator` and is freed exactly once
        for (alloc, _) in allocs { unsafe { allocator.free(alloc) } }
    }
}
