#![allow(unused_variables)]

use crate::*;
use crate::error::*;



/// Never allocates anything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)] pub struct Null;

impl meta::Meta for Null {
    type Error                  = ();
    const MAX_ALIGN : usize     = 2 * core::mem::size_of::<usize>(); // nothing is ever allocated, so report what a typical `malloc` would
    const MAX_SIZE  : usize     = usize::MAX;
}

// SAFETY: ✔️ always failing to allocate is a trivally safe implementation of this trait
unsafe impl thin::Alloc for Null {
    fn alloc_uninit(&self, size: usize) -> Result<AllocNN, Self::Error> { Err(()) }
}

// SAFETY: ✔️ this trait cannot be safely called, and simply panicing in response is a reasonable response to the caller's UB
unsafe impl thin::Free for Null {
    #[track_caller] #[inline(never)] unsafe fn free(&self, ptr: AllocNN) {
        bug::ub::invalid_ptr_for_allocator(ptr)
    }
}

// SAFETY: ✔️ there's nothing to query, so any call violates the caller's preconditions
unsafe impl thin::SizeOfDebug for Null {
    #[track_caller] #[inline(never)] unsafe fn size_of(&self, ptr: AllocNN) -> Option<usize> {
        bug::ub::invalid_ptr_for_allocator(ptr)
    }
}

impl conf::Configure for Null {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> { Ok(false) }
}



#[test] fn thin_always_fails() {
    use thin::Alloc;
    for size in crate::stress::SIZES { assert_eq!(Null.alloc_uninit(size), Err(())) }
    assert_eq!(Null.alloc_uninit(0), Err(()));
}

#[test] #[should_panic = "doesn't belong to this allocator"] fn thin_free_panics() {
    use thin::Free;
    let mut byte = core::mem::MaybeUninit::new(0u8);
    unsafe { Null.free(core::ptr::NonNull::from(&mut byte)) }
}
