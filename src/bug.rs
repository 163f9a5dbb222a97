//! Bug reporting panics

use core::ffi::c_void;
use core::mem::MaybeUninit;
use core::ptr::NonNull;



pub trait AsPtr : Copy                  { fn as_ptr(self) -> *mut c_void; }
impl AsPtr for *mut    MaybeUninit<u8>  { fn as_ptr(self) -> *mut c_void { self.cast() } }
impl AsPtr for NonNull<MaybeUninit<u8>> { fn as_ptr(self) -> *mut c_void { self.as_ptr().cast() } }

/// Report bugs that indicate Undefined Behavior
pub mod ub {
    use super::*;

    #[track_caller] #[inline(never)] pub fn invalid_ptr_for_allocator(ptr: impl AsPtr) -> ! {
        let ptr = ptr.as_ptr();
        panic!("bug: undefined behavior: {ptr:?} doesn't belong to this allocator");
    }
}
