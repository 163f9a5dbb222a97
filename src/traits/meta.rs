//! Metadata traits common to all (de)allocators

use core::fmt::Debug;



/// Allocator metadata (error type, max allocation size/alignment, etc.)
pub trait Meta {
    /// The error type returned from failed allocation.
    type Error : Debug;

    /// Indicates the alignment every successful allocation is guaranteed to have, regardless of size.
    ///
    /// ## In practice
    /// | Platform                      | Common Values     |
    /// | ------------------------------| ------------------|
    /// | 32&zwj;-&zwj;bit              | `8`
    /// | 64&zwj;-&zwj;bit              | `16` (`MEMORY_ALLOCATION_ALIGNMENT`, glibc's `2 * sizeof(size_t)`)
    const MAX_ALIGN : usize;

    /// Indicates the maximum size this allocator should be expected to succeed in allocating.
    /// Requesting an allocation larger than this is almost certainly a bug.
    const MAX_SIZE : usize;
}

impl<'a, A: Meta> Meta for &'a A {
    type Error                      = A::Error;
    const MAX_ALIGN     : usize     = A::MAX_ALIGN;
    const MAX_SIZE      : usize     = A::MAX_SIZE;
}
