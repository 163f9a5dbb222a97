#![doc = include_str!("../Readme.md")]

#![forbid(unreachable_patterns)] // often indicates e.g. a typoed "constant" in a match statement
#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(non_snake_case)] // often indicates e.g. a typoed "constant" in a match statement
#![warn(clippy::undocumented_unsafe_blocks)]

type AllocNN    = core::ptr::NonNull<core::mem::MaybeUninit<u8>>;



#[path = "allocator/_allocator.rs"      ] pub mod allocator;
#[path = "stress/_stress.rs"            ] pub mod stress;
#[path = "traits/_traits.rs"            ] pub mod traits; #[doc(hidden)] pub use traits::*;
#[path = "util/_util.rs"                ] mod util;

#[doc(hidden)] pub mod bug;
pub mod error;
