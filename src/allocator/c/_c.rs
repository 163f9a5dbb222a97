#![cfg(feature = "c")]
//! [`Malloc`]
//!
//! | Rust                                      | C                     | glibc<br>Only |
//! | ------------------------------------------| ----------------------| --------------|
//! | [`thin::Alloc::alloc_uninit`]             | [`malloc`]            |               |
//! | [`thin::Free::free`]                      | [`free`]              |               |
//! | [`conf::Configure::configure`]            | ❌ N/A               | [`mallopt`]   |
//!
//! [`malloc`]:     https://en.cppreference.com/w/c/memory/malloc
//! [`free`]:       https://en.cppreference.com/w/c/memory/free
//! [`mallopt`]:    https://man7.org/linux/man-pages/man3/mallopt.3.html

#[cfg(doc)] use crate::*;

mod malloc;         pub use malloc::Malloc;
