//! [`Counting`]: adapt an allocator into one that keeps statistics

mod counting;       pub use counting::*;
