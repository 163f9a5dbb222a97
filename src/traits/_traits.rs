//! Allocator traits consumed by the stress harness
//!
//! | Trait                         | Harness use                                               |
//! | ------------------------------| ----------------------------------------------------------|
//! | [`meta::Meta`]                | error type, guaranteed alignment, max size                |
//! | [`thin::Alloc`]               | `allocate(size) -> pointer-or-failure`                    |
//! | [`thin::Free`]                | `release(pointer)`                                        |
//! | [`conf::Configure`]           | process-wide configuration string, applied once           |
//! | [`stats::StatsPrint`]         | `dump_stats(sink, options)`                               |

pub mod conf;
pub mod meta;
pub mod stats;
pub mod thin;
