//! The multi-threaded allocate / fill / verify / free harness
//!
//! | Piece                 | Role                                                                          |
//! | ----------------------| ------------------------------------------------------------------------------|
//! | [`SIZES`]             | the fixed size palette allocations are drawn from                             |
//! | [`Workload`]          | per-worker deterministic pseudo-random palette indices                        |
//! | [`WarmupBarrier`]     | shared spin flag + accumulator: warms CPUs, then releases workers together    |
//! | [`Worker`]            | owns its outstanding allocations, runs the timed iterations                   |
//! | [`Fault`]             | exhaustion / corruption - fatal to the whole process                          |
//! | [`run`]               | the coordinator: configure, spawn, time, join, report                         |

mod barrier;        pub use barrier::*;
mod fault;          pub use fault::*;
mod palette;        pub use palette::*;
mod run;            pub use run::*;
mod worker;         pub use worker::*;
mod workload;       pub use workload::*;
