//! [`Null`], [`FailAbove`], [`ReuseLive`]: allocators that misbehave on purpose, to prove the harness notices
//!
//! | Allocator         | Conf key          | Misbehavior                                                   | Harness reports   |
//! | ------------------| ------------------| --------------------------------------------------------------| ------------------|
//! | [`Null`]          |                   | every allocation fails                                        | exhaustion        |
//! | [`FailAbove`]     | `fail_above:N`    | allocations larger than `N` bytes fail                        | exhaustion        |
//! | [`ReuseLive`]     | `reuse_live:N`    | every `N`th allocation aliases memory that's still live       | memory error      |

mod fail_above;     pub use fail_above::FailAbove;
mod null;           pub use null::Null;
mod reuse_live;     pub use reuse_live::ReuseLive;
