//! Allocator statistics reporting

use core::fmt;



/// Statistics dump through a caller supplied sink, in the spirit of jemalloc's `malloc_stats_print`:<br>
/// <code>[stats_print](Self::stats_print)(sink: &mut dyn [FnMut]\(&[str]\), opts: &[str])</code><br>
/// <br>
pub trait StatsPrint {
    /// Write a human-readable report to `sink`, one or more chunks at a time.
    ///
    /// `opts` is a string of flags, each omitting part of the report:
    ///
    /// | Flag  | Omits                                                     |
    /// | ------| ----------------------------------------------------------|
    /// | `g`   | general / configuration information                       |
    /// | `b`   | small size class ("bin") statistics                       |
    /// | `l`   | large size class statistics                               |
    /// | `a`   | per-arena statistics (accepted for jemalloc compatibility) |
    /// | `m`   | merged arena statistics (accepted for jemalloc compatibility) |
    fn stats_print(&self, sink: &mut dyn FnMut(&str), opts: &str);
}

impl<'a, S: StatsPrint> StatsPrint for &'a S {
    fn stats_print(&self, sink: &mut dyn FnMut(&str), opts: &str) { S::stats_print(self, sink, opts) }
}



/// Adapts a [`StatsPrint`] sink to [`fmt::Write`], so reports can be built with `write!`.
pub struct Sink<'s>(pub &'s mut dyn FnMut(&str));

impl fmt::Write for Sink<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result { (self.0)(s); Ok(()) }
}

/// Collect a full [`StatsPrint`] report into a [`String`].
pub fn to_string(stats: &impl StatsPrint, opts: &str) -> String {
    let mut report = String::new();
    stats.stats_print(&mut |chunk| report.push_str(chunk), opts);
    report
}



#[test] fn sink_write() {
    use fmt::Write;
    let mut chunks = Vec::new();
    let mut push = |s: &str| chunks.push(s.to_string());
    write!(Sink(&mut push), "{} + {}", 1, 2).unwrap();
    assert_eq!(chunks.concat(), "1 + 2");
}
