use core::fmt::{self, Debug, Display, Formatter};



/// Pretty print `v` bytes as e.g. "16 KiB" or similar.
///
/// Only exact multiples are scaled up, so sizes like `99999` stay readable as-is instead of being rounded.
pub fn pretty(f: &mut Formatter<'_>, mut v: u64) -> fmt::Result {
    for unit in ["B", "KiB", "MiB", "GiB", "TiB", "PiB"] {
        if v < 1024 || v % 1024 != 0 { return write!(f, "{v} {unit}"); }
        v >>= 10;
    }
    write!(f, "{v} EiB")
}

/// Pretty print `self.0` bytes
#[derive(Clone, Copy)] pub struct Pretty(pub u64);
impl From<usize> for Pretty { fn from(v: usize) -> Self { Self(v as u64) } }
impl Debug   for Pretty { fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { pretty(f, self.0) } }
impl Display for Pretty { fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { pretty(f, self.0) } }



#[test] fn pretty_sizes() {
    assert_eq!(Pretty(0).to_string(),           "0 B");
    assert_eq!(Pretty(255).to_string(),         "255 B");
    assert_eq!(Pretty(99999).to_string(),       "99999 B");
    assert_eq!(Pretty(16384).to_string(),       "16 KiB");
    assert_eq!(Pretty(128 * 1024).to_string(),  "128 KiB");
    assert_eq!(Pretty(3 << 20).to_string(),     "3 MiB");
}
