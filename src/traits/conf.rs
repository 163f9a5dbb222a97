//! Process-wide allocator configuration (`key:value[,key:value]*`)
//!
//! Mirrors the shape of jemalloc's `malloc_conf`: a single string, applied once, before the first allocation.
//! Each allocator in a stack handles the keys it understands and forwards the rest to whatever it wraps.

use crate::error::*;



/// Apply one configuration pair to an allocator (or an adapter and whatever it wraps.)
pub trait Configure {
    /// Apply `key:value`.
    ///
    /// Returns:
    /// *   <code>[Ok]\(true\)</code> if `key` was recognized and applied
    /// *   <code>[Ok]\(false\)</code> if neither `self` nor anything it wraps recognizes `key`
    /// *   <code>[Err]\(...\)</code> if `key` was recognized but `value` was rejected
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError>;
}

impl<'a, C: Configure> Configure for &'a C {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> { C::configure(self, key, value) }
}



/// Split `conf` into `(key, value)` pairs.
///
/// Empty segments (e.g. `""`, or a trailing `,`) are skipped, so an empty string configures nothing.
pub fn parse(conf: &str) -> impl Iterator<Item = Result<(&str, &str), ConfError>> {
    conf.split(',').map(str::trim).filter(|pair| !pair.is_empty()).map(|pair| match pair.split_once(':') {
        Some((key, value)) if !key.is_empty()   => Ok((key, value)),
        _                                       => Err(ConfError::malformed(pair)),
    })
}

/// Apply every pair of `conf` to `allocator`, in order, returning everything that was rejected.
///
/// Rejected pairs don't stop later pairs from being applied.
pub fn apply(allocator: &impl Configure, conf: &str) -> Vec<ConfError> {
    let mut errors = Vec::new();
    for pair in parse(conf) {
        let result = pair.and_then(|(key, value)| match allocator.configure(key, value)? {
            true    => Ok(()),
            false   => Err(ConfError::unknown(key, value)),
        });
        if let Err(err) = result {
            log::debug!("rejected conf pair: {err}");
            errors.push(err);
        }
    }
    errors
}

/// Parse an unsigned integer configuration value (`16384`, `0x4000`, or `16k`.)
pub fn parse_usize(key: &str, value: &str) -> Result<usize, ConfError> {
    let invalid = || ConfError::invalid(key, value);
    let (digits, scale) = match value.as_bytes().last() {
        Some(b'k' | b'K') => (&value[..value.len()-1], 1 << 10),
        Some(b'm' | b'M') => (&value[..value.len()-1], 1 << 20),
        Some(b'g' | b'G') => (&value[..value.len()-1], 1 << 30),
        _ => (value, 1),
    };
    let n = match digits.strip_prefix("0x") {
        Some(hex)   => usize::from_str_radix(hex, 16),
        None        => digits.parse::<usize>(),
    }.map_err(|_| invalid())?;
    n.checked_mul(scale).ok_or_else(invalid)
}

/// Parse a boolean configuration value (`true` / `false`.)
pub fn parse_bool(key: &str, value: &str) -> Result<bool, ConfError> {
    match value {
        "true"  => Ok(true),
        "false" => Ok(false),
        _       => Err(ConfError::invalid(key, value)),
    }
}



#[cfg(test)] struct Recorder(std::sync::Mutex<Vec<(String, String)>>);
#[cfg(test)] impl Configure for Recorder {
    fn configure(&self, key: &str, value: &str) -> Result<bool, ConfError> {
        match key {
            "size"  => { parse_usize(key, value)?; }
            "known" => {}
            _       => return Ok(false),
        }
        self.0.lock().unwrap().push((key.into(), value.into()));
        Ok(true)
    }
}

#[test] fn parse_empty() {
    assert_eq!(parse("").count(), 0);
    assert_eq!(parse(" , ,").count(), 0);
}

#[test] fn parse_pairs() {
    let pairs = parse("a:1,b:,c:x:y").collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(pairs, [("a", "1"), ("b", ""), ("c", "x:y")]);
}

#[test] fn parse_malformed() {
    let errs = parse("novalue,:1").filter_map(Result::err).map(|e| e.to_string()).collect::<Vec<_>>();
    assert_eq!(errs, ["Malformed conf string: novalue", "Malformed conf string: :1"]);
}

#[test] fn apply_continues_past_errors() {
    let r = Recorder(Default::default());
    let errs = apply(&r, "known:a,bogus:1,size:nope,size:16k");
    assert_eq!(errs.iter().map(|e| e.to_string()).collect::<Vec<_>>(), ["Invalid conf pair: bogus:1", "Invalid conf value: size:nope"]);
    assert_eq!(*r.0.lock().unwrap(), [("known".to_string(), "a".to_string()), ("size".into(), "16k".into())]);
}

#[test] fn apply_empty_is_default() {
    let r = Recorder(Default::default());
    assert!(apply(&r, "").is_empty());
    assert!(r.0.lock().unwrap().is_empty());
}

#[test] fn usize_values() {
    assert_eq!(parse_usize("k", "65536").unwrap(), 65536);
    assert_eq!(parse_usize("k", "0x10").unwrap(), 16);
    assert_eq!(parse_usize("k", "64k").unwrap(), 65536);
    assert_eq!(parse_usize("k", "1M").unwrap(), 1 << 20);
    assert!(parse_usize("k", "-1").is_err());
    assert!(parse_usize("k", "").is_err());
}

#[test] fn bool_values() {
    assert!( parse_bool("k", "true").unwrap());
    assert!(!parse_bool("k", "false").unwrap());
    assert!( parse_bool("k", "1").is_err());
}
