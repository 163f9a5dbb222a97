//! [`ConfError`] (and any future error types)

use core::fmt::{self, Display, Formatter};



/// A configuration pair was rejected by [`conf::apply`](crate::conf::apply).
#[derive(Clone, Debug, PartialEq, Eq)] pub struct ConfError {
    pub kind:   ConfErrorKind,
    pub pair:   String,
}

/// Why a configuration pair was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)] pub enum ConfErrorKind {
    /// Not of the form `key:value`
    Malformed,
    /// `key` isn't understood by any allocator in the stack
    UnknownKey,
    /// `key` is understood, but `value` isn't valid for it
    InvalidValue,
}

impl ConfError {
    pub fn malformed(pair: &str)                -> Self { Self { kind: ConfErrorKind::Malformed,    pair: pair.into() } }
    pub fn unknown(key: &str, value: &str)      -> Self { Self { kind: ConfErrorKind::UnknownKey,   pair: format!("{key}:{value}") } }
    pub fn invalid(key: &str, value: &str)      -> Self { Self { kind: ConfErrorKind::InvalidValue, pair: format!("{key}:{value}") } }
}

impl Display for ConfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let pair = &self.pair;
        match self.kind {
            ConfErrorKind::Malformed    => write!(f, "Malformed conf string: {pair}"),
            ConfErrorKind::UnknownKey   => write!(f, "Invalid conf pair: {pair}"),
            ConfErrorKind::InvalidValue => write!(f, "Invalid conf value: {pair}"),
        }
    }
}

impl std::error::Error for ConfError {}
