//! Error type for strict `Value` conversions.
//!
//! Container operations do not fail; a missing key is `None`. The only
//! fallible paths are the strict `TryFrom<&Value>` conversions here and
//! deserialization, which reports the codec's own error type.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The value's variant cannot represent the requested type.
    #[error("cannot convert {found} value to {expected}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },
    /// A string value did not parse as the requested type.
    #[error("invalid {expected} literal: {literal:?}")]
    Parse {
        expected: &'static str,
        literal: String,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
