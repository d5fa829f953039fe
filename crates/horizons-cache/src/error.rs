//! Error types for the entity cache.
//!
//! Three outcomes are kept apart: the store could not be reached
//! ([`CacheError::Unavailable`]), a stored value could not be interpreted
//! ([`CacheError::Decode`], [`CacheError::WrongType`], [`CacheError::Key`]),
//! and plain absence, which is never an error and surfaces as `None`/`false`.

use std::fmt;

/// A cache key string that does not follow `<type>:<id>[:<related>][:<suffix>]`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed cache key `{key}`: {reason}")]
pub struct KeyError {
    pub key: String,
    pub reason: String,
}

impl KeyError {
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// A stored record that does not match the declared entity shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is null but not nullable")]
    UnexpectedNull { field: &'static str },

    #[error("field `{field}` has invalid value {value:?}: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl DecodeError {
    pub fn invalid(field: &'static str, value: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors returned by cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backing store could not be reached or refused the command.
    #[error("Cache store unavailable: {message}")]
    Unavailable { message: String },

    /// A key holds a value of a different kind than the operation expects.
    #[error("Wrong value type at `{key}`: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// A record exists but cannot be decoded into its entity type.
    #[error("Failed to decode `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    /// A stored set member is not a valid entity key.
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongType {
            key: key.into(),
            expected,
        }
    }

    pub fn decode(key: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode {
            key: key.into(),
            source,
        }
    }

    /// Returns `true` if the store itself failed, as opposed to its content.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns `true` if stored state could not be interpreted.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::WrongType { .. } | Self::Key(_)
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unavailable { .. } => ErrorCategory::Infrastructure,
            Self::WrongType { .. } | Self::Decode { .. } | Self::Key(_) => ErrorCategory::Corruption,
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        // Server-side type mismatches carry no key in the error; the store
        // wrappers attach it where it matters.
        if e.code() == Some("WRONGTYPE") {
            return Self::wrong_type("<unknown>", "a different redis type");
        }
        Self::unavailable(e.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::unavailable(format!("failed to get Redis connection: {e}"))
    }
}

/// Error categories for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Infrastructure,
    Corruption,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Corruption => write!(f, "corruption"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::decode(
            "tag:1",
            DecodeError::invalid("id", "abc", "invalid digit found in string"),
        );
        assert_eq!(
            err.to_string(),
            "Failed to decode `tag:1`: field `id` has invalid value \"abc\": invalid digit found in string"
        );

        let err = KeyError::malformed("tag", "expected at least 2 components");
        assert_eq!(
            err.to_string(),
            "Malformed cache key `tag`: expected at least 2 components"
        );
    }

    #[test]
    fn test_error_categories() {
        assert!(CacheError::unavailable("down").is_unavailable());
        assert_eq!(
            CacheError::unavailable("down").category(),
            ErrorCategory::Infrastructure
        );

        let err = CacheError::decode("tag:1", DecodeError::MissingField { field: "name" });
        assert!(err.is_corrupt());
        assert!(!err.is_unavailable());
        assert_eq!(err.category().to_string(), "corruption");
    }
}
