use thiserror::Error;

/// Errors raised while parsing domain values from their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl CoreError {
    pub fn unknown_entity_type(value: impl Into<String>) -> Self {
        Self::UnknownEntityType(value.into())
    }

    pub fn unknown_variant(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.into(),
        }
    }
}
