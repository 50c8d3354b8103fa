//! Wire decoding errors

use thiserror::Error;

/// Errors raised while decoding a writer-info wire form
#[derive(Debug, Error)]
pub enum WireError {
    /// The outer value is not a five-element array
    #[error("writer info wire form must be a five-element array")]
    Shape,

    /// A positional field has the wrong JSON type
    #[error("writer info wire field '{0}' has the wrong type")]
    FieldType(&'static str),

    /// A config table entry is not a string
    #[error("writer info config entry '{0}' must be a string")]
    ConfigEntry(String),
}
