//! # Validation Error Types

/// Error types for validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required metadata fields: {}", .fields.join(", "))]
    MissingMetadataField { fields: Vec<&'static str> },

    #[error("Both Content and URL cannot be set")]
    ConflictingPayload,

    #[error("{field} too long: {actual} exceeds maximum {max}")]
    TooLong {
        field: &'static str,
        actual: usize,
        max: usize,
    },

    #[error("Input too short: {actual} is below minimum {min}")]
    TooShort { actual: usize, min: usize },

    #[error("Invalid characters in input: {input}")]
    InvalidCharacters { input: String },

    #[error("Invalid format: {reason}")]
    InvalidFormat { reason: String },

    #[error("File size exceeds limit: {actual} > {max}")]
    FileTooLarge { actual: u64, max: u64 },

    #[error("Contains null bytes")]
    NullBytes,

    #[error("Contains control characters")]
    ControlCharacters,
}
