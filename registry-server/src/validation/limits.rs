//! # Input Validation: Size Limits & Thresholds
//!
//! Constants for the size and length limits applied to submissions.

use crate::validation::error::ValidationError;
use crate::validation::result::ValidationResult;

/// Maximum allowed decoded content size (100 MB), unless configured otherwise
pub const MAX_CONTENT_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum allowed base64 encoded size (140 MB) - to prevent base64 bombs
pub const MAX_BASE64_ENCODED_SIZE: usize = 140 * 1024 * 1024;

/// Maximum allowed decoded base64 size (100 MB) - actual data after decoding
pub const MAX_BASE64_DECODED_SIZE: usize = 100 * 1024 * 1024;

/// Maximum allowed package name length
pub const MAX_PACKAGE_NAME_LENGTH: usize = 214;

/// Maximum allowed version string length
pub const MAX_VERSION_LENGTH: usize = 64;

/// Maximum allowed metadata ID length
pub const MAX_ID_LENGTH: usize = 214;

/// Longest base64 text that can decode to at most `max_decoded` bytes.
pub fn base64_encoded_limit(max_decoded: usize) -> usize {
    max_decoded.div_ceil(3).saturating_mul(4)
}

/// Validate file size against limits.
///
/// # Arguments
///
/// * `size` - The size in bytes
/// * `max_size` - Optional custom maximum size (defaults to MAX_CONTENT_SIZE)
pub fn validate_file_size(size: u64, max_size: Option<u64>) -> ValidationResult<()> {
    let limit = max_size.unwrap_or(MAX_CONTENT_SIZE);

    if size > limit {
        return Err(ValidationError::FileTooLarge {
            actual: size,
            max: limit,
        });
    }

    Ok(())
}
