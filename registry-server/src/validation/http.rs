//! # Input Validation: HTTP
//!
//! Validation helpers for HTTP-related data: the hostname the server binds
//! to and base64 encoded package content.

use crate::validation::error::ValidationError;
use crate::validation::limits::{MAX_BASE64_DECODED_SIZE, MAX_BASE64_ENCODED_SIZE};
use crate::validation::result::ValidationResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating hostnames (RFC 1123 compliant)
static HOSTNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("Hostname regex should compile - this is a static RFC 1123 pattern")
});

/// Validate a hostname or IPv4 address the server is asked to bind to.
///
/// # Returns
///
/// `Ok(String)` with the validated hostname, `Err(ValidationError)` if invalid
pub fn validate_hostname(hostname: &str) -> ValidationResult<String> {
    if hostname.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if hostname.len() > 253 {
        return Err(ValidationError::TooLong {
            field: "Hostname",
            actual: hostname.len(),
            max: 253,
        });
    }

    if hostname.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if hostname.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if !HOSTNAME_REGEX.is_match(hostname) {
        return Err(ValidationError::InvalidCharacters {
            input: hostname.to_string(),
        });
    }

    Ok(hostname.to_string())
}

/// Validate base64 encoded data size before decoding to prevent base64 bombs.
///
/// # Arguments
///
/// * `encoded_data` - The base64 encoded string to validate
/// * `max_encoded_size` - Optional maximum encoded size (defaults to MAX_BASE64_ENCODED_SIZE)
/// * `max_decoded_size` - Optional maximum decoded size (defaults to MAX_BASE64_DECODED_SIZE)
pub fn validate_base64_size(
    encoded_data: &str,
    max_encoded_size: Option<usize>,
    max_decoded_size: Option<usize>,
) -> ValidationResult<()> {
    let encoded_limit = max_encoded_size.unwrap_or(MAX_BASE64_ENCODED_SIZE);
    let decoded_limit = max_decoded_size.unwrap_or(MAX_BASE64_DECODED_SIZE);

    if encoded_data.len() > encoded_limit {
        return Err(ValidationError::FileTooLarge {
            actual: encoded_data.len() as u64,
            max: encoded_limit as u64,
        });
    }

    // base64 encodes 3 bytes as 4 characters
    let estimated_decoded_size = (encoded_data.len() * 3) / 4;
    if estimated_decoded_size > decoded_limit {
        return Err(ValidationError::FileTooLarge {
            actual: estimated_decoded_size as u64,
            max: decoded_limit as u64,
        });
    }

    Ok(())
}

/// Leading bytes of the archive formats a package upload may carry.
const ARCHIVE_SIGNATURES: &[&[u8]] = &[
    b"PK\x03\x04", // zip
    b"PK\x05\x06", // empty zip
    b"\x1f\x8b",   // gzip
];

/// Offset of the `ustar` magic in a tar header.
const TAR_MAGIC_OFFSET: usize = 257;

/// Whether decoded bytes start like a zip, gzip or tar archive.
pub fn is_package_archive(bytes: &[u8]) -> bool {
    ARCHIVE_SIGNATURES.iter().any(|sig| bytes.starts_with(sig))
        || bytes
            .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5)
            .is_some_and(|magic| magic == b"ustar")
}

/// Whether `data` is shaped like standard, padded base64.
///
/// Shape alone does not make content base64: words such as `main` or `test`
/// pass this check too.
pub fn looks_like_base64(data: &str) -> bool {
    if data.is_empty() || data.len() % 4 != 0 {
        return false;
    }

    let body = data.trim_end_matches('=');
    if data.len() - body.len() > 2 {
        return false;
    }

    body.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/')
}
