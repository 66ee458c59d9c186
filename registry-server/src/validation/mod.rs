//! # Input Validation
//!
//! Validation helpers applied at the HTTP boundary before any handler touches
//! a submitted field.
//!
//! - [`package`]: structural invariants of a package submission
//! - [`http`]: hostnames and base64 payload guards
//! - [`limits`]: size and length limits
//! - [`ids`]: path parameters naming stored packages

pub mod error;
pub mod http;
pub mod ids;
pub mod limits;
pub mod package;
pub mod result;

pub use self::{
    error::ValidationError,
    http::{is_package_archive, looks_like_base64, validate_base64_size, validate_hostname},
    ids::validate_package_id,
    limits::{
        base64_encoded_limit, validate_file_size, MAX_BASE64_DECODED_SIZE, MAX_BASE64_ENCODED_SIZE, MAX_ID_LENGTH,
        MAX_PACKAGE_NAME_LENGTH, MAX_VERSION_LENGTH,
    },
    package::validate_submission,
    result::ValidationResult,
};
