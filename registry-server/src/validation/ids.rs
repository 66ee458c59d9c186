//! # Input Validation: Package Identifiers
//!
//! Path parameters that name a stored package end up inside an object key,
//! so only identifiers shaped like the ones the server generates are
//! accepted.

use crate::id::is_package_id;
use crate::validation::error::ValidationError;
use crate::validation::result::ValidationResult;

/// Validate a package identifier taken from a request path.
pub fn validate_package_id(id: &str) -> ValidationResult<&str> {
    if id.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if !is_package_id(id) {
        return Err(ValidationError::InvalidFormat {
            reason: format!("'{}' is not a package identifier", id),
        });
    }

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_package_id() {
        assert!(validate_package_id("0b0e8d7e-4c57-4f6a-9d3c-2a8f1b6c9e01").is_ok());

        assert!(validate_package_id("").is_err());
        assert!(validate_package_id("../../etc/passwd").is_err());
        assert!(validate_package_id("0b0e8d7e-4c57-4f6a-9d3c-2a8f1b6c9e01/x").is_err());
        assert!(validate_package_id("lodash").is_err());
    }
}
