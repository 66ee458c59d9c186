//! Package record identifiers.
//!
//! Identifiers are random UUID v4 values in hyphenated form, e.g.
//! `0b0e8d7e-4c57-4f6a-9d3c-2a8f1b6c9e01`. Collisions are left to the store.

use uuid::Uuid;

/// Length of a generated identifier
pub const PACKAGE_ID_LENGTH: usize = 36;

/// Byte offsets of the `-` separators in a generated identifier
pub const PACKAGE_ID_SEPARATORS: [usize; 4] = [8, 13, 18, 23];

/// Generate a fresh identifier for a package record.
pub fn generate_package_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Whether `value` has the shape of a generated identifier: 36 characters,
/// `-` at the separator offsets and lowercase hex digits everywhere else.
pub fn is_package_id(value: &str) -> bool {
    value.len() == PACKAGE_ID_LENGTH
        && value.bytes().enumerate().all(|(i, b)| {
            if PACKAGE_ID_SEPARATORS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_digit() || (b'a'..=b'f').contains(&b)
            }
        })
}
