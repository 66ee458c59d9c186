//! # Input Validation: Package Submissions
//!
//! Turns a [`RawSubmission`] into a [`ValidatedSubmission`] or a specific
//! [`ValidationError`]. Checks run in a fixed order: metadata presence,
//! metadata lengths, then the Content/URL exclusion. Validation has no side
//! effects.

use crate::types::{
    PackageMetadata, PackageSource, RawMetadata, RawPackageData, RawSubmission,
    ValidatedSubmission,
};
use crate::validation::error::ValidationError;
use crate::validation::limits::{MAX_ID_LENGTH, MAX_PACKAGE_NAME_LENGTH, MAX_VERSION_LENGTH};
use crate::validation::result::ValidationResult;

/// Validate a parsed submission.
///
/// A submission with neither Content nor URL is accepted as
/// [`PackageSource::MetadataOnly`].
pub fn validate_submission(raw: RawSubmission) -> ValidationResult<ValidatedSubmission> {
    let metadata = validate_metadata(raw.metadata.unwrap_or_default())?;

    let RawPackageData {
        content,
        url,
        js_program,
        debloat,
    } = raw.data.unwrap_or_default();

    let source = match (non_empty(content), non_empty(url)) {
        (Some(_), Some(_)) => return Err(ValidationError::ConflictingPayload),
        (Some(content), None) => PackageSource::Content(content),
        (None, Some(url)) => PackageSource::Url(url),
        (None, None) => PackageSource::MetadataOnly,
    };

    Ok(ValidatedSubmission {
        metadata,
        source,
        js_program: non_empty(js_program),
        debloat: debloat.unwrap_or(false),
    })
}

fn validate_metadata(raw: RawMetadata) -> ValidationResult<PackageMetadata> {
    let name = non_empty(raw.name);
    let version = non_empty(raw.version);
    let id = non_empty(raw.id);

    let missing: Vec<&'static str> = [
        ("Name", name.is_none()),
        ("Version", version.is_none()),
        ("ID", id.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();

    let (Some(name), Some(version), Some(id)) = (name, version, id) else {
        return Err(ValidationError::MissingMetadataField { fields: missing });
    };

    check_length("Name", &name, MAX_PACKAGE_NAME_LENGTH)?;
    check_length("Version", &version, MAX_VERSION_LENGTH)?;
    check_length("ID", &id, MAX_ID_LENGTH)?;

    Ok(PackageMetadata { name, version, id })
}

fn check_length(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.len() > max {
        return Err(ValidationError::TooLong {
            field,
            actual: value.len(),
            max,
        });
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }
    Ok(())
}

/// Empty and whitespace-only strings count as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn validate(body: Value) -> ValidationResult<ValidatedSubmission> {
        validate_submission(serde_json::from_value(body).unwrap())
    }

    fn metadata() -> Value {
        json!({ "Name": "lodash", "Version": "1.0.0", "ID": "lodash" })
    }

    #[test]
    fn test_url_submission_is_valid() {
        let submission = validate(json!({
            "metadata": metadata(),
            "data": { "URL": "https://github.com/lodash/lodash" }
        }))
        .unwrap();

        assert_eq!(submission.metadata.name, "lodash");
        assert_eq!(
            submission.source,
            PackageSource::Url("https://github.com/lodash/lodash".to_string())
        );
        assert!(!submission.debloat);
    }

    #[test]
    fn test_content_submission_keeps_flags() {
        let submission = validate(json!({
            "metadata": metadata(),
            "data": { "Content": "UEsDBA==", "debloat": true, "JSProgram": "console.log(1)" }
        }))
        .unwrap();

        assert_eq!(
            submission.source,
            PackageSource::Content("UEsDBA==".to_string())
        );
        assert!(submission.debloat);
        assert_eq!(submission.js_program.as_deref(), Some("console.log(1)"));
    }

    #[test]
    fn test_missing_metadata_object() {
        let err = validate(json!({ "data": { "URL": "http://x" } })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingMetadataField {
                fields: vec!["Name", "Version", "ID"]
            }
        );
        assert_eq!(
            err.to_string(),
            "Missing required metadata fields: Name, Version, ID"
        );
    }

    #[test]
    fn test_partially_missing_metadata() {
        let err = validate(json!({ "metadata": { "Name": "x" } })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingMetadataField {
                fields: vec!["Version", "ID"]
            }
        );
    }

    #[test]
    fn test_empty_id_counts_as_missing() {
        let err = validate(json!({
            "metadata": { "Name": "x", "Version": "1.0.0", "ID": "" }
        }))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingMetadataField { fields: vec!["ID"] }
        );
    }

    #[test]
    fn test_conflicting_payload() {
        let err = validate(json!({
            "metadata": metadata(),
            "data": { "Content": "abc", "URL": "http://x" }
        }))
        .unwrap_err();
        assert_eq!(err, ValidationError::ConflictingPayload);
        assert_eq!(err.to_string(), "Both Content and URL cannot be set");
    }

    #[test]
    fn test_missing_metadata_reported_before_conflict() {
        let err = validate(json!({
            "metadata": { "Name": "x" },
            "data": { "Content": "abc", "URL": "http://x" }
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingMetadataField { .. }));
    }

    #[test]
    fn test_empty_url_does_not_conflict() {
        let submission = validate(json!({
            "metadata": metadata(),
            "data": { "Content": "abc", "URL": "" }
        }))
        .unwrap();
        assert_eq!(submission.source, PackageSource::Content("abc".to_string()));
    }

    #[test]
    fn test_metadata_only_is_accepted() {
        let submission = validate(json!({ "metadata": metadata() })).unwrap();
        assert_eq!(submission.source, PackageSource::MetadataOnly);

        let submission = validate(json!({ "metadata": metadata(), "data": {} })).unwrap();
        assert_eq!(submission.source, PackageSource::MetadataOnly);
    }

    #[test]
    fn test_overlong_name_is_rejected() {
        let err = validate(json!({
            "metadata": { "Name": "n".repeat(MAX_PACKAGE_NAME_LENGTH + 1), "Version": "1", "ID": "x" }
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::TooLong { field: "Name", .. }));
    }
}
