//! Wire and domain types for package submissions
//!
//! Incoming bodies are first deserialized into the `Raw*` schema types, where
//! every field is optional, and only become domain types once the validator
//! has accepted them. Field names on the wire keep the registry's
//! capitalized spelling (`Name`, `Version`, `ID`, `Content`, `URL`,
//! `JSProgram`).

use serde::{Deserialize, Serialize};

/// Request body of `POST /package` before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmission {
    #[serde(default)]
    pub metadata: Option<RawMetadata>,
    #[serde(default)]
    pub data: Option<RawPackageData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadata {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Version", default)]
    pub version: Option<String>,
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPackageData {
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
    #[serde(rename = "JSProgram", default)]
    pub js_program: Option<String>,
    #[serde(default)]
    pub debloat: Option<bool>,
}

/// Identity triple of a package. Immutable once a record exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "ID")]
    pub id: String,
}

/// The payload a submission carries, at most one kind per submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    /// Package content, base64 or raw text
    Content(String),
    /// Location of the package source
    Url(String),
    /// Neither Content nor URL was supplied
    MetadataOnly,
}

impl PackageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            PackageSource::Content(_) => "content",
            PackageSource::Url(_) => "url",
            PackageSource::MetadataOnly => "metadata",
        }
    }
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub metadata: PackageMetadata,
    pub source: PackageSource,
    pub js_program: Option<String>,
    pub debloat: bool,
}

/// Descriptor persisted for URL and metadata-only submissions.
#[derive(Debug, Clone, Serialize)]
pub struct PackageManifest<'a> {
    pub id: &'a str,
    pub metadata: &'a PackageMetadata,
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(rename = "JSProgram", skip_serializing_if = "Option::is_none")]
    pub js_program: Option<&'a str>,
}

/// The `data` section echoed back in a [`PackageRecord`]. Content itself is
/// never echoed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordData {
    #[serde(rename = "URL", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "JSProgram", default, skip_serializing_if = "Option::is_none")]
    pub js_program: Option<String>,
    pub debloat: bool,
}

/// A created package record, returned with `201 Created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: String,
    pub metadata: PackageMetadata,
    pub data: RecordData,
    /// Object key the payload was stored under
    pub key: String,
    /// Location reported by the object store
    pub location: String,
    /// Number of bytes stored
    pub size: usize,
    pub sha256: String,
    /// Whether the content transformer shrank the content
    pub debloated: bool,
    pub created_at: String,
}

/// Response body of `DELETE /reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
    pub deleted: usize,
}
