//! Package ingestion: `POST /package`
//!
//! One request runs parse → validate → prepare payload → assign id → store →
//! respond. Nothing is written before validation succeeds, and an accepted
//! submission results in exactly one `put_object` call.

use crate::debloat::debloat;
use crate::error::{AppError, AppResult};
use crate::hash_utils::sha256_hash;
use crate::id::generate_package_id;
use crate::state::AppState;
use crate::storage::object_key;
use crate::types::{
    PackageManifest, PackageRecord, PackageSource, RawSubmission, RecordData,
    ValidatedSubmission,
};
use crate::validation::{self, is_package_archive, looks_like_base64};
use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Bytes ready to be written, plus what the transformer did to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayload {
    pub body: Bytes,
    pub content_type: &'static str,
    pub debloated: bool,
}

/// Handler for `POST /package`.
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<PackageRecord>)> {
    let record = ingest(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Run a raw request body through the whole ingestion pipeline.
pub async fn ingest(state: &AppState, body: &[u8]) -> AppResult<PackageRecord> {
    debug!(size = body.len(), "Incoming package submission");

    let raw = parse_submission(body)?;
    let submission = validation::validate_submission(raw).inspect_err(|e| {
        warn!(error = %e, "Package submission rejected");
    })?;

    info!(
        name = %submission.metadata.name,
        version = %submission.metadata.version,
        source = submission.source.kind(),
        debloat = submission.debloat,
        "Accepted package submission"
    );

    let id = generate_package_id();
    let payload = prepare_payload(state, &id, &submission)?;
    let key = object_key(state.key_prefix(), &id);
    let size = payload.body.len();
    let sha256 = sha256_hash(&payload.body);

    let location = state
        .store
        .put_object(&key, payload.body, payload.content_type)
        .await
        .inspect_err(|e| {
            warn!(key = %key, backend = state.store.name(), error = %e, "Failed to store package");
        })?;

    info!(id = %id, key = %key, size, location = %location, "Package stored");

    let ValidatedSubmission {
        metadata,
        source,
        js_program,
        debloat,
    } = submission;

    Ok(PackageRecord {
        id,
        metadata,
        data: RecordData {
            url: match source {
                PackageSource::Url(url) => Some(url),
                _ => None,
            },
            js_program,
            debloat,
        },
        key,
        location,
        size,
        sha256,
        debloated: payload.debloated,
        created_at: Utc::now().to_rfc3339(),
    })
}

/// Parse a request body into the submission schema.
///
/// Every failure here is a [`AppError::MalformedRequest`]: an empty body,
/// text that isn't JSON, JSON that isn't an object, or fields of the wrong
/// type.
pub fn parse_submission(body: &[u8]) -> AppResult<RawSubmission> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(AppError::MalformedRequest(
            "Request body is required".to_string(),
        ));
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Request body is not valid JSON");
        AppError::MalformedRequest(format!("Invalid JSON in request body: {}", e))
    })?;

    if !value.is_object() {
        return Err(AppError::MalformedRequest(
            "Request body must be a JSON object".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "Request body does not match the submission schema");
        AppError::MalformedRequest(format!("Invalid request body: {}", e))
    })
}

/// Turn a validated submission into the bytes to store.
pub fn prepare_payload(
    state: &AppState,
    id: &str,
    submission: &ValidatedSubmission,
) -> AppResult<PreparedPayload> {
    match &submission.source {
        PackageSource::Content(content) => prepare_content(state, content, submission.debloat),
        PackageSource::Url(url) => manifest_payload(id, submission, Some(url)),
        PackageSource::MetadataOnly => manifest_payload(id, submission, None),
    }
}

fn prepare_content(state: &AppState, content: &str, debloat_requested: bool) -> AppResult<PreparedPayload> {
    let max = state.config.max_content_size_bytes();

    let decoded = decode_content(content, max)?;
    validation::validate_file_size(decoded.len() as u64, Some(max))?;

    if !debloat_requested {
        return Ok(PreparedPayload {
            body: Bytes::from(decoded),
            content_type: CONTENT_TYPE_BINARY,
            debloated: false,
        });
    }

    if !state.config.debloat.enabled {
        debug!("Debloat requested but disabled by configuration");
        return Ok(PreparedPayload {
            body: Bytes::from(decoded),
            content_type: CONTENT_TYPE_BINARY,
            debloated: false,
        });
    }

    let (body, debloated) = match String::from_utf8(decoded) {
        Ok(text) => {
            let minified = debloat(state.minifier.as_ref(), &text);
            let debloated = minified.len() < text.len();
            (Bytes::from(minified), debloated)
        }
        Err(e) => {
            debug!("Content is not UTF-8 text, skipping debloat");
            (Bytes::from(e.into_bytes()), false)
        }
    };

    Ok(PreparedPayload {
        body,
        content_type: CONTENT_TYPE_BINARY,
        debloated,
    })
}

/// Decode base64-encoded archives, and take every other Content verbatim.
///
/// Content is decoded only when it is canonical standard base64 and the
/// decoded bytes start with a zip, gzip or tar signature. Plain text that
/// happens to be valid base64 (`main`, `test`) is stored unchanged.
fn decode_content(content: &str, max: u64) -> AppResult<Vec<u8>> {
    if !looks_like_base64(content) {
        return Ok(content.as_bytes().to_vec());
    }

    let max_decoded = usize::try_from(max).unwrap_or(usize::MAX);
    validation::validate_base64_size(
        content,
        Some(validation::base64_encoded_limit(max_decoded)),
        Some(max_decoded),
    )?;

    match general_purpose::STANDARD.decode(content) {
        Ok(decoded)
            if is_package_archive(&decoded)
                && general_purpose::STANDARD.encode(&decoded) == content =>
        {
            Ok(decoded)
        }
        Ok(_) => {
            debug!("Content is base64-shaped but not an encoded archive, storing as text");
            Ok(content.as_bytes().to_vec())
        }
        Err(e) => {
            debug!(error = %e, "Content is not decodable base64, storing as text");
            Ok(content.as_bytes().to_vec())
        }
    }
}

fn manifest_payload(
    id: &str,
    submission: &ValidatedSubmission,
    url: Option<&str>,
) -> AppResult<PreparedPayload> {
    let manifest = PackageManifest {
        id,
        metadata: &submission.metadata,
        url,
        js_program: submission.js_program.as_deref(),
    };

    Ok(PreparedPayload {
        body: Bytes::from(serde_json::to_vec(&manifest)?),
        content_type: CONTENT_TYPE_JSON,
        debloated: false,
    })
}
