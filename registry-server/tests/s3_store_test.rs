//! S3 backend tests against an in-process S3-compatible server
//!
//! The mock speaks just enough of the S3 REST API for the store: object
//! PUT/HEAD/DELETE and paginated ListObjectsV2. Every request is recorded so
//! tests can check what actually went over the wire.

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bytes::Bytes;
use chrono::NaiveDateTime;
use registry_server::hash_utils::sha256_hash;
use registry_server::storage::{sigv4, ObjectStore, S3Credentials, S3ObjectStore, StorageError};
use registry_server::{AppError, ErrorCode};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

const BUCKET: &str = "registry";
const REGION: &str = "us-east-1";
const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .unwrap_or_else(|| panic!("missing header {}", name))
            .to_str()
            .unwrap()
    }
}

#[derive(Default)]
struct MockS3 {
    objects: Mutex<BTreeMap<String, Bytes>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockS3 {
    fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    fn list_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == Method::GET)
            .collect()
    }
}

async fn handle(
    State(mock): State<Arc<MockS3>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
    });

    let Some(key) = uri.path().strip_prefix(&format!("/{}/", BUCKET)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if key.starts_with("broken/") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "<Error><Code>InternalError</Code></Error>",
        )
            .into_response();
    }

    let mut objects = mock.objects.lock().unwrap();
    match method {
        Method::GET if key.is_empty() => list_objects(&objects, uri.query()),
        Method::PUT => {
            objects.insert(key.to_string(), body);
            StatusCode::OK.into_response()
        }
        Method::HEAD if objects.contains_key(key) => StatusCode::OK.into_response(),
        Method::HEAD => StatusCode::NOT_FOUND.into_response(),
        Method::DELETE => {
            objects.remove(key);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

/// ListObjectsV2 where the continuation token is the last key returned.
fn list_objects(objects: &BTreeMap<String, Bytes>, query: Option<&str>) -> Response {
    let params: HashMap<String, String> =
        url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .into_owned()
            .collect();
    let prefix = params.get("prefix").cloned().unwrap_or_default();
    let after = params.get("continuation-token");

    let matching: Vec<&String> = objects
        .keys()
        .filter(|key| key.starts_with(&prefix))
        .filter(|key| after.map_or(true, |after| key.as_str() > after.as_str()))
        .collect();
    let page = &matching[..matching.len().min(PAGE_SIZE)];
    let truncated = matching.len() > PAGE_SIZE;

    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult>"#);
    xml.push_str(&format!("<IsTruncated>{}</IsTruncated>", truncated));
    for key in page {
        xml.push_str(&format!("<Contents><Key>{}</Key></Contents>", key));
    }
    if let (true, Some(last)) = (truncated, page.last()) {
        xml.push_str(&format!(
            "<NextContinuationToken>{}</NextContinuationToken>",
            last
        ));
    }
    xml.push_str("</ListBucketResult>");

    ([("content-type", "application/xml")], xml).into_response()
}

fn credentials() -> S3Credentials {
    S3Credentials {
        access_key_id: "test-key".to_string(),
        secret_access_key: "test-secret".to_string(),
        session_token: None,
    }
}

async fn spawn_mock() -> (Arc<MockS3>, S3ObjectStore) {
    let mock = Arc::new(MockS3::default());
    let app = Router::new().fallback(handle).with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let endpoint = format!("http://{}", addr);
    let store = S3ObjectStore::new(BUCKET, REGION, Some(&endpoint), credentials()).unwrap();
    (mock, store)
}

#[tokio::test]
async fn test_put_object_sends_signed_request() {
    let (mock, store) = spawn_mock().await;
    let body = Bytes::from_static(br#"{"id":"abc"}"#);

    let location = store
        .put_object("packages/abc", body.clone(), "application/json")
        .await
        .unwrap();
    assert_eq!(location, "s3://registry/packages/abc");

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    let put = &requests[0];
    assert_eq!(put.method, Method::PUT);
    assert_eq!(put.path, "/registry/packages/abc");
    assert_eq!(put.header("content-type"), "application/json");
    assert_eq!(put.header("x-amz-content-sha256"), sha256_hash(&body));
    assert!(put.headers.get("x-amz-security-token").is_none());

    let authorization = put.header("authorization");
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=test-key/"));
    assert!(authorization.contains("/us-east-1/s3/aws4_request"));
    assert!(authorization.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));

    // Re-sign with the request's own timestamp and compare
    let timestamp = NaiveDateTime::parse_from_str(put.header("x-amz-date"), "%Y%m%dT%H%M%SZ")
        .unwrap()
        .and_utc();
    let expected = sigv4::sign_request(
        "PUT",
        &store.object_url("packages/abc").unwrap(),
        &sha256_hash(&body),
        &credentials(),
        REGION,
        "s3",
        timestamp,
    );
    assert_eq!(authorization, expected.authorization);

    assert_eq!(mock.keys(), vec!["packages/abc"]);
}

#[tokio::test]
async fn test_object_exists_and_delete() {
    let (mock, store) = spawn_mock().await;

    assert!(!store.object_exists("packages/missing").await.unwrap());

    store
        .put_object("packages/abc", Bytes::from_static(b"data"), "application/octet-stream")
        .await
        .unwrap();
    assert!(store.object_exists("packages/abc").await.unwrap());

    store.delete_object("packages/abc").await.unwrap();
    assert!(!store.object_exists("packages/abc").await.unwrap());
    assert!(mock.keys().is_empty());

    let heads = mock
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::HEAD)
        .count();
    assert_eq!(heads, 3);
}

#[tokio::test]
async fn test_delete_prefix_follows_pagination() {
    let (mock, store) = spawn_mock().await;
    for name in ["a", "b", "c", "d", "e"] {
        store
            .put_object(
                &format!("packages/{}", name),
                Bytes::from_static(b"x"),
                "application/octet-stream",
            )
            .await
            .unwrap();
    }
    store
        .put_object("other/keep", Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .unwrap();

    let deleted = store.delete_prefix("packages/").await.unwrap();
    assert_eq!(deleted, 5);
    assert_eq!(mock.keys(), vec!["other/keep"]);

    let lists = mock.list_requests();
    assert_eq!(lists.len(), 3);
    assert!(!lists[0].query.as_deref().unwrap().contains("continuation-token"));
    assert!(lists[1]
        .query
        .as_deref()
        .unwrap()
        .contains("continuation-token=packages%2Fb"));
    assert!(lists
        .iter()
        .all(|r| r.query.as_deref().unwrap().contains("list-type=2")));

    assert_eq!(store.delete_prefix("packages/").await.unwrap(), 0);
}

#[tokio::test]
async fn test_server_error_is_storage_unavailable() {
    let (_mock, store) = spawn_mock().await;

    let err = store
        .put_object("broken/abc", Bytes::from_static(b"x"), "application/octet-stream")
        .await
        .unwrap_err();
    match &err {
        StorageError::Rejected { status, message } => {
            assert_eq!(*status, 500);
            assert!(message.contains("InternalError"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let app_error = AppError::from(err);
    assert_eq!(app_error.error_code(), ErrorCode::StorageUnavailable);
    assert_eq!(
        app_error.error_code().http_status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_is_storage_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoint = format!("http://{}", addr);
    let store = S3ObjectStore::new(BUCKET, REGION, Some(&endpoint), credentials()).unwrap();

    let err = store.object_exists("packages/abc").await.unwrap_err();
    assert!(matches!(err, StorageError::Transport(_)));
    assert_eq!(
        AppError::from(err).error_code(),
        ErrorCode::StorageUnavailable
    );
}
