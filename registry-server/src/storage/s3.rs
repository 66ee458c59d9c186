//! S3 REST backend.
//!
//! Talks to AWS S3 or any S3-compatible service (MinIO, LocalStack) over
//! plain HTTPS with SigV4-signed requests. A custom endpoint switches to
//! path-style addressing: `{endpoint}/{bucket}/{key}`.

use super::sigv4::{self, S3Credentials};
use super::{check_key, ObjectStore, StorageError, StorageResult};
use crate::hash_utils::sha256_hash;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Method, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const SERVICE: &str = "s3";
const MAX_ERROR_BODY: usize = 512;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Key>([^<]*)</Key>").expect("Invalid key regex"));
static TRUNCATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>").expect("Invalid truncation regex")
});
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<NextContinuationToken>([^<]*)</NextContinuationToken>")
        .expect("Invalid continuation token regex")
});

/// One page of a ListObjectsV2 response.
#[derive(Debug, Default, PartialEq, Eq)]
struct ListPage {
    keys: Vec<String>,
    next_token: Option<String>,
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
    base_url: Url,
    path_style: bool,
    credentials: S3Credentials,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("base_url", &self.base_url.as_str())
            .field("path_style", &self.path_style)
            .finish()
    }
}

impl S3ObjectStore {
    pub fn new(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        credentials: S3Credentials,
    ) -> StorageResult<Self> {
        if bucket.trim().is_empty() {
            return Err(StorageError::Config("bucket name is empty".to_string()));
        }

        let (base_url, path_style) = match endpoint {
            Some(endpoint) => {
                let mut url = Url::parse(endpoint).map_err(|e| {
                    StorageError::Config(format!("invalid endpoint '{}': {}", endpoint, e))
                })?;
                let path = format!("{}/{}/", url.path().trim_end_matches('/'), bucket);
                url.set_path(&path);
                (url, true)
            }
            None => {
                let virtual_host = format!("https://{}.s3.{}.amazonaws.com/", bucket, region);
                let url = Url::parse(&virtual_host).map_err(|e| {
                    StorageError::Config(format!("invalid bucket '{}': {}", bucket, e))
                })?;
                (url, false)
            }
        };

        let client = Client::builder()
            .user_agent(concat!("registry-server/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageError::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(
            bucket = %bucket,
            region = %region,
            endpoint = %base_url,
            path_style,
            "Configured S3 object store"
        );

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            region: region.to_string(),
            base_url,
            path_style,
            credentials,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// URL of the object stored under `key`.
    pub fn object_url(&self, key: &str) -> StorageResult<Url> {
        check_key(key)?;
        self.base_url
            .join(&sigv4::uri_encode(key, false))
            .map_err(|e| StorageError::InvalidKey(format!("{}: {}", key, e)))
    }

    fn list_url(&self, prefix: &str, continuation_token: Option<&str>) -> Url {
        let mut pairs = vec![("list-type", "2"), ("prefix", prefix)];
        if let Some(token) = continuation_token {
            pairs.push(("continuation-token", token));
        }
        let mut url = self.base_url.clone();
        url.set_query(Some(&sigv4::query_string(&pairs)));
        url
    }

    async fn send(&self, method: Method, url: Url, body: Option<(Bytes, &str)>) -> StorageResult<Response> {
        let payload_hash = match &body {
            Some((bytes, _)) => sha256_hash(bytes),
            None => sha256_hash(b""),
        };

        let signed = sigv4::sign_request(
            method.as_str(),
            &url,
            &payload_hash,
            &self.credentials,
            &self.region,
            SERVICE,
            Utc::now(),
        );

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header("authorization", signed.authorization)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256);
        if let Some(token) = signed.security_token {
            request = request.header("x-amz-security-token", token);
        }
        if let Some((bytes, content_type)) = body {
            request = request.header("content-type", content_type).body(bytes);
        }

        debug!(method = %method, url = %url, "Sending S3 request");
        Ok(request.send().await?)
    }

    async fn list_page(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListPage> {
        let response = self
            .send(Method::GET, self.list_url(prefix, token), None)
            .await?;
        let response = ensure_success(response).await?;
        let body = response.text().await?;
        Ok(parse_list_page(&body))
    }
}

/// Turn a non-2xx response into [`StorageError::Rejected`].
async fn ensure_success(response: Response) -> StorageResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message: String = body.chars().take(MAX_ERROR_BODY).collect();
    warn!(status = status.as_u16(), body = %message, "S3 request rejected");
    Err(StorageError::Rejected {
        status: status.as_u16(),
        message,
    })
}

fn parse_list_page(xml: &str) -> ListPage {
    let keys = KEY_RE
        .captures_iter(xml)
        .map(|caps| unescape_xml(&caps[1]))
        .collect();
    let next_token = if TRUNCATED_RE.is_match(xml) {
        TOKEN_RE.captures(xml).map(|caps| unescape_xml(&caps[1]))
    } else {
        None
    };
    ListPage { keys, next_token }
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let url = self.object_url(key)?;
        let size = body.len();
        let response = self
            .send(Method::PUT, url, Some((body, content_type)))
            .await?;
        ensure_success(response).await?;

        info!(bucket = %self.bucket, key = %key, size, "Stored object in S3");
        Ok(format!("s3://{}/{}", self.bucket, key))
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        let url = self.object_url(key)?;
        let response = self.send(Method::HEAD, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let url = self.object_url(key)?;
        let response = self.send(Method::DELETE, url, None).await?;
        ensure_success(response).await?;
        debug!(bucket = %self.bucket, key = %key, "Deleted object from S3");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let mut deleted = 0;
        let mut token: Option<String> = None;

        loop {
            let page = self.list_page(prefix, token.as_deref()).await?;
            for key in &page.keys {
                self.delete_object(key).await?;
                deleted += 1;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        info!(bucket = %self.bucket, prefix = %prefix, deleted, "Cleared S3 prefix");
        Ok(deleted)
    }
}
