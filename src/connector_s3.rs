//! Amazon S3 implementation of the [`ObjectStore`] capability.
//!
//! Talks to the S3 REST API directly with AWS Signature V4 authentication,
//! using only pure-Rust crypto (`hmac`, `sha2`). Handles `ListObjectsV2`
//! pagination, supports custom endpoints for S3-compatible services
//! (MinIO, LocalStack), and probes the bucket at connect time so bad
//! credentials fail the feed before any scanning starts.
//!
//! # Configuration
//!
//! ```toml
//! [feeds.runbooks]
//! bucket = "acme-docs"
//! prefix = "engineering/runbooks/"
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! Credentials are read from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//! and optionally `AWS_SESSION_TOKEN`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::FeedConfig;
use crate::errors::SyncError;
use crate::models::{Listing, ObjectSummary};
use crate::traits::ObjectStore;

type HmacSha256 = Hmac<Sha256>;

/// Objects per `ListObjectsV2` page.
const LIST_PAGE_SIZE: usize = 1000;

/// AWS credentials loaded from environment variables.
#[derive(Clone)]
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self, SyncError> {
        let access_key_id =
            std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| missing_credential("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| missing_credential("AWS_SECRET_ACCESS_KEY"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

fn missing_credential(var: &str) -> SyncError {
    SyncError::Connection {
        bucket: String::new(),
        reason: format!("{} environment variable not set", var),
    }
}

/// S3-backed object store, scoped to one bucket + prefix.
pub struct S3Connector {
    bucket: String,
    prefix: String,
    region: String,
    endpoint_url: Option<String>,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl S3Connector {
    /// Connect to the feed's bucket and verify it is reachable with the
    /// current credentials.
    ///
    /// The probe issues a one-object listing; an error response (wrong
    /// keys, nonexistent bucket, unreachable endpoint) fails the feed with
    /// [`SyncError::Connection`] so it never starts scanning.
    pub async fn connect(feed: &FeedConfig) -> Result<Self, SyncError> {
        let mut creds = AwsCredentials::from_env().map_err(|e| match e {
            SyncError::Connection { reason, .. } => SyncError::Connection {
                bucket: feed.bucket.clone(),
                reason,
            },
            other => other,
        })?;
        creds.session_token = creds.session_token.filter(|t| !t.is_empty());

        let connector = Self {
            bucket: feed.bucket.clone(),
            prefix: feed.prefix.clone(),
            region: feed.region.clone(),
            endpoint_url: feed.endpoint_url.clone(),
            creds,
            client: reqwest::Client::new(),
        };

        let probe = vec![
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), "1".to_string()),
        ];
        let resp = connector
            .signed_request(Method::GET, "/", &probe)
            .await
            .map_err(|e| SyncError::Connection {
                bucket: connector.bucket.clone(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Connection {
                bucket: connector.bucket.clone(),
                reason: format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(300).collect::<String>()
                ),
            });
        }

        Ok(connector)
    }

    /// Compute the hostname for the configured bucket and region.
    ///
    /// A custom `endpoint_url` (MinIO, LocalStack) takes precedence over
    /// the standard `<bucket>.s3.<region>.amazonaws.com` form.
    fn host(&self) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            endpoint
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        } else {
            format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
        }
    }

    /// Issue one SigV4-signed request against the bucket.
    ///
    /// `canonical_uri` must already be URI-encoded (per-segment) and start
    /// with `/`. Query parameters are sorted here as the canonical form
    /// requires.
    async fn signed_request(
        &self,
        method: Method,
        canonical_uri: &str,
        query: &[(String, String)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        let host = self.host();

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut sorted_params = query.to_vec();
        sorted_params.sort_by(|a, b| a.0.cmp(&b.0));
        let canonical_querystring: String = sorted_params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let payload_hash = hex_sha256(b"");

        let mut headers = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri,
            canonical_querystring,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        let scheme = match self.endpoint_url {
            Some(ref e) if e.starts_with("http://") => "http",
            _ => "https",
        };
        let mut url = format!("{}://{}{}", scheme, host, canonical_uri);
        if !canonical_querystring.is_empty() {
            url.push('?');
            url.push_str(&canonical_querystring);
        }

        let mut req = self
            .client
            .request(method, &url)
            .header("Authorization", &authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date);
        if let Some(ref token) = self.creds.session_token {
            req = req.header("x-amz-security-token", token);
        }

        req.send().await
    }

    fn encoded_key_uri(key: &str) -> String {
        format!(
            "/{}",
            key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
        )
    }
}

#[async_trait]
impl ObjectStore for S3Connector {
    async fn list(&self) -> Result<Listing, SyncError> {
        // Capture the scan time before the (possibly long) query runs, so
        // objects modified mid-listing fall after this cycle's watermark.
        let captured_at = Utc::now().timestamp_millis();

        let mut summaries = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), LIST_PAGE_SIZE.to_string()),
            ];
            if !self.prefix.is_empty() {
                query.push(("prefix".to_string(), self.prefix.clone()));
            }
            if let Some(ref token) = continuation_token {
                query.push(("continuation-token".to_string(), token.clone()));
            }

            let resp = self
                .signed_request(Method::GET, "/", &query)
                .await
                .map_err(|e| SyncError::Listing(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(SyncError::Listing(format!(
                    "ListObjectsV2 failed (HTTP {}): {}",
                    status,
                    body.chars().take(300).collect::<String>()
                )));
            }

            let xml = resp
                .text()
                .await
                .map_err(|e| SyncError::Listing(e.to_string()))?;
            let page = parse_list_response(&xml)?;

            debug!(count = page.summaries.len(), "listed one page");
            summaries.extend(page.summaries);

            if page.is_truncated {
                continuation_token = page.next_token;
            } else {
                break;
            }
        }

        Ok(Listing {
            captured_at,
            summaries,
        })
    }

    async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, SyncError> {
        debug!(key, "downloading object");
        let fetch_err = |reason: String| SyncError::Fetch {
            key: key.to_string(),
            reason,
        };

        let resp = self
            .signed_request(Method::GET, &Self::encoded_key_uri(key), &[])
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", resp.status())));
        }

        let bytes = resp.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn resolve_url(&self, key: &str) -> String {
        let encoded = Self::encoded_key_uri(key);
        match self.endpoint_url {
            Some(ref e) => format!("{}{}", e.trim_end_matches('/'), encoded),
            None => format!(
                "https://{}.s3.{}.amazonaws.com{}",
                self.bucket, self.region, encoded
            ),
        }
    }

    async fn user_metadata(&self, key: &str) -> Result<BTreeMap<String, String>, SyncError> {
        let resp = self
            .signed_request(Method::HEAD, &Self::encoded_key_uri(key), &[])
            .await
            .map_err(|e| SyncError::Fetch {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(SyncError::Fetch {
                key: key.to_string(),
                reason: format!("HEAD returned HTTP {}", resp.status()),
            });
        }

        let mut metadata = BTreeMap::new();
        for (name, value) in resp.headers() {
            if let Some(meta_key) = name.as_str().strip_prefix("x-amz-meta-") {
                if let Ok(v) = value.to_str() {
                    metadata.insert(meta_key.to_string(), v.to_string());
                }
            }
        }
        Ok(metadata)
    }
}

// ============ AWS SigV4 helpers ============

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986, leaving only unreserved characters.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

// ============ ListObjectsV2 XML parsing ============

struct ListPage {
    summaries: Vec<ObjectSummary>,
    is_truncated: bool,
    next_token: Option<String>,
}

/// Parse a `ListObjectsV2` response. Folder placeholder keys (trailing
/// `/`) are dropped; they carry no content to index.
fn parse_list_response(xml: &str) -> Result<ListPage, SyncError> {
    let is_truncated = extract_xml_value(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next_token = extract_xml_value(xml, "NextContinuationToken");

    let mut summaries = Vec::new();
    let mut remaining = xml;
    while let Some(start) = remaining.find("<Contents>") {
        let block_start = start + "<Contents>".len();
        let Some(end) = remaining[block_start..].find("</Contents>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];
        remaining = &remaining[block_start + end + "</Contents>".len()..];

        let key = extract_xml_value(block, "Key").unwrap_or_default();
        if key.is_empty() || key.ends_with('/') {
            continue;
        }

        let last_modified = extract_xml_value(block, "LastModified")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0);
        let etag = extract_xml_value(block, "ETag")
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();
        let size = extract_xml_value(block, "Size")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        summaries.push(ObjectSummary {
            key,
            last_modified,
            size,
            etag,
        });
    }

    Ok(ListPage {
        summaries,
        is_truncated,
        next_token,
    })
}

/// Extract the text content of an XML tag (simple, non-nested).
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)?;
    let value_start = start + open.len();
    let end = xml[value_start..].find(&close)?;
    Some(xml[value_start..value_start + end].to_string())
}
