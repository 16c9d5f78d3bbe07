//! Request execution engine
//!
//! One logical remote operation per call: sign, send, and follow the
//! service's temporary redirects with the same method and body. The HTTP
//! client never follows redirects itself; a `307` must be re-signed against
//! the new URL, so the engine owns the loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::redirect::Policy;
use reqwest::Method;
use url::Url;

use crate::error::{S3Error, TransportError};
use crate::sign::{sha256_hex, RequestSigner};

/// Redirect hops followed before giving up with
/// [`S3Error::TooManyRedirects`].
pub const MAX_REDIRECT_HOPS: usize = 5;

/// Request timeout for metadata-sized operations (get, head, delete, list).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(60);
/// Request timeout for uploads.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

const TEMPORARY_REDIRECT: u16 = 307;

/// A fully-formed request handed to the transport.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Duration,
}

/// What came back. Header names are lowercase.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

/// The HTTP collaborator. Production uses [`HttpTransport`]; tests inject an
/// in-memory implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] over a shared `reqwest` client with automatic redirects
/// disabled.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        let timeout = request.timeout;
        let classify = move |err: reqwest::Error| {
            if err.is_timeout() {
                TransportError::TimedOut(timeout)
            } else {
                TransportError::Http(err)
            }
        };

        let mut builder = self
            .client
            .request(request.method, request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(classify)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Which error variants a failed operation maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorFamily {
    /// get and head
    Download,
    Upload,
    Deletion,
    Listing,
}

impl ErrorFamily {
    pub(crate) fn status(self, status: u16) -> S3Error {
        match self {
            ErrorFamily::Download => S3Error::DownloadFailed(status),
            ErrorFamily::Upload => S3Error::UploadFailed(status),
            ErrorFamily::Deletion => S3Error::DeletionFailed(status),
            ErrorFamily::Listing => S3Error::ListingFailed(status),
        }
    }

    pub(crate) fn transport(self, err: TransportError) -> S3Error {
        match self {
            ErrorFamily::Download => S3Error::DownloadTransport(err),
            ErrorFamily::Upload => S3Error::UploadTransport(err),
            ErrorFamily::Deletion => S3Error::DeletionTransport(err),
            ErrorFamily::Listing => S3Error::ListingTransport(err),
        }
    }
}

/// One remote operation, ready to sign and send.
#[derive(Debug, Clone)]
pub(crate) struct PreparedOperation {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Duration,
    /// The one status code that means success for this operation.
    pub success: u16,
    pub family: ErrorFamily,
}

/// Builds request URLs for one bucket, virtual-hosted by default or
/// path-style against a custom endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
    bucket: String,
    path_style: bool,
}

impl Endpoint {
    pub fn new(bucket: &str, custom: Option<&str>, path_style: bool) -> Result<Self, S3Error> {
        let base = match custom {
            Some(endpoint) => {
                let url = Url::parse(endpoint)
                    .map_err(|err| S3Error::InvalidEndpoint(format!("{endpoint}: {err}")))?;
                if url.host_str().is_none() {
                    return Err(S3Error::InvalidEndpoint(format!("{endpoint}: no host")));
                }
                if path_style {
                    url
                } else {
                    // Virtual-hosted addressing against a custom endpoint.
                    let mut virtual_host = url.clone();
                    let host = format!("{bucket}.{}", url.host_str().unwrap_or_default());
                    virtual_host
                        .set_host(Some(&host))
                        .map_err(|err| S3Error::InvalidEndpoint(format!("{host}: {err}")))?;
                    virtual_host
                }
            }
            None => {
                let address = format!("https://{bucket}.s3.amazonaws.com/");
                Url::parse(&address)
                    .map_err(|err| S3Error::InvalidEndpoint(format!("{address}: {err}")))?
            }
        };

        Ok(Self {
            base,
            bucket: bucket.to_string(),
            path_style,
        })
    }

    /// URL for a single-object operation. The key must carry its leading `/`.
    pub fn object_url(&self, key: &str) -> Url {
        let mut url = self.base.clone();
        let mut path = String::new();
        if self.path_style {
            path.push('/');
            path.push_str(&self.bucket);
        }
        path.push_str(&encode_key(key));
        url.set_path(&path);
        url.set_query(None);
        url
    }

    /// URL for a listing request. Query parameters are appended in
    /// alphabetical order so the sent query already matches its canonical
    /// form.
    pub fn list_url(&self, prefix: &str, delimiter: Option<&str>, marker: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if self.path_style {
            url.set_path(&format!("/{}", self.bucket));
        } else {
            url.set_path("/");
        }

        let mut query = String::new();
        if let Some(delimiter) = delimiter {
            push_pair(&mut query, "delimiter", delimiter);
        }
        if let Some(marker) = marker {
            push_pair(&mut query, "marker", marker);
        }
        push_pair(&mut query, "prefix", prefix);
        url.set_query(Some(&query));
        url
    }
}

fn push_pair(query: &mut String, key: &str, value: &str) {
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(key);
    query.push('=');
    query.push_str(&urlencoding::encode(value));
}

/// Percent-encode a key per path segment, leaving the separators alone.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Signs and sends one [`PreparedOperation`], following temporary redirects.
pub(crate) struct RequestExecutor {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, signer: RequestSigner) -> Self {
        Self { transport, signer }
    }

    /// Issue the operation. Re-signs and re-issues the identical method and
    /// body on every `307`, up to [`MAX_REDIRECT_HOPS`] hops. The caller
    /// only ever observes the terminal outcome.
    pub async fn execute(&self, operation: PreparedOperation) -> Result<RawResponse, S3Error> {
        let payload_hash = sha256_hex(operation.body.as_deref().unwrap_or_default());
        let mut url = operation.url.clone();

        for _hop in 0..=MAX_REDIRECT_HOPS {
            let mut headers = operation.headers.clone();
            let authorization = self.signer.authorization(
                &operation.method,
                &url,
                &mut headers,
                &payload_hash,
                Utc::now(),
            );
            headers.insert("authorization".to_string(), authorization);

            let response = self
                .transport
                .send(RawRequest {
                    method: operation.method.clone(),
                    url: url.clone(),
                    headers,
                    body: operation.body.clone(),
                    timeout: operation.timeout,
                })
                .await
                .map_err(|err| operation.family.transport(err))?;

            if response.status == operation.success {
                return Ok(response);
            }
            if response.status == TEMPORARY_REDIRECT {
                match redirect_target(&url, &response) {
                    Some(target) => {
                        tracing::debug!(from = %url, to = %target, "following temporary redirect");
                        url = target;
                        continue;
                    }
                    // A redirect without a usable location is a failure.
                    None => return Err(operation.family.status(response.status)),
                }
            }
            tracing::warn!(
                %url,
                status = response.status,
                expected = operation.success,
                "request failed"
            );
            return Err(operation.family.status(response.status));
        }

        Err(S3Error::TooManyRedirects {
            hops: MAX_REDIRECT_HOPS,
        })
    }
}

fn redirect_target(current: &Url, response: &RawResponse) -> Option<Url> {
    let location = response.headers.get("location")?;
    Url::parse(location)
        .ok()
        .or_else(|| current.join(location).ok())
}
