//! Bucket client facade
//!
//! [`S3Client`] is the uniform entry point for every operation: validate
//! arguments, take a slot from the operation's pool, hand the prepared
//! request to the execution engine, and return the outcome. The slot is
//! released when it drops, on every exit path. Deleting a key that ends in
//! the path separator walks the prefix page by page and fans the deletes
//! out within each page.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use reqwest::Method;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::S3Error;
use crate::pagination::ListPages;
use crate::pool::{OperationKind, PoolRegistry};
use crate::request::{
    Endpoint, ErrorFamily, HttpTransport, PreparedOperation, RequestExecutor, Transport,
    METADATA_TIMEOUT, UPLOAD_TIMEOUT,
};
use crate::sign::RequestSigner;
use crate::types::{ListPage, Object, ObjectEntry, PutOptions};
use crate::xml;

const DEFAULT_REGION: &str = "us-east-1";

struct ClientInner {
    credentials: Credentials,
    endpoint: Endpoint,
    pools: PoolRegistry,
    executor: RequestExecutor,
}

/// Handle to one bucket. Cheap to clone; all clones share the same pools.
#[derive(Clone)]
pub struct S3Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for S3Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Client")
            .field("bucket", &self.inner.credentials.bucket())
            .finish_non_exhaustive()
    }
}

impl S3Client {
    /// Build a client over the real HTTP transport.
    pub fn new(config: &ClientConfig) -> Result<Self, S3Error> {
        let transport = Arc::new(HttpTransport::new().map_err(S3Error::TransportInit)?);
        Self::with_transport(config, transport)
    }

    /// Build a client over a caller-supplied [`Transport`].
    pub fn with_transport(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, S3Error> {
        let credentials = Credentials::new(&config.key, &config.secret, &config.bucket)?;
        let endpoint = Endpoint::new(
            &config.bucket,
            config.endpoint.as_deref(),
            config.force_path_style,
        )?;
        let region = config.region.as_deref().unwrap_or(DEFAULT_REGION);
        let signer = RequestSigner::new(&credentials, region);
        let pools = PoolRegistry::new(&config.concurrency_limits());

        tracing::info!(
            bucket = credentials.bucket(),
            region,
            "initialized bucket client"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                credentials,
                endpoint,
                pools,
                executor: RequestExecutor::new(transport, signer),
            }),
        })
    }

    /// Download an object.
    pub async fn get(&self, path: &str) -> Result<Object, S3Error> {
        let key = object_key(path)?;
        let _slot = self.inner.pools.acquire(OperationKind::Get).await?;
        tracing::debug!(bucket = self.inner.credentials.bucket(), key = %key, "GET");

        let response = self
            .inner
            .executor
            .execute(PreparedOperation {
                method: Method::GET,
                url: self.inner.endpoint.object_url(&key),
                headers: HashMap::new(),
                body: None,
                timeout: METADATA_TIMEOUT,
                success: 200,
                family: ErrorFamily::Download,
            })
            .await?;

        Ok(Object {
            body: response.body,
            headers: response.headers,
        })
    }

    /// Fetch an object's headers without its body.
    pub async fn head(&self, path: &str) -> Result<HashMap<String, String>, S3Error> {
        let key = object_key(path)?;
        let _slot = self.inner.pools.acquire(OperationKind::Head).await?;
        tracing::debug!(bucket = self.inner.credentials.bucket(), key = %key, "HEAD");

        let response = self
            .inner
            .executor
            .execute(PreparedOperation {
                method: Method::HEAD,
                url: self.inner.endpoint.object_url(&key),
                headers: HashMap::new(),
                body: None,
                timeout: METADATA_TIMEOUT,
                success: 200,
                family: ErrorFamily::Download,
            })
            .await?;

        Ok(response.headers)
    }

    /// Upload an object with default options (private, no extra headers).
    pub async fn put(&self, path: &str, body: Bytes, content_type: &str) -> Result<(), S3Error> {
        self.put_with_options(path, body, content_type, PutOptions::default())
            .await
    }

    /// Upload an object.
    pub async fn put_with_options(
        &self,
        path: &str,
        body: Bytes,
        content_type: &str,
        options: PutOptions,
    ) -> Result<(), S3Error> {
        let key = object_key(path)?;
        if content_type.is_empty() {
            return Err(S3Error::MissingArgument("content_type"));
        }

        let mut headers = options.headers;
        headers.insert("content-type".to_string(), content_type.to_string());
        if !headers.contains_key("date") {
            headers.insert(
                "date".to_string(),
                Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            );
        }
        if options.public {
            headers.insert("x-amz-acl".to_string(), "public-read".to_string());
        }

        let _slot = self.inner.pools.acquire(OperationKind::Put).await?;
        tracing::debug!(
            bucket = self.inner.credentials.bucket(),
            key = %key,
            bytes = body.len(),
            "PUT"
        );

        self.inner
            .executor
            .execute(PreparedOperation {
                method: Method::PUT,
                url: self.inner.endpoint.object_url(&key),
                headers,
                body: Some(body),
                timeout: UPLOAD_TIMEOUT,
                success: 200,
                family: ErrorFamily::Upload,
            })
            .await?;
        Ok(())
    }

    /// Delete an object, or a whole "directory" when the path ends in `/`.
    ///
    /// A directory delete removes every descendant, page by page. It is not
    /// atomic: a failure partway leaves earlier pages deleted.
    pub async fn delete(&self, path: &str) -> Result<(), S3Error> {
        if path.ends_with('/') {
            self.delete_directory(path, None).await
        } else {
            self.delete_object(path).await
        }
    }

    /// Like [`delete`](Self::delete), but a directory delete stops at the
    /// next page boundary once `cancel` fires. Never aborts mid-page.
    pub async fn delete_with_cancellation(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<(), S3Error> {
        if path.ends_with('/') {
            self.delete_directory(path, Some(cancel)).await
        } else {
            self.delete_object(path).await
        }
    }

    async fn delete_object(&self, path: &str) -> Result<(), S3Error> {
        let key = object_key(path)?;
        let _slot = self.inner.pools.acquire(OperationKind::Delete).await?;
        tracing::debug!(bucket = self.inner.credentials.bucket(), key = %key, "DELETE");

        self.inner
            .executor
            .execute(PreparedOperation {
                method: Method::DELETE,
                url: self.inner.endpoint.object_url(&key),
                headers: HashMap::new(),
                body: None,
                timeout: METADATA_TIMEOUT,
                success: 204,
                family: ErrorFamily::Deletion,
            })
            .await?;
        Ok(())
    }

    async fn delete_directory(
        &self,
        path: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), S3Error> {
        let mut pages = self.list(path);
        loop {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    tracing::debug!(prefix = path, "directory delete cancelled between pages");
                    return Err(S3Error::Cancelled);
                }
            }

            // Pages are consumed strictly one at a time; only the deletes
            // within a page run concurrently.
            let Some(page) = pages.try_next().await? else {
                break;
            };
            if page.entries.is_empty() {
                return Ok(());
            }

            let mut deletions = JoinSet::new();
            for entry in page.entries {
                let client = self.clone();
                // Entries are deleted as plain objects, so a directory-marker
                // key ending in `/` cannot recurse back into here.
                deletions.spawn(async move { client.delete_object(&entry.key).await });
            }

            let mut first_error = None;
            while let Some(joined) = deletions.join_next().await {
                let result = match joined {
                    Ok(result) => result,
                    // Delete tasks are never aborted; a join failure is a
                    // panic inside the task.
                    Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
                };
                if let Err(err) = result {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
            if let Some(err) = first_error {
                tracing::warn!(prefix = path, error = %err, "directory delete aborted");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Lazily list every key under `prefix`.
    pub fn list(&self, prefix: &str) -> ListPages {
        ListPages::new(
            self.clone(),
            OperationKind::List,
            list_prefix(prefix),
            None,
        )
    }

    /// Lazily list under `prefix`, grouping keys at `delimiter` into common
    /// prefixes.
    pub fn list_with_delimiter(&self, prefix: &str, delimiter: &str) -> ListPages {
        ListPages::new(
            self.clone(),
            OperationKind::List,
            list_prefix(prefix),
            Some(delimiter.to_string()),
        )
    }

    /// Every entry under `prefix`, across all pages.
    pub async fn list_all(&self, prefix: &str) -> Result<Vec<ObjectEntry>, S3Error> {
        let mut pages = self.list(prefix);
        let mut entries = Vec::new();
        while let Some(page) = pages.try_next().await? {
            entries.extend(page.entries);
        }
        Ok(entries)
    }

    /// The virtual directories directly under `prefix`, across all pages.
    pub async fn list_common_prefixes(
        &self,
        prefix: &str,
        delimiter: &str,
    ) -> Result<Vec<String>, S3Error> {
        if delimiter.is_empty() {
            return Err(S3Error::MissingArgument("delimiter"));
        }
        let mut pages = ListPages::new(
            self.clone(),
            OperationKind::ListCommonPrefixes,
            list_prefix(prefix),
            Some(delimiter.to_string()),
        );
        let mut prefixes = Vec::new();
        while let Some(page) = pages.try_next().await? {
            prefixes.extend(page.common_prefixes);
        }
        Ok(prefixes)
    }

    /// One pool-gated page fetch on behalf of a [`ListPages`] cursor.
    pub(crate) async fn fetch_list_page(
        &self,
        kind: OperationKind,
        prefix: &str,
        delimiter: Option<&str>,
        marker: Option<&str>,
    ) -> Result<ListPage, S3Error> {
        let _slot = self.inner.pools.acquire(kind).await?;
        tracing::debug!(
            bucket = self.inner.credentials.bucket(),
            prefix,
            marker,
            "LIST"
        );

        let response = self
            .inner
            .executor
            .execute(PreparedOperation {
                method: Method::GET,
                url: self.inner.endpoint.list_url(prefix, delimiter, marker),
                headers: HashMap::new(),
                body: None,
                timeout: METADATA_TIMEOUT,
                success: 200,
                family: ErrorFamily::Listing,
            })
            .await?;

        Ok(xml::parse_list_page(&response.body)?)
    }
}

/// Normalize an object path to a key with exactly one leading separator.
fn object_key(path: &str) -> Result<String, S3Error> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(S3Error::MissingArgument("path"));
    }
    Ok(format!("/{trimmed}"))
}

/// Listing prefixes are sent without the leading separator.
fn list_prefix(prefix: &str) -> String {
    prefix.trim_start_matches('/').to_string()
}
