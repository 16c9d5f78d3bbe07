//! Error taxonomy
//!
//! Every public operation resolves with either its success payload or exactly
//! one [`S3Error`] describing the failure kind and, where applicable, the HTTP
//! status code. Errors are never swallowed and never retried; the only request
//! re-issue the client performs is following a temporary redirect, which is
//! not a failure.

use std::time::Duration;

use crate::pool::OperationKind;
use crate::xml::XmlError;

/// All failures a bucket operation can resolve with.
#[derive(Debug, thiserror::Error)]
pub enum S3Error {
    /// A required argument was absent or empty. Raised before any pool slot
    /// is taken or any I/O is started.
    #[error("missing the argument `{0}`")]
    MissingArgument(&'static str),

    /// The configured endpoint could not be parsed into a usable base URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// The HTTP client itself could not be constructed.
    #[error("failed to initialize the HTTP transport: {0}")]
    TransportInit(#[source] reqwest::Error),

    /// No slot for this operation kind became free within the pool's
    /// acquisition timeout.
    #[error("timed out after {timeout:?} waiting for a `{kind}` slot")]
    PoolTimeout {
        kind: OperationKind,
        timeout: Duration,
    },

    /// The pool's waiting queue is full; the request was rejected instead of
    /// queueing without bound.
    #[error("`{kind}` pool already has {waiting} queued requests")]
    PoolSaturated { kind: OperationKind, waiting: usize },

    /// The service kept answering with temporary redirects past the hop cap.
    #[error("gave up after {hops} redirect hops")]
    TooManyRedirects { hops: usize },

    /// A get or head request was answered with an unexpected status.
    #[error("download failed, status: {0}")]
    DownloadFailed(u16),
    /// A get or head request got no response at all.
    #[error("download failed: {0}")]
    DownloadTransport(#[source] TransportError),

    #[error("upload failed, status: {0}")]
    UploadFailed(u16),
    #[error("upload failed: {0}")]
    UploadTransport(#[source] TransportError),

    #[error("deletion failed, status: {0}")]
    DeletionFailed(u16),
    #[error("deletion failed: {0}")]
    DeletionTransport(#[source] TransportError),

    #[error("listing failed, status: {0}")]
    ListingFailed(u16),
    #[error("listing failed: {0}")]
    ListingTransport(#[source] TransportError),
    /// The listing response body was not a readable `ListBucketResult`.
    #[error("listing returned an unreadable body: {0}")]
    ListingParse(#[from] XmlError),

    /// A directory delete was aborted between pages via its cancellation
    /// token. Objects deleted before the abort stay deleted.
    #[error("operation cancelled")]
    Cancelled,
}

/// Transport-level failures: the request produced no HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The per-request timeout elapsed. Distinct from a pool acquisition
    /// timeout, which surfaces as [`S3Error::PoolTimeout`].
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
