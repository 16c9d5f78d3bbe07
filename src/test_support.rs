//! In-memory transport and client helpers shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::client::S3Client;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::request::{RawRequest, RawResponse, Transport};

type Handler = dyn Fn(&RawRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// A scripted [`Transport`]: every send is answered by the handler closure,
/// recorded, and counted, with an optional artificial latency so tests can
/// observe concurrency.
pub struct FakeTransport {
    handler: Box<Handler>,
    delay: Option<Duration>,
    requests: Mutex<Vec<RawRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&RawRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: None,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn with_delay(
        delay: Duration,
        handler: impl Fn(&RawRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn response(status: u16, body: &[u8]) -> RawResponse {
        RawResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::copy_from_slice(body),
        }
    }

    pub fn redirect(location: &str) -> RawResponse {
        RawResponse {
            status: 307,
            headers: HashMap::from([("location".to_string(), location.to_string())]),
            body: Bytes::new(),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RawRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of sends observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = (self.handler)(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Config pointing at a scripted transport; endpoint and credentials are
/// arbitrary but syntactically valid.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        key: "AKID".to_string(),
        secret: "secret".to_string(),
        bucket: "my-bucket".to_string(),
        ..ClientConfig::default()
    }
}

pub fn client_with(transport: Arc<FakeTransport>) -> S3Client {
    S3Client::with_transport(&test_config(), transport).unwrap()
}

/// A `ListBucketResult` body with the given keys and truncation flag.
pub fn listing_body(keys: &[&str], truncated: bool) -> Vec<u8> {
    let mut xml = String::from("<ListBucketResult>");
    xml.push_str(&format!("<IsTruncated>{truncated}</IsTruncated>"));
    for key in keys {
        xml.push_str(&format!(
            "<Contents><Key>{key}</Key><Size>1</Size></Contents>"
        ));
    }
    xml.push_str("</ListBucketResult>");
    xml.into_bytes()
}
