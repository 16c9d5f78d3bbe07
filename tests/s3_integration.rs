//! Integration tests for the bucket client using MinIO via testcontainers
//!
//! These tests require Docker to be running and use the testcontainers crate
//! to spin up a MinIO instance for realistic S3 testing.
//!
//! Run with: cargo test --test s3_integration
//!
//! Note: Tests are conditionally skipped if Docker is not available.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use s3_bucket_client::credentials::Credentials;
use s3_bucket_client::sign::{sha256_hex, RequestSigner};
use s3_bucket_client::{ClientConfig, S3Client};
use testcontainers::{runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;

/// MinIO default credentials
const MINIO_ACCESS_KEY: &str = "minioadmin";
const MINIO_SECRET_KEY: &str = "minioadmin";

/// Helper to get MinIO endpoint URL from container
async fn get_minio_endpoint(container: &ContainerAsync<MinIO>) -> String {
    let host = container
        .get_host()
        .await
        .expect("Failed to get container host");
    let port = container
        .get_host_port_ipv4(9000)
        .await
        .expect("Failed to get MinIO port");
    format!("http://{}:{}", host, port)
}

/// Test helper to check if Docker is available
fn docker_available() -> bool {
    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Route client logs to the test output; honors RUST_LOG.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn start_minio() -> ContainerAsync<MinIO> {
    MinIO::default()
        .with_env_var("MINIO_ROOT_USER", MINIO_ACCESS_KEY)
        .with_env_var("MINIO_ROOT_PASSWORD", MINIO_SECRET_KEY)
        .start()
        .await
        .expect("Failed to start MinIO container")
}

/// Create a bucket with a signed raw request; the client itself only
/// operates within an existing bucket.
async fn create_bucket(endpoint: &str, bucket: &str) {
    let credentials = Credentials::new(MINIO_ACCESS_KEY, MINIO_SECRET_KEY, bucket)
        .expect("Failed to build credentials");
    let signer = RequestSigner::new(&credentials, "us-east-1");

    let url = url::Url::parse(&format!("{}/{}", endpoint, bucket)).expect("Invalid bucket URL");
    let mut headers = HashMap::new();
    let authorization = signer.authorization(
        &reqwest::Method::PUT,
        &url,
        &mut headers,
        &sha256_hex(b""),
        chrono::Utc::now(),
    );

    let client = reqwest::Client::new();
    let mut request = client.put(url);
    for (name, value) in &headers {
        request = request.header(name.as_str(), value.as_str());
    }
    let response = request
        .header("authorization", authorization)
        .send()
        .await
        .expect("Failed to create bucket");
    assert!(
        response.status().is_success(),
        "bucket creation failed: {}",
        response.status()
    );
}

/// Helper to create a client configured for MinIO
fn minio_client(endpoint: &str, bucket: &str) -> S3Client {
    let config = ClientConfig {
        key: MINIO_ACCESS_KEY.to_string(),
        secret: MINIO_SECRET_KEY.to_string(),
        bucket: bucket.to_string(),
        endpoint: Some(endpoint.to_string()),
        region: Some("us-east-1".to_string()),
        force_path_style: true,
        ..ClientConfig::default()
    };
    S3Client::new(&config).expect("Failed to create MinIO client")
}

/// Test object upload, download and single-object delete
#[tokio::test]
async fn test_put_get_delete_object() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    init_logging();

    let container = start_minio().await;
    let endpoint = get_minio_endpoint(&container).await;

    // Wait for MinIO to be ready
    tokio::time::sleep(Duration::from_secs(2)).await;

    create_bucket(&endpoint, "data-bucket").await;
    let client = minio_client(&endpoint, "data-bucket");

    let payload = Bytes::from_static(b"Hello, MinIO! This is test data.");
    client
        .put("/dir/test-file.txt", payload.clone(), "text/plain")
        .await
        .expect("Failed to put object");

    let object = client
        .get("/dir/test-file.txt")
        .await
        .expect("Failed to get object");
    assert_eq!(object.body, payload);

    let headers = client
        .head("/dir/test-file.txt")
        .await
        .expect("Failed to head object");
    assert_eq!(
        headers.get("content-length").map(String::as_str),
        Some("32")
    );

    client
        .delete("/dir/test-file.txt")
        .await
        .expect("Failed to delete object");

    let entries = client.list_all("/dir/").await.expect("Failed to list");
    assert!(entries.is_empty());
}

/// Test listing with basenames and common prefixes
#[tokio::test]
async fn test_list_and_common_prefixes() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    init_logging();

    let container = start_minio().await;
    let endpoint = get_minio_endpoint(&container).await;

    tokio::time::sleep(Duration::from_secs(2)).await;

    create_bucket(&endpoint, "list-bucket").await;
    let client = minio_client(&endpoint, "list-bucket");

    for key in ["/docs/a.txt", "/docs/sub/b.txt", "/docs/sub/c.txt", "/top.txt"] {
        client
            .put(key, Bytes::from_static(b"x"), "text/plain")
            .await
            .expect("Failed to put object");
    }

    let entries = client.list_all("/docs/").await.expect("Failed to list");
    let mut keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["docs/a.txt", "docs/sub/b.txt", "docs/sub/c.txt"]);
    assert!(entries.iter().any(|e| e.basename() == "a.txt"));

    let prefixes = client
        .list_common_prefixes("/docs/", "/")
        .await
        .expect("Failed to list common prefixes");
    assert_eq!(prefixes, vec!["docs/sub/"]);
}

/// Test recursive directory delete end to end
#[tokio::test]
async fn test_recursive_directory_delete() {
    if !docker_available() {
        eprintln!("Skipping test: Docker not available");
        return;
    }
    init_logging();

    let container = start_minio().await;
    let endpoint = get_minio_endpoint(&container).await;

    tokio::time::sleep(Duration::from_secs(2)).await;

    create_bucket(&endpoint, "delete-bucket").await;
    let client = minio_client(&endpoint, "delete-bucket");

    for i in 0..25 {
        let key = format!("/tree/node-{i:02}.txt");
        client
            .put(&key, Bytes::from_static(b"payload"), "text/plain")
            .await
            .expect("Failed to put object");
    }
    client
        .put("/keep/other.txt", Bytes::from_static(b"keep"), "text/plain")
        .await
        .expect("Failed to put object");

    client.delete("/tree/").await.expect("Failed to delete tree");

    let deleted = client.list_all("/tree/").await.expect("Failed to list");
    assert!(deleted.is_empty());

    // Keys outside the prefix are untouched.
    let kept = client.list_all("/keep/").await.expect("Failed to list");
    assert_eq!(kept.len(), 1);
}
