//! Concurrency-bounded client for S3-compatible object storage
//!
//! This crate provides an async client for a single bucket on S3 or an
//! S3-compatible store. Every operation kind (get, put, delete, head, list,
//! listCommonPrefixes) runs behind its own bounded concurrency pool, the
//! request engine follows the service's temporary redirects itself, listings
//! are exposed as a lazy page cursor, and deleting a key that ends in `/`
//! removes the whole virtual directory with bounded fan-out.
//!
//! ```no_run
//! use s3_bucket_client::{ClientConfig, S3Client};
//!
//! # async fn example() -> Result<(), s3_bucket_client::S3Error> {
//! let client = S3Client::new(&ClientConfig::new("AKID", "secret", "my-bucket"))?;
//! client.put("/dir/file.txt", "hello".into(), "text/plain").await?;
//! let object = client.get("/dir/file.txt").await?;
//! client.delete("/dir/").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod pagination;
pub mod pool;
pub mod request;
pub mod sign;
pub mod types;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the types most callers need.
pub use client::S3Client;
pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{S3Error, TransportError};
pub use pagination::ListPages;
pub use pool::{OperationKind, PoolConfig};
pub use request::Transport;
pub use types::{ListPage, Object, ObjectEntry, PutOptions};
