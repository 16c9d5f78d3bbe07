//! Access credentials for a single bucket
//!
//! A [`Credentials`] value is created once at client construction and shared
//! read-only by every operation. It is never mutated afterwards.

use std::fmt;

use crate::error::S3Error;

/// Access key, secret and target bucket for one client instance.
#[derive(Clone)]
pub struct Credentials {
    access_key: String,
    secret: String,
    bucket: String,
}

impl Credentials {
    /// Create credentials, rejecting empty fields before any I/O happens.
    pub fn new(
        access_key: impl Into<String>,
        secret: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self, S3Error> {
        let access_key = access_key.into();
        let secret = secret.into();
        let bucket = bucket.into();

        if access_key.is_empty() {
            return Err(S3Error::MissingArgument("key"));
        }
        if secret.is_empty() {
            return Err(S3Error::MissingArgument("secret"));
        }
        if bucket.is_empty() {
            return Err(S3Error::MissingArgument("bucket"));
        }

        Ok(Self {
            access_key,
            secret,
            bucket,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

// The secret must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret", &"<redacted>")
            .field("bucket", &self.bucket)
            .finish()
    }
}
