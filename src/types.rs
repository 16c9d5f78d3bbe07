//! Object-storage data types
//!
//! - [`ObjectEntry`] - one key in a listing
//! - [`ListPage`] - one page of a (possibly truncated) listing
//! - [`Object`] - a downloaded object body with its response headers
//! - [`PutOptions`] - upload visibility and extra headers

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Full key within the bucket, without a leading separator.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification time, when the listing reported one.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified,
        }
    }

    /// The part of the key after the final `/`.
    ///
    /// Derived from the key on every call, so it can never go stale:
    /// `"a/b/c.txt"` yields `"c.txt"`, a key without any separator yields
    /// the whole key.
    pub fn basename(&self) -> &str {
        match self.key.rfind('/') {
            Some(idx) => &self.key[idx + 1..],
            None => &self.key,
        }
    }
}

/// One page of a listing.
///
/// When `truncated` is false, `continuation_key` is always `None`.
/// When `truncated` is true, `continuation_key` carries the marker needed to
/// fetch the page after this one.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<ObjectEntry>,
    pub common_prefixes: Vec<String>,
    pub truncated: bool,
    pub continuation_key: Option<String>,
}

/// A downloaded object: the body plus the response headers that came with it.
#[derive(Debug, Clone)]
pub struct Object {
    pub body: Bytes,
    pub headers: HashMap<String, String>,
}

/// Options for uploads beyond key, body and content type.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// When set, the object is stored with a `public-read` ACL.
    pub public: bool,
    /// Extra request headers, e.g. cache control or user metadata.
    pub headers: HashMap<String, String>,
}
