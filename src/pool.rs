//! Per-operation-kind concurrency pools
//!
//! Every remote operation passes through a bounded gate for its
//! [`OperationKind`] before any request is issued. Each gate is a fair
//! (first-come-first-served) semaphore plus a waiter counter, so admission
//! order is FIFO and a full waiting queue rejects immediately instead of
//! queueing without bound.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::S3Error;

/// Concurrency limit applied when neither a per-operation nor a generic
/// override is configured.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// The closed set of remote operations the client performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Get,
    Put,
    Delete,
    Head,
    List,
    ListCommonPrefixes,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Get => "get",
            OperationKind::Put => "put",
            OperationKind::Delete => "delete",
            OperationKind::Head => "head",
            OperationKind::List => "list",
            OperationKind::ListCommonPrefixes => "listCommonPrefixes",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sizing and admission parameters for one pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Slots handed out at any one time. Always at least 1.
    pub max_concurrent: usize,
    /// Waiters allowed to queue before further acquires are rejected.
    pub max_queue_depth: usize,
    /// How long an acquire may wait for a slot.
    pub acquire_timeout: Duration,
    /// Inactivity window after which surplus backing resources would be
    /// reclaimed. No-op for the semaphore gate; kept for resource-backed
    /// substitution.
    pub idle_eviction_timeout: Duration,
    /// Slots a resource-backed gate would warm up ahead of demand. No-op for
    /// the semaphore gate.
    pub prefetch: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_queue_depth: 100_000,
            acquire_timeout: Duration::from_secs(3600),
            idle_eviction_timeout: Duration::from_secs(60),
            prefetch: 10,
        }
    }
}

impl PoolConfig {
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Self::default()
        }
    }
}

/// Concurrency overrides from the client configuration, resolved per
/// operation kind as: per-operation override, then the generic override,
/// then [`DEFAULT_MAX_CONCURRENT`].
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyLimits {
    pub generic: Option<usize>,
    pub downloads: Option<usize>,
    pub uploads: Option<usize>,
    pub lists: Option<usize>,
    pub deletes: Option<usize>,
}

impl ConcurrencyLimits {
    fn resolve(&self, kind: OperationKind) -> usize {
        let per_operation = match kind {
            OperationKind::Get => self.downloads,
            OperationKind::Put => self.uploads,
            OperationKind::List => self.lists,
            OperationKind::Delete => self.deletes,
            // No dedicated overrides; these follow the generic limit.
            OperationKind::Head | OperationKind::ListCommonPrefixes => None,
        };
        per_operation
            .or(self.generic)
            .unwrap_or(DEFAULT_MAX_CONCURRENT)
            .max(1)
    }
}

/// A held slot. Dropping it returns the slot to its pool, so release happens
/// exactly once on every exit path.
#[derive(Debug)]
pub struct Slot {
    kind: OperationKind,
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

/// A bounded, fair gate for one operation kind.
#[derive(Debug)]
pub struct Pool {
    kind: OperationKind,
    gate: Arc<Semaphore>,
    waiting: AtomicUsize,
    config: PoolConfig,
}

impl Pool {
    pub fn new(kind: OperationKind, config: PoolConfig) -> Self {
        // A pool always admits at least one request.
        let slots = config.max_concurrent.max(1);
        Self {
            kind,
            gate: Arc::new(Semaphore::new(slots)),
            waiting: AtomicUsize::new(0),
            config,
        }
    }

    /// Wait for a free slot.
    ///
    /// Admission is FIFO. Fails with [`S3Error::PoolSaturated`] right away
    /// when `max_queue_depth` acquires are already waiting, and with
    /// [`S3Error::PoolTimeout`] when no slot frees up within
    /// `acquire_timeout`.
    pub async fn acquire(&self) -> Result<Slot, S3Error> {
        let waiting = self.waiting.fetch_add(1, Ordering::AcqRel);
        if waiting >= self.config.max_queue_depth {
            self.waiting.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(kind = %self.kind, waiting, "pool saturated, rejecting acquire");
            return Err(S3Error::PoolSaturated {
                kind: self.kind,
                waiting,
            });
        }

        let acquired = tokio::time::timeout(
            self.config.acquire_timeout,
            Arc::clone(&self.gate).acquire_owned(),
        )
        .await;
        self.waiting.fetch_sub(1, Ordering::AcqRel);

        match acquired {
            Ok(Ok(permit)) => Ok(Slot {
                kind: self.kind,
                _permit: permit,
            }),
            // The gate lives as long as the registry and is never closed.
            Ok(Err(_closed)) => Err(S3Error::PoolSaturated {
                kind: self.kind,
                waiting,
            }),
            Err(_elapsed) => Err(S3Error::PoolTimeout {
                kind: self.kind,
                timeout: self.config.acquire_timeout,
            }),
        }
    }

    /// Slots currently free. Test and diagnostics aid.
    pub fn available(&self) -> usize {
        self.gate.available_permits()
    }
}

/// One pool per operation kind, created once at client construction.
///
/// The operation set is closed, so the pools are plain named fields rather
/// than a keyed map.
#[derive(Debug)]
pub struct PoolRegistry {
    get: Pool,
    put: Pool,
    delete: Pool,
    head: Pool,
    list: Pool,
    list_common_prefixes: Pool,
}

impl PoolRegistry {
    pub fn new(limits: &ConcurrencyLimits) -> Self {
        let pool = |kind: OperationKind| {
            Pool::new(kind, PoolConfig::with_max_concurrent(limits.resolve(kind)))
        };
        Self {
            get: pool(OperationKind::Get),
            put: pool(OperationKind::Put),
            delete: pool(OperationKind::Delete),
            head: pool(OperationKind::Head),
            list: pool(OperationKind::List),
            list_common_prefixes: pool(OperationKind::ListCommonPrefixes),
        }
    }

    pub fn pool(&self, kind: OperationKind) -> &Pool {
        match kind {
            OperationKind::Get => &self.get,
            OperationKind::Put => &self.put,
            OperationKind::Delete => &self.delete,
            OperationKind::Head => &self.head,
            OperationKind::List => &self.list,
            OperationKind::ListCommonPrefixes => &self.list_common_prefixes,
        }
    }

    pub async fn acquire(&self, kind: OperationKind) -> Result<Slot, S3Error> {
        self.pool(kind).acquire().await
    }
}
