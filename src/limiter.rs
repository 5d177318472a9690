// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-key admission control over self-expiring token buckets.
//!
//! Locking is two-level:
//! 1. A map lock guards insertion and removal of buckets.
//! 2. Each bucket has its own lock around its token count.
//!
//! Callers hold the map lock only long enough to look up or insert a bucket
//! and release it before touching the bucket. Only the expiry path takes both
//! locks, always bucket first, then map.

use crate::bucket::{run_refill_loop, Bucket, Consume};
use crate::config::LimiterConfig;
use crate::error::{ConfigError, LimitExceeded, Result};
use crate::key::KeyExtractor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

type BucketMap = Arc<Mutex<HashMap<String, Arc<Bucket>>>>;

/// Thread-safe keyed rate limiter.
///
/// `R` is the request type the key extractor reads; it may be unsized, so a
/// `Limiter<str>` keyed by the string itself works as well as a limiter over
/// HTTP requests.
pub struct Limiter<R: ?Sized> {
    /// Configuration
    config: LimiterConfig,
    /// Maps a request to its key
    key_fn: Box<dyn KeyExtractor<R>>,
    /// Active buckets by key
    buckets: BucketMap,
    /// Runtime the refill tasks run on
    runtime: Handle,
    /// Stops every refill task when signalled or dropped
    shutdown: watch::Sender<()>,
}

impl<R: ?Sized> Limiter<R> {
    /// Create a new limiter.
    ///
    /// Fails if any setting is zero, or if called outside a Tokio runtime.
    pub fn new<K>(config: LimiterConfig, key_fn: K) -> Result<Self>
    where
        K: KeyExtractor<R> + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        let (shutdown, _) = watch::channel(());

        Ok(Self {
            config,
            key_fn: Box::new(key_fn),
            buckets: Arc::new(Mutex::new(HashMap::new())),
            runtime,
            shutdown,
        })
    }

    /// Admit or reject `request`.
    ///
    /// Never blocks beyond brief lock acquisition.
    pub fn check_limit(&self, request: &R) -> std::result::Result<(), LimitExceeded> {
        let key = self.key_fn.extract(request);
        self.check_key(key)
    }

    fn check_key(&self, key: String) -> std::result::Result<(), LimitExceeded> {
        loop {
            let bucket = self.get_or_create_bucket(&key);
            match bucket.try_consume() {
                Consume::Admitted => return Ok(()),
                Consume::Rejected => {
                    debug!(%key, "Rate limit exceeded");
                    return Err(LimitExceeded::new(key));
                }
                // Expired buckets are already out of the map; retry on a fresh one.
                Consume::Expired => continue,
            }
        }
    }

    fn get_or_create_bucket(&self, key: &str) -> Arc<Bucket> {
        let mut buckets = self.buckets.lock();
        if let Some(bucket) = buckets.get(key) {
            return Arc::clone(bucket);
        }

        let bucket = Arc::new(Bucket::new(
            self.config.max_tokens,
            self.config.refill_amount,
        ));
        buckets.insert(key.to_string(), Arc::clone(&bucket));

        // Spawning never runs the task inline; its expiry callback waits for
        // this lock like any other map writer.
        let map = Arc::clone(&self.buckets);
        let owned_key = key.to_string();
        let expiring = Arc::clone(&bucket);
        self.runtime.spawn(run_refill_loop(
            Arc::clone(&bucket),
            self.config.refill_interval(),
            self.shutdown.subscribe(),
            move || delete_bucket(&map, &owned_key, &expiring),
        ));

        debug!(key, "Created bucket");
        bucket
    }

    /// Stop every refill task and forget all buckets.
    ///
    /// Keys seen afterwards start again from a full bucket.
    pub fn shutdown(&self) {
        // Signal under the map lock: every bucket in the map subscribed
        // before this send, every bucket created later subscribes after it.
        let drained: Vec<Arc<Bucket>> = {
            let mut buckets = self.buckets.lock();
            self.shutdown.send_replace(());
            buckets.drain().map(|(_, bucket)| bucket).collect()
        };
        // Callers still holding a drained bucket must not keep using it.
        for bucket in &drained {
            bucket.retire();
        }
        info!(buckets = drained.len(), "Limiter shut down");
    }

    /// Number of keys with a live bucket.
    pub fn active_buckets(&self) -> usize {
        self.buckets.lock().len()
    }

    /// Whether `key` currently has a live bucket.
    pub fn is_tracking(&self, key: &str) -> bool {
        self.buckets.lock().contains_key(key)
    }

    /// Tokens left for `key`, or `None` if it has no live bucket.
    pub fn available_tokens(&self, key: &str) -> Option<u32> {
        let bucket = self.buckets.lock().get(key).cloned()?;
        Some(bucket.tokens())
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}

impl<R: ?Sized> fmt::Debug for Limiter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Limiter")
            .field("config", &self.config)
            .field("active_buckets", &self.active_buckets())
            .finish()
    }
}

/// Remove `key` if it still maps to `bucket`.
///
/// A stale callback never removes a newer bucket created for the same key.
fn delete_bucket(buckets: &Mutex<HashMap<String, Arc<Bucket>>>, key: &str, bucket: &Arc<Bucket>) {
    let mut buckets = buckets.lock();
    if buckets
        .get(key)
        .is_some_and(|current| Arc::ptr_eq(current, bucket))
    {
        buckets.remove(key);
        debug!(key, "Bucket full, expired");
    }
}
