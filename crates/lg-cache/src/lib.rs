// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cache Service: fingerprints requests, serves and records results with
//! TTL, two-tier (hot in-memory + durable persistence store), and
//! invalidation.
//!
//! The hot tier is a plain `Arc<RwLock<HashMap<...>>>` rather than an
//! external cache crate.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use lg_core::CacheStatus;
use lg_error::{ErrorCode, LintError};
use lg_store::{NewCacheEntry, Store};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Logical cache key: `(linter, format, content_hash, options_hash)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Linter identifier.
    pub linter: String,
    /// Output format.
    pub format: String,
    /// SHA-256 of raw submission bytes.
    pub content_hash: String,
    /// SHA-256 of canonicalized options.
    pub options_hash: String,
}

/// An in-memory cache entry, as served to callers.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Terminal status of the run that produced this entry.
    pub status: CacheStatus,
    /// Serialized result payload (JSON).
    pub payload: String,
    /// Error message, when `status != Success`.
    pub error_message: Option<String>,
    /// When this entry was written.
    pub created_at: DateTime<Utc>,
    /// When this entry stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// A finished linter result ready to be cached.
#[derive(Debug, Clone)]
pub struct CacheWrite {
    /// Logical key this entry is stored under.
    pub key: CacheKey,
    /// Terminal status.
    pub status: CacheStatus,
    /// Serialized result payload (JSON).
    pub payload: String,
    /// Error message, if any.
    pub error_message: Option<String>,
    /// Correlation id of the originating request.
    pub request_id: Option<String>,
}

/// Session (process-lifetime, not persisted) hit/miss counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SessionStats {
    /// Number of hits observed this process's lifetime.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of misses observed this process's lifetime.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Aggregate cache statistics returned by [`CacheService::stats`].
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Session hits.
    pub hits: u64,
    /// Session misses.
    pub misses: u64,
    /// Non-expired rows currently in the durable store.
    pub persisted_entries: i64,
}

/// The Cache Service.
pub struct CacheService {
    store: Arc<Store>,
    hot: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    default_ttl: chrono::Duration,
    stats: SessionStats,
}

impl CacheService {
    /// Build a cache service over a shared persistence store.
    pub fn new(store: Arc<Store>, default_ttl_secs: u64) -> Self {
        Self {
            store,
            hot: Arc::new(RwLock::new(HashMap::new())),
            default_ttl: chrono::Duration::seconds(default_ttl_secs as i64),
            stats: SessionStats::default(),
        }
    }

    /// Look up a cache entry. Checks the hot tier first; on miss, reads
    /// through to the persistence store and repopulates the hot tier.
    ///
    /// A persistence-store read failure is demoted to a miss (logged at
    /// `warn`), never propagated to the caller.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Utc::now();

        if let Some(entry) = self.hot.read().await.get(key) {
            if entry.is_valid(now) {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.clone());
            }
        }

        match self
            .store
            .get_cache(&key.content_hash, &key.linter, &key.options_hash)
            .await
        {
            Ok(Some(row)) => {
                let entry = CacheEntry {
                    status: row.status,
                    payload: row.payload,
                    error_message: row.error_message,
                    created_at: row.created_at,
                    expires_at: row.expires_at,
                };
                self.hot.write().await.insert(key.clone(), entry.clone());
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Ok(None) => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(err) => {
                tracing::warn!(target: "lintgate.cache", error = %err, "cache read failed, demoting to miss");
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Write a finished result to both tiers. The hot tier is always
    /// updated; a durable-write failure surfaces as [`ErrorCode::CacheError`]
    /// but the caller should still treat the linter result as valid and
    /// return it — the error is informational only.
    pub async fn put(&self, write: CacheWrite) -> Result<(), LintError> {
        let now = Utc::now();
        let expires_at = now + self.default_ttl;

        self.hot.write().await.insert(
            write.key.clone(),
            CacheEntry {
                status: write.status,
                payload: write.payload.clone(),
                error_message: write.error_message.clone(),
                created_at: now,
                expires_at,
            },
        );

        self.store
            .put_cache(NewCacheEntry {
                linter: write.key.linter.clone(),
                format: write.key.format.clone(),
                content_hash: write.key.content_hash.clone(),
                options_hash: write.key.options_hash.clone(),
                status: write.status,
                payload: write.payload,
                error_message: write.error_message,
                request_id: write.request_id,
                ttl: self.default_ttl,
            })
            .await
            .map_err(|e| {
                LintError::new(ErrorCode::CacheError, "failed to persist cache entry")
                    .with_source(e)
            })?;

        Ok(())
    }

    /// Invalidate every cache entry.
    pub async fn invalidate_all(&self) -> Result<u64, LintError> {
        let n = self
            .store
            .delete_cache_all()
            .await
            .map_err(|e| LintError::new(ErrorCode::CacheError, "invalidate failed").with_source(e))?;
        self.hot.write().await.clear();
        Ok(n)
    }

    /// Invalidate every cache entry for a given content hash.
    pub async fn invalidate_by_content(&self, content_hash: &str) -> Result<u64, LintError> {
        let n = self
            .store
            .delete_cache_by_content(content_hash)
            .await
            .map_err(|e| LintError::new(ErrorCode::CacheError, "invalidate failed").with_source(e))?;
        self.hot
            .write()
            .await
            .retain(|k, _| k.content_hash != content_hash);
        Ok(n)
    }

    /// Invalidate every cache entry for a given linter.
    pub async fn invalidate_by_linter(&self, linter: &str) -> Result<u64, LintError> {
        let n = self
            .store
            .delete_cache_by_linter(linter)
            .await
            .map_err(|e| LintError::new(ErrorCode::CacheError, "invalidate failed").with_source(e))?;
        self.hot.write().await.retain(|k, _| k.linter != linter);
        Ok(n)
    }

    /// Invalidate every cache entry for a given `(content_hash, linter)` pair.
    pub async fn invalidate_by_content_and_linter(
        &self,
        content_hash: &str,
        linter: &str,
    ) -> Result<u64, LintError> {
        let n = self
            .store
            .delete_cache_by_content_and_linter(content_hash, linter)
            .await
            .map_err(|e| LintError::new(ErrorCode::CacheError, "invalidate failed").with_source(e))?;
        self.hot
            .write()
            .await
            .retain(|k, _| !(k.content_hash == content_hash && k.linter == linter));
        Ok(n)
    }

    /// Sweep expired entries from both tiers. Intended to run on a periodic
    /// timer; also safe to call directly (e.g. from tests or an admin route).
    pub async fn sweep_expired(&self) -> Result<u64, LintError> {
        let now = Utc::now();
        self.hot.write().await.retain(|_, v| v.is_valid(now));

        self.store
            .cleanup_expired_cache()
            .await
            .map_err(|e| LintError::new(ErrorCode::CacheError, "sweep failed").with_source(e))
    }

    /// Current cache statistics: session hit/miss counters plus the
    /// persisted non-expired row count.
    pub async fn stats(&self) -> CacheStats {
        let persisted_entries = self.store.count_cache_entries().await.unwrap_or_else(|err| {
            tracing::warn!(target: "lintgate.cache", error = %err, "stats read failed");
            0
        });

        CacheStats {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            persisted_entries,
        }
    }
}
