//! TTL result cache in front of the function registry
//!
//! A process-wide memoization table keyed by function name plus a hash of
//! the serialized argument tuple. Entries expire lazily at read time; a
//! size-triggered sweep bounds memory. Consistency with the data store is
//! maintained solely by write-coupled invalidation: mutation paths call
//! [`ResultCache::invalidate_related`] with the entity they touched.

use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use stocka_types::{ArgValue, FunctionName};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Mutation kind reported by a write path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

/// Entity kind a mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Product,
    Transaction,
}

impl EntityKind {
    /// Functions whose cached results a mutation of this entity invalidates.
    ///
    /// This list is hand-maintained; [`ResultCache::coverage_gaps`] reports
    /// catalogue functions missing from every list so additions cannot
    /// silently serve stale data.
    pub fn purge_list(&self) -> &'static [FunctionName] {
        match self {
            EntityKind::Product => &[
                FunctionName::SearchProducts,
                FunctionName::GetProductsByCategory,
                FunctionName::GetProductBySku,
                FunctionName::GetLowStockItems,
                FunctionName::GetHighValueItems,
                FunctionName::GetTotalInventoryValue,
                FunctionName::GetInventorySummary,
                FunctionName::GetWarehouseOccupancy,
            ],
            EntityKind::Transaction => &[
                FunctionName::GetRecentTransactions,
                FunctionName::GetTransactionStats,
                FunctionName::GetLowStockItems,
                FunctionName::GetTotalInventoryValue,
                FunctionName::GetInventorySummary,
            ],
        }
    }
}

/// Cache tuning knobs with per-function TTL overrides
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entry count that triggers an inline expired-entry sweep
    pub max_entries: usize,
    /// TTL for functions without an explicit policy
    pub default_ttl: Duration,
    overrides: HashMap<FunctionName, Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl: Duration::from_secs(300),
            overrides: HashMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweep-triggering entry count
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Override the TTL for one function
    pub fn with_ttl(mut self, function: FunctionName, ttl: Duration) -> Self {
        self.overrides.insert(function, ttl);
        self
    }

    /// Effective TTL for a function: override, then policy table, then default.
    ///
    /// Short TTLs for transactional and search-style queries, long TTLs for
    /// slow-moving aggregates.
    pub fn ttl_for(&self, function: FunctionName) -> Duration {
        if let Some(ttl) = self.overrides.get(&function) {
            return *ttl;
        }
        match function {
            FunctionName::SearchProducts | FunctionName::GetRecentTransactions => {
                Duration::from_secs(60)
            }
            FunctionName::GetProductsByCategory
            | FunctionName::GetProductBySku
            | FunctionName::GetLowStockItems => Duration::from_secs(120),
            FunctionName::GetTotalInventoryValue | FunctionName::GetWarehouseOccupancy => {
                Duration::from_secs(600)
            }
            FunctionName::GetInventorySummary => Duration::from_secs(900),
            _ => self.default_ttl,
        }
    }
}

/// One cached result; valid while `created_at.elapsed() < ttl`
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_valid(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// Hit/miss counters snapshot
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }
}

/// The TTL memoization table. Explicitly constructed and shared by `Arc`;
/// concurrent misses on one key may both execute, last write wins.
pub struct ResultCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Deterministic key over the function name and the serialized argument
    /// tuple. Structurally equal argument lists always produce the same key.
    fn cache_key(function: FunctionName, args: &[ArgValue]) -> String {
        let serialized = serde_json::to_string(args).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        serialized.hash(&mut hasher);
        format!("{}:{:016x}", function, hasher.finish())
    }

    /// Look up a cached result; expired entries are evicted and count as a miss
    pub async fn get(&self, function: FunctionName, args: &[ArgValue]) -> Option<Value> {
        let key = Self::cache_key(function, args);

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if entry.is_valid() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(%function, "cache hit");
                    return Some(entry.data.clone());
                }
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        }

        // Entry exists but is stale; evict it under the write lock.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(&key) {
            if !entry.is_valid() {
                entries.remove(&key);
                debug!(%function, "evicted expired entry");
            } else {
                // Refreshed by a concurrent writer between the two locks.
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.data.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a result under the function's TTL policy
    pub async fn set(&self, function: FunctionName, args: &[ArgValue], value: Value) {
        let key = Self::cache_key(function, args);
        let ttl = self.config.ttl_for(function);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                data: value,
                created_at: Instant::now(),
                ttl,
            },
        );
        if entries.len() > self.config.max_entries {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_valid());
            debug!(
                removed = before - entries.len(),
                remaining = entries.len(),
                "size-triggered cleanup"
            );
        }
    }

    /// Drop every entry for one function
    pub async fn invalidate(&self, function: FunctionName) {
        let prefix = format!("{function}:");
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Purge all entries related to a mutated entity. Write paths must call
    /// this; a path that forgets produces stale reads until TTL expiry.
    pub async fn invalidate_related(&self, op: WriteOp, entity: EntityKind) {
        let list = entity.purge_list();
        let prefixes: Vec<String> = list.iter().map(|f| format!("{f}:")).collect();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !prefixes.iter().any(|p| key.starts_with(p)));
        debug!(
            ?op,
            ?entity,
            purged = before - entries.len(),
            "write-coupled invalidation"
        );
    }

    /// Remove every currently expired entry
    pub async fn cleanup(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_valid());
    }

    /// Drop everything
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().await.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Catalogue functions absent from every invalidation purge list.
    ///
    /// A non-empty result means a write path cannot invalidate that
    /// function's entries; callers should log this at startup.
    pub fn coverage_gaps() -> Vec<FunctionName> {
        FunctionName::all()
            .into_iter()
            .filter(|f| {
                ![EntityKind::Product, EntityKind::Transaction]
                    .iter()
                    .any(|e| e.purge_list().contains(f))
            })
            .collect()
    }

    /// Warn about invalidation coverage gaps; intended for service startup
    pub fn warn_on_coverage_gaps() {
        let gaps = Self::coverage_gaps();
        if !gaps.is_empty() {
            warn!(
                ?gaps,
                "functions without invalidation coverage will serve stale data after writes"
            );
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
