//! Product Gateway

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mockall::automock;
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::{sync::RwLock, time::Instant};
use tracing::warn;

use crate::domain::{
    catalog::{client::ProductSource, models::ProductLookup},
    tenants::records::TenantUuid,
};

/// How long a looked-up product stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Expired entries are swept on write once the cache holds this many.
const SWEEP_THRESHOLD: usize = 1_024;

#[derive(Debug, Clone)]
struct CacheEntry {
    lookup: ProductLookup,
    expires_at: Instant,
}

type CacheKey = (TenantUuid, String);

/// Read-through, per-replica cache in front of a [`ProductSource`].
pub struct CachedProductGateway {
    source: Arc<dyn ProductSource>,
    ttl: Duration,
    cache: RwLock<FxHashMap<CacheKey, CacheEntry>>,
}

impl std::fmt::Debug for CachedProductGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedProductGateway")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl CachedProductGateway {
    #[must_use]
    pub fn new(source: Arc<dyn ProductSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    #[cfg(test)]
    async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl ProductGateway for CachedProductGateway {
    async fn lookup(&self, tenant: TenantUuid, product_ids: &[String]) -> Vec<ProductLookup> {
        let mut seen = FxHashSet::default();
        let distinct: Vec<&String> = product_ids.iter().filter(|id| seen.insert(*id)).collect();

        if distinct.is_empty() {
            return Vec::new();
        }

        let now = Instant::now();
        let mut resolved: FxHashMap<String, ProductLookup> = FxHashMap::default();
        let mut uncached = Vec::new();

        {
            let cache = self.cache.read().await;

            for id in &distinct {
                match cache.get(&(tenant, (*id).clone())) {
                    Some(entry) if entry.expires_at > now => {
                        resolved.insert((*id).clone(), entry.lookup.clone());
                    }
                    _ => uncached.push((*id).clone()),
                }
            }
        }

        if !uncached.is_empty() {
            match self.source.fetch_products(tenant, &uncached).await {
                Ok(fetched) => {
                    let fetched_at = Instant::now();
                    let expires_at = fetched_at + self.ttl;
                    let mut cache = self.cache.write().await;

                    if cache.len() >= SWEEP_THRESHOLD {
                        cache.retain(|_, entry| entry.expires_at > fetched_at);
                    }

                    for lookup in fetched {
                        cache.insert(
                            (tenant, lookup.id.clone()),
                            CacheEntry {
                                lookup: lookup.clone(),
                                expires_at,
                            },
                        );

                        resolved.insert(lookup.id.clone(), lookup);
                    }
                }
                Err(error) => {
                    warn!(
                        %tenant,
                        products = uncached.len(),
                        %error,
                        "product lookup failed, treating uncached products as missing"
                    );
                }
            }
        }

        distinct
            .into_iter()
            .map(|id| {
                resolved
                    .remove(id)
                    .unwrap_or_else(|| ProductLookup::missing(id.clone()))
            })
            .collect()
    }

    async fn invalidate(&self, tenant: TenantUuid, product_id: &str) {
        self.cache
            .write()
            .await
            .remove(&(tenant, product_id.to_string()));
    }

    async fn invalidate_tenant(&self, tenant: TenantUuid) {
        self.cache
            .write()
            .await
            .retain(|(cached_tenant, _), _| *cached_tenant != tenant);
    }

    async fn clear(&self) {
        self.cache.write().await.clear();
    }
}

#[automock]
#[async_trait]
pub trait ProductGateway: Send + Sync {
    /// Look up products by ID, one result per distinct ID in request order.
    ///
    /// Never fails: when the catalog cannot be reached, uncached IDs come
    /// back as not found.
    async fn lookup(&self, tenant: TenantUuid, product_ids: &[String]) -> Vec<ProductLookup>;

    /// Drop one cached product.
    async fn invalidate(&self, tenant: TenantUuid, product_id: &str);

    /// Drop every cached product of a tenant.
    async fn invalidate_tenant(&self, tenant: TenantUuid);

    /// Drop everything.
    async fn clear(&self);
}
