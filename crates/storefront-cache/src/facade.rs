//! Catalog cache facade.
//!
//! The API the catalog query layer talks to. Callers treat every `get_*` as
//! "may be absent": on `None` they query the source of truth and call the
//! matching `set_*`.
//!
//! ## Failure Contract
//!
//! Nothing here fails because of the backend or the metrics sink. The only
//! errors returned are caller mistakes on `set_*` (empty scope, zero TTL,
//! unserializable payload).

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::backend::{BackendMode, RedisClientFactory, RemoteClientFactory};
use crate::codec;
use crate::config::CacheSettings;
use crate::error::{CacheError, CacheResult};
use crate::keys::{CacheDomain, CacheKey};
use crate::metrics::{MetricsError, MetricsSink, RecorderMetrics};
use crate::payload::{
    CategoryNode, CategoryTreePayload, CategoryTrees, Domain, PopularProducts,
    PopularProductsPayload, ProductListPayload, ProductLists, ProductSummary,
};
use crate::resolver::{ActiveBackend, BackendResolver};

/// Cache statistics for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub mode: BackendMode,
    /// Entries held in process memory; `None` unless resolved in-process.
    pub local_entries: Option<usize>,
    pub shut_down: bool,
}

/// Read-through cache for catalog queries.
///
/// Construct one per process at the composition root and share it by
/// `Arc`. Backend resolution happens on the first operation, not here, so
/// construction never blocks on the network.
pub struct CatalogCache {
    resolver: BackendResolver,
    metrics: Arc<dyn MetricsSink>,
    product_list_ttl: Duration,
    category_tree_ttl: Duration,
    shut_down: AtomicBool,
}

/// Builder for [`CatalogCache`].
pub struct CatalogCacheBuilder {
    settings: CacheSettings,
    remote_factory: Arc<dyn RemoteClientFactory>,
    metrics: Arc<dyn MetricsSink>,
}

impl CatalogCacheBuilder {
    /// Override how remote clients are created (defaults to Redis).
    pub fn remote_factory(mut self, factory: Arc<dyn RemoteClientFactory>) -> Self {
        self.remote_factory = factory;
        self
    }

    /// Override where metrics go (defaults to the global `metrics` recorder).
    pub fn metrics(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics = sink;
        self
    }

    pub fn build(self) -> CatalogCache {
        CatalogCache {
            resolver: BackendResolver::new(&self.settings, self.remote_factory),
            metrics: self.metrics,
            product_list_ttl: self.settings.product_list_ttl(),
            category_tree_ttl: self.settings.category_tree_ttl(),
            shut_down: AtomicBool::new(false),
        }
    }
}

impl CatalogCache {
    /// Cache using Redis for the remote store and the global metrics recorder.
    pub fn new(settings: &CacheSettings) -> Self {
        Self::builder(settings.clone()).build()
    }

    pub fn builder(settings: CacheSettings) -> CatalogCacheBuilder {
        CatalogCacheBuilder {
            settings,
            remote_factory: Arc::new(RedisClientFactory),
            metrics: Arc::new(RecorderMetrics),
        }
    }

    // ========================================================================
    // Product lists
    // ========================================================================

    pub async fn get_product_list(&self, scope: &str) -> Option<ProductListPayload> {
        self.get::<ProductLists>(scope).await
    }

    /// Store a listing with the configured product-list TTL.
    pub async fn set_product_list(
        &self,
        scope: &str,
        payload: &ProductListPayload,
    ) -> CacheResult<()> {
        self.set::<ProductLists>(scope, payload, self.product_list_ttl)
            .await
    }

    pub async fn invalidate_product_lists(&self) -> u64 {
        self.invalidate(CacheDomain::ProductList).await
    }

    // ========================================================================
    // Category trees
    // ========================================================================

    pub async fn get_category_tree(&self, scope: &str) -> Option<CategoryTreePayload> {
        self.get::<CategoryTrees>(scope).await
    }

    /// Store a category tree with the configured category-tree TTL.
    pub async fn set_category_tree(&self, scope: &str, roots: &[CategoryNode]) -> CacheResult<()> {
        tracing::debug!(
            scope,
            roots = roots.len(),
            nodes = roots.iter().map(CategoryNode::node_count).sum::<usize>(),
            "caching category tree"
        );
        self.set::<CategoryTrees>(scope, roots, self.category_tree_ttl)
            .await
    }

    pub async fn invalidate_category_trees(&self) -> u64 {
        self.invalidate(CacheDomain::CategoryTree).await
    }

    // ========================================================================
    // Popular products
    // ========================================================================

    pub async fn get_popular_products(&self, scope: &str) -> Option<PopularProductsPayload> {
        self.get::<PopularProducts>(scope).await
    }

    /// Store a ranking with a caller-chosen TTL.
    ///
    /// Placements refresh their rankings on different cadences, so the TTL
    /// is not configured centrally. A zero TTL is rejected.
    pub async fn set_popular_products(
        &self,
        scope: &str,
        items: &[ProductSummary],
        ttl_minutes: u32,
    ) -> CacheResult<()> {
        if ttl_minutes == 0 {
            return Err(CacheError::invalid_ttl(
                "popular products TTL must be at least one minute",
            ));
        }
        let ttl = Duration::from_secs(u64::from(ttl_minutes) * 60);
        self.set::<PopularProducts>(scope, items, ttl).await
    }

    pub async fn invalidate_popular_products(&self) -> u64 {
        self.invalidate(CacheDomain::PopularProducts).await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Invalidate every domain. Returns the total number of entries removed.
    pub async fn invalidate_all(&self) -> u64 {
        let mut removed = 0;
        for domain in CacheDomain::ALL {
            removed += self.invalidate(domain).await;
        }
        removed
    }

    /// Force backend resolution and report the outcome.
    pub async fn resolve(&self) -> BackendMode {
        match self.active().await {
            Some(active) => active.mode(),
            None => self.resolver.mode(),
        }
    }

    /// Current backend mode, without triggering resolution.
    pub fn backend_mode(&self) -> BackendMode {
        self.resolver.mode()
    }

    pub fn stats(&self) -> CacheStats {
        let resolved = self.resolver.resolved();
        CacheStats {
            mode: self.resolver.mode(),
            local_entries: resolved.and_then(ActiveBackend::local).map(|l| l.len()),
            shut_down: self.is_shut_down(),
        }
    }

    /// Close the active backend and stop serving.
    ///
    /// Safe to call more than once. Operations arriving afterwards are
    /// no-ops: reads miss, writes are dropped, invalidations remove nothing.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.resolver.close().await;
        tracing::info!(mode = %self.resolver.mode(), "Catalog cache shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn active(&self) -> Option<&ActiveBackend> {
        if self.is_shut_down() {
            return None;
        }
        let active = self.resolver.resolve().await;
        // Shutdown may have begun while resolution was in flight, before
        // there was a backend or sweeper for it to release.
        if self.is_shut_down() {
            self.resolver.close().await;
            return None;
        }
        Some(active)
    }

    async fn get<D: Domain>(&self, scope: &str) -> Option<D::Payload> {
        let value = self.lookup::<D>(scope).await;
        if value.is_some() {
            self.report("cache-hit", |sink| sink.record_hit(D::DOMAIN));
        } else {
            self.report("cache-miss", |sink| sink.record_miss(D::DOMAIN));
        }
        value
    }

    async fn lookup<D: Domain>(&self, scope: &str) -> Option<D::Payload> {
        let key = match CacheKey::new(D::DOMAIN, scope) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(domain = %D::DOMAIN, error = %e, "cache lookup skipped");
                return None;
            }
        };

        let active = self.active().await?;
        let raw = active.backend().get(key.as_str()).await?;

        match codec::decode::<D::Payload>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(
                    domain = %key.domain(),
                    scope = key.scope(),
                    error = %e,
                    "discarding undecodable cache entry"
                );
                None
            }
        }
    }

    async fn set<D: Domain>(
        &self,
        scope: &str,
        payload: &D::Input,
        ttl: Duration,
    ) -> CacheResult<()> {
        let key = CacheKey::new(D::DOMAIN, scope)?;
        let raw = codec::encode(payload)?;

        if let Some(active) = self.active().await {
            active.backend().set(key.as_str(), raw, ttl).await;
            // A concurrent shutdown may have closed the backend between the
            // flag check and the write.
            if self.is_shut_down() {
                active.backend().close().await;
            }
        }
        Ok(())
    }

    async fn invalidate(&self, domain: CacheDomain) -> u64 {
        let removed = match self.active().await {
            Some(active) => active.backend().delete_by_prefix(domain.prefix()).await,
            None => 0,
        };
        tracing::info!(domain = %domain, removed, "cache domain invalidated");
        self.report("cache-invalidation", |sink| {
            sink.record_invalidation(domain, removed)
        });
        removed
    }

    /// Deliver one metrics event, containing any failure of the sink.
    fn report(
        &self,
        event: &'static str,
        deliver: impl FnOnce(&dyn MetricsSink) -> Result<(), MetricsError>,
    ) {
        match catch_unwind(AssertUnwindSafe(|| deliver(self.metrics.as_ref()))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(event, error = %e, "cache metrics sink failed"),
            Err(panic) => tracing::debug!(
                event,
                panic = %panic_message(panic.as_ref()),
                "cache metrics sink panicked"
            ),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
