//! Read-through cache for storefront catalog queries.
//!
//! [`CatalogCache`] fronts product listings, category trees and
//! popular-product rankings. It picks a backend once per instance: the
//! shared remote store (Redis) when one is configured and reachable,
//! process memory otherwise. Cache failures never reach callers; a broken
//! cache only costs hit rate.
//!
//! ```no_run
//! use storefront_cache::{CacheSettings, CatalogCache, ProductListPayload};
//!
//! # async fn example(load: impl std::future::Future<Output = ProductListPayload>) {
//! let cache = CatalogCache::new(&CacheSettings::with_remote("redis://localhost:6379"));
//!
//! let listing = match cache.get_product_list("public").await {
//!     Some(listing) => listing,
//!     None => {
//!         let fresh = load.await;
//!         let _ = cache.set_product_list("public", &fresh).await;
//!         fresh
//!     }
//! };
//! # let _ = listing;
//! # }
//! ```

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod facade;
pub mod keys;
pub mod metrics;
pub mod observability;
pub mod payload;
pub mod resolver;

pub use backend::{
    BackendMode, CacheBackend, InMemoryBackend, RedisClient, RedisClientFactory, RemoteBackend,
    RemoteClient, RemoteClientFactory,
};
pub use config::{AppConfig, CacheSettings, ConfigError, LoggingConfig, RemoteStoreConfig};
pub use error::{CacheError, CacheResult};
pub use facade::{CacheStats, CatalogCache, CatalogCacheBuilder};
pub use keys::{CacheDomain, CacheKey, fingerprint};
pub use metrics::{MetricsError, MetricsSink, NoopMetrics, RecorderMetrics};
pub use observability::init_tracing;
pub use payload::{
    CategoryNode, CategoryTreePayload, PopularProductsPayload, ProductListPayload, ProductSummary,
};
