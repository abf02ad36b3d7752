//! Cache key namespace.
//!
//! Every key is `<domain>:<scope>`. All keys of one domain share the
//! `<domain>:` prefix, which is the unit of group invalidation.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

/// Hex characters kept from a scope fingerprint digest.
const FINGERPRINT_LEN: usize = 16;

/// Logical data category cached by the catalog cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDomain {
    ProductList,
    CategoryTree,
    PopularProducts,
}

impl CacheDomain {
    /// All domains, in invalidation order.
    pub const ALL: [CacheDomain; 3] = [
        CacheDomain::ProductList,
        CacheDomain::CategoryTree,
        CacheDomain::PopularProducts,
    ];

    /// Stable name used in keys and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            CacheDomain::ProductList => "product-list",
            CacheDomain::CategoryTree => "category-tree",
            CacheDomain::PopularProducts => "popular-products",
        }
    }

    /// Key prefix shared by every entry of this domain.
    pub const fn prefix(self) -> &'static str {
        match self {
            CacheDomain::ProductList => "product-list:",
            CacheDomain::CategoryTree => "category-tree:",
            CacheDomain::PopularProducts => "popular-products:",
        }
    }
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully-qualified, namespaced cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    domain: CacheDomain,
    key: String,
}

impl CacheKey {
    /// Build the key for `scope` within `domain`.
    ///
    /// Scopes may themselves contain `:` to carry a subkey
    /// (e.g. `public:page-2`); only an empty scope is rejected.
    pub fn new(domain: CacheDomain, scope: &str) -> CacheResult<Self> {
        if scope.is_empty() {
            return Err(CacheError::invalid_key(format!(
                "empty scope for domain {domain}"
            )));
        }
        Ok(Self {
            domain,
            key: format!("{}{}", domain.prefix(), scope),
        })
    }

    pub fn domain(&self) -> CacheDomain {
        self.domain
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The caller-supplied scope part of the key.
    pub fn scope(&self) -> &str {
        &self.key[self.domain.prefix().len()..]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Derive a stable scope from a structured filter.
///
/// The digest is taken over the filter's JSON form, so it is identical
/// across processes sharing one remote store (unlike `DefaultHasher`).
/// Field order follows the struct definition; maps should be `BTreeMap`.
pub fn fingerprint<T: Serialize + ?Sized>(filter: &T) -> CacheResult<String> {
    let canonical = serde_json::to_vec(filter).map_err(CacheError::Encode)?;
    let digest = Sha256::digest(&canonical);
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    Ok(hex)
}
