//! Typed payloads cached per domain.
//!
//! Each domain is bound to exactly one payload type through [`Domain`], so
//! a category tree can never be read back as a product list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::CacheDomain;

/// Binds a cache domain to the payload type stored under it.
pub trait Domain {
    const DOMAIN: CacheDomain;
    /// Owned form returned by reads.
    type Payload: DeserializeOwned + Send;
    /// Borrowed form accepted by writes.
    type Input: Serialize + Sync + ?Sized;
}

/// Product listing views (`product-list:` keys).
pub struct ProductLists;

/// Category trees (`category-tree:` keys).
pub struct CategoryTrees;

/// Popular-product rankings (`popular-products:` keys).
pub struct PopularProducts;

impl Domain for ProductLists {
    const DOMAIN: CacheDomain = CacheDomain::ProductList;
    type Payload = ProductListPayload;
    type Input = ProductListPayload;
}

impl Domain for CategoryTrees {
    const DOMAIN: CacheDomain = CacheDomain::CategoryTree;
    type Payload = CategoryTreePayload;
    type Input = [CategoryNode];
}

impl Domain for PopularProducts {
    const DOMAIN: CacheDomain = CacheDomain::PopularProducts;
    type Payload = PopularProductsPayload;
    type Input = [ProductSummary];
}

/// A product as it appears in listings and rankings.
///
/// Only `id` is interpreted; every other field the catalog layer puts on
/// the product is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ProductSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Map::new(),
        }
    }

    /// Attach an extra attribute (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListPayload {
    pub items: Vec<ProductSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl ProductListPayload {
    pub fn new(items: Vec<ProductSummary>) -> Self {
        Self {
            items,
            total: None,
            next_cursor: None,
        }
    }
}

/// A node of the category tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CategoryNode::node_count).sum::<usize>()
    }
}

/// Root categories, in display order.
pub type CategoryTreePayload = Vec<CategoryNode>;

/// Ranked products, most popular first.
pub type PopularProductsPayload = Vec<ProductSummary>;
