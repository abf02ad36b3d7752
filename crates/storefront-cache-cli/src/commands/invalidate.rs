use anyhow::{Result, bail};
use storefront_cache::{BackendMode, CacheDomain, CatalogCache};

use crate::cli::InvalidateTarget;
use crate::output::{print_field, print_success};

pub async fn invalidate(cache: &CatalogCache, target: InvalidateTarget) -> Result<()> {
    // An in-process cache belongs to this CLI process alone; clearing it
    // would not touch any server's cache.
    if cache.resolve().await != BackendMode::Remote {
        bail!("Remote store is not configured or unreachable; nothing to invalidate");
    }

    let mut removed = 0;
    for &domain in domains(target) {
        let count = match domain {
            CacheDomain::ProductList => cache.invalidate_product_lists().await,
            CacheDomain::CategoryTree => cache.invalidate_category_trees().await,
            CacheDomain::PopularProducts => cache.invalidate_popular_products().await,
        };
        print_field(domain.as_str(), count);
        removed += count;
    }

    print_success(&format!("Invalidated {removed} cache entries"));
    Ok(())
}

fn domains(target: InvalidateTarget) -> &'static [CacheDomain] {
    match target {
        InvalidateTarget::ProductLists => &[CacheDomain::ProductList],
        InvalidateTarget::CategoryTrees => &[CacheDomain::CategoryTree],
        InvalidateTarget::PopularProducts => &[CacheDomain::PopularProducts],
        InvalidateTarget::All => &CacheDomain::ALL,
    }
}
