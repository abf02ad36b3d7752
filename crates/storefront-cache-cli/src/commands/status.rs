use anyhow::Result;
use storefront_cache::{AppConfig, BackendMode, CatalogCache};

use crate::output::{print_field, print_success, print_warning};

pub async fn status(config: &AppConfig, cache: &CatalogCache) -> Result<()> {
    let remote = config.cache.remote.as_ref();
    print_field(
        "Remote store",
        remote
            .map(|r| r.display_url())
            .unwrap_or_else(|| "(not configured)".to_string()),
    );
    print_field(
        "TTLs",
        format!(
            "product lists {}s, category trees {}s",
            config.cache.product_list_ttl_secs, config.cache.category_tree_ttl_secs
        ),
    );

    let mode = cache.resolve().await;
    print_field("Backend", mode);

    if let Some(entries) = cache.stats().local_entries {
        print_field("Local entries", entries);
    }

    match (mode, remote) {
        (BackendMode::InProcess, Some(_)) => {
            print_warning("Remote store unreachable, cache is running in-process only")
        }
        _ => print_success("Cache is ready"),
    }
    Ok(())
}
