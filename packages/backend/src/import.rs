//! Drive a full registry import: fetch the feed, replace the tables.

use sqlx::PgPool;

use crate::error::Result;
use crate::registry::{replace_registry, ImportStats};

/// Download and parse the archive, then replace the registry tables.
///
/// The download and parse run on a blocking thread; nothing touches the
/// database until the feed has parsed completely, so a fetch or parse
/// failure leaves the stored registry untouched.
pub async fn execute_import(pool: &PgPool, archive_url: &str) -> Result<ImportStats> {
    let url = archive_url.to_string();
    let parsed = tokio::task::spawn_blocking(move || feldplan_importer::fetch_registry(&url))
        .await??;

    tracing::info!(
        products = parsed.products.len(),
        indications = parsed.indication_count(),
        "feed parsed, replacing registry tables"
    );

    replace_registry(pool, &parsed).await
}
