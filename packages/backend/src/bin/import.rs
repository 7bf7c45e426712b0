use tracing_subscriber::EnvFilter;

use feldplan_backend::config::ImportConfig;
use feldplan_backend::{create_pool, execute_import, run_migrations};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ImportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let pool = match create_pool(&config.backend_config()).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to database");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        tracing::error!(error = %e, "failed to run migrations");
        std::process::exit(1);
    }

    match execute_import(&pool, &config.archive_url).await {
        Ok(stats) => {
            tracing::info!(
                crops = stats.crops,
                pests = stats.pests,
                conditions = stats.conditions,
                products = stats.products,
                approvals = stats.approvals,
                skipped = stats.skipped_indications,
                "import finished"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "import failed, registry left unchanged");
            std::process::exit(1);
        }
    }
}
