use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("registry import failed: {0}")]
    Import(#[from] feldplan_importer::ImporterError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("farm not found: {0}")]
    FarmNotFound(i64),

    #[error("farm {0} does not belong to the caller")]
    FarmNotOwned(i64),

    #[error("plan not found: {0}")]
    PlanNotFound(i64),

    #[error("product not found: {0}")]
    ProductNotFound(i64),

    #[error("product {0} is referenced by existing treatments")]
    ProductInUse(i64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;
