pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod farms;
pub mod handlers;
pub mod import;
pub mod models;
pub mod plans;
pub mod registry;
pub mod state;

pub use config::{ApiConfig, BackendConfig, ImportConfig};
pub use db::{create_pool, run_migrations};
pub use error::BackendError;
pub use import::execute_import;
pub use models::{
    Advisor, Approval, CropMeta, Farm, PestMeta, Plan, PlanStatus, Product,
};
pub use registry::{replace_registry, ImportStats};
pub use state::AppState;
