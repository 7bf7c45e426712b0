use std::net::SocketAddr;

use crate::error::{BackendError, Result};

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| BackendError::Config("DATABASE_URL not set".into()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| BackendError::Config("DATABASE_URL not set".into()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".into())
            .parse()
            .map_err(|_| BackendError::Config("BIND_ADDR is not a valid socket address".into()))?;

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
        })
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub archive_url: String,
}

impl ImportConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| BackendError::Config("DATABASE_URL not set".into()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let archive_url = feldplan_importer::config::archive_url();

        Ok(Self {
            database_url,
            max_connections,
            archive_url,
        })
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
        }
    }
}
