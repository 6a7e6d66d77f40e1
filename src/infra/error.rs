use thiserror::Error;

use crate::application::clients::ClientError;
use crate::config::LoadError;

/// Failures raised while standing up or operating the infrastructure layer.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("configuration error: {0}")]
    Configuration(#[from] LoadError),
    #[error("database url is not configured")]
    MissingDatabaseUrl,
    #[error("outbound client setup failed: {0}")]
    Client(#[from] ClientError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
