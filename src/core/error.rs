use thiserror::Error;

use crate::scheduler::JobId;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Job not scheduled: {0:?}")]
    UnknownJob(JobId),

    #[error("Job scheduled twice: {0:?}")]
    DuplicateJob(JobId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
