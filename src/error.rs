//! Error handling for station discovery and parsing.
//!
//! Separates failures that end a whole discovery cycle (the remote folder
//! cannot be listed) from failures scoped to a single file, which the
//! registry builder downgrades to warnings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Remote folder unavailable at {url}: {reason}")]
    RemoteUnavailable { url: String, reason: String },

    #[error("Failed to read remote file {name}: {reason}")]
    RemoteRead { name: String, reason: String },

    #[error("Expected a height/value column in {source_name}")]
    MissingValueColumn { source_name: String },

    #[error("Invalid station file format in {source_name} - {reason}")]
    InvalidFormat { source_name: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Station not found: {id}")]
    StationNotFound { id: String },
}

impl StationError {
    /// True when the error only concerns one file and discovery can continue
    pub fn is_file_scoped(&self) -> bool {
        matches!(
            self,
            StationError::RemoteRead { .. }
                | StationError::MissingValueColumn { .. }
                | StationError::InvalidFormat { .. }
                | StationError::Polars(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StationError>;
