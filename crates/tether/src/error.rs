//! Runner errors.

use std::path::PathBuf;
use thiserror::Error;
use tether_networking::{AdmissionError, NetError};

/// The configuration file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File that was opened.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`crate::TetherConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Anything that stops a LAN session.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Bad configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The host refused a client.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// An endpoint tick failed.
    #[error(transparent)]
    Net(#[from] NetError),
}
