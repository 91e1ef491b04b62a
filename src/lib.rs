//! Timezone boundaries on a globe. Lookups live in [`zones`], drawing in [`render`].

pub mod config;
pub mod render;
pub mod service;
pub mod sources;
pub mod utils;
pub mod zones;

pub use globe_geometry as geometry;

use thiserror::Error;

// crate-wide error type for set-up and the command line; lookups themselves never fail
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}
