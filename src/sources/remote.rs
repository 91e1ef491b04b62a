use super::common::{self, ApiError};
use async_trait::async_trait;
use std::path::PathBuf;
use url::Url;

/// Where the full timezone dataset comes from. Returns the raw serialized text.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(&self) -> Result<String, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        HttpSource { client, url }
    }

    pub fn parse(client: reqwest::Client, url: &str) -> Result<Self, ApiError> {
        Ok(Self::new(client, Url::parse(url)?))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch(&self) -> Result<String, ApiError> {
        common::fetch_text(&self.client, &self.url).await
    }
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

#[async_trait]
impl RemoteSource for FileSource {
    async fn fetch(&self) -> Result<String, ApiError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

/// Used when no source is configured; every fetch fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSource;

#[async_trait]
impl RemoteSource for UnavailableSource {
    async fn fetch(&self) -> Result<String, ApiError> {
        Err(ApiError::Unavailable)
    }
}
