use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Communication(#[from] reqwest::Error),

    #[error("Failed to construct URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response status {status} from {url}")]
    BadStatus {
        status: u16,
        url: String,
    },

    #[error("No timezone data source configured")]
    Unavailable,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cache storage failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize cached data: {0}")]
    Parsing(#[from] serde_json::Error),
}


pub async fn fetch_text(client: &reqwest::Client, url: &Url) -> Result<String, ApiError> {
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::BadStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    // parsing is left to the caller, an unusable body simply means "no data"
    let payload = response.text().await?;
    Ok(payload)
}
