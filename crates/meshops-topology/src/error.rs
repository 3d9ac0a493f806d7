/// Errors from the OSPF topology API client.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// The API answered with a non-200 status code.
    #[error("topology API returned status {0}")]
    BadStatus(u16),

    /// Underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("malformed topology JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
