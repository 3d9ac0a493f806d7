/// Errors from the report publishers (object storage and chat).
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// No report title is configured. Checked before any network call.
    #[error("no report title configured; set P2Z_REPORT_TITLE")]
    MissingTitle,

    /// Object-storage operation failed.
    #[error("object storage error: {0}")]
    Storage(String),

    /// The Slack API answered `ok: false`.
    #[error("Slack API error: {0}")]
    SlackApi(String),

    /// A message permalink did not match the `.../<channel>/p<digits>` shape.
    #[error("unrecognized Slack permalink: {0}")]
    BadPermalink(String),

    /// Underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PublishError>;
