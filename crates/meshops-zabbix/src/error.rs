/// Errors from the Zabbix JSON-RPC API client.
#[derive(Debug, thiserror::Error)]
pub enum ZabbixError {
    /// The API returned a JSON-RPC error object.
    #[error("Zabbix API error {code}: {message} ({data})")]
    Rpc {
        code: i64,
        message: String,
        data: String,
    },

    /// A template lookup by exact name came back empty. Unlike host groups,
    /// templates are never created by this tool.
    #[error("Zabbix template not found: {0}")]
    TemplateNotFound(String),

    /// A host group lookup came back empty on a path that must not create
    /// the group.
    #[error("Zabbix host group not found: {0}")]
    GroupNotFound(String),

    /// The API answered 200 but the result payload did not have the
    /// documented shape.
    #[error("unexpected Zabbix response shape: {0}")]
    Shape(String),

    /// Underlying HTTP transport error from `reqwest`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ZabbixError>;
