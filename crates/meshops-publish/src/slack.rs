//! Slack publisher: posts the noise-report table as one preformatted
//! message, and can delete a message given its permalink.

use crate::error::{PublishError, Result};
use serde::Deserialize;
use serde_json::json;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const DELETE_MESSAGE_URL: &str = "https://slack.com/api/chat.delete";

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

pub struct SlackPublisher {
    client: reqwest::Client,
    token: String,
    channel: String,
}

impl SlackPublisher {
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            token: token.into(),
            channel: channel.into(),
        })
    }

    async fn call(&self, url: &str, body: serde_json::Value) -> Result<()> {
        let response: SlackResponse = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if !response.ok {
            return Err(PublishError::SlackApi(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(())
    }

    /// Posts the whole table as one triple-backtick code block to the
    /// configured channel.
    pub async fn post_report(&self, table: &str) -> Result<()> {
        tracing::info!(channel = %self.channel, "posting noise report to Slack");
        self.call(
            POST_MESSAGE_URL,
            json!({
                "channel": self.channel,
                "text": format!("```{table}```"),
            }),
        )
        .await
    }

    /// Deletes the message behind a permalink of the form
    /// `.../<channel>/p<digits>`.
    pub async fn delete_message(&self, permalink: &str) -> Result<()> {
        let (channel, ts) = parse_permalink(permalink)?;
        tracing::info!(channel = %channel, ts = %ts, "deleting Slack message");
        self.call(
            DELETE_MESSAGE_URL,
            json!({ "channel": channel, "ts": ts }),
        )
        .await
    }
}

/// Converts a Slack message permalink into the (channel, timestamp) pair the
/// delete API wants. The trailing `p<digits>` segment becomes a timestamp by
/// inserting a decimal point six digits from the end:
/// `p1696054569736259` -> `1696054569.736259`.
pub fn parse_permalink(url: &str) -> Result<(String, String)> {
    let bad = || PublishError::BadPermalink(url.to_string());

    let mut segments = url.trim_end_matches('/').rsplit('/');
    let last = segments.next().ok_or_else(bad)?;
    let channel = segments.next().filter(|s| !s.is_empty()).ok_or_else(bad)?;

    let digits = last.strip_prefix('p').ok_or_else(bad)?;
    if digits.len() <= 6 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let (seconds, micros) = digits.split_at(digits.len() - 6);
    Ok((channel.to_string(), format!("{seconds}.{micros}")))
}
