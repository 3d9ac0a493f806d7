//! Client for the mesh OSPF topology API.
//!
//! The API serves one large link-state JSON document. The only thing this
//! toolkit needs from it is, per router, how many router-to-router links it
//! currently has; that count drives the "popular router" enrollment floor.

pub mod error;

use error::{Result, TopologyError};
use meshops_common::types::LinkCountMap;
use serde_json::Value;

/// HTTP client for the OSPF topology endpoint. One GET per [`fetch`] call,
/// no retries.
///
/// [`fetch`]: TopologyClient::fetch
pub struct TopologyClient {
    url: String,
    client: reqwest::Client,
}

impl TopologyClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Fetches the raw link-state document.
    ///
    /// # Errors
    ///
    /// [`TopologyError::BadStatus`] on any non-200 response;
    /// [`TopologyError::Network`] / [`TopologyError::Json`] on transport or
    /// parse failure.
    pub async fn fetch(&self) -> Result<Value> {
        tracing::info!(url = %self.url, "fetching OSPF topology");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TopologyError::BadStatus(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Walks `doc.areas[*].routers[*]` and returns router IP -> router-link count.
///
/// A router whose `links` object has no `router` key is skipped entirely (it
/// has no router links, which is not the same as an empty list). A router IP
/// that appears in more than one area keeps the count from the area visited
/// last; the API does not document which copy is authoritative.
pub fn extract_link_counts(doc: &Value) -> LinkCountMap {
    let mut counts = LinkCountMap::new();

    let Some(areas) = doc.get("areas").and_then(Value::as_object) else {
        return counts;
    };
    for area in areas.values() {
        let Some(routers) = area.get("routers").and_then(Value::as_object) else {
            continue;
        };
        for (router_ip, router_info) in routers {
            let Some(links) = router_info.get("links") else {
                continue;
            };
            match links.get("router").and_then(Value::as_array) {
                Some(router_links) => {
                    counts.insert(router_ip.clone(), router_links.len());
                }
                None => continue,
            }
        }
    }
    counts
}
