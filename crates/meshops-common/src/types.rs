use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Router IP -> OSPF peer-link count, as extracted from the topology API.
///
/// Routers whose link-state entry carries no `links.router` key are not
/// present in the map at all. If the same router appears in more than one
/// OSPF area, the count from the later area wins.
pub type LinkCountMap = BTreeMap<String, usize>;

/// One row of the noisy-trigger leaderboard, as returned by the Zabbix
/// database aggregation query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRow {
    /// Host display name (`hosts.name`).
    pub host: String,
    /// Trigger description (`triggers.description`).
    pub description: String,
    /// Trigger severity (`triggers.priority`, 0-5; the report query only
    /// returns 3 and above).
    pub priority: i32,
    /// Number of distinct problem events in the lookback window.
    pub trip_count: i64,
}

impl TriggerRow {
    pub fn new(
        host: impl Into<String>,
        description: impl Into<String>,
        priority: i32,
        trip_count: i64,
    ) -> Self {
        Self {
            host: host.into(),
            description: description.into(),
            priority,
            trip_count,
        }
    }
}
