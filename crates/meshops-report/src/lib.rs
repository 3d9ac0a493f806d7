//! Noisy-trigger reporting against the Zabbix backing database.
//!
//! The monitoring frontend has no API for "which triggers tripped most this
//! week", so this goes straight to the relational store with one aggregation
//! query, the same one the Zabbix top-triggers page runs.

pub mod error;
pub mod format;

use chrono::Utc;
use error::Result;
use meshops_common::types::TriggerRow;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

pub use format::{format_csv, format_table};

/// Connection parameters for the Zabbix PostgreSQL database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    fn dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:5432/{}",
            self.username, self.password, self.host, self.database
        )
    }
}

// Filter semantics are load-bearing domain knowledge: problem-class events
// only (source = 0, object = 0), plain or discovered triggers (flags 0/4),
// High severity and above (priority >= 3), bounded by the lookback window
// and the host group.
const NOISIEST_QUERY: &str = r#"
SELECT h.name, t.description, t.priority, COUNT(DISTINCT e.eventid) AS cnt_event
FROM triggers t, events e, functions f, items i, hosts h, hosts_groups hg
WHERE t.triggerid = e.objectid
  AND e.source = 0
  AND e.object = 0
  AND e.clock > $1
  AND t.flags IN ('0', '4')
  AND t.priority >= 3
  AND f.triggerid = t.triggerid
  AND i.itemid = f.itemid
  AND i.hostid = h.hostid
  AND h.hostid = hg.hostid
  AND hg.groupid = $2
GROUP BY h.name, t.description, t.priority
ORDER BY cnt_event DESC
LIMIT $3 OFFSET 0
"#;

/// Read-only reporter over the monitoring platform's database. Each CLI run
/// opens one connection and closes it at process exit.
pub struct TriggerReporter {
    pool: PgPool,
}

impl TriggerReporter {
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        tracing::info!(host = %config.host, database = %config.database, "connecting to Zabbix database");
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&config.dsn())
            .await?;
        Ok(Self { pool })
    }

    /// Returns the `limit` triggers with the most distinct problem events in
    /// the last `days_ago` days, restricted to one host group, ranked by
    /// event count descending.
    pub async fn noisiest_triggers(
        &self,
        group_id: i64,
        days_ago: i64,
        limit: i64,
    ) -> Result<Vec<TriggerRow>> {
        let cutoff = Utc::now().timestamp() - days_ago * 86_400;
        let records = sqlx::query(NOISIEST_QUERY)
            .bind(cutoff)
            .bind(group_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            rows.push(TriggerRow {
                host: record.try_get("name")?,
                description: record.try_get("description")?,
                priority: record.try_get("priority")?,
                trip_count: record.try_get("cnt_event")?,
            });
        }

        rank(&mut rows);
        tracing::info!(rows = rows.len(), group_id, days_ago, "fetched noisy triggers");
        Ok(rows)
    }
}

/// Re-sorts rows by trip count descending. The query already orders this
/// way; the re-sort is kept for parity with the original reporting path. It
/// is stable and uses no secondary key, so equal counts retain database
/// return order.
pub fn rank(rows: &mut [TriggerRow]) {
    rows.sort_by(|a, b| b.trip_count.cmp(&a.trip_count));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_by_count_descending() {
        let mut rows = vec![
            TriggerRow::new("a", "d", 3, 2),
            TriggerRow::new("b", "d", 4, 9),
            TriggerRow::new("c", "d", 5, 5),
        ];
        rank(&mut rows);
        let hosts: Vec<&str> = rows.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["b", "c", "a"]);
    }

    #[test]
    fn rank_keeps_database_order_for_ties() {
        let mut rows = vec![
            TriggerRow::new("first", "d", 3, 5),
            TriggerRow::new("second", "d", 3, 5),
            TriggerRow::new("third", "d", 3, 5),
        ];
        rank(&mut rows);
        let hosts: Vec<&str> = rows.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["first", "second", "third"]);
    }
}
