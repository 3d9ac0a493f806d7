//! Environment-variable configuration, read once at startup.
//!
//! Every value comes from a `P2Z_*` variable (a `.env` file is loaded first
//! when present). Each subcommand only requires the variables for the
//! subsystems it actually touches; the accessors below fail with a
//! descriptive message when a required group is incomplete.

use anyhow::{bail, Context, Result};
use meshops_publish::BucketConfig;
use meshops_report::DbConfig;

const DEFAULT_LINK_FLOOR: usize = 10;
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_BUCKET: &str = "mesh-support-reports";
const DEFAULT_DAYS_AGO: i64 = 7;
const DEFAULT_LEADERBOARD: i64 = 15;

#[derive(Debug, Clone)]
pub struct ZabbixConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub token: String,
    pub channel: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    ospf_api_url: Option<String>,
    pub link_floor: usize,

    zabbix_url: Option<String>,
    zabbix_username: Option<String>,
    zabbix_password: Option<String>,

    db_host: Option<String>,
    db_name: Option<String>,
    db_username: Option<String>,
    db_password: Option<String>,

    s3_access_key: Option<String>,
    s3_secret_key: Option<String>,
    s3_region: String,
    s3_bucket: String,

    pub report_title: Option<String>,

    slack_token: Option<String>,
    slack_channel: Option<String>,

    pub days_ago: i64,
    pub leaderboard: i64,
}

fn parsed<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw.parse().with_context(|| format!("{name} is not a number: {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any name -> value source. `from_env` hands in
    /// the process environment; tests hand in a table.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Ok(Self {
            ospf_api_url: var("P2Z_OSPF_API_URL"),
            link_floor: parsed("P2Z_LINK_FLOOR", var("P2Z_LINK_FLOOR"), DEFAULT_LINK_FLOOR)?,

            zabbix_url: var("P2Z_ZABBIX_URL"),
            zabbix_username: var("P2Z_ZABBIX_UNAME"),
            zabbix_password: var("P2Z_ZABBIX_PWORD"),

            db_host: var("P2Z_PGSQL_HOST"),
            db_name: var("P2Z_PGSQL_DB"),
            db_username: var("P2Z_PGSQL_UNAME"),
            db_password: var("P2Z_PGSQL_PWORD"),

            s3_access_key: var("P2Z_S3_ACCESS_KEY"),
            s3_secret_key: var("P2Z_S3_SECRET_KEY"),
            s3_region: var("P2Z_S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_bucket: var("P2Z_S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),

            report_title: var("P2Z_REPORT_TITLE"),

            slack_token: var("P2Z_SLACK_TOKEN"),
            slack_channel: var("P2Z_SLACK_CHANNEL"),

            days_ago: parsed("P2Z_DAYS_AGO", var("P2Z_DAYS_AGO"), DEFAULT_DAYS_AGO)?,
            leaderboard: parsed(
                "P2Z_LEADERBOARD",
                var("P2Z_LEADERBOARD"),
                DEFAULT_LEADERBOARD,
            )?,
        })
    }

    pub fn ospf_api_url(&self) -> Result<&str> {
        match &self.ospf_api_url {
            Some(url) => Ok(url),
            None => bail!("P2Z_OSPF_API_URL must be set"),
        }
    }

    pub fn zabbix(&self) -> Result<ZabbixConfig> {
        match (&self.zabbix_url, &self.zabbix_username, &self.zabbix_password) {
            (Some(url), Some(username), Some(password)) => Ok(ZabbixConfig {
                url: url.clone(),
                username: username.clone(),
                password: password.clone(),
            }),
            _ => bail!("Zabbix credentials not provided: set P2Z_ZABBIX_URL, P2Z_ZABBIX_UNAME, P2Z_ZABBIX_PWORD"),
        }
    }

    pub fn database(&self) -> Result<DbConfig> {
        match (&self.db_host, &self.db_name, &self.db_username, &self.db_password) {
            (Some(host), Some(database), Some(username), Some(password)) => Ok(DbConfig {
                host: host.clone(),
                database: database.clone(),
                username: username.clone(),
                password: password.clone(),
            }),
            _ => bail!("database credentials not provided: set P2Z_PGSQL_HOST, P2Z_PGSQL_DB, P2Z_PGSQL_UNAME, P2Z_PGSQL_PWORD"),
        }
    }

    pub fn bucket(&self) -> Result<BucketConfig> {
        match (&self.s3_access_key, &self.s3_secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(BucketConfig {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                region: self.s3_region.clone(),
                bucket: self.s3_bucket.clone(),
            }),
            _ => bail!("object storage credentials not provided: set P2Z_S3_ACCESS_KEY, P2Z_S3_SECRET_KEY"),
        }
    }

    pub fn slack(&self) -> Result<SlackConfig> {
        match (&self.slack_token, &self.slack_channel) {
            (Some(token), Some(channel)) => Ok(SlackConfig {
                token: token.clone(),
                channel: channel.clone(),
            }),
            _ => bail!("Slack credentials not provided: set P2Z_SLACK_TOKEN, P2Z_SLACK_CHANNEL"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) fn config_from(entries: &[(&str, &str)]) -> Result<Config> {
        let table: BTreeMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| table.get(name).cloned())
    }

    #[test]
    fn numeric_defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.link_floor, 10);
        assert_eq!(config.days_ago, 7);
        assert_eq!(config.leaderboard, 15);
    }

    #[test]
    fn numeric_overrides_are_parsed() {
        let config = config_from(&[
            ("P2Z_LINK_FLOOR", "25"),
            ("P2Z_DAYS_AGO", "30"),
            ("P2Z_LEADERBOARD", "5"),
        ])
        .unwrap();
        assert_eq!(config.link_floor, 25);
        assert_eq!(config.days_ago, 30);
        assert_eq!(config.leaderboard, 5);
    }

    #[test]
    fn non_numeric_link_floor_is_a_config_error() {
        let err = config_from(&[("P2Z_LINK_FLOOR", "ten")]).unwrap_err();
        assert!(err.to_string().contains("P2Z_LINK_FLOOR"));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let config = config_from(&[("P2Z_DAYS_AGO", ""), ("P2Z_S3_REGION", "")]).unwrap();
        assert_eq!(config.days_ago, 7);
        assert_eq!(config.s3_region, "us-east-1");
    }

    #[test]
    fn missing_zabbix_credentials_name_the_variables() {
        let config = config_from(&[("P2Z_ZABBIX_URL", "https://zabbix.example")]).unwrap();
        let err = config.zabbix().unwrap_err();
        assert!(err.to_string().contains("P2Z_ZABBIX_UNAME"));
    }

    #[test]
    fn complete_zabbix_credentials_resolve() {
        let config = config_from(&[
            ("P2Z_ZABBIX_URL", "https://zabbix.example"),
            ("P2Z_ZABBIX_UNAME", "ops"),
            ("P2Z_ZABBIX_PWORD", "hunter2"),
        ])
        .unwrap();
        let zabbix = config.zabbix().unwrap();
        assert_eq!(zabbix.url, "https://zabbix.example");
        assert_eq!(zabbix.username, "ops");
    }
}
