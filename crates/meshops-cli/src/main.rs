mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use meshops_publish::{BucketPublisher, ObjectStore, PublishError, S3Store, SlackPublisher};
use meshops_report::{format_table, TriggerReporter};
use meshops_snmp::SnmpDiscovery;
use meshops_topology::TopologyClient;
use meshops_zabbix::{enroll, ZabbixClient, MESH_NODE, RADIO};
use std::net::Ipv4Addr;
use tracing_subscriber::EnvFilter;

/// Automation and management tools for the mesh network's Zabbix deployment.
#[derive(Parser)]
#[command(name = "meshops", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enroll routers into monitoring, one by one or by popularity
    Enroll {
        /// Enroll the device at this IPv4 address
        #[arg(long, value_name = "IP", conflicts_with = "popular")]
        ip: Option<String>,

        /// Enroll every router with at least FLOOR OSPF links
        /// (defaults to P2Z_LINK_FLOOR)
        #[arg(long, value_name = "FLOOR", num_args = 0..=1)]
        popular: Option<Option<usize>>,

        /// Treat the device as a Ubiquiti AirOS radio instead of a mesh node
        #[arg(long, conflicts_with = "popular")]
        radio: bool,
    },

    /// Query the Zabbix database for the noisiest triggers
    NoisyTriggers {
        /// Upload the report to the bucket
        #[arg(long)]
        publish: bool,

        /// Print what would be uploaded instead of writing to the bucket
        #[arg(long)]
        test_publish: bool,

        /// Post the report table to Slack
        #[arg(long)]
        slack: bool,

        /// Lookback window in days (defaults to P2Z_DAYS_AGO)
        #[arg(long, value_name = "N")]
        days_ago: Option<i64>,

        /// Maximum number of rows (defaults to P2Z_LEADERBOARD)
        #[arg(long, value_name = "N")]
        leaderboard: Option<i64>,
    },

    /// Inspect the report bucket
    Bucket {
        /// Print the object stored at KEY
        #[arg(long, value_name = "KEY")]
        object: Option<String>,

        /// Delete the object stored at KEY
        #[arg(long, value_name = "KEY")]
        delete: Option<String>,

        /// List every key in the bucket
        #[arg(long)]
        list: bool,
    },

    /// Manage report messages in Slack
    Slack {
        /// Delete the message behind this permalink
        #[arg(long, value_name = "URL")]
        delete: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("meshops=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Enroll { ip, popular, radio } => run_enroll(&config, ip, popular, radio).await,
        Command::NoisyTriggers {
            publish,
            test_publish,
            slack,
            days_ago,
            leaderboard,
        } => run_noisy_triggers(&config, publish, test_publish, slack, days_ago, leaderboard).await,
        Command::Bucket { object, delete, list } => run_bucket(&config, object, delete, list).await,
        Command::Slack { delete } => run_slack_delete(&config, &delete).await,
    }
}

async fn run_enroll(
    config: &Config,
    ip: Option<String>,
    popular: Option<Option<usize>>,
    radio: bool,
) -> Result<()> {
    // Validate operator input before touching the network.
    let target: Option<Ipv4Addr> = match &ip {
        Some(raw) => Some(
            raw.parse()
                .map_err(|_| anyhow!("must pass a valid IPv4 address, got {raw:?}"))?,
        ),
        None => None,
    };

    let zabbix = config.zabbix()?;
    let api = ZabbixClient::login(&zabbix.url, &zabbix.username, &zabbix.password).await?;
    let discovery = SnmpDiscovery::new();

    match (target, popular) {
        (Some(ip), None) => {
            let class = if radio { &RADIO } else { &MESH_NODE };
            enroll::enroll_single(&api, &discovery, ip, class).await?;
            Ok(())
        }
        (None, Some(floor)) => {
            let link_floor = floor.unwrap_or(config.link_floor);
            let topology = TopologyClient::new(config.ospf_api_url()?)?;
            let summary = enroll::enroll_popular(&api, &discovery, &topology, link_floor).await?;
            tracing::info!(
                created = summary.created,
                skipped = summary.skipped,
                failed = summary.failed,
                "popular enrollment finished"
            );
            Ok(())
        }
        _ => bail!("pass exactly one of --ip or --popular"),
    }
}

/// Everything a `noisy-triggers` invocation needs from the environment.
/// Resolved in full before the first remote call so an incomplete
/// configuration fails fast.
#[derive(Debug)]
struct ReportTargets {
    database: meshops_report::DbConfig,
    zabbix: config::ZabbixConfig,
    bucket: Option<meshops_publish::BucketConfig>,
    slack: Option<config::SlackConfig>,
}

fn resolve_report_targets(
    config: &Config,
    want_bucket: bool,
    want_slack: bool,
) -> Result<ReportTargets> {
    Ok(ReportTargets {
        database: config.database()?,
        zabbix: config.zabbix()?,
        bucket: if want_bucket { Some(config.bucket()?) } else { None },
        slack: if want_slack { Some(config.slack()?) } else { None },
    })
}

async fn run_noisy_triggers(
    config: &Config,
    publish: bool,
    test_publish: bool,
    slack: bool,
    days_ago: Option<i64>,
    leaderboard: Option<i64>,
) -> Result<()> {
    let targets = resolve_report_targets(config, publish || test_publish, slack)?;

    let reporter = TriggerReporter::connect(&targets.database).await?;

    // The report is scoped to the mesh-node host group; its id lives in the
    // monitoring platform, so look it up through the API. A report run never
    // creates the group.
    let zabbix = &targets.zabbix;
    let api = ZabbixClient::login(&zabbix.url, &zabbix.username, &zabbix.password).await?;
    let group_id: i64 = enroll::require_group(&api, MESH_NODE.hostgroup)
        .await?
        .parse()
        .context("Zabbix returned a non-numeric group id")?;

    let days_ago = days_ago.unwrap_or(config.days_ago);
    let limit = leaderboard.unwrap_or(config.leaderboard);
    let rows = reporter.noisiest_triggers(group_id, days_ago, limit).await?;

    let table = format_table(&rows);
    println!("{table}");

    if let Some(bucket) = &targets.bucket {
        let publisher = BucketPublisher::new(Box::new(S3Store::new(bucket)), test_publish);
        match publisher
            .publish_noise_report(config.report_title.as_deref(), &rows, true)
            .await
        {
            Ok(()) => {}
            // A missing title is an operator configuration error, not a
            // transient publish failure.
            Err(e @ PublishError::MissingTitle) => return Err(e.into()),
            Err(e) => tracing::error!(error = %e, "bucket publish failed, continuing"),
        }
    }

    if let Some(slack_config) = targets.slack {
        let publisher = SlackPublisher::new(slack_config.token, slack_config.channel)?;
        if let Err(e) = publisher.post_report(&table).await {
            tracing::error!(error = %e, "Slack publish failed, continuing");
        }
    }

    Ok(())
}

async fn run_bucket(
    config: &Config,
    object: Option<String>,
    delete: Option<String>,
    list: bool,
) -> Result<()> {
    if object.is_none() && delete.is_none() && !list {
        bail!("pass at least one of --object, --delete, --list");
    }
    let store = S3Store::new(&config.bucket()?);

    if list {
        for key in store.list().await? {
            println!("{key}");
        }
    }
    if let Some(key) = object {
        let body = store.get(&key).await?;
        println!("{}", String::from_utf8_lossy(&body));
    }
    if let Some(key) = delete {
        store.delete(&key).await?;
        tracing::info!(key = %key, "deleted object");
    }
    Ok(())
}

async fn run_slack_delete(config: &Config, permalink: &str) -> Result<()> {
    let slack_config = config.slack()?;
    let publisher = SlackPublisher::new(slack_config.token, slack_config.channel)?;
    publisher.delete_message(permalink).await?;
    tracing::info!("deleted Slack message");
    Ok(())
}
