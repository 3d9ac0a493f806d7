//! Object-storage publisher: date-partitioned report uploads plus the small
//! bucket-explorer operations the CLI exposes.

use crate::error::{PublishError, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use chrono::{Datelike, NaiveDate};
use meshops_common::types::TriggerRow;
use meshops_report::{format_csv, format_table};

/// Credentials and addressing for the report bucket.
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub bucket: String,
}

/// Minimal capability seam over object storage, so report publishing can be
/// tested without S3.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn list(&self) -> Result<Vec<String>>;
}

/// S3 implementation of [`ObjectStore`] with static credentials.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(config: &BucketConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "meshops-env",
        );
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let listing = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| PublishError::Storage(e.to_string()))?;
        Ok(listing
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect())
    }
}

/// Styles a noise report can be stored as.
#[derive(Debug, Clone, Copy)]
pub enum ReportStyle {
    Csv,
    Pretty,
}

impl ReportStyle {
    fn prefix(self) -> &'static str {
        match self {
            ReportStyle::Csv => "csv",
            ReportStyle::Pretty => "pretty",
        }
    }
}

/// Builds the date-partitioned object key for a noise report, e.g.
/// `zabbix/csv/2024/03/07/noisiest.csv`.
pub fn report_key(style: ReportStyle, date: NaiveDate) -> String {
    format!(
        "zabbix/{}/{:04}/{:02}/{:02}/noisiest.csv",
        style.prefix(),
        date.year(),
        date.month(),
        date.day()
    )
}

/// Publishes noise reports to the bucket. In dry-run mode every write is
/// printed instead of uploaded.
pub struct BucketPublisher {
    store: Box<dyn ObjectStore>,
    dry_run: bool,
}

impl BucketPublisher {
    pub fn new(store: Box<dyn ObjectStore>, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    /// Writes the CSV report (and optionally the aligned table) under
    /// today's date partition. Regenerating the same day overwrites.
    ///
    /// # Errors
    ///
    /// [`PublishError::MissingTitle`] — before any storage call — when
    /// `title` is absent or blank.
    pub async fn publish_noise_report(
        &self,
        title: Option<&str>,
        rows: &[TriggerRow],
        include_pretty: bool,
    ) -> Result<()> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(PublishError::MissingTitle)?;
        let today = chrono::Utc::now().date_naive();

        let csv = format_csv(title, rows);
        self.write(&report_key(ReportStyle::Csv, today), csv).await?;

        if include_pretty {
            let table = format_table(rows);
            self.write(&report_key(ReportStyle::Pretty, today), table)
                .await?;
        }
        Ok(())
    }

    async fn write(&self, key: &str, body: String) -> Result<()> {
        if self.dry_run {
            println!("would write s3 key: {key}");
            println!("{body}");
            return Ok(());
        }
        tracing::info!(key, bytes = body.len(), "uploading report");
        self.store.put(key, body.into_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Puts = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    /// Records puts; panics on anything else.
    #[derive(Default)]
    struct RecordingStore {
        puts: Puts,
    }

    #[async_trait]
    impl ObjectStore for RecordingStore {
        async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
            self.puts.lock().unwrap().push((key.to_string(), body));
            Ok(())
        }

        async fn get(&self, _key: &str) -> Result<Vec<u8>> {
            unreachable!("get not expected")
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            unreachable!("delete not expected")
        }

        async fn list(&self) -> Result<Vec<String>> {
            unreachable!("list not expected")
        }
    }

    #[test]
    fn key_layout_is_date_partitioned_and_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            report_key(ReportStyle::Csv, date),
            "zabbix/csv/2024/03/07/noisiest.csv"
        );
        assert_eq!(
            report_key(ReportStyle::Pretty, date),
            "zabbix/pretty/2024/03/07/noisiest.csv"
        );
    }

    fn recording_publisher(dry_run: bool) -> (BucketPublisher, Puts) {
        let store = RecordingStore::default();
        let puts = Arc::clone(&store.puts);
        (BucketPublisher::new(Box::new(store), dry_run), puts)
    }

    #[tokio::test]
    async fn missing_title_fails_before_any_storage_call() {
        for bad_title in [None, Some(""), Some("   ")] {
            let (publisher, puts) = recording_publisher(false);
            let err = publisher
                .publish_noise_report(bad_title, &[], true)
                .await
                .unwrap_err();
            assert!(matches!(err, PublishError::MissingTitle));
            assert_eq!(puts.lock().unwrap().len(), 0);
        }
    }

    #[tokio::test]
    async fn publish_writes_csv_and_pretty_objects() {
        let (publisher, puts) = recording_publisher(false);
        let rows = vec![TriggerRow::new("h1", "d1", 3, 5)];

        publisher
            .publish_noise_report(Some("Weekly Noise"), &rows, true)
            .await
            .unwrap();

        let puts = puts.lock().unwrap();
        assert_eq!(puts.len(), 2);
        assert!(puts[0].0.starts_with("zabbix/csv/"));
        assert!(puts[1].0.starts_with("zabbix/pretty/"));
        let csv = String::from_utf8(puts[0].1.clone()).unwrap();
        assert_eq!(csv, "Weekly Noise\nh1, d1, 3, 5,\n");
    }

    #[tokio::test]
    async fn dry_run_makes_no_storage_calls() {
        let (publisher, puts) = recording_publisher(true);
        let rows = vec![TriggerRow::new("h1", "d1", 3, 5)];

        publisher
            .publish_noise_report(Some("Weekly Noise"), &rows, true)
            .await
            .unwrap();

        assert_eq!(puts.lock().unwrap().len(), 0);
    }
}
