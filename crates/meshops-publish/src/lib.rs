//! Report publishers: object storage and Slack.

pub mod bucket;
pub mod error;
pub mod slack;

pub use bucket::{BucketConfig, BucketPublisher, ObjectStore, ReportStyle, S3Store, report_key};
pub use error::PublishError;
pub use slack::{parse_permalink, SlackPublisher};
