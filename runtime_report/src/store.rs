use aws_sdk_dynamodb as ddb;
use aws_sdk_dynamodb::model::AttributeValue;
use aws_sdk_s3 as s3;
use tracing::info;

use crate::config::Config;
use crate::error::{ReportError, Result};

pub const RUNTIME_ATTRIBUTE: &str = "Runtime";
pub const CREATES_ATTRIBUTE: &str = "Creates";

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Where the next page starts; `None` when the listing is complete.
    pub next_marker: Option<String>,
}

/// Read access to the archived audit logs.
#[allow(async_fn_in_trait)]
pub trait LogStore {
    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage>;

    async fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// The cumulative report table. `add_creates` must be an atomic server-side add.
#[allow(async_fn_in_trait)]
pub trait CounterStore {
    async fn add_creates(&self, runtime: &str, delta: u64) -> Result<()>;
}

pub struct S3LogStore {
    client: s3::Client,
    bucket: String,
}

impl S3LogStore {
    pub fn new(client: s3::Client, bucket: impl Into<String>) -> Self {
        Self { client, bucket: bucket.into() }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, config: &Config) -> Self {
        let s3_config = match &config.s3_endpoint {
            Some(endpoint) => s3::config::Builder::from(sdk_config).endpoint_url(endpoint).build(),
            None => s3::config::Builder::from(sdk_config).build()
        };
        Self::new(s3::Client::from_conf(s3_config), config.bucket.to_owned())
    }
}

impl LogStore for S3LogStore {
    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage> {
        let response = self.client.list_objects()
            .bucket(self.bucket.to_owned())
            .prefix(prefix)
            .set_marker(marker.map(str::to_owned))
            .send()
            .await
            .map_err(|e| ReportError::Listing { prefix: prefix.to_string(), reason: format!("{:?}", e) })?;

        let keys: Vec<String> = response.contents()
            .unwrap_or_default()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();
        // ListObjects only fills NextMarker when a delimiter is sent; otherwise the
        // last key of a truncated page is the marker.
        let next_marker = match response.next_marker().filter(|m| !m.is_empty()) {
            Some(marker) => Some(marker.to_owned()),
            None if response.is_truncated() => keys.last().cloned(),
            None => None
        };
        Ok(ListPage { keys, next_marker })
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let fetch_error = |reason: String| ReportError::Fetch { key: key.to_string(), reason };
        let object = self.client.get_object()
            .bucket(self.bucket.to_owned())
            .key(key)
            .send()
            .await
            .map_err(|e| fetch_error(format!("{:?}", e)))?;
        let body = object.body.collect()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }
}

pub struct DynamoCounterStore {
    client: ddb::Client,
    table: String,
}

impl DynamoCounterStore {
    pub fn new(client: ddb::Client, table: impl Into<String>) -> Self {
        Self { client, table: table.into() }
    }

    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, config: &Config) -> Self {
        let ddb_config = match &config.dynamodb_endpoint {
            Some(endpoint) => ddb::config::Builder::from(sdk_config).endpoint_url(endpoint).build(),
            None => ddb::config::Builder::from(sdk_config).build()
        };
        Self::new(ddb::Client::from_conf(ddb_config), config.table.to_owned())
    }
}

impl CounterStore for DynamoCounterStore {
    async fn add_creates(&self, runtime: &str, delta: u64) -> Result<()> {
        self.client.update_item()
            .table_name(self.table.to_owned())
            .key(RUNTIME_ATTRIBUTE, AttributeValue::S(runtime.to_owned()))
            .update_expression("ADD #a :increment")
            .expression_attribute_names("#a", CREATES_ATTRIBUTE)
            .expression_attribute_values(":increment", AttributeValue::N(delta.to_string()))
            .send()
            .await
            .map_err(|e| ReportError::Persist { runtime: runtime.to_string(), reason: format!("{:?}", e) })?;
        Ok(())
    }
}

/// Dry-run sink: reports the update it would have made and changes nothing.
#[derive(Debug, Default)]
pub struct LoggingCounterStore;

impl CounterStore for LoggingCounterStore {
    async fn add_creates(&self, runtime: &str, delta: u64) -> Result<()> {
        info!("dry run: would add {} to {} for {}", delta, CREATES_ATTRIBUTE, runtime);
        Ok(())
    }
}
