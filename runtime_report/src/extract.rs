use std::io::Read;
use std::time::Duration;

use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::error::{ReportError, Result};
use crate::store::LogStore;
use crate::tally::RuntimeKey;

pub const LAMBDA_EVENT_SOURCE: &str = "lambda.amazonaws.com";
/// Prefix match on purpose: it also covers versioned names like `CreateFunction20150331`.
pub const CREATE_FUNCTION_PREFIX: &str = "CreateFunction";

#[derive(Debug, Deserialize)]
struct LogArchive {
    #[serde(rename = "Records")]
    records: Vec<LogRecord>,
}

/// The slice of a CloudTrail record this job looks at. Fields are kept loose so
/// an odd record only fails to match instead of failing the whole archive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    #[serde(default)]
    pub event_source: Option<Value>,
    #[serde(default)]
    pub event_name: Option<Value>,
    #[serde(default)]
    pub request_parameters: Option<Value>,
}

impl LogRecord {
    pub fn is_create_function(&self) -> bool {
        let source_matches = self.event_source.as_ref().and_then(Value::as_str) == Some(LAMBDA_EVENT_SOURCE);
        let name_matches = self.event_name.as_ref()
            .and_then(Value::as_str)
            .map_or(false, |name| name.starts_with(CREATE_FUNCTION_PREFIX));
        source_matches && name_matches
    }

    pub fn runtime(&self) -> RuntimeKey {
        match self.request_parameters.as_ref().and_then(|p| p.get("runtime")) {
            None | Some(Value::Null) => RuntimeKey::Unspecified,
            Some(Value::String(name)) => RuntimeKey::Named(name.to_owned()),
            Some(other) => RuntimeKey::Named(other.to_string()),
        }
    }
}

/// Result of processing a single log object.
#[derive(Debug)]
pub enum ObjectOutcome {
    Extracted { key: String, observations: Vec<RuntimeKey> },
    Failed { key: String, error: ReportError },
}

/// Decompresses one archive and returns the runtime of every matching record.
pub fn decode_archive(key: &str, compressed: &[u8]) -> Result<Vec<RuntimeKey>> {
    let mut json = String::new();
    MultiGzDecoder::new(compressed)
        .read_to_string(&mut json)
        .map_err(|source| ReportError::Decompress { key: key.to_string(), source })?;
    let archive: LogArchive = serde_json::from_str(&json)
        .map_err(|source| ReportError::Parse { key: key.to_string(), source })?;

    let mut observations = Vec::new();
    for record in archive.records.iter().filter(|r| r.is_create_function()) {
        let runtime = record.runtime();
        info!("found CreateFunction call with {}", runtime);
        observations.push(runtime);
    }
    Ok(observations)
}

/// Fetches and decodes `key`. Failures stay local to this object and are logged here.
pub async fn extract_object<S: LogStore>(store: &S, key: String, deadline: Duration) -> ObjectOutcome {
    info!("processing {}", key);
    let fetched = match tokio::time::timeout(deadline, store.fetch(&key)).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::Fetch {
            key: key.to_owned(),
            reason: format!("no response within {:?}", deadline),
        }),
    };
    match fetched.and_then(|bytes| decode_archive(&key, &bytes)) {
        Ok(observations) => ObjectOutcome::Extracted { key, observations },
        Err(e) => {
            error!("error processing object {}: {}", key, e);
            ObjectOutcome::Failed { key, error: e }
        }
    }
}
