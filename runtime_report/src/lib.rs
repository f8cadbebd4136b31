//! Counts Lambda `CreateFunction` calls per runtime in a day of CloudTrail
//! logs and adds the counts to a DynamoDB report table.

pub mod config;
pub mod error;
pub mod extract;
pub mod listing;
pub mod persist;
pub mod prefix;
pub mod store;
pub mod tally;

use std::collections::BTreeMap;
use std::pin::pin;

use futures::{FutureExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

pub use crate::config::Config;
pub use crate::error::{ReportError, Result};
pub use crate::extract::ObjectOutcome;
pub use crate::persist::PersistReport;
pub use crate::store::{CounterStore, DynamoCounterStore, ListPage, LogStore, LoggingCounterStore, S3LogStore};
pub use crate::tally::{RuntimeKey, RuntimeTally};

/// A log object that could not be processed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectFailure {
    pub key: String,
    pub cause: String,
}

/// Everything gathered from the log objects before anything is persisted.
#[derive(Debug, Default)]
pub struct Scan {
    pub tally: RuntimeTally,
    pub objects_scanned: usize,
    pub failures: Vec<ObjectFailure>,
}

impl Scan {
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.key.as_str()).collect()
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub prefix: String,
    pub objects_scanned: usize,
    pub objects_failed: usize,
    pub failures: Vec<ObjectFailure>,
    pub observations: u64,
    /// Counts keyed by the value written to the report table.
    pub runtimes: BTreeMap<String, u64>,
    pub runtimes_persisted: usize,
    pub runtimes_failed: Vec<String>,
}

impl RunSummary {
    fn new(prefix: &str, scan: &Scan, report: &PersistReport) -> Self {
        let mut runtimes = BTreeMap::new();
        for (runtime, count) in scan.tally.iter() {
            *runtimes.entry(runtime.storage_key().into_owned()).or_insert(0) += count;
        }
        Self {
            prefix: prefix.to_string(),
            objects_scanned: scan.objects_scanned,
            objects_failed: scan.failures.len(),
            failures: scan.failures.to_vec(),
            observations: scan.tally.total(),
            runtimes,
            runtimes_persisted: report.updated.len(),
            runtimes_failed: report.failed.iter()
                .map(|(runtime, _)| runtime.storage_key().into_owned())
                .collect(),
        }
    }
}

/// Walks every object under `prefix` and tallies the runtimes found.
///
/// Up to `config.concurrency` objects are fetched and decoded at once, but the
/// tally is only touched from this loop. A failed object is counted and
/// skipped; a failed listing page aborts the scan.
pub async fn scan<S: LogStore>(config: &Config, prefix: &str, logs: &S) -> Result<Scan> {
    let deadline = config.operation_timeout;
    let outcomes = listing::enumerate_keys(logs, prefix, deadline)
        .map_ok(|key| extract::extract_object(logs, key, deadline).map(Ok::<_, ReportError>))
        .try_buffer_unordered(config.concurrency);
    let mut outcomes = pin!(outcomes);

    let mut scan = Scan::default();
    while let Some(outcome) = outcomes.try_next().await? {
        scan.objects_scanned += 1;
        match outcome {
            ObjectOutcome::Extracted { key, observations } => {
                debug!("{} yielded {} CreateFunction calls", key, observations.len());
                observations.into_iter().for_each(|runtime| scan.tally.record(runtime))
            }
            ObjectOutcome::Failed { key, error } => {
                scan.failures.push(ObjectFailure { key, cause: error.to_string() })
            }
        }
    }
    Ok(scan)
}

/// Scans `prefix` and merges the result into `counters`, all within the run deadline.
pub async fn run<S, C>(config: &Config, prefix: &str, logs: &S, counters: &C) -> Result<RunSummary>
where
    S: LogStore,
    C: CounterStore,
{
    error::with_deadline("report run", config.run_timeout, async {
        let scanned = scan(config, prefix, logs).await?;
        let report = persist::persist(counters, &scanned.tally, config.operation_timeout).await;
        let summary = RunSummary::new(prefix, &scanned, &report);
        match serde_json::to_string(&summary) {
            Ok(json) => info!("run summary: {}", json),
            Err(e) => error!("could not encode run summary: {}", e),
        }
        report.into_result()?;
        Ok(summary)
    })
    .await
}
