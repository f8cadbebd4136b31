use std::time::Duration;

use tracing::{error, info};

use crate::error::{with_deadline, ReportError, Result};
use crate::store::CounterStore;
use crate::tally::{RuntimeKey, RuntimeTally};

/// What happened when a tally was merged into the report table.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub updated: Vec<(RuntimeKey, u64)>,
    pub failed: Vec<(RuntimeKey, ReportError)>,
}

impl PersistReport {
    pub fn attempted(&self) -> usize {
        self.updated.len() + self.failed.len()
    }

    /// Ok when every counter was updated.
    pub fn into_result(self) -> Result<()> {
        if self.failed.is_empty() {
            Ok(())
        } else {
            Err(ReportError::PersistIncomplete {
                failed: self.failed.len(),
                attempted: self.attempted(),
            })
        }
    }
}

/// Adds every count in `tally` to the stored `Creates` counters.
///
/// Each runtime is its own update: a failure is logged and collected, and the
/// remaining runtimes are still attempted. An empty tally issues no calls.
pub async fn persist<C: CounterStore>(store: &C, tally: &RuntimeTally, deadline: Duration) -> PersistReport {
    let mut report = PersistReport::default();
    if tally.is_empty() {
        info!("no CreateFunction calls found");
        return report;
    }

    for (runtime, count) in tally.iter() {
        let storage_key = runtime.storage_key();
        let update = store.add_creates(&storage_key, count);
        match with_deadline("update item", deadline, update).await {
            Ok(()) => {
                info!("added {} creates for {}", count, runtime);
                report.updated.push((runtime.clone(), count));
            }
            Err(e) => {
                error!("failed to add {} creates for {}: {}", count, runtime, e);
                report.failed.push((runtime.clone(), e));
            }
        }
    }
    report
}
