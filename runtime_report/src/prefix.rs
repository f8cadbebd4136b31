use chrono::{Datelike, Days, NaiveDate, Utc};
use tracing::info;

use crate::config::Config;
use crate::error::{ReportError, Result};

/// Picks the day to scan: `today - offset`, or the fallback date when no offset was given.
pub fn scan_date(day_offset: Option<u32>, fallback: NaiveDate, today: NaiveDate) -> Result<NaiveDate> {
    match day_offset {
        Some(offset) => today.checked_sub_days(Days::new(u64::from(offset))).ok_or_else(|| {
            ReportError::Config(format!("day offset {} reaches before the calendar start", offset))
        }),
        None => Ok(fallback),
    }
}

pub fn key_prefix(account_id: &str, region: &str, date: NaiveDate) -> String {
    format!(
        "logs/AWSLogs/{}/CloudTrail/{}/{}/{:02}/{:02}",
        account_id,
        region,
        date.year(),
        date.month(),
        date.day()
    )
}

/// Resolves the object-store prefix for this run against the current UTC date.
pub fn select_prefix(config: &Config) -> Result<String> {
    let date = scan_date(config.day_offset, config.fallback_date, Utc::now().date_naive())?;
    let prefix = key_prefix(&config.account_id, &config.region, date);
    info!("S3 key prefix: {}", prefix);
    Ok(prefix)
}
