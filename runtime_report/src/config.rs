use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{ReportError, Result};

pub const JOB_ARRAY_INDEX: &str = "JOB_ARRAY_INDEX";
pub const AWS_BATCH_JOB_ARRAY_INDEX: &str = "AWS_BATCH_JOB_ARRAY_INDEX";
pub const LOG_BUCKET: &str = "LOG_BUCKET";
pub const REPORT_TABLE: &str = "REPORT_TABLE";
pub const TRAIL_ACCOUNT_ID: &str = "TRAIL_ACCOUNT_ID";
pub const TRAIL_REGION: &str = "TRAIL_REGION";
pub const FALLBACK_DATE: &str = "FALLBACK_DATE";
pub const S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const DYNAMODB_ENDPOINT: &str = "DYNAMODB_ENDPOINT";
pub const SCAN_CONCURRENCY: &str = "SCAN_CONCURRENCY";
pub const OPERATION_TIMEOUT_SECS: &str = "OPERATION_TIMEOUT_SECS";
pub const RUN_TIMEOUT_SECS: &str = "RUN_TIMEOUT_SECS";
pub const DRY_RUN: &str = "DRY_RUN";

const DEFAULT_BUCKET: &str = "normj-east-1-trail";
const DEFAULT_TABLE: &str = "CloudTrailRuntimeReport";
const DEFAULT_ACCOUNT_ID: &str = "626492997873";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_FALLBACK_DATE: &str = "2018-05-29";
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Settings for one report run, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Days back from today to scan. `None` scans `fallback_date`.
    pub day_offset: Option<u32>,
    pub fallback_date: NaiveDate,
    pub bucket: String,
    pub table: String,
    pub account_id: String,
    pub region: String,
    pub s3_endpoint: Option<String>,
    pub dynamodb_endpoint: Option<String>,
    pub concurrency: usize,
    pub operation_timeout: Duration,
    pub run_timeout: Duration,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Empty values
    /// are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let offset_var = [JOB_ARRAY_INDEX, AWS_BATCH_JOB_ARRAY_INDEX]
            .into_iter()
            .find_map(|name| get(name).map(|raw| (name, raw)));
        let day_offset = match offset_var {
            Some((name, raw)) => Some(parse_number::<u32>(name, &raw)?),
            None => None,
        };
        let fallback_raw = get(FALLBACK_DATE).unwrap_or_else(|| DEFAULT_FALLBACK_DATE.to_string());
        let fallback_date = NaiveDate::parse_from_str(fallback_raw.trim(), "%Y-%m-%d").map_err(|e| {
            ReportError::Config(format!("{} must be YYYY-MM-DD, got '{}': {}", FALLBACK_DATE, fallback_raw, e))
        })?;
        let concurrency = match get(SCAN_CONCURRENCY) {
            Some(raw) => positive(SCAN_CONCURRENCY, parse_number::<usize>(SCAN_CONCURRENCY, &raw)?)?,
            None => 1,
        };
        let operation_timeout = match get(OPERATION_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(positive(
                OPERATION_TIMEOUT_SECS,
                parse_number::<u64>(OPERATION_TIMEOUT_SECS, &raw)?,
            )?),
            None => DEFAULT_OPERATION_TIMEOUT,
        };
        let run_timeout = match get(RUN_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(positive(
                RUN_TIMEOUT_SECS,
                parse_number::<u64>(RUN_TIMEOUT_SECS, &raw)?,
            )?),
            None => DEFAULT_RUN_TIMEOUT,
        };

        Ok(Config {
            day_offset,
            fallback_date,
            bucket: get(LOG_BUCKET).unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            table: get(REPORT_TABLE).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            account_id: get(TRAIL_ACCOUNT_ID).unwrap_or_else(|| DEFAULT_ACCOUNT_ID.to_string()),
            region: get(TRAIL_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_endpoint: get(S3_ENDPOINT),
            dynamodb_endpoint: get(DYNAMODB_ENDPOINT),
            concurrency,
            operation_timeout,
            run_timeout,
            dry_run: get(DRY_RUN).is_some(),
        })
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    T::from_str(raw.trim()).map_err(|e| {
        ReportError::Config(format!("{} must be a non-negative integer, got '{}': {}", name, raw, e))
    })
}

fn positive<T: PartialEq + Default>(name: &str, value: T) -> Result<T> {
    if value == T::default() {
        Err(ReportError::Config(format!("{} must be greater than zero", name)))
    } else {
        Ok(value)
    }
}
