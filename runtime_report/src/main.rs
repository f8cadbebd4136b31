use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Region;
use runtime_report::{prefix, run, Config, DynamoCounterStore, LoggingCounterStore, ReportError, S3LogStore};
use tracing::info;

const TRACING_DEBUG: &str = "TRACING_DEBUG";

#[tokio::main]
async fn main() -> Result<(), ReportError> {
    tracing_subscriber::fmt()
        .with_max_level(match std::env::var(TRACING_DEBUG) {
            Ok(_) => tracing::Level::DEBUG,
            Err(_) => tracing::Level::INFO
        })
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let config = Config::from_env()?;
    let prefix = prefix::select_prefix(&config)?;

    let region_provider = RegionProviderChain::first_try(Region::new(config.region.to_owned())).or_else("us-east-1");
    let sdk_config = aws_config::from_env().region(region_provider).load().await;
    let logs = S3LogStore::from_sdk_config(&sdk_config, &config);

    let summary = if config.dry_run {
        run(&config, &prefix, &logs, &LoggingCounterStore).await?
    } else {
        let counters = DynamoCounterStore::from_sdk_config(&sdk_config, &config);
        run(&config, &prefix, &logs, &counters).await?
    };
    info!(
        "counted {} CreateFunction calls across {} objects ({} failed)",
        summary.observations, summary.objects_scanned, summary.objects_failed
    );
    Ok(())
}
