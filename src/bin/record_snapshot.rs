//! Appends one business snapshot (lead, outreach and revenue figures) to the
//! metrics series. Meant to be run from a scheduler such as cron.

use leadflow_core::config::Config;
use leadflow_core::db::Database;
use leadflow_core::metrics::MetricsAggregator;
use leadflow_core::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("leadflow_core=info,record_snapshot=info");

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url, config.max_connections).await?;
    tracing::info!("Database connection pool established");

    let metrics = MetricsAggregator::new(db.pool.clone());
    let snapshot = metrics
        .snapshot(config.metrics_window(), config.revenue_target)
        .await?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
