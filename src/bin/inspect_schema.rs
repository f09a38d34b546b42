//! Utility to inspect the database schema and print table structures.

use leadflow_core::config::Config;
use leadflow_core::db::Database;
use leadflow_core::telemetry;

const TABLES: [&str; 5] = [
    "leads",
    "outreach_log",
    "clients",
    "follow_up_schedule",
    "system_metrics",
];

/// Opens the configured database, applies migrations and lists the columns
/// of every table the core owns.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing("leadflow_core=info");

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url, config.max_connections).await?;

    for table in TABLES {
        let columns: Vec<(String, String, i64)> = sqlx::query_as(
            r#"SELECT name, type, "notnull" FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&db.pool)
        .await?;

        println!("- {}", table);
        for (name, type_, not_null) in columns {
            let nullability = if not_null == 1 { "NOT NULL" } else { "NULL" };
            println!("  - {}: {} {}", name, type_, nullability);
        }
        println!();
    }

    Ok(())
}
