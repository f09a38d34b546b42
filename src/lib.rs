//! Lead lifecycle and outreach record-keeping core.
//!
//! This library tracks prospective business leads through qualification,
//! outreach and follow-up, and keeps an append-only series of operational
//! metrics. Delivery of messages and AI scoring are done by callers; this
//! crate records their outcomes.
//!
//! # Modules
//!
//! - `config`: Configuration management.
//! - `db`: Database connection, pool and migrations.
//! - `errors`: Error handling types.
//! - `models`: Records, enumerations and query results.
//! - `scoring`: Qualification thresholds and lead score policy.
//! - `leads`: Lead Store.
//! - `outreach`: Outreach Log.
//! - `follow_ups`: Follow-up Scheduler.
//! - `clients`: Client records and lead conversion.
//! - `metrics`: Metrics Aggregator.
//! - `telemetry`: Tracing subscriber setup.

pub mod clients;
pub mod config;
pub mod db;
pub mod errors;
pub mod follow_ups;
pub mod leads;
pub mod metrics;
pub mod models;
pub mod outreach;
pub mod scoring;
pub mod telemetry;

pub use clients::ClientStore;
pub use db::Database;
pub use errors::AppError;
pub use follow_ups::FollowUpScheduler;
pub use leads::LeadStore;
pub use metrics::MetricsAggregator;
pub use outreach::OutreachLog;
