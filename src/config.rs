#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    /// Monthly revenue goal the snapshot reports progress against.
    pub revenue_target: f64,
    /// Look-back window, in days, for snapshot counts.
    pub metrics_window_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            database_url: lookup("DATABASE_URL")
                .or_else(|| lookup("DB_URL"))
                .ok_or_else(|| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("sqlite:") {
                        anyhow::bail!("DATABASE_URL must start with sqlite:");
                    }
                    Ok(url)
                })?,
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .ok()
                .filter(|n: &u32| *n >= 1)
                .ok_or_else(|| {
                    anyhow::anyhow!("DB_MAX_CONNECTIONS must be a whole number >= 1")
                })?,
            revenue_target: lookup("REVENUE_TARGET")
                .unwrap_or_else(|| "1000000".to_string())
                .parse()
                .ok()
                .filter(|t: &f64| t.is_finite() && *t > 0.0)
                .ok_or_else(|| anyhow::anyhow!("REVENUE_TARGET must be a positive number"))?,
            metrics_window_days: lookup("METRICS_WINDOW_DAYS")
                .unwrap_or_else(|| "1".to_string())
                .parse()
                .ok()
                .filter(|d: &i64| *d >= 1)
                .ok_or_else(|| {
                    anyhow::anyhow!("METRICS_WINDOW_DAYS must be a whole number >= 1")
                })?,
        };

        tracing::debug!(
            "Database URL: {}...",
            config.database_url.chars().take(20).collect::<String>()
        );
        tracing::debug!(
            max_connections = config.max_connections,
            revenue_target = config.revenue_target,
            metrics_window_days = config.metrics_window_days,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn metrics_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.metrics_window_days)
    }
}
