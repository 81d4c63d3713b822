use drivewatch_tsdb::InfluxConfig;

/// Daemon configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; production
/// overrides via environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (default: `sqlite://drivewatch.db`).
    pub database_url: String,
    /// InfluxDB 2.x connection settings.
    pub influx: InfluxConfig,
    /// Minutes between diagnostic polls (default: `60`).
    pub smart_poll_interval_minutes: u64,
    /// Global temperature alert threshold in °C, used for drives without a
    /// per-drive override (default: `55`).
    pub default_temperature_threshold: f64,
    /// Substitute synthetic probes for real hardware (default: `false`).
    pub mock_hardware: bool,
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

impl Config {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                  |
    /// |-------------------------------|--------------------------|
    /// | `DATABASE_URL`                | `sqlite://drivewatch.db` |
    /// | `INFLUXDB_URL`                | `http://localhost:8086`  |
    /// | `INFLUXDB_TOKEN`              | *(empty)*                |
    /// | `INFLUXDB_ORG`                | `drivewatch`             |
    /// | `INFLUXDB_BUCKET`             | `drivewatch`             |
    /// | `SMART_POLL_INTERVAL_MINUTES` | `60`                     |
    /// | `TEMP_ALERT_THRESHOLD`        | `55`                     |
    /// | `MOCK_HARDWARE`               | `false`                  |
    pub fn from_env() -> Self {
        let smart_poll_interval_minutes: u64 = env_or("SMART_POLL_INTERVAL_MINUTES", "60")
            .parse()
            .expect("SMART_POLL_INTERVAL_MINUTES must be a valid u64");
        let default_temperature_threshold: f64 = env_or("TEMP_ALERT_THRESHOLD", "55")
            .parse()
            .expect("TEMP_ALERT_THRESHOLD must be a valid number");

        Self {
            database_url: env_or("DATABASE_URL", "sqlite://drivewatch.db"),
            influx: InfluxConfig {
                url: env_or("INFLUXDB_URL", "http://localhost:8086"),
                token: env_or("INFLUXDB_TOKEN", ""),
                org: env_or("INFLUXDB_ORG", "drivewatch"),
                bucket: env_or("INFLUXDB_BUCKET", "drivewatch"),
            },
            smart_poll_interval_minutes,
            default_temperature_threshold,
            mock_hardware: env_or("MOCK_HARDWARE", "false") == "true",
        }
    }
}
