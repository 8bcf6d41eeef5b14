use clap::Parser;

use crate::db::model::UrgencyLevel;

#[derive(Parser, Clone, Debug)]
pub struct Config {
    #[command(flatten)]
    pub requests: RequestConfig,
    #[command(flatten)]
    pub matching: MatchingConfig,
    #[command(flatten)]
    pub sweeper: SweeperConfig,
}

/// Per-urgency request lifetimes. A critical burst pipe shouldn't sit on
/// the board for three days.
#[derive(Parser, Clone, Debug)]
pub struct RequestConfig {
    #[arg(long, env = "MARKET_REQUEST_TTL_LOW", default_value = "72h", value_parser = parse_chrono_duration)]
    pub ttl_low: chrono::Duration,
    #[arg(long, env = "MARKET_REQUEST_TTL_MEDIUM", default_value = "24h", value_parser = parse_chrono_duration)]
    pub ttl_medium: chrono::Duration,
    #[arg(long, env = "MARKET_REQUEST_TTL_HIGH", default_value = "6h", value_parser = parse_chrono_duration)]
    pub ttl_high: chrono::Duration,
    #[arg(long, env = "MARKET_REQUEST_TTL_CRITICAL", default_value = "2h", value_parser = parse_chrono_duration)]
    pub ttl_critical: chrono::Duration,
}

#[derive(Parser, Clone, Debug)]
pub struct MatchingConfig {
    /// Fan-out radius around the request location.
    #[arg(long, env = "MARKET_MATCH_RADIUS_KM", default_value = "10.0")]
    pub default_radius_km: f64,
}

#[derive(Parser, Clone, Debug)]
pub struct SweeperConfig {
    #[arg(long, env = "MARKET_SWEEP_INTERVAL", default_value = "60s", value_parser = humantime::parse_duration)]
    pub sweep_interval: std::time::Duration,
    /// Read notifications older than this are dropped on each sweep.
    #[arg(long, env = "MARKET_NOTIFICATION_STORE_DAYS", default_value = "30")]
    pub notification_store_days: u32,
}

impl RequestConfig {
    pub fn ttl_for(&self, urgency: UrgencyLevel) -> chrono::Duration {
        match urgency {
            UrgencyLevel::Low => self.ttl_low,
            UrgencyLevel::Medium => self.ttl_medium,
            UrgencyLevel::High => self.ttl_high,
            UrgencyLevel::Critical => self.ttl_critical,
        }
    }
}

impl Config {
    /// Empty command line, so values come from env variables or defaults.
    pub fn from_env() -> Result<Config, clap::Error> {
        Config::try_parse_from(std::iter::empty::<&str>())
    }
}

fn parse_chrono_duration(s: &str) -> anyhow::Result<chrono::Duration> {
    Ok(chrono::Duration::from_std(humantime::parse_duration(s)?)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn default_config_parses() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.requests.ttl_low, chrono::Duration::hours(72));
        assert_eq!(config.requests.ttl_critical, chrono::Duration::hours(2));
        assert_eq!(config.matching.default_radius_km, 10.0);
        assert_eq!(config.sweeper.sweep_interval, std::time::Duration::from_secs(60));
        assert_eq!(config.sweeper.notification_store_days, 30);
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_defaults() {
        std::env::set_var("MARKET_MATCH_RADIUS_KM", "25.5");
        std::env::set_var("MARKET_REQUEST_TTL_CRITICAL", "30m");
        let config = Config::from_env().unwrap();
        std::env::remove_var("MARKET_MATCH_RADIUS_KM");
        std::env::remove_var("MARKET_REQUEST_TTL_CRITICAL");

        assert_eq!(config.matching.default_radius_km, 25.5);
        assert_eq!(config.requests.ttl_critical, chrono::Duration::minutes(30));
    }

    #[test]
    #[serial_test::serial]
    fn ttl_scales_with_urgency() {
        let config = Config::from_env().unwrap();
        assert!(
            config.requests.ttl_for(UrgencyLevel::Critical)
                < config.requests.ttl_for(UrgencyLevel::Low)
        );
    }
}
