use std::time::Duration;

use miner::types::AccrualPeriod;

const DEFAULT_ADDR: &str = "0.0.0.0:6957";
const DEFAULT_TICK_MILLIS: u64 = 1000;

/// Server settings read from `MINEPOINT_*` environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: String,
    pub accrual_period: AccrualPeriod,
    /// Wall-clock length of one countdown second
    pub tick_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            accrual_period: AccrualPeriod::default(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MILLIS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Invalid values fall back to defaults with a warning
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(addr) = lookup("MINEPOINT_ADDR") {
            config.addr = addr;
        }

        if let Some(period) = lookup("MINEPOINT_ACCRUAL_PERIOD") {
            match period.trim().to_ascii_lowercase().as_str() {
                "minute" => config.accrual_period = AccrualPeriod::Minute,
                "cycle" => config.accrual_period = AccrualPeriod::Cycle,
                other => tracing::warn!(
                    "Unknown MINEPOINT_ACCRUAL_PERIOD '{}', using {:?}",
                    other,
                    config.accrual_period
                ),
            }
        }

        if let Some(millis) = lookup("MINEPOINT_TICK_MILLIS") {
            match millis.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => config.tick_interval = Duration::from_millis(millis),
                _ => tracing::warn!(
                    "Invalid MINEPOINT_TICK_MILLIS '{}', using {}ms",
                    millis,
                    DEFAULT_TICK_MILLIS
                ),
            }
        }

        config
    }
}
