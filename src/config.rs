// 7.0 config.rs: every tunable in one place. weights, impact curve, funding scale,
// convergence cadence, series/book timers, feed cache.
// 7.1 presets per environment, 7.2 validation.

use serde::{Deserialize, Serialize};

use crate::convergence::ConvergenceParams;
use crate::feed::FeedParams;
use crate::funding::FundingParams;
use crate::impact::ImpactParams;
use crate::order_book::OrderBookParams;
use crate::series::SeriesParams;
use crate::spot::SpotWeights;

// Complete parameter set for one keyword market
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    pub spot_weights: SpotWeights,
    pub impact: ImpactParams,
    pub funding: FundingParams,
    pub convergence: ConvergenceParams,
    pub series: SeriesParams,
    pub order_book: OrderBookParams,
    pub feed: FeedParams,
}

impl MarketConfig {
    // 7.1: slower book redraw (every 5s) for demos
    pub fn demo() -> Self {
        let mut config = Self::default();
        config.order_book.regen_interval_ms = 5_000;
        config
    }

    // deterministic prices for tests: no jitter anywhere in the series
    pub fn test() -> Self {
        let mut config = Self::default();
        config.series.spot_jitter = 0.0;
        config.series.contract_jitter = 0.0;
        config.series.seed_jitter = 0.0;
        config
    }

    // 7.2: internal consistency checks
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spot_weights.total() != 100 {
            return Err(ConfigError::InvalidWeights {
                reason: format!("weights sum to {}, expected 100", self.spot_weights.total()),
            });
        }

        if self.impact.linear_coefficient < 0.0 || self.impact.sqrt_coefficient < 0.0 {
            return Err(ConfigError::InvalidImpact {
                reason: "Impact coefficients must be non-negative".to_string(),
            });
        }
        if self.impact.max_impact == 0 {
            return Err(ConfigError::InvalidImpact {
                reason: "Impact cap must be positive".to_string(),
            });
        }

        if self.funding.basis_points <= 0.0 || self.funding.max_rate_bps <= 0.0 {
            return Err(ConfigError::InvalidFunding {
                reason: "Funding scale and cap must be positive".to_string(),
            });
        }

        let conv = &self.convergence;
        if conv.total_steps == 0 || conv.step_interval_ms <= 0 {
            return Err(ConfigError::InvalidConvergence {
                reason: "Need at least one step and a positive step interval".to_string(),
            });
        }
        if conv.debounce_ms < 0 || conv.epsilon < 0.0 {
            return Err(ConfigError::InvalidConvergence {
                reason: "Debounce and epsilon must be non-negative".to_string(),
            });
        }

        let series = &self.series;
        if series.capacity < 2 {
            return Err(ConfigError::InvalidSeries {
                reason: "Series needs at least two samples".to_string(),
            });
        }
        if series.tick_interval_ms <= 0 || series.grid_spacing_ms <= 0 {
            return Err(ConfigError::InvalidSeries {
                reason: "Tick interval and grid spacing must be positive".to_string(),
            });
        }
        for jitter in [series.spot_jitter, series.contract_jitter, series.seed_jitter] {
            if !(0.0..1.0).contains(&jitter) {
                return Err(ConfigError::InvalidSeries {
                    reason: format!("Jitter {jitter} outside [0, 1)"),
                });
            }
        }

        let book = &self.order_book;
        if book.min_levels == 0 || book.min_levels > book.max_levels {
            return Err(ConfigError::InvalidOrderBook {
                reason: "Level range must be non-empty and start at 1 or more".to_string(),
            });
        }
        if book.offset_min < 0.0 || book.offset_min >= book.offset_max {
            return Err(ConfigError::InvalidOrderBook {
                reason: "Offset range must be non-negative and increasing".to_string(),
            });
        }
        if book.size_min >= book.size_max || book.fill_min >= book.fill_max {
            return Err(ConfigError::InvalidOrderBook {
                reason: "Size and fill ranges must be increasing".to_string(),
            });
        }
        if book.regen_interval_ms <= 0
            || book.fill_delay_min_ms <= 0
            || book.fill_delay_min_ms >= book.fill_delay_max_ms
        {
            return Err(ConfigError::InvalidOrderBook {
                reason: "Book timers must be positive with min delay below max".to_string(),
            });
        }

        if self.feed.cache_ttl_ms <= 0 || self.feed.monthly_ratio < 0.0 || self.feed.history_len == 0 {
            return Err(ConfigError::InvalidFeed {
                reason: "Feed TTL and history must be positive".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid spot weights: {reason}")]
    InvalidWeights { reason: String },
    #[error("Invalid impact curve: {reason}")]
    InvalidImpact { reason: String },
    #[error("Invalid funding params: {reason}")]
    InvalidFunding { reason: String },
    #[error("Invalid convergence params: {reason}")]
    InvalidConvergence { reason: String },
    #[error("Invalid series params: {reason}")]
    InvalidSeries { reason: String },
    #[error("Invalid order book params: {reason}")]
    InvalidOrderBook { reason: String },
    #[error("Invalid feed params: {reason}")]
    InvalidFeed { reason: String },
    #[error("Unknown environment {0:?}")]
    UnknownEnvironment(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Demo,
    Test,
}

impl Environment {
    pub fn config(&self) -> MarketConfig {
        match self {
            Environment::Development => MarketConfig::default(),
            Environment::Demo => MarketConfig::demo(),
            Environment::Test => MarketConfig::test(),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "demo" => Ok(Environment::Demo),
            "test" => Ok(Environment::Test),
            other => Err(ConfigError::UnknownEnvironment(other.to_string())),
        }
    }
}
