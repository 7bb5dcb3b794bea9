//! Engine configuration options.

use crate::config::MarketConfig;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log every event at info level instead of debug.
    pub verbose: bool,
    /// Seed for every instrument's random draws. `None` draws from entropy.
    pub seed: Option<u64>,
    /// Parameters applied to each listed instrument.
    pub market: MarketConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
            seed: None,
            market: MarketConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Deterministic engine: fixed seed, jitter-free series.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            market: MarketConfig::test(),
            ..Self::default()
        }
    }
}
