// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::feed::FeedError;
use crate::instrument::FiredTimer;
use crate::ledger::TradeError;
use crate::spot::PriceInputError;
use crate::types::{InstrumentId, Timestamp};

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Instrument {0} not found")]
    InstrumentNotFound(InstrumentId),

    #[error("Instrument {0} is already listed")]
    InstrumentExists(InstrumentId),

    #[error("Invalid trade: {0}")]
    InvalidTrade(#[from] TradeError),

    #[error("Invalid price input: {0}")]
    InvalidPrice(#[from] PriceInputError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Clock at {now} is before {earliest}, too early for a full series grid")]
    ClockBeforeSeriesGrid { now: Timestamp, earliest: Timestamp },

    #[error("Instrument {0} actor has stopped")]
    ActorStopped(InstrumentId),
}

/// What one `advance_time` call fired, per instrument.
#[derive(Debug, Clone, Default)]
pub struct TimerReport {
    pub fired: Vec<(InstrumentId, FiredTimer)>,
}

impl TimerReport {
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn for_instrument<'a>(&'a self, instrument: &'a InstrumentId) -> impl Iterator<Item = &'a FiredTimer> + 'a {
        self.fired
            .iter()
            .filter(move |(id, _)| id == instrument)
            .map(|(_, timer)| timer)
    }
}
