//! Read-only views for UI collaborators.

use super::core::Engine;
use super::results::EngineError;
use crate::instrument::InstrumentQuote;
use crate::ledger::PositionLedger;
use crate::order_book::OrderBookSnapshot;
use crate::series::Sample;
use crate::types::InstrumentId;

impl Engine {
    pub fn spot_price(&self, id: &InstrumentId) -> Result<f64, EngineError> {
        Ok(self.instrument_ref(id)?.spot_price())
    }

    pub fn contract_price(&self, id: &InstrumentId) -> Result<f64, EngineError> {
        Ok(self.instrument_ref(id)?.contract_price())
    }

    /// Basis points, clamped at the configured cap.
    pub fn funding_rate(&self, id: &InstrumentId) -> Result<f64, EngineError> {
        Ok(self.instrument_ref(id)?.funding_rate())
    }

    pub fn ledger(&self, id: &InstrumentId) -> Result<PositionLedger, EngineError> {
        Ok(*self.instrument_ref(id)?.ledger())
    }

    /// Oldest first.
    pub fn series_snapshot(&self, id: &InstrumentId) -> Result<Vec<Sample>, EngineError> {
        Ok(self.instrument_ref(id)?.series_snapshot())
    }

    pub fn order_book_snapshot(&self, id: &InstrumentId) -> Result<OrderBookSnapshot, EngineError> {
        Ok(self.instrument_ref(id)?.order_book_snapshot())
    }

    pub fn quote(&self, id: &InstrumentId) -> Result<InstrumentQuote, EngineError> {
        Ok(self.instrument_ref(id)?.quote())
    }

    pub fn is_converging(&self, id: &InstrumentId) -> Result<bool, EngineError> {
        Ok(self.instrument_ref(id)?.is_converging())
    }
}
