//! Position ledger and trade requests.
//!
//! The ledger holds the running long and short interest for one keyword.
//! It only grows: there is no close or reduce path, every accepted trade adds
//! to one side.

use crate::types::Side;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeError {
    #[error("Trade size {0} is negative")]
    NegativeSize(f64),

    #[error("Trade size must be greater than zero")]
    ZeroSize,

    #[error("Trade size {0} is not finite")]
    NonFiniteSize(f64),
}

/// A validated trade. Size is an absolute amount; direction lives in `side`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    size: f64,
    side: Side,
}

impl TradeRequest {
    pub fn new(size: f64, side: Side) -> Result<Self, TradeError> {
        validate_size(size)?;
        Ok(Self { size, side })
    }

    pub fn long(size: f64) -> Result<Self, TradeError> {
        Self::new(size, Side::Long)
    }

    pub fn short(size: f64) -> Result<Self, TradeError> {
        Self::new(size, Side::Short)
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

fn validate_size(size: f64) -> Result<(), TradeError> {
    if !size.is_finite() {
        return Err(TradeError::NonFiniteSize(size));
    }
    if size < 0.0 {
        return Err(TradeError::NegativeSize(size));
    }
    if size == 0.0 {
        return Err(TradeError::ZeroSize);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionLedger {
    total_long: f64,
    total_short: f64,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opening balances, e.g. the 1000 long / 800 short the demo market starts with.
    pub fn with_totals(total_long: f64, total_short: f64) -> Result<Self, TradeError> {
        for total in [total_long, total_short] {
            if !total.is_finite() {
                return Err(TradeError::NonFiniteSize(total));
            }
            if total < 0.0 {
                return Err(TradeError::NegativeSize(total));
            }
        }
        Ok(Self {
            total_long,
            total_short,
        })
    }

    pub fn total_long(&self) -> f64 {
        self.total_long
    }

    pub fn total_short(&self) -> f64 {
        self.total_short
    }

    pub fn apply(&mut self, trade: &TradeRequest) {
        self.record(trade.side, trade.size);
    }

    pub(crate) fn record(&mut self, side: Side, size: f64) {
        debug_assert!(size >= 0.0 && size.is_finite());
        match side {
            Side::Long => self.total_long += size,
            Side::Short => self.total_short += size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_validation() {
        assert!(TradeRequest::long(5.0).is_ok());
        assert_eq!(TradeRequest::short(-1.0), Err(TradeError::NegativeSize(-1.0)));
        assert_eq!(TradeRequest::long(0.0), Err(TradeError::ZeroSize));
        assert!(matches!(TradeRequest::long(f64::NAN), Err(TradeError::NonFiniteSize(_))));
        assert!(matches!(TradeRequest::long(f64::INFINITY), Err(TradeError::NonFiniteSize(_))));
    }

    #[test]
    fn ledger_accumulates_per_side() {
        let mut ledger = PositionLedger::new();
        ledger.apply(&TradeRequest::long(10.0).unwrap());
        ledger.apply(&TradeRequest::long(5.0).unwrap());
        ledger.apply(&TradeRequest::short(3.0).unwrap());

        assert_eq!(ledger.total_long(), 15.0);
        assert_eq!(ledger.total_short(), 3.0);
    }

    #[test]
    fn opening_totals_validated() {
        let ledger = PositionLedger::with_totals(1000.0, 800.0).unwrap();
        assert_eq!(ledger.total_long(), 1000.0);
        assert!(PositionLedger::with_totals(-1.0, 0.0).is_err());
        assert!(PositionLedger::with_totals(0.0, f64::NAN).is_err());
    }
}
