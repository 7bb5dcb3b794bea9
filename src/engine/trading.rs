//! Trade and convergence operations.

use super::core::Engine;
use super::results::EngineError;
use crate::convergence::ConvergenceTrigger;
use crate::events::{ConvergenceRequestedEvent, EventPayload, TradeAppliedEvent, TradeRejectedEvent};
use crate::instrument::TradeAccepted;
use crate::ledger::TradeRequest;
use crate::types::{InstrumentId, Side};
use tracing::warn;

impl Engine {
    /// Record a trade against the keyword's ledger and ask for convergence.
    ///
    /// Invalid sizes are rejected before anything changes; the rejection is
    /// still logged as an event for audit.
    pub fn on_trade(&mut self, id: &InstrumentId, size: f64, side: Side) -> Result<TradeAccepted, EngineError> {
        self.instrument_ref(id)?;

        let trade = match TradeRequest::new(size, side) {
            Ok(trade) => trade,
            Err(err) => {
                warn!(instrument = %id, size, %side, error = %err, "trade rejected");
                self.emit_event(
                    id.clone(),
                    EventPayload::TradeRejected(TradeRejectedEvent {
                        reason: err.to_string(),
                    }),
                );
                return Err(err.into());
            }
        };

        let now = self.current_time;
        let accepted = self.instrument_mut(id)?.apply_trade(trade, now);

        self.emit_event(
            id.clone(),
            EventPayload::TradeApplied(TradeAppliedEvent {
                side: accepted.side,
                size: accepted.size,
                ledger: accepted.ledger,
                contract_price: accepted.contract_price,
            }),
        );
        self.emit_event(
            id.clone(),
            EventPayload::ConvergenceRequested(ConvergenceRequestedEvent {
                outcome: accepted.convergence,
                from_fill: false,
            }),
        );

        Ok(accepted)
    }

    /// Ask for a convergence walk without a trade.
    pub fn request_convergence(&mut self, id: &InstrumentId) -> Result<ConvergenceTrigger, EngineError> {
        let now = self.current_time;
        let outcome = self.instrument_mut(id)?.request_convergence(now);
        self.emit_event(
            id.clone(),
            EventPayload::ConvergenceRequested(ConvergenceRequestedEvent {
                outcome,
                from_fill: false,
            }),
        );
        Ok(outcome)
    }

    /// Cancel a walk in flight. Returns whether one was running.
    pub fn reset_convergence(&mut self, id: &InstrumentId) -> Result<bool, EngineError> {
        let now = self.current_time;
        let cancelled = self.instrument_mut(id)?.reset_convergence(now);
        if cancelled {
            self.emit_event(id.clone(), EventPayload::ConvergenceCancelled);
        }
        Ok(cancelled)
    }
}
