// 11.0: every state change worth auditing produces an event. trades, convergence
// transitions, book redraws, synthetic fills. series ticks are too chatty and skip this.

use crate::convergence::ConvergenceTrigger;
use crate::ledger::PositionLedger;
use crate::order_book::SimulatedFill;
use crate::types::{InstrumentId, Side, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub instrument: InstrumentId,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Lifecycle
    InstrumentListed(InstrumentListedEvent),
    InstrumentDelisted,

    // Price events
    PriceInputsUpdated(PriceInputsUpdatedEvent),

    // Trade events
    TradeApplied(TradeAppliedEvent),
    TradeRejected(TradeRejectedEvent),

    // Convergence events
    ConvergenceRequested(ConvergenceRequestedEvent),
    ConvergenceFinished(ConvergenceFinishedEvent),
    ConvergenceCancelled,

    // Synthetic book events
    OrderBookRegenerated(OrderBookRegeneratedEvent),
    SyntheticFill(SimulatedFill),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentListedEvent {
    pub spot_price: f64,
    pub contract_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceInputsUpdatedEvent {
    pub realtime: f64,
    pub monthly: f64,
    pub spot_price: f64,
    pub contract_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAppliedEvent {
    pub side: Side,
    pub size: f64,
    pub ledger: PositionLedger,
    pub contract_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRejectedEvent {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceRequestedEvent {
    pub outcome: ConvergenceTrigger,
    pub from_fill: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceFinishedEvent {
    pub price: f64,
    pub steps_done: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookRegeneratedEvent {
    pub bid_levels: usize,
    pub ask_levels: usize,
}

/// Bounded in-memory audit log. Oldest events drop once `max_events` is hit.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    next_id: u64,
    max_events: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::new(),
            next_id: 1,
            max_events,
        }
    }

    pub fn record(&mut self, instrument: InstrumentId, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        self.events.push_back(Event {
            id,
            timestamp,
            instrument,
            payload,
        });
        while self.events.len() > self.max_events {
            self.events.pop_front();
        }
        id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    pub fn recent(&self, count: usize) -> Vec<&Event> {
        let start = self.events.len().saturating_sub(count);
        self.events.range(start..).collect()
    }

    pub fn for_instrument<'a>(&'a self, instrument: &'a InstrumentId) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |event| &event.instrument == instrument)
    }
}
