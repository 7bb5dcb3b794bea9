// 8.0 engine/core.rs: main engine. holds every listed instrument and the event log.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::events::{Event, EventLog, EventPayload, InstrumentListedEvent};
use crate::feed::PriceInputSource;
use crate::instrument::Instrument;
use crate::ledger::PositionLedger;
use crate::spot::PriceInputs;
use crate::types::{InstrumentId, Timestamp};
use std::collections::HashMap;
use tracing::{debug, info};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) instruments: HashMap<InstrumentId, Instrument>,
    pub(super) events: EventLog,
    pub(super) current_time: Timestamp,
}

impl Engine {
    /// The clock starts at the current wall time.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            events: EventLog::new(config.max_events),
            config,
            instruments: HashMap::new(),
            current_time: Timestamp::now(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Move the clock without firing timers. The next `advance_time` or
    /// `run_due_timers` catches up.
    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn list_instrument(&mut self, id: InstrumentId, inputs: PriceInputs) -> Result<(), EngineError> {
        self.list_instrument_with_ledger(id, inputs, PositionLedger::new())
    }

    /// List with an opening ledger, e.g. the 1000/800 demo totals.
    pub fn list_instrument_with_ledger(
        &mut self,
        id: InstrumentId,
        inputs: PriceInputs,
        ledger: PositionLedger,
    ) -> Result<(), EngineError> {
        if self.instruments.contains_key(&id) {
            return Err(EngineError::InstrumentExists(id));
        }
        self.config.market.validate()?;
        let earliest = self.config.market.series.earliest_origin();
        if self.current_time < earliest {
            return Err(EngineError::ClockBeforeSeriesGrid {
                now: self.current_time,
                earliest,
            });
        }

        let instrument = Instrument::new(
            id.clone(),
            self.config.market.clone(),
            inputs,
            ledger,
            self.current_time,
            self.config.seed,
        );
        info!(instrument = %id, spot = instrument.spot_price(), contract = instrument.contract_price(), "instrument listed");

        self.emit_event(
            id.clone(),
            EventPayload::InstrumentListed(InstrumentListedEvent {
                spot_price: instrument.spot_price(),
                contract_price: instrument.contract_price(),
            }),
        );
        self.instruments.insert(id, instrument);
        Ok(())
    }

    /// List with inputs pulled from `source` right now.
    pub fn list_from_source(
        &mut self,
        id: InstrumentId,
        source: &mut dyn PriceInputSource,
    ) -> Result<(), EngineError> {
        let inputs = source.price_inputs(&id, self.current_time)?;
        self.list_instrument(id, inputs)
    }

    pub fn delist_instrument(&mut self, id: &InstrumentId) -> Result<Instrument, EngineError> {
        let instrument = self
            .instruments
            .remove(id)
            .ok_or_else(|| EngineError::InstrumentNotFound(id.clone()))?;
        info!(instrument = %id, "instrument delisted");
        self.emit_event(id.clone(), EventPayload::InstrumentDelisted);
        Ok(instrument)
    }

    pub fn get_instrument(&self, id: &InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id)
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn recent_events(&self, count: usize) -> Vec<&Event> {
        self.events.recent(count)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub(super) fn instrument_mut(&mut self, id: &InstrumentId) -> Result<&mut Instrument, EngineError> {
        self.instruments
            .get_mut(id)
            .ok_or_else(|| EngineError::InstrumentNotFound(id.clone()))
    }

    pub(super) fn instrument_ref(&self, id: &InstrumentId) -> Result<&Instrument, EngineError> {
        self.instruments
            .get(id)
            .ok_or_else(|| EngineError::InstrumentNotFound(id.clone()))
    }

    pub(super) fn emit_event(&mut self, instrument: InstrumentId, payload: EventPayload) {
        self.emit_event_at(instrument, self.current_time, payload);
    }

    pub(super) fn emit_event_at(&mut self, instrument: InstrumentId, timestamp: Timestamp, payload: EventPayload) {
        if self.config.verbose {
            info!(%instrument, ?payload, "event");
        } else {
            debug!(%instrument, ?payload, "event");
        }
        self.events.record(instrument, timestamp, payload);
    }
}
