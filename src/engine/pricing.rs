//! Price input operations.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, PriceInputsUpdatedEvent};
use crate::feed::PriceInputSource;
use crate::instrument::InstrumentQuote;
use crate::spot::PriceInputs;
use crate::types::InstrumentId;

impl Engine {
    /// Push new trend values for a keyword. Spot is recomputed at once; the
    /// contract follows unless a convergence walk owns it.
    pub fn update_price_inputs(
        &mut self,
        id: &InstrumentId,
        realtime: f64,
        monthly: f64,
    ) -> Result<InstrumentQuote, EngineError> {
        let inputs = PriceInputs::new(realtime, monthly)?;
        let now = self.current_time;
        let instrument = self.instrument_mut(id)?;
        instrument.update_inputs(inputs, now);
        let quote = instrument.quote();

        self.emit_inputs_event(id, inputs, &quote);
        Ok(quote)
    }

    /// Pull inputs from `source` through the instrument's TTL cache.
    pub fn refresh_price_inputs(
        &mut self,
        id: &InstrumentId,
        source: &mut dyn PriceInputSource,
    ) -> Result<InstrumentQuote, EngineError> {
        let now = self.current_time;
        let instrument = self.instrument_mut(id)?;
        let changed = instrument.refresh_inputs(source, now)?;
        let quote = instrument.quote();

        if let (true, Some(inputs)) = (changed, instrument.inputs()) {
            self.emit_inputs_event(id, inputs, &quote);
        }
        Ok(quote)
    }

    fn emit_inputs_event(&mut self, id: &InstrumentId, inputs: PriceInputs, quote: &InstrumentQuote) {
        self.emit_event(
            id.clone(),
            EventPayload::PriceInputsUpdated(PriceInputsUpdatedEvent {
                realtime: inputs.realtime,
                monthly: inputs.monthly,
                spot_price: quote.spot_price,
                contract_price: quote.contract_price,
            }),
        );
    }
}
