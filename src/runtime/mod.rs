// 14.0: async runtime. each listed keyword runs as its own tokio task owning an
// Instrument; callers talk to it through an InstrumentHandle. keywords never
// share mutable state, so there is no cross-instrument locking.

mod actor;
mod handle;

pub use handle::InstrumentHandle;

use crate::clock::Clock;
use crate::config::MarketConfig;
use crate::engine::EngineError;
use crate::feed::PriceInputSource;
use crate::instrument::Instrument;
use crate::ledger::PositionLedger;
use crate::spot::PriceInputs;
use crate::types::InstrumentId;
use actor::InstrumentActor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const COMMAND_BUFFER: usize = 64;

/// Registry of running instrument actors.
pub struct MarketRuntime {
    config: MarketConfig,
    seed: Option<u64>,
    clock: Arc<dyn Clock>,
    handles: HashMap<InstrumentId, InstrumentHandle>,
    tasks: HashMap<InstrumentId, JoinHandle<()>>,
}

impl MarketRuntime {
    pub fn new(config: MarketConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config,
            seed: None,
            clock,
            handles: HashMap::new(),
            tasks: HashMap::new(),
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start an actor for `id`. With a `source`, the actor refreshes its
    /// inputs whenever the cached ones expire. Must be called inside a tokio
    /// runtime.
    pub fn spawn(
        &mut self,
        id: InstrumentId,
        inputs: PriceInputs,
        ledger: PositionLedger,
        source: Option<Box<dyn PriceInputSource>>,
    ) -> Result<InstrumentHandle, EngineError> {
        if self.handles.contains_key(&id) {
            return Err(EngineError::InstrumentExists(id));
        }

        let now = self.clock.now();
        let earliest = self.config.series.earliest_origin();
        if now < earliest {
            return Err(EngineError::ClockBeforeSeriesGrid { now, earliest });
        }

        let instrument = Instrument::new(id.clone(), self.config.clone(), inputs, ledger, now, self.seed);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (quote_tx, quote_rx) = watch::channel(instrument.quote());

        let actor = InstrumentActor::new(instrument, command_rx, quote_tx, Arc::clone(&self.clock), source);
        let task = tokio::spawn(actor.run());

        let handle = InstrumentHandle::new(id.clone(), command_tx, quote_rx);
        self.handles.insert(id.clone(), handle.clone());
        self.tasks.insert(id, task);
        Ok(handle)
    }

    /// Pull opening inputs from `source`, then hand it to the actor.
    pub fn spawn_with_source(
        &mut self,
        id: InstrumentId,
        mut source: Box<dyn PriceInputSource>,
    ) -> Result<InstrumentHandle, EngineError> {
        let inputs = source.price_inputs(&id, self.clock.now())?;
        self.spawn(id, inputs, PositionLedger::new(), Some(source))
    }

    pub fn handle(&self, id: &InstrumentId) -> Option<InstrumentHandle> {
        self.handles.get(id).cloned()
    }

    /// Stop one actor and wait for its task to finish.
    pub async fn shutdown(&mut self, id: &InstrumentId) -> Result<(), EngineError> {
        let handle = self
            .handles
            .remove(id)
            .ok_or_else(|| EngineError::InstrumentNotFound(id.clone()))?;
        // an actor that already exited is fine here
        let _ = handle.shutdown().await;

        if let Some(task) = self.tasks.remove(id) {
            if let Err(err) = task.await {
                warn!(instrument = %id, error = %err, "instrument task ended abnormally");
            }
        }
        info!(instrument = %id, "instrument shut down");
        Ok(())
    }

    pub async fn shutdown_all(&mut self) {
        let ids: Vec<InstrumentId> = self.handles.keys().cloned().collect();
        for id in ids {
            let _ = self.shutdown(&id).await;
        }
    }
}
