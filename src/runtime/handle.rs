// 14.2: cheap cloneable front door to an instrument actor.

use super::actor::Command;
use crate::engine::EngineError;
use crate::instrument::{InstrumentQuote, TradeAccepted};
use crate::order_book::OrderBookSnapshot;
use crate::series::Sample;
use crate::spot::PriceInputs;
use crate::types::{InstrumentId, Side};
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug, Clone)]
pub struct InstrumentHandle {
    id: InstrumentId,
    commands: mpsc::Sender<Command>,
    quotes: watch::Receiver<InstrumentQuote>,
}

impl InstrumentHandle {
    pub(crate) fn new(id: InstrumentId, commands: mpsc::Sender<Command>, quotes: watch::Receiver<InstrumentQuote>) -> Self {
        Self { id, commands, quotes }
    }

    pub fn id(&self) -> &InstrumentId {
        &self.id
    }

    fn stopped(&self) -> EngineError {
        EngineError::ActorStopped(self.id.clone())
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| self.stopped())?;
        response.await.map_err(|_| self.stopped())
    }

    pub async fn trade(&self, size: f64, side: Side) -> Result<TradeAccepted, EngineError> {
        Ok(self.request(|reply| Command::Trade { size, side, reply }).await??)
    }

    pub async fn update_price_inputs(&self, realtime: f64, monthly: f64) -> Result<InstrumentQuote, EngineError> {
        let inputs = PriceInputs::new(realtime, monthly)?;
        self.request(|reply| Command::UpdateInputs { inputs, reply }).await
    }

    pub async fn reset_convergence(&self) -> Result<bool, EngineError> {
        self.request(|reply| Command::ResetConvergence { reply }).await
    }

    pub async fn quote(&self) -> Result<InstrumentQuote, EngineError> {
        self.request(|reply| Command::Quote { reply }).await
    }

    pub async fn series_snapshot(&self) -> Result<Vec<Sample>, EngineError> {
        self.request(|reply| Command::Series { reply }).await
    }

    pub async fn order_book_snapshot(&self) -> Result<OrderBookSnapshot, EngineError> {
        self.request(|reply| Command::OrderBook { reply }).await
    }

    /// Latest quote, republished after every command and timer wake.
    pub fn subscribe(&self) -> watch::Receiver<InstrumentQuote> {
        self.quotes.clone()
    }

    pub(crate) async fn shutdown(&self) -> Result<(), EngineError> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| self.stopped())
    }
}
