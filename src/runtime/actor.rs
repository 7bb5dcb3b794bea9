// 14.1: one task per keyword. the task is the instrument's only writer: commands
// arrive over mpsc, timers are slept on, quotes fan out over a watch channel.

use crate::clock::Clock;
use crate::feed::PriceInputSource;
use crate::instrument::{Instrument, InstrumentQuote, TradeAccepted};
use crate::ledger::{TradeError, TradeRequest};
use crate::order_book::OrderBookSnapshot;
use crate::series::Sample;
use crate::spot::PriceInputs;
use crate::types::{Side, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

pub(crate) enum Command {
    Trade {
        size: f64,
        side: Side,
        reply: oneshot::Sender<Result<TradeAccepted, TradeError>>,
    },
    UpdateInputs {
        inputs: PriceInputs,
        reply: oneshot::Sender<InstrumentQuote>,
    },
    ResetConvergence {
        reply: oneshot::Sender<bool>,
    },
    Quote {
        reply: oneshot::Sender<InstrumentQuote>,
    },
    Series {
        reply: oneshot::Sender<Vec<Sample>>,
    },
    OrderBook {
        reply: oneshot::Sender<OrderBookSnapshot>,
    },
    Shutdown,
}

enum Wake {
    Command(Option<Command>),
    Timer,
}

pub(crate) struct InstrumentActor {
    instrument: Instrument,
    commands: mpsc::Receiver<Command>,
    quotes: watch::Sender<InstrumentQuote>,
    clock: Arc<dyn Clock>,
    source: Option<Box<dyn PriceInputSource>>,
}

impl InstrumentActor {
    pub(crate) fn new(
        instrument: Instrument,
        commands: mpsc::Receiver<Command>,
        quotes: watch::Sender<InstrumentQuote>,
        clock: Arc<dyn Clock>,
        source: Option<Box<dyn PriceInputSource>>,
    ) -> Self {
        Self {
            instrument,
            commands,
            quotes,
            clock,
            source,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(instrument = %self.instrument.id(), "instrument actor started");

        loop {
            let now = self.clock.now();
            let wait = self.next_wake().millis_since(now).max(0) as u64;

            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                _ = tokio::time::sleep(Duration::from_millis(wait)) => Wake::Timer,
            };

            match wake {
                Wake::Command(Some(Command::Shutdown)) | Wake::Command(None) => break,
                Wake::Command(Some(command)) => self.handle(command),
                Wake::Timer => self.on_wake(),
            }
        }

        info!(instrument = %self.instrument.id(), "instrument actor stopped");
    }

    fn next_wake(&self) -> Timestamp {
        let timers = self.instrument.next_deadline();
        match (&self.source, self.instrument.inputs_expire_at()) {
            (Some(_), Some(expiry)) => timers.min(expiry),
            _ => timers,
        }
    }

    fn on_wake(&mut self) {
        let now = self.clock.now();

        if let Some(source) = self.source.as_deref_mut() {
            if let Err(err) = self.instrument.refresh_inputs(source, now) {
                warn!(instrument = %self.instrument.id(), error = %err, "price refresh failed");
            }
        }

        let fired = self.instrument.poll_timers(now);
        if !fired.is_empty() {
            debug!(instrument = %self.instrument.id(), fired = fired.len(), "timers fired");
        }
        self.publish();
    }

    fn handle(&mut self, command: Command) {
        let now = self.clock.now();
        // catch up first so commands see current state
        self.instrument.poll_timers(now);

        // a dropped reply receiver just means the caller stopped waiting
        match command {
            Command::Trade { size, side, reply } => {
                let result = TradeRequest::new(size, side).map(|trade| self.instrument.apply_trade(trade, now));
                if let Err(err) = &result {
                    warn!(instrument = %self.instrument.id(), size, %side, error = %err, "trade rejected");
                }
                let _ = reply.send(result);
            }
            Command::UpdateInputs { inputs, reply } => {
                self.instrument.update_inputs(inputs, now);
                let _ = reply.send(self.instrument.quote());
            }
            Command::ResetConvergence { reply } => {
                let _ = reply.send(self.instrument.reset_convergence(now));
            }
            Command::Quote { reply } => {
                let _ = reply.send(self.instrument.quote());
            }
            Command::Series { reply } => {
                let _ = reply.send(self.instrument.series_snapshot());
            }
            Command::OrderBook { reply } => {
                let _ = reply.send(self.instrument.order_book_snapshot());
            }
            Command::Shutdown => {}
        }
        self.publish();
    }

    fn publish(&self) {
        self.quotes.send_replace(self.instrument.quote());
    }
}
