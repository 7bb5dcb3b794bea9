//! Per-keyword market state.
//!
//! An `Instrument` owns everything one keyword needs: cached price inputs,
//! the position ledger, the convergence scheduler, the realtime series and
//! the synthetic book, plus the deadlines of its four timers. It has exactly
//! one writer. The synchronous `Engine` and the async instrument actor both
//! drive it through the same methods, passing `now` explicitly.

use crate::config::MarketConfig;
use crate::contract::contract_price_for_ledger;
use crate::convergence::{ConvergenceScheduler, ConvergenceStep, ConvergenceTrigger};
use crate::feed::{CachedPriceInputs, FeedError, PriceInputSource};
use crate::funding::{display_funding_rate, funding_rate};
use crate::ledger::{PositionLedger, TradeRequest};
use crate::order_book::{next_fill_delay_ms, OrderBookSnapshot, SimulatedFill, SyntheticOrderBook};
use crate::series::{RealtimeSeries, Sample};
use crate::spot::PriceInputs;
use crate::types::{InstrumentId, Side, Timestamp};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything a ticker widget needs in one read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentQuote {
    pub instrument: InstrumentId,
    pub spot_price: f64,
    pub contract_price: f64,
    /// Basis points, undivided.
    pub funding_rate: f64,
    pub display_funding_rate: f64,
    pub ledger: PositionLedger,
    pub converging: bool,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAccepted {
    pub instrument: InstrumentId,
    pub side: Side,
    pub size: f64,
    pub ledger: PositionLedger,
    pub spot_price: f64,
    pub contract_price: f64,
    /// Debounced or in-flight requests are reported here, not as errors.
    pub convergence: ConvergenceTrigger,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub fill: SimulatedFill,
    pub convergence: ConvergenceTrigger,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    SeriesTick(Sample),
    Convergence(ConvergenceStep),
    BookRegenerated { bid_levels: usize, ask_levels: usize },
    Fill(FillOutcome),
    /// Fill timer fired on an empty side.
    FillSkipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiredTimer {
    pub at: Timestamp,
    pub event: TimerEvent,
}

#[derive(Debug, Clone, Copy)]
struct TimerDeadlines {
    series_tick_at: Timestamp,
    book_regen_at: Timestamp,
    next_fill_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DueTimer {
    Convergence,
    Series,
    Book,
    Fill,
}

#[derive(Debug, Clone)]
pub struct Instrument {
    id: InstrumentId,
    config: MarketConfig,
    inputs: CachedPriceInputs,
    spot: f64,
    contract: f64,
    ledger: PositionLedger,
    convergence: ConvergenceScheduler,
    series: RealtimeSeries,
    book: SyntheticOrderBook,
    rng: StdRng,
    deadlines: TimerDeadlines,
    last_updated: Timestamp,
}

impl Instrument {
    /// `seed` makes every random draw reproducible; the keyword is mixed in so
    /// instruments sharing a seed still diverge.
    pub fn new(
        id: InstrumentId,
        config: MarketConfig,
        inputs: PriceInputs,
        ledger: PositionLedger,
        now: Timestamp,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id.seed())),
            None => StdRng::from_entropy(),
        };

        let spot = inputs.spot(&config.spot_weights);
        let contract = contract_price_for_ledger(spot, &ledger, &config.impact);
        let series = RealtimeSeries::seeded(&config.series, now, spot, Some(contract), &mut rng);

        let mut book = SyntheticOrderBook::new();
        book.regenerate(contract, &config.order_book, &mut rng);

        let deadlines = TimerDeadlines {
            series_tick_at: now.plus_millis(config.series.tick_interval_ms.max(1)),
            book_regen_at: now.plus_millis(config.order_book.regen_interval_ms.max(1)),
            next_fill_at: now.plus_millis(next_fill_delay_ms(&config.order_book, &mut rng).max(1)),
        };

        Self {
            inputs: CachedPriceInputs::primed(inputs, now, config.feed.cache_ttl_ms),
            convergence: ConvergenceScheduler::new(config.convergence.clone()),
            id,
            config,
            spot,
            contract,
            ledger,
            series,
            book,
            rng,
            deadlines,
            last_updated: now,
        }
    }

    pub fn id(&self) -> &InstrumentId {
        &self.id
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn spot_price(&self) -> f64 {
        self.spot
    }

    pub fn contract_price(&self) -> f64 {
        self.contract
    }

    pub fn funding_rate(&self) -> f64 {
        funding_rate(self.contract, self.spot, &self.config.funding)
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn inputs(&self) -> Option<PriceInputs> {
        self.inputs.inputs()
    }

    pub fn convergence(&self) -> &ConvergenceScheduler {
        &self.convergence
    }

    pub fn is_converging(&self) -> bool {
        self.convergence.is_converging()
    }

    pub fn series(&self) -> &RealtimeSeries {
        &self.series
    }

    pub fn series_snapshot(&self) -> Vec<Sample> {
        self.series.snapshot()
    }

    pub fn order_book_snapshot(&self) -> OrderBookSnapshot {
        self.book.snapshot()
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    pub fn quote(&self) -> InstrumentQuote {
        let rate = self.funding_rate();
        InstrumentQuote {
            instrument: self.id.clone(),
            spot_price: self.spot,
            contract_price: self.contract,
            funding_rate: rate,
            display_funding_rate: display_funding_rate(rate, &self.config.funding),
            ledger: self.ledger,
            converging: self.is_converging(),
            timestamp: self.last_updated,
        }
    }

    // inputs

    pub fn update_inputs(&mut self, inputs: PriceInputs, now: Timestamp) {
        self.inputs.store(inputs, now);
        self.reprice(inputs, now);
    }

    /// Pull fresh inputs from `source` unless the cached ones are still
    /// within their TTL. Reprices only when the values actually changed, so
    /// a snapped contract survives refreshes that bring nothing new. Returns
    /// whether a reprice happened.
    pub fn refresh_inputs(&mut self, source: &mut dyn PriceInputSource, now: Timestamp) -> Result<bool, FeedError> {
        let previous = self.inputs.inputs();
        let inputs = self.inputs.get_or_refresh(source, &self.id, now)?;
        if previous == Some(inputs) {
            return Ok(false);
        }
        self.reprice(inputs, now);
        Ok(true)
    }

    pub fn inputs_expire_at(&self) -> Option<Timestamp> {
        self.inputs.expires_at()
    }

    // spot always follows the inputs. the contract is left alone while a
    // convergence walk owns it.
    fn reprice(&mut self, inputs: PriceInputs, now: Timestamp) {
        self.spot = inputs.spot(&self.config.spot_weights);
        if !self.convergence.is_converging() {
            self.contract = self.model_contract_price();
        }
        self.last_updated = now;
        debug!(instrument = %self.id, spot = self.spot, contract = self.contract, "repriced");
    }

    fn model_contract_price(&self) -> f64 {
        contract_price_for_ledger(self.spot, &self.ledger, &self.config.impact)
    }

    // trades

    pub fn apply_trade(&mut self, trade: TradeRequest, now: Timestamp) -> TradeAccepted {
        self.ledger.apply(&trade);
        if !self.convergence.is_converging() {
            self.contract = self.model_contract_price();
        }
        self.last_updated = now;

        info!(
            instrument = %self.id,
            side = %trade.side(),
            size = trade.size(),
            total_long = self.ledger.total_long(),
            total_short = self.ledger.total_short(),
            contract = self.contract,
            "trade applied"
        );

        let convergence = self.request_convergence(now);

        TradeAccepted {
            instrument: self.id.clone(),
            side: trade.side(),
            size: trade.size(),
            ledger: self.ledger,
            spot_price: self.spot,
            contract_price: self.contract,
            convergence,
            timestamp: now,
        }
    }

    // convergence

    /// Ask for a walk toward the current spot. When it starts, the first step
    /// runs right away.
    pub fn request_convergence(&mut self, now: Timestamp) -> ConvergenceTrigger {
        let trigger = self.convergence.trigger(now, self.contract, self.spot);
        match trigger {
            ConvergenceTrigger::Started { target, per_step_delta } => {
                info!(instrument = %self.id, from = self.contract, target, per_step_delta, "convergence started");
                self.step_convergence(now);
            }
            ConvergenceTrigger::Debounced { since_last_start_ms } => {
                debug!(instrument = %self.id, since_last_start_ms, "convergence debounced");
            }
            ConvergenceTrigger::AlreadyConverging => {
                debug!(instrument = %self.id, "convergence already in progress");
            }
        }
        trigger
    }

    pub fn step_convergence(&mut self, now: Timestamp) -> ConvergenceStep {
        let step = self.convergence.step(self.contract, now);
        match step {
            ConvergenceStep::Adjusted { price, .. } => {
                self.contract = price;
                self.last_updated = now;
            }
            ConvergenceStep::Finished { price, steps_done } => {
                self.contract = price;
                self.last_updated = now;
                info!(instrument = %self.id, price, steps_done, "convergence finished");
            }
            ConvergenceStep::Idle => {}
        }
        step
    }

    /// Cancel a walk in flight and fall back to the model price.
    pub fn reset_convergence(&mut self, now: Timestamp) -> bool {
        let cancelled = self.convergence.reset();
        if cancelled {
            self.contract = self.model_contract_price();
            self.last_updated = now;
            info!(instrument = %self.id, contract = self.contract, "convergence cancelled");
        }
        cancelled
    }

    // series and book

    pub fn tick_series(&mut self, now: Timestamp) -> Sample {
        self.series
            .tick(now, self.spot, Some(self.contract), &self.config.series, &mut self.rng)
    }

    pub fn regenerate_book(&mut self) -> (usize, usize) {
        self.book.regenerate(self.contract, &self.config.order_book, &mut self.rng);
        let levels = (self.book.bids().len(), self.book.asks().len());
        debug!(instrument = %self.id, bids = levels.0, asks = levels.1, "order book regenerated");
        levels
    }

    /// Simulated fill; a fill also asks for a convergence walk.
    pub fn simulate_fill(&mut self, now: Timestamp) -> Option<FillOutcome> {
        let fill = self
            .book
            .simulate_fill(self.contract, self.spot, &self.config.order_book, &mut self.rng)?;
        debug!(
            instrument = %self.id,
            side = ?fill.side,
            price = fill.price,
            filled = fill.filled_size,
            "synthetic fill"
        );
        let convergence = self.request_convergence(now);
        Some(FillOutcome { fill, convergence })
    }

    // timers

    /// Earliest pending deadline across all four timers.
    pub fn next_deadline(&self) -> Timestamp {
        self.next_due().0
    }

    fn next_due(&self) -> (Timestamp, DueTimer) {
        // ties resolve in this order
        let mut due = (self.deadlines.series_tick_at, DueTimer::Series);
        if let Some(step_at) = self.convergence.next_step_at() {
            if step_at <= due.0 {
                due = (step_at, DueTimer::Convergence);
            }
        }
        if self.deadlines.book_regen_at < due.0 {
            due = (self.deadlines.book_regen_at, DueTimer::Book);
        }
        if self.deadlines.next_fill_at < due.0 {
            due = (self.deadlines.next_fill_at, DueTimer::Fill);
        }
        due
    }

    /// Fire every timer due at or before `now`, in deadline order, each at its
    /// own deadline. Periodic timers are rescheduled from their deadline, so a
    /// late poll catches up tick by tick.
    pub fn poll_timers(&mut self, now: Timestamp) -> Vec<FiredTimer> {
        let mut fired = Vec::new();

        loop {
            let (at, timer) = self.next_due();
            if at > now {
                break;
            }

            let event = match timer {
                DueTimer::Convergence => TimerEvent::Convergence(self.step_convergence(at)),
                DueTimer::Series => {
                    let sample = self.tick_series(at);
                    self.deadlines.series_tick_at = at.plus_millis(self.config.series.tick_interval_ms.max(1));
                    TimerEvent::SeriesTick(sample)
                }
                DueTimer::Book => {
                    let (bid_levels, ask_levels) = self.regenerate_book();
                    self.deadlines.book_regen_at = at.plus_millis(self.config.order_book.regen_interval_ms.max(1));
                    TimerEvent::BookRegenerated { bid_levels, ask_levels }
                }
                DueTimer::Fill => {
                    let outcome = self.simulate_fill(at);
                    let delay = next_fill_delay_ms(&self.config.order_book, &mut self.rng).max(1);
                    self.deadlines.next_fill_at = at.plus_millis(delay);
                    match outcome {
                        Some(outcome) => TimerEvent::Fill(outcome),
                        None => TimerEvent::FillSkipped,
                    }
                }
            };

            fired.push(FiredTimer { at, event });
        }

        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn t(offset: i64) -> Timestamp {
        Timestamp::from_millis(NOW + offset)
    }

    fn instrument(realtime: f64, monthly: f64, ledger: PositionLedger) -> Instrument {
        Instrument::new(
            InstrumentId::new("rust"),
            MarketConfig::test(),
            PriceInputs::new(realtime, monthly).unwrap(),
            ledger,
            t(0),
            Some(1),
        )
    }

    #[test]
    fn listing_prices_from_inputs_and_ledger() {
        let inst = instrument(100.0, 90.0, PositionLedger::with_totals(1000.0, 800.0).unwrap());
        assert_eq!(inst.spot_price(), 96.0);
        assert_eq!(inst.contract_price(), 96.0);
        assert_eq!(inst.funding_rate(), 0.0);
        assert_eq!(inst.series_snapshot().len(), 16);
        assert!(!inst.order_book_snapshot().bids.is_empty());
    }

    #[test]
    fn trade_moves_contract_then_converges_back() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        let accepted = inst.apply_trade(TradeRequest::long(100.0).unwrap(), t(0));

        assert!(accepted.convergence.started());
        assert_eq!(accepted.ledger.total_long(), 100.0);
        // model price is 170, the first step already ran: 170 - 70/15
        assert!((inst.contract_price() - (170.0 - 70.0 / 15.0)).abs() < 1e-9);
        assert!(inst.funding_rate() > 0.0);

        inst.poll_timers(t(3_000));
        assert!(!inst.is_converging());
        assert_eq!(inst.contract_price(), 100.0);
    }

    #[test]
    fn second_trade_inside_window_is_debounced() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        inst.apply_trade(TradeRequest::long(10.0).unwrap(), t(0));
        let second = inst.apply_trade(TradeRequest::short(5.0).unwrap(), t(100));
        assert!(!second.convergence.started());
        assert_eq!(second.ledger.total_short(), 5.0);
    }

    #[test]
    fn inputs_update_reprices_spot_and_contract() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        inst.update_inputs(PriceInputs::new(50.0, 50.0).unwrap(), t(10));
        assert_eq!(inst.spot_price(), 50.0);
        assert_eq!(inst.contract_price(), 50.0);
        assert_eq!(inst.last_updated(), t(10));
    }

    #[test]
    fn inputs_during_walk_leave_contract_to_the_walk() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        inst.apply_trade(TradeRequest::long(100.0).unwrap(), t(0));
        let before = inst.contract_price();
        inst.update_inputs(PriceInputs::new(120.0, 120.0).unwrap(), t(50));
        assert_eq!(inst.spot_price(), 120.0);
        assert_eq!(inst.contract_price(), before);

        // snaps to the spot captured at trigger time, not the live one
        inst.poll_timers(t(3_000));
        assert_eq!(inst.contract_price(), 100.0);
    }

    struct FlatSource;

    impl PriceInputSource for FlatSource {
        fn price_inputs(&mut self, _: &InstrumentId, _: Timestamp) -> Result<PriceInputs, FeedError> {
            Ok(PriceInputs::new(100.0, 100.0)?)
        }
    }

    #[test]
    fn unchanged_refresh_keeps_snapped_contract() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        inst.apply_trade(TradeRequest::long(100.0).unwrap(), t(0));
        inst.poll_timers(t(3_000));
        assert_eq!(inst.contract_price(), 100.0);

        // cache expired, source answers with the same values
        assert!(!inst.refresh_inputs(&mut FlatSource, t(3_500)).unwrap());
        assert_eq!(inst.contract_price(), 100.0);

        inst.update_inputs(PriceInputs::new(50.0, 50.0).unwrap(), t(3_600));
        assert!(inst.refresh_inputs(&mut FlatSource, t(6_000)).unwrap());
        assert!((inst.contract_price() - 170.0).abs() < 1e-9);
    }

    #[test]
    fn reset_falls_back_to_model() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        inst.apply_trade(TradeRequest::long(100.0).unwrap(), t(0));
        assert!(inst.reset_convergence(t(10)));
        assert!(!inst.is_converging());
        assert!((inst.contract_price() - 170.0).abs() < 1e-9);
        assert!(!inst.reset_convergence(t(20)));
    }

    #[test]
    fn series_ticks_every_half_second() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        let fired = inst.poll_timers(t(2_000));
        let ticks = fired
            .iter()
            .filter(|f| matches!(f.event, TimerEvent::SeriesTick(_)))
            .count();
        assert_eq!(ticks, 4);

        let snapshot = inst.series_snapshot();
        assert_eq!(snapshot.len(), 16);
        assert_eq!(snapshot.last().unwrap().timestamp, t(2_000).as_unsigned_millis());
    }

    #[test]
    fn book_regenerates_and_fills_fire() {
        let mut inst = instrument(100.0, 100.0, PositionLedger::new());
        let fired = inst.poll_timers(t(10_000));
        let regens = fired
            .iter()
            .filter(|f| matches!(f.event, TimerEvent::BookRegenerated { .. }))
            .count();
        let fills = fired
            .iter()
            .filter(|f| matches!(f.event, TimerEvent::Fill(_) | TimerEvent::FillSkipped))
            .count();
        assert_eq!(regens, 5);
        assert!((3..=10).contains(&fills));

        // fired in deadline order
        for pair in fired.windows(2) {
            assert!(pair[0].at <= pair[1].at);
        }
        assert!(inst.next_deadline() > t(10_000));
    }

    #[test]
    fn quote_collects_everything() {
        let inst = instrument(100.0, 90.0, PositionLedger::new());
        let quote = inst.quote();
        assert_eq!(quote.spot_price, 96.0);
        assert_eq!(quote.contract_price, 96.0);
        assert_eq!(quote.funding_rate, 0.0);
        assert!(!quote.converging);
        assert_eq!(quote.instrument.as_str(), "rust");
    }
}
