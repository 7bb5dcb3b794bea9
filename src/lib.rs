// keyword-perps: perpetual contracts on keyword interest.
// each keyword gets a spot price blended from trend data, a contract price
// pushed around by long/short interest, and a funding rate on the gap. a
// convergence walk drags the contract back to spot after each trade.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: InstrumentId, Side, Timestamp
//   1.5  clock.rs: Clock trait, system / manual / tokio clocks
//   2.x  impact.rs: per-side price impact curve
//   3.x  spot.rs: realtime/monthly inputs, weighted spot blend
//   3.5  contract.rs: contract price from spot + net impact
//   4.x  ledger.rs: per-keyword long/short totals, trade validation
//   5.x  funding.rs: capped funding rate in basis points
//   5.5  convergence.rs: debounced stepwise walk back to spot
//   6.x  feed.rs: price input source trait, TTL cache, mock trend feed
//   6.5  series.rs: fixed-length realtime price series
//   6.7  order_book.rs: synthetic depth + simulated fills
//   7.x  config.rs: every tunable, env presets, validation
//   8.x  engine/: synchronous engine over many keywords
//   11.x events.rs: state transition events for audit
//   12.x instrument.rs: one keyword's full state + timers
//   14.x runtime/: one tokio actor per keyword

// pricing models
pub mod contract;
pub mod funding;
pub mod impact;
pub mod ledger;
pub mod spot;
pub mod types;

// time-driven state
pub mod clock;
pub mod convergence;
pub mod order_book;
pub mod series;

// orchestration
pub mod config;
pub mod engine;
pub mod events;
pub mod feed;
pub mod instrument;
pub mod runtime;

pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use config::{ConfigError, Environment, MarketConfig};
pub use contract::{contract_price, contract_price_for_ledger, CONTRACT_PRICE_FLOOR};
pub use convergence::{ConvergenceParams, ConvergenceScheduler, ConvergenceStep, ConvergenceTrigger};
pub use engine::{Engine, EngineConfig, EngineError, TimerReport};
pub use events::{Event, EventLog, EventPayload};
pub use feed::{CachedPriceInputs, FeedError, FeedParams, MockTrendFeed, PriceInputSource};
pub use funding::{display_funding_rate, funding_rate, FundingParams};
pub use impact::{net_impact_pct, price_impact, ImpactParams};
pub use instrument::{FillOutcome, FiredTimer, Instrument, InstrumentQuote, TimerEvent, TradeAccepted};
pub use ledger::{PositionLedger, TradeError, TradeRequest};
pub use order_book::{BookSide, OrderBookParams, OrderBookSnapshot, OrderLevel, SimulatedFill};
pub use runtime::{InstrumentHandle, MarketRuntime};
pub use series::{RealtimeSeries, Sample, SeriesParams, MAX_DATA_POINTS};
pub use spot::{blend_spot_price, PriceInputError, PriceInputs, SpotWeights, MAX_PRICE_INPUT};
pub use types::{InstrumentId, Side, Timestamp};
