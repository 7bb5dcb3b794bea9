// 6.0: price input collaborators. the engine never fetches trend data itself;
// it asks a PriceInputSource and caches the answer per instrument with a TTL.
// 6.1 is the TTL cache, 6.2 a deterministic keyword-seeded mock trend feed.

use crate::spot::{PriceInputError, PriceInputs};
use crate::types::{InstrumentId, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    #[error("No trend data for {0}")]
    UnknownInstrument(InstrumentId),

    #[error("Trend source unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid trend values: {0}")]
    InvalidInputs(#[from] PriceInputError),
}

pub trait PriceInputSource: Send {
    fn price_inputs(&mut self, instrument: &InstrumentId, now: Timestamp) -> Result<PriceInputs, FeedError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedParams {
    pub cache_ttl_ms: i64,
    pub history_len: usize,
    // mock feed appends at most one point per interval
    pub refresh_interval_ms: i64,
    pub monthly_ratio: f64,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 2_000,
            history_len: 30,
            refresh_interval_ms: 1_000,
            monthly_ratio: 0.9,
        }
    }
}

// 6.1: last good inputs for one instrument plus when they were fetched.
#[derive(Debug, Clone)]
pub struct CachedPriceInputs {
    inputs: Option<PriceInputs>,
    fetched_at: Option<Timestamp>,
    ttl_ms: i64,
}

impl CachedPriceInputs {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            inputs: None,
            fetched_at: None,
            ttl_ms,
        }
    }

    pub fn primed(inputs: PriceInputs, now: Timestamp, ttl_ms: i64) -> Self {
        Self {
            inputs: Some(inputs),
            fetched_at: Some(now),
            ttl_ms,
        }
    }

    pub fn inputs(&self) -> Option<PriceInputs> {
        self.inputs
    }

    pub fn fetched_at(&self) -> Option<Timestamp> {
        self.fetched_at
    }

    pub fn is_fresh(&self, now: Timestamp) -> bool {
        match self.fetched_at {
            Some(at) => now.millis_since(at) < self.ttl_ms,
            None => false,
        }
    }

    /// When the cached value goes stale. `None` if nothing has been fetched.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.fetched_at.map(|at| at.plus_millis(self.ttl_ms))
    }

    pub fn store(&mut self, inputs: PriceInputs, now: Timestamp) {
        self.inputs = Some(inputs);
        self.fetched_at = Some(now);
    }

    /// Cached value while fresh, otherwise ask `source`. A failed refresh
    /// keeps serving the stale value so the instrument stalls rather than
    /// erroring; only a cold cache surfaces the error.
    pub fn get_or_refresh(
        &mut self,
        source: &mut dyn PriceInputSource,
        instrument: &InstrumentId,
        now: Timestamp,
    ) -> Result<PriceInputs, FeedError> {
        if let (true, Some(inputs)) = (self.is_fresh(now), self.inputs) {
            return Ok(inputs);
        }

        match source.price_inputs(instrument, now) {
            Ok(inputs) => {
                self.store(inputs, now);
                Ok(inputs)
            }
            Err(err) => match self.inputs {
                Some(stale) => {
                    warn!(%instrument, error = %err, "price refresh failed, serving stale inputs");
                    // push the next attempt out one TTL instead of retrying every poll
                    self.fetched_at = Some(now);
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }
}

// 6.2: one keyword's synthetic interest history.
#[derive(Debug, Clone)]
struct TrendHistory {
    base_price: f64,
    values: VecDeque<f64>,
    last_refresh: Option<Timestamp>,
    rng: StdRng,
}

const MIN_TREND_VALUE: f64 = 10.0;
const BAND_LOW: f64 = 0.85;
const BAND_HIGH: f64 = 1.15;
const STABILITY_PULL: f64 = 0.05;

impl TrendHistory {
    fn new(instrument: &InstrumentId, history_len: usize) -> Self {
        let seed = instrument.seed();
        let base_price = 50.0 + (seed % 30) as f64;
        let mut rng = StdRng::seed_from_u64(seed);

        let len = history_len.max(1);
        let mut values = VecDeque::with_capacity(len);
        let mut price = base_price;
        for i in 0..len {
            if i > 0 {
                // +-2% walk to pre-fill
                price *= 1.0 + rng.gen_range(-0.02..0.02);
            }
            price = round_cents(price.max(MIN_TREND_VALUE));
            values.push_back(price);
        }

        Self {
            base_price,
            values,
            last_refresh: None,
            rng,
        }
    }

    fn last(&self) -> f64 {
        self.values.back().copied().unwrap_or(self.base_price)
    }

    // three rising points skew the next move down, three falling skew it up
    fn fluctuation_band(&self) -> (f64, f64) {
        if self.values.len() < 3 {
            return (-0.015, 0.015);
        }
        let n = self.values.len();
        let (a, b, c) = (self.values[n - 3], self.values[n - 2], self.values[n - 1]);
        if a < b && b < c {
            (-0.02, 0.01)
        } else if a > b && b > c {
            (-0.01, 0.02)
        } else {
            (-0.015, 0.015)
        }
    }

    fn advance(&mut self, history_len: usize) -> f64 {
        let last = self.last();
        let (low, high) = self.fluctuation_band();
        let mut pct = self.rng.gen_range(low..high);
        pct += STABILITY_PULL * (self.base_price - last) / self.base_price;

        let next = (last * (1.0 + pct))
            .clamp(self.base_price * BAND_LOW, self.base_price * BAND_HIGH)
            .max(MIN_TREND_VALUE);
        let next = round_cents(next);

        self.values.push_back(next);
        while self.values.len() > history_len.max(1) {
            self.values.pop_front();
        }
        next
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Deterministic stand-in for the trend API: each keyword gets a bounded,
/// mean-reverting random walk seeded from its characters.
#[derive(Debug, Clone)]
pub struct MockTrendFeed {
    params: FeedParams,
    histories: HashMap<InstrumentId, TrendHistory>,
}

impl MockTrendFeed {
    pub fn new(params: FeedParams) -> Self {
        Self {
            params,
            histories: HashMap::new(),
        }
    }

    /// Recent realtime values for a keyword, oldest first.
    pub fn history(&self, instrument: &InstrumentId) -> Option<Vec<f64>> {
        self.histories.get(instrument).map(|h| h.values.iter().copied().collect())
    }

    pub fn base_price(&self, instrument: &InstrumentId) -> Option<f64> {
        self.histories.get(instrument).map(|h| h.base_price)
    }
}

impl PriceInputSource for MockTrendFeed {
    fn price_inputs(&mut self, instrument: &InstrumentId, now: Timestamp) -> Result<PriceInputs, FeedError> {
        let history_len = self.params.history_len;
        let history = self
            .histories
            .entry(instrument.clone())
            .or_insert_with(|| TrendHistory::new(instrument, history_len));

        let due = match history.last_refresh {
            Some(at) => now.millis_since(at) >= self.params.refresh_interval_ms,
            None => true,
        };
        if due {
            let value = history.advance(history_len);
            history.last_refresh = Some(now);
            debug!(%instrument, value, "mock trend advanced");
        }

        let realtime = history.last();
        Ok(PriceInputs::new(realtime, realtime * self.params.monthly_ratio)?)
    }
}
