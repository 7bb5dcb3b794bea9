//! Synthetic order book.
//!
//! Purely visual depth around the contract price. Levels are regenerated on a
//! timer and "filled" at random intervals on the side the spot/contract gap
//! points to. Nothing here touches the position ledger; a fill only nudges the
//! convergence scheduler.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookParams {
    pub min_levels: usize,
    pub max_levels: usize,
    /// Per-level offset is U[offset_min, offset_max) * (level + 1).
    pub offset_min: f64,
    pub offset_max: f64,
    /// Level sizes are whole units in [size_min, size_max).
    pub size_min: u32,
    pub size_max: u32,
    /// Fill amounts are whole units in [fill_min, fill_max).
    pub fill_min: u32,
    pub fill_max: u32,
    pub price_decimals: u32,
    pub regen_interval_ms: i64,
    pub fill_delay_min_ms: i64,
    pub fill_delay_max_ms: i64,
}

impl Default for OrderBookParams {
    fn default() -> Self {
        Self {
            min_levels: 4,
            max_levels: 5,
            offset_min: 0.1,
            offset_max: 0.6,
            size_min: 10,
            size_max: 60,
            fill_min: 10,
            fill_max: 40,
            price_decimals: 2,
            regen_interval_ms: 2_000,
            fill_delay_min_ms: 1_000,
            fill_delay_max_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookSide {
    Bid,
    Ask,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderLevel {
    pub price: f64,
    pub size: f64,
    pub cumulative_total: f64,
    pub filled: bool,
}

/// Point-in-time copy handed to collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<OrderLevel>,
    pub asks: Vec<OrderLevel>,
}

impl OrderBookSnapshot {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|level| level.price)
    }

    pub fn spread(&self) -> Option<f64> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    pub fn mid_price(&self) -> Option<f64> {
        Some((self.best_ask()? + self.best_bid()?) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedFill {
    pub side: BookSide,
    pub level_index: usize,
    pub price: f64,
    pub filled_size: f64,
    pub remaining_size: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticOrderBook {
    bids: Vec<OrderLevel>,
    asks: Vec<OrderLevel>,
}

impl SyntheticOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bids(&self) -> &[OrderLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[OrderLevel] {
        &self.asks
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn snapshot(&self) -> OrderBookSnapshot {
        OrderBookSnapshot {
            bids: self.bids.clone(),
            asks: self.asks.clone(),
        }
    }

    /// Throw away both ladders and build fresh ones around `contract`.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, contract: f64, params: &OrderBookParams, rng: &mut R) {
        self.bids = build_side(BookSide::Bid, contract, params, rng);
        self.asks = build_side(BookSide::Ask, contract, params, rng);
    }

    /// Fill a random level on the side the price gap points to. A contract
    /// below spot draws buyers into the asks; otherwise sellers hit the bids.
    pub fn simulate_fill<R: Rng + ?Sized>(
        &mut self,
        contract: f64,
        spot: f64,
        params: &OrderBookParams,
        rng: &mut R,
    ) -> Option<SimulatedFill> {
        let side = if contract - spot < 0.0 { BookSide::Ask } else { BookSide::Bid };
        let levels = match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        };
        if levels.is_empty() {
            return None;
        }

        let level_index = rng.gen_range(0..levels.len());
        let amount = whole_units(params.fill_min, params.fill_max, rng);

        let level = &mut levels[level_index];
        let filled_size = amount.min(level.size);
        level.size = (level.size - amount).max(0.0);
        level.filled = true;
        let price = level.price;
        let remaining_size = level.size;

        recompute_totals(levels);

        Some(SimulatedFill {
            side,
            level_index,
            price,
            filled_size,
            remaining_size,
        })
    }
}

/// Delay until the next simulated fill, U[min, max) milliseconds.
pub fn next_fill_delay_ms<R: Rng + ?Sized>(params: &OrderBookParams, rng: &mut R) -> i64 {
    if params.fill_delay_max_ms <= params.fill_delay_min_ms {
        return params.fill_delay_min_ms;
    }
    rng.gen_range(params.fill_delay_min_ms..params.fill_delay_max_ms)
}

fn build_side<R: Rng + ?Sized>(side: BookSide, contract: f64, params: &OrderBookParams, rng: &mut R) -> Vec<OrderLevel> {
    let count = if params.max_levels > params.min_levels {
        rng.gen_range(params.min_levels..=params.max_levels)
    } else {
        params.min_levels
    };

    let mut levels = Vec::with_capacity(count);
    for i in 0..count {
        let offset = uniform(params.offset_min, params.offset_max, rng) * (i + 1) as f64;
        let raw = match side {
            BookSide::Bid => contract - offset,
            BookSide::Ask => contract + offset,
        };
        let price = floor_to_decimals(raw, params.price_decimals);
        if price <= 0.0 {
            continue;
        }

        levels.push(OrderLevel {
            price,
            size: whole_units(params.size_min, params.size_max, rng),
            cumulative_total: 0.0,
            filled: false,
        });
    }

    match side {
        BookSide::Bid => levels.sort_by(|a, b| b.price.total_cmp(&a.price)),
        BookSide::Ask => levels.sort_by(|a, b| a.price.total_cmp(&b.price)),
    }
    recompute_totals(&mut levels);
    levels
}

fn recompute_totals(levels: &mut [OrderLevel]) {
    let mut running = 0.0;
    for level in levels.iter_mut() {
        running += level.size;
        level.cumulative_total = running;
    }
}

fn floor_to_decimals(price: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (price * scale).floor() / scale
}

fn uniform<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    if max <= min {
        return min;
    }
    rng.gen_range(min..max)
}

fn whole_units<R: Rng + ?Sized>(min: u32, max: u32, rng: &mut R) -> f64 {
    if max <= min {
        return min as f64;
    }
    rng.gen_range(min..max) as f64
}
