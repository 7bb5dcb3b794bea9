//! Realtime price series.
//!
//! A fixed-capacity FIFO of (spot, contract) samples that the chart
//! collaborator renders. Each tick drops the oldest sample, appends a jittered
//! reading of the latest prices and re-stamps every sample onto a uniform grid
//! anchored at `now`, so the x-axis stays evenly spaced no matter how late a
//! tick fires.

use crate::types::Timestamp;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const MAX_DATA_POINTS: usize = 15;
pub const SERIES_CAPACITY: usize = MAX_DATA_POINTS + 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesParams {
    pub capacity: usize,
    pub tick_interval_ms: i64,
    /// Spacing of the synthetic timestamp grid, independent of the tick rate.
    pub grid_spacing_ms: i64,
    /// Newest spot = last spot * U[1 - j, 1 + j].
    pub spot_jitter: f64,
    /// Newest contract = contract * (1 + U[-j, j]).
    pub contract_jitter: f64,
    /// Jitter applied around the initial price when the buffer is seeded.
    pub seed_jitter: f64,
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            capacity: SERIES_CAPACITY,
            tick_interval_ms: 500,
            grid_spacing_ms: 2_000,
            spot_jitter: 0.002,
            contract_jitter: 0.005,
            seed_jitter: 0.02,
        }
    }
}

impl SeriesParams {
    /// Earliest clock reading whose full grid still sits at or after the
    /// epoch. Series started before it would lose their oldest stamps.
    pub fn earliest_origin(&self) -> Timestamp {
        let slots = self.capacity.max(1) as i64 - 1;
        Timestamp::from_millis(slots * self.grid_spacing_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: u64,
    pub spot: f64,
    pub contract: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RealtimeSeries {
    samples: VecDeque<Sample>,
    capacity: usize,
    grid_spacing_ms: i64,
}

impl RealtimeSeries {
    /// Fill the buffer to capacity with readings scattered around `initial_spot`.
    pub fn seeded<R: Rng + ?Sized>(
        params: &SeriesParams,
        now: Timestamp,
        initial_spot: f64,
        contract: Option<f64>,
        rng: &mut R,
    ) -> Self {
        let capacity = params.capacity.max(1);
        let mut samples = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            samples.push_back(Sample {
                timestamp: 0,
                spot: initial_spot * jitter_factor(params.seed_jitter, rng),
                contract,
            });
        }

        let mut series = Self {
            samples,
            capacity,
            grid_spacing_ms: params.grid_spacing_ms,
        };
        series.restamp(now);
        series
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Oldest first. Cloning the iterator restarts nothing: each call to
    /// `iter` walks the current contents from the start.
    pub fn iter(&self) -> impl Iterator<Item = &Sample> + Clone + '_ {
        self.samples.iter()
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Shift out the oldest sample and append a jittered reading of
    /// `last_spot`/`contract`, then re-stamp onto the grid.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        now: Timestamp,
        last_spot: f64,
        contract: Option<f64>,
        params: &SeriesParams,
        rng: &mut R,
    ) -> Sample {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }

        let spot = last_spot * jitter_factor(params.spot_jitter, rng);
        let contract = contract.map(|price| price * jitter_factor(params.contract_jitter, rng));

        // newest slot always sits at offset 0 on the grid
        let newest = Sample {
            timestamp: now.as_unsigned_millis(),
            spot,
            contract,
        };
        self.samples.push_back(newest);
        self.restamp(now);
        newest
    }

    // timestamp[i] = now - (len - 1 - i) * spacing
    fn restamp(&mut self, now: Timestamp) {
        let len = self.samples.len() as i64;
        let spacing = self.grid_spacing_ms;
        for (i, sample) in self.samples.iter_mut().enumerate() {
            let offset = (len - 1 - i as i64) * spacing;
            sample.timestamp = now.minus_millis(offset).as_unsigned_millis();
        }
    }
}

// U[1 - j, 1 + j]; a zero jitter yields exactly 1
fn jitter_factor<R: Rng + ?Sized>(jitter: f64, rng: &mut R) -> f64 {
    if jitter <= 0.0 {
        return 1.0;
    }
    rng.gen_range((1.0 - jitter)..=(1.0 + jitter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: i64 = 1_700_000_000_000;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn assert_grid(series: &RealtimeSeries, now: i64) {
        let snapshot = series.snapshot();
        for pair in snapshot.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, 2_000);
        }
        assert_eq!(snapshot.last().unwrap().timestamp, now as u64);
    }

    #[test]
    fn seeded_buffer_is_full_and_gridded() {
        let params = SeriesParams::default();
        let series = RealtimeSeries::seeded(&params, Timestamp::from_millis(NOW), 80.0, None, &mut rng());

        assert_eq!(series.len(), SERIES_CAPACITY);
        assert_grid(&series, NOW);
        for sample in series.iter() {
            assert!(sample.spot >= 80.0 * 0.98 && sample.spot <= 80.0 * 1.02);
            assert_eq!(sample.contract, None);
        }
    }

    #[test]
    fn tick_shifts_fifo() {
        let params = SeriesParams::default();
        let mut rng = rng();
        let mut series = RealtimeSeries::seeded(&params, Timestamp::from_millis(NOW), 80.0, None, &mut rng);
        let second = series.snapshot()[1];

        let newest = series.tick(Timestamp::from_millis(NOW + 500), 90.0, Some(95.0), &params, &mut rng);

        let snapshot = series.snapshot();
        assert_eq!(snapshot.len(), SERIES_CAPACITY);
        assert_eq!(snapshot[0].spot, second.spot);
        assert_eq!(snapshot.last().copied(), Some(newest));
        assert!(newest.spot >= 90.0 * 0.998 && newest.spot <= 90.0 * 1.002);
        let contract = newest.contract.unwrap();
        assert!(contract >= 95.0 * 0.995 && contract <= 95.0 * 1.005);
        assert_grid(&series, NOW + 500);
    }

    #[test]
    fn length_holds_over_many_ticks() {
        let params = SeriesParams::default();
        let mut rng = rng();
        let mut series = RealtimeSeries::seeded(&params, Timestamp::from_millis(NOW), 50.0, Some(50.0), &mut rng);
        for i in 1..=100 {
            series.tick(Timestamp::from_millis(NOW + i * 500), 50.0, Some(50.0), &params, &mut rng);
        }
        assert_eq!(series.len(), SERIES_CAPACITY);
        assert_grid(&series, NOW + 100 * 500);
    }

    #[test]
    fn zero_jitter_is_exact() {
        let params = SeriesParams {
            spot_jitter: 0.0,
            contract_jitter: 0.0,
            seed_jitter: 0.0,
            ..SeriesParams::default()
        };
        let mut rng = rng();
        let mut series = RealtimeSeries::seeded(&params, Timestamp::from_millis(NOW), 42.0, None, &mut rng);
        let newest = series.tick(Timestamp::from_millis(NOW + 500), 43.0, Some(44.0), &params, &mut rng);
        assert_eq!(newest.spot, 43.0);
        assert_eq!(newest.contract, Some(44.0));
        assert!(series.iter().take(MAX_DATA_POINTS).all(|s| s.spot == 42.0));
    }

    #[test]
    fn iterator_restarts() {
        let params = SeriesParams::default();
        let series = RealtimeSeries::seeded(&params, Timestamp::from_millis(NOW), 10.0, None, &mut rng());
        let iter = series.iter();
        let first_pass: Vec<_> = iter.clone().collect();
        let second_pass: Vec<_> = iter.collect();
        assert_eq!(first_pass, second_pass);
    }
}
