// 3.0: spot price. blends the realtime interest value with the monthly average.
// weights are integers that must sum to 100 (checked in config validation).

use serde::{Deserialize, Serialize};

// used when the trend collaborator has nothing for a keyword yet
pub const DEFAULT_REALTIME_VALUE: f64 = 100.0;
pub const DEFAULT_MONTHLY_RATIO: f64 = 0.9;

// trend values are index points; anything past this is a broken feed. keeps
// the weighted blend and the 3x impact ceiling far from f64 overflow.
pub const MAX_PRICE_INPUT: f64 = 1e12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotWeights {
    pub realtime_weight: u32,
    pub monthly_weight: u32,
}

impl Default for SpotWeights {
    fn default() -> Self {
        Self {
            realtime_weight: 60,
            monthly_weight: 40,
        }
    }
}

impl SpotWeights {
    pub fn total(&self) -> u32 {
        self.realtime_weight + self.monthly_weight
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriceInputError {
    #[error("Realtime value {0} is outside [0, 1e12]")]
    InvalidRealtime(f64),

    #[error("Monthly value {0} is outside [0, 1e12]")]
    InvalidMonthly(f64),
}

/// Raw inputs delivered by the trend collaborator for one keyword.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceInputs {
    pub realtime: f64,
    pub monthly: f64,
}

impl PriceInputs {
    /// Both values must lie in `[0, MAX_PRICE_INPUT]`; NaN and infinities
    /// are rejected along with everything out of range.
    pub fn new(realtime: f64, monthly: f64) -> Result<Self, PriceInputError> {
        if !in_range(realtime) {
            return Err(PriceInputError::InvalidRealtime(realtime));
        }
        if !in_range(monthly) {
            return Err(PriceInputError::InvalidMonthly(monthly));
        }
        Ok(Self { realtime, monthly })
    }

    /// Missing realtime falls back to 100, missing monthly to 90% of
    /// realtime. Present values are still validated.
    pub fn with_fallback(realtime: Option<f64>, monthly: Option<f64>) -> Result<Self, PriceInputError> {
        let realtime = realtime.unwrap_or(DEFAULT_REALTIME_VALUE);
        let monthly = monthly.unwrap_or(realtime * DEFAULT_MONTHLY_RATIO);
        Self::new(realtime, monthly)
    }

    pub fn spot(&self, weights: &SpotWeights) -> f64 {
        blend_spot_price(self.realtime, self.monthly, weights)
    }
}

fn in_range(value: f64) -> bool {
    (0.0..=MAX_PRICE_INPUT).contains(&value)
}

// 3.1: (realtime * 60 + monthly * 40) / 100
pub fn blend_spot_price(realtime: f64, monthly: f64, weights: &SpotWeights) -> f64 {
    let total = weights.total();
    if total == 0 {
        return 0.0;
    }
    (realtime * weights.realtime_weight as f64 + monthly * weights.monthly_weight as f64) / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blends_with_default_weights() {
        let weights = SpotWeights::default();
        assert_eq!(blend_spot_price(100.0, 90.0, &weights), 96.0);
        assert_eq!(blend_spot_price(50.0, 50.0, &weights), 50.0);
    }

    #[test]
    fn inputs_reject_garbage() {
        assert!(matches!(PriceInputs::new(f64::NAN, 1.0), Err(PriceInputError::InvalidRealtime(_))));
        assert!(matches!(PriceInputs::new(-1.0, 1.0), Err(PriceInputError::InvalidRealtime(_))));
        assert!(matches!(PriceInputs::new(1.0, f64::INFINITY), Err(PriceInputError::InvalidMonthly(_))));
        assert!(PriceInputs::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn huge_finite_inputs_rejected() {
        let near_max = f64::MAX / 2.0;
        assert!(matches!(
            PriceInputs::new(near_max, near_max),
            Err(PriceInputError::InvalidRealtime(_))
        ));
        assert!(matches!(
            PriceInputs::new(1.0, MAX_PRICE_INPUT * 2.0),
            Err(PriceInputError::InvalidMonthly(_))
        ));

        let ceiling = PriceInputs::new(MAX_PRICE_INPUT, MAX_PRICE_INPUT).unwrap();
        let spot = ceiling.spot(&SpotWeights::default());
        assert!(spot.is_finite());
        assert_eq!(spot, MAX_PRICE_INPUT);
    }

    #[test]
    fn fallback_defaults() {
        let inputs = PriceInputs::with_fallback(None, None).unwrap();
        assert_eq!(inputs.realtime, 100.0);
        assert_eq!(inputs.monthly, 90.0);
        assert_eq!(inputs.spot(&SpotWeights::default()), 96.0);

        let partial = PriceInputs::with_fallback(Some(50.0), None).unwrap();
        assert_eq!(partial.monthly, 45.0);
    }

    #[test]
    fn zero_weights_give_zero_spot() {
        let weights = SpotWeights {
            realtime_weight: 0,
            monthly_weight: 0,
        };
        assert_eq!(blend_spot_price(10.0, 10.0, &weights), 0.0);
    }
}
