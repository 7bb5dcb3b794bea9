// 5.0: funding rate. basis-point measure of how far the contract sits from spot.
// only the magnitude is kept: a contract 1% rich and one 1% cheap both read 10 bps.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingParams {
    // scale applied to the relative deviation (1000 = tenths of a percent)
    pub basis_points: f64,
    pub max_rate_bps: f64,
    // presentation layers divide by this before showing the rate
    pub display_divisor: f64,
}

impl Default for FundingParams {
    fn default() -> Self {
        Self {
            basis_points: 1000.0,
            max_rate_bps: 100.0,
            display_divisor: 10.0,
        }
    }
}

// 5.1: |contract - spot| / spot * 1000. zero when either price is zero.
pub fn deviation_bps(contract: f64, spot: f64, params: &FundingParams) -> f64 {
    if spot == 0.0 || contract == 0.0 {
        return 0.0;
    }
    let deviation = (contract - spot).abs() * params.basis_points / spot.abs();
    if deviation.is_finite() {
        deviation
    } else {
        0.0
    }
}

// 5.2: clamps the deviation into [0, max_rate_bps]
pub fn funding_rate(contract: f64, spot: f64, params: &FundingParams) -> f64 {
    deviation_bps(contract, spot, params).min(params.max_rate_bps)
}

pub fn display_funding_rate(rate_bps: f64, params: &FundingParams) -> f64 {
    if params.display_divisor == 0.0 {
        return rate_bps;
    }
    rate_bps / params.display_divisor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FundingParams {
        FundingParams::default()
    }

    #[test]
    fn equal_prices_pay_nothing() {
        assert_eq!(funding_rate(96.0, 96.0, &params()), 0.0);
    }

    #[test]
    fn degenerate_inputs_are_zero() {
        assert_eq!(funding_rate(50.0, 0.0, &params()), 0.0);
        assert_eq!(funding_rate(0.0, 50.0, &params()), 0.0);
    }

    #[test]
    fn direction_is_discarded() {
        let rich = funding_rate(101.0, 100.0, &params());
        let cheap = funding_rate(99.0, 100.0, &params());
        assert!((rich - 10.0).abs() < 1e-9);
        assert!((cheap - 10.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_at_max() {
        // 20% away -> 200 bps raw -> 100
        assert_eq!(funding_rate(120.0, 100.0, &params()), 100.0);
        assert_eq!(funding_rate(1.0, 100.0, &params()), 100.0);
    }

    #[test]
    fn display_scaling() {
        assert_eq!(display_funding_rate(100.0, &params()), 10.0);
        let raw = FundingParams {
            display_divisor: 0.0,
            ..params()
        };
        assert_eq!(display_funding_rate(42.0, &raw), 42.0);
    }
}
