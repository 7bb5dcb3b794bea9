// 2.0: price impact. maps open interest on one side to a bounded impact score.
// linear term plus a square-root term so small books still move, capped so a
// whale can never push the contract more than 200% away from spot.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactParams {
    pub linear_coefficient: f64,
    pub sqrt_coefficient: f64,
    pub max_impact: u32,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            linear_coefficient: 0.5,
            sqrt_coefficient: 2.0,
            max_impact: 200,
        }
    }
}

// 2.1: floor(size * 0.5 + sqrt(size) * 2), clamped to [0, max_impact].
// negative size is a caller bug; release builds treat it as zero.
pub fn price_impact_with(size: f64, params: &ImpactParams) -> u32 {
    debug_assert!(!(size < 0.0), "price impact called with negative size {size}");

    if !(size > 0.0) {
        return 0;
    }

    let raw = (size * params.linear_coefficient + size.sqrt() * params.sqrt_coefficient).floor();
    if raw >= params.max_impact as f64 {
        params.max_impact
    } else if raw <= 0.0 {
        0
    } else {
        raw as u32
    }
}

pub fn price_impact(size: f64) -> u32 {
    price_impact_with(size, &ImpactParams::default())
}

// 2.2: signed impact as a fraction of spot. positive = longs dominate.
pub fn net_impact_pct(total_long: f64, total_short: f64, params: &ImpactParams) -> f64 {
    let long_impact = price_impact_with(total_long, params) as f64;
    let short_impact = price_impact_with(total_short, params) as f64;
    (long_impact - short_impact) / 100.0
}
