// 4.0: contract price derivation. spot shifted by the net long/short impact.
// net long interest pushes the contract above spot, net short below.
// hard floor at 1.0 so the contract can never go non-positive.

use crate::impact::{net_impact_pct, ImpactParams};
use crate::ledger::PositionLedger;

pub const CONTRACT_PRICE_FLOOR: f64 = 1.0;

// 4.1: contract = max(spot + spot * impact_pct, 1.0)
pub fn contract_price(spot: f64, total_long: f64, total_short: f64, params: &ImpactParams) -> f64 {
    let impact_pct = net_impact_pct(total_long, total_short, params);
    let price = spot + spot * impact_pct;

    // NaN fails the comparison and lands on the floor too
    if price > CONTRACT_PRICE_FLOOR {
        price
    } else {
        CONTRACT_PRICE_FLOOR
    }
}

pub fn contract_price_for_ledger(spot: f64, ledger: &PositionLedger, params: &ImpactParams) -> f64 {
    contract_price(spot, ledger.total_long(), ledger.total_short(), params)
}
