// 8.0: synchronous market engine. owns every listed keyword, routes trades and
// price inputs, fires timers on an explicit clock and keeps the audit log.
// deterministic when seeded; no I/O.

mod config;
mod core;
mod pricing;
mod queries;
mod results;
mod timers;
mod trading;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{EngineError, TimerReport};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convergence::ConvergenceTrigger;
    use crate::events::EventPayload;
    use crate::feed::{FeedParams, MockTrendFeed};
    use crate::ledger::{PositionLedger, TradeError};
    use crate::spot::PriceInputs;
    use crate::types::{InstrumentId, Side, Timestamp};

    fn engine() -> (Engine, InstrumentId) {
        let mut engine = Engine::new(EngineConfig::deterministic(7));
        engine.set_time(Timestamp::from_millis(1_700_000_000_000));
        let id = InstrumentId::new("rust");
        engine
            .list_instrument(id.clone(), PriceInputs::new(100.0, 90.0).unwrap())
            .unwrap();
        (engine, id)
    }

    #[test]
    fn test_listing_and_queries() {
        let (engine, id) = engine();
        assert_eq!(engine.spot_price(&id).unwrap(), 96.0);
        assert_eq!(engine.contract_price(&id).unwrap(), 96.0);
        assert_eq!(engine.funding_rate(&id).unwrap(), 0.0);
        assert_eq!(engine.series_snapshot(&id).unwrap().len(), 16);
        assert_eq!(engine.instrument_count(), 1);
        assert!(matches!(
            engine.events().iter().next().unwrap().payload,
            EventPayload::InstrumentListed(_)
        ));
    }

    #[test]
    fn test_default_clock_keeps_series_grid() {
        let mut engine = Engine::new(EngineConfig::deterministic(1));
        let id = InstrumentId::new("fresh");
        engine
            .list_instrument(id.clone(), PriceInputs::new(10.0, 10.0).unwrap())
            .unwrap();
        engine.advance_time(500);

        let series = engine.series_snapshot(&id).unwrap();
        assert_eq!(series.len(), 16);
        for pair in series.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, 2_000);
        }
        assert_eq!(series.last().unwrap().timestamp, engine.time().as_unsigned_millis());
    }

    #[test]
    fn test_listing_before_grid_origin_rejected() {
        let mut engine = Engine::new(EngineConfig::deterministic(1));
        engine.set_time(Timestamp::from_millis(0));
        let result = engine.list_instrument(InstrumentId::new("early"), PriceInputs::new(1.0, 1.0).unwrap());
        assert!(matches!(
            result,
            Err(EngineError::ClockBeforeSeriesGrid { earliest, .. }) if earliest == Timestamp::from_millis(30_000)
        ));

        engine.set_time(Timestamp::from_millis(30_000));
        engine
            .list_instrument(InstrumentId::new("early"), PriceInputs::new(1.0, 1.0).unwrap())
            .unwrap();
        let series = engine.series_snapshot(&InstrumentId::new("early")).unwrap();
        assert_eq!(series.first().unwrap().timestamp, 0);
        assert_eq!(series.last().unwrap().timestamp, 30_000);
    }

    #[test]
    fn test_duplicate_listing_rejected() {
        let (mut engine, id) = engine();
        let result = engine.list_instrument(id, PriceInputs::new(1.0, 1.0).unwrap());
        assert!(matches!(result, Err(EngineError::InstrumentExists(_))));
    }

    #[test]
    fn test_unknown_instrument() {
        let (mut engine, _) = engine();
        let missing = InstrumentId::new("missing");
        assert!(matches!(engine.spot_price(&missing), Err(EngineError::InstrumentNotFound(_))));
        assert!(matches!(
            engine.on_trade(&missing, 10.0, Side::Long),
            Err(EngineError::InstrumentNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_config_blocks_listing() {
        let mut config = EngineConfig::default();
        config.market.spot_weights.realtime_weight = 10;
        let mut engine = Engine::new(config);
        let result = engine.list_instrument(InstrumentId::new("x"), PriceInputs::new(1.0, 1.0).unwrap());
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejected_trade_leaves_ledger() {
        let (mut engine, id) = engine();
        let result = engine.on_trade(&id, -5.0, Side::Long);
        assert!(matches!(result, Err(EngineError::InvalidTrade(TradeError::NegativeSize(_)))));
        assert_eq!(engine.ledger(&id).unwrap(), PositionLedger::new());
        assert!(matches!(
            engine.recent_events(1)[0].payload,
            EventPayload::TradeRejected(_)
        ));
    }

    #[test]
    fn test_trade_then_converge() {
        let (mut engine, id) = engine();
        let accepted = engine.on_trade(&id, 100.0, Side::Long).unwrap();
        assert!(accepted.convergence.started());
        assert!(engine.is_converging(&id).unwrap());

        let report = engine.advance_time(3_000);
        assert!(!report.is_empty());
        assert!(!engine.is_converging(&id).unwrap());
        assert_eq!(engine.contract_price(&id).unwrap(), 96.0);
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e.payload, EventPayload::ConvergenceFinished(_))));
    }

    #[test]
    fn test_debounced_second_trade() {
        let (mut engine, id) = engine();
        engine.on_trade(&id, 10.0, Side::Long).unwrap();
        engine.advance_time(100);
        let second = engine.on_trade(&id, 10.0, Side::Short).unwrap();
        assert!(matches!(
            second.convergence,
            ConvergenceTrigger::Debounced { .. } | ConvergenceTrigger::AlreadyConverging
        ));
    }

    #[test]
    fn test_price_update_reprices() {
        let (mut engine, id) = engine();
        let quote = engine.update_price_inputs(&id, 50.0, 50.0).unwrap();
        assert_eq!(quote.spot_price, 50.0);
        assert_eq!(quote.contract_price, 50.0);
        assert!(matches!(
            engine.update_price_inputs(&id, f64::NAN, 1.0),
            Err(EngineError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_refresh_from_mock_feed() {
        let (mut engine, id) = engine();
        let mut feed = MockTrendFeed::new(FeedParams::default());
        // listing primed the cache, so nothing is fetched inside the TTL
        let quote = engine.refresh_price_inputs(&id, &mut feed).unwrap();
        assert_eq!(quote.spot_price, 96.0);
        let input_events = |engine: &Engine| {
            engine
                .events()
                .iter()
                .filter(|e| matches!(e.payload, EventPayload::PriceInputsUpdated(_)))
                .count()
        };
        assert_eq!(input_events(&engine), 0);

        engine.advance_time(2_000);
        let quote = engine.refresh_price_inputs(&id, &mut feed).unwrap();
        let base = feed.base_price(&id).unwrap();
        assert!(quote.spot_price > base * 0.5 && quote.spot_price < base * 1.2);
        assert_eq!(input_events(&engine), 1);
    }

    #[test]
    fn test_timers_emit_book_events() {
        let (mut engine, id) = engine();
        let report = engine.advance_time(4_000);
        assert!(report.for_instrument(&id).count() >= 8);
        let regens = engine
            .events()
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::OrderBookRegenerated(_)))
            .count();
        assert_eq!(regens, 2);
        assert!(engine.next_deadline().unwrap() > engine.time());
    }

    #[test]
    fn test_reset_and_delist() {
        let (mut engine, id) = engine();
        engine.on_trade(&id, 100.0, Side::Short).unwrap();
        assert!(engine.reset_convergence(&id).unwrap());
        assert!(!engine.reset_convergence(&id).unwrap());

        let removed = engine.delist_instrument(&id).unwrap();
        assert_eq!(removed.id(), &id);
        assert!(engine.get_instrument(&id).is_none());
        assert!(matches!(engine.delist_instrument(&id), Err(EngineError::InstrumentNotFound(_))));
    }
}
