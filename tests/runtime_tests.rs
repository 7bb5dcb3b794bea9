//! Actor runtime under tokio's paused clock.

use keyword_perps::*;
use std::sync::Arc;
use std::time::Duration;

struct FlatSource;

impl PriceInputSource for FlatSource {
    fn price_inputs(&mut self, _: &InstrumentId, _: Timestamp) -> Result<PriceInputs, FeedError> {
        Ok(PriceInputs::new(100.0, 100.0)?)
    }
}

fn runtime() -> MarketRuntime {
    let clock = Arc::new(TokioClock::anchored_at(Timestamp::from_millis(1_700_000_000_000)));
    MarketRuntime::new(MarketConfig::test(), clock).unwrap().with_seed(5)
}

#[tokio::test(start_paused = true)]
async fn convergence_runs_on_actor_timers() {
    let mut runtime = runtime();
    let id = InstrumentId::new("rust");
    let handle = runtime
        .spawn(id.clone(), PriceInputs::new(100.0, 100.0).unwrap(), PositionLedger::new(), None)
        .unwrap();

    let accepted = handle.trade(100.0, Side::Long).await.unwrap();
    assert!(accepted.convergence.started());
    assert!(handle.quote().await.unwrap().converging);

    tokio::time::sleep(Duration::from_millis(3_100)).await;
    let quote = handle.quote().await.unwrap();
    assert!(!quote.converging);
    assert_eq!(quote.contract_price, 100.0);

    runtime.shutdown_all().await;
}

#[tokio::test(start_paused = true)]
async fn rejected_trade_surfaces_error() {
    let mut runtime = runtime();
    let handle = runtime
        .spawn(InstrumentId::new("guard"), PriceInputs::new(10.0, 10.0).unwrap(), PositionLedger::new(), None)
        .unwrap();

    let result = handle.trade(-3.0, Side::Short).await;
    assert!(matches!(result, Err(EngineError::InvalidTrade(TradeError::NegativeSize(_)))));
    assert_eq!(handle.quote().await.unwrap().ledger, PositionLedger::new());

    runtime.shutdown_all().await;
}

#[tokio::test(start_paused = true)]
async fn series_ticks_while_idle() {
    let mut runtime = runtime();
    let handle = runtime
        .spawn(InstrumentId::new("chart"), PriceInputs::new(50.0, 50.0).unwrap(), PositionLedger::new(), None)
        .unwrap();

    let before = handle.series_snapshot().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let after = handle.series_snapshot().await.unwrap();

    assert_eq!(before.len(), after.len());
    assert_eq!(
        after.last().unwrap().timestamp - before.last().unwrap().timestamp,
        2_000
    );
    assert!(!handle.order_book_snapshot().await.unwrap().asks.is_empty());

    runtime.shutdown_all().await;
}

#[tokio::test(start_paused = true)]
async fn price_updates_publish_quotes() {
    let mut runtime = runtime();
    let handle = runtime
        .spawn(InstrumentId::new("news"), PriceInputs::new(100.0, 100.0).unwrap(), PositionLedger::new(), None)
        .unwrap();
    let mut quotes = handle.subscribe();

    let quote = handle.update_price_inputs(80.0, 70.0).await.unwrap();
    assert_eq!(quote.spot_price, 76.0);

    quotes.changed().await.unwrap();
    assert_eq!(quotes.borrow().spot_price, 76.0);

    assert!(matches!(
        handle.update_price_inputs(-1.0, 1.0).await,
        Err(EngineError::InvalidPrice(_))
    ));

    runtime.shutdown_all().await;
}

#[tokio::test(start_paused = true)]
async fn actors_refresh_from_their_source() {
    let mut runtime = runtime();
    let id = InstrumentId::new("ethereum");
    let handle = runtime
        .spawn_with_source(id.clone(), Box::new(MockTrendFeed::new(FeedParams::default())))
        .unwrap();

    let opening = handle.quote().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10_000)).await;
    let later = handle.quote().await.unwrap();

    assert!(later.timestamp > opening.timestamp);
    let base = 50.0 + (id.seed() % 30) as f64;
    assert!(later.spot_price >= base * 0.85 * 0.96 - 0.01);
    assert!(later.spot_price <= base * 1.15 * 0.96 + 0.01);

    runtime.shutdown_all().await;
    assert!(matches!(handle.quote().await, Err(EngineError::ActorStopped(_))));
}

#[tokio::test(start_paused = true)]
async fn steady_source_leaves_snapped_contract_alone() {
    let mut runtime = runtime();
    let handle = runtime
        .spawn_with_source(InstrumentId::new("steady"), Box::new(FlatSource))
        .unwrap();

    handle.trade(100.0, Side::Long).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_100)).await;
    let settled = handle.quote().await.unwrap();
    assert!(!settled.converging);
    assert_eq!(settled.contract_price, 100.0);

    // several cache expiries with identical inputs
    tokio::time::sleep(Duration::from_millis(6_000)).await;
    let later = handle.quote().await.unwrap();
    assert_eq!(later.spot_price, 100.0);
    assert_eq!(later.contract_price, 100.0);

    runtime.shutdown_all().await;
}
