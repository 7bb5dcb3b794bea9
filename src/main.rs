//! Keyword perpetuals simulation.
//!
//! Walks the pricing pipeline end to end: spot blending, impact-driven
//! contract prices, funding, convergence after trades, and the async
//! per-keyword actors that keep series and books moving.

use anyhow::Context;
use keyword_perps::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENV_VAR: &str = "KEYWORD_PERPS_ENV";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let environment: Environment = match std::env::var(ENV_VAR) {
        Ok(name) => name.parse().with_context(|| format!("{ENV_VAR}={name}"))?,
        Err(_) => Environment::Development,
    };
    let market = environment.config();
    market.validate().context("market config")?;

    println!("Keyword Perpetuals Simulation");
    println!("Environment: {environment:?}\n");

    scenario_1_spot_and_contract(&market)?;
    scenario_2_trade_and_convergence(&market)?;
    scenario_3_debounce(&market)?;
    scenario_4_mock_feed(&market)?;
    scenario_5_book_and_series(&market)?;
    scenario_6_actors(market).await?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyword_perps=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn engine_with(market: &MarketConfig) -> Engine {
    let mut engine = Engine::new(EngineConfig {
        seed: Some(42),
        market: market.clone(),
        ..EngineConfig::default()
    });
    engine.set_time(Timestamp::now());
    engine
}

/// Spot blend and the balanced-ledger contract price.
fn scenario_1_spot_and_contract(market: &MarketConfig) -> anyhow::Result<()> {
    println!("Scenario 1: Spot and Contract Price\n");

    let mut engine = engine_with(market);
    let id = InstrumentId::new("rust");
    engine.list_instrument_with_ledger(
        id.clone(),
        PriceInputs::new(100.0, 90.0)?,
        PositionLedger::with_totals(1000.0, 800.0)?,
    )?;

    let quote = engine.quote(&id)?;
    println!("  realtime 100, monthly 90");
    println!("  spot ${:.2}, contract ${:.2}", quote.spot_price, quote.contract_price);
    println!("  both sides at the 200 impact cap, funding {:.2} bps\n", quote.funding_rate);
    Ok(())
}

/// A long pushes the contract up; the walk brings it back.
fn scenario_2_trade_and_convergence(market: &MarketConfig) -> anyhow::Result<()> {
    println!("Scenario 2: Trade and Convergence\n");

    let mut engine = engine_with(market);
    let id = InstrumentId::new("bitcoin");
    engine.list_instrument(id.clone(), PriceInputs::new(100.0, 100.0)?)?;

    let accepted = engine.on_trade(&id, 100.0, Side::Long)?;
    println!("  long 100 -> impact {}, contract ${:.2}", price_impact(100.0), accepted.contract_price);
    println!("  funding {:.2} bps (capped)", engine.funding_rate(&id)?);

    for _ in 0..4 {
        engine.advance_time(750);
        println!(
            "  +750ms contract ${:.2}, converging: {}",
            engine.contract_price(&id)?,
            engine.is_converging(&id)?
        );
    }
    println!();
    Ok(())
}

/// Two trades inside the debounce window start one walk.
fn scenario_3_debounce(market: &MarketConfig) -> anyhow::Result<()> {
    println!("Scenario 3: Debounced Convergence\n");

    let mut engine = engine_with(market);
    let id = InstrumentId::new("ai");
    engine.list_instrument(id.clone(), PriceInputs::new(80.0, 70.0)?)?;

    let first = engine.on_trade(&id, 40.0, Side::Short)?;
    engine.advance_time(100);
    let second = engine.on_trade(&id, 40.0, Side::Short)?;
    println!("  first: {:?}", first.convergence);
    println!("  second: {:?}", second.convergence);

    match engine.on_trade(&id, -1.0, Side::Long) {
        Err(err) => println!("  negative size rejected: {err}"),
        Ok(_) => println!("  negative size accepted?"),
    }
    println!();
    Ok(())
}

/// Keyword-seeded mock trends through the TTL cache.
fn scenario_4_mock_feed(market: &MarketConfig) -> anyhow::Result<()> {
    println!("Scenario 4: Mock Trend Feed\n");

    let mut engine = engine_with(market);
    let mut feed = MockTrendFeed::new(market.feed.clone());
    let id = InstrumentId::new("ethereum");
    engine.list_from_source(id.clone(), &mut feed)?;

    for _ in 0..5 {
        engine.advance_time(market.feed.cache_ttl_ms);
        let quote = engine.refresh_price_inputs(&id, &mut feed)?;
        println!("  spot ${:.2}, contract ${:.2}", quote.spot_price, quote.contract_price);
    }
    println!();
    Ok(())
}

/// Series ticks, book redraws and synthetic fills on the engine clock.
fn scenario_5_book_and_series(market: &MarketConfig) -> anyhow::Result<()> {
    println!("Scenario 5: Order Book and Series\n");

    let mut engine = engine_with(market);
    let id = InstrumentId::new("solana");
    engine.list_instrument(id.clone(), PriceInputs::new(60.0, 55.0)?)?;

    let report = engine.advance_time(10_000);
    let fills = report
        .for_instrument(&id)
        .filter(|timer| matches!(timer.event, TimerEvent::Fill(_)))
        .count();
    println!("  10s elapsed: {} timer firings, {} fills", report.len(), fills);

    let book = engine.order_book_snapshot(&id)?;
    println!(
        "  book: {} bids / {} asks, spread {:?}, mid {:?}",
        book.bids.len(),
        book.asks.len(),
        book.spread(),
        book.mid_price()
    );
    let series = engine.series_snapshot(&id)?;
    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        println!("  series: {} samples, {:.2} -> {:.2}\n", series.len(), first.spot, last.spot);
    }
    Ok(())
}

/// Same models, one tokio task per keyword.
async fn scenario_6_actors(market: MarketConfig) -> anyhow::Result<()> {
    println!("Scenario 6: Instrument Actors\n");

    let feed_params = market.feed.clone();
    let mut runtime = MarketRuntime::new(market, Arc::new(SystemClock))?;

    let keywords = ["rust", "python", "golang"];
    let mut handles = Vec::new();
    for keyword in keywords {
        let handle = runtime.spawn_with_source(
            InstrumentId::new(keyword),
            Box::new(MockTrendFeed::new(feed_params.clone())),
        )?;
        handles.push(handle);
    }

    for handle in &handles {
        handle.trade(25.0, Side::Long).await?;
    }
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    for handle in &handles {
        let quote = handle.quote().await?;
        println!(
            "  {}: spot ${:.2}, contract ${:.2}, funding {:.2}%, converging {}",
            quote.instrument, quote.spot_price, quote.contract_price, quote.display_funding_rate, quote.converging
        );
    }

    runtime.shutdown_all().await;
    Ok(())
}
