mod support;

use rust_decimal_macros::dec;

use cyclearb::adapter::paper::PaperOperation;
use cyclearb::domain::{Direction, PairKey, VenueId};
use cyclearb::exchange::VenueStatus;
use support::assertions::eventually;
use support::runtime::{engine_section, start, stop, ROUND_TRIP_VENUE, TIMEOUT};

fn alpha() -> VenueId {
    VenueId::from("alpha")
}

#[tokio::test]
async fn operator_sees_integrated_venue_data() {
    let runtime = start(&(engine_section(false, true) + ROUND_TRIP_VENUE)).await;
    let operator = runtime.operator().clone();

    eventually("profitable loop", TIMEOUT, || {
        let operator = operator.clone();
        async move { operator.loops().await.is_ok_and(|loops| !loops.is_empty()) }
    })
    .await;

    let pairs = operator.pairs().await.unwrap();
    assert_eq!(pairs.len(), 2);
    let balances = operator.balances().await.unwrap();
    assert!(balances.iter().any(|b| b.total == dec!(1000)));
    assert_eq!(operator.coins().await.unwrap().len(), 2);
    eventually("connected", TIMEOUT, || {
        let venues = operator.venues();
        async move { venues.len() == 1 && venues[0].active && venues[0].status == VenueStatus::Connected }
    })
    .await;

    let best = &operator.loops().await.unwrap()[0];
    assert_eq!(best.profit_ratio, dec!(1.1));

    stop(runtime).await;
}

#[tokio::test]
async fn enabling_trading_executes_the_best_loop() {
    let runtime = start(&(engine_section(false, true) + ROUND_TRIP_VENUE)).await;
    let operator = runtime.operator().clone();
    let paper = runtime.paper(&alpha()).unwrap().clone();

    eventually("profitable loop", TIMEOUT, || {
        let operator = operator.clone();
        async move { operator.loops().await.is_ok_and(|loops| !loops.is_empty()) }
    })
    .await;
    assert!(paper.order_log().is_empty());

    operator.set_trading_enabled(true);
    eventually("both hops placed", TIMEOUT, || {
        let placed = paper.order_log().len();
        async move { placed >= 2 }
    })
    .await;

    let placed = paper.order_log();
    let xy = PairKey::new("alpha", "X", "Y");
    let yx = PairKey::new("alpha", "Y", "X");
    assert!(placed[..2].iter().any(|o| o.pair == xy && o.direction == Direction::BaseToQuote));
    assert!(placed[..2].iter().any(|o| o.pair == yx && o.direction == Direction::BaseToQuote));
    assert!(operator.history().await.is_ok());

    stop(runtime).await;
}

#[tokio::test]
async fn dry_run_never_places_loop_orders() {
    let toml = format!("dry_run = true\n{}{}", engine_section(true, true), ROUND_TRIP_VENUE);
    let runtime = start(&toml).await;
    let operator = runtime.operator().clone();
    let paper = runtime.paper(&alpha()).unwrap().clone();

    eventually("profitable loop", TIMEOUT, || {
        let operator = operator.clone();
        async move { operator.loops().await.is_ok_and(|loops| !loops.is_empty()) }
    })
    .await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    assert!(paper.order_log().is_empty());
    assert!(operator.flags().dry_run);
    stop(runtime).await;
}

#[tokio::test]
async fn failed_placement_halts_trading_and_loop_finding() {
    let runtime = start(&(engine_section(false, true) + ROUND_TRIP_VENUE)).await;
    let operator = runtime.operator().clone();
    let paper = runtime.paper(&alpha()).unwrap().clone();

    eventually("profitable loop", TIMEOUT, || {
        let operator = operator.clone();
        async move { operator.loops().await.is_ok_and(|loops| !loops.is_empty()) }
    })
    .await;

    paper.fail_next(PaperOperation::CreateOrder);
    operator.set_trading_enabled(true);
    eventually("halt", TIMEOUT, || {
        let halted = operator.flags().halt_reason.is_some();
        async move { halted }
    })
    .await;

    let flags = operator.flags();
    assert!(!flags.trading_enabled);
    assert!(!flags.loop_finder_running);
    stop(runtime).await;
}

#[tokio::test]
async fn failing_refresh_deactivates_venue() {
    let runtime = start(&(engine_section(false, false) + ROUND_TRIP_VENUE)).await;
    let operator = runtime.operator().clone();
    let paper = runtime.paper(&alpha()).unwrap().clone();

    eventually("connected", TIMEOUT, || {
        let connected = operator.venues()[0].status == VenueStatus::Connected;
        async move { connected }
    })
    .await;

    paper.fail_next(PaperOperation::FetchBalances);
    eventually("error status", TIMEOUT, || {
        let view = operator.venues()[0].clone();
        async move { view.status == VenueStatus::Error && !view.active }
    })
    .await;

    operator.set_venue_active(&alpha(), true).await.unwrap();
    eventually("reconnected", TIMEOUT, || {
        let connected = operator.venues()[0].status == VenueStatus::Connected;
        async move { connected }
    })
    .await;

    operator.set_venue_active(&alpha(), false).await.unwrap();
    assert_eq!(operator.venues()[0].status, VenueStatus::Stopped);
    stop(runtime).await;
}

#[tokio::test]
async fn shutdown_stops_every_task() {
    let runtime = start(&(engine_section(false, true) + ROUND_TRIP_VENUE)).await;
    let operator = runtime.operator().clone();
    stop(runtime).await;

    assert!(operator.loops().await.is_err());
}
