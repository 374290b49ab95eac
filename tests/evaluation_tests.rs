mod support;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cyclearb::discovery::{find_cycles, DiscoverySettings};
use cyclearb::domain::{CoinId, Range, VenueId};
use cyclearb::evaluation::{evaluate_all, EvaluationSettings};
use cyclearb::exchange::PairInfo;
use cyclearb::market::MarketModel;
use cyclearb::shutdown::Shutdown;
use support::assertions::assert_decimal_near;
use support::market::{round_trip_market, ModelBuilder};

fn discover_and_evaluate(model: &MarketModel, max_hops: usize) -> Vec<cyclearb::domain::Loop> {
    let shutdown = Shutdown::new();
    let pairs: Vec<_> = model.pairs_of_interest().map(|p| p.key().clone()).collect();
    let cycles = find_cycles(
        &pairs,
        &DiscoverySettings {
            max_hops,
            workers: 2,
        },
        &shutdown.signal(),
    )
    .unwrap();
    evaluate_all(model, &cycles, &EvaluationSettings::default())
}

#[test]
fn round_trip_is_profitable_before_and_after_fees() {
    let loops = discover_and_evaluate(&round_trip_market(Decimal::ZERO, dec!(1000), dec!(100000)), 2);
    assert_eq!(loops.len(), 1);
    assert_eq!(loops[0].profit_ratio, dec!(1.1));

    let loops = discover_and_evaluate(&round_trip_market(dec!(0.0025), dec!(1000), dec!(100000)), 2);
    assert_eq!(loops.len(), 1);
    assert!(loops[0].profit_ratio > Decimal::ONE);
    assert_decimal_near(loops[0].profit_ratio, dec!(1.0945), dec!(0.001));
}

#[test]
fn every_hop_scales_by_the_limiting_balance() {
    let loops = discover_and_evaluate(&round_trip_market(Decimal::ZERO, dec!(50), dec!(100000)), 2);
    let best = &loops[0];

    assert_eq!(best.trade_scale, dec!(0.4995));
    for (scaled, unscaled) in best.scaled_trades().iter().zip(&best.trades) {
        assert_decimal_near(scaled.volume_in, unscaled.volume_in * dec!(0.4995), dec!(0.000001));
    }
}

#[test]
fn scaled_volume_below_minimum_zeroes_the_scale() {
    let mut xy = PairInfo::new("X", "Y");
    xy.quote_range = Range::at_least(dec!(600));
    let model = ModelBuilder::new(&["X", "Y"])
        .venue("alpha", vec![xy, PairInfo::new("Y", "X")], Decimal::ZERO)
        .book("alpha", "X", "Y", (dec!(10), dec!(100)), (dec!(11), dec!(100)))
        .book("alpha", "Y", "X", (dec!(0.11), dec!(2000)), (dec!(0.12), dec!(2000)))
        .balance("alpha", "X", dec!(50))
        .balance("alpha", "Y", dec!(100000))
        .build();

    let loops = discover_and_evaluate(&model, 2);
    let best = &loops[0];
    assert_eq!(best.trade_scale, Decimal::ZERO);
    assert_eq!(best.insufficient, vec![CoinId::new("Y", "alpha")]);
    assert!(!best.is_executable());
}

#[test]
fn cross_venue_spread_is_found_through_synthetic_pairs() {
    let model = ModelBuilder::new(&["BTC", "USDT"])
        .venue("alpha", vec![PairInfo::new("BTC", "USDT")], Decimal::ZERO)
        .venue("beta", vec![PairInfo::new("BTC", "USDT")], Decimal::ZERO)
        .book("alpha", "BTC", "USDT", (dec!(100), dec!(10)), (dec!(101), dec!(10)))
        .book("beta", "BTC", "USDT", (dec!(110), dec!(10)), (dec!(111), dec!(10)))
        .balance("alpha", "USDT", dec!(100000))
        .balance("alpha", "BTC", dec!(100))
        .balance("beta", "USDT", dec!(100000))
        .balance("beta", "BTC", dec!(100))
        .build();

    let loops = discover_and_evaluate(&model, 4);
    assert_eq!(loops.len(), 1);
    let best = &loops[0];
    assert_eq!(best.trades.len(), 4);
    assert_decimal_near(best.profit_ratio, dec!(110) / dec!(101), dec!(0.0001));
    assert!(best.is_executable());
    assert!(best
        .limiting_coin
        .as_ref()
        .map_or(true, |coin| coin.venue != VenueId::cross()));
}
