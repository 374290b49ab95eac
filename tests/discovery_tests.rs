use cyclearb::discovery::{find_cycles, DiscoverySettings};
use cyclearb::domain::{CoinId, Cycle, PairKey};
use cyclearb::shutdown::Shutdown;

fn settings(max_hops: usize) -> DiscoverySettings {
    DiscoverySettings {
        max_hops,
        workers: 4,
    }
}

fn triangle() -> Vec<PairKey> {
    vec![
        PairKey::new("alpha", "BTC", "USDT"),
        PairKey::new("alpha", "ETH", "BTC"),
        PairKey::new("alpha", "ETH", "USDT"),
    ]
}

#[test]
fn triangle_is_found_once_from_every_seed() {
    let shutdown = Shutdown::new();
    let cycles = find_cycles(&triangle(), &settings(3), &shutdown.signal()).unwrap();

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 3);
    assert!(cycles[0].has_real_leg());
}

#[test]
fn rotations_share_one_canonical_key() {
    let btc = CoinId::new("BTC", "alpha");
    let eth = CoinId::new("ETH", "alpha");
    let usdt = CoinId::new("USDT", "alpha");
    let [bu, eb, eu] = [
        PairKey::new("alpha", "BTC", "USDT"),
        PairKey::new("alpha", "ETH", "BTC"),
        PairKey::new("alpha", "ETH", "USDT"),
    ];

    let a = Cycle::new(
        vec![btc.clone(), usdt.clone(), eth.clone()],
        vec![bu.clone(), eu.clone(), eb.clone()],
    )
    .unwrap();
    let b = Cycle::new(vec![eth, btc, usdt], vec![eb, bu, eu]).unwrap();
    assert_eq!(a.key(), b.key());
}

#[test]
fn hop_cap_limits_cycle_length() {
    let shutdown = Shutdown::new();
    let mut pairs = triangle();
    pairs.push(PairKey::new("alpha", "X", "USDT"));
    pairs.push(PairKey::new("alpha", "X", "BTC"));

    let short = find_cycles(&pairs, &settings(2), &shutdown.signal()).unwrap();
    assert!(short.is_empty());

    let three = find_cycles(&pairs, &settings(3), &shutdown.signal()).unwrap();
    assert_eq!(three.len(), 2);
    assert!(three.iter().all(|c| c.len() == 3));

    let four = find_cycles(&pairs, &settings(4), &shutdown.signal()).unwrap();
    assert!(four.iter().any(|c| c.len() == 4));
    assert!(four.len() > three.len());
}

#[test]
fn cross_pairs_join_venues_but_never_seed() {
    let shutdown = Shutdown::new();
    let pairs = vec![
        PairKey::new("alpha", "BTC", "USDT"),
        PairKey::new("beta", "BTC", "USDT"),
        PairKey::cross("BTC", "alpha", "beta"),
        PairKey::cross("USDT", "alpha", "beta"),
    ];

    let cycles = find_cycles(&pairs, &settings(4), &shutdown.signal()).unwrap();
    assert_eq!(cycles.len(), 1);
    let cycle = &cycles[0];
    assert_eq!(cycle.len(), 4);
    assert_eq!(cycle.pairs().iter().filter(|p| p.is_cross()).count(), 2);

    let only_cross: Vec<_> = pairs.iter().filter(|p| p.is_cross()).cloned().collect();
    assert!(find_cycles(&only_cross, &settings(4), &shutdown.signal())
        .unwrap()
        .is_empty());
}

#[test]
fn raised_shutdown_cancels_search() {
    let shutdown = Shutdown::new();
    shutdown.trigger();
    let err = find_cycles(&triangle(), &settings(3), &shutdown.signal()).unwrap_err();
    assert!(err.is_cancelled());
}
