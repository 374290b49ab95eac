use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use cyclearb::domain::{Balance, CoinId, Order, Symbol, VenueId, Volume};
use cyclearb::exchange::{ActionPayload, BookSnapshot, IntegrationAction, PairInfo};
use cyclearb::market::MarketModel;

/// Builds a [`MarketModel`] by applying integration actions, the same way
/// the owner does.
pub struct ModelBuilder {
    model: MarketModel,
}

impl ModelBuilder {
    pub fn new(coins: &[&str]) -> Self {
        let interest: BTreeSet<Symbol> = coins.iter().map(|c| Symbol::new(c)).collect();
        Self {
            model: MarketModel::new(interest, dec!(1000000)),
        }
    }

    fn apply(mut self, venue: &str, at: DateTime<Utc>, payload: ActionPayload) -> Self {
        self.model
            .apply(IntegrationAction::new(VenueId::from(venue), at, payload));
        self
    }

    /// Activate `venue` and list `pairs` on it.
    pub fn venue(self, venue: &str, pairs: Vec<PairInfo>, fee: Decimal) -> Self {
        self.apply(venue, Utc::now(), ActionPayload::Activated)
            .apply(venue, Utc::now(), ActionPayload::Pairs { pairs, fee })
    }

    /// One bid and one ask level on `base/quote`.
    pub fn book(self, venue: &str, base: &str, quote: &str, bid: (Decimal, Volume), ask: (Decimal, Volume)) -> Self {
        let snapshot = BookSnapshot {
            base: Symbol::new(base),
            quote: Symbol::new(quote),
            buys: vec![Order::new(bid.0, bid.1)],
            sells: vec![Order::new(ask.0, ask.1)],
        };
        self.apply(venue, Utc::now(), ActionPayload::MarketData(vec![snapshot]))
    }

    pub fn balance(self, venue: &str, symbol: &str, total: Volume) -> Self {
        let at = Utc::now();
        let balance = Balance::new(CoinId::new(symbol, venue), total, at);
        self.apply(venue, at, ActionPayload::Balances(vec![balance]))
    }

    pub fn build(self) -> MarketModel {
        self.model
    }
}

/// The two-pair market X/Y (bid 10 x 100 X) and Y/X (bid 0.11 x 2000 Y) on `alpha`.
pub fn round_trip_market(fee: Decimal, x: Volume, y: Volume) -> MarketModel {
    ModelBuilder::new(&["X", "Y"])
        .venue("alpha", vec![PairInfo::new("X", "Y"), PairInfo::new("Y", "X")], fee)
        .book("alpha", "X", "Y", (dec!(10), dec!(100)), (dec!(11), dec!(100)))
        .book("alpha", "Y", "X", (dec!(0.11), dec!(2000)), (dec!(0.12), dec!(2000)))
        .balance("alpha", "X", x)
        .balance("alpha", "Y", y)
        .build()
}
