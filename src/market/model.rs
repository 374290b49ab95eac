//! The shared market model.
//!
//! Holds every venue's coins, pairs, balances, positions and history, the
//! synthetic cross-venue pairs, and the loops of the last evaluation pass.
//! The model is owned by the market owner; [`MarketModel::apply`] is the
//! only mutation path for venue data.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{
    Balance, Coin, CoinId, Cycle, Loop, OrderId, PairKey, Position, PositionFill, Symbol,
    TradePair, VenueId, Volume,
};
use crate::exchange::{ActionPayload, BookSnapshot, Category, IntegrationAction, PairInfo};

/// Everything the model knows about one venue.
#[derive(Debug, Clone, Serialize)]
pub struct VenueData {
    id: VenueId,
    active: bool,
    coins: BTreeMap<Symbol, Coin>,
    pairs: BTreeMap<PairKey, TradePair>,
    balances: BTreeMap<Symbol, Balance>,
    positions: BTreeMap<OrderId, Position>,
    history: BTreeMap<OrderId, PositionFill>,
}

impl VenueData {
    #[must_use]
    pub fn new(id: VenueId) -> Self {
        Self {
            id,
            active: false,
            coins: BTreeMap::new(),
            pairs: BTreeMap::new(),
            balances: BTreeMap::new(),
            positions: BTreeMap::new(),
            history: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &VenueId {
        &self.id
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn coins(&self) -> &BTreeMap<Symbol, Coin> {
        &self.coins
    }

    #[must_use]
    pub fn pairs(&self) -> &BTreeMap<PairKey, TradePair> {
        &self.pairs
    }

    #[must_use]
    pub fn balances(&self) -> &BTreeMap<Symbol, Balance> {
        &self.balances
    }

    #[must_use]
    pub fn positions(&self) -> &BTreeMap<OrderId, Position> {
        &self.positions
    }

    #[must_use]
    pub fn history(&self) -> &BTreeMap<OrderId, PositionFill> {
        &self.history
    }

    fn replace_pairs(&mut self, infos: Vec<PairInfo>, fee: Decimal, interest: &BTreeSet<Symbol>) {
        let mut pairs = BTreeMap::new();
        let mut coins: BTreeMap<Symbol, Coin> = BTreeMap::new();

        for info in infos {
            if !interest.contains(&info.base) || !interest.contains(&info.quote) {
                continue;
            }
            let key = info.key(&self.id);
            let mut pair = self
                .pairs
                .remove(&key)
                .unwrap_or_else(|| TradePair::new(key.clone(), fee));
            pair.set_fee(fee);
            pair.set_ranges(info.base_range, info.quote_range, info.price_range);

            for symbol in [&info.base, &info.quote] {
                let coin = coins.entry(symbol.clone()).or_insert_with(|| {
                    let mut coin = self
                        .coins
                        .remove(symbol)
                        .unwrap_or_else(|| Coin::new(CoinId::new(symbol.clone(), self.id.clone())));
                    coin.unlink_all();
                    coin.of_interest = true;
                    coin
                });
                coin.link_pair(key.clone());
            }
            pairs.insert(key, pair);
        }

        self.balances
            .retain(|symbol, balance| coins.contains_key(symbol) || !balance.total.is_zero());
        for coin in coins.values() {
            self.balances
                .entry(coin.symbol().clone())
                .or_insert_with(|| Balance::empty(coin.id().clone()));
        }
        self.pairs = pairs;
        self.coins = coins;
    }

    fn replace_books(&mut self, snapshots: Vec<BookSnapshot>, at: chrono::DateTime<chrono::Utc>) {
        for snapshot in snapshots {
            let key = PairKey::new(self.id.clone(), snapshot.base, snapshot.quote);
            match self.pairs.get_mut(&key) {
                Some(pair) => pair.update_order_book(snapshot.buys, snapshot.sells, at),
                None => debug!(pair = %key, "Book for unknown pair ignored"),
            }
        }
    }

    fn merge_balances(&mut self, balances: Vec<Balance>) {
        for balance in balances {
            if balance.coin().venue != self.id {
                warn!(venue = %self.id, coin = %balance.coin(), "Balance for foreign coin ignored");
                continue;
            }
            let symbol = balance.coin().symbol.clone();
            match self.balances.get(&symbol) {
                Some(current) if !current.is_superseded_by(&balance) => {
                    debug!(coin = %balance.coin(), "Stale balance dropped");
                }
                _ => {
                    self.balances.insert(symbol, balance);
                }
            }
        }
    }

    fn replace_positions(&mut self, positions: Vec<Position>) {
        let mut next = BTreeMap::new();
        for position in positions {
            let kept = match self.positions.remove(&position.order_id) {
                Some(current) if !current.is_superseded_by(&position) => current,
                _ => position,
            };
            next.insert(kept.order_id, kept);
        }
        self.positions = next;
    }

    fn merge_history(&mut self, fills: Vec<Position>) {
        for fill in fills {
            match self.history.get_mut(&fill.order_id) {
                Some(group) => group.merge(fill),
                None => {
                    self.history.insert(fill.order_id, PositionFill::new(fill));
                }
            }
        }
    }
}

/// The shared market model.
#[derive(Debug, Clone, Serialize)]
pub struct MarketModel {
    venues: BTreeMap<VenueId, VenueData>,
    cross: BTreeMap<PairKey, TradePair>,
    coins_of_interest: BTreeSet<Symbol>,
    cross_depth: Volume,
    cycles: Vec<Cycle>,
    cycles_stale: bool,
    loops: Vec<Loop>,
}

impl MarketModel {
    #[must_use]
    pub fn new(coins_of_interest: BTreeSet<Symbol>, cross_depth: Volume) -> Self {
        Self {
            venues: BTreeMap::new(),
            cross: BTreeMap::new(),
            coins_of_interest,
            cross_depth,
            cycles: Vec::new(),
            cycles_stale: true,
            loops: Vec::new(),
        }
    }

    /// Register a venue so it shows up before its first refresh.
    pub fn add_venue(&mut self, id: VenueId) {
        self.venues.entry(id.clone()).or_insert_with(|| VenueData::new(id));
    }

    /// Integrate one action. Returns the category whose signal should fire.
    pub fn apply(&mut self, action: IntegrationAction) -> Option<Category> {
        let category = action.payload.category();
        let at = action.fetched_at;
        let venue = self
            .venues
            .entry(action.venue.clone())
            .or_insert_with(|| VenueData::new(action.venue.clone()));

        match action.payload {
            ActionPayload::Pairs { pairs, fee } => {
                venue.replace_pairs(pairs, fee, &self.coins_of_interest);
                self.rebuild_cross();
            }
            ActionPayload::MarketData(books) => venue.replace_books(books, at),
            ActionPayload::Balances(balances) => venue.merge_balances(balances),
            ActionPayload::Positions(positions) => venue.replace_positions(positions),
            ActionPayload::TradeHistory(fills) => venue.merge_history(fills),
            ActionPayload::Activated => {
                venue.active = true;
                self.rebuild_cross();
            }
            ActionPayload::Deactivated => {
                venue.active = false;
                self.rebuild_cross();
                self.loops.clear();
            }
        }
        category
    }

    /// Synthetic pairs for every symbol of interest listed on two active venues.
    fn rebuild_cross(&mut self) {
        let mut listed: BTreeMap<&Symbol, Vec<&VenueId>> = BTreeMap::new();
        for venue in self.venues.values().filter(|v| v.active) {
            for symbol in venue.coins.keys() {
                if self.coins_of_interest.contains(symbol) {
                    listed.entry(symbol).or_default().push(&venue.id);
                }
            }
        }

        let mut cross = BTreeMap::new();
        for (symbol, venues) in listed {
            for (i, from) in venues.iter().enumerate() {
                for to in &venues[i + 1..] {
                    let key = PairKey::cross(symbol.clone(), (*from).clone(), (*to).clone());
                    cross.insert(key.clone(), TradePair::cross(key, self.cross_depth));
                }
            }
        }
        self.cross = cross;
        self.cycles_stale = true;
    }

    #[must_use]
    pub fn venues(&self) -> &BTreeMap<VenueId, VenueData> {
        &self.venues
    }

    #[must_use]
    pub fn venue(&self, id: &VenueId) -> Option<&VenueData> {
        self.venues.get(id)
    }

    #[must_use]
    pub fn cross_pairs(&self) -> &BTreeMap<PairKey, TradePair> {
        &self.cross
    }

    #[must_use]
    pub fn coins_of_interest(&self) -> &BTreeSet<Symbol> {
        &self.coins_of_interest
    }

    pub fn set_coins_of_interest(&mut self, coins: BTreeSet<Symbol>) {
        self.coins_of_interest = coins;
        self.rebuild_cross();
    }

    #[must_use]
    pub fn pair(&self, key: &PairKey) -> Option<&TradePair> {
        if key.is_cross() {
            self.cross.get(key)
        } else {
            self.venues.get(&key.venue)?.pairs.get(key)
        }
    }

    #[must_use]
    pub fn balance(&self, coin: &CoinId) -> Option<&Balance> {
        self.venues.get(&coin.venue)?.balances.get(&coin.symbol)
    }

    /// Available balance of `coin`, zero when unknown.
    #[must_use]
    pub fn available(&self, coin: &CoinId) -> Volume {
        self.balance(coin).map_or(Decimal::ZERO, |b| b.available)
    }

    #[must_use]
    pub fn position(&self, venue: &VenueId, order_id: OrderId) -> Option<&Position> {
        self.venues.get(venue)?.positions.get(&order_id)
    }

    #[must_use]
    pub fn fills(&self, venue: &VenueId, order_id: OrderId) -> Option<&PositionFill> {
        self.venues.get(venue)?.history.get(&order_id)
    }

    /// Pairs on active venues (synthetic ones included) whose coins are both of interest.
    pub fn pairs_of_interest(&self) -> impl Iterator<Item = &TradePair> {
        self.venues
            .values()
            .filter(|v| v.active)
            .flat_map(|v| v.pairs.values())
            .chain(self.cross.values())
            .filter(|p| {
                self.coins_of_interest.contains(&p.base().symbol)
                    && self.coins_of_interest.contains(&p.quote().symbol)
            })
    }

    #[must_use]
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Whether the pair graph changed since the last discovery pass.
    #[must_use]
    pub fn cycles_stale(&self) -> bool {
        self.cycles_stale
    }

    pub fn invalidate_cycles(&mut self) {
        self.cycles_stale = true;
    }

    pub fn set_cycles(&mut self, cycles: Vec<Cycle>) {
        self.cycles = cycles;
        self.cycles_stale = false;
    }

    /// Loops of the last evaluation pass, best first.
    #[must_use]
    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    pub fn set_loops(&mut self, loops: Vec<Loop>) {
        self.loops = loops;
    }
}
