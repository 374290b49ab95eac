//! In-memory paper venue.
//!
//! Serves seeded pairs, books and balances, and simulates order handling:
//! orders crossing the top of the book fill at their limit price, all others
//! rest until [`PaperVenue::fill_resting`] or a cancel. Failures can be
//! injected per operation.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{
    Balance, CoinId, Direction, Order, OrderId, PairKey, Position, Symbol, TradeId, VenueId,
    Volume,
};
use crate::error::{Result, VenueError};
use crate::exchange::{BookSnapshot, OrderRequest, OrderResult, PairInfo, VenueClient};

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperOperation {
    FetchPairs,
    FetchMarketData,
    FetchBalances,
    FetchPositions,
    FetchTradeHistory,
    CreateOrder,
    CancelOrder,
}

impl PaperOperation {
    fn name(self) -> &'static str {
        match self {
            Self::FetchPairs => "fetch_pairs",
            Self::FetchMarketData => "fetch_market_data",
            Self::FetchBalances => "fetch_balances",
            Self::FetchPositions => "fetch_positions",
            Self::FetchTradeHistory => "fetch_trade_history",
            Self::CreateOrder => "create_order",
            Self::CancelOrder => "cancel_order",
        }
    }
}

#[derive(Debug, Default)]
struct Book {
    buys: Vec<Order>,
    sells: Vec<Order>,
}

#[derive(Debug, Default)]
struct PaperState {
    pairs: Vec<PairInfo>,
    books: BTreeMap<(Symbol, Symbol), Book>,
    totals: BTreeMap<Symbol, Volume>,
    held: BTreeMap<Symbol, Volume>,
    open: BTreeMap<OrderId, Position>,
    history: Vec<Position>,
    log: Vec<OrderRequest>,
    failures: Vec<PaperOperation>,
    next_order: u64,
    next_trade: u64,
}

impl PaperState {
    fn available(&self, symbol: &Symbol) -> Volume {
        self.totals.get(symbol).copied().unwrap_or_default()
            - self.held.get(symbol).copied().unwrap_or_default()
    }

    fn adjust(map: &mut BTreeMap<Symbol, Volume>, symbol: &Symbol, delta: Volume) {
        *map.entry(symbol.clone()).or_default() += delta;
    }

    /// Coin spent by an order and how much of it.
    fn spend(direction: Direction, pair: &PairKey, volume: Volume, price: Decimal) -> (Symbol, Volume) {
        match direction {
            Direction::BaseToQuote => (pair.base.symbol.clone(), volume),
            Direction::QuoteToBase => (pair.quote.symbol.clone(), volume * price),
        }
    }

    fn settle(&mut self, order_id: OrderId, pair: &PairKey, direction: Direction, volume: Volume, price: Decimal) -> TradeId {
        let quote = volume * price;
        let (base_delta, quote_delta) = match direction {
            Direction::BaseToQuote => (-volume, quote),
            Direction::QuoteToBase => (volume, -quote),
        };
        Self::adjust(&mut self.totals, &pair.base.symbol, base_delta);
        Self::adjust(&mut self.totals, &pair.quote.symbol, quote_delta);

        self.next_trade += 1;
        let trade_id = TradeId::new(self.next_trade);
        self.history.push(Position::fill(
            order_id,
            trade_id,
            pair.clone(),
            direction,
            price,
            volume,
            Utc::now(),
        ));
        trade_id
    }

    fn crosses(&self, pair: &PairKey, direction: Direction, price: Decimal) -> bool {
        let Some(book) = self.books.get(&(pair.base.symbol.clone(), pair.quote.symbol.clone())) else {
            return false;
        };
        match direction {
            Direction::BaseToQuote => book.buys.iter().map(Order::price).max().is_some_and(|bid| bid >= price),
            Direction::QuoteToBase => book.sells.iter().map(Order::price).min().is_some_and(|ask| ask <= price),
        }
    }
}

/// A scriptable in-memory venue.
#[derive(Debug)]
pub struct PaperVenue {
    id: VenueId,
    state: Mutex<PaperState>,
}

impl PaperVenue {
    pub fn new(id: impl Into<VenueId>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(PaperState::default()),
        }
    }

    /// List a pair. Relisting replaces its ranges.
    pub fn add_pair(&self, info: PairInfo) {
        let mut state = self.state.lock();
        state.pairs.retain(|p| p.base != info.base || p.quote != info.quote);
        state.pairs.push(info);
    }

    pub fn set_book(&self, base: &str, quote: &str, buys: Vec<Order>, sells: Vec<Order>) {
        self.state
            .lock()
            .books
            .insert((Symbol::from(base), Symbol::from(quote)), Book { buys, sells });
    }

    pub fn set_balance(&self, symbol: &str, total: Volume) {
        self.state.lock().totals.insert(Symbol::from(symbol), total);
    }

    /// Total balance of `symbol`, held amounts included.
    #[must_use]
    pub fn balance(&self, symbol: &str) -> Volume {
        self.state
            .lock()
            .totals
            .get(&Symbol::from(symbol))
            .copied()
            .unwrap_or_default()
    }

    /// Make the next call of `operation` fail with a transport error.
    pub fn fail_next(&self, operation: PaperOperation) {
        self.state.lock().failures.push(operation);
    }

    /// Every order request received, in arrival order.
    #[must_use]
    pub fn order_log(&self) -> Vec<OrderRequest> {
        self.state.lock().log.clone()
    }

    #[must_use]
    pub fn open_orders(&self) -> Vec<Position> {
        self.state.lock().open.values().cloned().collect()
    }

    /// Simulate a counterparty taking the whole resting order.
    pub fn fill_resting(&self, order_id: OrderId) -> Result<TradeId> {
        let mut state = self.state.lock();
        let position = state.open.remove(&order_id).ok_or_else(|| VenueError::UnknownOrder {
            venue: self.id.clone(),
            order_id,
        })?;
        let (symbol, amount) = PaperState::spend(position.direction, &position.pair, position.remaining, position.price);
        PaperState::adjust(&mut state.held, &symbol, -amount);
        let trade_id = state.settle(order_id, &position.pair, position.direction, position.remaining, position.price);
        debug!(venue = %self.id, order_id = %order_id, "Resting order filled");
        Ok(trade_id)
    }

    fn check(&self, state: &mut PaperState, operation: PaperOperation) -> Result<()> {
        if let Some(i) = state.failures.iter().position(|op| *op == operation) {
            state.failures.remove(i);
            return Err(VenueError::Transport {
                venue: self.id.clone(),
                operation: operation.name(),
                reason: "injected failure".into(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl VenueClient for PaperVenue {
    fn venue(&self) -> &VenueId {
        &self.id
    }

    async fn fetch_pairs(&self, coins_of_interest: &BTreeSet<Symbol>) -> Result<Vec<PairInfo>> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::FetchPairs)?;
        Ok(state
            .pairs
            .iter()
            .filter(|p| coins_of_interest.contains(&p.base) && coins_of_interest.contains(&p.quote))
            .cloned()
            .collect())
    }

    async fn fetch_market_data(&self, pairs: &[PairInfo]) -> Result<Vec<BookSnapshot>> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::FetchMarketData)?;
        Ok(pairs
            .iter()
            .filter_map(|p| {
                state.books.get(&(p.base.clone(), p.quote.clone())).map(|book| BookSnapshot {
                    base: p.base.clone(),
                    quote: p.quote.clone(),
                    buys: book.buys.clone(),
                    sells: book.sells.clone(),
                })
            })
            .collect())
    }

    async fn fetch_balances(&self) -> Result<Vec<Balance>> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::FetchBalances)?;
        let now = Utc::now();
        Ok(state
            .totals
            .iter()
            .map(|(symbol, total)| {
                let held = state.held.get(symbol).copied().unwrap_or_default();
                Balance::with_components(
                    CoinId::new(symbol.clone(), self.id.clone()),
                    *total,
                    held,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    now,
                )
            })
            .collect())
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::FetchPositions)?;
        Ok(state.open.values().cloned().collect())
    }

    async fn fetch_trade_history(&self) -> Result<Vec<Position>> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::FetchTradeHistory)?;
        Ok(state.history.clone())
    }

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::CreateOrder)?;
        state.log.push(order.clone());

        let listed = state
            .pairs
            .iter()
            .any(|p| p.base == order.pair.base.symbol && p.quote == order.pair.quote.symbol);
        if !listed || order.pair.venue != self.id {
            return Err(VenueError::Rejected {
                venue: self.id.clone(),
                reason: format!("unknown pair {}", order.pair),
            }
            .into());
        }

        let (symbol, amount) = PaperState::spend(order.direction, &order.pair, order.volume, order.price);
        if state.available(&symbol) < amount {
            return Err(VenueError::Rejected {
                venue: self.id.clone(),
                reason: format!("insufficient {symbol}: need {amount}"),
            }
            .into());
        }

        state.next_order += 1;
        let order_id = OrderId::new(state.next_order);

        if state.crosses(&order.pair, order.direction, order.price) {
            let trade_id = state.settle(order_id, &order.pair, order.direction, order.volume, order.price);
            return Ok(OrderResult {
                order_id: None,
                trade_ids: vec![trade_id],
            });
        }

        PaperState::adjust(&mut state.held, &symbol, amount);
        state.open.insert(
            order_id,
            Position::open(order_id, order.pair.clone(), order.direction, order.price, order.volume, Utc::now()),
        );
        Ok(OrderResult {
            order_id: Some(order_id),
            trade_ids: Vec::new(),
        })
    }

    async fn cancel_order(&self, pair: &PairKey, order_id: OrderId) -> Result<()> {
        let mut state = self.state.lock();
        self.check(&mut state, PaperOperation::CancelOrder)?;
        let position = state.open.remove(&order_id).ok_or_else(|| VenueError::UnknownOrder {
            venue: self.id.clone(),
            order_id,
        })?;
        debug_assert_eq!(&position.pair, pair);
        let (symbol, amount) = PaperState::spend(position.direction, &position.pair, position.remaining, position.price);
        PaperState::adjust(&mut state.held, &symbol, -amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn venue() -> PaperVenue {
        let venue = PaperVenue::new("alpha");
        venue.add_pair(PairInfo::new("BTC", "USDT"));
        venue.set_book(
            "BTC",
            "USDT",
            vec![Order::new(dec!(100), dec!(5))],
            vec![Order::new(dec!(101), dec!(5))],
        );
        venue.set_balance("BTC", dec!(10));
        venue.set_balance("USDT", dec!(1000));
        venue
    }

    fn request(direction: Direction, volume: Volume, price: Decimal) -> OrderRequest {
        OrderRequest {
            pair: PairKey::new("alpha", "BTC", "USDT"),
            direction,
            volume,
            price,
        }
    }

    #[tokio::test]
    async fn crossing_order_fills_immediately() {
        let venue = venue();
        let result = venue
            .create_order(&request(Direction::BaseToQuote, dec!(2), dec!(100)))
            .await
            .unwrap();

        assert!(result.order_id.is_none());
        assert_eq!(result.trade_ids.len(), 1);
        assert_eq!(venue.balance("BTC"), dec!(8));
        assert_eq!(venue.balance("USDT"), dec!(1200));
        assert_eq!(venue.fetch_trade_history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resting_order_holds_funds_until_filled() {
        let venue = venue();
        let result = venue
            .create_order(&request(Direction::QuoteToBase, dec!(2), dec!(90)))
            .await
            .unwrap();
        let order_id = result.order_id.unwrap();

        let balances = venue.fetch_balances().await.unwrap();
        let usdt = balances.iter().find(|b| b.coin().symbol.as_str() == "USDT").unwrap();
        assert_eq!(usdt.held, dec!(180));
        assert_eq!(usdt.available, dec!(820));
        assert_eq!(venue.fetch_positions().await.unwrap().len(), 1);

        venue.fill_resting(order_id).unwrap();
        assert!(venue.open_orders().is_empty());
        assert_eq!(venue.balance("BTC"), dec!(12));
        assert_eq!(venue.balance("USDT"), dec!(820));
    }

    #[tokio::test]
    async fn cancel_releases_hold() {
        let venue = venue();
        let order_id = venue
            .create_order(&request(Direction::BaseToQuote, dec!(1), dec!(150)))
            .await
            .unwrap()
            .order_id
            .unwrap();
        venue
            .cancel_order(&PairKey::new("alpha", "BTC", "USDT"), order_id)
            .await
            .unwrap();

        let err = venue
            .cancel_order(&PairKey::new("alpha", "BTC", "USDT"), order_id)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown order"));
        assert_eq!(venue.balance("BTC"), dec!(10));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let venue = venue();
        venue.fail_next(PaperOperation::FetchBalances);
        assert!(venue.fetch_balances().await.is_err());
        assert!(venue.fetch_balances().await.is_ok());
    }

    #[tokio::test]
    async fn insufficient_balance_is_rejected() {
        let venue = venue();
        let err = venue
            .create_order(&request(Direction::BaseToQuote, dec!(11), dec!(100)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("insufficient"));
    }
}
