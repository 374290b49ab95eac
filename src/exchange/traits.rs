//! Venue client trait definitions.
//!
//! A [`VenueClient`] is the wire-level collaborator of a venue: it fetches
//! remote data and returns normalized domain values. It never touches the
//! shared market model; the [`VenueDriver`](super::VenueDriver) turns its
//! results into integration actions.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    Balance, Direction, Order, OrderId, PairKey, Position, Price, Range, Symbol, Trade, TradeId,
    VenueId, Volume,
};
use crate::error::Result;

/// A tradable pair as listed by a venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairInfo {
    pub base: Symbol,
    pub quote: Symbol,
    pub base_range: Range,
    pub quote_range: Range,
    pub price_range: Range,
}

impl PairInfo {
    /// Listing with unbounded ranges.
    pub fn new(base: impl Into<Symbol>, quote: impl Into<Symbol>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            base_range: Range::UNBOUNDED,
            quote_range: Range::UNBOUNDED,
            price_range: Range::UNBOUNDED,
        }
    }

    #[must_use]
    pub fn key(&self, venue: &VenueId) -> PairKey {
        PairKey::new(venue.clone(), self.base.clone(), self.quote.clone())
    }
}

/// Depth snapshot of one pair. `buys` feed B2Q, `sells` feed Q2B.
#[derive(Debug, Clone, PartialEq)]
pub struct BookSnapshot {
    pub base: Symbol,
    pub quote: Symbol,
    pub buys: Vec<Order>,
    pub sells: Vec<Order>,
}

/// An order to place on a venue. Volume is in base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub pair: PairKey,
    pub direction: Direction,
    pub volume: Volume,
    pub price: Price,
}

impl OrderRequest {
    #[must_use]
    pub fn from_trade(trade: &Trade) -> Self {
        Self {
            pair: trade.pair.clone(),
            direction: trade.direction,
            volume: trade.base_volume(),
            price: trade.price,
        }
    }
}

/// Outcome of placing an order: an immediate fill set, a resting order, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderResult {
    pub order_id: Option<OrderId>,
    pub trade_ids: Vec<TradeId>,
}

impl OrderResult {
    /// Whether the order filled at least partially on placement.
    #[must_use]
    pub fn filled_immediately(&self) -> bool {
        !self.trade_ids.is_empty()
    }
}

/// Wire-level contract every venue implements.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Venue this client talks to.
    fn venue(&self) -> &VenueId;

    /// Tradable pairs whose coins are both in `coins_of_interest`.
    async fn fetch_pairs(&self, coins_of_interest: &BTreeSet<Symbol>) -> Result<Vec<PairInfo>>;

    /// Depth for every pair in `pairs`.
    async fn fetch_market_data(&self, pairs: &[PairInfo]) -> Result<Vec<BookSnapshot>>;

    async fn fetch_balances(&self) -> Result<Vec<Balance>>;

    /// Currently open orders.
    async fn fetch_positions(&self) -> Result<Vec<Position>>;

    /// Recent fills, one entry per trade.
    async fn fetch_trade_history(&self) -> Result<Vec<Position>>;

    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResult>;

    async fn cancel_order(&self, pair: &PairKey, order_id: OrderId) -> Result<()>;
}
