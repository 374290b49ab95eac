//! Order book types for market depth representation.
//!
//! A [`TradePair`](super::TradePair) owns two [`OrderBook`]s, one per
//! conversion direction:
//!
//! - **B2Q** (bids): converting base into quote. Best price first, strictly
//!   decreasing.
//! - **Q2B** (asks): converting quote into base. Best price first, strictly
//!   increasing in quote-per-base terms.
//!
//! Volumes are always expressed in the base coin.
//!
//! # Examples
//!
//! ```
//! use cyclearb::domain::{Direction, Order, OrderBook};
//! use rust_decimal_macros::dec;
//!
//! let mut book = OrderBook::new(Direction::BaseToQuote);
//! book.replace(vec![
//!     Order::new(dec!(99), dec!(1)),
//!     Order::new(dec!(101), dec!(2)),
//! ]);
//!
//! assert_eq!(book.best().unwrap().price(), dec!(101));
//! assert!(book.is_valid());
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::money::{Price, Volume};
use super::trade::Direction;

/// A single price level: price in quote per base, volume in base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Order {
    price: Price,
    volume: Volume,
}

impl Order {
    #[must_use]
    pub const fn new(price: Price, volume: Volume) -> Self {
        Self { price, volume }
    }

    #[must_use]
    pub const fn price(&self) -> Price {
        self.price
    }

    #[must_use]
    pub const fn volume(&self) -> Volume {
        self.volume
    }

    /// Quote amount of the whole level.
    #[must_use]
    pub fn quote_volume(&self) -> Volume {
        self.price * self.volume
    }
}

/// One side of one pair, best price first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBook {
    side: Direction,
    orders: Vec<Order>,
}

impl OrderBook {
    #[must_use]
    pub const fn new(side: Direction) -> Self {
        Self {
            side,
            orders: Vec::new(),
        }
    }

    /// Build a book from levels that are already best-first.
    #[must_use]
    pub fn from_sorted(side: Direction, orders: Vec<Order>) -> Self {
        Self { side, orders }
    }

    #[must_use]
    pub const fn side(&self) -> Direction {
        self.side
    }

    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    #[must_use]
    pub fn best(&self) -> Option<&Order> {
        self.orders.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Total base volume on this side.
    #[must_use]
    pub fn depth(&self) -> Volume {
        self.orders.iter().map(Order::volume).sum()
    }

    /// Replace all levels with `orders`, in any order.
    ///
    /// Non-positive levels are dropped and levels sharing a price are
    /// aggregated, so the result is strictly monotonic for this side.
    pub fn replace(&mut self, orders: Vec<Order>) {
        let mut levels: BTreeMap<Price, Volume> = BTreeMap::new();
        for order in orders {
            if order.price <= Decimal::ZERO || order.volume <= Decimal::ZERO {
                continue;
            }
            *levels.entry(order.price).or_insert(Decimal::ZERO) += order.volume;
        }

        let ascending = levels.into_iter().map(|(price, volume)| Order::new(price, volume));
        self.orders = match self.side {
            Direction::BaseToQuote => ascending.rev().collect(),
            Direction::QuoteToBase => ascending.collect(),
        };
    }

    /// Whether prices are strictly monotonic in this side's direction.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.orders.windows(2).all(|w| match self.side {
            Direction::BaseToQuote => w[0].price > w[1].price,
            Direction::QuoteToBase => w[0].price < w[1].price,
        })
    }
}
