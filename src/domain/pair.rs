//! Trade pairs and single-hop conversions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::{CoinId, PairKey, VenueId};
use super::money::{Range, Volume};
use super::order_book::{Order, OrderBook};
use super::trade::{Direction, Trade};

/// A (base, quote, venue) pair with its two order books.
#[derive(Debug, Clone, Serialize)]
pub struct TradePair {
    key: PairKey,
    fee: Decimal,
    b2q: OrderBook,
    q2b: OrderBook,
    base_range: Range,
    quote_range: Range,
    price_range: Range,
    updated: Option<DateTime<Utc>>,
}

impl TradePair {
    /// New pair with empty books and unbounded ranges.
    #[must_use]
    pub fn new(key: PairKey, fee: Decimal) -> Self {
        Self {
            key,
            fee,
            b2q: OrderBook::new(Direction::BaseToQuote),
            q2b: OrderBook::new(Direction::QuoteToBase),
            base_range: Range::UNBOUNDED,
            quote_range: Range::UNBOUNDED,
            price_range: Range::UNBOUNDED,
            updated: None,
        }
    }

    /// Synthetic identity pair moving `key.base` to `key.quote` across venues.
    ///
    /// Both books carry a single level at price 1 with `depth` volume and the
    /// fee is zero.
    #[must_use]
    pub fn cross(key: PairKey, depth: Volume) -> Self {
        let mut pair = Self::new(key, Decimal::ZERO);
        pair.b2q = OrderBook::from_sorted(Direction::BaseToQuote, vec![Order::new(Decimal::ONE, depth)]);
        pair.q2b = OrderBook::from_sorted(Direction::QuoteToBase, vec![Order::new(Decimal::ONE, depth)]);
        pair
    }

    #[must_use]
    pub fn key(&self) -> &PairKey {
        &self.key
    }

    #[must_use]
    pub fn venue(&self) -> &VenueId {
        &self.key.venue
    }

    #[must_use]
    pub fn base(&self) -> &CoinId {
        &self.key.base
    }

    #[must_use]
    pub fn quote(&self) -> &CoinId {
        &self.key.quote
    }

    #[must_use]
    pub fn fee(&self) -> Decimal {
        self.fee
    }

    pub fn set_fee(&mut self, fee: Decimal) {
        self.fee = fee;
    }

    #[must_use]
    pub fn is_cross(&self) -> bool {
        self.key.is_cross()
    }

    #[must_use]
    pub fn base_range(&self) -> Range {
        self.base_range
    }

    #[must_use]
    pub fn quote_range(&self) -> Range {
        self.quote_range
    }

    #[must_use]
    pub fn price_range(&self) -> Range {
        self.price_range
    }

    pub fn set_ranges(&mut self, base: Range, quote: Range, price: Range) {
        self.base_range = base;
        self.quote_range = quote;
        self.price_range = price;
    }

    /// Book hit by a conversion in `direction`.
    #[must_use]
    pub fn book(&self, direction: Direction) -> &OrderBook {
        match direction {
            Direction::BaseToQuote => &self.b2q,
            Direction::QuoteToBase => &self.q2b,
        }
    }

    #[must_use]
    pub fn b2q(&self) -> &OrderBook {
        &self.b2q
    }

    #[must_use]
    pub fn q2b(&self) -> &OrderBook {
        &self.q2b
    }

    #[must_use]
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Replace both books. `buys` feed B2Q, `sells` feed Q2B.
    pub fn update_order_book(&mut self, buys: Vec<Order>, sells: Vec<Order>, at: DateTime<Utc>) {
        self.b2q.replace(buys);
        self.q2b.replace(sells);
        self.updated = Some(at);
    }

    /// Sell `volume` of base by walking the B2Q book.
    pub fn base_to_quote(&self, volume: Volume) -> Result<Trade, DomainError> {
        if volume <= Decimal::ZERO {
            return Err(DomainError::NonPositiveVolume { volume });
        }
        let mut remaining = volume;
        let mut received = Decimal::ZERO;
        let mut worst = Decimal::ZERO;
        for order in self.b2q.orders() {
            if remaining.is_zero() {
                break;
            }
            let take = remaining.min(order.volume());
            received += take * order.price();
            remaining -= take;
            worst = order.price();
        }
        if remaining > Decimal::ZERO {
            return Err(DomainError::InsufficientDepth {
                pair: self.key.clone(),
                requested: volume,
                available: self.b2q.depth(),
            });
        }
        Ok(Trade::new(Direction::BaseToQuote, self.key.clone(), volume, received, worst))
    }

    /// Spend `volume` of quote by walking the Q2B book.
    pub fn quote_to_base(&self, volume: Volume) -> Result<Trade, DomainError> {
        if volume <= Decimal::ZERO {
            return Err(DomainError::NonPositiveVolume { volume });
        }
        let mut remaining = volume;
        let mut received = Decimal::ZERO;
        let mut worst = Decimal::ZERO;
        for order in self.q2b.orders() {
            if remaining.is_zero() {
                break;
            }
            let take = remaining.min(order.quote_volume());
            received += take / order.price();
            remaining -= take;
            worst = order.price();
        }
        if remaining > Decimal::ZERO {
            return Err(DomainError::InsufficientDepth {
                pair: self.key.clone(),
                requested: volume,
                available: self.q2b.orders().iter().map(Order::quote_volume).sum(),
            });
        }
        Ok(Trade::new(Direction::QuoteToBase, self.key.clone(), volume, received, worst))
    }

    /// Convert `volume_in` of the direction's input coin.
    pub fn convert(&self, direction: Direction, volume_in: Volume) -> Result<Trade, DomainError> {
        match direction {
            Direction::BaseToQuote => self.base_to_quote(volume_in),
            Direction::QuoteToBase => self.quote_to_base(volume_in),
        }
    }
}
