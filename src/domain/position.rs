//! Open orders and their fills.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{OrderId, PairKey, TradeId};
use super::money::{Price, Volume};
use super::trade::Direction;

/// One open order, or one fill of an order when it appears in trade history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub order_id: OrderId,
    /// Set for fills; resting orders have no trade yet.
    pub trade_id: Option<TradeId>,
    pub pair: PairKey,
    pub direction: Direction,
    pub price: Price,
    /// Order volume in base.
    pub volume: Volume,
    /// Unfilled base volume.
    pub remaining: Volume,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl Position {
    /// A freshly placed, unfilled order.
    #[must_use]
    pub fn open(
        order_id: OrderId,
        pair: PairKey,
        direction: Direction,
        price: Price,
        volume: Volume,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            trade_id: None,
            pair,
            direction,
            price,
            volume,
            remaining: volume,
            created: at,
            updated: at,
        }
    }

    /// A fill of `volume` base against `order_id`.
    #[must_use]
    pub fn fill(
        order_id: OrderId,
        trade_id: TradeId,
        pair: PairKey,
        direction: Direction,
        price: Price,
        volume: Volume,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            trade_id: Some(trade_id),
            pair,
            direction,
            price,
            volume,
            remaining: Volume::ZERO,
            created: at,
            updated: at,
        }
    }

    /// Whether `incoming` should replace this record. Older snapshots are dropped.
    #[must_use]
    pub fn is_superseded_by(&self, incoming: &Position) -> bool {
        incoming.updated >= self.updated
    }
}

/// All trade fills sharing one order id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFill {
    order_id: OrderId,
    pair: PairKey,
    direction: Direction,
    fills: Vec<Position>,
}

impl PositionFill {
    #[must_use]
    pub fn new(first: Position) -> Self {
        Self {
            order_id: first.order_id,
            pair: first.pair.clone(),
            direction: first.direction,
            fills: vec![first],
        }
    }

    #[must_use]
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    #[must_use]
    pub fn pair(&self) -> &PairKey {
        &self.pair
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn fills(&self) -> &[Position] {
        &self.fills
    }

    /// Add a fill, replacing an older record of the same trade.
    pub fn merge(&mut self, fill: Position) {
        match self
            .fills
            .iter_mut()
            .find(|f| f.trade_id.is_some() && f.trade_id == fill.trade_id)
        {
            Some(existing) => {
                if existing.is_superseded_by(&fill) {
                    *existing = fill;
                }
            }
            None => self.fills.push(fill),
        }
    }

    /// Total filled base volume.
    #[must_use]
    pub fn filled_volume(&self) -> Volume {
        self.fills.iter().map(|f| f.volume).sum()
    }

    /// Volume-weighted average fill price.
    #[must_use]
    pub fn average_price(&self) -> Option<Price> {
        let volume = self.filled_volume();
        if volume.is_zero() {
            return None;
        }
        let notional: Volume = self.fills.iter().map(|f| f.volume * f.price).sum();
        Some(notional / volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(trade: u64, volume: Volume, price: Price) -> Position {
        Position::fill(
            OrderId::new(7),
            TradeId::new(trade),
            PairKey::new("alpha", "BTC", "USDT"),
            Direction::BaseToQuote,
            price,
            volume,
            Utc::now(),
        )
    }

    #[test]
    fn fills_group_by_order() {
        let mut group = PositionFill::new(fill(1, dec!(1), dec!(100)));
        group.merge(fill(2, dec!(3), dec!(104)));
        group.merge(fill(2, dec!(3), dec!(104)));

        assert_eq!(group.fills().len(), 2);
        assert_eq!(group.filled_volume(), dec!(4));
        assert_eq!(group.average_price(), Some(dec!(103)));
    }

    #[test]
    fn open_position_has_full_remaining() {
        let pos = Position::open(
            OrderId::new(1),
            PairKey::new("alpha", "BTC", "USDT"),
            Direction::QuoteToBase,
            dec!(100),
            dec!(2),
            Utc::now(),
        );
        assert_eq!(pos.remaining, dec!(2));
        assert!(pos.trade_id.is_none());
    }
}
