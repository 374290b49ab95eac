//! Trade value type.
//!
//! A [`Trade`] is a proposed or realized conversion through one pair. It is
//! stateless: validation checks it against the pair's allowed ranges, and
//! scaling produces a new trade.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{CoinId, PairKey};
use super::money::{Price, Volume};
use super::pair::TradePair;

/// Conversion direction through a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Sell base, receive quote (hits the B2Q book).
    BaseToQuote,
    /// Spend quote, receive base (hits the Q2B book).
    QuoteToBase,
}

impl Direction {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::BaseToQuote => Self::QuoteToBase,
            Self::QuoteToBase => Self::BaseToQuote,
        }
    }

    /// Direction that spends `coin_in` through `pair`.
    #[must_use]
    pub fn spending(pair: &PairKey, coin_in: &CoinId) -> Option<Self> {
        if &pair.base == coin_in {
            Some(Self::BaseToQuote)
        } else if &pair.quote == coin_in {
            Some(Self::QuoteToBase)
        } else {
            None
        }
    }
}

/// A conversion of `volume_in` of one coin into `volume_out` of the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub direction: Direction,
    pub pair: PairKey,
    pub volume_in: Volume,
    pub volume_out: Volume,
    /// Limit price, quote per base.
    pub price: Price,
}

impl Trade {
    #[must_use]
    pub fn new(
        direction: Direction,
        pair: PairKey,
        volume_in: Volume,
        volume_out: Volume,
        price: Price,
    ) -> Self {
        Self {
            direction,
            pair,
            volume_in,
            volume_out,
            price,
        }
    }

    /// Trade at a single price for `volume_in` of the input coin.
    #[must_use]
    pub fn at_price(direction: Direction, pair: PairKey, volume_in: Volume, price: Price) -> Self {
        let volume_out = match direction {
            Direction::BaseToQuote => volume_in * price,
            Direction::QuoteToBase if price.is_zero() => Decimal::ZERO,
            Direction::QuoteToBase => volume_in / price,
        };
        Self::new(direction, pair, volume_in, volume_out, price)
    }

    #[must_use]
    pub fn coin_in(&self) -> &CoinId {
        match self.direction {
            Direction::BaseToQuote => &self.pair.base,
            Direction::QuoteToBase => &self.pair.quote,
        }
    }

    #[must_use]
    pub fn coin_out(&self) -> &CoinId {
        match self.direction {
            Direction::BaseToQuote => &self.pair.quote,
            Direction::QuoteToBase => &self.pair.base,
        }
    }

    /// Volume of the trade expressed in the base coin.
    #[must_use]
    pub fn base_volume(&self) -> Volume {
        match self.direction {
            Direction::BaseToQuote => self.volume_in,
            Direction::QuoteToBase => self.volume_out,
        }
    }

    /// Realized conversion rate (out per in).
    #[must_use]
    pub fn rate(&self) -> Decimal {
        if self.volume_in.is_zero() {
            Decimal::ZERO
        } else {
            self.volume_out / self.volume_in
        }
    }

    /// The same trade with both volumes multiplied by `scale`.
    #[must_use]
    pub fn scaled(&self, scale: Decimal) -> Self {
        Self {
            volume_in: self.volume_in * scale,
            volume_out: self.volume_out * scale,
            ..self.clone()
        }
    }

    /// Check volumes and price against the pair's allowed ranges.
    pub fn validate(&self, pair: &TradePair) -> Result<(), DomainError> {
        if &self.pair != pair.key() {
            return Err(DomainError::PairMismatch {
                trade: self.pair.clone(),
                pair: pair.key().clone(),
            });
        }
        if self.volume_in <= Decimal::ZERO {
            return Err(DomainError::NonPositiveVolume {
                volume: self.volume_in,
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(DomainError::NonPositivePrice { price: self.price });
        }

        let (range_in, range_out) = match self.direction {
            Direction::BaseToQuote => (pair.base_range(), pair.quote_range()),
            Direction::QuoteToBase => (pair.quote_range(), pair.base_range()),
        };
        if !range_in.contains(self.volume_in) {
            return Err(DomainError::VolumeOutOfRange {
                pair: self.pair.clone(),
                coin: self.coin_in().clone(),
                volume: self.volume_in,
            });
        }
        if !range_out.contains(self.volume_out) {
            return Err(DomainError::VolumeOutOfRange {
                pair: self.pair.clone(),
                coin: self.coin_out().clone(),
                volume: self.volume_out,
            });
        }
        if !pair.price_range().contains(self.price) {
            return Err(DomainError::PriceOutOfRange {
                pair: self.pair.clone(),
                price: self.price,
            });
        }
        Ok(())
    }
}
