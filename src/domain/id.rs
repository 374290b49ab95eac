//! Identifier newtypes for venues, coins, pairs and orders.
//!
//! Entities never hold references to each other. A [`Coin`](super::Coin)
//! knows its pairs by [`PairKey`], a [`TradePair`](super::TradePair) knows
//! its coins by [`CoinId`], and every lookup goes through the owning
//! per-venue collection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the synthetic pseudo-venue that links the same symbol across venues.
pub const CROSS_VENUE: &str = "cross";

/// Venue identifier - newtype for type safety.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(String);

impl VenueId {
    /// Create a new VenueId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The synthetic cross-venue pseudo-venue.
    #[must_use]
    pub fn cross() -> Self {
        Self::new(CROSS_VENUE)
    }

    /// Returns true for the synthetic cross-venue pseudo-venue.
    #[must_use]
    pub fn is_cross(&self) -> bool {
        self.0 == CROSS_VENUE
    }

    /// Get the venue ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Currency symbol, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol, normalizing to upper case.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A coin is identified by its symbol and the venue that holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoinId {
    pub symbol: Symbol,
    pub venue: VenueId,
}

impl CoinId {
    pub fn new(symbol: impl Into<Symbol>, venue: impl Into<VenueId>) -> Self {
        Self {
            symbol: symbol.into(),
            venue: venue.into(),
        }
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.venue)
    }
}

/// Venue-qualified pair key: unique across all venues, the synthetic one included.
///
/// Ordering is by venue, then base, then quote. Loop canonicalization
/// relies on this ordering being total and stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub venue: VenueId,
    pub base: CoinId,
    pub quote: CoinId,
}

impl PairKey {
    /// Key of a regular pair whose coins both live on `venue`.
    pub fn new(venue: impl Into<VenueId>, base: impl Into<Symbol>, quote: impl Into<Symbol>) -> Self {
        let venue = venue.into();
        Self {
            base: CoinId::new(base, venue.clone()),
            quote: CoinId::new(quote, venue.clone()),
            venue,
        }
    }

    /// Key of a synthetic pair moving `symbol` from venue `from` to venue `to`.
    pub fn cross(symbol: impl Into<Symbol>, from: impl Into<VenueId>, to: impl Into<VenueId>) -> Self {
        let symbol = symbol.into();
        Self {
            venue: VenueId::cross(),
            base: CoinId::new(symbol.clone(), from),
            quote: CoinId::new(symbol, to),
        }
    }

    #[must_use]
    pub fn is_cross(&self) -> bool {
        self.venue.is_cross()
    }

    /// Whether `coin` is one of this pair's two coins.
    #[must_use]
    pub fn touches(&self, coin: &CoinId) -> bool {
        &self.base == coin || &self.quote == coin
    }

    /// The coin on the other side of `coin`, if `coin` belongs to this pair.
    #[must_use]
    pub fn other(&self, coin: &CoinId) -> Option<&CoinId> {
        if &self.base == coin {
            Some(&self.quote)
        } else if &self.quote == coin {
            Some(&self.base)
        } else {
            None
        }
    }

    /// Whether the pair connects `a` and `b`, in either orientation.
    #[must_use]
    pub fn connects(&self, a: &CoinId, b: &CoinId) -> bool {
        (&self.base == a && &self.quote == b) || (&self.base == b && &self.quote == a)
    }

    /// Short "BASE/QUOTE" form, without venue qualification.
    #[must_use]
    pub fn symbol_pair(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cross() {
            write!(f, "{}>{}", self.base, self.quote)
        } else {
            write!(f, "{}/{}@{}", self.base.symbol, self.quote.symbol, self.venue)
        }
    }
}

/// Venue-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(u64);

impl OrderId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ord-{}", self.0)
    }
}

/// Venue-assigned trade (fill) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(u64);

impl TradeId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trd-{}", self.0)
    }
}
