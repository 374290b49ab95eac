//! Domain validation errors.
//!
//! Raised synchronously when a value violates a domain rule, before any
//! network call is made. Order creation with an invalid trade is refused
//! here rather than at the venue.

use thiserror::Error;

use super::id::{CoinId, PairKey, VenueId};
use super::money::{Price, Volume};

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Volume must be positive for trading operations.
    #[error("volume must be positive, got {volume}")]
    NonPositiveVolume { volume: Volume },

    /// Price must be positive.
    #[error("price must be positive, got {price}")]
    NonPositivePrice { price: Price },

    /// Trade volume outside the pair's allowed range.
    #[error("volume {volume} of {coin} outside allowed range on {pair}")]
    VolumeOutOfRange {
        pair: PairKey,
        coin: CoinId,
        volume: Volume,
    },

    /// Trade price outside the pair's allowed range.
    #[error("price {price} outside allowed range on {pair}")]
    PriceOutOfRange { pair: PairKey, price: Price },

    /// A trade was validated against a pair it does not belong to.
    #[error("trade for {trade} validated against {pair}")]
    PairMismatch { trade: PairKey, pair: PairKey },

    /// A coin or balance was handed to a venue it does not belong to.
    #[error("coin {coin} does not belong to venue {venue}")]
    CoinNotOnVenue { coin: CoinId, venue: VenueId },

    /// A hold larger than the available balance.
    #[error("cannot hold {requested} of {coin}: only {available} available")]
    InsufficientBalance {
        coin: CoinId,
        requested: Volume,
        available: Volume,
    },

    /// The book does not hold enough volume for the requested conversion.
    #[error("insufficient depth on {pair}: requested {requested}, available {available}")]
    InsufficientDepth {
        pair: PairKey,
        requested: Volume,
        available: Volume,
    },

    /// Order book levels are not monotonic for their side.
    #[error("order book side for {pair} is not sorted best-first")]
    UnsortedBook { pair: PairKey },

    /// A loop needs at least two hops and must close on its starting coin.
    #[error("malformed loop: {0}")]
    MalformedLoop(String),
}
