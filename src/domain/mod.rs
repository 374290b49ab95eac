//! Exchange-agnostic domain model.
//!
//! - [`Coin`] and [`Balance`] - currencies and holdings per venue
//! - [`TradePair`] with its two [`OrderBook`]s
//! - [`Trade`] - a single-hop conversion, validated against its pair
//! - [`Position`] / [`PositionFill`] - open orders and grouped fills
//! - [`Cycle`] / [`Loop`] - closed trading cycles and their evaluation

mod coin;
mod cycle;
mod error;
mod id;
mod money;
mod order_book;
mod pair;
mod position;
mod trade;

pub use coin::{Balance, Coin};
pub use cycle::{Cycle, Hop, Loop, LoopDirection, RateTier};
pub use error::DomainError;
pub use id::{CoinId, OrderId, PairKey, Symbol, TradeId, VenueId, CROSS_VENUE};
pub use money::{Price, Range, Volume};
pub use order_book::{Order, OrderBook};
pub use pair::TradePair;
pub use position::{Position, PositionFill};
pub use trade::{Direction, Trade};
