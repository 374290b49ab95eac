//! Fishing: cross-venue bait and match.
//!
//! A bait order rests on the target venue, priced a small offset away from
//! the reference venue's book. When a counterparty takes it, the opposite
//! trade is placed on the reference venue at the reference price. Each
//! instance runs both directions on its own polling loop.

mod instance;
mod runner;
mod trade;

pub use instance::{FishingDefinition, FishingInstance, FishingView};
pub use runner::{FishingRegistry, VenuePort};
pub use trade::{Bait, FishingParams, FishingPort, FishingState, FishingTrade, Leg, LegBalances};
