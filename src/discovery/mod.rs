//! Loop discovery.
//!
//! Seeds one open chain per real pair and grows chains from both ends on a
//! fixed pool of worker threads until every simple cycle up to the hop cap
//! has been found. Results are deduplicated by canonical cycle key.

mod finder;
mod partial;

pub use finder::{find_cycles, DiscoverySettings};
pub use partial::PartialLoop;
