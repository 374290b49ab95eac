//! Venue abstraction layer.
//!
//! - [`VenueClient`] - wire-level contract implemented per venue
//! - [`VenueDriver`] - background polling loop, dirty flags and update signals
//! - [`VenueRegistry`] - every configured driver, keyed by venue
//! - [`IntegrationAction`] - the only way venue data reaches the market model

mod action;
mod driver;
mod registry;
mod signal;
mod traits;

pub use action::{action_queue, ActionPayload, ActionReceiver, ActionSender, IntegrationAction};
pub use driver::{VenueDriver, VenueSettings, VenueStatus};
pub use registry::VenueRegistry;
pub use signal::{Category, DirtyFlags, UpdateSignals};
pub use traits::{BookSnapshot, OrderRequest, OrderResult, PairInfo, VenueClient};
