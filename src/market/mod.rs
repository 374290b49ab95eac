//! Shared market model and its single owner.
//!
//! Venue drivers never touch the model. They enqueue integration actions,
//! and the [`Owner`] task is the only code that applies them. Everything
//! else reads through an [`OwnerHandle`], whose closures run on the owner.

mod model;
mod owner;

pub use model::{MarketModel, VenueData};
pub use owner::{Owner, OwnerHandle, OwnerSettings};
