//! Registry of venue drivers, keyed by venue id.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::driver::VenueDriver;
use crate::domain::VenueId;
use crate::error::{Result, VenueError};

/// All configured venues.
#[derive(Clone, Default)]
pub struct VenueRegistry {
    drivers: BTreeMap<VenueId, Arc<VenueDriver>>,
}

impl VenueRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, driver: Arc<VenueDriver>) {
        self.drivers.insert(driver.id().clone(), driver);
    }

    /// Driver of `venue`, or [`VenueError::UnknownVenue`].
    pub fn get(&self, venue: &VenueId) -> Result<&Arc<VenueDriver>> {
        self.drivers
            .get(venue)
            .ok_or_else(|| VenueError::UnknownVenue(venue.clone()).into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<VenueDriver>> {
        self.drivers.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &VenueId> {
        self.drivers.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
