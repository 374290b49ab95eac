//! Operator surface: read views and control switches.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use super::config::{default_offset_max, default_offset_min};
use super::state::{EngineFlags, EngineState};
use crate::domain::{Balance, Coin, Loop, PairKey, Position, PositionFill, Symbol, TradePair, VenueId};
use crate::error::Result;
use crate::exchange::{VenueRegistry, VenueStatus};
use crate::fishing::{FishingDefinition, FishingParams, FishingRegistry, FishingView};
use crate::market::OwnerHandle;

/// Connectivity of one venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VenueView {
    pub id: VenueId,
    pub active: bool,
    pub status: VenueStatus,
}

/// Cloneable handle for the presentation layer. Reads run on the owner.
#[derive(Clone)]
pub struct Operator {
    owner: OwnerHandle,
    state: Arc<EngineState>,
    venues: VenueRegistry,
    fishing: Arc<FishingRegistry>,
}

impl Operator {
    #[must_use]
    pub fn new(
        owner: OwnerHandle,
        state: Arc<EngineState>,
        venues: VenueRegistry,
        fishing: Arc<FishingRegistry>,
    ) -> Self {
        Self {
            owner,
            state,
            venues,
            fishing,
        }
    }

    pub async fn coins(&self) -> Result<Vec<Coin>> {
        self.owner
            .read(|model| {
                model
                    .venues()
                    .values()
                    .flat_map(|venue| venue.coins().values().cloned())
                    .collect()
            })
            .await
    }

    /// Pairs of every venue, synthetic cross pairs last.
    pub async fn pairs(&self) -> Result<Vec<TradePair>> {
        self.owner
            .read(|model| {
                model
                    .venues()
                    .values()
                    .flat_map(|venue| venue.pairs().values())
                    .chain(model.cross_pairs().values())
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn balances(&self) -> Result<Vec<Balance>> {
        self.owner
            .read(|model| {
                model
                    .venues()
                    .values()
                    .flat_map(|venue| venue.balances().values().cloned())
                    .collect()
            })
            .await
    }

    pub async fn positions(&self) -> Result<Vec<Position>> {
        self.owner
            .read(|model| {
                model
                    .venues()
                    .values()
                    .flat_map(|venue| venue.positions().values().cloned())
                    .collect()
            })
            .await
    }

    pub async fn history(&self) -> Result<Vec<PositionFill>> {
        self.owner
            .read(|model| {
                model
                    .venues()
                    .values()
                    .flat_map(|venue| venue.history().values().cloned())
                    .collect()
            })
            .await
    }

    /// Last evaluated loops, best first.
    pub async fn loops(&self) -> Result<Vec<Loop>> {
        self.owner.read(|model| model.loops().to_vec()).await
    }

    #[must_use]
    pub fn fishing(&self) -> Vec<FishingView> {
        self.fishing.views()
    }

    #[must_use]
    pub fn venues(&self) -> Vec<VenueView> {
        self.venues
            .iter()
            .map(|driver| VenueView {
                id: driver.id().clone(),
                active: driver.is_active(),
                status: driver.status(),
            })
            .collect()
    }

    #[must_use]
    pub fn flags(&self) -> EngineFlags {
        self.state.flags()
    }

    pub fn set_trading_enabled(&self, enabled: bool) {
        info!(enabled, "Trading switched");
        self.state.set_trading_enabled(enabled);
    }

    pub fn set_loop_finder_running(&self, running: bool) {
        info!(running, "Loop finder switched");
        self.state.set_loop_finder_running(running);
    }

    pub async fn set_venue_active(&self, venue: &VenueId, active: bool) -> Result<()> {
        self.venues.get(venue)?.set_active(active).await
    }

    pub fn set_coins_of_interest(&self, coins: BTreeSet<Symbol>) -> Result<()> {
        self.owner.set_coins_of_interest(coins)
    }

    /// Start fishing `pair_b` against `pair_a` with default offsets. Returns the instance id.
    pub fn create_fishing(&self, pair_a: PairKey, pair_b: PairKey, scale: Decimal) -> Result<u64> {
        let definition = FishingDefinition {
            reference: pair_a,
            target: pair_b,
            params: FishingParams {
                scale,
                min_volume: None,
                max_volume: None,
                offset_min: default_offset_min(),
                offset_max: default_offset_max(),
            },
        };
        self.create_fishing_from(definition, true)
    }

    pub fn create_fishing_from(&self, definition: FishingDefinition, active: bool) -> Result<u64> {
        Ok(self.fishing.create(definition, active)?.id())
    }

    pub fn set_fishing_active(&self, id: u64, active: bool) -> Result<()> {
        self.fishing.set_active(id, active)
    }

    pub fn remove_fishing(&self, id: u64) -> Result<()> {
        self.fishing.remove(id)
    }
}
