//! Process wiring: venues, owner, fishing and the status writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use super::config::{Config, VenueConfig, VenueKind};
use super::operator::Operator;
use super::state::EngineState;
use super::status::StatusWriter;
use crate::adapter::paper::PaperVenue;
use crate::domain::{Symbol, VenueId};
use crate::error::Result;
use crate::exchange::{action_queue, VenueDriver, VenueRegistry};
use crate::fishing::FishingRegistry;
use crate::market::{MarketModel, Owner};
use crate::shutdown::Shutdown;

/// A running engine.
pub struct Runtime {
    operator: Operator,
    venues: VenueRegistry,
    fishing: Arc<FishingRegistry>,
    paper: BTreeMap<VenueId, Arc<PaperVenue>>,
    owner_task: JoinHandle<()>,
    status_task: Option<JoinHandle<()>>,
    shutdown: Shutdown,
}

impl Runtime {
    /// Build every component from `config` and start it.
    pub async fn start(config: &Config, shutdown: Shutdown) -> Result<Self> {
        let coins = config.engine.coins_of_interest();
        let (actions, queue) = action_queue();

        let mut venues = VenueRegistry::new();
        let mut paper = BTreeMap::new();
        for venue in &config.venues {
            let client = match venue.kind {
                VenueKind::Paper => {
                    let client = Arc::new(seed_paper(venue));
                    paper.insert(venue.id(), Arc::clone(&client));
                    client
                }
            };
            venues.register(VenueDriver::new(
                client,
                venue.settings(),
                coins.clone(),
                actions.clone(),
                shutdown.signal(),
            ));
        }
        drop(actions);

        let state = Arc::new(EngineState::new(
            config.engine.trading_enabled,
            config.engine.loop_finder_running,
            config.dry_run,
        ));
        let (owner, handle) = Owner::new(
            MarketModel::new(coins, config.engine.cross_venue_depth),
            queue,
            venues.clone(),
            Arc::clone(&state),
            config.engine.owner_settings(),
            shutdown.signal(),
        );
        let owner_task = tokio::spawn(owner.run());

        for venue in config.venues.iter().filter(|v| v.active) {
            venues.get(&venue.id())?.set_active(true).await?;
        }

        let fishing = Arc::new(FishingRegistry::new(
            venues.clone(),
            handle.clone(),
            config.fishing_interval(),
            shutdown.signal(),
        ));
        let operator = Operator::new(handle, state, venues.clone(), Arc::clone(&fishing));
        for saved in &config.fishing {
            operator.create_fishing_from(saved.definition()?, saved.active)?;
        }

        let status_task = config.status_file.clone().map(|path| {
            info!(path = %path.display(), "Writing status file");
            tokio::spawn(StatusWriter::new(path).run(
                operator.clone(),
                config.status_interval(),
                shutdown.signal(),
            ))
        });

        info!(
            venues = venues.len(),
            fishing = config.fishing.len(),
            dry_run = config.dry_run,
            "Engine started"
        );
        Ok(Self {
            operator,
            venues,
            fishing,
            paper,
            owner_task,
            status_task,
            shutdown,
        })
    }

    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// The paper client behind `venue`, if it is one.
    #[must_use]
    pub fn paper(&self, venue: &VenueId) -> Option<&Arc<PaperVenue>> {
        self.paper.get(venue)
    }

    /// Raise the process-wide shutdown signal.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Resolve once the owner, every venue loop, every fishing loop and the
    /// status writer have finished. Does not raise the signal itself.
    pub async fn wait_exit(self) {
        if let Err(e) = self.owner_task.await {
            error!(error = %e, "Market owner panicked");
        }
        for driver in self.venues.iter() {
            driver.join().await;
        }
        self.fishing.join().await;
        if let Some(task) = self.status_task {
            if let Err(e) = task.await {
                error!(error = %e, "Status writer panicked");
            }
        }
        info!("Engine stopped");
    }
}

fn seed_paper(venue: &VenueConfig) -> PaperVenue {
    let client = PaperVenue::new(venue.id());
    for pair in &venue.paper.pairs {
        client.add_pair(pair.info());
        client.set_book(&pair.base, &pair.quote, pair.bids(), pair.asks());
    }
    for (symbol, total) in &venue.paper.balances {
        client.set_balance(Symbol::new(symbol).as_str(), *total);
    }
    client
}
