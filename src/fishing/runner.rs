//! Fishing instances wired to live venues.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::instance::{FishingDefinition, FishingInstance, FishingView};
use super::trade::{FishingPort, Leg, LegBalances};
use crate::domain::{Direction, Order, OrderId, PairKey, Price, Trade};
use crate::error::{Error, Result, VenueError};
use crate::exchange::{Category, OrderResult, VenueDriver, VenueRegistry};
use crate::market::OwnerHandle;
use crate::shutdown::ShutdownSignal;

/// [`FishingPort`] over two venue drivers. Market reads run on the owner;
/// orders go straight to the drivers.
///
/// Refresh waits give up with [`Error::Interrupted`] once `running` turns
/// false, and inactive venues are refused up front.
pub struct VenuePort {
    reference: PairKey,
    target: PairKey,
    reference_driver: Arc<VenueDriver>,
    target_driver: Arc<VenueDriver>,
    owner: OwnerHandle,
    running: watch::Receiver<bool>,
}

impl VenuePort {
    pub fn new(
        definition: &FishingDefinition,
        venues: &VenueRegistry,
        owner: OwnerHandle,
        running: watch::Receiver<bool>,
    ) -> Result<Self> {
        Ok(Self {
            reference: definition.reference.clone(),
            target: definition.target.clone(),
            reference_driver: Arc::clone(venues.get(&definition.reference.venue)?),
            target_driver: Arc::clone(venues.get(&definition.target.venue)?),
            owner,
            running,
        })
    }

    async fn refreshed(&self, driver: &VenueDriver, category: Category) -> Result<()> {
        if !driver.is_active() {
            return Err(VenueError::Inactive(driver.id().clone()).into());
        }
        let mut running = self.running.clone();
        tokio::select! {
            result = driver.updated_since(category) => result.map(drop),
            _ = running.wait_for(|running| !*running) => Err(Error::Interrupted),
        }
    }

    fn leg(&self, leg: Leg) -> (&PairKey, &Arc<VenueDriver>) {
        match leg {
            Leg::Reference => (&self.reference, &self.reference_driver),
            Leg::Target => (&self.target, &self.target_driver),
        }
    }
}

#[async_trait]
impl FishingPort for VenuePort {
    async fn best_price(&self, side: Direction) -> Result<Option<Price>> {
        let key = self.reference.clone();
        self.owner
            .read(move |model| {
                model
                    .pair(&key)
                    .and_then(|pair| pair.book(side).best().map(Order::price))
            })
            .await
    }

    async fn balances(&self) -> Result<LegBalances> {
        let (reference, target) = (self.reference.clone(), self.target.clone());
        self.owner
            .read(move |model| LegBalances {
                reference_base: model.available(&reference.base),
                reference_quote: model.available(&reference.quote),
                target_base: model.available(&target.base),
                target_quote: model.available(&target.quote),
            })
            .await
    }

    async fn is_open(&self, leg: Leg, order_id: OrderId) -> Result<bool> {
        let (_, driver) = self.leg(leg);
        self.refreshed(driver, Category::Positions).await?;
        let venue = driver.id().clone();
        self.owner
            .read(move |model| model.position(&venue, order_id).is_some())
            .await
    }

    async fn has_fill(&self, leg: Leg, order_id: OrderId) -> Result<bool> {
        let (_, driver) = self.leg(leg);
        self.refreshed(driver, Category::TradeHistory).await?;
        let venue = driver.id().clone();
        self.owner
            .read(move |model| model.fills(&venue, order_id).is_some())
            .await
    }

    async fn place(&self, leg: Leg, trade: &Trade) -> Result<OrderResult> {
        let (key, driver) = self.leg(leg);
        let lookup = key.clone();
        let pair = self
            .owner
            .read(move |model| model.pair(&lookup).cloned())
            .await?
            .ok_or_else(|| Error::UnknownPair(key.clone()))?;
        driver.place(&pair, trade).await
    }

    async fn cancel(&self, leg: Leg, order_id: OrderId) -> Result<()> {
        let (key, driver) = self.leg(leg);
        driver.cancel(key, order_id).await
    }
}

/// Every fishing instance of the process and its polling task.
pub struct FishingRegistry {
    instances: RwLock<Vec<Arc<FishingInstance>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
    venues: VenueRegistry,
    owner: OwnerHandle,
    period: Duration,
    shutdown: ShutdownSignal,
}

impl FishingRegistry {
    #[must_use]
    pub fn new(venues: VenueRegistry, owner: OwnerHandle, period: Duration, shutdown: ShutdownSignal) -> Self {
        Self {
            instances: RwLock::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            venues,
            owner,
            period,
            shutdown,
        }
    }

    /// Validate `definition`, then start its polling loop.
    pub fn create(&self, definition: FishingDefinition, active: bool) -> Result<Arc<FishingInstance>> {
        definition.validate()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let instance = Arc::new(FishingInstance::new(id, definition, active));
        let port: Arc<dyn FishingPort> = Arc::new(VenuePort::new(
            instance.definition(),
            &self.venues,
            self.owner.clone(),
            instance.subscribe(),
        )?);

        let task = tokio::spawn(Arc::clone(&instance).run(port, self.period, self.shutdown.clone()));
        self.tasks.lock().push(task);
        self.instances.write().push(Arc::clone(&instance));
        info!(id, "Fishing instance created");
        Ok(instance)
    }

    pub fn get(&self, id: u64) -> Result<Arc<FishingInstance>> {
        self.instances
            .read()
            .iter()
            .find(|i| i.id() == id)
            .cloned()
            .ok_or(Error::UnknownFishing(id))
    }

    pub fn set_active(&self, id: u64, active: bool) -> Result<()> {
        self.get(id)?.set_active(active);
        Ok(())
    }

    /// Withdraw the instance's baits and stop its loop.
    pub fn remove(&self, id: u64) -> Result<()> {
        let instance = self.get(id)?;
        instance.dispose();
        self.instances.write().retain(|i| i.id() != id);
        Ok(())
    }

    #[must_use]
    pub fn views(&self) -> Vec<FishingView> {
        self.instances.read().iter().map(|i| i.view()).collect()
    }

    /// Wait for every polling loop to finish.
    pub async fn join(&self) {
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Fishing task panicked");
            }
        }
    }
}
