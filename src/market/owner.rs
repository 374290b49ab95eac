//! The market owner task.
//!
//! The owner is the only mutator of the [`MarketModel`]. It drains the
//! integration queue, serves read requests, and on every evaluation tick
//! runs discovery, evaluation and execution. Discovery and evaluation run on
//! blocking threads against a shared snapshot of the model; the owner waits
//! for them before applying the next action, so the snapshot is never
//! observed mid-mutation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::model::MarketModel;
use crate::app::EngineState;
use crate::discovery::{find_cycles, DiscoverySettings};
use crate::domain::{Cycle, Loop, Symbol, VenueId};
use crate::error::{Error, Result};
use crate::evaluation::{evaluate_all, EvaluationSettings};
use crate::exchange::{ActionReceiver, Category, IntegrationAction, VenueRegistry};
use crate::execution::execute_loop;
use crate::shutdown::ShutdownSignal;

type ReadFn = Box<dyn FnOnce(&MarketModel) + Send>;

enum Command {
    Read(ReadFn),
    Snapshot(oneshot::Sender<Arc<MarketModel>>),
    SetCoinsOfInterest(BTreeSet<Symbol>),
}

/// Scheduling of the owner's pipeline.
#[derive(Debug, Clone, Copy)]
pub struct OwnerSettings {
    /// Period of the evaluation pass.
    pub evaluation_interval: Duration,
    /// Maximum age of discovered cycles while the pair graph is unchanged.
    pub discovery_interval: Duration,
    pub discovery: DiscoverySettings,
    pub evaluation: EvaluationSettings,
}

impl Default for OwnerSettings {
    fn default() -> Self {
        Self {
            evaluation_interval: Duration::from_secs(1),
            discovery_interval: Duration::from_secs(60),
            discovery: DiscoverySettings::default(),
            evaluation: EvaluationSettings::default(),
        }
    }
}

/// Venues touched by the last execution and when it happened. No loop is
/// executed again until each of them has integrated newer balances.
struct Cooldown {
    executed_at: DateTime<Utc>,
    venues: Vec<VenueId>,
}

/// Cloneable access to the owner from other tasks.
#[derive(Clone)]
pub struct OwnerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl OwnerHandle {
    /// Run `f` against the model on the owner and return its result.
    pub async fn read<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&MarketModel) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let command = Command::Read(Box::new(move |model| {
            let _ = reply.send(f(model));
        }));
        self.tx.send(command).map_err(|_| Error::OwnerGone)?;
        rx.await.map_err(|_| Error::OwnerGone)
    }

    /// Consistent snapshot of the whole model.
    ///
    /// Holding it while the owner integrates forces a copy, so drop it promptly.
    pub async fn snapshot(&self) -> Result<Arc<MarketModel>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .map_err(|_| Error::OwnerGone)?;
        rx.await.map_err(|_| Error::OwnerGone)
    }

    /// Replace the coins of interest on the model and every venue.
    pub fn set_coins_of_interest(&self, coins: BTreeSet<Symbol>) -> Result<()> {
        self.tx
            .send(Command::SetCoinsOfInterest(coins))
            .map_err(|_| Error::OwnerGone)
    }
}

/// The single writer of the market model.
pub struct Owner {
    model: Arc<MarketModel>,
    actions: ActionReceiver,
    commands: mpsc::UnboundedReceiver<Command>,
    venues: VenueRegistry,
    state: Arc<EngineState>,
    settings: OwnerSettings,
    shutdown: ShutdownSignal,
    last_discovery: Option<Instant>,
    cooldown: Option<Cooldown>,
}

impl Owner {
    pub fn new(
        model: MarketModel,
        actions: ActionReceiver,
        venues: VenueRegistry,
        state: Arc<EngineState>,
        settings: OwnerSettings,
        shutdown: ShutdownSignal,
    ) -> (Self, OwnerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let mut model = model;
        for id in venues.ids() {
            model.add_venue(id.clone());
        }
        let owner = Self {
            model: Arc::new(model),
            actions,
            commands,
            venues,
            state,
            settings,
            shutdown,
            last_discovery: None,
            cooldown: None,
        };
        (owner, OwnerHandle { tx })
    }

    /// Main loop. Returns once shutdown is signalled.
    pub async fn run(mut self) {
        info!(venues = self.venues.len(), "Market owner started");
        let mut ticker = tokio::time::interval(self.settings.evaluation_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            tokio::select! {
                biased;
                () = self.shutdown.triggered() => break,
                Some(action) = self.actions.recv() => self.integrate(action),
                Some(command) = self.commands.recv() => self.handle(command),
                _ = ticker.tick() => self.pass().await,
            }
        }

        info!("Market owner stopped");
    }

    fn model_mut(&mut self) -> &mut MarketModel {
        Arc::make_mut(&mut self.model)
    }

    fn integrate(&mut self, action: IntegrationAction) {
        let venue = action.venue.clone();
        let fetched_at = action.fetched_at;
        if let Some(category) = self.model_mut().apply(action) {
            // Published after the mutation, so woken waiters read fresh data.
            if let Ok(driver) = self.venues.get(&venue) {
                driver.signals().publish(category, fetched_at);
            }
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Read(f) => f(&self.model),
            Command::Snapshot(reply) => {
                let _ = reply.send(Arc::clone(&self.model));
            }
            Command::SetCoinsOfInterest(coins) => {
                info!(coins = coins.len(), "Coins of interest changed");
                for driver in self.venues.iter() {
                    driver.set_coins_of_interest(coins.clone());
                }
                self.model_mut().set_coins_of_interest(coins);
            }
        }
    }

    /// One discovery/evaluation/execution pass.
    async fn pass(&mut self) {
        if !self.state.loop_finder_running() {
            return;
        }

        let discovery_due = self.model.cycles_stale()
            || self
                .last_discovery
                .map_or(true, |at| at.elapsed() >= self.settings.discovery_interval);
        if discovery_due {
            match self.discover().await {
                Ok(cycles) => {
                    debug!(cycles = cycles.len(), "Cycles discovered");
                    self.model_mut().set_cycles(cycles);
                    self.last_discovery = Some(Instant::now());
                }
                Err(e) if e.is_cancelled() => return,
                Err(e) => {
                    error!(error = %e, "Loop discovery failed");
                    return;
                }
            }
        }

        let loops = match self.evaluate().await {
            Ok(loops) => loops,
            Err(e) => {
                error!(error = %e, "Loop evaluation failed");
                return;
            }
        };
        self.model_mut().set_loops(loops);

        if self.state.trading_enabled() {
            self.execute_best().await;
        }
    }

    async fn discover(&self) -> Result<Vec<Cycle>> {
        let pairs: Vec<_> = self.model.pairs_of_interest().map(|p| p.key().clone()).collect();
        let settings = self.settings.discovery;
        let shutdown = self.shutdown.clone();
        tokio::task::spawn_blocking(move || find_cycles(&pairs, &settings, &shutdown))
            .await
            .map_err(|e| Error::Worker(format!("discovery: {e}")))?
    }

    async fn evaluate(&self) -> Result<Vec<Loop>> {
        let model = Arc::clone(&self.model);
        let settings = self.settings.evaluation;
        tokio::task::spawn_blocking(move || evaluate_all(&model, model.cycles(), &settings))
            .await
            .map_err(|e| Error::Worker(format!("evaluation: {e}")))
    }

    fn cooling_down(&mut self) -> bool {
        let Some(cooldown) = &self.cooldown else {
            return false;
        };
        // An inactive venue publishes no balances and cannot hold the others back.
        let refreshed = cooldown.venues.iter().all(|venue| {
            self.venues.get(venue).map_or(true, |driver| {
                !driver.is_active()
                    || driver
                        .signals()
                        .last_updated(Category::Balances)
                        .is_some_and(|at| at > cooldown.executed_at)
            })
        });
        if refreshed {
            self.cooldown = None;
        }
        !refreshed
    }

    async fn execute_best(&mut self) {
        let Some(best) = self.model.loops().first().cloned() else {
            return;
        };
        if !best.is_executable() {
            debug!(route = %best.route(), scale = %best.trade_scale, "Best loop not executable");
            return;
        }
        if self.cooling_down() {
            debug!("Waiting for balances after last execution");
            return;
        }
        if self.state.dry_run() {
            info!(
                route = %best.route(),
                ratio = %best.profit_ratio,
                scale = %best.trade_scale,
                "Dry run, loop not executed"
            );
            return;
        }

        let executed_at = Utc::now();
        let model = Arc::clone(&self.model);
        let result = execute_loop(&best, &model, &self.venues).await;
        drop(model);

        let mut venues: Vec<VenueId> = best
            .cycle
            .pairs()
            .iter()
            .filter(|p| !p.is_cross())
            .map(|p| p.venue.clone())
            .collect();
        venues.sort();
        venues.dedup();
        self.cooldown = Some(Cooldown {
            executed_at,
            venues,
        });

        match result {
            Ok(_) => {}
            Err(e) if e.is_cancelled() => debug!("Loop execution cancelled"),
            Err(e) => {
                warn!(error = %e, "Loop execution failed, halting trading and loop finding");
                self.state.halt(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::paper::PaperVenue;
    use crate::domain::{Balance, CoinId};
    use crate::exchange::{action_queue, ActionPayload, PairInfo, VenueDriver, VenueSettings};
    use crate::shutdown::Shutdown;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn interest() -> BTreeSet<Symbol> {
        ["BTC", "USDT"].into_iter().map(Symbol::from).collect()
    }

    #[tokio::test]
    async fn integrates_actions_and_publishes_signals() {
        let shutdown = Shutdown::new();
        let (tx, rx) = action_queue();
        let driver = VenueDriver::new(
            Arc::new(PaperVenue::new("alpha")),
            VenueSettings::uniform(Duration::from_millis(10), Decimal::ZERO),
            interest(),
            tx.clone(),
            shutdown.signal(),
        );
        let mut venues = VenueRegistry::new();
        venues.register(driver.clone());

        let (owner, handle) = Owner::new(
            MarketModel::new(interest(), dec!(1000)),
            rx,
            venues,
            Arc::new(EngineState::new(false, false, false)),
            OwnerSettings::default(),
            shutdown.signal(),
        );
        let task = tokio::spawn(owner.run());

        let venue = VenueId::from("alpha");
        let fetched_at = Utc::now();
        tx.send(IntegrationAction::new(
            venue.clone(),
            fetched_at,
            ActionPayload::Pairs {
                pairs: vec![PairInfo::new("BTC", "USDT")],
                fee: dec!(0.001),
            },
        ))
        .unwrap();
        tx.send(IntegrationAction::new(
            venue.clone(),
            fetched_at,
            ActionPayload::Balances(vec![Balance::new(CoinId::new("BTC", "alpha"), dec!(2), fetched_at)]),
        ))
        .unwrap();

        let available = handle
            .read(|model| model.available(&CoinId::new("BTC", "alpha")))
            .await
            .unwrap();
        assert_eq!(available, dec!(2));
        assert_eq!(driver.signals().last_updated(Category::Balances), Some(fetched_at));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.venue(&venue).unwrap().pairs().len(), 1);

        shutdown.trigger();
        task.await.unwrap();
        assert!(matches!(handle.read(|_| ()).await, Err(Error::OwnerGone)));
    }

    #[tokio::test]
    async fn cooldown_ignores_deactivated_venues() {
        let shutdown = Shutdown::new();
        let (tx, rx) = action_queue();
        let driver = VenueDriver::new(
            Arc::new(PaperVenue::new("alpha")),
            VenueSettings::uniform(Duration::from_millis(10), Decimal::ZERO),
            interest(),
            tx,
            shutdown.signal(),
        );
        let mut venues = VenueRegistry::new();
        venues.register(driver.clone());
        let (mut owner, _handle) = Owner::new(
            MarketModel::new(interest(), dec!(1000)),
            rx,
            venues,
            Arc::new(EngineState::new(true, true, false)),
            OwnerSettings::default(),
            shutdown.signal(),
        );

        driver.set_active(true).await.unwrap();
        owner.cooldown = Some(Cooldown {
            executed_at: Utc::now(),
            venues: vec![VenueId::from("alpha")],
        });
        assert!(owner.cooling_down());

        driver.set_active(false).await.unwrap();
        assert!(!owner.cooling_down());
        assert!(owner.cooldown.is_none());
        shutdown.trigger();
    }
}
