//! Venue driver: one background polling loop per venue.
//!
//! Each tick refreshes every category whose dirty flag is set or whose
//! period has elapsed. Refreshes run concurrently and the tick waits for all
//! of them. A refresh never mutates shared data: it fetches, then enqueues
//! one [`IntegrationAction`] for the owner.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::action::{ActionPayload, ActionSender, IntegrationAction};
use super::signal::{Category, DirtyFlags, UpdateSignals};
use super::traits::{OrderRequest, OrderResult, PairInfo, VenueClient};
use crate::domain::{OrderId, PairKey, Symbol, Trade, TradePair, VenueId};
use crate::error::{Error, Result};
use crate::shutdown::ShutdownSignal;

/// Connectivity status shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VenueStatus {
    Offline,
    Connecting,
    Connected,
    Stopped,
    Error,
}

/// Polling schedule and fee of one venue.
#[derive(Debug, Clone)]
pub struct VenueSettings {
    /// Minimum time between ticks.
    pub poll_period: Duration,
    /// Refresh period per category, indexed by [`Category::index`].
    pub periods: [Duration; 4],
    /// Per-trade fee fraction applied to every pair of the venue.
    pub fee: Decimal,
}

impl VenueSettings {
    /// Every category refreshed on every tick.
    #[must_use]
    pub fn uniform(poll_period: Duration, fee: Decimal) -> Self {
        Self {
            poll_period,
            periods: [poll_period; 4],
            fee,
        }
    }

    #[must_use]
    pub fn period(&self, category: Category) -> Duration {
        self.periods[category.index()]
    }
}

struct PollTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Driver of one venue: owns its polling loop, flags and signals.
pub struct VenueDriver {
    id: VenueId,
    client: Arc<dyn VenueClient>,
    settings: VenueSettings,
    dirty: DirtyFlags,
    pairs_dirty: AtomicBool,
    signals: UpdateSignals,
    status: RwLock<VenueStatus>,
    active: AtomicBool,
    coins_of_interest: RwLock<BTreeSet<Symbol>>,
    known_pairs: Mutex<Vec<PairInfo>>,
    actions: ActionSender,
    shutdown: ShutdownSignal,
    task: tokio::sync::Mutex<Option<PollTask>>,
}

impl VenueDriver {
    pub fn new(
        client: Arc<dyn VenueClient>,
        settings: VenueSettings,
        coins_of_interest: BTreeSet<Symbol>,
        actions: ActionSender,
        shutdown: ShutdownSignal,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: client.venue().clone(),
            client,
            settings,
            dirty: DirtyFlags::default(),
            pairs_dirty: AtomicBool::new(true),
            signals: UpdateSignals::new(),
            status: RwLock::new(VenueStatus::Offline),
            active: AtomicBool::new(false),
            coins_of_interest: RwLock::new(coins_of_interest),
            known_pairs: Mutex::new(Vec::new()),
            actions,
            shutdown,
            task: tokio::sync::Mutex::new(None),
        })
    }

    #[must_use]
    pub fn id(&self) -> &VenueId {
        &self.id
    }

    #[must_use]
    pub fn settings(&self) -> &VenueSettings {
        &self.settings
    }

    #[must_use]
    pub fn status(&self) -> VenueStatus {
        *self.status.read()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn signals(&self) -> &UpdateSignals {
        &self.signals
    }

    /// Mark a category for refresh on the next tick.
    pub fn mark_dirty(&self, category: Category) {
        self.dirty.mark(category);
    }

    /// Replace the coins of interest; pairs are refetched on the next tick.
    pub fn set_coins_of_interest(&self, coins: BTreeSet<Symbol>) {
        *self.coins_of_interest.write() = coins;
        self.pairs_dirty.store(true, Ordering::SeqCst);
    }

    /// Wait for the owner to integrate a `category` refresh fetched after now.
    ///
    /// Marks the category dirty so the next tick refreshes it.
    pub async fn updated_since(&self, category: Category) -> Result<DateTime<Utc>> {
        let since = Utc::now();
        self.dirty.mark(category);
        self.signals.wait_after(category, since, &self.shutdown).await
    }

    /// Start or stop the polling loop.
    ///
    /// Starting forces a positions and balances refresh and tells the owner
    /// to invalidate discovered loops. Stopping joins the loop, so no action
    /// from this venue is enqueued after it returns.
    pub async fn set_active(self: &Arc<Self>, active: bool) -> Result<()> {
        let mut task = self.task.lock().await;
        if active {
            if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
                return Ok(());
            }
            self.active.store(true, Ordering::SeqCst);
            self.set_status(VenueStatus::Connecting);
            self.pairs_dirty.store(true, Ordering::SeqCst);
            self.dirty.mark(Category::Positions);
            self.dirty.mark(Category::Balances);
            self.enqueue(Utc::now(), ActionPayload::Activated)?;

            let (stop, stop_rx) = watch::channel(false);
            let handle = tokio::spawn(Arc::clone(self).run(stop_rx));
            *task = Some(PollTask { stop, handle });
            info!(venue = %self.id, "Venue activated");
        } else if let Some(PollTask { stop, handle }) = task.take() {
            let _ = stop.send(true);
            if let Err(e) = handle.await {
                error!(venue = %self.id, error = %e, "Venue loop panicked");
            }
            if self.active.swap(false, Ordering::SeqCst) {
                self.set_status(VenueStatus::Stopped);
                self.enqueue(Utc::now(), ActionPayload::Deactivated)?;
            }
            info!(venue = %self.id, "Venue deactivated");
        }
        Ok(())
    }

    /// Wait for the polling loop to exit. Used at shutdown.
    pub async fn join(&self) {
        if let Some(PollTask { handle, .. }) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                error!(venue = %self.id, error = %e, "Venue loop panicked");
            }
        }
    }

    /// Validate `trade` against `pair`, then place it.
    ///
    /// Invalid trades are refused before any network call.
    pub async fn place(&self, pair: &TradePair, trade: &Trade) -> Result<OrderResult> {
        trade.validate(pair)?;
        let request = OrderRequest::from_trade(trade);
        let result = self.client.create_order(&request).await?;
        info!(
            venue = %self.id,
            pair = %request.pair,
            direction = ?request.direction,
            volume = %request.volume,
            price = %request.price,
            order_id = ?result.order_id,
            fills = result.trade_ids.len(),
            "Order placed"
        );
        self.dirty.mark(Category::Balances);
        self.dirty.mark(Category::Positions);
        Ok(result)
    }

    pub async fn cancel(&self, pair: &PairKey, order_id: OrderId) -> Result<()> {
        self.client.cancel_order(pair, order_id).await?;
        info!(venue = %self.id, pair = %pair, order_id = %order_id, "Order cancelled");
        self.dirty.mark(Category::Positions);
        self.dirty.mark(Category::Balances);
        Ok(())
    }

    fn set_status(&self, status: VenueStatus) {
        *self.status.write() = status;
    }

    fn enqueue(&self, fetched_at: DateTime<Utc>, payload: ActionPayload) -> Result<()> {
        self.actions
            .send(IntegrationAction::new(self.id.clone(), fetched_at, payload))
    }

    async fn run(self: Arc<Self>, stop: watch::Receiver<bool>) {
        let mut last: [Option<Instant>; 4] = [None; 4];
        debug!(venue = %self.id, "Venue loop starting");

        loop {
            if *stop.borrow() || self.shutdown.is_triggered() {
                break;
            }
            let started = Instant::now();

            match self.tick(&mut last).await {
                Ok(()) => self.set_status(VenueStatus::Connected),
                Err(e) if e.is_cancelled() => {
                    debug!(venue = %self.id, "Venue loop cancelled");
                    break;
                }
                Err(e) => {
                    error!(venue = %self.id, error = %e, "Venue refresh failed, deactivating");
                    self.set_status(VenueStatus::Error);
                    self.active.store(false, Ordering::SeqCst);
                    let _ = self.enqueue(Utc::now(), ActionPayload::Deactivated);
                    break;
                }
            }

            let wait = self.settings.poll_period.saturating_sub(started.elapsed());
            let mut stop = stop.clone();
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                _ = stop.wait_for(|stopped| *stopped) => {}
                () = self.shutdown.triggered() => {}
            }
        }

        debug!(venue = %self.id, "Venue loop stopped");
    }

    async fn tick(&self, last: &mut [Option<Instant>; 4]) -> Result<()> {
        if self.pairs_dirty.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.cancellable(self.refresh_pairs()).await {
                self.pairs_dirty.store(true, Ordering::SeqCst);
                return Err(e);
            }
        }

        let due: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|&category| {
                let dirty = self.dirty.take(category);
                let overdue = last[category.index()]
                    .map_or(true, |at| at.elapsed() >= self.settings.period(category));
                dirty || overdue
            })
            .collect();

        let now = Instant::now();
        let results = join_all(
            due.iter()
                .map(|&category| self.cancellable(self.refresh(category))),
        )
        .await;

        for (category, result) in due.into_iter().zip(results) {
            result?;
            last[category.index()] = Some(now);
        }
        Ok(())
    }

    async fn cancellable<F>(&self, fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        tokio::select! {
            result = fut => result,
            () = self.shutdown.triggered() => Err(Error::Cancelled),
        }
    }

    async fn refresh_pairs(&self) -> Result<()> {
        let fetched_at = Utc::now();
        let coins = self.coins_of_interest.read().clone();
        let pairs = self.client.fetch_pairs(&coins).await?;
        debug!(venue = %self.id, pairs = pairs.len(), "Pairs fetched");
        self.known_pairs.lock().clone_from(&pairs);
        self.enqueue(
            fetched_at,
            ActionPayload::Pairs {
                pairs,
                fee: self.settings.fee,
            },
        )
    }

    async fn refresh(&self, category: Category) -> Result<()> {
        let fetched_at = Utc::now();
        let payload = match category {
            Category::MarketData => {
                let pairs = self.known_pairs.lock().clone();
                ActionPayload::MarketData(self.client.fetch_market_data(&pairs).await?)
            }
            Category::Balances => ActionPayload::Balances(self.client.fetch_balances().await?),
            Category::Positions => ActionPayload::Positions(self.client.fetch_positions().await?),
            Category::TradeHistory => {
                ActionPayload::TradeHistory(self.client.fetch_trade_history().await?)
            }
        };
        self.enqueue(fetched_at, payload)
    }
}
