//! A fishing instance: both bait directions on one pair of venues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::trade::{FishingParams, FishingPort, FishingTrade};
use crate::domain::{Direction, PairKey};
use crate::error::{ConfigError, Error, Result};
use crate::shutdown::ShutdownSignal;

/// What to fish: the reference pair on venue A, the same pair on venue B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FishingDefinition {
    pub reference: PairKey,
    pub target: PairKey,
    pub params: FishingParams,
}

impl FishingDefinition {
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| -> Error {
            ConfigError::InvalidValue {
                field: "fishing",
                reason,
            }
            .into()
        };
        if self.reference.symbol_pair() != self.target.symbol_pair() {
            return Err(invalid(format!(
                "{} and {} are different pairs",
                self.reference, self.target
            )));
        }
        if self.reference.venue == self.target.venue || self.reference.is_cross() || self.target.is_cross() {
            return Err(invalid(format!(
                "{} and {} must be on two distinct real venues",
                self.reference, self.target
            )));
        }
        let p = &self.params;
        if p.scale <= rust_decimal::Decimal::ZERO || p.scale > rust_decimal::Decimal::ONE {
            return Err(invalid(format!("scale {} outside (0, 1]", p.scale)));
        }
        if p.offset_min < rust_decimal::Decimal::ZERO {
            return Err(invalid(format!("offset_min {} is negative", p.offset_min)));
        }
        if p.offset_min > p.offset_max {
            return Err(invalid(format!(
                "offset_min {} above offset_max {}",
                p.offset_min, p.offset_max
            )));
        }
        Ok(())
    }
}

/// Read-only view of an instance for the operator.
#[derive(Debug, Clone, Serialize)]
pub struct FishingView {
    pub id: u64,
    pub definition: FishingDefinition,
    pub active: bool,
    pub trades: Vec<FishingTrade>,
}

/// Both directions of one fishing definition and their switches.
pub struct FishingInstance {
    id: u64,
    definition: FishingDefinition,
    active: AtomicBool,
    disposed: AtomicBool,
    /// `true` while the instance should be fishing.
    running: watch::Sender<bool>,
    /// Slot 0 baits base-to-quote, slot 1 quote-to-base.
    trades: Mutex<[Option<FishingTrade>; 2]>,
    view: RwLock<Vec<FishingTrade>>,
}

impl FishingInstance {
    #[must_use]
    pub fn new(id: u64, definition: FishingDefinition, active: bool) -> Self {
        Self {
            id,
            definition,
            active: AtomicBool::new(active),
            disposed: AtomicBool::new(false),
            running: watch::channel(active).0,
            trades: Mutex::new([None, None]),
            view: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn definition(&self) -> &FishingDefinition {
        &self.definition
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Deactivation interrupts a step waiting on a venue and withdraws
    /// live baits.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
        self.running.send_replace(active && !self.is_disposed());
    }

    /// Ask the polling loop to withdraw baits and exit.
    pub fn dispose(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.disposed.store(true, Ordering::SeqCst);
        self.running.send_replace(false);
    }

    /// Follows whether the instance should be fishing.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn view(&self) -> FishingView {
        FishingView {
            id: self.id,
            definition: self.definition.clone(),
            active: self.is_active(),
            trades: self.view.read().clone(),
        }
    }

    /// Advance both directions once, recreating finished trades while active.
    pub async fn step(&self, port: &dyn FishingPort) -> Result<()> {
        if !self.is_active() {
            return self.withdraw(port).await;
        }

        let mut slots = self.trades.lock().await;
        let mut failure = None;
        for (slot, direction) in slots
            .iter_mut()
            .zip([Direction::BaseToQuote, Direction::QuoteToBase])
        {
            if slot.as_ref().map_or(true, |t| t.state().is_terminal()) {
                *slot = Some(FishingTrade::new(
                    direction,
                    self.definition.reference.clone(),
                    self.definition.target.clone(),
                ));
            }
            if let Some(trade) = slot.as_mut() {
                if let Err(e) = trade.update(port, &self.definition.params).await {
                    if e.is_cancelled() {
                        failure = Some(e);
                        break;
                    }
                    failure.get_or_insert(e);
                }
            }
        }
        self.publish(&slots);
        failure.map_or(Ok(()), Err)
    }

    /// Cancel every live bait and clear both slots.
    pub async fn withdraw(&self, port: &dyn FishingPort) -> Result<()> {
        let mut slots = self.trades.lock().await;
        for slot in slots.iter_mut() {
            if let Some(trade) = slot.as_mut() {
                trade.dispose(port).await?;
            }
        }
        self.publish(&slots);
        *slots = [None, None];
        Ok(())
    }

    fn publish(&self, slots: &[Option<FishingTrade>; 2]) {
        *self.view.write() = slots.iter().flatten().cloned().collect();
    }

    /// Polling loop of this instance.
    pub async fn run(self: Arc<Self>, port: Arc<dyn FishingPort>, period: Duration, shutdown: ShutdownSignal) {
        info!(id = self.id, reference = %self.definition.reference, target = %self.definition.target, "Fishing started");

        let mut running = self.subscribe();
        loop {
            if shutdown.is_triggered() || self.is_disposed() {
                break;
            }
            match self.step(port.as_ref()).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    debug!(id = self.id, "Fishing cancelled");
                    break;
                }
                Err(Error::Interrupted) => {
                    debug!(id = self.id, "Fishing step interrupted");
                    continue;
                }
                Err(e) => warn!(id = self.id, error = %e, "Fishing step failed"),
            }
            tokio::select! {
                () = tokio::time::sleep(period) => {}
                () = shutdown.triggered() => {}
                _ = running.changed() => {}
            }
        }

        if let Err(e) = self.withdraw(port.as_ref()).await {
            warn!(id = self.id, error = %e, "Failed to withdraw baits");
        }
        info!(id = self.id, "Fishing stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn definition(target_venue: &str, target_base: &str) -> FishingDefinition {
        FishingDefinition {
            reference: PairKey::new("alpha", "BTC", "USDT"),
            target: PairKey::new(target_venue, target_base, "USDT"),
            params: FishingParams {
                scale: dec!(0.5),
                min_volume: None,
                max_volume: None,
                offset_min: dec!(0.01),
                offset_max: dec!(0.05),
            },
        }
    }

    #[test]
    fn same_pair_on_two_venues_is_valid() {
        assert!(definition("beta", "BTC").validate().is_ok());
    }

    #[test]
    fn mismatched_or_same_venue_definitions_are_rejected() {
        assert!(definition("beta", "ETH").validate().is_err());
        assert!(definition("alpha", "BTC").validate().is_err());

        let mut inverted = definition("beta", "BTC");
        inverted.params.offset_min = dec!(0.1);
        assert!(inverted.validate().is_err());

        let mut oversized = definition("beta", "BTC");
        oversized.params.scale = dec!(1.5);
        assert!(oversized.validate().is_err());
    }

    #[test]
    fn negative_offsets_are_rejected() {
        let mut below = definition("beta", "BTC");
        below.params.offset_min = dec!(-1);
        below.params.offset_max = dec!(0);
        assert!(below.validate().is_err());

        let mut zero = definition("beta", "BTC");
        zero.params.offset_min = dec!(0);
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn switching_off_is_signalled_to_subscribers() {
        let instance = FishingInstance::new(3, definition("beta", "BTC"), true);
        let running = instance.subscribe();
        assert!(*running.borrow());

        instance.set_active(false);
        assert!(!*running.borrow());
        instance.set_active(true);
        assert!(*running.borrow());

        instance.dispose();
        instance.set_active(true);
        assert!(!*running.borrow());
    }

    #[test]
    fn dispose_deactivates() {
        let instance = FishingInstance::new(7, definition("beta", "BTC"), true);
        instance.dispose();
        assert!(!instance.is_active());
        assert!(instance.is_disposed());
        assert_eq!(instance.view().id, 7);
    }
}
