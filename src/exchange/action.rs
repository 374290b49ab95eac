//! Integration actions: deferred mutations produced by venue refreshes.
//!
//! A refresh fetches into a local buffer and sends exactly one
//! [`IntegrationAction`] over the process-wide queue. Only the market owner
//! receives from the queue, so only the owner ever applies mutations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use super::signal::Category;
use super::traits::{BookSnapshot, PairInfo};
use crate::domain::{Balance, Position, VenueId};
use crate::error::{Error, Result};

/// Data carried by an integration action.
#[derive(Debug, Clone)]
pub enum ActionPayload {
    /// Replace the venue's pair, coin and balance-placeholder sets.
    Pairs { pairs: Vec<PairInfo>, fee: Decimal },
    /// Replace every listed pair's two books.
    MarketData(Vec<BookSnapshot>),
    Balances(Vec<Balance>),
    /// Full set of open orders; missing ones are closed.
    Positions(Vec<Position>),
    TradeHistory(Vec<Position>),
    /// The venue's polling loop started.
    Activated,
    /// The venue's polling loop stopped, on request or after an error.
    Deactivated,
}

impl ActionPayload {
    /// Category whose "updated" signal fires once this payload is integrated.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::MarketData(_) => Some(Category::MarketData),
            Self::Balances(_) => Some(Category::Balances),
            Self::Positions(_) => Some(Category::Positions),
            Self::TradeHistory(_) => Some(Category::TradeHistory),
            Self::Pairs { .. } | Self::Activated | Self::Deactivated => None,
        }
    }
}

/// One deferred mutation of one venue's data.
#[derive(Debug, Clone)]
pub struct IntegrationAction {
    pub venue: VenueId,
    /// When the underlying fetch started.
    pub fetched_at: DateTime<Utc>,
    pub payload: ActionPayload,
}

impl IntegrationAction {
    #[must_use]
    pub fn new(venue: VenueId, fetched_at: DateTime<Utc>, payload: ActionPayload) -> Self {
        Self {
            venue,
            fetched_at,
            payload,
        }
    }
}

/// Producer handle of the integration queue. Cloned into every venue driver.
#[derive(Debug, Clone)]
pub struct ActionSender {
    tx: mpsc::UnboundedSender<IntegrationAction>,
}

impl ActionSender {
    pub fn send(&self, action: IntegrationAction) -> Result<()> {
        self.tx.send(action).map_err(|_| Error::OwnerGone)
    }
}

/// Consumer handle of the integration queue. Held by the owner only.
pub type ActionReceiver = mpsc::UnboundedReceiver<IntegrationAction>;

/// Create the process-wide integration queue.
#[must_use]
pub fn action_queue() -> (ActionSender, ActionReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ActionSender { tx }, rx)
}
