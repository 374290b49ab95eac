//! Per-category dirty flags and "updated since" signals.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::shutdown::ShutdownSignal;

/// Independently refreshed data categories of a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    MarketData,
    Balances,
    Positions,
    TradeHistory,
}

impl Category {
    pub const ALL: [Self; 4] = [
        Self::MarketData,
        Self::Balances,
        Self::Positions,
        Self::TradeHistory,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::MarketData => 0,
            Self::Balances => 1,
            Self::Positions => 2,
            Self::TradeHistory => 3,
        }
    }
}

/// "Needs update" flags forcing an out-of-schedule refresh.
#[derive(Debug, Default)]
pub struct DirtyFlags {
    flags: [AtomicBool; 4],
}

impl DirtyFlags {
    pub fn mark(&self, category: Category) {
        self.flags[category.index()].store(true, Ordering::SeqCst);
    }

    /// Read and clear the flag.
    pub fn take(&self, category: Category) -> bool {
        self.flags[category.index()].swap(false, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_marked(&self, category: Category) -> bool {
        self.flags[category.index()].load(Ordering::SeqCst)
    }
}

/// Timestamps of the last integrated refresh per category.
///
/// Only the owner publishes; anyone may wait.
#[derive(Debug)]
pub struct UpdateSignals {
    senders: [watch::Sender<Option<DateTime<Utc>>>; 4],
}

impl UpdateSignals {
    #[must_use]
    pub fn new() -> Self {
        Self {
            senders: std::array::from_fn(|_| watch::channel(None).0),
        }
    }

    /// Record that a refresh fetched at `at` has been integrated.
    /// Never moves a category's timestamp backwards.
    pub fn publish(&self, category: Category, at: DateTime<Utc>) {
        self.senders[category.index()].send_if_modified(|current| match current {
            Some(existing) if *existing >= at => false,
            _ => {
                *current = Some(at);
                true
            }
        });
    }

    #[must_use]
    pub fn last_updated(&self, category: Category) -> Option<DateTime<Utc>> {
        *self.senders[category.index()].borrow()
    }

    /// Wait until a refresh fetched strictly after `since` has been integrated.
    pub async fn wait_after(
        &self,
        category: Category,
        since: DateTime<Utc>,
        shutdown: &ShutdownSignal,
    ) -> Result<DateTime<Utc>> {
        let mut rx = self.senders[category.index()].subscribe();
        tokio::select! {
            result = rx.wait_for(|ts| ts.is_some_and(|t| t > since)) => {
                let ts = result.map_err(|_| Error::OwnerGone)?;
                (*ts).ok_or(Error::OwnerGone)
            }
            () = shutdown.triggered() => Err(Error::Cancelled),
        }
    }
}

impl Default for UpdateSignals {
    fn default() -> Self {
        Self::new()
    }
}
