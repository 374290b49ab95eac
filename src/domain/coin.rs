//! Coins and their per-venue balances.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::{CoinId, PairKey, Symbol, VenueId};
use super::money::Volume;

/// A currency held on one venue.
///
/// Identity is `(symbol, venue)`. The pair set and the balance are reached
/// by key through the owning venue collection; the coin holds no pointers.
#[derive(Debug, Clone, Serialize)]
pub struct Coin {
    id: CoinId,
    pairs: BTreeSet<PairKey>,
    /// Operator opted into tracking/trading this coin.
    pub of_interest: bool,
    /// Normalized external value (e.g. in a reference fiat), if known.
    pub value: Option<Decimal>,
}

impl Coin {
    #[must_use]
    pub fn new(id: CoinId) -> Self {
        Self {
            id,
            pairs: BTreeSet::new(),
            of_interest: false,
            value: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &CoinId {
        &self.id
    }

    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.id.symbol
    }

    #[must_use]
    pub fn venue(&self) -> &VenueId {
        &self.id.venue
    }

    /// Pairs this coin participates in, as base or quote.
    #[must_use]
    pub fn pairs(&self) -> &BTreeSet<PairKey> {
        &self.pairs
    }

    pub(crate) fn link_pair(&mut self, pair: PairKey) {
        self.pairs.insert(pair);
    }

    /// Forget every linked pair, ahead of a full relisting.
    pub(crate) fn unlink_all(&mut self) {
        self.pairs.clear();
    }
}

impl PartialEq for Coin {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Coin {}

/// Balance of one coin on one venue.
///
/// `available = total - held - unconfirmed - pending_withdraw` is maintained
/// by the venue feed and is not recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Balance {
    coin: CoinId,
    pub total: Volume,
    pub available: Volume,
    pub unconfirmed: Volume,
    pub held: Volume,
    pub pending_withdraw: Volume,
    pub timestamp: DateTime<Utc>,
}

impl Balance {
    /// Fully available balance with nothing held or pending.
    #[must_use]
    pub fn new(coin: CoinId, total: Volume, timestamp: DateTime<Utc>) -> Self {
        Self {
            coin,
            total,
            available: total,
            unconfirmed: Decimal::ZERO,
            held: Decimal::ZERO,
            pending_withdraw: Decimal::ZERO,
            timestamp,
        }
    }

    /// Placeholder for a coin the venue lists but has not reported a balance for.
    #[must_use]
    pub fn empty(coin: CoinId) -> Self {
        Self::new(coin, Decimal::ZERO, DateTime::<Utc>::MIN_UTC)
    }

    /// Balance with explicit held/unconfirmed/pending components.
    #[must_use]
    pub fn with_components(
        coin: CoinId,
        total: Volume,
        held: Volume,
        unconfirmed: Volume,
        pending_withdraw: Volume,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            coin,
            total,
            available: total - held - unconfirmed - pending_withdraw,
            unconfirmed,
            held,
            pending_withdraw,
            timestamp,
        }
    }

    #[must_use]
    pub fn coin(&self) -> &CoinId {
        &self.coin
    }

    /// Move `volume` from available to held. Total never changes.
    pub fn hold(&mut self, volume: Volume) -> Result<(), DomainError> {
        if volume <= Decimal::ZERO {
            return Err(DomainError::NonPositiveVolume { volume });
        }
        if volume > self.available {
            return Err(DomainError::InsufficientBalance {
                coin: self.coin.clone(),
                requested: volume,
                available: self.available,
            });
        }
        self.available -= volume;
        self.held += volume;
        Ok(())
    }

    /// Whether `incoming` should replace this balance. Older snapshots are dropped.
    #[must_use]
    pub fn is_superseded_by(&self, incoming: &Balance) -> bool {
        incoming.timestamp >= self.timestamp
    }
}
