//! One bait/match state machine.
//!
//! A [`FishingTrade`] rests a bait order on the target venue, priced off the
//! reference venue, and trades the other way on the reference venue once
//! the bait is taken. It talks to the venues only through a [`FishingPort`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{Direction, OrderId, PairKey, Price, Trade, Volume};
use crate::error::Result;
use crate::exchange::OrderResult;

/// Which side of a fishing instance an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Leg {
    /// Venue A, where the match order is placed.
    Reference,
    /// Venue B, where the bait rests.
    Target,
}

/// Available balances of the four coins involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LegBalances {
    pub reference_base: Volume,
    pub reference_quote: Volume,
    pub target_base: Volume,
    pub target_quote: Volume,
}

/// Venue access needed by a fishing trade.
#[async_trait]
pub trait FishingPort: Send + Sync {
    /// Best price of the reference pair's `side` book.
    async fn best_price(&self, side: Direction) -> Result<Option<Price>>;

    async fn balances(&self) -> Result<LegBalances>;

    /// Whether `order_id` is still open, after a fresh positions refresh.
    async fn is_open(&self, leg: Leg, order_id: OrderId) -> Result<bool>;

    /// Whether `order_id` appears in the trade history, after a fresh refresh.
    async fn has_fill(&self, leg: Leg, order_id: OrderId) -> Result<bool>;

    async fn place(&self, leg: Leg, trade: &Trade) -> Result<OrderResult>;

    async fn cancel(&self, leg: Leg, order_id: OrderId) -> Result<()>;
}

/// Lifecycle of one fishing trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FishingState {
    /// Bait resting (or about to be placed) on the target venue.
    Fishing,
    /// Bait filled; match order placed on the reference venue.
    Taken,
    /// Ended without a completed round trip.
    Cancelled,
    /// Both bait and match filled.
    Profit,
}

impl FishingState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Profit)
    }
}

/// Pricing and sizing parameters shared by both directions of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FishingParams {
    /// Fraction of the sizable volume actually baited, in (0, 1].
    pub scale: Decimal,
    pub min_volume: Option<Volume>,
    pub max_volume: Option<Volume>,
    pub offset_min: Decimal,
    pub offset_max: Decimal,
}

impl FishingParams {
    #[must_use]
    pub fn mid_offset(&self) -> Decimal {
        (self.offset_min + self.offset_max) / Decimal::TWO
    }

    /// Bait price `offset` away from `reference`, in the bait's favour.
    ///
    /// A base-to-quote bait sells above the reference; a quote-to-base bait
    /// buys below it, with the offset applied in base-per-quote terms.
    #[must_use]
    pub fn bait_price(direction: Direction, reference: Price, offset: Decimal) -> Price {
        match direction {
            Direction::BaseToQuote => reference * (Decimal::ONE + offset),
            Direction::QuoteToBase => reference / (Decimal::ONE + offset),
        }
    }

    /// Whether `price` lies inside the tolerated offset band around `reference`.
    #[must_use]
    pub fn in_band(&self, direction: Direction, reference: Price, price: Price) -> bool {
        let a = Self::bait_price(direction, reference, self.offset_min);
        let b = Self::bait_price(direction, reference, self.offset_max);
        price >= a.min(b) && price <= a.max(b)
    }

    /// Clamp a sizable base volume by scale and limits. `None` when too small.
    #[must_use]
    pub fn size(&self, volume: Volume) -> Option<Volume> {
        let mut volume = volume * self.scale;
        if let Some(max) = self.max_volume {
            volume = volume.min(max);
        }
        if volume <= Decimal::ZERO || self.min_volume.is_some_and(|min| volume < min) {
            return None;
        }
        Some(volume)
    }
}

/// The resting bait and the match prepared for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bait {
    pub order_id: OrderId,
    pub trade: Trade,
    pub reference: Price,
    /// Trade to place on the reference venue if the bait is taken.
    pub matched: Trade,
}

/// One direction of a fishing instance.
#[derive(Debug, Clone, Serialize)]
pub struct FishingTrade {
    direction: Direction,
    reference_pair: PairKey,
    target_pair: PairKey,
    state: FishingState,
    bait: Option<Bait>,
    match_order: Option<OrderId>,
}

impl FishingTrade {
    /// New trade baiting in `direction` on `target_pair`.
    #[must_use]
    pub fn new(direction: Direction, reference_pair: PairKey, target_pair: PairKey) -> Self {
        Self {
            direction,
            reference_pair,
            target_pair,
            state: FishingState::Fishing,
            bait: None,
            match_order: None,
        }
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn state(&self) -> FishingState {
        self.state
    }

    #[must_use]
    pub fn bait(&self) -> Option<&Bait> {
        self.bait.as_ref()
    }

    #[must_use]
    pub fn match_order(&self) -> Option<OrderId> {
        self.match_order
    }

    /// Book on the reference pair the match order would take from.
    fn reference_side(&self) -> Direction {
        self.direction.opposite()
    }

    /// Advance the state machine by one step.
    pub async fn update(&mut self, port: &dyn FishingPort, params: &FishingParams) -> Result<()> {
        match self.state {
            FishingState::Fishing => self.update_fishing(port, params).await,
            FishingState::Taken => self.update_taken(port).await,
            FishingState::Cancelled | FishingState::Profit => Ok(()),
        }
    }

    /// Cancel a live bait and end the trade.
    pub async fn dispose(&mut self, port: &dyn FishingPort) -> Result<()> {
        if self.state != FishingState::Fishing {
            return Ok(());
        }
        self.state = FishingState::Cancelled;
        if let Some(bait) = self.bait.take() {
            port.cancel(Leg::Target, bait.order_id).await?;
            info!(pair = %self.target_pair, order_id = %bait.order_id, "Bait withdrawn");
        }
        Ok(())
    }

    async fn update_fishing(&mut self, port: &dyn FishingPort, params: &FishingParams) -> Result<()> {
        let Some(bait) = self.bait.clone() else {
            return self.place_bait(port, params, params.mid_offset()).await;
        };

        if !port.is_open(Leg::Target, bait.order_id).await? {
            if port.has_fill(Leg::Target, bait.order_id).await? {
                self.transition(FishingState::Taken);
                return self.place_match(port).await;
            }
            self.transition(FishingState::Cancelled);
            return Ok(());
        }

        let Some(reference) = port.best_price(self.reference_side()).await? else {
            return Ok(());
        };
        if !params.in_band(self.direction, reference, bait.trade.price) {
            debug!(
                pair = %self.target_pair,
                price = %bait.trade.price,
                reference = %reference,
                "Bait outside band, requoting"
            );
            port.cancel(Leg::Target, bait.order_id).await?;
            self.bait = None;
            return self.place_bait(port, params, params.mid_offset()).await;
        }
        Ok(())
    }

    async fn update_taken(&mut self, port: &dyn FishingPort) -> Result<()> {
        let Some(order_id) = self.match_order else {
            return Ok(());
        };
        if port.is_open(Leg::Reference, order_id).await? {
            return Ok(());
        }
        if port.has_fill(Leg::Reference, order_id).await? {
            self.transition(FishingState::Profit);
        } else {
            self.transition(FishingState::Cancelled);
        }
        Ok(())
    }

    async fn place_bait(
        &mut self,
        port: &dyn FishingPort,
        params: &FishingParams,
        offset: Decimal,
    ) -> Result<()> {
        let Some(reference) = port.best_price(self.reference_side()).await? else {
            debug!(pair = %self.reference_pair, "No reference price, bait deferred");
            return Ok(());
        };
        let price = FishingParams::bait_price(self.direction, reference, offset);
        let balances = port.balances().await?;

        // Base volume both legs can cover.
        let sizable = match self.direction {
            Direction::BaseToQuote => (balances.reference_quote / reference).min(balances.target_base),
            Direction::QuoteToBase => balances.reference_base.min(balances.target_quote / price),
        };
        let Some(base_volume) = params.size(sizable) else {
            debug!(pair = %self.target_pair, sizable = %sizable, "Balances too small to bait");
            return Ok(());
        };

        let (bait_in, match_in) = match self.direction {
            Direction::BaseToQuote => (base_volume, base_volume * reference),
            Direction::QuoteToBase => (base_volume * price, base_volume),
        };
        let trade = Trade::at_price(self.direction, self.target_pair.clone(), bait_in, price);
        let matched = Trade::at_price(
            self.reference_side(),
            self.reference_pair.clone(),
            match_in,
            reference,
        );

        let result = port.place(Leg::Target, &trade).await?;
        match result.order_id {
            Some(order_id) => {
                info!(
                    pair = %self.target_pair,
                    direction = ?self.direction,
                    price = %price,
                    volume = %base_volume,
                    order_id = %order_id,
                    "Bait placed"
                );
                self.bait = Some(Bait {
                    order_id,
                    trade,
                    reference,
                    matched,
                });
                Ok(())
            }
            None if result.filled_immediately() => {
                self.bait = Some(Bait {
                    order_id: OrderId::new(0),
                    trade,
                    reference,
                    matched,
                });
                self.transition(FishingState::Taken);
                self.place_match(port).await
            }
            None => {
                self.transition(FishingState::Cancelled);
                Ok(())
            }
        }
    }

    async fn place_match(&mut self, port: &dyn FishingPort) -> Result<()> {
        let Some(bait) = &self.bait else {
            self.transition(FishingState::Cancelled);
            return Ok(());
        };
        let matched = bait.matched.clone();
        let result = match port.place(Leg::Reference, &matched).await {
            Ok(result) => result,
            Err(e) => {
                self.transition(FishingState::Cancelled);
                return Err(e);
            }
        };
        info!(
            pair = %self.reference_pair,
            direction = ?matched.direction,
            price = %matched.price,
            "Match placed"
        );
        match result.order_id {
            Some(order_id) => self.match_order = Some(order_id),
            None if result.filled_immediately() => self.transition(FishingState::Profit),
            None => self.transition(FishingState::Cancelled),
        }
        Ok(())
    }

    fn transition(&mut self, next: FishingState) {
        if self.state != next {
            info!(
                pair = %self.target_pair,
                direction = ?self.direction,
                from = ?self.state,
                to = ?next,
                "Fishing state changed"
            );
            self.state = next;
        }
    }
}
