//! Loop execution.
//!
//! Places one order per real hop of the chosen loop, all at once, and waits
//! for every placement to complete. Synthetic cross-venue hops move
//! pre-positioned inventory and place nothing.

use futures_util::future::join_all;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

use crate::domain::{Loop, Volume};
use crate::error::{Error, ExecutionError, Result};
use crate::exchange::{OrderResult, VenueRegistry};
use crate::market::MarketModel;

/// Outcome of a fully placed loop.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub route: String,
    pub trade_scale: Decimal,
    /// Start-coin volume entering the first hop.
    pub volume_in: Volume,
    /// Start-coin volume expected back, before fees.
    pub volume_out: Volume,
    /// Accumulated fee, in the start coin.
    pub fee: Volume,
    /// Placement results of the real hops, in hop order.
    pub orders: Vec<OrderResult>,
}

impl ExecutionReport {
    #[must_use]
    pub fn expected_profit(&self) -> Volume {
        self.volume_out - self.fee - self.volume_in
    }
}

/// Place every real hop of `chosen` at its scaled volume.
///
/// Any failed placement fails the whole call after all placements have
/// completed; the caller is expected to stop trading.
pub async fn execute_loop(
    chosen: &Loop,
    model: &MarketModel,
    venues: &VenueRegistry,
) -> Result<ExecutionReport> {
    if !chosen.is_executable() {
        return Err(ExecutionError::NotExecutable {
            route: chosen.route(),
            scale: chosen.trade_scale,
        }
        .into());
    }

    let trades = chosen.scaled_trades();
    let mut fee = Decimal::ZERO;
    let mut placements = Vec::with_capacity(trades.len());

    for (hop, trade) in trades.iter().enumerate() {
        let pair = model
            .pair(&trade.pair)
            .ok_or_else(|| Error::UnknownPair(trade.pair.clone()))?;
        fee = fee * trade.rate() + trade.volume_out * pair.fee();
        if pair.is_cross() {
            continue;
        }
        let driver = venues.get(pair.venue())?;
        placements.push(async move {
            driver.place(pair, trade).await.map_err(|e| {
                Error::from(ExecutionError::HopFailed {
                    hop,
                    pair: trade.pair.to_string(),
                    source: Box::new(e),
                })
            })
        });
    }

    let mut orders = Vec::with_capacity(placements.len());
    let mut failure = None;
    for result in join_all(placements).await {
        match result {
            Ok(order) => orders.push(order),
            Err(e) => {
                error!(route = %chosen.route(), error = %e, "Hop placement failed");
                failure.get_or_insert(e);
            }
        }
    }
    if let Some(e) = failure {
        return Err(e);
    }

    let report = ExecutionReport {
        route: chosen.route(),
        trade_scale: chosen.trade_scale,
        volume_in: trades.first().map_or(Decimal::ZERO, |t| t.volume_in),
        volume_out: trades.last().map_or(Decimal::ZERO, |t| t.volume_out),
        fee,
        orders,
    };
    info!(
        route = %report.route,
        scale = %report.trade_scale,
        volume = %report.volume_in,
        expected_profit = %report.expected_profit(),
        fee = %report.fee,
        "Loop executed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::paper::{PaperOperation, PaperVenue};
    use crate::domain::{Balance, CoinId, Cycle, LoopDirection, Order, PairKey, Symbol, VenueId};
    use crate::evaluation::{evaluate, EvaluationSettings};
    use crate::exchange::{
        action_queue, ActionPayload, BookSnapshot, IntegrationAction, PairInfo, VenueDriver,
        VenueSettings,
    };
    use crate::shutdown::Shutdown;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn symbols() -> BTreeSet<Symbol> {
        ["X", "Y"].into_iter().map(Symbol::from).collect()
    }

    fn paper() -> Arc<PaperVenue> {
        let venue = PaperVenue::new("alpha");
        venue.add_pair(PairInfo::new("X", "Y"));
        venue.add_pair(PairInfo::new("Y", "X"));
        venue.set_book("X", "Y", vec![Order::new(dec!(10), dec!(100))], vec![Order::new(dec!(11), dec!(100))]);
        venue.set_book("Y", "X", vec![Order::new(dec!(0.11), dec!(2000))], vec![Order::new(dec!(0.12), dec!(2000))]);
        venue.set_balance("X", dec!(1000));
        venue.set_balance("Y", dec!(100000));
        Arc::new(venue)
    }

    fn model() -> MarketModel {
        let venue = VenueId::from("alpha");
        let mut model = MarketModel::new(symbols(), dec!(1000000));
        let now = Utc::now();
        for payload in [
            ActionPayload::Activated,
            ActionPayload::Pairs {
                pairs: vec![PairInfo::new("X", "Y"), PairInfo::new("Y", "X")],
                fee: Decimal::ZERO,
            },
            ActionPayload::MarketData(vec![
                BookSnapshot {
                    base: Symbol::from("X"),
                    quote: Symbol::from("Y"),
                    buys: vec![Order::new(dec!(10), dec!(100))],
                    sells: vec![Order::new(dec!(11), dec!(100))],
                },
                BookSnapshot {
                    base: Symbol::from("Y"),
                    quote: Symbol::from("X"),
                    buys: vec![Order::new(dec!(0.11), dec!(2000))],
                    sells: vec![Order::new(dec!(0.12), dec!(2000))],
                },
            ]),
            ActionPayload::Balances(vec![
                Balance::new(CoinId::new("X", "alpha"), dec!(1000), now),
                Balance::new(CoinId::new("Y", "alpha"), dec!(100000), now),
            ]),
        ] {
            model.apply(IntegrationAction::new(venue.clone(), now, payload));
        }
        model
    }

    fn chosen(model: &MarketModel) -> Loop {
        let cycle = Cycle::new(
            vec![CoinId::new("X", "alpha"), CoinId::new("Y", "alpha")],
            vec![PairKey::new("alpha", "X", "Y"), PairKey::new("alpha", "Y", "X")],
        )
        .unwrap();
        evaluate(model, &cycle, LoopDirection::Forward, &EvaluationSettings::default()).unwrap()
    }

    fn registry(venue: Arc<PaperVenue>) -> VenueRegistry {
        let (tx, _rx) = action_queue();
        let shutdown = Shutdown::new();
        let mut registry = VenueRegistry::new();
        registry.register(VenueDriver::new(
            venue,
            VenueSettings::uniform(Duration::from_millis(10), Decimal::ZERO),
            symbols(),
            tx,
            shutdown.signal(),
        ));
        registry
    }

    #[tokio::test]
    async fn places_one_order_per_hop() {
        let venue = paper();
        let model = model();
        let report = execute_loop(&chosen(&model), &model, &registry(venue.clone()))
            .await
            .unwrap();

        assert_eq!(report.orders.len(), 2);
        assert_eq!(report.expected_profit(), dec!(10));
        let placed = venue.order_log();
        assert_eq!(placed.len(), 2);
        assert!(placed.iter().any(|o| o.pair == PairKey::new("alpha", "X", "Y") && o.volume == dec!(100)));
    }

    #[tokio::test]
    async fn failed_hop_fails_execution() {
        let venue = paper();
        venue.fail_next(PaperOperation::CreateOrder);
        let model = model();
        let err = execute_loop(&chosen(&model), &model, &registry(venue))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Execution(ExecutionError::HopFailed { .. })));
    }

    #[tokio::test]
    async fn zero_scale_is_refused() {
        let model = model();
        let mut chosen = chosen(&model);
        chosen.trade_scale = Decimal::ZERO;
        let err = execute_loop(&chosen, &model, &registry(paper())).await.unwrap_err();
        assert!(matches!(err, Error::Execution(ExecutionError::NotExecutable { .. })));
    }
}
