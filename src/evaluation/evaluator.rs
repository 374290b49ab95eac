//! Profitability evaluation and trade scaling of discovered cycles.

use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use super::rates::{hop_ladder, merge, profitable_volume};
use crate::domain::{
    CoinId, Cycle, DomainError, Hop, Loop, LoopDirection, Trade, TradePair, Volume,
};
use crate::market::MarketModel;

/// Tunables of the evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSettings {
    /// Fraction of an available balance a hop may plan to spend.
    pub balance_safety_factor: Decimal,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            balance_safety_factor: Decimal::new(999, 3),
        }
    }
}

struct Simulation {
    trades: Vec<Trade>,
    final_volume: Volume,
    fee: Volume,
}

/// Run the trades hop by hop, carrying the fee in the current coin.
fn simulate(hops: &[Hop], pairs: &[&TradePair], volume: Volume) -> Result<Simulation, DomainError> {
    let mut trades = Vec::with_capacity(hops.len());
    let mut current = volume;
    let mut fee = Decimal::ZERO;

    for (hop, pair) in hops.iter().zip(pairs) {
        let trade = pair.convert(hop.direction, current)?;
        fee = fee * trade.rate() + trade.volume_out * pair.fee();
        current = trade.volume_out;
        trades.push(trade);
    }

    Ok(Simulation {
        trades,
        final_volume: current,
        fee,
    })
}

/// Evaluate `cycle` traversed in `direction`.
///
/// Returns `None` when the loop is not profitable after fees, when a pair
/// is unknown, or when the unscaled trades do not fit the books and ranges.
#[must_use]
pub fn evaluate(
    model: &MarketModel,
    cycle: &Cycle,
    direction: LoopDirection,
    settings: &EvaluationSettings,
) -> Option<Loop> {
    let hops = cycle.hops(direction);
    let pairs: Vec<&TradePair> = hops
        .iter()
        .map(|hop| model.pair(&hop.pair))
        .collect::<Option<_>>()?;

    let available = model.available(cycle.start());
    let cap = (available > Decimal::ZERO).then_some(available);

    let mut rates = hop_ladder(pairs[0], hops[0].direction);
    for (hop, pair) in hops.iter().zip(&pairs).skip(1) {
        rates = merge(&rates, &hop_ladder(pair, hop.direction), cap);
    }
    if !rates.iter().any(|t| t.rate > Decimal::ONE) {
        return None;
    }

    let trade_volume = profitable_volume(&rates);
    let simulation = match simulate(&hops, &pairs, trade_volume) {
        Ok(simulation) => simulation,
        Err(e) => {
            trace!(cycle = cycle.key(), error = %e, "Simulation failed");
            return None;
        }
    };

    let net = simulation.final_volume - simulation.fee;
    let profit_ratio = net / trade_volume;
    if profit_ratio <= Decimal::ONE {
        return None;
    }

    let real: Vec<(&Trade, &TradePair)> = simulation
        .trades
        .iter()
        .zip(pairs.iter().copied())
        .filter(|(_, pair)| !pair.is_cross())
        .collect();

    for (trade, pair) in &real {
        if let Err(e) = trade.validate(pair) {
            debug!(cycle = cycle.key(), error = %e, "Unscaled trade invalid, loop rejected");
            return None;
        }
    }

    let mut trade_scale = Decimal::ONE;
    let mut limiting_coin = None;
    for (trade, pair) in &real {
        let needed = trade.volume_in * (Decimal::ONE + pair.fee());
        let hop_scale = (model.available(trade.coin_in()) * settings.balance_safety_factor / needed)
            .clamp(Decimal::ZERO, Decimal::ONE);
        if hop_scale < trade_scale {
            trade_scale = hop_scale;
            limiting_coin = Some(trade.coin_in().clone());
        }
    }

    let mut insufficient: Vec<CoinId> = Vec::new();
    if trade_scale > Decimal::ZERO {
        for (trade, pair) in &real {
            if let Err(e) = trade.scaled(trade_scale).validate(pair) {
                let coin = match e {
                    DomainError::VolumeOutOfRange { coin, .. } => coin,
                    _ => trade.coin_in().clone(),
                };
                if !insufficient.contains(&coin) {
                    insufficient.push(coin);
                }
            }
        }
        if !insufficient.is_empty() {
            trade_scale = Decimal::ZERO;
        }
    }

    Some(Loop {
        cycle: cycle.clone(),
        direction,
        rates,
        trade_volume,
        trade_scale,
        profit: net - trade_volume,
        profit_ratio,
        limiting_coin,
        insufficient,
        trades: simulation.trades,
    })
}

/// Evaluate every cycle in both directions, best profit ratio first.
#[must_use]
pub fn evaluate_all(model: &MarketModel, cycles: &[Cycle], settings: &EvaluationSettings) -> Vec<Loop> {
    let mut loops: Vec<Loop> = cycles
        .par_iter()
        .flat_map_iter(|cycle| {
            LoopDirection::BOTH
                .into_iter()
                .filter_map(move |direction| evaluate(model, cycle, direction, settings))
        })
        .collect();
    loops.sort_by(|a, b| b.profit_ratio.cmp(&a.profit_ratio));
    debug!(cycles = cycles.len(), profitable = loops.len(), "Evaluation pass finished");
    loops
}
