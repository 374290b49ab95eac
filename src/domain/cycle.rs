//! Closed trading cycles ("loops").
//!
//! A [`Cycle`] is the structure: coins `c0..cn` and pairs `p0..pn`, where
//! `p[i]` connects `c[i]` and `c[(i + 1) % n]`. It is stored in canonical
//! form so that every rotation and reversal of the same cycle yields the
//! same [`Cycle::key`].
//!
//! A [`Loop`] is a cycle evaluated in one traversal direction. Loops are
//! value objects rebuilt on every evaluation pass.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::{CoinId, PairKey};
use super::money::Volume;
use super::trade::{Direction, Trade};

/// Traversal direction of a cycle, starting and ending at `c0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoopDirection {
    /// `c0 -> c1 -> ... -> c0`
    Forward,
    /// `c0 -> c(n-1) -> ... -> c0`
    Reverse,
}

impl LoopDirection {
    pub const BOTH: [Self; 2] = [Self::Forward, Self::Reverse];
}

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub pair: PairKey,
    pub coin_in: CoinId,
    pub coin_out: CoinId,
    pub direction: Direction,
}

/// A simple cycle over coins and pairs, in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    coins: Vec<CoinId>,
    pairs: Vec<PairKey>,
    key: String,
}

impl Cycle {
    /// Build a cycle from `coins` and `pairs`, where `pairs[i]` connects
    /// `coins[i]` and `coins[(i + 1) % n]`.
    pub fn new(coins: Vec<CoinId>, pairs: Vec<PairKey>) -> Result<Self, DomainError> {
        let n = coins.len();
        if n < 2 || pairs.len() != n {
            return Err(DomainError::MalformedLoop(format!(
                "{} coins and {} pairs",
                n,
                pairs.len()
            )));
        }
        for (i, pair) in pairs.iter().enumerate() {
            if !pair.connects(&coins[i], &coins[(i + 1) % n]) {
                return Err(DomainError::MalformedLoop(format!(
                    "{pair} does not connect {} and {}",
                    coins[i],
                    coins[(i + 1) % n]
                )));
            }
        }
        for i in 0..n {
            if coins[i + 1..].contains(&coins[i]) || pairs[i + 1..].contains(&pairs[i]) {
                return Err(DomainError::MalformedLoop("repeated coin or pair".into()));
            }
        }

        let (coins, pairs) = canonicalize(coins, pairs);
        let key = pairs.iter().map(ToString::to_string).collect::<Vec<_>>().join("|");
        Ok(Self { coins, pairs, key })
    }

    /// Rotation- and direction-invariant description, used for deduplication.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn coins(&self) -> &[CoinId] {
        &self.coins
    }

    #[must_use]
    pub fn pairs(&self) -> &[PairKey] {
        &self.pairs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Coin every traversal starts and ends with.
    #[must_use]
    pub fn start(&self) -> &CoinId {
        &self.coins[0]
    }

    /// Hops in traversal order for `direction`.
    #[must_use]
    pub fn hops(&self, direction: LoopDirection) -> Vec<Hop> {
        let n = self.coins.len();
        let step = |i: usize, coin_in: &CoinId, coin_out: &CoinId| {
            let pair = self.pairs[i].clone();
            let dir = if &pair.base == coin_in {
                Direction::BaseToQuote
            } else {
                Direction::QuoteToBase
            };
            Hop {
                pair,
                coin_in: coin_in.clone(),
                coin_out: coin_out.clone(),
                direction: dir,
            }
        };
        match direction {
            LoopDirection::Forward => (0..n)
                .map(|i| step(i, &self.coins[i], &self.coins[(i + 1) % n]))
                .collect(),
            LoopDirection::Reverse => (0..n)
                .rev()
                .map(|i| step(i, &self.coins[(i + 1) % n], &self.coins[i]))
                .collect(),
        }
    }

    /// Whether any hop goes through a real (non-synthetic) venue.
    #[must_use]
    pub fn has_real_leg(&self) -> bool {
        self.pairs.iter().any(|p| !p.is_cross())
    }
}

/// Rotate so the smallest pair comes first, then pick the orientation whose
/// second pair is smaller.
fn canonicalize(coins: Vec<CoinId>, pairs: Vec<PairKey>) -> (Vec<CoinId>, Vec<PairKey>) {
    let n = pairs.len();
    let k = pairs
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map_or(0, |(i, _)| i);

    let mut coins: Vec<CoinId> = (0..n).map(|i| coins[(i + k) % n].clone()).collect();
    let pairs: Vec<PairKey> = (0..n).map(|i| pairs[(i + k) % n].clone()).collect();

    if n == 2 {
        // Both pairs join the same two coins; either may start.
        coins.sort();
        return (coins, pairs);
    }
    if pairs[n - 1] < pairs[1] {
        // Reverse while keeping pairs[0] first: start from the far end of p0.
        let mut rev_coins = vec![coins[1].clone(), coins[0].clone()];
        rev_coins.extend((2..n).rev().map(|i| coins[i].clone()));
        let mut rev_pairs = vec![pairs[0].clone()];
        rev_pairs.extend((1..n).rev().map(|i| pairs[i].clone()));
        (rev_coins, rev_pairs)
    } else {
        (coins, pairs)
    }
}

/// One tier of a synthesized rate table: `volume` of the start coin
/// converts back into `volume * rate` of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateTier {
    pub rate: Decimal,
    pub volume: Volume,
}

impl RateTier {
    #[must_use]
    pub const fn new(rate: Decimal, volume: Volume) -> Self {
        Self { rate, volume }
    }
}

/// A cycle evaluated in one direction.
#[derive(Debug, Clone, Serialize)]
pub struct Loop {
    pub cycle: Cycle,
    pub direction: LoopDirection,
    pub rates: Vec<RateTier>,
    /// Unscaled volume of the start coin entering the first hop.
    pub trade_volume: Volume,
    /// Fraction of `trade_volume` that balances allow, in `[0, 1]`.
    pub trade_scale: Decimal,
    pub profit: Volume,
    pub profit_ratio: Decimal,
    /// Coin whose balance produced `trade_scale` when it is below 1.
    pub limiting_coin: Option<CoinId>,
    /// Coins whose scaled trades fell outside their pair's allowed range.
    pub insufficient: Vec<CoinId>,
    /// Simulated unscaled trades, in hop order.
    pub trades: Vec<Trade>,
}

impl Loop {
    /// Whether the loop can be executed at all.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.trade_scale > Decimal::ZERO && self.insufficient.is_empty()
    }

    /// Simulated trades multiplied by the trade scale.
    #[must_use]
    pub fn scaled_trades(&self) -> Vec<Trade> {
        self.trades.iter().map(|t| t.scaled(self.trade_scale)).collect()
    }

    /// Human-readable route, e.g. `BTC@a -> ETH@a -> BTC@a`.
    #[must_use]
    pub fn route(&self) -> String {
        let mut parts: Vec<String> = self
            .cycle
            .hops(self.direction)
            .iter()
            .map(|h| h.coin_in.to_string())
            .collect();
        parts.push(self.cycle.start().to_string());
        parts.join(" -> ")
    }
}
