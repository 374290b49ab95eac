//! Open chains of pairs grown from both ends during discovery.

use std::collections::VecDeque;

use crate::domain::{CoinId, Cycle, DomainError, PairKey};

/// An open chain `beg = c0 - p0 - c1 - ... - cn = end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialLoop {
    coins: VecDeque<CoinId>,
    pairs: VecDeque<PairKey>,
}

impl PartialLoop {
    /// One-pair chain from `base` to `quote`.
    #[must_use]
    pub fn seed(pair: &PairKey) -> Self {
        Self {
            coins: VecDeque::from([pair.base.clone(), pair.quote.clone()]),
            pairs: VecDeque::from([pair.clone()]),
        }
    }

    #[must_use]
    pub fn beg(&self) -> &CoinId {
        &self.coins[0]
    }

    #[must_use]
    pub fn end(&self) -> &CoinId {
        &self.coins[self.coins.len() - 1]
    }

    /// Number of pairs in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn contains_pair(&self, pair: &PairKey) -> bool {
        self.pairs.contains(pair)
    }

    #[must_use]
    pub fn contains_coin(&self, coin: &CoinId) -> bool {
        self.coins.contains(coin)
    }

    /// Whether `pair` joins the two open ends.
    #[must_use]
    pub fn closes_with(&self, pair: &PairKey) -> bool {
        pair.connects(self.beg(), self.end())
    }

    /// Close the chain with `pair`.
    pub fn close(&self, pair: &PairKey) -> Result<Cycle, DomainError> {
        let mut pairs: Vec<PairKey> = self.pairs.iter().cloned().collect();
        pairs.push(pair.clone());
        Cycle::new(self.coins.iter().cloned().collect(), pairs)
    }

    /// Grow the chain by `pair` if it hangs off one end and reaches a new coin.
    #[must_use]
    pub fn extend(&self, pair: &PairKey) -> Option<Self> {
        if self.contains_pair(pair) {
            return None;
        }
        if let Some(coin) = pair.other(self.beg()).filter(|c| !self.contains_coin(c)) {
            let mut next = self.clone();
            next.coins.push_front(coin.clone());
            next.pairs.push_front(pair.clone());
            return Some(next);
        }
        if let Some(coin) = pair.other(self.end()).filter(|c| !self.contains_coin(c)) {
            let mut next = self.clone();
            next.coins.push_back(coin.clone());
            next.pairs.push_back(pair.clone());
            return Some(next);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(base: &str, quote: &str) -> PairKey {
        PairKey::new("alpha", base, quote)
    }

    #[test]
    fn seed_spans_base_to_quote() {
        let partial = PartialLoop::seed(&pair("BTC", "USDT"));
        assert_eq!(partial.beg(), &CoinId::new("BTC", "alpha"));
        assert_eq!(partial.end(), &CoinId::new("USDT", "alpha"));
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn extends_at_matching_end() {
        let partial = PartialLoop::seed(&pair("BTC", "USDT"));

        let front = partial.extend(&pair("ETH", "BTC")).unwrap();
        assert_eq!(front.beg(), &CoinId::new("ETH", "alpha"));
        assert_eq!(front.end(), &CoinId::new("USDT", "alpha"));

        let back = partial.extend(&pair("USDT", "EUR")).unwrap();
        assert_eq!(back.end(), &CoinId::new("EUR", "alpha"));
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn refuses_unrelated_or_revisiting_pairs() {
        let partial = PartialLoop::seed(&pair("BTC", "USDT"))
            .extend(&pair("ETH", "BTC"))
            .unwrap();

        assert!(partial.extend(&pair("XRP", "EUR")).is_none());
        assert!(partial.extend(&pair("BTC", "USDT")).is_none());
        // Joins the ends, so it closes rather than extends.
        assert!(partial.closes_with(&pair("ETH", "USDT")));
    }

    #[test]
    fn closing_yields_a_valid_cycle() {
        let partial = PartialLoop::seed(&pair("BTC", "USDT"))
            .extend(&pair("ETH", "BTC"))
            .unwrap();
        let cycle = partial.close(&pair("ETH", "USDT")).unwrap();
        assert_eq!(cycle.len(), 3);
    }
}
