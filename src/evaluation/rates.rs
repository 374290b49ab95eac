//! Synthesized coin-to-same-coin rate tables.
//!
//! Every tier of a table says: `volume` of the start coin, pushed through all
//! hops so far at this depth, comes out as `volume * rate` of the current
//! coin. Tables are built one hop at a time by merging with that hop's book.

use rust_decimal::Decimal;

use crate::domain::{Direction, RateTier, TradePair, Volume};

/// The hop's book as `(rate, volume_in)` tiers, best first.
///
/// Base-to-quote tiers read the bids directly. Quote-to-base tiers invert
/// the asks: one quote buys `1 / price` base, and a level holds
/// `price * volume` quote.
#[must_use]
pub fn hop_ladder(pair: &TradePair, direction: Direction) -> Vec<RateTier> {
    pair.book(direction)
        .orders()
        .iter()
        .filter(|o| o.price() > Decimal::ZERO && o.volume() > Decimal::ZERO)
        .map(|o| match direction {
            Direction::BaseToQuote => RateTier::new(o.price(), o.volume()),
            Direction::QuoteToBase => RateTier::new(Decimal::ONE / o.price(), o.quote_volume()),
        })
        .collect()
}

/// Merge `table` with the next hop's `ladder`.
///
/// Walks both sides in order, always consuming the smaller remainder; on a
/// tie both sides advance. Stops once the cumulative start-coin volume
/// exceeds `cap`.
#[must_use]
pub fn merge(table: &[RateTier], ladder: &[RateTier], cap: Option<Volume>) -> Vec<RateTier> {
    let mut merged = Vec::with_capacity(table.len() + ladder.len());
    let mut cumulative = Decimal::ZERO;
    let (mut i, mut j) = (0, 0);
    // Remainders: `left` in the hop's input coin, `right` likewise.
    let mut left = table.first().map(|t| t.volume * t.rate);
    let mut right = ladder.first().map(|t| t.volume);

    while let (Some(l), Some(r)) = (left, right) {
        if cap.is_some_and(|cap| cumulative > cap) {
            break;
        }
        let tier = &table[i];
        let step = &ladder[j];
        let take = l.min(r);

        if take > Decimal::ZERO && tier.rate > Decimal::ZERO {
            let volume = take / tier.rate;
            merged.push(RateTier::new(tier.rate * step.rate, volume));
            cumulative += volume;
        }

        let (l, r) = (l - take, r - take);
        left = if l.is_zero() {
            i += 1;
            table.get(i).map(|t| t.volume * t.rate)
        } else {
            Some(l)
        };
        right = if r.is_zero() {
            j += 1;
            ladder.get(j).map(|t| t.volume)
        } else {
            Some(r)
        };
    }
    merged
}

/// Sum of the volumes of every tier converting at a gain.
#[must_use]
pub fn profitable_volume(table: &[RateTier]) -> Volume {
    table
        .iter()
        .filter(|t| t.rate > Decimal::ONE)
        .map(|t| t.volume)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, PairKey};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pair(bids: Vec<Order>, asks: Vec<Order>) -> TradePair {
        let mut pair = TradePair::new(PairKey::new("alpha", "X", "Y"), Decimal::ZERO);
        pair.update_order_book(bids, asks, Utc::now());
        pair
    }

    #[test]
    fn quote_to_base_ladder_is_inverted() {
        let pair = pair(vec![], vec![Order::new(dec!(4), dec!(10))]);
        let ladder = hop_ladder(&pair, Direction::QuoteToBase);
        assert_eq!(ladder, vec![RateTier::new(dec!(0.25), dec!(40))]);
    }

    #[test]
    fn merge_splits_on_smaller_remainder() {
        // 10 X at 2 Y each, then 10 X at 1.5 Y each.
        let table = vec![RateTier::new(dec!(2), dec!(10)), RateTier::new(dec!(1.5), dec!(10))];
        // 5 Y at 0.6 X each, then 100 Y at 0.5 X each.
        let ladder = vec![RateTier::new(dec!(0.6), dec!(5)), RateTier::new(dec!(0.5), dec!(100))];

        let merged = merge(&table, &ladder, None);
        assert_eq!(
            merged,
            vec![
                RateTier::new(dec!(1.2), dec!(2.5)),
                RateTier::new(dec!(1.0), dec!(7.5)),
                RateTier::new(dec!(0.75), dec!(10)),
            ]
        );
        assert_eq!(profitable_volume(&merged), dec!(2.5));
    }

    #[test]
    fn ties_advance_both_sides() {
        let table = vec![RateTier::new(dec!(2), dec!(5)), RateTier::new(dec!(1), dec!(5))];
        let ladder = vec![RateTier::new(dec!(0.6), dec!(10)), RateTier::new(dec!(0.5), dec!(5))];
        let merged = merge(&table, &ladder, None);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1], RateTier::new(dec!(0.5), dec!(5)));
    }

    #[test]
    fn merge_stops_past_cap() {
        let table = vec![
            RateTier::new(dec!(1), dec!(10)),
            RateTier::new(dec!(1), dec!(10)),
            RateTier::new(dec!(1), dec!(10)),
        ];
        let ladder = vec![RateTier::new(dec!(1.1), dec!(1000))];
        let merged = merge(&table, &ladder, Some(dec!(15)));
        assert_eq!(merged.len(), 2);
    }
}
