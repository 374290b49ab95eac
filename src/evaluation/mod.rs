//! Profitability evaluation.
//!
//! For every discovered cycle and both traversal directions: build the rate
//! table, size the profitable volume, simulate with fees, then scale the
//! trades to what balances and pair ranges allow.

mod evaluator;
mod rates;

pub use evaluator::{evaluate, evaluate_all, EvaluationSettings};
pub use rates::{hop_ladder, merge, profitable_volume};
