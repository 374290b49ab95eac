//! cyclearb - multi-venue cryptocurrency loop arbitrage.
//!
//! Venue drivers poll their venues in the background and hand every fetched
//! snapshot to a single owner task, the only writer of the market model. On
//! each pass the owner enumerates closed trading cycles, evaluates their
//! profitability against live books and balances, and executes the best
//! loop. Fishing instances rest bait orders on one venue priced off another.
//!
//! # Modules
//!
//! - [`domain`] - coins, pairs, order books, trades, positions, cycles and loops
//! - [`exchange`] - venue client contract, drivers, integration actions, signals
//! - [`market`] - the market model and its owner task
//! - [`discovery`] - parallel cycle enumeration
//! - [`evaluation`] - profitability, fee carry and trade scaling
//! - [`execution`] - placing a chosen loop
//! - [`fishing`] - bait/match state machine
//! - [`adapter`] - venue client implementations
//! - [`app`] - configuration, operator surface and process wiring

pub mod adapter;
pub mod app;
pub mod cli;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod evaluation;
pub mod exchange;
pub mod execution;
pub mod fishing;
pub mod market;
pub mod shutdown;
