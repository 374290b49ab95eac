//! Venue client implementations.

pub mod paper;
