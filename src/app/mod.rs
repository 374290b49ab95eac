//! Application layer - configuration, shared state, operator surface and wiring.

mod config;
mod operator;
mod runtime;
mod state;
pub mod status;

pub use config::{
    CategoryPeriods, Config, EngineConfig, FishingConfig, LoggingConfig, PaperPair, PaperSeed,
    VenueConfig, VenueKind,
};
pub use operator::{Operator, VenueView};
pub use runtime::Runtime;
pub use state::{EngineFlags, EngineState};
