//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Every section has defaults, so a
//! minimal file only lists its venues.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::discovery::DiscoverySettings;
use crate::domain::{Order, PairKey, Range, Symbol, VenueId, Volume};
use crate::error::{ConfigError, Result};
use crate::evaluation::EvaluationSettings;
use crate::exchange::{Category, PairInfo, VenueSettings};
use crate::fishing::{FishingDefinition, FishingParams};
use crate::market::OwnerSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub venues: Vec<VenueConfig>,
    #[serde(default)]
    pub fishing: Vec<FishingConfig>,
    /// Dry-run mode: find and evaluate loops but never execute them.
    #[serde(default)]
    pub dry_run: bool,
    /// Path to the status file for external monitoring.
    #[serde(default)]
    pub status_file: Option<PathBuf>,
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

const fn default_status_interval_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Discovery, evaluation and execution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Longest loop searched, in hops.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Discovery worker threads; 0 uses one per CPU.
    #[serde(default)]
    pub discovery_workers: usize,
    #[serde(default = "default_evaluation_interval_ms")]
    pub evaluation_interval_ms: u64,
    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
    #[serde(default = "default_fishing_interval_ms")]
    pub fishing_interval_ms: u64,
    #[serde(default)]
    pub coins_of_interest: Vec<String>,
    #[serde(default)]
    pub trading_enabled: bool,
    #[serde(default = "default_true")]
    pub loop_finder_running: bool,
    #[serde(default = "default_balance_safety_factor")]
    pub balance_safety_factor: Decimal,
    /// Depth of the identity book on synthetic cross-venue pairs.
    #[serde(default = "default_cross_venue_depth")]
    pub cross_venue_depth: Volume,
}

const fn default_max_hops() -> usize {
    3
}

const fn default_evaluation_interval_ms() -> u64 {
    1_000
}

const fn default_discovery_interval_ms() -> u64 {
    60_000
}

const fn default_fishing_interval_ms() -> u64 {
    1_000
}

const fn default_true() -> bool {
    true
}

fn default_balance_safety_factor() -> Decimal {
    dec!(0.999)
}

fn default_cross_venue_depth() -> Volume {
    dec!(1000000)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            discovery_workers: 0,
            evaluation_interval_ms: default_evaluation_interval_ms(),
            discovery_interval_ms: default_discovery_interval_ms(),
            fishing_interval_ms: default_fishing_interval_ms(),
            coins_of_interest: Vec::new(),
            trading_enabled: false,
            loop_finder_running: true,
            balance_safety_factor: default_balance_safety_factor(),
            cross_venue_depth: default_cross_venue_depth(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn coins_of_interest(&self) -> BTreeSet<Symbol> {
        self.coins_of_interest.iter().map(Symbol::new).collect()
    }

    #[must_use]
    pub fn owner_settings(&self) -> OwnerSettings {
        OwnerSettings {
            evaluation_interval: Duration::from_millis(self.evaluation_interval_ms),
            discovery_interval: Duration::from_millis(self.discovery_interval_ms),
            discovery: DiscoverySettings {
                max_hops: self.max_hops,
                workers: self.discovery_workers,
            },
            evaluation: EvaluationSettings {
                balance_safety_factor: self.balance_safety_factor,
            },
        }
    }
}

/// Supported venue clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    #[default]
    Paper,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    pub name: String,
    #[serde(default)]
    pub kind: VenueKind,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_poll_period_ms")]
    pub poll_period_ms: u64,
    /// Per-category refresh periods; unset categories use `poll_period_ms`.
    #[serde(default)]
    pub periods: CategoryPeriods,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub paper: PaperSeed,
}

const fn default_poll_period_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CategoryPeriods {
    pub market_data_ms: Option<u64>,
    pub balances_ms: Option<u64>,
    pub positions_ms: Option<u64>,
    pub trade_history_ms: Option<u64>,
}

impl VenueConfig {
    #[must_use]
    pub fn id(&self) -> VenueId {
        VenueId::new(&self.name)
    }

    #[must_use]
    pub fn settings(&self) -> VenueSettings {
        let poll_period = Duration::from_millis(self.poll_period_ms);
        let mut settings = VenueSettings::uniform(poll_period, self.fee);
        for (category, period) in [
            (Category::MarketData, self.periods.market_data_ms),
            (Category::Balances, self.periods.balances_ms),
            (Category::Positions, self.periods.positions_ms),
            (Category::TradeHistory, self.periods.trade_history_ms),
        ] {
            if let Some(ms) = period {
                settings.periods[category.index()] = Duration::from_millis(ms);
            }
        }
        settings
    }
}

/// Initial state of a paper venue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperSeed {
    #[serde(default)]
    pub pairs: Vec<PaperPair>,
    #[serde(default)]
    pub balances: BTreeMap<String, Decimal>,
}

/// A listed pair and its book, as `[price, volume]` levels.
#[derive(Debug, Clone, Deserialize)]
pub struct PaperPair {
    pub base: String,
    pub quote: String,
    #[serde(default)]
    pub base_range: Range,
    #[serde(default)]
    pub quote_range: Range,
    #[serde(default)]
    pub price_range: Range,
    #[serde(default)]
    pub bids: Vec<[Decimal; 2]>,
    #[serde(default)]
    pub asks: Vec<[Decimal; 2]>,
}

impl PaperPair {
    #[must_use]
    pub fn info(&self) -> PairInfo {
        PairInfo {
            base_range: self.base_range,
            quote_range: self.quote_range,
            price_range: self.price_range,
            ..PairInfo::new(Symbol::new(&self.base), Symbol::new(&self.quote))
        }
    }

    #[must_use]
    pub fn bids(&self) -> Vec<Order> {
        levels(&self.bids)
    }

    #[must_use]
    pub fn asks(&self) -> Vec<Order> {
        levels(&self.asks)
    }
}

fn levels(raw: &[[Decimal; 2]]) -> Vec<Order> {
    raw.iter().map(|[price, volume]| Order::new(*price, *volume)).collect()
}

/// A saved fishing instance.
#[derive(Debug, Clone, Deserialize)]
pub struct FishingConfig {
    /// Pair name, `BASE/QUOTE`.
    pub pair: String,
    /// Venue the reference price is read from and the match is placed on.
    pub reference: String,
    /// Venue the bait rests on.
    pub target: String,
    pub scale: Decimal,
    #[serde(default)]
    pub min_volume: Option<Volume>,
    #[serde(default)]
    pub max_volume: Option<Volume>,
    #[serde(default = "default_offset_min")]
    pub offset_min: Decimal,
    #[serde(default = "default_offset_max")]
    pub offset_max: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
}

pub(crate) fn default_offset_min() -> Decimal {
    dec!(0.01)
}

pub(crate) fn default_offset_max() -> Decimal {
    dec!(0.05)
}

impl FishingConfig {
    pub fn definition(&self) -> Result<FishingDefinition> {
        let (base, quote) = self.pair.split_once('/').ok_or_else(|| ConfigError::InvalidValue {
            field: "fishing.pair",
            reason: format!("{} is not BASE/QUOTE", self.pair),
        })?;
        Ok(FishingDefinition {
            reference: PairKey::new(self.reference.as_str(), base, quote),
            target: PairKey::new(self.target.as_str(), base, quote),
            params: FishingParams {
                scale: self.scale,
                min_volume: self.min_volume,
                max_volume: self.max_volume,
                offset_min: self.offset_min,
                offset_max: self.offset_max,
            },
        })
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    #[allow(clippy::result_large_err)]
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.venues.is_empty() {
            return Err(ConfigError::MissingField { field: "venues" }.into());
        }

        let mut names = HashSet::new();
        for venue in &self.venues {
            if venue.name.trim().is_empty() {
                return Err(ConfigError::MissingField { field: "venues.name" }.into());
            }
            if venue.id().is_cross() {
                return Err(ConfigError::InvalidValue {
                    field: "venues.name",
                    reason: format!("{} is reserved", venue.name),
                }
                .into());
            }
            if !names.insert(venue.id()) {
                return Err(ConfigError::InvalidValue {
                    field: "venues.name",
                    reason: format!("duplicate venue {}", venue.name),
                }
                .into());
            }
            if venue.fee < Decimal::ZERO {
                return Err(ConfigError::InvalidValue {
                    field: "venues.fee",
                    reason: format!("{} has negative fee {}", venue.name, venue.fee),
                }
                .into());
            }
            if venue.poll_period_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "venues.poll_period_ms",
                    reason: format!("{} must poll at a positive period", venue.name),
                }
                .into());
            }
        }

        if self.engine.max_hops < 2 {
            return Err(ConfigError::InvalidValue {
                field: "max_hops",
                reason: format!("{} is below 2", self.engine.max_hops),
            }
            .into());
        }
        let factor = self.engine.balance_safety_factor;
        if factor <= Decimal::ZERO || factor > Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "balance_safety_factor",
                reason: format!("{factor} outside (0, 1]"),
            }
            .into());
        }
        if self.engine.evaluation_interval_ms == 0 || self.engine.fishing_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine",
                reason: "intervals must be positive".into(),
            }
            .into());
        }

        for fishing in &self.fishing {
            let definition = fishing.definition()?;
            for venue in [&definition.reference.venue, &definition.target.venue] {
                if !names.contains(venue) {
                    return Err(ConfigError::InvalidValue {
                        field: "fishing",
                        reason: format!("unknown venue {venue}"),
                    }
                    .into());
                }
            }
            definition.validate()?;
        }
        Ok(())
    }

    #[must_use]
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    #[must_use]
    pub fn fishing_interval(&self) -> Duration {
        Duration::from_millis(self.engine.fishing_interval_ms)
    }

    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.logging.level));

        match self.logging.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}
