//! Status file for external monitoring.
//!
//! Periodically writes a JSON document that an external display can poll:
//! engine switches, venue connectivity, balances, the best loop and the
//! state of every fishing instance.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use super::operator::{Operator, VenueView};
use super::state::EngineFlags;
use crate::domain::{Loop, PairKey};
use crate::error::Result;
use crate::fishing::{FishingState, FishingView};
use crate::shutdown::ShutdownSignal;

/// Current status file format version.
const STATUS_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct StatusFile {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub pid: u32,
    pub engine: EngineFlags,
    pub venues: Vec<VenueView>,
    /// Number of balances with a non-zero total.
    pub funded_balances: usize,
    pub open_positions: usize,
    pub loops: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_loop: Option<LoopSummary>,
    pub fishing: Vec<FishingSummary>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopSummary {
    pub route: String,
    pub profit_ratio: Decimal,
    pub trade_scale: Decimal,
    pub executable: bool,
}

impl From<&Loop> for LoopSummary {
    fn from(best: &Loop) -> Self {
        Self {
            route: best.route(),
            profit_ratio: best.profit_ratio,
            trade_scale: best.trade_scale,
            executable: best.is_executable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FishingSummary {
    pub id: u64,
    pub reference: PairKey,
    pub target: PairKey,
    pub active: bool,
    pub states: Vec<FishingState>,
}

impl From<&FishingView> for FishingSummary {
    fn from(view: &FishingView) -> Self {
        Self {
            id: view.id,
            reference: view.definition.reference.clone(),
            target: view.definition.target.clone(),
            active: view.active,
            states: view.trades.iter().map(|t| t.state()).collect(),
        }
    }
}

/// Writer for the status file.
pub struct StatusWriter {
    path: PathBuf,
    started_at: DateTime<Utc>,
}

impl StatusWriter {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            started_at: Utc::now(),
        }
    }

    /// Gather the current status through the operator.
    pub async fn collect(&self, operator: &Operator) -> Result<StatusFile> {
        let balances = operator.balances().await?;
        let positions = operator.positions().await?;
        let loops = operator.loops().await?;
        Ok(StatusFile {
            version: STATUS_VERSION.to_string(),
            started_at: self.started_at,
            pid: std::process::id(),
            engine: operator.flags(),
            venues: operator.venues(),
            funded_balances: balances.iter().filter(|b| !b.total.is_zero()).count(),
            open_positions: positions.len(),
            loops: loops.len(),
            best_loop: loops.first().map(LoopSummary::from),
            fishing: operator.fishing().iter().map(FishingSummary::from).collect(),
            updated_at: Utc::now(),
        })
    }

    /// Write `status` atomically: temp file, then rename.
    #[allow(clippy::result_large_err)]
    pub fn write(&self, status: &StatusFile) -> Result<()> {
        let json = serde_json::to_string_pretty(status)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        Ok(())
    }

    /// Remove the status file. Missing files are fine.
    pub fn remove(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove status file");
            }
        }
    }

    /// Write the status every `interval` until shutdown.
    pub async fn run(self, operator: Operator, interval: Duration, shutdown: ShutdownSignal) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                () = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }
            match self.collect(&operator).await {
                Ok(status) => {
                    if let Err(e) = self.write(&status) {
                        warn!(path = %self.path.display(), error = %e, "Failed to write status file");
                    }
                }
                Err(e) if e.is_cancelled() => break,
                Err(e) => debug!(error = %e, "Status unavailable"),
            }
        }
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn status() -> StatusFile {
        StatusFile {
            version: STATUS_VERSION.to_string(),
            started_at: Utc::now(),
            pid: 12345,
            engine: EngineFlags {
                trading_enabled: false,
                loop_finder_running: true,
                dry_run: true,
                halt_reason: None,
            },
            venues: Vec::new(),
            funded_balances: 2,
            open_positions: 0,
            loops: 1,
            best_loop: Some(LoopSummary {
                route: "X@alpha -> Y@alpha -> X@alpha".into(),
                profit_ratio: dec!(1.1),
                trade_scale: dec!(0.5),
                executable: true,
            }),
            fishing: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn status_serializes_engine_and_best_loop() {
        let json = serde_json::to_string_pretty(&status()).unwrap();
        assert!(json.contains("\"version\": \"1\""));
        assert!(json.contains("\"pid\": 12345"));
        assert!(json.contains("\"dry_run\": true"));
        assert!(json.contains("\"profit_ratio\": \"1.1\""));
    }

    #[test]
    fn write_replaces_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("status.json");
        let writer = StatusWriter::new(path.clone());

        writer.write(&status()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["loops"], 1);
        assert!(!path.with_extension("tmp").exists());

        writer.remove();
        assert!(!path.exists());
    }
}
