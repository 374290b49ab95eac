//! Shared engine switches.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

/// Operator-controlled flags, read by the owner at the top of every pass.
#[derive(Debug)]
pub struct EngineState {
    /// Whether profitable loops may be executed.
    trading_enabled: AtomicBool,
    /// Whether discovery and evaluation run at all.
    loop_finder_running: AtomicBool,
    /// Evaluate and log, never place loop orders.
    dry_run: bool,
    /// Why trading was last halted automatically.
    halt_reason: RwLock<Option<String>>,
}

/// Point-in-time copy of [`EngineState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineFlags {
    pub trading_enabled: bool,
    pub loop_finder_running: bool,
    pub dry_run: bool,
    pub halt_reason: Option<String>,
}

impl EngineState {
    #[must_use]
    pub fn new(trading_enabled: bool, loop_finder_running: bool, dry_run: bool) -> Self {
        Self {
            trading_enabled: AtomicBool::new(trading_enabled),
            loop_finder_running: AtomicBool::new(loop_finder_running),
            dry_run,
            halt_reason: RwLock::new(None),
        }
    }

    pub fn trading_enabled(&self) -> bool {
        self.trading_enabled.load(Ordering::SeqCst)
    }

    /// Enabling trading clears any previous halt reason.
    pub fn set_trading_enabled(&self, enabled: bool) {
        self.trading_enabled.store(enabled, Ordering::SeqCst);
        if enabled {
            *self.halt_reason.write() = None;
        }
    }

    pub fn loop_finder_running(&self) -> bool {
        self.loop_finder_running.load(Ordering::SeqCst)
    }

    pub fn set_loop_finder_running(&self, running: bool) {
        self.loop_finder_running.store(running, Ordering::SeqCst);
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Turn off trading and loop finding together.
    pub fn halt(&self, reason: impl Into<String>) {
        self.trading_enabled.store(false, Ordering::SeqCst);
        self.loop_finder_running.store(false, Ordering::SeqCst);
        *self.halt_reason.write() = Some(reason.into());
    }

    pub fn halt_reason(&self) -> Option<String> {
        self.halt_reason.read().clone()
    }

    #[must_use]
    pub fn flags(&self) -> EngineFlags {
        EngineFlags {
            trading_enabled: self.trading_enabled(),
            loop_finder_running: self.loop_finder_running(),
            dry_run: self.dry_run,
            halt_reason: self.halt_reason(),
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(false, true, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_finds_loops_without_trading() {
        let state = EngineState::default();
        assert!(!state.trading_enabled());
        assert!(state.loop_finder_running());
        assert!(state.halt_reason().is_none());
    }

    #[test]
    fn halt_disables_both_flags() {
        let state = EngineState::new(true, true, false);
        state.halt("hop 1 failed");

        assert!(!state.trading_enabled());
        assert!(!state.loop_finder_running());
        assert_eq!(state.halt_reason(), Some("hop 1 failed".to_string()));

        state.set_trading_enabled(true);
        assert!(state.halt_reason().is_none());
    }
}
