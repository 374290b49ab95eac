//! Parallel cycle search over the pair graph.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use tracing::{debug, warn};

use super::partial::PartialLoop;
use crate::domain::{Cycle, PairKey};
use crate::error::{Error, Result};
use crate::shutdown::ShutdownSignal;

/// How long an idle worker waits on the queue before re-checking for completion.
const IDLE_WAIT: Duration = Duration::from_millis(5);

/// Search limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Longest cycle searched for, in pairs.
    pub max_hops: usize,
    /// Worker threads. Zero means one per CPU.
    pub workers: usize,
}

impl DiscoverySettings {
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_hops: 3,
            workers: 0,
        }
    }
}

struct Search<'a> {
    pairs: &'a [PairKey],
    max_hops: usize,
    queue: Sender<PartialLoop>,
    outstanding: AtomicUsize,
    found: DashMap<String, Cycle>,
    shutdown: &'a ShutdownSignal,
}

impl Search<'_> {
    fn enqueue(&self, partial: PartialLoop) {
        // Counted before sending so the total never reads zero while work exists.
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.queue.send(partial).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn work(&self, queue: &Receiver<PartialLoop>) {
        loop {
            if self.shutdown.is_triggered() {
                return;
            }
            match queue.recv_timeout(IDLE_WAIT) {
                Ok(partial) => {
                    self.expand(&partial);
                    self.outstanding.fetch_sub(1, Ordering::SeqCst);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.outstanding.load(Ordering::SeqCst) == 0 {
                        return;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn expand(&self, partial: &PartialLoop) {
        for pair in self.pairs {
            if partial.contains_pair(pair) {
                continue;
            }
            if partial.closes_with(pair) {
                if partial.len() < self.max_hops {
                    match partial.close(pair) {
                        Ok(cycle) => {
                            self.found.entry(cycle.key().to_owned()).or_insert(cycle);
                        }
                        Err(e) => warn!(error = %e, "Discarded malformed cycle"),
                    }
                }
            } else if partial.len() + 2 <= self.max_hops {
                if let Some(next) = partial.extend(pair) {
                    self.enqueue(next);
                }
            }
        }
    }
}

/// Enumerate every simple cycle of at most `max_hops` pairs.
///
/// Only non-synthetic pairs seed the search, so each cycle found has at
/// least one real venue leg. Runs on the calling thread plus a scoped pool.
pub fn find_cycles(
    pairs: &[PairKey],
    settings: &DiscoverySettings,
    shutdown: &ShutdownSignal,
) -> Result<Vec<Cycle>> {
    let (tx, rx) = channel::unbounded();
    let search = Search {
        pairs,
        max_hops: settings.max_hops,
        queue: tx,
        outstanding: AtomicUsize::new(0),
        found: DashMap::new(),
        shutdown,
    };

    let seeds = pairs.iter().filter(|p| !p.is_cross());
    for pair in seeds {
        search.enqueue(PartialLoop::seed(pair));
    }

    let workers = settings.worker_count().max(1);
    thread::scope(|scope| {
        for _ in 1..workers {
            scope.spawn(|| search.work(&rx));
        }
        search.work(&rx);
    });

    if shutdown.is_triggered() {
        return Err(Error::Cancelled);
    }

    let mut cycles: Vec<Cycle> = search.found.into_iter().map(|(_, cycle)| cycle).collect();
    cycles.sort_by(|a, b| a.key().cmp(b.key()));
    debug!(pairs = pairs.len(), cycles = cycles.len(), workers, "Discovery pass finished");
    Ok(cycles)
}
