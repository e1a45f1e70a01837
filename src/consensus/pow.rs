// Proof of Work implementation

use crate::core::{pow_hash, Block, Hash256};
use crate::error::{LedgerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Attempts between progress log lines
const PROGRESS_INTERVAL: u64 = 100_000;

/// Proof of Work miner.
///
/// Searches for a nonce whose block hash starts with `difficulty` hex '0'
/// characters. The search never mutates the block; the caller seals the block
/// with the returned `(nonce, hash)`.
pub struct Miner {
    /// Required leading '0' hex characters
    difficulty: usize,
    /// Worker threads sharing the nonce space
    threads: usize,
    /// Set to abort the running (or next) search
    cancel: Arc<AtomicBool>,
}

impl Miner {
    /// Create a single-threaded miner
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            threads: 1,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Split the search across `threads` workers (at least one)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Flag that aborts mining when set to `true`.
    ///
    /// A cancellation request is consumed by the search that observes it: that
    /// search returns `MiningCancelled` and the flag is cleared again.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Find a nonce satisfying the difficulty for `block`.
    ///
    /// Single-threaded search tries nonces 0, 1, 2, ... and so always returns
    /// the smallest solution. With several workers, worker `i` tries
    /// `i, i + n, i + 2n, ...` and the first solution found stops the rest.
    pub fn mine(&self, block: &Block) -> Result<MiningResult> {
        let start_time = Instant::now();
        let prefix = block.pow_prefix();
        let stop = AtomicBool::new(false);

        let outcomes: Vec<WorkerOutcome> = if self.threads == 1 {
            vec![self.search(&prefix, 0, 1, &stop)]
        } else {
            let step = self.threads as u64;
            thread::scope(|scope| {
                let handles: Vec<_> = (0..step)
                    .map(|first| {
                        let prefix = &prefix;
                        let stop = &stop;
                        scope.spawn(move || self.search(prefix, first, step, stop))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or(WorkerOutcome::failed()))
                    .collect()
            })
        };

        let attempts = outcomes.iter().map(|o| o.attempts).sum();
        let found = outcomes
            .iter()
            .filter_map(|o| o.found)
            .min_by_key(|(nonce, _)| *nonce);

        match found {
            Some((nonce, hash)) => {
                // A request that arrived after the solution is dropped too
                self.cancel.store(false, Ordering::SeqCst);
                let duration = start_time.elapsed();
                log::debug!(
                    "Found nonce {} after {} attempts in {:?}",
                    nonce,
                    attempts,
                    duration
                );
                Ok(MiningResult {
                    nonce,
                    hash,
                    attempts,
                    duration,
                })
            }
            None if self.cancel.swap(false, Ordering::SeqCst) => {
                log::info!("Mining cancelled after {} attempts", attempts);
                Err(LedgerError::MiningCancelled)
            }
            None => Err(LedgerError::InvariantViolation(format!(
                "nonce space exhausted at difficulty {}",
                self.difficulty
            ))),
        }
    }

    // One worker: nonces first, first + step, ... until found, stopped or exhausted
    fn search(&self, prefix: &[u8], first: u64, step: u64, stop: &AtomicBool) -> WorkerOutcome {
        let start_time = Instant::now();
        let mut attempts = 0u64;
        let mut nonce = first;

        loop {
            if self.cancel.load(Ordering::Relaxed) || stop.load(Ordering::Relaxed) {
                return WorkerOutcome { found: None, attempts };
            }

            let hash = pow_hash(prefix, nonce);
            attempts += 1;

            if hash.has_leading_zeros(self.difficulty) {
                stop.store(true, Ordering::Relaxed);
                return WorkerOutcome {
                    found: Some((nonce, hash)),
                    attempts,
                };
            }

            if attempts % PROGRESS_INTERVAL == 0 {
                let elapsed = start_time.elapsed();
                log::debug!(
                    "Mining attempts (worker {}): {} ({:.1} KH/s)",
                    first,
                    attempts,
                    attempts as f64 / elapsed.as_secs_f64() / 1000.0
                );
            }

            nonce = match nonce.checked_add(step) {
                Some(next) => next,
                None => return WorkerOutcome { found: None, attempts },
            };
        }
    }

    /// Verify that a block's stored hash is its real hash and meets the difficulty
    pub fn verify(&self, block: &Block) -> bool {
        block.calculate_hash() == block.hash && block.meets_difficulty(self.difficulty)
    }
}

struct WorkerOutcome {
    found: Option<(u64, Hash256)>,
    attempts: u64,
}

impl WorkerOutcome {
    // A worker that panicked contributes nothing
    fn failed() -> Self {
        Self { found: None, attempts: 0 }
    }
}

/// Mining result
#[derive(Debug, Clone)]
pub struct MiningResult {
    /// The nonce that was found
    pub nonce: u64,
    /// The resulting hash
    pub hash: Hash256,
    /// Number of attempts across all workers
    pub attempts: u64,
    /// Time taken
    pub duration: Duration,
}

impl MiningResult {
    /// Calculate hash rate (hashes per second)
    pub fn hash_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.attempts as f64 / secs
        } else {
            0.0
        }
    }
}
