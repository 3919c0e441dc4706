//! Scheduled deadline sweeper.
//!
//! Votes stop arriving, deadlines pass, and nobody touches the request
//! again — the sweeper exists for exactly that case. It periodically asks
//! the engine to resolve every pending request whose voting deadline has
//! lapsed. Because `resolve` is idempotent, the sweeper is safe to run
//! concurrently with itself and with vote-triggered resolution.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

use afyapool_engine::{DisbursementEngine, EngineError, SweepStats};

/// Configuration for the deadline sweeper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Interval between sweep passes.
    pub sweep_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(120),
        }
    }
}

/// Background loop that finalizes requests whose deadline passed quietly.
pub struct DeadlineSweeper {
    config: SweeperConfig,
    engine: Arc<DisbursementEngine>,
    trigger_tx: mpsc::Sender<()>,
    running: Arc<RwLock<bool>>,
}

impl DeadlineSweeper {
    /// Create a new sweeper over the engine.
    pub fn new(
        config: SweeperConfig,
        engine: Arc<DisbursementEngine>,
    ) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(10);
        let sweeper = Arc::new(Self {
            config,
            engine,
            trigger_tx,
            running: Arc::new(RwLock::new(false)),
        });
        (sweeper, trigger_rx)
    }

    /// Request an immediate sweep from outside the schedule.
    pub async fn trigger_sweep(&self) {
        let _ = self.trigger_tx.send(()).await;
    }

    /// Run one sweep pass now.
    pub async fn sweep_once(&self) -> Result<SweepStats, EngineError> {
        self.engine.sweep_expired(Utc::now()).await
    }

    /// Start the sweep loop. Runs until [`DeadlineSweeper::stop`].
    pub async fn start(self: Arc<Self>, mut trigger_rx: mpsc::Receiver<()>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        tracing::info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            "Deadline sweeper started"
        );

        let mut ticker = interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_pass().await;
                }
                Some(_) = trigger_rx.recv() => {
                    self.run_pass().await;
                }
                else => break,
            }

            let running = self.running.read().await;
            if !*running {
                break;
            }
        }

        tracing::info!("Deadline sweeper stopped");
    }

    /// Stop the sweep loop after the current pass.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    async fn run_pass(&self) {
        match self.sweep_once().await {
            Ok(stats) if stats.swept > 0 => {
                tracing::info!(
                    swept = stats.swept,
                    resolved = stats.resolved,
                    failed = stats.failed,
                    "Sweep pass finished"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Sweep pass failed");
            }
        }
    }
}
