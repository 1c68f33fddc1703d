//! Periodic scan scheduling.
//!
//! One loop per scan controller: wait for the initial delay, then run a
//! session, wait for it to end, clear the availability cache and sleep for
//! the service's interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::availability::AvailabilityAggregator;
use crate::config::SchedulerConfig;
use crate::scan::{ScanController, ScanStatus};

/// Current state of the scheduler and its scanners.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub scanners: Vec<ScanStatus>,
}

/// Runs scan sessions on per-service intervals.
pub struct SyncScheduler {
    config: SchedulerConfig,
    controllers: Vec<Arc<dyn ScanController>>,
    aggregator: Option<Arc<AvailabilityAggregator>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncScheduler {
    pub fn new(
        config: SchedulerConfig,
        controllers: Vec<Arc<dyn ScanController>>,
        aggregator: Option<Arc<AvailabilityAggregator>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            controllers,
            aggregator,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Spawn one loop per controller.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        info!(scanners = self.controllers.len(), "Starting sync scheduler");
        for controller in &self.controllers {
            match self.config.interval_for(controller.name()) {
                Some(interval) => self.spawn_loop(Arc::clone(controller), interval),
                None => warn!(service = controller.name(), "No interval configured, not scheduling"),
            }
        }
    }

    /// Stop every loop. Sessions already running are cancelled.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping sync scheduler");
        let _ = self.shutdown_tx.send(());
        for controller in &self.controllers {
            controller.cancel();
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::Relaxed),
            scanners: self.controllers.iter().map(|c| c.status()).collect(),
        }
    }

    fn spawn_loop(&self, controller: Arc<dyn ScanController>, interval_secs: u64) {
        let running = Arc::clone(&self.running);
        let aggregator = self.aggregator.clone();
        let initial_delay = Duration::from_secs(self.config.initial_delay_secs);
        let interval = Duration::from_secs(interval_secs);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let service = controller.name();
            info!(service, interval_secs, "Scan loop started");
            let mut delay = initial_delay;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(service, "Scan loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        match controller.run().wait().await {
                            Ok(outcome) => {
                                info!(service, outcome = outcome.as_str(), "Scheduled scan ended");
                            }
                            Err(e) => warn!(service, error = %e, "Scheduled scan task failed"),
                        }
                        if let Some(aggregator) = &aggregator {
                            aggregator.clear_cache();
                        }
                        delay = interval;
                    }
                }
            }
            info!(service, "Scan loop stopped");
        });
    }
}
