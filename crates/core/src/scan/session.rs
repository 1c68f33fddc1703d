//! Generic scan session lifecycle.
//!
//! A session lists every source of one scanner, buffers the items and feeds
//! them to the scanner in bundles. The running flag and the session
//! generation share one atomic word, so a session can check that it still
//! owns the scanner and clear the flag in a single compare-and-set.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{ItemResult, ScanError, ScanHandle, ScanOutcome, ScanStatus, StepOutcome};
use crate::arr::{InventoryItem, InventorySource};
use crate::config::SyncConfig;
use crate::metrics::{SCAN_DURATION, SCAN_ITEMS, SCAN_SESSIONS};
use crate::notification::{NotificationEvent, NotificationHandle};
use crate::reconcile::TransitionGuard;

/// Per-service item handling plugged into a [`ScanSession`].
#[async_trait]
pub trait Scanner: Send + Sync + 'static {
    /// Service name used in logs, metrics and the HTTP surface.
    fn name(&self) -> &'static str;

    /// Sources walked by a session, in order.
    fn sources(&self) -> Vec<Arc<dyn InventorySource>>;

    /// Map one item onto local media and apply it.
    async fn process_item(
        &self,
        source: &dyn InventorySource,
        item: &InventoryItem,
        guard: &dyn TransitionGuard,
    ) -> Result<ItemResult, ScanError>;
}

/// Object-safe control surface over any scan session.
pub trait ScanController: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start a new session, superseding any running one.
    fn run(&self) -> ScanHandle;

    fn status(&self) -> ScanStatus;

    /// Stop the running session. Returns false when nothing was running.
    fn cancel(&self) -> bool;
}

const RUNNING: u64 = 1;

fn pack(generation: u64, running: bool) -> u64 {
    (generation << 1) | if running { RUNNING } else { 0 }
}

fn generation_of(state: u64) -> u64 {
    state >> 1
}

/// Guard handed to the reconciliation engine for one session.
#[derive(Clone)]
pub struct SessionGuard {
    state: Arc<AtomicU64>,
    generation: u64,
}

impl SessionGuard {
    fn owner_state(&self) -> Option<StepOutcome> {
        let state = self.state.load(Ordering::SeqCst);
        if generation_of(state) != self.generation {
            Some(StepOutcome::Superseded)
        } else if state & RUNNING == 0 {
            Some(StepOutcome::Cancelled)
        } else {
            None
        }
    }
}

impl TransitionGuard for SessionGuard {
    fn is_current(&self) -> bool {
        self.state.load(Ordering::SeqCst) == pack(self.generation, true)
    }
}

type BufferedItem = (Arc<dyn InventorySource>, InventoryItem);

struct Buffer {
    generation: u64,
    items: VecDeque<BufferedItem>,
}

#[derive(Default)]
struct SessionInfo {
    generation: u64,
    status: ScanStatus,
}

struct Shared<S> {
    scanner: S,
    config: SyncConfig,
    notifier: Option<NotificationHandle>,
    state: Arc<AtomicU64>,
    buffer: Mutex<Buffer>,
    info: Mutex<SessionInfo>,
}

/// Cancellable, restartable scan loop around a [`Scanner`].
pub struct ScanSession<S: Scanner> {
    shared: Arc<Shared<S>>,
}

impl<S: Scanner> ScanSession<S> {
    pub fn new(scanner: S, config: SyncConfig, notifier: Option<NotificationHandle>) -> Self {
        let info = SessionInfo {
            generation: 0,
            status: ScanStatus {
                service: scanner.name().to_string(),
                ..Default::default()
            },
        };

        Self {
            shared: Arc::new(Shared {
                scanner,
                config,
                notifier,
                state: Arc::new(AtomicU64::new(0)),
                buffer: Mutex::new(Buffer {
                    generation: 0,
                    items: VecDeque::new(),
                }),
                info: Mutex::new(info),
            }),
        }
    }

    pub fn scanner(&self) -> &S {
        &self.shared.scanner
    }
}

impl<S: Scanner> ScanController for ScanSession<S> {
    fn name(&self) -> &'static str {
        self.shared.scanner.name()
    }

    fn run(&self) -> ScanHandle {
        let shared = Arc::clone(&self.shared);
        let previous = shared
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                Some(pack(generation_of(s) + 1, true))
            })
            .unwrap_or_else(|s| s);
        let generation = generation_of(previous) + 1;
        let session_id = Uuid::new_v4().to_string();
        let service = shared.scanner.name();

        if previous & RUNNING != 0 {
            info!(service, session = %session_id, "Superseding running scan session");
        }

        {
            let mut buffer = shared.buffer.lock().unwrap();
            buffer.generation = generation;
            buffer.items.clear();
        }
        {
            let mut info = shared.info.lock().unwrap();
            let last_outcome = info.status.last_outcome;
            info.generation = generation;
            info.status = ScanStatus {
                service: service.to_string(),
                running: true,
                progress: 0,
                total: 0,
                session_id: Some(session_id.clone()),
                started_at: Some(Utc::now()),
                finished_at: None,
                last_outcome,
            };
        }

        info!(service, session = %session_id, "Scan session started");
        let id = session_id.clone();
        let task = tokio::spawn(async move { shared.execute(generation, id).await });

        ScanHandle { session_id, task }
    }

    fn status(&self) -> ScanStatus {
        let mut status = self.shared.info.lock().unwrap().status.clone();
        status.running = self.shared.state.load(Ordering::SeqCst) & RUNNING != 0;
        status
    }

    fn cancel(&self) -> bool {
        let cleared = self
            .shared
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| {
                (s & RUNNING != 0).then_some(s & !RUNNING)
            })
            .is_ok();

        if cleared {
            self.shared.buffer.lock().unwrap().items.clear();
            info!(service = self.shared.scanner.name(), "Scan session cancelled");
        }
        cleared
    }
}

impl<S: Scanner> Shared<S> {
    async fn execute(self: Arc<Self>, generation: u64, session_id: String) -> ScanOutcome {
        let service = self.scanner.name();
        let started = Instant::now();
        let guard = SessionGuard {
            state: Arc::clone(&self.state),
            generation,
        };

        self.collect(&guard, &session_id).await;

        let total = self.buffer.lock().unwrap().items.len();
        self.update_info(generation, |status| status.total = total);

        let mut processed = 0;
        let mut failed = 0;
        let step = loop {
            match self.step(&guard, &mut processed, &mut failed).await {
                StepOutcome::Continue => {
                    tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
                }
                outcome => break outcome,
            }
        };

        let outcome = match step {
            StepOutcome::Finished => {
                // Only the owning session may clear the flag
                match self.state.compare_exchange(
                    pack(generation, true),
                    pack(generation, false),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                ) {
                    Ok(_) => ScanOutcome::Finished {
                        processed,
                        total,
                        failed,
                    },
                    Err(current) if generation_of(current) != generation => {
                        ScanOutcome::Superseded { processed }
                    }
                    Err(_) => ScanOutcome::Cancelled { processed },
                }
            }
            StepOutcome::Superseded => ScanOutcome::Superseded { processed },
            _ => ScanOutcome::Cancelled { processed },
        };

        self.update_info(generation, |status| {
            status.progress = processed;
            status.finished_at = Some(Utc::now());
            status.last_outcome = Some(outcome);
        });

        SCAN_SESSIONS
            .with_label_values(&[service, outcome.as_str()])
            .inc();
        SCAN_DURATION
            .with_label_values(&[service])
            .observe(started.elapsed().as_secs_f64());

        match outcome {
            ScanOutcome::Finished { .. } => {
                info!(service, session = %session_id, processed, total, failed, "Scan session finished");
            }
            ScanOutcome::Cancelled { .. } => {
                info!(service, session = %session_id, processed, "{}", ScanError::AbortedByCancellation);
            }
            ScanOutcome::Superseded { .. } => {
                info!(service, session = %session_id, processed, "{}", ScanError::AbortedBySupersession);
            }
        }

        if let Some(notifier) = &self.notifier {
            notifier
                .emit(NotificationEvent::ScanFinished {
                    service: service.to_string(),
                    session_id,
                    outcome: outcome.as_str().to_string(),
                    processed,
                    total,
                })
                .await;
        }

        outcome
    }

    /// List every source into the buffer. Unreachable sources are skipped.
    async fn collect(&self, guard: &SessionGuard, session_id: &str) {
        let service = self.scanner.name();
        for source in self.scanner.sources() {
            if !guard.is_current() {
                return;
            }

            let items = match source.fetch_inventory().await {
                Ok(items) => items,
                Err(e) => {
                    let err = ScanError::SourceUnreachable {
                        instance: source.instance().name.clone(),
                        source: e,
                    };
                    warn!(service, session = %session_id, error = %err, "Skipping source for this session");
                    continue;
                }
            };

            debug!(
                service,
                instance = %source.instance().name,
                count = items.len(),
                "Source listed"
            );

            let mut buffer = self.buffer.lock().unwrap();
            if buffer.generation == guard.generation && guard.is_current() {
                buffer
                    .items
                    .extend(items.into_iter().map(|item| (Arc::clone(&source), item)));
            }
        }
    }

    /// Process one bundle.
    async fn step(
        &self,
        guard: &SessionGuard,
        processed: &mut usize,
        failed: &mut usize,
    ) -> StepOutcome {
        if let Some(outcome) = guard.owner_state() {
            return outcome;
        }

        let bundle: Vec<BufferedItem> = {
            let mut buffer = self.buffer.lock().unwrap();
            if buffer.generation != guard.generation {
                return StepOutcome::Superseded;
            }
            let take = self.config.batch_size.min(buffer.items.len());
            buffer.items.drain(..take).collect()
        };

        if bundle.is_empty() {
            return StepOutcome::Finished;
        }

        let done = *processed;
        self.update_info(guard.generation, |status| status.progress = done);

        let service = self.scanner.name();
        for (source, item) in bundle {
            if let Some(outcome) = guard.owner_state() {
                return outcome;
            }

            match self
                .scanner
                .process_item(source.as_ref(), &item, guard)
                .await
            {
                Ok(result) => {
                    SCAN_ITEMS
                        .with_label_values(&[service, result.as_str()])
                        .inc();
                }
                Err(e) => {
                    warn!(service, item = %item.title, error = %e, "Failed to process item");
                    SCAN_ITEMS.with_label_values(&[service, "error"]).inc();
                    *failed += 1;
                }
            }
            *processed += 1;
        }

        if self.buffer.lock().unwrap().items.is_empty() {
            StepOutcome::Finished
        } else {
            StepOutcome::Continue
        }
    }

    fn update_info(&self, generation: u64, update: impl FnOnce(&mut ScanStatus)) {
        let mut info = self.info.lock().unwrap();
        if info.generation == generation {
            update(&mut info.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arr::ServiceError;
    use crate::testing::{fixtures, MockInventorySource};

    struct RecordingScanner {
        sources: Vec<Arc<MockInventorySource>>,
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl RecordingScanner {
        fn new(sources: Vec<Arc<MockInventorySource>>) -> Self {
            Self {
                sources,
                seen: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Scanner for RecordingScanner {
        fn name(&self) -> &'static str {
            "radarr"
        }

        fn sources(&self) -> Vec<Arc<dyn InventorySource>> {
            self.sources
                .iter()
                .map(|s| s.clone() as Arc<dyn InventorySource>)
                .collect()
        }

        async fn process_item(
            &self,
            _source: &dyn InventorySource,
            item: &InventoryItem,
            _guard: &dyn TransitionGuard,
        ) -> Result<ItemResult, ScanError> {
            if self.fail_on.as_deref() == Some(item.title.as_str()) {
                return Err(ScanError::item(&item.title, "boom"));
            }
            self.seen.lock().unwrap().push(item.title.clone());
            Ok(ItemResult::Applied)
        }
    }

    async fn source_with_movies(id: i64, count: u32) -> Arc<MockInventorySource> {
        let source = Arc::new(MockInventorySource::new(fixtures::source(id, "radarr", false)));
        for n in 1..=count {
            source
                .add_item(fixtures::movie_item(n as i64, 1000 * id as u32 + n, 1))
                .await;
        }
        source
    }

    fn config(batch_size: usize, batch_delay_ms: u64) -> SyncConfig {
        SyncConfig {
            batch_size,
            batch_delay_ms,
        }
    }

    #[tokio::test]
    async fn test_session_processes_all_items_in_order() {
        let scanner = RecordingScanner::new(vec![
            source_with_movies(1, 3).await,
            source_with_movies(2, 2).await,
        ]);
        let session = ScanSession::new(scanner, config(2, 1), None);

        let outcome = session.run().wait().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Finished {
                processed: 5,
                total: 5,
                failed: 0
            }
        );
        assert_eq!(session.scanner().seen().len(), 5);
        assert_eq!(session.scanner().seen()[0], "Movie 1001");

        let status = session.status();
        assert!(!status.running);
        assert_eq!(status.progress, 5);
        assert_eq!(status.total, 5);
        assert_eq!(status.last_outcome, Some(outcome));
    }

    #[tokio::test]
    async fn test_item_failure_does_not_abort_session() {
        let mut scanner = RecordingScanner::new(vec![source_with_movies(1, 3).await]);
        scanner.fail_on = Some("Movie 1002".to_string());
        let session = ScanSession::new(scanner, config(20, 1), None);

        let outcome = session.run().wait().await.unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Finished {
                processed: 3,
                total: 3,
                failed: 1
            }
        );
        assert_eq!(session.scanner().seen(), vec!["Movie 1001", "Movie 1003"]);
    }

    #[tokio::test]
    async fn test_unreachable_source_is_skipped() {
        let down = source_with_movies(1, 2).await;
        down.set_next_error(ServiceError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })
        .await;
        let scanner = RecordingScanner::new(vec![down, source_with_movies(2, 1).await]);
        let session = ScanSession::new(scanner, config(20, 1), None);

        let outcome = session.run().wait().await.unwrap();
        assert_eq!(outcome.processed(), 1);
        assert_eq!(session.scanner().seen(), vec!["Movie 2001"]);
    }

    #[tokio::test]
    async fn test_cancel_clears_running_and_buffer() {
        let scanner = RecordingScanner::new(vec![source_with_movies(1, 3).await]);
        let session = ScanSession::new(scanner, config(1, 10), None);

        let handle = session.run();
        assert!(session.status().running);
        assert!(session.cancel());
        assert!(!session.cancel());

        let outcome = handle.wait().await.unwrap();
        assert_eq!(outcome, ScanOutcome::Cancelled { processed: 0 });
        assert!(!session.status().running);
        assert!(session.scanner().seen().is_empty());
    }

    #[tokio::test]
    async fn test_newer_session_supersedes_running_one() {
        let scanner = RecordingScanner::new(vec![source_with_movies(1, 3).await]);
        let session = ScanSession::new(scanner, config(1, 100), None);

        let first = session.run();
        // Let the first session process its first bundle and start waiting
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = session.run();
        assert_ne!(first.session_id, second.session_id);

        let first_outcome = first.wait().await.unwrap();
        assert_eq!(first_outcome, ScanOutcome::Superseded { processed: 1 });
        assert!(session.status().running);

        let second_outcome = second.wait().await.unwrap();
        assert_eq!(second_outcome.as_str(), "finished");
        assert!(!session.status().running);
        assert_eq!(session.scanner().seen().len(), 4);
    }

    #[tokio::test]
    async fn test_stale_guard_after_supersession() {
        let state = Arc::new(AtomicU64::new(pack(3, true)));
        let guard = SessionGuard {
            state: Arc::clone(&state),
            generation: 3,
        };
        assert!(guard.is_current());

        state.store(pack(4, true), Ordering::SeqCst);
        assert!(!guard.is_current());
        assert_eq!(guard.owner_state(), Some(StepOutcome::Superseded));

        let guard = SessionGuard {
            state: Arc::clone(&state),
            generation: 4,
        };
        state.store(pack(4, false), Ordering::SeqCst);
        assert_eq!(guard.owner_state(), Some(StepOutcome::Cancelled));
    }
}
