//! Scan and reconciliation lifecycle integration tests.
//!
//! These tests drive real scan sessions over mock service instances against
//! an on-disk store and check how media and request statuses move:
//! request submitted -> item scanned -> request approved/completed.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use requestarr_core::config::{RoutingMode, ServiceSettings, SyncConfig};
use requestarr_core::media::{MediaStatus, MediaStore, MediaType, RequestStatus, SqliteMediaStore};
use requestarr_core::routing::{OverrideEvaluator, RoutingResolver, SqliteRuleStore, SubmitRequest};
use requestarr_core::scan::{
    MediaSyncer, RadarrScanner, ReadarrScanner, ScanController, ScanOutcome, ScanSession,
    SonarrScanner,
};
use requestarr_core::testing::{fixtures, MockInventorySource, RecordingAgent};
use requestarr_core::{
    create_notification_system, ExternalIds, InventorySource, ReconciliationEngine,
    RequestRouter,
};

/// Test helper wiring store, engine, notifications and router together.
struct TestHarness {
    store: Arc<SqliteMediaStore>,
    engine: Arc<ReconciliationEngine>,
    router: RequestRouter,
    agent: Arc<RecordingAgent>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let store = Arc::new(SqliteMediaStore::new(&db_path).expect("Failed to create store"));
        let rules = Arc::new(SqliteRuleStore::new(&db_path).expect("Failed to create rule store"));

        let agent = Arc::new(RecordingAgent::new());
        let (handle, dispatcher) = create_notification_system(vec![agent.clone()], 64);
        tokio::spawn(dispatcher.run());

        let engine = Arc::new(
            ReconciliationEngine::new(store.clone() as Arc<dyn MediaStore>).with_notifier(handle),
        );

        let settings = ServiceSettings {
            radarr: vec![fixtures::instance(1, "Radarr", true, false)],
            sonarr: vec![fixtures::instance(1, "Sonarr", true, false)],
            readarr: vec![fixtures::instance(1, "Readarr", true, false)],
        };
        let router = RequestRouter::new(
            RoutingMode::Rules,
            RoutingResolver::new(rules.clone(), settings.clone()),
            OverrideEvaluator::new(rules, settings),
            engine.clone(),
        );

        Self {
            store,
            engine,
            router,
            agent,
            _temp_dir: temp_dir,
        }
    }

    fn syncer(&self) -> MediaSyncer {
        MediaSyncer::new(self.engine.clone())
    }

    async fn event_types(&self) -> Vec<&'static str> {
        // Let the dispatcher drain
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.agent
            .events()
            .await
            .iter()
            .map(|e| e.event_type())
            .collect()
    }
}

fn fast_sync() -> SyncConfig {
    SyncConfig {
        batch_size: 2,
        batch_delay_ms: 1,
    }
}

#[tokio::test]
async fn test_movie_request_completes_when_file_appears() {
    let harness = TestHarness::new();
    let request = harness
        .router
        .submit(SubmitRequest::new(MediaType::Movie, ExternalIds::tmdb(603), 7))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let radarr = Arc::new(MockInventorySource::new(fixtures::source(1, "radarr", false)));
    radarr.add_item(fixtures::movie_item(42, 603, 1)).await;
    let session = ScanSession::new(
        RadarrScanner::new(harness.syncer(), vec![radarr.clone() as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );

    let outcome = session.run().wait().await.unwrap();
    assert_eq!(outcome.processed(), 1);

    let media = harness.store.get_media(request.media_id).unwrap().unwrap();
    assert_eq!(media.status, MediaStatus::Available);
    assert_eq!(media.external_service_id, Some(42));

    let stored = harness.store.get_request(request.id).unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Completed);

    assert_eq!(
        harness.event_types().await,
        vec!["request_auto_approved", "request_completed", "media_available"]
    );
}

#[tokio::test]
async fn test_rescanning_unchanged_inventory_is_idempotent() {
    let harness = TestHarness::new();
    harness
        .router
        .submit(SubmitRequest::new(MediaType::Movie, ExternalIds::tmdb(603), 7))
        .await
        .unwrap();

    let radarr = Arc::new(MockInventorySource::new(fixtures::source(1, "radarr", false)));
    radarr.add_item(fixtures::movie_item(42, 603, 1)).await;
    let session = ScanSession::new(
        RadarrScanner::new(harness.syncer(), vec![radarr as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );

    session.run().wait().await.unwrap();
    let first = harness.event_types().await;

    session.run().wait().await.unwrap();
    session.run().wait().await.unwrap();
    assert_eq!(harness.event_types().await, first);
}

#[tokio::test]
async fn test_tv_request_completes_season_by_season() {
    let harness = TestHarness::new();
    let request = harness
        .router
        .submit(
            SubmitRequest::new(MediaType::Tv, ExternalIds::tvdb(81189), 3).with_seasons(vec![1, 2]),
        )
        .await
        .unwrap();

    harness
        .store
        .update_request_status(request.id, RequestStatus::Approved)
        .unwrap();
    for season in &request.seasons {
        harness
            .store
            .update_season_request_status(season.id, RequestStatus::Approved)
            .unwrap();
    }

    let sonarr = Arc::new(MockInventorySource::new(fixtures::source(1, "sonarr", false)));
    sonarr
        .add_item(fixtures::series_item(
            9,
            81189,
            vec![fixtures::season(1, 2, 2), fixtures::season(2, 3, 0)],
        ))
        .await;
    sonarr
        .set_episodes(
            9,
            vec![fixtures::episode(1, 1, true), fixtures::episode(1, 2, true)],
        )
        .await;
    let session = ScanSession::new(
        SonarrScanner::new(harness.syncer(), vec![sonarr.clone() as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );

    session.run().wait().await.unwrap();

    let snapshot = harness.store.get_snapshot(request.media_id).unwrap().unwrap();
    assert_eq!(snapshot.season(1).unwrap().status, MediaStatus::Available);
    assert_eq!(snapshot.season(2).unwrap().status, MediaStatus::Processing);
    assert_eq!(snapshot.media.status, MediaStatus::PartiallyAvailable);

    let stored = harness.store.get_request(request.id).unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    let season_status = |n: u32| {
        stored
            .seasons
            .iter()
            .find(|s| s.season_number == n)
            .map(|s| s.status)
    };
    assert_eq!(season_status(1), Some(RequestStatus::Completed));
    assert_eq!(season_status(2), Some(RequestStatus::Approved));

    // Season 2 lands
    sonarr
        .set_items(vec![fixtures::series_item(
            9,
            81189,
            vec![fixtures::season(1, 2, 2), fixtures::season(2, 3, 3)],
        )])
        .await;
    sonarr
        .set_episodes(
            9,
            vec![
                fixtures::episode(1, 1, true),
                fixtures::episode(1, 2, true),
                fixtures::episode(2, 1, true),
                fixtures::episode(2, 2, true),
                fixtures::episode(2, 3, true),
            ],
        )
        .await;
    session.run().wait().await.unwrap();

    let snapshot = harness.store.get_snapshot(request.media_id).unwrap().unwrap();
    assert_eq!(snapshot.media.status, MediaStatus::Available);
    let stored = harness.store.get_request(request.id).unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Completed);

    let events = harness.event_types().await;
    assert_eq!(
        events.iter().filter(|e| **e == "request_completed").count(),
        1
    );
    assert_eq!(
        events.iter().filter(|e| **e == "media_available").count(),
        1
    );
}

#[tokio::test]
async fn test_second_standard_instance_does_not_lower_seasons() {
    let harness = TestHarness::new();

    let full = Arc::new(MockInventorySource::new(fixtures::source(1, "sonarr", false)));
    full.add_item(fixtures::series_item(9, 81189, vec![fixtures::season(1, 2, 2)]))
        .await;
    full.set_episodes(
        9,
        vec![fixtures::episode(1, 1, true), fixtures::episode(1, 2, true)],
    )
    .await;

    // Monitored on the second instance but nothing downloaded there
    let empty = Arc::new(MockInventorySource::new(fixtures::source(2, "sonarr", false)));
    empty
        .add_item(fixtures::series_item(14, 81189, vec![fixtures::season(1, 2, 0)]))
        .await;

    let session = ScanSession::new(
        SonarrScanner::new(
            harness.syncer(),
            vec![
                full as Arc<dyn InventorySource>,
                empty as Arc<dyn InventorySource>,
            ],
        ),
        fast_sync(),
        None,
    );

    for _ in 0..3 {
        session.run().wait().await.unwrap();
    }

    let media = harness
        .store
        .find_media(MediaType::Tv, &ExternalIds::tvdb(81189))
        .unwrap()
        .unwrap();
    let snapshot = harness.store.get_snapshot(media.id).unwrap().unwrap();
    assert_eq!(snapshot.season(1).unwrap().status, MediaStatus::Available);
    assert_eq!(snapshot.media.status, MediaStatus::Available);
    assert_eq!(snapshot.media.service_id, Some(1));
    assert_eq!(snapshot.media.external_service_id, Some(9));

    let events = harness.event_types().await;
    assert_eq!(
        events.iter().filter(|e| **e == "media_available").count(),
        1
    );
}

#[tokio::test]
async fn test_request_skips_seasons_already_available() {
    let harness = TestHarness::new();
    let sonarr = Arc::new(MockInventorySource::new(fixtures::source(1, "sonarr", false)));
    sonarr
        .add_item(fixtures::series_item(
            9,
            81189,
            vec![fixtures::season(1, 2, 2), fixtures::season(2, 3, 0)],
        ))
        .await;
    sonarr
        .set_episodes(
            9,
            vec![fixtures::episode(1, 1, true), fixtures::episode(1, 2, true)],
        )
        .await;
    let session = ScanSession::new(
        SonarrScanner::new(harness.syncer(), vec![sonarr.clone() as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );
    session.run().wait().await.unwrap();

    let request = harness
        .router
        .submit(
            SubmitRequest::new(MediaType::Tv, ExternalIds::tvdb(81189), 3).with_seasons(vec![1, 2]),
        )
        .await
        .unwrap();
    let requested: Vec<u32> = request.seasons.iter().map(|s| s.season_number).collect();
    assert_eq!(requested, vec![2]);

    harness
        .store
        .update_request_status(request.id, RequestStatus::Approved)
        .unwrap();
    harness
        .store
        .update_season_request_status(request.seasons[0].id, RequestStatus::Approved)
        .unwrap();

    // Season 2 lands
    sonarr
        .set_items(vec![fixtures::series_item(
            9,
            81189,
            vec![fixtures::season(1, 2, 2), fixtures::season(2, 3, 3)],
        )])
        .await;
    sonarr
        .set_episodes(
            9,
            vec![
                fixtures::episode(1, 1, true),
                fixtures::episode(1, 2, true),
                fixtures::episode(2, 1, true),
                fixtures::episode(2, 2, true),
                fixtures::episode(2, 3, true),
            ],
        )
        .await;
    session.run().wait().await.unwrap();

    let snapshot = harness.store.get_snapshot(request.media_id).unwrap().unwrap();
    assert_eq!(snapshot.media.status, MediaStatus::Available);
    let stored = harness.store.get_request(request.id).unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Completed);
    assert_eq!(stored.seasons[0].status, RequestStatus::Completed);
}

#[tokio::test]
async fn test_4k_instance_only_touches_alt_track() {
    let harness = TestHarness::new();
    let radarr_4k = Arc::new(MockInventorySource::new(fixtures::source(2, "radarr", true)));
    let mut item = fixtures::movie_item(5, 27205, 0);
    item.monitored = true;
    radarr_4k.add_item(item).await;

    let session = ScanSession::new(
        RadarrScanner::new(harness.syncer(), vec![radarr_4k as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );
    session.run().wait().await.unwrap();

    let media = harness
        .store
        .find_media(MediaType::Movie, &ExternalIds::tmdb(27205))
        .unwrap()
        .unwrap();
    assert_eq!(media.status, MediaStatus::Unknown);
    assert_eq!(media.status_alt, MediaStatus::Processing);
    assert_eq!(media.service_id_alt, Some(2));
}

#[tokio::test]
async fn test_books_follow_download_rules() {
    let harness = TestHarness::new();
    let readarr = Arc::new(MockInventorySource::new(fixtures::source(1, "readarr", false)));
    readarr.add_item(fixtures::book_item(3, 12345, 1)).await;
    let mut missing = fixtures::book_item(4, 777, 0);
    missing.grabbed = true;
    readarr.add_item(missing).await;

    let session = ScanSession::new(
        ReadarrScanner::new(harness.syncer(), vec![readarr as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );
    let outcome = session.run().wait().await.unwrap();
    assert_eq!(
        outcome,
        ScanOutcome::Finished {
            processed: 2,
            total: 2,
            failed: 0
        }
    );

    let available = harness
        .store
        .find_media(MediaType::Book, &ExternalIds::hardcover(12345))
        .unwrap()
        .unwrap();
    assert_eq!(available.status, MediaStatus::Available);
    let grabbed = harness
        .store
        .find_media(MediaType::Book, &ExternalIds::hardcover(777))
        .unwrap()
        .unwrap();
    assert_eq!(grabbed.status, MediaStatus::Processing);
}

#[tokio::test]
async fn test_blocklisted_media_survives_scans() {
    let harness = TestHarness::new();
    harness
        .engine
        .blocklist(MediaType::Movie, &ExternalIds::tmdb(603))
        .await
        .unwrap();

    let radarr = Arc::new(MockInventorySource::new(fixtures::source(1, "radarr", false)));
    radarr.add_item(fixtures::movie_item(42, 603, 1)).await;
    let session = ScanSession::new(
        RadarrScanner::new(harness.syncer(), vec![radarr as Arc<dyn InventorySource>]),
        fast_sync(),
        None,
    );
    session.run().wait().await.unwrap();

    let media = harness
        .store
        .find_media(MediaType::Movie, &ExternalIds::tmdb(603))
        .unwrap()
        .unwrap();
    assert_eq!(media.status, MediaStatus::Blocklisted);
    assert!(session.status().last_outcome.is_some());
}
