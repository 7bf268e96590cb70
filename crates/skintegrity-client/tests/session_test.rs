mod helpers;

use helpers::{sample_video, session, FakeGateway, FakeStorage};
use skintegrity_client::{
    ClientError, PollError, PollStrategy, ResultView, SelectedVideo, SessionState,
};
use skintegrity_core::{AnalysisOutcome, Classification, ClassificationResult, Confidence};
use skintegrity_db::{InMemoryResultStore, Settlement};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn real(confidence: f64) -> Settlement {
    Settlement::Completed {
        prediction: "REAL".to_string(),
        confidence,
    }
}

async fn wait_for_state(rx: &mut watch::Receiver<SessionState>, state: SessionState) {
    while *rx.borrow_and_update() != state {
        rx.changed().await.expect("session dropped");
    }
}

async fn assert_cleaned_up(storage: &FakeStorage, store: &InMemoryResultStore) {
    assert_eq!(storage.delete_count(), 1);
    assert_eq!(storage.object_count().await, 0);
    assert_eq!(store.delete_count(), 1);
    assert_eq!(store.row_count().await, 0);
}

#[tokio::test]
async fn test_row_poll_reaches_authentic_verdict() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::settling(&store, 2, real(0.92));

    let mut session = session(&storage, &gateway, 10).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    let result = session.submit().await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.result(), Some(&result));
    assert_eq!(session.error(), None);
    assert_eq!(store.read_count(), 3);

    let view = ResultView::new(&result, session.video());
    assert_eq!(view.headline, "Authentic Video");
    assert_eq!(view.confidence, "92.0%");
    assert_eq!(view.file_size.as_deref(), Some("4.00 KB"));

    let triggered = gateway.triggered_urls().await;
    assert_eq!(triggered.len(), 1);
    assert!(triggered[0].starts_with("https://bucket.example.com/skintegrityvideos/"));
    assert!(triggered[0].ends_with(".mp4"));

    assert_eq!(storage.upload_count(), 1);
    assert_cleaned_up(&storage, &store).await;
}

#[tokio::test]
async fn test_row_poll_times_out_after_configured_attempts() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 3).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    let err = session.submit().await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Poll(PollError::TimedOut { attempts: 3 })
    ));
    assert_eq!(session.state(), SessionState::TimedOut);
    assert_eq!(session.error(), Some("Analysis timed out after 3 attempts."));
    assert_eq!(store.read_count(), 3);
    assert_cleaned_up(&storage, &store).await;
}

#[tokio::test]
async fn test_failed_row_surfaces_message() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::settling(
        &store,
        0,
        Settlement::Failed {
            message: "Could not decode video".to_string(),
        },
    );

    let mut session = session(&storage, &gateway, 5).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap_err();

    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.error(), Some("Could not decode video"));
    assert_eq!(session.result(), None);
    assert_cleaned_up(&storage, &store).await;
}

#[tokio::test]
async fn test_http_poll_follows_poll_url() {
    let storage = FakeStorage::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(Some(
        "https://inference.example.com/result/42".to_string(),
    )));
    gateway
        .script_polls(vec![
            AnalysisOutcome::processing(None),
            AnalysisOutcome::completed(ClassificationResult {
                classification: Classification::Deepfake,
                confidence: Confidence::from_fraction(0.4).unwrap(),
            }),
        ])
        .await;

    let mut session = session(&storage, &gateway, 10);
    session.select_video(sample_video()).unwrap();
    let result = session.submit().await.unwrap();

    assert_eq!(result.classification, Classification::Deepfake);
    assert_eq!(gateway.poll_count(), 2);
    assert_eq!(
        ResultView::new(&result, None).headline,
        "Deepfake Detected"
    );
    assert_eq!(storage.delete_count(), 1);
    assert_eq!(storage.object_count().await, 0);
}

#[tokio::test]
async fn test_http_strategy_without_poll_url_is_an_error() {
    let storage = FakeStorage::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 10).with_strategy(PollStrategy::Http);
    session.select_video(sample_video()).unwrap();
    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, ClientError::Trigger(_)));
    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(gateway.poll_count(), 0);
    assert_eq!(storage.delete_count(), 1);
}

#[tokio::test]
async fn test_immediate_result_skips_polling() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::completed(ClassificationResult {
        classification: Classification::Real,
        confidence: Confidence::from_fraction(0.875).unwrap(),
    }));

    let mut session = session(&storage, &gateway, 10).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    let result = session.submit().await.unwrap();

    assert_eq!(result.confidence.fraction(), 0.875);
    assert_eq!(store.read_count(), 0);
    assert_cleaned_up(&storage, &store).await;
}

#[tokio::test]
async fn test_upload_failure_stops_before_trigger() {
    let storage = FakeStorage::new();
    storage.fail_uploads();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 10).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, ClientError::Upload(_)));
    assert_eq!(session.error(), Some("Failed to upload video."));
    assert_eq!(session.state(), SessionState::Errored);
    assert!(gateway.triggered_urls().await.is_empty());
    assert_eq!(store.row_count().await, 0);
    assert_eq!(storage.delete_count(), 1);
    assert_eq!(store.delete_count(), 0);
}

#[tokio::test]
async fn test_url_failure_still_deletes_blob() {
    let storage = FakeStorage::new();
    storage.fail_urls();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 10);
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap_err();

    assert_eq!(session.error(), Some("Failed to retrieve video URL."));
    assert_eq!(storage.delete_count(), 1);
    assert_eq!(storage.object_count().await, 0);
}

#[tokio::test]
async fn test_trigger_rejection_cleans_blob_and_row() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::rejecting(422, "Unsupported codec");

    let mut session = session(&storage, &gateway, 10).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap_err();

    assert_eq!(session.state(), SessionState::Errored);
    assert_eq!(session.error(), Some("Unsupported codec"));
    assert_eq!(store.read_count(), 0);
    assert_cleaned_up(&storage, &store).await;
}

#[tokio::test]
async fn test_delete_failures_do_not_replace_result() {
    let storage = FakeStorage::new();
    storage.fail_deletes();
    let store = InMemoryResultStore::new();
    store.fail_deletes().await;
    let gateway = FakeGateway::settling(&store, 0, real(0.6));

    let mut session = session(&storage, &gateway, 5).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.error(), None);
    assert_eq!(storage.delete_count(), 1);
    assert_eq!(store.delete_count(), 1);
}

#[tokio::test]
async fn test_submit_without_video() {
    let storage = FakeStorage::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 5);
    let err = session.submit().await.unwrap_err();

    assert!(matches!(err, ClientError::NoVideoSelected));
    assert_eq!(session.error(), Some("Please select a video to upload."));
    assert_eq!(storage.upload_count(), 0);
    assert_eq!(storage.delete_count(), 0);
}

#[tokio::test]
async fn test_invalid_selection_is_rejected() {
    let storage = FakeStorage::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 5);
    let err = session
        .select_video(SelectedVideo::new("slides.pdf", vec![1u8; 10], "application/pdf"))
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidVideo(_)));
    assert!(session.video().is_none());
    assert!(session.error().is_some());

    session
        .select_video(SelectedVideo::new("empty.mp4", Vec::new(), "video/mp4"))
        .unwrap_err();
    assert_eq!(session.error(), Some("The selected video is empty."));
}

#[tokio::test]
async fn test_reset_restores_initial_state() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::settling(&store, 1, real(0.99));

    let mut session = session(&storage, &gateway, 5).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap();
    assert!(session.result().is_some());

    for _ in 0..2 {
        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.video().is_none());
        assert!(session.result().is_none());
        assert!(session.error().is_none());
    }

    // Usable again after reset.
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap();
    assert_eq!(session.state(), SessionState::Completed);
}

#[tokio::test]
async fn test_reset_after_failure() {
    let storage = FakeStorage::new();
    let gateway = FakeGateway::rejecting(500, "Server error");

    let mut session = session(&storage, &gateway, 5);
    session.select_video(sample_video()).unwrap();
    session.submit().await.unwrap_err();
    assert!(session.error().is_some());

    session.reset();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.error().is_none());
    assert!(session.video().is_none());
}

#[tokio::test]
async fn test_cancellation_token_stops_polling() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 100).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    let mut rx = session.subscribe();
    let token = session.cancellation_token();
    let canceller = tokio::spawn(async move {
        wait_for_state(&mut rx, SessionState::Polling).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5), session.submit())
        .await
        .expect("submit should stop once cancelled")
        .unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(err, ClientError::Poll(PollError::Cancelled)));
    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(session.error(), Some("Analysis was cancelled."));
    assert_cleaned_up(&storage, &store).await;
}

#[tokio::test]
async fn test_dropped_submission_still_cleans_up() {
    let storage = FakeStorage::new();
    let store = InMemoryResultStore::new();
    let gateway = FakeGateway::answering(AnalysisOutcome::processing(None));

    let mut session = session(&storage, &gateway, 100).with_result_store(Arc::new(store.clone()));
    session.select_video(sample_video()).unwrap();
    let mut rx = session.subscribe();

    let task = tokio::spawn(async move { session.submit().await });
    wait_for_state(&mut rx, SessionState::Polling).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_cleaned_up(&storage, &store).await;
}
