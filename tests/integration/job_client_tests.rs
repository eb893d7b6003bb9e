/*!
 * Job client against the fake translation service
 */

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use subrelay::errors::ServiceError;
use subrelay::progress::{ProgressEvent, RecordingProgress, SilentProgress};
use subrelay::providers::{PollSettings, TranslatedLine, TranslatorSettings};

use crate::common::fake_service::{FakeTranslationService, Reply};
use crate::common::{fast_client, movie_metadata};

fn lines() -> Vec<String> {
    vec!["Hello".to_string(), "World".to_string()]
}

fn running(progress: u32) -> Reply {
    Reply::ok(json!({"status": "processing", "progress": progress, "message": format!("Batch {}", progress)}))
}

fn completed() -> Reply {
    Reply::ok(json!({
        "status": "completed",
        "progress": 100,
        "result": [{"position": 0, "line": "Bonjour"}, {"position": 1, "line": "Monde"}]
    }))
}

#[tokio::test]
async fn test_submitAndAwait_withCompletedJob_shouldReturnResultAndReportProgress() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![running(10), running(60), completed()]);
    let progress = Arc::new(RecordingProgress::new());
    let client = fast_client(&fake.base_url, progress.clone());

    let result = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p-1", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result[0], TranslatedLine { position: 0, line: "Bonjour".to_string() });
    assert_eq!(fake.poll_calls(), 3);
    assert_eq!(fake.sync_calls(), 0);

    let events = progress.events();
    assert_eq!(
        events[0],
        ProgressEvent::Progress { id: "p-1".to_string(), name: "Batch 10".to_string(), value: 10, count: 100 }
    );
    assert_eq!(events.last(), Some(&ProgressEvent::Hidden("p-1".to_string())));
}

#[tokio::test]
async fn test_submitAndAwait_withPayload_shouldSendServiceContract() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![completed()]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap();

    let payload = &fake.payloads()[0];
    assert_eq!(payload["arrMediaId"], 7);
    assert_eq!(payload["mediaType"], "Movie");
    assert_eq!(payload["lines"][1], json!({"position": 1, "line": "World"}));
    assert_eq!(payload["config"]["temperature"], json!(0.3));
    assert!(payload["config"]["reasoning"].is_null());
}

#[tokio::test]
async fn test_submitAndAwait_withoutJobId_shouldFailWithoutPolling() {
    let fake = FakeTranslationService::start().await;
    fake.on_submit(vec![Reply::ok(json!({"status": "accepted"}))]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::MissingJobId);
    assert_eq!(fake.poll_calls(), 0);
}

#[tokio::test]
async fn test_submitAndAwait_withCompletedButEmptyResult_shouldFail() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![Reply::ok(json!({"status": "completed", "result": []}))]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::JobFailed(_)));
}

#[tokio::test]
async fn test_submitAndAwait_withFailedJob_shouldSurfaceServiceError() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs()
        .on_poll(vec![running(5), Reply::ok(json!({"status": "failed", "error": "quota exceeded"}))]);
    let progress = Arc::new(RecordingProgress::new());
    let client = fast_client(&fake.base_url, progress.clone());

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::JobFailed("quota exceeded".to_string()));
    assert_eq!(progress.messages(), vec!["Translation failed: quota exceeded"]);
}

#[tokio::test]
async fn test_submitAndAwait_withStructuredError_shouldFailWithServiceText() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![Reply::ok(json!({
        "status": "failed",
        "error": {"code": 402, "message": "quota exceeded"}
    }))]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(&err, ServiceError::JobFailed(reason) if reason.contains("quota exceeded")));
    assert_eq!(fake.poll_calls(), 1);
}

#[tokio::test]
async fn test_submitAndAwait_withTextualProgress_shouldStillComplete() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![
        Reply::ok(json!({"status": "processing", "progress": "40"})),
        Reply::ok(json!({
            "status": "completed",
            "progress": "100",
            "result": [{"position": 0, "line": "Bonjour"}]
        })),
    ]);
    let progress = Arc::new(RecordingProgress::new());
    let client = fast_client(&fake.base_url, progress.clone());

    let result = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, vec![TranslatedLine { position: 0, line: "Bonjour".to_string() }]);
    assert_eq!(fake.poll_calls(), 2);
    assert!(matches!(&progress.events()[0], ProgressEvent::Progress { value: 40, .. }));
}

#[tokio::test]
async fn test_submitAndAwait_withFailedPolls_shouldKeepPolling() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs()
        .on_poll(vec![Reply::status(500), Reply::status(503), completed()]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let result = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await;

    assert!(result.is_ok());
    assert_eq!(fake.poll_calls(), 3);
}

#[tokio::test]
async fn test_submitAndAwait_withoutTerminalStatus_shouldTimeOut() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![running(1)]);
    let progress = Arc::new(RecordingProgress::new());
    let client = fast_client(&fake.base_url, progress.clone()).with_poll_settings(PollSettings {
        interval: Duration::from_millis(20),
        max_wait: Duration::from_millis(200),
    });

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::TimedOut { .. }));
    assert!(fake.poll_calls() >= 2);
    assert!(progress.messages()[0].starts_with("Translation timed out after"));
}

#[tokio::test]
async fn test_submitAndAwait_whenCancelled_shouldStopAndCancelRemoteJob() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![running(1)]);
    let progress = Arc::new(RecordingProgress::new());
    let client = fast_client(&fake.base_url, progress.clone());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::Cancelled);
    assert_eq!(fake.delete_calls(), 1);
    assert_eq!(progress.events().last(), Some(&ProgressEvent::Hidden("p".to_string())));
}

#[tokio::test]
async fn test_submitAndAwait_whenCancelledDuringSlowPoll_shouldStopPromptly() {
    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![running(1).after(Duration::from_secs(5))]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &cancel)
        .await
        .unwrap_err();

    assert_eq!(err, ServiceError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(fake.delete_calls(), 1);
}

#[tokio::test]
async fn test_submitAndAwait_withQueueUnavailable_shouldFallBackToSync() {
    let fake = FakeTranslationService::start().await;
    fake.on_submit(vec![Reply::status(404)])
        .on_sync(vec![Reply::ok(json!([{"position": 0, "line": "Hallo"}]))]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let result = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result, vec![TranslatedLine { position: 0, line: "Hallo".to_string() }]);
    assert_eq!(fake.sync_calls(), 1);
    assert_eq!(fake.poll_calls(), 0);
    assert_eq!(fake.payloads()[1]["lines"][0]["line"], "Hello");
}

#[tokio::test]
async fn test_syncFallback_withServerErrors_shouldRetryThenSucceed() {
    let fake = FakeTranslationService::start().await;
    fake.on_submit(vec![Reply::status(503)]).on_sync(vec![
        Reply::status(503),
        Reply::status(429),
        Reply::ok(json!([{"position": 1, "line": "Welt"}])),
    ]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let result = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result[0].line, "Welt");
    assert_eq!(fake.sync_calls(), 3);
}

#[tokio::test]
async fn test_syncFallback_withPersistentRateLimit_shouldBecomeUnavailable() {
    let fake = FakeTranslationService::start().await;
    fake.on_submit(vec![Reply::status(404)]).on_sync(vec![Reply::status(429)]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::ServiceUnavailable(_)));
    assert_eq!(fake.sync_calls(), 3);
}

#[tokio::test]
async fn test_syncFallback_withClientError_shouldNotRetry() {
    let fake = FakeTranslationService::start().await;
    fake.on_submit(vec![Reply::status(404)]).on_sync(vec![Reply::status(400)]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Api { status: 400, .. }));
    assert_eq!(fake.sync_calls(), 1);
}

#[tokio::test]
async fn test_syncFallback_withMalformedElement_shouldRejectWholeResponse() {
    let fake = FakeTranslationService::start().await;
    fake.on_submit(vec![Reply::status(404)])
        .on_sync(vec![Reply::ok(json!([{"position": 0, "line": "ok"}, {"line": "no position"}]))]);
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::MalformedResponse(_)));
    assert_eq!(fake.sync_calls(), 1);
}

#[tokio::test]
async fn test_submitAndAwait_withUnreachableService_shouldBeUnavailable() {
    let client = fast_client("http://127.0.0.1:9", Arc::new(SilentProgress));

    let err = client
        .submit_and_await(&lines(), &movie_metadata(), &TranslatorSettings::default(), "p", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::ServiceUnavailable(_)));
}

#[tokio::test]
async fn test_inspection_shouldReturnServiceBodies() {
    let fake = FakeTranslationService::start().await;
    let client = fast_client(&fake.base_url, Arc::new(SilentProgress));

    assert_eq!(client.status().await.unwrap()["status"], "ok");
    assert_eq!(client.list_jobs().await.unwrap()["jobs"][0]["jobId"], "job-1");
    assert_eq!(client.models().await.unwrap()["models"][1], "model-b");
    assert_eq!(client.cancel_job("job-1").await.unwrap()["status"], "cancelled");

    let missing = client.cancel_job("nope").await.unwrap_err();
    assert_eq!(missing, ServiceError::Api { status: 404, message: "Job not found".to_string() });
    assert!(matches!(client.service_config().await, Err(ServiceError::Api { status: 404, .. })));
}
