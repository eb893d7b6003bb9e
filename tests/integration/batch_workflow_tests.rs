/*!
 * Batch workflow from JSON items to translated files on disk
 */

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use subrelay::app_config::Config;
use subrelay::app_controller::Controller;
use subrelay::catalog::{EpisodeRecord, HistoryAction, MovieRecord, Repository};
use subrelay::file_utils::PROVENANCE_MARKER;
use subrelay::progress::RecordingProgress;
use subrelay::translation::{DispatchPolicy, MediaKind};

use crate::common::fake_service::{FakeTranslationService, Reply};
use crate::common::{create_temp_dir, create_test_subtitle};

fn completed() -> Reply {
    Reply::ok(json!({
        "status": "completed",
        "progress": 100,
        "result": [{"position": 0, "line": "Ceci est un test."}, {"position": 1, "line": "Il contient"}]
    }))
}

fn episode(root: &Path, episode_id: i64, subtitles: Option<String>) -> EpisodeRecord {
    EpisodeRecord {
        episode_id,
        series_id: 1,
        series_title: "Show".to_string(),
        title: format!("Episode {}", episode_id),
        season: 1,
        episode: episode_id,
        path: root.join(format!("Show/Season {}/S01E{:02}.mkv", episode_id, episode_id)).display().to_string(),
        subtitles,
    }
}

fn episode_item(episode_id: i64) -> Value {
    json!({
        "type": "episode",
        "seriesId": 1,
        "episodeId": episode_id,
        "sourceLanguage": "en",
        "targetLanguage": "fr"
    })
}

async fn controller(
    fake: &FakeTranslationService,
    repository: Arc<Repository>,
    dispatch: DispatchPolicy,
) -> (Controller, Arc<RecordingProgress>) {
    let mut config = Config::default();
    config.translator.url = fake.base_url.clone();
    config.batch.dispatch = dispatch;

    let progress = Arc::new(RecordingProgress::new());
    let controller = Controller::with_repository(config, repository, progress.clone(), CancellationToken::new());
    (controller, progress)
}

#[tokio::test]
async fn test_runBatch_withMixedItems_shouldTranslateValidOnesAndReportTheRest() {
    let dir = create_temp_dir().unwrap();
    let root = dir.path();
    let stored = create_test_subtitle(root, "Show/Season 1/S01E01.en.srt").unwrap();
    // Only discoverable on disk
    create_test_subtitle(root, "Show/Season 2/S01E02.en.srt").unwrap();

    let repository = Arc::new(Repository::new_in_memory().unwrap());
    repository
        .upsert_episode(&episode(root, 1, Some(json!([["en", stored.display().to_string(), 120]]).to_string())))
        .await
        .unwrap();
    repository.upsert_episode(&episode(root, 2, None)).await.unwrap();

    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![completed()]);
    let (controller, _progress) = controller(&fake, repository.clone(), DispatchPolicy::Inline).await;

    let items = vec![
        episode_item(1),
        json!({"type": "song", "sourceLanguage": "en", "targetLanguage": "fr"}),
        episode_item(2),
    ];
    let result = controller.run_batch(&items).await;

    assert_eq!(result.queued, 2);
    assert_eq!(result.skipped, 1);
    assert_eq!(result.errors, vec!["Invalid type \"song\" in item".to_string()]);
    assert_eq!(fake.submit_calls(), 2);

    let output = fs::read_to_string(root.join("Show/Season 1/S01E01.fr.srt")).unwrap();
    assert!(output.contains("Ceci est un test."));
    assert!(output.contains("For testing purposes."));
    assert!(output.contains(PROVENANCE_MARKER));
    assert!(root.join("Show/Season 2/S01E02.fr.srt").exists());

    let history = repository.list_history(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|h| h.action == HistoryAction::Translated && h.media_kind == MediaKind::Episode));
    assert_eq!(history[0].language, "fr");
}

#[tokio::test]
async fn test_runBatch_inQueueMode_shouldFinishEveryItemBeforeReturning() {
    let dir = create_temp_dir().unwrap();
    let root = dir.path();
    let stored = create_test_subtitle(root, "Movies/Film.srt").unwrap();

    let repository = Arc::new(Repository::new_in_memory().unwrap());
    repository
        .upsert_movie(&MovieRecord {
            movie_id: 7,
            title: "Film".to_string(),
            path: root.join("Movies/Film.mkv").display().to_string(),
            subtitles: Some(format!("[('en:hi', '{}', 120)]", stored.display())),
        })
        .await
        .unwrap();

    let fake = FakeTranslationService::start().await;
    fake.accept_jobs().on_poll(vec![completed()]);
    let (controller, progress) = controller(&fake, repository.clone(), DispatchPolicy::Queue).await;

    let items = vec![
        json!({"type": "movie", "radarrId": 7, "sourceLanguage": "en", "targetLanguage": "fr", "hi": true}),
        json!({"type": "movie", "movieId": 8, "sourceLanguage": "en", "targetLanguage": "fr"}),
    ];
    let result = controller.run_batch(&items).await;

    assert_eq!(result.queued, 1);
    assert_eq!(result.errors, vec!["Movie 8 not found".to_string()]);
    assert!(root.join("Movies/Film.fr.hi.srt").exists());
    assert_eq!(repository.list_history(10).await.unwrap()[0].language, "fr:hi");
    assert!(progress.messages().is_empty());

    let payload = &fake.payloads()[0];
    assert_eq!(payload["arrMediaId"], 7);
    assert_eq!(payload["mediaType"], "Movie");
}

#[tokio::test]
async fn test_runBatch_withFailingService_shouldLeaveNoOutputAndNoHistory() {
    let dir = create_temp_dir().unwrap();
    let root = dir.path();
    create_test_subtitle(root, "Show/Season 1/S01E01.en.srt").unwrap();

    let repository = Arc::new(Repository::new_in_memory().unwrap());
    repository.upsert_episode(&episode(root, 1, None)).await.unwrap();

    let fake = FakeTranslationService::start().await;
    fake.accept_jobs()
        .on_poll(vec![Reply::ok(json!({"status": "failed", "error": "model overloaded"}))]);
    let (controller, progress) = controller(&fake, repository.clone(), DispatchPolicy::Inline).await;

    let result = controller.run_batch(&[episode_item(1)]).await;

    assert_eq!(result.queued, 0);
    assert_eq!(result.skipped, 1);
    assert!(result.errors[0].contains("model overloaded"));
    assert!(!root.join("Show/Season 1/S01E01.fr.srt").exists());
    assert!(repository.list_history(10).await.unwrap().is_empty());
    assert!(progress.messages().iter().any(|m| m.starts_with("AI translation failed")));
}
