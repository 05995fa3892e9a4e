use super::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use shared::{domain::UserId, error::ErrorCode};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};
use uuid::Uuid;

#[derive(Clone)]
struct ServerState {
    known_story: StoryId,
    recorded_views: Arc<Mutex<Vec<(FrameId, RecordFrameViewRequest)>>>,
}

async fn handle_get_story(
    State(state): State<ServerState>,
    Path(story_id): Path<Uuid>,
) -> impl IntoResponse {
    if StoryId(story_id) != state.known_story {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"code": "not_found", "message": "story expired"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "id": story_id,
            "user_id": 9,
            "created_at": "2026-10-15T08:00:00Z",
            "frames": [
                {"id": Uuid::new_v4(), "kind": "image",
                 "media_url": "https://cdn.example.com/a.jpg", "duration_seconds": 5},
                {"id": Uuid::new_v4(), "kind": "video",
                 "media_url": "https://cdn.example.com/b.mp4", "duration_seconds": 3,
                 "viewed": true},
                {"id": Uuid::new_v4(), "kind": "text", "content": "bye"}
            ]
        })),
    )
}

async fn handle_record_view(
    State(state): State<ServerState>,
    Path(frame_id): Path<Uuid>,
    Json(payload): Json<RecordFrameViewRequest>,
) -> StatusCode {
    state
        .recorded_views
        .lock()
        .await
        .push((FrameId(frame_id), payload));
    StatusCode::NO_CONTENT
}

async fn spawn_story_server(state: ServerState) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/api/stories/:story_id", get(handle_get_story))
        .route("/api/stories/frames/:frame_id/views", post(handle_record_view))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}/api"))
}

fn server_state() -> ServerState {
    ServerState {
        known_story: StoryId::new_random(),
        recorded_views: Arc::new(Mutex::new(Vec::new())),
    }
}

#[tokio::test]
async fn load_story_decodes_frames_from_server() {
    let state = server_state();
    let server_url = spawn_story_server(state.clone()).await.expect("spawn server");
    let client = StoryApiClient::new(&server_url, Duration::from_secs(5)).expect("client");

    let story = client.load_story(state.known_story).await.expect("load");

    assert_eq!(story.id, state.known_story);
    assert_eq!(story.user_id, UserId(9));
    assert!(story.created_at.is_some());
    assert_eq!(story.frame_count(), 3);
    assert!(story.frames[1].viewed);
    assert_eq!(story.frames[2].duration(), Duration::from_secs(5));
}

#[tokio::test]
async fn load_story_surfaces_api_error_body() {
    let state = server_state();
    let server_url = spawn_story_server(state).await.expect("spawn server");
    let client = StoryApiClient::new(&server_url, Duration::from_secs(5)).expect("client");

    let err = client
        .load_story(StoryId::new_random())
        .await
        .expect_err("missing story");

    match err.downcast_ref::<StoryApiError>() {
        Some(StoryApiError::Rejected { status, error }) => {
            assert_eq!(*status, 404);
            assert_eq!(error.code, ErrorCode::NotFound);
            assert_eq!(error.message, "story expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

struct TestStoryLoader {
    fail_with: Option<String>,
}

#[async_trait]
impl StoryLoader for TestStoryLoader {
    async fn load_story(&self, story_id: StoryId) -> Result<Story> {
        match &self.fail_with {
            Some(reason) => Err(anyhow::anyhow!("{reason}")),
            None => Ok(Story {
                id: story_id,
                user_id: UserId(1),
                created_at: None,
                frames: Vec::new(),
            }),
        }
    }
}

#[tokio::test]
async fn load_story_state_reports_missing_story_as_expired() {
    let state = server_state();
    let server_url = spawn_story_server(state.clone()).await.expect("spawn server");
    let client = StoryApiClient::new(&server_url, Duration::from_secs(5)).expect("client");

    let expired = load_story_state(&client, StoryId::new_random()).await;
    assert_eq!(expired, StoryLoadState::Expired);

    let ready = load_story_state(&client, state.known_story).await;
    assert!(ready.is_ready());
}

#[tokio::test]
async fn load_story_state_reports_other_errors_as_failed() {
    let loader = TestStoryLoader {
        fail_with: Some("connection refused".to_string()),
    };
    let failed = load_story_state(&loader, StoryId::new_random()).await;
    assert!(
        matches!(failed, StoryLoadState::Failed(ref reason) if reason.contains("connection refused"))
    );

    let unreachable = StoryApiClient::new("http://127.0.0.1:9/api", Duration::from_secs(1))
        .expect("client");
    let failed = load_story_state(&unreachable, StoryId::new_random()).await;
    assert!(matches!(failed, StoryLoadState::Failed(_)));
}

#[tokio::test]
async fn record_frame_view_posts_to_frame_views_endpoint() {
    let state = server_state();
    let server_url = spawn_story_server(state.clone()).await.expect("spawn server");
    let client = StoryApiClient::new(&server_url, Duration::from_secs(5)).expect("client");
    let frame_id = FrameId::new_random();

    let before = Utc::now();
    client.record_frame_view(frame_id).await.expect("record");
    let after = Utc::now();

    let recorded = state.recorded_views.lock().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, frame_id);
    assert!(recorded[0].1.viewed_at >= before && recorded[0].1.viewed_at <= after);
}

#[test]
fn server_url_gains_trailing_slash_for_relative_joins() {
    let client =
        StoryApiClient::new("https://api.example.com/v2", Duration::from_secs(5)).expect("client");
    assert_eq!(client.server_url().as_str(), "https://api.example.com/v2/");
    let endpoint = client.endpoint("stories/abc").expect("endpoint");
    assert_eq!(endpoint.as_str(), "https://api.example.com/v2/stories/abc");
}

#[test]
fn invalid_server_url_is_rejected() {
    let err = StoryApiClient::new("not a url", Duration::from_secs(5))
        .err()
        .expect("invalid url");
    assert!(matches!(
        err.downcast_ref::<StoryApiError>(),
        Some(StoryApiError::InvalidServerUrl { .. })
    ));
}
