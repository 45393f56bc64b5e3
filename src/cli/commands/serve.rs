//! Web app and HTTP API.
//!
//! Serves the single-page UI and a small REST surface where every user interaction is one
//! request that returns the rendered session.

use crate::app::App;
use crate::cli::Output;
use crate::config::Settings;
use crate::context::ContextSource;
use crate::error::SvarError;
use crate::session::{Event, View};
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("../../../assets/index.html");

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared application state.
struct AppState {
    app: Arc<App>,
}

type SharedState = Arc<AppState>;

/// Run the web app.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let app = Arc::new(App::new(settings)?);
    spawn_session_sweeper(app.clone());
    let router = router(app);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Svar");
    println!();
    Output::success(&format!("Open http://{} in your browser", addr));
    println!();
    println!("API:");
    Output::kv("Health", "GET    /health");
    Output::kv("New session", "POST   /sessions");
    Output::kv("Session", "GET    /sessions/{id}");
    Output::kv("Context", "POST   /sessions/{id}/topic | text | upload | source");
    Output::kv("Question", "POST   /sessions/{id}/question | voice");
    Output::kv("Answer", "POST   /sessions/{id}/answer");
    Output::kv("Playback", "GET    /sessions/{id}/voice.wav | answer.mp3");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router).await?;

    Ok(())
}

/// Periodically drop sessions whose page went away without closing them.
fn spawn_session_sweeper(app: Arc<App>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            app.evict_idle_sessions();
        }
    })
}

/// Build the router around an application.
pub fn router(app: Arc<App>) -> Router {
    let max_upload = app.settings().server.max_upload_bytes;
    let state = Arc::new(AppState { app });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/topic", post(search_topic))
        .route("/sessions/{id}/text", post(enter_text))
        .route("/sessions/{id}/upload", post(upload_document))
        .route("/sessions/{id}/source", post(select_source))
        .route("/sessions/{id}/question", post(type_question))
        .route("/sessions/{id}/voice", post(record_voice))
        .route("/sessions/{id}/answer", post(get_answer))
        .route("/sessions/{id}/voice.wav", get(voice_audio))
        .route("/sessions/{id}/answer.mp3", get(answer_audio))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TopicRequest {
    topic: String,
}

#[derive(Deserialize)]
struct TextRequest {
    text: String,
}

#[derive(Deserialize)]
struct SourceRequest {
    source: ContextSource,
}

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

#[derive(Deserialize)]
struct UploadParams {
    filename: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: SvarError) -> Response {
    let status = match e {
        SvarError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        SvarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    error_response(SvarError::InvalidInput(message))
}

fn render(result: crate::Result<View>) -> Response {
    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

async fn apply_json<T>(
    state: &AppState,
    id: Uuid,
    body: Result<Json<T>, JsonRejection>,
    event: impl FnOnce(T) -> Event,
) -> Response {
    match body {
        Ok(Json(req)) => render(state.app.apply(&id, event(req)).await),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

// === Handlers ===

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_session(State(state): State<SharedState>) -> Response {
    match state.app.create_session().await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_session(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    render(state.app.view(&id).await)
}

async fn delete_session(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    match state.app.close_session(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn search_topic(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    body: Result<Json<TopicRequest>, JsonRejection>,
) -> Response {
    apply_json(&state, id, body, |r| Event::SearchTopic(r.topic)).await
}

async fn enter_text(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Response {
    apply_json(&state, id, body, |r| Event::EnterText(r.text)).await
}

async fn select_source(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    body: Result<Json<SourceRequest>, JsonRejection>,
) -> Response {
    apply_json(&state, id, body, |r| Event::SelectSource(r.source)).await
}

async fn type_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    body: Result<Json<QuestionRequest>, JsonRejection>,
) -> Response {
    apply_json(&state, id, body, |r| Event::TypeQuestion(r.question)).await
}

async fn upload_document(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match body {
        Ok(bytes) => render(
            state
                .app
                .apply(
                    &id,
                    Event::UploadDocument {
                        filename: params.filename,
                        bytes: bytes.to_vec(),
                    },
                )
                .await,
        ),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn record_voice(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UploadParams>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    match body {
        Ok(bytes) => render(
            state
                .app
                .apply(
                    &id,
                    Event::RecordVoice {
                        filename: params.filename,
                        bytes: bytes.to_vec(),
                    },
                )
                .await,
        ),
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

async fn get_answer(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    render(state.app.apply(&id, Event::GetAnswer).await)
}

async fn voice_audio(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    match state.app.voice_audio(&id).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response(),
        Err(SvarError::InvalidInput(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

async fn answer_audio(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Response {
    match state.app.answer_audio(&id).await {
        Ok(bytes) => {
            ([(header::CONTENT_TYPE, state.app.answer_mime_type())], bytes).into_response()
        }
        Err(SvarError::InvalidInput(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}
