//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::context::{AppState, ChatReply};
use crate::error::{Error, Result};

const NOT_UNDERSTOOD: &str = "Sorry, I didn't catch that.";
const EXIT_REPLY: &str = "Exiting chatbot...";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpeakRequest {
    pub text: Option<String>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/voice_chat", post(voice_chat))
        .route("/speak", post(speak))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl+C.
pub async fn serve(state: Arc<AppState>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn index_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "entries": state.retriever.vector_db().entries().len(),
        "vocabulary": state.retriever.vector_db().vocabulary().len(),
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Json<ChatReply> {
    match req.message.as_deref() {
        Some(message) if !message.is_empty() => Json(state.answer(message)),
        _ => Json(ChatReply::default()),
    }
}

/// Transcribe an uploaded recording and answer it like typed input.
///
/// Always replies 200 with a `ChatReply`; failures become reply text.
async fn voice_chat(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Json<ChatReply> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("voice_chat", %request_id);

    async move {
        let multipart = match multipart {
            Ok(multipart) => multipart,
            Err(e) => return Json(ChatReply::text(format!("An error occurred: {e}"))),
        };

        let reply = match transcribe_upload(&state, multipart).await {
            Ok(text) => {
                tracing::info!(transcript = %text, "voice input");
                if text.trim().eq_ignore_ascii_case("quit") {
                    ChatReply::text(EXIT_REPLY)
                } else {
                    state.answer(&text)
                }
            }
            Err(Error::UnrecognizedSpeech) => ChatReply::text(NOT_UNDERSTOOD),
            Err(e @ Error::ServiceUnavailable(_)) => {
                tracing::warn!(error = %e, "speech recognition unavailable");
                ChatReply::text(format!(
                    "Could not request results from the speech recognition service; {e}"
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "voice chat failed");
                ChatReply::text(format!("An error occurred: {e}"))
            }
        };
        Json(reply)
    }
    .instrument(span)
    .await
}

/// Stores the `audio` field in a temp file for the transcriber.
///
/// The file is removed when this function returns, on every path.
async fn transcribe_upload(state: &AppState, mut multipart: Multipart) -> Result<String> {
    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Upload(e.to_string()))?
    {
        if field.name() == Some("audio") {
            audio = Some(field.bytes().await.map_err(|e| Error::Upload(e.to_string()))?);
            break;
        }
    }
    let audio = audio.ok_or_else(|| Error::Upload("missing 'audio' field".to_string()))?;

    let file = tempfile::Builder::new()
        .prefix("faqbot-audio-")
        .suffix(".wav")
        .tempfile()?;
    tokio::fs::write(file.path(), &audio).await?;
    tracing::debug!(bytes = audio.len(), path = ?file.path(), "stored voice upload");

    state.transcriber.transcribe(file.path()).await
}

async fn speak(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpeakRequest>,
) -> Json<serde_json::Value> {
    let Some(text) = req.text.filter(|t| !t.is_empty()) else {
        return Json(serde_json::json!({"status": "spoken"}));
    };

    match state.speaker.speak(&text).await {
        Ok(()) => Json(serde_json::json!({"status": "spoken"})),
        Err(e) => {
            tracing::warn!(error = %e, "text-to-speech failed");
            Json(serde_json::json!({"status": "failed", "error": e.to_string()}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use crate::entities::CapitalizedSpanExtractor;
    use crate::knowledge::QaPair;
    use crate::retriever::Retriever;
    use crate::speech::{Speaker, SilentSpeaker, Transcriber};

    enum Outcome {
        Text(&'static str),
        Unrecognized,
        Unavailable,
    }

    struct StubTranscriber {
        outcome: Outcome,
        seen: Arc<Mutex<Option<(PathBuf, Vec<u8>)>>>,
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(&self, audio: &Path) -> Result<String> {
            let bytes = std::fs::read(audio)?;
            *self.seen.lock().unwrap() = Some((audio.to_path_buf(), bytes));
            match self.outcome {
                Outcome::Text(text) => Ok(text.to_string()),
                Outcome::Unrecognized => Err(Error::UnrecognizedSpeech),
                Outcome::Unavailable => Err(Error::ServiceUnavailable("service down".to_string())),
            }
        }
    }

    struct FailingSpeaker;

    #[async_trait]
    impl Speaker for FailingSpeaker {
        async fn speak(&self, _text: &str) -> Result<()> {
            Err(Error::Synthesis("no audio device".to_string()))
        }
    }

    type Seen = Arc<Mutex<Option<(PathBuf, Vec<u8>)>>>;

    fn app(outcome: Outcome, speaker: Box<dyn Speaker>) -> (Router, Seen) {
        let seen: Seen = Arc::new(Mutex::new(None));
        let retriever = Retriever::from_pairs(vec![
            QaPair::new("What are your hours", "9 to 5"),
            QaPair::new("Where are you located", "Main Street"),
        ])
        .unwrap();
        let state = AppState::new(
            retriever,
            Box::new(CapitalizedSpanExtractor),
            Box::new(StubTranscriber {
                outcome,
                seen: seen.clone(),
            }),
            speaker,
        );
        (build_router(Arc::new(state)), seen)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn voice_request(field: &str, audio: &[u8]) -> Request<Body> {
        let boundary = "faqbot-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"clip.wav\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(audio);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/voice_chat")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> serde_json::Value {
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_matches_and_extracts() {
        let (router, _) = app(Outcome::Unrecognized, Box::new(SilentSpeaker));
        let reply = send(
            router,
            json_request("/chat", serde_json::json!({"message": "your hours on Main Street?"})),
        )
        .await;
        assert_eq!(
            reply,
            serde_json::json!({"response": "9 to 5", "entities": ["Main Street"]})
        );
    }

    #[tokio::test]
    async fn test_chat_without_message_is_empty() {
        let (router, _) = app(Outcome::Unrecognized, Box::new(SilentSpeaker));
        let empty = serde_json::json!({"response": "", "entities": []});

        let reply = send(router.clone(), json_request("/chat", serde_json::json!({}))).await;
        assert_eq!(reply, empty);

        let reply = send(router, json_request("/chat", serde_json::json!({"message": ""}))).await;
        assert_eq!(reply, empty);
    }

    #[tokio::test]
    async fn test_voice_chat_answers_transcript_and_cleans_up() {
        let (router, seen) = app(Outcome::Text("where are you located"), Box::new(SilentSpeaker));
        let reply = send(router, voice_request("audio", b"RIFF-audio")).await;
        assert_eq!(reply["response"], "Main Street");

        let (path, bytes) = seen.lock().unwrap().take().unwrap();
        assert_eq!(bytes, b"RIFF-audio");
        assert!(!path.exists(), "temp audio file was left behind");
    }

    #[tokio::test]
    async fn test_voice_chat_failures_clean_up() {
        let (router, seen) = app(Outcome::Unavailable, Box::new(SilentSpeaker));
        let reply = send(router, voice_request("audio", b"RIFF")).await;
        assert_eq!(
            reply["response"],
            "Could not request results from the speech recognition service; service down"
        );
        let (path, _) = seen.lock().unwrap().take().unwrap();
        assert!(!path.exists());

        let (router, seen) = app(Outcome::Unrecognized, Box::new(SilentSpeaker));
        let reply = send(router, voice_request("audio", b"RIFF")).await;
        assert_eq!(
            reply,
            serde_json::json!({"response": NOT_UNDERSTOOD, "entities": []})
        );
        let (path, _) = seen.lock().unwrap().take().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_voice_chat_quit_and_missing_field() {
        let (router, _) = app(Outcome::Text("Quit"), Box::new(SilentSpeaker));
        let reply = send(router, voice_request("audio", b"RIFF")).await;
        assert_eq!(reply["response"], EXIT_REPLY);

        let (router, seen) = app(Outcome::Text("hours"), Box::new(SilentSpeaker));
        let reply = send(router, voice_request("recording", b"RIFF")).await;
        let text = reply["response"].as_str().unwrap();
        assert!(text.starts_with("An error occurred:"), "{text}");
        assert!(seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_speak() {
        let (router, _) = app(Outcome::Unrecognized, Box::new(SilentSpeaker));
        let reply = send(router, json_request("/speak", serde_json::json!({"text": "hello"}))).await;
        assert_eq!(reply, serde_json::json!({"status": "spoken"}));

        let (router, _) = app(Outcome::Unrecognized, Box::new(FailingSpeaker));
        let reply = send(router, json_request("/speak", serde_json::json!({"text": "hello"}))).await;
        assert_eq!(reply["status"], "failed");

        let (router, _) = app(Outcome::Unrecognized, Box::new(FailingSpeaker));
        let reply = send(router, json_request("/speak", serde_json::json!({}))).await;
        assert_eq!(reply["status"], "spoken");
    }

    #[tokio::test]
    async fn test_health_and_index() {
        let (router, _) = app(Outcome::Unrecognized, Box::new(SilentSpeaker));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let reply = send(router.clone(), request).await;
        assert_eq!(reply, serde_json::json!({"status": "ok", "entries": 2, "vocabulary": 4}));

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cross_origin_requests_are_not_allowed() {
        let (router, _) = app(Outcome::Unrecognized, Box::new(SilentSpeaker));

        let mut request = json_request("/speak", serde_json::json!({"text": "hello"}));
        request
            .headers_mut()
            .insert(header::ORIGIN, "http://elsewhere.example".parse().unwrap());
        let response = router.clone().oneshot(request).await.unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/speak")
            .header(header::ORIGIN, "http://elsewhere.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(preflight).await.unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}
