use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

use talent_backend::error::{Error, Result};
use talent_backend::models::training::Sender;
use talent_backend::services::llm_service::{ChatModel, ChatRequest, ChatRole, ChatSettings};
use talent_backend::services::training_service::TrainingService;
use talent_backend::services::training_store::{MemoryTrainingStore, TrainingStore};

/// Replays queued replies in order and records every request it receives.
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    fn with(replies: Vec<std::result::Result<&str, &str>>) -> Arc<Self> {
        let queue = replies
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        Arc::new(Self {
            replies: Mutex::new(queue),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(Error::Upstream(msg)),
            None => Ok("Mmm, no sé si me interesa.".to_string()),
        }
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryTrainingStore>,
    model: Arc<ScriptedModel>,
}

fn settings(model: &str) -> ChatSettings {
    ChatSettings {
        model: model.to_string(),
        temperature: 0.5,
        max_tokens: 200,
    }
}

fn harness(model: Arc<ScriptedModel>) -> Harness {
    let store = Arc::new(MemoryTrainingStore::new());
    let service = TrainingService::new(
        store.clone(),
        model.clone(),
        settings("roleplay"),
        settings("evaluator"),
    );
    let app: Router = talent_backend::routes::training::router()
        .with_state(service)
        .layer(talent_backend::middleware::cors::api_cors());
    Harness { app, store, model }
}

async fn seed_code(store: &MemoryTrainingStore, code: &str, expires_in: Duration) {
    store
        .create_code(code, 15, Utc::now() + expires_in)
        .await
        .expect("seed code");
}

async fn call(app: &Router, body: JsonValue) -> (StatusCode, JsonValue) {
    call_raw(app, body.to_string()).await
}

async fn call_raw(app: &Router, body: String) -> (StatusCode, JsonValue) {
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/functions/v1/training-chat")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, json)
}

async fn start(app: &Router, code: &str, name: &str) -> Uuid {
    let (status, body) = call(
        app,
        json!({"action": "start-session", "trainingCode": code, "candidateName": name}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start failed: {}", body);
    body["sessionId"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn abc123_scenario_end_to_end() {
    let model = ScriptedModel::with(vec![
        Ok("Hola. ¿Qué me quieres ofrecer?"),
        Ok("Buen saludo, faltó indagar necesidades.\nPuntuación global: 82"),
    ]);
    let h = harness(model);
    seed_code(&h.store, "ABC123", Duration::days(1)).await;

    let (status, body) = call(&h.app, json!({"action": "validate-code", "trainingCode": "ABC123"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["code"]["code"], "ABC123");
    assert_eq!(body["code"]["durationMinutes"], 15);

    let session_id = start(&h.app, "ABC123", "Jane").await;
    assert!(h.store.transcript(session_id).await.unwrap().is_empty());

    let (status, body) = call(
        &h.app,
        json!({"action": "send-message", "sessionId": session_id, "message": "Hola"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Hola. ¿Qué me quieres ofrecer?");
    assert_eq!(body["state"], "in_conversation");

    let transcript = h.store.transcript(session_id).await.unwrap();
    let senders: Vec<Sender> = transcript.iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::Candidate, Sender::Ai]);
    assert_eq!(transcript[0].content, "Hola");

    let (status, body) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    assert_eq!(status, StatusCode::OK);
    let score = body["evaluation"]["score"].as_i64().unwrap();
    assert_eq!(score, 82);
    assert!(!body["evaluation"]["text"].as_str().unwrap().is_empty());
    assert_eq!(body["evaluation"]["fallback"], false);

    let stored = h.store.get_session(session_id).await.unwrap().unwrap();
    assert!(stored.ended_at.is_some());
    assert_eq!(stored.score, Some(82));

    let requests = h.model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, "roleplay");
    assert_eq!(requests[0].messages[0].role, ChatRole::System);
    assert_eq!(requests[1].model, "evaluator");
}

#[tokio::test]
async fn expired_and_unknown_codes_are_rejected() {
    let h = harness(ScriptedModel::with(vec![]));
    seed_code(&h.store, "OLD001", Duration::hours(-1)).await;
    seed_code(&h.store, "NEW001", Duration::hours(1)).await;

    let (status, body) = call(&h.app, json!({"action": "validate-code", "trainingCode": "OLD001"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "expired");

    let (status, body) = call(
        &h.app,
        json!({"action": "start-session", "trainingCode": "OLD001", "candidateName": "Jane"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "expired");

    let (status, body) = call(&h.app, json!({"action": "validate-code", "trainingCode": "NOPE"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = call(&h.app, json!({"action": "validate-code", "trainingCode": "NEW001"})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn every_turn_appends_one_candidate_and_one_ai_message() {
    let h = harness(ScriptedModel::with(vec![]));
    seed_code(&h.store, "TURNS1", Duration::days(1)).await;
    let session_id = start(&h.app, "TURNS1", "Jane").await;

    for (i, text) in ["Hola", "Te ofrezco fibra", "Y un combo con TV"].iter().enumerate() {
        let (status, _) = call(
            &h.app,
            json!({"action": "send-message", "sessionId": session_id, "message": text}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let transcript = h.store.transcript(session_id).await.unwrap();
        assert_eq!(transcript.len(), (i + 1) * 2);
    }

    let transcript = h.store.transcript(session_id).await.unwrap();
    for pair in transcript.chunks(2) {
        assert_eq!(pair[0].sender, Sender::Candidate);
        assert_eq!(pair[1].sender, Sender::Ai);
    }

    let last_prompt = &h.model.requests()[2].messages[0].content;
    assert!(last_prompt.contains("internet / fibra"));
}

#[tokio::test]
async fn messages_after_end_are_answered_in_ended_state() {
    let model = ScriptedModel::with(vec![
        Ok("¿Qué me ofrece?"),
        Ok("Puntuación global: 55"),
        Ok("Ya le dije que no."),
    ]);
    let h = harness(model);
    seed_code(&h.store, "AFTER1", Duration::days(1)).await;
    let session_id = start(&h.app, "AFTER1", "Jane").await;
    call(
        &h.app,
        json!({"action": "send-message", "sessionId": session_id, "message": "Hola"}),
    )
    .await;
    let (status, _) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    assert_eq!(status, StatusCode::OK);
    let before = h.store.transcript(session_id).await.unwrap().len();

    let (status, body) = call(
        &h.app,
        json!({"action": "send-message", "sessionId": session_id, "message": "¿Sigue ahí?"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "ended");
    assert_eq!(body["message"], "Ya le dije que no.");

    let transcript = h.store.transcript(session_id).await.unwrap();
    assert_eq!(transcript.len(), before + 2);
    assert_eq!(transcript[before].sender, Sender::Candidate);
    assert_eq!(transcript[before + 1].sender, Sender::Ai);
}

#[tokio::test]
async fn lowercase_code_reaches_uppercase_record() {
    let h = harness(ScriptedModel::with(vec![]));
    seed_code(&h.store, "ABC123", Duration::days(1)).await;

    let (status, body) = call(&h.app, json!({"action": "validate-code", "trainingCode": "abc123"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"]["code"], "ABC123");
    start(&h.app, "abc123", "Jane").await;
}

#[tokio::test]
async fn empty_session_gets_fixed_evaluation_without_model_call() {
    let h = harness(ScriptedModel::with(vec![]));
    seed_code(&h.store, "EMPTY1", Duration::days(1)).await;
    let session_id = start(&h.app, "EMPTY1", "Jane").await;

    let (status, body) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evaluation"]["score"], 50);
    assert_eq!(body["evaluation"]["fallback"], true);
    assert!(h.model.requests().is_empty());
}

#[tokio::test]
async fn ending_twice_evaluates_twice() {
    let model = ScriptedModel::with(vec![
        Ok("¿Y cuánto cuesta?"),
        Ok("Puntuación global: 40"),
        Ok("Puntuación global: 90"),
    ]);
    let h = harness(model);
    seed_code(&h.store, "TWICE1", Duration::days(1)).await;
    let session_id = start(&h.app, "TWICE1", "Jane").await;
    call(
        &h.app,
        json!({"action": "send-message", "sessionId": session_id, "message": "Hola"}),
    )
    .await;

    let (_, first) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    let (_, second) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    assert_eq!(first["evaluation"]["score"], 40);
    assert_eq!(second["evaluation"]["score"], 90);
    assert_eq!(h.model.requests().len(), 3);

    let stored = h.store.get_session(session_id).await.unwrap().unwrap();
    assert_eq!(stored.score, Some(90));
}

#[tokio::test]
async fn evaluation_failure_falls_back_and_missing_marker_defaults() {
    let model = ScriptedModel::with(vec![
        Ok("Hola"),
        Err("provider down"),
        Ok("Buen trabajo, sin puntuación explícita."),
    ]);
    let h = harness(model);
    seed_code(&h.store, "FALLB1", Duration::days(1)).await;
    let session_id = start(&h.app, "FALLB1", "Jane").await;
    call(
        &h.app,
        json!({"action": "send-message", "sessionId": session_id, "message": "Buenas tardes"}),
    )
    .await;

    let (status, body) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["evaluation"]["score"], 60);
    assert_eq!(body["evaluation"]["fallback"], true);

    let (_, body) = call(&h.app, json!({"action": "end-session", "sessionId": session_id})).await;
    assert_eq!(body["evaluation"]["score"], 70);
    assert_eq!(body["evaluation"]["fallback"], false);
}

#[tokio::test]
async fn upstream_failure_keeps_candidate_turn_and_returns_500() {
    let h = harness(ScriptedModel::with(vec![Err("quota exceeded")]));
    seed_code(&h.store, "UPSTR1", Duration::days(1)).await;
    let session_id = start(&h.app, "UPSTR1", "Jane").await;

    let (status, body) = call(
        &h.app,
        json!({"action": "send-message", "sessionId": session_id, "message": "Hola"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));

    let transcript = h.store.transcript(session_id).await.unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].sender, Sender::Candidate);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let h = harness(ScriptedModel::with(vec![]));

    let (status, _) = call(&h.app, json!({"action": "summon-manager"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call_raw(&h.app, "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&h.app, json!({"action": "send-message", "sessionId": "abc", "message": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &h.app,
        json!({"action": "send-message", "sessionId": Uuid::new_v4(), "message": "Hola"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "session_not_found");
}

#[tokio::test]
async fn preflight_is_answered_with_permissive_cors() {
    let h = harness(ScriptedModel::with(vec![]));
    let resp = h
        .app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/functions/v1/training-chat")
                .header("origin", "https://training.example.com")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,apikey")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
