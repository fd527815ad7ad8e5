use crate::error::{Error, Result, TrainingError};
use crate::models::training::{
    SessionState, Sender, TrainingCode, TrainingEvaluation, TrainingMessage, TrainingSession,
};
use crate::services::llm_service::{ChatMessage, ChatModel, ChatRequest, ChatSettings};
use crate::services::training_prompts::{
    average_response_seconds, detect_products, empty_session_evaluation, evaluation_user_prompt,
    failed_evaluation, parse_score, roleplay_system_prompt, transcript_to_chat,
    DEFAULT_PARSED_SCORE, EVALUATION_SYSTEM_PROMPT,
};
use crate::services::training_store::{SessionStats, TrainingStore};
use crate::utils::token::generate_training_code;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

pub const GENERATED_CODE_LENGTH: usize = 8;
pub const MIN_CUSTOM_CODE_LENGTH: usize = 4;
pub const MAX_CUSTOM_CODE_LENGTH: usize = 32;

/// Codes are stored uppercase; lookups fold the candidate's input the same way.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug, Clone)]
pub struct TurnReply {
    pub message: String,
    pub state: SessionState,
}

#[derive(Clone)]
pub struct TrainingService {
    store: Arc<dyn TrainingStore>,
    model: Arc<dyn ChatModel>,
    chat: ChatSettings,
    evaluation: ChatSettings,
}

impl TrainingService {
    pub fn new(
        store: Arc<dyn TrainingStore>,
        model: Arc<dyn ChatModel>,
        chat: ChatSettings,
        evaluation: ChatSettings,
    ) -> Self {
        Self {
            store,
            model,
            chat,
            evaluation,
        }
    }

    pub fn store(&self) -> &Arc<dyn TrainingStore> {
        &self.store
    }

    pub async fn validate_code(&self, code: &str) -> Result<TrainingCode> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(Error::BadRequest("trainingCode is required".to_string()));
        }
        let record = self
            .store
            .find_code(&code)
            .await?
            .ok_or(TrainingError::CodeNotFound)?;
        if record.is_expired_at(Utc::now()) {
            tracing::info!(code = %record.code, expires_at = %record.expires_at, "Rejected expired training code");
            return Err(TrainingError::CodeExpired.into());
        }
        Ok(record)
    }

    pub async fn start_session(
        &self,
        code: &str,
        candidate_name: &str,
    ) -> Result<(TrainingSession, TrainingCode)> {
        let record = self.validate_code(code).await?;
        let name = candidate_name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("candidateName is required".to_string()));
        }
        let session = self.store.create_session(record.id, name).await?;
        tracing::info!(session_id = %session.id, code = %record.code, "Training session started");
        Ok((session, record))
    }

    async fn require_session(&self, session_id: Uuid) -> Result<TrainingSession> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| TrainingError::SessionNotFound.into())
    }

    pub async fn send_message(&self, session_id: Uuid, message: &str) -> Result<TurnReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::BadRequest("message is required".to_string()));
        }
        let session = self.require_session(session_id).await?;
        if session.ended_at.is_some() {
            tracing::warn!(session_id = %session_id, "Message sent to an ended training session");
        }

        self.store
            .append_message(session_id, Sender::Candidate, message)
            .await?;
        let transcript = self.store.transcript(session_id).await?;

        let products = detect_products(&transcript);
        let persona_silent = !transcript.iter().any(|m| m.sender == Sender::Ai);
        let system_prompt = roleplay_system_prompt(&products, persona_silent);
        tracing::debug!(session_id = %session_id, ?products, persona_silent, "Composed roleplay prompt");

        let request = ChatRequest::new(&self.chat, transcript_to_chat(system_prompt, &transcript));
        let reply = self.model.complete(request).await.map_err(|e| {
            tracing::error!(session_id = %session_id, error = %e, "Roleplay completion failed");
            Error::Upstream(format!("Failed to get AI response: {}", e))
        })?;

        self.store
            .append_message(session_id, Sender::Ai, &reply)
            .await?;

        Ok(TurnReply {
            message: reply,
            state: SessionState::of(&session, transcript.len() + 1),
        })
    }

    pub async fn end_session(&self, session_id: Uuid) -> Result<TrainingEvaluation> {
        self.require_session(session_id).await?;
        self.store.mark_ended(session_id).await?;

        let transcript = self.store.transcript(session_id).await?;
        let evaluation = if transcript.is_empty() {
            empty_session_evaluation()
        } else {
            self.evaluate(session_id, &transcript).await
        };

        self.store.save_evaluation(session_id, &evaluation).await?;
        tracing::info!(
            session_id = %session_id,
            score = evaluation.score,
            fallback = evaluation.fallback,
            "Training session evaluated"
        );
        Ok(evaluation)
    }

    async fn evaluate(&self, session_id: Uuid, transcript: &[TrainingMessage]) -> TrainingEvaluation {
        let avg = average_response_seconds(transcript);
        let candidate_turns = count_candidate_turns(transcript);
        let request = ChatRequest::new(
            &self.evaluation,
            vec![
                ChatMessage::system(EVALUATION_SYSTEM_PROMPT),
                ChatMessage::user(evaluation_user_prompt(transcript, avg)),
            ],
        );

        match self.model.complete(request).await {
            Ok(text) => {
                let score = parse_score(&text).unwrap_or_else(|| {
                    tracing::warn!(session_id = %session_id, "Evaluation missing score marker, using default");
                    DEFAULT_PARSED_SCORE
                });
                TrainingEvaluation {
                    score,
                    text,
                    avg_response_seconds: avg,
                    candidate_turns,
                    fallback: false,
                }
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Evaluation completion failed, returning fallback");
                failed_evaluation(avg, candidate_turns)
            }
        }
    }

    pub async fn create_code(
        &self,
        code: Option<String>,
        duration_minutes: i32,
        valid_for_hours: i64,
    ) -> Result<TrainingCode> {
        let code = match code.map(|c| normalize_code(&c)) {
            Some(c) if !c.is_empty() => {
                if !c.chars().all(|ch| ch.is_ascii_alphanumeric()) {
                    return Err(Error::BadRequest(
                        "Training code must be alphanumeric".to_string(),
                    ));
                }
                if !(MIN_CUSTOM_CODE_LENGTH..=MAX_CUSTOM_CODE_LENGTH).contains(&c.len()) {
                    return Err(Error::BadRequest(format!(
                        "Training code must have between {} and {} characters",
                        MIN_CUSTOM_CODE_LENGTH, MAX_CUSTOM_CODE_LENGTH
                    )));
                }
                c
            }
            _ => generate_training_code(GENERATED_CODE_LENGTH),
        };
        let expires_at = Utc::now() + Duration::hours(valid_for_hours);
        let record = self
            .store
            .create_code(&code, duration_minutes, expires_at)
            .await?;
        tracing::info!(code = %record.code, expires_at = %record.expires_at, "Training code created");
        Ok(record)
    }

    pub async fn list_codes(&self) -> Result<Vec<TrainingCode>> {
        self.store.list_codes().await
    }

    pub async fn list_sessions(&self, limit: i64) -> Result<Vec<TrainingSession>> {
        self.store.list_sessions(limit.clamp(1, 500)).await
    }

    pub async fn recent_stats(&self, days: i64) -> Result<SessionStats> {
        self.store
            .session_stats(Utc::now() - Duration::days(days))
            .await
    }

    pub async fn session_detail(
        &self,
        session_id: Uuid,
    ) -> Result<(TrainingSession, Vec<TrainingMessage>)> {
        let session = self.require_session(session_id).await?;
        let transcript = self.store.transcript(session_id).await?;
        Ok((session, transcript))
    }
}

fn count_candidate_turns(transcript: &[TrainingMessage]) -> usize {
    transcript
        .iter()
        .filter(|m| m.sender == Sender::Candidate)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_service::{ChatRole, MockChatModel};
    use crate::services::training_prompts::{EMPTY_SESSION_SCORE, FAILED_EVALUATION_SCORE};
    use crate::services::training_store::MemoryTrainingStore;

    fn settings(model: &str) -> ChatSettings {
        ChatSettings {
            model: model.into(),
            temperature: 0.5,
            max_tokens: 100,
        }
    }

    fn service(model: MockChatModel) -> (TrainingService, Arc<MemoryTrainingStore>) {
        let store = Arc::new(MemoryTrainingStore::new());
        let svc = TrainingService::new(
            store.clone(),
            Arc::new(model),
            settings("chat-model"),
            settings("eval-model"),
        );
        (svc, store)
    }

    async fn seed_code(store: &MemoryTrainingStore, code: &str, hours: i64) {
        store
            .create_code(code, 15, Utc::now() + Duration::hours(hours))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validate_distinguishes_missing_and_expired() {
        let (svc, store) = service(MockChatModel::new());
        seed_code(&store, "OLD", -1).await;
        seed_code(&store, "ABC123", 24).await;

        let err = svc.validate_code("NOPE").await.unwrap_err();
        assert!(matches!(err, Error::Training(TrainingError::CodeNotFound)));
        let err = svc.validate_code("OLD").await.unwrap_err();
        assert!(matches!(err, Error::Training(TrainingError::CodeExpired)));
        let ok = svc.validate_code("  ABC123 ").await.unwrap();
        assert_eq!(ok.code, "ABC123");
    }

    #[tokio::test]
    async fn first_turn_prompt_asks_what_is_offered() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .withf(|req| {
                req.model == "chat-model"
                    && req.messages.len() == 2
                    && req.messages[0].role == ChatRole::System
                    && req.messages[0].content.contains("qué te quiere ofrecer")
                    && req.messages[1] == ChatMessage::user("Hola")
            })
            .times(1)
            .returning(|_| Ok("¿Quién habla?".to_string()));
        let (svc, store) = service(model);
        seed_code(&store, "ABC123", 24).await;

        let (session, _) = svc.start_session("ABC123", "Jane").await.unwrap();
        let reply = svc.send_message(session.id, "Hola").await.unwrap();
        assert_eq!(reply.message, "¿Quién habla?");
        assert_eq!(reply.state, SessionState::InConversation);

        let t = store.transcript(session.id).await.unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t[0].sender, Sender::Candidate);
        assert_eq!(t[1].sender, Sender::Ai);
    }

    #[tokio::test]
    async fn mentioned_products_bias_later_turns() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .withf(|req| req.messages[0].content.contains("internet / fibra"))
            .times(1)
            .returning(|_| Ok("¿Y cuánto cuesta?".to_string()));
        let (svc, store) = service(model);
        seed_code(&store, "ABC123", 24).await;
        let (session, _) = svc.start_session("ABC123", "Jane").await.unwrap();

        svc.send_message(session.id, "Le llamo por la fibra").await.unwrap();
    }

    #[tokio::test]
    async fn upstream_failure_keeps_candidate_turn() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .returning(|_| Err(Error::Upstream("OpenAI API Error 503".into())));
        let (svc, store) = service(model);
        seed_code(&store, "ABC123", 24).await;
        let (session, _) = svc.start_session("ABC123", "Jane").await.unwrap();

        let err = svc.send_message(session.id, "Hola").await.unwrap_err();
        assert!(err.to_string().contains("OpenAI API Error 503"));
        let t = store.transcript(session.id).await.unwrap();
        assert_eq!(t.len(), 1);
    }

    #[tokio::test]
    async fn empty_session_skips_model() {
        let mut model = MockChatModel::new();
        model.expect_complete().times(0);
        let (svc, store) = service(model);
        seed_code(&store, "ABC123", 24).await;
        let (session, _) = svc.start_session("ABC123", "Jane").await.unwrap();

        let eval = svc.end_session(session.id).await.unwrap();
        assert_eq!(eval.score, EMPTY_SESSION_SCORE);
        assert!(eval.fallback);
        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert!(stored.ended_at.is_some());
        assert_eq!(stored.score, Some(EMPTY_SESSION_SCORE));
    }

    #[tokio::test]
    async fn evaluation_parses_marker_or_defaults() {
        let mut model = MockChatModel::new();
        let mut seq = mockall::Sequence::new();
        model
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("No me interesa".to_string()));
        model
            .expect_complete()
            .withf(|req| req.model == "eval-model")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("Puntuación global: 82\nFortalezas: claridad".to_string()));
        model
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("Buen trabajo en general".to_string()));
        let (svc, store) = service(model);
        seed_code(&store, "ABC123", 24).await;
        let (session, _) = svc.start_session("ABC123", "Jane").await.unwrap();
        svc.send_message(session.id, "Le ofrezco un combo").await.unwrap();

        let first = svc.end_session(session.id).await.unwrap();
        assert_eq!(first.score, 82);
        assert_eq!(first.candidate_turns, 1);
        assert!(!first.fallback);

        let second = svc.end_session(session.id).await.unwrap();
        assert_eq!(second.score, DEFAULT_PARSED_SCORE);
        assert_eq!(second.text, "Buen trabajo en general");
    }

    #[tokio::test]
    async fn evaluation_failure_is_masked_with_fallback() {
        let mut model = MockChatModel::new();
        let mut seq = mockall::Sequence::new();
        model
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("Dígame".to_string()));
        model
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::Upstream("timeout".into())));
        let (svc, store) = service(model);
        seed_code(&store, "ABC123", 24).await;
        let (session, _) = svc.start_session("ABC123", "Jane").await.unwrap();
        svc.send_message(session.id, "Hola").await.unwrap();

        let eval = svc.end_session(session.id).await.unwrap();
        assert_eq!(eval.score, FAILED_EVALUATION_SCORE);
        assert!(eval.fallback);
    }

    #[tokio::test]
    async fn unknown_session_is_typed_not_found() {
        let (svc, _) = service(MockChatModel::new());
        let err = svc.end_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::Training(TrainingError::SessionNotFound)));
    }

    #[tokio::test]
    async fn generated_codes_are_uppercase_alphanumeric() {
        let (svc, _) = service(MockChatModel::new());
        let code = svc.create_code(None, 20, 48).await.unwrap();
        assert_eq!(code.code.len(), GENERATED_CODE_LENGTH);
        assert!(code
            .code
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert!(code.expires_at > Utc::now() + Duration::hours(47));

        let custom = svc.create_code(Some(" abc123 ".into()), 15, 1).await.unwrap();
        assert_eq!(custom.code, "ABC123");
        assert!(svc.create_code(Some("no spaces".into()), 15, 1).await.is_err());
    }

    #[tokio::test]
    async fn custom_code_length_counts_trimmed_text() {
        let (svc, _) = service(MockChatModel::new());
        let err = svc.create_code(Some("   ab   ".into()), 15, 1).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(svc.create_code(Some(" abcd ".into()), 15, 1).await.is_ok());
    }

    #[tokio::test]
    async fn lookup_ignores_case_of_issued_code() {
        let (svc, _) = service(MockChatModel::new());
        svc.create_code(Some("abc123".into()), 15, 24).await.unwrap();

        let found = svc.validate_code("abc123").await.unwrap();
        assert_eq!(found.code, "ABC123");
        assert!(svc.validate_code(" AbC123 ").await.is_ok());
        let (session, _) = svc.start_session("abc123", "Jane").await.unwrap();
        assert_eq!(session.candidate_name, "Jane");
    }

    #[tokio::test]
    async fn retry_after_failed_first_turn_still_asks_for_offer() {
        let mut seq = mockall::Sequence::new();
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(Error::Upstream("timeout".into())));
        model
            .expect_complete()
            .withf(|req| req.messages[0].content.contains("qué te quiere ofrecer"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("¿Qué me ofrece?".to_string()));
        let (svc, store) = service(model);
        seed_code(&store, "RETRY1", 24).await;
        let (session, _) = svc.start_session("RETRY1", "Jane").await.unwrap();

        assert!(svc.send_message(session.id, "Hola").await.is_err());
        let reply = svc.send_message(session.id, "Hola, ¿me escucha?").await.unwrap();
        assert_eq!(reply.message, "¿Qué me ofrece?");
    }

    #[tokio::test]
    async fn ended_session_still_answers_with_ended_state() {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .returning(|_| Ok("Ya colgué.".to_string()));
        let (svc, store) = service(model);
        seed_code(&store, "ENDED1", 24).await;
        let (session, _) = svc.start_session("ENDED1", "Jane").await.unwrap();
        svc.end_session(session.id).await.unwrap();

        let reply = svc.send_message(session.id, "¿Sigue ahí?").await.unwrap();
        assert_eq!(reply.state, SessionState::Ended);
        let t = store.transcript(session.id).await.unwrap();
        assert_eq!(t.len(), 2);
    }
}
