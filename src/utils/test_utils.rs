use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::api::{
    Acknowledgement, ApiError, ChatRequest, ChatResponse, HealthStatus, MemoryEntry,
    MemorySearchRequest, NovaApi, Preferences, RegisterRequest, Session, SessionMessage,
    StoreMemoryRequest, StoredMemory, TokenResponse, User, DEFAULT_SESSION_TITLE,
};

pub fn status_error(code: u16, message: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        message: message.to_string(),
    }
}

pub fn test_session(id: &str, title: &str) -> Session {
    serde_json::from_value(serde_json::json!({ "_id": id, "title": title }))
        .expect("valid session")
}

pub fn test_history(pairs: &[(&str, &str)]) -> Vec<SessionMessage> {
    pairs
        .iter()
        .map(|(role, content)| {
            serde_json::from_value(serde_json::json!({ "role": role, "content": content }))
                .expect("valid message")
        })
        .collect()
}

/// In-memory stand-in for the Nova backend.
///
/// Every call is recorded by name in `calls`. Failures are switched on by
/// filling the matching `*_error` field with the message to return.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<String>>,
    pub token: Mutex<Option<String>>,
    pub sessions: Mutex<Vec<Session>>,
    pub history: Mutex<HashMap<String, Vec<SessionMessage>>>,
    pub preferences: Mutex<Preferences>,
    pub chat_requests: Mutex<Vec<ChatRequest>>,
    pub login_error: Mutex<Option<String>>,
    pub register_error: Mutex<Option<String>>,
    pub chat_error: Mutex<Option<String>>,
    pub preferences_error: Mutex<Option<String>>,
    /// Answer session and chat calls with 401, as for an expired token.
    pub reject_token: Mutex<bool>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(self, sessions: Vec<Session>) -> Self {
        *self.sessions.lock().unwrap() = sessions;
        self
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == name)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn current_token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn check_token(&self) -> Result<(), ApiError> {
        if *self.reject_token.lock().unwrap() {
            return Err(status_error(401, "Could not validate credentials"));
        }
        Ok(())
    }

    fn failure(slot: &Mutex<Option<String>>, code: u16) -> Result<(), ApiError> {
        match slot.lock().unwrap().as_deref() {
            Some(message) => Err(status_error(code, message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NovaApi for FakeApi {
    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        self.record("register");
        Self::failure(&self.register_error, 400)?;
        Ok(serde_json::from_value(serde_json::json!({
            "_id": "user-1",
            "username": request.username,
            "email": request.email,
        }))
        .expect("valid user"))
    }

    async fn login(&self, username: &str, _password: &str) -> Result<TokenResponse, ApiError> {
        self.record("login");
        Self::failure(&self.login_error, 401)?;
        Ok(TokenResponse {
            access_token: format!("token-for-{username}"),
            token_type: Some("bearer".to_string()),
        })
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.record("send_chat");
        self.check_token()?;
        self.chat_requests.lock().unwrap().push(request.clone());
        Self::failure(&self.chat_error, 500)?;

        let session_id = match &request.session_id {
            Some(id) => id.clone(),
            None => {
                let mut sessions = self.sessions.lock().unwrap();
                let id = format!("session-{}", sessions.len() + 1);
                sessions.insert(0, test_session(&id, DEFAULT_SESSION_TITLE));
                id
            }
        };
        Ok(ChatResponse {
            message: format!("echo: {}", request.message),
            session_id,
            tokens_used: 7,
        })
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        self.record("list_sessions");
        self.check_token()?;
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn delete_session(&self, session_id: &str) -> Result<Acknowledgement, ApiError> {
        self.record("delete_session");
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|session| session.id != session_id);
        if sessions.len() == before {
            return Err(status_error(404, "Session not found"));
        }
        Ok(Acknowledgement {
            message: "Session deleted".to_string(),
        })
    }

    async fn session_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, ApiError> {
        self.record("session_messages");
        self.history
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| status_error(404, "Session not found"))
    }

    async fn rename_session(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<Acknowledgement, ApiError> {
        self.record("rename_session");
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|session| session.id == session_id)
            .ok_or_else(|| status_error(404, "Session not found"))?;
        session.title = title.to_string();
        Ok(Acknowledgement::default())
    }

    async fn preferences(&self) -> Result<Preferences, ApiError> {
        self.record("preferences");
        Self::failure(&self.preferences_error, 500)?;
        Ok(self.preferences.lock().unwrap().clone())
    }

    async fn recent_memories(
        &self,
        _limit: u32,
        _memory_type: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, ApiError> {
        self.record("recent_memories");
        Ok(Vec::new())
    }

    async fn store_memory(&self, _request: &StoreMemoryRequest) -> Result<StoredMemory, ApiError> {
        self.record("store_memory");
        Ok(StoredMemory {
            id: "memory-1".to_string(),
            message: None,
        })
    }

    async fn search_memories(
        &self,
        _request: &MemorySearchRequest,
    ) -> Result<Vec<MemoryEntry>, ApiError> {
        self.record("search_memories");
        Ok(Vec::new())
    }

    async fn delete_memory(&self, _memory_id: &str) -> Result<Acknowledgement, ApiError> {
        self.record("delete_memory");
        Ok(Acknowledgement::default())
    }

    async fn consolidate_memories(&self, _days: u32) -> Result<Acknowledgement, ApiError> {
        self.record("consolidate_memories");
        Ok(Acknowledgement::default())
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.record("health");
        Ok(HealthStatus {
            status: "healthy".to_string(),
        })
    }
}
