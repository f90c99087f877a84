use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::{
    Acknowledgement, ApiError, ChatRequest, ChatResponse, ConsolidateRequest, HealthStatus,
    LoginForm, MemoryEntry, MemorySearchRequest, Preferences, PreferencesEnvelope, RecentMemories,
    RegisterRequest, RenameRequest, SearchResults, Session, SessionMessage, StoreMemoryRequest,
    StoredMemory, TokenResponse, User,
};
use crate::utils::url::{normalize_base_url, server_root};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Every backend operation the client front end uses.
///
/// Each call is a single attempt: no retry, no timeout, no backoff.
#[async_trait]
pub trait NovaApi: Send + Sync {
    /// Replace the bearer token attached to subsequent requests.
    fn set_token(&self, token: Option<String>);

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError>;
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError>;
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError>;
    async fn delete_session(&self, session_id: &str) -> Result<Acknowledgement, ApiError>;
    async fn session_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, ApiError>;
    async fn rename_session(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<Acknowledgement, ApiError>;
    async fn preferences(&self) -> Result<Preferences, ApiError>;
    async fn recent_memories(
        &self,
        limit: u32,
        memory_type: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, ApiError>;
    async fn store_memory(&self, request: &StoreMemoryRequest) -> Result<StoredMemory, ApiError>;
    async fn search_memories(
        &self,
        request: &MemorySearchRequest,
    ) -> Result<Vec<MemoryEntry>, ApiError>;
    async fn delete_memory(&self, memory_id: &str) -> Result<Acknowledgement, ApiError>;
    async fn consolidate_memories(&self, days: u32) -> Result<Acknowledgement, ApiError>;
    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

pub struct ApiClient {
    http: Client,
    base: Url,
    root: Url,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let normalized = normalize_base_url(base_url);
        let base = parse_url(&normalized)?;
        let root = parse_url(&server_root(&normalized))?;
        let http = Client::builder()
            .user_agent(concat!("nova/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            base,
            root,
            token: RwLock::new(None),
        })
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        join_segments(&self.base, segments)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .token
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        debug!(url = %response.url(), %status, "nova api response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response_body(status, &body, fallback));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl NovaApi for ApiClient {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let url = self.endpoint(&["register"])?;
        self.execute(self.http.post(url).json(request), "Registration failed")
            .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let url = self.endpoint(&["login"])?;
        let form = LoginForm { username, password };
        self.execute(self.http.post(url).form(&form), "Login failed")
            .await
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = self.endpoint(&["chat"])?;
        self.execute(self.http.post(url).json(request), "Failed to send message")
            .await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let url = self.endpoint(&["sessions"])?;
        self.execute(self.http.get(url), "Failed to load sessions")
            .await
    }

    async fn delete_session(&self, session_id: &str) -> Result<Acknowledgement, ApiError> {
        let url = self.endpoint(&["session", session_id])?;
        self.execute(self.http.delete(url), "Failed to delete session")
            .await
    }

    async fn session_messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, ApiError> {
        let url = self.endpoint(&["session", session_id, "messages"])?;
        self.execute(self.http.get(url), "Failed to load messages")
            .await
    }

    async fn rename_session(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<Acknowledgement, ApiError> {
        let url = self.endpoint(&["session", session_id, "title"])?;
        self.execute(
            self.http.put(url).json(&RenameRequest { title }),
            "Failed to update session title",
        )
        .await
    }

    async fn preferences(&self) -> Result<Preferences, ApiError> {
        let url = self.endpoint(&["memory", "preferences"])?;
        let envelope: PreferencesEnvelope = self
            .execute(self.http.get(url), "Failed to load preferences")
            .await?;
        Ok(envelope.into_preferences())
    }

    async fn recent_memories(
        &self,
        limit: u32,
        memory_type: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, ApiError> {
        let url = self.endpoint(&["memory", "recent"])?;
        let mut query = vec![("limit", limit.to_string())];
        if let Some(kind) = memory_type {
            query.push(("memory_type", kind.to_string()));
        }
        let recent: RecentMemories = self
            .execute(
                self.http.get(url).query(&query),
                "Failed to load recent memories",
            )
            .await?;
        Ok(recent.memories)
    }

    async fn store_memory(&self, request: &StoreMemoryRequest) -> Result<StoredMemory, ApiError> {
        let url = self.endpoint(&["memory", "store"])?;
        self.execute(self.http.post(url).json(request), "Failed to store memory")
            .await
    }

    async fn search_memories(
        &self,
        request: &MemorySearchRequest,
    ) -> Result<Vec<MemoryEntry>, ApiError> {
        let url = self.endpoint(&["memory", "search"])?;
        let results: SearchResults = self
            .execute(self.http.post(url).json(request), "Failed to search memories")
            .await?;
        Ok(results.results)
    }

    async fn delete_memory(&self, memory_id: &str) -> Result<Acknowledgement, ApiError> {
        let url = self.endpoint(&["memory", memory_id])?;
        self.execute(self.http.delete(url), "Failed to delete memory")
            .await
    }

    async fn consolidate_memories(&self, days: u32) -> Result<Acknowledgement, ApiError> {
        let url = self.endpoint(&["memory", "consolidate"])?;
        self.execute(
            self.http.post(url).json(&ConsolidateRequest { days }),
            "Failed to consolidate memories",
        )
        .await
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = join_segments(&self.root, &["health"])?;
        self.execute(self.http.get(url), "Health check failed")
            .await
    }
}

fn parse_url(raw: &str) -> Result<Url, ApiError> {
    Url::parse(raw).map_err(|err| ApiError::InvalidUrl(format!("'{raw}': {err}")))
}

/// Append path segments, percent-encoding each one so ids cannot escape the route.
fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl(format!("'{base}' cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
