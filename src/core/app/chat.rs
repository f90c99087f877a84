use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{ApiError, ChatRequest, ChatResponse, NovaApi, Session};
use crate::core::app::preferences::{PreferencesPanel, PreferencesUpdate};
use crate::core::message::Message;
use crate::utils::input::sanitize_inline;

/// A send that has been started with [`ChatController::begin_send`] and not
/// yet finished.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    request: ChatRequest,
    epoch: u64,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was appended to the visible conversation.
    Replied,
    /// The user moved to another conversation while the reply was in flight.
    Discarded,
    /// The request failed; an error entry was appended to the transcript.
    Failed(String),
}

/// State behind the chat screen: the session sidebar, the open
/// conversation, and the preferences panel.
pub struct ChatController {
    api: Arc<dyn NovaApi>,
    sessions: Vec<Session>,
    current_session: Option<String>,
    messages: Vec<Message>,
    sending: bool,
    memory_enabled: bool,
    model: Option<String>,
    /// Bumped whenever the visible conversation changes.
    context_epoch: u64,
    preferences: PreferencesPanel,
}

impl ChatController {
    pub fn new(api: Arc<dyn NovaApi>) -> Self {
        Self {
            api,
            sessions: Vec::new(),
            current_session: None,
            messages: Vec::new(),
            sending: false,
            memory_enabled: true,
            model: None,
            context_epoch: 0,
            preferences: PreferencesPanel::new(),
        }
    }

    pub fn with_memory_enabled(mut self, enabled: bool) -> Self {
        self.memory_enabled = enabled;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn api(&self) -> Arc<dyn NovaApi> {
        Arc::clone(&self.api)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn current_session(&self) -> Option<&str> {
        self.current_session.as_deref()
    }

    pub fn current_title(&self) -> Option<&str> {
        let current = self.current_session.as_deref()?;
        self.sessions
            .iter()
            .find(|session| session.id == current)
            .map(|session| session.title.as_str())
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn memory_enabled(&self) -> bool {
        self.memory_enabled
    }

    pub fn set_memory_enabled(&mut self, enabled: bool) {
        self.memory_enabled = enabled;
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: Option<String>) {
        self.model = model.filter(|m| !m.trim().is_empty());
    }

    pub fn preferences(&self) -> &PreferencesPanel {
        &self.preferences
    }

    pub fn apply_preferences(&mut self, update: PreferencesUpdate) -> bool {
        self.preferences.apply(update)
    }

    pub async fn refresh_preferences(&mut self) -> Result<bool, ApiError> {
        self.preferences.refresh(self.api.as_ref()).await
    }

    /// Append a client-side notice to the visible conversation.
    pub fn push_notice(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Find a session by its 1-based position in the list or by id.
    pub fn find_session(&self, reference: &str) -> Option<&Session> {
        let reference = reference.trim();
        if let Ok(index) = reference.parse::<usize>() {
            if let Some(session) = index.checked_sub(1).and_then(|i| self.sessions.get(i)) {
                return Some(session);
            }
        }
        self.sessions.iter().find(|session| session.id == reference)
    }

    pub async fn load_sessions(&mut self) -> Result<(), ApiError> {
        self.sessions = self.api.list_sessions().await?;
        debug!(count = self.sessions.len(), "sessions loaded");
        Ok(())
    }

    /// Load the history of `session_id` and make it the visible conversation.
    /// On failure the current view is left untouched.
    pub async fn open_session(&mut self, session_id: &str) -> Result<(), ApiError> {
        let history = self.api.session_messages(session_id).await?;
        self.messages = history.into_iter().map(Message::from).collect();
        if self.current_session.as_deref() != Some(session_id) {
            self.current_session = Some(session_id.to_string());
            self.context_epoch += 1;
        }
        Ok(())
    }

    /// Start a blank conversation. The server creates the session on the
    /// first message sent from it.
    pub fn new_session(&mut self) {
        self.current_session = None;
        self.messages.clear();
        self.context_epoch += 1;
    }

    /// Delete `session_id` if `confirm` agrees. `confirm` receives the title
    /// already cleaned for the terminal. Returns whether anything was deleted.
    /// Deleting the open session also clears the visible conversation.
    pub async fn delete_session<F>(&mut self, session_id: &str, confirm: F) -> Result<bool, ApiError>
    where
        F: FnOnce(&str) -> bool,
    {
        let title = self
            .sessions
            .iter()
            .find(|session| session.id == session_id)
            .map(|session| sanitize_inline(&session.title))
            .unwrap_or_else(|| sanitize_inline(session_id));
        if !confirm(&title) {
            return Ok(false);
        }

        self.api.delete_session(session_id).await?;
        if self.current_session.as_deref() == Some(session_id) {
            self.new_session();
        }
        self.load_sessions().await?;
        Ok(true)
    }

    pub async fn rename_session(&mut self, session_id: &str, title: &str) -> Result<(), ApiError> {
        self.api.rename_session(session_id, title.trim()).await?;
        self.load_sessions().await
    }

    /// Start sending `input`. Returns `None` when the input is blank or when
    /// another send is still pending.
    pub fn begin_send(&mut self, input: &str) -> Option<PendingSend> {
        let text = input.trim();
        if text.is_empty() || self.sending {
            return None;
        }

        self.sending = true;
        self.messages.push(Message::user(text));
        let request = ChatRequest::new(text, self.current_session.clone())
            .with_memory(self.memory_enabled)
            .with_model(self.model.as_deref());
        Some(PendingSend {
            request,
            epoch: self.context_epoch,
        })
    }

    pub fn finish_send(
        &mut self,
        pending: PendingSend,
        result: Result<ChatResponse, ApiError>,
    ) -> SendOutcome {
        self.sending = false;
        let stale = pending.epoch != self.context_epoch;

        match result {
            Ok(_) if stale => {
                debug!("conversation changed while sending; reply not shown");
                SendOutcome::Discarded
            }
            Ok(response) => {
                if self.current_session.is_none() {
                    self.current_session = Some(response.session_id);
                }
                self.messages.push(Message::assistant(response.message));
                SendOutcome::Replied
            }
            Err(err) => {
                let text = err.to_string();
                if !stale {
                    self.messages.push(Message::app_error(text.clone()));
                }
                SendOutcome::Failed(text)
            }
        }
    }

    /// After a reply: reload the sidebar and the learned preferences. The
    /// reply is already visible, so failures here are only logged.
    pub async fn refresh_after_send(&mut self) {
        if let Err(err) = self.load_sessions().await {
            warn!(error = %err, "failed to refresh sessions after send");
        }
        if let Err(err) = self.refresh_preferences().await {
            warn!(error = %err, "failed to refresh preferences after send");
        }
    }

    /// Begin, perform and finish a send in one step.
    pub async fn send_message(&mut self, input: &str) -> Option<SendOutcome> {
        let pending = self.begin_send(input)?;
        let result = self.api.send_chat(pending.request()).await;
        let outcome = self.finish_send(pending, result);
        if !matches!(outcome, SendOutcome::Failed(_)) {
            self.refresh_after_send().await;
        }
        Some(outcome)
    }
}
