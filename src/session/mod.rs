//! Chat session coordination
//!
//! [`ChatStore`] is the single source of truth for chat sessions and the
//! active conversation: the view layer (REPL, scripts) only dispatches
//! intents and observes the resulting state. It owns the in-memory session
//! list and the message log of the currently selected session; logs of
//! non-selected sessions are re-fetched on selection.
//!
//! Send lifecycle: a question is appended optimistically, a cancellable
//! request is issued, and the store transitions back to idle on success,
//! cancellation, or failure. At most one send is in flight per store; a
//! send attempted while another is pending is a no-op (callers that want
//! to supersede it call [`ChatStore::stop_generation`] first).

pub mod title;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::api::types::{
    AskRequestBody, AskResponseBody, CitationRecord, ExchangeRecord, Feedback, FeedbackBody,
    RenameBody, SessionRecord,
};
use crate::api::ApiClient;
use crate::error::{AskdeskError, Result};
use crate::settings::SettingsStore;
use title::{derive_title, PLACEHOLDER_TITLE};

/// Error text recorded when the backend has nothing indexed yet (404 on ask).
pub const MSG_NO_INDEXED_DOCS: &str =
    "No documents have been indexed for your collections yet, so there is nothing to search.";

/// Error text recorded when the caller has no accessible collections (403 on ask).
pub const MSG_NO_COLLECTION_ACCESS: &str =
    "You do not have access to any document collections. Ask an administrator for access.";

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A question typed by the user
    User,
    /// An answer produced by the backend
    Assistant,
}

/// A citation attached to an assistant message. Immutable once attached.
#[derive(Debug, Clone)]
pub struct Citation {
    /// Opaque citation id
    pub id: String,
    /// Source document filename
    pub filename: String,
    /// Page within the source document
    pub page: i64,
    /// Short excerpt from the cited chunk
    pub excerpt: String,
    /// Collection the source belongs to
    pub collection_name: String,
    /// External link to the source, when available
    pub url: Option<String>,
}

impl From<CitationRecord> for Citation {
    fn from(record: CitationRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            page: record.page,
            excerpt: record.snippet,
            collection_name: record.collection_name,
            url: record.url,
        }
    }
}

/// One message in the active conversation log.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Server-assigned id when known, otherwise a locally generated one
    pub id: String,
    /// Who produced the message
    pub role: Role,
    /// Message body text
    pub text: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Citations backing an assistant message
    pub citations: Vec<Citation>,
    /// Suggested follow-up questions on an assistant message
    pub followups: Vec<String>,
    /// Feedback marker, if one has been recorded
    pub feedback: Option<Feedback>,
    /// Correlation id used to submit feedback for this answer
    pub query_id: Option<String>,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
            citations: Vec::new(),
            followups: Vec::new(),
            feedback: None,
            query_id: None,
        }
    }

    fn assistant(response: AskResponseBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: response.answer,
            created_at: Utc::now(),
            citations: response.citations.into_iter().map(Into::into).collect(),
            followups: response.followups,
            feedback: None,
            query_id: Some(response.query_id),
        }
    }
}

/// One session in the session list.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Opaque session id
    pub id: String,
    /// Display title; the placeholder until the first exchange
    pub title: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,
    /// Preview text of the most recent question
    pub last_message: Option<String>,
    /// Timestamp of the most recent exchange
    pub last_message_at: Option<DateTime<Utc>>,
}

impl SessionSummary {
    /// The single "most recent" timestamp used for ordering the list.
    pub fn recency(&self) -> DateTime<Utc> {
        self.last_message_at.unwrap_or(self.updated_at)
    }
}

impl From<SessionRecord> for SessionSummary {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            title: record
                .session_title
                .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_message: record.last_message,
            last_message_at: record.last_message_at,
        }
    }
}

/// Send-operation state: idle, or one in-flight request with its handle.
#[derive(Debug, Clone)]
enum SendState {
    Idle,
    Sending { cancel: CancellationToken },
}

/// Detached handle for cancelling the in-flight send.
///
/// The REPL grabs one of these before blocking on a send so that Ctrl+C
/// can stop generation while the store itself is mutably borrowed by the
/// pending operation.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<Mutex<SendState>>,
}

impl StopHandle {
    /// Cancel the in-flight send, if any, returning the store to idle.
    pub fn stop(&self) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let SendState::Sending { cancel } = &*guard {
            cancel.cancel();
        }
        *guard = SendState::Idle;
    }
}

/// Single source of truth for sessions and the active conversation.
pub struct ChatStore {
    api: Arc<ApiClient>,
    settings: SettingsStore,
    sessions: Vec<SessionSummary>,
    active: Option<String>,
    messages: Vec<ChatMessage>,
    send_state: Arc<Mutex<SendState>>,
    last_error: Option<String>,
}

impl ChatStore {
    /// Create a store over the given API client and settings store.
    pub fn new(api: Arc<ApiClient>, settings: SettingsStore) -> Self {
        Self {
            api,
            settings,
            sessions: Vec::new(),
            active: None,
            messages: Vec::new(),
            send_state: Arc::new(Mutex::new(SendState::Idle)),
            last_error: None,
        }
    }

    /// The session list, most recent first.
    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    /// Id of the active session, if any.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active session's summary, if any.
    pub fn active_session(&self) -> Option<&SessionSummary> {
        let id = self.active.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// The visible message log of the active session.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last recorded send failure, if not yet dismissed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Clear the recorded send failure (next-keystroke dismissal).
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Whether a send is currently in flight.
    pub fn is_sending(&self) -> bool {
        matches!(
            *self.send_state.lock().unwrap_or_else(|e| e.into_inner()),
            SendState::Sending { .. }
        )
    }

    /// Detached cancellation handle for the REPL's Ctrl+C path.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: Arc::clone(&self.send_state),
        }
    }

    fn begin_send(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        let mut guard = self.send_state.lock().unwrap_or_else(|e| e.into_inner());
        *guard = SendState::Sending {
            cancel: cancel.clone(),
        };
        cancel
    }

    fn finish_send(&self) {
        let mut guard = self.send_state.lock().unwrap_or_else(|e| e.into_inner());
        *guard = SendState::Idle;
    }

    /// Load the caller's sessions and activate the most relevant one.
    ///
    /// Listing failures never propagate: the store degrades to an empty
    /// list and logs a warning, so the surface stays usable. When the
    /// account has no sessions yet, one is created so there is always an
    /// active conversation.
    pub async fn load_sessions(&mut self) {
        match self.api.get::<Vec<SessionRecord>>("/api/chat/sessions").await {
            Ok(records) => {
                self.sessions = records.into_iter().map(Into::into).collect();
                self.sessions.sort_by(|a, b| b.recency().cmp(&a.recency()));
                if self.sessions.is_empty() {
                    if let Err(e) = self.create_session().await {
                        tracing::warn!("Failed to create an initial session: {:#}", e);
                    }
                } else {
                    let id = self.sessions[0].id.clone();
                    self.active = Some(id.clone());
                    self.load_messages(&id).await;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to load sessions: {:#}", e);
                self.sessions.clear();
                self.active = None;
                self.messages.clear();
            }
        }
    }

    /// Create a new session, insert it at the head of the list, and make
    /// it active with an empty message log.
    pub async fn create_session(&mut self) -> Result<()> {
        let record: SessionRecord = self
            .api
            .post("/api/chat/sessions", &serde_json::json!({}))
            .await?;
        let summary: SessionSummary = record.into();
        self.active = Some(summary.id.clone());
        self.sessions.insert(0, summary);
        self.messages.clear();
        self.last_error = None;
        Ok(())
    }

    /// Make `id` the active session and (re)load its history, replacing
    /// whatever was previously displayed.
    ///
    /// # Errors
    ///
    /// Returns an error when `id` does not match a known session; the
    /// active session is left unchanged in that case.
    pub async fn select_session(&mut self, id: &str) -> Result<()> {
        if !self.sessions.iter().any(|s| s.id == id) {
            return Err(AskdeskError::Session(format!("unknown session id: {}", id)).into());
        }
        self.active = Some(id.to_string());
        self.load_messages(id).await;
        Ok(())
    }

    /// Rename a session. The remote call happens first; local state is
    /// only touched on success, so there is nothing to roll back when the
    /// backend rejects the rename.
    ///
    /// # Errors
    ///
    /// Returns an error for blank titles and propagates backend failures.
    pub async fn rename_session(&mut self, id: &str, new_title: &str) -> Result<()> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(AskdeskError::Session("title must not be empty".to_string()).into());
        }
        let body = RenameBody {
            session_title: new_title.to_string(),
        };
        let record: SessionRecord = self
            .api
            .patch(&format!("/api/chat/sessions/{}", id), &body)
            .await?;
        if let Some(entry) = self.sessions.iter_mut().find(|s| s.id == id) {
            entry.title = record
                .session_title
                .unwrap_or_else(|| new_title.to_string());
            entry.updated_at = record.updated_at;
        }
        Ok(())
    }

    /// Delete a session. The remote call happens first; on success the
    /// entry is removed, and if it was the active session, the active
    /// pointer and the visible message log are cleared too.
    pub async fn delete_session(&mut self, id: &str) -> Result<()> {
        self.api
            .delete(&format!("/api/chat/sessions/{}", id))
            .await?;
        self.sessions.retain(|s| s.id != id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
            self.messages.clear();
        }
        Ok(())
    }

    /// Load the full exchange history for `session_id` into the visible
    /// log, expanding each stored question/answer pair into two ordered
    /// messages (user then assistant).
    ///
    /// History failures never propagate: the log degrades to empty and a
    /// warning is logged.
    pub async fn load_messages(&mut self, session_id: &str) {
        let path = format!("/api/chat/sessions/{}/history", session_id);
        match self.api.get::<Vec<ExchangeRecord>>(&path).await {
            Ok(exchanges) => {
                self.messages = exchanges.into_iter().flat_map(expand_exchange).collect();
            }
            Err(e) => {
                tracing::warn!("Failed to load history for session {}: {:#}", session_id, e);
                self.messages.clear();
            }
        }
    }

    /// Send a question in the active session.
    ///
    /// The user message is appended optimistically before the request is
    /// issued. On success the assistant answer is appended, the session's
    /// preview and timestamps are refreshed, and -- if this was the
    /// session's first exchange -- a title is derived from the question.
    /// On cancellation nothing further happens. On failure the user
    /// message stays in the log and a human-readable error is recorded in
    /// [`ChatStore::last_error`].
    ///
    /// A send while another is pending is a no-op; blank text is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when no session is active.
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        let question = text.trim().to_string();
        if question.is_empty() {
            return Ok(());
        }
        if self.is_sending() {
            tracing::warn!("A send is already in flight; ignoring new send");
            return Ok(());
        }
        if self.active.is_none() {
            return Err(AskdeskError::Session("no active session".to_string()).into());
        }
        self.messages.push(ChatMessage::user(question.clone()));
        self.dispatch_send(question).await
    }

    /// Re-issue the most recent user question without duplicating it in
    /// the log.
    ///
    /// # Errors
    ///
    /// Returns an error when the log has no user message or no session is
    /// active.
    pub async fn regenerate(&mut self) -> Result<()> {
        if self.is_sending() {
            tracing::warn!("A send is already in flight; ignoring regenerate");
            return Ok(());
        }
        let question = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text.clone())
            .ok_or_else(|| AskdeskError::Session("no user message to regenerate".to_string()))?;
        self.dispatch_send(question).await
    }

    /// Cancel the in-flight send, if any, and return to idle.
    ///
    /// No partial result is appended and no error is recorded; stopping
    /// generation is a deliberate action, not a failure.
    pub fn stop_generation(&mut self) {
        self.stop_handle().stop();
    }

    /// Flip the feedback marker on a message and submit it.
    ///
    /// The local marker is updated first so the surface reflects the
    /// user's action immediately; a remote failure is recorded in
    /// [`ChatStore::last_error`] without reverting the marker
    /// (last-write-wins, no rollback).
    ///
    /// # Errors
    ///
    /// Returns an error when the message is unknown or carries no
    /// correlation id.
    pub async fn submit_feedback(&mut self, message_id: &str, feedback: Feedback) -> Result<()> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| AskdeskError::Session(format!("unknown message id: {}", message_id)))?;
        let query_id = message.query_id.clone().ok_or_else(|| {
            AskdeskError::Session("message has no feedback correlation id".to_string())
        })?;
        message.feedback = Some(feedback);

        let path = format!("/api/queries/{}/feedback", query_id);
        if let Err(e) = self
            .api
            .post_no_content(&path, &FeedbackBody { feedback })
            .await
        {
            tracing::warn!("Failed to submit feedback: {:#}", e);
            self.last_error = Some(format!("Failed to submit feedback: {}", e));
        }
        Ok(())
    }

    /// The shared tail of `send_message` and `regenerate`: issue the ask
    /// request with a fresh cancellation handle and apply the outcome.
    async fn dispatch_send(&mut self, question: String) -> Result<()> {
        let session_id = self
            .active
            .clone()
            .ok_or_else(|| AskdeskError::Session("no active session".to_string()))?;

        self.last_error = None;
        let snapshot = self.settings.get();
        let body = AskRequestBody {
            question: question.clone(),
            session_id: session_id.clone(),
            top_k: Some(snapshot.top_k),
            temperature: Some(snapshot.temperature),
            mmr_lambda: Some(snapshot.mmr_lambda),
        };

        let cancel = self.begin_send();
        let result = self
            .api
            .post_cancellable::<_, AskResponseBody>("/api/ask", &body, &cancel)
            .await;
        self.finish_send();

        match result {
            Ok(response) => {
                self.messages.push(ChatMessage::assistant(response));
                self.apply_exchange_success(&session_id, &question);
                Ok(())
            }
            Err(e) => {
                self.record_send_failure(e);
                Ok(())
            }
        }
    }

    /// Refresh the session's preview fields and derive a title from the
    /// question when this was the first exchange. Derivation runs at most
    /// once per session: only while the title still equals the
    /// placeholder.
    fn apply_exchange_success(&mut self, session_id: &str, question: &str) {
        if let Some(entry) = self.sessions.iter_mut().find(|s| s.id == session_id) {
            if entry.title == PLACEHOLDER_TITLE {
                if let Some(derived) = derive_title(question) {
                    entry.title = derived;
                }
            }
            let now = Utc::now();
            entry.last_message = Some(question.to_string());
            entry.last_message_at = Some(now);
            entry.updated_at = now;
        }
    }

    /// Map a send failure to the recorded, user-visible error string.
    /// Cancellation is deliberately not an error and records nothing.
    fn record_send_failure(&mut self, error: anyhow::Error) {
        match error.downcast_ref::<AskdeskError>() {
            Some(AskdeskError::Cancelled) => {
                tracing::debug!("Send cancelled by user");
            }
            Some(AskdeskError::Api { status: 404, .. }) => {
                self.last_error = Some(MSG_NO_INDEXED_DOCS.to_string());
            }
            Some(AskdeskError::Api { status: 403, .. }) => {
                self.last_error = Some(MSG_NO_COLLECTION_ACCESS.to_string());
            }
            _ => {
                tracing::warn!("Send failed: {:#}", error);
                self.last_error = Some(format!("{:#}", error));
            }
        }
    }
}

/// Expand one stored exchange into its user and assistant messages,
/// preserving the server-assigned identifier and any recorded feedback.
fn expand_exchange(exchange: ExchangeRecord) -> [ChatMessage; 2] {
    let user = ChatMessage {
        id: format!("{}-q", exchange.id),
        role: Role::User,
        text: exchange.query,
        created_at: exchange.created_at,
        citations: Vec::new(),
        followups: Vec::new(),
        feedback: None,
        query_id: None,
    };
    let assistant = ChatMessage {
        id: format!("{}-a", exchange.id),
        role: Role::Assistant,
        text: exchange.response,
        created_at: exchange.created_at,
        citations: Vec::new(),
        followups: Vec::new(),
        feedback: exchange.feedback,
        query_id: exchange.query_id,
    };
    [user, assistant]
}
