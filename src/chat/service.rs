//! The chat service.
//!
//! Owns the conversation history, the settings, the single streaming
//! session, and the store connection. Every streaming action follows the
//! same shape as the original client: abort whatever is in flight, run one
//! turn through the streaming renderer, then settle history and storage
//! according to how the turn ended (completed, aborted, or failed).

use rusqlite::Connection;

use crate::db::repository;
use crate::models::{
    next_conversation_id, AssistantContent, Conversation, Message, MessageContent, Role,
};
use crate::render::RenderSink;
use crate::settings::Settings;
use crate::stream::{
    CancelHandle, SessionSlot, StreamContext, StreamingRenderer, TurnEnd, TurnOptions,
};
use crate::transport::{ChatRequest, ChatTransport, ContinueRequest, TitleRequest};

use super::ChatError;

/// How much of the assistant response the title generator sees.
const TITLE_CONTEXT_CHARS: usize = 500;

pub struct ChatService<T: ChatTransport> {
    conn: Connection,
    transport: T,
    settings: Settings,
    deep_query_mode: bool,
    private_chat: bool,
    history: Vec<Message>,
    current_conversation_id: Option<String>,
    current_title: String,
    sessions: SessionSlot,
    renderer: StreamingRenderer,
}

impl<T: ChatTransport> ChatService<T> {
    /// Create a service over an open store, restoring settings and the
    /// last viewed conversation.
    pub fn new(conn: Connection, transport: T) -> Result<Self, ChatError> {
        let settings = repository::load_settings(&conn)?;
        let mut service = Self {
            conn,
            transport,
            settings,
            deep_query_mode: false,
            private_chat: false,
            history: Vec::new(),
            current_conversation_id: None,
            current_title: "New Chat".to_string(),
            sessions: SessionSlot::new(),
            renderer: StreamingRenderer::new(),
        };

        if let Some(id) = repository::get_current_conversation_id(&service.conn)? {
            match repository::get_conversation(&service.conn, &id)? {
                Some(conv) => {
                    tracing::debug!(conversation = %conv.id, messages = conv.messages.len(), "restored conversation");
                    service.history = conv.messages;
                    service.current_title = conv.title;
                    service.current_conversation_id = Some(id);
                }
                None => repository::set_current_conversation_id(&service.conn, None)?,
            }
        }
        Ok(service)
    }

    // ── Accessors ──

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn current_conversation_id(&self) -> Option<&str> {
        self.current_conversation_id.as_deref()
    }

    pub fn current_title(&self) -> &str {
        &self.current_title
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace and persist the settings.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ChatError> {
        repository::save_settings(&self.conn, &settings)?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_deep_query_mode(&mut self, enabled: bool) {
        self.deep_query_mode = enabled;
    }

    pub fn deep_query_mode(&self) -> bool {
        self.deep_query_mode
    }

    /// While enabled, nothing is written to the store.
    pub fn set_private_chat(&mut self, enabled: bool) {
        self.private_chat = enabled;
    }

    pub fn private_chat(&self) -> bool {
        self.private_chat
    }

    /// Models the backend offers.
    pub async fn models(&self) -> Result<Vec<String>, ChatError> {
        Ok(self.transport.list_models().await?)
    }

    /// Cancel the in-flight stream, if any. Idempotent.
    pub fn stop_generation(&self) {
        self.sessions.abort_active();
    }

    /// A handle a stop control can hold while a turn runs.
    pub fn stop_handle(&self) -> Option<CancelHandle> {
        self.sessions.handle()
    }

    // ── Streaming actions ──

    /// Send a user message and stream the assistant response into `sink`.
    ///
    /// Lazily creates a conversation on the first non-private send. On
    /// completion the finalized message pair is appended and persisted and
    /// a title is requested for young conversations; on abort the partial
    /// response is persisted as-is; on failure nothing is appended.
    pub async fn send_message(
        &mut self,
        text: &str,
        sink: &mut impl RenderSink,
    ) -> Result<TurnEnd, ChatError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.settings.selected_model.is_empty() {
            return Err(ChatError::NoModelSelected);
        }

        let is_new_chat = self.current_conversation_id.is_none();
        if !self.private_chat && is_new_chat {
            self.create_conversation();
        }

        let request = ChatRequest {
            message: text.clone(),
            model: self.settings.selected_model.clone(),
            system_content: self.settings.system_content.clone(),
            parameters: self.settings.effective_parameters(),
            conversation: self.history.iter().map(Message::clean_for_api).collect(),
            start_tag: self.settings.start_tag.clone(),
            is_deep_query_mode: self.deep_query_mode,
        };

        let token = self.sessions.begin();
        let stream = match self.transport.chat(request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.sessions.clear();
                return Err(e.into());
            }
        };

        let context = self.stream_context();
        let options = TurnOptions {
            seed: String::new(),
            resume_from_ms: None,
            stored_end_tag: None,
            expanded_hint: Some(false),
            history: &self.history,
        };
        let result = self
            .renderer
            .run_turn(stream, token, &context, options, sink)
            .await;
        self.sessions.clear();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                // Genuine failure: do not let a broken stream masquerade
                // as a saved partial answer.
                tracing::warn!(error = %e, "send failed, nothing persisted");
                return Err(e.into());
            }
        };

        self.history.push(Message::user(text.clone()));
        self.history.push(Message::assistant(
            output.text.clone(),
            self.settings.end_tag.clone(),
            output.thinking_time,
        ));
        self.persist_current();

        if output.end == TurnEnd::Completed
            && !self.private_chat
            && self.current_conversation_id.is_some()
            && (is_new_chat || self.history.len() <= 2)
        {
            self.refresh_title(&text, &output.text).await;
            self.persist_current();
        }

        Ok(output.end)
    }

    /// Continue generating the assistant message at `index`, resuming its
    /// thinking timer from the persisted duration.
    pub async fn continue_generation(
        &mut self,
        index: usize,
        sink: &mut impl RenderSink,
    ) -> Result<TurnEnd, ChatError> {
        let message = self
            .history
            .get(index)
            .filter(|m| m.role == Role::Assistant)
            .ok_or(ChatError::MessageNotFound(index))?;

        let seed = message.content.raw().to_string();
        let expanded = message.content.reasoning_expanded().unwrap_or(false);
        let resume_from_ms = message.thinking_time.unwrap_or(0);
        let stored_end_tag = message.end_tag.clone();

        let request = ContinueRequest {
            conversation: self.history.iter().map(Message::clean_for_api).collect(),
            model: self.settings.selected_model.clone(),
            system_content: self.settings.system_content.clone(),
            parameters: self.settings.effective_parameters(),
        };

        let token = self.sessions.begin();
        let stream = match self.transport.continue_generation(request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.sessions.clear();
                return Err(e.into());
            }
        };

        let context = self.stream_context();
        let options = TurnOptions {
            seed,
            resume_from_ms: Some(resume_from_ms),
            stored_end_tag: stored_end_tag.as_deref(),
            expanded_hint: Some(expanded),
            history: &self.history,
        };
        let result = self
            .renderer
            .run_turn(stream, token, &context, options, sink)
            .await;
        self.sessions.clear();

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "continuation failed, message left unchanged");
                return Err(e.into());
            }
        };

        let message = &mut self.history[index];
        message.content = MessageContent::Structured(AssistantContent {
            raw: output.text,
            reasoning_expanded: expanded,
        });
        message.thinking_time = output.thinking_time;
        self.persist_current();

        if output.end == TurnEnd::Completed
            && !self.private_chat
            && self.current_conversation_id.is_some()
            && self.history.len() <= 2
        {
            let first_message = self
                .history
                .first()
                .map(|m| m.content.raw().to_string())
                .unwrap_or_default();
            let assistant_text = self.history[index].content.raw().to_string();
            self.refresh_title(&first_message, &assistant_text).await;
            self.persist_current();
        }

        Ok(output.end)
    }

    /// Replace the user message at `index` with `new_text`, drop it and
    /// everything after it, and resend.
    pub async fn resend_edited(
        &mut self,
        index: usize,
        new_text: &str,
        sink: &mut impl RenderSink,
    ) -> Result<TurnEnd, ChatError> {
        let is_user = self
            .history
            .get(index)
            .map(|m| m.role == Role::User)
            .unwrap_or(false);
        if !is_user {
            return Err(ChatError::MessageNotFound(index));
        }

        self.history.truncate(index);
        self.persist_current();
        self.send_message(new_text, sink).await
    }

    // ── History edits ──

    /// Save an edit in place without resending.
    pub fn save_edited(&mut self, index: usize, new_text: &str) -> Result<(), ChatError> {
        let message = self
            .history
            .get_mut(index)
            .ok_or(ChatError::MessageNotFound(index))?;
        message.content = match message.role {
            Role::Assistant => MessageContent::Structured(AssistantContent {
                raw: new_text.to_string(),
                reasoning_expanded: false,
            }),
            Role::User => MessageContent::Text(new_text.to_string()),
        };
        self.persist_current();
        Ok(())
    }

    /// Delete the message at `index` along with everything after it.
    pub fn delete_message(&mut self, index: usize) -> Result<(), ChatError> {
        if index >= self.history.len() {
            return Err(ChatError::MessageNotFound(index));
        }
        self.history.truncate(index);
        self.persist_current();
        Ok(())
    }

    /// Persist the expansion state of the assistant message carrying
    /// `message_id`. Returns whether the message was found.
    pub fn set_reasoning_expanded(
        &mut self,
        message_id: &str,
        expanded: bool,
    ) -> Result<bool, ChatError> {
        let Some(message) = self
            .history
            .iter_mut()
            .find(|m| m.message_id.as_deref() == Some(message_id))
        else {
            return Ok(false);
        };
        message.content = MessageContent::Structured(AssistantContent {
            raw: message.content.raw().to_string(),
            reasoning_expanded: expanded,
        });
        self.persist_current();
        Ok(true)
    }

    // ── Conversation management ──

    /// All stored conversations, newest first.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>, ChatError> {
        Ok(repository::list_conversations(&self.conn)?)
    }

    /// Switch to a stored conversation, aborting any in-flight stream and
    /// persisting the one being left.
    pub fn switch_conversation(&mut self, id: &str) -> Result<(), ChatError> {
        if self.current_conversation_id.as_deref() == Some(id) {
            return Ok(());
        }
        self.sessions.abort_active();
        self.persist_current();

        let conv = repository::get_conversation(&self.conn, id)?
            .ok_or_else(|| ChatError::ConversationNotFound(id.to_string()))?;
        self.persist_pointer(Some(id));

        tracing::debug!(conversation = %id, messages = conv.messages.len(), "switched conversation");
        self.history = conv.messages;
        self.current_title = conv.title;
        self.current_conversation_id = Some(conv.id);
        Ok(())
    }

    /// Start over with an empty history. Aborts any in-flight stream.
    pub fn new_chat(&mut self) -> Result<(), ChatError> {
        self.sessions.abort_active();
        self.history.clear();
        self.current_title = "New Chat".to_string();
        if !self.private_chat {
            self.current_conversation_id = None;
            self.persist_pointer(None);
        }
        Ok(())
    }

    /// Delete a conversation and its messages. Returns whether a record
    /// was removed.
    pub fn delete_conversation(&mut self, id: &str) -> Result<bool, ChatError> {
        let deleted = repository::delete_conversation(&self.conn, id)?;
        if self.current_conversation_id.as_deref() == Some(id) {
            self.sessions.abort_active();
            self.history.clear();
            self.current_title = "New Chat".to_string();
            self.current_conversation_id = None;
            self.persist_pointer(None);
        }
        Ok(deleted)
    }

    // ── Internals ──

    fn stream_context(&self) -> StreamContext {
        StreamContext {
            start_tag: self.settings.start_tag.clone(),
            end_tag: self.settings.end_tag.clone(),
            deep_query_mode: self.deep_query_mode,
        }
    }

    fn create_conversation(&mut self) {
        let existing = repository::list_conversations(&self.conn).unwrap_or_default();
        let id = next_conversation_id(existing.iter().map(|c| c.id.as_str()));
        let conv = Conversation::new(id.clone());
        tracing::info!(conversation = %id, "created conversation");
        self.current_title = conv.title.clone();
        self.current_conversation_id = Some(id.clone());
        if let Err(e) = repository::put_conversation(&self.conn, &conv) {
            tracing::error!(error = %e, "failed to store new conversation");
        }
        self.persist_pointer(Some(&id));
    }

    /// Persistence is best-effort: a failing store is logged and the
    /// in-memory conversation keeps working.
    fn persist_current(&self) {
        if self.private_chat {
            return;
        }
        let Some(id) = &self.current_conversation_id else {
            return;
        };
        let record = Conversation {
            id: id.clone(),
            title: self.current_title.clone(),
            messages: self.history.clone(),
        };
        if let Err(e) = repository::put_conversation(&self.conn, &record) {
            tracing::error!(error = %e, conversation = %id, "failed to persist conversation");
        }
    }

    fn persist_pointer(&self, id: Option<&str>) {
        if let Err(e) = repository::set_current_conversation_id(&self.conn, id) {
            tracing::error!(error = %e, "failed to persist current-conversation pointer");
        }
    }

    /// Ask the backend for a title. Best-effort: failures are logged and
    /// the conversation keeps its current title.
    async fn refresh_title(&mut self, user_message: &str, assistant_response: &str) {
        let request = TitleRequest {
            message: user_message.to_string(),
            model: self.settings.selected_model.clone(),
            assistant_response: truncate_chars(assistant_response, TITLE_CONTEXT_CHARS).to_string(),
        };
        match self.transport.generate_title(request).await {
            Ok(response) => {
                if let Some(title) = response.title {
                    tracing::debug!(title = %title, "conversation titled");
                    self.current_title = title;
                }
            }
            Err(e) => tracing::warn!(error = %e, "title generation failed"),
        }
    }
}

/// Truncate to a maximum number of chars without splitting a codepoint.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::render::CollectingSink;
    use crate::transport::{ScriptStep, ScriptedTransport};

    fn service_with(transport: ScriptedTransport) -> ChatService<ScriptedTransport> {
        let conn = open_memory_database().unwrap();
        let mut service = ChatService::new(conn, transport).unwrap();
        let mut settings = Settings::default();
        settings.selected_model = "test-model".to_string();
        service.update_settings(settings).unwrap();
        service
    }

    fn think_script() -> Vec<ScriptStep> {
        vec![
            ScriptStep::Chunk("<think>let me think"),
            ScriptStep::Chunk("</think>"),
            ScriptStep::Chunk("The answer is 4."),
        ]
    }

    // ── Sending ──

    #[tokio::test]
    async fn send_appends_user_and_assistant_messages() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_title("Math Question");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        let end = service.send_message("what is 2+2?", &mut sink).await.unwrap();

        assert_eq!(end, TurnEnd::Completed);
        assert_eq!(service.history().len(), 2);
        assert_eq!(service.history()[0].role, Role::User);
        assert_eq!(service.history()[0].content.raw(), "what is 2+2?");

        let assistant = &service.history()[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(
            assistant.content.raw(),
            "<think>let me think</think>The answer is 4."
        );
        assert_eq!(assistant.content.reasoning_expanded(), Some(false));
        assert_eq!(assistant.end_tag.as_deref(), Some("</think>"));
        assert!(assistant.thinking_time.is_some());
        assert!(assistant.message_id.is_some());
    }

    #[tokio::test]
    async fn send_persists_conversation_with_generated_title() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_title("Math Question");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("what is 2+2?", &mut sink).await.unwrap();

        let stored = service.list_conversations().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Math Question");
        assert_eq!(stored[0].messages.len(), 2);
        assert_eq!(
            service.current_conversation_id(),
            Some(stored[0].id.as_str())
        );
    }

    #[tokio::test]
    async fn failed_title_generation_keeps_default_title() {
        // No title configured → the mock returns a 500.
        let transport = ScriptedTransport::new().with_script(think_script());
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("hello", &mut sink).await.unwrap();

        let stored = service.list_conversations().unwrap();
        assert_eq!(stored[0].title, "New Chat");
        assert_eq!(stored[0].messages.len(), 2);
    }

    #[tokio::test]
    async fn request_carries_settings_and_cleaned_history() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_script(vec![ScriptStep::Chunk("second answer")])
            .with_title("T");
        let mut service = service_with(transport);
        service.set_deep_query_mode(true);
        let mut sink = CollectingSink::new();

        service.send_message("first", &mut sink).await.unwrap();
        service.send_message("second", &mut sink).await.unwrap();

        let requests = service.transport.chat_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].start_tag, "<think>");
        assert!(requests[0].is_deep_query_mode);
        assert!(requests[0].conversation.is_empty());

        // The second request carries the first exchange, flattened.
        assert_eq!(requests[1].conversation.len(), 2);
        assert_eq!(requests[1].conversation[0].content, "first");
        assert_eq!(
            requests[1].conversation[1].content,
            "<think>let me think</think>The answer is 4."
        );
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let mut service = service_with(ScriptedTransport::new());
        let mut sink = CollectingSink::new();
        let result = service.send_message("   ", &mut sink).await;
        assert!(matches!(result, Err(ChatError::EmptyMessage)));
    }

    #[tokio::test]
    async fn missing_model_is_rejected() {
        let conn = open_memory_database().unwrap();
        let mut service = ChatService::new(conn, ScriptedTransport::new()).unwrap();
        let mut sink = CollectingSink::new();
        let result = service.send_message("hi", &mut sink).await;
        assert!(matches!(result, Err(ChatError::NoModelSelected)));
    }

    // ── Private mode ──

    #[tokio::test]
    async fn private_chat_persists_nothing() {
        let transport = ScriptedTransport::new().with_script(think_script());
        let mut service = service_with(transport);
        service.set_private_chat(true);
        let mut sink = CollectingSink::new();

        service.send_message("secret", &mut sink).await.unwrap();

        assert_eq!(service.history().len(), 2);
        assert!(service.list_conversations().unwrap().is_empty());
        assert!(service.current_conversation_id().is_none());
    }

    // ── Abort ──

    #[tokio::test]
    async fn abort_persists_partial_response() {
        let transport = ScriptedTransport::new().with_script(vec![
            ScriptStep::Chunk("chunk one, "),
            ScriptStep::Chunk("chunk two"),
            ScriptStep::Abort,
        ]);
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        let end = service.send_message("question", &mut sink).await.unwrap();

        assert_eq!(end, TurnEnd::Aborted);
        let stored = service.list_conversations().unwrap();
        assert_eq!(stored[0].messages.len(), 2);
        assert_eq!(stored[0].messages[1].content.raw(), "chunk one, chunk two");
        assert!(stored[0].messages[1].thinking_time.is_some());
        // Aborted turns never request a title.
        assert!(service.transport.title_requests().is_empty());
    }

    // ── Failure ──

    #[tokio::test]
    async fn failure_surfaces_error_and_persists_no_message() {
        let transport = ScriptedTransport::new()
            .with_script(vec![ScriptStep::Chunk("partial"), ScriptStep::Fail("reset")]);
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        let result = service.send_message("question", &mut sink).await;

        assert!(matches!(result, Err(ChatError::Stream(_))));
        assert!(service.history().is_empty());
        // The lazily created conversation exists but holds no messages.
        let stored = service.list_conversations().unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].messages.is_empty());
        // The service is reusable after a failure.
        assert!(service.stop_handle().is_none());
    }

    // ── Continue generation ──

    #[tokio::test]
    async fn continue_accumulates_thinking_time() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_script(vec![
                ScriptStep::Delay(30),
                ScriptStep::Chunk(" And a bit more."),
            ])
            .with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("question", &mut sink).await.unwrap();
        let before = service.history()[1].thinking_time.unwrap();

        let end = service.continue_generation(1, &mut sink).await.unwrap();
        assert_eq!(end, TurnEnd::Completed);

        let message = &service.history()[1];
        assert_eq!(
            message.content.raw(),
            "<think>let me think</think>The answer is 4. And a bit more."
        );
        // The seed already contains the end tag, so the resumed timer
        // stops at the first chunk: cumulative total, not a reset.
        let after = message.thinking_time.unwrap();
        assert!(
            after >= before + 30,
            "thinking time must accumulate: {before} -> {after}"
        );

        // The stored record reflects the continuation.
        let stored = service.list_conversations().unwrap();
        assert_eq!(
            stored[0].messages[1].content.raw(),
            "<think>let me think</think>The answer is 4. And a bit more."
        );
    }

    #[tokio::test]
    async fn continue_preserves_expansion_state_and_end_tag() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_script(vec![ScriptStep::Chunk(" more")])
            .with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("q", &mut sink).await.unwrap();
        let id = service.history()[1].message_id.clone().unwrap();
        service.set_reasoning_expanded(&id, true).unwrap();

        service.continue_generation(1, &mut sink).await.unwrap();

        let message = &service.history()[1];
        assert_eq!(message.content.reasoning_expanded(), Some(true));
        assert_eq!(message.end_tag.as_deref(), Some("</think>"));
    }

    #[tokio::test]
    async fn continue_requires_an_assistant_message() {
        let transport = ScriptedTransport::new().with_script(think_script()).with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("q", &mut sink).await.unwrap();
        let result = service.continue_generation(0, &mut sink).await;
        assert!(matches!(result, Err(ChatError::MessageNotFound(0))));
    }

    // ── Edits ──

    #[tokio::test]
    async fn resend_edited_truncates_and_resends() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_script(vec![ScriptStep::Chunk("answer two")])
            .with_script(vec![ScriptStep::Chunk("revised answer")])
            .with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("one", &mut sink).await.unwrap();
        service.send_message("two", &mut sink).await.unwrap();
        assert_eq!(service.history().len(), 4);

        service.resend_edited(0, "one, revised", &mut sink).await.unwrap();

        assert_eq!(service.history().len(), 2);
        assert_eq!(service.history()[0].content.raw(), "one, revised");
        assert_eq!(service.history()[1].content.raw(), "revised answer");

        // The resend went out with an empty (truncated) history.
        let requests = service.transport.chat_requests();
        assert!(requests[2].conversation.is_empty());
    }

    #[tokio::test]
    async fn resend_of_assistant_message_is_rejected() {
        let transport = ScriptedTransport::new().with_script(think_script()).with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("q", &mut sink).await.unwrap();
        let result = service.resend_edited(1, "x", &mut sink).await;
        assert!(matches!(result, Err(ChatError::MessageNotFound(1))));
    }

    #[tokio::test]
    async fn save_edited_replaces_content_in_place() {
        let transport = ScriptedTransport::new().with_script(think_script()).with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("q", &mut sink).await.unwrap();
        service.save_edited(1, "corrected answer").unwrap();

        let message = &service.history()[1];
        assert_eq!(message.content.raw(), "corrected answer");
        assert_eq!(message.content.reasoning_expanded(), Some(false));
        // Other bookkeeping survives the edit.
        assert!(message.message_id.is_some());

        let stored = service.list_conversations().unwrap();
        assert_eq!(stored[0].messages[1].content.raw(), "corrected answer");
    }

    #[tokio::test]
    async fn delete_message_truncates_history_from_index() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_script(vec![ScriptStep::Chunk("two")])
            .with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("one", &mut sink).await.unwrap();
        service.send_message("two", &mut sink).await.unwrap();

        service.delete_message(1).unwrap();
        assert_eq!(service.history().len(), 1);

        let stored = service.list_conversations().unwrap();
        assert_eq!(stored[0].messages.len(), 1);
    }

    // ── Reasoning toggle ──

    #[tokio::test]
    async fn toggle_reasoning_persists_expansion_state() {
        let transport = ScriptedTransport::new().with_script(think_script()).with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("q", &mut sink).await.unwrap();
        let id = service.history()[1].message_id.clone().unwrap();

        assert!(service.set_reasoning_expanded(&id, true).unwrap());
        let stored = service.list_conversations().unwrap();
        assert_eq!(
            stored[0].messages[1].content.reasoning_expanded(),
            Some(true)
        );

        assert!(!service.set_reasoning_expanded("no-such-id", true).unwrap());
    }

    // ── Conversation management ──

    #[tokio::test]
    async fn switch_conversation_saves_and_loads() {
        let transport = ScriptedTransport::new()
            .with_script(think_script())
            .with_script(vec![ScriptStep::Chunk("other answer")])
            .with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("first conv", &mut sink).await.unwrap();
        let first_id = service.current_conversation_id().unwrap().to_string();

        service.new_chat().unwrap();
        assert!(service.history().is_empty());

        service.send_message("second conv", &mut sink).await.unwrap();
        let second_id = service.current_conversation_id().unwrap().to_string();
        assert_ne!(first_id, second_id);

        service.switch_conversation(&first_id).unwrap();
        assert_eq!(service.history().len(), 2);
        assert_eq!(service.history()[0].content.raw(), "first conv");
        assert_eq!(service.current_conversation_id(), Some(first_id.as_str()));
    }

    #[tokio::test]
    async fn switch_to_missing_conversation_fails() {
        let mut service = service_with(ScriptedTransport::new());
        let result = service.switch_conversation("404");
        assert!(matches!(result, Err(ChatError::ConversationNotFound(_))));
    }

    #[tokio::test]
    async fn delete_current_conversation_clears_state() {
        let transport = ScriptedTransport::new().with_script(think_script()).with_title("T");
        let mut service = service_with(transport);
        let mut sink = CollectingSink::new();

        service.send_message("q", &mut sink).await.unwrap();
        let id = service.current_conversation_id().unwrap().to_string();

        assert!(service.delete_conversation(&id).unwrap());
        assert!(service.history().is_empty());
        assert!(service.current_conversation_id().is_none());
        assert!(service.list_conversations().unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_restores_current_conversation_on_startup() {
        let transport = ScriptedTransport::new().with_script(think_script()).with_title("T");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");

        {
            let conn = crate::db::sqlite::open_database(&path).unwrap();
            let mut service = ChatService::new(conn, transport).unwrap();
            let mut settings = Settings::default();
            settings.selected_model = "test-model".to_string();
            service.update_settings(settings).unwrap();
            let mut sink = CollectingSink::new();
            service.send_message("persist me", &mut sink).await.unwrap();
        }

        let conn = crate::db::sqlite::open_database(&path).unwrap();
        let service = ChatService::new(conn, ScriptedTransport::new()).unwrap();
        assert_eq!(service.history().len(), 2);
        assert_eq!(service.history()[0].content.raw(), "persist me");
        assert_eq!(service.current_title(), "T");
    }

    // ── Models ──

    #[tokio::test]
    async fn models_come_from_the_transport() {
        let transport =
            ScriptedTransport::new().with_models(vec!["a-model".into(), "b-model".into()]);
        let service = service_with(transport);
        let models = service.models().await.unwrap();
        assert_eq!(models, vec!["a-model".to_string(), "b-model".to_string()]);
    }

    // ── Helpers ──

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }
}
