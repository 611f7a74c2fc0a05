//! Scripted in-process transport for tests.
//!
//! Each streaming call consumes the next script from the queue; requests
//! are recorded so tests can assert on what actually went over the wire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures_util::stream;

use super::{
    ChatRequest, ChatTransport, ContinueRequest, TextChunkStream, TitleRequest, TitleResponse,
    TransportError,
};

/// One step of a scripted stream.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Yield a text chunk.
    Chunk(&'static str),
    /// Wait before the next step, like a slow backend.
    Delay(u64),
    /// Yield a read failure.
    Fail(&'static str),
    /// Yield a transport-level abort.
    Abort,
    /// Never yield again (lets a cancellation win the race).
    Hang,
}

#[derive(Default)]
struct Recorded {
    chat: Vec<ChatRequest>,
    continuations: Vec<ContinueRequest>,
    titles: Vec<TitleRequest>,
}

/// Transport whose streams come from pre-written scripts.
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    title: Option<String>,
    models: Vec<String>,
    recorded: Arc<Mutex<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            title: None,
            models: vec!["test-model".to_string()],
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Queue the steps for the next streaming call.
    pub fn push_script(&self, steps: Vec<ScriptStep>) {
        self.scripts.lock().unwrap().push_back(steps);
    }

    pub fn with_script(self, steps: Vec<ScriptStep>) -> Self {
        self.push_script(steps);
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.recorded.lock().unwrap().chat.clone()
    }

    pub fn continue_requests(&self) -> Vec<ContinueRequest> {
        self.recorded.lock().unwrap().continuations.clone()
    }

    pub fn title_requests(&self) -> Vec<TitleRequest> {
        self.recorded.lock().unwrap().titles.clone()
    }

    fn next_stream(&self) -> TextChunkStream {
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        Box::pin(stream::unfold(steps.into_iter(), |mut steps| async move {
            loop {
                match steps.next()? {
                    ScriptStep::Chunk(text) => return Some((Ok(text.to_string()), steps)),
                    ScriptStep::Delay(ms) => {
                        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                    }
                    ScriptStep::Fail(message) => {
                        return Some((Err(TransportError::Read(message.to_string())), steps))
                    }
                    ScriptStep::Abort => return Some((Err(TransportError::Aborted), steps)),
                    ScriptStep::Hang => {
                        std::future::pending::<()>().await;
                    }
                }
            }
        }))
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatTransport for ScriptedTransport {
    async fn chat(&self, request: ChatRequest) -> Result<TextChunkStream, TransportError> {
        self.recorded.lock().unwrap().chat.push(request);
        Ok(self.next_stream())
    }

    async fn continue_generation(
        &self,
        request: ContinueRequest,
    ) -> Result<TextChunkStream, TransportError> {
        self.recorded.lock().unwrap().continuations.push(request);
        Ok(self.next_stream())
    }

    async fn generate_title(
        &self,
        request: TitleRequest,
    ) -> Result<TitleResponse, TransportError> {
        self.recorded.lock().unwrap().titles.push(request);
        match &self.title {
            Some(title) => Ok(TitleResponse {
                title: Some(title.clone()),
            }),
            None => Err(TransportError::Status {
                status: 500,
                body: "no title configured".to_string(),
            }),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.models.clone())
    }
}
