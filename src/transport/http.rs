//! HTTP transport over reqwest.

use futures_util::StreamExt;

use super::{
    ChatRequest, ChatTransport, ContinueRequest, TextChunkStream, TitleRequest, TitleResponse,
    TransportError,
};

/// Client for an OpenAI-compatible chat gateway.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_connect() {
            TransportError::Connection(self.base_url.clone())
        } else {
            TransportError::Request(e.to_string())
        }
    }

    async fn open_stream<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<TextChunkStream, TransportError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(text_chunks(response))
    }
}

impl ChatTransport for HttpTransport {
    async fn chat(&self, request: ChatRequest) -> Result<TextChunkStream, TransportError> {
        self.open_stream("/chat", &request).await
    }

    async fn continue_generation(
        &self,
        request: ContinueRequest,
    ) -> Result<TextChunkStream, TransportError> {
        self.open_stream("/continue_generation", &request).await
    }

    async fn generate_title(
        &self,
        request: TitleRequest,
    ) -> Result<TitleResponse, TransportError> {
        let url = format!("{}/generate-title", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::ResponseParsing(e.to_string()))
    }

    async fn list_models(&self) -> Result<Vec<String>, TransportError> {
        let url = format!("{}/fetch-models", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::ResponseParsing(e.to_string()))
    }
}

/// Decode a byte stream into text chunks. A UTF-8 codepoint can split
/// across network chunks, so incomplete trailing bytes are held back and
/// prepended to the next chunk.
fn text_chunks(response: reqwest::Response) -> TextChunkStream {
    let mut pending: Vec<u8> = Vec::new();
    Box::pin(response.bytes_stream().map(move |item| match item {
        Ok(bytes) => {
            pending.extend_from_slice(&bytes);
            Ok(drain_complete_utf8(&mut pending))
        }
        Err(e) => Err(TransportError::Read(e.to_string())),
    }))
}

/// Take the longest valid UTF-8 prefix out of `buf`, leaving any trailing
/// incomplete sequence behind. Genuinely invalid bytes are replaced rather
/// than kept forever.
fn drain_complete_utf8(buf: &mut Vec<u8>) -> String {
    match std::str::from_utf8(buf) {
        Ok(s) => {
            let s = s.to_string();
            buf.clear();
            s
        }
        Err(e) if e.error_len().is_some() => {
            let s = String::from_utf8_lossy(buf).into_owned();
            buf.clear();
            s
        }
        Err(e) => {
            let tail = buf.split_off(e.valid_up_to());
            let s = String::from_utf8_lossy(buf).into_owned();
            *buf = tail;
            s
        }
    }
}
