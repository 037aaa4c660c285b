//! Test doubles for the generation transport and credential provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::credentials::CredentialProvider;
use crate::error::GenerationError;
use crate::gemini::{GenerateRequest, GenerationTransport, TextStream};

pub struct FixedCredential(Option<String>);

impl FixedCredential {
    pub fn new(key: Option<&str>) -> Self {
        Self(key.map(str::to_string))
    }
}

impl CredentialProvider for FixedCredential {
    fn credential(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Replays canned responses and records every request it receives
pub struct FakeTransport {
    reply: Option<String>,
    fragments: Vec<String>,
    fail_after_fragments: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeTransport {
    fn with(reply: Option<&str>, fragments: &[&str], fail_after_fragments: bool) -> Self {
        Self {
            reply: reply.map(str::to_string),
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_after_fragments,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::with(Some(text), &[], false)
    }

    /// Every call fails before any data arrives
    pub fn failing() -> Self {
        Self::with(None, &[], false)
    }

    pub fn streaming(fragments: &[&str]) -> Self {
        Self::with(Some(""), fragments, false)
    }

    /// Streams `fragments`, then yields an error
    pub fn streaming_then_fail(fragments: &[&str]) -> Self {
        Self::with(Some(""), fragments, true)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().ok()?.last().cloned()
    }

    fn record(&self, request: &GenerateRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }

    fn unavailable() -> GenerationError {
        GenerationError::ApiResponse {
            status: 503,
            body: "unavailable".to_string(),
        }
    }
}

#[async_trait]
impl GenerationTransport for FakeTransport {
    async fn generate(&self, _api_key: &str, request: &GenerateRequest) -> Result<String, GenerationError> {
        self.record(request);
        self.reply.clone().ok_or_else(Self::unavailable)
    }

    async fn stream(&self, _api_key: &str, request: &GenerateRequest) -> Result<TextStream, GenerationError> {
        self.record(request);
        if self.reply.is_none() {
            return Err(Self::unavailable());
        }

        let mut items: Vec<Result<String, GenerationError>> = self.fragments.iter().cloned().map(Ok).collect();
        if self.fail_after_fragments {
            items.push(Err(GenerationError::ApiRequest("connection reset".to_string())));
        }
        let stream: TextStream = Box::pin(futures_util::stream::iter(items));
        Ok(stream)
    }
}
