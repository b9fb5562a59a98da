//! Scripted backend for tests and for running without an API key.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmBackend, LlmError};

pub struct MockBackend {
    model_id: String,
    response: String,
    available: AtomicBool,
    calls: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl MockBackend {
    #[must_use]
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            model_id: "mock-model".into(),
            response: response.into(),
            available: AtomicBool::new(true),
            calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A backend whose every call fails with `Unavailable`.
    #[must_use]
    pub fn unavailable() -> Self {
        let backend = Self::new("");
        backend.set_available(false);
        backend
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request, for prompt assertions.
    #[must_use]
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new("Mock response")
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    fn id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.last_request.lock() {
            *slot = Some(request);
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(LlmError::Unavailable("mock backend disabled".into()));
        }
        Ok(CompletionResponse {
            content: self.response.clone(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
}
