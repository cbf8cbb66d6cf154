//! Mock completion provider for testing
//!
//! Returns scripted responses without network access, and records every
//! prompt for assertions.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{LlmError, LlmResult};

use super::CompletionProvider;

/// Deterministic completion provider for tests.
///
/// Responses are matched by prompt substring, falling back to a default;
/// a configured failure makes every call error.
pub struct MockCompletionProvider {
    responses: Mutex<Vec<(String, String)>>,
    default_response: String,
    failure: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionProvider {
    /// Provider answering every prompt with a fixed default.
    pub fn new() -> Self {
        Self::with_default_response("This is a mock response.")
    }

    /// Provider answering every unmatched prompt with `response`.
    pub fn with_default_response(response: &str) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            default_response: response.to_string(),
            failure: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer prompts containing `substring` with `response`.
    /// Earlier registrations win.
    pub fn set_response(&self, substring: &str, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push((substring.to_string(), response.to_string()));
    }

    /// Make every subsequent call fail with the given message.
    pub fn set_failure(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    /// Number of `complete` calls so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// The most recent prompt, if any call was made.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

impl Default for MockCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(message) = self.failure.lock().unwrap().as_ref() {
            return Err(LlmError::HttpError(message.clone()));
        }

        let responses = self.responses.lock().unwrap();
        for (substring, response) in responses.iter() {
            if prompt.contains(substring.as_str()) {
                return Ok(response.clone());
            }
        }
        Ok(self.default_response.clone())
    }

    fn provider_name(&self) -> &str {
        "Mock"
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }

    async fn health_check(&self) -> LlmResult<bool> {
        Ok(true)
    }
}
