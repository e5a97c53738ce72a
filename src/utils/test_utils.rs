use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::app::App;
use crate::core::exchange::ExchangeOrchestrator;
use crate::core::tokenizer::{Tokenizer, TokenizerError};

/// One token per `char`. Makes budget arithmetic obvious in tests.
pub struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn name(&self) -> &str {
        "chars"
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        Ok(text.chars().map(u32::from).collect())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        tokens
            .iter()
            .map(|&t| {
                char::from_u32(t).ok_or_else(|| TokenizerError::Decode(format!("bad token {t}")))
            })
            .collect()
    }
}

/// [`CharTokenizer`] that can be told to fail on demand.
#[derive(Default)]
pub struct FlakyTokenizer {
    fail_encode: AtomicBool,
    fail_decode: AtomicBool,
}

impl FlakyTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_encode.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_decode(&self, failing: bool) {
        self.fail_decode.store(failing, Ordering::SeqCst);
    }
}

impl Tokenizer for FlakyTokenizer {
    fn name(&self) -> &str {
        "flaky"
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        if self.fail_encode.load(Ordering::SeqCst) {
            return Err(TokenizerError::Encode("injected failure".into()));
        }
        CharTokenizer.encode(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        if self.fail_decode.load(Ordering::SeqCst) {
            return Err(TokenizerError::Decode("injected failure".into()));
        }
        CharTokenizer.decode(tokens)
    }
}

pub fn create_test_orchestrator(endpoint: Option<&str>) -> ExchangeOrchestrator {
    ExchangeOrchestrator::new(reqwest::Client::new(), endpoint.map(str::to_string), None)
}

pub fn create_test_app() -> App {
    App::new(
        Arc::new(CharTokenizer),
        16,
        create_test_orchestrator(Some("http://127.0.0.1:9/generate")),
    )
}
