//! Session state shared by the interactive and one-shot front ends.

use std::sync::Arc;

use crate::core::admission::{InputBudget, InputBudgetState};
use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::config::ResolvedSettings;
use crate::core::exchange::{ExchangeOrchestrator, SubmitDisposition};
use crate::core::message::ConversationLog;
use crate::core::tokenizer::{BpeTokenizer, Tokenizer, TokenizerError};

pub struct App {
    pub budget: InputBudget,
    pub exchange: ExchangeOrchestrator,
    pub exit_requested: bool,
}

impl App {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        max_input_tokens: usize,
        exchange: ExchangeOrchestrator,
    ) -> Self {
        Self {
            budget: InputBudget::new(tokenizer, max_input_tokens),
            exchange,
            exit_requested: false,
        }
    }

    pub fn from_settings(settings: &ResolvedSettings) -> Result<Self, TokenizerError> {
        let tokenizer = BpeTokenizer::new(settings.tokenizer)?;
        let exchange = ExchangeOrchestrator::new(
            reqwest::Client::new(),
            settings.endpoint.clone(),
            settings.request_timeout,
        );
        Ok(Self::new(
            Arc::new(tokenizer),
            settings.max_input_tokens,
            exchange,
        ))
    }

    pub fn log(&self) -> &ConversationLog {
        self.exchange.log()
    }

    pub fn input(&self) -> &InputBudgetState {
        self.budget.state()
    }

    pub fn is_busy(&self) -> bool {
        self.exchange.is_busy()
    }

    /// Run the proposed input text through the token budget.
    ///
    /// Returns the text that was actually accepted, which may differ from the
    /// proposal when it was truncated or rolled back.
    pub fn on_input_change(&mut self, proposed: &str) -> &str {
        &self.budget.on_change(proposed).raw_text
    }

    /// Submit the committed input. Clears the input only once a request is
    /// actually dispatched.
    pub fn submit(&mut self) -> Option<StreamParams> {
        let committed = self.budget.text().to_string();
        match self.exchange.submit(&committed) {
            SubmitDisposition::Dispatched(params) => {
                self.budget.reset();
                Some(params)
            }
            SubmitDisposition::ConfigurationError | SubmitDisposition::Ignored => None,
        }
    }

    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        self.exchange.handle_stream_message(message, stream_id);
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
        self.exchange.shutdown();
    }
}
