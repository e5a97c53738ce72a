//! The exchange state machine.
//!
//! [`ExchangeOrchestrator`] owns the conversation log and admits at most one
//! exchange at a time. Submitting produces the parameters for the transport
//! task; everything the transport reports comes back through
//! [`ExchangeOrchestrator::handle_stream_message`], which reassembles frames
//! and fills the placeholder assistant entry in place.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{GenerateRequest, GenerateResponse, HistoryMessage};
use crate::core::chat_stream::{ResponseMode, StreamMessage, StreamParams, TransportError};
use crate::core::constants::{CONFIG_ERROR_MESSAGE, CONNECTION_ERROR_MESSAGE, GREETING};
use crate::core::message::{ConversationEntry, ConversationLog};
use crate::core::sse::{SseDecoder, SseFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    Submitting,
    Streaming,
    /// Resting state after an exchange; accepts new submits like `Idle`.
    Settled(ExchangeOutcome),
}

impl ExchangePhase {
    pub fn is_busy(self) -> bool {
        matches!(self, ExchangePhase::Submitting | ExchangePhase::Streaming)
    }
}

/// Snapshot taken at submit time and handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub prompt: String,
    pub history: Vec<HistoryMessage>,
}

impl From<PendingExchange> for GenerateRequest {
    fn from(pending: PendingExchange) -> Self {
        GenerateRequest {
            prompt: pending.prompt,
            history: pending.history,
        }
    }
}

pub enum SubmitDisposition {
    /// Busy, or nothing to send. The log is untouched.
    Ignored,
    /// No endpoint configured; an in-character error entry was appended.
    ConfigurationError,
    /// Entries appended; spawn the transport with these parameters.
    Dispatched(StreamParams),
}

pub struct ExchangeOrchestrator {
    client: reqwest::Client,
    endpoint: Option<String>,
    timeout: Option<Duration>,
    log: ConversationLog,
    phase: ExchangePhase,
    current_stream_id: u64,
    cancel_token: Option<CancellationToken>,
    mode: ResponseMode,
    decoder: SseDecoder,
    json_body: Vec<u8>,
    accumulated: String,
}

impl ExchangeOrchestrator {
    pub fn new(
        client: reqwest::Client,
        endpoint: Option<String>,
        timeout: Option<Duration>,
    ) -> Self {
        let endpoint = endpoint.filter(|url| !url.trim().is_empty());
        Self {
            client,
            endpoint,
            timeout,
            log: ConversationLog::seeded(GREETING),
            phase: ExchangePhase::Idle,
            current_stream_id: 0,
            cancel_token: None,
            mode: ResponseMode::EventStream,
            decoder: SseDecoder::new(),
            json_body: Vec::new(),
            accumulated: String::new(),
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    pub fn submit(&mut self, committed_input: &str) -> SubmitDisposition {
        let prompt = committed_input.trim();
        if prompt.is_empty() || self.phase.is_busy() {
            debug!(phase = ?self.phase, "submit ignored");
            return SubmitDisposition::Ignored;
        }

        let Some(endpoint) = self.endpoint.clone() else {
            warn!("no endpoint configured; not contacting the service");
            self.log.push(ConversationEntry::assistant(CONFIG_ERROR_MESSAGE));
            self.phase = ExchangePhase::Settled(ExchangeOutcome::Failure);
            return SubmitDisposition::ConfigurationError;
        };

        let pending = PendingExchange {
            prompt: prompt.to_string(),
            history: self.log.history_snapshot(),
        };

        self.log.push(ConversationEntry::user(prompt));
        self.log.push(ConversationEntry::assistant(String::new()));

        let (cancel_token, stream_id) = self.start_new_stream();
        self.phase = ExchangePhase::Submitting;
        info!(stream_id, history = pending.history.len(), "exchange submitted");

        SubmitDisposition::Dispatched(StreamParams {
            client: self.client.clone(),
            endpoint,
            request: pending.into(),
            timeout: self.timeout,
            cancel_token,
            stream_id,
        })
    }

    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        if stream_id != self.current_stream_id || !self.phase.is_busy() {
            debug!(stream_id, current = self.current_stream_id, phase = ?self.phase, "dropping stale stream message");
            return;
        }

        match message {
            StreamMessage::Opened(mode) => {
                self.mode = mode;
                self.phase = ExchangePhase::Streaming;
            }
            StreamMessage::Chunk(bytes) => {
                // Some transports skip the explicit open notification.
                self.phase = ExchangePhase::Streaming;
                match self.mode {
                    ResponseMode::EventStream => {
                        let frames = self.decoder.push(&bytes);
                        self.apply_frames(frames);
                    }
                    ResponseMode::Json => self.json_body.extend_from_slice(&bytes),
                }
            }
            StreamMessage::Error(err) => self.fail(err),
            StreamMessage::End => match self.mode {
                ResponseMode::EventStream => {
                    let frames = self.decoder.finish();
                    self.apply_frames(frames);
                    if self.phase.is_busy() {
                        self.settle(ExchangeOutcome::Success);
                    }
                }
                ResponseMode::Json => self.finish_json(),
            },
        }
    }

    /// Stop the in-flight transport task, if any. Used on shutdown only.
    pub fn shutdown(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    fn start_new_stream(&mut self) -> (CancellationToken, u64) {
        self.current_stream_id += 1;
        self.mode = ResponseMode::EventStream;
        self.decoder = SseDecoder::new();
        self.json_body.clear();
        self.accumulated.clear();

        let token = CancellationToken::new();
        self.cancel_token = Some(token.clone());
        (token, self.current_stream_id)
    }

    fn apply_frames(&mut self, frames: Vec<SseFrame>) {
        for frame in frames {
            match frame {
                SseFrame::Token(fragment) => {
                    self.accumulated.push_str(&fragment);
                    self.publish_accumulated();
                }
                SseFrame::Malformed(payload) => {
                    warn!(payload = %payload, "skipping malformed stream event");
                }
                SseFrame::Done => {
                    debug!(stream_id = self.current_stream_id, "stream terminator received");
                    self.settle(ExchangeOutcome::Success);
                    return;
                }
            }
        }
    }

    fn publish_accumulated(&mut self) {
        let Some(last_index) = self.log.last_index() else {
            return;
        };
        if !self
            .log
            .replace_content_at(last_index, self.accumulated.clone())
        {
            warn!(
                last_index,
                "trailing entry is not an assistant placeholder; fragment not applied"
            );
        }
    }

    fn finish_json(&mut self) {
        let body = std::mem::take(&mut self.json_body);
        match serde_json::from_slice::<GenerateResponse>(&body) {
            Ok(reply) => {
                self.accumulated = reply.response.trim().to_string();
                self.publish_accumulated();
                self.settle(ExchangeOutcome::Success);
            }
            Err(err) => {
                self.fail(TransportError::InvalidBody(err.to_string()));
            }
        }
    }

    fn fail(&mut self, err: TransportError) {
        warn!(error = %err, partial = self.accumulated.len(), "exchange failed");
        let placeholder_is_empty = self
            .log
            .last()
            .map(|entry| entry.is_assistant() && entry.content.is_empty())
            .unwrap_or(false);
        if placeholder_is_empty {
            if let Some(last_index) = self.log.last_index() {
                self.log
                    .replace_content_at(last_index, CONNECTION_ERROR_MESSAGE);
            }
        }
        self.settle(ExchangeOutcome::Failure);
    }

    fn settle(&mut self, outcome: ExchangeOutcome) {
        info!(stream_id = self.current_stream_id, ?outcome, "exchange settled");
        self.phase = ExchangePhase::Settled(outcome);
        // After an early terminator the transport may still be reading.
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
