use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::GenerateRequest;

/// How the service chose to answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseMode {
    EventStream,
    Json,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    Status { status: u16, body: String },
    EmptyBody,
    InvalidBody(String),
    Network(String),
    Timeout(Duration),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { status, body } if body.trim().is_empty() => {
                write!(f, "service answered with status {status}")
            }
            TransportError::Status { status, body } => {
                write!(f, "service answered with status {status}: {}", body.trim())
            }
            TransportError::EmptyBody => write!(f, "service response had no body"),
            TransportError::InvalidBody(msg) => write!(f, "service reply could not be parsed: {msg}"),
            TransportError::Network(msg) => write!(f, "network error: {msg}"),
            TransportError::Timeout(limit) => {
                write!(f, "exchange timed out after {}s", limit.as_secs())
            }
        }
    }
}

impl StdError for TransportError {}

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Opened(ResponseMode),
    Chunk(Bytes),
    Error(TransportError),
    End,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub request: GenerateRequest,
    pub timeout: Option<Duration>,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                endpoint,
                request,
                timeout,
                cancel_token,
                stream_id,
            } = params;

            let exchange = run_exchange(&client, &endpoint, &request, &tx, stream_id);

            tokio::select! {
                result = with_timeout(timeout, exchange) => {
                    let message = match result {
                        Ok(()) => StreamMessage::End,
                        Err(err) => {
                            warn!(stream_id, error = %err, "exchange failed");
                            StreamMessage::Error(err)
                        }
                    };
                    let _ = tx.send((message, stream_id));
                }
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "exchange cancelled");
                }
            }
        });
    }
}

async fn with_timeout<F>(limit: Option<Duration>, exchange: F) -> Result<(), TransportError>
where
    F: std::future::Future<Output = Result<(), TransportError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => exchange.await,
    }
}

async fn run_exchange(
    client: &reqwest::Client,
    endpoint: &str,
    request: &GenerateRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> Result<(), TransportError> {
    debug!(
        stream_id,
        endpoint,
        history = request.history.len(),
        "sending prompt"
    );

    let response = client
        .post(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .json(request)
        .send()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, body));
    }

    if response.content_length() == Some(0) {
        return Err(TransportError::EmptyBody);
    }

    let mode = response_mode(response.headers().get(CONTENT_TYPE));
    debug!(stream_id, ?mode, "response opened");
    let _ = tx.send((StreamMessage::Opened(mode), stream_id));

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| TransportError::Network(e.to_string()))?;
        if chunk.is_empty() {
            continue;
        }
        if tx.send((StreamMessage::Chunk(chunk), stream_id)).is_err() {
            // Receiver gone; the session is shutting down.
            return Ok(());
        }
    }

    Ok(())
}

fn status_error(status: StatusCode, body: String) -> TransportError {
    TransportError::Status {
        status: status.as_u16(),
        body,
    }
}

fn response_mode(content_type: Option<&reqwest::header::HeaderValue>) -> ResponseMode {
    let is_json = content_type
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .eq_ignore_ascii_case("application/json")
        })
        .unwrap_or(false);
    if is_json {
        ResponseMode::Json
    } else {
        ResponseMode::EventStream
    }
}
