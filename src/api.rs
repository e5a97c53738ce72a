use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Body POSTed to the generation endpoint.
#[derive(Serialize, Clone, Debug)]
pub struct GenerateRequest {
    pub prompt: String,
    pub history: Vec<HistoryMessage>,
}

/// Non-streaming reply shape.
#[derive(Deserialize, Debug)]
pub struct GenerateResponse {
    pub response: String,
}

/// One incremental fragment in the event stream.
#[derive(Deserialize, Debug)]
pub struct TokenFrame {
    pub token: String,
}
