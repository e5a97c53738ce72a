//! Subword tokenizers used for client-side token accounting.
//!
//! The budget enforced on user input must agree with whatever count is shown
//! to the user, so the encoding is a configuration option rather than a fixed
//! choice. The default, `cl100k_base`, matches the web client.

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use tiktoken_rs::CoreBPE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerError {
    /// The encoding tables could not be loaded.
    Load(String),
    /// Text could not be turned into tokens.
    Encode(String),
    /// Tokens could not be turned back into valid text.
    Decode(String),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::Load(msg) => write!(f, "failed to load tokenizer: {msg}"),
            TokenizerError::Encode(msg) => write!(f, "failed to encode text: {msg}"),
            TokenizerError::Decode(msg) => write!(f, "failed to decode tokens: {msg}"),
        }
    }
}

impl StdError for TokenizerError {}

pub trait Tokenizer: Send + Sync {
    fn name(&self) -> &str;

    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError>;

    fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError>;

    fn count(&self, text: &str) -> Result<usize, TokenizerError> {
        self.encode(text).map(|tokens| tokens.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenizerKind {
    #[default]
    Cl100kBase,
    O200kBase,
    P50kBase,
    R50kBase,
}

impl TokenizerKind {
    pub const ALL: [TokenizerKind; 4] = [
        TokenizerKind::Cl100kBase,
        TokenizerKind::O200kBase,
        TokenizerKind::P50kBase,
        TokenizerKind::R50kBase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenizerKind::Cl100kBase => "cl100k_base",
            TokenizerKind::O200kBase => "o200k_base",
            TokenizerKind::P50kBase => "p50k_base",
            TokenizerKind::R50kBase => "r50k_base",
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        TokenizerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = TokenizerKind::ALL.iter().map(|k| k.as_str()).collect();
                format!(
                    "unknown tokenizer '{value}' (expected one of: {})",
                    known.join(", ")
                )
            })
    }
}

/// Byte-pair encoder backed by the tiktoken tables.
pub struct BpeTokenizer {
    kind: TokenizerKind,
    bpe: CoreBPE,
}

impl BpeTokenizer {
    pub fn new(kind: TokenizerKind) -> Result<Self, TokenizerError> {
        let bpe = match kind {
            TokenizerKind::Cl100kBase => tiktoken_rs::cl100k_base(),
            TokenizerKind::O200kBase => tiktoken_rs::o200k_base(),
            TokenizerKind::P50kBase => tiktoken_rs::p50k_base(),
            TokenizerKind::R50kBase => tiktoken_rs::r50k_base(),
        }
        .map_err(|e| TokenizerError::Load(e.to_string()))?;
        Ok(Self { kind, bpe })
    }
}

impl Tokenizer for BpeTokenizer {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        Ok(self.bpe.encode_with_special_tokens(text))
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| TokenizerError::Decode(e.to_string()))
    }
}
