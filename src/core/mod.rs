pub mod admission;
pub mod app;
pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod exchange;
pub mod message;
pub mod sse;
pub mod tokenizer;
