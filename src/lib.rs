//! jerseychat is a terminal chat client for The North Jersey Project, a
//! text-generation service that answers in the voice of Tony Soprano.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the input token budget, the response-stream decoder and
//!   the exchange state machine that assembles replies into the conversation.
//! - [`ui`] renders the terminal interface and runs the interactive event loop.
//! - [`cli`] parses arguments and hosts the non-interactive commands.
//! - [`api`] defines the request/response payloads exchanged with the service.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
