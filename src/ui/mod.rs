//! Terminal UI for interactive chat sessions.
//!
//! - [`chat_loop`]: the event loop that feeds keystrokes through the input
//!   budget and stream messages through the exchange orchestrator.
//! - [`renderer`]: frame composition (transcript, input box, token counter).
//! - [`input_box`]: the editable text area the budget keeps in sync.
//! - [`lifecycle`]: raw mode and alternate screen setup/teardown.
//! - [`text_wrapping`]: word wrapping that fixes the transcript's row count.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns the exchange and admission logic.

pub mod chat_loop;
pub mod input_box;
pub mod lifecycle;
pub mod renderer;
pub mod text_wrapping;
