//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::app::App;
use crate::core::chat_stream::ChatStreamService;
use crate::core::config::ResolvedSettings;
use crate::core::exchange::{ExchangeOutcome, ExchangePhase};

pub async fn run_say(prompt: Vec<String>, settings: ResolvedSettings) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: jerseychat say <prompt>");
        std::process::exit(1);
    }

    let mut app = App::from_settings(&settings)?;
    let accepted = app.on_input_change(&prompt).to_string();
    if accepted.trim().is_empty() {
        eprintln!("❌ Could not measure the prompt with {}", app.budget.tokenizer_name());
        std::process::exit(1);
    }
    if accepted != prompt {
        eprintln!(
            "⚠️  Prompt cut to {} tokens ({}).",
            app.budget.max_tokens(),
            app.budget.tokenizer_name()
        );
    }

    let Some(params) = app.submit() else {
        // Only the configuration-error path gets here with non-blank input.
        if let Some(entry) = app.log().last() {
            eprintln!("❌ {}", entry.content);
        }
        std::process::exit(1);
    };

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(params);

    let mut stdout = io::stdout();
    let mut printed = 0usize;
    while let Some((message, stream_id)) = rx.recv().await {
        app.handle_stream_message(message, stream_id);
        if let Some(suffix) = unprinted_suffix(app.exchange.accumulated(), printed) {
            write!(stdout, "{suffix}")?;
            stdout.flush()?;
            printed += suffix.len();
        }
        if !app.is_busy() {
            break;
        }
    }

    match app.exchange.phase() {
        ExchangePhase::Settled(ExchangeOutcome::Failure) if printed == 0 => {
            if let Some(entry) = app.log().last() {
                eprintln!("❌ {}", entry.content);
            }
            std::process::exit(1);
        }
        _ => {
            println!();
            Ok(())
        }
    }
}

/// Portion of the accumulated reply not yet written to stdout.
fn unprinted_suffix(accumulated: &str, printed: usize) -> Option<&str> {
    accumulated.get(printed..).filter(|rest| !rest.is_empty())
}
