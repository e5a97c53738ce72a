//! "count" command: measure text against the input budget.

use std::error::Error;
use std::io::{self, IsTerminal, Read};

use crate::core::admission::preview_truncation;
use crate::core::config::ResolvedSettings;
use crate::core::tokenizer::{BpeTokenizer, Tokenizer, TokenizerError};

pub fn run_count(text: Vec<String>, settings: &ResolvedSettings) -> Result<(), Box<dyn Error>> {
    let text = if text.is_empty() {
        let mut stdin = io::stdin();
        if stdin.is_terminal() {
            eprintln!("Reading from stdin; finish with Ctrl+D.");
        }
        let mut buf = String::new();
        stdin.read_to_string(&mut buf)?;
        buf
    } else {
        text.join(" ")
    };

    let tokenizer = BpeTokenizer::new(settings.tokenizer)?;
    print!(
        "{}",
        count_report(&tokenizer, &text, settings.max_input_tokens)?
    );
    Ok(())
}

fn count_report(
    tokenizer: &dyn Tokenizer,
    text: &str,
    max_tokens: usize,
) -> Result<String, TokenizerError> {
    let (count, truncated) = preview_truncation(tokenizer, text, max_tokens)?;
    Ok(format_count_report(
        tokenizer.name(),
        count,
        max_tokens,
        truncated.as_deref(),
    ))
}

fn format_count_report(
    tokenizer: &str,
    count: usize,
    max_tokens: usize,
    truncated: Option<&str>,
) -> String {
    let mut report = format!("{count}/{max_tokens} tokens ({tokenizer})\n");
    match truncated {
        None => report.push_str("Fits within the input budget.\n"),
        Some(kept) => {
            report.push_str(&format!(
                "Over budget by {} tokens. The input would be cut to:\n\n{kept}\n",
                count - max_tokens
            ));
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::core::admission::InputBudget;
    use crate::core::constants::MAX_INPUT_TOKENS;
    use crate::core::tokenizer::TokenizerKind;

    #[test]
    fn report_for_text_within_budget() {
        let report = format_count_report("cl100k_base", 12, 512, None);
        assert_eq!(
            report,
            "12/512 tokens (cl100k_base)\nFits within the input budget.\n"
        );
    }

    #[test]
    fn report_for_text_over_budget_shows_kept_text() {
        let report = format_count_report("o200k_base", 20, 16, Some("kept part"));
        assert!(report.starts_with("20/16 tokens (o200k_base)\n"));
        assert!(report.contains("Over budget by 4 tokens"));
        assert!(report.ends_with("kept part\n"));
    }

    #[test]
    fn report_shows_exactly_what_the_input_box_would_keep() {
        let tokenizer = Arc::new(BpeTokenizer::new(TokenizerKind::Cl100kBase).expect("tokenizer"));
        let text = "🍝🔫🦆".repeat(400);

        let report = count_report(tokenizer.as_ref(), &text, MAX_INPUT_TOKENS).expect("report");
        let mut budget = InputBudget::new(tokenizer, MAX_INPUT_TOKENS);
        let accepted = budget.on_change(&text).raw_text.clone();

        assert!(!accepted.is_empty());
        assert!(report.ends_with(&format!(":\n\n{accepted}\n")));
    }
}
