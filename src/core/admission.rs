//! Token budget enforcement for user input.
//!
//! Every edit of the input box goes through [`InputBudget::on_change`], which
//! either accepts the proposed text, truncates it at a token boundary, or rolls
//! back to the last text known to fit when the tokenizer misbehaves.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::tokenizer::{Tokenizer, TokenizerError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBudgetState {
    pub raw_text: String,
    pub token_count: usize,
    pub limit_reached: bool,
    pub last_accepted_text: String,
}

pub struct InputBudget {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
    state: InputBudgetState,
}

impl InputBudget {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_tokens,
            state: InputBudgetState::default(),
        }
    }

    pub fn state(&self) -> &InputBudgetState {
        &self.state
    }

    pub fn text(&self) -> &str {
        &self.state.raw_text
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    pub fn reset(&mut self) {
        self.state = InputBudgetState::default();
    }

    pub fn on_change(&mut self, proposed: &str) -> &InputBudgetState {
        match self.admit(proposed) {
            Ok((text, token_count, truncated)) => {
                self.state.limit_reached = truncated || token_count >= self.max_tokens;
                self.state.token_count = token_count;
                self.state.last_accepted_text = text.clone();
                self.state.raw_text = text;
            }
            Err(err) => {
                warn!(error = %err, tokenizer = self.tokenizer.name(), "token measurement failed; keeping last accepted input");
                self.state.raw_text = self.state.last_accepted_text.clone();
                self.state.token_count = self.max_tokens;
                self.state.limit_reached = true;
            }
        }
        &self.state
    }

    fn admit(&self, proposed: &str) -> Result<(String, usize, bool), TokenizerError> {
        if proposed.is_empty() {
            return Ok((String::new(), 0, false));
        }

        let tokens = self.tokenizer.encode(proposed)?;
        if tokens.len() <= self.max_tokens {
            return Ok((proposed.to_string(), tokens.len(), false));
        }

        let (truncated, token_count) = fit_prefix(self.tokenizer.as_ref(), &tokens, self.max_tokens)?;
        debug!(
            proposed_tokens = tokens.len(),
            proposed_chars = proposed.chars().count(),
            accepted_chars = truncated.chars().count(),
            accepted_tokens = token_count,
            "input truncated to token budget"
        );
        Ok((truncated, token_count, true))
    }
}

/// Trailing tokens dropped, at most, looking for a prefix that decodes.
///
/// A UTF-8 character is at most four bytes, so a cut can leave at most
/// three tokens holding a partial character.
const MAX_DECODE_BACKOFF: usize = 3;

/// Longest prefix of `tokens`, at most `max_tokens` long, that decodes to
/// text measuring within `max_tokens`. Returns the text and its measure.
fn fit_prefix(
    tokenizer: &dyn Tokenizer,
    tokens: &[u32],
    max_tokens: usize,
) -> Result<(String, usize), TokenizerError> {
    let longest = max_tokens.min(tokens.len());
    let shortest = longest.saturating_sub(MAX_DECODE_BACKOFF);
    let mut last_err = None;

    for keep in (shortest..=longest).rev() {
        match tokenizer.decode(&tokens[..keep]) {
            Ok(text) => {
                let measured = tokenizer.count(&text)?;
                if measured <= max_tokens {
                    return Ok((text, measured));
                }
            }
            Err(err @ TokenizerError::Decode(_)) => {
                debug!(keep, error = %err, "prefix ends inside a character; dropping a token");
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        TokenizerError::Decode(format!("no prefix of {longest} tokens fits the budget"))
    }))
}

/// Measure `text` against a budget without keeping any state.
///
/// Returns the token count and, when over budget, the truncated text.
pub fn preview_truncation(
    tokenizer: &dyn Tokenizer,
    text: &str,
    max_tokens: usize,
) -> Result<(usize, Option<String>), TokenizerError> {
    let tokens = tokenizer.encode(text)?;
    if tokens.len() <= max_tokens {
        return Ok((tokens.len(), None));
    }
    let (truncated, _) = fit_prefix(tokenizer, &tokens, max_tokens)?;
    Ok((tokens.len(), Some(truncated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::MAX_INPUT_TOKENS;
    use crate::core::tokenizer::{BpeTokenizer, TokenizerKind};
    use crate::utils::test_utils::{CharTokenizer, FlakyTokenizer};

    fn char_budget(max: usize) -> InputBudget {
        InputBudget::new(Arc::new(CharTokenizer), max)
    }

    fn cl100k_budget() -> InputBudget {
        let tokenizer = BpeTokenizer::new(TokenizerKind::Cl100kBase).expect("tokenizer");
        InputBudget::new(Arc::new(tokenizer), MAX_INPUT_TOKENS)
    }

    #[test]
    fn text_within_budget_is_accepted_unchanged() {
        let mut budget = char_budget(5);
        let state = budget.on_change("abc").clone();
        assert_eq!(state.raw_text, "abc");
        assert_eq!(state.token_count, 3);
        assert!(!state.limit_reached);
        assert_eq!(state.last_accepted_text, "abc");
    }

    #[test]
    fn text_exactly_at_budget_flags_limit() {
        let mut budget = char_budget(5);
        let state = budget.on_change("abcde");
        assert_eq!(state.raw_text, "abcde");
        assert_eq!(state.token_count, 5);
        assert!(state.limit_reached);
    }

    #[test]
    fn text_over_budget_is_truncated_at_token_boundary() {
        let mut budget = char_budget(5);
        let state = budget.on_change("abcdefgh").clone();
        assert_eq!(state.raw_text, "abcde");
        assert_eq!(state.token_count, 5);
        assert!(state.limit_reached);
        assert_eq!(state.last_accepted_text, "abcde");
    }

    #[test]
    fn empty_input_measures_zero_without_tokenizer() {
        let tokenizer = Arc::new(FlakyTokenizer::new());
        tokenizer.set_failing(true);
        let mut budget = InputBudget::new(tokenizer, 5);
        let state = budget.on_change("");
        assert_eq!(state.raw_text, "");
        assert_eq!(state.token_count, 0);
        assert!(!state.limit_reached);
    }

    #[test]
    fn whitespace_only_input_is_measured_like_any_text() {
        let mut budget = char_budget(5);
        let state = budget.on_change("   ");
        assert_eq!(state.raw_text, "   ");
        assert_eq!(state.token_count, 3);
    }

    #[test]
    fn tokenizer_failure_rolls_back_to_last_accepted_text() {
        let tokenizer = Arc::new(FlakyTokenizer::new());
        let mut budget = InputBudget::new(tokenizer.clone(), 10);

        budget.on_change("fuggedaboutit");
        assert_eq!(budget.text(), "fuggedabou");

        tokenizer.set_failing(true);
        let state = budget.on_change("fuggedaboutit, I said").clone();
        assert_eq!(state.raw_text, "fuggedabou");
        assert!(!state.raw_text.is_empty());
        assert_eq!(state.token_count, 10);
        assert!(state.limit_reached);
        assert_eq!(state.last_accepted_text, "fuggedabou");
    }

    #[test]
    fn decode_failure_takes_the_fallback_path() {
        let tokenizer = Arc::new(FlakyTokenizer::new());
        let mut budget = InputBudget::new(tokenizer.clone(), 4);
        budget.on_change("gaba");

        tokenizer.set_failing_decode(true);
        let state = budget.on_change("gabagool");
        assert_eq!(state.raw_text, "gaba");
        assert!(state.limit_reached);
    }

    #[test]
    fn fallback_does_not_update_last_accepted_text() {
        let tokenizer = Arc::new(FlakyTokenizer::new());
        let mut budget = InputBudget::new(tokenizer.clone(), 10);
        budget.on_change("ok");
        tokenizer.set_failing(true);
        budget.on_change("ok then");
        tokenizer.set_failing(false);
        budget.on_change("ok then");
        assert_eq!(budget.state().last_accepted_text, "ok then");
    }

    #[test]
    fn reset_clears_everything() {
        let mut budget = char_budget(3);
        budget.on_change("abcdef");
        budget.reset();
        assert_eq!(budget.state(), &InputBudgetState::default());
    }

    #[test]
    fn cl100k_short_input_reports_true_measure() {
        let mut budget = cl100k_budget();
        let state = budget.on_change("hello world");
        assert_eq!(state.raw_text, "hello world");
        assert_eq!(state.token_count, 2);
        assert!(!state.limit_reached);
    }

    #[test]
    fn cl100k_long_input_truncates_to_exactly_the_budget() {
        let tokenizer = BpeTokenizer::new(TokenizerKind::Cl100kBase).expect("tokenizer");
        let mut budget = cl100k_budget();
        let long = "hello ".repeat(700);

        let accepted = budget.on_change(&long).raw_text.clone();
        assert!(accepted.len() < long.len());
        assert_eq!(budget.state().token_count, MAX_INPUT_TOKENS);
        assert!(budget.state().limit_reached);
        assert_eq!(tokenizer.count(&accepted).expect("count"), MAX_INPUT_TOKENS);

        let again = budget.on_change(&accepted).raw_text.clone();
        assert_eq!(again, accepted);
        assert_eq!(budget.state().token_count, MAX_INPUT_TOKENS);
    }

    #[test]
    fn prefix_backs_off_past_tokens_that_do_not_decode() {
        let tokens = ['a' as u32, 'b' as u32, 0xD800, 'c' as u32];
        let (text, count) = fit_prefix(&CharTokenizer, &tokens, 3).expect("fit");
        assert_eq!(text, "ab");
        assert_eq!(count, 2);
    }

    #[test]
    fn truncated_input_flags_the_limit_even_below_the_budget() {
        let tokenizer = BpeTokenizer::new(TokenizerKind::Cl100kBase).expect("tokenizer");
        let mut budget = InputBudget::new(Arc::new(tokenizer), 5);
        let input = "🍝🔫🦆".repeat(4);

        let state = budget.on_change(&input).clone();
        assert!(state.token_count <= 5);
        assert!(state.limit_reached);
        assert!(input.starts_with(&state.raw_text));
    }

    fn assert_multibyte_truncation(input: &str) {
        let tokenizer = BpeTokenizer::new(TokenizerKind::Cl100kBase).expect("tokenizer");
        let mut budget = cl100k_budget();

        let state = budget.on_change(input).clone();
        assert!(!state.raw_text.is_empty());
        assert!(input.starts_with(&state.raw_text));
        assert!(state.token_count <= MAX_INPUT_TOKENS);
        assert_eq!(tokenizer.count(&state.raw_text).expect("count"), state.token_count);
        assert!(state.limit_reached);
        assert_eq!(state.last_accepted_text, state.raw_text);

        let again = budget.on_change(&state.raw_text).clone();
        assert_eq!(again.raw_text, state.raw_text);
        assert_eq!(again.token_count, state.token_count);
    }

    #[test]
    fn cl100k_emoji_input_keeps_a_decodable_prefix() {
        assert_multibyte_truncation(&"🍝🔫🦆".repeat(400));
    }

    #[test]
    fn cl100k_cjk_input_keeps_a_decodable_prefix() {
        assert_multibyte_truncation(&"漢字テスト、ガバグール。".repeat(400));
    }

    #[test]
    fn preview_matches_what_the_budget_accepts() {
        let cl100k: Arc<dyn Tokenizer> =
            Arc::new(BpeTokenizer::new(TokenizerKind::Cl100kBase).expect("tokenizer"));
        let cases: [(Arc<dyn Tokenizer>, String, usize); 3] = [
            (Arc::new(CharTokenizer), "capicola".to_string(), 4),
            (cl100k.clone(), "hello ".repeat(700), MAX_INPUT_TOKENS),
            (cl100k, "🍝🔫🦆".repeat(400), MAX_INPUT_TOKENS),
        ];

        for (tokenizer, text, max) in cases {
            let (_, preview) = preview_truncation(tokenizer.as_ref(), &text, max).expect("preview");
            let mut budget = InputBudget::new(tokenizer, max);
            let accepted = budget.on_change(&text).raw_text.clone();
            assert_eq!(preview.as_deref(), Some(accepted.as_str()));
        }
    }

    #[test]
    fn preview_reports_count_and_truncation() {
        let (count, truncated) = preview_truncation(&CharTokenizer, "abcdef", 4).expect("preview");
        assert_eq!(count, 6);
        assert_eq!(truncated.as_deref(), Some("abcd"));

        let (count, truncated) = preview_truncation(&CharTokenizer, "ab", 4).expect("preview");
        assert_eq!(count, 2);
        assert!(truncated.is_none());
    }
}
