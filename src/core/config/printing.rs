use crate::core::config::data::{path_display, Config};
use crate::core::constants::MAX_INPUT_TOKENS;
use crate::core::tokenizer::TokenizerKind;

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        if let Some(path) = Self::get_config_path() {
            println!("  file: {}", path_display(path));
        }
        match &self.endpoint {
            Some(endpoint) => println!("  endpoint: {endpoint}"),
            None => println!("  endpoint: (unset)"),
        }
        match &self.tokenizer {
            Some(tokenizer) => println!("  tokenizer: {tokenizer}"),
            None => println!("  tokenizer: {} (default)", TokenizerKind::default()),
        }
        match self.max_input_tokens {
            Some(max) => println!("  max-input-tokens: {max}"),
            None => println!("  max-input-tokens: {MAX_INPUT_TOKENS} (default)"),
        }
        match self.request_timeout_secs {
            Some(secs) => println!("  request-timeout-secs: {secs}"),
            None => println!("  request-timeout-secs: (unset)"),
        }
    }
}
