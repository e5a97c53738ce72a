pub mod data;
pub mod io;
pub mod printing;


use std::time::Duration;

pub use data::Config;
pub use io::ConfigError;

use crate::core::constants::MAX_INPUT_TOKENS;
use crate::core::tokenizer::TokenizerKind;

/// Environment variable consulted for the endpoint when no flag is given.
pub const ENDPOINT_ENV: &str = "JERSEYCHAT_ENDPOINT";

/// Keys accepted by `set` / `unset`.
pub const CONFIG_KEYS: [&str; 4] = [
    "endpoint",
    "tokenizer",
    "max-input-tokens",
    "request-timeout-secs",
];

/// Values supplied on the command line, which win over everything else.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub endpoint: Option<String>,
    pub tokenizer: Option<String>,
}

/// Effective settings for a session after merging flags, environment and file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    pub endpoint: Option<String>,
    pub tokenizer: TokenizerKind,
    pub max_input_tokens: usize,
    pub request_timeout: Option<Duration>,
}

impl ResolvedSettings {
    pub fn resolve(
        config: &Config,
        overrides: &SettingsOverrides,
        env_endpoint: Option<String>,
    ) -> Result<Self, ConfigError> {
        let endpoint = [overrides.endpoint.clone(), env_endpoint, config.endpoint.clone()]
            .into_iter()
            .flatten()
            .map(|url| url.trim().to_string())
            .find(|url| !url.is_empty());

        let tokenizer = match overrides.tokenizer.as_ref().or(config.tokenizer.as_ref()) {
            Some(name) => parse_tokenizer(name)?,
            None => TokenizerKind::default(),
        };

        let max_input_tokens = match config.max_input_tokens {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: "max-input-tokens".into(),
                    message: "must be greater than zero".into(),
                })
            }
            Some(max) => max,
            None => MAX_INPUT_TOKENS,
        };

        let request_timeout = config
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            endpoint,
            tokenizer,
            max_input_tokens,
            request_timeout,
        })
    }

    /// Resolve against the on-disk config and the real environment.
    pub fn load(overrides: &SettingsOverrides) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let env_endpoint = std::env::var(ENDPOINT_ENV).ok();
        Ok(Self::resolve(&config, overrides, env_endpoint)?)
    }
}

fn parse_tokenizer(name: &str) -> Result<TokenizerKind, ConfigError> {
    name.parse().map_err(|message| ConfigError::Invalid {
        key: "tokenizer".into(),
        message,
    })
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.into(),
        message: format!("'{value}' is not a whole number"),
    })
}

impl Config {
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "endpoint" => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: key.into(),
                        message: "must not be empty".into(),
                    });
                }
                self.endpoint = Some(trimmed.to_string());
            }
            "tokenizer" => {
                self.tokenizer = Some(parse_tokenizer(value)?.to_string());
            }
            "max-input-tokens" => {
                let max: usize = parse_number(key, value)?;
                if max == 0 {
                    return Err(ConfigError::Invalid {
                        key: key.into(),
                        message: "must be greater than zero".into(),
                    });
                }
                self.max_input_tokens = Some(max);
            }
            "request-timeout-secs" => {
                self.request_timeout_secs = Some(parse_number(key, value)?);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "endpoint" => self.endpoint = None,
            "tokenizer" => self.tokenizer = None,
            "max-input-tokens" => self.max_input_tokens = None,
            "request-timeout-secs" => self.request_timeout_secs = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
