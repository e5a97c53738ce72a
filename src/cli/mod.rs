//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod count;
pub mod say;


use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::count::run_count;
use crate::cli::say::run_say;
use crate::core::config::{Config, ResolvedSettings, SettingsOverrides, CONFIG_KEYS};
use crate::logging::init_file_logging;
use crate::ui::chat_loop::run_chat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("VERGEN_GIT_DESCRIBE"),
    "\nrustc: ",
    env!("VERGEN_RUSTC_SEMVER"),
);

#[derive(Parser)]
#[command(name = "jerseychat")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "Chat with Tony Soprano from your terminal")]
#[command(
    long_about = "jerseychat is a terminal chat interface for The North Jersey Project. \
It streams replies token by token and keeps every prompt within a fixed token budget.\n\n\
Environment Variables:\n\
  JERSEYCHAT_ENDPOINT   URL of the generation service (overrides the config file)\n\
  JERSEYCHAT_LOG        Log filter used with --debug-log (defaults to warn)\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Shift/Alt+Enter   Insert a new line\n\
  PgUp/PgDn         Scroll through the conversation (Ctrl+Up/Down by line)\n\
  Ctrl+C            Quit the application"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Generation endpoint to POST prompts to
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Tokenizer used for the input budget (cl100k_base, o200k_base, p50k_base, r50k_base)
    #[arg(short = 't', long, global = true, value_name = "ENCODING")]
    pub tokenizer: Option<String>,

    /// Write diagnostic logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub debug_log: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send a single prompt and print the reply without the chat interface
    Say {
        /// Prompt text (may be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Count the tokens in some text and show how it would be truncated
    Count {
        /// Text to measure; read from stdin when omitted
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        value: Option<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            endpoint: self.endpoint.clone(),
            tokenizer: self.tokenizer.clone(),
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if let Some(path) = &args.debug_log {
        init_file_logging(path)?;
    }

    let overrides = args.overrides();
    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let settings = ResolvedSettings::load(&overrides)?;
            run_chat(settings).await
        }
        Commands::Say { prompt } => {
            let settings = ResolvedSettings::load(&overrides)?;
            run_say(prompt, settings).await
        }
        Commands::Count { text } => {
            let settings = ResolvedSettings::load(&overrides)?;
            run_count(text, &settings)
        }
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            match (key, value) {
                (Some(key), Some(value)) => {
                    if let Err(e) = config.set_value(&key, &value) {
                        eprintln!("❌ {e}");
                        eprintln!("Known keys: {}", CONFIG_KEYS.join(", "));
                        std::process::exit(1);
                    }
                    config.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                _ => config.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            if let Err(e) = config.unset_value(&key) {
                eprintln!("❌ {e}");
                eprintln!("Known keys: {}", CONFIG_KEYS.join(", "));
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
    }
}
