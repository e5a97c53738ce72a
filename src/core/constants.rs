//! Shared constants used across the application

/// Hard ceiling on the number of tokens a single prompt may carry.
pub const MAX_INPUT_TOKENS: usize = 512;

/// Field prefix carried by every event in the response stream.
pub const DATA_PREFIX: &str = "data:";

/// Payload that terminates the response stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Seeded first entry of every conversation. Never sent back as history.
pub const GREETING: &str = "Eyy, what's the matter with you? Go ahead, ask me something.";

/// Shown instead of contacting the network when no endpoint is configured.
pub const CONFIG_ERROR_MESSAGE: &str =
    "Madone! The API endpoint isn't configured. Check your config or set JERSEYCHAT_ENDPOINT.";

/// Replaces an empty placeholder when the exchange fails.
pub const CONNECTION_ERROR_MESSAGE: &str =
    "Madone! Something went wrong with the connection. Try again, will ya?";

/// Notice rendered under the input box once the budget is exhausted.
pub const LIMIT_REACHED_NOTICE: &str = "Character limit reached. Further input will be cut off.";

/// Columns reserved on the right of the input box for the streaming indicator.
pub const INDICATOR_SPACE: u16 = 4;
