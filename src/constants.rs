/// Characters per token used by the text-length heuristic
pub const CHARS_PER_TOKEN: u64 = 4;

/// Multiplier applied to heuristic token counts before pricing.
/// The character heuristic tends to overcount.
pub const ESTIMATE_DISCOUNT: f64 = 0.85;

/// Model used to price user turns when no model is known in the conversation
pub const USER_DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Reserved pricing key used when no other key matches
pub const DEFAULT_PRICE_KEY: &str = "default";

/// Primary model reported when no cost was attributed to an explicit model
pub const UNKNOWN_MODEL: &str = "Unknown";

/// Conversation id used by clients for a conversation that does not exist yet
pub const NEW_CONVERSATION_ID: &str = "new";

/// Number of in-flight message slots when no config overrides it
pub const DEFAULT_STREAMING_SLOTS: usize = 2;
