use super::ids::{ConversationId, MessageId};
use crate::constants::CHARS_PER_TOKEN;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A chat message as delivered by the message feed.
///
/// Only the attributes that matter for costing are modelled. Numeric
/// fields that arrive malformed deserialize as absent instead of failing
/// the whole message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    #[serde(default)]
    pub is_created_by_user: bool,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub model: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub token_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub usage: Option<Usage>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub tokens: Option<Tokens>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub text: Option<String>,
}

/// Provider usage block (`prompt_tokens` / `completion_tokens`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Usage {
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub completion_tokens: Option<u64>,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens
            .unwrap_or(0)
            .saturating_add(self.completion_tokens.unwrap_or(0))
    }
}

/// Alternate token block, keyed either `prompt`/`completion` or `input`/`output`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Tokens {
    #[serde(default, deserialize_with = "lenient_count")]
    pub prompt: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub input: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub completion: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub output: Option<u64>,
}

impl Tokens {
    pub fn total(&self) -> u64 {
        self.prompt
            .or(self.input)
            .unwrap_or(0)
            .saturating_add(self.completion.or(self.output).unwrap_or(0))
    }
}

/// Token count of one message and whether it came from the text heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCount {
    pub count: u64,
    pub is_estimated: bool,
}

impl TokenCount {
    pub fn exact(count: u64) -> Self {
        Self {
            count,
            is_estimated: false,
        }
    }

    pub fn estimated(count: u64) -> Self {
        Self {
            count,
            is_estimated: true,
        }
    }
}

impl Message {
    pub fn new(conversation_id: impl Into<ConversationId>, message_id: impl Into<MessageId>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            is_created_by_user: false,
            model: None,
            token_count: None,
            usage: None,
            tokens: None,
            text: None,
        }
    }

    pub fn from_user(mut self) -> Self {
        self.is_created_by_user = true;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_token_count(mut self, count: u64) -> Self {
        self.token_count = Some(count);
        self
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(Usage {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
        });
        self
    }

    pub fn with_tokens(mut self, tokens: Tokens) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into()).filter(|t| !t.is_empty());
        self
    }

    /// Determine how many tokens this message accounts for.
    ///
    /// Authoritative sources take precedence in order: `tokenCount`,
    /// then `usage`, then `tokens`. Without any of them the count is
    /// estimated from text length (one token per four characters,
    /// rounded up).
    pub fn token_count(&self) -> TokenCount {
        if let Some(count) = self.token_count {
            return TokenCount::exact(count);
        }
        if let Some(usage) = &self.usage {
            return TokenCount::exact(usage.total());
        }
        if let Some(tokens) = &self.tokens {
            return TokenCount::exact(tokens.total());
        }
        if let Some(text) = &self.text {
            let chars = text.chars().count() as u64;
            return TokenCount::estimated(chars.div_ceil(CHARS_PER_TOKEN));
        }
        TokenCount::exact(0)
    }

    /// Overlay the fields of an in-flight copy of this message.
    /// Fields present on `in_flight` win; absent ones keep the finalized value.
    pub fn overlay(&mut self, in_flight: &Message) {
        self.is_created_by_user = in_flight.is_created_by_user;
        if in_flight.model.is_some() {
            self.model.clone_from(&in_flight.model);
        }
        if in_flight.token_count.is_some() {
            self.token_count = in_flight.token_count;
        }
        if in_flight.usage.is_some() {
            self.usage.clone_from(&in_flight.usage);
        }
        if in_flight.tokens.is_some() {
            self.tokens.clone_from(&in_flight.tokens);
        }
        if in_flight.text.is_some() {
            self.text.clone_from(&in_flight.text);
        }
    }
}

fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
        _ => None,
    })
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}
