//! Line-oriented event protocol driving a [`CostMonitor`] from a text stream.

use crate::constants::UNKNOWN_MODEL;
use crate::error::{CostError, Result};
use crate::feed::InMemoryFeed;
use crate::formatting::format_number_with_commas;
use crate::monitor::CostMonitor;
use crate::types::{ConversationId, Message};
use colored::{ColoredString, Colorize};
use serde::Deserialize;
use tracing::warn;

/// One line of input
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// Switch the observed conversation; null clears it
    Observe {
        #[serde(rename = "conversationId")]
        conversation_id: Option<ConversationId>,
    },
    /// Finalized message upsert
    Message { message: Message },
    /// In-flight message for a slot; null clears the slot
    Stream {
        slot: usize,
        message: Option<Message>,
    },
}

impl Event {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|source| CostError::EventParse {
            line: line.to_string(),
            source,
        })
    }

    pub fn apply(self, feed: &InMemoryFeed, monitor: &mut CostMonitor) {
        match self {
            Event::Observe { conversation_id } => monitor.observe(conversation_id),
            Event::Message { message } => feed.upsert(message),
            Event::Stream { slot, message } => monitor.set_streaming(slot, message),
        }
    }
}

/// Handle one input line and return the status line to print.
/// Blank and malformed lines yield None.
pub fn process_line(line: &str, feed: &InMemoryFeed, monitor: &mut CostMonitor) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match Event::parse(trimmed) {
        Ok(event) => {
            event.apply(feed, monitor);
            Some(status_line(monitor))
        }
        Err(err) => {
            warn!(error = %err, "skipping malformed event");
            None
        }
    }
}

#[inline]
fn model_name(model: &str) -> ColoredString {
    if model == UNKNOWN_MODEL {
        model.dimmed()
    } else {
        model.yellow().bold()
    }
}

pub fn status_line(monitor: &CostMonitor) -> String {
    match monitor.display() {
        Some(display) => format!(
            "{reset}💰 {cost} 👤 {model} ⚖️ {tokens} tokens{reset}",
            reset = "\x1b[0m",
            cost = display.to_colored_string(),
            model = model_name(&display.primary_model),
            tokens = format_number_with_commas(display.total_tokens),
        ),
        None if monitor.conversation_id().is_some() => {
            format!("💰 {}", "no data yet".dimmed())
        }
        None => "💰 -".to_string(),
    }
}
