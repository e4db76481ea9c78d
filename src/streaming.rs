//! In-flight message handling.
//!
//! Clients may have several partial messages streaming at once, one per
//! slot, possibly for conversations other than the one being observed.

use crate::types::{ConversationId, Message};
use tracing::warn;

/// Fixed-size set of slots, each holding at most one in-flight message
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingSlots {
    slots: Vec<Option<Message>>,
}

impl StreamingSlots {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store or clear the message in `slot`. Returns false for an out-of-range slot.
    pub fn set(&mut self, slot: usize, message: Option<Message>) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) => {
                *entry = message;
                true
            }
            None => {
                warn!(slot, size = self.slots.len(), "ignoring write to unknown streaming slot");
                false
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// The first in-flight message that belongs to `conversation_id`
    pub fn find_for(&self, conversation_id: &ConversationId) -> Option<&Message> {
        self.slots
            .iter()
            .flatten()
            .find(|m| &m.conversation_id == conversation_id)
    }
}

/// Build the snapshot for `conversation_id`: finalized messages from that
/// conversation with its in-flight message merged in.
///
/// An in-flight message whose id is already known is overlaid onto the
/// finalized copy in place; otherwise it is appended if it has text.
pub fn merge_streaming(
    finalized: &[Message],
    slots: &StreamingSlots,
    conversation_id: &ConversationId,
) -> Vec<Message> {
    let mut snapshot: Vec<Message> = finalized
        .iter()
        .filter(|m| &m.conversation_id == conversation_id)
        .cloned()
        .collect();

    let Some(in_flight) = slots.find_for(conversation_id) else {
        return snapshot;
    };

    match snapshot
        .iter_mut()
        .find(|m| m.message_id == in_flight.message_id)
    {
        Some(existing) => existing.overlay(in_flight),
        None if in_flight.text.is_some() => snapshot.push(in_flight.clone()),
        None => {}
    }

    snapshot
}
