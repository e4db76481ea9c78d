//! Message feed collaborators.
//!
//! A feed hands out the finalized messages of a conversation and notifies
//! subscribers whenever that conversation changes.

use crate::types::{ConversationId, Message};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Change notification: the conversation and its full current message list
pub type FeedCallback = Box<dyn FnMut(&ConversationId, &[Message])>;

#[cfg_attr(test, mockall::automock)]
pub trait MessageFeed {
    /// Current finalized messages of a conversation, in order
    fn messages(&self, conversation_id: &ConversationId) -> Vec<Message>;

    /// Register `callback` for changes to one conversation
    fn subscribe(&self, conversation_id: &ConversationId, callback: FeedCallback) -> Subscription;
}

/// Handle for a registered callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to tear down
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct Subscriber {
    id: u64,
    conversation_id: ConversationId,
    callback: Rc<RefCell<FeedCallback>>,
}

#[derive(Default)]
struct FeedState {
    conversations: HashMap<ConversationId, Vec<Message>>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// Single-threaded in-memory feed
#[derive(Clone, Default)]
pub struct InMemoryFeed {
    state: Rc<RefCell<FeedState>>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finalized message, replacing any message with the same id,
    /// then notify the conversation's subscribers
    pub fn upsert(&self, message: Message) {
        let conversation_id = message.conversation_id.clone();
        let (messages, callbacks) = {
            let mut state = self.state.borrow_mut();
            let messages = state
                .conversations
                .entry(conversation_id.clone())
                .or_default();
            match messages
                .iter_mut()
                .find(|m| m.message_id == message.message_id)
            {
                Some(existing) => *existing = message,
                None => messages.push(message),
            }
            let messages = messages.clone();
            let callbacks: Vec<_> = state
                .subscribers
                .iter()
                .filter(|s| s.conversation_id == conversation_id)
                .map(|s| Rc::clone(&s.callback))
                .collect();
            (messages, callbacks)
        };

        debug!(
            conversation = %conversation_id,
            subscribers = callbacks.len(),
            "notifying feed subscribers"
        );
        // State is released so callbacks may read from or unsubscribe on the feed
        for callback in callbacks {
            let mut callback = callback.borrow_mut();
            (*callback)(&conversation_id, &messages);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

impl MessageFeed for InMemoryFeed {
    fn messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.state
            .borrow()
            .conversations
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    fn subscribe(&self, conversation_id: &ConversationId, callback: FeedCallback) -> Subscription {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push(Subscriber {
                id,
                conversation_id: conversation_id.clone(),
                callback: Rc::new(RefCell::new(callback)),
            });
            id
        };

        let state: Weak<RefCell<FeedState>> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.borrow_mut().subscribers.retain(|s| s.id != id);
            }
        })
    }
}
