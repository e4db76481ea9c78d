//! Live cost tracking for the conversation being viewed.
//!
//! Every change, whether a feed notification, a streaming update or a
//! conversation switch, recomputes the snapshot and summary from scratch.

use crate::aggregator::aggregate;
use crate::config::Config;
use crate::feed::{MessageFeed, Subscription};
use crate::pricing::PricingTable;
use crate::streaming::{StreamingSlots, merge_streaming};
use crate::types::{ConversationId, CostDisplay, CostSummary, Message};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

struct MonitorState {
    conversation_id: Option<ConversationId>,
    finalized: Vec<Message>,
    slots: StreamingSlots,
    pricing: PricingTable,
    summary: Option<CostSummary>,
    display: Option<CostDisplay>,
}

impl MonitorState {
    fn recompute(&mut self) {
        let Some(conversation_id) = self.conversation_id.as_ref().filter(|id| !id.is_new()) else {
            self.summary = None;
            self.display = None;
            return;
        };

        let snapshot = merge_streaming(&self.finalized, &self.slots, conversation_id);
        self.summary = aggregate(&snapshot, &self.pricing);
        self.display = CostDisplay::from_summary(self.summary.clone());
        debug!(
            conversation = %conversation_id,
            messages = snapshot.len(),
            has_display = self.display.is_some(),
            "recomputed conversation cost"
        );
    }
}

pub struct CostMonitor {
    feed: Rc<dyn MessageFeed>,
    state: Rc<RefCell<MonitorState>>,
    subscription: Option<Subscription>,
}

impl CostMonitor {
    pub fn new(feed: Rc<dyn MessageFeed>, pricing: PricingTable, streaming_slots: usize) -> Self {
        Self {
            feed,
            state: Rc::new(RefCell::new(MonitorState {
                conversation_id: None,
                finalized: Vec::new(),
                slots: StreamingSlots::new(streaming_slots),
                pricing,
                summary: None,
                display: None,
            })),
            subscription: None,
        }
    }

    pub fn from_config(feed: Rc<dyn MessageFeed>, config: &Config) -> Self {
        Self::new(feed, config.pricing.clone(), config.streaming_slots)
    }

    /// Switch to another conversation, or to none. An empty id counts as none.
    ///
    /// The previous subscription is torn down before anything else so no
    /// cost is computed for a conversation that is no longer observed.
    pub fn observe(&mut self, conversation_id: Option<ConversationId>) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        let conversation_id = conversation_id.filter(|id| !id.as_str().is_empty());
        info!(
            conversation = conversation_id.as_ref().map(|id| id.as_str()),
            "observing conversation"
        );

        let finalized = match &conversation_id {
            Some(id) if !id.is_new() => {
                self.subscription = Some(self.subscribe(id));
                self.feed.messages(id)
            }
            _ => Vec::new(),
        };

        let mut state = self.state.borrow_mut();
        state.conversation_id = conversation_id;
        state.finalized = finalized;
        state.recompute();
    }

    fn subscribe(&self, conversation_id: &ConversationId) -> Subscription {
        let state: Weak<RefCell<MonitorState>> = Rc::downgrade(&self.state);
        self.feed.subscribe(
            conversation_id,
            Box::new(move |id: &ConversationId, messages: &[Message]| {
                let Some(state) = state.upgrade() else {
                    return;
                };
                let mut state = state.borrow_mut();
                // Late notification for a conversation we have moved away from
                if state.conversation_id.as_ref() != Some(id) {
                    return;
                }
                state.finalized = messages.to_vec();
                state.recompute();
            }),
        )
    }

    /// Update one in-flight message slot (None clears it)
    pub fn set_streaming(&mut self, slot: usize, message: Option<Message>) {
        let mut state = self.state.borrow_mut();
        if state.slots.set(slot, message) {
            state.recompute();
        }
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.state.borrow().conversation_id.clone()
    }

    pub fn summary(&self) -> Option<CostSummary> {
        self.state.borrow().summary.clone()
    }

    /// What should be rendered right now; None means render nothing
    pub fn display(&self) -> Option<CostDisplay> {
        self.state.borrow().display.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedCallback, InMemoryFeed, MockMessageFeed};
    use mockall::predicate::{always, eq};
    use std::cell::Cell;

    fn monitor_with(feed: &InMemoryFeed) -> CostMonitor {
        CostMonitor::new(Rc::new(feed.clone()), PricingTable::builtin(), 2)
    }

    #[test]
    fn test_nothing_observed_renders_nothing() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "a1").with_model("gpt-4o").with_token_count(1000));
        let mut monitor = monitor_with(&feed);
        assert!(monitor.display().is_none());

        monitor.observe(None);
        assert!(monitor.display().is_none());
    }

    #[test]
    fn test_new_conversation_sentinel_renders_nothing() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("new", "a1").with_model("gpt-4o").with_token_count(1000));
        let mut monitor = monitor_with(&feed);

        monitor.observe(Some("new".into()));
        assert!(monitor.display().is_none());
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_live_feed_updates() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "a1").with_model("gpt-4o").with_token_count(1000));
        let mut monitor = monitor_with(&feed);

        monitor.observe(Some("c1".into()));
        let display = monitor.display().unwrap();
        assert_eq!(display.formatted_cost, "$0.010");
        assert_eq!(display.primary_model, "gpt-4o");

        feed.upsert(Message::new("c1", "a2").with_model("gpt-4").with_token_count(1000));
        let display = monitor.display().unwrap();
        assert_eq!(display.total_tokens, 2000);
        assert_eq!(display.primary_model, "gpt-4");
    }

    #[test]
    fn test_streaming_text_keeps_estimate_live() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "u1").from_user().with_token_count(20));
        feed.upsert(Message::new("c1", "a1").with_model("gpt-4").with_token_count(100));
        let mut monitor = monitor_with(&feed);
        monitor.observe(Some("c1".into()));
        let before = monitor.summary().unwrap();

        monitor.set_streaming(0, Some(Message::new("c1", "a2").with_text("x".repeat(400))));
        let during = monitor.summary().unwrap();
        assert_eq!(during.total_tokens, before.total_tokens + 100);
        assert!(during.total_cost > before.total_cost);

        // Finalized copy replaces the estimate once the slot is cleared
        feed.upsert(Message::new("c1", "a2").with_model("gpt-4").with_token_count(90));
        monitor.set_streaming(0, None);
        let after = monitor.summary().unwrap();
        assert_eq!(after.total_tokens, before.total_tokens + 90);
    }

    #[test]
    fn test_streaming_for_other_conversation_is_ignored() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "a1").with_model("gpt-4o").with_token_count(1000));
        let mut monitor = monitor_with(&feed);
        monitor.observe(Some("c1".into()));
        let before = monitor.summary().unwrap();

        monitor.set_streaming(1, Some(Message::new("c2", "b1").with_text("x".repeat(4000))));
        assert_eq!(monitor.summary().unwrap().total_tokens, before.total_tokens);
    }

    #[test]
    fn test_switching_conversation_tears_down_subscription() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "a1").with_model("gpt-4o").with_token_count(1000));
        feed.upsert(Message::new("c2", "b1").with_model("o1").with_token_count(1000));
        let mut monitor = monitor_with(&feed);

        monitor.observe(Some("c1".into()));
        monitor.observe(Some("c2".into()));
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(monitor.display().unwrap().primary_model, "o1");

        feed.upsert(Message::new("c1", "a2").with_model("gpt-4").with_token_count(50_000));
        assert_eq!(monitor.display().unwrap().total_tokens, 1000);

        drop(monitor);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_empty_conversation_id_renders_nothing() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("", "a1").with_model("gpt-4o").with_token_count(1000));
        let mut monitor = monitor_with(&feed);

        monitor.observe(Some("".into()));
        assert!(monitor.conversation_id().is_none());
        assert!(monitor.display().is_none());
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_unknown_conversation_has_no_cost() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "a1").with_model("gpt-4o").with_token_count(1000));
        let mut monitor = monitor_with(&feed);

        monitor.observe(Some("c9".into()));
        assert!(monitor.summary().is_none());
        assert!(monitor.display().is_none());
    }

    #[test]
    fn test_zero_cost_is_no_data_yet() {
        let feed = InMemoryFeed::new();
        feed.upsert(Message::new("c1", "s1").with_token_count(300));
        let mut monitor = monitor_with(&feed);

        monitor.observe(Some("c1".into()));
        assert_eq!(monitor.summary().unwrap().total_tokens, 300);
        assert!(monitor.display().is_none());
    }

    #[test]
    fn test_observe_fetches_and_subscribes_once() {
        let mut feed = MockMessageFeed::new();
        feed.expect_messages()
            .with(eq(ConversationId::from("c1")))
            .times(1)
            .returning(|_| {
                vec![Message::new("c1", "a1").with_model("claude-3-haiku").with_usage(400_000, 400_000)]
            });
        feed.expect_subscribe()
            .with(eq(ConversationId::from("c1")), always())
            .times(1)
            .returning(|_, _| Subscription::noop());

        let mut monitor = CostMonitor::new(Rc::new(feed), PricingTable::builtin(), 1);
        monitor.observe(Some("c1".into()));

        let display = monitor.display().unwrap();
        assert_eq!(display.formatted_cost, "$1.00");
        assert_eq!(display.primary_model, "claude-3-haiku");
    }

    #[test]
    fn test_previous_subscription_cancelled_before_resubscribe() {
        let cancelled = Rc::new(Cell::new(0));
        let captured: Rc<RefCell<Vec<FeedCallback>>> = Rc::new(RefCell::new(Vec::new()));

        let mut feed = MockMessageFeed::new();
        feed.expect_messages().returning(|_| Vec::new());
        let counter = Rc::clone(&cancelled);
        let slot = Rc::clone(&captured);
        feed.expect_subscribe().times(2).returning_st(move |_, callback| {
            slot.borrow_mut().push(callback);
            let counter = Rc::clone(&counter);
            Subscription::new(move || counter.set(counter.get() + 1))
        });

        let mut monitor = CostMonitor::new(Rc::new(feed), PricingTable::builtin(), 1);
        monitor.observe(Some("c1".into()));
        assert_eq!(cancelled.get(), 0);
        monitor.observe(Some("c2".into()));
        assert_eq!(cancelled.get(), 1);

        // A late notification through the torn-down c1 callback must not leak into c2
        assert_eq!(captured.borrow().len(), 2);
        let mut c1_callback = captured.borrow_mut().remove(0);
        c1_callback(
            &ConversationId::from("c1"),
            &[Message::new("c1", "a1").with_model("gpt-4").with_token_count(1000)],
        );
        assert!(monitor.summary().is_none());

        monitor.observe(None);
        assert_eq!(cancelled.get(), 2);
    }
}
