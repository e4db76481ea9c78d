use crate::constants::{ESTIMATE_DISCOUNT, UNKNOWN_MODEL, USER_DEFAULT_MODEL};
use crate::pricing::PricingTable;
use crate::types::{Cost, CostSummary, Message};
use chrono::Utc;
use tracing::debug;

/// Cost accrued per explicit model name, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCosts(Vec<(String, Cost)>);

impl ModelCosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, model: &str, cost: Cost) {
        match self.0.iter_mut().find(|(name, _)| name == model) {
            Some((_, total)) => *total += cost,
            None => self.0.push((model.to_string(), cost)),
        }
    }

    pub fn get(&self, model: &str) -> Option<Cost> {
        self.0
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, cost)| *cost)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cost)> {
        self.0.iter().map(|(name, cost)| (name.as_str(), *cost))
    }
}

/// Model with the highest accrued cost; the earliest one wins a tie
pub fn primary_model(costs: &ModelCosts) -> String {
    costs
        .iter()
        .fold(None::<(&str, Cost)>, |best, (name, cost)| match best {
            Some((_, best_cost)) if cost <= best_cost => best,
            _ => Some((name, cost)),
        })
        .map_or_else(|| UNKNOWN_MODEL.to_string(), |(name, _)| name.to_string())
}

/// Fold a conversation snapshot into a cost summary.
///
/// Returns None for an empty snapshot. Every call starts from scratch;
/// nothing carries over between calls.
pub fn aggregate(messages: &[Message], pricing: &PricingTable) -> Option<CostSummary> {
    if messages.is_empty() {
        return None;
    }

    // Conversation-wide fallback for messages that carry no model of their own
    let fallback_model = messages.iter().find_map(|m| m.model.as_deref());

    let mut total_cost = Cost::default();
    let mut total_tokens = 0u64;
    let mut model_costs = ModelCosts::new();

    for message in messages {
        let tokens = message.token_count();
        if tokens.count == 0 {
            continue;
        }
        total_tokens = total_tokens.saturating_add(tokens.count);

        let effective_model = message.model.as_deref().or(fallback_model);
        if effective_model.is_none() && !message.is_created_by_user {
            continue;
        }

        let price = pricing.resolve_price(Some(effective_model.unwrap_or(USER_DEFAULT_MODEL)));
        let billable = if tokens.is_estimated {
            tokens.count as f64 * ESTIMATE_DISCOUNT
        } else {
            tokens.count as f64
        };
        let message_cost = Cost::from_tokens(billable, price);
        total_cost += message_cost;

        if let Some(model) = &message.model {
            model_costs.add(model, message_cost);
        }
    }

    let primary_model = primary_model(&model_costs);
    debug!(
        messages = messages.len(),
        total_tokens,
        total_cost = total_cost.value(),
        primary_model = %primary_model,
        "aggregated conversation cost"
    );

    Some(CostSummary {
        total_cost,
        total_tokens,
        primary_model,
        last_updated: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_empty_snapshot_is_none() {
        assert!(aggregate(&[], &PricingTable::builtin()).is_none());
    }

    #[test]
    fn test_user_text_priced_at_default_model_with_discount() {
        let messages = vec![Message::new("c1", "m1").from_user().with_text("x".repeat(40))];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();

        assert_eq!(summary.total_tokens, 10);
        let expected = (0.85 * 10.0 / 1_000_000.0) * 2.0;
        assert!(approx(summary.total_cost.value(), expected));
        assert_eq!(summary.primary_model, "Unknown");
    }

    #[test]
    fn test_exact_count_with_model() {
        let messages = vec![
            Message::new("c1", "m1")
                .with_model("gpt-4o")
                .with_token_count(1000),
        ];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();

        assert_eq!(summary.total_tokens, 1000);
        assert!(approx(summary.total_cost.value(), 0.01));
        assert_eq!(summary.primary_model, "gpt-4o");
    }

    #[test]
    fn test_zero_token_messages_are_skipped() {
        let messages = vec![
            Message::new("c1", "m1").with_model("gpt-4").with_token_count(0),
            Message::new("c1", "m2").with_model("gpt-4"),
        ];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();
        assert_eq!(summary.total_tokens, 0);
        assert!(summary.total_cost.is_zero());
        assert_eq!(summary.primary_model, "Unknown");
    }

    #[test]
    fn test_message_without_model_or_user_counts_tokens_only() {
        let messages = vec![Message::new("c1", "m1").with_token_count(500)];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();
        assert_eq!(summary.total_tokens, 500);
        assert!(summary.total_cost.is_zero());
    }

    #[test]
    fn test_fallback_model_prices_but_does_not_attribute() {
        let messages = vec![
            Message::new("c1", "u1").from_user().with_token_count(1000),
            Message::new("c1", "a1")
                .with_model("gpt-4")
                .with_token_count(1000),
            // Streaming reply with no model yet, priced at the conversation's model
            Message::new("c1", "a2").with_text("y".repeat(400)),
        ];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();

        assert_eq!(summary.total_tokens, 2100);
        let expected = 0.06 + 0.06 + (100.0 * 0.85 / 1_000_000.0) * 60.0;
        assert!(approx(summary.total_cost.value(), expected));
        assert_eq!(summary.primary_model, "gpt-4");
    }

    #[test]
    fn test_primary_model_is_highest_cost() {
        let messages = vec![
            Message::new("c1", "a1")
                .with_model("gpt-4")
                .with_token_count(1000),
            Message::new("c1", "a2")
                .with_model("claude-3-opus")
                .with_token_count(1000),
            Message::new("c1", "a3")
                .with_model("gpt-4")
                .with_token_count(100),
        ];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();
        assert_eq!(summary.primary_model, "claude-3-opus");
    }

    #[test]
    fn test_primary_model_selection() {
        let mut costs = ModelCosts::new();
        costs.add("A", Cost::new(0.05));
        costs.add("B", Cost::new(0.07));
        assert_eq!(primary_model(&costs), "B");

        assert_eq!(primary_model(&ModelCosts::new()), "Unknown");
    }

    #[test]
    fn test_primary_model_tie_keeps_first() {
        let mut costs = ModelCosts::new();
        costs.add("A", Cost::new(0.05));
        costs.add("B", Cost::new(0.05));
        assert_eq!(primary_model(&costs), "A");
    }

    #[test]
    fn test_model_costs_accumulate_per_name() {
        let mut costs = ModelCosts::new();
        costs.add("A", Cost::new(0.5));
        costs.add("A", Cost::new(0.25));
        assert_eq!(costs.get("A"), Some(Cost::new(0.75)));
        assert_eq!(costs.get("B"), None);
    }

    #[test]
    fn test_token_total_saturates() {
        let messages = vec![
            Message::new("c1", "a1")
                .with_model("gpt-4")
                .with_token_count(u64::MAX),
            Message::new("c1", "a2").with_model("gpt-4").with_token_count(1),
        ];
        let summary = aggregate(&messages, &PricingTable::builtin()).unwrap();
        assert_eq!(summary.total_tokens, u64::MAX);
        assert!(summary.total_cost.value().is_finite());
        assert_eq!(summary.primary_model, "gpt-4");
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let messages = vec![
            Message::new("c1", "u1").from_user().with_text("hello there"),
            Message::new("c1", "a1")
                .with_model("claude-3-haiku")
                .with_usage(120, 340),
        ];
        let pricing = PricingTable::builtin();
        let first = aggregate(&messages, &pricing).unwrap();
        let second = aggregate(&messages, &pricing).unwrap();

        assert_eq!(first.total_cost, second.total_cost);
        assert_eq!(first.total_tokens, second.total_tokens);
        assert_eq!(first.primary_model, second.primary_model);
    }
}
