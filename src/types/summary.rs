use super::cost::Cost;
use chrono::{DateTime, Utc};

/// Result of one aggregation pass over a conversation snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CostSummary {
    pub total_cost: Cost,
    pub total_tokens: u64,
    /// Model with the largest accrued cost, or "Unknown"
    pub primary_model: String,
    pub last_updated: DateTime<Utc>,
}
