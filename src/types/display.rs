use super::color_class::ColorClass;
use super::cost::Cost;
use super::summary::CostSummary;
use crate::formatting::{format_local_time, format_number_with_commas};
use chrono::{DateTime, Utc};
use colored::ColoredString;
use std::fmt;

/// What the presentation layer renders for a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct CostDisplay {
    pub formatted_cost: String,
    pub raw_cost: Cost,
    pub primary_model: String,
    pub total_tokens: u64,
    pub last_updated: DateTime<Utc>,
    pub color_class: ColorClass,
}

impl CostDisplay {
    /// Build the display record, or None while there is nothing to show
    /// (no messages yet, or nothing has cost anything)
    pub fn from_summary(summary: Option<CostSummary>) -> Option<Self> {
        let summary = summary?;
        if summary.total_cost.is_zero() {
            return None;
        }
        Some(Self {
            formatted_cost: summary.total_cost.to_formatted_string(),
            raw_cost: summary.total_cost,
            color_class: summary.total_cost.color_class(),
            primary_model: summary.primary_model,
            total_tokens: summary.total_tokens,
            last_updated: summary.last_updated,
        })
    }

    /// Hover text, e.g. "Cost: $0.010 | Model: gpt-4o | Tokens: 1,000 | Updated: 3:07:42 PM"
    pub fn tooltip(&self) -> String {
        format!(
            "Cost: {} | Model: {} | Tokens: {} | Updated: {}",
            self.formatted_cost,
            self.primary_model,
            format_number_with_commas(self.total_tokens),
            format_local_time(&self.last_updated)
        )
    }

    /// Formatted cost painted by color class for terminal output
    pub fn to_colored_string(&self) -> ColoredString {
        self.color_class.paint(&self.formatted_cost)
    }
}

impl fmt::Display for CostDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted_cost)
    }
}
