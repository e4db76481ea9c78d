//! Model price resolution.
//!
//! Free-form model identifiers are mapped onto a canonical pricing key in
//! four steps: exact key match, a case-insensitive substring scan over the
//! table in declaration order, a cascade of provider naming rules, and
//! finally the reserved `default` key.

use crate::constants::DEFAULT_PRICE_KEY;
use crate::error::{CostError, Result};
use serde::Deserialize;
use tracing::debug;

/// One row of the pricing table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingEntry {
    pub model: String,
    pub price_per_million: f64,
}

impl PricingEntry {
    pub fn new(model: impl Into<String>, price_per_million: f64) -> Self {
        Self {
            model: model.into(),
            price_per_million,
        }
    }
}

// Declaration order is the substring scan order, so keys that contain
// other keys come first.
const BUILTIN_PRICES: &[(&str, f64)] = &[
    ("gpt-4o-mini", 0.6),
    ("gpt-4o", 10.0),
    ("gpt-4-turbo", 30.0),
    ("gpt-4-32k", 120.0),
    ("gpt-4", 60.0),
    ("gpt-3.5-turbo-16k", 4.0),
    ("gpt-3.5-turbo", 2.0),
    ("o1-preview", 60.0),
    ("o1-mini", 12.0),
    ("o1", 60.0),
    ("claude-3-5-sonnet", 15.0),
    ("claude-3-opus", 75.0),
    ("claude-3-sonnet", 15.0),
    ("claude-3-haiku", 1.25),
    ("gemini-1.5-pro", 10.5),
    ("gemini-1.5-flash", 0.6),
    ("mistral-large", 6.0),
    (DEFAULT_PRICE_KEY, 10.0),
];

/// Provider naming rule: every group needs at least one pattern present
struct FamilyRule {
    groups: &'static [&'static [&'static str]],
    key: &'static str,
}

impl FamilyRule {
    fn matches(&self, lower: &str) -> bool {
        self.groups
            .iter()
            .all(|group| group.iter().any(|pattern| lower.contains(pattern)))
    }
}

const GPT_35: &[&str] = &["gpt-3.5", "gpt-35"];

// Most specific first: 32k before the bare family, "-5-" before bare
// claude-3, preview/mini before bare o1.
const FAMILY_RULES: &[FamilyRule] = &[
    FamilyRule { groups: &[&["gpt-4"], &["32k"]], key: "gpt-4-32k" },
    FamilyRule { groups: &[&["gpt-4o"], &["mini"]], key: "gpt-4o-mini" },
    FamilyRule { groups: &[&["gpt-4o"]], key: "gpt-4o" },
    FamilyRule { groups: &[&["gpt-4"], &["turbo", "preview"]], key: "gpt-4-turbo" },
    FamilyRule { groups: &[&["gpt-4", "gpt4"]], key: "gpt-4" },
    FamilyRule { groups: &[GPT_35, &["16k"]], key: "gpt-3.5-turbo-16k" },
    FamilyRule { groups: &[GPT_35], key: "gpt-3.5-turbo" },
    FamilyRule { groups: &[&["claude-3"], &["-5-", ".5"]], key: "claude-3-5-sonnet" },
    FamilyRule { groups: &[&["claude-3"], &["opus"]], key: "claude-3-opus" },
    FamilyRule { groups: &[&["claude-3"], &["haiku"]], key: "claude-3-haiku" },
    FamilyRule { groups: &[&["claude"]], key: "claude-3-sonnet" },
    FamilyRule { groups: &[&["o1"], &["preview"]], key: "o1-preview" },
    FamilyRule { groups: &[&["o1"], &["mini"]], key: "o1-mini" },
    FamilyRule { groups: &[&["o1"]], key: "o1" },
    FamilyRule { groups: &[&["gemini"], &["flash"]], key: "gemini-1.5-flash" },
    FamilyRule { groups: &[&["gemini"]], key: "gemini-1.5-pro" },
    FamilyRule { groups: &[&["mistral", "mixtral"]], key: "mistral-large" },
];

/// Ordered mapping from canonical model key to price per million tokens.
/// Always contains the `default` key.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    entries: Vec<PricingEntry>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingTable {
    /// The built-in rates
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_PRICES
                .iter()
                .map(|(model, price)| PricingEntry::new(*model, *price))
                .collect(),
        }
    }

    /// Build a table from explicit entries, in scan order
    pub fn new(entries: Vec<PricingEntry>) -> Result<Self> {
        for entry in &entries {
            validate_price(entry)?;
        }
        if !entries.iter().any(|e| e.model == DEFAULT_PRICE_KEY) {
            return Err(CostError::MissingDefaultPrice {
                key: DEFAULT_PRICE_KEY,
            });
        }
        Ok(Self { entries })
    }

    /// Replace the rate of an existing key in place, or add a new key just
    /// before `default`
    pub fn set(&mut self, entry: PricingEntry) -> Result<()> {
        validate_price(&entry)?;
        if let Some(existing) = self.entries.iter_mut().find(|e| e.model == entry.model) {
            existing.price_per_million = entry.price_per_million;
            return Ok(());
        }
        let position = self
            .entries
            .iter()
            .position(|e| e.model == DEFAULT_PRICE_KEY)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, entry);
        Ok(())
    }

    pub fn entries(&self) -> &[PricingEntry] {
        &self.entries
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.model == key)
            .map(|e| e.price_per_million)
    }

    pub fn default_price(&self) -> f64 {
        self.get(DEFAULT_PRICE_KEY).unwrap_or(0.0)
    }

    /// Map a free-form model identifier onto a canonical pricing key
    pub fn resolve_key<'a>(&'a self, model: Option<&str>) -> &'a str {
        let Some(model) = model.filter(|m| !m.is_empty()) else {
            return DEFAULT_PRICE_KEY;
        };

        if let Some(entry) = self.entries.iter().find(|e| e.model == model) {
            return &entry.model;
        }

        let lower = model.to_lowercase();
        if let Some(entry) = self.entries.iter().find(|e| {
            let key = e.model.to_lowercase();
            lower.contains(&key) || key.contains(&lower)
        }) {
            return &entry.model;
        }

        if let Some(rule) = FAMILY_RULES
            .iter()
            .find(|rule| rule.matches(&lower) && self.get(rule.key).is_some())
        {
            return rule.key;
        }

        debug!(model, "no pricing match, using default rate");
        DEFAULT_PRICE_KEY
    }

    /// Price per million tokens for a free-form model identifier
    pub fn resolve_price(&self, model: Option<&str>) -> f64 {
        let key = self.resolve_key(model);
        self.get(key).unwrap_or_else(|| self.default_price())
    }
}

fn validate_price(entry: &PricingEntry) -> Result<()> {
    if entry.price_per_million.is_finite() && entry.price_per_million >= 0.0 {
        Ok(())
    } else {
        Err(CostError::InvalidPrice {
            model: entry.model.clone(),
            price: entry.price_per_million,
        })
    }
}
