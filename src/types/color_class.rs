use super::cost::Cost;
use colored::{ColoredString, Colorize};
use std::fmt;

/// Severity bucket for a conversation's running cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorClass {
    /// Below one cent
    Neutral,
    /// One cent up to ten cents
    Caution,
    /// Ten cents up to one dollar
    Warning,
    /// One dollar or more
    Alert,
}

impl ColorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorClass::Neutral => "neutral",
            ColorClass::Caution => "caution",
            ColorClass::Warning => "warning",
            ColorClass::Alert => "alert",
        }
    }

    /// Paint `text` for terminal output in this class's color
    pub fn paint(&self, text: &str) -> ColoredString {
        match self {
            ColorClass::Neutral => text.dimmed(),
            ColorClass::Caution => text.green(),
            ColorClass::Warning => text.yellow(),
            ColorClass::Alert => text.red().bold(),
        }
    }
}

impl From<Cost> for ColorClass {
    fn from(cost: Cost) -> Self {
        let value = cost.value();
        if value < 0.01 {
            ColorClass::Neutral
        } else if value < 0.1 {
            ColorClass::Caution
        } else if value < 1.0 {
            ColorClass::Warning
        } else {
            ColorClass::Alert
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
