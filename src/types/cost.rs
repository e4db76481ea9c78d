use super::color_class::ColorClass;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A newtype wrapper for cost values in USD
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Cost(f64);

impl Cost {
    /// Create a new Cost from a raw value
    #[inline]
    pub fn new(value: f64) -> Self {
        Cost(value)
    }

    /// Cost of `tokens` at a rate quoted per million tokens
    #[inline]
    pub fn from_tokens(tokens: f64, price_per_million: f64) -> Self {
        Cost((tokens / 1_000_000.0) * price_per_million)
    }

    /// Get the raw value
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// Format as currency string, with more precision for small amounts
    /// (e.g., "$0.00", "<$0.001", "$0.0042", "$0.123", "$12.34")
    pub fn to_formatted_string(&self) -> String {
        let value = self.0;
        if value == 0.0 {
            "$0.00".to_string()
        } else if value < 0.001 {
            "<$0.001".to_string()
        } else if value < 0.01 {
            format!("${:.4}", value)
        } else if value < 1.0 {
            format!("${:.3}", value)
        } else {
            format!("${:.2}", value)
        }
    }

    pub fn color_class(&self) -> ColorClass {
        ColorClass::from(*self)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_formatted_string())
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost(self.0 + rhs.0)
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Cost) {
        self.0 += rhs.0;
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Self {
        iter.fold(Cost::default(), Add::add)
    }
}

impl From<f64> for Cost {
    fn from(value: f64) -> Self {
        Cost(value)
    }
}

impl From<Cost> for f64 {
    fn from(cost: Cost) -> Self {
        cost.0
    }
}
