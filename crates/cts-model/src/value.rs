use serde::{Deserialize, Serialize};

/// Why a raw cell produced no number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReason {
    /// The cell was empty or whitespace.
    Empty,
    /// The cell held text that is not a finite number.
    Unparseable,
}

/// Outcome of coercing a raw cell to a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum NumericValue {
    Value(f64),
    Missing(MissingReason),
}

impl NumericValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(*value),
            Self::Missing(_) => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    /// Returns `self` when present, otherwise the value produced by `fallback`.
    pub fn or_else(self, fallback: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Value(_) => self,
            Self::Missing(_) => fallback(),
        }
    }
}

impl From<f64> for NumericValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value)
        } else {
            Self::Missing(MissingReason::Unparseable)
        }
    }
}
