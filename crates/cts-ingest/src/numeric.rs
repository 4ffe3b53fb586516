use cts_model::{MissingReason, NumericValue};

/// Best-effort numeric coercion of a raw cell.
///
/// Never fails: empty cells and anything that is not a finite number become
/// [`NumericValue::Missing`] with the reason recorded.
///
/// # Examples
///
/// ```
/// use cts_ingest::coerce_numeric;
/// use cts_model::{MissingReason, NumericValue};
///
/// assert_eq!(coerce_numeric(" 5.5 "), NumericValue::Value(5.5));
/// assert_eq!(coerce_numeric(""), NumericValue::Missing(MissingReason::Empty));
/// assert_eq!(coerce_numeric("pos."), NumericValue::Missing(MissingReason::Unparseable));
/// ```
pub fn coerce_numeric(raw: &str) -> NumericValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return NumericValue::Missing(MissingReason::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(value) => NumericValue::from(value),
        Err(_) => NumericValue::Missing(MissingReason::Unparseable),
    }
}

/// Coerces an optional cell; `None` counts as empty.
pub fn coerce_optional(raw: Option<&str>) -> NumericValue {
    raw.map_or(NumericValue::Missing(MissingReason::Empty), coerce_numeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(coerce_numeric("7"), NumericValue::Value(7.0));
        assert_eq!(coerce_numeric("-0.25"), NumericValue::Value(-0.25));
        assert_eq!(coerce_numeric("1e3"), NumericValue::Value(1000.0));
    }

    #[test]
    fn test_non_numeric_is_missing() {
        for raw in ["<0.5", "negativ", "5,5", "n/a"] {
            assert_eq!(
                coerce_numeric(raw),
                NumericValue::Missing(MissingReason::Unparseable),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_non_finite_is_missing() {
        assert!(coerce_numeric("NaN").is_missing());
        assert!(coerce_numeric("inf").is_missing());
    }

    #[test]
    fn test_optional() {
        assert_eq!(
            coerce_optional(None),
            NumericValue::Missing(MissingReason::Empty)
        );
        assert_eq!(coerce_optional(Some("3")), NumericValue::Value(3.0));
    }

    proptest! {
        #[test]
        fn finite_values_survive_formatting(value in -1.0e9f64..1.0e9, pad in "[ \t]{0,3}") {
            let raw = format!("{pad}{value}{pad}");
            prop_assert_eq!(coerce_numeric(&raw), NumericValue::Value(value));
        }
    }
}
