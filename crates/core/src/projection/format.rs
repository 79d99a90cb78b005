use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MISSING: &str = "N/A";

/// Display rule picked from a field name. First match wins, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    Weight,
    Currency,
    StdDev,
    ExpectedReturn,
    Decimal,
}

impl FieldFormat {
    pub fn for_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        if key.contains("weight") {
            Self::Weight
        } else if key.contains("investment") {
            Self::Currency
        } else if key.contains("std") {
            Self::StdDev
        } else if key.contains("expected_return") {
            Self::ExpectedReturn
        } else {
            Self::Decimal
        }
    }

    pub fn render_number(self, v: f64) -> String {
        match self {
            Self::Weight | Self::ExpectedReturn => format!("{:.2}%", v * 100.0),
            Self::Currency => format!("${v:.2}"),
            Self::StdDev => format!("{v:.6}"),
            Self::Decimal => format!("{v:.4}"),
        }
    }

    /// Numbers are formatted, text passes through, null becomes `N/A`.
    pub fn render(self, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => MISSING.to_string(),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(v) => self.render_number(v),
                None => n.to_string(),
            },
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// `expected_return` -> `Expected Return`.
pub fn title_for_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_std(std: Option<f64>) -> String {
    match std {
        Some(v) => FieldFormat::StdDev.render_number(v),
        None => MISSING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_format_by_first_matching_name() {
        assert_eq!(FieldFormat::for_key("weight"), FieldFormat::Weight);
        assert_eq!(FieldFormat::for_key("Min_Weight"), FieldFormat::Weight);
        assert_eq!(FieldFormat::for_key("investment"), FieldFormat::Currency);
        assert_eq!(FieldFormat::for_key("portfolio_std"), FieldFormat::StdDev);
        assert_eq!(
            FieldFormat::for_key("average_expected_return"),
            FieldFormat::ExpectedReturn
        );
        assert_eq!(FieldFormat::for_key("sharpe"), FieldFormat::Decimal);
        assert_eq!(FieldFormat::for_key("standard_deviation"), FieldFormat::Decimal);
    }

    #[test]
    fn renders_reference_values() {
        assert_eq!(FieldFormat::Weight.render(Some(&json!(0.1234))), "12.34%");
        assert_eq!(FieldFormat::Currency.render(Some(&json!(1234.5))), "$1234.50");
        assert_eq!(FieldFormat::StdDev.render(Some(&json!(0.000123456))), "0.000123");
        assert_eq!(
            FieldFormat::ExpectedReturn.render(Some(&json!(0.0875))),
            "8.75%"
        );
        assert_eq!(FieldFormat::Decimal.render(Some(&json!(2))), "2.0000");
    }

    #[test]
    fn passes_text_through_and_marks_missing() {
        assert_eq!(FieldFormat::Weight.render(Some(&json!("AMZN"))), "AMZN");
        assert_eq!(FieldFormat::Currency.render(Some(&Value::Null)), "N/A");
        assert_eq!(FieldFormat::Decimal.render(None), "N/A");
        assert_eq!(render_std(None), "N/A");
    }

    #[test]
    fn titles_are_capitalised_words() {
        assert_eq!(title_for_key("expected_return"), "Expected Return");
        assert_eq!(title_for_key("symbol"), "Symbol");
    }
}
