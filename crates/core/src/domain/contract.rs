//! Wire shapes of the external optimizer service.

use crate::domain::request::{AllocationEntry, Objective, PortfolioRequest};
use anyhow::{bail, ensure};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// `risk_percentage` sent with minimize-risk requests (the optimizer still reads it).
pub const DEFAULT_RISK_PERCENT: f64 = 5.0;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadRequest {
    pub risk_percentage: f64,
    pub amount_of_stocks: usize,
    pub money_to_invest: f64,
    pub selected_stocks: Vec<SelectedStock>,
    pub portfolio_target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedStock {
    pub name: String,
    pub minimum_weight: u32,
}

impl From<&PortfolioRequest> for SpreadRequest {
    fn from(req: &PortfolioRequest) -> Self {
        Self {
            risk_percentage: req.risk_target_percent.unwrap_or(DEFAULT_RISK_PERCENT),
            amount_of_stocks: req.asset_count,
            money_to_invest: req.investable_cash,
            selected_stocks: req
                .allocations
                .iter()
                .map(|a| SelectedStock {
                    name: a.symbol.clone(),
                    minimum_weight: a.minimum_weight_percent,
                })
                .collect(),
            portfolio_target: req.objective.wire_code().to_string(),
        }
    }
}

impl SpreadRequest {
    pub fn into_portfolio_request(self) -> anyhow::Result<PortfolioRequest> {
        let Some(objective) = Objective::from_wire_code(&self.portfolio_target) else {
            bail!("unknown portfolio_target: {:?}", self.portfolio_target);
        };
        ensure!(
            self.amount_of_stocks == self.selected_stocks.len(),
            "amount_of_stocks={} but {} selected_stocks",
            self.amount_of_stocks,
            self.selected_stocks.len()
        );

        let risk_target_percent = match objective {
            Objective::MaximizeReturn => Some(self.risk_percentage),
            Objective::MinimizeRisk => None,
        };

        Ok(PortfolioRequest {
            objective,
            risk_target_percent,
            asset_count: self.amount_of_stocks,
            investable_cash: self.money_to_invest,
            allocations: self
                .selected_stocks
                .into_iter()
                .map(|s| AllocationEntry {
                    symbol: s.name,
                    minimum_weight_percent: s.minimum_weight,
                })
                .collect(),
        })
    }
}

/// Optimizer answer. Row fields are not declared up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioResponse {
    #[serde(rename = "portfolio")]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub portfolio_std: Option<f64>,
    #[serde(rename = "risk_percentage", default)]
    pub risk_target_percent: Option<f64>,
    #[serde(default)]
    pub risk_adjusted: Option<bool>,
}

impl PortfolioResponse {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(std) = self.portfolio_std {
            ensure!(
                std.is_finite() && std >= 0.0,
                "portfolio_std must be a non-negative number (got {std})"
            );
        }
        if let Some(risk) = self.risk_target_percent {
            ensure!(risk.is_finite(), "risk_percentage must be finite (got {risk})");
        }
        Ok(())
    }
}

/// Reference data row from `GetAllStocksData`. The source sheet fills blanks with 0,
/// so text columns accept numbers too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(deserialize_with = "lenient_text")]
    pub symbol: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub share: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub profile: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub upcoming_events: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub standard_deviation: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub average_annual_life_expectancy: f64,
}

impl StockRecord {
    pub fn display_name(&self) -> &str {
        if self.share.trim().is_empty() {
            &self.symbol
        } else {
            &self.share
        }
    }
}

/// Drops rows without a usable symbol.
pub fn validate_stock_records(records: Vec<StockRecord>) -> Vec<StockRecord> {
    let total = records.len();
    let out: Vec<StockRecord> = records
        .into_iter()
        .filter(|r| !r.symbol.trim().is_empty() && r.symbol != "0")
        .collect();
    if out.len() != total {
        tracing::warn!(
            dropped = total - out.len(),
            "stock reference rows without a symbol were ignored"
        );
    }
    out
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        other => other.to_string(),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationState;
    use crate::domain::request::build;
    use serde_json::json;

    #[test]
    fn request_round_trips_through_wire_format() {
        let mut state = AllocationState::with_asset_count(3).unwrap();
        for (i, (sym, w)) in [("AMZN", 30), ("NVO", 25), ("MSFT", 0)].iter().enumerate() {
            state.set_slot_symbol(i, sym).unwrap();
            state.set_slot_minimum_weight(i, *w).unwrap();
        }

        for (objective, risk) in [
            (Objective::MaximizeReturn, Some(42.0)),
            (Objective::MinimizeRisk, None),
        ] {
            let req = build(Some(objective), risk, &state, 5000.0).unwrap();
            let body = serde_json::to_string(&SpreadRequest::from(&req)).unwrap();
            let parsed: SpreadRequest = serde_json::from_str(&body).unwrap();
            let back = parsed.into_portfolio_request().unwrap();

            assert_eq!(back.allocations, req.allocations);
            assert_eq!(back.risk_target_percent, req.risk_target_percent);
            assert_eq!(back, req);
        }
    }

    #[test]
    fn wire_request_uses_optimizer_field_names() {
        let mut state = AllocationState::with_asset_count(1).unwrap();
        state.set_slot_symbol(0, "AMZN").unwrap();
        state.set_slot_minimum_weight(0, 15).unwrap();
        let req = build(Some(Objective::MinimizeRisk), None, &state, 1000.0).unwrap();

        let v = serde_json::to_value(SpreadRequest::from(&req)).unwrap();
        assert_eq!(
            v,
            json!({
                "risk_percentage": 5.0,
                "amount_of_stocks": 1,
                "money_to_invest": 1000.0,
                "selected_stocks": [{"name": "AMZN", "minimum_weight": 15}],
                "portfolio_target": "min",
            })
        );
    }

    #[test]
    fn rejects_unknown_target_code() {
        let req = SpreadRequest {
            risk_percentage: 5.0,
            amount_of_stocks: 0,
            money_to_invest: 0.0,
            selected_stocks: vec![],
            portfolio_target: "balanced".to_string(),
        };
        assert!(req.into_portfolio_request().is_err());
    }

    #[test]
    fn parses_optimizer_response() {
        let v = json!({
            "portfolio": [
                {"symbol": "AMZN", "weight": 0.6, "investment": 3000.0, "expected_return": 0.12},
                {"symbol": "NVO", "weight": 0.4, "investment": 2000.0, "expected_return": 0.08}
            ],
            "portfolio_std": 0.0123,
            "risk_percentage": 25.0,
            "risk_adjusted": false
        });
        let resp: PortfolioResponse = serde_json::from_value(v).unwrap();
        resp.validate().unwrap();
        assert_eq!(resp.rows.len(), 2);
        assert_eq!(resp.risk_target_percent, Some(25.0));
        let keys: Vec<&str> = resp.rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["symbol", "weight", "investment", "expected_return"]);
    }

    #[test]
    fn tolerates_null_std_and_missing_flag() {
        let v = json!({"portfolio": [], "portfolio_std": null, "risk_percentage": 5});
        let resp: PortfolioResponse = serde_json::from_value(v).unwrap();
        assert_eq!(resp.portfolio_std, None);
        assert_eq!(resp.risk_adjusted, None);
    }

    #[test]
    fn stock_records_accept_zero_filled_blanks() {
        let v = json!([
            {
                "symbol": "AMZN",
                "share": "Amazon.com Inc",
                "profile": 0,
                "upcoming_events": "Earnings 2026-10-30",
                "standard_deviation": 0.021,
                "average_annual_life_expectancy": 0.14,
                "sector": "Consumer"
            },
            {"symbol": 0, "share": 0}
        ]);
        let records: Vec<StockRecord> = serde_json::from_value(v).unwrap();
        assert_eq!(records[0].profile, "");
        assert_eq!(records[0].display_name(), "Amazon.com Inc");

        let kept = validate_stock_records(records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].symbol, "AMZN");
    }
}
