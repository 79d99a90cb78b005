pub mod format;

use crate::domain::contract::{PortfolioResponse, Row};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

pub use format::{render_std, title_for_key, FieldFormat};

const RISK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub title: String,
    pub format: FieldFormat,
}

impl Column {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title_for_key(key),
            format: FieldFormat::for_key(key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    SchemaMismatch {
        row: usize,
        missing: Vec<String>,
        extra: Vec<String>,
    },
    NonNumeric {
        row: usize,
        field: String,
    },
}

impl fmt::Display for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch { row, missing, extra } => write!(
                f,
                "optimizer row {row} does not match the result schema \
                 (missing={missing:?}, extra={extra:?})"
            ),
            Self::NonNumeric { row, field } => {
                write!(f, "optimizer row {row}: field {field} must be numeric")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

/// Declared column set. Every row must carry exactly these keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSchema {
    pub columns: Vec<Column>,
}

impl ResultSchema {
    pub fn declared(keys: &[&str]) -> Self {
        Self {
            columns: keys.iter().map(|k| Column::new(k)).collect(),
        }
    }

    /// Columns in the key order of an example row.
    pub fn discover(example: &Row) -> Self {
        Self {
            columns: example.keys().map(|k| Column::new(k)).collect(),
        }
    }

    pub fn check_row(&self, index: usize, row: &Row) -> Result<(), ProjectionError> {
        let expected: BTreeSet<&str> = self.columns.iter().map(|c| c.key.as_str()).collect();
        let actual: BTreeSet<&str> = row.keys().map(String::as_str).collect();
        if expected == actual {
            return Ok(());
        }

        Err(ProjectionError::SchemaMismatch {
            row: index,
            missing: expected.difference(&actual).map(|s| s.to_string()).collect(),
            extra: actual.difference(&expected).map(|s| s.to_string()).collect(),
        })
    }

    fn weight_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case("weight"))
            .or_else(|| self.columns.iter().find(|c| c.format == FieldFormat::Weight))
    }

    fn expected_return_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.key.to_ascii_lowercase().contains("expected_return"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

/// Formats rows against a schema discovered from the first row. Rows whose key set
/// differs are a contract violation.
pub fn project(rows: &[Row]) -> Result<Projection, ProjectionError> {
    let Some(first) = rows.first() else {
        return Ok(Projection::default());
    };
    project_with(&ResultSchema::discover(first), rows)
}

pub fn project_with(schema: &ResultSchema, rows: &[Row]) -> Result<Projection, ProjectionError> {
    let mut formatted = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        schema.check_row(i, row)?;
        formatted.push(
            schema
                .columns
                .iter()
                .map(|c| c.format.render(row.get(&c.key)))
                .collect(),
        );
    }

    Ok(Projection {
        columns: schema.columns.clone(),
        rows: formatted,
    })
}

/// Σ weight × expected return, as a percentage. `None` when either column is absent.
pub fn expected_return_percent(
    schema: &ResultSchema,
    rows: &[Row],
) -> Result<Option<f64>, ProjectionError> {
    let (Some(weight), Some(ret)) = (schema.weight_column(), schema.expected_return_column())
    else {
        return Ok(None);
    };

    let mut total = 0.0;
    for (i, row) in rows.iter().enumerate() {
        total += numeric_cell(i, row, &weight.key)? * numeric_cell(i, row, &ret.key)?;
    }
    Ok(Some(total * 100.0))
}

fn numeric_cell(row_index: usize, row: &Row, key: &str) -> Result<f64, ProjectionError> {
    row.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ProjectionError::NonNumeric {
            row: row_index,
            field: key.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAdjustment {
    /// `None` for minimize-risk requests, which carry no target.
    pub requested_percent: Option<f64>,
    /// What the optimizer actually solved for; this is the value to display.
    pub returned_percent: Option<f64>,
    pub adjusted: bool,
}

impl RiskAdjustment {
    /// Only a requested target can be adjusted. Without one the optimizer's risk
    /// flag is ignored.
    pub fn detect(requested_percent: Option<f64>, response: &PortfolioResponse) -> Self {
        let Some(requested) = requested_percent else {
            return Self {
                requested_percent: None,
                returned_percent: response.risk_target_percent,
                adjusted: false,
            };
        };

        let returned = response.risk_target_percent.unwrap_or(requested);
        let differs = (returned - requested).abs() > RISK_EPSILON;
        Self {
            requested_percent: Some(requested),
            returned_percent: Some(returned),
            adjusted: differs || response.risk_adjusted.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPortfolio {
    pub schema: ResultSchema,
    pub table: Projection,
    pub portfolio_std: Option<f64>,
    pub portfolio_std_display: String,
    pub expected_return_percent: Option<f64>,
    pub risk: RiskAdjustment,
    pub received_at: DateTime<Utc>,
}

pub fn project_response(
    requested_risk_percent: Option<f64>,
    response: &PortfolioResponse,
) -> Result<ProjectedPortfolio, ProjectionError> {
    let schema = response
        .rows
        .first()
        .map(ResultSchema::discover)
        .unwrap_or_default();
    let table = project_with(&schema, &response.rows)?;
    let expected_return_percent = expected_return_percent(&schema, &response.rows)?;
    let risk = RiskAdjustment::detect(requested_risk_percent, response);

    if risk.adjusted {
        tracing::info!(
            requested = ?risk.requested_percent,
            returned = ?risk.returned_percent,
            "optimizer substituted the requested risk level"
        );
    }

    Ok(ProjectedPortfolio {
        schema,
        table,
        portfolio_std: response.portfolio_std,
        portfolio_std_display: render_std(response.portfolio_std),
        expected_return_percent,
        risk,
        received_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(v: Value) -> Vec<Row> {
        serde_json::from_value(v).unwrap()
    }

    fn response(v: Value) -> PortfolioResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn projects_rows_in_first_row_key_order() {
        let r = rows(json!([
            {"symbol": "AMZN", "weight": 0.1234, "investment": 1234.5, "expected_return": 0.1},
            {"symbol": "NVO", "weight": 0.8766, "investment": 8765.5, "expected_return": null}
        ]));
        let p = project(&r).unwrap();

        let titles: Vec<&str> = p.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Symbol", "Weight", "Investment", "Expected Return"]);
        assert_eq!(p.rows[0], vec!["AMZN", "12.34%", "$1234.50", "10.00%"]);
        assert_eq!(p.rows[1][3], "N/A");
    }

    #[test]
    fn diverging_rows_are_a_contract_error() {
        let r = rows(json!([
            {"symbol": "AMZN", "weight": 0.5},
            {"symbol": "NVO", "weight": 0.5, "sector": "Health"}
        ]));
        assert_eq!(
            project(&r),
            Err(ProjectionError::SchemaMismatch {
                row: 1,
                missing: vec![],
                extra: vec!["sector".to_string()],
            })
        );

        let r = rows(json!([
            {"symbol": "AMZN", "weight": 0.5},
            {"symbol": "NVO"}
        ]));
        assert!(matches!(
            project(&r),
            Err(ProjectionError::SchemaMismatch { row: 1, .. })
        ));
    }

    #[test]
    fn declared_schema_rejects_unexpected_first_row() {
        let schema = ResultSchema::declared(&["symbol", "weight", "investment", "expected_return"]);
        let r = rows(json!([{"symbol": "AMZN", "weight": 1.0}]));
        assert!(project_with(&schema, &r).is_err());
    }

    #[test]
    fn empty_rows_project_to_nothing() {
        let p = project(&[]).unwrap();
        assert!(p.columns.is_empty());
        assert!(p.rows.is_empty());
    }

    #[test]
    fn expected_return_is_weighted_locally() {
        let resp = response(json!({
            "portfolio": [
                {"symbol": "AMZN", "weight": 0.6, "investment": 3000.0,
                 "average_expected_return": 0.10},
                {"symbol": "NVO", "weight": 0.4, "investment": 2000.0,
                 "average_expected_return": 0.05}
            ],
            "portfolio_std": 0.0151234,
            "risk_percentage": 25.0
        }));
        let projected = project_response(Some(25.0), &resp).unwrap();
        let er = projected.expected_return_percent.unwrap();
        assert!((er - 8.0).abs() < 1e-9);
        assert_eq!(projected.portfolio_std_display, "0.015123");
        assert!(!projected.risk.adjusted);
    }

    #[test]
    fn expected_return_absent_without_columns() {
        let resp = response(json!({
            "portfolio": [{"symbol": "AMZN", "weight": 1.0}],
            "portfolio_std": null,
            "risk_percentage": 5.0
        }));
        let projected = project_response(Some(5.0), &resp).unwrap();
        assert_eq!(projected.expected_return_percent, None);
        assert_eq!(projected.portfolio_std_display, "N/A");
    }

    #[test]
    fn non_numeric_weight_breaks_the_aggregate() {
        let resp = response(json!({
            "portfolio": [{"symbol": "AMZN", "weight": "heavy", "expected_return": 0.1}],
            "risk_percentage": 5.0
        }));
        assert_eq!(
            project_response(Some(5.0), &resp),
            Err(ProjectionError::NonNumeric {
                row: 0,
                field: "weight".to_string()
            })
        );
    }

    #[test]
    fn surfaces_substituted_risk_level() {
        let resp = response(json!({
            "portfolio": [{"symbol": "AMZN", "weight": 1.0}],
            "portfolio_std": 0.02,
            "risk_percentage": 31.4
        }));
        let projected = project_response(Some(10.0), &resp).unwrap();
        assert!(projected.risk.adjusted);
        assert_eq!(projected.risk.returned_percent, Some(31.4));
        assert_eq!(projected.risk.requested_percent, Some(10.0));
    }

    #[test]
    fn minimize_risk_results_are_never_adjusted() {
        let resp = response(json!({
            "portfolio": [{"symbol": "AMZN", "weight": 1.0}],
            "portfolio_std": 0.02,
            "risk_percentage": 30.2,
            "risk_adjusted": true
        }));
        let risk = project_response(None, &resp).unwrap().risk;
        assert!(!risk.adjusted);
        assert_eq!(risk.requested_percent, None);
        assert_eq!(risk.returned_percent, Some(30.2));
    }

    #[test]
    fn optimizer_flag_alone_marks_adjustment() {
        let resp = response(json!({
            "portfolio": [],
            "risk_percentage": 10.0,
            "risk_adjusted": true
        }));
        assert!(project_response(Some(10.0), &resp).unwrap().risk.adjusted);
    }
}
