use smartrisk_core::projection::ProjectedPortfolio;
use smartrisk_core::questionnaire::RiskScoreResult;
use std::fmt::Write;

pub fn risk_profile(result: &RiskScoreResult) -> String {
    let mut out = format!("Risk score: {}\n{}", result.total_score, result.band.message());
    if result.skipped {
        out.push_str(" (questionnaire skipped)");
    }
    out
}

/// Plain-text table with left-aligned, padded columns followed by the portfolio summary.
pub fn portfolio(projected: &ProjectedPortfolio) -> String {
    let table = &projected.table;
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.title.len()).collect();
    for row in &table.rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c.title))
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Portfolio std: {}", projected.portfolio_std_display);
    if let Some(er) = projected.expected_return_percent {
        let _ = writeln!(out, "Expected return: {er:.2}%");
    }
    let risk = &projected.risk;
    if let (true, Some(requested), Some(used)) =
        (risk.adjusted, risk.requested_percent, risk.returned_percent)
    {
        let _ = writeln!(
            out,
            "Risk level adjusted by optimizer: requested {requested:.2}%, used {used:.2}%"
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smartrisk_core::projection::project_response;

    #[test]
    fn renders_table_and_summary() {
        let resp = serde_json::from_value(json!({
            "portfolio": [
                {"symbol": "AMZN", "weight": 0.5, "expected_return": 0.1},
                {"symbol": "NVO", "weight": 0.5, "expected_return": 0.2}
            ],
            "portfolio_std": 0.0125,
            "risk_percentage": 12.0
        }))
        .unwrap();
        let projected = project_response(Some(10.0), &resp).unwrap();
        let text = portfolio(&projected);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Symbol  Weight  Expected Return");
        assert_eq!(lines[1], "AMZN    50.00%  10.00%");
        assert!(text.contains("Portfolio std: 0.012500"));
        assert!(text.contains("Expected return: 15.00%"));
        assert!(text.contains("requested 10.00%, used 12.00%"));
    }

    #[test]
    fn minimize_risk_summary_has_no_adjustment_line() {
        let resp = serde_json::from_value(json!({
            "portfolio": [{"symbol": "AMZN", "weight": 1.0}],
            "portfolio_std": 0.02,
            "risk_percentage": 30.2,
            "risk_adjusted": true
        }))
        .unwrap();
        let text = portfolio(&project_response(None, &resp).unwrap());
        assert!(!text.contains("Risk level adjusted"));
    }

    #[test]
    fn marks_skipped_profiles() {
        let text = risk_profile(&RiskScoreResult::skipped());
        assert_eq!(
            text,
            "Risk score: 30\nYou have a balanced risk profile (questionnaire skipped)"
        );
    }
}
