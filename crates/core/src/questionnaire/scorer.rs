use crate::questionnaire::AnswerSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score handed off when the questionnaire is skipped (balanced).
pub const SKIP_SCORE: u32 = 30;

const CADENCE_CAP: f64 = 12.0;
const MONTHS_PER_YEAR: f64 = 12.0;
const CADENCE_SCALE: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskBand {
    VeryConservative,
    Conservative,
    Balanced,
    GrowthOriented,
    Aggressive,
    VeryAggressive,
}

impl RiskBand {
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryConservative => "very conservative",
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::GrowthOriented => "growth-oriented",
            Self::Aggressive => "aggressive",
            Self::VeryAggressive => "very aggressive",
        }
    }

    pub fn message(self) -> String {
        match self {
            Self::Aggressive => "You have an aggressive risk profile".to_string(),
            other => format!("You have a {} risk profile", other.label()),
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScoreResult {
    pub total_score: u32,
    pub band: RiskBand,
    pub skipped: bool,
}

impl RiskScoreResult {
    pub fn from_score(total_score: u32) -> Self {
        Self {
            total_score,
            band: classify(total_score),
            skipped: false,
        }
    }

    pub fn skipped() -> Self {
        Self {
            total_score: SKIP_SCORE,
            band: classify(SKIP_SCORE),
            skipped: true,
        }
    }
}

/// Inclusive upper bounds: 10, 20, 30, 40, 50, then open-ended.
pub fn classify(score: u32) -> RiskBand {
    match score {
        0..=10 => RiskBand::VeryConservative,
        11..=20 => RiskBand::Conservative,
        21..=30 => RiskBand::Balanced,
        31..=40 => RiskBand::GrowthOriented,
        41..=50 => RiskBand::Aggressive,
        _ => RiskBand::VeryAggressive,
    }
}

/// Contribution-intensity sub-score: annual contributions over principal, scaled by 12
/// and capped at 12. Zero when either amount is missing or the principal is zero.
pub fn cadence_score(initial_investment: Option<f64>, monthly_investment: Option<f64>) -> f64 {
    let (Some(initial), Some(monthly)) = (initial_investment, monthly_investment) else {
        return 0.0;
    };
    if !initial.is_finite() || !monthly.is_finite() || initial <= 0.0 || monthly <= 0.0 {
        return 0.0;
    }

    let ratio = monthly * MONTHS_PER_YEAR / initial;
    (ratio * CADENCE_SCALE).min(CADENCE_CAP)
}

/// Rounds once, at the end. Inputs are non-negative so `f64::round` is half-up here.
pub fn compute_score(
    answers: &AnswerSet,
    initial_investment: Option<f64>,
    monthly_investment: Option<f64>,
) -> u32 {
    let choice_sum: u32 = answers.choice_points().sum();
    let total = choice_sum as f64 + cadence_score(initial_investment, monthly_investment);
    total.round() as u32
}
