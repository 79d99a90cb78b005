use crate::allocation::AllocationState;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MIN_RISK_PERCENT: f64 = 1.0;
pub const MAX_RISK_PERCENT: f64 = 100.0;

// Target portfolio standard deviation band the optimizer maps risk targets onto.
pub const MIN_TARGET_STD: f64 = 0.003;
pub const MAX_TARGET_STD: f64 = 0.060;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MinimizeRisk,
    MaximizeReturn,
}

impl Objective {
    pub fn wire_code(self) -> &'static str {
        match self {
            Self::MinimizeRisk => "min",
            Self::MaximizeReturn => "max",
        }
    }

    pub fn from_wire_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "min" | "minimize_risk" => Some(Self::MinimizeRisk),
            "max" | "maximize_return" => Some(Self::MaximizeReturn),
            _ => None,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinimizeRisk => f.write_str("minimize risk"),
            Self::MaximizeReturn => f.write_str("maximize return"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub symbol: String,
    pub minimum_weight_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub objective: Objective,
    /// Only carried for `MaximizeReturn`.
    pub risk_target_percent: Option<f64>,
    pub asset_count: usize,
    pub investable_cash: f64,
    pub allocations: Vec<AllocationEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingObjective,
    MissingRiskTarget,
    RiskTargetOutOfRange(f64),
    InvalidInvestableCash(f64),
    UnresolvedSlot { index: usize },
    NoAssets,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingObjective => f.write_str("portfolio objective is required"),
            Self::MissingRiskTarget => {
                f.write_str("risk target is required when maximizing return")
            }
            Self::RiskTargetOutOfRange(v) => write!(
                f,
                "risk target must be between {MIN_RISK_PERCENT} and {MAX_RISK_PERCENT} (got {v})"
            ),
            Self::InvalidInvestableCash(v) => {
                write!(f, "investable cash must be a non-negative amount (got {v})")
            }
            Self::UnresolvedSlot { index } => write!(f, "slot {index} has no symbol selected"),
            Self::NoAssets => f.write_str("at least one asset must be selected"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates inputs in a fixed order and assembles the optimizer request.
/// No value is coerced: the first violated rule is returned.
pub fn build(
    objective: Option<Objective>,
    risk_target_percent: Option<f64>,
    allocation: &AllocationState,
    investable_cash: f64,
) -> Result<PortfolioRequest, ValidationError> {
    let objective = objective.ok_or(ValidationError::MissingObjective)?;

    let risk_target_percent = match objective {
        Objective::MaximizeReturn => {
            let v = risk_target_percent.ok_or(ValidationError::MissingRiskTarget)?;
            if !(MIN_RISK_PERCENT..=MAX_RISK_PERCENT).contains(&v) {
                return Err(ValidationError::RiskTargetOutOfRange(v));
            }
            Some(v)
        }
        Objective::MinimizeRisk => None,
    };

    if !investable_cash.is_finite() || investable_cash < 0.0 {
        return Err(ValidationError::InvalidInvestableCash(investable_cash));
    }

    let mut allocations = Vec::with_capacity(allocation.asset_count());
    for slot in allocation.slots() {
        let symbol = slot
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::UnresolvedSlot { index: slot.index })?;
        allocations.push(AllocationEntry {
            symbol: symbol.to_string(),
            minimum_weight_percent: slot.minimum_weight_percent,
        });
    }

    if allocations.is_empty() {
        return Err(ValidationError::NoAssets);
    }

    Ok(PortfolioRequest {
        objective,
        risk_target_percent,
        asset_count: allocation.asset_count(),
        investable_cash,
        allocations,
    })
}

/// Linear map of a 1..=100 risk target onto the optimizer's standard-deviation band.
pub fn target_std_for_risk(risk_percent: f64) -> f64 {
    MIN_TARGET_STD
        + (risk_percent - MIN_RISK_PERCENT) * (MAX_TARGET_STD - MIN_TARGET_STD)
            / (MAX_RISK_PERCENT - MIN_RISK_PERCENT)
}

pub fn risk_for_target_std(target_std: f64) -> f64 {
    MIN_RISK_PERCENT
        + (target_std - MIN_TARGET_STD) * (MAX_RISK_PERCENT - MIN_RISK_PERCENT)
            / (MAX_TARGET_STD - MIN_TARGET_STD)
}
