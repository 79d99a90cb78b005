use crate::allocation::{AllocationError, AllocationState};
use crate::domain::contract::{
    PortfolioResponse, SpreadRequest, StockRecord, DEFAULT_RISK_PERCENT,
};
use crate::domain::request::{self, Objective, PortfolioRequest, ValidationError};
use crate::optimizer::OptimizerClient;
use crate::projection::{project_response, ProjectedPortfolio};
use crate::questionnaire::RiskScoreResult;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub request: PortfolioRequest,
    pub wire: SpreadRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Failed,
    /// The ticket was superseded by an input change or is unknown; nothing changed.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    SubmissionInFlight { ticket: Uuid },
    Validation(ValidationError),
    Allocation(AllocationError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmissionInFlight { ticket } => {
                write!(f, "an allocation request is already in flight ({ticket})")
            }
            Self::Validation(e) => write!(f, "invalid allocation request: {e}"),
            Self::Allocation(e) => write!(f, "invalid allocation change: {e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ValidationError> for SessionError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<AllocationError> for SessionError {
    fn from(e: AllocationError) -> Self {
        Self::Allocation(e)
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    id: Uuid,
    requested_risk_percent: Option<f64>,
    superseded: bool,
}

/// State of one user's allocation screen. At most one computation request is
/// outstanding; any input change clears the shown result and supersedes it.
#[derive(Debug, Clone)]
pub struct PortfolioSession {
    allocation: AllocationState,
    objective: Option<Objective>,
    risk_target_percent: Option<f64>,
    investable_cash: f64,
    candidates: Vec<StockRecord>,
    in_flight: Option<InFlight>,
    last_result: Option<ProjectedPortfolio>,
    last_error: Option<String>,
}

impl Default for PortfolioSession {
    fn default() -> Self {
        Self {
            allocation: AllocationState::default(),
            objective: None,
            risk_target_percent: Some(DEFAULT_RISK_PERCENT),
            investable_cash: 0.0,
            candidates: Vec::new(),
            in_flight: None,
            last_result: None,
            last_error: None,
        }
    }
}

impl PortfolioSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the risk target from the questionnaire score.
    pub fn from_risk_profile(profile: &RiskScoreResult) -> Self {
        Self {
            risk_target_percent: Some(f64::from(profile.total_score.clamp(1, 100))),
            ..Self::default()
        }
    }

    pub fn allocation(&self) -> &AllocationState {
        &self.allocation
    }

    pub fn objective(&self) -> Option<Objective> {
        self.objective
    }

    pub fn risk_target_percent(&self) -> Option<f64> {
        self.risk_target_percent
    }

    pub fn investable_cash(&self) -> f64 {
        self.investable_cash
    }

    pub fn candidates(&self) -> &[StockRecord] {
        &self.candidates
    }

    pub fn last_result(&self) -> Option<&ProjectedPortfolio> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Reference data failures leave the candidate list empty; the session goes on.
    pub async fn load_candidates(&mut self, client: &dyn OptimizerClient) -> usize {
        match client.fetch_stocks().await {
            Ok(records) => self.candidates = records,
            Err(err) => {
                tracing::warn!(error = %err, "stock reference data unavailable; no candidates");
                self.candidates.clear();
            }
        }
        self.candidates.len()
    }

    pub fn available_candidates(&self, index: usize) -> Result<Vec<&StockRecord>, SessionError> {
        let symbols: Vec<String> = self.candidates.iter().map(|c| c.symbol.clone()).collect();
        let open = self.allocation.available_candidates(index, &symbols)?;
        Ok(self
            .candidates
            .iter()
            .filter(|c| open.contains(&c.symbol.as_str()))
            .collect())
    }

    pub fn set_asset_count(&mut self, count: usize) -> Result<(), SessionError> {
        self.allocation.set_asset_count(count)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_slot_symbol(&mut self, index: usize, symbol: &str) -> Result<(), SessionError> {
        self.allocation.set_slot_symbol(index, symbol)?;
        self.invalidate();
        Ok(())
    }

    pub fn clear_slot_symbol(&mut self, index: usize) -> Result<(), SessionError> {
        self.allocation.clear_slot_symbol(index)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_slot_minimum_weight(
        &mut self,
        index: usize,
        percent: i64,
    ) -> Result<u32, SessionError> {
        let applied = self.allocation.set_slot_minimum_weight(index, percent)?;
        self.invalidate();
        Ok(applied)
    }

    /// Rejects weights the slot cannot take rather than clamping them.
    pub fn require_slot_minimum_weight(
        &mut self,
        index: usize,
        percent: i64,
    ) -> Result<u32, SessionError> {
        let applied = self.allocation.require_slot_minimum_weight(index, percent)?;
        self.invalidate();
        Ok(applied)
    }

    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
        self.invalidate();
    }

    pub fn set_risk_target(&mut self, percent: Option<f64>) {
        self.risk_target_percent = percent;
        self.invalidate();
    }

    pub fn set_investable_cash(&mut self, amount: f64) {
        self.investable_cash = amount;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if self.last_result.take().is_some() {
            tracing::debug!("inputs changed; cleared previous allocation result");
        }
        self.last_error = None;
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.superseded = true;
        }
    }

    /// Validates the current inputs and marks a request as outstanding.
    pub fn begin_submission(&mut self) -> Result<SubmissionTicket, SessionError> {
        if let Some(in_flight) = &self.in_flight {
            return Err(SessionError::SubmissionInFlight { ticket: in_flight.id });
        }

        let request = request::build(
            self.objective,
            self.risk_target_percent,
            &self.allocation,
            self.investable_cash,
        )?;
        let wire = SpreadRequest::from(&request);

        let ticket = SubmissionTicket {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            request,
            wire,
        };
        self.in_flight = Some(InFlight {
            id: ticket.id,
            requested_risk_percent: ticket.request.risk_target_percent,
            superseded: false,
        });
        tracing::debug!(ticket = %ticket.id, "allocation request started");
        Ok(ticket)
    }

    pub fn complete_submission(
        &mut self,
        ticket: Uuid,
        outcome: anyhow::Result<PortfolioResponse>,
    ) -> Completion {
        let Some(in_flight) = self.in_flight.as_ref().filter(|f| f.id == ticket) else {
            tracing::debug!(%ticket, "ignoring completion for unknown ticket");
            return Completion::Discarded;
        };
        let in_flight = in_flight.clone();
        self.in_flight = None;

        if in_flight.superseded {
            tracing::debug!(%ticket, "discarding result of superseded allocation request");
            return Completion::Discarded;
        }

        let projected = outcome.and_then(|response| {
            project_response(in_flight.requested_risk_percent, &response).map_err(Into::into)
        });

        match projected {
            Ok(result) => {
                self.last_result = Some(result);
                self.last_error = None;
                Completion::Applied
            }
            Err(err) => {
                tracing::warn!(%ticket, error = %err, "allocation request failed; cleared results");
                self.last_result = None;
                self.last_error = Some(format!("{err:#}"));
                Completion::Failed
            }
        }
    }

    pub async fn submit(
        &mut self,
        client: &dyn OptimizerClient,
    ) -> Result<Completion, SessionError> {
        let ticket = self.begin_submission()?;
        let outcome = client.calculate_spread(&ticket.wire).await;
        Ok(self.complete_submission(ticket.id, outcome))
    }
}
