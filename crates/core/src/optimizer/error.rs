use crate::optimizer::Endpoint;
use std::fmt;

#[derive(Debug, Clone)]
pub struct OptimizerDiagnosticsError {
    pub endpoint: Endpoint,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
    pub raw_body: Option<String>,
}

impl fmt::Display for OptimizerDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "optimizer error (endpoint={}, stage={}",
            self.endpoint.path(),
            self.stage
        )?;
        if let Some(status) = self.status {
            write!(f, ", status={status}")?;
        }
        write!(f, "): {}", self.detail)
    }
}

impl std::error::Error for OptimizerDiagnosticsError {}
