pub mod contract;
pub mod request;

pub use contract::{PortfolioResponse, Row, SpreadRequest, StockRecord};
pub use request::{build, AllocationEntry, Objective, PortfolioRequest, ValidationError};
