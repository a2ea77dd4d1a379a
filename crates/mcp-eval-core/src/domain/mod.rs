//! Domain model for package evaluation: requests, findings, scores,
//! persisted records and the error taxonomy.

pub mod error;
pub mod finding;
pub mod report;
pub mod request;

pub use error::{EvalError, Result};
pub use finding::{Finding, Severity};
pub use report::{EvalRecord, EvalResponse, JobId, ScoreReport};
pub use request::EvalRequest;
