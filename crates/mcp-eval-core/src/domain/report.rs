//! Score report and persisted evaluation record.

use crate::domain::finding::Finding;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque job identifier, minted once at request time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Mint a fresh job id.
    pub fn mint() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final trust score for one evaluated package.
///
/// Created once at the end of a successful scan phase, immutable
/// thereafter. `runtime` is absent when no live launch was requested;
/// `spec` is 0 when no spec URL was given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Security sub-score in [0,100].
    pub security: u8,

    /// Spec-conformance sub-score in [0,100]; 0 without a spec URL.
    pub spec: u8,

    /// Runtime liveness sub-score; omitted when no live launch ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u8>,

    /// Weighted composite in [0,100].
    pub total: u8,

    /// Ordered findings, battery invocation order.
    pub findings: Vec<Finding>,

    /// Short natural-language summary of the findings.
    pub summary: String,

    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
}

/// Persisted, job-addressable record: exactly one per job, either the
/// score report or an error replacing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvalRecord {
    Report(ScoreReport),
    Error { error: String },
}

impl EvalRecord {
    pub fn is_error(&self) -> bool {
        matches!(self, EvalRecord::Error { .. })
    }
}

/// Response returned to the caller once the job completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResponse {
    pub job_id: JobId,
    pub record: EvalRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_is_unique_hex() {
        let a = JobId::mint();
        let b = JobId::mint();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_record_serializes_error_key_only() {
        let record = EvalRecord::Error {
            error: "source acquisition failed".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert!(obj.contains_key("error"));
    }

    #[test]
    fn test_report_omits_runtime_when_absent() {
        let report = ScoreReport {
            security: 100,
            spec: 0,
            runtime: None,
            total: 100,
            findings: vec![],
            summary: "Everything looks good!".to_string(),
            generated_at: Utc::now(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("runtime").is_none());
        assert_eq!(value["security"], 100);
        assert_eq!(value["total"], 100);
    }
}
