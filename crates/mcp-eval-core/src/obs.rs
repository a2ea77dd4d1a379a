//! Structured observability hooks for the job lifecycle.
//!
//! Events are emitted at `info!` level with structured fields; a
//! [`JobSpan`] RAII guard tags everything inside a job with its id.

use tracing::info;

/// RAII guard that enters a job-scoped tracing span.
pub struct JobSpan {
    _span: tracing::span::EnteredSpan,
}

impl JobSpan {
    /// Create and enter a span tagged with the job id.
    pub fn enter(job_id: &str) -> Self {
        let span = tracing::info_span!("mcp_eval.job", job_id = %job_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: evaluation job started.
pub fn emit_job_started(job_id: &str, package: &str) {
    info!(event = "job.started", job_id = %job_id, package = %package);
}

/// Emit event: package source resolved into the working tree.
pub fn emit_source_resolved(job_id: &str, kind: &str, files: usize) {
    info!(event = "source.resolved", job_id = %job_id, kind = %kind, files = files);
}

/// Emit event: scanner battery finished.
pub fn emit_scan_completed(job_id: &str, findings: usize, critical_weight: u32) {
    info!(
        event = "scan.completed",
        job_id = %job_id,
        findings = findings,
        critical_weight = critical_weight,
    );
}

/// Emit event: job finished with its persisted outcome.
pub fn emit_job_finished(job_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "job.finished",
        job_id = %job_id,
        duration_ms = duration_ms,
        success = success,
    );
}
