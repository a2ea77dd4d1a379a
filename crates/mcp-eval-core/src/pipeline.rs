//! Top-level evaluation pipeline.
//!
//! Sequences resolve → launch (optional) → scan → score → persist
//! under a single fail-safe lifecycle: the working tree and any live
//! subprocess are torn down on every exit path, and exactly one record
//! (score report or error) is persisted per job.

use crate::config::EvalConfig;
use crate::domain::error::Result;
use crate::domain::report::{EvalRecord, EvalResponse, JobId, ScoreReport};
use crate::domain::request::EvalRequest;
use crate::launch::{merged_env, LaunchSpec, ServerHandle};
use crate::obs::{emit_job_finished, emit_job_started, emit_scan_completed, emit_source_resolved, JobSpan};
use crate::probe::{BaselineSpecCheck, LivenessProbe, SpecCheck, TcpLivenessProbe};
use crate::report::FsReportSink;
use crate::resolve::SourceResolver;
use crate::scan::{battery, run_battery};
use crate::summarize::{ClaudeSummarizer, LocalSummarizer, Summarizer};
use crate::workdir::WorkingTree;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// One-job-per-request evaluation orchestrator.
///
/// Concurrent callers get fully isolated jobs: each owns its working
/// tree and subprocess, and nothing mutable is shared.
pub struct EvaluationPipeline {
    config: EvalConfig,
    sink: FsReportSink,
    summarizer: Arc<dyn Summarizer>,
    spec_check: Arc<dyn SpecCheck>,
    liveness: Arc<dyn LivenessProbe>,
}

impl EvaluationPipeline {
    /// Build a pipeline with the default collaborators: the Anthropic
    /// summarizer when `ANTHROPIC_API_KEY` is set (local fallback
    /// otherwise), the baseline spec check and the TCP liveness probe.
    pub fn new(config: EvalConfig) -> Result<Self> {
        let sink = FsReportSink::new(config.reports_dir.clone())?;
        let summarizer: Arc<dyn Summarizer> = match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.is_empty() => {
                Arc::new(ClaudeSummarizer::new(key, config.anthropic_model.clone()))
            }
            _ => Arc::new(LocalSummarizer),
        };
        Ok(Self {
            config,
            sink,
            summarizer,
            spec_check: Arc::new(BaselineSpecCheck),
            liveness: Arc::new(TcpLivenessProbe::default()),
        })
    }

    /// Replace the summarizer collaborator.
    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Replace the spec-conformance and liveness collaborators.
    pub fn with_probes(
        mut self,
        spec_check: Arc<dyn SpecCheck>,
        liveness: Arc<dyn LivenessProbe>,
    ) -> Self {
        self.spec_check = spec_check;
        self.liveness = liveness;
        self
    }

    pub fn sink(&self) -> &FsReportSink {
        &self.sink
    }

    /// Evaluate one package synchronously.
    ///
    /// Any fatal job error is converted into a persisted error record
    /// replacing the score report; the only `Err` this returns is a
    /// persistence failure. The persisted record is read back before
    /// the job is considered complete.
    pub async fn evaluate(&self, request: &EvalRequest) -> Result<EvalResponse> {
        let job_id = JobId::mint();
        let _span = JobSpan::enter(job_id.as_str());
        let start = Instant::now();
        emit_job_started(job_id.as_str(), request.package_id());

        let mut server: Option<ServerHandle> = None;
        let outcome = self.run_job(request, &job_id, &mut server).await;

        // Teardown happens before the job reports completion, on
        // every path. The working tree was removed when run_job's
        // scope closed; the subprocess is stopped here.
        if let Some(mut handle) = server.take() {
            handle
                .shutdown(Duration::from_secs(self.config.shutdown_grace_secs))
                .await;
        }

        let record = match outcome {
            Ok(report) => EvalRecord::Report(report),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "job failed, persisting error record");
                EvalRecord::Error {
                    error: e.to_string(),
                }
            }
        };
        self.sink.write(&job_id, &record)?;
        let record = self.sink.read(&job_id)?;

        emit_job_finished(
            job_id.as_str(),
            start.elapsed().as_millis() as u64,
            !record.is_error(),
        );
        Ok(EvalResponse { job_id, record })
    }

    async fn run_job(
        &self,
        request: &EvalRequest,
        job_id: &JobId,
        server: &mut Option<ServerHandle>,
    ) -> Result<ScoreReport> {
        request.validate()?;

        // Owned by this job; Drop removes it on every exit path,
        // including error propagation below.
        let mut tree = WorkingTree::create()?;

        let resolver = SourceResolver::new(&self.config);
        let resolved = resolver.materialize(request.package_id(), &mut tree).await?;
        emit_source_resolved(job_id.as_str(), resolved.kind.as_str(), resolved.files);

        // Optional live launch. Launch failure degrades the runtime
        // sub-score to 0 instead of aborting.
        let mut runtime: Option<u8> = None;
        if request.wants_live_test() {
            let port = request.port.unwrap_or(self.config.default_port);
            let env = merged_env(&request.parsed_env()?);
            let launched = LaunchSpec::derive(
                resolved.kind,
                request.package_id(),
                request.launch_command.clone(),
                port,
                env,
            );
            match launched {
                Ok(spec) => match ServerHandle::launch(&spec, tree.root(), &self.config).await {
                    Ok(handle) => *server = Some(handle),
                    Err(e) => {
                        warn!(error = %e, "live launch failed, runtime sub-score is 0");
                        runtime = Some(0);
                    }
                },
                Err(e) => {
                    warn!(error = %e, "no usable launch command, runtime sub-score is 0");
                    runtime = Some(0);
                }
            }
        }

        let scanners = battery();
        let scan = run_battery(
            &scanners,
            tree.root(),
            Duration::from_secs(self.config.tool_timeout_secs),
        )
        .await;
        emit_scan_completed(job_id.as_str(), scan.findings.len(), scan.critical_weight);

        let security = self.config.weights.security_score(scan.critical_weight);
        let spec_score = self.spec_check.score(request.spec_url.as_deref()).await;
        if let Some(handle) = server.as_ref() {
            runtime = Some(self.liveness.score(handle.port()).await);
        }

        // Composite weighting applies only when both sub-checks ran;
        // otherwise the total degrades to the security sub-score.
        let spec_present = request.spec_url.as_ref().map(|_| spec_score);
        let total = self.config.weights.composite(security, spec_present, runtime);

        let summary = self.summarizer.summarize(&scan.findings).await;

        Ok(ScoreReport {
            security,
            spec: spec_score,
            runtime,
            total,
            findings: scan.findings,
            summary,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_in(dir: &std::path::Path) -> EvaluationPipeline {
        let mut config = EvalConfig::default();
        config.reports_dir = dir.join("reports");
        EvaluationPipeline::new(config)
            .unwrap()
            .with_summarizer(Arc::new(LocalSummarizer))
    }

    #[tokio::test]
    async fn test_invalid_request_persists_error_record() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());

        let response = pipeline.evaluate(&EvalRequest::new("  ")).await.unwrap();
        assert!(response.record.is_error());

        // The error record is readable back by job id.
        let record = pipeline.sink().read(&response.job_id).unwrap();
        match record {
            EvalRecord::Error { error } => assert!(error.contains("empty")),
            EvalRecord::Report(_) => panic!("expected error record"),
        }
    }

    #[tokio::test]
    async fn test_unclassifiable_package_is_error_record() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_in(dir.path());

        let response = pipeline
            .evaluate(&EvalRequest::new("https://example.com/no-git-suffix"))
            .await
            .unwrap();
        assert!(response.record.is_error());
    }

    #[tokio::test]
    async fn test_local_package_clean_tree_scores_100() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        std::fs::create_dir(&pkg).unwrap();
        std::fs::write(pkg.join("index.txt"), "plain text, nothing dangerous\n").unwrap();

        let pipeline = pipeline_in(dir.path());
        let response = pipeline
            .evaluate(&EvalRequest::new(pkg.to_string_lossy()))
            .await
            .unwrap();

        match response.record {
            EvalRecord::Report(report) => {
                assert_eq!(report.security, 100);
                assert_eq!(report.total, 100);
                assert!(report.runtime.is_none());
                assert_eq!(report.summary, crate::summarize::ALL_CLEAR);
            }
            EvalRecord::Error { error } => panic!("unexpected error record: {error}"),
        }
    }

    #[tokio::test]
    async fn test_eval_pattern_costs_fifteen_points() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("pkg");
        std::fs::create_dir(&pkg).unwrap();
        std::fs::write(pkg.join("index.txt"), "result = eval(input)\n").unwrap();

        let pipeline = pipeline_in(dir.path());
        let response = pipeline
            .evaluate(&EvalRequest::new(pkg.to_string_lossy()))
            .await
            .unwrap();

        match response.record {
            EvalRecord::Report(report) => {
                assert_eq!(report.security, 85);
                assert_eq!(report.findings.len(), 1);
                assert_eq!(report.findings[0].tool, "pattern-sweep");
            }
            EvalRecord::Error { error } => panic!("unexpected error record: {error}"),
        }
    }
}
