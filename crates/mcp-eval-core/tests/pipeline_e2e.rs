//! End-to-end pipeline tests against local package trees.
//!
//! No scanner binaries or network access are assumed: external tools
//! that are absent must be absorbed as zero findings, which is itself
//! part of the contract under test.

use mcp_eval_core::{
    run_battery, scan, EvalConfig, EvalRecord, EvalRequest, EvaluationPipeline, LocalSummarizer,
    ALL_CLEAR,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn pipeline_in(dir: &Path) -> EvaluationPipeline {
    let mut config = EvalConfig::default();
    config.reports_dir = dir.join("reports");
    config.readiness_deadline_secs = 2;
    config.shutdown_grace_secs = 1;
    EvaluationPipeline::new(config)
        .unwrap()
        .with_summarizer(Arc::new(LocalSummarizer))
}

fn make_package(dir: &Path, files: &[(&str, &str)]) -> std::path::PathBuf {
    let pkg = dir.join("pkg");
    std::fs::create_dir_all(&pkg).unwrap();
    for (name, content) in files {
        let path = pkg.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    pkg
}

#[tokio::test]
async fn clean_local_package_scores_100_with_all_clear_summary() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = make_package(dir.path(), &[("index.txt", "nothing to see here\n")]);

    let pipeline = pipeline_in(dir.path());
    let response = pipeline
        .evaluate(&EvalRequest::new(pkg.to_string_lossy()))
        .await
        .unwrap();

    let EvalRecord::Report(report) = response.record else {
        panic!("expected score report");
    };
    assert_eq!(report.security, 100);
    assert_eq!(report.spec, 0);
    assert!(report.runtime.is_none());
    assert_eq!(report.total, 100);
    assert!(report.findings.is_empty());
    assert_eq!(report.summary, ALL_CLEAR);
}

#[tokio::test]
async fn three_pattern_findings_score_55() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = make_package(
        dir.path(),
        &[
            ("a.txt", "eval(x)\n"),
            ("b.txt", "exec(y)\n"),
            ("sub/c.txt", "os.system('ls')\n"),
        ],
    );

    let pipeline = pipeline_in(dir.path());
    let response = pipeline
        .evaluate(&EvalRequest::new(pkg.to_string_lossy()))
        .await
        .unwrap();

    let EvalRecord::Report(report) = response.record else {
        panic!("expected score report");
    };
    assert_eq!(report.findings.len(), 3);
    assert_eq!(report.security, 55);
    assert_eq!(report.total, 55);
}

#[tokio::test]
async fn seven_findings_floor_the_score_at_zero() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<(String, &str)> = (0..7).map(|i| (format!("f{i}.txt"), "eval(x)\n")).collect();
    let refs: Vec<(&str, &str)> = files.iter().map(|(n, c)| (n.as_str(), *c)).collect();
    let pkg = make_package(dir.path(), &refs);

    let pipeline = pipeline_in(dir.path());
    let response = pipeline
        .evaluate(&EvalRequest::new(pkg.to_string_lossy()))
        .await
        .unwrap();

    let EvalRecord::Report(report) = response.record else {
        panic!("expected score report");
    };
    assert_eq!(report.findings.len(), 7);
    assert_eq!(report.security, 0);
}

#[tokio::test]
async fn battery_is_idempotent_on_unmodified_tree() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = make_package(dir.path(), &[("a.txt", "eval(x)\n"), ("b.txt", "clean\n")]);

    let scanners = scan::battery();
    let first = run_battery(&scanners, &pkg, Duration::from_secs(5)).await;
    let second = run_battery(&scanners, &pkg, Duration::from_secs(5)).await;

    assert_eq!(first.critical_weight, second.critical_weight);
    assert_eq!(first.findings.len(), second.findings.len());
}

#[tokio::test]
async fn acquisition_failure_persists_error_record() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline_in(dir.path());

    // A plausible npm name that does not exist; whether npm itself is
    // installed or not, acquisition must fail into an error record.
    let response = pipeline
        .evaluate(&EvalRequest::new(
            "mcp-eval-test-package-that-cannot-exist-a8f2",
        ))
        .await
        .unwrap();

    assert!(response.record.is_error());
    let persisted = pipeline.sink().read(&response.job_id).unwrap();
    assert!(persisted.is_error());
}

#[tokio::test]
async fn failed_launch_degrades_runtime_score_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = make_package(dir.path(), &[("index.txt", "clean\n")]);

    let pipeline = pipeline_in(dir.path());
    let mut request = EvalRequest::new(pkg.to_string_lossy());
    request.port = Some(49991);
    request.launch_command = Some(vec!["false".to_string()]);

    let response = pipeline.evaluate(&request).await.unwrap();
    let EvalRecord::Report(report) = response.record else {
        panic!("launch failure must not abort the job");
    };
    assert_eq!(report.runtime, Some(0));
    assert_eq!(report.security, 100);
    // No spec URL: composite degrades to the security sub-score.
    assert_eq!(report.total, 100);
}

#[tokio::test]
async fn composite_weighting_applies_with_spec_and_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = make_package(dir.path(), &[("index.txt", "clean\n")]);

    let pipeline = pipeline_in(dir.path());
    let mut request = EvalRequest::new(pkg.to_string_lossy());
    request.port = Some(49992);
    request.launch_command = Some(vec!["false".to_string()]);
    request.spec_url = Some("https://example.com/spec.json".to_string());

    let response = pipeline.evaluate(&request).await.unwrap();
    let EvalRecord::Report(report) = response.record else {
        panic!("expected score report");
    };
    // security 100, spec 100 (baseline pass), runtime 0 (launch
    // failed): 0.4*100 + 0.3*100 + 0.3*0 = 70.
    assert_eq!(report.security, 100);
    assert_eq!(report.spec, 100);
    assert_eq!(report.runtime, Some(0));
    assert_eq!(report.total, 70);
}

#[tokio::test]
async fn report_file_is_job_addressed_json() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = make_package(dir.path(), &[("index.txt", "clean\n")]);

    let pipeline = pipeline_in(dir.path());
    let response = pipeline
        .evaluate(&EvalRequest::new(pkg.to_string_lossy()))
        .await
        .unwrap();

    let path = pipeline.sink().path_for(&response.job_id);
    assert!(path.exists());
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["security"], 100);
    assert_eq!(value["total"], 100);
    assert!(value.get("error").is_none());
}

#[tokio::test]
async fn concurrent_jobs_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let clean = make_package(&dir.path().join("one"), &[("a.txt", "clean\n")]);
    let dirty = make_package(&dir.path().join("two"), &[("a.txt", "eval(x)\n")]);

    let pipeline = Arc::new(pipeline_in(dir.path()));
    let p1 = pipeline.clone();
    let p2 = pipeline.clone();
    let clean_id = clean.to_string_lossy().into_owned();
    let dirty_id = dirty.to_string_lossy().into_owned();

    let (a, b) = tokio::join!(
        async move { p1.evaluate(&EvalRequest::new(clean_id)).await.unwrap() },
        async move { p2.evaluate(&EvalRequest::new(dirty_id)).await.unwrap() },
    );

    assert_ne!(a.job_id, b.job_id);
    let EvalRecord::Report(clean_report) = a.record else {
        panic!("expected report");
    };
    let EvalRecord::Report(dirty_report) = b.record else {
        panic!("expected report");
    };
    assert_eq!(clean_report.security, 100);
    assert_eq!(dirty_report.security, 85);
}
