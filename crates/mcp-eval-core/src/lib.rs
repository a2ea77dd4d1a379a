//! mcp-eval core library
//!
//! Vets a third-party MCP server package: acquires its source from a
//! local path, git URL, PyPI or npm, optionally launches it as a
//! sandboxed subprocess, runs a battery of independent security
//! scanners, and aggregates a normalized trust score.

pub mod config;
pub mod domain;
pub mod exec;
pub mod launch;
pub mod obs;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod resolve;
pub mod scan;
pub mod score;
pub mod summarize;
pub mod telemetry;
pub mod workdir;

pub use config::EvalConfig;
pub use domain::{
    EvalError, EvalRecord, EvalRequest, EvalResponse, Finding, JobId, Result, ScoreReport,
    Severity,
};
pub use launch::{LaunchSpec, ServerHandle};
pub use obs::JobSpan;
pub use pipeline::EvaluationPipeline;
pub use probe::{BaselineSpecCheck, LivenessProbe, SpecCheck, TcpLivenessProbe};
pub use report::FsReportSink;
pub use resolve::{PackageKind, ResolvedSource, SourceResolver};
pub use scan::{battery, run_battery, ScanOutcome, ScanReport, Scanner};
pub use score::ScoreWeights;
pub use summarize::{ClaudeSummarizer, LocalSummarizer, Summarizer, ALL_CLEAR};
pub use telemetry::init_tracing;
pub use workdir::WorkingTree;

/// mcp-eval version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
