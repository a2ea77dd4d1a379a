//! LLM-backed findings summarizer.
//!
//! External collaborator consumed as a pure function: ordered finding
//! strings in, short natural-language text out. With no findings the
//! pipeline short-circuits to a fixed message and the collaborator is
//! never called; any transport failure degrades to a deterministic
//! local fallback, never a job failure.

use crate::domain::finding::{Finding, Severity};
use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

/// Fixed summary used when the findings list is empty.
pub const ALL_CLEAR: &str = "Everything looks good!";

/// Summarizes an ordered list of findings.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, findings: &[Finding]) -> String;
}

/// Deterministic local summary: counts by severity.
pub fn fallback_summary(findings: &[Finding]) -> String {
    let count_of = |s: Severity| findings.iter().filter(|f| f.severity == s).count();
    format!(
        "{} finding(s): {} critical, {} error, {} warning, {} info.",
        findings.len(),
        count_of(Severity::Critical),
        count_of(Severity::Error),
        count_of(Severity::Warning),
        count_of(Severity::Info),
    )
}

/// Summarizer that never leaves the process. Used in tests and when
/// no API key is configured.
pub struct LocalSummarizer;

#[async_trait]
impl Summarizer for LocalSummarizer {
    async fn summarize(&self, findings: &[Finding]) -> String {
        if findings.is_empty() {
            ALL_CLEAR.to_string()
        } else {
            fallback_summary(findings)
        }
    }
}

/// Summarizer backed by the Anthropic messages API.
pub struct ClaudeSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeSummarizer {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    async fn call_api(&self, findings: &[Finding]) -> anyhow::Result<String> {
        let bullets: Vec<String> = findings.iter().map(|f| format!("- {}", f.render())).collect();
        let prompt = format!(
            "You are a security analyst. Summarize these findings succinctly:\n\n{}",
            bullets.join("\n")
        );

        let body = json!({
            "model": self.model,
            "max_tokens": 200,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let doc: serde_json::Value = response.json().await?;
        let text = doc
            .pointer("/content/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| anyhow::anyhow!("unexpected response shape"))?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Summarizer for ClaudeSummarizer {
    async fn summarize(&self, findings: &[Finding]) -> String {
        if findings.is_empty() {
            return ALL_CLEAR.to_string();
        }
        match self.call_api(findings).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "summarizer call failed, using local fallback");
                fallback_summary(findings)
            }
        }
    }
}
