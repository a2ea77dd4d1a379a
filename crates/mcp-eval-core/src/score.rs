//! Score aggregation: saturating security penalty and weighted
//! composite.
//!
//! Weights live in an explicit config structure so scoring policy can
//! be validated independently of orchestration.

use serde::{Deserialize, Serialize};

/// Scoring policy constants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    /// Points deducted per critical-weight finding.
    pub penalty_per_finding: u32,

    /// Composite weight of the security sub-score.
    pub security_weight: f64,

    /// Composite weight of the spec-conformance sub-score.
    pub spec_weight: f64,

    /// Composite weight of the runtime-liveness sub-score.
    pub runtime_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            penalty_per_finding: 15,
            security_weight: 0.4,
            spec_weight: 0.3,
            runtime_weight: 0.3,
        }
    }
}

impl ScoreWeights {
    /// Security sub-score: each critical-weight unit costs
    /// `penalty_per_finding` points, floored at zero.
    pub fn security_score(&self, critical_weight: u32) -> u8 {
        100u32
            .saturating_sub(critical_weight.saturating_mul(self.penalty_per_finding))
            .min(100) as u8
    }

    /// Weighted composite of the sub-scores present.
    ///
    /// With both spec and runtime available the total is the weighted
    /// sum, rounded half-up. When either check was not applicable the
    /// composite degrades to the security sub-score alone.
    pub fn composite(&self, security: u8, spec: Option<u8>, runtime: Option<u8>) -> u8 {
        match (spec, runtime) {
            (Some(spec), Some(runtime)) => {
                let weighted = self.security_weight * f64::from(security)
                    + self.spec_weight * f64::from(spec)
                    + self.runtime_weight * f64::from(runtime);
                round_half_up(weighted).min(100) as u8
            }
            _ => security,
        }
    }
}

/// Round half-up: 83.5 → 84.
fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_score_penalty() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.security_score(0), 100);
        assert_eq!(weights.security_score(1), 85);
        assert_eq!(weights.security_score(3), 55);
        assert_eq!(weights.security_score(6), 10);
    }

    #[test]
    fn test_security_score_floors_at_zero() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.security_score(7), 0);
        assert_eq!(weights.security_score(100), 0);
        assert_eq!(weights.security_score(u32::MAX), 0);
    }

    #[test]
    fn test_composite_weighted_round_half_up() {
        let weights = ScoreWeights::default();
        // 0.4*70 + 0.3*90 + 0.3*95 = 83.5 -> 84
        assert_eq!(weights.composite(70, Some(90), Some(95)), 84);
    }

    #[test]
    fn test_composite_degrades_without_subchecks() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.composite(85, None, None), 85);
        assert_eq!(weights.composite(85, Some(90), None), 85);
        assert_eq!(weights.composite(85, None, Some(90)), 85);
    }

    #[test]
    fn test_composite_all_perfect() {
        let weights = ScoreWeights::default();
        assert_eq!(weights.composite(100, Some(100), Some(100)), 100);
    }
}
