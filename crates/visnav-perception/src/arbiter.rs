//! The Fusion Arbiter – deterministic tiered policy over the signal triple.
//!
//! ```text
//! if S1.confidence > HIGH_T and S2.valid and S3.valid:  tier = VALIDATED
//! elif S1.confidence > MID_T and S2.valid:              tier = PROBABLE
//! else:                                                 tier = UNCERTAIN
//! ```
//!
//! Comparisons are strict: a confidence sitting exactly on a threshold
//! resolves to the lower tier, biasing ambiguity toward re-validation
//! instead of false progress. The arbiter is pure – identical input triples
//! always yield identical verdicts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use visnav_types::{CertaintyTier, ContextLabel, FusionVerdict, SignalId, SignalResult};

/// Fusion thresholds. These are configuration, not constants: the stock
/// values are field-tuned rather than derived from first principles and
/// should be validated empirically per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// S1 confidence required (together with valid S2 and S3) for VALIDATED.
    pub high_threshold: f32,
    /// S1 confidence required (together with valid S2) for PROBABLE.
    pub mid_threshold: f32,
    /// Confidence gap beyond which a strong/invalid split between S1 and S2
    /// counts as disagreement.
    pub disagreement_threshold: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            high_threshold: 0.8,
            mid_threshold: 0.6,
            disagreement_threshold: 0.3,
        }
    }
}

/// Combines the three [`SignalResult`]s into one [`FusionVerdict`].
#[derive(Debug, Clone)]
pub struct FusionArbiter {
    config: FusionConfig,
}

impl FusionArbiter {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> FusionConfig {
        self.config
    }

    /// Fuse one evaluation triple for `context`.
    ///
    /// The verdict cites every valid contributing signal; when no signal is
    /// valid, all three are cited – they jointly produced the uncertainty.
    pub fn fuse(
        &self,
        context: ContextLabel,
        s1: &SignalResult,
        s2: &SignalResult,
        s3: &SignalResult,
    ) -> FusionVerdict {
        let tier = if s1.confidence > self.config.high_threshold && s2.valid && s3.valid {
            CertaintyTier::Validated
        } else if s1.confidence > self.config.mid_threshold && s2.valid {
            CertaintyTier::Probable
        } else {
            CertaintyTier::Uncertain
        };

        let mut contributors: Vec<SignalId> = [s1, s2, s3]
            .iter()
            .filter(|r| r.valid)
            .map(|r| r.signal)
            .collect();
        if contributors.is_empty() {
            contributors = vec![SignalId::Structural, SignalId::Lexical, SignalId::Layout];
        }

        FusionVerdict {
            context,
            tier,
            contributors,
            decided_at: Utc::now(),
        }
    }

    /// Disagreement between the structural and lexical signals: one meets
    /// the VALIDATED threshold while the other is invalid or far weaker,
    /// with a confidence gap above the configured threshold. Disagreement
    /// alone – even when the tier is not UNCERTAIN – triggers
    /// recalibration.
    pub fn disagreement(&self, s1: &SignalResult, s2: &SignalResult) -> bool {
        let gap = (s1.confidence - s2.confidence).abs();
        if gap <= self.config.disagreement_threshold {
            return false;
        }
        let s1_strong_s2_missing = s1.confidence > self.config.high_threshold && !s2.valid;
        let s2_strong_s1_weak = s2.valid
            && s2.confidence > self.config.high_threshold
            && s1.confidence < self.config.mid_threshold;
        s1_strong_s2_missing || s2_strong_s1_weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visnav_types::SignalEvidence;

    fn arbiter() -> FusionArbiter {
        FusionArbiter::new(FusionConfig::default())
    }

    fn s(signal: SignalId, confidence: f32) -> SignalResult {
        SignalResult::detected(signal, confidence, SignalEvidence::None)
    }

    fn invalid(signal: SignalId) -> SignalResult {
        SignalResult::invalid(signal)
    }

    #[test]
    fn strong_triple_is_validated() {
        let v = arbiter().fuse(
            ContextLabel::MainMenu,
            &s(SignalId::Structural, 0.85),
            &s(SignalId::Lexical, 0.6),
            &s(SignalId::Layout, 0.5),
        );
        assert_eq!(v.tier, CertaintyTier::Validated);
        assert_eq!(v.contributors.len(), 3);
    }

    #[test]
    fn mid_s1_with_lexical_is_probable() {
        let v = arbiter().fuse(
            ContextLabel::MainMenu,
            &s(SignalId::Structural, 0.65),
            &s(SignalId::Lexical, 0.4),
            &invalid(SignalId::Layout),
        );
        assert_eq!(v.tier, CertaintyTier::Probable);
        assert_eq!(
            v.contributors,
            vec![SignalId::Structural, SignalId::Lexical]
        );
    }

    #[test]
    fn weak_s1_without_lexical_is_uncertain() {
        let v = arbiter().fuse(
            ContextLabel::MainMenu,
            &s(SignalId::Structural, 0.30),
            &invalid(SignalId::Lexical),
            &s(SignalId::Layout, 0.7),
        );
        assert_eq!(v.tier, CertaintyTier::Uncertain);
    }

    #[test]
    fn threshold_boundary_resolves_downward() {
        // Exactly at MID_T: ambiguity between PROBABLE and UNCERTAIN
        // resolves to UNCERTAIN.
        let v = arbiter().fuse(
            ContextLabel::MainMenu,
            &s(SignalId::Structural, 0.6),
            &s(SignalId::Lexical, 0.4),
            &invalid(SignalId::Layout),
        );
        assert_eq!(v.tier, CertaintyTier::Uncertain);

        // Exactly at HIGH_T: resolves to PROBABLE, not VALIDATED.
        let v = arbiter().fuse(
            ContextLabel::MainMenu,
            &s(SignalId::Structural, 0.8),
            &s(SignalId::Lexical, 0.4),
            &s(SignalId::Layout, 0.5),
        );
        assert_eq!(v.tier, CertaintyTier::Probable);
    }

    #[test]
    fn fusion_is_deterministic() {
        let a = arbiter();
        let s1 = s(SignalId::Structural, 0.72);
        let s2 = s(SignalId::Lexical, 0.41);
        let s3 = invalid(SignalId::Layout);
        let v1 = a.fuse(ContextLabel::OptionsMenu, &s1, &s2, &s3);
        let v2 = a.fuse(ContextLabel::OptionsMenu, &s1, &s2, &s3);
        assert_eq!(v1.tier, v2.tier);
        assert_eq!(v1.context, v2.context);
        assert_eq!(v1.contributors, v2.contributors);
    }

    #[test]
    fn all_invalid_still_cites_every_signal() {
        let v = arbiter().fuse(
            ContextLabel::Unknown,
            &invalid(SignalId::Structural),
            &invalid(SignalId::Lexical),
            &invalid(SignalId::Layout),
        );
        assert_eq!(v.tier, CertaintyTier::Uncertain);
        assert_eq!(v.contributors.len(), 3);
    }

    #[test]
    fn strong_s1_missing_s2_is_disagreement() {
        let a = arbiter();
        assert!(a.disagreement(&s(SignalId::Structural, 0.9), &invalid(SignalId::Lexical)));
    }

    #[test]
    fn strong_s2_weak_s1_is_disagreement() {
        let a = arbiter();
        assert!(a.disagreement(&s(SignalId::Structural, 0.2), &s(SignalId::Lexical, 0.9)));
    }

    #[test]
    fn small_gap_is_not_disagreement() {
        let a = arbiter();
        assert!(!a.disagreement(&s(SignalId::Structural, 0.7), &s(SignalId::Lexical, 0.6)));
    }

    #[test]
    fn weak_agreement_is_not_disagreement() {
        let a = arbiter();
        assert!(!a.disagreement(&s(SignalId::Structural, 0.4), &invalid(SignalId::Lexical)));
    }
}
