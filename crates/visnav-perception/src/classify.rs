//! Context classification – the sweep over all registered profiles.
//!
//! The [`ContextClassifier`] evaluates the signal triple against every
//! profile in the catalog and keeps the best-supported verdict. The sweep
//! order is fixed by the catalog, ties keep the earlier candidate, and the
//! underlying arbiter is pure, so classification is deterministic for a
//! given frame.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;
use visnav_types::{
    CertaintyTier, ContextLabel, Frame, FusionVerdict, SignalId, SignalResult,
};

use crate::arbiter::{FusionArbiter, FusionConfig};
use crate::lexical::{CachingRecognizer, LexicalSignal, TextRecognizer};
use crate::layout::LayoutSignal;
use crate::profile::ContextCatalog;
use crate::signal::{SignalProducer, SignalSet, result_for};
use crate::structural::StructuralSignal;

/// Minimum confidence some valid signal must reach for an UNCERTAIN winner
/// to keep its profile label instead of degrading to `Unknown`.
const UNKNOWN_SUPPORT_FLOOR: f32 = 0.25;

/// One classified perception cycle: the winning verdict plus the raw signal
/// results that produced it.
#[derive(Debug, Clone)]
pub struct Classification {
    pub verdict: FusionVerdict,
    /// Results for the winning profile, in S1/S2/S3 order.
    pub results: Vec<SignalResult>,
}

impl Classification {
    fn result(&self, id: SignalId) -> SignalResult {
        result_for(&self.results, id)
    }
}

/// Sweeps the signal triple across every context profile and returns the
/// best-supported classification.
pub struct ContextClassifier {
    catalog: ContextCatalog,
    set: SignalSet,
    arbiter: FusionArbiter,
    cache: Option<Arc<CachingRecognizer>>,
}

impl ContextClassifier {
    /// Assemble a classifier from explicit parts.
    pub fn new(catalog: ContextCatalog, set: SignalSet, arbiter: FusionArbiter) -> Self {
        Self {
            catalog,
            set,
            arbiter,
            cache: None,
        }
    }

    /// Register the transient per-frame recognition cache so
    /// [`discard_transient_cache`][Self::discard_transient_cache] can clear
    /// it between recalibration rounds.
    pub fn with_cache(mut self, cache: Arc<CachingRecognizer>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The standard S1/S2/S3 stack: structural correlation, cached lexical
    /// matching over `recognizer`, and layout analysis, each bounded by
    /// `budget`.
    pub fn standard(
        catalog: ContextCatalog,
        recognizer: Arc<dyn TextRecognizer>,
        fusion: FusionConfig,
        budget: Duration,
    ) -> Self {
        let cache = Arc::new(CachingRecognizer::new(recognizer));
        let producers: Vec<Arc<dyn SignalProducer>> = vec![
            Arc::new(StructuralSignal::new()),
            Arc::new(LexicalSignal::new(cache.clone())),
            Arc::new(LayoutSignal::new()),
        ];
        Self::new(
            catalog,
            SignalSet::new(producers, budget),
            FusionArbiter::new(fusion),
        )
        .with_cache(cache)
    }

    /// Evaluate the triple against the single profile for `target`.
    ///
    /// This is the raw per-target contract; [`classify`][Self::classify]
    /// builds on it. A target without a registered profile yields an
    /// all-invalid cycle.
    pub async fn confirm(&self, frame: &Frame, target: ContextLabel) -> Classification {
        let Some(profile) = self.catalog.get(target) else {
            return self.invalid_cycle();
        };
        let results = self.set.evaluate(frame, profile).await;
        let verdict = self.arbiter.fuse(
            target,
            &result_for(&results, SignalId::Structural),
            &result_for(&results, SignalId::Lexical),
            &result_for(&results, SignalId::Layout),
        );
        Classification { verdict, results }
    }

    /// Sweep every registered profile and return the best-supported verdict.
    ///
    /// Ranking: higher certainty tier first, then combined S1+S2 confidence.
    /// When even the winner is UNCERTAIN and no valid signal offers real
    /// support, the label degrades to [`ContextLabel::Unknown`] – an
    /// unclaimed screen is reported as such, never guessed.
    pub async fn classify(&self, frame: &Frame) -> Classification {
        let mut best: Option<Classification> = None;

        for profile in self.catalog.profiles() {
            let candidate = self.confirm(frame, profile.context).await;
            debug!(
                context = %candidate.verdict.context,
                tier = %candidate.verdict.tier,
                "profile sweep candidate"
            );
            let better = match &best {
                None => true,
                Some(current) => rank(&candidate) > rank(current),
            };
            if better {
                best = Some(candidate);
            }
        }

        let mut winner = match best {
            Some(c) => c,
            None => self.invalid_cycle(),
        };

        let supported = winner
            .results
            .iter()
            .any(|r| r.valid && r.confidence >= UNKNOWN_SUPPORT_FLOOR);
        if winner.verdict.tier == CertaintyTier::Uncertain && !supported {
            winner.verdict.context = ContextLabel::Unknown;
        }
        winner
    }

    /// Disagreement between the winning profile's S1 and S2 results.
    pub fn disagreement(&self, classification: &Classification) -> bool {
        self.arbiter.disagreement(
            &classification.result(SignalId::Structural),
            &classification.result(SignalId::Lexical),
        )
    }

    /// Discard the transient per-frame recognition cache. Called by the
    /// recalibration controller before requesting a fresh frame.
    pub fn discard_transient_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// The degenerate cycle used when capture fails or no profile exists:
    /// all three signals invalid, an Unknown/Uncertain verdict citing all of
    /// them.
    pub fn invalid_cycle(&self) -> Classification {
        let results = vec![
            SignalResult::invalid(SignalId::Structural),
            SignalResult::invalid(SignalId::Lexical),
            SignalResult::invalid(SignalId::Layout),
        ];
        Classification {
            verdict: FusionVerdict {
                context: ContextLabel::Unknown,
                tier: CertaintyTier::Uncertain,
                contributors: vec![SignalId::Structural, SignalId::Lexical, SignalId::Layout],
                decided_at: Utc::now(),
            },
            results,
        }
    }
}

/// Candidate ordering key for the profile sweep.
fn rank(c: &Classification) -> (u8, f32) {
    let tier = match c.verdict.tier {
        CertaintyTier::Validated => 2,
        CertaintyTier::Probable => 1,
        CertaintyTier::Uncertain => 0,
    };
    let score = c.result(SignalId::Structural).confidence + c.result(SignalId::Lexical).confidence;
    (tier, score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use visnav_types::{NavError, SignalEvidence};

    use crate::lexical::TokenObservation;
    use crate::profile::{ContextProfile, LayoutClass};

    /// Producer that scores a fixed confidence for one context and nothing
    /// for the rest.
    struct BiasedProducer {
        id: SignalId,
        favourite: ContextLabel,
        confidence: f32,
    }

    impl SignalProducer for BiasedProducer {
        fn id(&self) -> SignalId {
            self.id
        }

        fn evaluate(&self, _frame: &Frame, target: &ContextProfile) -> SignalResult {
            if target.context == self.favourite {
                SignalResult::detected(self.id, self.confidence, SignalEvidence::None)
            } else {
                SignalResult::invalid(self.id)
            }
        }
    }

    struct NullRecognizer;

    impl TextRecognizer for NullRecognizer {
        fn recognize(&self, _frame: &Frame) -> Result<Vec<TokenObservation>, NavError> {
            Ok(Vec::new())
        }
    }

    fn catalog() -> ContextCatalog {
        let profile = |context| ContextProfile {
            context,
            templates: Vec::new(),
            expected_tokens: Vec::new(),
            lexical_floor: 0.5,
            layout: LayoutClass::VerticalMenu,
            buttons: Vec::new(),
        };
        ContextCatalog::new(vec![
            profile(ContextLabel::MainMenu),
            profile(ContextLabel::InGame),
        ])
    }

    fn biased_classifier(favourite: ContextLabel) -> ContextClassifier {
        let producers: Vec<Arc<dyn SignalProducer>> = vec![
            Arc::new(BiasedProducer {
                id: SignalId::Structural,
                favourite,
                confidence: 0.9,
            }),
            Arc::new(BiasedProducer {
                id: SignalId::Lexical,
                favourite,
                confidence: 0.6,
            }),
            Arc::new(BiasedProducer {
                id: SignalId::Layout,
                favourite,
                confidence: 0.7,
            }),
        ];
        ContextClassifier::new(
            catalog(),
            SignalSet::new(producers, Duration::from_secs(1)),
            FusionArbiter::new(FusionConfig::default()),
        )
    }

    fn frame() -> Frame {
        Frame::new(8, 8, vec![0u8; 64]).unwrap()
    }

    #[tokio::test]
    async fn sweep_picks_the_supported_context() {
        let classifier = biased_classifier(ContextLabel::InGame);
        let c = classifier.classify(&frame()).await;
        assert_eq!(c.verdict.context, ContextLabel::InGame);
        assert_eq!(c.verdict.tier, CertaintyTier::Validated);
    }

    #[tokio::test]
    async fn unsupported_frame_degrades_to_unknown() {
        // Producers favour a context that is not in the catalog, so every
        // profile comes back all-invalid.
        let classifier = biased_classifier(ContextLabel::OptionsMenu);
        let c = classifier.classify(&frame()).await;
        assert_eq!(c.verdict.context, ContextLabel::Unknown);
        assert_eq!(c.verdict.tier, CertaintyTier::Uncertain);
        assert_eq!(c.verdict.contributors.len(), 3);
    }

    #[tokio::test]
    async fn confirm_unknown_target_is_invalid_cycle() {
        let classifier = biased_classifier(ContextLabel::MainMenu);
        let c = classifier.confirm(&frame(), ContextLabel::Unknown).await;
        assert_eq!(c.verdict.context, ContextLabel::Unknown);
        assert!(c.results.iter().all(|r| !r.valid));
    }

    #[tokio::test]
    async fn classification_is_deterministic() {
        let classifier = biased_classifier(ContextLabel::MainMenu);
        let f = frame();
        let a = classifier.classify(&f).await;
        let b = classifier.classify(&f).await;
        assert_eq!(a.verdict.context, b.verdict.context);
        assert_eq!(a.verdict.tier, b.verdict.tier);
        assert_eq!(a.results, b.results);
    }

    #[tokio::test]
    async fn standard_stack_classifies_without_panicking() {
        let classifier = ContextClassifier::standard(
            ContextCatalog::default(),
            Arc::new(NullRecognizer),
            FusionConfig::default(),
            Duration::from_secs(2),
        );
        // A blank frame: no tokens, no bands – must degrade, not guess.
        let blank = Frame::new(80, 100, vec![40u8; 80 * 100]).unwrap();
        let c = classifier.classify(&blank).await;
        assert_eq!(c.verdict.tier, CertaintyTier::Uncertain);
        assert_eq!(c.verdict.context, ContextLabel::Unknown);
    }

    #[test]
    fn invalid_cycle_cites_all_signals() {
        let classifier = biased_classifier(ContextLabel::MainMenu);
        let c = classifier.invalid_cycle();
        assert_eq!(c.verdict.contributors.len(), 3);
        assert!(c.results.iter().all(|r| !r.valid));
    }
}
