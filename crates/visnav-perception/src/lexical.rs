//! S2 – lexical token matching.
//!
//! Scores whether the tokens a context is expected to display are present
//! in the text recognized on the frame. The recognizer itself (OCR model,
//! platform vision framework, …) is an external collaborator behind the
//! [`TextRecognizer`] trait; this module only defines the matching policy.
//!
//! Validity requires at least one expected token observed above the
//! profile's lexical-confidence floor. Each matched token adds 0.2 to the
//! signal confidence, capped at 1.0.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use visnav_types::{Frame, NavError, SignalEvidence, SignalId, SignalResult, TokenMatch};

use crate::profile::ContextProfile;
use crate::signal::SignalProducer;

/// Confidence contributed by each matched expected token.
const PER_TOKEN_WEIGHT: f32 = 0.2;

/// One piece of recognized text with the recognizer's own confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenObservation {
    pub text: String,
    pub confidence: f32,
}

/// External text-recognition collaborator.
///
/// Implementations must derive their output from the given frame only; a
/// recognizer that cannot run reports an error, which the lexical signal
/// absorbs into an invalid result.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TokenObservation>, NavError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Per-frame cache
// ────────────────────────────────────────────────────────────────────────────

/// Memoizes one frame's worth of recognizer output.
///
/// The classifier sweeps several context profiles over the same frame; the
/// underlying recognizer only needs to run once per frame. The cache is
/// keyed on the frame's buffer identity, so a fresh capture can never be
/// served stale text, and [`CachingRecognizer::clear`] lets the
/// recalibration controller discard the transient state explicitly before
/// re-perceiving. Errors are never cached.
pub struct CachingRecognizer {
    inner: Arc<dyn TextRecognizer>,
    slot: Mutex<Option<(FrameKey, Vec<TokenObservation>)>>,
}

/// Buffer identity plus capture time: a recycled allocation can never alias
/// a previous frame's cache entry.
type FrameKey = (usize, chrono::DateTime<chrono::Utc>);

fn frame_key(frame: &Frame) -> FrameKey {
    (frame.buffer_id(), frame.captured_at())
}

impl CachingRecognizer {
    pub fn new(inner: Arc<dyn TextRecognizer>) -> Self {
        Self {
            inner,
            slot: Mutex::new(None),
        }
    }

    /// Drop any memoized recognition output.
    pub fn clear(&self) {
        self.slot.lock().expect("recognition cache poisoned").take();
    }
}

impl TextRecognizer for CachingRecognizer {
    fn recognize(&self, frame: &Frame) -> Result<Vec<TokenObservation>, NavError> {
        let key = frame_key(frame);
        {
            let slot = self.slot.lock().expect("recognition cache poisoned");
            if let Some((cached_key, tokens)) = slot.as_ref() {
                if *cached_key == key {
                    return Ok(tokens.clone());
                }
            }
        }
        let tokens = self.inner.recognize(frame)?;
        *self.slot.lock().expect("recognition cache poisoned") = Some((key, tokens.clone()));
        Ok(tokens)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LexicalSignal
// ────────────────────────────────────────────────────────────────────────────

/// S2: expected-token presence in recognized text.
pub struct LexicalSignal {
    recognizer: Arc<dyn TextRecognizer>,
}

impl LexicalSignal {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl SignalProducer for LexicalSignal {
    fn id(&self) -> SignalId {
        SignalId::Lexical
    }

    fn evaluate(&self, frame: &Frame, target: &ContextProfile) -> SignalResult {
        let observations = match self.recognizer.recognize(frame) {
            Ok(obs) => obs,
            Err(e) => {
                let fault = NavError::SignalUnavailable {
                    signal: SignalId::Lexical,
                    reason: e.to_string(),
                };
                warn!("{fault}");
                return SignalResult::invalid(SignalId::Lexical);
            }
        };

        let mut matches = Vec::new();
        for token in &target.expected_tokens {
            let token_lower = token.to_lowercase();
            let hit = observations.iter().find(|obs| {
                obs.confidence >= target.lexical_floor
                    && obs.text.to_lowercase().contains(&token_lower)
            });
            if let Some(obs) = hit {
                matches.push(TokenMatch {
                    token: token.clone(),
                    confidence: obs.confidence,
                });
            }
        }

        if matches.is_empty() {
            debug!(context = %target.context, "no expected tokens recognized");
            return SignalResult::invalid(SignalId::Lexical);
        }

        let confidence = (PER_TOKEN_WEIGHT * matches.len() as f32).min(1.0);
        SignalResult::detected(
            SignalId::Lexical,
            confidence,
            SignalEvidence::TokenMatches(matches),
        )
    }
}
