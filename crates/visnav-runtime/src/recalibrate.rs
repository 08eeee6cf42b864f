//! [`RecalibrationController`] – bounded re-perception.
//!
//! One perception step is allowed up to `max_recalibrations` re-runs: when
//! the classifier comes back UNCERTAIN, or its structural and lexical
//! signals disagree, the controller discards the transient per-frame
//! caches, requests a fresh frame, and runs the full producer → arbiter
//! cycle again. Exceeding the bound is not itself a failure – the
//! last-known classification is handed to the navigation state machine,
//! which decides whether to escalate or fail.
//!
//! A capture failure is treated as an invalid-all-signals cycle and feeds
//! into the same retry path.

use tracing::{debug, warn};
use visnav_hal::ScreenSource;
use visnav_perception::{Classification, ContextClassifier};
use visnav_types::NavError;

/// Runs capture + classification with bounded recalibration.
pub struct RecalibrationController {
    max_recalibrations: u32,
}

impl RecalibrationController {
    pub fn new(max_recalibrations: u32) -> Self {
        Self { max_recalibrations }
    }

    /// One navigation step's worth of perception.
    ///
    /// Returns the accepted (or last-known) classification together with
    /// the number of recalibration re-runs that were spent, which is always
    /// `<= max_recalibrations`.
    pub async fn perceive(
        &self,
        screen: &mut dyn ScreenSource,
        classifier: &ContextClassifier,
    ) -> (Classification, u32) {
        let mut last: Option<Classification> = None;

        for round in 0..=self.max_recalibrations {
            let classification = match screen.capture() {
                Ok(frame) => classifier.classify(&frame).await,
                Err(e) => {
                    warn!(error = %e, "capture failed; treating as invalid-all-signals cycle");
                    classifier.invalid_cycle()
                }
            };

            let uncertain =
                classification.verdict.tier == visnav_types::CertaintyTier::Uncertain;
            let disagreeing = classifier.disagreement(&classification);

            if !uncertain && !disagreeing {
                return (classification, round);
            }

            if round < self.max_recalibrations {
                if uncertain {
                    let fault = NavError::FusionUncertain {
                        context: classification.verdict.context,
                    };
                    debug!(round, disagreeing, "{fault}; recalibrating");
                } else {
                    debug!(round, "signal disagreement; recalibrating");
                }
                classifier.discard_transient_cache();
            }
            last = Some(classification);
        }

        warn!(
            max = self.max_recalibrations,
            "recalibration bound reached; handing last-known verdict to the state machine"
        );
        let classification = last.unwrap_or_else(|| classifier.invalid_cycle());
        (classification, self.max_recalibrations)
    }
}
