//! The polymorphic signal-producer contract and its concurrent evaluator.
//!
//! Every detector implements [`SignalProducer`]; the fusion arbiter and the
//! classifier depend only on this trait, never on a concrete detector.
//!
//! [`SignalSet`] runs all registered producers concurrently over one
//! immutable frame. Each evaluation is joined under the per-signal timeout
//! budget: a slow or hung producer degrades to an invalid result, it never
//! stalls the cycle or the other producers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task;
use tokio::time;
use tracing::warn;
use visnav_types::{Frame, NavError, SignalId, SignalResult};

use crate::profile::ContextProfile;

/// One independent detector scoring evidence for a target context.
///
/// # Contract
///
/// * Side-effect free with respect to the other producers.
/// * Never panics across this boundary in normal operation; internal faults
///   are reported as an invalid result.
/// * Never returns a value inferred from anything other than the given
///   frame – no cross-call caching that could mask a missing target.
pub trait SignalProducer: Send + Sync {
    /// Which of the three signals this producer implements.
    fn id(&self) -> SignalId;

    /// Score the evidence that `frame` shows the context described by
    /// `target`.
    fn evaluate(&self, frame: &Frame, target: &ContextProfile) -> SignalResult;
}

/// Evaluates a set of producers concurrently with a shared timeout budget.
pub struct SignalSet {
    producers: Vec<Arc<dyn SignalProducer>>,
    budget: Duration,
}

impl SignalSet {
    /// Bundle `producers` under a per-signal `budget`.
    pub fn new(producers: Vec<Arc<dyn SignalProducer>>, budget: Duration) -> Self {
        Self { producers, budget }
    }

    /// Per-signal evaluation budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Evaluate every producer against `frame` concurrently.
    ///
    /// Results come back in producer registration order. A producer that
    /// times out, panics, or is cancelled contributes
    /// [`SignalResult::invalid`] for its id; the frame itself is shared by
    /// reference counting, so no producer blocks another.
    pub async fn evaluate(&self, frame: &Frame, target: &ContextProfile) -> Vec<SignalResult> {
        let mut handles = Vec::with_capacity(self.producers.len());
        for producer in &self.producers {
            let producer = Arc::clone(producer);
            let frame = frame.clone();
            let target = target.clone();
            let budget = self.budget;
            let id = producer.id();
            handles.push((
                id,
                tokio::spawn(async move {
                    let work = task::spawn_blocking(move || producer.evaluate(&frame, &target));
                    match time::timeout(budget, work).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(join_err)) => {
                            warn!(signal = %id, error = %join_err, "producer task failed; degrading to invalid");
                            SignalResult::invalid(id)
                        }
                        Err(_) => {
                            // The blocking thread keeps running to completion
                            // but its result is discarded; the cycle moves on.
                            let fault = NavError::SignalTimeout {
                                signal: id,
                                budget_ms: budget.as_millis() as u64,
                            };
                            warn!(signal = %id, "{fault}");
                            SignalResult::invalid(id)
                        }
                    }
                }),
            ));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            results.push(handle.await.unwrap_or_else(|_| SignalResult::invalid(id)));
        }
        results
    }
}

/// Pick the result for `id` out of an evaluation batch.
pub fn result_for(results: &[SignalResult], id: SignalId) -> SignalResult {
    results
        .iter()
        .find(|r| r.signal == id)
        .cloned()
        .unwrap_or_else(|| SignalResult::invalid(id))
}
