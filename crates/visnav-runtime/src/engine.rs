//! [`NavigationEngine`] – the cycle orchestrator.
//!
//! Runs the full navigation cycle for one goal:
//!
//! 1. **Perceive** – capture a frame and classify it, with bounded
//!    recalibration ([`RecalibrationController`]).
//! 2. **Track** – feed the verdict to the [`NavigationSession`] state
//!    machine and publish the verdict + transition on the event bus.
//! 3. **Act** – on `InProgress`/`Unknown`, dispatch the planner's routine
//!    step; on `LoopDetected`, arm the next recovery tier and run its
//!    sequence; on a terminal phase, finish.
//! 4. **Settle** – the executor waits out the settle delay after every
//!    dispatched action, then the cycle re-enters capture.
//!
//! The goal ends with `Ok(NavigationReport)` on `InTarget`, or
//! [`NavError::RecoveryExhausted`] carrying the full diagnostic trail when
//! tiers, the attempt budget, the time budget, or the operator's cancel
//! flag end the session. The engine owns the session for exactly one goal;
//! nothing survives between goals except configuration and collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::sleep;
use tracing::{debug, info, warn};
use visnav_hal::{InputDriver, ScreenSource};
use visnav_middleware::{EventBus, Topic};
use visnav_perception::{ContextCatalog, ContextClassifier, TextRecognizer};
use visnav_types::{
    ContextLabel, Event, EventPayload, NavError, NavPhase, NavigationReport,
};

use crate::config::EngineConfig;
use crate::planner::StepPlanner;
use crate::recalibrate::RecalibrationController;
use crate::recovery::RecoveryExecutor;
use crate::session::NavigationSession;

const SOURCE: &str = "visnav-runtime::engine";

/// Orchestrates perception, the navigation state machine, and recovery for
/// one goal at a time.
pub struct NavigationEngine {
    config: EngineConfig,
    screen: Box<dyn ScreenSource>,
    input: Box<dyn InputDriver>,
    classifier: ContextClassifier,
    recalibration: RecalibrationController,
    planner: StepPlanner,
    executor: RecoveryExecutor,
    bus: EventBus,
    cancel: Arc<AtomicBool>,
}

impl NavigationEngine {
    /// Wire an engine from its collaborators.
    ///
    /// `recognizer` is the external text-recognition collaborator used by
    /// the lexical signal; the catalog describes every context the engine
    /// can recognize and route between.
    pub fn new(
        config: EngineConfig,
        catalog: ContextCatalog,
        screen: Box<dyn ScreenSource>,
        input: Box<dyn InputDriver>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        let classifier = ContextClassifier::standard(
            catalog.clone(),
            recognizer,
            config.fusion,
            config.signal_timeout(),
        );
        let recalibration = RecalibrationController::new(config.max_recalibrations);
        let planner = StepPlanner::new(catalog);
        let executor = RecoveryExecutor::from_config(&config);
        Self {
            config,
            screen,
            input,
            classifier,
            recalibration,
            planner,
            executor,
            bus: EventBus::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clone of the engine's event bus, for subscribing to the observation
    /// stream.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Shared flag that aborts the running goal when set (e.g. from a
    /// Ctrl-C handler). The abort takes effect at the next cycle boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Drive the screen to `target`.
    ///
    /// # Errors
    ///
    /// [`NavError::RecoveryExhausted`] when the session terminates in
    /// `Failed`; the boxed report inside carries every observed verdict and
    /// attempted tier.
    pub async fn navigate(&mut self, target: ContextLabel) -> Result<NavigationReport, NavError> {
        info!(goal = %target, "navigation goal started");
        let mut session = NavigationSession::new(target, &self.config);

        loop {
            if self.cancel.load(Ordering::Acquire) {
                session.cancel("cancelled by operator");
            }
            if session.phase() == NavPhase::Failed {
                return Err(self.finish_failure(&session));
            }

            // ── Perceive (with bounded recalibration) ─────────────────────
            let (classification, recal_rounds) = self
                .recalibration
                .perceive(self.screen.as_mut(), &self.classifier)
                .await;
            debug!(
                context = %classification.verdict.context,
                tier = %classification.verdict.tier,
                recal_rounds,
                "perception cycle complete"
            );
            let _ = self.bus.publish_to(
                Topic::Verdicts,
                Event::now(
                    SOURCE,
                    EventPayload::Verdict(classification.verdict.clone()),
                ),
            );
            for result in classification.results.iter().filter(|r| !r.valid) {
                let _ = self.bus.publish_to(
                    Topic::Alerts,
                    Event::now(
                        SOURCE,
                        EventPayload::SignalFault {
                            signal: result.signal,
                            reason: "no valid result this cycle".to_string(),
                        },
                    ),
                );
            }

            // ── Track ─────────────────────────────────────────────────────
            let from = session.phase();
            let phase = session.observe(&classification.verdict);
            let _ = self.bus.publish_to(
                Topic::Transitions,
                Event::now(
                    SOURCE,
                    EventPayload::Transition {
                        from,
                        to: phase,
                        attempt: session.attempts(),
                        recovery_tier: session.recovery_tier(),
                    },
                ),
            );

            // ── Act ───────────────────────────────────────────────────────
            match phase {
                NavPhase::InTarget => {
                    let report = session.report();
                    info!(
                        goal = %target,
                        attempts = report.attempts,
                        elapsed_ms = report.elapsed_ms,
                        "navigation goal reached"
                    );
                    let _ = self.bus.publish_to(
                        Topic::Alerts,
                        Event::now(
                            SOURCE,
                            EventPayload::GoalFinished {
                                succeeded: true,
                                attempts: report.attempts,
                            },
                        ),
                    );
                    return Ok(report);
                }
                NavPhase::Failed => continue,
                NavPhase::LoopDetected => {
                    if session.begin_attempt() == NavPhase::Failed {
                        continue;
                    }
                    let Some(tier) = session.escalate() else {
                        continue;
                    };
                    if let Err(e) = self.executor.run_tier(tier, self.input.as_ref(), &self.bus).await
                    {
                        // An undeliverable recovery action is an environment
                        // fault; the budgets decide how long to keep trying.
                        warn!(tier, error = %e, "recovery tier dispatch failed");
                    }
                    session.resume_after_recovery();
                }
                NavPhase::InProgress | NavPhase::Unknown => {
                    if session.begin_attempt() == NavPhase::Failed {
                        continue;
                    }
                    let actions = self.planner.step(
                        session.current_context(),
                        target,
                        self.executor.tier_actions(0),
                    );
                    if actions.is_empty() {
                        // At the target label but below the confidence bar:
                        // no input will help, wait and re-perceive.
                        sleep(self.config.settle_delay()).await;
                        continue;
                    }
                    if let Err(e) = self
                        .executor
                        .run_actions(&actions, self.input.as_ref(), &self.bus)
                        .await
                    {
                        warn!(error = %e, "step action dispatch failed");
                    }
                }
            }
        }
    }

    fn finish_failure(&self, session: &NavigationSession) -> NavError {
        let report = session.report();
        warn!(
            goal = %report.target,
            attempts = report.attempts,
            highest_tier = report.highest_tier,
            reason = report.failure_reason.as_deref().unwrap_or("unknown"),
            "navigation goal failed"
        );
        let _ = self.bus.publish_to(
            Topic::Alerts,
            Event::now(
                SOURCE,
                EventPayload::GoalFinished {
                    succeeded: false,
                    attempts: report.attempts,
                },
            ),
        );
        NavError::RecoveryExhausted {
            report: Box::new(report),
        }
    }
}
