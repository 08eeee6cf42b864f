//! [`NavigationSession`] – the explicit navigation state machine.
//!
//! One session owns all mutable progress state for one navigation goal:
//! phase, attempt count, recovery tier, the oscillation window, and the
//! diagnostic trail. It is created by the engine, mutated only through the
//! methods here, and discarded on terminal success or failure – there is no
//! process-wide retry state.
//!
//! # Transitions
//!
//! * Verdict for the target at VALIDATED or PROBABLE → `InTarget`.
//! * Verdict for another label → the label joins the context history;
//!   phase becomes `InProgress` (recognized label) or `Unknown`
//!   (unrecognized). A strict A,B,A,B window → `LoopDetected`.
//! * `LoopDetected` arms the next recovery tier (exactly one step up) and
//!   returns to `InProgress` once the executor has run it.
//! * Exhausting the tier ladder, the attempt budget, or the time budget →
//!   `Failed`, carrying the full trail of observed verdicts and tiers.
//!
//! The session is deliberately free of capture/action I/O so it can be
//! driven with fabricated verdicts in tests.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};
use visnav_types::{
    CertaintyTier, ContextLabel, FusionVerdict, NavPhase, NavigationReport, TrailEntry,
};

use crate::config::EngineConfig;
use crate::history::ContextHistory;

/// Mutable state of one navigation goal.
pub struct NavigationSession {
    target: ContextLabel,
    phase: NavPhase,
    current: ContextLabel,
    attempts: u32,
    recovery_tier: u8,
    highest_tier: u8,
    history: ContextHistory,
    trail: Vec<TrailEntry>,
    started: Instant,
    attempt_budget: u32,
    time_budget_ms: u64,
    max_tier: u8,
    failure_reason: Option<String>,
}

impl NavigationSession {
    /// Start a fresh goal: `InProgress`, zero attempts, tier 0.
    pub fn new(target: ContextLabel, config: &EngineConfig) -> Self {
        Self {
            target,
            phase: NavPhase::InProgress,
            current: ContextLabel::Unknown,
            attempts: 0,
            recovery_tier: 0,
            highest_tier: 0,
            history: ContextHistory::new(config.loop_window),
            trail: Vec::new(),
            started: Instant::now(),
            attempt_budget: config.attempt_budget,
            time_budget_ms: config.time_budget_ms,
            max_tier: config.max_tier(),
            failure_reason: None,
        }
    }

    pub fn target(&self) -> ContextLabel {
        self.target
    }

    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    /// Context label carried by the most recent verdict.
    pub fn current_context(&self) -> ContextLabel {
        self.current
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn recovery_tier(&self) -> u8 {
        self.recovery_tier
    }

    pub fn trail(&self) -> &[TrailEntry] {
        &self.trail
    }

    /// Apply one fused verdict and return the resulting phase.
    ///
    /// Appends a trail entry on every call, so the trail length equals the
    /// number of perception cycles executed. The global time budget is
    /// checked first: exceeding it forces `Failed` no matter what the
    /// verdict says.
    pub fn observe(&mut self, verdict: &FusionVerdict) -> NavPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        self.current = verdict.context;

        if self.started.elapsed().as_millis() as u64 > self.time_budget_ms {
            self.fail("time budget exhausted");
        } else if verdict.context == self.target
            && matches!(
                verdict.tier,
                CertaintyTier::Validated | CertaintyTier::Probable
            )
        {
            self.phase = NavPhase::InTarget;
        } else if verdict.context != self.target {
            if self.history.record(verdict.context) {
                let fault = visnav_types::NavError::LoopDetected {
                    window: self.history.capacity(),
                };
                warn!(context = %verdict.context, "{fault}");
                self.phase = NavPhase::LoopDetected;
            } else if verdict.context.is_recognized() {
                self.phase = NavPhase::InProgress;
            } else {
                self.phase = NavPhase::Unknown;
            }
        } else {
            // At the target label but only UNCERTAIN: not progress, not a
            // loop – keep working and let recalibration earn confidence.
            self.phase = NavPhase::InProgress;
        }

        self.trail.push(TrailEntry {
            verdict: verdict.clone(),
            phase: self.phase,
            recovery_tier: self.recovery_tier,
            attempt: self.attempts,
            at: Utc::now(),
        });
        debug!(phase = %self.phase, context = %self.current, "verdict applied");
        self.phase
    }

    /// Account for one action round. Fails the session when the attempt
    /// budget is already spent; otherwise increments the counter.
    pub fn begin_attempt(&mut self) -> NavPhase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        if self.attempts >= self.attempt_budget {
            self.fail("attempt budget exhausted");
            return self.phase;
        }
        self.attempts += 1;
        self.phase
    }

    /// Arm the next recovery tier after a loop detection.
    ///
    /// Increments by exactly one. Returns `None` – and fails the session –
    /// when the ladder is already at its top.
    pub fn escalate(&mut self) -> Option<u8> {
        if self.recovery_tier >= self.max_tier {
            self.fail("recovery tiers exhausted");
            return None;
        }
        self.recovery_tier += 1;
        self.highest_tier = self.highest_tier.max(self.recovery_tier);
        Some(self.recovery_tier)
    }

    /// Return to `InProgress` once the armed tier's sequence has run.
    pub fn resume_after_recovery(&mut self) {
        if self.phase == NavPhase::LoopDetected {
            self.phase = NavPhase::InProgress;
        }
    }

    /// Force terminal failure (operator cancellation, external abort).
    pub fn cancel(&mut self, reason: &str) {
        if !self.phase.is_terminal() {
            self.fail(reason);
        }
    }

    fn fail(&mut self, reason: &str) {
        warn!(goal = %self.target, reason, "navigation goal failed");
        self.phase = NavPhase::Failed;
        self.failure_reason = Some(reason.to_string());
    }

    /// Snapshot the session into its final report.
    pub fn report(&self) -> NavigationReport {
        NavigationReport {
            target: self.target,
            outcome: self.phase,
            final_context: self.current,
            attempts: self.attempts,
            highest_tier: self.highest_tier,
            trail: self.trail.clone(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            failure_reason: self.failure_reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use visnav_types::SignalId;

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn verdict(context: ContextLabel, tier: CertaintyTier) -> FusionVerdict {
        FusionVerdict {
            context,
            tier,
            contributors: vec![SignalId::Structural],
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_session_starts_in_progress_at_tier_zero() {
        let session = NavigationSession::new(ContextLabel::MainMenu, &config());
        assert_eq!(session.phase(), NavPhase::InProgress);
        assert_eq!(session.attempts(), 0);
        assert_eq!(session.recovery_tier(), 0);
    }

    #[test]
    fn validated_target_verdict_reaches_in_target() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        let phase = session.observe(&verdict(ContextLabel::MainMenu, CertaintyTier::Validated));
        assert_eq!(phase, NavPhase::InTarget);
    }

    #[test]
    fn probable_target_verdict_also_suffices() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        let phase = session.observe(&verdict(ContextLabel::MainMenu, CertaintyTier::Probable));
        assert_eq!(phase, NavPhase::InTarget);
    }

    #[test]
    fn uncertain_target_verdict_is_not_success() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        let phase = session.observe(&verdict(ContextLabel::MainMenu, CertaintyTier::Uncertain));
        assert_eq!(phase, NavPhase::InProgress);
    }

    #[test]
    fn recognized_non_target_label_is_in_progress() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        let phase = session.observe(&verdict(ContextLabel::InGame, CertaintyTier::Validated));
        assert_eq!(phase, NavPhase::InProgress);
    }

    #[test]
    fn unrecognized_label_is_unknown() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        let phase = session.observe(&verdict(ContextLabel::Unknown, CertaintyTier::Uncertain));
        assert_eq!(phase, NavPhase::Unknown);
    }

    #[test]
    fn abab_window_detects_loop_and_escalates_by_one() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        let a = verdict(ContextLabel::OptionsMenu, CertaintyTier::Probable);
        let b = verdict(ContextLabel::SinglePlayerMenu, CertaintyTier::Probable);

        assert_eq!(session.observe(&a), NavPhase::InProgress);
        assert_eq!(session.observe(&b), NavPhase::InProgress);
        assert_eq!(session.observe(&a), NavPhase::InProgress);
        assert_eq!(session.observe(&b), NavPhase::LoopDetected);

        assert_eq!(session.escalate(), Some(1));
        assert_eq!(session.recovery_tier(), 1);
        session.resume_after_recovery();
        assert_eq!(session.phase(), NavPhase::InProgress);
    }

    #[test]
    fn tier_never_decreases_and_steps_by_exactly_one() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        assert_eq!(session.escalate(), Some(1));
        assert_eq!(session.escalate(), Some(2));
        assert_eq!(session.escalate(), Some(3));
        assert_eq!(session.recovery_tier(), 3);
    }

    #[test]
    fn escalating_past_the_ladder_fails_the_session() {
        let mut config = config();
        config.recovery_tiers.truncate(2); // tiers 0 and 1
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config);
        assert_eq!(session.escalate(), Some(1));
        assert_eq!(session.escalate(), None);
        assert_eq!(session.phase(), NavPhase::Failed);
        let report = session.report();
        assert_eq!(report.outcome, NavPhase::Failed);
        assert!(report.failure_reason.unwrap().contains("tiers exhausted"));
    }

    #[test]
    fn persistent_uncertainty_without_oscillation_never_escalates() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        for _ in 0..6 {
            let phase = session.observe(&verdict(ContextLabel::Unknown, CertaintyTier::Uncertain));
            assert_ne!(phase, NavPhase::LoopDetected);
        }
        assert_eq!(session.recovery_tier(), 0);
    }

    #[test]
    fn attempt_budget_exhaustion_fails() {
        let mut config = config();
        config.attempt_budget = 2;
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config);
        assert_eq!(session.begin_attempt(), NavPhase::InProgress);
        assert_eq!(session.begin_attempt(), NavPhase::InProgress);
        assert_eq!(session.begin_attempt(), NavPhase::Failed);
        assert_eq!(session.attempts(), 2);
    }

    #[test]
    fn time_budget_exhaustion_forces_failure_on_observe() {
        let mut config = config();
        config.time_budget_ms = 0;
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config);
        // Make sure some wall-clock time has actually elapsed.
        std::thread::sleep(std::time::Duration::from_millis(2));
        let phase = session.observe(&verdict(ContextLabel::MainMenu, CertaintyTier::Validated));
        assert_eq!(phase, NavPhase::Failed);
        assert!(
            session
                .report()
                .failure_reason
                .unwrap()
                .contains("time budget")
        );
    }

    #[test]
    fn trail_length_equals_cycles_observed() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        for _ in 0..5 {
            session.observe(&verdict(ContextLabel::InGame, CertaintyTier::Probable));
        }
        assert_eq!(session.trail().len(), 5);
        assert_eq!(session.report().trail.len(), 5);
    }

    #[test]
    fn terminal_phase_is_sticky() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        session.cancel("cancelled by operator");
        assert_eq!(session.phase(), NavPhase::Failed);
        let phase = session.observe(&verdict(ContextLabel::MainMenu, CertaintyTier::Validated));
        assert_eq!(phase, NavPhase::Failed);
        // The post-terminal observe did not extend the trail.
        assert!(session.trail().is_empty());
    }

    #[test]
    fn report_records_highest_tier_reached() {
        let mut session = NavigationSession::new(ContextLabel::MainMenu, &config());
        session.escalate();
        session.escalate();
        assert_eq!(session.report().highest_tier, 2);
    }
}
