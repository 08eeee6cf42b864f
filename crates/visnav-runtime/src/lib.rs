//! `visnav-runtime` – the Adaptive Navigation Recovery controller.
//!
//! Drives the perception → decision → action cycle that moves the screen
//! toward a target context, detecting oscillation and escalating recovery
//! under bounded time and attempt budgets.
//!
//! # Modules
//!
//! - [`config`] – [`EngineConfig`][config::EngineConfig]: the full
//!   configuration surface (fusion thresholds, recalibration and loop
//!   windows, budgets, recovery tier sequences).
//! - [`history`] – [`ContextHistory`][history::ContextHistory]: bounded ring
//!   of recent context labels with strict two-label oscillation detection.
//! - [`session`] – [`NavigationSession`][session::NavigationSession]: the
//!   explicit navigation state machine, owned by the engine and testable
//!   with injected verdicts.
//! - [`planner`] – [`StepPlanner`][planner::StepPlanner]: maps
//!   (current, target) context pairs to the next routine step action.
//! - [`recovery`] – [`RecoveryExecutor`][recovery::RecoveryExecutor]:
//!   tier → action-sequence lookup and dispatch with settle delays; all
//!   escalation decisions live in the session, not here.
//! - [`recalibrate`] – [`RecalibrationController`][recalibrate::RecalibrationController]:
//!   bounded re-perception on uncertain or disagreeing signals.
//! - [`engine`] – [`NavigationEngine`][engine::NavigationEngine]: the cycle
//!   orchestrator wiring capture, perception, the state machine, and the
//!   recovery executor together over the event bus.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod config;
pub mod engine;
pub mod history;
pub mod planner;
pub mod recalibrate;
pub mod recovery;
pub mod session;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::NavigationEngine;
pub use history::ContextHistory;
pub use planner::StepPlanner;
pub use recalibrate::RecalibrationController;
pub use recovery::RecoveryExecutor;
pub use session::NavigationSession;
