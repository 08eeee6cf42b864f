//! `visnav-types` – shared data model for the visnav perception and
//! navigation stack.
//!
//! Everything that crosses a crate boundary lives here: the captured
//! [`Frame`], per-detector [`SignalResult`]s, the arbiter's
//! [`FusionVerdict`], the abstract [`UiAction`]s dispatched to the input
//! collaborator, the [`Event`] wrapper routed over the internal bus, and the
//! global [`NavError`] taxonomy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Screen contexts
// ─────────────────────────────────────────────────────────────────────────────

/// A named, recognized screen state of the application under control.
///
/// [`ContextLabel::Unknown`] is the catch-all for screens no context profile
/// could claim; it is the only label the navigation state machine treats as
/// unrecognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextLabel {
    /// Top-level menu of the application.
    MainMenu,
    /// Sub-menu reached from the main menu's "single player" entry.
    SinglePlayerMenu,
    /// Options / settings panel.
    OptionsMenu,
    /// The in-session play screen (HUD overlay, no menu chrome).
    InGame,
    /// No profile claimed the screen.
    Unknown,
}

impl ContextLabel {
    /// `true` for every label except [`ContextLabel::Unknown`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, ContextLabel::Unknown)
    }
}

impl std::fmt::Display for ContextLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContextLabel::MainMenu => "main_menu",
            ContextLabel::SinglePlayerMenu => "single_player_menu",
            ContextLabel::OptionsMenu => "options_menu",
            ContextLabel::InGame => "in_game",
            ContextLabel::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame
// ─────────────────────────────────────────────────────────────────────────────

/// An immutable 8-bit luma snapshot of the screen.
///
/// The pixel buffer sits behind an [`Arc`] so the frame can be handed to the
/// three signal producers concurrently without copies or locks: one writer
/// (the capture collaborator) produces it, many readers inspect it, nobody
/// mutates it.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a raw luma buffer, stamping the capture time.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::CaptureFailed`] when `data.len()` does not match
    /// `width * height` or either dimension is zero.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, NavError> {
        if width == 0 || height == 0 || data.len() != (width as usize) * (height as usize) {
            return Err(NavError::CaptureFailed(format!(
                "buffer of {} bytes does not describe a {width}x{height} luma frame",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: data.into(),
            captured_at: Utc::now(),
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Wall-clock time at which the frame was captured.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Luma value at `(x, y)`. Out-of-bounds coordinates are a caller bug.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        debug_assert!(x < self.width && y < self.height);
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// One full pixel row.
    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = (y as usize) * w;
        &self.data[start..start + w]
    }

    /// Stable identity of the underlying buffer, usable as a cache key for
    /// transient per-frame state.
    pub fn buffer_id(&self) -> usize {
        Arc::as_ptr(&self.data) as *const u8 as usize
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signals
// ─────────────────────────────────────────────────────────────────────────────

/// Identifies one of the three independent signal producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalId {
    /// S1 – template correlation against reference patterns.
    Structural,
    /// S2 – expected-token matching over recognized text.
    Lexical,
    /// S3 – layout regularity (edge bands, spacing).
    Layout,
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignalId::Structural => "structural",
            SignalId::Lexical => "lexical",
            SignalId::Layout => "layout",
        };
        write!(f, "{name}")
    }
}

/// A rectangular region of a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A single template hit reported by the structural signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    /// Identifier of the reference template that matched.
    pub template_id: String,
    /// Normalized correlation score in `[0, 1]`.
    pub score: f32,
    /// Where in the frame the best correlation was found.
    pub region: Region,
}

/// A single expected-token hit reported by the lexical signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMatch {
    /// The expected token that was found in the recognized text.
    pub token: String,
    /// Recognition confidence of the observation that matched it.
    pub confidence: f32,
}

/// Opaque evidence attached to a [`SignalResult`].
///
/// Evidence is always what the detector actually observed on the given
/// frame; a failed detection carries [`SignalEvidence::None`], never a
/// synthesized placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalEvidence {
    /// No evidence – the only legal payload of an invalid result.
    None,
    /// Template hits from the structural signal.
    TemplateMatches(Vec<TemplateMatch>),
    /// Token hits from the lexical signal.
    TokenMatches(Vec<TokenMatch>),
    /// Aggregate layout features from the layout signal.
    LayoutFeatures {
        /// Fraction of pixels on a strong vertical gradient.
        edge_density: f32,
        /// Number of bright horizontal bands found in the menu column.
        band_count: u32,
        /// `1.0` when band gaps are perfectly even, `0.0` when chaotic.
        spacing_regularity: f32,
    },
}

/// The scored output of one signal producer for one frame.
///
/// Invariant: `valid == false` implies `confidence == 0.0` and
/// `evidence == SignalEvidence::None`. Use the constructors; they enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub signal: SignalId,
    pub confidence: f32,
    pub evidence: SignalEvidence,
    pub valid: bool,
}

impl SignalResult {
    /// A successful detection. `confidence` is clamped to `[0, 1]`.
    pub fn detected(signal: SignalId, confidence: f32, evidence: SignalEvidence) -> Self {
        Self {
            signal,
            confidence: confidence.clamp(0.0, 1.0),
            evidence,
            valid: true,
        }
    }

    /// A failed or absent detection: zero confidence, no evidence.
    pub fn invalid(signal: SignalId) -> Self {
        Self {
            signal,
            confidence: 0.0,
            evidence: SignalEvidence::None,
            valid: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fusion verdict
// ─────────────────────────────────────────────────────────────────────────────

/// Agreement strength of a fused classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertaintyTier {
    /// All three signals support the context.
    Validated,
    /// Structural plus lexical agreement.
    Probable,
    /// Insufficient agreement – triggers recalibration.
    Uncertain,
}

impl std::fmt::Display for CertaintyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CertaintyTier::Validated => "validated",
            CertaintyTier::Probable => "probable",
            CertaintyTier::Uncertain => "uncertain",
        };
        write!(f, "{name}")
    }
}

/// The fusion arbiter's combined classification of one perception cycle.
///
/// Deterministic for a given triple of [`SignalResult`]s (the timestamp is
/// bookkeeping, not part of the decision). Always cites at least one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionVerdict {
    pub context: ContextLabel,
    pub tier: CertaintyTier,
    /// Signals whose results produced this verdict. When no signal was
    /// valid, all three are cited – they jointly produced the uncertainty.
    pub contributors: Vec<SignalId>,
    pub decided_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Navigation state
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a navigation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavPhase {
    /// Moving toward the target context.
    InProgress,
    /// Last verdict carried an unrecognized context label.
    Unknown,
    /// The context history formed a strict two-label oscillation.
    LoopDetected,
    /// Terminal success: the target context was confirmed.
    InTarget,
    /// Terminal failure: budgets or recovery tiers exhausted.
    Failed,
}

impl NavPhase {
    /// `true` for [`NavPhase::InTarget`] and [`NavPhase::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, NavPhase::InTarget | NavPhase::Failed)
    }
}

impl std::fmt::Display for NavPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NavPhase::InProgress => "in_progress",
            NavPhase::Unknown => "unknown",
            NavPhase::LoopDetected => "loop_detected",
            NavPhase::InTarget => "in_target",
            NavPhase::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// One cycle's worth of diagnostics, appended to the session trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailEntry {
    pub verdict: FusionVerdict,
    /// Session phase after this verdict was applied.
    pub phase: NavPhase,
    /// Recovery tier armed at the time of the observation.
    pub recovery_tier: u8,
    /// Action attempts dispatched so far.
    pub attempt: u32,
    pub at: DateTime<Utc>,
}

/// Final outcome of a navigation goal, success or failure.
///
/// Carries the full diagnostic trail so the caller (or the RL consumer) can
/// reconstruct every observed verdict and attempted tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationReport {
    pub target: ContextLabel,
    pub outcome: NavPhase,
    pub final_context: ContextLabel,
    pub attempts: u32,
    /// Highest recovery tier that was armed during the session.
    pub highest_tier: u8,
    pub trail: Vec<TrailEntry>,
    pub elapsed_ms: u64,
    /// Present on failure: what exhausted the session.
    pub failure_reason: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Abstract input actions
// ─────────────────────────────────────────────────────────────────────────────

/// Named keys the input collaborator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyName {
    Escape,
    Return,
    Space,
    ArrowUp,
    ArrowDown,
}

impl std::fmt::Display for KeyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyName::Escape => "escape",
            KeyName::Return => "return",
            KeyName::Space => "space",
            KeyName::ArrowUp => "arrow_up",
            KeyName::ArrowDown => "arrow_down",
        };
        write!(f, "{name}")
    }
}

/// Abstract operations dispatched to the external input collaborator.
///
/// Coordinates are normalized to `[0, 1]` of the frame so the same action
/// sequence works at any capture resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum UiAction {
    /// Press and release a named key.
    PressKey { key: KeyName },
    /// Click at a normalized screen position.
    Click { x: f32, y: f32 },
    /// Re-assert application focus.
    ActivateWindow,
    /// Un-minimize and re-position the application window.
    RestoreWindow,
    /// Full session reset: relaunch the application.
    Relaunch,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bus events
// ─────────────────────────────────────────────────────────────────────────────

/// Unified event wrapper for the internal bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"visnav-runtime::engine"`.
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Build an event stamped with a fresh id and the current time.
    pub fn now(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// A fused classification left the perception layer.
    Verdict(FusionVerdict),
    /// The navigation state machine changed (or re-asserted) its phase.
    Transition {
        from: NavPhase,
        to: NavPhase,
        attempt: u32,
        recovery_tier: u8,
    },
    /// An abstract action was handed to the input collaborator.
    ActionDispatched(UiAction),
    /// A producer fault was absorbed into an invalid result.
    SignalFault { signal: SignalId, reason: String },
    /// A navigation goal reached a terminal state.
    GoalFinished { succeeded: bool, attempts: u32 },
}

// ─────────────────────────────────────────────────────────────────────────────
// Error taxonomy
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning perception faults, navigation exhaustion, and
/// collaborator failures.
///
/// Per-signal faults ([`NavError::SignalTimeout`],
/// [`NavError::SignalUnavailable`]) are absorbed at the producer boundary
/// into invalid [`SignalResult`]s and never escape the perception layer;
/// only budget and recovery exhaustion surfaces to the caller.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum NavError {
    #[error("signal {signal} exceeded its {budget_ms} ms evaluation budget")]
    SignalTimeout { signal: SignalId, budget_ms: u64 },

    #[error("signal {signal} unavailable: {reason}")]
    SignalUnavailable { signal: SignalId, reason: String },

    #[error("fusion could not validate context {context}")]
    FusionUncertain { context: ContextLabel },

    #[error("oscillation detected across the last {window} observed contexts")]
    LoopDetected { window: usize },

    #[error("recovery exhausted after {} attempts targeting {}", report.attempts, report.target)]
    RecoveryExhausted { report: Box<NavigationReport> },

    #[error("screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("input dispatch failed: {0}")]
    ActionFailed(String),

    #[error("event bus error: {0}")]
    Channel(String),
}
