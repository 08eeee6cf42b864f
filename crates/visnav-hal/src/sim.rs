//! Deterministic desktop simulation.
//!
//! [`SimDesktop`] models the application under control as a small screen
//! graph: menu contexts connected by Escape (up) and button clicks (down),
//! plus window focus and minimization state. [`SimScreen`] renders the
//! current context as a synthetic luma frame, [`SimInput`] applies abstract
//! actions to the graph, and [`SimRecognizer`] plays the part of the OCR
//! collaborator.
//!
//! The simulation supports two fault injections used by the closed-loop
//! tests: a capture-failure counter and an "escape bounce" mode in which
//! Escape toggles between two sub-menus until focus is re-asserted – the
//! stuck-UI condition that oscillation detection and tier escalation exist
//! for.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;
use visnav_types::{ContextLabel, Frame, KeyName, NavError, UiAction};

use crate::input::InputDriver;
use crate::screen::ScreenSource;

/// Simulated frame dimensions.
const SIM_WIDTH: u32 = 160;
const SIM_HEIGHT: u32 = 120;

/// Normalized Y positions of the main-menu buttons, top to bottom.
const MAIN_MENU_ROWS: [f32; 6] = [0.5896, 0.6451, 0.7007, 0.7563, 0.8118, 0.8674];
/// Main-menu rows that navigate somewhere: (row index, destination).
const MAIN_MENU_LINKS: [(usize, ContextLabel); 2] = [
    (0, ContextLabel::SinglePlayerMenu),
    (3, ContextLabel::OptionsMenu),
];
/// Click tolerance around a button row, normalized.
const CLICK_TOLERANCE: f32 = 0.03;

#[derive(Debug)]
struct DesktopState {
    context: ContextLabel,
    focused: bool,
    minimized: bool,
    escape_bounce: bool,
    fail_next_captures: u32,
}

/// Shared handle to the simulated desktop. Clone freely – all clones drive
/// the same state.
#[derive(Clone)]
pub struct SimDesktop {
    state: Arc<Mutex<DesktopState>>,
}

impl SimDesktop {
    /// Start the simulation showing `context`, focused and un-minimized.
    pub fn new(context: ContextLabel) -> Self {
        Self {
            state: Arc::new(Mutex::new(DesktopState {
                context,
                focused: true,
                minimized: false,
                escape_bounce: false,
                fail_next_captures: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DesktopState> {
        self.state.lock().expect("sim desktop poisoned")
    }

    /// The context currently on screen.
    pub fn context(&self) -> ContextLabel {
        self.lock().context
    }

    pub fn is_focused(&self) -> bool {
        self.lock().focused
    }

    /// Drop window focus (captures render an unreadable frame until
    /// [`UiAction::ActivateWindow`] is dispatched).
    pub fn drop_focus(&self) {
        self.lock().focused = false;
    }

    /// Minimize the window.
    pub fn minimize(&self) {
        self.lock().minimized = true;
    }

    /// Arm or clear the stuck-UI mode: while armed, Escape bounces between
    /// the options panel and the single-player sub-menu instead of
    /// navigating up. Focus re-assertion clears it.
    pub fn set_escape_bounce(&self, armed: bool) {
        self.lock().escape_bounce = armed;
    }

    /// Make the next `n` captures fail.
    pub fn fail_next_captures(&self, n: u32) {
        self.lock().fail_next_captures = n;
    }

    /// A capture source for this desktop.
    pub fn screen(&self) -> SimScreen {
        SimScreen {
            desktop: self.clone(),
        }
    }

    /// An input driver for this desktop.
    pub fn input(&self) -> SimInput {
        SimInput {
            desktop: self.clone(),
        }
    }

    /// A text recognizer for this desktop.
    pub fn recognizer(&self) -> SimRecognizer {
        SimRecognizer {
            desktop: self.clone(),
        }
    }

    fn apply(&self, action: &UiAction) {
        let mut state = self.lock();
        match action {
            UiAction::PressKey {
                key: KeyName::Escape,
            } => {
                state.context = if state.escape_bounce {
                    match state.context {
                        ContextLabel::OptionsMenu => ContextLabel::SinglePlayerMenu,
                        _ => ContextLabel::OptionsMenu,
                    }
                } else {
                    parent_of(state.context)
                };
            }
            UiAction::PressKey { .. } => {}
            UiAction::Click { y, .. } => {
                if state.context == ContextLabel::MainMenu && state.focused {
                    for (row, destination) in MAIN_MENU_LINKS {
                        if (y - MAIN_MENU_ROWS[row]).abs() <= CLICK_TOLERANCE {
                            state.context = destination;
                            break;
                        }
                    }
                }
            }
            UiAction::ActivateWindow => {
                state.focused = true;
                // Regaining focus unsticks the bouncing menu.
                state.escape_bounce = false;
            }
            UiAction::RestoreWindow => {
                state.minimized = false;
            }
            UiAction::Relaunch => {
                state.context = ContextLabel::MainMenu;
                state.focused = true;
                state.minimized = false;
                state.escape_bounce = false;
            }
        }
        debug!(context = %state.context, focused = state.focused, "sim desktop applied action");
    }
}

/// Escape navigates one level up; the main menu is the root.
fn parent_of(context: ContextLabel) -> ContextLabel {
    match context {
        ContextLabel::MainMenu => ContextLabel::MainMenu,
        ContextLabel::SinglePlayerMenu
        | ContextLabel::OptionsMenu
        | ContextLabel::InGame
        | ContextLabel::Unknown => ContextLabel::MainMenu,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width * height) as usize],
        }
    }

    fn rect(&mut self, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
        for y in y0..(y0 + h).min(self.height) {
            for x in x0..(x0 + w).min(self.width) {
                self.data[(y * self.width + x) as usize] = value;
            }
        }
    }

    /// A menu button: six bright rows centred at the normalized `y_norm`.
    fn button(&mut self, y_norm: f32, x0_norm: f32, x1_norm: f32) {
        let y = (y_norm * self.height as f32) as u32;
        let x0 = (x0_norm * self.width as f32) as u32;
        let x1 = (x1_norm * self.width as f32) as u32;
        self.rect(x0, y, x1 - x0, 6, 200);
    }

    fn into_frame(self) -> Frame {
        Frame::new(self.width, self.height, self.data).expect("canvas geometry is consistent")
    }
}

fn render(context: ContextLabel, readable: bool) -> Frame {
    let mut canvas = Canvas::filled(SIM_WIDTH, SIM_HEIGHT, 30);
    if !readable {
        // Occluded or minimized window: a flat, featureless capture.
        return Canvas::filled(SIM_WIDTH, SIM_HEIGHT, 60).into_frame();
    }

    match context {
        ContextLabel::MainMenu => {
            for y_norm in MAIN_MENU_ROWS {
                canvas.button(y_norm, 0.35, 0.65);
            }
        }
        ContextLabel::SinglePlayerMenu => {
            for y_norm in [0.45, 0.55, 0.65, 0.75] {
                canvas.button(y_norm, 0.35, 0.65);
            }
        }
        ContextLabel::OptionsMenu => {
            for y_norm in [0.30, 0.40, 0.50, 0.60, 0.70] {
                canvas.button(y_norm, 0.25, 0.75);
            }
        }
        ContextLabel::InGame => {
            // Bordered HUD strips at the top and bottom edges.
            canvas.rect(0, 0, SIM_WIDTH, 1, 40);
            canvas.rect(0, 1, SIM_WIDTH, 10, 200);
            canvas.rect(0, 11, SIM_WIDTH, 1, 40);
            canvas.rect(0, SIM_HEIGHT - 12, SIM_WIDTH, 1, 40);
            canvas.rect(0, SIM_HEIGHT - 11, SIM_WIDTH, 10, 200);
            canvas.rect(0, SIM_HEIGHT - 1, SIM_WIDTH, 1, 40);
            // Busy play area between the strips.
            for y in 12..SIM_HEIGHT - 12 {
                for x in 0..SIM_WIDTH {
                    let v = 90 + ((x * 31 + y * 17) % 37) as u8;
                    canvas.data[(y * SIM_WIDTH + x) as usize] = v;
                }
            }
        }
        ContextLabel::Unknown => {
            // An unrecognizable screen: sparse noise, no menu structure.
            for y in 0..SIM_HEIGHT {
                for x in 0..SIM_WIDTH {
                    let v = 50 + ((x * 13 + y * 7) % 61) as u8;
                    canvas.data[(y * SIM_WIDTH + x) as usize] = v;
                }
            }
        }
    }
    canvas.into_frame()
}

// ────────────────────────────────────────────────────────────────────────────
// Drivers
// ────────────────────────────────────────────────────────────────────────────

/// Capture source backed by a [`SimDesktop`].
pub struct SimScreen {
    desktop: SimDesktop,
}

impl ScreenSource for SimScreen {
    fn id(&self) -> &str {
        "sim_screen"
    }

    fn capture(&mut self) -> Result<Frame, NavError> {
        let (context, readable) = {
            let mut state = self.desktop.lock();
            if state.fail_next_captures > 0 {
                state.fail_next_captures -= 1;
                return Err(NavError::CaptureFailed(
                    "simulated capture fault".to_string(),
                ));
            }
            (state.context, state.focused && !state.minimized)
        };
        Ok(render(context, readable))
    }
}

/// Input driver backed by a [`SimDesktop`].
pub struct SimInput {
    desktop: SimDesktop,
}

#[async_trait]
impl InputDriver for SimInput {
    fn id(&self) -> &str {
        "sim_input"
    }

    async fn dispatch(&self, action: &UiAction) -> Result<(), NavError> {
        self.desktop.apply(action);
        Ok(())
    }
}

/// Text-recognition collaborator backed by a [`SimDesktop`].
///
/// Returns the labels the current screen renders, with a fixed recognition
/// confidence; an unreadable window yields no text at all.
pub struct SimRecognizer {
    desktop: SimDesktop,
}

impl visnav_perception::TextRecognizer for SimRecognizer {
    fn recognize(
        &self,
        _frame: &Frame,
    ) -> Result<Vec<visnav_perception::TokenObservation>, NavError> {
        let state = self.desktop.lock();
        if !state.focused || state.minimized {
            return Ok(Vec::new());
        }
        let words: &[&str] = match state.context {
            ContextLabel::MainMenu => &[
                "single player",
                "multi player",
                "map editor",
                "options",
                "replay",
                "quit",
            ],
            ContextLabel::SinglePlayerMenu => {
                &["campaign", "custom game", "skirmish", "load game", "back"]
            }
            ContextLabel::OptionsMenu => &["video", "audio", "controls", "gameplay", "back"],
            ContextLabel::InGame => &["spice", "credits", "power", "units"],
            ContextLabel::Unknown => &[],
        };
        Ok(words
            .iter()
            .map(|w| visnav_perception::TokenObservation {
                text: (*w).to_string(),
                confidence: 0.9,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use visnav_perception::{ContextCatalog, ContextClassifier, FusionConfig};
    use visnav_types::CertaintyTier;

    #[test]
    fn escape_walks_up_to_main_menu() {
        let desktop = SimDesktop::new(ContextLabel::InGame);
        desktop.apply(&UiAction::PressKey {
            key: KeyName::Escape,
        });
        assert_eq!(desktop.context(), ContextLabel::MainMenu);
    }

    #[test]
    fn click_on_single_player_row_descends() {
        let desktop = SimDesktop::new(ContextLabel::MainMenu);
        desktop.apply(&UiAction::Click { x: 0.5, y: 0.5896 });
        assert_eq!(desktop.context(), ContextLabel::SinglePlayerMenu);
    }

    #[test]
    fn click_between_rows_is_ignored() {
        let desktop = SimDesktop::new(ContextLabel::MainMenu);
        desktop.apply(&UiAction::Click { x: 0.5, y: 0.45 });
        assert_eq!(desktop.context(), ContextLabel::MainMenu);
    }

    #[test]
    fn escape_bounce_oscillates_until_focus_reasserted() {
        let desktop = SimDesktop::new(ContextLabel::OptionsMenu);
        desktop.set_escape_bounce(true);

        let escape = UiAction::PressKey {
            key: KeyName::Escape,
        };
        desktop.apply(&escape);
        assert_eq!(desktop.context(), ContextLabel::SinglePlayerMenu);
        desktop.apply(&escape);
        assert_eq!(desktop.context(), ContextLabel::OptionsMenu);

        desktop.apply(&UiAction::ActivateWindow);
        desktop.apply(&escape);
        // Unstuck: Escape now navigates up to the root.
        assert_eq!(desktop.context(), ContextLabel::MainMenu);
    }

    #[test]
    fn relaunch_resets_everything() {
        let desktop = SimDesktop::new(ContextLabel::InGame);
        desktop.drop_focus();
        desktop.minimize();
        desktop.set_escape_bounce(true);
        desktop.apply(&UiAction::Relaunch);
        assert_eq!(desktop.context(), ContextLabel::MainMenu);
        assert!(desktop.is_focused());
    }

    #[test]
    fn injected_capture_faults_then_recovery() {
        let desktop = SimDesktop::new(ContextLabel::MainMenu);
        desktop.fail_next_captures(2);
        let mut screen = desktop.screen();
        assert!(screen.capture().is_err());
        assert!(screen.capture().is_err());
        assert!(screen.capture().is_ok());
    }

    #[test]
    fn unfocused_window_renders_featureless_frame() {
        let desktop = SimDesktop::new(ContextLabel::MainMenu);
        desktop.drop_focus();
        let mut screen = desktop.screen();
        let frame = screen.capture().unwrap();
        let flat = (0..frame.height()).all(|y| frame.row(y).iter().all(|v| *v == 60));
        assert!(flat);
    }

    /// End-to-end alignment check: the rendered frames must be classified
    /// as the contexts they depict by the standard signal stack.
    #[tokio::test]
    async fn rendered_contexts_classify_as_themselves() {
        for context in [
            ContextLabel::MainMenu,
            ContextLabel::SinglePlayerMenu,
            ContextLabel::OptionsMenu,
            ContextLabel::InGame,
        ] {
            let desktop = SimDesktop::new(context);
            let classifier = ContextClassifier::standard(
                ContextCatalog::default(),
                Arc::new(desktop.recognizer()),
                FusionConfig::default(),
                Duration::from_secs(5),
            );
            let frame = desktop.screen().capture().unwrap();
            let c = classifier.classify(&frame).await;
            assert_eq!(c.verdict.context, context, "misclassified {context}");
            assert_ne!(
                c.verdict.tier,
                CertaintyTier::Uncertain,
                "no confident verdict for {context}"
            );
        }
    }
}
