//! Per-context expectation data.
//!
//! A [`ContextProfile`] is the *target descriptor* handed to every signal
//! producer: which reference patterns S1 should correlate, which lexical
//! tokens S2 should look for, and which layout class S3 should score.
//! The [`ContextCatalog`] holds one profile per recognized context so the
//! classifier can sweep them all over a single frame.

use std::sync::Arc;

use visnav_types::ContextLabel;

// ────────────────────────────────────────────────────────────────────────────
// Reference templates
// ────────────────────────────────────────────────────────────────────────────

/// A small grayscale reference pattern for the structural signal.
#[derive(Debug, Clone)]
pub struct ReferenceTemplate {
    /// Stable identifier, e.g. `"menu_button"`.
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Luma pixels, row-major, `width * height` bytes.
    pub data: Arc<[u8]>,
}

impl ReferenceTemplate {
    /// Build a template from a raw luma buffer. The buffer length must equal
    /// `width * height`.
    pub fn new(id: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "template buffer does not match its dimensions"
        );
        Self {
            id: id.into(),
            width,
            height,
            data: data.into(),
        }
    }

    /// A horizontal band: `border` rows at top and bottom, `fill` interior.
    /// Matches the widget chrome that menu buttons and HUD strips render as.
    pub fn banded(id: impl Into<String>, width: u32, height: u32, border: u8, fill: u8) -> Self {
        let mut data = vec![fill; (width as usize) * (height as usize)];
        for x in 0..width as usize {
            data[x] = border;
            data[(height as usize - 1) * width as usize + x] = border;
        }
        Self::new(id, width, height, data)
    }

    /// Luma value at `(x, y)` within the template.
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Profiles
// ────────────────────────────────────────────────────────────────────────────

/// Broad layout family a context is expected to render as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutClass {
    /// A column of evenly spaced button bands (menus).
    VerticalMenu,
    /// Status strips at the screen edges with busy content between (play
    /// screen).
    HudOverlay,
    /// A panel of stacked rows, less regular than a menu (options forms).
    FormPanel,
}

/// A clickable element of a context, with the context it leads to.
///
/// Coordinates are normalized to `[0, 1]` of the frame.
#[derive(Debug, Clone)]
pub struct ButtonTarget {
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub leads_to: ContextLabel,
}

/// Everything the perception engine expects of one screen context.
#[derive(Debug, Clone)]
pub struct ContextProfile {
    pub context: ContextLabel,
    /// Reference patterns for the structural signal.
    pub templates: Vec<ReferenceTemplate>,
    /// Lexical tokens whose presence supports this context.
    pub expected_tokens: Vec<String>,
    /// Minimum recognition confidence for a token observation to count.
    pub lexical_floor: f32,
    /// Layout family the layout signal scores against.
    pub layout: LayoutClass,
    /// Forward-navigation targets reachable by clicking within this context.
    pub buttons: Vec<ButtonTarget>,
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

/// The set of context profiles the classifier sweeps.
#[derive(Debug, Clone)]
pub struct ContextCatalog {
    profiles: Vec<ContextProfile>,
}

impl ContextCatalog {
    /// Build a catalog from explicit profiles. Sweep order follows insertion
    /// order, which keeps classification deterministic.
    pub fn new(profiles: Vec<ContextProfile>) -> Self {
        Self { profiles }
    }

    /// Profile for a specific context, if registered.
    pub fn get(&self, context: ContextLabel) -> Option<&ContextProfile> {
        self.profiles.iter().find(|p| p.context == context)
    }

    /// All registered profiles, in sweep order.
    pub fn profiles(&self) -> &[ContextProfile] {
        &self.profiles
    }

    /// Button within `from` that leads to `to`, if the catalog knows one.
    pub fn route_button(&self, from: ContextLabel, to: ContextLabel) -> Option<&ButtonTarget> {
        self.get(from)?.buttons.iter().find(|b| b.leads_to == to)
    }
}

impl Default for ContextCatalog {
    /// The stock menu hierarchy: main menu, single-player sub-menu, options
    /// panel, and the in-game HUD. Token sets and normalized button
    /// positions follow the application's menu layout.
    fn default() -> Self {
        let menu_button = ReferenceTemplate::banded("menu_button", 24, 8, 30, 200);
        let hud_strip = ReferenceTemplate::banded("hud_strip", 32, 12, 40, 200);

        let tokens = |words: &[&str]| words.iter().map(|w| (*w).to_string()).collect();

        Self::new(vec![
            ContextProfile {
                context: ContextLabel::MainMenu,
                templates: vec![menu_button.clone()],
                expected_tokens: tokens(&["single", "player", "options", "map", "editor", "quit"]),
                lexical_floor: 0.5,
                layout: LayoutClass::VerticalMenu,
                buttons: vec![
                    ButtonTarget {
                        label: "single player".to_string(),
                        x: 0.5,
                        y: 0.5896,
                        leads_to: ContextLabel::SinglePlayerMenu,
                    },
                    ButtonTarget {
                        label: "options".to_string(),
                        x: 0.5,
                        y: 0.7563,
                        leads_to: ContextLabel::OptionsMenu,
                    },
                ],
            },
            ContextProfile {
                context: ContextLabel::SinglePlayerMenu,
                templates: vec![menu_button.clone()],
                expected_tokens: tokens(&["campaign", "custom", "skirmish", "load", "back"]),
                lexical_floor: 0.5,
                layout: LayoutClass::VerticalMenu,
                buttons: Vec::new(),
            },
            ContextProfile {
                context: ContextLabel::OptionsMenu,
                templates: vec![menu_button],
                expected_tokens: tokens(&["video", "audio", "controls", "gameplay", "back"]),
                lexical_floor: 0.5,
                layout: LayoutClass::FormPanel,
                buttons: Vec::new(),
            },
            ContextProfile {
                context: ContextLabel::InGame,
                templates: vec![hud_strip],
                expected_tokens: tokens(&["spice", "credits", "units", "power", "structures"]),
                lexical_floor: 0.5,
                layout: LayoutClass::HudOverlay,
                buttons: Vec::new(),
            },
        ])
    }
}
