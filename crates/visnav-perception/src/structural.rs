//! S1 – structural template correlation.
//!
//! Slides each reference template of the target profile over the frame on a
//! coarse grid and scores normalized cross-correlation of the luma patches.
//! The signal's confidence is the best score seen across all templates; the
//! evidence records every placement whose score cleared the match floor.

use tracing::debug;
use visnav_types::{
    Frame, Region, SignalEvidence, SignalId, SignalResult, TemplateMatch,
};

use crate::profile::{ContextProfile, ReferenceTemplate};
use crate::signal::SignalProducer;

/// Variance below which a patch is treated as flat (uniform fill).
const FLAT_VARIANCE: f64 = 1.0;

/// S1: geometric/pixel similarity of frame regions to reference patterns.
#[derive(Debug, Clone)]
pub struct StructuralSignal {
    /// Horizontal search step in pixels. Rows are always scanned
    /// exhaustively: menu chrome is made of horizontal bands, and a
    /// one-row miss is enough to ruin the correlation peak. Columns inside
    /// a band are near-uniform, so skipping them only trades speed.
    stride: u32,
    /// Minimum score for a placement to be recorded as evidence.
    match_floor: f32,
}

impl StructuralSignal {
    pub fn new() -> Self {
        Self {
            stride: 2,
            match_floor: 0.25,
        }
    }

    /// Override the horizontal search stride (clamped to at least 1).
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Best normalized correlation of `template` anywhere in `frame`, with
    /// the region where it was found. `None` when the template does not fit.
    fn best_placement(&self, frame: &Frame, template: &ReferenceTemplate) -> Option<(f32, Region)> {
        if template.width > frame.width() || template.height > frame.height() {
            return None;
        }
        let max_x = frame.width() - template.width;
        let max_y = frame.height() - template.height;

        let mut best_score = -1.0_f32;
        let mut best_at = (0u32, 0u32);
        for y in 0..=max_y {
            let mut x = 0;
            while x <= max_x {
                let score = correlation_at(frame, template, x, y);
                if score > best_score {
                    best_score = score;
                    best_at = (x, y);
                }
                x += self.stride;
            }
        }

        Some((
            best_score.clamp(0.0, 1.0),
            Region {
                x: best_at.0,
                y: best_at.1,
                width: template.width,
                height: template.height,
            },
        ))
    }
}

impl Default for StructuralSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProducer for StructuralSignal {
    fn id(&self) -> SignalId {
        SignalId::Structural
    }

    fn evaluate(&self, frame: &Frame, target: &ContextProfile) -> SignalResult {
        if target.templates.is_empty() {
            debug!(context = %target.context, "no reference templates registered");
            return SignalResult::invalid(SignalId::Structural);
        }

        let mut best = 0.0_f32;
        let mut matches = Vec::new();
        let mut any_usable = false;

        for template in &target.templates {
            let Some((score, region)) = self.best_placement(frame, template) else {
                continue;
            };
            any_usable = true;
            best = best.max(score);
            if score >= self.match_floor {
                matches.push(TemplateMatch {
                    template_id: template.id.clone(),
                    score,
                    region,
                });
            }
        }

        if !any_usable {
            // Every template was larger than the frame.
            return SignalResult::invalid(SignalId::Structural);
        }

        SignalResult::detected(
            SignalId::Structural,
            best,
            SignalEvidence::TemplateMatches(matches),
        )
    }
}

/// Normalized cross-correlation of the template against the frame patch at
/// `(ox, oy)`, mapped onto `[−1, 1]`.
///
/// Flat patches have no correlation structure; when both sides are flat the
/// score falls back to mean-intensity agreement, and when only one side is
/// flat the placement scores zero.
fn correlation_at(frame: &Frame, template: &ReferenceTemplate, ox: u32, oy: u32) -> f32 {
    let n = (template.width as f64) * (template.height as f64);

    let mut sum_f = 0.0_f64;
    let mut sum_t = 0.0_f64;
    for ty in 0..template.height {
        for tx in 0..template.width {
            sum_f += frame.luma(ox + tx, oy + ty) as f64;
            sum_t += template.luma(tx, ty) as f64;
        }
    }
    let mean_f = sum_f / n;
    let mean_t = sum_t / n;

    let mut cov = 0.0_f64;
    let mut var_f = 0.0_f64;
    let mut var_t = 0.0_f64;
    for ty in 0..template.height {
        for tx in 0..template.width {
            let df = frame.luma(ox + tx, oy + ty) as f64 - mean_f;
            let dt = template.luma(tx, ty) as f64 - mean_t;
            cov += df * dt;
            var_f += df * df;
            var_t += dt * dt;
        }
    }

    let flat_f = var_f < FLAT_VARIANCE * n;
    let flat_t = var_t < FLAT_VARIANCE * n;
    match (flat_f, flat_t) {
        (true, true) => 1.0 - ((mean_f - mean_t).abs() / 255.0) as f32,
        (true, false) | (false, true) => 0.0,
        (false, false) => (cov / (var_f.sqrt() * var_t.sqrt())) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visnav_types::ContextLabel;

    use crate::profile::LayoutClass;

    /// A 64x48 frame with a banded "button" drawn at (20, 16).
    fn frame_with_button() -> Frame {
        let (w, h) = (64u32, 48u32);
        let mut data = vec![30u8; (w * h) as usize];
        for y in 16..24u32 {
            for x in 20..44u32 {
                let v = if y == 16 || y == 23 { 30 } else { 200 };
                data[(y * w + x) as usize] = v;
            }
        }
        Frame::new(w, h, data).unwrap()
    }

    fn profile_with(templates: Vec<ReferenceTemplate>) -> ContextProfile {
        ContextProfile {
            context: ContextLabel::MainMenu,
            templates,
            expected_tokens: Vec::new(),
            lexical_floor: 0.5,
            layout: LayoutClass::VerticalMenu,
            buttons: Vec::new(),
        }
    }

    #[test]
    fn matching_band_scores_high() {
        let signal = StructuralSignal::new().with_stride(1);
        let template = ReferenceTemplate::banded("menu_button", 24, 8, 30, 200);
        let result = signal.evaluate(&frame_with_button(), &profile_with(vec![template]));

        assert!(result.valid);
        assert!(
            result.confidence > 0.8,
            "expected strong correlation, got {}",
            result.confidence
        );
        match &result.evidence {
            SignalEvidence::TemplateMatches(matches) => {
                assert!(!matches.is_empty());
                assert_eq!(matches[0].template_id, "menu_button");
            }
            other => panic!("unexpected evidence: {other:?}"),
        }
    }

    #[test]
    fn blank_frame_scores_low_but_valid() {
        let signal = StructuralSignal::new();
        let frame = Frame::new(64, 48, vec![30u8; 64 * 48]).unwrap();
        let template = ReferenceTemplate::banded("menu_button", 24, 8, 30, 200);
        let result = signal.evaluate(&frame, &profile_with(vec![template]));

        // A flat frame has nothing to correlate against a structured
        // template; the score collapses rather than being fabricated.
        assert!(result.valid);
        assert!(result.confidence < 0.25, "got {}", result.confidence);
    }

    #[test]
    fn no_templates_is_invalid() {
        let signal = StructuralSignal::new();
        let result = signal.evaluate(&frame_with_button(), &profile_with(Vec::new()));
        assert!(!result.valid);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn oversized_template_is_invalid() {
        let signal = StructuralSignal::new();
        let huge = ReferenceTemplate::banded("huge", 200, 200, 30, 200);
        let result = signal.evaluate(&frame_with_button(), &profile_with(vec![huge]));
        assert!(!result.valid);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let signal = StructuralSignal::new();
        let frame = frame_with_button();
        let profile = profile_with(vec![ReferenceTemplate::banded("menu_button", 24, 8, 30, 200)]);
        let a = signal.evaluate(&frame, &profile);
        let b = signal.evaluate(&frame, &profile);
        assert_eq!(a, b);
    }

    #[test]
    fn correlation_of_identical_patches_is_one() {
        let template = ReferenceTemplate::banded("t", 8, 4, 0, 255);
        let mut data = vec![128u8; 16 * 8];
        for y in 0..4u32 {
            for x in 0..8u32 {
                data[(y * 16 + x) as usize] = template.luma(x, y);
            }
        }
        let frame = Frame::new(16, 8, data).unwrap();
        let score = correlation_at(&frame, &template, 0, 0);
        assert!((score - 1.0).abs() < 1e-5, "got {score}");
    }
}
