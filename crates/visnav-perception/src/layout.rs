//! S3 – layout regularity analysis.
//!
//! Scores whether the frame's gross structure is consistent with the layout
//! class the target profile expects:
//!
//! * [`LayoutClass::VerticalMenu`] – a column of bright, evenly spaced
//!   button bands in the centre of the screen.
//! * [`LayoutClass::FormPanel`] – stacked rows, present but less regular.
//! * [`LayoutClass::HudOverlay`] – bright status strips hugging the top and
//!   bottom edges with busy content between.
//!
//! All features are computed directly from the luma buffer; a frame with no
//! measurable structure yields an invalid result rather than a guess.

use visnav_types::{Frame, SignalEvidence, SignalId, SignalResult};

use crate::profile::{ContextProfile, LayoutClass};
use crate::signal::SignalProducer;

/// Frames smaller than this on either axis carry no usable layout.
const MIN_DIMENSION: u32 = 16;

/// S3: structural regularity of the screen layout.
#[derive(Debug, Clone)]
pub struct LayoutSignal {
    /// Vertical luma delta that counts as an edge.
    gradient_threshold: u8,
    /// How far above the frame mean a row must be to count as a band row.
    band_delta: f32,
}

impl LayoutSignal {
    pub fn new() -> Self {
        Self {
            gradient_threshold: 24,
            band_delta: 20.0,
        }
    }
}

impl Default for LayoutSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate layout measurements for one frame.
#[derive(Debug, Clone, PartialEq)]
struct LayoutMetrics {
    edge_density: f32,
    /// `(start_row, height)` of each bright band in the menu column.
    bands: Vec<(u32, u32)>,
    spacing_regularity: f32,
    /// Mean luma of the top strip, the bottom strip, and everything between.
    top_strip: f32,
    bottom_strip: f32,
    center: f32,
}

impl LayoutSignal {
    fn measure(&self, frame: &Frame) -> LayoutMetrics {
        let (w, h) = (frame.width(), frame.height());

        // Edge density over the whole frame, sampled every other column.
        let mut edges = 0u32;
        let mut samples = 0u32;
        for y in 0..h - 1 {
            let mut x = 0;
            while x < w {
                let d = (frame.luma(x, y + 1) as i16 - frame.luma(x, y) as i16).unsigned_abs();
                if d > self.gradient_threshold as u16 {
                    edges += 1;
                }
                samples += 1;
                x += 2;
            }
        }
        let edge_density = edges as f32 / samples.max(1) as f32;

        // Row means inside the central menu column (x in [0.3w, 0.7w]).
        let x0 = (w as f32 * 0.3) as u32;
        let x1 = ((w as f32 * 0.7) as u32).max(x0 + 1);
        let mut row_means = Vec::with_capacity(h as usize);
        let mut frame_sum = 0.0f64;
        for y in 0..h {
            let mut sum = 0u32;
            for x in x0..x1 {
                sum += frame.luma(x, y) as u32;
            }
            let mean = sum as f32 / (x1 - x0) as f32;
            frame_sum += mean as f64;
            row_means.push(mean);
        }
        let frame_mean = (frame_sum / h as f64) as f32;

        // Group consecutive bright rows into bands.
        let mut bands = Vec::new();
        let mut run_start: Option<u32> = None;
        for (y, mean) in row_means.iter().enumerate() {
            let bright = *mean > frame_mean + self.band_delta;
            match (bright, run_start) {
                (true, None) => run_start = Some(y as u32),
                (false, Some(start)) => {
                    bands.push((start, y as u32 - start));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            bands.push((start, h - start));
        }

        // Regularity of the gaps between band centres.
        let spacing_regularity = if bands.len() >= 3 {
            let centers: Vec<f32> = bands.iter().map(|(s, l)| *s as f32 + *l as f32 / 2.0).collect();
            let gaps: Vec<f32> = centers.windows(2).map(|p| p[1] - p[0]).collect();
            let mean_gap = gaps.iter().sum::<f32>() / gaps.len() as f32;
            let var = gaps
                .iter()
                .map(|g| (g - mean_gap) * (g - mean_gap))
                .sum::<f32>()
                / gaps.len() as f32;
            (1.0 - var.sqrt() / mean_gap.max(1.0)).clamp(0.0, 1.0)
        } else if bands.len() == 2 {
            0.5
        } else {
            0.0
        };

        // Strip means over the full width.
        let strip_h = (h as f32 * 0.15).max(1.0) as u32;
        let mean_of = |y_from: u32, y_to: u32| -> f32 {
            let mut sum = 0u64;
            let mut count = 0u64;
            for y in y_from..y_to {
                for v in frame.row(y) {
                    sum += *v as u64;
                    count += 1;
                }
            }
            sum as f32 / count.max(1) as f32
        };
        let top_strip = mean_of(0, strip_h);
        let bottom_strip = mean_of(h - strip_h, h);
        let center = mean_of(strip_h, h - strip_h);

        LayoutMetrics {
            edge_density,
            bands,
            spacing_regularity,
            top_strip,
            bottom_strip,
            center,
        }
    }

    /// Score the metrics against the expected layout class.
    fn score(&self, metrics: &LayoutMetrics, layout: LayoutClass) -> f32 {
        let band_count = metrics.bands.len() as f32;
        match layout {
            LayoutClass::VerticalMenu => {
                if metrics.bands.len() < 2 {
                    return 0.0;
                }
                let fill = (band_count / 5.0).min(1.0);
                0.5 * metrics.spacing_regularity + 0.5 * fill
            }
            LayoutClass::FormPanel => {
                if metrics.bands.len() < 2 {
                    return 0.0;
                }
                (0.3 + 0.15 * band_count).min(1.0) * (0.5 + 0.5 * metrics.spacing_regularity)
            }
            LayoutClass::HudOverlay => {
                let top = (metrics.top_strip - metrics.center).abs();
                let bottom = (metrics.bottom_strip - metrics.center).abs();
                ((top + bottom) / 160.0).min(1.0)
            }
        }
    }
}

impl SignalProducer for LayoutSignal {
    fn id(&self) -> SignalId {
        SignalId::Layout
    }

    fn evaluate(&self, frame: &Frame, target: &ContextProfile) -> SignalResult {
        if frame.width() < MIN_DIMENSION || frame.height() < MIN_DIMENSION {
            return SignalResult::invalid(SignalId::Layout);
        }

        let metrics = self.measure(frame);
        let confidence = self.score(&metrics, target.layout);

        // No bands and essentially no edges: there is no layout to speak of,
        // and an absent structure must not be reported as a weak one.
        if metrics.bands.is_empty() && metrics.edge_density < 0.005 {
            return SignalResult::invalid(SignalId::Layout);
        }
        if confidence <= 0.05 {
            return SignalResult::invalid(SignalId::Layout);
        }

        SignalResult::detected(
            SignalId::Layout,
            confidence,
            SignalEvidence::LayoutFeatures {
                edge_density: metrics.edge_density,
                band_count: metrics.bands.len() as u32,
                spacing_regularity: metrics.spacing_regularity,
            },
        )
    }
}
