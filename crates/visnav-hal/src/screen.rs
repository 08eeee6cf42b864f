//! Generic screen-capture trait.

use visnav_types::{Frame, NavError};

/// The external capture collaborator.
///
/// Implementations are expected to complete within a bounded latency. A
/// capture failure is not fatal: the engine treats it as an
/// invalid-all-signals cycle and feeds it into recalibration.
pub trait ScreenSource: Send {
    /// Stable identifier for this source, e.g. `"primary_display"`.
    fn id(&self) -> &str;

    /// Capture and return the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::CaptureFailed`] when no frame can be produced
    /// (display disconnected, buffer unavailable, …).
    fn capture(&mut self) -> Result<Frame, NavError>;
}
