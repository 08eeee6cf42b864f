//! `visnav-hal` – collaborator boundary layer.
//!
//! The engine never talks to a real display or input stack directly; it goes
//! through the traits defined here. Production deployments supply platform
//! drivers, tests and the CLI demo use the in-process simulators.
//!
//! # Modules
//!
//! - [`screen`] – [`ScreenSource`][screen::ScreenSource]: the capture
//!   collaborator, `capture() -> Frame` with bounded latency.
//! - [`input`] – [`InputDriver`][input::InputDriver]: the action
//!   collaborator; actions are fired and awaited before the settle delay.
//! - [`sim`] – [`SimDesktop`][sim::SimDesktop]: a deterministic desktop
//!   simulation that renders synthetic context frames and applies navigation
//!   actions to an internal screen graph, for closed-loop tests without a
//!   display.

pub mod input;
pub mod screen;
pub mod sim;

pub use input::InputDriver;
pub use screen::ScreenSource;
pub use sim::{SimDesktop, SimInput, SimRecognizer, SimScreen};
