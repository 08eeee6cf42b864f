//! `visnav-perception` – the Signal Fusion Perception Engine.
//!
//! Turns one captured [`Frame`][visnav_types::Frame] into a classified
//! screen context with an explicit certainty tier.
//!
//! # Modules
//!
//! - [`signal`] – the polymorphic [`SignalProducer`][signal::SignalProducer]
//!   contract plus [`SignalSet`][signal::SignalSet], which evaluates all
//!   producers concurrently under a per-signal timeout budget.
//! - [`structural`] – S1: normalized template correlation against the
//!   reference patterns of a context profile.
//! - [`lexical`] – S2: expected-token matching over text produced by an
//!   injected [`TextRecognizer`][lexical::TextRecognizer], plus the
//!   transient per-frame [`CachingRecognizer`][lexical::CachingRecognizer].
//! - [`layout`] – S3: layout regularity scoring (edge density, bright-band
//!   spacing) against the profile's expected layout class.
//! - [`arbiter`] – the pure, deterministic tiered fusion policy
//!   ([`FusionArbiter`][arbiter::FusionArbiter]).
//! - [`profile`] – per-context expectation data
//!   ([`ContextProfile`][profile::ContextProfile]) and the default catalog.
//! - [`classify`] – [`ContextClassifier`][classify::ContextClassifier]:
//!   sweeps every catalog profile and returns the best-supported verdict.

pub mod arbiter;
pub mod classify;
pub mod layout;
pub mod lexical;
pub mod profile;
pub mod signal;
pub mod structural;

pub use arbiter::{FusionArbiter, FusionConfig};
pub use classify::{Classification, ContextClassifier};
pub use layout::LayoutSignal;
pub use lexical::{CachingRecognizer, LexicalSignal, TextRecognizer, TokenObservation};
pub use profile::{ButtonTarget, ContextCatalog, ContextProfile, LayoutClass, ReferenceTemplate};
pub use signal::{SignalProducer, SignalSet};
pub use structural::StructuralSignal;
