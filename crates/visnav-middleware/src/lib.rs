//! `visnav-middleware` – the event plumbing.
//!
//! Routes perception and navigation events from the engine to in-process
//! consumers (the CLI printer, a decision/RL observer) without caring about
//! their meaning.
//!
//! # Modules
//!
//! - [`bus`] – typed, topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
