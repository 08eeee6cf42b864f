//! Typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels so every subscriber receives
//! every message without any single subscriber blocking the others.
//!
//! # Topics
//!
//! Traffic is partitioned into four [`Topic`] lanes so consumers only
//! receive the messages they care about:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Verdicts`] | One [`FusionVerdict`][visnav_types::FusionVerdict] per perception cycle |
//! | [`Topic::Transitions`] | Navigation state-machine transitions |
//! | [`Topic::Actions`] | Abstract actions handed to the input collaborator |
//! | [`Topic::Alerts`] | Signal faults and terminal goal outcomes |
//!
//! The `Verdicts` and `Transitions` lanes together form the observation
//! stream consumed by the external decision/RL collaborator.

use tokio::sync::broadcast;
use visnav_types::{Event, NavError};

/// Default channel capacity (buffered events before old ones are dropped for
/// slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Fused classifications leaving the perception layer.
    Verdicts,
    /// Navigation state-machine transitions.
    Transitions,
    /// Abstract actions dispatched to the input collaborator.
    Actions,
    /// Signal faults and terminal goal outcomes.
    Alerts,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    verdicts: broadcast::Sender<Event>,
    transitions: broadcast::Sender<Event>,
    actions: broadcast::Sender<Event>,
    alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus; `capacity` is applied to every topic channel
    /// independently.
    pub fn new(capacity: usize) -> Self {
        let (verdicts, _) = broadcast::channel(capacity);
        let (transitions, _) = broadcast::channel(capacity);
        let (actions, _) = broadcast::channel(capacity);
        let (alerts, _) = broadcast::channel(capacity);
        Self {
            verdicts,
            transitions,
            actions,
            alerts,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event, or
    /// [`NavError::Channel`] when nobody is listening on the topic. Callers
    /// that treat an unobserved event as normal should drop the error.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, NavError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| NavError::Channel(format!("no subscribers for topic {topic:?}")))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Verdicts => &self.verdicts,
            Topic::Transitions => &self.transitions,
            Topic::Actions => &self.actions,
            Topic::Alerts => &self.alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped. The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`recv`][Self::recv].
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visnav_types::{EventPayload, NavPhase};

    fn make_event(source: &str) -> Event {
        Event::now(
            source,
            EventPayload::Transition {
                from: NavPhase::InProgress,
                to: NavPhase::InTarget,
                attempt: 1,
                recovery_tier: 0,
            },
        )
    }

    #[tokio::test]
    async fn publish_and_receive() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Transitions);

        let event = make_event("visnav-runtime::engine");
        bus.publish_to(Topic::Transitions, event.clone())?;

        let received = rx.recv().await?;
        assert_eq!(received.id, event.id);
        assert_eq!(received.source, event.source);
        Ok(())
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe_to(Topic::Verdicts);
        let mut rx2 = bus.subscribe_to(Topic::Verdicts);

        let event = make_event("visnav-runtime::engine");
        bus.publish_to(Topic::Verdicts, event.clone())?;

        assert_eq!(rx1.recv().await?.id, event.id);
        assert_eq!(rx2.recv().await?.id, event.id);
        Ok(())
    }

    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::Alerts);
        let _verdicts = bus.subscribe_to(Topic::Verdicts);

        bus.publish_to(Topic::Verdicts, make_event("visnav-runtime::engine"))?;

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            alerts.recv(),
        )
        .await;
        assert!(
            result.is_err(),
            "Alerts subscriber must not receive a Verdicts event"
        );
        Ok(())
    }

    #[test]
    fn publish_without_subscribers_is_an_error() {
        let bus = EventBus::default();
        let result = bus.publish_to(Topic::Actions, make_event("test"));
        assert!(matches!(result, Err(NavError::Channel(_))));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking() {
        let bus = EventBus::new(64);
        let mut slow = bus.subscribe_to(Topic::Verdicts);

        for _ in 0..10_000 {
            let _ = bus.publish_to(Topic::Verdicts, make_event("flood::verdicts"));
        }

        let result = slow.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
    }
}
