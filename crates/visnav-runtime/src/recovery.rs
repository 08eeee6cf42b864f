//! [`RecoveryExecutor`] – tier → action-sequence lookup and dispatch.
//!
//! The executor holds no decision logic: it resolves a recovery tier to its
//! configured ordered action list, fires each action at the input
//! collaborator, awaits its completion, publishes it on the bus, and waits
//! out the settle delay. Which tier runs, and when, is decided entirely by
//! the navigation session.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};
use visnav_hal::InputDriver;
use visnav_middleware::{EventBus, Topic};
use visnav_types::{Event, EventPayload, NavError, UiAction};

use crate::config::EngineConfig;

const SOURCE: &str = "visnav-runtime::recovery";

/// Dispatches step actions and recovery tier sequences.
pub struct RecoveryExecutor {
    tiers: Vec<Vec<UiAction>>,
    settle: Duration,
}

impl RecoveryExecutor {
    pub fn new(tiers: Vec<Vec<UiAction>>, settle: Duration) -> Self {
        Self { tiers, settle }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.recovery_tiers.clone(), config.settle_delay())
    }

    /// Highest configured tier.
    pub fn max_tier(&self) -> u8 {
        (self.tiers.len().saturating_sub(1)) as u8
    }

    /// The ordered action list for `tier` (empty for unconfigured tiers).
    pub fn tier_actions(&self, tier: u8) -> &[UiAction] {
        self.tiers
            .get(tier as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Run the full sequence for `tier`.
    pub async fn run_tier(
        &self,
        tier: u8,
        input: &dyn InputDriver,
        bus: &EventBus,
    ) -> Result<(), NavError> {
        info!(tier, "running recovery tier sequence");
        let actions = self.tier_actions(tier).to_vec();
        self.run_actions(&actions, input, bus).await
    }

    /// Fire each action in order: dispatch, await completion, publish,
    /// settle.
    pub async fn run_actions(
        &self,
        actions: &[UiAction],
        input: &dyn InputDriver,
        bus: &EventBus,
    ) -> Result<(), NavError> {
        for action in actions {
            debug!(?action, "dispatching action");
            input.dispatch(action).await?;
            // No subscribers on the Actions lane is a normal condition.
            let _ = bus.publish_to(
                Topic::Actions,
                Event::now(SOURCE, EventPayload::ActionDispatched(action.clone())),
            );
            sleep(self.settle).await;
        }
        Ok(())
    }
}
