//! Engine configuration surface.
//!
//! Everything tunable about the perception/navigation cycle lives here with
//! serde defaults, so a partial TOML file overrides only what it names. The
//! stock numbers are field-tuned starting points, not derived values;
//! validate them empirically per deployment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use visnav_perception::FusionConfig;
use visnav_types::{KeyName, UiAction};

/// Configuration bundle for the navigation engine.
///
/// Scalar fields come first so the struct serializes cleanly to TOML with
/// the nested tables at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum recalibration re-runs per navigation step.
    #[serde(default = "default_max_recalibrations")]
    pub max_recalibrations: u32,

    /// Context-history window K for oscillation detection.
    #[serde(default = "default_loop_window")]
    pub loop_window: usize,

    /// Per-signal evaluation budget, in milliseconds.
    #[serde(default = "default_signal_timeout_ms")]
    pub signal_timeout_ms: u64,

    /// Delay after each dispatched action before re-capturing.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Maximum action attempts per navigation goal.
    #[serde(default = "default_attempt_budget")]
    pub attempt_budget: u32,

    /// Wall-clock budget per navigation goal, in milliseconds.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,

    /// Ordered recovery tier sequences; index 0 is the routine
    /// navigate-back step, later tiers escalate.
    #[serde(default = "default_recovery_tiers")]
    pub recovery_tiers: Vec<Vec<UiAction>>,

    /// Fusion thresholds (HIGH_T, MID_T, disagreement gap).
    #[serde(default)]
    pub fusion: FusionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_recalibrations: default_max_recalibrations(),
            loop_window: default_loop_window(),
            signal_timeout_ms: default_signal_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            attempt_budget: default_attempt_budget(),
            time_budget_ms: default_time_budget_ms(),
            recovery_tiers: default_recovery_tiers(),
            fusion: FusionConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn signal_timeout(&self) -> Duration {
        Duration::from_millis(self.signal_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    /// Highest configured recovery tier.
    pub fn max_tier(&self) -> u8 {
        (self.recovery_tiers.len().saturating_sub(1)) as u8
    }
}

fn default_max_recalibrations() -> u32 {
    3
}

fn default_loop_window() -> usize {
    4
}

fn default_signal_timeout_ms() -> u64 {
    2_000
}

fn default_settle_delay_ms() -> u64 {
    1_500
}

fn default_attempt_budget() -> u32 {
    8
}

fn default_time_budget_ms() -> u64 {
    120_000
}

/// The escalation ladder: navigate back, re-assert focus, hammer the common
/// menu keys, restore the window, relaunch.
fn default_recovery_tiers() -> Vec<Vec<UiAction>> {
    vec![
        vec![UiAction::PressKey {
            key: KeyName::Escape,
        }],
        vec![
            UiAction::ActivateWindow,
            UiAction::PressKey {
                key: KeyName::Escape,
            },
        ],
        vec![
            UiAction::PressKey {
                key: KeyName::Escape,
            },
            UiAction::PressKey {
                key: KeyName::Return,
            },
            UiAction::PressKey {
                key: KeyName::Space,
            },
        ],
        vec![UiAction::RestoreWindow, UiAction::ActivateWindow],
        vec![UiAction::Relaunch],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_recalibrations, 3);
        assert_eq!(config.loop_window, 4);
        assert_eq!(config.signal_timeout(), Duration::from_secs(2));
        assert_eq!(config.attempt_budget, 8);
        assert_eq!(config.recovery_tiers.len(), 5);
        assert_eq!(config.max_tier(), 4);
    }

    #[test]
    fn tier_zero_is_a_single_navigate_back() {
        let config = EngineConfig::default();
        assert_eq!(
            config.recovery_tiers[0],
            vec![UiAction::PressKey {
                key: KeyName::Escape
            }]
        );
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "attempt_budget": 3, "loop_window": 6 }"#).unwrap();
        assert_eq!(config.attempt_budget, 3);
        assert_eq!(config.loop_window, 6);
        // Everything else keeps its default.
        assert_eq!(config.max_recalibrations, 3);
        assert_eq!(config.fusion.high_threshold, 0.8);
    }

    #[test]
    fn config_roundtrips_through_serde() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.recovery_tiers, config.recovery_tiers);
        assert_eq!(back.time_budget_ms, config.time_budget_ms);
    }
}
