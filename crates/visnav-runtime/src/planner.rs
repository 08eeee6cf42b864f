//! [`StepPlanner`] – the routine navigation decision matrix.
//!
//! Maps a (current, target) context pair to the next step action:
//!
//! * Already at the target → nothing to do.
//! * The current context has a button leading to the target (or to a
//!   context that in turn leads to it) → click it.
//! * Otherwise → the navigate-back sequence, walking up toward the menu
//!   root where a forward route exists. Unknown contexts take the same
//!   path; if the screen stays unreadable the budgets decide.
//!
//! The planner holds no escalation logic; it only answers "what would a
//! routine step look like from here".

use visnav_perception::ContextCatalog;
use visnav_types::{ContextLabel, UiAction};

/// Chooses the next routine step toward a target context.
pub struct StepPlanner {
    catalog: ContextCatalog,
}

impl StepPlanner {
    pub fn new(catalog: ContextCatalog) -> Self {
        Self { catalog }
    }

    /// The next step from `current` toward `target`.
    ///
    /// `navigate_back` is the configured tier-0 sequence, returned verbatim
    /// whenever walking up the hierarchy is the best move. An empty vector
    /// means there is nothing to do (already at the target label).
    pub fn step(
        &self,
        current: ContextLabel,
        target: ContextLabel,
        navigate_back: &[UiAction],
    ) -> Vec<UiAction> {
        if current == target {
            return Vec::new();
        }

        // Direct forward route.
        if let Some(button) = self.catalog.route_button(current, target) {
            return vec![UiAction::Click {
                x: button.x,
                y: button.y,
            }];
        }

        // One level of lookahead: click toward an intermediate context that
        // has its own route to the target.
        if let Some(profile) = self.catalog.get(current) {
            for button in &profile.buttons {
                if self.catalog.route_button(button.leads_to, target).is_some() {
                    return vec![UiAction::Click {
                        x: button.x,
                        y: button.y,
                    }];
                }
            }
        }

        navigate_back.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visnav_types::KeyName;

    fn planner() -> StepPlanner {
        StepPlanner::new(ContextCatalog::default())
    }

    fn back() -> Vec<UiAction> {
        vec![UiAction::PressKey {
            key: KeyName::Escape,
        }]
    }

    #[test]
    fn at_target_plans_nothing() {
        let actions = planner().step(ContextLabel::MainMenu, ContextLabel::MainMenu, &back());
        assert!(actions.is_empty());
    }

    #[test]
    fn submenu_to_main_menu_navigates_back() {
        let actions = planner().step(
            ContextLabel::SinglePlayerMenu,
            ContextLabel::MainMenu,
            &back(),
        );
        assert_eq!(actions, back());
    }

    #[test]
    fn in_game_to_main_menu_navigates_back() {
        let actions = planner().step(ContextLabel::InGame, ContextLabel::MainMenu, &back());
        assert_eq!(actions, back());
    }

    #[test]
    fn main_menu_to_submenu_clicks_the_button() {
        let actions = planner().step(
            ContextLabel::MainMenu,
            ContextLabel::SinglePlayerMenu,
            &back(),
        );
        match actions.as_slice() {
            [UiAction::Click { x, y }] => {
                assert!((x - 0.5).abs() < 1e-5);
                assert!((y - 0.5896).abs() < 1e-5);
            }
            other => panic!("expected a click, got {other:?}"),
        }
    }

    #[test]
    fn unknown_context_navigates_back() {
        let actions = planner().step(ContextLabel::Unknown, ContextLabel::MainMenu, &back());
        assert_eq!(actions, back());
    }

    #[test]
    fn sideways_move_goes_back_first() {
        // Options → SinglePlayer has no forward route; go up.
        let actions = planner().step(
            ContextLabel::OptionsMenu,
            ContextLabel::SinglePlayerMenu,
            &back(),
        );
        assert_eq!(actions, back());
    }
}
