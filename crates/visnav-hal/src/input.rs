//! Generic input-dispatch trait.

use async_trait::async_trait;
use visnav_types::{NavError, UiAction};

/// The external action collaborator.
///
/// Each dispatch fires the abstract action and resolves once the underlying
/// input stack has accepted it; the caller then waits out the settle delay
/// before re-capturing. Drivers hold no navigation logic – tier selection
/// and sequencing live entirely in the runtime.
#[async_trait]
pub trait InputDriver: Send + Sync {
    /// Stable identifier for this driver, e.g. `"coregraphics"`.
    fn id(&self) -> &str;

    /// Fire one abstract action and await its completion signal.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::ActionFailed`] when the action cannot be
    /// delivered to the target application.
    async fn dispatch(&self, action: &UiAction) -> Result<(), NavError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use visnav_types::KeyName;

    struct RecordingDriver {
        log: Mutex<Vec<UiAction>>,
    }

    #[async_trait]
    impl InputDriver for RecordingDriver {
        fn id(&self) -> &str {
            "recording"
        }

        async fn dispatch(&self, action: &UiAction) -> Result<(), NavError> {
            self.log.lock().unwrap().push(action.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_records_action() {
        let driver = RecordingDriver {
            log: Mutex::new(Vec::new()),
        };
        driver
            .dispatch(&UiAction::PressKey {
                key: KeyName::Escape,
            })
            .await
            .unwrap();
        assert_eq!(driver.log.lock().unwrap().len(), 1);
    }
}
