use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

use crate::config::ActionConfig;
use crate::detection::TriggerEvent;

pub const TRIGGER_ENV: &str = "WAKEGATE_TRIGGER";
pub const AVERAGE_ENV: &str = "WAKEGATE_AVERAGE";

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Failed to spawn trigger command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Failed to encode trigger event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Trigger command exited with status {code:?}")]
    Failed { code: Option<i32> },

    #[error("Trigger command timed out after {0:?}")]
    TimedOut(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Skipped,
    Completed,
}

/// Reacts to a trigger by running the configured shell command.
#[derive(Debug, Clone)]
pub struct TriggerAction {
    command: Option<String>,
    timeout: Duration,
}

impl TriggerAction {
    pub fn new(command: Option<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_config(config: &ActionConfig, timeout: Duration) -> Self {
        Self::new(config.command.clone(), timeout)
    }

    pub async fn run(&self, event: &TriggerEvent) -> Result<ActionOutcome, ActionError> {
        let Some(command) = self.command.as_deref() else {
            info!("Wake trigger #{} (no action configured)", event.sequence);
            return Ok(ActionOutcome::Skipped);
        };

        let payload = serde_json::to_string(event)?;
        info!("Running trigger command for trigger #{}", event.sequence);

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env(TRIGGER_ENV, payload)
            .env(AVERAGE_ENV, event.average.to_string())
            .kill_on_drop(true)
            .spawn()?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => return Err(ActionError::TimedOut(self.timeout)),
        };

        if !status.success() {
            return Err(ActionError::Failed {
                code: status.code(),
            });
        }

        tracing::debug!("Trigger command finished");
        Ok(ActionOutcome::Completed)
    }
}
