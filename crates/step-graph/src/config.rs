//! Model settings

use serde::{Deserialize, Serialize};

/// How a model reacts to supplied inputs that no requested output needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusedInputPolicy {
    /// Log a warning and emit an `UnusedInput` event
    #[default]
    Warn,
    /// Emit the event only
    Ignore,
    /// Fail the call with `StepGraphError::UnusedInput`
    Deny,
}

/// Behavioral settings of a model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelSettings {
    pub unused_inputs: UnusedInputPolicy,
}

impl ModelSettings {
    pub fn with_unused_inputs(mut self, policy: UnusedInputPolicy) -> Self {
        self.unused_inputs = policy;
        self
    }
}
