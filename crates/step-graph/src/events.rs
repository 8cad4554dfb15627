//! Event types for reporting run progress and advisories
//!
//! Events are sent from the model to any consumer. Advisory conditions
//! (unused inputs, retained supplied values) travel here rather than
//! through `Result`, so they never block a call.

use serde::{Deserialize, Serialize};

/// Trait for receiving pipeline events
///
/// This abstracts over the transport mechanism (channel, log, collector)
/// so the model can be embedded in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be delivered (e.g., channel closed)
    fn send(&self, event: PipelineEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Phase of a model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Train,
    Predict,
}

/// Events emitted while a model resolves and runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PipelineEvent {
    /// Resolution finished; `steps` will run in this order
    #[serde(rename_all = "camelCase")]
    RunStarted {
        model: String,
        run_id: String,
        phase: RunPhase,
        steps: Vec<String>,
    },

    /// All steps ran and the outputs were read back
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        model: String,
        run_id: String,
        phase: RunPhase,
    },

    /// A step or the output read-back failed after the run started
    #[serde(rename_all = "camelCase")]
    RunFailed {
        model: String,
        run_id: String,
        phase: RunPhase,
        error: String,
    },

    /// A step is about to run
    #[serde(rename_all = "camelCase")]
    StepStarted { run_id: String, step: String },

    /// A step's training operation returned
    #[serde(rename_all = "camelCase")]
    StepFitted {
        run_id: String,
        step: String,
        targets: usize,
    },

    /// A step's outputs were written to the cache
    #[serde(rename_all = "camelCase")]
    StepCompleted { run_id: String, step: String },

    /// A supplied input is not needed for the requested outputs
    #[serde(rename_all = "camelCase")]
    UnusedInput {
        model: String,
        run_id: Option<String>,
        input: String,
    },

    /// A step recomputed a slot the caller supplied; the supplied value was kept
    #[serde(rename_all = "camelCase")]
    SuppliedOutputRetained {
        run_id: String,
        step: String,
        output: String,
    },
}

impl PipelineEvent {
    /// Create a step started event
    pub fn step_started(run_id: &str, step: &str) -> Self {
        Self::StepStarted {
            run_id: run_id.to_string(),
            step: step.to_string(),
        }
    }

    /// Create a step completed event
    pub fn step_completed(run_id: &str, step: &str) -> Self {
        Self::StepCompleted {
            run_id: run_id.to_string(),
            step: step.to_string(),
        }
    }

    /// Whether this event reports an advisory condition
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            Self::UnusedInput { .. } | Self::SuppliedOutputRetained { .. }
        )
    }
}

/// Deliver an event, logging (not propagating) delivery failures
pub(crate) fn emit(sink: &dyn EventSink, event: PipelineEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropped pipeline event: {}", e);
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: PipelineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: parking_lot::Mutex<Vec<PipelineEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    /// Get collected advisory events only
    pub fn advisories(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_advisory())
            .cloned()
            .collect()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: PipelineEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedSink;

    impl EventSink for ClosedSink {
        fn send(&self, _event: PipelineEvent) -> Result<(), EventError> {
            Err(EventError::channel_closed())
        }
    }

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(PipelineEvent::step_started("run1", "scaler")).unwrap();
        sink.send(PipelineEvent::UnusedInput {
            model: "m".to_string(),
            run_id: Some("run1".to_string()),
            input: "x".to_string(),
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            PipelineEvent::StepStarted { step, .. } => assert_eq!(step, "scaler"),
            _ => panic!("Expected StepStarted event"),
        }
        assert_eq!(sink.advisories().len(), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(PipelineEvent::step_completed("run1", "scaler"))
            .unwrap();
    }

    #[test]
    fn test_emit_swallows_delivery_failure() {
        emit(&ClosedSink, PipelineEvent::step_started("run1", "scaler"));
    }

    #[test]
    fn test_run_failed_serialization() {
        let event = PipelineEvent::RunFailed {
            model: "m".to_string(),
            run_id: "run1".to_string(),
            phase: RunPhase::Predict,
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "runFailed");
        assert_eq!(json["phase"], "predict");
        assert!(!event.is_advisory());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = PipelineEvent::StepFitted {
            run_id: "run1".to_string(),
            step: "pca".to_string(),
            targets: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stepFitted");
        assert_eq!(json["runId"], "run1");

        let restored: PipelineEvent = serde_json::from_value(json).unwrap();
        assert_eq!(restored, event);
    }
}
