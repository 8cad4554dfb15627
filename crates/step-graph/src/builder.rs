//! Fluent builder for models
//!
//! Provides a fluent API for declaring a model's inputs, outputs, name,
//! settings and event sink before the graph is assembled.

use std::sync::Arc;

use crate::arena::StepArena;
use crate::config::ModelSettings;
use crate::error::Result;
use crate::events::{EventSink, NullEventSink};
use crate::model::Model;
use crate::types::DataSlot;

/// Name used when a model is built without one
pub const DEFAULT_MODEL_NAME: &str = "model";

/// Fluent builder for constructing models
///
/// # Example
///
/// ```ignore
/// let model = ModelBuilder::new(arena)
///     .name("classifier")
///     .input(x)
///     .output(prediction)
///     .event_sink(Arc::new(VecEventSink::new()))
///     .build()?;
/// ```
pub struct ModelBuilder<V = serde_json::Value> {
    arena: StepArena<V>,
    name: Option<String>,
    inputs: Vec<DataSlot>,
    outputs: Vec<DataSlot>,
    settings: ModelSettings,
    events: Option<Arc<dyn EventSink>>,
}

impl<V: Clone> ModelBuilder<V> {
    /// Create a new model builder over the given arena
    pub fn new(arena: StepArena<V>) -> Self {
        Self {
            arena,
            name: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            settings: ModelSettings::default(),
            events: None,
        }
    }

    /// Set the model name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare one input slot
    pub fn input(mut self, slot: DataSlot) -> Self {
        self.inputs.push(slot);
        self
    }

    /// Declare several input slots, in order
    pub fn inputs(mut self, slots: impl IntoIterator<Item = DataSlot>) -> Self {
        self.inputs.extend(slots);
        self
    }

    /// Declare one output slot
    pub fn output(mut self, slot: DataSlot) -> Self {
        self.outputs.push(slot);
        self
    }

    /// Declare several output slots, in order
    pub fn outputs(mut self, slots: impl IntoIterator<Item = DataSlot>) -> Self {
        self.outputs.extend(slots);
        self
    }

    /// Replace the model settings
    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Send run events and advisories to `sink`
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Assemble and validate the model
    pub fn build(self) -> Result<Model<V>> {
        Model::assemble(
            self.arena,
            self.inputs,
            self.outputs,
            self.name.unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            self.settings,
            self.events.unwrap_or_else(|| Arc::new(NullEventSink)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnusedInputPolicy;
    use crate::events::VecEventSink;
    use crate::step::{FnStep, StepOutput};

    #[test]
    fn test_builder_defaults() {
        let mut arena: StepArena<i64> = StepArena::new();
        let x = arena.add_input("x").unwrap();
        let y = arena
            .add("y", FnStep::transform(|xs| Ok(StepOutput::Single(xs[0]))), &[x])
            .unwrap();

        let model = ModelBuilder::new(arena)
            .input(x)
            .output(y.output())
            .build()
            .unwrap();

        assert_eq!(model.name(), DEFAULT_MODEL_NAME);
        assert_eq!(model.inputs(), &[x]);
        assert_eq!(model.outputs(), &[y.output()]);
        assert_eq!(model.settings().unused_inputs, UnusedInputPolicy::Warn);
    }

    #[test]
    fn test_builder_reports_unused_declared_input() {
        let mut arena: StepArena<i64> = StepArena::new();
        let x = arena.add_input("x").unwrap();
        let extra = arena.add_input("extra").unwrap();
        let y = arena
            .add("y", FnStep::transform(|xs| Ok(StepOutput::Single(xs[0]))), &[x])
            .unwrap();

        let sink = Arc::new(VecEventSink::new());
        ModelBuilder::new(arena)
            .name("m")
            .inputs([x, extra])
            .outputs([y.output()])
            .event_sink(sink.clone())
            .build()
            .unwrap();

        assert_eq!(sink.advisories().len(), 1);
    }
}
