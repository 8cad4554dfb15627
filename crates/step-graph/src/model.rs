//! Models: assembled step graphs with train and predict entry points
//!
//! A model is assembled once from declared inputs and outputs. Every call
//! then re-resolves the (possibly smaller) set of steps needed for the data
//! actually supplied and the outputs actually requested, and runs them
//! against a cache owned by that call.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use uuid::Uuid;

use crate::arena::StepArena;
use crate::assembler;
use crate::binder::{DataBinder, DataBinding, SlotKey};
use crate::builder::ModelBuilder;
use crate::config::{ModelSettings, UnusedInputPolicy};
use crate::digraph::DiGraph;
use crate::engine::{read_outputs, ExecutionEngine};
use crate::error::{Result, StepGraphError};
use crate::events::{emit, EventSink, PipelineEvent, RunPhase};
use crate::resolver;
use crate::types::{DataRole, DataSlot, StepDescriptor, StepId};

/// Values returned by [`Model::predict`]
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction<V> {
    /// Exactly one output was requested
    Single(V),
    /// Several outputs, in request order
    Many(Vec<V>),
}

impl<V> Prediction<V> {
    /// The value if exactly one output was requested
    pub fn into_single(self) -> Option<V> {
        match self {
            Self::Single(value) => Some(value),
            Self::Many(_) => None,
        }
    }

    /// All values in request order
    pub fn into_vec(self) -> Vec<V> {
        match self {
            Self::Single(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// An assembled step graph
pub struct Model<V = serde_json::Value> {
    name: String,
    arena: StepArena<V>,
    inputs: Vec<DataSlot>,
    outputs: Vec<DataSlot>,
    graph: DiGraph<StepId>,
    steps: Vec<StepId>,
    settings: ModelSettings,
    events: Arc<dyn EventSink>,
}

impl<V: Clone> Model<V> {
    /// Assemble a model with default settings and no event sink
    ///
    /// Fails if a slot does not belong to `arena`, if reachable steps share
    /// a name, if the graph has a cycle, or if `outputs` cannot be computed
    /// from `inputs`.
    pub fn new(
        arena: StepArena<V>,
        inputs: &[DataSlot],
        outputs: &[DataSlot],
        name: Option<&str>,
    ) -> Result<Self> {
        let mut builder = ModelBuilder::new(arena)
            .inputs(inputs.iter().copied())
            .outputs(outputs.iter().copied());
        if let Some(name) = name {
            builder = builder.name(name);
        }
        builder.build()
    }

    pub(crate) fn assemble(
        arena: StepArena<V>,
        inputs: Vec<DataSlot>,
        outputs: Vec<DataSlot>,
        name: String,
        settings: ModelSettings,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        arena.check_slots(&inputs)?;
        arena.check_slots(&outputs)?;

        let graph = assembler::assemble(&arena, &outputs)?;
        let available: BTreeSet<DataSlot> = inputs.iter().copied().collect();
        let resolution = resolver::resolve(&arena, &graph, &available, &outputs)?;

        let model = Self {
            name,
            arena,
            inputs,
            outputs,
            graph,
            steps: resolution.steps,
            settings,
            events,
        };
        model.report_unused(None, &resolution.unused_inputs)?;

        log::debug!(
            "Model '{}' assembled: {} steps in graph, {} required",
            model.name,
            model.graph.node_count(),
            model.steps.len()
        );
        Ok(model)
    }

    /// Fit the model
    ///
    /// Runs every step needed to reach the outputs named in `target_data`,
    /// fitting trainable steps (with whatever targets their outputs have)
    /// before computing their outputs for downstream steps. Positional
    /// targets are matched to the declared outputs; `DataBinding::none()`
    /// trains toward every declared output without targets.
    pub fn train(
        &mut self,
        input_data: DataBinding<V>,
        target_data: DataBinding<Option<V>>,
    ) -> Result<()> {
        let run_id = Uuid::new_v4().to_string();

        let (inputs, targets) = {
            let binder = DataBinder::new(&self.arena, &self.graph)
                .with_inputs(&self.inputs);
            let inputs = binder.normalize(input_data, &self.inputs, DataRole::Input)?;
            let targets = binder.normalize_targets(target_data, &self.outputs)?;
            (inputs, targets)
        };
        let desired: Vec<DataSlot> = targets.keys().copied().collect();
        let steps = self.prepare(&run_id, RunPhase::Train, &inputs, &desired)?;

        let engine = ExecutionEngine::new(&run_id, self.events.as_ref());
        let outcome = engine.train(
            &mut self.arena,
            &steps,
            inputs.into_iter().collect(),
            &targets,
        );

        self.finish(&run_id, RunPhase::Train, outcome).map(|_| ())
    }

    /// Compute outputs from input data
    ///
    /// `outputs` defaults to the declared outputs. A single requested output
    /// is returned as `Prediction::Single`.
    pub fn predict(
        &self,
        input_data: DataBinding<V>,
        outputs: Option<Vec<SlotKey>>,
    ) -> Result<Prediction<V>> {
        let run_id = Uuid::new_v4().to_string();

        let binder = DataBinder::new(&self.arena, &self.graph)
            .with_inputs(&self.inputs);
        let inputs = binder.normalize(input_data, &self.inputs, DataRole::Input)?;
        let outputs = binder.select_outputs(outputs, &self.outputs)?;
        let steps = self.prepare(&run_id, RunPhase::Predict, &inputs, &outputs)?;

        let engine = ExecutionEngine::new(&run_id, self.events.as_ref());
        let outcome = engine
            .predict(&self.arena, &steps, inputs.into_iter().collect())
            .and_then(|cache| read_outputs(&self.arena, &cache, &outputs));

        let mut values = self.finish(&run_id, RunPhase::Predict, outcome)?;
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return Ok(Prediction::Single(value));
            }
        }
        Ok(Prediction::Many(values))
    }
}

impl<V> Model<V> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared input slots
    pub fn inputs(&self) -> &[DataSlot] {
        &self.inputs
    }

    /// Declared output slots
    pub fn outputs(&self) -> &[DataSlot] {
        &self.outputs
    }

    /// The assembled dependency graph (edges run producer → consumer)
    pub fn graph(&self) -> &DiGraph<StepId> {
        &self.graph
    }

    /// Steps required to go from the declared inputs to the declared outputs
    pub fn steps(&self) -> &[StepId] {
        &self.steps
    }

    /// The arena holding this model's steps
    pub fn arena(&self) -> &StepArena<V> {
        &self.arena
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Descriptions of every step in the graph, in assembly order
    pub fn describe(&self) -> Vec<StepDescriptor> {
        self.graph
            .nodes()
            .filter_map(|step| self.arena.describe(step))
            .collect()
    }

    fn prepare<T>(
        &self,
        run_id: &str,
        phase: RunPhase,
        inputs: &BTreeMap<DataSlot, T>,
        desired: &[DataSlot],
    ) -> Result<Vec<StepId>> {
        let available: BTreeSet<DataSlot> = inputs.keys().copied().collect();
        let resolution = resolver::resolve(&self.arena, &self.graph, &available, desired)?;
        self.report_unused(Some(run_id), &resolution.unused_inputs)?;

        let step_names: Vec<String> = resolution
            .steps
            .iter()
            .map(|step| self.arena.entry(*step).name.clone())
            .collect();
        log::debug!(
            "Model '{}' {:?} run {}: {:?}",
            self.name,
            phase,
            run_id,
            step_names
        );
        emit(
            self.events.as_ref(),
            PipelineEvent::RunStarted {
                model: self.name.clone(),
                run_id: run_id.to_string(),
                phase,
                steps: step_names,
            },
        );
        Ok(resolution.steps)
    }

    /// Close a started run with `RunCompleted` or `RunFailed`
    fn finish<T>(&self, run_id: &str, phase: RunPhase, outcome: Result<T>) -> Result<T> {
        let event = match &outcome {
            Ok(_) => PipelineEvent::RunCompleted {
                model: self.name.clone(),
                run_id: run_id.to_string(),
                phase,
            },
            Err(e) => {
                log::debug!(
                    "Model '{}' {:?} run {} failed: {}",
                    self.name,
                    phase,
                    run_id,
                    e
                );
                PipelineEvent::RunFailed {
                    model: self.name.clone(),
                    run_id: run_id.to_string(),
                    phase,
                    error: e.to_string(),
                }
            }
        };
        emit(self.events.as_ref(), event);
        outcome
    }

    fn report_unused(&self, run_id: Option<&str>, unused: &[DataSlot]) -> Result<()> {
        if unused.is_empty() {
            return Ok(());
        }
        let names = self.arena.slot_names(unused);

        match self.settings.unused_inputs {
            UnusedInputPolicy::Deny => return Err(StepGraphError::UnusedInput { names }),
            UnusedInputPolicy::Warn => {
                for name in &names {
                    log::warn!(
                        "Input '{}' was provided but no requested output needs it",
                        name
                    );
                }
            }
            UnusedInputPolicy::Ignore => {}
        }

        for input in names {
            emit(
                self.events.as_ref(),
                PipelineEvent::UnusedInput {
                    model: self.name.clone(),
                    run_id: run_id.map(str::to_string),
                    input,
                },
            );
        }
        Ok(())
    }
}
