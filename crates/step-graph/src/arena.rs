//! Step arena: ownership of steps and their data slots
//!
//! Steps and slots live in flat vectors and are referred to by index
//! handles (`StepId`, `DataSlot`). A slot records the step that produces
//! it, so wiring stays acyclic in memory even when the step graph is not.
//!
//! # Usage
//!
//! ```ignore
//! use step_graph::{FnStep, StepArena, StepOutput};
//!
//! let mut arena = StepArena::new();
//! let x = arena.add_input("x")?;
//! let double = arena.add("double", FnStep::transform(|xs| Ok(StepOutput::Single(xs[0].clone()))), &[x])?;
//! ```

use crate::error::{Result, StepGraphError};
use crate::step::{InputStep, Step};
use crate::types::{ArenaId, Capabilities, DataSlot, StepDescriptor, StepId};

/// A registered step with its wiring
pub(crate) struct StepEntry<V> {
    pub(crate) name: String,
    pub(crate) step: Box<dyn Step<V>>,
    pub(crate) inputs: Vec<DataSlot>,
    pub(crate) outputs: Vec<DataSlot>,
    pub(crate) capabilities: Capabilities,
}

struct SlotEntry {
    name: String,
    producer: StepId,
}

/// Handle returned when a step is added
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepHandle {
    /// The registered step
    pub id: StepId,
    /// Its output slots, in declaration order (never empty)
    pub outputs: Vec<DataSlot>,
}

impl StepHandle {
    /// The first (for single-output steps, the only) output slot
    pub fn output(&self) -> DataSlot {
        self.outputs[0]
    }

    /// The output slot at `position`
    pub fn output_at(&self, position: usize) -> Option<DataSlot> {
        self.outputs.get(position).copied()
    }
}

/// Owner of all steps and slots that models are built from
pub struct StepArena<V = serde_json::Value> {
    id: ArenaId,
    steps: Vec<StepEntry<V>>,
    slots: Vec<SlotEntry>,
}

impl<V> StepArena<V> {
    /// Create a new empty arena
    pub fn new() -> Self {
        Self {
            id: ArenaId::next(),
            steps: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Register a step consuming `inputs`
    ///
    /// Output slots are named after the step: a single output takes the
    /// step's name, several outputs are named `<step>/<position>`.
    ///
    /// Fails if the name is empty or contains `/`, if the step declares no
    /// outputs, if a step with inputs can neither predict nor transform, or
    /// if an input slot belongs to another arena.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        step: impl Step<V> + 'static,
        inputs: &[DataSlot],
    ) -> Result<StepHandle> {
        let name = name.into();
        validate_step_name(&name)?;
        self.check_slots(inputs)?;

        let capabilities = step.capabilities();
        if !inputs.is_empty() && !capabilities.is_computable() {
            return Err(StepGraphError::UncomputableStep { step: name });
        }

        let output_count = step.output_count();
        if output_count == 0 {
            return Err(StepGraphError::InvalidStepName {
                name,
                reason: "a step must declare at least one output".to_string(),
            });
        }

        let id = StepId {
            arena: self.id,
            index: self.steps.len(),
        };
        let outputs: Vec<DataSlot> = (0..output_count)
            .map(|position| {
                let slot = DataSlot {
                    arena: self.id,
                    index: self.slots.len(),
                };
                let slot_name = if output_count == 1 {
                    name.clone()
                } else {
                    format!("{}/{}", name, position)
                };
                self.slots.push(SlotEntry {
                    name: slot_name,
                    producer: id,
                });
                slot
            })
            .collect();

        log::trace!(
            "Registered step '{}' ({} inputs, {} outputs)",
            name,
            inputs.len(),
            outputs.len()
        );

        self.steps.push(StepEntry {
            name,
            step: Box::new(step),
            inputs: inputs.to_vec(),
            outputs: outputs.clone(),
            capabilities,
        });

        Ok(StepHandle { id, outputs })
    }

    /// Register a data entry point and return its slot
    pub fn add_input(&mut self, name: impl Into<String>) -> Result<DataSlot> {
        Ok(self.add(name, InputStep, &[])?.output())
    }

    /// Replace the inputs of an existing step
    ///
    /// This is the only way to wire a step to a slot produced later, and
    /// therefore the only way to close a cycle.
    pub fn set_inputs(&mut self, step: StepId, inputs: &[DataSlot]) -> Result<()> {
        self.check_step(step)?;
        self.check_slots(inputs)?;

        let entry = &mut self.steps[step.index];
        if !inputs.is_empty() && !entry.capabilities.is_computable() {
            return Err(StepGraphError::UncomputableStep {
                step: entry.name.clone(),
            });
        }
        entry.inputs = inputs.to_vec();
        Ok(())
    }

    /// Whether `slot` was issued by this arena
    pub fn contains_slot(&self, slot: DataSlot) -> bool {
        slot.arena == self.id && slot.index < self.slots.len()
    }

    /// Whether `step` was issued by this arena
    pub fn contains_step(&self, step: StepId) -> bool {
        step.arena == self.id && step.index < self.steps.len()
    }

    /// Name of a slot
    pub fn slot_name(&self, slot: DataSlot) -> Option<&str> {
        self.contains_slot(slot)
            .then(|| self.slots[slot.index].name.as_str())
    }

    /// Step producing a slot
    pub fn producer(&self, slot: DataSlot) -> Option<StepId> {
        self.contains_slot(slot)
            .then(|| self.slots[slot.index].producer)
    }

    /// Find a slot by exact name
    pub fn slot_by_name(&self, name: &str) -> Option<DataSlot> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .map(|index| DataSlot {
                arena: self.id,
                index,
            })
    }

    /// Name of a step
    pub fn step_name(&self, step: StepId) -> Option<&str> {
        self.contains_step(step)
            .then(|| self.steps[step.index].name.as_str())
    }

    /// Input slots of a step
    pub fn step_inputs(&self, step: StepId) -> Option<&[DataSlot]> {
        self.contains_step(step)
            .then(|| self.steps[step.index].inputs.as_slice())
    }

    /// Output slots of a step
    pub fn step_outputs(&self, step: StepId) -> Option<&[DataSlot]> {
        self.contains_step(step)
            .then(|| self.steps[step.index].outputs.as_slice())
    }

    /// Declared capabilities of a step
    pub fn capabilities(&self, step: StepId) -> Option<Capabilities> {
        self.contains_step(step)
            .then(|| self.steps[step.index].capabilities)
    }

    /// Serializable description of a step
    pub fn describe(&self, step: StepId) -> Option<StepDescriptor> {
        let entry = self.contains_step(step).then(|| &self.steps[step.index])?;
        Some(StepDescriptor {
            name: entry.name.clone(),
            inputs: self.slot_names(&entry.inputs),
            outputs: self.slot_names(&entry.outputs),
            capabilities: entry.capabilities,
        })
    }

    /// All step handles, in registration order
    pub fn step_ids(&self) -> impl Iterator<Item = StepId> + '_ {
        (0..self.steps.len()).map(move |index| StepId {
            arena: self.id,
            index,
        })
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fail with `InvalidSlot` unless every slot belongs to this arena
    pub fn check_slots(&self, slots: &[DataSlot]) -> Result<()> {
        match slots.iter().find(|slot| !self.contains_slot(**slot)) {
            Some(slot) => Err(StepGraphError::InvalidSlot(format!(
                "slot #{} does not belong to this arena",
                slot.index
            ))),
            None => Ok(()),
        }
    }

    fn check_step(&self, step: StepId) -> Result<()> {
        if self.contains_step(step) {
            Ok(())
        } else {
            Err(StepGraphError::UnknownStep(format!(
                "step #{} does not belong to this arena",
                step.index
            )))
        }
    }

    // Internal accessors for handles already validated against this arena.

    pub(crate) fn entry(&self, step: StepId) -> &StepEntry<V> {
        &self.steps[step.index]
    }

    pub(crate) fn entry_mut(&mut self, step: StepId) -> &mut StepEntry<V> {
        &mut self.steps[step.index]
    }

    pub(crate) fn producer_of(&self, slot: DataSlot) -> StepId {
        self.slots[slot.index].producer
    }

    pub(crate) fn name_of(&self, slot: DataSlot) -> &str {
        &self.slots[slot.index].name
    }

    pub(crate) fn slot_names(&self, slots: &[DataSlot]) -> Vec<String> {
        slots.iter().map(|s| self.name_of(*s).to_string()).collect()
    }
}

impl<V> Default for StepArena<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_step_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StepGraphError::InvalidStepName {
            name: name.to_string(),
            reason: "name must not be empty".to_string(),
        });
    }
    if name.contains('/') {
        return Err(StepGraphError::InvalidStepName {
            name: name.to_string(),
            reason: "'/' is reserved for output slot names".to_string(),
        });
    }
    Ok(())
}
