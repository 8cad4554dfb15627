//! Step execution with a call-scoped value cache
//!
//! The engine runs an already-resolved step list in order. Each step pulls
//! its inputs from the cache and writes its outputs back, so by the time a
//! step runs every producer of its inputs has already written its values.
//!
//! # Key Concepts
//!
//! - **Call-scoped cache**: created from the caller's inputs, owned by one
//!   call, dropped when the call returns
//! - **Training pass**: trainable steps are fitted before they compute, so
//!   downstream steps see outputs of the freshly fitted step
//! - **Supplied values win**: a slot the caller supplied is never
//!   overwritten by a recomputation

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::arena::{StepArena, StepEntry};
use crate::error::{Result, StepGraphError};
use crate::events::{emit, EventSink, PipelineEvent};
use crate::types::{DataSlot, StepId};

/// Values computed or supplied during one call
pub type Cache<V> = HashMap<DataSlot, V>;

/// Training targets per output slot; `None` means no target
pub type TargetMap<V> = BTreeMap<DataSlot, Option<V>>;

/// Runs resolved steps for one call
pub struct ExecutionEngine<'a> {
    run_id: &'a str,
    events: &'a dyn EventSink,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(run_id: &'a str, events: &'a dyn EventSink) -> Self {
        Self { run_id, events }
    }

    /// Run `steps` in order, computing outputs only
    pub fn predict<V: Clone>(
        &self,
        arena: &StepArena<V>,
        steps: &[StepId],
        mut cache: Cache<V>,
    ) -> Result<Cache<V>> {
        let supplied: HashSet<DataSlot> = cache.keys().copied().collect();

        for &step in steps {
            let entry = arena.entry(step);
            emit(self.events, PipelineEvent::step_started(self.run_id, &entry.name));

            let inputs = gather_inputs(arena, entry, &cache)?;
            self.compute(arena, entry, &inputs, &supplied, &mut cache)?;
        }

        Ok(cache)
    }

    /// Run `steps` in order, fitting trainable steps before they compute
    ///
    /// A step is fitted with the targets of its outputs that have a value
    /// in `targets`, in output order; outputs without one are skipped.
    pub fn train<V: Clone>(
        &self,
        arena: &mut StepArena<V>,
        steps: &[StepId],
        mut cache: Cache<V>,
        targets: &TargetMap<V>,
    ) -> Result<Cache<V>> {
        let supplied: HashSet<DataSlot> = cache.keys().copied().collect();

        for &step in steps {
            let inputs = {
                let entry = arena.entry(step);
                emit(self.events, PipelineEvent::step_started(self.run_id, &entry.name));
                gather_inputs(arena, entry, &cache)?
            };

            let entry = arena.entry_mut(step);
            if entry.capabilities.train {
                let step_targets: Vec<V> = entry
                    .outputs
                    .iter()
                    .filter_map(|slot| targets.get(slot).cloned().flatten())
                    .collect();

                entry
                    .step
                    .fit(&inputs, &step_targets)
                    .map_err(|e| StepGraphError::step_failed(entry.name.as_str(), e))?;

                log::trace!(
                    "Fitted step '{}' with {} targets",
                    entry.name,
                    step_targets.len()
                );
                emit(
                    self.events,
                    PipelineEvent::StepFitted {
                        run_id: self.run_id.to_string(),
                        step: entry.name.clone(),
                        targets: step_targets.len(),
                    },
                );
            }

            self.compute(arena, arena.entry(step), &inputs, &supplied, &mut cache)?;
        }

        Ok(cache)
    }

    fn compute<V>(
        &self,
        arena: &StepArena<V>,
        entry: &StepEntry<V>,
        inputs: &[V],
        supplied: &HashSet<DataSlot>,
        cache: &mut Cache<V>,
    ) -> Result<()> {
        let output = if entry.capabilities.predict {
            entry.step.predict(inputs)
        } else if entry.capabilities.transform {
            entry.step.transform(inputs)
        } else {
            return Err(StepGraphError::UncomputableStep {
                step: entry.name.clone(),
            });
        };

        let values = output
            .map_err(|e| StepGraphError::step_failed(entry.name.as_str(), e))?
            .into_vec();
        if values.len() != entry.outputs.len() {
            return Err(StepGraphError::OutputCountMismatch {
                step: entry.name.clone(),
                expected: entry.outputs.len(),
                actual: values.len(),
            });
        }

        for (slot, value) in entry.outputs.iter().zip(values) {
            if supplied.contains(slot) {
                let output = arena.name_of(*slot);
                log::warn!(
                    "Step '{}' recomputed supplied output '{}'; keeping the supplied value",
                    entry.name,
                    output
                );
                emit(
                    self.events,
                    PipelineEvent::SuppliedOutputRetained {
                        run_id: self.run_id.to_string(),
                        step: entry.name.clone(),
                        output: output.to_string(),
                    },
                );
                continue;
            }
            cache.insert(*slot, value);
        }

        log::trace!("Computed step '{}'", entry.name);
        emit(self.events, PipelineEvent::step_completed(self.run_id, &entry.name));
        Ok(())
    }
}

/// Read the requested outputs from a finished cache, in request order
pub fn read_outputs<V: Clone>(
    arena: &StepArena<V>,
    cache: &Cache<V>,
    outputs: &[DataSlot],
) -> Result<Vec<V>> {
    outputs
        .iter()
        .map(|slot| {
            cache
                .get(slot)
                .cloned()
                .ok_or_else(|| StepGraphError::MissingOutput {
                    name: arena.name_of(*slot).to_string(),
                })
        })
        .collect()
}

fn gather_inputs<V: Clone>(
    arena: &StepArena<V>,
    entry: &StepEntry<V>,
    cache: &Cache<V>,
) -> Result<Vec<V>> {
    entry
        .inputs
        .iter()
        .map(|slot| {
            cache
                .get(slot)
                .cloned()
                .ok_or_else(|| StepGraphError::MissingInput {
                    names: vec![arena.name_of(*slot).to_string()],
                })
        })
        .collect()
}
