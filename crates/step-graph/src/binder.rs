//! Normalization of caller-supplied data
//!
//! Callers may key data by slot handle or by slot name, or pass it
//! positionally. Everything is normalized to a slot → value map before
//! resolution.

use std::collections::BTreeMap;

use crate::arena::StepArena;
use crate::digraph::DiGraph;
use crate::error::{Result, StepGraphError};
use crate::types::{DataRole, DataSlot, StepId};

/// A reference to a slot, by handle or by name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    Slot(DataSlot),
    Name(String),
}

impl From<DataSlot> for SlotKey {
    fn from(slot: DataSlot) -> Self {
        Self::Slot(slot)
    }
}

impl From<&str> for SlotKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SlotKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Data supplied to a call
#[derive(Debug, Clone, PartialEq)]
pub enum DataBinding<T> {
    /// Values keyed by slot or name
    Keyed(Vec<(SlotKey, T)>),
    /// Values matched to the declared slots in declaration order
    Positional(Vec<T>),
}

impl<T> DataBinding<T> {
    /// Values keyed by slot handle or name
    pub fn keyed<K: Into<SlotKey>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        Self::Keyed(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Values in declaration order
    pub fn positional(values: impl IntoIterator<Item = T>) -> Self {
        Self::Positional(values.into_iter().collect())
    }

    /// A single positional value
    pub fn single(value: T) -> Self {
        Self::Positional(vec![value])
    }
}

impl<T> DataBinding<Option<T>> {
    /// No target for any output
    pub fn none() -> Self {
        Self::Positional(vec![None])
    }
}

/// Resolves caller data against the slots of one model's graph
pub struct DataBinder<'a, V> {
    arena: &'a StepArena<V>,
    graph: &'a DiGraph<StepId>,
    inputs: &'a [DataSlot],
}

impl<'a, V> DataBinder<'a, V> {
    pub fn new(arena: &'a StepArena<V>, graph: &'a DiGraph<StepId>) -> Self {
        Self {
            arena,
            graph,
            inputs: &[],
        }
    }

    /// Also accept these declared inputs, whether or not the graph reaches them
    pub fn with_inputs(mut self, inputs: &'a [DataSlot]) -> Self {
        self.inputs = inputs;
        self
    }

    /// Resolve a key to a declared input or a slot produced by a step of the graph
    pub fn lookup(&self, key: &SlotKey) -> Result<DataSlot> {
        match key {
            SlotKey::Slot(slot) => {
                let known = self.inputs.contains(slot)
                    || self
                        .arena
                        .producer(*slot)
                        .is_some_and(|step| self.graph.contains_node(step));
                if known {
                    Ok(*slot)
                } else {
                    let name = self
                        .arena
                        .slot_name(*slot)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("slot #{}", slot.index()));
                    Err(StepGraphError::unknown_name(name))
                }
            }
            SlotKey::Name(name) => {
                let arena = self.arena;
                self.graph
                    .nodes()
                    .flat_map(move |step| arena.entry(step).outputs.iter().copied())
                    .chain(self.inputs.iter().copied())
                    .find(|slot| arena.name_of(*slot) == name)
                    .ok_or_else(|| StepGraphError::unknown_name(name.as_str()))
            }
        }
    }

    /// Normalize input data (or any data role without placeholder expansion)
    ///
    /// Positional data must match `declared` in length. Keyed entries that
    /// name the same slot twice keep the last value.
    pub fn normalize<T>(
        &self,
        given: DataBinding<T>,
        declared: &[DataSlot],
        role: DataRole,
    ) -> Result<BTreeMap<DataSlot, T>> {
        match given {
            DataBinding::Keyed(entries) => entries
                .into_iter()
                .map(|(key, value)| Ok((self.lookup(&key)?, value)))
                .collect(),
            DataBinding::Positional(values) => {
                if values.len() != declared.len() {
                    return Err(StepGraphError::ArityMismatch {
                        role,
                        expected: declared.len(),
                        actual: values.len(),
                    });
                }
                Ok(declared.iter().copied().zip(values).collect())
            }
        }
    }

    /// Normalize target data
    ///
    /// A single positional `None` expands to "no target for any output".
    pub fn normalize_targets<T>(
        &self,
        given: DataBinding<Option<T>>,
        declared: &[DataSlot],
    ) -> Result<BTreeMap<DataSlot, Option<T>>> {
        let given = match given {
            DataBinding::Positional(values) if values.len() == 1 && values[0].is_none() => {
                DataBinding::Positional(declared.iter().map(|_| None).collect())
            }
            other => other,
        };
        self.normalize(given, declared, DataRole::Target)
    }

    /// Resolve an output selection; `None` selects `declared`
    pub fn select_outputs(
        &self,
        selection: Option<Vec<SlotKey>>,
        declared: &[DataSlot],
    ) -> Result<Vec<DataSlot>> {
        match selection {
            None => Ok(declared.to_vec()),
            Some(keys) => keys.iter().map(|key| self.lookup(key)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::step::{FnStep, StepOutput};

    fn setup() -> (StepArena<i64>, Vec<DataSlot>, Vec<DataSlot>) {
        let mut arena = StepArena::new();
        let x1 = arena.add_input("x1").unwrap();
        let x2 = arena.add_input("x2").unwrap();
        let split = arena
            .add(
                "split",
                FnStep::transform(|xs| Ok(StepOutput::Many(vec![xs[0], xs[1]]))).with_outputs(2),
                &[x1, x2],
            )
            .unwrap();
        (arena, vec![x1, x2], split.outputs)
    }

    #[test]
    fn test_keyed_by_slot_and_name() {
        let (arena, inputs, outputs) = setup();
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph);

        let data = binder
            .normalize(
                DataBinding::Keyed(vec![
                    (SlotKey::from(inputs[0]), 1),
                    (SlotKey::from("x2"), 2),
                ]),
                &inputs,
                DataRole::Input,
            )
            .unwrap();

        assert_eq!(data.get(&inputs[0]), Some(&1));
        assert_eq!(data.get(&inputs[1]), Some(&2));
    }

    #[test]
    fn test_unknown_name() {
        let (arena, inputs, outputs) = setup();
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph);

        let err = binder
            .normalize(DataBinding::keyed([("x3", 1)]), &inputs, DataRole::Input)
            .unwrap_err();
        assert!(matches!(err, StepGraphError::UnknownDataName { ref name } if name == "x3"));
    }

    #[test]
    fn test_slot_outside_graph_is_unknown() {
        let (mut arena, inputs, outputs) = setup();
        let stray = arena.add_input("stray").unwrap();
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph);

        let err = binder
            .normalize(DataBinding::keyed([(stray, 1)]), &inputs, DataRole::Input)
            .unwrap_err();
        assert!(matches!(err, StepGraphError::UnknownDataName { ref name } if name == "stray"));
    }

    #[test]
    fn test_declared_input_outside_graph_is_known() {
        let (mut arena, mut inputs, outputs) = setup();
        let extra = arena.add_input("extra").unwrap();
        inputs.push(extra);
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph).with_inputs(&inputs);

        let by_slot = binder
            .normalize(DataBinding::keyed([(extra, 1)]), &inputs, DataRole::Input)
            .unwrap();
        assert_eq!(by_slot.get(&extra), Some(&1));

        let by_name = binder
            .normalize(DataBinding::keyed([("extra", 2)]), &inputs, DataRole::Input)
            .unwrap();
        assert_eq!(by_name.get(&extra), Some(&2));
    }

    #[test]
    fn test_positional_matches_declaration_order() {
        let (arena, inputs, outputs) = setup();
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph);

        let data = binder
            .normalize(DataBinding::positional([10, 20]), &inputs, DataRole::Input)
            .unwrap();
        assert_eq!(data.values().copied().collect::<Vec<_>>(), vec![10, 20]);

        let err = binder
            .normalize(DataBinding::single(10), &inputs, DataRole::Input)
            .unwrap_err();
        assert!(matches!(
            err,
            StepGraphError::ArityMismatch {
                role: DataRole::Input,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_single_none_target_expands() {
        let (arena, _, outputs) = setup();
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph);

        let targets = binder
            .normalize_targets(DataBinding::<Option<i64>>::none(), &outputs)
            .unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.values().all(Option::is_none));

        let err = binder
            .normalize_targets(DataBinding::single(Some(1)), &outputs)
            .unwrap_err();
        assert!(matches!(
            err,
            StepGraphError::ArityMismatch {
                role: DataRole::Target,
                ..
            }
        ));
    }

    #[test]
    fn test_select_outputs() {
        let (arena, _, outputs) = setup();
        let graph = assemble(&arena, &outputs).unwrap();
        let binder = DataBinder::new(&arena, &graph);

        assert_eq!(binder.select_outputs(None, &outputs).unwrap(), outputs);
        assert_eq!(
            binder
                .select_outputs(Some(vec!["split/1".into()]), &outputs)
                .unwrap(),
            vec![outputs[1]]
        );
        assert!(binder
            .select_outputs(Some(vec!["split/2".into()]), &outputs)
            .is_err());
    }
}
