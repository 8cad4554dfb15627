//! Required-step resolution
//!
//! Given the slots a caller supplies and the slots they want back, compute
//! the minimal ordered list of steps to run. Structural problems (cycles,
//! missing inputs) are reported here, before anything executes.

use std::collections::{BTreeSet, HashSet};

use crate::arena::StepArena;
use crate::digraph::DiGraph;
use crate::error::{Result, StepGraphError};
use crate::types::{DataSlot, StepId};

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Steps to run, dependencies first
    pub steps: Vec<StepId>,
    /// Supplied slots that are not needed for the desired outputs
    pub unused_inputs: Vec<DataSlot>,
}

/// Resolve the steps needed to compute `desired` from `available`
///
/// A supplied slot short-circuits its producer: the walk stops there. The
/// returned steps follow the graph's topological order. Unused inputs are
/// returned for the caller to report; they do not fail resolution.
///
/// All slots must belong to `arena`, and the producers of `desired` must be
/// nodes of `graph`.
pub fn resolve<V>(
    arena: &StepArena<V>,
    graph: &DiGraph<StepId>,
    available: &BTreeSet<DataSlot>,
    desired: &[DataSlot],
) -> Result<Resolution> {
    let order = graph
        .topological_sort()
        .map_err(|cycle| StepGraphError::CyclicGraph {
            step: arena.entry(cycle.node).name.clone(),
        })?;

    let mut required: HashSet<StepId> = HashSet::new();
    let mut found: HashSet<DataSlot> = HashSet::new();

    let mut stack: Vec<DataSlot> = desired.iter().rev().copied().collect();
    while let Some(slot) = stack.pop() {
        if available.contains(&slot) {
            found.insert(slot);
            continue;
        }
        let producer = arena.producer_of(slot);
        if !required.insert(producer) {
            continue;
        }
        for input in arena.entry(producer).inputs.iter().rev() {
            stack.push(*input);
        }
    }

    let unused_inputs: Vec<DataSlot> = available
        .iter()
        .filter(|slot| !found.contains(*slot))
        .copied()
        .collect();

    let missing: Vec<String> = order
        .iter()
        .filter(|step| required.contains(*step) && graph.in_degree(**step) == 0)
        .flat_map(|step| arena.entry(*step).outputs.iter())
        .filter(|slot| !available.contains(*slot))
        .map(|slot| arena.name_of(*slot).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(StepGraphError::MissingInput { names: missing });
    }

    let steps: Vec<StepId> = order
        .into_iter()
        .filter(|step| required.contains(step))
        .collect();

    log::debug!(
        "Resolved {} of {} steps ({} unused inputs)",
        steps.len(),
        graph.node_count(),
        unused_inputs.len()
    );

    Ok(Resolution {
        steps,
        unused_inputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StepHandle;
    use crate::assembler::assemble;
    use crate::step::{FnStep, StepOutput};

    fn sum() -> FnStep<i64> {
        FnStep::transform(|xs| Ok(StepOutput::Single(xs.iter().sum())))
    }

    struct Diamond {
        arena: StepArena<i64>,
        x: DataSlot,
        b: StepHandle,
        c: StepHandle,
        d: StepHandle,
    }

    fn diamond() -> Diamond {
        let mut arena = StepArena::new();
        let x = arena.add_input("x").unwrap();
        let b = arena.add("b", sum(), &[x]).unwrap();
        let c = arena.add("c", sum(), &[x]).unwrap();
        let d = arena.add("d", sum(), &[b.output(), c.output()]).unwrap();
        Diamond { arena, x, b, c, d }
    }

    fn available(slots: &[DataSlot]) -> BTreeSet<DataSlot> {
        slots.iter().copied().collect()
    }

    fn assert_topological(arena: &StepArena<i64>, steps: &[StepId]) {
        for (i, step) in steps.iter().enumerate() {
            for input in arena.step_inputs(*step).unwrap() {
                let producer = arena.producer(*input).unwrap();
                if let Some(j) = steps.iter().position(|s| *s == producer) {
                    assert!(j < i, "producer of {:?} runs after its consumer", input);
                }
            }
        }
    }

    #[test]
    fn test_resolve_diamond() {
        let t = diamond();
        let graph = assemble(&t.arena, &[t.d.output()]).unwrap();

        let resolution =
            resolve(&t.arena, &graph, &available(&[t.x]), &[t.d.output()]).unwrap();

        assert_eq!(resolution.steps.len(), 3);
        assert_eq!(resolution.steps[2], t.d.id);
        assert!(resolution.steps.contains(&t.b.id));
        assert!(resolution.steps.contains(&t.c.id));
        assert!(resolution.unused_inputs.is_empty());
        assert_topological(&t.arena, &resolution.steps);
    }

    #[test]
    fn test_resolve_subset_of_outputs() {
        let t = diamond();
        let graph = assemble(&t.arena, &[t.b.output(), t.c.output()]).unwrap();

        let resolution =
            resolve(&t.arena, &graph, &available(&[t.x]), &[t.c.output()]).unwrap();
        assert_eq!(resolution.steps, vec![t.c.id]);
    }

    #[test]
    fn test_supplied_intermediate_short_circuits() {
        let t = diamond();
        let graph = assemble(&t.arena, &[t.d.output()]).unwrap();

        let resolution = resolve(
            &t.arena,
            &graph,
            &available(&[t.b.output(), t.c.output()]),
            &[t.d.output()],
        )
        .unwrap();
        assert_eq!(resolution.steps, vec![t.d.id]);
    }

    #[test]
    fn test_unused_inputs_reported_once_each() {
        let t = diamond();
        let graph = assemble(&t.arena, &[t.d.output()]).unwrap();

        let resolution = resolve(
            &t.arena,
            &graph,
            &available(&[t.x, t.b.output(), t.d.output()]),
            &[t.c.output()],
        )
        .unwrap();
        assert_eq!(resolution.steps, vec![t.c.id]);
        assert_eq!(
            resolution.unused_inputs,
            vec![t.b.output(), t.d.output()]
        );
    }

    #[test]
    fn test_missing_input_names_exactly_the_slot() {
        let mut arena = StepArena::new();
        let x1 = arena.add_input("x1").unwrap();
        let x2 = arena.add_input("x2").unwrap();
        let y = arena.add("y", sum(), &[x1, x2]).unwrap();
        let graph = assemble(&arena, &[y.output()]).unwrap();

        let err = resolve(&arena, &graph, &available(&[x1]), &[y.output()]).unwrap_err();
        match err {
            StepGraphError::MissingInput { names } => assert_eq!(names, vec!["x2"]),
            other => panic!("Expected MissingInput, got {:?}", other),
        }

        let err = resolve(&arena, &graph, &available(&[]), &[y.output()]).unwrap_err();
        match err {
            StepGraphError::MissingInput { mut names } => {
                names.sort();
                assert_eq!(names, vec!["x1", "x2"]);
            }
            other => panic!("Expected MissingInput, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_fails_before_resolution() {
        let mut arena = StepArena::new();
        let x = arena.add_input("x").unwrap();
        let a = arena.add("a", sum(), &[x]).unwrap();
        let b = arena.add("b", sum(), &[a.output()]).unwrap();
        let c = arena.add("c", sum(), &[b.output()]).unwrap();
        arena.set_inputs(a.id, &[x, c.output()]).unwrap();

        let graph = assemble(&arena, &[c.output()]).unwrap();
        let err = resolve(&arena, &graph, &available(&[x]), &[c.output()]).unwrap_err();
        assert!(matches!(err, StepGraphError::CyclicGraph { .. }));
    }

    #[test]
    fn test_topological_validity_over_partitions() {
        // a -> b -> d, a -> c -> d, c -> e
        let mut arena = StepArena::new();
        let x = arena.add_input("x").unwrap();
        let a = arena.add("a", sum(), &[x]).unwrap();
        let b = arena.add("b", sum(), &[a.output()]).unwrap();
        let c = arena.add("c", sum(), &[a.output()]).unwrap();
        let d = arena.add("d", sum(), &[b.output(), c.output()]).unwrap();
        let e = arena.add("e", sum(), &[c.output()]).unwrap();
        let graph = assemble(&arena, &[d.output(), e.output()]).unwrap();

        let inputs = [x, a.output(), b.output(), c.output()];
        let outputs = [d.output(), e.output()];
        for mask in 1..(1 << inputs.len()) {
            let supplied: Vec<DataSlot> = (0..inputs.len())
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| inputs[i])
                .collect();
            for wanted in [&outputs[..1], &outputs[1..], &outputs[..]] {
                if let Ok(resolution) =
                    resolve(&arena, &graph, &available(&supplied), wanted)
                {
                    assert_topological(&arena, &resolution.steps);
                }
            }
        }
    }
}
