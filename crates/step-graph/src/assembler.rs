//! Graph assembly
//!
//! Walks backward from requested outputs to every step they depend on and
//! records producer → consumer edges between those steps.

use std::collections::HashMap;

use crate::arena::StepArena;
use crate::digraph::DiGraph;
use crate::error::{Result, StepGraphError};
use crate::types::{DataSlot, StepId};

/// Build the dependency graph of the steps reachable from `outputs`
///
/// Nodes are added in depth-first pre-order, following each step's inputs
/// in declaration order. Fails with `DuplicateStepName` listing every name
/// shared by more than one reachable step.
///
/// `outputs` must belong to `arena`.
pub fn assemble<V>(arena: &StepArena<V>, outputs: &[DataSlot]) -> Result<DiGraph<StepId>> {
    let mut graph = DiGraph::new();

    let mut stack: Vec<StepId> = outputs
        .iter()
        .rev()
        .map(|slot| arena.producer_of(*slot))
        .collect();
    while let Some(step) = stack.pop() {
        if !graph.add_node(step) {
            continue;
        }
        for input in arena.entry(step).inputs.iter().rev() {
            stack.push(arena.producer_of(*input));
        }
    }

    let steps: Vec<StepId> = graph.nodes().collect();
    for &step in &steps {
        for input in &arena.entry(step).inputs {
            graph.add_edge(arena.producer_of(*input), step);
        }
    }

    check_duplicate_names(arena, &steps)?;

    log::debug!(
        "Assembled step graph: {} steps, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn check_duplicate_names<V>(arena: &StepArena<V>, steps: &[StepId]) -> Result<()> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();
    for step in steps {
        let name = arena.entry(*step).name.as_str();
        let count = seen.entry(name).or_insert(0);
        if *count == 0 {
            first_seen.push(name);
        }
        *count += 1;
    }

    let names: Vec<String> = first_seen
        .into_iter()
        .filter(|name| seen[name] > 1)
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        Ok(())
    } else {
        Err(StepGraphError::DuplicateStepName { names })
    }
}
