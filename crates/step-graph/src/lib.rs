//! Step Graph - DAG orchestration of trainable computation steps
//!
//! Steps are registered in an arena and wired together through the data
//! slots they produce. A [`Model`] is assembled from declared input and
//! output slots; every train or predict call then resolves the smallest set
//! of steps that turns the data actually supplied into the outputs actually
//! requested, and runs them in dependency order.
//!
//! - Supplied data short-circuits the steps that would have produced it
//! - Inputs no requested output needs are reported as advisories
//! - Trainable steps are fitted before they compute during training
//!
//! # Architecture
//!
//! - `StepArena`: owns steps and issues slot handles
//! - `assemble`: walks back from outputs and builds the dependency graph
//! - `resolve`: picks the required steps for one call, in topological order
//! - `ExecutionEngine`: runs resolved steps against a call-scoped cache
//! - `EventSink`: run progress and advisory events (not tied to any host)
//!
//! # Example
//!
//! ```ignore
//! use step_graph::{DataBinding, FnStep, Model, StepArena, StepOutput};
//!
//! let mut arena = StepArena::new();
//! let x = arena.add_input("x")?;
//! let doubled = arena.add("double", FnStep::transform(|xs| Ok(StepOutput::Single(xs[0] * 2))), &[x])?;
//!
//! let model = Model::new(arena, &[x], &[doubled.output()], None)?;
//! let y = model.predict(DataBinding::single(21), None)?;
//! ```

pub mod arena;
pub mod assembler;
pub mod binder;
pub mod builder;
pub mod config;
pub mod digraph;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod resolver;
pub mod step;
pub mod types;

// Re-export key types
pub use arena::{StepArena, StepHandle};
pub use assembler::assemble;
pub use binder::{DataBinder, DataBinding, SlotKey};
pub use builder::{ModelBuilder, DEFAULT_MODEL_NAME};
pub use config::{ModelSettings, UnusedInputPolicy};
pub use digraph::{CycleDetected, DiGraph};
pub use engine::{Cache, ExecutionEngine, TargetMap};
pub use error::{Result, StepGraphError};
pub use events::{EventError, EventSink, NullEventSink, PipelineEvent, RunPhase, VecEventSink};
pub use model::{Model, Prediction};
pub use resolver::{resolve, Resolution};
pub use step::{FnStep, InputStep, Step, StepError, StepOutput, StepResult, Unsupported};
pub use types::{Capabilities, DataRole, DataSlot, StepDescriptor, StepId};
