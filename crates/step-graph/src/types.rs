//! Core types for step graphs
//!
//! These types define the vocabulary used to wire steps together:
//! slot and step handles, capability sets, and data roles.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_ARENA_ID: AtomicUsize = AtomicUsize::new(0);

/// Identifier of the arena a handle was issued by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(usize);

impl ArenaId {
    pub(crate) fn next() -> Self {
        Self(NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle for one named output of exactly one step
///
/// Identity is by arena index, not by name: two slots are equal only if
/// they were issued by the same arena for the same output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataSlot {
    pub(crate) arena: ArenaId,
    pub(crate) index: usize,
}

impl DataSlot {
    /// Position of this slot in its arena
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Handle for a step registered in an arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId {
    pub(crate) arena: ArenaId,
    pub(crate) index: usize,
}

impl StepId {
    /// Position of this step in its arena
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Operations a step implements
///
/// Declared once by the step and checked when the step is registered,
/// never probed at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Can be fitted against inputs and targets
    pub train: bool,
    /// Can predict outputs from inputs
    pub predict: bool,
    /// Can transform inputs into outputs
    pub transform: bool,
}

impl Capabilities {
    /// No operations (data entry points)
    pub const NONE: Self = Self {
        train: false,
        predict: false,
        transform: false,
    };

    /// Stateless transformer
    pub const TRANSFORM: Self = Self {
        train: false,
        predict: false,
        transform: true,
    };

    /// Stateless predictor
    pub const PREDICT: Self = Self {
        train: false,
        predict: true,
        transform: false,
    };

    /// Add the training capability
    pub fn with_train(mut self) -> Self {
        self.train = true;
        self
    }

    /// Whether the step can produce outputs
    pub fn is_computable(&self) -> bool {
        self.predict || self.transform
    }
}

/// The role caller-supplied data plays in a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRole {
    /// Values bound to the model's inputs
    Input,
    /// Training targets bound to the model's outputs
    Target,
    /// Selection of the outputs to return
    OutputSelector,
}

impl fmt::Display for DataRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Target => write!(f, "target"),
            Self::OutputSelector => write!(f, "output"),
        }
    }
}

/// Serializable description of a registered step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    /// Step name
    pub name: String,
    /// Names of the consumed slots, in declaration order
    pub inputs: Vec<String>,
    /// Names of the produced slots, in declaration order
    pub outputs: Vec<String>,
    /// Declared operations
    pub capabilities: Capabilities,
}
