//! The step contract and closure-backed adapters
//!
//! A step is a unit of computation with declared capabilities. The
//! orchestrator only calls the operations a step declares; the default
//! method bodies report the operation as unsupported.

use thiserror::Error;

use crate::types::Capabilities;

/// Error raised by a step's own operation
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for step operations
pub type StepResult<T> = std::result::Result<T, StepError>;

/// A step was asked to run an operation it does not implement
#[derive(Debug, Error)]
#[error("step does not implement {0}")]
pub struct Unsupported(pub &'static str);

/// Values produced by a predict or transform operation
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput<V> {
    /// One value, paired with the step's sole output
    Single(V),
    /// Values paired with the outputs positionally
    Many(Vec<V>),
}

impl<V> StepOutput<V> {
    /// Number of produced values
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into positional values
    pub fn into_vec(self) -> Vec<V> {
        match self {
            Self::Single(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// A named computation unit in a step graph
///
/// Implementations declare their operations through [`Step::capabilities`]
/// and override the matching methods. Inputs are passed positionally in the
/// order the step's input slots were declared; targets follow the order of
/// the step's outputs, with absent targets omitted.
pub trait Step<V = serde_json::Value>: Send + Sync {
    /// Operations this step implements
    fn capabilities(&self) -> Capabilities;

    /// Number of output slots this step produces
    fn output_count(&self) -> usize {
        1
    }

    /// Fit internal state against inputs and targets
    fn fit(&mut self, _inputs: &[V], _targets: &[V]) -> StepResult<()> {
        Err(Box::new(Unsupported("fit")))
    }

    /// Predict outputs from inputs
    fn predict(&self, _inputs: &[V]) -> StepResult<StepOutput<V>> {
        Err(Box::new(Unsupported("predict")))
    }

    /// Transform inputs into outputs
    fn transform(&self, _inputs: &[V]) -> StepResult<StepOutput<V>> {
        Err(Box::new(Unsupported("transform")))
    }
}

/// A data entry point: no inputs, one output, no operations
///
/// Its output must always be supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputStep;

impl<V> Step<V> for InputStep {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }
}

type ComputeFn<V> = Box<dyn Fn(&[V]) -> StepResult<StepOutput<V>> + Send + Sync>;
type FitFn<V> = Box<dyn FnMut(&[V], &[V]) -> StepResult<()> + Send + Sync>;

/// Closure-backed step
///
/// Wraps a compute closure (as predict or transform) and an optional fit
/// closure.
pub struct FnStep<V = serde_json::Value> {
    capabilities: Capabilities,
    output_count: usize,
    compute: ComputeFn<V>,
    fit: Option<FitFn<V>>,
}

impl<V> FnStep<V> {
    /// Create a transforming step
    pub fn transform(
        compute: impl Fn(&[V]) -> StepResult<StepOutput<V>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            capabilities: Capabilities::TRANSFORM,
            output_count: 1,
            compute: Box::new(compute),
            fit: None,
        }
    }

    /// Create a predicting step
    pub fn predict(
        compute: impl Fn(&[V]) -> StepResult<StepOutput<V>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            capabilities: Capabilities::PREDICT,
            output_count: 1,
            compute: Box::new(compute),
            fit: None,
        }
    }

    /// Make the step trainable with the given fit closure
    pub fn with_fit(
        mut self,
        fit: impl FnMut(&[V], &[V]) -> StepResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities = self.capabilities.with_train();
        self.fit = Some(Box::new(fit));
        self
    }

    /// Set the number of outputs the compute closure produces
    pub fn with_outputs(mut self, count: usize) -> Self {
        self.output_count = count;
        self
    }
}

impl<V> Step<V> for FnStep<V> {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn output_count(&self) -> usize {
        self.output_count
    }

    fn fit(&mut self, inputs: &[V], targets: &[V]) -> StepResult<()> {
        match self.fit.as_mut() {
            Some(fit) => fit(inputs, targets),
            None => Err(Box::new(Unsupported("fit"))),
        }
    }

    fn predict(&self, inputs: &[V]) -> StepResult<StepOutput<V>> {
        if self.capabilities.predict {
            (self.compute)(inputs)
        } else {
            Err(Box::new(Unsupported("predict")))
        }
    }

    fn transform(&self, inputs: &[V]) -> StepResult<StepOutput<V>> {
        if self.capabilities.transform {
            (self.compute)(inputs)
        } else {
            Err(Box::new(Unsupported("transform")))
        }
    }
}

impl<V> std::fmt::Debug for FnStep<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("capabilities", &self.capabilities)
            .field("output_count", &self.output_count)
            .finish_non_exhaustive()
    }
}
