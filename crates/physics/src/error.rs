use thiserror::Error;

/// Errors raised while configuring or stepping a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("control vector has {got} entries, model expects {expected}")]
    ActionDimension { expected: usize, got: usize },
    #[error("control entry {index} is not finite ({value})")]
    NonFiniteControl { index: usize, value: f32 },
    #[error("state vector has {got} entries, model expects {expected}")]
    StateDimension { expected: usize, got: usize },
    #[error("simulation diverged after {steps} sub-steps")]
    Diverged { steps: usize },
}
