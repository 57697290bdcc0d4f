use thiserror::Error;

/// Raised while building an [`Mdp`](crate::Mdp) or one of its configurations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid transition function: it should have 3 dimensions, got {0}")]
    TransitionDimensionality(usize),

    #[error("invalid transition function: it has dimensionality {actual:?}, but it should be (nActions, nStates, nStates) with nActions, nStates > 0")]
    TransitionShape { actual: Vec<usize> },

    #[error("invalid reward function: it should have 2 dimensions, got {0}")]
    RewardDimensionality(usize),

    #[error("invalid reward function: it has dimensionality {actual:?}, but it should be {expected:?}")]
    RewardShape {
        expected: (usize, usize),
        actual: Vec<usize>,
    },

    #[error("invalid transition function: T[{action}][{state}][{next_state}] = {probability} is not a probability")]
    InvalidProbability {
        action: usize,
        state: usize,
        next_state: usize,
        probability: f64,
    },

    #[error("invalid transition function: row T[{action}][{state}] sums to {sum} instead of 1")]
    UnnormalizedRow { action: usize, state: usize, sum: f64 },

    #[error("invalid discount factor {0}: it should be in [0, 1)")]
    Discount(f64),

    #[error("invalid noise level: standard deviation {0} should be finite and non-negative")]
    NoiseLevel(f64),

    #[error("invalid maze layout: {0}")]
    Layout(String),
}

/// Raised by a sampling call whose arguments do not fit the model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("state {state} is out of range for a model with {n_states} states")]
    StateOutOfRange { state: usize, n_states: usize },

    #[error("action {action} is out of range for a model with {n_actions} actions")]
    ActionOutOfRange { action: usize, n_actions: usize },

    #[error("policy parameters have shape {actual:?}, but they should be {expected:?}")]
    PolicyShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("policy parameters for state {state} contain a non-finite value")]
    NonFiniteParameters { state: usize },
}
