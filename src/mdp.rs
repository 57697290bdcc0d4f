use ndarray::{Array2, Array3, ArrayD, ArrayView1, ArrayView2, ArrayView3, Axis, Ix2, Ix3};
use tracing::debug;

use crate::error::{InvalidInputError, ValidationError};

/// Absolute tolerance allowed when checking that a transition row sums to 1.
pub const TRANSITION_TOLERANCE: f64 = 1e-5;

/// A finite Markov Decision Process.
///
/// `transitions[[a, s, s2]]` is the probability of reaching `s2` after taking
/// action `a` in state `s`, and `rewards[[a, s]]` is the expected immediate
/// reward of that choice. Every invariant is checked once, at construction;
/// the value cannot be modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Mdp {
    n_actions: usize,
    n_states: usize,
    transitions: Array3<f64>,
    rewards: Array2<f64>,
    discount: f64,
}

impl Mdp {
    pub fn new(
        transitions: Array3<f64>,
        rewards: Array2<f64>,
        discount: f64,
    ) -> Result<Self, ValidationError> {
        let (n_actions, n_states) = check_transitions(&transitions)?;
        check_rewards(&rewards, n_actions, n_states)?;
        check_discount(discount)?;
        Ok(Self::assemble(transitions, rewards, discount))
    }

    /// Builds a model from arrays whose dimensionality is only known at runtime.
    pub fn from_dyn(
        transitions: ArrayD<f64>,
        rewards: ArrayD<f64>,
        discount: f64,
    ) -> Result<Self, ValidationError> {
        let ndim = transitions.ndim();
        let transitions = transitions
            .into_dimensionality::<Ix3>()
            .map_err(|_| ValidationError::TransitionDimensionality(ndim))?;
        let (n_actions, n_states) = check_transitions(&transitions)?;

        let ndim = rewards.ndim();
        let rewards = rewards
            .into_dimensionality::<Ix2>()
            .map_err(|_| ValidationError::RewardDimensionality(ndim))?;
        check_rewards(&rewards, n_actions, n_states)?;
        check_discount(discount)?;
        Ok(Self::assemble(transitions, rewards, discount))
    }

    fn assemble(transitions: Array3<f64>, rewards: Array2<f64>, discount: f64) -> Self {
        let (n_actions, n_states, _) = transitions.dim();
        debug!(n_actions, n_states, discount, "accepted MDP");
        Self {
            n_actions,
            n_states,
            transitions,
            rewards,
            discount,
        }
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn transitions(&self) -> ArrayView3<'_, f64> {
        self.transitions.view()
    }

    pub fn rewards(&self) -> ArrayView2<'_, f64> {
        self.rewards.view()
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    /// Distribution over next states for `action` taken in `state`.
    ///
    /// # Panics
    /// If either index is out of range.
    pub fn transition_row(&self, action: usize, state: usize) -> ArrayView1<'_, f64> {
        self.transitions.slice(ndarray::s![action, state, ..])
    }

    /// # Panics
    /// If either index is out of range.
    pub fn reward(&self, action: usize, state: usize) -> f64 {
        self.rewards[[action, state]]
    }

    /// True when every action keeps `state` in place with probability 1.
    pub fn is_absorbing(&self, state: usize) -> bool {
        state < self.n_states
            && (0..self.n_actions).all(|a| {
                (self.transitions[[a, state, state]] - 1.0).abs() < TRANSITION_TOLERANCE
            })
    }

    pub fn absorbing_states(&self) -> Vec<usize> {
        (0..self.n_states).filter(|s| self.is_absorbing(*s)).collect()
    }

    pub(crate) fn check_state(&self, state: usize) -> Result<(), InvalidInputError> {
        if state >= self.n_states {
            return Err(InvalidInputError::StateOutOfRange {
                state,
                n_states: self.n_states,
            });
        }
        Ok(())
    }

    pub(crate) fn check_action(&self, action: usize) -> Result<(), InvalidInputError> {
        if action >= self.n_actions {
            return Err(InvalidInputError::ActionOutOfRange {
                action,
                n_actions: self.n_actions,
            });
        }
        Ok(())
    }
}

fn check_transitions(transitions: &Array3<f64>) -> Result<(usize, usize), ValidationError> {
    let (n_actions, n_states, n_next) = transitions.dim();
    if n_actions == 0 || n_states == 0 || n_next != n_states {
        return Err(ValidationError::TransitionShape {
            actual: transitions.shape().to_vec(),
        });
    }
    for ((action, state, next_state), &probability) in transitions.indexed_iter() {
        if !probability.is_finite() || probability < 0.0 {
            return Err(ValidationError::InvalidProbability {
                action,
                state,
                next_state,
                probability,
            });
        }
    }
    for ((action, state), &sum) in transitions.sum_axis(Axis(2)).indexed_iter() {
        if (sum - 1.0).abs() >= TRANSITION_TOLERANCE {
            return Err(ValidationError::UnnormalizedRow { action, state, sum });
        }
    }
    Ok((n_actions, n_states))
}

fn check_rewards(
    rewards: &Array2<f64>,
    n_actions: usize,
    n_states: usize,
) -> Result<(), ValidationError> {
    if rewards.dim() != (n_actions, n_states) {
        return Err(ValidationError::RewardShape {
            expected: (n_actions, n_states),
            actual: rewards.shape().to_vec(),
        });
    }
    Ok(())
}

fn check_discount(discount: f64) -> Result<(), ValidationError> {
    if !(0.0..1.0).contains(&discount) {
        return Err(ValidationError::Discount(discount));
    }
    Ok(())
}
