use enum_dispatch::enum_dispatch;
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_rand::rand_distr::{Normal, StandardNormal};
use ndarray_rand::RandomExt;
use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::{Rng, RngCore};
use tracing::trace;

use crate::error::{InvalidInputError, ValidationError};
use crate::mdp::Mdp;
use crate::utils::{categorical_sample, softmax};

/// Draws a noisy reward around an expected value.
#[enum_dispatch]
pub trait RewardSampler {
    fn sample_reward(&self, mean: f64, rng: &mut dyn RngCore) -> f64;
}

/// Normal noise around the expected reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianReward {
    std_dev: f64,
}

impl GaussianReward {
    pub const DEFAULT_STD_DEV: f64 = 1.0;

    pub fn new(std_dev: f64) -> Result<Self, ValidationError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(ValidationError::NoiseLevel(std_dev));
        }
        Ok(Self { std_dev })
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

impl Default for GaussianReward {
    fn default() -> Self {
        Self {
            std_dev: Self::DEFAULT_STD_DEV,
        }
    }
}

impl RewardSampler for GaussianReward {
    fn sample_reward(&self, mean: f64, rng: &mut dyn RngCore) -> f64 {
        let z: f64 = StandardNormal.sample(rng);
        mean + self.std_dev * z
    }
}

/// Returns the expected reward untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExactReward;

impl RewardSampler for ExactReward {
    fn sample_reward(&self, mean: f64, _rng: &mut dyn RngCore) -> f64 {
        mean
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[enum_dispatch(RewardSampler)]
pub enum RewardNoise {
    Gaussian(GaussianReward),
    Exact(ExactReward),
}

impl Default for RewardNoise {
    fn default() -> Self {
        RewardNoise::Gaussian(GaussianReward::default())
    }
}

impl<F> RewardSampler for F
where
    F: Fn(f64, &mut dyn RngCore) -> f64,
{
    fn sample_reward(&self, mean: f64, rng: &mut dyn RngCore) -> f64 {
        self(mean, rng)
    }
}

/// One transition of an episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub state: usize,
    pub action: usize,
    pub reward: f64,
    pub next_state: usize,
}

pub fn discounted_return(episode: &[Step], discount: f64) -> f64 {
    episode
        .iter()
        .rev()
        .fold(0.0, |g, step| step.reward + discount * g)
}

/// Samples `(reward, next_state)` for `action` taken in `state`.
///
/// The next state is drawn by inverse-CDF sampling over `T[action][state]`.
pub fn sample_reward_and_next_state<S, R>(
    mdp: &Mdp,
    state: usize,
    action: usize,
    reward_sampler: &S,
    rng: &mut R,
) -> Result<(f64, usize), InvalidInputError>
where
    S: RewardSampler + ?Sized,
    R: Rng,
{
    mdp.check_action(action)?;
    mdp.check_state(state)?;
    let reward = reward_sampler.sample_reward(mdp.reward(action, state), rng);
    let random: f64 = Uniform::from(0.0..1.0).sample(rng);
    let next_state = categorical_sample(mdp.transition_row(action, state), random);
    trace!(state, action, reward, next_state, "sampled transition");
    Ok((reward, next_state))
}

fn policy_column<'p>(
    mdp: &Mdp,
    policy_params: &'p Array2<f64>,
    state: usize,
) -> Result<ArrayView1<'p, f64>, InvalidInputError> {
    let expected = (mdp.n_actions(), mdp.n_states());
    if policy_params.dim() != expected {
        return Err(InvalidInputError::PolicyShape {
            expected,
            actual: policy_params.dim(),
        });
    }
    mdp.check_state(state)?;
    let column = policy_params.column(state);
    if column.iter().any(|v| !v.is_finite()) {
        return Err(InvalidInputError::NonFiniteParameters { state });
    }
    Ok(column)
}

/// `pi(a|state)` for a softmax policy with parameters of shape `(n_actions, n_states)`.
pub fn softmax_policy(
    mdp: &Mdp,
    policy_params: &Array2<f64>,
    state: usize,
) -> Result<Array1<f64>, InvalidInputError> {
    let column = policy_column(mdp, policy_params, state)?;
    Ok(softmax(column))
}

pub fn sample_softmax_policy<R: Rng>(
    mdp: &Mdp,
    policy_params: &Array2<f64>,
    state: usize,
    rng: &mut R,
) -> Result<usize, InvalidInputError> {
    let probs = softmax_policy(mdp, policy_params, state)?;
    let dist = WeightedIndex::new(probs.iter())
        .map_err(|_| InvalidInputError::NonFiniteParameters { state })?;
    Ok(dist.sample(rng))
}

/// Sampling front-end over a borrowed model.
///
/// Holds no mutable state: randomness comes in with every call, so one
/// simulator can be shared freely as long as each caller brings its own rng.
#[derive(Debug, Clone)]
pub struct Simulator<'m, S: RewardSampler = RewardNoise> {
    mdp: &'m Mdp,
    reward_sampler: S,
}

impl<'m> Simulator<'m> {
    /// Simulator with unit-variance Gaussian reward noise.
    pub fn new(mdp: &'m Mdp) -> Self {
        Self::with_reward_sampler(mdp, RewardNoise::default())
    }
}

impl<'m, S: RewardSampler> Simulator<'m, S> {
    pub fn with_reward_sampler(mdp: &'m Mdp, reward_sampler: S) -> Self {
        Self {
            mdp,
            reward_sampler,
        }
    }

    pub fn mdp(&self) -> &'m Mdp {
        self.mdp
    }

    pub fn reward_sampler(&self) -> &S {
        &self.reward_sampler
    }

    pub fn sample_reward_and_next_state<R: Rng>(
        &self,
        state: usize,
        action: usize,
        rng: &mut R,
    ) -> Result<(f64, usize), InvalidInputError> {
        sample_reward_and_next_state(self.mdp, state, action, &self.reward_sampler, rng)
    }

    pub fn softmax_policy(
        &self,
        policy_params: &Array2<f64>,
        state: usize,
    ) -> Result<Array1<f64>, InvalidInputError> {
        softmax_policy(self.mdp, policy_params, state)
    }

    pub fn sample_softmax_policy<R: Rng>(
        &self,
        policy_params: &Array2<f64>,
        state: usize,
        rng: &mut R,
    ) -> Result<usize, InvalidInputError> {
        sample_softmax_policy(self.mdp, policy_params, state, rng)
    }

    /// Gaussian initial parameters for a softmax policy over this model.
    pub fn random_policy_params<R: Rng>(
        &self,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Array2<f64>, ValidationError> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(ValidationError::NoiseLevel(std_dev));
        }
        let normal =
            Normal::new(0.0, std_dev).map_err(|_| ValidationError::NoiseLevel(std_dev))?;
        Ok(Array2::random_using(
            (self.mdp.n_actions(), self.mdp.n_states()),
            normal,
            rng,
        ))
    }

    /// Follows the softmax policy from `start` until an absorbing state is
    /// entered or `max_steps` transitions were taken.
    pub fn rollout<R: Rng>(
        &self,
        policy_params: &Array2<f64>,
        start: usize,
        max_steps: usize,
        rng: &mut R,
    ) -> Result<Vec<Step>, InvalidInputError> {
        policy_column(self.mdp, policy_params, start)?;
        let mut episode = Vec::new();
        let mut state = start;
        while episode.len() < max_steps && !self.mdp.is_absorbing(state) {
            let action = self.sample_softmax_policy(policy_params, state, rng)?;
            let (reward, next_state) = self.sample_reward_and_next_state(state, action, rng)?;
            episode.push(Step {
                state,
                action,
                reward,
                next_state,
            });
            state = next_state;
        }
        trace!(start, steps = episode.len(), last_state = state, "finished rollout");
        Ok(episode)
    }
}
