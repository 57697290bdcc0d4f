pub mod maze;
pub mod mdp;
pub mod simulator;
pub mod utils;

mod error;

pub use error::{InvalidInputError, ValidationError};
pub use maze::{build_maze_mdp, MazeAction, MazeConfig};
pub use mdp::{Mdp, TRANSITION_TOLERANCE};
pub use simulator::{
    discounted_return, sample_reward_and_next_state, sample_softmax_policy, softmax_policy,
    ExactReward, GaussianReward, RewardNoise, RewardSampler, Simulator, Step,
};
