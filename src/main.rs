use std::time::Instant;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tabular_mdp::utils::moving_average;
use tabular_mdp::{build_maze_mdp, discounted_return, MazeAction, MazeConfig, Simulator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let n_episodes: usize = 10_000;
    let max_steps: usize = 200;
    let moving_average_window: usize = 1_000;
    let seed: u64 = 42;

    let config = MazeConfig::default();
    let mdp = build_maze_mdp()?;
    let simulator = Simulator::new(&mdp);
    let rng = &mut StdRng::seed_from_u64(seed);

    println!("{}", config.render(0));

    let uniform: Array2<f64> = Array2::zeros((mdp.n_actions(), mdp.n_states()));
    let mut down_right: Array2<f64> = Array2::zeros((mdp.n_actions(), mdp.n_states()));
    down_right.row_mut(usize::from(MazeAction::Down)).fill(2.0);
    down_right.row_mut(usize::from(MazeAction::Right)).fill(2.0);
    let random = simulator.random_policy_params(1.0, rng)?;

    for (name, params) in [
        ("Uniform", &uniform),
        ("DownRight", &down_right),
        ("Random", &random),
    ] {
        println!("Sampling {} episodes with the {} policy!", n_episodes, name);
        let now: Instant = Instant::now();
        let mut returns: Vec<f64> = Vec::with_capacity(n_episodes);
        let mut lengths: Vec<f64> = Vec::with_capacity(n_episodes);
        let mut reached_goal: usize = 0;
        for _ in 0..n_episodes {
            let episode = simulator.rollout(params, 0, max_steps, rng)?;
            if episode
                .last()
                .is_some_and(|step| step.next_state == config.end_state())
            {
                reached_goal += 1;
            }
            returns.push(discounted_return(&episode, mdp.discount()));
            lengths.push(episode.len() as f64);
        }
        let elapsed: std::time::Duration = now.elapsed();
        println!("Time elapsed: {:.2?}", elapsed);
        println!(
            "Goal reached in {:.1}% of the episodes",
            100.0 * reached_goal as f64 / n_episodes as f64
        );
        println!(
            "Mean episode length: {:.2}",
            lengths.iter().sum::<f64>() / n_episodes as f64
        );
        let ma_return = moving_average(moving_average_window, &returns);
        println!("Discounted return (moving average): {:.2?}", ma_return);
    }
    Ok(())
}
