use std::fmt;

use ndarray::{Array2, Array3};
use tracing::debug;

use crate::error::{InvalidInputError, ValidationError};
use crate::mdp::Mdp;
use crate::utils::{from_1d_to_2d, from_2d_to_1d, offset_in_grid};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MazeAction {
    Up,
    Down,
    Left,
    Right,
}

impl MazeAction {
    pub const ALL: [MazeAction; 4] = [
        MazeAction::Up,
        MazeAction::Down,
        MazeAction::Left,
        MazeAction::Right,
    ];

    pub const LABELS: [&'static str; 4] = ["UP", "DOWN", "LEFT", "RIGHT"];

    pub fn label(self) -> &'static str {
        Self::LABELS[self as usize]
    }

    /// (row, col) displacement of a successful move.
    pub fn offset(self) -> (isize, isize) {
        match self {
            MazeAction::Up => (-1, 0),
            MazeAction::Down => (1, 0),
            MazeAction::Left => (0, -1),
            MazeAction::Right => (0, 1),
        }
    }

    /// The two directions perpendicular to `self`.
    pub fn laterals(self) -> [MazeAction; 2] {
        match self {
            MazeAction::Up | MazeAction::Down => [MazeAction::Left, MazeAction::Right],
            MazeAction::Left | MazeAction::Right => [MazeAction::Up, MazeAction::Down],
        }
    }
}

impl From<MazeAction> for usize {
    fn from(action: MazeAction) -> Self {
        action as usize
    }
}

impl TryFrom<usize> for MazeAction {
    type Error = InvalidInputError;

    fn try_from(action: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(action)
            .copied()
            .ok_or(InvalidInputError::ActionOutOfRange {
                action,
                n_actions: Self::ALL.len(),
            })
    }
}

impl fmt::Display for MazeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Layout, slip probabilities and rewards of a slippery grid maze.
///
/// Cells are numbered row-major from 0; one extra absorbing end state,
/// index `rows * cols`, is entered from the goal cell. The default is the
/// 4x4 maze:
///
/// ```text
///  0  1  2  3
///  4  5  6  7
///  8  9 10 11
/// 12 13 14 15
/// ```
///
/// with the goal in 15, the penalty in 9 and the end state 16.
#[derive(Debug, Clone, PartialEq)]
pub struct MazeConfig {
    pub rows: usize,
    pub cols: usize,
    pub intended: f64,
    pub lateral: f64,
    pub goal: usize,
    pub penalty: usize,
    pub step_reward: f64,
    pub goal_reward: f64,
    pub penalty_reward: f64,
    pub end_reward: f64,
    pub discount: f64,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            rows: 4,
            cols: 4,
            intended: 0.8,
            lateral: 0.1,
            goal: 15,
            penalty: 9,
            step_reward: -1.0,
            goal_reward: 100.0,
            penalty_reward: -70.0,
            end_reward: 0.0,
            discount: 0.95,
        }
    }
}

impl MazeConfig {
    pub fn n_cells(&self) -> usize {
        self.rows * self.cols
    }

    pub fn end_state(&self) -> usize {
        self.n_cells()
    }

    pub fn n_states(&self) -> usize {
        self.n_cells() + 1
    }

    fn check_layout(&self) -> Result<(), ValidationError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ValidationError::Layout(format!(
                "grid {}x{} has no cells",
                self.rows, self.cols
            )));
        }
        for (name, cell) in [("goal", self.goal), ("penalty", self.penalty)] {
            if cell >= self.n_cells() {
                return Err(ValidationError::Layout(format!(
                    "{} cell {} is outside the {}x{} grid",
                    name, cell, self.rows, self.cols
                )));
            }
        }
        if self.goal == self.penalty {
            return Err(ValidationError::Layout(format!(
                "goal and penalty share cell {}",
                self.goal
            )));
        }
        Ok(())
    }

    /// `T[a][s][s2]` for the slippery grid.
    ///
    /// The intended move gets `intended` and each perpendicular move gets
    /// `lateral`; a move that would leave the grid keeps its mass on the
    /// originating cell.
    pub fn transitions(&self) -> Result<Array3<f64>, ValidationError> {
        self.check_layout()?;
        let n_states = self.n_states();
        let end = self.end_state();
        let mut t = Array3::zeros((MazeAction::ALL.len(), n_states, n_states));
        for action in MazeAction::ALL {
            let a = usize::from(action);
            for s in 0..self.n_cells() {
                if s == self.goal {
                    t[[a, s, end]] = 1.0;
                    continue;
                }
                let (row, col) = from_1d_to_2d(self.cols, s);
                let [left_slip, right_slip] = action.laterals();
                let moves = [
                    (action, self.intended),
                    (left_slip, self.lateral),
                    (right_slip, self.lateral),
                ];
                for (direction, p) in moves {
                    let next = offset_in_grid(self.rows, self.cols, row, col, direction.offset())
                        .map_or(s, |(r, c)| from_2d_to_1d(self.cols, r, c));
                    t[[a, s, next]] += p;
                }
            }
            t[[a, end, end]] = 1.0;
        }
        Ok(t)
    }

    /// `R[a][s]`: `step_reward` everywhere except the goal, penalty and end states.
    pub fn rewards(&self) -> Result<Array2<f64>, ValidationError> {
        self.check_layout()?;
        let mut r = Array2::from_elem((MazeAction::ALL.len(), self.n_states()), self.step_reward);
        r.column_mut(self.goal).fill(self.goal_reward);
        r.column_mut(self.penalty).fill(self.penalty_reward);
        r.column_mut(self.end_state()).fill(self.end_reward);
        Ok(r)
    }

    pub fn build(&self) -> Result<Mdp, ValidationError> {
        let mdp = Mdp::new(self.transitions()?, self.rewards()?, self.discount)?;
        debug!(
            rows = self.rows,
            cols = self.cols,
            goal = self.goal,
            penalty = self.penalty,
            "built maze"
        );
        Ok(mdp)
    }

    /// Text picture of the grid: `G` goal, `X` penalty, `@` the agent (if on the grid).
    pub fn render(&self, position: usize) -> String {
        let mut map = String::with_capacity(self.n_states() + self.rows);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let s = from_2d_to_1d(self.cols, row, col);
                let c = if s == position {
                    '@'
                } else if s == self.goal {
                    'G'
                } else if s == self.penalty {
                    'X'
                } else {
                    '_'
                };
                map.push(c);
            }
            if row + 1 < self.rows {
                map.push('\n');
            }
        }
        map
    }
}

/// The canonical 17-state, 4-action maze.
pub fn build_maze_mdp() -> Result<Mdp, ValidationError> {
    MazeConfig::default().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::*;
    use ndarray::Axis;
    use rstest::rstest;

    use crate::mdp::TRANSITION_TOLERANCE;

    #[test]
    fn maze_has_17_states_and_4_actions() {
        let mdp = build_maze_mdp().unwrap();
        assert_eq!(mdp.n_states(), 17);
        assert_eq!(mdp.n_actions(), 4);
        assert_eq!(mdp.discount(), 0.95);
    }

    #[test]
    fn every_row_is_a_distribution() {
        let mdp = build_maze_mdp().unwrap();
        for sum in mdp.transitions().sum_axis(Axis(2)).iter() {
            assert!((sum - 1.0).abs() < TRANSITION_TOLERANCE);
        }
    }

    #[rstest]
    // up from the top-left corner: intended and left slip bounce back
    #[case(MazeAction::Up, 0, 0, 0.9)]
    #[case(MazeAction::Up, 0, 1, 0.1)]
    #[case(MazeAction::Up, 5, 1, 0.8)]
    #[case(MazeAction::Up, 5, 4, 0.1)]
    #[case(MazeAction::Up, 5, 6, 0.1)]
    #[case(MazeAction::Down, 0, 4, 0.8)]
    #[case(MazeAction::Down, 3, 3, 0.1)]
    #[case(MazeAction::Down, 12, 12, 0.9)]
    #[case(MazeAction::Left, 4, 4, 0.8)]
    #[case(MazeAction::Left, 4, 0, 0.1)]
    #[case(MazeAction::Left, 4, 8, 0.1)]
    #[case(MazeAction::Left, 0, 0, 0.9)]
    #[case(MazeAction::Right, 14, 15, 0.8)]
    #[case(MazeAction::Right, 14, 10, 0.1)]
    #[case(MazeAction::Right, 14, 14, 0.1)]
    #[case(MazeAction::Right, 3, 3, 0.9)]
    #[case(MazeAction::Right, 11, 7, 0.1)]
    fn slippery_moves(
        #[case] action: MazeAction,
        #[case] state: usize,
        #[case] next_state: usize,
        #[case] expected: f64,
    ) {
        let mdp = build_maze_mdp().unwrap();
        assert_float_eq!(
            mdp.transitions()[[usize::from(action), state, next_state]],
            expected,
            abs <= 1e-12
        );
    }

    #[test]
    fn goal_leads_to_an_absorbing_end() {
        let mdp = build_maze_mdp().unwrap();
        for a in 0..4 {
            assert_eq!(mdp.transitions()[[a, 15, 16]], 1.0);
            assert_eq!(mdp.transitions()[[a, 16, 16]], 1.0);
        }
        assert_eq!(mdp.absorbing_states(), vec![16]);
        // only the goal feeds the end state
        for a in 0..4 {
            for s in 0..15 {
                assert_eq!(mdp.transitions()[[a, s, 16]], 0.0);
            }
        }
    }

    #[test]
    fn rewards_follow_the_layout() {
        let mdp = build_maze_mdp().unwrap();
        for a in 0..4 {
            for s in 0..17 {
                let expected = match s {
                    15 => 100.0,
                    9 => -70.0,
                    16 => 0.0,
                    _ => -1.0,
                };
                assert_eq!(mdp.reward(a, s), expected, "R[{a}][{s}]");
            }
        }
    }

    #[test]
    fn building_twice_is_bitwise_identical() {
        let first = build_maze_mdp().unwrap();
        let second = build_maze_mdp().unwrap();
        let bits = |m: &Mdp| {
            m.transitions()
                .iter()
                .chain(m.rewards().iter())
                .map(|v| v.to_bits())
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn larger_grids_stay_normalized() {
        let config = MazeConfig {
            rows: 3,
            cols: 5,
            goal: 14,
            penalty: 7,
            ..MazeConfig::default()
        };
        let mdp = config.build().unwrap();
        assert_eq!(mdp.n_states(), 16);
        assert_eq!(mdp.absorbing_states(), vec![15]);
    }

    #[test]
    fn bad_slip_probabilities_fail_model_validation() {
        let config = MazeConfig {
            lateral: 0.2,
            ..MazeConfig::default()
        };
        assert!(matches!(
            config.build(),
            Err(ValidationError::UnnormalizedRow { .. })
        ));
    }

    #[rstest]
    #[case(MazeConfig { goal: 16, ..MazeConfig::default() })]
    #[case(MazeConfig { penalty: 15, ..MazeConfig::default() })]
    #[case(MazeConfig { rows: 0, ..MazeConfig::default() })]
    fn rejects_broken_layouts(#[case] config: MazeConfig) {
        assert!(matches!(config.build(), Err(ValidationError::Layout(_))));
    }

    #[rstest]
    #[case(MazeConfig { goal: 40, ..MazeConfig::default() })]
    #[case(MazeConfig { penalty: 16, ..MazeConfig::default() })]
    #[case(MazeConfig { cols: 0, ..MazeConfig::default() })]
    #[case(MazeConfig { goal: 9, ..MazeConfig::default() })]
    fn tables_reject_broken_layouts(#[case] config: MazeConfig) {
        assert!(matches!(config.transitions(), Err(ValidationError::Layout(_))));
        assert!(matches!(config.rewards(), Err(ValidationError::Layout(_))));
    }

    #[test]
    fn tables_match_the_built_model() {
        let config = MazeConfig::default();
        let mdp = config.build().unwrap();
        assert_eq!(config.transitions().unwrap().view(), mdp.transitions());
        assert_eq!(config.rewards().unwrap().view(), mdp.rewards());
    }

    #[test]
    fn actions_round_trip_through_indices() {
        for (i, action) in MazeAction::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(action), i);
            assert_eq!(MazeAction::try_from(i), Ok(action));
        }
        assert_eq!(
            MazeAction::try_from(4),
            Err(InvalidInputError::ActionOutOfRange {
                action: 4,
                n_actions: 4
            })
        );
        assert_eq!(MazeAction::Left.to_string(), "LEFT");
        assert_eq!(MazeAction::Up.laterals(), [MazeAction::Left, MazeAction::Right]);
    }

    #[test]
    fn render_marks_agent_goal_and_penalty() {
        let map = MazeConfig::default().render(0);
        assert_eq!(map, "@___\n____\n_X__\n___G");
    }
}
