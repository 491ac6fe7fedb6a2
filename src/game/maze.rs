//! Maze
//!
//! A perfect maze (exactly one path between any two cells) carved by an
//! iterative randomized depth-first backtracker. The player walks from the
//! start through every checkpoint in listed order.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::grid::{Direction, Grid};
use super::heuristics::TimingThresholds;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Most checkpoints a maze carries.
const MAX_CHECKPOINTS: usize = 8;

/// Generated maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeSpec {
    /// Cells per side.
    pub size: u8,
    /// Open sides per cell as [`Direction::bit`] flags, row-major.
    pub cells: Vec<u8>,
    /// Starting cell.
    pub start: usize,
    /// Cells to visit, in order.
    pub checkpoints: Vec<usize>,
    /// Shortest walk through every checkpoint (cells entered, start excluded).
    pub solution_path: Vec<usize>,
}

impl MazeSpec {
    fn grid(&self) -> Grid {
        Grid::square(self.size as usize)
    }

    fn is_open(&self, cell: usize, dir: Direction) -> bool {
        self.cells.get(cell).is_some_and(|&c| c & dir.bit() != 0)
    }

    /// Whether `cell` lies on the only route from the last checkpoint reached
    /// (or the start) to checkpoint `target`. Crossing a later checkpoint there
    /// is unavoidable and not an ordering mistake.
    fn on_current_leg(&self, target: usize, cell: usize) -> bool {
        let from = match target {
            0 => self.start,
            n => self.checkpoints[n - 1],
        };
        shortest_path(&self.grid(), &self.cells, from, self.checkpoints[target]).contains(&cell)
    }
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeView {
    /// Cells per side.
    pub size: u8,
    /// Open sides per cell.
    pub cells: Vec<u8>,
    /// Starting cell.
    pub start: usize,
    /// Cells to visit, in order.
    pub checkpoints: Vec<usize>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct MazeState {
    position: usize,
    next_checkpoint: usize,
    moves: u32,
    bumps: u32,
    out_of_order: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeDetail {
    /// Checkpoints reached in order.
    pub checkpoints_reached: u32,
    /// Checkpoints in the maze.
    pub checkpoints: u32,
    /// Successful moves.
    pub moves: u32,
    /// Length of the shortest route.
    pub par_moves: u32,
    /// Moves into walls.
    pub bumps: u32,
    /// Later checkpoints entered early.
    pub out_of_order: u32,
}

/// Maze game module.
pub struct MazeGame;

impl GameModule for MazeGame {
    const GAME_TYPE: GameType = GameType::Maze;
    const EVENT_KINDS: &'static [&'static str] = &["move"];
    const SECRET_FIELDS: &'static [&'static str] = &["solution_path"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = MazeSpec;
    type Client = MazeView;
    type State = MazeState;
    type Detail = MazeDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 90_000,
            grid_size: 7,
            item_count: 3,
            timing: TimingThresholds {
                gap_floor_ms: 40,
                min_mean_gap_ms: 120,
                low_variance_mean_ceiling_ms: 250,
                min_perfect_completion_ms: 2_000,
                review_mean_gap_ms: 200,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 10, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> MazeSpec {
        let size = config.grid_size.clamp(3, 15);
        let grid = Grid::square(size as usize);
        let start = rng.next_index(grid.len());
        let cells = carve(&grid, start, rng);

        let mut others: Vec<usize> = (0..grid.len()).filter(|&c| c != start).collect();
        rng.shuffle(&mut others);
        let count = (config.item_count as usize).clamp(1, MAX_CHECKPOINTS);
        others.truncate(count);
        let checkpoints = others;

        let mut solution_path = Vec::new();
        let mut from = start;
        for &target in &checkpoints {
            solution_path.extend(shortest_path(&grid, &cells, from, target));
            from = target;
        }

        MazeSpec { size, cells, start, checkpoints, solution_path }
    }

    fn project(spec: &MazeSpec) -> MazeView {
        MazeView {
            size: spec.size,
            cells: spec.cells.clone(),
            start: spec.start,
            checkpoints: spec.checkpoints.clone(),
        }
    }

    fn initial_state(spec: &MazeSpec) -> MazeState {
        MazeState {
            position: spec.start,
            next_checkpoint: 0,
            moves: 0,
            bumps: 0,
            out_of_order: 0,
        }
    }

    fn apply(spec: &MazeSpec, mut state: MazeState, step: &Step<'_>) -> MazeState {
        let Some(dir) = step.text("dir").and_then(Direction::parse) else {
            return state;
        };
        if state.next_checkpoint >= spec.checkpoints.len() {
            // Finished; further input changes nothing
            return state;
        }

        let next = spec
            .grid()
            .step(state.position, dir)
            .filter(|_| spec.is_open(state.position, dir));
        let Some(next) = next else {
            state.bumps += 1;
            return state;
        };

        state.position = next;
        state.moves += 1;

        if spec.checkpoints[state.next_checkpoint] == next {
            state.next_checkpoint += 1;
        } else if spec.checkpoints[state.next_checkpoint + 1..].contains(&next)
            && !spec.on_current_leg(state.next_checkpoint, next)
        {
            state.out_of_order += 1;
        }
        state
    }

    fn evaluate(spec: &MazeSpec, state: &MazeState) -> Evaluation<MazeDetail> {
        let checkpoints = spec.checkpoints.len() as u32;
        let reached = state.next_checkpoint as u32;
        let par_moves = spec.solution_path.len() as u32;
        let extra_moves = state.moves.saturating_sub(par_moves);

        let failure = if reached >= checkpoints {
            None
        } else if state.out_of_order > 0 {
            Some(FailureReason::IncorrectOrder)
        } else {
            Some(FailureReason::Incomplete)
        };

        Evaluation {
            metrics: Metrics {
                correct: reached,
                total: checkpoints,
                mistakes: state.bumps,
                penalty_units: state.bumps.saturating_add(extra_moves),
            },
            detail: MazeDetail {
                checkpoints_reached: reached,
                checkpoints,
                moves: state.moves,
                par_moves,
                bumps: state.bumps,
                out_of_order: state.out_of_order,
            },
            failure,
        }
    }

    fn script(spec: &MazeSpec) -> Vec<ScriptedAction> {
        let grid = spec.grid();
        let mut from = spec.start;
        let mut actions = Vec::with_capacity(spec.solution_path.len());
        for &cell in &spec.solution_path {
            if let Some(dir) = grid.direction_between(from, cell) {
                actions.push(ScriptedAction {
                    kind: "move",
                    payload: json!({ "dir": dir }),
                    pace: Pace::Free,
                });
            }
            from = cell;
        }
        actions
    }
}

/// Randomized depth-first backtracker with an explicit stack.
fn carve(grid: &Grid, start: usize, rng: &mut DeterministicRng) -> Vec<u8> {
    let mut cells = vec![0u8; grid.len()];
    let mut visited = vec![false; grid.len()];
    let mut stack = vec![start];
    visited[start] = true;

    while let Some(&current) = stack.last() {
        let unvisited: Vec<(Direction, usize)> = grid
            .neighbors(current)
            .filter(|&(_, next)| !visited[next])
            .collect();

        match rng.choose(&unvisited) {
            Some(&(dir, next)) => {
                cells[current] |= dir.bit();
                cells[next] |= dir.opposite().bit();
                visited[next] = true;
                stack.push(next);
            }
            None => {
                stack.pop();
            }
        }
    }
    cells
}

/// Breadth-first path from `from` to `to` (cells entered, `from` excluded).
fn shortest_path(grid: &Grid, cells: &[u8], from: usize, to: usize) -> Vec<usize> {
    if from >= grid.len() || to >= grid.len() {
        return Vec::new();
    }
    let mut previous = vec![usize::MAX; grid.len()];
    let mut queue = VecDeque::from([from]);
    previous[from] = from;

    while let Some(current) = queue.pop_front() {
        if current == to {
            break;
        }
        for (dir, next) in grid.neighbors(current) {
            let open = cells.get(current).is_some_and(|&c| c & dir.bit() != 0);
            if open && previous[next] == usize::MAX {
                previous[next] = current;
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut cell = to;
    while cell != from && previous[cell] != usize::MAX {
        path.push(cell);
        cell = previous[cell];
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn walk(spec: &MazeSpec, dirs: &[&str]) -> MazeState {
        let mut state = MazeGame::initial_state(spec);
        for dir in dirs {
            let payload = json!({ "dir": dir });
            state = MazeGame::apply(spec, state, &Step { kind: "move", payload: &payload, at_ms: 0 });
        }
        state
    }

    /// 3x3 corridor: 0-1-2 / 5-4-3 / 6-7-8 snake.
    fn snake() -> MazeSpec {
        let r = Direction::Right.bit();
        let l = Direction::Left.bit();
        let d = Direction::Down.bit();
        let u = Direction::Up.bit();
        MazeSpec {
            size: 3,
            cells: vec![r, l | r, l | d, r | d, l | r, u | l, u | r, l | r, l],
            start: 0,
            checkpoints: vec![2, 6],
            solution_path: vec![1, 2, 5, 4, 3, 6],
        }
    }

    #[test]
    fn test_generated_maze_is_perfect() {
        for seed in 0..30 {
            let spec = MazeGame::generate(&mut DeterministicRng::new(seed), &MazeGame::default_config());
            let n = spec.cells.len();
            // Spanning tree: n - 1 passages, each counted from both sides
            let openings: u32 = spec.cells.iter().map(|c| c.count_ones()).sum();
            assert_eq!(openings as usize, 2 * (n - 1));

            assert_eq!(spec.checkpoints.len(), 3);
            assert!(!spec.checkpoints.contains(&spec.start));
            assert_eq!(spec.solution_path.last(), spec.checkpoints.last());
        }
    }

    #[test]
    fn test_script_walks_solution() {
        let spec = MazeGame::generate(&mut DeterministicRng::new(4), &MazeGame::default_config());
        let script = MazeGame::script(&spec);
        let dirs: Vec<String> = script
            .iter()
            .map(|a| a.payload["dir"].as_str().map(str::to_string).unwrap_or_default())
            .collect();
        let dirs: Vec<&str> = dirs.iter().map(String::as_str).collect();

        let state = walk(&spec, &dirs);
        let eval = MazeGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.metrics.penalty_units, 0);
    }

    #[test]
    fn test_walls_bump() {
        let spec = snake();
        let state = walk(&spec, &["down", "up", "left", "right", "right"]);
        assert_eq!(state.bumps, 3);
        assert_eq!(state.position, 2);
        assert_eq!(state.next_checkpoint, 1);
    }

    #[test]
    fn test_out_of_order_checkpoint() {
        // From the middle of row 1, checkpoint 3 is left; 5 is a detour
        let mut spec = snake();
        spec.start = 4;
        spec.checkpoints = vec![3, 5];
        spec.solution_path = vec![3, 4, 5];
        let state = walk(&spec, &["right"]);
        let eval = MazeGame::evaluate(&spec, &state);
        assert_eq!(eval.detail.out_of_order, 1);
        assert_eq!(eval.failure, Some(FailureReason::IncorrectOrder));
    }

    #[test]
    fn test_later_checkpoint_on_only_route_is_not_out_of_order() {
        // The only way to 6 passes through 2
        let mut spec = snake();
        spec.checkpoints = vec![6, 2];
        spec.solution_path = vec![1, 2, 5, 4, 3, 6, 3, 4, 5, 2];

        let halfway = walk(&spec, &["right", "right"]);
        let eval = MazeGame::evaluate(&spec, &halfway);
        assert_eq!(eval.detail.out_of_order, 0);
        assert_eq!(eval.failure, Some(FailureReason::Incomplete));

        let there_and_back = walk(
            &spec,
            &["right", "right", "down", "left", "left", "down", "up", "right", "right", "up"],
        );
        let eval = MazeGame::evaluate(&spec, &there_and_back);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.detail.out_of_order, 0);
        assert_eq!(eval.metrics.penalty_units, 0);
    }

    #[test]
    fn test_incomplete_without_order_violation() {
        let spec = snake();
        let state = walk(&spec, &["right"]);
        assert_eq!(MazeGame::evaluate(&spec, &state).failure, Some(FailureReason::Incomplete));
    }

    #[test]
    fn test_malformed_dirs_ignored() {
        let spec = snake();
        let mut state = MazeGame::initial_state(&spec);
        for payload in [json!({"dir": "north"}), json!({"dir": 1}), Value::Null] {
            state = MazeGame::apply(&spec, state, &Step { kind: "move", payload: &payload, at_ms: 0 });
        }
        assert_eq!(state.moves + state.bumps, 0);
    }

    #[test]
    fn test_full_walk_scores_extra_moves() {
        let spec = snake();
        let state = walk(&spec, &["right", "left", "right", "right", "down", "left", "left", "down"]);
        let eval = MazeGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.detail.moves, 8);
        assert_eq!(eval.metrics.penalty_units, 2);
    }
}
