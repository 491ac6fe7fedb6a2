//! Minesweeper
//!
//! Mines are laid around a guaranteed-safe opening cell. Revealing a cell
//! with no adjacent mines opens its whole zero region; revealing a mine ends
//! the turn. Flags are bookkeeping for the player and never required.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::heuristics::TimingThresholds;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Generated minefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinesweeperSpec {
    /// Cells per side.
    pub size: u8,
    /// Cell the player is told to open first; it and its neighbours are safe.
    pub opening: usize,
    /// Mine cells, ascending.
    pub mines: Vec<usize>,
}

impl MinesweeperSpec {
    fn cells(&self) -> usize {
        self.size as usize * self.size as usize
    }

    fn is_mine(&self, cell: usize) -> bool {
        self.mines.binary_search(&cell).is_ok()
    }

    /// All eight neighbours of `cell`.
    fn around(&self, cell: usize) -> impl Iterator<Item = usize> {
        let n = self.size as isize;
        let (row, col) = ((cell as isize) / n, (cell as isize) % n);
        (-1..=1)
            .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
            .filter(|&d| d != (0, 0))
            .map(move |(dr, dc)| (row + dr, col + dc))
            .filter(move |&(r, c)| (0..n).contains(&r) && (0..n).contains(&c))
            .map(move |(r, c)| (r * n + c) as usize)
    }

    fn adjacent_mines(&self, cell: usize) -> usize {
        self.around(cell).filter(|&c| self.is_mine(c)).count()
    }

    /// Cells opened by revealing safe `cell`: the cell itself, plus the
    /// zero region it belongs to and that region's border.
    fn opened_by(&self, cell: usize, revealed: &[bool]) -> Vec<usize> {
        let mut opened = Vec::new();
        let mut seen = revealed.to_vec();
        let mut queue = VecDeque::from([cell]);
        seen[cell] = true;
        while let Some(current) = queue.pop_front() {
            opened.push(current);
            if self.adjacent_mines(current) > 0 {
                continue;
            }
            for next in self.around(current) {
                if !seen[next] && !self.is_mine(next) {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        opened
    }
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinesweeperView {
    /// Cells per side.
    pub size: u8,
    /// Safe first cell.
    pub opening: usize,
    /// Number of mines.
    pub mine_count: u32,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct MinesweeperState {
    revealed: Vec<bool>,
    flagged: Vec<bool>,
    exploded: Option<usize>,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinesweeperDetail {
    /// Safe cells uncovered.
    pub safe_revealed: u32,
    /// Safe cells on the board.
    pub safe_cells: u32,
    /// Flags standing on safe cells.
    pub wrong_flags: u32,
    /// Mine that went off.
    pub exploded: Option<usize>,
}

/// Minesweeper game module.
pub struct MinesweeperGame;

impl GameModule for MinesweeperGame {
    const GAME_TYPE: GameType = GameType::Minesweeper;
    const EVENT_KINDS: &'static [&'static str] = &["reveal", "flag"];
    const SECRET_FIELDS: &'static [&'static str] = &["mines"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = MinesweeperSpec;
    type Client = MinesweeperView;
    type State = MinesweeperState;
    type Detail = MinesweeperDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 180_000,
            grid_size: 8,
            item_count: 10,
            timing: TimingThresholds {
                min_perfect_completion_ms: 2_000,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 100, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> MinesweeperSpec {
        let size = config.grid_size.clamp(5, 16);
        let cells = size as usize * size as usize;
        let opening = rng.next_index(cells);

        let mut spec = MinesweeperSpec { size, opening, mines: Vec::new() };
        let keep_clear: Vec<usize> = spec.around(opening).chain([opening]).collect();
        let mut candidates: Vec<usize> = (0..cells).filter(|c| !keep_clear.contains(c)).collect();
        rng.shuffle(&mut candidates);

        let mines = (config.item_count as usize).clamp(1, candidates.len());
        candidates.truncate(mines);
        candidates.sort_unstable();
        spec.mines = candidates;
        spec
    }

    fn project(spec: &MinesweeperSpec) -> MinesweeperView {
        MinesweeperView {
            size: spec.size,
            opening: spec.opening,
            mine_count: spec.mines.len() as u32,
        }
    }

    fn initial_state(spec: &MinesweeperSpec) -> MinesweeperState {
        MinesweeperState {
            revealed: vec![false; spec.cells()],
            flagged: vec![false; spec.cells()],
            exploded: None,
        }
    }

    fn apply(spec: &MinesweeperSpec, mut state: MinesweeperState, step: &Step<'_>) -> MinesweeperState {
        if state.exploded.is_some() || state.revealed.len() != spec.cells() {
            return state;
        }
        let Some(cell) = step.index("cell").filter(|&c| c < spec.cells()) else {
            return state;
        };
        if state.revealed[cell] {
            return state;
        }

        match step.kind {
            "flag" => state.flagged[cell] = !state.flagged[cell],
            "reveal" if state.flagged[cell] => {}
            "reveal" if spec.is_mine(cell) => state.exploded = Some(cell),
            "reveal" => {
                for opened in spec.opened_by(cell, &state.revealed) {
                    state.revealed[opened] = true;
                    state.flagged[opened] = false;
                }
            }
            _ => {}
        }
        state
    }

    fn evaluate(spec: &MinesweeperSpec, state: &MinesweeperState) -> Evaluation<MinesweeperDetail> {
        let safe_cells = spec.cells().saturating_sub(spec.mines.len()) as u32;
        let safe_revealed = state.revealed.iter().filter(|&&r| r).count() as u32;
        let wrong_flags = state
            .flagged
            .iter()
            .enumerate()
            .filter(|&(cell, &f)| f && !spec.is_mine(cell))
            .count() as u32;

        let failure = if state.exploded.is_some() {
            Some(FailureReason::MineHit)
        } else if safe_revealed < safe_cells {
            Some(FailureReason::Incomplete)
        } else {
            None
        };

        Evaluation {
            metrics: Metrics {
                correct: safe_revealed,
                total: safe_cells,
                mistakes: wrong_flags,
                penalty_units: wrong_flags,
            },
            detail: MinesweeperDetail {
                safe_revealed,
                safe_cells,
                wrong_flags,
                exploded: state.exploded,
            },
            failure,
        }
    }

    fn reveal(spec: &MinesweeperSpec, state: &MinesweeperState, step: &Step<'_>) -> Option<Value> {
        if step.kind != "reveal" {
            return None;
        }
        let cell = step.index("cell").filter(|&c| c < spec.cells())?;
        if state.exploded == Some(cell) {
            return Some(json!({ "cell": cell, "mine": true }));
        }
        // Region this reveal opened, with counts
        let opened: Vec<[usize; 2]> = spec
            .opened_by(cell, &vec![false; spec.cells()])
            .into_iter()
            .map(|c| [c, spec.adjacent_mines(c)])
            .collect();
        Some(json!({ "cell": cell, "opened": opened }))
    }

    fn script(spec: &MinesweeperSpec) -> Vec<ScriptedAction> {
        let action = |kind: &'static str, cell: usize| ScriptedAction {
            kind,
            payload: json!({ "cell": cell }),
            pace: Pace::Free,
        };

        // Flags go in right after the opening; the board settles on the last reveal
        let mut revealed = vec![false; spec.cells()];
        let mut actions = Vec::new();
        for cell in std::iter::once(spec.opening).chain(0..spec.cells()) {
            if revealed[cell] || spec.is_mine(cell) {
                continue;
            }
            for opened in spec.opened_by(cell, &revealed) {
                revealed[opened] = true;
            }
            actions.push(action("reveal", cell));
            if cell == spec.opening {
                actions.extend(spec.mines.iter().map(|&m| action("flag", m)));
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 board, mines at 6 and 9:
    ///
    /// ```text
    /// 0 1 1 1
    /// 1 2 * 1
    /// 1 * 2 1
    /// 1 1 1 0
    /// ```
    fn spec() -> MinesweeperSpec {
        MinesweeperSpec { size: 4, opening: 0, mines: vec![6, 9] }
    }

    fn play(spec: &MinesweeperSpec, steps: &[(&'static str, usize)]) -> MinesweeperState {
        let mut state = MinesweeperGame::initial_state(spec);
        for (kind, cell) in steps {
            let payload = json!({ "cell": cell });
            state = MinesweeperGame::apply(spec, state, &Step { kind: *kind, payload: &payload, at_ms: 0 });
        }
        state
    }

    #[test]
    fn test_adjacent_counts() {
        let spec = spec();
        let counts: Vec<usize> = (0..16).map(|c| spec.adjacent_mines(c)).collect();
        assert_eq!(counts, vec![0, 1, 1, 1, 1, 2, 1, 1, 1, 1, 2, 1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_zero_region_opens_with_border() {
        let spec = spec();
        let mut opened = spec.opened_by(0, &[false; 16]);
        opened.sort_unstable();
        assert_eq!(opened, vec![0, 1, 4, 5]);

        let state = play(&spec, &[("reveal", 0)]);
        assert_eq!(MinesweeperGame::evaluate(&spec, &state).failure, Some(FailureReason::Incomplete));
    }

    #[test]
    fn test_clear_board() {
        let spec = spec();
        let state = play(&spec, &[
            ("reveal", 0),
            ("flag", 6),
            ("reveal", 15),
            ("reveal", 2),
            ("reveal", 3),
            ("reveal", 7),
            ("reveal", 8),
            ("reveal", 12),
            ("reveal", 13),
        ]);
        let eval = MinesweeperGame::evaluate(&spec, &state);
        assert_eq!(eval.detail.safe_revealed, 14);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.metrics.penalty_units, 0);
    }

    #[test]
    fn test_mine_ends_turn() {
        let spec = spec();
        let state = play(&spec, &[("reveal", 0), ("reveal", 6), ("reveal", 15)]);
        assert_eq!(state.exploded, Some(6));
        assert!(!state.revealed[15]);
        assert_eq!(MinesweeperGame::evaluate(&spec, &state).failure, Some(FailureReason::MineHit));
    }

    #[test]
    fn test_flag_blocks_reveal_and_counts_when_wrong() {
        let spec = spec();
        let state = play(&spec, &[("flag", 9), ("reveal", 9), ("flag", 7), ("flag", 15)]);
        assert_eq!(state.exploded, None);
        let eval = MinesweeperGame::evaluate(&spec, &state);
        assert_eq!(eval.detail.wrong_flags, 2);
    }

    #[test]
    fn test_generated_opening_is_zero() {
        for seed in 0..100 {
            let spec = MinesweeperGame::generate(&mut DeterministicRng::new(seed), &MinesweeperGame::default_config());
            assert_eq!(spec.mines.len(), 10);
            assert_eq!(spec.adjacent_mines(spec.opening), 0);
            assert!(!spec.is_mine(spec.opening));
            assert!(spec.mines.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_reveal_reports_opened_cells() {
        let spec = spec();
        let state = play(&spec, &[("reveal", 15)]);
        let payload = json!({ "cell": 15 });
        let step = Step { kind: "reveal", payload: &payload, at_ms: 0 };
        let reveal = MinesweeperGame::reveal(&spec, &state, &step).unwrap();
        assert_eq!(reveal["opened"].as_array().map(Vec::len), Some(4));
        assert_eq!(reveal["opened"][0], json!([15, 0]));
    }
}
