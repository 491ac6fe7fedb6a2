//! Word Search
//!
//! Words hidden in a letter grid along rows, columns and diagonals. A
//! selection is a straight line between two cells; it finds a word when the
//! letters read either way spell one that is still missing.

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::heuristics::TimingThresholds;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

const WORDS: &[&str] = &[
    "ARENA", "BRICK", "CANDY", "DREAM", "EAGLE", "FLAME", "GIANT", "HONEY",
    "IVORY", "JOKER", "KNIGHT", "LEMON", "MAPLE", "NOBLE", "OCEAN", "PIANO",
    "QUEST", "RIVER", "STORM", "TIGER", "VIVID", "WHALE", "YACHT", "ZEBRA",
    "ORBIT", "PIXEL", "ROCKET", "SPARK", "TOKEN", "CLOUD", "FROST", "GLOBE",
    "MAGIC", "PRISM", "RUNE", "STAR", "MOON", "GEM", "SUN", "OWL",
];

/// Row/column steps a word may run along.
const LINES: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// Placement attempts per word before it is dropped.
const PLACE_ATTEMPTS: usize = 200;

/// Generated grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSearchSpec {
    /// Cells per side.
    pub size: u8,
    /// Uppercase letters, row-major.
    pub letters: String,
    /// Words to find.
    pub words: Vec<String>,
    /// First and last cell of each word, in `words` order.
    pub placements: Vec<[usize; 2]>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSearchView {
    /// Cells per side.
    pub size: u8,
    /// Uppercase letters, row-major.
    pub letters: String,
    /// Words to find.
    pub words: Vec<String>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSearchState {
    found: Vec<bool>,
    wrong: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSearchDetail {
    /// Words found.
    pub words_found: u32,
    /// Words hidden.
    pub words: u32,
    /// Selections that spelled nothing new.
    pub wrong_selections: u32,
}

/// Cells from `from` to `to` if they form a straight line of two or more.
fn line_cells(size: usize, from: usize, to: usize) -> Option<Vec<usize>> {
    let cells = size * size;
    if from >= cells || to >= cells || from == to {
        return None;
    }
    let (r0, c0) = ((from / size) as isize, (from % size) as isize);
    let (r1, c1) = ((to / size) as isize, (to % size) as isize);
    let (dr, dc) = (r1 - r0, c1 - c0);
    if dr != 0 && dc != 0 && dr.abs() != dc.abs() {
        return None;
    }

    let len = dr.abs().max(dc.abs());
    let (sr, sc) = (dr.signum(), dc.signum());
    Some(
        (0..=len)
            .map(|i| ((r0 + sr * i) * size as isize + c0 + sc * i) as usize)
            .collect(),
    )
}

/// Try to lay `word` into `grid`; returns its end cells.
fn place(rng: &mut DeterministicRng, grid: &mut [u8], size: usize, word: &[u8]) -> Option<[usize; 2]> {
    let len = word.len() as isize;
    let n = size as isize;
    for _ in 0..PLACE_ATTEMPTS {
        let (dr, dc) = LINES[rng.next_index(LINES.len())];
        let row = rng.next_index(size) as isize;
        let col = rng.next_index(size) as isize;
        let (end_r, end_c) = (row + dr * (len - 1), col + dc * (len - 1));
        if !(0..n).contains(&end_r) || !(0..n).contains(&end_c) {
            continue;
        }

        let cells: Vec<usize> = (0..len)
            .map(|i| ((row + dr * i) * n + col + dc * i) as usize)
            .collect();
        let fits = cells
            .iter()
            .zip(word)
            .all(|(&cell, &letter)| grid[cell] == 0 || grid[cell] == letter);
        if !fits {
            continue;
        }

        for (&cell, &letter) in cells.iter().zip(word) {
            grid[cell] = letter;
        }
        return Some([cells[0], cells[cells.len() - 1]]);
    }
    None
}

/// Word search game module.
pub struct WordSearchGame;

impl GameModule for WordSearchGame {
    const GAME_TYPE: GameType = GameType::WordSearch;
    const EVENT_KINDS: &'static [&'static str] = &["select"];
    const SECRET_FIELDS: &'static [&'static str] = &["placements"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = WordSearchSpec;
    type Client = WordSearchView;
    type State = WordSearchState;
    type Detail = WordSearchDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 120_000,
            grid_size: 8,
            item_count: 6,
            timing: TimingThresholds {
                min_perfect_completion_ms: 2_000,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 40, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> WordSearchSpec {
        let size = config.grid_size.clamp(6, 12);
        let n = size as usize;
        let wanted = (config.item_count as usize).clamp(1, 12);

        let mut pool: Vec<&str> = WORDS.iter().copied().filter(|w| w.len() <= n).collect();
        rng.shuffle(&mut pool);

        let mut grid = vec![0u8; n * n];
        let mut words = Vec::with_capacity(wanted);
        let mut placements = Vec::with_capacity(wanted);
        for word in pool {
            if words.len() == wanted {
                break;
            }
            if let Some(ends) = place(rng, &mut grid, n, word.as_bytes()) {
                words.push(word.to_string());
                placements.push(ends);
            }
        }

        for cell in grid.iter_mut().filter(|c| **c == 0) {
            *cell = b'A' + rng.next_int(26) as u8;
        }
        let letters = grid.iter().map(|&b| b as char).collect();

        WordSearchSpec { size, letters, words, placements }
    }

    fn project(spec: &WordSearchSpec) -> WordSearchView {
        WordSearchView {
            size: spec.size,
            letters: spec.letters.clone(),
            words: spec.words.clone(),
        }
    }

    fn initial_state(spec: &WordSearchSpec) -> WordSearchState {
        WordSearchState { found: vec![false; spec.words.len()], wrong: 0 }
    }

    fn apply(spec: &WordSearchSpec, mut state: WordSearchState, step: &Step<'_>) -> WordSearchState {
        let (Some(from), Some(to)) = (step.index("from"), step.index("to")) else {
            return state;
        };
        let Some(cells) = line_cells(spec.size as usize, from, to) else {
            return state;
        };
        let letters = spec.letters.as_bytes();
        let Some(forward) = cells.iter().map(|&c| letters.get(c).copied()).collect::<Option<Vec<u8>>>() else {
            return state;
        };
        let backward: Vec<u8> = forward.iter().rev().copied().collect();

        let matches = |w: &String| w.as_bytes() == forward.as_slice() || w.as_bytes() == backward.as_slice();
        let hit = spec.words.iter().enumerate().position(|(i, w)| !state.found[i] && matches(w));
        match hit {
            Some(i) => state.found[i] = true,
            // Re-selecting a found word is harmless
            None if spec.words.iter().any(|w| matches(w)) => {}
            None => state.wrong += 1,
        }
        state
    }

    fn evaluate(_spec: &WordSearchSpec, state: &WordSearchState) -> Evaluation<WordSearchDetail> {
        let words = state.found.len() as u32;
        let words_found = state.found.iter().filter(|&&f| f).count() as u32;

        Evaluation {
            metrics: Metrics {
                correct: words_found,
                total: words,
                mistakes: state.wrong,
                penalty_units: state.wrong,
            },
            detail: WordSearchDetail { words_found, words, wrong_selections: state.wrong },
            failure: (words_found < words).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &WordSearchSpec) -> Vec<ScriptedAction> {
        spec.placements
            .iter()
            .map(|[from, to]| ScriptedAction {
                kind: "select",
                payload: json!({ "from": from, "to": to }),
                pace: Pace::Free,
            })
            .collect()
    }
}
