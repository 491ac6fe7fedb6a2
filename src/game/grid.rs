//! Square Grid Helpers
//!
//! Row-major cell indexing shared by the board games (maze, sliding puzzle,
//! lights out, scratch card, whack-a-mole).

use serde::{Serialize, Deserialize};

/// Cardinal direction on a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Row - 1.
    Up,
    /// Column + 1.
    Right,
    /// Row + 1.
    Down,
    /// Column - 1.
    Left,
}

impl Direction {
    /// All directions in bit order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    /// Wall/opening bit for this side of a cell.
    #[inline]
    pub fn bit(self) -> u8 {
        match self {
            Direction::Up => 1,
            Direction::Right => 2,
            Direction::Down => 4,
            Direction::Left => 8,
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }

    /// Parse a payload direction name.
    pub fn parse(name: &str) -> Option<Direction> {
        match name {
            "up" => Some(Direction::Up),
            "right" => Some(Direction::Right),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            _ => None,
        }
    }
}

/// Row-major rectangular grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
}

impl Grid {
    /// Square grid with `size` cells per side.
    pub fn square(size: usize) -> Self {
        Self { width: size, height: size }
    }

    /// Total cell count.
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True if the grid has no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `cell` is a valid index.
    #[inline]
    pub fn contains(&self, cell: usize) -> bool {
        cell < self.len()
    }

    /// Neighbouring cell in a direction, if on the board.
    pub fn step(&self, cell: usize, dir: Direction) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let (row, col) = (cell / self.width, cell % self.width);
        match dir {
            Direction::Up if row > 0 => Some(cell - self.width),
            Direction::Down if row + 1 < self.height => Some(cell + self.width),
            Direction::Left if col > 0 => Some(cell - 1),
            Direction::Right if col + 1 < self.width => Some(cell + 1),
            _ => None,
        }
    }

    /// On-board orthogonal neighbours in `Direction::ALL` order.
    pub fn neighbors(&self, cell: usize) -> impl Iterator<Item = (Direction, usize)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.step(cell, dir).map(|next| (dir, next)))
    }

    /// Direction from `from` to an orthogonally adjacent `to`.
    pub fn direction_between(&self, from: usize, to: usize) -> Option<Direction> {
        self.neighbors(from).find(|&(_, next)| next == to).map(|(dir, _)| dir)
    }
}
