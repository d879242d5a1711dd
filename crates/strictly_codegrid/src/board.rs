//! The square grid of cells and its line geometry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::instrument;

use crate::challenge::ChallengeRef;
use crate::types::{Position, Team};

/// Capture state of one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) owner: Option<Team>,
    pub(crate) first_solver: Option<Team>,
    pub(crate) failed: BTreeSet<Team>,
    pub(crate) locked: bool,
    pub(crate) challenge: Option<ChallengeRef>,
}

impl Cell {
    /// Team currently holding the cell.
    pub fn owner(&self) -> Option<Team> {
        self.owner
    }

    /// Team that first captured the cell. Never changes once set.
    pub fn first_solver(&self) -> Option<Team> {
        self.first_solver
    }

    /// Teams that failed a steal attempt and may never own the cell.
    pub fn failed(&self) -> &BTreeSet<Team> {
        &self.failed
    }

    /// Whether the cell is permanently blocked.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Challenge attached to the cell, once visited.
    pub fn challenge(&self) -> Option<&ChallengeRef> {
        self.challenge.as_ref()
    }

    /// Board symbol: `#` locked, team letter when owned, `.` otherwise.
    pub fn symbol(&self) -> char {
        if self.locked {
            '#'
        } else {
            self.owner.map(Team::symbol).unwrap_or('.')
        }
    }
}

/// Scan direction for lines and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left to right.
    Row,
    /// Top to bottom.
    Column,
    /// Top-left to bottom-right.
    Diagonal,
    /// Top-right to bottom-left.
    AntiDiagonal,
}

impl Direction {
    /// All directions in scan order.
    pub const ALL: [Direction; 4] = [
        Direction::Row,
        Direction::Column,
        Direction::Diagonal,
        Direction::AntiDiagonal,
    ];

    fn step(self) -> (isize, isize) {
        match self {
            Direction::Row => (0, 1),
            Direction::Column => (1, 0),
            Direction::Diagonal => (1, 1),
            Direction::AntiDiagonal => (1, -1),
        }
    }
}

/// N×N grid of cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Creates an empty board of edge `size`.
    #[instrument]
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::default(); size * size],
        }
    }

    /// Edge length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the position lies on the board.
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.row * self.size + pos.col)
    }

    /// Cell at a position.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).and_then(|i| self.cells.get(i))
    }

    pub(crate) fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.index(pos).and_then(move |i| self.cells.get_mut(i))
    }

    /// Owner at a position, `None` when empty or off the board.
    pub fn owner_at(&self, pos: Position) -> Option<Team> {
        self.get(pos).and_then(Cell::owner)
    }

    /// Whether the cell at a position is locked.
    pub fn is_locked(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(Cell::is_locked)
    }

    /// Whether `team` passes the legality gate on at least one cell.
    pub fn has_legal_move(&self, team: Team) -> bool {
        self.cells.iter().any(|cell| cell.check_attempt(team).is_ok())
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size).flat_map(move |row| (0..self.size).map(move |col| Position::new(row, col)))
    }

    /// Positions paired with their cells, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Cell)> + '_ {
        self.positions().zip(self.cells.iter())
    }

    /// Every maximal line in one direction.
    ///
    /// Rows and columns always span the board; diagonals run from every
    /// cell on the top edge and from every cell on the entry side edge.
    pub fn lines(&self, direction: Direction) -> Vec<Vec<Position>> {
        let n = self.size;
        let starts: Vec<Position> = match direction {
            Direction::Row => (0..n).map(|r| Position::new(r, 0)).collect(),
            Direction::Column => (0..n).map(|c| Position::new(0, c)).collect(),
            Direction::Diagonal => (0..n)
                .map(|c| Position::new(0, c))
                .chain((1..n).map(|r| Position::new(r, 0)))
                .collect(),
            Direction::AntiDiagonal => (0..n)
                .map(|c| Position::new(0, c))
                .chain((1..n).map(|r| Position::new(r, n - 1)))
                .collect(),
        };

        starts
            .into_iter()
            .map(|start| self.walk(start, direction))
            .collect()
    }

    fn walk(&self, start: Position, direction: Direction) -> Vec<Position> {
        let (dr, dc) = direction.step();
        let mut line = Vec::with_capacity(self.size);
        let (mut row, mut col) = (start.row as isize, start.col as isize);
        let n = self.size as isize;
        while (0..n).contains(&row) && (0..n).contains(&col) {
            line.push(Position::new(row as usize, col as usize));
            row += dr;
            col += dc;
        }
        line
    }

    /// Every window of exactly `k` consecutive cells, in scan order.
    pub fn windows(&self, k: usize) -> Vec<Vec<Position>> {
        if k == 0 {
            return Vec::new();
        }
        Direction::ALL
            .iter()
            .flat_map(|&direction| self.lines(direction))
            .flat_map(|line| {
                line.windows(k)
                    .map(<[Position]>::to_vec)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Formats the board as a human-readable grid.
    pub fn display(&self) -> String {
        (0..self.size)
            .map(|row| {
                (0..self.size)
                    .filter_map(|col| self.get(Position::new(row, col)))
                    .map(|cell| cell.symbol().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
