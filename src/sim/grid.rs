//! Tile grids and the four cardinal headings used by grid games

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Cardinal heading. Screen coordinates: `Up` is -y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    /// Tie-break order for heading choices
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    pub fn unit(self) -> Vec2 {
        self.delta().as_vec2()
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// Squared euclidean distance between cells
#[inline]
pub fn dist2(a: IVec2, b: IVec2) -> i32 {
    let d = a - b;
    d.x * d.x + d.y * d.y
}

/// Manhattan distance between cells
#[inline]
pub fn manhattan(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x + d.y
}

/// Dense row-major grid of `T`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

impl<T: Copy> Grid<T> {
    pub fn new(width: i32, height: i32, fill: T) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            cells: vec![fill; (width * height) as usize],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y * self.width + cell.x) as usize)
    }

    pub fn get(&self, cell: IVec2) -> Option<T> {
        self.index(cell).map(|i| self.cells[i])
    }

    /// Write `value`; out-of-bounds writes are ignored
    pub fn set(&mut self, cell: IVec2, value: T) {
        if let Some(i) = self.index(cell) {
            self.cells[i] = value;
        }
    }

    pub fn fill(&mut self, value: T) {
        self.cells.iter_mut().for_each(|c| *c = value);
    }

    /// Wrap the x coordinate around the grid (tunnels)
    pub fn wrap_x(&self, cell: IVec2) -> IVec2 {
        IVec2::new(cell.x.rem_euclid(self.width.max(1)), cell.y)
    }

    /// Iterate `(cell, value)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, T)> + '_ {
        self.cells.iter().enumerate().map(move |(i, v)| {
            let i = i as i32;
            (IVec2::new(i % self.width, i / self.width), *v)
        })
    }
}
