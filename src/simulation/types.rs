//! Core types for the logistics simulation
//!
//! Grid cells, pixel positions, identifiers and the resource/facility
//! vocabulary shared by every other module.

use std::fmt;

/// Size of one grid cell in pixels
pub const GRID_SIZE: f32 = 32.0;

/// Distance (in pixels) under which a truck counts as sitting on a cell centre
pub const ARRIVAL_EPSILON: f32 = 1e-3;

/// A grid square. The coordinate space is unbounded and sparse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The orthogonal neighbours, in east, west, south, north order.
    /// Neighbours past the edge of the `i32` coordinate space are skipped.
    pub fn neighbors4(&self) -> impl Iterator<Item = Cell> {
        let Cell { x, y } = *self;
        [
            x.checked_add(1).map(|nx| Cell::new(nx, y)),
            x.checked_sub(1).map(|nx| Cell::new(nx, y)),
            y.checked_add(1).map(|ny| Cell::new(x, ny)),
            y.checked_sub(1).map(|ny| Cell::new(x, ny)),
        ]
        .into_iter()
        .flatten()
    }

    /// Manhattan distance, saturating at `u32::MAX`
    pub fn manhattan(&self, other: &Cell) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Squared Euclidean distance, used for production radius checks
    pub fn distance_sq(&self, other: &Cell) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// The cell offset by (`dx`, `dy`), or `None` past the edge of the coordinate space
    pub fn checked_offset(&self, dx: i32, dy: i32) -> Option<Cell> {
        Some(Cell::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }

    pub fn is_adjacent(&self, other: &Cell) -> bool {
        self.manhattan(other) == 1
    }

    /// Pixel position of the centre of this cell
    pub fn center(&self) -> PixelPos {
        PixelPos::new(
            self.x as f32 * GRID_SIZE + GRID_SIZE / 2.0,
            self.y as f32 * GRID_SIZE + GRID_SIZE / 2.0,
        )
    }

    /// Cells on the Bresenham line from `self` to `end`, both ends included,
    /// produced lazily
    pub fn line_iter(&self, end: Cell) -> CellLine {
        CellLine::new(*self, end)
    }

    /// All cells on the Bresenham line from `self` to `end`, both ends included
    pub fn line_to(&self, end: Cell) -> Vec<Cell> {
        self.line_iter(end).collect()
    }
}

/// Lazy Bresenham walk between two cells. Error terms are kept in `i64` so
/// lines spanning the whole coordinate space do not overflow.
#[derive(Debug, Clone)]
pub struct CellLine {
    x: i64,
    y: i64,
    end_x: i64,
    end_y: i64,
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    done: bool,
}

impl CellLine {
    fn new(start: Cell, end: Cell) -> Self {
        let (x0, y0) = (start.x as i64, start.y as i64);
        let (x1, y1) = (end.x as i64, end.y as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        Self {
            x: x0,
            y: y0,
            end_x: x1,
            end_y: y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }
}

impl Iterator for CellLine {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.done {
            return None;
        }

        // Every step stays between the two i32 endpoints
        let cell = Cell::new(self.x as i32, self.y as i32);
        if self.x == self.end_x && self.y == self.end_y {
            self.done = true;
            return Some(cell);
        }

        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(cell)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A continuous position in world pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPos {
    pub x: f32,
    pub y: f32,
}

impl PixelPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PixelPos) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// The cell containing this position
    pub fn cell(&self) -> Cell {
        Cell::new(
            (self.x / GRID_SIZE).floor() as i32,
            (self.y / GRID_SIZE).floor() as i32,
        )
    }

    /// Move toward `target` by at most `step`, landing exactly on it when the
    /// step would overshoot
    pub fn step_toward(&self, target: &PixelPos, step: f32) -> PixelPos {
        let dist = self.distance(target);
        if step >= dist || dist <= 0.0 {
            return *target;
        }
        PixelPos {
            x: self.x + (target.x - self.x) / dist * step,
            y: self.y + (target.y - self.y) / dist * step,
        }
    }
}

/// A unique, increasing truck identifier (the first truck is 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TruckId(pub u32);

impl fmt::Display for TruckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Truck {}", self.0)
    }
}

/// The resources tracked by the base pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Oil,
    Steel,
    Wood,
    Stone,
    /// Build materials
    Bmats,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Oil,
        ResourceKind::Steel,
        ResourceKind::Wood,
        ResourceKind::Stone,
        ResourceKind::Bmats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Oil => "oil",
            ResourceKind::Steel => "steel",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Bmats => "bmats",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of production building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacilityKind {
    /// Lumber camp, harvests nearby trees into wood
    Lumber,
    /// Quarry, harvests nearby stones into stone
    Quarry,
    /// Converts delivered stone into build materials
    Refinery,
}

impl FacilityKind {
    pub fn name(&self) -> &'static str {
        match self {
            FacilityKind::Lumber => "lumber",
            FacilityKind::Quarry => "quarry",
            FacilityKind::Refinery => "refinery",
        }
    }

    /// The resource a truck can pick up here
    pub fn output(&self) -> ResourceKind {
        match self {
            FacilityKind::Lumber => ResourceKind::Wood,
            FacilityKind::Quarry => ResourceKind::Stone,
            FacilityKind::Refinery => ResourceKind::Bmats,
        }
    }

    /// Map glyph used by the terminal renderer
    pub fn glyph(&self) -> char {
        match self {
            FacilityKind::Lumber => 'L',
            FacilityKind::Quarry => 'Q',
            FacilityKind::Refinery => 'R',
        }
    }
}

impl fmt::Display for FacilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
