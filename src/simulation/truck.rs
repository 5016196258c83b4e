//! Truck record and movement for the logistics simulation
//!
//! A truck follows its queue of cells at constant speed. What happens when
//! the queue runs out is decided by the world (see `logistics.rs`).

use std::collections::VecDeque;

use super::types::{Cell, PixelPos, ResourceKind, TruckId, ARRIVAL_EPSILON, GRID_SIZE};

/// Cells per second a truck travels
pub const TRUCK_SPEED_CELLS_PER_SEC: f32 = 1.2;

/// Maximum cargo a truck carries
pub const TRUCK_CAPACITY: f32 = 20.0;

/// Most a truck picks up in one stop
pub const LOAD_BATCH: f32 = 5.0;

/// Where a truck is in its trip lifecycle.
///
/// Loading and unloading happen inside arrival handling and never last a
/// tick, so they have no variant of their own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TruckState {
    Idle,
    ToSource,
    ToDest,
    /// Parked at a refinery until `target` bmats are ready. No timeout.
    WaitingForBmats { target: u32, waited_secs: f32 },
}

impl TruckState {
    pub fn label(&self) -> &'static str {
        match self {
            TruckState::Idle => "idle",
            TruckState::ToSource => "to_source",
            TruckState::ToDest => "to_dest",
            TruckState::WaitingForBmats { .. } => "waiting_for_bmats",
        }
    }
}

/// How arrival logic chains the legs of a trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripKind {
    /// Pick up at the source, drop off at the destination
    Haul,
    /// Stone to a refinery, wait for conversion, bring bmats back to base
    RefineryLoop,
}

/// The trip a truck was assigned, kept so repeat mode can requeue it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    pub source: Cell,
    pub dest: Cell,
    pub resource: ResourceKind,
    pub kind: TripKind,
}

/// Result of a truck movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruckUpdateResult {
    /// No path to follow
    Parked,
    /// Still travelling
    Moving,
    /// Reached the last cell of the path this tick
    Arrived,
    /// Waiting at a refinery
    Waiting,
}

/// A truck in the logistics simulation
#[derive(Debug, Clone)]
pub struct Truck {
    pub id: TruckId,
    pub position: PixelPos,
    pub current_cell: Cell,
    /// Remaining cells to traverse, head first
    pub path: VecDeque<Cell>,
    /// Pixels per second
    pub speed: f32,
    pub cargo_type: Option<ResourceKind>,
    pub cargo_amount: f32,
    pub cargo_capacity: f32,
    pub state: TruckState,
    pub repeat_enabled: bool,
    /// Saved trip parameters
    pub trip: Option<Trip>,
    /// Destination of the current leg
    pub dest_cell: Option<Cell>,
}

impl Truck {
    /// A new idle truck parked on the centre of `cell`
    pub fn new(id: TruckId, cell: Cell) -> Self {
        Self {
            id,
            position: cell.center(),
            current_cell: cell,
            path: VecDeque::new(),
            speed: GRID_SIZE * TRUCK_SPEED_CELLS_PER_SEC,
            cargo_type: None,
            cargo_amount: 0.0,
            cargo_capacity: TRUCK_CAPACITY,
            state: TruckState::Idle,
            repeat_enabled: false,
            trip: None,
            dest_cell: None,
        }
    }

    pub fn remaining_capacity(&self) -> f32 {
        (self.cargo_capacity - self.cargo_amount).max(0.0)
    }

    /// Put cargo on board, clamped to the remaining capacity.
    /// Returns the amount actually loaded.
    pub fn load(&mut self, resource: ResourceKind, amount: f32) -> f32 {
        let loaded = amount.clamp(0.0, self.remaining_capacity());
        self.cargo_type = Some(resource);
        self.cargo_amount += loaded;
        loaded
    }

    /// Empty the cargo hold, returning the whole units delivered.
    /// Any fractional remainder is lost.
    pub fn unload(&mut self) -> i64 {
        let delivered = self.cargo_amount.trunc() as i64;
        self.cargo_amount = 0.0;
        delivered
    }

    /// Start a new leg along `path`
    pub fn begin_leg(&mut self, path: Vec<Cell>, state: TruckState, dest: Cell) {
        self.path = path.into();
        self.state = state;
        self.dest_cell = Some(dest);
    }

    /// Stop and forget the current leg. Cargo stays on board.
    pub fn park(&mut self) {
        self.path.clear();
        self.state = TruckState::Idle;
        if self.cargo_amount <= 0.0 {
            self.cargo_type = None;
        }
        self.dest_cell = None;
    }

    /// Return to idle with no path, cargo or saved trip
    pub fn reset(&mut self) {
        self.path.clear();
        self.state = TruckState::Idle;
        self.cargo_type = None;
        self.cargo_amount = 0.0;
        self.trip = None;
        self.dest_cell = None;
    }

    pub fn is_idle(&self) -> bool {
        self.state == TruckState::Idle
    }

    /// Advance along the path by one tick
    pub fn update(&mut self, delta_secs: f32) -> TruckUpdateResult {
        if let TruckState::WaitingForBmats { waited_secs, .. } = &mut self.state {
            *waited_secs += delta_secs;
            return TruckUpdateResult::Waiting;
        }

        let next_cell = match self.path.front() {
            Some(cell) => *cell,
            None => return TruckUpdateResult::Parked,
        };

        let target = next_cell.center();
        if self.position.distance(&target) < ARRIVAL_EPSILON {
            self.position = target;
            self.current_cell = next_cell;
            self.path.pop_front();
            if self.path.is_empty() {
                return TruckUpdateResult::Arrived;
            }
            return TruckUpdateResult::Moving;
        }

        self.position = self
            .position
            .step_toward(&target, self.speed * delta_secs);
        TruckUpdateResult::Moving
    }
}
