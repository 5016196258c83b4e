//! Standalone logistics simulation module
//!
//! This module contains the whole simulation core: the road grid and
//! pathfinding, facility production, the truck state machine and the
//! assignment logic. Rendering and input live outside of it and talk to
//! `SimWorld` through its public commands and fields.

mod dispatch;
mod economy;
mod facility;
mod grid;
mod logistics;
mod truck;
mod types;
mod world;

// Re-export public types for external use
pub use dispatch::{AssignmentRequest, NEAR_BASE_DISTANCE};
pub use economy::{
    ResourcePool, TruckFactory, COST_ROAD, STARTING_BMATS, STARTING_TRUCKS, TRUCK_BASE_COST,
    TRUCK_COST_STEP,
};
pub use facility::{
    Facility, HARVEST_RADIUS, RATE_PER_NODE, REFINERY_CONVERSION_TIME, REFINERY_RATE,
};
pub use grid::{RoadGrid, NEAREST_ROAD_RADIUS};
pub use truck::{
    Trip, TripKind, Truck, TruckState, TruckUpdateResult, LOAD_BATCH, TRUCK_CAPACITY,
    TRUCK_SPEED_CELLS_PER_SEC,
};
pub use types::{
    Cell, CellLine, FacilityKind, PixelPos, ResourceKind, TruckId, ARRIVAL_EPSILON, GRID_SIZE,
};
pub use world::{SimWorld, BASE_EXCLUSION_MARGIN, BASE_SIZE, VIEW_CELLS_X, VIEW_CELLS_Y};
