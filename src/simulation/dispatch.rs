//! Truck assignment for the logistics simulation
//!
//! Turns a player's (truck, source, destination, resource) request into the
//! truck's first leg. Every endpoint is projected onto the road network and
//! joined with shortest paths; a failure anywhere aborts the whole request
//! and leaves the truck as it was.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};

use super::grid::NEAREST_ROAD_RADIUS;
use super::truck::{Trip, TripKind, TruckState};
use super::types::{Cell, FacilityKind, ResourceKind, TruckId};
use super::world::SimWorld;

/// Manhattan distance from the base under which a source counts as "at the base"
pub const NEAR_BASE_DISTANCE: u32 = 3;

/// A player-initiated trip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignmentRequest {
    pub truck_id: TruckId,
    pub source: Cell,
    pub dest: Cell,
    pub resource: ResourceKind,
}

/// First leg computed for an accepted request
#[derive(Debug, Clone)]
struct AssignmentPlan {
    trip: Trip,
    path: Vec<Cell>,
}

impl SimWorld {
    /// Dispatch a truck on a trip.
    ///
    /// Returns false when the request was aborted (unknown truck, invalid
    /// endpoints, or no road path); the reason is logged and the truck is
    /// left untouched.
    pub fn start_assignment(&mut self, request: AssignmentRequest) -> bool {
        let plan = match self.plan_assignment(&request) {
            Ok(plan) => plan,
            Err(err) => {
                warn!("Assignment for {} aborted: {:#}", request.truck_id, err);
                return false;
            }
        };

        let Some(truck) = self.trucks.get_mut(&request.truck_id) else {
            return false;
        };

        info!(
            "{} assigned: {} {} from {} to {} ({} cells)",
            truck.id,
            plan.trip.resource,
            match plan.trip.kind {
                TripKind::Haul => "haul",
                TripKind::RefineryLoop => "refinery loop",
            },
            plan.trip.source,
            plan.trip.dest,
            plan.path.len()
        );

        truck.trip = Some(plan.trip);
        truck.cargo_type = Some(plan.trip.resource);
        truck.begin_leg(plan.path, TruckState::ToSource, plan.trip.source);
        true
    }

    fn plan_assignment(&mut self, request: &AssignmentRequest) -> Result<AssignmentPlan> {
        let source = self.normalize_endpoint(request.source);
        let dest = self.normalize_endpoint(request.dest);

        let truck = self
            .trucks
            .get(&request.truck_id)
            .context("unknown truck")?;
        if truck.cargo_amount > 0.0 && truck.cargo_type != Some(request.resource) {
            bail!("truck already carries another cargo");
        }
        let truck_cell = truck.position.cell();

        if source == dest {
            bail!("source and destination are the same cell {}", source);
        }
        self.check_endpoint(source).context("invalid source")?;
        self.check_endpoint(dest).context("invalid destination")?;

        let start = self.project_onto_roads(truck_cell).context("truck is off the road network")?;
        let source_road = self.project_onto_roads(source).context("source has no road nearby")?;
        let dest_road = self.project_onto_roads(dest).context("destination has no road nearby")?;
        debug!(
            "{}: start={}, source_road={}, dest_road={}",
            request.truck_id, start, source_road, dest_road
        );

        let kind = match self.facility_at(dest) {
            Some(facility)
                if facility.kind == FacilityKind::Refinery
                    && request.resource == ResourceKind::Stone =>
            {
                TripKind::RefineryLoop
            }
            _ => TripKind::Haul,
        };

        // A source next to the base whose road is also the destination's road
        // gives no usable leg on its own, so the trip detours through the
        // base's road cell.
        let mut waypoints = vec![start];
        if source.manhattan(&self.base_cell) <= NEAR_BASE_DISTANCE && source_road == dest_road {
            let base_road = self
                .project_onto_roads(self.base_cell)
                .context("base has no road nearby")?;
            if base_road == source_road {
                bail!("no alternative route around shared road {}", source_road);
            }
            waypoints.push(base_road);
        }
        waypoints.push(source_road);

        let mut path = self.path_through(&waypoints)?;
        if path.last() != Some(&source) {
            path.push(source);
        }

        Ok(AssignmentPlan {
            trip: Trip {
                source,
                dest,
                resource: request.resource,
                kind,
            },
            path,
        })
    }

    /// Only the base and existing facilities can be trip endpoints
    fn check_endpoint(&self, cell: Cell) -> Result<()> {
        if cell == self.base_cell || self.facilities.contains_key(&cell) {
            Ok(())
        } else {
            bail!("no base or facility at {}", cell)
        }
    }

    pub(super) fn project_onto_roads(&self, cell: Cell) -> Result<Cell> {
        self.grid
            .nearest_road(cell, NEAREST_ROAD_RADIUS)
            .with_context(|| format!("no driveable cell within {} of {}", NEAREST_ROAD_RADIUS, cell))
    }

    /// Shortest paths joined end to end through each waypoint
    fn path_through(&mut self, waypoints: &[Cell]) -> Result<Vec<Cell>> {
        let mut path: Vec<Cell> = Vec::new();
        for pair in waypoints.windows(2) {
            let leg = self.grid.shortest_path(pair[0], pair[1]);
            if leg.is_empty() {
                bail!("no road path from {} to {}", pair[0], pair[1]);
            }
            let skip = usize::from(path.last() == leg.first());
            path.extend(leg.into_iter().skip(skip));
        }
        if path.is_empty() {
            if let Some(only) = waypoints.first() {
                path.push(*only);
            }
        }
        Ok(path)
    }

    /// Route for a follow-up leg: from the truck's cell onto the roads, along
    /// them, and into `target` itself
    pub(super) fn route_to(&mut self, from: Cell, target: Cell) -> Result<Vec<Cell>> {
        let start = self.project_onto_roads(from).unwrap_or(from);
        let goal = self.project_onto_roads(target)?;
        let mut path = self.path_through(&[start, goal])?;
        if path.last() != Some(&target) {
            path.push(target);
        }
        Ok(path)
    }
}
