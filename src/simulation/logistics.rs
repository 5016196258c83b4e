//! Arrival handling for trucks
//!
//! Movement lives on the truck itself; everything that touches the rest of
//! the world when a leg ends (loading, unloading, refinery waits, repeat
//! trips) happens here.

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::truck::{Trip, TripKind, Truck, TruckState, TruckUpdateResult, LOAD_BATCH};
use super::types::{FacilityKind, ResourceKind, TruckId};
use super::world::SimWorld;

impl SimWorld {
    /// Move every truck one step and resolve arrivals
    pub(super) fn update_trucks(&mut self, delta_secs: f32) {
        // Collect truck IDs to avoid borrow issues
        let truck_ids: Vec<TruckId> = self.trucks.keys().copied().collect();

        for truck_id in truck_ids {
            let Some(mut truck) = self.trucks.remove(&truck_id) else {
                continue;
            };

            match truck.update(delta_secs) {
                TruckUpdateResult::Arrived => self.handle_arrival(&mut truck),
                TruckUpdateResult::Waiting => self.poll_refinery(&mut truck),
                TruckUpdateResult::Moving | TruckUpdateResult::Parked => {}
            }

            self.trucks.insert(truck_id, truck);
        }
    }

    fn handle_arrival(&mut self, truck: &mut Truck) {
        match truck.state {
            TruckState::ToSource => self.arrive_at_source(truck),
            TruckState::ToDest => self.arrive_at_dest(truck),
            TruckState::Idle | TruckState::WaitingForBmats { .. } => {}
        }
    }

    fn arrive_at_source(&mut self, truck: &mut Truck) {
        let Some(trip) = truck.trip else {
            truck.park();
            return;
        };

        if truck.current_cell != trip.source {
            debug!("{} stopped at {} short of its source", truck.id, truck.current_cell);
            return;
        }

        let loaded = match self.load_cargo(truck, &trip) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!("{} cannot load: {:#}", truck.id, err);
                truck.park();
                return;
            }
        };

        if trip.kind == TripKind::RefineryLoop && trip.source == self.base_cell && loaded <= 0.0 {
            info!("{} found no stone at the base for the refinery", truck.id);
            truck.park();
            return;
        }

        match self.route_to(truck.current_cell, trip.dest) {
            Ok(path) => {
                debug!("{} heading to {} with {:.1} {}", truck.id, trip.dest, truck.cargo_amount, trip.resource);
                truck.begin_leg(path, TruckState::ToDest, trip.dest);
            }
            Err(err) => {
                warn!("{} cannot reach destination {}: {:#}", truck.id, trip.dest, err);
                truck.park();
            }
        }
    }

    /// Pick up one batch from the trip's source, returning the amount loaded
    fn load_cargo(&mut self, truck: &mut Truck, trip: &Trip) -> Result<f32> {
        let wanted = LOAD_BATCH.min(truck.remaining_capacity());

        let loaded = if trip.source == self.base_cell {
            let taken = self.resources.withdraw(trip.resource, wanted.floor() as i64);
            truck.load(trip.resource, taken as f32)
        } else {
            let facility = self
                .facilities
                .get_mut(&trip.source)
                .context("source facility no longer exists")?;
            let amount = wanted.min(facility.available_for_pickup(trip.resource));
            let taken = facility.withdraw(trip.resource, amount);
            truck.load(trip.resource, taken)
        };

        if loaded > 0.0 {
            info!("{} loaded {:.1} {} at {}", truck.id, loaded, trip.resource, trip.source);
        }
        Ok(loaded)
    }

    fn arrive_at_dest(&mut self, truck: &mut Truck) {
        let Some(dest) = truck.dest_cell else {
            truck.park();
            return;
        };

        if truck.current_cell != dest {
            debug!("{} stopped at {} short of its destination", truck.id, truck.current_cell);
            return;
        }

        if dest != self.base_cell {
            let Some(facility) = self.facilities.get_mut(&dest) else {
                warn!("{} arrived at {} but the facility is gone", truck.id, dest);
                truck.park();
                return;
            };

            if facility.kind == FacilityKind::Refinery
                && truck.cargo_type == Some(ResourceKind::Stone)
                && truck.cargo_amount > 0.0
            {
                let delivered = truck.unload();
                facility.deposit(ResourceKind::Stone, delivered as f32);
                info!("{} delivered {} stone to refinery {}", truck.id, delivered, dest);

                if delivered > 0 {
                    truck.path.clear();
                    truck.state = TruckState::WaitingForBmats {
                        target: delivered as u32,
                        waited_secs: 0.0,
                    };
                    return;
                }
            }
        }

        // Facilities do not stockpile incoming goods; whatever is still on
        // board goes to the base pool.
        self.deliver_to_base(truck);
        self.finish_trip(truck);
    }

    fn deliver_to_base(&mut self, truck: &mut Truck) {
        let Some(kind) = truck.cargo_type else {
            return;
        };
        if truck.cargo_amount <= 0.0 {
            return;
        }

        let delivered = truck.unload();
        self.resources.earn(kind, delivered);
        self.deliveries_completed += 1;
        info!("{} delivered {} {} to base", truck.id, delivered, kind);
    }

    /// Requeue the saved trip in repeat mode, otherwise park
    fn finish_trip(&mut self, truck: &mut Truck) {
        if truck.repeat_enabled {
            if let Some(trip) = truck.trip {
                match self.route_to(truck.current_cell, trip.source) {
                    Ok(path) => {
                        debug!("{} repeating trip back to {}", truck.id, trip.source);
                        truck.cargo_type = Some(trip.resource);
                        truck.begin_leg(path, TruckState::ToSource, trip.source);
                        return;
                    }
                    Err(err) => warn!("{} cannot repeat trip: {:#}", truck.id, err),
                }
            }
        }

        truck.park();
    }

    /// Check whether the refinery a truck waits at has produced enough bmats
    fn poll_refinery(&mut self, truck: &mut Truck) {
        let TruckState::WaitingForBmats { target, waited_secs } = truck.state else {
            return;
        };
        let Some(refinery_cell) = truck.dest_cell else {
            truck.park();
            return;
        };
        let Some(refinery) = self.facilities.get_mut(&refinery_cell) else {
            warn!("{} was waiting at {} but the refinery is gone", truck.id, refinery_cell);
            truck.park();
            return;
        };

        let wanted = target as f32;
        if refinery.stored(ResourceKind::Bmats) < wanted {
            return;
        }

        let collected = refinery.withdraw(ResourceKind::Bmats, wanted);
        truck.load(ResourceKind::Bmats, collected);
        info!(
            "{} collected {} bmats from refinery {} after {:.1}s",
            truck.id, collected, refinery_cell, waited_secs
        );

        let base = self.base_cell;
        match self.route_to(truck.current_cell, base) {
            Ok(path) => truck.begin_leg(path, TruckState::ToDest, base),
            Err(err) => {
                warn!("{} cannot return bmats to base: {:#}", truck.id, err);
                truck.park();
            }
        }
    }
}
