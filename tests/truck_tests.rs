//! Truck movement, assignment and trip lifecycle tests

use haul_sim::simulation::{
    AssignmentRequest, Cell, FacilityKind, ResourceKind, SimWorld, TripKind, Truck, TruckId,
    TruckState, TruckUpdateResult, GRID_SIZE, TRUCK_CAPACITY, TRUCK_SPEED_CELLS_PER_SEC,
};

const DT: f32 = 0.1;
const MAX_TICKS: u32 = 5_000;

fn trees_around(center: Cell, count: usize) -> Vec<Cell> {
    let mut cells = Vec::new();
    for dy in [1, -1, 2, -2] {
        for dx in -4..=4 {
            if dx * dx + dy * dy <= 25 {
                cells.push(Cell::new(center.x + dx, center.y + dy));
            }
        }
    }
    cells.truncate(count);
    cells
}

/// Base at the origin, road east along row 0 and a lumber camp with 20 trees at (8, 0)
fn lumber_world() -> (SimWorld, Cell) {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let camp = Cell::new(8, 0);
    for tree in trees_around(camp, 20) {
        assert!(world.add_tree(tree));
    }
    assert_eq!(world.place_road_line(Cell::new(2, 0), Cell::new(7, 0)), 6);
    assert!(world.place_facility(FacilityKind::Lumber, camp));
    (world, camp)
}

/// Base at the origin with a refinery at (6, 0) and 10 stone in the pool
fn refinery_world() -> (SimWorld, Cell) {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let refinery = Cell::new(6, 0);
    assert_eq!(world.place_road_line(Cell::new(2, 0), Cell::new(5, 0)), 4);
    assert!(world.place_facility(FacilityKind::Refinery, refinery));
    world.resources.earn(ResourceKind::Stone, 10);
    (world, refinery)
}

fn request(truck: u32, source: Cell, dest: Cell, resource: ResourceKind) -> AssignmentRequest {
    AssignmentRequest {
        truck_id: TruckId(truck),
        source,
        dest,
        resource,
    }
}

fn truck(world: &SimWorld, id: u32) -> &Truck {
    world.truck(TruckId(id)).expect("truck exists")
}

fn assert_cargo_bounded(world: &SimWorld) {
    for truck in world.trucks.values() {
        assert!(truck.cargo_amount >= 0.0, "{} has negative cargo", truck.id);
        assert!(
            truck.cargo_amount <= truck.cargo_capacity,
            "{} over capacity: {}",
            truck.id,
            truck.cargo_amount
        );
    }
}

/// Tick until truck `id` is idle again, returning the ticks taken
fn run_until_idle(world: &mut SimWorld, id: u32) -> u32 {
    for tick in 1..=MAX_TICKS {
        world.tick(DT);
        assert_cargo_bounded(world);
        if truck(world, id).is_idle() {
            return tick;
        }
    }
    panic!("truck {} never went idle", id);
}

#[test]
fn test_new_truck_is_idle_at_base() {
    let world = SimWorld::new(Cell::new(4, 4));
    assert_eq!(world.trucks.len(), 2);
    for truck in world.trucks.values() {
        assert!(truck.is_idle());
        assert_eq!(truck.current_cell, Cell::new(4, 4));
        assert_eq!(truck.cargo_amount, 0.0);
        assert_eq!(truck.cargo_capacity, TRUCK_CAPACITY);
        assert!(!truck.repeat_enabled);
    }
    assert!(world.is_truck_at_base(TruckId(1)));
}

#[test]
fn test_truck_moves_at_constant_speed() {
    let mut truck = Truck::new(TruckId(1), Cell::new(0, 0));
    truck.begin_leg(
        vec![Cell::new(0, 0), Cell::new(1, 0)],
        TruckState::ToSource,
        Cell::new(1, 0),
    );

    // The first cell is where the truck already stands
    assert_eq!(truck.update(DT), TruckUpdateResult::Moving);
    assert_eq!(truck.path.len(), 1);

    let start_x = truck.position.x;
    assert_eq!(truck.update(DT), TruckUpdateResult::Moving);
    let expected = GRID_SIZE * TRUCK_SPEED_CELLS_PER_SEC * DT;
    assert!((truck.position.x - start_x - expected).abs() < 1e-3);

    let mut arrived = false;
    for _ in 0..100 {
        if truck.update(DT) == TruckUpdateResult::Arrived {
            arrived = true;
            break;
        }
    }
    assert!(arrived);
    assert_eq!(truck.current_cell, Cell::new(1, 0));
    assert_eq!(truck.position, Cell::new(1, 0).center());
    assert!(truck.path.is_empty());
}

#[test]
fn test_truck_never_overshoots() {
    let mut truck = Truck::new(TruckId(1), Cell::new(0, 0));
    truck.begin_leg(vec![Cell::new(1, 0)], TruckState::ToDest, Cell::new(1, 0));

    // One huge step lands exactly on the centre, the next one pops the cell
    assert_eq!(truck.update(10.0), TruckUpdateResult::Moving);
    assert_eq!(truck.position, Cell::new(1, 0).center());
    assert_eq!(truck.update(10.0), TruckUpdateResult::Arrived);
}

#[test]
fn test_idle_truck_stays_parked() {
    let mut truck = Truck::new(TruckId(1), Cell::new(2, 2));
    assert_eq!(truck.update(DT), TruckUpdateResult::Parked);
    assert_eq!(truck.position, Cell::new(2, 2).center());
}

#[test]
fn test_load_clamps_to_capacity() {
    let mut truck = Truck::new(TruckId(1), Cell::new(0, 0));
    assert_eq!(truck.load(ResourceKind::Wood, 15.0), 15.0);
    assert_eq!(truck.load(ResourceKind::Wood, 15.0), 5.0);
    assert_eq!(truck.cargo_amount, TRUCK_CAPACITY);
    assert_eq!(truck.remaining_capacity(), 0.0);
    assert_eq!(truck.unload(), 20);
    assert_eq!(truck.cargo_amount, 0.0);
}

#[test]
fn test_haul_wood_from_camp_to_base() {
    let (mut world, camp) = lumber_world();
    let base = world.base_cell;

    for _ in 0..100 {
        world.tick(DT);
    }
    let stored = world.facility_at(camp).unwrap().stored(ResourceKind::Wood);
    assert!((stored - 40.0).abs() < 0.01);

    assert!(world.start_assignment(request(1, camp, base, ResourceKind::Wood)));
    let assigned = truck(&world, 1);
    assert_eq!(assigned.state, TruckState::ToSource);
    assert_eq!(assigned.path.back(), Some(&camp));

    let mut saw_to_dest = false;
    for _ in 0..MAX_TICKS {
        world.tick(DT);
        assert_cargo_bounded(&world);
        let hauler = truck(&world, 1);
        if hauler.state == TruckState::ToDest {
            saw_to_dest = true;
            assert_eq!(hauler.cargo_type, Some(ResourceKind::Wood));
            assert_eq!(hauler.cargo_amount, 5.0);
            assert!(world.is_going_to_base(TruckId(1)));
        }
        if hauler.is_idle() {
            break;
        }
    }

    assert!(saw_to_dest);
    let hauler = truck(&world, 1);
    assert!(hauler.is_idle());
    assert_eq!(hauler.cargo_amount, 0.0);
    assert_eq!(hauler.cargo_type, None);
    assert_eq!(hauler.current_cell, base);
    assert_eq!(world.resources.get(ResourceKind::Wood), 5);
    assert_eq!(world.deliveries_completed, 1);
    // The other truck never moved
    assert!(truck(&world, 2).is_idle());
}

#[test]
fn test_repeat_mode_keeps_hauling() {
    let (mut world, camp) = lumber_world();
    let base = world.base_cell;

    assert_eq!(world.toggle_repeat(TruckId(1)), Some(true));
    assert!(world.start_assignment(request(1, camp, base, ResourceKind::Wood)));

    let mut ticks = 0;
    while world.deliveries_completed < 2 {
        world.tick(DT);
        assert_cargo_bounded(&world);
        assert!(!truck(&world, 1).is_idle(), "repeating truck went idle");
        ticks += 1;
        assert!(ticks < MAX_TICKS, "second delivery never happened");
    }

    let hauler = truck(&world, 1);
    assert_eq!(hauler.state, TruckState::ToSource);
    assert_eq!(hauler.dest_cell, Some(camp));
    assert_eq!(world.resources.get(ResourceKind::Wood), 10);

    // Turning repeat off lets the current trip finish and then stops
    assert_eq!(world.toggle_repeat(TruckId(1)), Some(false));
    run_until_idle(&mut world, 1);
    assert_eq!(world.resources.get(ResourceKind::Wood), 15);
}

#[test]
fn test_refinery_loop_returns_bmats() {
    let (mut world, refinery) = refinery_world();
    let base = world.base_cell;
    let bmats_before = world.resources.get(ResourceKind::Bmats);

    assert!(world.start_assignment(request(1, base, refinery, ResourceKind::Stone)));

    let mut saw_waiting = false;
    for _ in 0..MAX_TICKS {
        world.tick(DT);
        assert_cargo_bounded(&world);
        if let TruckState::WaitingForBmats { target, .. } = truck(&world, 1).state {
            saw_waiting = true;
            assert_eq!(target, 5);
            assert_eq!(truck(&world, 1).current_cell, refinery);
        }
        if truck(&world, 1).is_idle() {
            break;
        }
    }

    assert!(saw_waiting);
    assert!(truck(&world, 1).is_idle());
    assert_eq!(world.resources.get(ResourceKind::Stone), 5);
    assert_eq!(world.resources.get(ResourceKind::Bmats), bmats_before + 5);
    let facility = world.facility_at(refinery).unwrap();
    assert_eq!(facility.stored(ResourceKind::Stone), 0.0);
    assert_eq!(facility.stored(ResourceKind::Bmats), 0.0);
}

#[test]
fn test_waiting_truck_has_no_timeout_and_can_be_reset() {
    let (mut world, refinery) = refinery_world();
    let base = world.base_cell;
    assert!(world.start_assignment(request(1, base, refinery, ResourceKind::Stone)));

    let mut ticks = 0;
    while !matches!(truck(&world, 1).state, TruckState::WaitingForBmats { .. }) {
        world.tick(DT);
        ticks += 1;
        assert!(ticks < MAX_TICKS, "truck never reached the refinery");
    }

    // Cut the refinery off so it stops converting
    assert!(world.remove_road(Cell::new(3, 0)));
    for _ in 0..600 {
        world.tick(DT);
    }

    match truck(&world, 1).state {
        TruckState::WaitingForBmats { waited_secs, .. } => assert!(waited_secs > 59.0),
        other => panic!("expected the truck to keep waiting, got {:?}", other),
    }

    assert!(world.reset_truck(TruckId(1)));
    let reset = truck(&world, 1);
    assert!(reset.is_idle());
    assert!(reset.path.is_empty());
    assert!(reset.trip.is_none());
    assert_eq!(reset.cargo_amount, 0.0);

    world.tick(DT);
    assert!(truck(&world, 1).is_idle());
}

#[test]
fn test_refinery_loop_without_stone_goes_idle() {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let refinery = Cell::new(6, 0);
    world.place_road_line(Cell::new(2, 0), Cell::new(5, 0));
    world.place_facility(FacilityKind::Refinery, refinery);
    let base = world.base_cell;

    assert!(world.start_assignment(request(1, base, refinery, ResourceKind::Stone)));
    run_until_idle(&mut world, 1);

    let parked = truck(&world, 1);
    assert_eq!(parked.current_cell, base);
    assert_eq!(parked.cargo_amount, 0.0);
    assert_eq!(world.facility_at(refinery).unwrap().stored(ResourceKind::Stone), 0.0);
}

#[test]
fn test_empty_pickup_still_finishes_trip() {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let camp = Cell::new(4, 0);
    world.place_road_line(Cell::new(2, 0), Cell::new(3, 0));
    assert!(world.place_facility(FacilityKind::Lumber, camp));
    let base = world.base_cell;

    assert!(world.start_assignment(request(1, camp, base, ResourceKind::Wood)));

    let mut saw_to_dest = false;
    for _ in 0..MAX_TICKS {
        world.tick(DT);
        if truck(&world, 1).state == TruckState::ToDest {
            saw_to_dest = true;
        }
        if truck(&world, 1).is_idle() {
            break;
        }
    }

    assert!(saw_to_dest, "truck should head for the base even with nothing loaded");
    assert!(truck(&world, 1).is_idle());
    assert_eq!(truck(&world, 1).current_cell, base);
    assert_eq!(world.resources.get(ResourceKind::Wood), 0);
    assert_eq!(world.deliveries_completed, 0);
}

#[test]
fn test_unreachable_assignment_leaves_truck_untouched() {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let camp = Cell::new(10, 10);
    assert!(world.place_facility(FacilityKind::Lumber, camp));
    let base = world.base_cell;

    assert!(!world.start_assignment(request(1, camp, base, ResourceKind::Wood)));

    let untouched = truck(&world, 1);
    assert!(untouched.is_idle());
    assert!(untouched.path.is_empty());
    assert!(untouched.trip.is_none());
    assert_eq!(untouched.cargo_type, None);
}

#[test]
fn test_invalid_assignments_are_rejected() {
    let (mut world, camp) = lumber_world();
    let base = world.base_cell;

    // Unknown truck
    assert!(!world.start_assignment(request(9, camp, base, ResourceKind::Wood)));
    // Empty cell as source
    assert!(!world.start_assignment(request(1, Cell::new(5, 5), base, ResourceKind::Wood)));
    // Source and destination collapse to the same base
    assert!(!world.start_assignment(request(1, Cell::new(1, 1), base, ResourceKind::Wood)));

    assert!(truck(&world, 1).is_idle());
    assert!(truck(&world, 1).trip.is_none());
}

#[test]
fn test_base_footprint_cell_stands_for_base() {
    let (mut world, camp) = lumber_world();
    assert!(world.start_assignment(request(1, camp, Cell::new(1, 1), ResourceKind::Wood)));
    let trip = truck(&world, 1).trip.expect("trip saved");
    assert_eq!(trip.dest, world.base_cell);
    assert_eq!(trip.source, camp);
}

#[test]
fn test_truck_with_other_cargo_is_rejected() {
    let (mut world, camp) = lumber_world();
    let base = world.base_cell;
    world
        .trucks
        .get_mut(&TruckId(1))
        .unwrap()
        .load(ResourceKind::Stone, 3.0);

    assert!(!world.start_assignment(request(1, camp, base, ResourceKind::Wood)));
    assert_eq!(truck(&world, 1).cargo_type, Some(ResourceKind::Stone));
}

#[test]
fn test_source_removed_en_route() {
    let (mut world, camp) = lumber_world();
    let base = world.base_cell;
    assert!(world.start_assignment(request(1, camp, base, ResourceKind::Wood)));

    for _ in 0..20 {
        world.tick(DT);
    }
    assert!(world.remove_facility(camp).is_some());

    run_until_idle(&mut world, 1);
    let parked = truck(&world, 1);
    assert_eq!(parked.cargo_amount, 0.0);
    assert_eq!(world.resources.get(ResourceKind::Wood), 0);
}

#[test]
fn test_destination_removed_en_route_keeps_cargo() {
    let (mut world, camp) = lumber_world();
    let refinery = Cell::new(11, 0);
    assert_eq!(world.place_road_line(Cell::new(9, 0), Cell::new(10, 0)), 2);
    assert!(world.place_facility(FacilityKind::Refinery, refinery));

    for _ in 0..20 {
        world.tick(DT);
    }
    assert!(world.start_assignment(request(1, camp, refinery, ResourceKind::Wood)));

    let mut ticks = 0;
    while truck(&world, 1).state != TruckState::ToDest {
        world.tick(DT);
        ticks += 1;
        assert!(ticks < MAX_TICKS, "truck never loaded");
    }
    assert!(world.remove_facility(refinery).is_some());

    run_until_idle(&mut world, 1);
    let parked = truck(&world, 1);
    assert_eq!(parked.cargo_type, Some(ResourceKind::Wood));
    assert_eq!(parked.cargo_amount, 5.0);
}

#[test]
fn test_non_stone_cargo_at_refinery_goes_to_pool() {
    let (mut world, camp) = lumber_world();
    let refinery = Cell::new(11, 0);
    assert_eq!(world.place_road_line(Cell::new(9, 0), Cell::new(10, 0)), 2);
    assert!(world.place_facility(FacilityKind::Refinery, refinery));

    for _ in 0..20 {
        world.tick(DT);
    }
    assert!(world.start_assignment(request(1, camp, refinery, ResourceKind::Wood)));
    run_until_idle(&mut world, 1);

    assert_eq!(truck(&world, 1).current_cell, refinery);
    assert_eq!(world.resources.get(ResourceKind::Wood), 5);
    assert_eq!(world.facility_at(refinery).unwrap().stored(ResourceKind::Wood), 0.0);
}

#[test]
fn test_source_next_to_base_sharing_a_road_detours_via_base() {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let source = Cell::new(3, 0);
    let dest = Cell::new(3, -1);
    assert!(world.place_road(Cell::new(2, 0)));
    assert!(world.place_facility(FacilityKind::Lumber, source));
    assert!(world.place_facility(FacilityKind::Lumber, dest));

    // Take both facilities off the network so they share the road at (2, 0)
    world.grid.mark_driveable(source, false);
    world.grid.mark_driveable(dest, false);

    assert!(world.start_assignment(request(1, source, dest, ResourceKind::Wood)));
    let routed = truck(&world, 1);
    assert_eq!(routed.path.back(), Some(&source));
    assert!(routed.path.contains(&world.base_cell));
    assert!(routed.path.contains(&Cell::new(2, 0)));
}

/// Record the bmats target each time truck `id` starts waiting at a refinery
fn run_recording_waits(world: &mut SimWorld, id: u32) -> Vec<u32> {
    let mut waits = Vec::new();
    let mut was_waiting = false;
    for _ in 0..MAX_TICKS {
        world.tick(DT);
        assert_cargo_bounded(world);
        match truck(world, id).state {
            TruckState::WaitingForBmats { target, .. } => {
                if !was_waiting {
                    waits.push(target);
                }
                was_waiting = true;
            }
            TruckState::Idle => return waits,
            _ => was_waiting = false,
        }
    }
    panic!("truck {} never went idle", id);
}

#[test]
fn test_quarry_to_refinery_loop_brings_bmats_home() {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let quarry = Cell::new(8, 0);
    let refinery = Cell::new(4, 1);
    for x in 6..=10 {
        assert!(world.add_stone(Cell::new(x, 2)));
        assert!(world.add_stone(Cell::new(x, -2)));
    }
    assert_eq!(world.place_road_line(Cell::new(2, 0), Cell::new(7, 0)), 6);
    assert!(world.place_facility(FacilityKind::Quarry, quarry));
    assert!(world.place_facility(FacilityKind::Refinery, refinery));
    assert_eq!(world.resources.get(ResourceKind::Bmats), 4);

    assert!(world.start_assignment(request(1, quarry, refinery, ResourceKind::Stone)));
    let trip = truck(&world, 1).trip.expect("trip saved");
    assert_eq!(trip.kind, TripKind::RefineryLoop);
    assert_eq!(trip.source, quarry);

    let waits = run_recording_waits(&mut world, 1);
    assert_eq!(waits, vec![5]);

    let hauler = truck(&world, 1);
    assert_eq!(hauler.current_cell, world.base_cell);
    assert_eq!(hauler.cargo_amount, 0.0);
    assert_eq!(world.resources.get(ResourceKind::Bmats), 9);
    assert_eq!(world.resources.get(ResourceKind::Stone), 0);
    assert_eq!(world.deliveries_completed, 1);
    assert_eq!(world.facility_at(refinery).unwrap().stored(ResourceKind::Bmats), 0.0);
}

#[test]
fn test_repeating_refinery_loop_stops_when_base_stone_runs_out() {
    let (mut world, refinery) = refinery_world();
    let base = world.base_cell;
    world.resources.earn(ResourceKind::Stone, 2);
    assert_eq!(world.resources.get(ResourceKind::Bmats), 6);

    assert_eq!(world.toggle_repeat(TruckId(1)), Some(true));
    assert!(world.start_assignment(request(1, base, refinery, ResourceKind::Stone)));

    // 12 stone leave the base as loads of 5, 5 and 2, then the empty
    // pickup parks the truck
    let waits = run_recording_waits(&mut world, 1);
    assert_eq!(waits, vec![5, 5, 2]);

    let parked = truck(&world, 1);
    assert_eq!(parked.current_cell, base);
    assert_eq!(parked.cargo_amount, 0.0);
    assert_eq!(parked.cargo_type, None);
    assert!(parked.repeat_enabled);
    assert_eq!(world.resources.get(ResourceKind::Stone), 0);
    assert_eq!(world.resources.get(ResourceKind::Bmats), 18);
    assert_eq!(world.deliveries_completed, 3);
}

#[test]
fn test_shared_road_at_base_rejects_assignment() {
    let mut world = SimWorld::new(Cell::new(0, 0));
    let source = Cell::new(-2, 0);
    let dest = Cell::new(0, -2);
    assert!(world.place_facility(FacilityKind::Lumber, source));
    assert!(world.place_facility(FacilityKind::Lumber, dest));

    // With no roads, both facilities project onto the base cell itself
    world.grid.mark_driveable(source, false);
    world.grid.mark_driveable(dest, false);

    assert!(!world.start_assignment(request(1, source, dest, ResourceKind::Wood)));

    let untouched = truck(&world, 1);
    assert!(untouched.is_idle());
    assert!(untouched.path.is_empty());
    assert!(untouched.trip.is_none());
    assert_eq!(untouched.cargo_type, None);
    assert_eq!(untouched.dest_cell, None);
    assert_eq!(untouched.current_cell, world.base_cell);
}
