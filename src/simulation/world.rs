//! Main simulation world that ties everything together
//!
//! `SimWorld` owns the road grid, the facilities, the trucks and the base's
//! resource pool. Player commands mutate it synchronously; `tick` advances
//! production and every truck by one fixed step.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use super::dispatch::AssignmentRequest;
use super::economy::{ResourcePool, TruckFactory, COST_ROAD, STARTING_TRUCKS};
use super::facility::{Facility, HARVEST_RADIUS};
use super::grid::RoadGrid;
use super::truck::{Truck, TruckState};
use super::types::{Cell, FacilityKind, ResourceKind, TruckId};

/// Side length of the square base footprint
pub const BASE_SIZE: i32 = 2;

/// Cells around the base footprint where nothing may be built
pub const BASE_EXCLUSION_MARGIN: i32 = 1;

/// Size of the starting view, in cells, used for base placement and scatter
pub const VIEW_CELLS_X: i32 = 32;
pub const VIEW_CELLS_Y: i32 = 24;

/// The main simulation world
#[derive(Debug)]
pub struct SimWorld {
    /// Roads, driveability and resource nodes
    pub grid: RoadGrid,

    /// Facilities keyed by anchor cell
    pub facilities: BTreeMap<Cell, Facility>,

    /// All trucks
    pub trucks: BTreeMap<TruckId, Truck>,

    /// Resource pool held at the base
    pub resources: ResourcePool,

    /// Truck purchase pricing
    pub truck_factory: TruckFactory,

    /// Anchor (top-left) cell of the 2x2 base
    pub base_cell: Cell,

    /// Next truck ID to assign
    next_truck_id: u32,

    /// Simulation time
    pub time: f32,

    /// Loads delivered into the base pool
    pub deliveries_completed: u32,

    /// Optional seeded RNG for reproducible scatter
    rng: Option<StdRng>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(Cell::default())
    }
}

impl SimWorld {
    fn new_internal(base_cell: Cell, rng: Option<StdRng>) -> Self {
        let mut world = Self {
            grid: RoadGrid::new(),
            facilities: BTreeMap::new(),
            trucks: BTreeMap::new(),
            resources: ResourcePool::new(),
            truck_factory: TruckFactory::new(),
            base_cell,
            next_truck_id: 1,
            time: 0.0,
            deliveries_completed: 0,
            rng,
        };

        for cell in world.base_cells() {
            world.grid.mark_driveable(cell, true);
        }

        for _ in 0..STARTING_TRUCKS {
            world.spawn_truck_at_base();
            world.truck_factory.record_build();
        }

        world
    }

    /// Create an empty world (no trees or stones) with the base at `base_cell`
    pub fn new(base_cell: Cell) -> Self {
        Self::new_internal(base_cell, None)
    }

    /// Create a world with a random base position and scattered resources,
    /// reproducible from `seed`
    pub fn new_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let base_cell = Cell::new(
            rng.random_range(2..=(VIEW_CELLS_X - 3).max(2)),
            rng.random_range(2..=(VIEW_CELLS_Y - 3).max(2)),
        );
        let mut world = Self::new_internal(base_cell, Some(rng));
        world.scatter_resources(VIEW_CELLS_X, VIEW_CELLS_Y);
        world
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::RangeInclusive<i32>) -> i32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    /// Scatter trees and stones over a 3x3-view area around the origin.
    /// Cells that cannot hold a resource node are skipped.
    pub fn scatter_resources(&mut self, view_cells_x: i32, view_cells_y: i32) {
        let (min_x, max_x) = (-view_cells_x, view_cells_x * 2);
        let (min_y, max_y) = (-view_cells_y, view_cells_y * 2);

        let target_trees = 75.max((view_cells_x * view_cells_y) as usize / 4);
        let mut attempts = 0;
        while self.grid.tree_count() < target_trees && attempts < target_trees * 10 {
            attempts += 1;
            let cell = Cell::new(self.random_range(min_x..=max_x), self.random_range(min_y..=max_y));
            self.add_tree(cell);
        }

        let target_stones = 10.max(self.grid.tree_count() / 4);
        let mut attempts = 0;
        while self.grid.stone_count() < target_stones && attempts < target_stones * 20 {
            attempts += 1;
            let cell = Cell::new(self.random_range(min_x..=max_x), self.random_range(min_y..=max_y));
            self.add_stone(cell);
        }

        debug!(
            "Scattered {} trees and {} stones",
            self.grid.tree_count(),
            self.grid.stone_count()
        );
    }

    fn spawn_truck_at_base(&mut self) -> TruckId {
        let id = TruckId(self.next_truck_id);
        self.next_truck_id += 1;
        self.trucks.insert(id, Truck::new(id, self.base_cell));
        id
    }

    /// The cells of the base footprint
    pub fn base_cells(&self) -> impl Iterator<Item = Cell> {
        let base = self.base_cell;
        (0..BASE_SIZE)
            .flat_map(move |dx| (0..BASE_SIZE).filter_map(move |dy| base.checked_offset(dx, dy)))
    }

    pub fn is_in_base_area(&self, cell: Cell) -> bool {
        self.is_within_base_margin(cell, 0)
    }

    /// Within the exclusion ring around the base (Chebyshev distance), footprint included
    pub fn is_near_base(&self, cell: Cell) -> bool {
        self.is_within_base_margin(cell, BASE_EXCLUSION_MARGIN)
    }

    fn is_within_base_margin(&self, cell: Cell, margin: i32) -> bool {
        let (x, y) = (cell.x as i64, cell.y as i64);
        let (bx, by) = (self.base_cell.x as i64, self.base_cell.y as i64);
        let (margin, size) = (margin as i64, BASE_SIZE as i64);
        (bx - margin..bx + size + margin).contains(&x) && (by - margin..by + size + margin).contains(&y)
    }

    /// Any base-footprint cell stands for the base itself
    pub(super) fn normalize_endpoint(&self, cell: Cell) -> Cell {
        if self.is_in_base_area(cell) {
            self.base_cell
        } else {
            cell
        }
    }

    pub fn facility_at(&self, cell: Cell) -> Option<&Facility> {
        self.facilities.get(&cell)
    }

    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.trucks.get(&id)
    }

    pub fn is_driveable(&self, cell: Cell) -> bool {
        self.grid.is_driveable(cell)
    }

    pub fn is_connected_to_base(&mut self, cell: Cell) -> bool {
        self.grid.are_connected(cell, self.base_cell)
    }

    /// True when the truck is on the base footprint
    pub fn is_truck_at_base(&self, id: TruckId) -> bool {
        self.trucks
            .get(&id)
            .is_some_and(|truck| self.is_in_base_area(truck.current_cell))
    }

    /// True when the truck's current leg ends at the base
    pub fn is_going_to_base(&self, id: TruckId) -> bool {
        self.trucks
            .get(&id)
            .is_some_and(|truck| truck.dest_cell == Some(self.base_cell) && truck.state == TruckState::ToDest)
    }

    fn is_occupied_by_nature(&self, cell: Cell) -> bool {
        self.grid.is_tree(cell) || self.grid.is_stone(cell)
    }

    /// Add a tree resource node
    pub fn add_tree(&mut self, cell: Cell) -> bool {
        if self.is_occupied_by_nature(cell)
            || self.is_in_base_area(cell)
            || self.grid.is_road(cell)
            || self.facilities.contains_key(&cell)
        {
            return false;
        }
        self.grid.add_tree(cell)
    }

    /// Add a stone resource node
    pub fn add_stone(&mut self, cell: Cell) -> bool {
        if self.is_occupied_by_nature(cell)
            || self.is_in_base_area(cell)
            || self.grid.is_road(cell)
            || self.facilities.contains_key(&cell)
        {
            return false;
        }
        self.grid.add_stone(cell)
    }

    /// Place a road for one build material.
    /// Returns false (and changes nothing) when the cell is taken or bmats ran out.
    pub fn place_road(&mut self, cell: Cell) -> bool {
        if self.is_occupied_by_nature(cell)
            || self.grid.is_road(cell)
            || self.is_in_base_area(cell)
            || self.facilities.contains_key(&cell)
        {
            debug!("Road rejected at {}: cell occupied", cell);
            return false;
        }

        if !self.resources.spend(ResourceKind::Bmats, COST_ROAD) {
            debug!("Road rejected at {}: out of bmats", cell);
            return false;
        }

        self.grid.add_road(cell);
        true
    }

    /// Paint roads along the line between two cells, stopping once bmats run out.
    /// Returns the number of roads actually placed.
    pub fn place_road_line(&mut self, start: Cell, end: Cell) -> usize {
        let mut placed = 0;
        for cell in start.line_iter(end) {
            if !self.resources.can_afford(ResourceKind::Bmats, COST_ROAD) {
                debug!("Road line from {} to {} stopped at {}: out of bmats", start, end, cell);
                break;
            }
            if self.place_road(cell) {
                placed += 1;
            }
        }
        placed
    }

    /// Remove a road and refund one build material
    pub fn remove_road(&mut self, cell: Cell) -> bool {
        if !self.grid.remove_road(cell) {
            return false;
        }

        self.resources.earn(ResourceKind::Bmats, COST_ROAD);
        if !self.facilities.contains_key(&cell) && !self.is_in_base_area(cell) {
            self.grid.mark_driveable(cell, false);
        }
        true
    }

    /// Whether a facility may be built on `cell`
    pub fn can_place_facility(&self, cell: Cell) -> bool {
        !self.is_occupied_by_nature(cell)
            && !self.grid.is_road(cell)
            && !self.facilities.contains_key(&cell)
            && !self.is_near_base(cell)
    }

    /// Build a facility. Harvesters get their rate from the nodes in range.
    pub fn place_facility(&mut self, kind: FacilityKind, cell: Cell) -> bool {
        if !self.can_place_facility(cell) {
            debug!("{} rejected at {}", kind, cell);
            return false;
        }

        let facility = match kind {
            FacilityKind::Lumber => {
                let trees = self.grid.count_trees_in_radius(cell, HARVEST_RADIUS);
                Facility::harvester(kind, cell, trees)
            }
            FacilityKind::Quarry => {
                let stones = self.grid.count_stones_in_radius(cell, HARVEST_RADIUS);
                Facility::harvester(kind, cell, stones)
            }
            FacilityKind::Refinery => Facility::refinery(cell),
        };

        debug!(
            "Placed {} at {} producing {:.1}/s",
            kind, cell, facility.production_rate_per_sec
        );
        self.facilities.insert(cell, facility);
        self.grid.mark_driveable(cell, true);
        true
    }

    /// Demolish a facility; its storage is discarded
    pub fn remove_facility(&mut self, cell: Cell) -> Option<Facility> {
        let facility = self.facilities.remove(&cell)?;
        if !self.grid.is_road(cell) {
            self.grid.mark_driveable(cell, false);
        }
        Some(facility)
    }

    /// Remove whatever the player can remove at `cell`: a road first, else a facility
    pub fn bulldoze(&mut self, cell: Cell) -> bool {
        if self.grid.is_road(cell) {
            return self.remove_road(cell);
        }
        self.remove_facility(cell).is_some()
    }

    /// Bulldoze a set of highlighted cells, returning how many were cleared
    pub fn bulldoze_cells<I>(&mut self, cells: I) -> usize
    where
        I: IntoIterator<Item = Cell>,
    {
        cells.into_iter().filter(|cell| self.bulldoze(*cell)).count()
    }

    /// Buy a truck for `10 + 15 * trucks_built` bmats. It spawns idle at the base.
    pub fn build_new_truck(&mut self) -> Option<TruckId> {
        let cost = self.truck_factory.next_truck_cost();
        if !self.resources.spend(ResourceKind::Bmats, cost) {
            info!(
                "Not enough bmats for a truck: need {}, have {}",
                cost,
                self.resources.get(ResourceKind::Bmats)
            );
            return None;
        }

        let id = self.spawn_truck_at_base();
        self.truck_factory.record_build();
        info!("Built {} for {} bmats, {} trucks total", id, cost, self.trucks.len());
        Some(id)
    }

    /// Flip repeat mode, returning the new setting
    pub fn toggle_repeat(&mut self, id: TruckId) -> Option<bool> {
        let truck = self.trucks.get_mut(&id)?;
        truck.repeat_enabled = !truck.repeat_enabled;
        Some(truck.repeat_enabled)
    }

    /// Send a truck back to idle from any state, dropping its trip and cargo
    pub fn reset_truck(&mut self, id: TruckId) -> bool {
        match self.trucks.get_mut(&id) {
            Some(truck) => {
                truck.reset();
                debug!("{} reset", id);
                true
            }
            None => false,
        }
    }

    /// Run production for every facility that reaches the base by road
    fn update_facilities(&mut self, delta_secs: f32) {
        let producing: Vec<Cell> = self
            .facilities
            .values()
            .filter(|facility| facility.production_rate_per_sec > 0.0)
            .map(|facility| facility.cell)
            .collect();

        for cell in producing {
            if !self.grid.are_connected(cell, self.base_cell) {
                continue;
            }
            if let Some(facility) = self.facilities.get_mut(&cell) {
                facility.update(delta_secs);
            }
        }
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f32) {
        self.time += delta_secs;

        self.update_facilities(delta_secs);

        self.update_trucks(delta_secs);
    }

    /// Build the world used by the headless runner: a road spur east to a
    /// lumber camp, a spur south to a quarry, a refinery on the east road, and
    /// three trucks on repeating trips. With a seed, random resource nodes are
    /// scattered around the layout afterwards.
    pub fn create_demo_world(seed: Option<u64>) -> Self {
        let rng = seed.map(StdRng::seed_from_u64);
        let mut world = Self::new_internal(Cell::new(2, 2), rng);

        // Sandbox budget for the demo layout and a third truck
        world.resources.earn(ResourceKind::Bmats, 80);

        for x in 11..=16 {
            for y in [0, 4, 5] {
                world.add_tree(Cell::new(x, y));
            }
        }
        for x in 0..=4 {
            for y in [12, 13] {
                world.add_stone(Cell::new(x, y));
            }
        }

        world.place_road_line(Cell::new(4, 2), Cell::new(12, 2));
        world.place_road_line(Cell::new(2, 4), Cell::new(2, 10));

        let lumber = Cell::new(13, 2);
        let quarry = Cell::new(2, 11);
        let refinery = Cell::new(8, 3);
        world.place_facility(FacilityKind::Lumber, lumber);
        world.place_facility(FacilityKind::Quarry, quarry);
        world.place_facility(FacilityKind::Refinery, refinery);

        let third = world.build_new_truck();
        let base = world.base_cell;
        let trips = [
            (Some(TruckId(1)), lumber, base, ResourceKind::Wood),
            (Some(TruckId(2)), quarry, base, ResourceKind::Stone),
            (third, quarry, refinery, ResourceKind::Stone),
        ];
        for (truck_id, source, dest, resource) in trips {
            let Some(truck_id) = truck_id else { continue };
            world.toggle_repeat(truck_id);
            world.start_assignment(AssignmentRequest {
                truck_id,
                source,
                dest,
                resource,
            });
        }

        if seed.is_some() {
            world.scatter_resources(VIEW_CELLS_X, VIEW_CELLS_Y);
        }

        world
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Logistics Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Roads: {}, Driveable cells: {}, Trees: {}, Stones: {}",
            self.grid.road_count(),
            self.grid.driveable_count(),
            self.grid.tree_count(),
            self.grid.stone_count()
        );
        println!("Resources: {}", self.resources.summary());
        println!(
            "Deliveries: {} | Next truck costs {} bmats",
            self.deliveries_completed,
            self.truck_factory.next_truck_cost()
        );
        println!();

        println!("--- Facilities ---");
        for facility in self.facilities.values() {
            let storage = facility
                .storage
                .iter()
                .map(|(kind, amount)| format!("{}={:.1}", kind, amount))
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {} at {}: rate={:.1}/s, storage [{}]",
                facility.kind, facility.cell, facility.production_rate_per_sec, storage
            );
        }

        println!("--- Trucks ---");
        for truck in self.trucks.values() {
            let cargo = match truck.cargo_type {
                Some(kind) => format!("{:.1} {}", truck.cargo_amount, kind),
                None => "empty".to_string(),
            };
            println!(
                "  {}: state={}, cell={}, cargo={}, path_remaining={}, repeat={}",
                truck.id.0,
                truck.state.label(),
                truck.current_cell,
                cargo,
                truck.path.len(),
                truck.repeat_enabled
            );
        }
    }

    /// Draw a visual map of the world in the terminal
    pub fn draw_map(&self) {
        let mut cells: Vec<Cell> = self.base_cells().collect();
        cells.extend(self.grid.roads().copied());
        cells.extend(self.facilities.keys().copied());
        cells.extend(self.trucks.values().map(|truck| truck.current_cell));

        let (Some(min_x), Some(max_x)) = (
            cells.iter().map(|c| c.x as i64).min(),
            cells.iter().map(|c| c.x as i64).max(),
        ) else {
            return;
        };
        let (Some(min_y), Some(max_y)) = (
            cells.iter().map(|c| c.y as i64).min(),
            cells.iter().map(|c| c.y as i64).max(),
        ) else {
            return;
        };

        // Pad so nearby resource nodes show up, but never draw more than
        // two views in each direction from the base
        let (bx, by) = (self.base_cell.x as i64, self.base_cell.y as i64);
        let (span_x, span_y) = (2 * VIEW_CELLS_X as i64, 2 * VIEW_CELLS_Y as i64);
        let min_x = (min_x - 3).max(bx - span_x);
        let max_x = (max_x + 3).min(bx + span_x);
        let min_y = (min_y - 3).max(by - span_y);
        let max_y = (max_y + 3).min(by + span_y);
        let width = (max_x - min_x + 1) as usize;
        let height = (max_y - min_y + 1) as usize;
        let mut map = vec![vec!['.'; width]; height];

        let mut plot = |cell: &Cell, glyph: char| {
            let (x, y) = (cell.x as i64, cell.y as i64);
            if (min_x..=max_x).contains(&x) && (min_y..=max_y).contains(&y) {
                map[(y - min_y) as usize][(x - min_x) as usize] = glyph;
            }
        };

        for cell in self.grid.trees() {
            plot(cell, 'T');
        }
        for cell in self.grid.stones() {
            plot(cell, 'o');
        }
        for cell in self.grid.roads() {
            plot(cell, '#');
        }
        for cell in self.base_cells() {
            plot(&cell, 'B');
        }
        for facility in self.facilities.values() {
            plot(&facility.cell, facility.kind.glyph());
        }
        for truck in self.trucks.values() {
            let glyph = char::from_digit(truck.id.0 % 10, 10).unwrap_or('*');
            plot(&truck.current_cell, glyph);
        }

        println!("\n=== World Map ===");
        println!("Legend: B=Base, #=Road, L=Lumber, Q=Quarry, R=Refinery, T=Tree, o=Stone, digits=Trucks");
        println!();
        for row in &map {
            let line: String = row.iter().collect();
            println!("{}", line);
        }
        println!();
    }
}
