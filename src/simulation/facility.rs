//! Production buildings for the logistics simulation
//!
//! Lumber camps and quarries harvest the resource nodes around them; a
//! refinery converts delivered stone into build materials one unit at a time.

use std::collections::BTreeMap;

use super::types::{Cell, FacilityKind, ResourceKind};

/// Production radius (cells) of harvesting facilities
pub const HARVEST_RADIUS: u32 = 5;

/// Units per second contributed by each tree or stone in range
pub const RATE_PER_NODE: f32 = 0.2;

/// Nominal rate of a refinery (one unit every conversion interval)
pub const REFINERY_RATE: f32 = 0.2;

/// Seconds a refinery needs to turn one stone into one bmat
pub const REFINERY_CONVERSION_TIME: f32 = 5.0;

/// Slack on the conversion timer so fixed-step accumulation of dt still
/// reaches a full interval
const CONVERSION_TOLERANCE: f32 = 1e-4;

/// A placed production building
#[derive(Debug, Clone)]
pub struct Facility {
    pub kind: FacilityKind,
    pub cell: Cell,
    pub radius_cells: u32,
    pub production_rate_per_sec: f32,
    /// Accumulated goods, never negative
    pub storage: BTreeMap<ResourceKind, f32>,
    /// Seconds accumulated toward the next refinery conversion
    pub conversion_timer: f32,
}

impl Facility {
    /// Create a lumber camp or quarry from the number of resource nodes in range
    pub fn harvester(kind: FacilityKind, cell: Cell, nodes_in_range: usize) -> Self {
        let mut storage = BTreeMap::new();
        storage.insert(kind.output(), 0.0);
        Self {
            kind,
            cell,
            radius_cells: HARVEST_RADIUS,
            production_rate_per_sec: nodes_in_range as f32 * RATE_PER_NODE,
            storage,
            conversion_timer: 0.0,
        }
    }

    pub fn refinery(cell: Cell) -> Self {
        let mut storage = BTreeMap::new();
        storage.insert(ResourceKind::Stone, 0.0);
        storage.insert(ResourceKind::Bmats, 0.0);
        Self {
            kind: FacilityKind::Refinery,
            cell,
            radius_cells: 0,
            production_rate_per_sec: REFINERY_RATE,
            storage,
            conversion_timer: 0.0,
        }
    }

    pub fn stored(&self, resource: ResourceKind) -> f32 {
        self.storage.get(&resource).copied().unwrap_or(0.0)
    }

    pub fn deposit(&mut self, resource: ResourceKind, amount: f32) {
        *self.storage.entry(resource).or_insert(0.0) += amount.max(0.0);
    }

    /// Remove up to `amount`, returning what was actually taken
    pub fn withdraw(&mut self, resource: ResourceKind, amount: f32) -> f32 {
        let entry = self.storage.entry(resource).or_insert(0.0);
        let taken = amount.clamp(0.0, entry.max(0.0));
        *entry = (*entry - taken).max(0.0);
        taken
    }

    /// How much a truck may pick up here. Only the facility's own output counts.
    pub fn available_for_pickup(&self, resource: ResourceKind) -> f32 {
        if self.kind.output() == resource {
            self.stored(resource)
        } else {
            0.0
        }
    }

    /// Advance production by `delta_secs`.
    ///
    /// The caller is responsible for the road-connectivity gate. A refinery
    /// converts at most one stone per call, however large `delta_secs` is.
    pub fn update(&mut self, delta_secs: f32) {
        if self.production_rate_per_sec <= 0.0 {
            return;
        }

        match self.kind {
            FacilityKind::Lumber | FacilityKind::Quarry => {
                let produced = self.production_rate_per_sec * delta_secs;
                self.deposit(self.kind.output(), produced);
            }
            FacilityKind::Refinery => {
                let stone = self.stored(ResourceKind::Stone);
                if stone <= 0.0 {
                    return;
                }
                self.conversion_timer += delta_secs;
                if self.conversion_timer + CONVERSION_TOLERANCE >= REFINERY_CONVERSION_TIME {
                    self.withdraw(ResourceKind::Stone, 1.0);
                    self.deposit(ResourceKind::Bmats, 1.0);
                    self.conversion_timer = 0.0;
                }
            }
        }
    }
}
