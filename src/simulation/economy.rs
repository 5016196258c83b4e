//! Resource accounting for the logistics game
//!
//! The base owns a pool of integer resource counts. Build materials (bmats)
//! pay for roads and trucks; everything else is delivered by trucks.

use std::collections::BTreeMap;

use super::types::ResourceKind;

/// Build materials the base starts with
pub const STARTING_BMATS: i64 = 10;

/// Build materials consumed by one road cell (and refunded on bulldoze)
pub const COST_ROAD: i64 = 1;

/// Base price of a truck
pub const TRUCK_BASE_COST: i64 = 10;

/// Price increase for every truck already built
pub const TRUCK_COST_STEP: i64 = 15;

/// Number of trucks the base starts with
pub const STARTING_TRUCKS: u32 = 2;

/// Integer resource counts held at the base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePool {
    counts: BTreeMap<ResourceKind, i64>,
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcePool {
    /// Create a pool with the starting stock
    pub fn new() -> Self {
        let mut counts: BTreeMap<ResourceKind, i64> =
            ResourceKind::ALL.iter().map(|kind| (*kind, 0)).collect();
        counts.insert(ResourceKind::Bmats, STARTING_BMATS);
        Self { counts }
    }

    pub fn get(&self, kind: ResourceKind) -> i64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn can_afford(&self, kind: ResourceKind, amount: i64) -> bool {
        self.get(kind) >= amount
    }

    /// Deduct resources for a purchase
    /// Returns true if successful, false if insufficient stock
    pub fn spend(&mut self, kind: ResourceKind, amount: i64) -> bool {
        if self.can_afford(kind, amount) {
            *self.counts.entry(kind).or_insert(0) -= amount;
            true
        } else {
            false
        }
    }

    /// Add resources (deliveries, refunds)
    pub fn earn(&mut self, kind: ResourceKind, amount: i64) {
        *self.counts.entry(kind).or_insert(0) += amount;
    }

    /// Remove up to `amount`, returning what was actually taken
    pub fn withdraw(&mut self, kind: ResourceKind, amount: i64) -> i64 {
        let entry = self.counts.entry(kind).or_insert(0);
        let taken = amount.clamp(0, (*entry).max(0));
        *entry -= taken;
        taken
    }

    /// Snapshot of every resource, in a stable order
    pub fn snapshot(&self) -> Vec<(ResourceKind, i64)> {
        self.counts.iter().map(|(kind, count)| (*kind, *count)).collect()
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .map(|(kind, count)| format!("{}: {}", kind, count))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Tracks how many trucks were built so each purchase gets pricier
#[derive(Debug, Clone, Default)]
pub struct TruckFactory {
    pub trucks_built: u32,
}

impl TruckFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cost of the next truck: `10 + 15 * trucks_built`
    pub fn next_truck_cost(&self) -> i64 {
        TRUCK_BASE_COST + TRUCK_COST_STEP * self.trucks_built as i64
    }

    pub fn record_build(&mut self) {
        self.trucks_built += 1;
    }
}
