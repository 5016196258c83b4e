//! Road grid and pathfinding
//!
//! Holds the driveable cells as an undirected petgraph graph map (one node per
//! driveable cell, one edge per pair of 4-adjacent driveable cells), plus the
//! placed roads and the natural resource nodes (trees, stones).

use log::debug;
use petgraph::algo::astar;
use petgraph::graphmap::UnGraphMap;
use std::collections::{HashMap, HashSet};

use super::types::Cell;

/// Default ring radius searched when projecting a cell onto the road network
pub const NEAREST_ROAD_RADIUS: u32 = 12;

/// Driveability map, roads and resource nodes of the world
#[derive(Debug, Default, Clone)]
pub struct RoadGrid {
    /// Driveable cells and the 4-neighbour links between them
    graph: UnGraphMap<Cell, ()>,

    /// Cells with a placed road
    roads: HashSet<Cell>,

    /// Tree resource nodes
    trees: HashSet<Cell>,

    /// Stone resource nodes
    stones: HashSet<Cell>,

    /// Cached path results, cleared whenever driveability changes
    path_cache: HashMap<Cell, HashMap<Cell, Vec<Cell>>>,
}

impl RoadGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the driveable flag of a cell
    pub fn mark_driveable(&mut self, cell: Cell, driveable: bool) {
        if driveable == self.is_driveable(cell) {
            return;
        }

        if driveable {
            self.graph.add_node(cell);
            for neighbor in cell.neighbors4() {
                if self.graph.contains_node(neighbor) {
                    self.graph.add_edge(cell, neighbor, ());
                }
            }
        } else {
            self.graph.remove_node(cell);
        }

        self.path_cache.clear();
    }

    /// Unknown cells are not driveable
    pub fn is_driveable(&self, cell: Cell) -> bool {
        self.graph.contains_node(cell)
    }

    /// Number of driveable cells
    pub fn driveable_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_road(&self, cell: Cell) -> bool {
        self.roads.contains(&cell)
    }

    /// Record a road and make it driveable. Validation is the caller's job.
    pub fn add_road(&mut self, cell: Cell) {
        self.roads.insert(cell);
        self.mark_driveable(cell, true);
    }

    /// Forget a road. Driveability is left to the caller, since a building
    /// may still cover the cell.
    pub fn remove_road(&mut self, cell: Cell) -> bool {
        self.roads.remove(&cell)
    }

    pub fn roads(&self) -> impl Iterator<Item = &Cell> {
        self.roads.iter()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn is_tree(&self, cell: Cell) -> bool {
        self.trees.contains(&cell)
    }

    pub fn is_stone(&self, cell: Cell) -> bool {
        self.stones.contains(&cell)
    }

    pub fn add_tree(&mut self, cell: Cell) -> bool {
        self.trees.insert(cell)
    }

    pub fn add_stone(&mut self, cell: Cell) -> bool {
        self.stones.insert(cell)
    }

    pub fn trees(&self) -> impl Iterator<Item = &Cell> {
        self.trees.iter()
    }

    pub fn stones(&self) -> impl Iterator<Item = &Cell> {
        self.stones.iter()
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn stone_count(&self) -> usize {
        self.stones.len()
    }

    /// Trees within `radius` cells (Euclidean) of `center`
    pub fn count_trees_in_radius(&self, center: Cell, radius: u32) -> usize {
        count_in_radius(&self.trees, center, radius)
    }

    /// Stones within `radius` cells (Euclidean) of `center`
    pub fn count_stones_in_radius(&self, center: Cell, radius: u32) -> usize {
        count_in_radius(&self.stones, center, radius)
    }

    /// Project a cell onto the road network.
    ///
    /// Returns the cell itself when driveable, otherwise scans diamond rings of
    /// Manhattan distance 1..=max_radius and returns the first driveable cell
    /// in scan order.
    pub fn nearest_road(&self, cell: Cell, max_radius: u32) -> Option<Cell> {
        if self.is_driveable(cell) {
            return Some(cell);
        }

        let max_radius = max_radius as i32;
        for d in 1..=max_radius {
            for dx in -d..=d {
                let dy = d - dx.abs();
                for sy in [-1, 1] {
                    let Some(candidate) = cell.checked_offset(dx, sy * dy) else {
                        continue;
                    };
                    if self.is_driveable(candidate) {
                        return Some(candidate);
                    }
                }
            }
        }

        None
    }

    /// Minimum-hop path over driveable cells, both ends included.
    ///
    /// Every edge costs 1 and the Manhattan estimate never overestimates, so
    /// the hop count matches a breadth-first search. `start == goal` yields
    /// `[start]`; unreachable goals yield an empty path.
    pub fn shortest_path(&mut self, start: Cell, goal: Cell) -> Vec<Cell> {
        if start == goal {
            return vec![start];
        }

        if !self.is_driveable(start) || !self.is_driveable(goal) {
            return Vec::new();
        }

        if let Some(path) = self.path_cache.get(&start).and_then(|paths| paths.get(&goal)) {
            return path.clone();
        }

        let path = astar(
            &self.graph,
            start,
            |node| node == goal,
            |_| 1u32,
            |node| node.manhattan(&goal),
        )
        .map(|(_, path)| path)
        .unwrap_or_default();

        if path.is_empty() {
            debug!("No driveable path from {} to {}", start, goal);
        }

        self.path_cache
            .entry(start)
            .or_default()
            .insert(goal, path.clone());

        path
    }

    /// True when a driveable path joins `start` and `goal`.
    /// Answers from the path cache without copying a cached path.
    pub fn has_path(&mut self, start: Cell, goal: Cell) -> bool {
        if start == goal {
            return self.is_driveable(start);
        }
        if let Some(path) = self.path_cache.get(&start).and_then(|paths| paths.get(&goal)) {
            return !path.is_empty();
        }
        !self.shortest_path(start, goal).is_empty()
    }

    /// True when both cells project onto the road network and a path joins them
    pub fn are_connected(&mut self, a: Cell, b: Cell) -> bool {
        let start = self.nearest_road(a, NEAREST_ROAD_RADIUS);
        let goal = self.nearest_road(b, NEAREST_ROAD_RADIUS);
        match (start, goal) {
            (Some(start), Some(goal)) => self.has_path(start, goal),
            _ => false,
        }
    }
}

fn count_in_radius(nodes: &HashSet<Cell>, center: Cell, radius: u32) -> usize {
    let radius_sq = radius as i64 * radius as i64;
    nodes
        .iter()
        .filter(|node| node.distance_sq(&center) <= radius_sq)
        .count()
}
