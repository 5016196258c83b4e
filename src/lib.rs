//! Truck Logistics Simulation Library
//!
//! The headless core of a road-building logistics game: trucks haul
//! resources between a base and production facilities over a grid of roads.

pub mod simulation;
