//! Physical components of the nbox model
//!
//! * [`components::SimpleNbox`]: multi-biome terrestrial carbon cycle
//! * [`components::OceanCarbon`]: ocean carbon pool coupled to the atmosphere
//! * [`components::CarbonCycleSolver`]: integrates the coupled carbon state each year
//! * [`components::ForcingAggregator`]: radiative forcing relative to a base year

pub mod components;
pub mod constants;
