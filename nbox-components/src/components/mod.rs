mod carbon_cycle_solver;
pub mod forcing;
mod ocean_carbon;
pub mod simple_nbox;

pub use carbon_cycle_solver::{CarbonCycleSolver, SolverOptions};
pub use forcing::{ForcingAggregator, ForcingParameters};
pub use ocean_carbon::{OceanCarbon, OceanCarbonParameters};
pub use simple_nbox::{BiomeParameters, SimpleNbox, SimpleNboxParameters};
