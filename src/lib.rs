//! nbox: a multi-biome carbon cycle and radiative forcing model
//!
//! Components exchange data through a message hub ([`nbox_core::hub::Core`]).
//! The standard model couples:
//!
//! * the SimpleNbox terrestrial carbon cycle, one set of land pools per biome
//! * an ocean carbon pool exchanging with the atmosphere
//! * a solver driver integrating the shared carbon state each year
//! * a forcing aggregator reporting forcing relative to a base year
//!
//! ```no_run
//! use nbox::{ModelBuilder, ModelConfig};
//!
//! let config = ModelConfig::from_file("nbox.toml")?;
//! let mut core = ModelBuilder::from_config(config).build()?;
//! core.run(None)?;
//! # Ok::<(), nbox::nbox_core::errors::NboxError>(())
//! ```

mod builder;
mod config;

pub use builder::ModelBuilder;
pub use config::ModelConfig;
pub use nbox_components;
pub use nbox_core;
