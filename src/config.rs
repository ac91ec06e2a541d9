//! TOML configuration of a whole model
//!
//! ```toml
//! [core]
//! start_date = 1745.0
//! end_date = 2100.0
//!
//! [simple_nbox]
//! C0 = 277.15
//!
//! [simple_nbox.biomes.global]
//! npp_flux0 = 56.2
//!
//! [forcing]
//! baseyear = 1750.0
//! ```
//!
//! Every table and key is optional; anything left out takes its default.

use log::info;
use nbox_components::components::{
    ForcingParameters, OceanCarbonParameters, SimpleNboxParameters, SolverOptions,
};
use nbox_core::errors::{NboxError, NboxResult};
use nbox_core::hub::CoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub core: CoreConfig,
    pub simple_nbox: SimpleNboxParameters,
    pub ocean: OceanCarbonParameters,
    pub solver: SolverOptions,
    pub forcing: ForcingParameters,
}

impl ModelConfig {
    pub fn from_toml_str(text: &str) -> NboxResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> NboxResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| NboxError::Config(format!("{}: {}", path.display(), err)))?;
        info!(target: "config", "loading model configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> NboxResult<String> {
        toml::to_string(self).map_err(|err| NboxError::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = ModelConfig::from_toml_str("").unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn partial_tables_keep_defaults() {
        let config = ModelConfig::from_toml_str(
            r#"
            [core]
            start_date = 1850.0
            do_spinup = false

            [simple_nbox.biomes.tropical]
            npp_flux0 = 40.0

            [simple_nbox.biomes.boreal]
            npp_flux0 = 16.2
            warmingfactor = 2.0

            [forcing]
            baseyear = 1900.0
            delta_ch4 = -0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.core.start_date, 1850.0);
        assert_eq!(config.core.end_date, CoreConfig::default().end_date);
        assert!(!config.core.do_spinup);

        let biomes = &config.simple_nbox.biomes;
        assert_eq!(biomes.len(), 2, "declared biomes replace the default one");
        assert_eq!(biomes["boreal"].warmingfactor, Some(2.0));
        assert_eq!(biomes["tropical"].warmingfactor, None);
        assert_eq!(biomes["tropical"].beta, 0.36);

        assert_eq!(config.forcing.baseyear, Some(1900.0));
        assert_eq!(config.forcing.delta_ch4, -0.1);
        assert_eq!(config.solver, SolverOptions::default());
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let err = ModelConfig::from_toml_str("[halocarbons]\nCFC12 = 1.0\n").unwrap_err();
        assert!(matches!(err, NboxError::Config(_)), "{}", err);
    }

    #[test]
    fn wrong_types_are_config_errors() {
        let err = ModelConfig::from_toml_str("[core]\nstart_date = \"soon\"\n").unwrap_err();
        assert!(matches!(err, NboxError::Config(_)), "{}", err);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ModelConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, NboxError::Config(_)));
    }

    #[test]
    fn serialised_config_reads_back() {
        let mut config = ModelConfig::default();
        config.forcing.baseyear = Some(1760.0);
        config.solver.step_size = 0.25;
        let text = config.to_toml_string().unwrap();
        assert_eq!(ModelConfig::from_toml_str(&text).unwrap(), config);
    }
}
