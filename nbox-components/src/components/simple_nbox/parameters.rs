//! SimpleNbox parameters
//!
//! These structs are the configuration-file face of the kernel. They never
//! bypass the message interface: [`super::SimpleNbox::from_parameters`] feeds
//! every value through `set_data`, so validation is identical whichever way a
//! value arrives.

use crate::constants::{Q10_TEMPLAG, Q10_TEMPN, SNBOX_DEFAULT_BIOME};
use nbox_core::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Land carbon parameters for one biome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeParameters {
    /// Initial vegetation carbon
    /// unit: Pg C
    pub veg_c: FloatValue,
    /// Initial detritus carbon
    /// unit: Pg C
    pub detritus_c: FloatValue,
    /// Initial soil carbon
    /// unit: Pg C
    pub soil_c: FloatValue,
    /// Preindustrial net primary production
    /// unit: Pg C / yr
    pub npp_flux0: FloatValue,
    /// CO2 fertilization sensitivity
    /// unit: dimensionless
    pub beta: FloatValue,
    /// Respiration increase for 10 degC of warming
    /// unit: dimensionless
    pub q10_rh: FloatValue,
    /// Biome warming relative to the global mean. Defaults to 1 when unset.
    /// unit: dimensionless
    pub warmingfactor: Option<FloatValue>,
    /// Fraction of NPP going to vegetation
    /// unit: dimensionless
    pub f_nppv: FloatValue,
    /// Fraction of NPP going to detritus; the remainder goes to soil
    /// unit: dimensionless
    pub f_nppd: FloatValue,
    /// Fraction of litter going to detritus; the remainder goes to soil
    /// unit: dimensionless
    pub f_litterd: FloatValue,
}

impl Default for BiomeParameters {
    fn default() -> Self {
        Self {
            veg_c: 550.0,
            detritus_c: 55.0,
            soil_c: 1782.0,
            npp_flux0: 56.2,
            beta: 0.36,
            q10_rh: 2.0,
            warmingfactor: None,
            f_nppv: 0.35,
            f_nppd: 0.60,
            f_litterd: 0.98,
        }
    }
}

/// Parameters for the SimpleNbox terrestrial carbon cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleNboxParameters {
    /// Preindustrial atmospheric CO2
    /// unit: ppmv CO2
    #[serde(rename = "C0")]
    pub c0: FloatValue,
    /// Geological carbon reservoir at the start of the run
    /// unit: Pg C
    pub earth_c: FloatValue,
    /// Fraction of land-use emissions taken from vegetation
    /// unit: dimensionless
    pub f_lucv: FloatValue,
    /// Fraction of land-use emissions taken from detritus; the remainder comes from soil
    /// unit: dimensionless
    pub f_lucd: FloatValue,
    /// Lag of the soil temperature window
    /// unit: yr
    pub q10_templag: usize,
    /// Width of the soil temperature window
    /// unit: yr
    pub q10_tempn: usize,
    /// Per-biome land parameters. A single biome must be called "global".
    pub biomes: BTreeMap<String, BiomeParameters>,
}

impl Default for SimpleNboxParameters {
    fn default() -> Self {
        let mut biomes = BTreeMap::new();
        biomes.insert(SNBOX_DEFAULT_BIOME.to_string(), BiomeParameters::default());
        Self {
            c0: 277.15,
            earth_c: 5500.0,
            f_lucv: 0.1,
            f_lucd: 0.01,
            q10_templag: Q10_TEMPLAG,
            q10_tempn: Q10_TEMPN,
            biomes,
        }
    }
}
