//! Physical constants and fixed model coefficients

use nbox_core::timeseries::FloatValue;

/// Pg C in the atmosphere per ppmv of CO₂
pub const PPMVCO2_TO_PGC: FloatValue = 2.13;
/// ppmv of CO₂ per Pg C in the atmosphere
pub const PGC_TO_PPMVCO2: FloatValue = 1.0 / PPMVCO2_TO_PGC;

/// Allowed drift of total carbon between two solver steps
/// unit: Pg C
pub const MB_EPSILON: FloatValue = 0.001;

/// Biome name used when the model is configured without biomes
pub const SNBOX_DEFAULT_BIOME: &str = "global";

/// Terrestrial albedo forcing used when none is supplied
/// unit: W / m^2
pub const DEFAULT_TERRESTRIAL_ALBEDO: FloatValue = -0.2;

// Turnover and transfer rates of the land pools, per year
pub const DETRITUS_RESPIRATION_RATE: FloatValue = 0.25;
pub const SOIL_RESPIRATION_RATE: FloatValue = 0.02;
pub const LITTER_RATE: FloatValue = 0.035;
pub const DETRITUS_TO_SOIL_RATE: FloatValue = 0.6;

/// Default lag of the soil temperature window, in years
pub const Q10_TEMPLAG: usize = 0;
/// Default width of the soil temperature window, in years
pub const Q10_TEMPN: usize = 200;

// Simplified expressions for CO2, N2O and CH4 stratospherically adjusted
// radiative forcing (IPCC AR6 WG1 Chapter 7 supplementary material, Table 7.SM.1)
pub const A1: FloatValue = -2.4785e-07;
pub const B1: FloatValue = 0.00075906;
pub const C1: FloatValue = -0.0021492;
pub const D1: FloatValue = 5.2488;
pub const A2: FloatValue = -0.00034197;
pub const B2: FloatValue = 0.00025455;
pub const C2: FloatValue = -0.00024357;
pub const A3: FloatValue = -8.9603e-05;
pub const B3: FloatValue = -0.00012462;
pub const D3: FloatValue = 0.045194;

/// Stratospheric water vapour forcing per unit of CH₄ forcing
pub const H2O_STRAT_FRACTION: FloatValue = 0.05;
pub const H2O_STRAT_SCALE: FloatValue = 0.036;

/// Tropospheric ozone forcing per Dobson unit
/// unit: W / m^2 / DU
pub const O3_TROP_EFFICIENCY: FloatValue = 0.042;
