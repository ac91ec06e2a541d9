//! Land fluxes, derivatives and the slow parameters that scale them
//!
//! Everything here reads the per-biome pools held by the kernel rather than
//! the solver state, so land derivatives are constant within a solver year.

use super::{SimpleNbox, COMPONENT_NAME};
use crate::constants::{
    DETRITUS_RESPIRATION_RATE, DETRITUS_TO_SOIL_RATE, LITTER_RATE, PGC_TO_PPMVCO2,
    SOIL_RESPIRATION_RATE,
};
use log::debug;
use ndarray::Array1;
use nbox_core::capability::Capability;
use nbox_core::ensure_contract;
use nbox_core::errors::NboxResult;
use nbox_core::hub::Core;
use nbox_core::ivp::{CarbonPool, CarbonState, OceanCarbonModel, SolverStatus};
use nbox_core::timeseries::{FloatValue, Time, TimeSeries};
use nbox_core::units::{Unit, UnitVal};

/// Flows of a single biome, in Pg C / yr
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct BiomeFluxes {
    pub npp: FloatValue,
    pub rh_detritus: FloatValue,
    pub rh_soil: FloatValue,
    pub litter: FloatValue,
    pub detritus_to_soil: FloatValue,
}

impl BiomeFluxes {
    pub fn rh(&self) -> FloatValue {
        self.rh_detritus + self.rh_soil
    }
}

/// Q10 scaling for `warming` degrees
pub fn q10_factor(q10: FloatValue, warming: FloatValue) -> FloatValue {
    q10.powf(warming / 10.0)
}

/// CO₂ fertilization factor, `1 + beta ln(Ca / C0)`
pub fn co2_fertilization(beta: FloatValue, ca: FloatValue, c0: FloatValue) -> FloatValue {
    1.0 + beta * (ca / c0).ln()
}

impl SimpleNbox {
    pub(super) fn biome_fluxes(&self, biome: &str) -> NboxResult<BiomeFluxes> {
        let npp0 = self.biome_pool(&self.npp_flux0, biome, "npp_flux0")?.raw();
        let co2fert = self.biome_value(&self.co2fert, biome, "co2fert")?;
        let veg = self.biome_pool(&self.veg_c, biome, "veg_c")?.raw();
        let det = self.biome_pool(&self.detritus_c, biome, "detritus_c")?.raw();
        let soil = self.biome_pool(&self.soil_c, biome, "soil_c")?.raw();
        let tempfertd = self.biome_value(&self.tempfertd, biome, "tempfertd")?;
        let tempferts = self.biome_value(&self.tempferts, biome, "tempferts")?;
        Ok(BiomeFluxes {
            npp: npp0 * co2fert,
            rh_detritus: DETRITUS_RESPIRATION_RATE * det * tempfertd,
            rh_soil: SOIL_RESPIRATION_RATE * soil * tempferts,
            litter: LITTER_RATE * veg,
            detritus_to_soil: DETRITUS_TO_SOIL_RATE * det,
        })
    }

    pub(super) fn sum_npp(&self) -> NboxResult<FloatValue> {
        self.biome_list
            .iter()
            .map(|b| self.biome_fluxes(b).map(|f| f.npp))
            .sum()
    }

    pub(super) fn sum_rh(&self) -> NboxResult<FloatValue> {
        self.biome_list
            .iter()
            .map(|b| self.biome_fluxes(b).map(|f| f.rh()))
            .sum()
    }

    /// Annual emission for `year`; zero in spinup or where the series has no data
    ///
    /// The solver asks for the year at the end of the step being integrated
    /// (`ode_start_date + 1`) and holds it for the whole step. A series that
    /// starts at the run's first date therefore never has its first value used.
    fn emission(&self, series: &TimeSeries<UnitVal>, year: Time) -> NboxResult<FloatValue> {
        if self.in_spinup || !series.covers(year) {
            return Ok(0.0);
        }
        series.get(year)?.value(Unit::PgCPerYear)
    }

    /// Fossil fuel and industrial emissions. Negative values are carbon capture.
    pub(super) fn ffi_emission(&self, year: Time) -> NboxResult<FloatValue> {
        self.emission(&self.ffi_emissions, year)
    }

    pub(super) fn luc_emission(&self, year: Time) -> NboxResult<FloatValue> {
        self.emission(&self.luc_emissions, year)
    }

    /// Fossil carbon entering the atmosphere through methane oxidation
    fn ch4_oxidation(&self) -> FloatValue {
        // Not modelled; methane is prescribed
        0.0
    }

    pub(super) fn derivatives(
        &self,
        t: Time,
        c: &CarbonState,
        dcdt: &mut CarbonState,
        ocean: &dyn OceanCarbonModel,
    ) -> NboxResult<SolverStatus> {
        let status = ocean.calc_derivs(t, c, dcdt);
        let atm_ocean_flux = dcdt[CarbonPool::Ocean.idx()];

        let year = self.ode_start_date + 1.0;
        let ffi = self.ffi_emission(year)?;
        let luc = self.luc_emission(year)?;

        let (mut npp_total, mut rh_total) = (0.0, 0.0);
        let (mut dveg, mut ddet, mut dsoil) = (0.0, 0.0, 0.0);
        for biome in &self.biome_list {
            let f = self.biome_fluxes(biome)?;
            let f_nppv = self.biome_value(&self.f_nppv, biome, "f_nppv")?;
            let f_nppd = self.biome_value(&self.f_nppd, biome, "f_nppd")?;
            let f_litterd = self.biome_value(&self.f_litterd, biome, "f_litterd")?;

            npp_total += f.npp;
            rh_total += f.rh();
            dveg += f.npp * f_nppv - f.litter;
            ddet += f.npp * f_nppd + f.litter * f_litterd - f.rh_detritus - f.detritus_to_soil;
            dsoil += f.npp * (1.0 - f_nppv - f_nppd) + f.litter * (1.0 - f_litterd)
                + f.detritus_to_soil
                - f.rh_soil;
        }

        dcdt[CarbonPool::Vegetation.idx()] = dveg - luc * self.f_lucv;
        dcdt[CarbonPool::Detritus.idx()] = ddet - luc * self.f_lucd;
        dcdt[CarbonPool::Soil.idx()] = dsoil - luc * (1.0 - self.f_lucv - self.f_lucd);
        dcdt[CarbonPool::Atmosphere.idx()] =
            ffi + luc - npp_total + rh_total - atm_ocean_flux + self.ch4_oxidation();
        dcdt[CarbonPool::Earth.idx()] = -ffi;

        Ok(status)
    }

    /// Mean recorded temperature over the `q10_tempn` years before `t - q10_templag`
    ///
    /// `t` is the start of the solver step, so the year being solved is never
    /// part of its own window.
    fn soil_temperature(&self, t: Time) -> FloatValue {
        let lag = self.q10_templag as FloatValue;
        if t - lag <= self.start_date {
            return 0.0;
        }
        let first = t - lag - self.q10_tempn as FloatValue;
        let window: Array1<FloatValue> = (0..self.q10_tempn)
            .map(|i| {
                self.tgav_record
                    .get_exact(first + i as FloatValue)
                    .copied()
                    .unwrap_or(0.0)
            })
            .collect();
        window.mean().unwrap_or(0.0)
    }

    pub(super) fn update_slow_parameters(
        &mut self,
        t: Time,
        c: &CarbonState,
        ocean: &mut dyn OceanCarbonModel,
        core: &Core,
    ) -> NboxResult<()> {
        ocean.slow_param_eval(t, c)?;

        let ca = c[CarbonPool::Atmosphere.idx()] * PGC_TO_PPMVCO2;
        ensure_contract!(COMPONENT_NAME, ca > 0.0, "Ca must be positive, got {} at {}", ca, t);
        self.ca = UnitVal::new(ca, Unit::PpmvCo2);
        let c0 = self.c0.value(Unit::PpmvCo2)?;

        let tgav = if self.in_spinup {
            0.0
        } else {
            core.get_data(Capability::GlobalTemp, None)?
                .value(Unit::DegC)?
        };
        let soil_tgav = if self.in_spinup {
            0.0
        } else {
            self.soil_temperature(t)
        };
        let previous = if self.in_spinup {
            None
        } else {
            self.tempferts_tv.get_exact(t).cloned()
        };

        for biome in self.biome_list.clone() {
            let beta = self.biome_value(&self.beta, &biome, "beta")?;
            let q10 = self.biome_value(&self.q10_rh, &biome, "q10_rh")?;
            let wf = self.biome_value(&self.warmingfactor, &biome, "warmingfactor")?;

            let co2fert = if self.in_spinup {
                1.0
            } else {
                co2_fertilization(beta, ca, c0)
            };
            let tempfertd = q10_factor(q10, tgav * wf);
            let mut tempferts = q10_factor(q10, soil_tgav * wf);
            if let Some(prev) = previous.as_ref().and_then(|p| p.get(&biome)) {
                tempferts = tempferts.max(*prev);
            }
            debug!(
                target: COMPONENT_NAME,
                "{} {}: co2fert={} tempfertd={} tempferts={}",
                t,
                biome,
                co2fert,
                tempfertd,
                tempferts
            );
            self.co2fert.insert(biome.clone(), co2fert);
            self.tempfertd.insert(biome.clone(), tempfertd);
            self.tempferts.insert(biome, tempferts);
        }

        if !self.in_spinup {
            self.tempferts_tv.set(self.tcurrent, self.tempferts.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn fertilization_is_neutral_at_preindustrial() {
        assert_eq!(co2_fertilization(0.36, 277.15, 277.15), 1.0);
        let doubled = co2_fertilization(0.36, 554.3, 277.15);
        assert!(is_close!(doubled, 1.0 + 0.36 * 2.0_f64.ln()));
    }

    #[test]
    fn q10_doubles_per_ten_degrees() {
        assert_eq!(q10_factor(2.0, 0.0), 1.0);
        assert!(is_close!(q10_factor(2.0, 10.0), 2.0));
        assert!(is_close!(q10_factor(2.0, 20.0), 4.0));
    }
}
