//! The solver boundary of the kernel
//!
//! The integrator sees one slot per land pool type. This module sums biomes
//! into the flat state vector and writes the solved state back, apportioning
//! each aggregate change across biomes in proportion to their share of
//! `npp + rh`. It is also where total carbon is checked and where an
//! atmospheric constraint is applied.

use super::{BiomePools, SimpleNbox, COMPONENT_NAME};
use crate::constants::{MB_EPSILON, PGC_TO_PPMVCO2, PPMVCO2_TO_PGC};
use log::{debug, error, info};
use nbox_core::errors::{NboxError, NboxResult};
use nbox_core::hub::Core;
use nbox_core::ivp::{CarbonCycleModel, CarbonPool, CarbonState, OceanCarbonModel, SolverStatus};
use nbox_core::timeseries::{FloatValue, Time};
use nbox_core::units::{FluxPool, Unit, UnitVal};
use std::collections::BTreeMap;

/// Spread `delta` over `pools` using `weights`, which sum to one
fn apportion(
    pools: &BiomePools,
    delta: FloatValue,
    weights: &BTreeMap<String, FloatValue>,
) -> NboxResult<BiomePools> {
    pools
        .iter()
        .map(|(biome, pool)| {
            let w = weights.get(biome).copied().unwrap_or(0.0);
            let updated = pool.try_add(UnitVal::new(delta * w, Unit::PgC))?;
            Ok((biome.clone(), updated))
        })
        .collect()
}

impl SimpleNbox {
    /// Share of each biome in the total `npp + rh`; equal shares when that total is zero
    fn apportion_weights(&self) -> NboxResult<BTreeMap<String, FloatValue>> {
        let mut activity = BTreeMap::new();
        for biome in &self.biome_list {
            let f = self.biome_fluxes(biome)?;
            activity.insert(biome.clone(), f.npp + f.rh());
        }
        let total: FloatValue = activity.values().sum();
        let n = self.biome_list.len() as FloatValue;
        Ok(activity
            .into_iter()
            .map(|(biome, a)| {
                let w = if total > 0.0 { a / total } else { 1.0 / n };
                (biome, w)
            })
            .collect())
    }

    /// Target atmospheric pool if a constraint applies at `t`
    fn constraint_target(&self, t: Time) -> NboxResult<Option<FloatValue>> {
        if self.in_spinup {
            return Ok(Some(self.c0.value(Unit::PpmvCo2)? * PPMVCO2_TO_PGC));
        }
        match self.co2_constrain.get_exact(t) {
            Some(target) => Ok(Some(target.value(Unit::PpmvCo2)? * PPMVCO2_TO_PGC)),
            None => Ok(None),
        }
    }
}

impl CarbonCycleModel for SimpleNbox {
    fn get_c_values(
        &mut self,
        t: Time,
        c: &mut CarbonState,
        ocean: &dyn OceanCarbonModel,
    ) -> NboxResult<()> {
        c[CarbonPool::Atmosphere.idx()] = self.atmos_c.value(Unit::PgC)?;
        c[CarbonPool::Vegetation.idx()] = self.sum_veg_c();
        c[CarbonPool::Detritus.idx()] = self.sum_detritus_c();
        c[CarbonPool::Soil.idx()] = self.sum_soil_c();
        c[CarbonPool::Earth.idx()] = self.earth_c.value(Unit::PgC)?;
        ocean.get_c_values(t, c);
        self.ode_start_date = t;
        Ok(())
    }

    fn calc_derivs(
        &self,
        t: Time,
        c: &CarbonState,
        dcdt: &mut CarbonState,
        ocean: &dyn OceanCarbonModel,
    ) -> NboxResult<SolverStatus> {
        self.derivatives(t, c, dcdt, ocean)
    }

    fn slow_param_eval(
        &mut self,
        t: Time,
        c: &CarbonState,
        ocean: &mut dyn OceanCarbonModel,
        core: &Core,
    ) -> NboxResult<()> {
        self.update_slow_parameters(t, c, ocean, core)
    }

    fn stash_c_values(
        &mut self,
        t: Time,
        c: &CarbonState,
        ocean: &mut dyn OceanCarbonModel,
    ) -> NboxResult<UnitVal> {
        let yf = t - self.ode_start_date;
        if !(0.0..=1.0).contains(&yf) {
            return Err(NboxError::date(
                COMPONENT_NAME,
                format!(
                    "stash at {} is {} years after the step start {}",
                    t, yf, self.ode_start_date
                ),
            ));
        }
        debug!(target: COMPONENT_NAME, "stashing at t={}", t);

        let npp_total = self.sum_npp()?;
        let rh_total = self.sum_rh()?;
        let luc = self.luc_emission(t)?;
        self.atmosland_flux = UnitVal::new(npp_total - rh_total - luc, Unit::PgCPerYear);

        self.atmos_c = FluxPool::new(c[CarbonPool::Atmosphere.idx()], Unit::PgC)?;
        self.earth_c = FluxPool::new(c[CarbonPool::Earth.idx()], Unit::PgC)?;

        let weights = self.apportion_weights()?;
        let dveg = c[CarbonPool::Vegetation.idx()] - self.sum_veg_c();
        let ddet = c[CarbonPool::Detritus.idx()] - self.sum_detritus_c();
        let dsoil = c[CarbonPool::Soil.idx()] - self.sum_soil_c();
        self.veg_c = apportion(&self.veg_c, dveg, &weights)?;
        self.detritus_c = apportion(&self.detritus_c, ddet, &weights)?;
        self.soil_c = apportion(&self.soil_c, dsoil, &weights)?;

        ocean.stash_c_values(t, c)?;

        let sum: FloatValue = c.iter().sum();
        let diff = sum - self.masstot;
        if self.masstot > 0.0 && diff.abs() > MB_EPSILON {
            error!(
                target: COMPONENT_NAME,
                "mass not conserved at {}: masstot={} sum={} diff={}",
                t,
                self.masstot,
                sum,
                diff
            );
            return Err(NboxError::MassNotConserved {
                component: COMPONENT_NAME.to_string(),
                date: t,
                masstot: self.masstot,
                sum,
                diff,
            });
        }
        self.masstot = sum;

        self.residual = match self.constraint_target(t)? {
            Some(target) => {
                let residual = self.atmos_c.raw() - target;
                if !self.in_spinup {
                    info!(
                        target: COMPONENT_NAME,
                        "{}: constraining atmosphere, residual {} Pg C", t, residual
                    );
                }
                self.atmos_c = FluxPool::new(target, Unit::PgC)?;
                // The residual leaves the tracked pools for the deep ocean
                self.masstot -= residual;
                UnitVal::new(residual, Unit::PgC)
            }
            None => UnitVal::zero(Unit::PgC),
        };
        self.ca = UnitVal::new(self.atmos_c.raw() * PGC_TO_PPMVCO2, Unit::PpmvCo2);

        if !self.in_spinup {
            self.state_tv.set(t, self.snapshot());
            self.atmosland_flux_ts.set(t, self.atmosland_flux);
            self.npp_ts.set(t, UnitVal::new(npp_total, Unit::PgCPerYear));
            self.rh_ts.set(t, UnitVal::new(rh_total, Unit::PgCPerYear));
        }
        self.ode_start_date = t;
        Ok(self.residual)
    }
}
