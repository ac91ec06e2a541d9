//! Ocean carbon component
//!
//! A single well-mixed ocean pool exchanging carbon with the atmosphere,
//! enough to close the carbon budget of the terrestrial kernel.
//!
//! # What This Component Does
//!
//! The air-sea flux relaxes the atmosphere towards its preindustrial pool:
//!
//! $$ F = k \left( C_{atm} - C_{atm,0} \right) $$
//!
//! where $C_{atm,0} = C_0 \times 2.13$ Pg C. A positive flux is ocean uptake.
//!
//! Carbon removed from the atmosphere by a CO₂ constraint arrives through
//! `DUMP_TO_DEEP_OCEAN` and is kept in a deep reservoir that is not part of
//! the solver state.
//!
//! # Inputs
//!
//! - `C0` (ppmv), read once in `prepare_to_run`
//!
//! # Outputs
//!
//! - `ocean_c` (Pg C) - Carbon in the exchanging ocean pool
//! - `atm_ocean_flux` (Pg C/yr) - Net uptake over the last solved year
//! - `deep_ocean_c` (Pg C) - Cumulative carbon sent to the deep reservoir

use crate::constants::PPMVCO2_TO_PGC;
use log::{debug, info};
use nbox_core::capability::Capability;
use nbox_core::component::Component;
use nbox_core::ensure_contract;
use nbox_core::errors::{NboxError, NboxResult};
use nbox_core::hub::{Core, Registry};
use nbox_core::ivp::{CarbonPool, CarbonState, OceanCarbonModel, SolverStatus};
use nbox_core::message::{Message, MessageData};
use nbox_core::timeseries::{FloatValue, Time, TimeSeries};
use nbox_core::units::{FluxPool, Unit, UnitVal};
use serde::{Deserialize, Serialize};

const COMPONENT_NAME: &str = "ocean";

/// Parameters for the ocean carbon component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanCarbonParameters {
    /// Initial carbon in the exchanging ocean pool
    /// unit: Pg C
    pub ocean_c: FloatValue,
    /// Fraction of the atmospheric excess taken up per year
    /// unit: 1 / yr
    pub exchange_rate: FloatValue,
}

impl Default for OceanCarbonParameters {
    fn default() -> Self {
        Self {
            ocean_c: 38000.0,
            exchange_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OceanCarbon {
    parameters: OceanCarbonParameters,
    ocean_c: FluxPool,
    /// Ocean pool at the start of the step being solved
    step_start_c: FloatValue,
    deep_ocean_c: UnitVal,
    annual_flux: UnitVal,
    atmos_c_eq: FloatValue,
    start_date: Time,
    current_date: Time,
    in_spinup: bool,
    ocean_c_ts: TimeSeries<UnitVal>,
    flux_ts: TimeSeries<UnitVal>,
    deep_ocean_c_ts: TimeSeries<UnitVal>,
}

impl OceanCarbon {
    pub fn from_parameters(parameters: OceanCarbonParameters) -> NboxResult<Self> {
        ensure_contract!(
            COMPONENT_NAME,
            parameters.exchange_rate >= 0.0,
            "exchange rate must be non-negative, got {}",
            parameters.exchange_rate
        );
        let ocean_c = FluxPool::new(parameters.ocean_c, Unit::PgC)?;
        Ok(Self {
            parameters,
            ocean_c,
            step_start_c: ocean_c.raw(),
            deep_ocean_c: UnitVal::zero(Unit::PgC),
            annual_flux: UnitVal::zero(Unit::PgCPerYear),
            atmos_c_eq: 0.0,
            start_date: 0.0,
            current_date: 0.0,
            in_spinup: false,
            ocean_c_ts: TimeSeries::new("ocean_c"),
            flux_ts: TimeSeries::new("atm_ocean_flux"),
            deep_ocean_c_ts: TimeSeries::new("deep_ocean_c"),
        })
    }

    /// Air-sea flux for a given atmospheric pool
    pub fn air_sea_flux(&self, atmos_c: FloatValue) -> FloatValue {
        self.parameters.exchange_rate * (atmos_c - self.atmos_c_eq)
    }

    fn record(&mut self, t: Time) {
        self.ocean_c_ts.set(t, self.ocean_c.into());
        self.flux_ts.set(t, self.annual_flux);
        self.deep_ocean_c_ts.set(t, self.deep_ocean_c);
    }
}

impl OceanCarbonModel for OceanCarbon {
    fn get_c_values(&self, _t: Time, c: &mut CarbonState) {
        c[CarbonPool::Ocean.idx()] = self.ocean_c.raw();
    }

    fn calc_derivs(&self, _t: Time, c: &CarbonState, dcdt: &mut CarbonState) -> SolverStatus {
        let atmos_c = c[CarbonPool::Atmosphere.idx()];
        if !atmos_c.is_finite() {
            return SolverStatus::Failure;
        }
        dcdt[CarbonPool::Ocean.idx()] = self.air_sea_flux(atmos_c);
        SolverStatus::Success
    }

    fn slow_param_eval(&mut self, _t: Time, c: &CarbonState) -> NboxResult<()> {
        self.step_start_c = c[CarbonPool::Ocean.idx()];
        Ok(())
    }

    fn stash_c_values(&mut self, t: Time, c: &CarbonState) -> NboxResult<()> {
        let ocean_c = c[CarbonPool::Ocean.idx()];
        self.ocean_c = FluxPool::new(ocean_c, Unit::PgC)?;
        self.annual_flux = UnitVal::new(ocean_c - self.step_start_c, Unit::PgCPerYear);
        if !self.in_spinup {
            self.record(t);
        }
        debug!(target: COMPONENT_NAME, "{}: ocean_c={} flux={}", t, self.ocean_c, self.annual_flux);
        Ok(())
    }

    fn dump_to_deep_ocean(&mut self, residual: UnitVal) -> NboxResult<()> {
        self.deep_ocean_c = self.deep_ocean_c.try_add(residual)?;
        if !self.in_spinup {
            self.deep_ocean_c_ts.set(self.current_date, self.deep_ocean_c);
        }
        debug!(target: COMPONENT_NAME, "deep ocean received {}", residual);
        Ok(())
    }
}

#[typetag::serde]
impl Component for OceanCarbon {
    fn name(&self) -> &str {
        COMPONENT_NAME
    }

    fn init(&mut self, registry: &mut Registry) -> NboxResult<()> {
        registry.register_capability(Capability::OceanC)?;
        registry.register_capability(Capability::DeepOceanC)?;
        registry.register_capability(Capability::OceanAtmosFlux)?;
        registry.register_input(Capability::OceanC)?;
        registry.register_dependency(Capability::PreindustrialCo2);
        Ok(())
    }

    fn set_data(&mut self, capability: Capability, data: MessageData) -> NboxResult<()> {
        match capability {
            Capability::OceanC if data.date.is_none() => {
                let ocean_c = FluxPool::try_from(data.value)?;
                ocean_c.value(Unit::PgC)?;
                self.ocean_c = ocean_c;
                self.parameters.ocean_c = ocean_c.raw();
                Ok(())
            }
            Capability::OceanC => Err(NboxError::date(
                COMPONENT_NAME,
                "initial ocean carbon is not time-dependent",
            )),
            other => Err(NboxError::unknown_variable(COMPONENT_NAME, other)),
        }
    }

    fn get_data(&self, capability: Capability, date: Option<Time>) -> NboxResult<UnitVal> {
        match (capability, date) {
            (Capability::OceanC, None) => Ok(self.ocean_c.into()),
            (Capability::OceanC, Some(t)) => self.ocean_c_ts.require(t),
            (Capability::OceanAtmosFlux, None) => Ok(self.annual_flux),
            (Capability::OceanAtmosFlux, Some(t)) => self.flux_ts.require(t),
            (Capability::DeepOceanC, None) => Ok(self.deep_ocean_c),
            (Capability::DeepOceanC, Some(t)) => self.deep_ocean_c_ts.require(t),
            (other, _) => Err(NboxError::unknown_variable(COMPONENT_NAME, other)),
        }
    }

    fn handle_message(
        &mut self,
        message: Message,
        capability: Capability,
        data: MessageData,
    ) -> NboxResult<UnitVal> {
        match message {
            Message::DumpToDeepOcean => {
                self.dump_to_deep_ocean(data.value)?;
                Ok(UnitVal::undefined())
            }
            other => Err(NboxError::contract(
                COMPONENT_NAME,
                format!("cannot handle {} for {}", other, capability),
            )),
        }
    }

    fn prepare_to_run(&mut self, core: &Core) -> NboxResult<()> {
        let c0 = core
            .get_data(Capability::PreindustrialCo2, None)?
            .value(Unit::PpmvCo2)?;
        self.atmos_c_eq = c0 * PPMVCO2_TO_PGC;
        self.start_date = core.start_date();
        self.current_date = core.start_date();
        info!(
            target: COMPONENT_NAME,
            "equilibrium atmosphere {} Pg C, exchange rate {} / yr",
            self.atmos_c_eq,
            self.parameters.exchange_rate
        );
        Ok(())
    }

    fn run(&mut self, t: Time, _core: &Core) -> NboxResult<()> {
        self.in_spinup = false;
        if self.ocean_c_ts.is_empty() {
            self.record(self.start_date);
        }
        self.current_date = t;
        Ok(())
    }

    fn run_spinup(&mut self, _step: usize, _core: &Core) -> NboxResult<bool> {
        self.in_spinup = true;
        Ok(true)
    }

    fn reset(&mut self, t: Time) -> NboxResult<()> {
        if let Some(ocean_c) = self.ocean_c_ts.get_exact(t) {
            self.ocean_c = FluxPool::try_from(*ocean_c)?;
        }
        if let Some(flux) = self.flux_ts.get_exact(t) {
            self.annual_flux = *flux;
        }
        if let Some(deep) = self.deep_ocean_c_ts.get_exact(t) {
            self.deep_ocean_c = *deep;
        }
        self.ocean_c_ts.truncate(t);
        self.flux_ts.truncate(t);
        self.deep_ocean_c_ts.truncate(t);
        self.current_date = t;
        self.in_spinup = false;
        info!(target: COMPONENT_NAME, "reset to time= {}", t);
        Ok(())
    }

    fn as_ocean_mut(&mut self) -> Option<&mut dyn OceanCarbonModel> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_component() -> OceanCarbon {
        let mut ocean = OceanCarbon::from_parameters(OceanCarbonParameters::default()).unwrap();
        ocean.atmos_c_eq = 590.0;
        ocean
    }

    #[test]
    fn no_flux_at_equilibrium() {
        let ocean = default_component();
        let mut c = CarbonState::zeros();
        c[CarbonPool::Atmosphere.idx()] = 590.0;
        let mut dcdt = CarbonState::zeros();
        assert_eq!(ocean.calc_derivs(0.0, &c, &mut dcdt), SolverStatus::Success);
        assert_eq!(dcdt[CarbonPool::Ocean.idx()], 0.0);
    }

    #[test]
    fn takes_up_excess_atmospheric_carbon() {
        let ocean = default_component();
        let mut c = CarbonState::zeros();
        c[CarbonPool::Atmosphere.idx()] = 690.0;
        let mut dcdt = CarbonState::zeros();
        ocean.calc_derivs(0.0, &c, &mut dcdt);
        assert_relative_eq!(dcdt[CarbonPool::Ocean.idx()], 1.0);
        // Only the ocean slot is written
        assert_eq!(dcdt[CarbonPool::Atmosphere.idx()], 0.0);
    }

    #[test]
    fn non_finite_atmosphere_fails() {
        let ocean = default_component();
        let mut c = CarbonState::zeros();
        c[CarbonPool::Atmosphere.idx()] = f64::NAN;
        let mut dcdt = CarbonState::zeros();
        assert_eq!(ocean.calc_derivs(0.0, &c, &mut dcdt), SolverStatus::Failure);
    }

    #[test]
    fn stash_tracks_annual_uptake() {
        let mut ocean = default_component();
        let mut c = CarbonState::zeros();
        ocean.get_c_values(2000.0, &mut c);
        ocean.slow_param_eval(2000.0, &c).unwrap();
        c[CarbonPool::Ocean.idx()] += 2.5;
        ocean.stash_c_values(2001.0, &c).unwrap();
        assert_relative_eq!(ocean.get_data(Capability::OceanC, None).unwrap().raw(), 38002.5);
        let flux = ocean.get_data(Capability::OceanAtmosFlux, Some(2001.0)).unwrap();
        assert_relative_eq!(flux.value(Unit::PgCPerYear).unwrap(), 2.5);
    }

    #[test]
    fn deep_dump_accumulates_through_messages() {
        let mut ocean = default_component();
        let residual = MessageData::new(UnitVal::new(3.0, Unit::PgC));
        ocean
            .handle_message(Message::DumpToDeepOcean, Capability::OceanC, residual.clone())
            .unwrap();
        ocean
            .handle_message(Message::DumpToDeepOcean, Capability::OceanC, residual)
            .unwrap();
        let deep = ocean.get_data(Capability::DeepOceanC, None).unwrap();
        assert_eq!(deep, UnitVal::new(6.0, Unit::PgC));
        // The exchanging pool is untouched
        assert_eq!(ocean.get_data(Capability::OceanC, None).unwrap().raw(), 38000.0);
    }

    #[test]
    fn other_messages_are_rejected() {
        let mut ocean = default_component();
        let result = ocean.handle_message(
            Message::GetData,
            Capability::OceanC,
            MessageData::request(None),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_parameters() {
        let params = OceanCarbonParameters {
            exchange_rate: -0.1,
            ..OceanCarbonParameters::default()
        };
        assert!(OceanCarbon::from_parameters(params).is_err());
        let params = OceanCarbonParameters {
            ocean_c: -1.0,
            ..OceanCarbonParameters::default()
        };
        assert!(OceanCarbon::from_parameters(params).is_err());
    }
}
