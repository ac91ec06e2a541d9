//! Radiative forcing aggregator
//!
//! Collects the forcing of every agent whose inputs are available, sums them
//! into total forcing and reports everything relative to a base year.
//!
//! # What This Component Does
//!
//! For each year at or after the base year:
//!
//! 1. CO₂, N₂O and CH₄ stratospherically adjusted forcing from concentrations
//!    (see [`sarf`]), scaled by `1 + delta` for tropospheric adjustments.
//!    Stratospheric water vapour follows from CH₄. These are only computed when
//!    CO₂, CH₄ and N₂O concentrations are all provided.
//! 2. Tropospheric ozone from its column.
//! 3. The 26 halocarbon forcings, read from their own components.
//! 4. Aerosol-radiation interactions, linear in BC, OC and SO₂ emissions.
//! 5. Terrestrial albedo and volcanic forcing, as provided.
//!
//! Total forcing is the sum, unless a total-forcing constraint covers the year.
//! The base year's forcings are stored and subtracted from every later year.
//!
//! # Lookups
//!
//! Before the base year every forcing reads as 0 W/m². Scalar parameters are
//! served whatever the date. `RFADJ_<gas>` reads the rebased forcing of the
//! matching `RF_<gas>`.

pub mod sarf;

use log::{debug, info, warn};
use nbox_core::capability::{Capability, Halocarbon};
use nbox_core::component::Component;
use nbox_core::ensure_contract;
use nbox_core::errors::{NboxError, NboxResult};
use nbox_core::hub::{Core, Registry};
use nbox_core::message::MessageData;
use nbox_core::timeseries::{FloatValue, NestedTimeSeries, Time, TimeSeries};
use nbox_core::units::{Unit, UnitVal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const COMPONENT_NAME: &str = "forcing";

/// Forcing agent name to forcing value
pub type Forcings = BTreeMap<Capability, UnitVal>;

const OUTPUTS: [Capability; 11] = [
    Capability::RfTotal,
    Capability::RfBaseyear,
    Capability::RfCo2,
    Capability::RfCh4,
    Capability::RfN2o,
    Capability::RfH2oStrat,
    Capability::RfO3Trop,
    Capability::RfBc,
    Capability::RfOc,
    Capability::RfSo2,
    Capability::RfVol,
];

const PARAMETERS: [Capability; 7] = [
    Capability::ACo2,
    Capability::DeltaCh4,
    Capability::DeltaN2o,
    Capability::DeltaCo2,
    Capability::RhoBc,
    Capability::RhoOc,
    Capability::RhoSo2,
];

const DEPENDENCIES: [Capability; 13] = [
    Capability::AtmosphericCo2,
    Capability::PreindustrialCo2,
    Capability::AtmosphericCh4,
    Capability::PreindustrialCh4,
    Capability::AtmosphericN2o,
    Capability::PreindustrialN2o,
    Capability::AtmosphericO3,
    Capability::EmissionsBc,
    Capability::EmissionsOc,
    Capability::EmissionsSo2,
    Capability::NaturalSo2,
    Capability::RfTAlbedo,
    Capability::VolcanicForcing,
];

/// Parameters for the forcing aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingParameters {
    /// Legacy CO2 forcing coefficient, served but not used by the AR6 expressions
    /// unit: W / m^2
    #[serde(rename = "aCO2")]
    pub a_co2: FloatValue,
    /// Tropospheric adjustment of CO2 forcing
    /// unit: dimensionless
    pub delta_co2: FloatValue,
    /// Tropospheric adjustment of CH4 forcing
    /// unit: dimensionless
    pub delta_ch4: FloatValue,
    /// Tropospheric adjustment of N2O forcing
    /// unit: dimensionless
    pub delta_n2o: FloatValue,
    /// Radiative efficiency of black carbon
    /// unit: W / m^2 / Tg
    pub rho_bc: FloatValue,
    /// Radiative efficiency of organic carbon
    /// unit: W / m^2 / Tg
    pub rho_oc: FloatValue,
    /// Radiative efficiency of sulphate precursors
    /// unit: W / m^2 / Gg
    pub rho_so2: FloatValue,
    /// Year forcings are reported relative to. Defaults to the year after the start.
    pub baseyear: Option<Time>,
}

impl Default for ForcingParameters {
    fn default() -> Self {
        Self {
            a_co2: 5.35,
            delta_co2: 0.05,
            delta_ch4: -0.14,
            delta_n2o: 0.07,
            rho_bc: 0.0508,
            rho_oc: -0.00621,
            rho_so2: -7.24e-6,
            baseyear: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForcingAggregator {
    a_co2: UnitVal,
    delta_co2: UnitVal,
    delta_ch4: UnitVal,
    delta_n2o: UnitVal,
    rho_bc: UnitVal,
    rho_oc: UnitVal,
    rho_so2: UnitVal,
    baseyear: Option<Time>,
    ftot_constrain: TimeSeries<UnitVal>,
    baseyear_forcings: Forcings,
    forcings_ts: NestedTimeSeries<Capability>,
    current_date: Time,
}

impl Default for ForcingAggregator {
    fn default() -> Self {
        Self {
            a_co2: UnitVal::zero(Unit::WattsPerM2),
            delta_co2: UnitVal::zero(Unit::Unitless),
            delta_ch4: UnitVal::zero(Unit::Unitless),
            delta_n2o: UnitVal::zero(Unit::Unitless),
            rho_bc: UnitVal::zero(Unit::WattsPerM2PerTg),
            rho_oc: UnitVal::zero(Unit::WattsPerM2PerTg),
            rho_so2: UnitVal::zero(Unit::WattsPerM2PerGg),
            baseyear: None,
            ftot_constrain: TimeSeries::new("FTOT_CONSTRAIN").with_interpolation(true),
            baseyear_forcings: Forcings::new(),
            forcings_ts: NestedTimeSeries::new("forcings"),
            current_date: 0.0,
        }
    }
}

/// Value of `capability` at `t` in `unit`, or `None` when nothing provides it
fn fetch(core: &Core, capability: Capability, t: Time, unit: Unit) -> NboxResult<Option<FloatValue>> {
    if !core.check_capability(capability) {
        return Ok(None);
    }
    core.get_data(capability, Some(t))?.value(unit).map(Some)
}

impl ForcingAggregator {
    /// Build an aggregator from configuration, passing every value through `set_data`
    pub fn from_parameters(parameters: &ForcingParameters) -> NboxResult<Self> {
        let mut aggregator = Self::default();
        let values = [
            (Capability::ACo2, parameters.a_co2, Unit::WattsPerM2),
            (Capability::DeltaCo2, parameters.delta_co2, Unit::Unitless),
            (Capability::DeltaCh4, parameters.delta_ch4, Unit::Unitless),
            (Capability::DeltaN2o, parameters.delta_n2o, Unit::Unitless),
            (Capability::RhoBc, parameters.rho_bc, Unit::WattsPerM2PerTg),
            (Capability::RhoOc, parameters.rho_oc, Unit::WattsPerM2PerTg),
            (Capability::RhoSo2, parameters.rho_so2, Unit::WattsPerM2PerGg),
        ];
        for (capability, value, unit) in values {
            aggregator.set_data(capability, MessageData::new(UnitVal::new(value, unit)))?;
        }
        if let Some(baseyear) = parameters.baseyear {
            aggregator.set_data(
                Capability::RfBaseyear,
                MessageData::new(UnitVal::new(baseyear, Unit::Unitless)),
            )?;
        }
        Ok(aggregator)
    }

    pub fn baseyear(&self) -> Option<Time> {
        self.baseyear
    }

    /// Absolute forcing of every agent available at `t`
    fn compute_forcings(&self, t: Time, core: &Core) -> NboxResult<Forcings> {
        let mut forcings = Forcings::new();
        let wm2 = |v: FloatValue| UnitVal::new(v, Unit::WattsPerM2);

        // Major greenhouse gases
        if core.check_capability(Capability::AtmosphericCh4)
            && core.check_capability(Capability::AtmosphericN2o)
            && core.check_capability(Capability::AtmosphericCo2)
        {
            let c0 = core
                .get_data(Capability::PreindustrialCo2, None)?
                .value(Unit::PpmvCo2)?;
            let m0 = core
                .get_data(Capability::PreindustrialCh4, None)?
                .value(Unit::PpbvCh4)?;
            let n0 = core
                .get_data(Capability::PreindustrialN2o, None)?
                .value(Unit::PpbvN2o)?;
            let ca = core
                .get_data(Capability::AtmosphericCo2, Some(t))?
                .value(Unit::PpmvCo2)?;
            let ma = core
                .get_data(Capability::AtmosphericCh4, Some(t))?
                .value(Unit::PpbvCh4)?;
            let na = core
                .get_data(Capability::AtmosphericN2o, Some(t))?
                .value(Unit::PpbvN2o)?;

            let delta_co2 = self.delta_co2.value(Unit::Unitless)?;
            let delta_n2o = self.delta_n2o.value(Unit::Unitless)?;
            let delta_ch4 = self.delta_ch4.value(Unit::Unitless)?;
            forcings.insert(
                Capability::RfCo2,
                wm2(sarf::co2_sarf(ca, c0, na) * (1.0 + delta_co2)),
            );
            forcings.insert(
                Capability::RfN2o,
                wm2(sarf::n2o_sarf(ca, na, ma, n0) * (1.0 + delta_n2o)),
            );
            forcings.insert(
                Capability::RfCh4,
                wm2(sarf::ch4_sarf(ma, na, m0) * (1.0 + delta_ch4)),
            );
            forcings.insert(Capability::RfH2oStrat, wm2(sarf::h2o_strat_forcing(ma, m0)));
        }

        if let Some(ozone) = fetch(core, Capability::AtmosphericO3, t, Unit::DobsonUnits)? {
            forcings.insert(Capability::RfO3Trop, wm2(sarf::o3_trop_forcing(ozone)));
        }

        // Halocarbons can be switched off individually
        for halocarbon in Halocarbon::ALL {
            let capability = Capability::HaloForcing(halocarbon);
            if let Some(f) = fetch(core, capability, t, Unit::WattsPerM2)? {
                forcings.insert(capability, wm2(f));
            }
        }

        if [
            Capability::EmissionsBc,
            Capability::EmissionsOc,
            Capability::EmissionsSo2,
            Capability::NaturalSo2,
        ]
        .iter()
        .all(|c| core.check_capability(*c))
        {
            let e_bc = core.get_data(Capability::EmissionsBc, Some(t))?;
            let e_oc = core.get_data(Capability::EmissionsOc, Some(t))?;
            let e_so2 = core.get_data(Capability::EmissionsSo2, Some(t))?;
            let sn = core.get_data(Capability::NaturalSo2, Some(t))?;
            forcings.insert(Capability::RfBc, self.rho_bc.try_mul(e_bc)?);
            forcings.insert(Capability::RfOc, self.rho_oc.try_mul(e_oc)?);
            forcings.insert(Capability::RfSo2, self.rho_so2.try_mul(e_so2)?);

            debug!(
                target: COMPONENT_NAME,
                "{}: natural SO2 {}, RFaci {} not included",
                t,
                sn,
                sarf::aerosol_cloud_interactions()
            );
        }

        if let Some(albedo) = fetch(core, Capability::RfTAlbedo, t, Unit::WattsPerM2)? {
            forcings.insert(Capability::RfTAlbedo, wm2(albedo));
        }
        if let Some(volcanic) = fetch(core, Capability::VolcanicForcing, t, Unit::WattsPerM2)? {
            forcings.insert(Capability::RfVol, wm2(volcanic));
        }

        let mut total = UnitVal::zero(Unit::WattsPerM2);
        for (agent, f) in &forcings {
            debug!(target: COMPONENT_NAME, "forcing {} in {} is {}", agent, t, f);
            total = total.try_add(*f)?;
        }
        forcings.insert(Capability::RfTotal, total);
        Ok(forcings)
    }

    fn parameter(&self, capability: Capability) -> Option<UnitVal> {
        match capability {
            Capability::ACo2 => Some(self.a_co2),
            Capability::DeltaCh4 => Some(self.delta_ch4),
            Capability::DeltaN2o => Some(self.delta_n2o),
            Capability::DeltaCo2 => Some(self.delta_co2),
            Capability::RhoBc => Some(self.rho_bc),
            Capability::RhoOc => Some(self.rho_oc),
            Capability::RhoSo2 => Some(self.rho_so2),
            _ => None,
        }
    }

    fn require_baseyear(&self) -> NboxResult<Time> {
        self.baseyear
            .ok_or_else(|| NboxError::contract(COMPONENT_NAME, "base year is not set before the run is prepared"))
    }

    fn set_delta(target: &mut UnitVal, capability: Capability, data: &MessageData) -> NboxResult<()> {
        let delta = data.value_in(Unit::Unitless)?;
        ensure_contract!(
            COMPONENT_NAME,
            (-1.0..=1.0).contains(&delta),
            "{} must be within [-1, 1], got {}",
            capability,
            delta
        );
        *target = data.value;
        Ok(())
    }
}

#[typetag::serde]
impl Component for ForcingAggregator {
    fn name(&self) -> &str {
        COMPONENT_NAME
    }

    fn init(&mut self, registry: &mut Registry) -> NboxResult<()> {
        for capability in OUTPUTS.iter().chain(PARAMETERS.iter()) {
            registry.register_capability(*capability)?;
        }
        for halocarbon in Halocarbon::ALL {
            registry.register_capability(Capability::HaloForcingAdjusted(halocarbon))?;
            registry.register_dependency(Capability::HaloForcing(halocarbon));
        }
        for capability in PARAMETERS {
            registry.register_input(capability)?;
        }
        registry.register_input(Capability::RfBaseyear)?;
        registry.register_input(Capability::FtotConstrain)?;
        for capability in DEPENDENCIES {
            registry.register_dependency(capability);
        }
        Ok(())
    }

    fn set_data(&mut self, capability: Capability, data: MessageData) -> NboxResult<()> {
        if capability != Capability::FtotConstrain && data.date.is_some() {
            return Err(NboxError::date(
                COMPONENT_NAME,
                format!("{} is not time-dependent", capability),
            ));
        }
        match capability {
            Capability::ACo2 => {
                data.value.expect_unit(Unit::WattsPerM2)?;
                self.a_co2 = data.value;
            }
            Capability::DeltaCo2 => Self::set_delta(&mut self.delta_co2, capability, &data)?,
            Capability::DeltaCh4 => Self::set_delta(&mut self.delta_ch4, capability, &data)?,
            Capability::DeltaN2o => Self::set_delta(&mut self.delta_n2o, capability, &data)?,
            Capability::RhoBc => {
                data.value.expect_unit(Unit::WattsPerM2PerTg)?;
                self.rho_bc = data.value;
            }
            Capability::RhoOc => {
                data.value.expect_unit(Unit::WattsPerM2PerTg)?;
                self.rho_oc = data.value;
            }
            Capability::RhoSo2 => {
                data.value.expect_unit(Unit::WattsPerM2PerGg)?;
                self.rho_so2 = data.value;
            }
            Capability::RfBaseyear => {
                self.baseyear = Some(data.value_in(Unit::Unitless)?);
            }
            Capability::FtotConstrain => {
                let t = data.date.ok_or_else(|| {
                    NboxError::date(COMPONENT_NAME, "FTOT_CONSTRAIN requires a date")
                })?;
                data.value.expect_unit(Unit::WattsPerM2)?;
                self.ftot_constrain.set(t, data.value);
            }
            other => return Err(NboxError::unknown_variable(COMPONENT_NAME, other)),
        }
        Ok(())
    }

    fn get_data(&self, capability: Capability, date: Option<Time>) -> NboxResult<UnitVal> {
        if let Some(value) = self.parameter(capability) {
            return Ok(value);
        }
        let baseyear = self.require_baseyear()?;
        if capability == Capability::RfBaseyear {
            return Ok(UnitVal::new(baseyear, Unit::Unitless));
        }

        let t = date.unwrap_or(self.current_date);
        if t < baseyear || capability == Capability::RfSo2 {
            return Ok(UnitVal::zero(Unit::WattsPerM2));
        }

        let forcings = self.forcings_ts.get_exact(t).ok_or_else(|| {
            NboxError::date(COMPONENT_NAME, format!("no forcings computed for {}", t))
        })?;
        forcings
            .get(&capability.raw_forcing())
            .copied()
            .ok_or_else(|| NboxError::unknown_variable(COMPONENT_NAME, capability))
    }

    fn prepare_to_run(&mut self, core: &Core) -> NboxResult<()> {
        let start = core.start_date();
        let baseyear = *self.baseyear.get_or_insert(start + 1.0);
        if baseyear <= start {
            return Err(NboxError::date(
                COMPONENT_NAME,
                format!("base year {} must be after the start date {}", baseyear, start),
            ));
        }
        info!(target: COMPONENT_NAME, "base year for reporting is {}", baseyear);
        if !self.ftot_constrain.is_empty() {
            warn!(
                target: COMPONENT_NAME,
                "total forcing will be overwritten by user-supplied values"
            );
        }
        self.baseyear_forcings.clear();
        self.current_date = start;
        Ok(())
    }

    fn run(&mut self, t: Time, core: &Core) -> NboxResult<()> {
        self.current_date = t;
        let baseyear = self.require_baseyear()?;
        if t < baseyear {
            debug!(target: COMPONENT_NAME, "{} is before the base year", t);
            return Ok(());
        }

        let forcings = self.compute_forcings(t, core)?;
        if t == baseyear {
            debug!(target: COMPONENT_NAME, "storing base year forcings");
            self.baseyear_forcings = forcings.clone();
        }

        let mut rebased = Forcings::new();
        for (agent, f) in forcings {
            let base = self
                .baseyear_forcings
                .get(&agent)
                .copied()
                .unwrap_or_else(|| UnitVal::zero(Unit::WattsPerM2));
            rebased.insert(agent, f.try_sub(base)?);
        }

        if self.ftot_constrain.covers(t) {
            let total = self.ftot_constrain.get(t)?;
            warn!(
                target: COMPONENT_NAME,
                "{}: overwriting total forcing with user-supplied {}", t, total
            );
            rebased.insert(Capability::RfTotal, total);
        }

        self.forcings_ts.set(t, rebased);
        Ok(())
    }

    fn reset(&mut self, t: Time) -> NboxResult<()> {
        self.current_date = t;
        self.forcings_ts.truncate(t);
        info!(target: COMPONENT_NAME, "reset to time= {}", t);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nbox_core::hub::CoreConfig;
    use nbox_core::prescribed::PrescribedComponent;

    const START: Time = 1745.0;

    fn concentrations(co2: FloatValue) -> PrescribedComponent {
        PrescribedComponent::new("atmosphere")
            .with_series(
                Capability::AtmosphericCo2,
                [
                    (START, UnitVal::new(277.15, Unit::PpmvCo2)),
                    (2100.0, UnitVal::new(co2, Unit::PpmvCo2)),
                ],
            )
            .with_constant(Capability::PreindustrialCo2, UnitVal::new(277.15, Unit::PpmvCo2))
            .with_constant(Capability::AtmosphericCh4, UnitVal::new(731.41, Unit::PpbvCh4))
            .with_constant(Capability::PreindustrialCh4, UnitVal::new(731.41, Unit::PpbvCh4))
            .with_constant(Capability::AtmosphericN2o, UnitVal::new(273.87, Unit::PpbvN2o))
            .with_constant(Capability::PreindustrialN2o, UnitVal::new(273.87, Unit::PpbvN2o))
    }

    fn default_core(atmosphere: PrescribedComponent, forcing: ForcingAggregator) -> Core {
        let mut core = Core::new(CoreConfig {
            start_date: START,
            end_date: 2100.0,
            do_spinup: false,
            ..CoreConfig::default()
        })
        .unwrap();
        core.add_component(Box::new(atmosphere)).unwrap();
        core.add_component(Box::new(forcing)).unwrap();
        core
    }

    fn default_component() -> ForcingAggregator {
        ForcingAggregator::from_parameters(&ForcingParameters::default()).unwrap()
    }

    fn wm2(core: &Core, capability: Capability, t: Time) -> FloatValue {
        core.get_data(capability, Some(t))
            .unwrap()
            .value(Unit::WattsPerM2)
            .unwrap()
    }

    #[test]
    fn parameters_are_served_verbatim() {
        let forcing = default_component();
        let delta = forcing.get_data(Capability::DeltaCh4, Some(2000.0)).unwrap();
        assert_eq!(delta, UnitVal::new(-0.14, Unit::Unitless));
        let rho = forcing.get_data(Capability::RhoSo2, None).unwrap();
        assert_eq!(rho, UnitVal::new(-7.24e-6, Unit::WattsPerM2PerGg));
    }

    #[test]
    fn deltas_are_bounded() {
        let mut forcing = default_component();
        let err = forcing
            .set_data(
                Capability::DeltaCo2,
                MessageData::new(UnitVal::new(1.5, Unit::Unitless)),
            )
            .unwrap_err();
        assert!(matches!(err, NboxError::ContractViolation { .. }));
    }

    #[test]
    fn baseyear_must_follow_start() {
        let forcing = ForcingAggregator::from_parameters(&ForcingParameters {
            baseyear: Some(START),
            ..ForcingParameters::default()
        })
        .unwrap();
        let mut core = default_core(concentrations(400.0), forcing);
        let err = core.prepare_to_run().unwrap_err();
        assert!(matches!(err, NboxError::DateConstraint { .. }), "{}", err);
    }

    #[test]
    fn baseyear_defaults_to_year_after_start() {
        let mut core = default_core(concentrations(400.0), default_component());
        core.prepare_to_run().unwrap();
        let baseyear = core.get_data(Capability::RfBaseyear, Some(1700.0)).unwrap();
        assert_eq!(baseyear.raw(), START + 1.0);
    }

    #[test]
    fn forcing_is_zero_before_and_at_baseyear() {
        let forcing = ForcingAggregator::from_parameters(&ForcingParameters {
            baseyear: Some(1800.0),
            ..ForcingParameters::default()
        })
        .unwrap();
        let mut core = default_core(concentrations(600.0), forcing);
        core.run(Some(1850.0)).unwrap();

        assert_eq!(wm2(&core, Capability::RfCo2, 1790.0), 0.0);
        assert_eq!(wm2(&core, Capability::RfTotal, 1799.0), 0.0);
        for agent in [
            Capability::RfCo2,
            Capability::RfCh4,
            Capability::RfN2o,
            Capability::RfH2oStrat,
            Capability::RfTotal,
        ] {
            assert_eq!(wm2(&core, agent, 1800.0), 0.0, "{} at base year", agent);
        }
        assert!(wm2(&core, Capability::RfCo2, 1850.0) > 0.0);
    }

    #[test]
    fn later_forcing_is_relative_to_baseyear() {
        let forcing = ForcingAggregator::from_parameters(&ForcingParameters {
            baseyear: Some(1800.0),
            ..ForcingParameters::default()
        })
        .unwrap();
        let mut core = default_core(concentrations(600.0), forcing);
        core.run(Some(1900.0)).unwrap();

        let ca = |t: Time| 277.15 + (600.0 - 277.15) * (t - START) / (2100.0 - START);
        let absolute = |t: Time| sarf::co2_sarf(ca(t), 277.15, 273.87) * 1.05;
        assert_relative_eq!(
            wm2(&core, Capability::RfCo2, 1900.0),
            absolute(1900.0) - absolute(1800.0),
            max_relative = 1e-9
        );
        // Only CO2 changes, so it is the whole of total forcing
        assert_relative_eq!(
            wm2(&core, Capability::RfTotal, 1900.0),
            wm2(&core, Capability::RfCo2, 1900.0),
            max_relative = 1e-9
        );
    }

    #[test]
    fn missing_agents_are_unknown() {
        let mut core = default_core(concentrations(400.0), default_component());
        core.run(Some(1800.0)).unwrap();
        assert!(core.get_data(Capability::RfBc, Some(1800.0)).is_err());
        assert!(core.get_data(Capability::RfO3Trop, Some(1800.0)).is_err());
        // Sulphate always reads as zero
        assert_eq!(wm2(&core, Capability::RfSo2, 1800.0), 0.0);
    }

    #[test]
    fn aerosols_need_every_emission() {
        let atmosphere = concentrations(277.15)
            .with_series(
                Capability::EmissionsBc,
                [(START, UnitVal::new(0.0, Unit::Tg)), (2100.0, UnitVal::new(10.0, Unit::Tg))],
            )
            .with_constant(Capability::EmissionsOc, UnitVal::new(20.0, Unit::Tg))
            .with_constant(Capability::EmissionsSo2, UnitVal::new(50000.0, Unit::GgS))
            .with_constant(Capability::NaturalSo2, UnitVal::new(42000.0, Unit::GgS));
        let mut core = default_core(atmosphere, default_component());
        core.run(Some(2100.0)).unwrap();

        let bc_base = 0.0508 * 10.0 * (1746.0 - START) / (2100.0 - START);
        assert_relative_eq!(
            wm2(&core, Capability::RfBc, 2100.0),
            0.0508 * 10.0 - bc_base,
            max_relative = 1e-9
        );
        // Constant emissions rebase to zero
        assert_relative_eq!(wm2(&core, Capability::RfOc, 2100.0), 0.0);
        assert_eq!(wm2(&core, Capability::RfSo2, 2100.0), 0.0);
    }

    #[test]
    fn total_constraint_overrides_the_sum() {
        let mut forcing = default_component();
        forcing
            .set_data(
                Capability::FtotConstrain,
                MessageData::dated(2050.0, UnitVal::new(3.5, Unit::WattsPerM2)),
            )
            .unwrap();
        let mut core = default_core(concentrations(600.0), forcing);
        core.run(Some(2051.0)).unwrap();
        assert_eq!(wm2(&core, Capability::RfTotal, 2050.0), 3.5);
        assert_ne!(wm2(&core, Capability::RfTotal, 2051.0), 3.5);
    }

    #[test]
    fn reset_drops_later_years() {
        let mut core = default_core(concentrations(600.0), default_component());
        core.run(Some(1800.0)).unwrap();
        let before = wm2(&core, Capability::RfCo2, 1790.0);
        core.reset(1790.0).unwrap();
        assert!(core.get_data(Capability::RfCo2, Some(1795.0)).is_err());
        core.run(Some(1800.0)).unwrap();
        assert_eq!(wm2(&core, Capability::RfCo2, 1790.0), before);
    }
}
