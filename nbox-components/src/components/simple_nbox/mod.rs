//! SimpleNbox terrestrial carbon cycle
//!
//! A multi-biome land carbon box model coupled to an ocean carbon model
//! through a shared six-slot state vector integrated by the carbon-cycle solver.
//!
//! # What This Component Does
//!
//! Each biome holds three land pools (vegetation, detritus, soil). Carbon
//! enters the land as net primary production, scaled by CO₂ fertilization:
//!
//! $$ NPP_b = NPP_{0,b} \left(1 + \beta_b \ln\frac{C_a}{C_0}\right) $$
//!
//! and leaves it as heterotrophic respiration from detritus and soil, scaled by
//! Q10 temperature factors:
//!
//! $$ RH_b = 0.25\, D_b\, Q_{10,b}^{T w_b / 10} + 0.02\, S_b\, Q_{10,b}^{\bar T w_b / 10} $$
//!
//! where $\bar T$ is a trailing window mean of global temperature. The soil
//! factor never decreases from one year to the next.
//!
//! Fossil and land-use emissions move carbon from the geological reservoir and
//! the land pools into the atmosphere. When a CO₂ constraint is active (always
//! during spinup) the atmosphere is forced onto the constraint after each year
//! and the difference is sent to the deep ocean.
//!
//! # Inputs
//!
//! - `Tgav` (degC), read once per year
//! - Emissions and constraints set by the user: `ffi_emissions`, `luc_emissions`,
//!   `CO2_constrain`, `RF_T_ALBEDO`
//!
//! # Outputs
//!
//! - `Ca`, `atmos_c`, `veg_c`, `detritus_c`, `soil_c`, `earth_c`
//! - `atmosland_flux`, `NPP`, `RH`, the constraint residual
//! - `RF_T_ALBEDO` (W/m²)
//!
//! # Solver Boundary
//!
//! The solver sees one aggregate slot per land pool type. The `boundary`
//! submodule sums biomes into the state vector and apportions the solved
//! changes back to biomes; it is also where mass conservation is checked.

mod boundary;
mod fluxes;
pub mod parameters;

pub use parameters::{BiomeParameters, SimpleNboxParameters};

use crate::constants::{
    DEFAULT_TERRESTRIAL_ALBEDO, PPMVCO2_TO_PGC, Q10_TEMPLAG, Q10_TEMPN, SNBOX_DEFAULT_BIOME,
};
use log::{debug, info, warn};
use nbox_core::capability::Capability;
use nbox_core::component::Component;
use nbox_core::ensure_contract;
use nbox_core::errors::{NboxError, NboxResult};
use nbox_core::hub::{Core, Registry};
use nbox_core::ivp::CarbonCycleModel;
use nbox_core::message::MessageData;
use nbox_core::timeseries::{FloatValue, Time, TimeSeries};
use nbox_core::units::{FluxPool, Unit, UnitVal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(crate) const COMPONENT_NAME: &str = "simpleNbox";

pub type BiomePools = BTreeMap<String, FluxPool>;
pub type BiomeValues = BTreeMap<String, FloatValue>;

const CAPABILITIES: [Capability; 17] = [
    Capability::AtmosphericCo2,
    Capability::PreindustrialCo2,
    Capability::AtmosphericC,
    Capability::VegC,
    Capability::DetritusC,
    Capability::SoilC,
    Capability::EarthC,
    Capability::AtmosLandFlux,
    Capability::Npp,
    Capability::Rh,
    Capability::Co2ConstraintResidual,
    Capability::RfTAlbedo,
    Capability::FLucv,
    Capability::FLucd,
    Capability::FfiEmissions,
    Capability::LucEmissions,
    Capability::Co2Constrain,
];

const INPUTS: [Capability; 18] = [
    Capability::PreindustrialCo2,
    Capability::FfiEmissions,
    Capability::LucEmissions,
    Capability::Co2Constrain,
    Capability::RfTAlbedo,
    Capability::FLucv,
    Capability::FLucd,
    Capability::EarthC,
    Capability::VegC,
    Capability::DetritusC,
    Capability::SoilC,
    Capability::NppFlux0,
    Capability::Beta,
    Capability::Q10Rh,
    Capability::WarmingFactor,
    Capability::FNppv,
    Capability::FNppd,
    Capability::FLitterd,
];

/// Snapshot of the state needed to restart a run from a given date
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateRecord {
    atmos_c: FluxPool,
    earth_c: FluxPool,
    veg_c: BiomePools,
    detritus_c: BiomePools,
    soil_c: BiomePools,
    ca: UnitVal,
    residual: UnitVal,
    masstot: FloatValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleNbox {
    biome_list: Vec<String>,

    // Pools
    atmos_c: FluxPool,
    earth_c: FluxPool,
    veg_c: BiomePools,
    detritus_c: BiomePools,
    soil_c: BiomePools,

    // Per-biome parameters
    npp_flux0: BiomePools,
    beta: BiomeValues,
    q10_rh: BiomeValues,
    warmingfactor: BiomeValues,
    f_nppv: BiomeValues,
    f_nppd: BiomeValues,
    f_litterd: BiomeValues,

    // Slow parameters, updated once per solver year
    co2fert: BiomeValues,
    tempfertd: BiomeValues,
    tempferts: BiomeValues,

    f_lucv: FloatValue,
    f_lucd: FloatValue,
    c0: UnitVal,
    ca: UnitVal,
    q10_templag: usize,
    q10_tempn: usize,

    // Inputs
    ffi_emissions: TimeSeries<UnitVal>,
    luc_emissions: TimeSeries<UnitVal>,
    co2_constrain: TimeSeries<UnitVal>,
    ftalbedo: TimeSeries<UnitVal>,

    // Bookkeeping
    masstot: FloatValue,
    residual: UnitVal,
    atmosland_flux: UnitVal,
    ode_start_date: Time,
    tcurrent: Time,
    start_date: Time,
    in_spinup: bool,

    // History
    state_tv: TimeSeries<StateRecord>,
    atmosland_flux_ts: TimeSeries<UnitVal>,
    npp_ts: TimeSeries<UnitVal>,
    rh_ts: TimeSeries<UnitVal>,
    tempferts_tv: TimeSeries<BiomeValues>,
    tgav_record: TimeSeries<FloatValue>,
}

impl Default for SimpleNbox {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleNbox {
    /// An empty kernel; pools and parameters arrive through `set_data`
    pub fn new() -> Self {
        Self {
            biome_list: Vec::new(),
            atmos_c: FluxPool::zero(Unit::PgC),
            earth_c: FluxPool::zero(Unit::PgC),
            veg_c: BiomePools::new(),
            detritus_c: BiomePools::new(),
            soil_c: BiomePools::new(),
            npp_flux0: BiomePools::new(),
            beta: BiomeValues::new(),
            q10_rh: BiomeValues::new(),
            warmingfactor: BiomeValues::new(),
            f_nppv: BiomeValues::new(),
            f_nppd: BiomeValues::new(),
            f_litterd: BiomeValues::new(),
            co2fert: BiomeValues::new(),
            tempfertd: BiomeValues::new(),
            tempferts: BiomeValues::new(),
            f_lucv: 0.0,
            f_lucd: 0.0,
            c0: UnitVal::zero(Unit::PpmvCo2),
            ca: UnitVal::zero(Unit::PpmvCo2),
            q10_templag: Q10_TEMPLAG,
            q10_tempn: Q10_TEMPN,
            ffi_emissions: TimeSeries::new("ffi_emissions").with_interpolation(true),
            luc_emissions: TimeSeries::new("luc_emissions").with_interpolation(true),
            co2_constrain: TimeSeries::new("CO2_constrain"),
            ftalbedo: TimeSeries::new("RF_T_ALBEDO").with_interpolation(true),
            masstot: 0.0,
            residual: UnitVal::zero(Unit::PgC),
            atmosland_flux: UnitVal::zero(Unit::PgCPerYear),
            ode_start_date: 0.0,
            tcurrent: 0.0,
            start_date: 0.0,
            in_spinup: false,
            state_tv: TimeSeries::new("state"),
            atmosland_flux_ts: TimeSeries::new("atmosland_flux"),
            npp_ts: TimeSeries::new("NPP"),
            rh_ts: TimeSeries::new("RH"),
            tempferts_tv: TimeSeries::new("tempferts"),
            tgav_record: TimeSeries::new("Tgav"),
        }
    }

    /// Build a kernel from configuration, passing every value through `set_data`
    pub fn from_parameters(parameters: &SimpleNboxParameters) -> NboxResult<Self> {
        let mut kernel = Self::new();
        kernel.q10_templag = parameters.q10_templag;
        kernel.q10_tempn = parameters.q10_tempn;

        let undated = |value, unit| MessageData::new(UnitVal::new(value, unit));
        kernel.set_data(
            Capability::PreindustrialCo2,
            undated(parameters.c0, Unit::PpmvCo2),
        )?;
        kernel.set_data(Capability::EarthC, undated(parameters.earth_c, Unit::PgC))?;
        kernel.set_data(Capability::FLucv, undated(parameters.f_lucv, Unit::Unitless))?;
        kernel.set_data(Capability::FLucd, undated(parameters.f_lucd, Unit::Unitless))?;

        for (biome, p) in &parameters.biomes {
            let mut per_biome = |capability, value, unit| {
                kernel.set_data(capability, undated(value, unit).for_biome(biome))
            };
            per_biome(Capability::VegC, p.veg_c, Unit::PgC)?;
            per_biome(Capability::DetritusC, p.detritus_c, Unit::PgC)?;
            per_biome(Capability::SoilC, p.soil_c, Unit::PgC)?;
            per_biome(Capability::NppFlux0, p.npp_flux0, Unit::PgCPerYear)?;
            per_biome(Capability::Beta, p.beta, Unit::Unitless)?;
            per_biome(Capability::Q10Rh, p.q10_rh, Unit::Unitless)?;
            per_biome(Capability::FNppv, p.f_nppv, Unit::Unitless)?;
            per_biome(Capability::FNppd, p.f_nppd, Unit::Unitless)?;
            per_biome(Capability::FLitterd, p.f_litterd, Unit::Unitless)?;
            if let Some(wf) = p.warmingfactor {
                per_biome(Capability::WarmingFactor, wf, Unit::Unitless)?;
            }
        }
        Ok(kernel)
    }

    pub fn biomes(&self) -> &[String] {
        &self.biome_list
    }

    pub fn co2fert(&self, biome: &str) -> Option<FloatValue> {
        self.co2fert.get(biome).copied()
    }

    pub fn tempfertd(&self, biome: &str) -> Option<FloatValue> {
        self.tempfertd.get(biome).copied()
    }

    pub fn tempferts(&self, biome: &str) -> Option<FloatValue> {
        self.tempferts.get(biome).copied()
    }

    pub fn masstot(&self) -> FloatValue {
        self.masstot
    }

    /// Add `biome` to the biome list, refusing to mix it with the "global" sentinel
    fn ensure_biome(&mut self, biome: &str) -> NboxResult<()> {
        if self.biome_list.iter().any(|b| b == biome) {
            return Ok(());
        }
        let mixes_sentinel = !self.biome_list.is_empty()
            && (biome == SNBOX_DEFAULT_BIOME
                || self.biome_list.iter().any(|b| b == SNBOX_DEFAULT_BIOME));
        ensure_contract!(
            COMPONENT_NAME,
            !mixes_sentinel,
            "biome '{}' cannot be combined with the '{}' biome (have {:?})",
            biome,
            SNBOX_DEFAULT_BIOME,
            self.biome_list
        );
        info!(target: COMPONENT_NAME, "adding biome {}", biome);
        self.biome_list.push(biome.to_string());
        Ok(())
    }

    fn sum_pools(pools: &BiomePools) -> FloatValue {
        pools.values().map(FluxPool::raw).sum()
    }

    pub fn sum_veg_c(&self) -> FloatValue {
        Self::sum_pools(&self.veg_c)
    }

    pub fn sum_detritus_c(&self) -> FloatValue {
        Self::sum_pools(&self.detritus_c)
    }

    pub fn sum_soil_c(&self) -> FloatValue {
        Self::sum_pools(&self.soil_c)
    }

    /// Validate every invariant of the current state
    fn sanity_checks(&self) -> NboxResult<()> {
        ensure_contract!(
            COMPONENT_NAME,
            self.atmos_c.raw() > 0.0,
            "atmos_c must be positive, got {}",
            self.atmos_c
        );
        ensure_contract!(
            COMPONENT_NAME,
            self.c0.raw() > 0.0,
            "C0 must be positive, got {}",
            self.c0
        );
        ensure_contract!(
            COMPONENT_NAME,
            self.ca.raw() > 0.0,
            "Ca must be positive, got {}",
            self.ca
        );
        ensure_contract!(
            COMPONENT_NAME,
            self.f_lucv >= 0.0 && self.f_lucd >= 0.0 && self.f_lucv + self.f_lucd <= 1.0,
            "f_lucv + f_lucd must be within [0, 1], got {} + {}",
            self.f_lucv,
            self.f_lucd
        );
        for biome in &self.biome_list {
            let f_nppv = self.biome_value(&self.f_nppv, biome, "f_nppv")?;
            let f_nppd = self.biome_value(&self.f_nppd, biome, "f_nppd")?;
            let f_litterd = self.biome_value(&self.f_litterd, biome, "f_litterd")?;
            ensure_contract!(
                COMPONENT_NAME,
                f_nppv >= 0.0 && f_nppd >= 0.0 && f_nppv + f_nppd <= 1.0,
                "{}: f_nppv + f_nppd must be within [0, 1], got {} + {}",
                biome,
                f_nppv,
                f_nppd
            );
            ensure_contract!(
                COMPONENT_NAME,
                (0.0..=1.0).contains(&f_litterd),
                "{}: f_litterd must be within [0, 1], got {}",
                biome,
                f_litterd
            );
            let q10 = self.biome_value(&self.q10_rh, biome, "q10_rh")?;
            ensure_contract!(
                COMPONENT_NAME,
                q10 > 0.0,
                "{}: q10_rh must be positive, got {}",
                biome,
                q10
            );
        }
        Ok(())
    }

    fn biome_value(&self, map: &BiomeValues, biome: &str, what: &str) -> NboxResult<FloatValue> {
        map.get(biome).copied().ok_or_else(|| {
            NboxError::contract(COMPONENT_NAME, format!("no {} for biome '{}'", what, biome))
        })
    }

    fn biome_pool(&self, map: &BiomePools, biome: &str, what: &str) -> NboxResult<FluxPool> {
        map.get(biome).copied().ok_or_else(|| {
            NboxError::contract(COMPONENT_NAME, format!("no {} for biome '{}'", what, biome))
        })
    }

    fn snapshot(&self) -> StateRecord {
        StateRecord {
            atmos_c: self.atmos_c,
            earth_c: self.earth_c,
            veg_c: self.veg_c.clone(),
            detritus_c: self.detritus_c.clone(),
            soil_c: self.soil_c.clone(),
            ca: self.ca,
            residual: self.residual,
            masstot: self.masstot,
        }
    }

    fn restore(&mut self, record: StateRecord) {
        self.atmos_c = record.atmos_c;
        self.earth_c = record.earth_c;
        self.veg_c = record.veg_c;
        self.detritus_c = record.detritus_c;
        self.soil_c = record.soil_c;
        self.ca = record.ca;
        self.residual = record.residual;
        self.masstot = record.masstot;
    }

    fn history(&self, date: Time) -> NboxResult<&StateRecord> {
        self.state_tv.get_exact(date).ok_or_else(|| {
            NboxError::date(COMPONENT_NAME, format!("no carbon state recorded for {}", date))
        })
    }

    fn require_date(capability: Capability, data: &MessageData) -> NboxResult<Time> {
        data.date.ok_or_else(|| {
            NboxError::date(COMPONENT_NAME, format!("{} requires a date", capability))
        })
    }

    fn forbid_date(capability: Capability, data: &MessageData) -> NboxResult<()> {
        match data.date {
            Some(t) => Err(NboxError::date(
                COMPONENT_NAME,
                format!("{} is not time-dependent, got date {}", capability, t),
            )),
            None => Ok(()),
        }
    }
}

#[typetag::serde]
impl Component for SimpleNbox {
    fn name(&self) -> &str {
        COMPONENT_NAME
    }

    fn init(&mut self, registry: &mut Registry) -> NboxResult<()> {
        for capability in CAPABILITIES {
            registry.register_capability(capability)?;
        }
        for capability in INPUTS {
            registry.register_input(capability)?;
        }
        registry.register_dependency(Capability::GlobalTemp);
        info!(target: COMPONENT_NAME, "hello {}", COMPONENT_NAME);
        Ok(())
    }

    fn set_data(&mut self, capability: Capability, data: MessageData) -> NboxResult<()> {
        let biome = data
            .biome
            .clone()
            .unwrap_or_else(|| SNBOX_DEFAULT_BIOME.to_string());
        debug!(target: COMPONENT_NAME, "set {}[{}] = {}", capability, biome, data.value);

        match capability {
            Capability::PreindustrialCo2 => {
                Self::forbid_date(capability, &data)?;
                let c0 = data.value_in(Unit::PpmvCo2)?;
                ensure_contract!(COMPONENT_NAME, c0 > 0.0, "C0 must be positive, got {}", c0);
                self.c0 = data.value;
            }
            Capability::FfiEmissions | Capability::LucEmissions => {
                let t = Self::require_date(capability, &data)?;
                data.value.expect_unit(Unit::PgCPerYear)?;
                let series = if capability == Capability::FfiEmissions {
                    &mut self.ffi_emissions
                } else {
                    &mut self.luc_emissions
                };
                series.set(t, data.value);
            }
            Capability::Co2Constrain => {
                let t = Self::require_date(capability, &data)?;
                let target = data.value_in(Unit::PpmvCo2)?;
                ensure_contract!(
                    COMPONENT_NAME,
                    target > 0.0,
                    "CO2 constraint must be positive, got {} at {}",
                    target,
                    t
                );
                self.co2_constrain.set(t, data.value);
            }
            Capability::RfTAlbedo => {
                let t = Self::require_date(capability, &data)?;
                data.value.expect_unit(Unit::WattsPerM2)?;
                self.ftalbedo.set(t, data.value);
            }
            Capability::FLucv => {
                Self::forbid_date(capability, &data)?;
                self.f_lucv = data.value_in(Unit::Unitless)?;
            }
            Capability::FLucd => {
                Self::forbid_date(capability, &data)?;
                self.f_lucd = data.value_in(Unit::Unitless)?;
            }
            Capability::EarthC => {
                Self::forbid_date(capability, &data)?;
                let earth_c = FluxPool::try_from(data.value)?;
                earth_c.value(Unit::PgC)?;
                self.earth_c = earth_c;
            }
            Capability::VegC | Capability::DetritusC | Capability::SoilC => {
                Self::forbid_date(capability, &data)?;
                let pool = FluxPool::try_from(data.value)?;
                pool.value(Unit::PgC)?;
                self.ensure_biome(&biome)?;
                let pools = match capability {
                    Capability::VegC => &mut self.veg_c,
                    Capability::DetritusC => &mut self.detritus_c,
                    _ => &mut self.soil_c,
                };
                pools.insert(biome, pool);
            }
            Capability::NppFlux0 => {
                Self::forbid_date(capability, &data)?;
                let npp = FluxPool::try_from(data.value)?;
                npp.value(Unit::PgCPerYear)?;
                self.ensure_biome(&biome)?;
                self.npp_flux0.insert(biome, npp);
            }
            Capability::Beta
            | Capability::Q10Rh
            | Capability::WarmingFactor
            | Capability::FNppv
            | Capability::FNppd
            | Capability::FLitterd => {
                Self::forbid_date(capability, &data)?;
                let value = data.value_in(Unit::Unitless)?;
                self.ensure_biome(&biome)?;
                let map = match capability {
                    Capability::Beta => &mut self.beta,
                    Capability::Q10Rh => &mut self.q10_rh,
                    Capability::WarmingFactor => &mut self.warmingfactor,
                    Capability::FNppv => &mut self.f_nppv,
                    Capability::FNppd => &mut self.f_nppd,
                    _ => &mut self.f_litterd,
                };
                map.insert(biome, value);
            }
            other => return Err(NboxError::unknown_variable(COMPONENT_NAME, other)),
        }
        Ok(())
    }

    fn get_data(&self, capability: Capability, date: Option<Time>) -> NboxResult<UnitVal> {
        let pgc = |v: FloatValue| UnitVal::new(v, Unit::PgC);
        let value = match (capability, date) {
            (Capability::AtmosphericCo2, None) => self.ca,
            (Capability::AtmosphericCo2, Some(t)) => self.history(t)?.ca,
            (Capability::PreindustrialCo2, _) => self.c0,
            (Capability::AtmosphericC, None) => self.atmos_c.into(),
            (Capability::AtmosphericC, Some(t)) => self.history(t)?.atmos_c.into(),
            (Capability::EarthC, None) => self.earth_c.into(),
            (Capability::EarthC, Some(t)) => self.history(t)?.earth_c.into(),
            (Capability::VegC, None) => pgc(self.sum_veg_c()),
            (Capability::VegC, Some(t)) => pgc(Self::sum_pools(&self.history(t)?.veg_c)),
            (Capability::DetritusC, None) => pgc(self.sum_detritus_c()),
            (Capability::DetritusC, Some(t)) => {
                pgc(Self::sum_pools(&self.history(t)?.detritus_c))
            }
            (Capability::SoilC, None) => pgc(self.sum_soil_c()),
            (Capability::SoilC, Some(t)) => pgc(Self::sum_pools(&self.history(t)?.soil_c)),
            (Capability::Co2ConstraintResidual, None) => self.residual,
            (Capability::Co2ConstraintResidual, Some(t)) => self.history(t)?.residual,
            (Capability::AtmosLandFlux, None) => self.atmosland_flux,
            (Capability::AtmosLandFlux, Some(t)) => self.atmosland_flux_ts.require(t)?,
            (Capability::Npp, None) => UnitVal::new(self.sum_npp()?, Unit::PgCPerYear),
            (Capability::Npp, Some(t)) => self.npp_ts.require(t)?,
            (Capability::Rh, None) => UnitVal::new(self.sum_rh()?, Unit::PgCPerYear),
            (Capability::Rh, Some(t)) => self.rh_ts.require(t)?,
            (Capability::RfTAlbedo, date) => self.ftalbedo.get(date.unwrap_or(self.tcurrent))?,
            (Capability::FLucv, _) => UnitVal::new(self.f_lucv, Unit::Unitless),
            (Capability::FLucd, _) => UnitVal::new(self.f_lucd, Unit::Unitless),
            (Capability::FfiEmissions, date) => {
                self.ffi_emissions.get(date.unwrap_or(self.tcurrent))?
            }
            (Capability::LucEmissions, date) => {
                self.luc_emissions.get(date.unwrap_or(self.tcurrent))?
            }
            (Capability::Co2Constrain, date) => {
                self.co2_constrain.require(date.unwrap_or(self.tcurrent))?
            }
            (other, _) => return Err(NboxError::unknown_variable(COMPONENT_NAME, other)),
        };
        Ok(value)
    }

    fn prepare_to_run(&mut self, core: &Core) -> NboxResult<()> {
        info!(target: COMPONENT_NAME, "prepareToRun");
        ensure_contract!(
            COMPONENT_NAME,
            !self.biome_list.is_empty(),
            "no biomes have been configured"
        );

        for biome in &self.biome_list {
            self.warmingfactor.entry(biome.clone()).or_insert(1.0);
        }
        let n = self.biome_list.len();
        let cardinalities = [
            ("veg_c", self.veg_c.len()),
            ("detritus_c", self.detritus_c.len()),
            ("soil_c", self.soil_c.len()),
            ("npp_flux0", self.npp_flux0.len()),
            ("beta", self.beta.len()),
            ("q10_rh", self.q10_rh.len()),
            ("warmingfactor", self.warmingfactor.len()),
            ("f_nppv", self.f_nppv.len()),
            ("f_nppd", self.f_nppd.len()),
            ("f_litterd", self.f_litterd.len()),
        ];
        for (what, len) in cardinalities {
            ensure_contract!(
                COMPONENT_NAME,
                len == n,
                "{} has {} entries for {} biomes",
                what,
                len,
                n
            );
        }

        self.ca = self.c0;
        self.atmos_c = FluxPool::new(self.c0.value(Unit::PpmvCo2)? * PPMVCO2_TO_PGC, Unit::PgC)?;

        self.start_date = core.start_date();
        if self.ftalbedo.is_empty() {
            warn!(
                target: COMPONENT_NAME,
                "no terrestrial albedo forcing supplied, using {} W/m2",
                DEFAULT_TERRESTRIAL_ALBEDO
            );
            let albedo = UnitVal::new(DEFAULT_TERRESTRIAL_ALBEDO, Unit::WattsPerM2);
            self.ftalbedo.set(core.start_date(), albedo);
            self.ftalbedo.set(core.end_date(), albedo);
        }

        for biome in &self.biome_list {
            self.co2fert.insert(biome.clone(), 1.0);
            self.tempfertd.insert(biome.clone(), 1.0);
            self.tempferts.insert(biome.clone(), 1.0);
        }
        self.ode_start_date = core.start_date();
        self.tcurrent = core.start_date();
        self.masstot = 0.0;

        self.sanity_checks()
    }

    fn run(&mut self, t: Time, core: &Core) -> NboxResult<()> {
        self.in_spinup = core.in_spinup();
        self.sanity_checks()?;

        if self.state_tv.is_empty() {
            // State the scenario starts from, after any spinup
            let start = core.start_date();
            self.state_tv.set(start, self.snapshot());
            self.tempferts_tv.set(start, self.tempferts.clone());
        }

        self.tcurrent = t;
        let tgav = core
            .get_data(Capability::GlobalTemp, None)?
            .value(Unit::DegC)?;
        self.tgav_record.set(t, tgav);
        Ok(())
    }

    fn run_spinup(&mut self, _step: usize, _core: &Core) -> NboxResult<bool> {
        self.sanity_checks()?;
        self.in_spinup = true;
        // The solver decides when spinup has converged
        Ok(true)
    }

    fn reset(&mut self, t: Time) -> NboxResult<()> {
        if !self.state_tv.is_empty() {
            let record = self.history(t)?.clone();
            self.restore(record);
        }
        self.state_tv.truncate(t);
        self.atmosland_flux_ts.truncate(t);
        self.npp_ts.truncate(t);
        self.rh_ts.truncate(t);
        self.tempferts_tv.truncate(t);
        self.tgav_record.truncate(t);
        if let Some(flux) = self.atmosland_flux_ts.get_exact(t) {
            self.atmosland_flux = *flux;
        }
        if let Some(tempferts) = self.tempferts_tv.get_exact(t) {
            self.tempferts = tempferts.clone();
        }
        self.ode_start_date = t;
        self.tcurrent = t;
        self.in_spinup = false;
        info!(target: COMPONENT_NAME, "reset to time= {}", t);
        Ok(())
    }

    fn as_carbon_cycle_mut(&mut self) -> Option<&mut dyn CarbonCycleModel> {
        Some(self)
    }
}
