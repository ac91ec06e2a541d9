//! Named quantities exchanged through the hub
//!
//! Each [`Capability`] is a quantity some component provides (GETDATA), accepts
//! (SETDATA) or both. The string form of each capability is the name used in
//! configuration files and log messages.
//!
//! The halocarbon forcings come in two flavours: the raw forcing computed by a
//! halocarbon component ([`Capability::HaloForcing`], `RF_<gas>`) and the
//! base-year adjusted forcing served by the forcing aggregator
//! ([`Capability::HaloForcingAdjusted`], `RFADJ_<gas>`).
//! [`Capability::raw_forcing`] translates the latter into the former.

use crate::errors::NboxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The halocarbons whose forcing feeds into total forcing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Halocarbon {
    CF4,
    C2F6,
    HFC23,
    HFC32,
    HFC4310,
    HFC125,
    HFC134a,
    HFC143a,
    HFC227ea,
    HFC245fa,
    SF6,
    CFC11,
    CFC12,
    CFC113,
    CFC114,
    CFC115,
    CCl4,
    CH3CCl3,
    HCFC22,
    HCFC141b,
    HCFC142b,
    Halon1211,
    Halon1301,
    Halon2402,
    CH3Cl,
    CH3Br,
}

impl Halocarbon {
    pub const ALL: [Halocarbon; 26] = [
        Halocarbon::CF4,
        Halocarbon::C2F6,
        Halocarbon::HFC23,
        Halocarbon::HFC32,
        Halocarbon::HFC4310,
        Halocarbon::HFC125,
        Halocarbon::HFC134a,
        Halocarbon::HFC143a,
        Halocarbon::HFC227ea,
        Halocarbon::HFC245fa,
        Halocarbon::SF6,
        Halocarbon::CFC11,
        Halocarbon::CFC12,
        Halocarbon::CFC113,
        Halocarbon::CFC114,
        Halocarbon::CFC115,
        Halocarbon::CCl4,
        Halocarbon::CH3CCl3,
        Halocarbon::HCFC22,
        Halocarbon::HCFC141b,
        Halocarbon::HCFC142b,
        Halocarbon::Halon1211,
        Halocarbon::Halon1301,
        Halocarbon::Halon2402,
        Halocarbon::CH3Cl,
        Halocarbon::CH3Br,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Halocarbon::CF4 => "CF4",
            Halocarbon::C2F6 => "C2F6",
            Halocarbon::HFC23 => "HFC23",
            Halocarbon::HFC32 => "HFC32",
            Halocarbon::HFC4310 => "HFC4310",
            Halocarbon::HFC125 => "HFC125",
            Halocarbon::HFC134a => "HFC134a",
            Halocarbon::HFC143a => "HFC143a",
            Halocarbon::HFC227ea => "HFC227ea",
            Halocarbon::HFC245fa => "HFC245fa",
            Halocarbon::SF6 => "SF6",
            Halocarbon::CFC11 => "CFC11",
            Halocarbon::CFC12 => "CFC12",
            Halocarbon::CFC113 => "CFC113",
            Halocarbon::CFC114 => "CFC114",
            Halocarbon::CFC115 => "CFC115",
            Halocarbon::CCl4 => "CCl4",
            Halocarbon::CH3CCl3 => "CH3CCl3",
            Halocarbon::HCFC22 => "HCFC22",
            Halocarbon::HCFC141b => "HCFC141b",
            Halocarbon::HCFC142b => "HCFC142b",
            Halocarbon::Halon1211 => "halon1211",
            Halocarbon::Halon1301 => "halon1301",
            Halocarbon::Halon2402 => "halon2402",
            Halocarbon::CH3Cl => "CH3Cl",
            Halocarbon::CH3Br => "CH3Br",
        }
    }
}

/// Every quantity that can be requested from or sent to a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Capability {
    // Climate
    GlobalTemp,

    // Atmospheric state
    AtmosphericCo2,
    PreindustrialCo2,
    AtmosphericCh4,
    PreindustrialCh4,
    AtmosphericN2o,
    PreindustrialN2o,
    AtmosphericO3,
    Co2Constrain,

    // Carbon pools and fluxes
    AtmosphericC,
    VegC,
    DetritusC,
    SoilC,
    EarthC,
    OceanC,
    DeepOceanC,
    OceanAtmosFlux,
    AtmosLandFlux,
    Npp,
    Rh,
    Co2ConstraintResidual,
    FfiEmissions,
    LucEmissions,

    // Terrestrial parameters
    NppFlux0,
    Beta,
    Q10Rh,
    WarmingFactor,
    FNppv,
    FNppd,
    FLitterd,
    FLucv,
    FLucd,

    // Emissions consumed by the forcing aggregator
    EmissionsBc,
    EmissionsOc,
    EmissionsSo2,
    NaturalSo2,
    VolcanicForcing,

    // Forcing outputs
    RfTotal,
    RfBaseyear,
    RfCo2,
    RfCh4,
    RfN2o,
    RfH2oStrat,
    RfO3Trop,
    RfBc,
    RfOc,
    RfSo2,
    RfVol,
    RfTAlbedo,
    HaloForcing(Halocarbon),
    HaloForcingAdjusted(Halocarbon),

    // Forcing parameters
    ACo2,
    DeltaCh4,
    DeltaN2o,
    DeltaCo2,
    RhoBc,
    RhoOc,
    RhoSo2,
    FtotConstrain,
}

const SIMPLE: [Capability; 57] = [
    Capability::GlobalTemp,
    Capability::AtmosphericCo2,
    Capability::PreindustrialCo2,
    Capability::AtmosphericCh4,
    Capability::PreindustrialCh4,
    Capability::AtmosphericN2o,
    Capability::PreindustrialN2o,
    Capability::AtmosphericO3,
    Capability::Co2Constrain,
    Capability::AtmosphericC,
    Capability::VegC,
    Capability::DetritusC,
    Capability::SoilC,
    Capability::EarthC,
    Capability::OceanC,
    Capability::DeepOceanC,
    Capability::OceanAtmosFlux,
    Capability::AtmosLandFlux,
    Capability::Npp,
    Capability::Rh,
    Capability::Co2ConstraintResidual,
    Capability::FfiEmissions,
    Capability::LucEmissions,
    Capability::NppFlux0,
    Capability::Beta,
    Capability::Q10Rh,
    Capability::WarmingFactor,
    Capability::FNppv,
    Capability::FNppd,
    Capability::FLitterd,
    Capability::FLucv,
    Capability::FLucd,
    Capability::EmissionsBc,
    Capability::EmissionsOc,
    Capability::EmissionsSo2,
    Capability::NaturalSo2,
    Capability::VolcanicForcing,
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
    Capability::RfTAlbedo,
    Capability::ACo2,
    Capability::DeltaCh4,
    Capability::DeltaN2o,
    Capability::DeltaCo2,
    Capability::RhoBc,
    Capability::RhoOc,
    Capability::RhoSo2,
    Capability::FtotConstrain,
];

const HALO_PREFIX: &str = "RF_";
const HALO_ADJUSTED_PREFIX: &str = "RFADJ_";

impl Capability {
    /// Every capability, halocarbon variants included
    pub fn all() -> impl Iterator<Item = Capability> {
        SIMPLE
            .iter()
            .copied()
            .chain(Halocarbon::ALL.iter().map(|h| Capability::HaloForcing(*h)))
            .chain(
                Halocarbon::ALL
                    .iter()
                    .map(|h| Capability::HaloForcingAdjusted(*h)),
            )
    }

    /// The raw forcing behind a base-year adjusted halocarbon name
    ///
    /// Every other capability maps to itself.
    pub fn raw_forcing(self) -> Capability {
        match self {
            Capability::HaloForcingAdjusted(h) => Capability::HaloForcing(h),
            other => other,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Capability::HaloForcing(h) => format!("{}{}", HALO_PREFIX, h.name()),
            Capability::HaloForcingAdjusted(h) => format!("{}{}", HALO_ADJUSTED_PREFIX, h.name()),
            other => other.simple_name().to_string(),
        }
    }

    fn simple_name(&self) -> &'static str {
        match self {
            Capability::GlobalTemp => "Tgav",
            Capability::AtmosphericCo2 => "Ca",
            Capability::PreindustrialCo2 => "C0",
            Capability::AtmosphericCh4 => "CH4",
            Capability::PreindustrialCh4 => "preindustrial_CH4",
            Capability::AtmosphericN2o => "N2O",
            Capability::PreindustrialN2o => "preindustrial_N2O",
            Capability::AtmosphericO3 => "O3",
            Capability::Co2Constrain => "CO2_constrain",
            Capability::AtmosphericC => "atmos_c",
            Capability::VegC => "veg_c",
            Capability::DetritusC => "detritus_c",
            Capability::SoilC => "soil_c",
            Capability::EarthC => "earth_c",
            Capability::OceanC => "ocean_c",
            Capability::DeepOceanC => "deep_ocean_c",
            Capability::OceanAtmosFlux => "atm_ocean_flux",
            Capability::AtmosLandFlux => "atmosland_flux",
            Capability::Npp => "NPP",
            Capability::Rh => "RH",
            Capability::Co2ConstraintResidual => "CO2_constraint_residual",
            Capability::FfiEmissions => "ffi_emissions",
            Capability::LucEmissions => "luc_emissions",
            Capability::NppFlux0 => "npp_flux0",
            Capability::Beta => "beta",
            Capability::Q10Rh => "q10_rh",
            Capability::WarmingFactor => "warmingfactor",
            Capability::FNppv => "f_nppv",
            Capability::FNppd => "f_nppd",
            Capability::FLitterd => "f_litterd",
            Capability::FLucv => "f_lucv",
            Capability::FLucd => "f_lucd",
            Capability::EmissionsBc => "BC_emissions",
            Capability::EmissionsOc => "OC_emissions",
            Capability::EmissionsSo2 => "SO2_emissions",
            Capability::NaturalSo2 => "SN",
            Capability::VolcanicForcing => "SV",
            Capability::RfTotal => "RF_TOTAL",
            Capability::RfBaseyear => "RF_BASEYEAR",
            Capability::RfCo2 => "RF_CO2",
            Capability::RfCh4 => "RF_CH4",
            Capability::RfN2o => "RF_N2O",
            Capability::RfH2oStrat => "RF_H2O_STRAT",
            Capability::RfO3Trop => "RF_O3_TROP",
            Capability::RfBc => "RF_BC",
            Capability::RfOc => "RF_OC",
            Capability::RfSo2 => "RF_SO2",
            Capability::RfVol => "RF_VOL",
            Capability::RfTAlbedo => "RF_T_ALBEDO",
            Capability::ACo2 => "aCO2",
            Capability::DeltaCh4 => "delta_ch4",
            Capability::DeltaN2o => "delta_n2o",
            Capability::DeltaCo2 => "delta_co2",
            Capability::RhoBc => "rho_bc",
            Capability::RhoOc => "rho_oc",
            Capability::RhoSo2 => "rho_so2",
            Capability::FtotConstrain => "FTOT_CONSTRAIN",
            Capability::HaloForcing(_) | Capability::HaloForcingAdjusted(_) => "",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Capability {
    type Err = NboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::all()
            .find(|c| c.name() == s)
            .ok_or_else(|| NboxError::UnknownCapability(s.to_string()))
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.name()
    }
}

impl TryFrom<String> for Capability {
    type Error = NboxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_parse_back() {
        let mut seen = HashSet::new();
        for capability in Capability::all() {
            let name = capability.name();
            assert!(!name.is_empty(), "{:?} has no name", capability);
            assert!(seen.insert(name.clone()), "duplicate name {}", name);
            assert_eq!(name.parse::<Capability>().unwrap(), capability);
        }
        assert_eq!(seen.len(), 57 + 2 * 26);
    }

    #[test]
    fn halocarbon_names() {
        assert_eq!(Capability::HaloForcing(Halocarbon::CFC12).name(), "RF_CFC12");
        assert_eq!(
            Capability::HaloForcingAdjusted(Halocarbon::Halon1211).name(),
            "RFADJ_halon1211"
        );
        assert_eq!(
            "RFADJ_HFC134a".parse::<Capability>().unwrap(),
            Capability::HaloForcingAdjusted(Halocarbon::HFC134a)
        );
    }

    #[test]
    fn adjusted_names_translate_to_raw() {
        for h in Halocarbon::ALL {
            assert_eq!(
                Capability::HaloForcingAdjusted(h).raw_forcing(),
                Capability::HaloForcing(h)
            );
        }
        assert_eq!(Capability::RfCo2.raw_forcing(), Capability::RfCo2);
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert!(matches!(
            "RF_UNOBTAINIUM".parse::<Capability>(),
            Err(NboxError::UnknownCapability(_))
        ));
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Capability::HaloForcing(Halocarbon::SF6)).unwrap();
        assert_eq!(json, "\"RF_SF6\"");
        let back: Capability = serde_json::from_str("\"delta_ch4\"").unwrap();
        assert_eq!(back, Capability::DeltaCh4);
    }
}
