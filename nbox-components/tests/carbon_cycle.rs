//! Carbon cycle tests through the hub
//!
//! These tests couple the terrestrial kernel, the ocean and the solver driver
//! and check behaviour that only shows up once they run together:
//! - Equilibrium is held when nothing perturbs it
//! - Emissions move carbon out of the geological reservoir
//! - Constrained CO2 sends the removed carbon to the deep ocean
//! - Spinup converges and reset replays history

use approx::assert_relative_eq;
use nbox_components::components::{
    CarbonCycleSolver, OceanCarbon, OceanCarbonParameters, SimpleNbox, SimpleNboxParameters,
    SolverOptions,
};
use nbox_components::constants::{
    DETRITUS_RESPIRATION_RATE, DETRITUS_TO_SOIL_RATE, LITTER_RATE, PPMVCO2_TO_PGC,
    SOIL_RESPIRATION_RATE, SNBOX_DEFAULT_BIOME,
};
use nbox_core::capability::Capability;
use nbox_core::hub::{Core, CoreConfig};
use nbox_core::message::MessageData;
use nbox_core::prescribed::PrescribedComponent;
use nbox_core::timeseries::{FloatValue, Time};
use nbox_core::units::{Unit, UnitVal};

/// Parameters whose land pools are already in balance with preindustrial NPP
fn equilibrium_parameters() -> SimpleNboxParameters {
    let mut params = SimpleNboxParameters::default();
    let biome = params
        .biomes
        .get_mut(SNBOX_DEFAULT_BIOME)
        .expect("default biome");
    let npp = biome.npp_flux0;
    let veg = npp * biome.f_nppv / LITTER_RATE;
    let detritus = (npp * biome.f_nppd + LITTER_RATE * veg * biome.f_litterd)
        / (DETRITUS_RESPIRATION_RATE + DETRITUS_TO_SOIL_RATE);
    let soil = (npp * (1.0 - biome.f_nppv - biome.f_nppd)
        + LITTER_RATE * veg * (1.0 - biome.f_litterd)
        + DETRITUS_TO_SOIL_RATE * detritus)
        / SOIL_RESPIRATION_RATE;
    biome.veg_c = veg;
    biome.detritus_c = detritus;
    biome.soil_c = soil;
    params
}

fn build_core(config: CoreConfig, params: &SimpleNboxParameters) -> Core {
    let mut core = Core::new(config).unwrap();
    core.add_component(Box::new(PrescribedComponent::new("climate").with_constant(
        Capability::GlobalTemp,
        UnitVal::new(0.0, Unit::DegC),
    )))
    .unwrap();
    core.add_component(Box::new(SimpleNbox::from_parameters(params).unwrap()))
        .unwrap();
    core.add_component(Box::new(
        OceanCarbon::from_parameters(OceanCarbonParameters::default()).unwrap(),
    ))
    .unwrap();
    core.add_component(Box::new(CarbonCycleSolver::new(SolverOptions::default())))
        .unwrap();
    core
}

fn scenario_core(start: Time, end: Time, params: &SimpleNboxParameters) -> Core {
    build_core(
        CoreConfig {
            start_date: start,
            end_date: end,
            do_spinup: false,
            ..CoreConfig::default()
        },
        params,
    )
}

fn value(core: &Core, capability: Capability, t: Time, unit: Unit) -> FloatValue {
    core.get_data(capability, Some(t))
        .unwrap()
        .value(unit)
        .unwrap()
}

#[test]
fn run_order_puts_solver_after_pools() {
    let mut core = scenario_core(1750.0, 1760.0, &equilibrium_parameters());
    core.prepare_to_run().unwrap();
    assert_eq!(
        core.run_order(),
        vec!["climate", "simpleNbox", "ocean", "carbon_cycle_solver"]
    );
}

#[test]
fn equilibrium_is_held() {
    let mut core = scenario_core(1750.0, 1760.0, &equilibrium_parameters());
    core.run(Some(1751.0)).unwrap();

    assert_relative_eq!(
        value(&core, Capability::AtmosphericCo2, 1751.0, Unit::PpmvCo2),
        277.15,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        value(&core, Capability::EarthC, 1751.0, Unit::PgC),
        5500.0,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        value(&core, Capability::OceanAtmosFlux, 1751.0, Unit::PgCPerYear),
        0.0,
        epsilon = 1e-9
    );
}

#[test]
fn fossil_emissions_drain_earth_pool() {
    let mut core = scenario_core(1900.0, 1920.0, &equilibrium_parameters());
    for year in 1901..=1910 {
        core.set_data(
            Capability::FfiEmissions,
            MessageData::dated(year as Time, UnitVal::new(10.0, Unit::PgCPerYear)),
        )
        .unwrap();
    }
    core.run(Some(1910.0)).unwrap();

    assert_relative_eq!(
        value(&core, Capability::EarthC, 1910.0, Unit::PgC),
        5400.0,
        epsilon = 1e-6
    );
    // Some of the emitted carbon stays in the atmosphere
    let atmos = value(&core, Capability::AtmosphericC, 1910.0, Unit::PgC);
    assert!(atmos > 277.15 * PPMVCO2_TO_PGC);
    assert!(atmos < 277.15 * PPMVCO2_TO_PGC + 100.0);
    // The rest is taken up by the ocean and the fertilized land
    assert!(value(&core, Capability::OceanC, 1910.0, Unit::PgC) > 38000.0);
    assert!(value(&core, Capability::VegC, 1910.0, Unit::PgC) > 562.0);
}

#[test]
fn constrained_co2_goes_to_deep_ocean() {
    let mut core = scenario_core(1900.0, 1920.0, &equilibrium_parameters());
    for year in 1901..=1910 {
        core.set_data(
            Capability::FfiEmissions,
            MessageData::dated(year as Time, UnitVal::new(10.0, Unit::PgCPerYear)),
        )
        .unwrap();
    }
    core.set_data(
        Capability::Co2Constrain,
        MessageData::dated(1905.0, UnitVal::new(270.0, Unit::PpmvCo2)),
    )
    .unwrap();
    core.run(Some(1906.0)).unwrap();

    assert_relative_eq!(
        value(&core, Capability::AtmosphericCo2, 1905.0, Unit::PpmvCo2),
        270.0,
        max_relative = 1e-12
    );
    let residual = value(&core, Capability::Co2ConstraintResidual, 1905.0, Unit::PgC);
    assert!(residual > 0.0);
    assert_relative_eq!(
        value(&core, Capability::DeepOceanC, 1905.0, Unit::PgC),
        residual,
        max_relative = 1e-12
    );
    // Unconstrained years leave the deep ocean alone
    assert_eq!(
        value(&core, Capability::Co2ConstraintResidual, 1906.0, Unit::PgC),
        0.0
    );
    assert_relative_eq!(
        value(&core, Capability::DeepOceanC, 1906.0, Unit::PgC),
        residual,
        max_relative = 1e-12
    );
}

#[test]
fn spinup_reaches_land_equilibrium() {
    let mut core = build_core(
        CoreConfig {
            start_date: 1745.0,
            end_date: 1800.0,
            do_spinup: true,
            max_spinup_steps: 2000,
        },
        &SimpleNboxParameters::default(),
    );
    core.run(Some(1746.0)).unwrap();

    let expected = equilibrium_parameters();
    let biome = &expected.biomes[SNBOX_DEFAULT_BIOME];
    assert_relative_eq!(
        value(&core, Capability::VegC, 1745.0, Unit::PgC),
        biome.veg_c,
        epsilon = 0.1
    );
    assert_relative_eq!(
        value(&core, Capability::SoilC, 1745.0, Unit::PgC),
        biome.soil_c,
        epsilon = 0.1
    );
    // Spinup ends on the preindustrial atmosphere
    assert_relative_eq!(
        value(&core, Capability::AtmosphericCo2, 1745.0, Unit::PpmvCo2),
        277.15,
        max_relative = 1e-12
    );
}

#[test]
fn spinup_gives_up_after_max_steps() {
    let mut core = build_core(
        CoreConfig {
            start_date: 1745.0,
            end_date: 1800.0,
            do_spinup: true,
            max_spinup_steps: 3,
        },
        &SimpleNboxParameters::default(),
    );
    let err = core.prepare_to_run().unwrap_err();
    assert!(matches!(
        err,
        nbox_core::errors::NboxError::SpinupNotConverged { steps: 3 }
    ));
}

#[test]
fn reset_replays_the_same_history() {
    let mut core = scenario_core(1900.0, 1920.0, &equilibrium_parameters());
    for year in 1901..=1915 {
        core.set_data(
            Capability::FfiEmissions,
            MessageData::dated(year as Time, UnitVal::new(8.0, Unit::PgCPerYear)),
        )
        .unwrap();
    }
    core.run(Some(1912.0)).unwrap();
    let atmos = value(&core, Capability::AtmosphericC, 1912.0, Unit::PgC);
    let ocean = value(&core, Capability::OceanC, 1912.0, Unit::PgC);
    let soil = value(&core, Capability::SoilC, 1912.0, Unit::PgC);

    core.reset(1905.0).unwrap();
    assert!(core.get_data(Capability::AtmosphericC, Some(1906.0)).is_err());
    core.run(Some(1912.0)).unwrap();

    assert_relative_eq!(
        value(&core, Capability::AtmosphericC, 1912.0, Unit::PgC),
        atmos,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        value(&core, Capability::OceanC, 1912.0, Unit::PgC),
        ocean,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        value(&core, Capability::SoilC, 1912.0, Unit::PgC),
        soil,
        max_relative = 1e-12
    );
}

#[test]
fn reset_outside_history_is_rejected() {
    let mut core = scenario_core(1900.0, 1920.0, &equilibrium_parameters());
    core.run(Some(1905.0)).unwrap();
    assert!(core.reset(1899.0).is_err());
    assert!(core.reset(1906.0).is_err());
}
