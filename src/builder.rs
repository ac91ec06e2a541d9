//! Assemble a ready-to-run hub from configuration

use crate::config::ModelConfig;
use log::info;
use nbox_components::components::{
    CarbonCycleSolver, ForcingAggregator, OceanCarbon, SimpleNbox,
};
use nbox_core::errors::NboxResult;
use nbox_core::hub::{Core, CoreConfig};
use nbox_core::prescribed::PrescribedComponent;

/// Build a [`Core`] holding the standard set of components.
///
/// Components are added in this order:
///
/// 1. prescribed data (temperature, other gases, emissions, halocarbon forcing)
/// 2. the SimpleNbox terrestrial carbon cycle
/// 3. the ocean carbon model
/// 4. the carbon-cycle solver driver
/// 5. the forcing aggregator
///
/// The hub orders components by their dependencies and falls back to this
/// order for components with no dependency between them. The solver and the
/// forcing aggregator are such a pair, so CO₂ for a year is always solved before
/// its forcing is computed.
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    config: ModelConfig,
    prescribed: Vec<PrescribedComponent>,
    without_forcing: bool,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: ModelConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Override the run settings of the hub
    pub fn with_core_config(&mut self, core: CoreConfig) -> &mut Self {
        self.config.core = core;
        self
    }

    /// Supply data that no model component computes
    ///
    /// Each prescribed component needs a unique name.
    pub fn with_prescribed(&mut self, component: PrescribedComponent) -> &mut Self {
        self.prescribed.push(component);
        self
    }

    /// Leave the forcing aggregator out, for carbon-cycle-only runs
    pub fn without_forcing(&mut self) -> &mut Self {
        self.without_forcing = true;
        self
    }

    pub fn build(&self) -> NboxResult<Core> {
        let mut core = Core::new(self.config.core.clone())?;

        for component in &self.prescribed {
            core.add_component(Box::new(component.clone()))?;
        }
        core.add_component(Box::new(SimpleNbox::from_parameters(
            &self.config.simple_nbox,
        )?))?;
        core.add_component(Box::new(OceanCarbon::from_parameters(
            self.config.ocean.clone(),
        )?))?;
        core.add_component(Box::new(CarbonCycleSolver::new(
            self.config.solver.clone(),
        )))?;
        if !self.without_forcing {
            core.add_component(Box::new(ForcingAggregator::from_parameters(
                &self.config.forcing,
            )?))?;
        }

        info!(
            target: "builder",
            "built model from {} to {}",
            self.config.core.start_date,
            self.config.core.end_date
        );
        Ok(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbox_core::capability::Capability;
    use nbox_core::errors::NboxError;
    use nbox_core::units::{Unit, UnitVal};

    fn climate() -> PrescribedComponent {
        PrescribedComponent::new("climate")
            .with_constant(Capability::GlobalTemp, UnitVal::new(0.0, Unit::DegC))
    }

    fn default_builder() -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        builder
            .with_core_config(CoreConfig {
                start_date: 1750.0,
                end_date: 1800.0,
                do_spinup: false,
                ..CoreConfig::default()
            })
            .with_prescribed(climate());
        builder
    }

    #[test]
    fn solver_runs_before_forcing() {
        let mut core = default_builder().build().unwrap();
        core.prepare_to_run().unwrap();
        assert_eq!(
            core.run_order(),
            vec![
                "climate",
                "simpleNbox",
                "ocean",
                "carbon_cycle_solver",
                "forcing"
            ]
        );
    }

    #[test]
    fn forcing_can_be_left_out() {
        let mut builder = default_builder();
        let core = builder.without_forcing().build().unwrap();
        assert!(!core.check_capability(Capability::RfTotal));
        assert!(core.check_capability(Capability::AtmosphericCo2));
    }

    #[test]
    fn duplicate_prescribed_names_fail() {
        let mut builder = default_builder();
        builder.with_prescribed(climate());
        let err = builder.build().unwrap_err();
        assert!(matches!(err, NboxError::ContractViolation { .. }), "{}", err);
    }

    #[test]
    fn overlapping_prescribed_data_fails() {
        let mut builder = default_builder();
        builder.with_prescribed(
            PrescribedComponent::new("more_climate")
                .with_constant(Capability::GlobalTemp, UnitVal::new(1.0, Unit::DegC)),
        );
        let err = builder.build().unwrap_err();
        assert!(matches!(err, NboxError::CapabilityConflict { .. }), "{}", err);
    }

    #[test]
    fn invalid_parameters_fail_at_build() {
        let mut config = ModelConfig::default();
        config.ocean.exchange_rate = -1.0;
        let err = ModelBuilder::from_config(config).build().unwrap_err();
        assert!(matches!(err, NboxError::ContractViolation { .. }), "{}", err);
    }
}
