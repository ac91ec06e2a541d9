//! Carbon-cycle solver driver
//!
//! Owns no carbon. Each year it borrows the terrestrial kernel and the ocean
//! through the hub and integrates the coupled six-slot state over the year:
//!
//! ```text
//! get_c_values -> slow_param_eval -> RK4 (calc_derivs) -> stash_c_values
//! ```
//!
//! Carbon removed by an atmospheric constraint is forwarded to the deep ocean
//! with a `DUMP_TO_DEEP_OCEAN` message once both borrows are released.
//!
//! During spinup each step integrates one year and the model is converged once
//! every derivative is smaller than `eps_spinup`.

use log::{debug, info};
use nbox_core::capability::Capability;
use nbox_core::component::Component;
use nbox_core::ensure_contract;
use nbox_core::errors::{NboxError, NboxResult};
use nbox_core::hub::{ComponentId, Core, Registry};
use nbox_core::ivp::{get_last_step, CarbonState, CoupledCarbonSystem, SolverFailures};
use nbox_core::message::{Message, MessageData};
use nbox_core::timeseries::{FloatValue, Time};
use nbox_core::units::UnitVal;
use ode_solvers::Rk4;
use serde::{Deserialize, Serialize};

const COMPONENT_NAME: &str = "carbon_cycle_solver";

/// Solver options for the ODE integration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Fixed RK4 step
    /// unit: yr
    pub step_size: FloatValue,
    /// Largest derivative allowed at spinup convergence
    /// unit: Pg C / yr
    pub eps_spinup: FloatValue,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            step_size: 0.125,
            eps_spinup: 0.001,
        }
    }
}

/// Outcome of one solved year
struct SolvedYear {
    residual: UnitVal,
    derivatives: Option<CarbonState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonCycleSolver {
    options: SolverOptions,
    #[serde(skip)]
    kernel_id: Option<ComponentId>,
    #[serde(skip)]
    ocean_id: Option<ComponentId>,
}

impl Default for CarbonCycleSolver {
    fn default() -> Self {
        Self::new(SolverOptions::default())
    }
}

impl CarbonCycleSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self {
            options,
            kernel_id: None,
            ocean_id: None,
        }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    fn ids(&self) -> NboxResult<(ComponentId, ComponentId)> {
        match (self.kernel_id, self.ocean_id) {
            (Some(kernel), Some(ocean)) => Ok((kernel, ocean)),
            _ => Err(NboxError::contract(
                COMPONENT_NAME,
                "solver used before prepare_to_run",
            )),
        }
    }

    /// Integrate the coupled carbon state from `t0` to `t1`
    fn solve_year(
        &self,
        t0: Time,
        t1: Time,
        core: &Core,
        with_derivatives: bool,
    ) -> NboxResult<SolvedYear> {
        let (kernel_id, ocean_id) = self.ids()?;
        let solved = {
            let mut kernel_ref = core.component_mut(kernel_id)?;
            let mut ocean_ref = core.component_mut(ocean_id)?;
            let kernel = kernel_ref.as_carbon_cycle_mut().ok_or_else(|| {
                NboxError::contract(COMPONENT_NAME, "carbon cycle provider lost its solver interface")
            })?;
            let ocean = ocean_ref.as_ocean_mut().ok_or_else(|| {
                NboxError::contract(COMPONENT_NAME, "ocean provider lost its solver interface")
            })?;

            let mut c = CarbonState::zeros();
            kernel.get_c_values(t0, &mut c, &*ocean)?;
            kernel.slow_param_eval(t0, &c, &mut *ocean, core)?;

            let failures = SolverFailures::new();
            let y_end = {
                let system = CoupledCarbonSystem::new(&*kernel, &*ocean, &failures, COMPONENT_NAME);
                let mut stepper = Rk4::new(system, t0, c, t1, self.options.step_size);
                stepper
                    .integrate()
                    .map_err(|err| NboxError::SolverFailure {
                        component: COMPONENT_NAME.to_string(),
                        message: format!("{:?} while integrating {} to {}", err, t0, t1),
                    })?;
                get_last_step(stepper.results().get(), t1, COMPONENT_NAME)?
            };
            failures.into_result()?;

            let residual = kernel.stash_c_values(t1, &y_end, &mut *ocean)?;
            let derivatives = if with_derivatives {
                let failures = SolverFailures::new();
                let system = CoupledCarbonSystem::new(&*kernel, &*ocean, &failures, COMPONENT_NAME);
                Some(system.derivatives(t1, &y_end)?)
            } else {
                None
            };
            SolvedYear {
                residual,
                derivatives,
            }
        };

        if solved.residual.raw() != 0.0 {
            core.send_message(
                Message::DumpToDeepOcean,
                Capability::OceanC,
                MessageData::dated(t1, solved.residual),
            )?;
        }
        Ok(solved)
    }
}

#[typetag::serde]
impl Component for CarbonCycleSolver {
    fn name(&self) -> &str {
        COMPONENT_NAME
    }

    fn init(&mut self, registry: &mut Registry) -> NboxResult<()> {
        registry.register_dependency(Capability::AtmosphericC);
        registry.register_dependency(Capability::OceanC);
        Ok(())
    }

    fn set_data(&mut self, capability: Capability, _data: MessageData) -> NboxResult<()> {
        Err(NboxError::unknown_variable(COMPONENT_NAME, capability))
    }

    fn get_data(&self, capability: Capability, _date: Option<Time>) -> NboxResult<UnitVal> {
        Err(NboxError::unknown_variable(COMPONENT_NAME, capability))
    }

    fn prepare_to_run(&mut self, core: &Core) -> NboxResult<()> {
        ensure_contract!(
            COMPONENT_NAME,
            self.options.step_size > 0.0 && self.options.step_size <= 1.0,
            "step size must be within (0, 1], got {}",
            self.options.step_size
        );
        ensure_contract!(
            COMPONENT_NAME,
            self.options.eps_spinup > 0.0,
            "spinup tolerance must be positive, got {}",
            self.options.eps_spinup
        );

        let kernel_id = core.component_id(Capability::AtmosphericC)?;
        let ocean_id = core.component_id(Capability::OceanC)?;
        ensure_contract!(
            COMPONENT_NAME,
            core.component_mut(kernel_id)?.as_carbon_cycle_mut().is_some(),
            "{} provides atmos_c but is not a carbon cycle model",
            core.component_name(kernel_id)
        );
        ensure_contract!(
            COMPONENT_NAME,
            core.component_mut(ocean_id)?.as_ocean_mut().is_some(),
            "{} provides ocean_c but is not an ocean carbon model",
            core.component_name(ocean_id)
        );
        info!(
            target: COMPONENT_NAME,
            "coupling {} and {} with step {}",
            core.component_name(kernel_id),
            core.component_name(ocean_id),
            self.options.step_size
        );
        self.kernel_id = Some(kernel_id);
        self.ocean_id = Some(ocean_id);
        Ok(())
    }

    fn run(&mut self, t: Time, core: &Core) -> NboxResult<()> {
        self.solve_year(t - 1.0, t, core, false)?;
        Ok(())
    }

    fn run_spinup(&mut self, step: usize, core: &Core) -> NboxResult<bool> {
        let t1 = step as Time;
        let solved = self.solve_year(t1 - 1.0, t1, core, true)?;
        let largest = solved
            .derivatives
            .map(|dcdt| dcdt.amax())
            .unwrap_or(FloatValue::INFINITY);
        debug!(target: COMPONENT_NAME, "spinup step {}: max |dc/dt| = {}", step, largest);
        Ok(largest < self.options.eps_spinup)
    }

    fn reset(&mut self, t: Time) -> NboxResult<()> {
        debug!(target: COMPONENT_NAME, "reset to {}; no state held", t);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbox_core::hub::CoreConfig;
    use nbox_core::prescribed::PrescribedComponent;
    use nbox_core::units::Unit;

    #[test]
    fn default_options() {
        let options = SolverOptions::default();
        assert_eq!(options.step_size, 0.125);
        assert_eq!(options.eps_spinup, 0.001);
    }

    #[test]
    fn requires_solver_interfaces_from_providers() {
        let mut core = Core::new(CoreConfig {
            start_date: 2000.0,
            end_date: 2010.0,
            do_spinup: false,
            ..CoreConfig::default()
        })
        .unwrap();
        core.add_component(Box::new(
            PrescribedComponent::new("pools")
                .with_constant(Capability::AtmosphericC, UnitVal::new(590.0, Unit::PgC))
                .with_constant(Capability::OceanC, UnitVal::new(38000.0, Unit::PgC)),
        ))
        .unwrap();
        core.add_component(Box::new(CarbonCycleSolver::default()))
            .unwrap();
        let err = core.prepare_to_run().unwrap_err();
        assert!(matches!(err, NboxError::ContractViolation { .. }), "{}", err);
    }

    #[test]
    fn requires_positive_step() {
        let mut core = Core::new(CoreConfig {
            do_spinup: false,
            ..CoreConfig::default()
        })
        .unwrap();
        core.add_component(Box::new(CarbonCycleSolver::new(SolverOptions {
            step_size: 0.0,
            ..SolverOptions::default()
        })))
        .unwrap();
        assert!(core.prepare_to_run().is_err());
    }

    #[test]
    fn solving_before_prepare_is_an_error() {
        let solver = CarbonCycleSolver::default();
        assert!(solver.ids().is_err());
    }
}
