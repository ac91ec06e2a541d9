use crate::capability::Capability;
use crate::errors::{NboxError, NboxResult};
use crate::hub::{Core, Registry};
use crate::ivp::{CarbonCycleModel, OceanCarbonModel};
use crate::message::{Message, MessageData};
use crate::timeseries::Time;
use crate::units::UnitVal;
use std::fmt::Debug;

/// A model component attached to the hub
///
/// Lifecycle, driven by [`Core`]:
///
/// 1. `init` registers capabilities, dependencies and inputs.
/// 2. Inputs arrive through `set_data`.
/// 3. `prepare_to_run` validates the configuration once.
/// 4. Optional spinup: `run_spinup` is called until every component reports convergence.
/// 5. `run` is called once per year, in dependency order.
/// 6. `reset` rewinds the component to an earlier date.
/// 7. `shut_down` releases anything acquired in `init`.
///
/// Components never hold references to each other. Anything a component needs
/// from another one is requested through the hub with [`Core::get_data`].
#[typetag::serde(tag = "type")]
pub trait Component: Debug {
    fn name(&self) -> &str;

    fn init(&mut self, registry: &mut Registry) -> NboxResult<()>;

    fn set_data(&mut self, capability: Capability, data: MessageData) -> NboxResult<()>;

    /// Value of `capability` at `date`, or at the component's current date when `None`
    fn get_data(&self, capability: Capability, date: Option<Time>) -> NboxResult<UnitVal>;

    /// Messages other than GETDATA and SETDATA
    fn handle_message(
        &mut self,
        message: Message,
        capability: Capability,
        _data: MessageData,
    ) -> NboxResult<UnitVal> {
        Err(NboxError::contract(
            self.name(),
            format!("cannot handle {} for {}", message, capability),
        ))
    }

    fn prepare_to_run(&mut self, core: &Core) -> NboxResult<()>;

    fn run(&mut self, t: Time, core: &Core) -> NboxResult<()>;

    /// One spinup step; returns `true` once this component has converged
    fn run_spinup(&mut self, _step: usize, _core: &Core) -> NboxResult<bool> {
        Ok(true)
    }

    fn reset(&mut self, t: Time) -> NboxResult<()>;

    fn shut_down(&mut self) {
        log::info!(target: "nbox", "goodbye {}", self.name());
    }

    fn as_carbon_cycle_mut(&mut self) -> Option<&mut dyn CarbonCycleModel> {
        None
    }

    fn as_ocean_mut(&mut self) -> Option<&mut dyn OceanCarbonModel> {
        None
    }
}
