//! Contract between the carbon-cycle solver and the models it integrates
//!
//! The solver works on a flat six-slot state vector ([`CarbonState`]). The
//! terrestrial kernel owns every slot except [`CarbonPool::Ocean`], which
//! belongs to the ocean model. Within one solver year the calls are strictly
//! ordered:
//!
//! ```text
//! get_c_values -> slow_param_eval -> calc_derivs (repeated) -> stash_c_values
//! ```
//!
//! `calc_derivs` may be called at any sub-year date the integrator chooses and
//! must not mutate the model.

use crate::errors::{NboxError, NboxResult};
use crate::hub::Core;
use crate::timeseries::{FloatValue, Time};
use crate::units::UnitVal;
use is_close::is_close;
use ode_solvers::{System, Vector6};
use std::cell::RefCell;

/// Flat carbon state handed to the integrator, in Pg C
pub type CarbonState = Vector6<FloatValue>;

/// Slot positions inside [`CarbonState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarbonPool {
    Atmosphere = 0,
    Vegetation = 1,
    Detritus = 2,
    Soil = 3,
    Ocean = 4,
    Earth = 5,
}

impl CarbonPool {
    pub const fn idx(self) -> usize {
        self as usize
    }
}

/// Status reported by a derivative evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Success,
    Failure,
}

/// The ocean side of the carbon cycle
///
/// Only the [`CarbonPool::Ocean`] slot is read or written by the ocean; the
/// atmosphere slot is read to compute the air-sea flux.
pub trait OceanCarbonModel {
    fn get_c_values(&self, t: Time, c: &mut CarbonState);

    /// Write `d(ocean)/dt` into `dcdt`. The atmosphere-ocean flux is that same value.
    fn calc_derivs(&self, t: Time, c: &CarbonState, dcdt: &mut CarbonState) -> SolverStatus;

    fn slow_param_eval(&mut self, t: Time, c: &CarbonState) -> NboxResult<()>;

    fn stash_c_values(&mut self, t: Time, c: &CarbonState) -> NboxResult<()>;

    /// Carbon moved out of the tracked ocean pool into the deep reservoir
    fn dump_to_deep_ocean(&mut self, residual: UnitVal) -> NboxResult<()>;
}

/// The terrestrial kernel as seen by the solver
pub trait CarbonCycleModel {
    /// Fill `c` from the current pools and mark `t` as the start of the step
    fn get_c_values(
        &mut self,
        t: Time,
        c: &mut CarbonState,
        ocean: &dyn OceanCarbonModel,
    ) -> NboxResult<()>;

    /// Derivatives of every slot at `t`, returning the ocean's status
    fn calc_derivs(
        &self,
        t: Time,
        c: &CarbonState,
        dcdt: &mut CarbonState,
        ocean: &dyn OceanCarbonModel,
    ) -> NboxResult<SolverStatus>;

    fn slow_param_eval(
        &mut self,
        t: Time,
        c: &CarbonState,
        ocean: &mut dyn OceanCarbonModel,
        core: &Core,
    ) -> NboxResult<()>;

    /// Write the integrated state back, returning the carbon removed by an
    /// atmospheric constraint (zero when no constraint applied)
    fn stash_c_values(
        &mut self,
        t: Time,
        c: &CarbonState,
        ocean: &mut dyn OceanCarbonModel,
    ) -> NboxResult<UnitVal>;
}

/// First failure seen while the integrator was running
///
/// `System::system` cannot fail, and the integrator takes ownership of the
/// system it drives, so errors are parked here and inspected afterwards.
#[derive(Debug, Default)]
pub struct SolverFailures {
    first: RefCell<Option<NboxError>>,
}

impl SolverFailures {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, error: NboxError) {
        let mut first = self.first.borrow_mut();
        if first.is_none() {
            *first = Some(error);
        }
    }

    pub fn into_result(self) -> NboxResult<()> {
        match self.first.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Adapts a kernel and its ocean to `ode_solvers`
pub struct CoupledCarbonSystem<'a> {
    kernel: &'a dyn CarbonCycleModel,
    ocean: &'a dyn OceanCarbonModel,
    failures: &'a SolverFailures,
    component: &'a str,
}

impl<'a> CoupledCarbonSystem<'a> {
    pub fn new(
        kernel: &'a dyn CarbonCycleModel,
        ocean: &'a dyn OceanCarbonModel,
        failures: &'a SolverFailures,
        component: &'a str,
    ) -> Self {
        Self {
            kernel,
            ocean,
            failures,
            component,
        }
    }

    /// Derivatives at `t`, propagating any failure immediately
    pub fn derivatives(&self, t: Time, c: &CarbonState) -> NboxResult<CarbonState> {
        let mut dcdt = CarbonState::zeros();
        match self.kernel.calc_derivs(t, c, &mut dcdt, self.ocean)? {
            SolverStatus::Success => Ok(dcdt),
            SolverStatus::Failure => Err(NboxError::SolverFailure {
                component: self.component.to_string(),
                message: format!("ocean derivative failed at {}", t),
            }),
        }
    }
}

impl<'a> System<Time, CarbonState> for CoupledCarbonSystem<'a> {
    fn system(&self, t: Time, y: &CarbonState, dy: &mut CarbonState) {
        match self.derivatives(t, y) {
            Ok(dcdt) => *dy = dcdt,
            Err(err) => {
                self.failures.record(err);
                dy.fill(0.0);
            }
        }
    }
}

/// Last state of an integration, checking it landed on `t_expected`
pub fn get_last_step(
    results: (&Vec<Time>, &Vec<CarbonState>),
    t_expected: Time,
    component: &str,
) -> NboxResult<CarbonState> {
    let (times, states) = results;
    match (times.last(), states.last()) {
        (Some(t), Some(state)) if is_close!(*t, t_expected) => Ok(*state),
        (Some(t), _) => Err(NboxError::SolverFailure {
            component: component.to_string(),
            message: format!("integration stopped at {} instead of {}", t, t_expected),
        }),
        _ => Err(NboxError::SolverFailure {
            component: component.to_string(),
            message: "integration produced no output".to_string(),
        }),
    }
}
