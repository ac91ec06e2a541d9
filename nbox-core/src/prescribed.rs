//! Externally prescribed quantities
//!
//! [`PrescribedComponent`] answers GETDATA for any capability it has been given
//! data for, either an undated constant or a dated series. It stands in for
//! the parts of a full model that are outside the carbon cycle and forcing
//! core: temperature, non-CO₂ concentrations, emissions, halocarbon forcing
//! and volcanic forcing.

use crate::capability::Capability;
use crate::component::Component;
use crate::errors::{NboxError, NboxResult};
use crate::hub::{Core, Registry};
use crate::message::MessageData;
use crate::timeseries::{Time, TimeSeries};
use crate::units::UnitVal;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescribedComponent {
    name: String,
    constants: BTreeMap<Capability, UnitVal>,
    series: BTreeMap<Capability, TimeSeries<UnitVal>>,
    current_date: Option<Time>,
}

impl PrescribedComponent {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            constants: BTreeMap::new(),
            series: BTreeMap::new(),
            current_date: None,
        }
    }

    /// Serve `value` for `capability` whatever date is requested
    pub fn with_constant(mut self, capability: Capability, value: UnitVal) -> Self {
        self.constants.insert(capability, value);
        self
    }

    /// Serve `capability` from dated samples, interpolating between them
    pub fn with_series(
        mut self,
        capability: Capability,
        samples: impl IntoIterator<Item = (Time, UnitVal)>,
    ) -> Self {
        let ts = self.series_mut(capability);
        for (t, v) in samples {
            ts.set(t, v);
        }
        self
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.constants.keys().chain(self.series.keys()).copied()
    }

    fn series_mut(&mut self, capability: Capability) -> &mut TimeSeries<UnitVal> {
        self.series
            .entry(capability)
            .or_insert_with(|| TimeSeries::new(&capability.name()).with_interpolation(true))
    }
}

#[typetag::serde]
impl Component for PrescribedComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, registry: &mut Registry) -> NboxResult<()> {
        let capabilities: Vec<Capability> = self.capabilities().collect();
        for capability in capabilities {
            registry.register_capability(capability)?;
            registry.register_input(capability)?;
        }
        info!(
            target: "prescribed",
            "{} serves {} quantities",
            self.name,
            self.constants.len() + self.series.len()
        );
        Ok(())
    }

    fn set_data(&mut self, capability: Capability, data: MessageData) -> NboxResult<()> {
        match data.date {
            Some(t) => {
                self.constants.remove(&capability);
                self.series_mut(capability).set(t, data.value);
            }
            None => {
                self.constants.insert(capability, data.value);
            }
        }
        Ok(())
    }

    fn get_data(&self, capability: Capability, date: Option<Time>) -> NboxResult<UnitVal> {
        if let Some(value) = self.constants.get(&capability) {
            return Ok(*value);
        }
        let series = self
            .series
            .get(&capability)
            .ok_or_else(|| NboxError::unknown_variable(&self.name, capability))?;
        let t = date.or(self.current_date).ok_or_else(|| {
            NboxError::date(
                &self.name,
                format!("{} requested before the first run without a date", capability),
            )
        })?;
        series.get(t)
    }

    fn prepare_to_run(&mut self, core: &Core) -> NboxResult<()> {
        self.current_date = Some(core.start_date());
        Ok(())
    }

    fn run(&mut self, t: Time, _core: &Core) -> NboxResult<()> {
        self.current_date = Some(t);
        debug!(target: "prescribed", "{} at {}", self.name, t);
        Ok(())
    }

    fn reset(&mut self, t: Time) -> NboxResult<()> {
        // Inputs are not model output, so nothing is truncated
        self.current_date = Some(t);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn default_component() -> PrescribedComponent {
        PrescribedComponent::new("climate")
            .with_series(
                Capability::GlobalTemp,
                [
                    (1850.0, UnitVal::new(0.0, Unit::DegC)),
                    (1950.0, UnitVal::new(1.0, Unit::DegC)),
                ],
            )
            .with_constant(
                Capability::PreindustrialCh4,
                UnitVal::new(731.41, Unit::PpbvCh4),
            )
    }

    #[test]
    fn serves_constants_and_series() {
        let mut component = default_component();
        component.current_date = Some(1900.0);
        let temp = component.get_data(Capability::GlobalTemp, None).unwrap();
        assert!((temp.value(Unit::DegC).unwrap() - 0.5).abs() < 1e-12);
        let temp = component
            .get_data(Capability::GlobalTemp, Some(1950.0))
            .unwrap();
        assert_eq!(temp.raw(), 1.0);
        let m0 = component
            .get_data(Capability::PreindustrialCh4, Some(2000.0))
            .unwrap();
        assert_eq!(m0.value(Unit::PpbvCh4).unwrap(), 731.41);
    }

    #[test]
    fn unknown_and_out_of_range_requests_fail() {
        let component = default_component();
        assert!(component.get_data(Capability::AtmosphericO3, Some(1900.0)).is_err());
        assert!(component.get_data(Capability::GlobalTemp, Some(2000.0)).is_err());
        // No current date before the first run
        assert!(component.get_data(Capability::GlobalTemp, None).is_err());
    }

    #[test]
    fn set_data_extends_series() {
        let mut component = default_component();
        component
            .set_data(
                Capability::GlobalTemp,
                MessageData::dated(2050.0, UnitVal::new(2.0, Unit::DegC)),
            )
            .unwrap();
        let temp = component
            .get_data(Capability::GlobalTemp, Some(2000.0))
            .unwrap();
        assert!((temp.raw() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn round_trips_through_serde() {
        let component: Box<dyn Component> = Box::new(default_component());
        let json = serde_json::to_string(&component).unwrap();
        let back: Box<dyn Component> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "climate");
        let m0 = back.get_data(Capability::PreindustrialCh4, None).unwrap();
        assert_eq!(m0.raw(), 731.41);
    }
}
