use crate::timeseries::Time;
use crate::units::{Unit, UnitVal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of message routed through the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Ask the provider of a capability for its value
    GetData,
    /// Hand a value to the component registered as the capability's input
    SetData,
    /// Move carbon removed by an atmospheric constraint into the deep ocean
    DumpToDeepOcean,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Message::GetData => "GETDATA",
            Message::SetData => "SETDATA",
            Message::DumpToDeepOcean => "DUMP_TO_DEEP_OCEAN",
        };
        f.write_str(name)
    }
}

/// Payload of a message
///
/// `date` is `None` for undated values (parameters, or "the current date"
/// in a request). `biome` is only meaningful for per-biome terrestrial inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    pub date: Option<Time>,
    pub biome: Option<String>,
    pub value: UnitVal,
}

impl MessageData {
    pub fn new(value: UnitVal) -> Self {
        Self {
            date: None,
            biome: None,
            value,
        }
    }

    pub fn dated(date: Time, value: UnitVal) -> Self {
        Self {
            date: Some(date),
            biome: None,
            value,
        }
    }

    /// An empty request, optionally for a specific date
    pub fn request(date: Option<Time>) -> Self {
        Self {
            date,
            biome: None,
            value: UnitVal::undefined(),
        }
    }

    pub fn for_biome(mut self, biome: &str) -> Self {
        self.biome = Some(biome.to_string());
        self
    }

    pub fn value_in(&self, unit: Unit) -> crate::errors::NboxResult<f64> {
        self.value.value(unit)
    }
}
