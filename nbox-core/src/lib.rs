//! Core of the nbox carbon cycle and forcing model
//!
//! This crate holds everything the physical components share: unit-tagged
//! values, time series, the capability names used to exchange data, the
//! [`component::Component`] trait and the hub ([`hub::Core`]) that owns and
//! drives components.

pub mod capability;
pub mod component;
pub mod errors;
pub mod hub;
pub mod ivp;
pub mod message;
pub mod prescribed;
pub mod timeseries;
pub mod units;
