//! Date-indexed series
//!
//! A [`TimeSeries`] keeps its dates sorted and supports exact lookup, linear
//! interpolation between bracketing dates (when enabled), truncation and
//! export to `ndarray` arrays. Values can be anything `Clone`; interpolation
//! is only available for values implementing [`Interpolate`].

use crate::errors::{NboxError, NboxResult};
use crate::units::{Unit, UnitVal};
use ndarray::Array1;
use num::Float;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub type Time = f64;
pub type FloatValue = f64;

/// Linear interpolation between `a` at fraction 0 and `b` at fraction 1
pub fn lerp<F: Float>(a: F, b: F, frac: F) -> F {
    a + (b - a) * frac
}

/// Values that can be linearly interpolated between two samples
pub trait Interpolate: Sized {
    fn interpolate(lower: &Self, upper: &Self, frac: FloatValue) -> NboxResult<Self>;
}

impl Interpolate for FloatValue {
    fn interpolate(lower: &Self, upper: &Self, frac: FloatValue) -> NboxResult<Self> {
        Ok(lerp(*lower, *upper, frac))
    }
}

impl Interpolate for UnitVal {
    fn interpolate(lower: &Self, upper: &Self, frac: FloatValue) -> NboxResult<Self> {
        upper.expect_unit(lower.unit())?;
        Ok(UnitVal::new(
            lerp(lower.raw(), upper.raw(), frac),
            lower.unit(),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries<V> {
    name: String,
    allow_interp: bool,
    times: Vec<Time>,
    values: Vec<V>,
}

impl<V> Default for TimeSeries<V> {
    fn default() -> Self {
        Self::new("unnamed")
    }
}

impl<V> TimeSeries<V> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            allow_interp: false,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn with_interpolation(mut self, allow: bool) -> Self {
        self.allow_interp = allow;
        self
    }

    pub fn allow_interp(&mut self, allow: bool) {
        self.allow_interp = allow;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn search(&self, t: Time) -> Result<usize, usize> {
        self.times.binary_search_by(|probe| probe.total_cmp(&t))
    }

    /// Insert or replace the value at `t`
    pub fn set(&mut self, t: Time, value: V) {
        match self.search(t) {
            Ok(idx) => self.values[idx] = value,
            Err(idx) => {
                self.times.insert(idx, t);
                self.values.insert(idx, value);
            }
        }
    }

    pub fn exists(&self, t: Time) -> bool {
        self.search(t).is_ok()
    }

    pub fn get_exact(&self, t: Time) -> Option<&V> {
        self.search(t).ok().map(|idx| &self.values[idx])
    }

    pub fn first_date(&self) -> Option<Time> {
        self.times.first().copied()
    }

    pub fn last_date(&self) -> Option<Time> {
        self.times.last().copied()
    }

    pub fn size(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Whether [`TimeSeries::get`] can produce a value at `t`
    pub fn covers(&self, t: Time) -> bool {
        if self.exists(t) {
            return true;
        }
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => self.allow_interp && first <= t && t <= last,
            _ => false,
        }
    }

    /// Drop every entry dated after `t`
    pub fn truncate(&mut self, t: Time) {
        let keep = self
            .times
            .partition_point(|probe| probe.total_cmp(&t) != Ordering::Greater);
        self.times.truncate(keep);
        self.values.truncate(keep);
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, &V)> {
        self.times.iter().copied().zip(self.values.iter())
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    fn out_of_range(&self, t: Time) -> NboxError {
        NboxError::ExtrapolationNotAllowed {
            target: t,
            series: self.name.clone(),
            first: self.first_date().unwrap_or(Time::nan()),
            last: self.last_date().unwrap_or(Time::nan()),
        }
    }
}

impl<V: Clone + Interpolate> TimeSeries<V> {
    /// Value at `t`, interpolating between bracketing dates when allowed
    pub fn get(&self, t: Time) -> NboxResult<V> {
        let upper = match self.search(t) {
            Ok(idx) => return Ok(self.values[idx].clone()),
            Err(idx) => idx,
        };
        if !self.allow_interp || upper == 0 || upper == self.times.len() {
            return Err(self.out_of_range(t));
        }
        let (t0, t1) = (self.times[upper - 1], self.times[upper]);
        let frac = (t - t0) / (t1 - t0);
        V::interpolate(&self.values[upper - 1], &self.values[upper], frac)
    }
}

impl<V: Clone> TimeSeries<V> {
    /// Exact lookup that fails with a descriptive error when `t` is absent
    pub fn require(&self, t: Time) -> NboxResult<V> {
        self.get_exact(t).cloned().ok_or_else(|| self.out_of_range(t))
    }
}

impl TimeSeries<UnitVal> {
    /// Dates and raw values as arrays, checking every value is in `unit`
    pub fn to_arrays(&self, unit: Unit) -> NboxResult<(Array1<Time>, Array1<FloatValue>)> {
        let values = self
            .values
            .iter()
            .map(|v| v.value(unit))
            .collect::<NboxResult<Vec<_>>>()?;
        Ok((Array1::from(self.times.clone()), Array1::from(values)))
    }
}

impl TimeSeries<FloatValue> {
    pub fn to_arrays(&self) -> (Array1<Time>, Array1<FloatValue>) {
        (
            Array1::from(self.times.clone()),
            Array1::from(self.values.clone()),
        )
    }
}

/// A series whose samples are whole maps, keyed by date
pub type NestedTimeSeries<K> = TimeSeries<BTreeMap<K, UnitVal>>;

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    fn co2_series() -> TimeSeries<UnitVal> {
        let mut ts = TimeSeries::new("CO2_constrain").with_interpolation(true);
        ts.set(2000.0, UnitVal::new(370.0, Unit::PpmvCo2));
        ts.set(1990.0, UnitVal::new(350.0, Unit::PpmvCo2));
        ts.set(2010.0, UnitVal::new(390.0, Unit::PpmvCo2));
        ts
    }

    #[test]
    fn dates_are_kept_sorted() {
        let ts = co2_series();
        assert_eq!(ts.times(), &[1990.0, 2000.0, 2010.0]);
        assert_eq!(ts.first_date(), Some(1990.0));
        assert_eq!(ts.last_date(), Some(2010.0));
        assert_eq!(ts.size(), 3);
    }

    #[test]
    fn set_replaces_existing_date() {
        let mut ts = co2_series();
        ts.set(2000.0, UnitVal::new(371.0, Unit::PpmvCo2));
        assert_eq!(ts.size(), 3);
        assert_eq!(ts.get(2000.0).unwrap().raw(), 371.0);
    }

    #[test]
    fn interpolates_between_samples() {
        let ts = co2_series();
        let v = ts.get(1995.0).unwrap();
        assert!(is_close!(v.raw(), 360.0), "Expected 360.0, got {}", v);
        assert_eq!(v.unit(), Unit::PpmvCo2);
        assert!(ts.covers(2005.5));
        assert!(!ts.covers(2011.0));
    }

    #[test]
    fn no_interpolation_when_disabled() {
        let mut ts = co2_series();
        ts.allow_interp(false);
        assert!(ts.get(1995.0).is_err());
        assert!(!ts.covers(1995.0));
        assert!(ts.get(2000.0).is_ok());
    }

    #[test]
    fn extrapolation_is_an_error() {
        let ts = co2_series();
        match ts.get(1980.0) {
            Err(NboxError::ExtrapolationNotAllowed { target, first, last, .. }) => {
                assert_eq!(target, 1980.0);
                assert_eq!(first, 1990.0);
                assert_eq!(last, 2010.0);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(ts.get(2020.0).is_err());
    }

    #[test]
    fn truncate_drops_later_dates() {
        let mut ts = co2_series();
        ts.truncate(2000.0);
        assert_eq!(ts.last_date(), Some(2000.0));
        assert!(ts.exists(2000.0));
        assert!(!ts.exists(2010.0));

        ts.truncate(1900.0);
        assert!(ts.is_empty());
    }

    #[test]
    fn mixed_units_fail_to_interpolate() {
        let mut ts = TimeSeries::new("bad").with_interpolation(true);
        ts.set(0.0, UnitVal::new(0.0, Unit::PgC));
        ts.set(1.0, UnitVal::new(1.0, Unit::WattsPerM2));
        assert!(ts.get(0.5).is_err());
    }

    #[test]
    fn arrays_check_units() {
        let ts = co2_series();
        let (times, values) = ts.to_arrays(Unit::PpmvCo2).unwrap();
        assert_eq!(times.len(), 3);
        assert_eq!(values[2], 390.0);
        assert!(ts.to_arrays(Unit::PgC).is_err());
    }

    #[test]
    fn nested_series_exact_lookup() {
        let mut ts: NestedTimeSeries<String> = TimeSeries::new("forcings");
        let mut map = BTreeMap::new();
        map.insert("RF_CO2".to_string(), UnitVal::new(1.5, Unit::WattsPerM2));
        ts.set(1850.0, map);
        assert_eq!(ts.require(1850.0).unwrap()["RF_CO2"].raw(), 1.5);
        assert!(ts.require(1851.0).is_err());
    }
}
