//! Unit-tagged scalars
//!
//! Every quantity exchanged between components carries a [`Unit`] tag.
//! Addition and subtraction of [`UnitVal`]s require identical tags and return
//! a [`NboxResult`]; multiplication follows the small unit algebra the forcing
//! calculations need (for example `W/m²/Tg × Tg = W/m²`).
//!
//! [`FluxPool`] is a unit-tagged value that is additionally guaranteed to be
//! non-negative. Carbon pools use it so that a negative pool is a contract
//! violation at the point it is created rather than a silent drift.

use crate::errors::{NboxError, NboxResult};
use crate::timeseries::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, Mul, Neg};

/// The fixed set of units understood by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// W/m²
    WattsPerM2,
    /// ppmv CO₂
    PpmvCo2,
    /// ppbv CH₄
    PpbvCh4,
    /// ppbv N₂O
    PpbvN2o,
    /// Pg C
    PgC,
    /// Pg C / yr
    PgCPerYear,
    /// Gg S
    GgS,
    /// Tg
    Tg,
    /// W/m²/Tg
    WattsPerM2PerTg,
    /// W/m²/Gg
    WattsPerM2PerGg,
    /// °C
    DegC,
    /// Dobson units of tropospheric O₃
    DobsonUnits,
    /// Dimensionless ratio or coefficient
    Unitless,
    /// Placeholder for values that have not been set
    Undefined,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::WattsPerM2 => "W/m2",
            Unit::PpmvCo2 => "ppmv CO2",
            Unit::PpbvCh4 => "ppbv CH4",
            Unit::PpbvN2o => "ppbv N2O",
            Unit::PgC => "Pg C",
            Unit::PgCPerYear => "Pg C/yr",
            Unit::GgS => "Gg S",
            Unit::Tg => "Tg",
            Unit::WattsPerM2PerTg => "W/m2/Tg",
            Unit::WattsPerM2PerGg => "W/m2/Gg",
            Unit::DegC => "degC",
            Unit::DobsonUnits => "DU O3",
            Unit::Unitless => "(unitless)",
            Unit::Undefined => "(undefined)",
        }
    }

    /// Unit of the product `self × other`, if the product is meaningful
    fn product(self, other: Unit) -> Option<Unit> {
        match (self, other) {
            (Unit::Unitless, u) | (u, Unit::Unitless) => Some(u),
            (Unit::WattsPerM2PerTg, Unit::Tg) | (Unit::Tg, Unit::WattsPerM2PerTg) => {
                Some(Unit::WattsPerM2)
            }
            (Unit::WattsPerM2PerGg, Unit::GgS) | (Unit::GgS, Unit::WattsPerM2PerGg) => {
                Some(Unit::WattsPerM2)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A numeric value tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitVal {
    value: FloatValue,
    unit: Unit,
}

impl UnitVal {
    pub fn new(value: FloatValue, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// A zero value whose unit has not been set
    pub fn undefined() -> Self {
        Self::new(0.0, Unit::Undefined)
    }

    pub fn zero(unit: Unit) -> Self {
        Self::new(0.0, unit)
    }

    /// Raw value, without checking the unit
    pub fn raw(&self) -> FloatValue {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Value in `unit`, failing if the tag differs
    pub fn value(&self, unit: Unit) -> NboxResult<FloatValue> {
        self.expect_unit(unit)?;
        Ok(self.value)
    }

    pub fn expect_unit(&self, unit: Unit) -> NboxResult<()> {
        if self.unit != unit {
            return Err(NboxError::UnitMismatch {
                expected: unit,
                got: self.unit,
            });
        }
        Ok(())
    }

    pub fn set(&mut self, value: FloatValue, unit: Unit) {
        self.value = value;
        self.unit = unit;
    }

    pub fn try_add(self, other: UnitVal) -> NboxResult<UnitVal> {
        other.expect_unit(self.unit)?;
        Ok(UnitVal::new(self.value + other.value, self.unit))
    }

    pub fn try_sub(self, other: UnitVal) -> NboxResult<UnitVal> {
        other.expect_unit(self.unit)?;
        Ok(UnitVal::new(self.value - other.value, self.unit))
    }

    /// Product of two tagged values, following the model's unit algebra
    pub fn try_mul(self, other: UnitVal) -> NboxResult<UnitVal> {
        match self.unit.product(other.unit) {
            Some(unit) => Ok(UnitVal::new(self.value * other.value, unit)),
            None => Err(NboxError::UnitMismatch {
                expected: self.unit,
                got: other.unit,
            }),
        }
    }

    /// Ratio of two values with the same unit
    pub fn try_ratio(self, other: UnitVal) -> NboxResult<FloatValue> {
        other.expect_unit(self.unit)?;
        Ok(self.value / other.value)
    }

    /// Compare two values with the same unit
    pub fn try_cmp(&self, other: &UnitVal) -> NboxResult<Option<std::cmp::Ordering>> {
        other.expect_unit(self.unit)?;
        Ok(self.value.partial_cmp(&other.value))
    }
}

impl Mul<FloatValue> for UnitVal {
    type Output = UnitVal;

    fn mul(self, rhs: FloatValue) -> UnitVal {
        UnitVal::new(self.value * rhs, self.unit)
    }
}

impl Div<FloatValue> for UnitVal {
    type Output = UnitVal;

    fn div(self, rhs: FloatValue) -> UnitVal {
        UnitVal::new(self.value / rhs, self.unit)
    }
}

impl Neg for UnitVal {
    type Output = UnitVal;

    fn neg(self) -> UnitVal {
        UnitVal::new(-self.value, self.unit)
    }
}

impl fmt::Display for UnitVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// A non-negative unit-tagged quantity
///
/// Construction and every arithmetic operation check the sign, so a
/// `FluxPool` can never hold a negative amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UnitVal", into = "UnitVal")]
pub struct FluxPool(UnitVal);

impl FluxPool {
    pub fn new(value: FloatValue, unit: Unit) -> NboxResult<Self> {
        if value.is_nan() || value < 0.0 {
            return Err(NboxError::contract(
                "fluxpool",
                format!("pool cannot hold {} {}", value, unit),
            ));
        }
        Ok(Self(UnitVal::new(value, unit)))
    }

    pub fn zero(unit: Unit) -> Self {
        Self(UnitVal::zero(unit))
    }

    pub fn value(&self, unit: Unit) -> NboxResult<FloatValue> {
        self.0.value(unit)
    }

    pub fn raw(&self) -> FloatValue {
        self.0.raw()
    }

    pub fn unit(&self) -> Unit {
        self.0.unit()
    }

    pub fn as_unitval(&self) -> UnitVal {
        self.0
    }

    /// Add a signed change; fails if the result would be negative
    pub fn try_add(self, delta: UnitVal) -> NboxResult<FluxPool> {
        FluxPool::try_from(self.0.try_add(delta)?)
    }

    pub fn try_sub(self, delta: UnitVal) -> NboxResult<FluxPool> {
        FluxPool::try_from(self.0.try_sub(delta)?)
    }

    pub fn scaled(self, factor: FloatValue) -> NboxResult<FluxPool> {
        FluxPool::try_from(self.0 * factor)
    }
}

impl TryFrom<UnitVal> for FluxPool {
    type Error = NboxError;

    fn try_from(value: UnitVal) -> NboxResult<Self> {
        FluxPool::new(value.raw(), value.unit())
    }
}

impl From<FluxPool> for UnitVal {
    fn from(pool: FluxPool) -> Self {
        pool.0
    }
}

impl fmt::Display for FluxPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_requires_matching_units() {
        let a = UnitVal::new(1.0, Unit::PgC);
        let b = UnitVal::new(2.5, Unit::PgC);
        assert_eq!(a.try_add(b).unwrap(), UnitVal::new(3.5, Unit::PgC));

        let c = UnitVal::new(2.5, Unit::PpmvCo2);
        let err = a.try_add(c).unwrap_err();
        assert!(matches!(
            err,
            NboxError::UnitMismatch {
                expected: Unit::PgC,
                got: Unit::PpmvCo2
            }
        ));
    }

    #[test]
    fn value_checks_unit() {
        let v = UnitVal::new(277.15, Unit::PpmvCo2);
        assert_eq!(v.value(Unit::PpmvCo2).unwrap(), 277.15);
        assert!(v.value(Unit::PgC).is_err());
    }

    #[test]
    fn aerosol_coefficient_times_emissions_is_forcing() {
        let rho = UnitVal::new(-7.24e-6, Unit::WattsPerM2PerGg);
        let emissions = UnitVal::new(50_000.0, Unit::GgS);
        let forcing = rho.try_mul(emissions).unwrap();
        assert_eq!(forcing.unit(), Unit::WattsPerM2);
        assert!((forcing.raw() + 0.362).abs() < 1e-12);

        assert!(rho.try_mul(UnitVal::new(1.0, Unit::Tg)).is_err());
    }

    #[test]
    fn scalar_operations_keep_unit() {
        let v = UnitVal::new(4.0, Unit::WattsPerM2);
        assert_eq!(v * 0.5, UnitVal::new(2.0, Unit::WattsPerM2));
        assert_eq!(v / 4.0, UnitVal::new(1.0, Unit::WattsPerM2));
        assert_eq!(-v, UnitVal::new(-4.0, Unit::WattsPerM2));
    }

    #[test]
    fn fluxpool_rejects_negative() {
        assert!(FluxPool::new(-1.0, Unit::PgC).is_err());
        assert!(FluxPool::new(f64::NAN, Unit::PgC).is_err());

        let pool = FluxPool::new(10.0, Unit::PgC).unwrap();
        let drained = pool.try_sub(UnitVal::new(10.0, Unit::PgC)).unwrap();
        assert_eq!(drained.raw(), 0.0);
        assert!(pool.try_sub(UnitVal::new(10.5, Unit::PgC)).is_err());
        assert!(pool.try_add(UnitVal::new(1.0, Unit::PgCPerYear)).is_err());
    }

    #[test]
    fn fluxpool_serializes_as_unitval() {
        let pool = FluxPool::new(550.0, Unit::PgC).unwrap();
        let json = serde_json::to_string(&pool).unwrap();
        let back: FluxPool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);

        let negative = r#"{"value":-1.0,"unit":"PgC"}"#;
        assert!(serde_json::from_str::<FluxPool>(negative).is_err());
    }
}
