//! A numeric value paired with a [`Dimension`] and an optional preferred
//! display unit.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;
use crate::units::Unit;

/// A `Quantity` stores its magnitude in SI base units internally; the
/// `preferred_unit` is carried only for display and re-solve purposes and
/// never affects arithmetic.
#[derive(Debug, Clone)]
pub struct Quantity {
    si_value: f64,
    dimension: Dimension,
    preferred_unit: Option<Arc<Unit>>,
}

impl Quantity {
    /// Build a quantity from a raw value expressed in `unit`.
    #[must_use]
    pub fn new(value: f64, unit: &Arc<Unit>) -> Self {
        Self {
            si_value: unit.to_si(value),
            dimension: unit.dimension(),
            preferred_unit: Some(Arc::clone(unit)),
        }
    }

    /// Build a quantity directly from an SI-base-unit value and dimension,
    /// with no preferred display unit.
    #[must_use]
    pub const fn from_si(si_value: f64, dimension: Dimension) -> Self {
        Self {
            si_value,
            dimension,
            preferred_unit: None,
        }
    }

    /// Build a dimensionless quantity (e.g. a bare number or ratio).
    #[must_use]
    pub const fn dimensionless(value: f64) -> Self {
        Self::from_si(value, Dimension::dimensionless())
    }

    /// The quantity's value in SI base units.
    #[must_use]
    pub const fn to_si(&self) -> f64 {
        self.si_value
    }

    /// The quantity's dimension.
    #[must_use]
    pub const fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// The preferred display unit, if one was recorded.
    #[must_use]
    pub fn preferred_unit(&self) -> Option<&Arc<Unit>> {
        self.preferred_unit.as_ref()
    }

    /// Reassign the preferred display unit without changing the underlying
    /// SI value. Used by `Problem::resolve` to keep a variable's display
    /// unit stable across re-solves.
    pub fn set_preferred_unit(&mut self, unit: Arc<Unit>) {
        self.preferred_unit = Some(unit);
    }

    /// Whether this quantity is exactly zero and dimensionless. Such a value
    /// is treated as a universal zero for comparison purposes.
    fn is_universal_zero(&self) -> bool {
        self.si_value == 0.0 && self.dimension.is_dimensionless()
    }

    /// Read this quantity's value expressed in `unit`.
    ///
    /// # Errors
    /// Returns [`EngineError::UnitConversionError`] if `unit`'s dimension
    /// does not match this quantity's.
    pub fn value_in(&self, unit: &Unit) -> EngineResult<f64> {
        if unit.dimension() != self.dimension {
            return Err(EngineError::UnitConversionError {
                from: self.dimension.to_string(),
                to: unit.name().to_owned(),
                reason: "dimension mismatch".to_owned(),
            });
        }
        Ok(unit.from_si(self.si_value))
    }

    /// Read this quantity's value in its preferred unit, falling back to the
    /// SI value when none was recorded.
    #[must_use]
    pub fn preferred_value(&self) -> f64 {
        match &self.preferred_unit {
            Some(unit) => unit.from_si(self.si_value),
            None => self.si_value,
        }
    }

    /// `self + other`.
    ///
    /// # Errors
    /// Returns [`EngineError::DimensionMismatch`] unless both operands share
    /// the same dimension.
    pub fn add(&self, other: &Self) -> EngineResult<Self> {
        if self.dimension != other.dimension {
            return Err(EngineError::dimension_mismatch("+", self.dimension, other.dimension));
        }
        Ok(Self {
            si_value: self.si_value + other.si_value,
            dimension: self.dimension,
            preferred_unit: self.preferred_unit.clone(),
        })
    }

    /// `self - other`.
    ///
    /// # Errors
    /// See [`Self::add`].
    pub fn sub(&self, other: &Self) -> EngineResult<Self> {
        if self.dimension != other.dimension {
            return Err(EngineError::dimension_mismatch("-", self.dimension, other.dimension));
        }
        Ok(Self {
            si_value: self.si_value - other.si_value,
            dimension: self.dimension,
            preferred_unit: self.preferred_unit.clone(),
        })
    }

    /// `self * other`. Always defined: dimensions combine multiplicatively.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            si_value: self.si_value * other.si_value,
            dimension: self.dimension.mul(&other.dimension),
            preferred_unit: None,
        }
    }

    /// `self / other`. Always combines dimensions by division, even when
    /// `other` is a dimensionless value of exactly `1.0` — the result must
    /// still carry `self.dimension.div(&other.dimension)`, not a
    /// short-circuited copy of `self`, so that a dimensionless divisor is
    /// never silently mistaken for a no-op.
    ///
    /// # Errors
    /// Returns [`EngineError::DivisionByZero`] if `other`'s SI value is
    /// exactly zero.
    pub fn div(&self, other: &Self) -> EngineResult<Self> {
        if other.si_value == 0.0 {
            return Err(EngineError::DivisionByZero {
                dividend: format!("{}", self.si_value),
            });
        }
        Ok(Self {
            si_value: self.si_value / other.si_value,
            dimension: self.dimension.div(&other.dimension),
            preferred_unit: None,
        })
    }

    /// `self^k` for an integer exponent.
    #[must_use]
    pub fn powi(&self, k: i32) -> Self {
        Self {
            si_value: self.si_value.powi(k),
            dimension: self.dimension.pow(k),
            preferred_unit: None,
        }
    }

    /// `self^exponent`, where `exponent` must be dimensionless. When
    /// `exponent`'s SI value is within `1e-12` of an integer the integer
    /// path ([`Self::powi`]) is used so the result dimension stays exact;
    /// otherwise the dimension degrades to the inexact signature produced by
    /// [`Dimension::pow_f64`].
    ///
    /// # Errors
    /// Returns [`EngineError::DimensionMismatch`] if `exponent` is not
    /// dimensionless.
    pub fn pow(&self, exponent: &Self) -> EngineResult<Self> {
        if !exponent.dimension.is_dimensionless() {
            return Err(EngineError::dimension_mismatch(
                "^",
                Dimension::dimensionless(),
                exponent.dimension,
            ));
        }
        let k = exponent.si_value;
        let rounded = k.round();
        if (k - rounded).abs() <= 1e-12 {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "already checked to be within 1e-12 of an i32-representable integer"
            )]
            return Ok(self.powi(rounded as i32));
        }
        Ok(Self {
            si_value: self.si_value.powf(k),
            dimension: self.dimension.pow_f64(k),
            preferred_unit: None,
        })
    }

    /// `-self`.
    #[must_use]
    pub fn neg(&self) -> Self {
        Self {
            si_value: -self.si_value,
            dimension: self.dimension,
            preferred_unit: self.preferred_unit.clone(),
        }
    }

    /// Order this quantity against `other`.
    ///
    /// A dimensionless quantity whose value is exactly zero compares against
    /// any other quantity's sign regardless of dimension (the
    /// comparison-to-dimensionless-zero exception), so that expressions like
    /// `length > 0` type-check without requiring a `0 * meter` literal.
    ///
    /// # Errors
    /// Returns [`EngineError::DimensionMismatch`] when dimensions differ and
    /// neither side is a universal zero.
    pub fn compare(&self, other: &Self) -> EngineResult<Ordering> {
        if self.dimension == other.dimension {
            return self
                .si_value
                .partial_cmp(&other.si_value)
                .ok_or_else(|| EngineError::ExpressionEvaluationError {
                    expression: "comparison".to_owned(),
                    reason: "NaN operand".to_owned(),
                });
        }
        if other.is_universal_zero() {
            return self
                .si_value
                .partial_cmp(&0.0)
                .ok_or_else(|| EngineError::ExpressionEvaluationError {
                    expression: "comparison".to_owned(),
                    reason: "NaN operand".to_owned(),
                });
        }
        if self.is_universal_zero() {
            return 0.0_f64
                .partial_cmp(&other.si_value)
                .ok_or_else(|| EngineError::ExpressionEvaluationError {
                    expression: "comparison".to_owned(),
                    reason: "NaN operand".to_owned(),
                });
        }
        Err(EngineError::dimension_mismatch("compare", self.dimension, other.dimension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::LENGTH;

    fn meter() -> Arc<Unit> {
        Arc::new(Unit::scaled("meter", "m", Dimension::base(LENGTH), 1.0, true))
    }

    #[test]
    fn add_requires_matching_dimension() {
        let m = meter();
        let a = Quantity::new(2.0, &m);
        let b = Quantity::new(3.0, &m);
        let sum = a.add(&b).expect("same dimension");
        assert!((sum.to_si() - 5.0).abs() < 1e-12);

        let dimensionless = Quantity::dimensionless(1.0);
        assert!(a.add(&dimensionless).is_err());
    }

    #[test]
    fn dividing_by_dimensionless_one_still_recombines_dimension() {
        let m = meter();
        let length = Quantity::new(4.0, &m);
        let one = Quantity::dimensionless(1.0);
        let result = length.div(&one).expect("division by nonzero");
        assert_eq!(result.dimension(), length.dimension().div(&Dimension::dimensionless()));
        assert_eq!(result.dimension(), length.dimension());
        assert!((result.to_si() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let m = meter();
        let a = Quantity::new(1.0, &m);
        let zero = Quantity::dimensionless(0.0);
        assert!(matches!(a.div(&zero), Err(EngineError::DivisionByZero { .. })));
    }

    #[test]
    fn universal_zero_compares_against_any_dimension() {
        let m = meter();
        let length = Quantity::new(5.0, &m);
        let zero = Quantity::dimensionless(0.0);
        assert_eq!(length.compare(&zero).unwrap(), Ordering::Greater);
        assert_eq!(zero.compare(&length).unwrap(), Ordering::Less);
    }

    #[test]
    fn pow_with_dimensioned_exponent_is_rejected() {
        let m = meter();
        let length = Quantity::new(2.0, &m);
        let bad_exponent = Quantity::new(2.0, &m);
        assert!(matches!(length.pow(&bad_exponent), Err(EngineError::DimensionMismatch { .. })));
    }

    #[test]
    fn pow_with_near_integer_exponent_stays_exact() {
        let m = meter();
        let length = Quantity::new(3.0, &m);
        let squared = length.pow(&Quantity::dimensionless(2.0)).expect("integer power");
        assert!((squared.to_si() - 9.0).abs() < 1e-12);
        assert_eq!(squared.dimension(), Dimension::base(LENGTH).pow(2));
    }

    #[test]
    fn mismatched_nonzero_dimensions_cannot_compare() {
        let m = meter();
        let length = Quantity::new(5.0, &m);
        let mass = Quantity::from_si(2.0, Dimension::base(crate::dimension::MASS));
        assert!(matches!(
            length.compare(&mass),
            Err(EngineError::DimensionMismatch { .. })
        ));
    }
}
