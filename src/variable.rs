//! A named, possibly-unknown slot for a [`Quantity`] within a [`crate::problem::Problem`].

use std::sync::Arc;

use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;
use crate::quantity::Quantity;
use crate::units::Unit;

/// How a [`Variable`]'s current value was established.
///
/// The distinction drives the re-solve protocol (§4.9): a `Given` value was
/// set by the caller and survives a re-solve; a `Derived` value was produced
/// by a previous `Problem::solve` and is discarded so it gets recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// The caller supplied this value directly.
    Given,
    /// The solver computed this value on a previous `solve()`.
    Derived,
}

/// A named slot for a [`Quantity`] inside a [`crate::problem::Problem`].
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    symbol: String,
    expected_dimension: Dimension,
    quantity: Option<Quantity>,
    source: Option<ValueSource>,
    preferred_unit: Option<Arc<Unit>>,
    output_unit: Option<Arc<Unit>>,
    discrete_value: Option<String>,
}

impl Variable {
    /// Declare an unknown variable with the given expected dimension.
    #[must_use]
    pub fn unknown(name: impl Into<String>, symbol: impl Into<String>, expected_dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            expected_dimension,
            quantity: None,
            source: None,
            preferred_unit: None,
            output_unit: None,
            discrete_value: None,
        }
    }

    /// Declare a known variable with a caller-supplied value.
    ///
    /// # Errors
    /// Returns [`EngineError::DimensionMismatch`] if `quantity`'s dimension
    /// does not match `expected_dimension`.
    pub fn given(
        name: impl Into<String>,
        symbol: impl Into<String>,
        expected_dimension: Dimension,
        quantity: Quantity,
    ) -> EngineResult<Self> {
        if quantity.dimension() != expected_dimension {
            return Err(EngineError::dimension_mismatch("variable declaration", expected_dimension, quantity.dimension()));
        }
        let preferred_unit = quantity.preferred_unit().cloned();
        Ok(Self {
            name: name.into(),
            symbol: symbol.into(),
            expected_dimension,
            quantity: Some(quantity),
            source: Some(ValueSource::Given),
            preferred_unit,
            output_unit: None,
            discrete_value: None,
        })
    }

    /// Declare a discrete (`SelectVariable`) variable, holding a named option
    /// rather than a continuous quantity. Still carries a dimension so the
    /// surrounding Problem's symbol table is uniform, typically
    /// [`Dimension::dimensionless`].
    #[must_use]
    pub fn discrete(name: impl Into<String>, symbol: impl Into<String>, selected: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            expected_dimension: Dimension::dimensionless(),
            quantity: None,
            source: Some(ValueSource::Given),
            preferred_unit: None,
            output_unit: None,
            discrete_value: Some(selected.into()),
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier, unique within its Problem.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The dimension this variable's quantity must carry once known.
    #[must_use]
    pub const fn expected_dimension(&self) -> Dimension {
        self.expected_dimension
    }

    /// The current value, if known.
    #[must_use]
    pub fn quantity(&self) -> Option<&Quantity> {
        self.quantity.as_ref()
    }

    /// Whether this variable currently holds a known value (continuous or
    /// discrete).
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.quantity.is_some() || self.discrete_value.is_some()
    }

    /// Whether the current value was supplied by the caller rather than
    /// derived by a previous solve.
    #[must_use]
    pub fn is_given(&self) -> bool {
        matches!(self.source, Some(ValueSource::Given))
    }

    /// The discrete selection, if this is a `SelectVariable`.
    #[must_use]
    pub fn discrete_value(&self) -> Option<&str> {
        self.discrete_value.as_deref()
    }

    /// The unit new solved values (or re-displayed given values) should be
    /// expressed in. Falls back to the quantity's own preferred unit, then
    /// to the explicit `output_unit` override if one was set.
    #[must_use]
    pub fn preferred_unit(&self) -> Option<&Arc<Unit>> {
        self.output_unit.as_ref().or(self.preferred_unit.as_ref())
    }

    /// Override the display unit, independent of whatever unit a supplied
    /// value originally carried.
    pub fn set_output_unit(&mut self, unit: Arc<Unit>) {
        self.output_unit = Some(unit);
    }

    /// Assign a caller-supplied value, replacing any prior quantity. The
    /// variable's `preferred_unit` is preserved if the new quantity does not
    /// carry its own, matching the "preferred_unit survives reassignment"
    /// invariant.
    ///
    /// # Errors
    /// Returns [`EngineError::DimensionMismatch`] if `quantity`'s dimension
    /// does not match [`Self::expected_dimension`].
    pub fn set_given(&mut self, mut quantity: Quantity) -> EngineResult<()> {
        if quantity.dimension() != self.expected_dimension {
            return Err(EngineError::dimension_mismatch("variable assignment", self.expected_dimension, quantity.dimension()));
        }
        if quantity.preferred_unit().is_none() {
            if let Some(unit) = &self.preferred_unit {
                quantity.set_preferred_unit(Arc::clone(unit));
            }
        } else {
            self.preferred_unit = quantity.preferred_unit().cloned();
        }
        self.quantity = Some(quantity);
        self.source = Some(ValueSource::Given);
        self.discrete_value = None;
        Ok(())
    }

    /// Rewrite this variable's symbol in place, used when a sub-problem's
    /// variables are namespaced under a parent's `{prefix}_` during
    /// composition. The variable's value and metadata are untouched.
    pub(crate) fn rename_to(&mut self, symbol: String) {
        self.symbol = symbol;
    }

    /// Change the discrete selection of a `SelectVariable`.
    pub fn set_discrete(&mut self, selected: impl Into<String>) {
        self.discrete_value = Some(selected.into());
        self.quantity = None;
        self.source = Some(ValueSource::Given);
    }

    /// Record a value produced by the solver. Always preserves
    /// `preferred_unit` across the assignment (§4.9), re-expressing the
    /// solved SI value in whatever unit was already on file for display.
    pub(crate) fn set_derived(&mut self, mut quantity: Quantity) {
        if let Some(unit) = &self.preferred_unit {
            quantity.set_preferred_unit(Arc::clone(unit));
        }
        self.quantity = Some(quantity);
        self.source = Some(ValueSource::Derived);
    }

    /// Revert a `Derived` value back to unknown, per the re-solve protocol
    /// (§4.9). `Given` values are untouched.
    pub(crate) fn revert_if_derived(&mut self) {
        if self.source == Some(ValueSource::Derived) {
            self.quantity = None;
            self.source = None;
        }
    }
}
