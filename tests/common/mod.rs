//! Shared unit fixtures for the integration suites in this directory.
//! Not a test binary itself — included via `mod common;` from each one.

use std::sync::Arc;

use qnty_core::{Dimension, Unit};

/// Length dimension index, mirrored here so test files don't need to reach
/// into the crate's internal module layout.
pub const LENGTH: usize = 0;
/// Mass dimension index.
pub const MASS: usize = 1;
/// Time dimension index.
pub const TIME: usize = 2;

#[must_use]
pub fn meter() -> Arc<Unit> {
    Arc::new(Unit::scaled("meter", "m", Dimension::base(LENGTH), 1.0, true))
}

#[must_use]
pub fn inch() -> Arc<Unit> {
    Arc::new(Unit::scaled("inch", "in", Dimension::base(LENGTH), 0.0254, false))
}

#[must_use]
pub fn pressure_dimension() -> Dimension {
    // L^-1 M^1 T^-2, the signature of force/area.
    Dimension::from_exponents([-1, 1, -2, 0, 0, 0, 0])
}

#[must_use]
pub fn psi() -> Arc<Unit> {
    Arc::new(Unit::scaled("pound_force_per_square_inch", "psi", pressure_dimension(), 6894.757_293_168_361, false))
}

#[must_use]
pub fn pascal() -> Arc<Unit> {
    Arc::new(Unit::scaled("pascal", "Pa", pressure_dimension(), 1.0, true))
}
