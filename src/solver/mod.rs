//! The residual (numerical) solver for coupled equation subsystems that
//! single-target analytic inversion (§4.4) cannot resolve.

mod residual;

pub use residual::{solve, UnknownSpec};
