//! Levenberg-Marquardt-style numerical root-finding for coupled equation
//! subsystems the topological pass (§4.5) cannot resolve one variable at a
//! time.
//!
//! Deliberately hand-rolled rather than built on `nalgebra`: the crate's
//! dependency stack stays aligned with the teacher, and an N-by-N dense
//! solve at N in the tens (the scale any hand-composed engineering Problem
//! reaches) needs nothing more than `Vec<Vec<f64>>` and Gaussian
//! elimination.

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;
use crate::equation::Equation;
use crate::expr::Env;
use crate::quantity::Quantity;

const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_RTOL: f64 = 1e-10;
const CONVERGENCE_ATOL: f64 = 1e-9;
const INITIAL_DAMPING: f64 = 1e-3;

/// One unknown handed to the residual solver: its symbol, expected
/// dimension, starting guess (in SI units), and a conditioning scale factor.
///
/// Per §9's open question on scaled variables, `scale` should be the
/// unknown's preferred unit's `si_factor` (or `1.0` if it has none) so the
/// solver iterates in roughly unit-magnitude coordinates rather than raw SI
/// values, which can span many orders of magnitude (e.g. pressures in
/// pascals vs. lengths in meters).
#[derive(Debug, Clone)]
pub struct UnknownSpec {
    /// The variable's symbol, matching an [`Env`] binding key.
    pub symbol: String,
    /// The dimension the solved value must carry.
    pub dimension: Dimension,
    /// Starting guess, in SI base units.
    pub initial_si: f64,
    /// Conditioning scale; the solver's internal coordinate is
    /// `initial_si / scale`.
    pub scale: f64,
}

/// Solve `equations` for `unknowns` by numerical least squares, starting
/// from each unknown's `initial_si` guess and every other free variable
/// bound in `env`.
///
/// # Errors
/// Returns [`EngineError::SolverDiverged`] if the iteration cap is reached
/// without satisfying the convergence tolerance from §4.6; propagates
/// evaluation or dimension errors from the equations themselves.
pub fn solve(equations: &[Equation], unknowns: &[UnknownSpec], env: &Env) -> EngineResult<FxHashMap<String, f64>> {
    let n = unknowns.len();
    debug!("residual solver: {n} unknown(s) across {} equation(s)", equations.len());
    if n == 0 {
        return Ok(FxHashMap::default());
    }

    let mut x: Vec<f64> = unknowns
        .iter()
        .map(|u| if u.scale.abs() > f64::EPSILON { u.initial_si / u.scale } else { u.initial_si })
        .collect();

    let mut lambda = INITIAL_DAMPING;
    let mut residual = evaluate_residuals(equations, unknowns, &x, env)?;
    let mut residual_norm = norm(&residual);

    for iteration in 0..MAX_ITERATIONS {
        if converged(&residual_norm, &x) {
            debug!("residual solver converged after {iteration} iteration(s), ||F|| = {residual_norm:e}");
            return Ok(unknowns
                .iter()
                .zip(x.iter())
                .map(|(u, &scaled)| (u.symbol.clone(), scaled * scale_or_one(u.scale)))
                .collect());
        }

        let jacobian = numerical_jacobian(equations, unknowns, &x, env)?;
        let (jt_j, jt_r) = normal_equations(&jacobian, &residual);

        loop {
            let mut damped = jt_j.clone();
            for (i, row) in damped.iter_mut().enumerate() {
                row[i] += lambda * jt_j[i][i].max(1e-12);
            }
            let Some(delta) = gaussian_solve(&damped, &jt_r) else {
                lambda *= 10.0;
                if lambda > 1e12 {
                    return Err(EngineError::SolverDiverged { residual_norm, iterations: iteration });
                }
                continue;
            };

            let trial: Vec<f64> = x.iter().zip(delta.iter()).map(|(&xi, &di)| xi - di).collect();
            let trial_residual = evaluate_residuals(equations, unknowns, &trial, env)?;
            let trial_norm = norm(&trial_residual);

            if trial_norm < residual_norm {
                trace!("iteration {iteration}: ||F|| {residual_norm:e} -> {trial_norm:e}, lambda {lambda:e}");
                x = trial;
                residual = trial_residual;
                residual_norm = trial_norm;
                lambda = (lambda / 10.0).max(1e-12);
                break;
            }
            lambda *= 10.0;
            if lambda > 1e12 {
                return Err(EngineError::SolverDiverged { residual_norm, iterations: iteration });
            }
        }
    }

    if converged(&residual_norm, &x) {
        return Ok(unknowns
            .iter()
            .zip(x.iter())
            .map(|(u, &scaled)| (u.symbol.clone(), scaled * scale_or_one(u.scale)))
            .collect());
    }
    Err(EngineError::SolverDiverged { residual_norm, iterations: MAX_ITERATIONS })
}

fn scale_or_one(scale: f64) -> f64 {
    if scale.abs() > f64::EPSILON {
        scale
    } else {
        1.0
    }
}

fn converged(residual_norm: &f64, x: &[f64]) -> bool {
    *residual_norm < CONVERGENCE_ATOL.max(CONVERGENCE_RTOL * norm(x))
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|vi| vi * vi).sum::<f64>().sqrt()
}

fn bind_unknowns(env: &Env, unknowns: &[UnknownSpec], x: &[f64]) -> Env {
    let mut working = env.clone();
    for (u, &scaled) in unknowns.iter().zip(x.iter()) {
        let si_value = scaled * scale_or_one(u.scale);
        working.bind(&u.symbol, Quantity::from_si(si_value, u.dimension));
    }
    working
}

fn evaluate_residuals(equations: &[Equation], unknowns: &[UnknownSpec], x: &[f64], env: &Env) -> EngineResult<Vec<f64>> {
    let working = bind_unknowns(env, unknowns, x);
    equations.iter().map(|eq| eq.residual(&working)).collect()
}

/// Central-difference Jacobian of the residual vector with respect to the
/// scaled unknowns, step `1e-7 * max(1, |x_j|)` per §4.6.
fn numerical_jacobian(equations: &[Equation], unknowns: &[UnknownSpec], x: &[f64], env: &Env) -> EngineResult<Vec<Vec<f64>>> {
    let m = equations.len();
    let n = unknowns.len();
    let mut jacobian = vec![vec![0.0; n]; m];

    for j in 0..n {
        let step = 1e-7 * x[j].abs().max(1.0);
        let mut x_plus = x.to_vec();
        let mut x_minus = x.to_vec();
        x_plus[j] += step;
        x_minus[j] -= step;

        let f_plus = evaluate_residuals(equations, unknowns, &x_plus, env)?;
        let f_minus = evaluate_residuals(equations, unknowns, &x_minus, env)?;

        for i in 0..m {
            jacobian[i][j] = (f_plus[i] - f_minus[i]) / (2.0 * step);
        }
    }
    Ok(jacobian)
}

/// Build the Gauss-Newton normal equations `(JᵀJ) delta = Jᵀ r` for the
/// Levenberg-Marquardt step.
fn normal_equations(jacobian: &[Vec<f64>], residual: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let m = jacobian.len();
    let n = if m == 0 { 0 } else { jacobian[0].len() };
    let mut jt_j = vec![vec![0.0; n]; n];
    let mut jt_r = vec![0.0; n];

    for row in 0..n {
        for col in 0..n {
            let mut sum = 0.0;
            for k in 0..m {
                sum += jacobian[k][row] * jacobian[k][col];
            }
            jt_j[row][col] = sum;
        }
        let mut sum = 0.0;
        for k in 0..m {
            sum += jacobian[k][row] * residual[k];
        }
        jt_r[row] = sum;
    }
    (jt_j, jt_r)
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting. Returns
/// `None` if `a` is numerically singular.
fn gaussian_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 {
        return Some(Vec::new());
    }
    let mut m: Vec<Vec<f64>> = a.iter().cloned().collect();
    let mut rhs = b.to_vec();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))?;
        if m[pivot_row][col].abs() < 1e-15 {
            return None;
        }
        m.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = rhs[row];
        for col in (row + 1)..n {
            sum -= m[row][col] * solution[col];
        }
        solution[row] = sum / m[row][row];
    }
    Some(solution)
}
