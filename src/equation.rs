//! An equality of two [`Expr`] trees, solvable for a single target by
//! analytic inversion, or contributed to a residual system.

use std::collections::BTreeSet;

use log::warn;

use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;
use crate::expr::{evaluate, BinOp, CompareOp, Env, Expr, UnaryFnKind};
use crate::quantity::Quantity;

/// `lhs = rhs`, named for diagnostics and trace output.
#[derive(Debug, Clone)]
pub struct Equation {
    lhs: Expr,
    rhs: Expr,
    name: String,
}

impl Equation {
    /// Build a named equation.
    #[must_use]
    pub fn new(name: impl Into<String>, lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs, name: name.into() }
    }

    /// The equation's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The left-hand side.
    #[must_use]
    pub const fn lhs(&self) -> &Expr {
        &self.lhs
    }

    /// The right-hand side.
    #[must_use]
    pub const fn rhs(&self) -> &Expr {
        &self.rhs
    }

    /// Every symbol referenced by either side.
    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = self.lhs.free_variables();
        out.extend(self.rhs.free_variables());
        out
    }

    /// The residual `lhs - rhs`, in SI units of the shared dimension.
    ///
    /// # Errors
    /// Propagates evaluation errors from either side, plus
    /// [`EngineError::DimensionMismatch`] if the two sides evaluate to
    /// different dimensions.
    pub fn residual(&self, env: &Env) -> EngineResult<f64> {
        let lhs = evaluate(&self.lhs, env)?;
        let rhs = evaluate(&self.rhs, env)?;
        if lhs.dimension() != rhs.dimension() {
            return Err(EngineError::dimension_mismatch(format!("equation '{}'", self.name), lhs.dimension(), rhs.dimension()));
        }
        Ok(lhs.to_si() - rhs.to_si())
    }

    /// Attempt to solve this equation for `target`, returning the
    /// [`Quantity`] it must take given the other currently-known variables
    /// in `env`.
    ///
    /// Per §4.4: this only succeeds when `target` occurs exactly once across
    /// `lhs` and `rhs`, and every operator on the path from the root to that
    /// occurrence has an implemented analytic inverse. Otherwise the
    /// equation must be deferred to the residual solver.
    ///
    /// # Errors
    /// Returns [`EngineError::EquationUnsolvable`] if `target` occurs more
    /// than once, does not occur at all, or an operator on its path has no
    /// analytic inverse; propagates evaluation/dimension errors otherwise.
    pub fn solve_for(&self, target: &str, expected_dimension: Dimension, env: &Env) -> EngineResult<Quantity> {
        let occurrences = count_occurrences(&self.lhs, target) + count_occurrences(&self.rhs, target);
        if occurrences != 1 {
            return Err(EngineError::EquationUnsolvable {
                equation: self.name.clone(),
                target: target.to_owned(),
                reason: format!("target occurs {occurrences} times; single-target inversion requires exactly one"),
            });
        }

        let lhs_has_target = self.lhs.free_variables().contains(target);
        let (side_with_target, other_side) =
            if lhs_has_target { (&self.lhs, &self.rhs) } else { (&self.rhs, &self.lhs) };

        let known_value = evaluate(other_side, env)?;
        let result = invert(side_with_target, target, known_value, env, &self.name)?;

        if result.dimension() != expected_dimension {
            return Err(EngineError::dimension_mismatch(
                format!("solved value for '{target}' in equation '{}'", self.name),
                expected_dimension,
                result.dimension(),
            ));
        }
        Ok(result)
    }
}

/// Count how many times `target` occurs as an [`Expr::VariableRef`] symbol
/// within `expr`. `Summation` and `Deferred` bodies are sampled once, as a
/// best-effort approximation (their true occurrence count depends on a
/// closure that may vary per call site).
fn count_occurrences(expr: &Expr, target: &str) -> usize {
    match expr {
        Expr::Const(_) => 0,
        Expr::VariableRef { symbol, .. } => usize::from(symbol == target),
        Expr::BinaryOp { left, right, .. } | Expr::Comparison { left, right, .. } => {
            count_occurrences(left, target) + count_occurrences(right, target)
        }
        Expr::UnaryFn { arg, .. } => count_occurrences(arg, target),
        Expr::Conditional { condition, then_branch, else_branch } => {
            count_occurrences(condition, target) + count_occurrences(then_branch, target) + count_occurrences(else_branch, target)
        }
        Expr::Match { cases, default, .. } => {
            cases.iter().map(|(_, case)| count_occurrences(case, target)).sum::<usize>()
                + default.as_ref().map_or(0, |d| count_occurrences(d, target))
        }
        Expr::Summation { bounds, body, extra_env } => {
            let first_index = bounds.first().map(crate::expr::SumBound::indices).unwrap_or_default();
            let indices = vec![first_index.first().copied().unwrap_or(0); bounds.len()];
            count_occurrences(&body(&indices, extra_env), target)
        }
        Expr::RangeCase { value_expr, cases, otherwise } => {
            count_occurrences(value_expr, target)
                + cases.iter().map(|arm| count_occurrences(&arm.case_expr, target)).sum::<usize>()
                + otherwise.as_ref().map_or(0, |o| count_occurrences(o, target))
        }
        Expr::Deferred(thunk) => count_occurrences(&thunk(), target),
    }
}

/// Walk down `expr` towards its single occurrence of `target`, inverting
/// each operator on the path so that `known_value` becomes the value
/// `target` must take.
fn invert(expr: &Expr, target: &str, known_value: Quantity, env: &Env, equation_name: &str) -> EngineResult<Quantity> {
    match expr {
        Expr::VariableRef { symbol, .. } if symbol == target => Ok(known_value),
        Expr::BinaryOp { op, left, right } => {
            let left_has = left.free_variables().contains(target);
            let right_has = right.free_variables().contains(target);
            if left_has && !right_has {
                let other = evaluate(right, env)?;
                let solved_for_left = invert_binary_left(*op, known_value, &other, equation_name, target)?;
                invert(left, target, solved_for_left, env, equation_name)
            } else if right_has && !left_has {
                let other = evaluate(left, env)?;
                let solved_for_right = invert_binary_right(*op, &other, known_value, equation_name, target)?;
                invert(right, target, solved_for_right, env, equation_name)
            } else {
                unsolvable(equation_name, target, "target appears on both sides of a binary operator")
            }
        }
        Expr::UnaryFn { func, arg } => {
            let solved_for_arg = invert_unary(*func, known_value, equation_name, target)?;
            invert(arg, target, solved_for_arg, env, equation_name)
        }
        Expr::Conditional { condition, then_branch, else_branch } => {
            let cond = evaluate(condition, env)?;
            if cond.to_si() == 1.0 {
                invert(then_branch, target, known_value, env, equation_name)
            } else if cond.to_si() == 0.0 {
                invert(else_branch, target, known_value, env, equation_name)
            } else {
                Err(EngineError::ExpressionEvaluationError {
                    expression: format!("conditional in equation '{equation_name}'"),
                    reason: "condition did not evaluate to 0 or 1".to_owned(),
                })
            }
        }
        _ => unsolvable(equation_name, target, "no analytic inverse implemented for this node kind"),
    }
}

fn unsolvable(equation: &str, target: &str, reason: &str) -> EngineResult<Quantity> {
    Err(EngineError::EquationUnsolvable {
        equation: equation.to_owned(),
        target: target.to_owned(),
        reason: reason.to_owned(),
    })
}

/// Solve `x op other = known` for `x`.
fn invert_binary_left(op: BinOp, known: Quantity, other: &Quantity, equation: &str, target: &str) -> EngineResult<Quantity> {
    match op {
        BinOp::Add => known.sub(other),
        BinOp::Sub => known.add(other),
        BinOp::Mul => {
            if other.to_si() == 0.0 {
                return Err(EngineError::DivisionByZero { dividend: format!("solving '{target}' in '{equation}'") });
            }
            known.div(other)
        }
        BinOp::Div => Ok(known.mul(other)),
        BinOp::Pow => invert_power_base(known, other, equation, target),
    }
}

/// Solve `other op x = known` for `x`.
fn invert_binary_right(op: BinOp, other: &Quantity, known: Quantity, equation: &str, target: &str) -> EngineResult<Quantity> {
    match op {
        BinOp::Add => known.sub(other),
        BinOp::Sub => other.sub(&known),
        BinOp::Mul => {
            if other.to_si() == 0.0 {
                return Err(EngineError::DivisionByZero { dividend: format!("solving '{target}' in '{equation}'") });
            }
            known.div(other)
        }
        BinOp::Div => {
            if known.to_si() == 0.0 {
                return Err(EngineError::DivisionByZero { dividend: format!("solving '{target}' in '{equation}'") });
            }
            other.div(&known)
        }
        BinOp::Pow => {
            // `other^x = known`, with `other` dimensionless: x = ln(known)/ln(other).
            if !other.dimension().is_dimensionless() || !known.dimension().is_dimensionless() {
                return unsolvable(equation, target, "exponent-target inversion requires a dimensionless base and result");
            }
            let base = other.to_si();
            let value = known.to_si();
            if base <= 0.0 || base == 1.0 || value <= 0.0 {
                return unsolvable(equation, target, "exponent-target inversion requires a positive base != 1 and a positive result");
            }
            Ok(Quantity::dimensionless(value.ln() / base.ln()))
        }
    }
}

/// Solve `x^other = known` for `x` (the base), requiring `other` to be an
/// integer exponent.
fn invert_power_base(known: Quantity, other: &Quantity, equation: &str, target: &str) -> EngineResult<Quantity> {
    if !other.dimension().is_dimensionless() {
        return unsolvable(equation, target, "power exponent must be dimensionless");
    }
    let exponent = other.to_si();
    let rounded = exponent.round();
    if (exponent - rounded).abs() > 1e-12 {
        return unsolvable(equation, target, "power exponent must be an integer within 1e-12 to invert");
    }
    #[allow(clippy::cast_possible_truncation, reason = "checked within 1e-12 of an integer above")]
    let n = rounded as i32;
    if n == 0 {
        return unsolvable(equation, target, "cannot invert a zero exponent");
    }
    if n % 2 == 0 {
        warn!("equation '{equation}': even-power inversion of '{target}' chooses the positive root branch");
    }
    Ok(Quantity::from_si(known.to_si().abs().powf(1.0 / f64::from(n)), known.dimension().root(n.unsigned_abs())))
}

/// Solve `f(x) = known` for `x` where `f` is one of the unary functions.
fn invert_unary(func: UnaryFnKind, known: Quantity, equation: &str, target: &str) -> EngineResult<Quantity> {
    if !known.dimension().is_dimensionless() && !matches!(func, UnaryFnKind::Abs | UnaryFnKind::Neg | UnaryFnKind::Sqrt) {
        return unsolvable(equation, target, "non-dimensionless result cannot pass through this unary function's inverse");
    }
    let value = known.to_si();
    match func {
        UnaryFnKind::Sin => Ok(Quantity::dimensionless(value.asin())),
        UnaryFnKind::Cos => Ok(Quantity::dimensionless(value.acos())),
        UnaryFnKind::Tan => Ok(Quantity::dimensionless(value.atan())),
        UnaryFnKind::Ln => Ok(Quantity::dimensionless(value.exp())),
        UnaryFnKind::Log10 => Ok(Quantity::dimensionless(10f64.powf(value))),
        UnaryFnKind::Exp => {
            if value <= 0.0 {
                return unsolvable(equation, target, "ln of a non-positive value has no real inverse");
            }
            Ok(Quantity::dimensionless(value.ln()))
        }
        UnaryFnKind::Sqrt => Ok(known.powi(2)),
        UnaryFnKind::Abs => {
            warn!("equation '{equation}': abs() inversion of '{target}' chooses the positive branch");
            Ok(known)
        }
        UnaryFnKind::Neg => Ok(known.neg()),
    }
}
