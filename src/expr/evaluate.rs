//! Evaluation of an [`Expr`] tree against a variable environment.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use super::{cartesian_indices, BinOp, CompareOp, Expr, UnaryFnKind};
use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;
use crate::quantity::Quantity;

/// The variable bindings an [`Expr`] is evaluated against.
///
/// Two kinds of binding are distinguished: continuous [`Quantity`] values
/// (the common case) and discrete string selections used by
/// [`Expr::Match`]'s `SelectVariable`-style selector. A symbol may be bound
/// in either map, never both.
#[derive(Debug, Clone, Default)]
pub struct Env {
    quantities: FxHashMap<String, Quantity>,
    discrete: FxHashMap<String, String>,
}

impl Env {
    /// An empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a symbol to a continuous [`Quantity`] value.
    pub fn bind(&mut self, symbol: impl Into<String>, value: Quantity) {
        self.quantities.insert(symbol.into(), value);
    }

    /// Bind a symbol to a discrete selection, as read by [`Expr::Match`].
    pub fn bind_discrete(&mut self, symbol: impl Into<String>, value: impl Into<String>) {
        self.discrete.insert(symbol.into(), value.into());
    }

    /// Look up a continuous binding.
    ///
    /// # Errors
    /// Returns [`EngineError::VariableNotFound`] if `symbol` has no
    /// continuous binding.
    pub fn get_quantity(&self, symbol: &str) -> EngineResult<&Quantity> {
        self.quantities
            .get(symbol)
            .ok_or_else(|| EngineError::variable_not_found(symbol, self.quantities.keys().cloned().collect()))
    }

    /// Look up a discrete binding.
    ///
    /// # Errors
    /// Returns [`EngineError::VariableNotFound`] if `symbol` has no discrete
    /// binding.
    pub fn get_discrete(&self, symbol: &str) -> EngineResult<&str> {
        self.discrete
            .get(symbol)
            .map(String::as_str)
            .ok_or_else(|| EngineError::variable_not_found(symbol, self.discrete.keys().cloned().collect()))
    }

    /// Whether `symbol` has a continuous binding.
    #[must_use]
    pub fn has_quantity(&self, symbol: &str) -> bool {
        self.quantities.contains_key(symbol)
    }

    /// Iterate over the continuous bindings.
    pub fn quantities(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.quantities.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Evaluate `expr` to a [`Quantity`], looking up free variables in `env`.
///
/// # Errors
/// Returns [`EngineError::VariableNotFound`] for an unbound [`Expr::VariableRef`]
/// or [`Expr::Match`] selector, [`EngineError::DimensionMismatch`] for a
/// dimensional law violation, and [`EngineError::ExpressionEvaluationError`]
/// for domain errors, a non-boolean [`Expr::Conditional`], or an exhausted
/// [`Expr::Match`]/[`Expr::RangeCase`].
pub fn evaluate(expr: &Expr, env: &Env) -> EngineResult<Quantity> {
    match expr {
        Expr::Const(value) => Ok(value.clone()),
        Expr::VariableRef { symbol, expected_dimension } => {
            let value = env.get_quantity(symbol)?;
            if value.dimension() != *expected_dimension {
                return Err(EngineError::dimension_mismatch(
                    format!("variable '{symbol}'"),
                    *expected_dimension,
                    value.dimension(),
                ));
            }
            Ok(value.clone())
        }
        Expr::BinaryOp { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            match op {
                BinOp::Add => left.add(&right),
                BinOp::Sub => left.sub(&right),
                BinOp::Mul => Ok(left.mul(&right)),
                BinOp::Div => left.div(&right),
                BinOp::Pow => left.pow(&right),
            }
        }
        Expr::UnaryFn { func, arg } => {
            let arg = evaluate(arg, env)?;
            apply_unary(*func, &arg)
        }
        Expr::Conditional { condition, then_branch, else_branch } => {
            let cond = evaluate(condition, env)?;
            if cond.to_si() == 1.0 {
                evaluate(then_branch, env)
            } else if cond.to_si() == 0.0 {
                evaluate(else_branch, env)
            } else {
                Err(EngineError::ExpressionEvaluationError {
                    expression: "conditional".to_owned(),
                    reason: format!("condition evaluated to {}, expected 0 or 1", cond.to_si()),
                })
            }
        }
        Expr::Comparison { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            let ordering = left.compare(&right)?;
            let truth = match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
            };
            Ok(Quantity::dimensionless(if truth { 1.0 } else { 0.0 }))
        }
        Expr::Match { selector, cases, default } => {
            let selected = env.get_discrete(selector)?;
            for (option, case_expr) in cases {
                if option == selected {
                    return evaluate(case_expr, env);
                }
            }
            match default {
                Some(default_expr) => evaluate(default_expr, env),
                None => Err(EngineError::ExpressionEvaluationError {
                    expression: format!("match on '{selector}'"),
                    reason: format!("no case matches selected value '{selected}' and no default was given"),
                }),
            }
        }
        Expr::Summation { bounds, body, extra_env } => {
            let mut total: Option<Quantity> = None;
            for point in cartesian_indices(bounds) {
                let term_expr = body(&point, extra_env);
                let term = evaluate(&term_expr, env)?;
                total = Some(match total {
                    Some(acc) => acc.add(&term)?,
                    None => term,
                });
            }
            total.ok_or_else(|| EngineError::ExpressionEvaluationError {
                expression: "summation".to_owned(),
                reason: "bounds produced no terms".to_owned(),
            })
        }
        Expr::RangeCase { value_expr, cases, otherwise } => {
            let value = evaluate(value_expr, env)?;
            let magnitude = value.to_si();
            for arm in cases {
                if arm.contains(magnitude) {
                    return evaluate(&arm.case_expr, env);
                }
            }
            match otherwise {
                Some(otherwise_expr) => evaluate(otherwise_expr, env),
                None => Err(EngineError::ExpressionEvaluationError {
                    expression: "range case".to_owned(),
                    reason: format!("value {magnitude} falls in no arm and no otherwise was given"),
                }),
            }
        }
        Expr::Deferred(thunk) => evaluate(&thunk(), env),
    }
}

fn apply_unary(func: UnaryFnKind, arg: &Quantity) -> EngineResult<Quantity> {
    match func {
        UnaryFnKind::Sin | UnaryFnKind::Cos | UnaryFnKind::Tan | UnaryFnKind::Ln | UnaryFnKind::Log10 | UnaryFnKind::Exp => {
            require_dimensionless(func, arg)?;
            let value = arg.to_si();
            let result = match func {
                UnaryFnKind::Sin => value.sin(),
                UnaryFnKind::Cos => value.cos(),
                UnaryFnKind::Tan => value.tan(),
                UnaryFnKind::Ln => {
                    if value <= 0.0 {
                        return Err(domain_error(func, value));
                    }
                    value.ln()
                }
                UnaryFnKind::Log10 => {
                    if value <= 0.0 {
                        return Err(domain_error(func, value));
                    }
                    value.log10()
                }
                UnaryFnKind::Exp => value.exp(),
                UnaryFnKind::Sqrt | UnaryFnKind::Abs | UnaryFnKind::Neg => unreachable!("handled by outer match"),
            };
            Ok(Quantity::dimensionless(result))
        }
        UnaryFnKind::Sqrt => {
            let value = arg.to_si();
            if value < 0.0 {
                return Err(domain_error(func, value));
            }
            Ok(Quantity::from_si(value.sqrt(), arg.dimension().root(2)))
        }
        UnaryFnKind::Abs => Ok(Quantity::from_si(arg.to_si().abs(), arg.dimension())),
        UnaryFnKind::Neg => Ok(arg.neg()),
    }
}

fn require_dimensionless(func: UnaryFnKind, arg: &Quantity) -> EngineResult<()> {
    if arg.dimension().is_dimensionless() {
        Ok(())
    } else {
        Err(EngineError::dimension_mismatch(func.to_string(), Dimension::dimensionless(), arg.dimension()))
    }
}

fn domain_error(func: UnaryFnKind, value: f64) -> EngineError {
    EngineError::ExpressionEvaluationError {
        expression: format!("{func}({value})"),
        reason: "argument outside the function's domain".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dimension::LENGTH;
    use crate::units::Unit;

    fn meter() -> Arc<Unit> {
        Arc::new(Unit::scaled("meter", "m", Dimension::base(LENGTH), 1.0, true))
    }

    #[test]
    fn evaluates_simple_binary_expression() {
        let mut env = Env::new();
        env.bind("x", Quantity::new(2.0, &meter()));
        env.bind("y", Quantity::new(3.0, &meter()));
        let expr = Expr::var("x", Dimension::base(LENGTH)).add(Expr::var("y", Dimension::base(LENGTH)));
        let result = evaluate(&expr, &env).expect("evaluation succeeds");
        assert!((result.to_si() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn conditional_short_circuits_the_unselected_branch() {
        let mut env = Env::new();
        env.bind("divisor", Quantity::dimensionless(0.0));
        let safe_branch = Expr::conditional(
            Expr::var("divisor", Dimension::dimensionless()).gt(Expr::constant(Quantity::dimensionless(0.0))),
            Expr::constant(Quantity::dimensionless(1.0)).div(Expr::var("divisor", Dimension::dimensionless())),
            Expr::constant(Quantity::dimensionless(0.0)),
        );
        let result = evaluate(&safe_branch, &env).expect("short-circuits away from the division by zero");
        assert!((result.to_si() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn match_falls_back_to_default_case() {
        let mut env = Env::new();
        env.bind_discrete("material", "titanium");
        let expr = Expr::select_match(
            "material",
            vec![("steel".to_owned(), Expr::constant(Quantity::dimensionless(1.0)))],
            Some(Expr::constant(Quantity::dimensionless(0.5))),
        );
        let result = evaluate(&expr, &env).expect("falls back to default");
        assert!((result.to_si() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn match_without_default_is_exhausted_error() {
        let mut env = Env::new();
        env.bind_discrete("material", "titanium");
        let expr = Expr::select_match(
            "material",
            vec![("steel".to_owned(), Expr::constant(Quantity::dimensionless(1.0)))],
            None,
        );
        assert!(matches!(
            evaluate(&expr, &env),
            Err(EngineError::ExpressionEvaluationError { .. })
        ));
    }

    #[test]
    fn sqrt_of_area_has_length_dimension() {
        let env = Env::new();
        let area = Quantity::new(9.0, &meter()).mul(&Quantity::new(1.0, &meter()));
        let expr = Expr::constant(area).sqrt();
        let result = evaluate(&expr, &env).expect("sqrt of a non-negative area");
        assert!((result.to_si() - 3.0).abs() < 1e-12);
        assert_eq!(result.dimension(), Dimension::base(LENGTH));
    }
}
