//! Error types for the engine.
//!
//! This module provides `EngineError`, the single error enum returned by
//! every fallible operation in the crate (dimension algebra, unit
//! conversion, expression evaluation, equation solving, and problem
//! composition). Each variant carries the structured context called for by
//! the engine's error taxonomy: offending symbol, expected/actual
//! dimensions, and the equation or expression name involved.

use std::fmt;

use crate::dimension::Dimension;

/// Errors that can occur while building or solving an engineering problem.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EngineError {
    /// Arithmetic or comparison attempted on incompatible dimensions.
    DimensionMismatch {
        /// The operation being attempted (e.g. `"+"`, `"compare"`).
        op: String,
        /// Dimension of the left-hand operand.
        left: Dimension,
        /// Dimension of the right-hand operand.
        right: Dimension,
    },
    /// A unit conversion was requested between incompatible dimensions.
    UnitConversionError {
        /// Name of the source unit.
        from: String,
        /// Name of the requested target unit.
        to: String,
        /// Human-readable reason the conversion failed.
        reason: String,
    },
    /// A unit or symbol string could not be resolved in a registry.
    UnknownUnit {
        /// The string that failed to resolve.
        query: String,
        /// Up to three nearest-neighbor suggestions, closest first.
        suggestions: Vec<String>,
    },
    /// An environment lookup for a variable failed.
    VariableNotFound {
        /// The symbol that was looked up.
        name: String,
        /// Symbols that were available at the point of lookup.
        available: Vec<String>,
    },
    /// A single-target equation could not be solved analytically.
    EquationUnsolvable {
        /// Name of the equation.
        equation: String,
        /// The symbol that was requested as the solve target.
        target: String,
        /// Why no analytic inverse was available.
        reason: String,
    },
    /// The residual solver failed to converge within its iteration cap.
    SolverDiverged {
        /// Euclidean norm of the residual vector at the last iteration.
        residual_norm: f64,
        /// Number of iterations performed.
        iterations: usize,
    },
    /// Division where the divisor's SI value is exactly zero.
    DivisionByZero {
        /// Description of the dividend expression or equation.
        dividend: String,
    },
    /// Evaluating an expression failed (invalid function domain, exhausted
    /// `Match`, non-boolean `Conditional`, etc).
    ExpressionEvaluationError {
        /// Description of the expression being evaluated.
        expression: String,
        /// Why evaluation failed.
        reason: String,
    },
    /// Composing a sub-problem into a parent problem failed.
    CompositionError {
        /// The prefix the sub-problem was being mounted under.
        prefix: String,
        /// Why composition failed (duplicate prefix, cycle, type loss, ...).
        reason: String,
    },
    /// A rule's condition failed to evaluate. Surfaced as a rule outcome,
    /// never aborts `Problem::solve`.
    RuleEvaluationError {
        /// Name of the rule.
        rule: String,
        /// Why the rule's condition could not be evaluated.
        reason: String,
    },
}

impl EngineError {
    /// Build a [`EngineError::DimensionMismatch`] for the given operation.
    #[must_use]
    pub fn dimension_mismatch(op: impl Into<String>, left: Dimension, right: Dimension) -> Self {
        EngineError::DimensionMismatch {
            op: op.into(),
            left,
            right,
        }
    }

    /// Build a [`EngineError::VariableNotFound`], sorting the candidate list
    /// for deterministic error messages.
    #[must_use]
    pub fn variable_not_found(name: impl Into<String>, mut available: Vec<String>) -> Self {
        available.sort();
        EngineError::VariableNotFound {
            name: name.into(),
            available,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::DimensionMismatch { op, left, right } => {
                write!(
                    f,
                    "dimension mismatch in '{op}': left is {left}, right is {right}"
                )
            }
            EngineError::UnitConversionError { from, to, reason } => {
                write!(f, "cannot convert from '{from}' to '{to}': {reason}")
            }
            EngineError::UnknownUnit { query, suggestions } => {
                if suggestions.is_empty() {
                    write!(f, "unknown unit or symbol '{query}'")
                } else {
                    write!(
                        f,
                        "unknown unit or symbol '{query}', did you mean: {}?",
                        suggestions.join(", ")
                    )
                }
            }
            EngineError::VariableNotFound { name, available } => {
                if available.is_empty() {
                    write!(f, "variable '{name}' not found")
                } else {
                    write!(
                        f,
                        "variable '{name}' not found, available: {}",
                        available.join(", ")
                    )
                }
            }
            EngineError::EquationUnsolvable {
                equation,
                target,
                reason,
            } => {
                write!(
                    f,
                    "cannot solve equation '{equation}' for '{target}': {reason}"
                )
            }
            EngineError::SolverDiverged {
                residual_norm,
                iterations,
            } => {
                write!(
                    f,
                    "residual solver diverged after {iterations} iterations (||F|| = {residual_norm:e})"
                )
            }
            EngineError::DivisionByZero { dividend } => {
                write!(f, "division by zero: {dividend} / 0")
            }
            EngineError::ExpressionEvaluationError { expression, reason } => {
                write!(f, "cannot evaluate '{expression}': {reason}")
            }
            EngineError::CompositionError { prefix, reason } => {
                write!(f, "composition error at prefix '{prefix}': {reason}")
            }
            EngineError::RuleEvaluationError { rule, reason } => {
                write!(f, "rule '{rule}' failed to evaluate: {reason}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
