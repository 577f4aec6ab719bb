//! Post-solve validation rules: a boolean [`Expr`] plus a message and
//! severity, evaluated (but never mutating state) after every
//! [`crate::problem::Problem::solve`].

use std::fmt;

use rustc_hash::FxHashMap;

use crate::expr::{evaluate, Env, Expr};

/// How serious a triggered (or failed) rule is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Informational only.
    Info,
    /// Worth a caller's attention, but not a hard failure.
    Warning,
    /// A hard violation of a code/compliance constraint.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// A named boolean condition evaluated after every solve.
///
/// Rules never abort a solve: a condition that fails to evaluate (undefined
/// variable, domain error, ...) is reported as an errored [`RuleOutcome`]
/// rather than propagated as an [`crate::core::EngineError`].
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    condition: Expr,
    message: String,
    severity: Severity,
    kind: String,
}

impl Rule {
    /// Build a new rule. `kind` is a free-form tag (e.g. `"CODE_COMPLIANCE"`)
    /// a caller can use to group related outcomes, matching the
    /// `warning_type` tagging seen on composed engineering problems.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        condition: Expr,
        message: impl Into<String>,
        severity: Severity,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            condition,
            message: message.into(),
            severity,
            kind: kind.into(),
        }
    }

    /// The rule's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The free-form grouping tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The declared severity (used verbatim unless evaluation itself fails).
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Evaluate this rule's condition against `env`, producing an outcome
    /// that never panics and never returns an [`Err`].
    #[must_use]
    pub fn evaluate(&self, env: &Env) -> RuleOutcome {
        match evaluate(&self.condition, env) {
            Ok(value) if value.to_si() == 1.0 => RuleOutcome {
                rule: self.name.clone(),
                kind: self.kind.clone(),
                severity: self.severity,
                status: RuleStatus::Triggered,
                message: self.message.clone(),
            },
            Ok(_) => RuleOutcome {
                rule: self.name.clone(),
                kind: self.kind.clone(),
                severity: self.severity,
                status: RuleStatus::NotTriggered,
                message: self.message.clone(),
            },
            Err(err) => RuleOutcome {
                rule: self.name.clone(),
                kind: self.kind.clone(),
                severity: Severity::Error,
                status: RuleStatus::EvaluationFailed(err.to_string()),
                message: self.message.clone(),
            },
        }
    }

    /// Rebuild this rule under a sub-problem's `{prefix}_` namespace: the
    /// name is prefixed for uniqueness and the condition's symbols are
    /// rewritten through `mapping`, mirroring how composition re-parents
    /// equations (see [`Expr::rename_symbols`]).
    #[must_use]
    pub(crate) fn renamed(&self, prefix: &str, mapping: &FxHashMap<String, String>) -> Self {
        Self {
            name: format!("{prefix}_{}", self.name),
            condition: self.condition.rename_symbols(mapping),
            message: self.message.clone(),
            severity: self.severity,
            kind: self.kind.clone(),
        }
    }
}

/// What happened when a [`Rule`]'s condition was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleStatus {
    /// The condition evaluated to `1.0`.
    Triggered,
    /// The condition evaluated to `0.0`.
    NotTriggered,
    /// The condition could not be evaluated; carries the error text.
    EvaluationFailed(String),
}

/// The result of evaluating one [`Rule`]: `(rule, outcome, rendered message)`
/// per §4.8, flattened into a single struct.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    /// The rule's name.
    pub rule: String,
    /// The rule's grouping tag.
    pub kind: String,
    /// `ERROR` when evaluation itself failed, the rule's declared severity
    /// otherwise.
    pub severity: Severity,
    /// Whether the condition was triggered, not triggered, or unevaluable.
    pub status: RuleStatus,
    /// The rule's message.
    pub message: String,
}

impl RuleOutcome {
    /// Whether this outcome represents a successfully evaluated, triggered
    /// condition.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        matches!(self.status, RuleStatus::Triggered)
    }

    /// Whether evaluating the condition itself failed.
    #[must_use]
    pub fn is_evaluation_error(&self) -> bool {
        matches!(self.status, RuleStatus::EvaluationFailed(_))
    }
}
