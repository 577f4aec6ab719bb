//! The aggregate that ties variables, equations, rules, and composed
//! sub-problems into one solvable unit (§3's `Problem`, §4.7-§4.9).

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::core::{EngineError, EngineResult};
use crate::dimension::Dimension;
use crate::dependency_graph::{DependencyGraph, EquationRole};
use crate::equation::Equation;
use crate::expr::Env;
use crate::quantity::Quantity;
use crate::rule::{Rule, RuleOutcome};
use crate::solver::{self, UnknownSpec};
use crate::variable::Variable;

/// Which mechanism resolved a variable during the last `solve()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    /// Resolved by single-target analytic inversion (§4.4).
    Analytic,
    /// Resolved as part of a coupled residual subsystem (§4.6).
    Residual,
}

/// One step of the solve trace: which equation determined which variable,
/// and how.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// The equation (or, for a residual step, a synthetic label naming the
    /// subsystem) that determined `target`.
    pub equation: String,
    /// The variable symbol this step resolved.
    pub target: String,
    /// How it was resolved.
    pub method: SolveMethod,
}

/// A read-only snapshot of one variable, for the reporting view (§6).
#[derive(Debug, Clone)]
pub struct VarView {
    /// The variable's symbol.
    pub symbol: String,
    /// The variable's human-readable name.
    pub name: String,
    /// The current value expressed in the variable's preferred unit (or SI
    /// if none is recorded), if known.
    pub value: Option<f64>,
    /// The symbol of the unit `value` is expressed in, if any.
    pub unit_symbol: Option<String>,
    /// Whether the variable currently holds a value.
    pub is_known: bool,
}

/// The read-only reporting view a `Problem` exposes per §6: `{name,
/// description, given, find, results, steps}`.
#[derive(Debug, Clone)]
pub struct ProblemReport {
    /// The problem's name.
    pub name: String,
    /// The problem's description.
    pub description: String,
    /// Variables the caller supplied values for.
    pub given: Vec<VarView>,
    /// Variables the problem is solving for (not caller-supplied).
    pub find: Vec<VarView>,
    /// Every variable's current value, known or not.
    pub results: Vec<VarView>,
    /// The trace of the last `solve()` call, in resolution order.
    pub steps: Vec<StepRecord>,
}

/// A single variable's serializable state, per §6's composition-state
/// format.
#[derive(Debug, Clone, Serialize)]
pub struct VariableSnapshot {
    /// The variable's symbol.
    pub symbol: String,
    /// The current value in SI base units, if known.
    pub value: Option<f64>,
    /// The variable's dimension, rendered for diagnostics.
    pub si_unit: String,
    /// The preferred display unit's symbol, if one is set.
    pub preferred_unit: Option<String>,
    /// Whether the variable currently holds a value.
    pub is_known: bool,
}

/// A `Problem`'s serializable state tree: `{variables, sub_problems}`.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemSnapshot {
    /// Every variable's snapshot, in declaration order.
    pub variables: Vec<VariableSnapshot>,
    /// Flattened sub-problems are not re-nested here: composition already
    /// merges a sub-problem's variables into this problem's own
    /// `variables` under its `{prefix}_` namespace, so `sub_problems` below
    /// mirrors the *structural* tree (for embedding frameworks that care
    /// about provenance) rather than holding disjoint state.
    pub sub_problems: IndexMap<String, ProblemSnapshot>,
}

/// A declared equality between a parent variable and one or more
/// sub-problem variables (already namespaced), per §3/§4.7.
#[derive(Debug, Clone)]
struct SharedBinding {
    parent_symbol: String,
    remote_symbols: Vec<String>,
}

/// A collection of variables, equations, and rules, optionally composed
/// from sub-problems, that can be solved as a unit.
///
/// `Problem` owns its sub-problems by value: the tree is acyclic by
/// construction (Rust's ownership model has no way to express a sub-problem
/// containing its own ancestor), so the cycle detection §4.7 calls for
/// reduces here to rejecting a duplicate prefix at the point of embedding.
#[derive(Debug, Clone)]
pub struct Problem {
    name: String,
    description: String,
    variables: IndexMap<String, Variable>,
    equations: Vec<Equation>,
    rules: Vec<Rule>,
    sub_problems: IndexMap<String, Problem>,
    shared_bindings: Vec<SharedBinding>,
    last_steps: Vec<StepRecord>,
    last_rule_outcomes: Vec<RuleOutcome>,
}

impl Problem {
    /// Start an empty problem.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            variables: IndexMap::new(),
            equations: Vec::new(),
            rules: Vec::new(),
            sub_problems: IndexMap::new(),
            shared_bindings: Vec::new(),
            last_steps: Vec::new(),
            last_rule_outcomes: Vec::new(),
        }
    }

    /// The problem's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare an unknown variable.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if `symbol` is already in
    /// use.
    pub fn add_variable(&mut self, name: impl Into<String>, symbol: impl Into<String>, dimension: Dimension) -> EngineResult<()> {
        let symbol = symbol.into();
        self.insert_variable(symbol.clone(), Variable::unknown(name, symbol, dimension))
    }

    /// Declare a known variable.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if `symbol` is already in
    /// use, or propagates [`EngineError::DimensionMismatch`] from
    /// [`Variable::given`].
    pub fn add_known_variable(
        &mut self,
        name: impl Into<String>,
        symbol: impl Into<String>,
        dimension: Dimension,
        quantity: Quantity,
    ) -> EngineResult<()> {
        let symbol = symbol.into();
        let variable = Variable::given(name, symbol.clone(), dimension, quantity)?;
        self.insert_variable(symbol, variable)
    }

    /// Declare a discrete (`SelectVariable`) variable.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if `symbol` is already in
    /// use.
    pub fn add_discrete_variable(&mut self, name: impl Into<String>, symbol: impl Into<String>, selected: impl Into<String>) -> EngineResult<()> {
        let symbol = symbol.into();
        self.insert_variable(symbol.clone(), Variable::discrete(name, symbol, selected))
    }

    fn insert_variable(&mut self, symbol: String, variable: Variable) -> EngineResult<()> {
        if self.variables.contains_key(&symbol) {
            return Err(EngineError::CompositionError {
                prefix: symbol,
                reason: "a variable with this symbol already exists in this problem".to_owned(),
            });
        }
        self.variables.insert(symbol, variable);
        Ok(())
    }

    /// A variable by symbol.
    #[must_use]
    pub fn variable(&self, symbol: &str) -> Option<&Variable> {
        self.variables.get(symbol)
    }

    /// Mutably access a variable, e.g. to assign a new given value before a
    /// re-solve.
    #[must_use]
    pub fn variable_mut(&mut self, symbol: &str) -> Option<&mut Variable> {
        self.variables.get_mut(symbol)
    }

    /// Add an equation.
    pub fn add_equation(&mut self, equation: Equation) {
        self.equations.push(equation);
    }

    /// Add a validation rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Embed `sub` as a sub-problem under `prefix`: every variable `s` of
    /// `sub` becomes visible here as `{prefix}_s`, and `sub`'s equations and
    /// rules are re-parented with the same symbol substitution. `sub`'s own
    /// variable type identity (its declared dimension) is carried over
    /// unchanged, never coerced to dimensionless.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if `prefix` collides with
    /// an existing variable symbol or sub-problem prefix in this problem.
    pub fn add_sub_problem(&mut self, prefix: impl Into<String>, sub: Self) -> EngineResult<()> {
        let prefix = prefix.into();
        if self.sub_problems.contains_key(&prefix) {
            return Err(EngineError::CompositionError {
                prefix: prefix.clone(),
                reason: "a sub-problem with this prefix is already embedded".to_owned(),
            });
        }

        let mapping: FxHashMap<String, String> =
            sub.variables.keys().map(|symbol| (symbol.clone(), format!("{prefix}_{symbol}"))).collect();

        for (symbol, variable) in &sub.variables {
            let namespaced = format!("{prefix}_{symbol}");
            if self.variables.contains_key(&namespaced) {
                return Err(EngineError::CompositionError {
                    prefix: prefix.clone(),
                    reason: format!("namespaced symbol '{namespaced}' collides with an existing variable"),
                });
            }
            let mut renamed = variable.clone();
            renamed.rename_to(namespaced.clone());
            self.variables.insert(namespaced, renamed);
        }

        for equation in &sub.equations {
            let lhs = equation.lhs().rename_symbols(&mapping);
            let rhs = equation.rhs().rename_symbols(&mapping);
            self.equations.push(Equation::new(format!("{prefix}_{}", equation.name()), lhs, rhs));
        }

        for rule in &sub.rules {
            self.rules.push(rule.renamed(&prefix, &mapping));
        }

        self.sub_problems.insert(prefix, sub);
        Ok(())
    }

    /// Declare that `parent_symbol`'s value should be propagated to each of
    /// `remote_symbols` (already-namespaced sub-problem symbols) before
    /// every solve.
    ///
    /// # Errors
    /// Returns [`EngineError::CompositionError`] if either side references
    /// an unknown symbol, the dimensions disagree, or a remote symbol is
    /// already bound by another shared binding (injectivity, §3).
    pub fn add_shared_binding(&mut self, parent_symbol: impl Into<String>, remote_symbols: Vec<String>) -> EngineResult<()> {
        let parent_symbol = parent_symbol.into();
        let parent_dimension = self
            .variables
            .get(&parent_symbol)
            .map(Variable::expected_dimension)
            .ok_or_else(|| EngineError::CompositionError {
                prefix: parent_symbol.clone(),
                reason: "shared binding references an unknown parent symbol".to_owned(),
            })?;

        let already_bound: HashSet<&str> =
            self.shared_bindings.iter().flat_map(|b| b.remote_symbols.iter().map(String::as_str)).collect();

        for remote in &remote_symbols {
            let remote_dimension = self.variables.get(remote).map(Variable::expected_dimension).ok_or_else(|| {
                EngineError::CompositionError {
                    prefix: remote.clone(),
                    reason: "shared binding references an unknown remote symbol".to_owned(),
                }
            })?;
            if remote_dimension != parent_dimension {
                return Err(EngineError::dimension_mismatch(
                    format!("shared binding '{parent_symbol}' -> '{remote}'"),
                    parent_dimension,
                    remote_dimension,
                ));
            }
            if already_bound.contains(remote.as_str()) {
                return Err(EngineError::CompositionError {
                    prefix: remote.clone(),
                    reason: "remote symbol is already the target of another shared binding".to_owned(),
                });
            }
        }

        self.shared_bindings.push(SharedBinding { parent_symbol, remote_symbols });
        Ok(())
    }

    fn propagate_shared_bindings(&mut self) {
        for binding in &self.shared_bindings {
            let Some(parent) = self.variables.get(&binding.parent_symbol) else { continue };
            let Some(value) = parent.quantity().cloned() else { continue };
            for remote in &binding.remote_symbols {
                if let Some(variable) = self.variables.get_mut(remote) {
                    variable.set_derived(value.clone());
                }
            }
        }
    }

    fn build_env(&self) -> Env {
        let mut env = Env::new();
        for (symbol, variable) in &self.variables {
            if let Some(quantity) = variable.quantity() {
                env.bind(symbol.clone(), quantity.clone());
            } else if let Some(selected) = variable.discrete_value() {
                env.bind_discrete(symbol.clone(), selected.to_owned());
            }
        }
        env
    }

    /// Run (or re-run) the solve procedure: revert previously-derived
    /// values, propagate shared bindings, solve every equation it can by
    /// topological analytic inversion, fall back to the residual solver for
    /// any remaining coupled unknowns, then evaluate every rule.
    ///
    /// # Errors
    /// Propagates [`EngineError::DimensionMismatch`] and other structural
    /// errors immediately. [`EngineError::SolverDiverged`] is also
    /// propagated — it represents a genuine solve failure, not a recoverable
    /// rule-level condition.
    pub fn solve(&mut self) -> EngineResult<()> {
        for variable in self.variables.values_mut() {
            variable.revert_if_derived();
        }
        self.propagate_shared_bindings();

        let mut env = self.build_env();
        let mut unknowns: BTreeSet<String> =
            self.variables.iter().filter(|(_, v)| !v.is_known()).map(|(s, _)| s.clone()).collect();
        let variable_order: Vec<String> = self.variables.keys().cloned().collect();

        let mut steps = Vec::new();
        let mut solved_equation_indices: HashSet<usize> = HashSet::new();

        loop {
            if unknowns.is_empty() {
                break;
            }
            let graph = DependencyGraph::build(&self.equations, &unknowns, &variable_order);
            let mut progressed = false;

            for (index, equation) in self.equations.iter().enumerate() {
                if solved_equation_indices.contains(&index) {
                    continue;
                }
                let EquationRole::SingleTarget(target) = &graph.roles()[index] else { continue };
                if !unknowns.contains(target) {
                    continue;
                }
                let expected_dimension = match self.variables.get(target) {
                    Some(variable) => variable.expected_dimension(),
                    None => continue,
                };
                match equation.solve_for(target, expected_dimension, &env) {
                    Ok(value) => {
                        debug!("solved '{target}' analytically via equation '{}'", equation.name());
                        env.bind(target.clone(), value.clone());
                        if let Some(variable) = self.variables.get_mut(target) {
                            variable.set_derived(value);
                        }
                        unknowns.remove(target);
                        solved_equation_indices.insert(index);
                        steps.push(StepRecord {
                            equation: equation.name().to_owned(),
                            target: target.clone(),
                            method: SolveMethod::Analytic,
                        });
                        progressed = true;
                    }
                    Err(EngineError::EquationUnsolvable { .. }) => {}
                    Err(other) => return Err(other),
                }
            }

            if !progressed {
                break;
            }
        }

        if !unknowns.is_empty() {
            let residual_equations: Vec<Equation> = self
                .equations
                .iter()
                .enumerate()
                .filter(|(index, equation)| {
                    !solved_equation_indices.contains(index) && equation.free_variables().iter().any(|v| unknowns.contains(v))
                })
                .map(|(_, equation)| equation.clone())
                .collect();

            let unknown_specs: Vec<UnknownSpec> = unknowns
                .iter()
                .map(|symbol| {
                    let variable = &self.variables[symbol];
                    let dimension = variable.expected_dimension();
                    let initial_si = variable.quantity().map_or(1.0, Quantity::to_si);
                    let scale = variable.preferred_unit().map_or(1.0, |unit| {
                        let factor = unit.si_factor();
                        if factor.abs() > f64::EPSILON {
                            factor
                        } else {
                            1.0
                        }
                    });
                    UnknownSpec { symbol: symbol.clone(), dimension, initial_si, scale }
                })
                .collect();

            debug!("handing {} unknown(s) to the residual solver", unknown_specs.len());
            let solution = solver::solve(&residual_equations, &unknown_specs, &env)?;

            for (symbol, si_value) in solution {
                let dimension = self.variables[&symbol].expected_dimension();
                let value = Quantity::from_si(si_value, dimension);
                env.bind(symbol.clone(), value.clone());
                if let Some(variable) = self.variables.get_mut(&symbol) {
                    variable.set_derived(value);
                }
                steps.push(StepRecord {
                    equation: "residual subsystem".to_owned(),
                    target: symbol,
                    method: SolveMethod::Residual,
                });
            }
        }

        self.last_steps = steps;
        self.last_rule_outcomes = self.rules.iter().map(|rule| rule.evaluate(&env)).collect();
        Ok(())
    }

    /// The rule outcomes from the most recent `solve()`.
    #[must_use]
    pub fn rule_outcomes(&self) -> &[RuleOutcome] {
        &self.last_rule_outcomes
    }

    /// The solve trace from the most recent `solve()`.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.last_steps
    }

    fn var_view(symbol: &str, variable: &Variable) -> VarView {
        let value = variable.quantity().map(|q| q.preferred_unit().map_or_else(|| q.to_si(), |_| q.preferred_value()));
        let unit_symbol = variable.preferred_unit().map(|unit| unit.symbol().to_owned());
        VarView {
            symbol: symbol.to_owned(),
            name: variable.name().to_owned(),
            value,
            unit_symbol,
            is_known: variable.is_known(),
        }
    }

    /// The read-only reporting view described in §6.
    #[must_use]
    pub fn report(&self) -> ProblemReport {
        let mut given = Vec::new();
        let mut find = Vec::new();
        let mut results = Vec::new();
        for (symbol, variable) in &self.variables {
            let view = Self::var_view(symbol, variable);
            if variable.is_given() {
                given.push(view.clone());
            } else {
                find.push(view.clone());
            }
            results.push(view);
        }
        ProblemReport {
            name: self.name.clone(),
            description: self.description.clone(),
            given,
            find,
            results,
            steps: self.last_steps.clone(),
        }
    }

    /// A serializable snapshot of this problem's observable state, per §6's
    /// composition-state format.
    #[must_use]
    pub fn snapshot(&self) -> ProblemSnapshot {
        ProblemSnapshot {
            variables: self
                .variables
                .iter()
                .map(|(symbol, variable)| VariableSnapshot {
                    symbol: symbol.clone(),
                    value: variable.quantity().map(Quantity::to_si),
                    si_unit: variable.expected_dimension().to_string(),
                    preferred_unit: variable.preferred_unit().map(|unit| unit.symbol().to_owned()),
                    is_known: variable.is_known(),
                })
                .collect(),
            sub_problems: self.sub_problems.iter().map(|(prefix, sub)| (prefix.clone(), sub.snapshot())).collect(),
        }
    }

    /// Serialize this problem's state to the JSON form described in §6.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if the snapshot cannot be serialized
    /// (this should not occur for any well-formed `Problem`).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Problem({}, {} variable(s), {} equation(s))", self.name, self.variables.len(), self.equations.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::dimension::{Dimension, LENGTH, MASS};
    use crate::expr::Expr;
    use crate::units::Unit;

    fn meter() -> Arc<Unit> {
        Arc::new(Unit::scaled("meter", "m", Dimension::base(LENGTH), 1.0, true))
    }

    #[test]
    fn solves_a_simple_linear_chain() {
        let mut problem = Problem::new("chain", "a simple topological chain");
        problem.add_known_variable("A", "a", Dimension::base(LENGTH), Quantity::new(3.0, &meter())).expect("new var");
        problem.add_variable("B", "b", Dimension::base(LENGTH)).expect("new var");
        problem.add_variable("C", "c", Dimension::base(LENGTH)).expect("new var");
        problem.add_equation(Equation::new(
            "b_eqn",
            Expr::var("b", Dimension::base(LENGTH)),
            Expr::var("a", Dimension::base(LENGTH)).add(Expr::constant(Quantity::new(1.0, &meter()))),
        ));
        problem.add_equation(Equation::new(
            "c_eqn",
            Expr::var("c", Dimension::base(LENGTH)),
            Expr::var("b", Dimension::base(LENGTH)).mul(Expr::constant(Quantity::dimensionless(2.0))),
        ));

        problem.solve().expect("solvable");
        assert!((problem.variable("b").unwrap().quantity().unwrap().to_si() - 4.0).abs() < 1e-9);
        assert!((problem.variable("c").unwrap().quantity().unwrap().to_si() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn dimension_mismatch_propagates_out_of_solve() {
        let mut problem = Problem::new("mismatch", "force over stress should not be a length");
        let newton = Arc::new(Unit::scaled("newton", "N", Dimension::base(MASS), 1.0, true));
        problem.add_known_variable("force", "force", Dimension::base(MASS), Quantity::new(1000.0, &newton)).expect("ok");
        problem.add_known_variable("stress", "stress", Dimension::base(MASS), Quantity::new(200.0, &newton)).expect("ok");
        problem.add_variable("area", "area", Dimension::base(LENGTH)).expect("ok");
        problem.add_equation(Equation::new(
            "area_eqn",
            Expr::var("area", Dimension::base(LENGTH)),
            Expr::var("force", Dimension::base(MASS)).div(Expr::var("stress", Dimension::base(MASS))),
        ));
        let err = problem.solve().unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch { .. }));
    }

    #[test]
    fn resolve_preserves_preferred_unit() {
        let psi = Arc::new(Unit::scaled("psi", "psi", Dimension::base(MASS), 6894.76, true));
        let mut problem = Problem::new("pressure", "re-solve preserves display unit");
        problem.add_known_variable("P", "p", Dimension::base(MASS), Quantity::new(100.0, &psi)).expect("ok");
        problem.add_variable("result", "result", Dimension::base(MASS)).expect("ok");
        problem.variable_mut("result").unwrap().set_output_unit(Arc::clone(&psi));
        problem.add_equation(Equation::new(
            "identity",
            Expr::var("result", Dimension::base(MASS)),
            Expr::var("p", Dimension::base(MASS)),
        ));

        problem.solve().expect("first solve");
        let first = problem.variable("result").unwrap().quantity().unwrap().preferred_value();
        assert!((first - 100.0).abs() < 1e-6);

        problem.variable_mut("p").unwrap().set_given(Quantity::new(150.0, &psi)).expect("reassign");
        problem.solve().expect("re-solve");
        let second = problem.variable("result").unwrap().quantity().unwrap().preferred_value();
        assert!((second - 150.0).abs() < 1e-6);
        assert_eq!(problem.variable("result").unwrap().preferred_unit().unwrap().symbol(), "psi");
    }

    #[test]
    fn composition_propagates_shared_parent_value() {
        let mut sub = Problem::new("sub", "embedded problem");
        sub.add_variable("Length", "x", Dimension::base(LENGTH)).expect("ok");

        let mut parent = Problem::new("parent", "embeds sub with a shared binding");
        parent.add_known_variable("Parent length", "x_parent", Dimension::base(LENGTH), Quantity::new(5.0, &meter())).expect("ok");
        parent.add_sub_problem("sub", sub).expect("embed");
        parent.add_shared_binding("x_parent", vec!["sub_x".to_owned()]).expect("shared binding");

        parent.solve().expect("solves");
        assert!((parent.variable("sub_x").unwrap().quantity().unwrap().to_si() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn coupled_equations_fall_back_to_the_residual_solver() {
        let mut problem = Problem::new("coupled", "x + y = 10, x*y = 21");
        problem.add_variable("x", "x", Dimension::dimensionless()).expect("ok");
        problem.add_variable("y", "y", Dimension::dimensionless()).expect("ok");
        problem.add_equation(Equation::new(
            "sum",
            Expr::var("x", Dimension::dimensionless()).add(Expr::var("y", Dimension::dimensionless())),
            Expr::constant(Quantity::dimensionless(10.0)),
        ));
        problem.add_equation(Equation::new(
            "product",
            Expr::var("x", Dimension::dimensionless()).mul(Expr::var("y", Dimension::dimensionless())),
            Expr::constant(Quantity::dimensionless(21.0)),
        ));

        problem.solve().expect("converges");
        let x = problem.variable("x").unwrap().quantity().unwrap().to_si();
        let y = problem.variable("y").unwrap().quantity().unwrap().to_si();
        assert!((x + y - 10.0).abs() < 1e-6);
        assert!((x * y - 21.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_variable_symbol_is_rejected() {
        let mut problem = Problem::new("dup", "duplicate symbols are rejected");
        problem.add_variable("A", "a", Dimension::base(LENGTH)).expect("first is fine");
        let err = problem.add_variable("A again", "a", Dimension::base(LENGTH)).unwrap_err();
        assert!(matches!(err, EngineError::CompositionError { .. }));
    }
}
