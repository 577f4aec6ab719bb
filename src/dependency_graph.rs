//! Variable-level dependency graph built fresh from a [`Problem`](crate::problem::Problem)'s
//! equations on every `solve()`.
//!
//! Edge `u -> v` means some equation determines `v` and references `u`. The
//! graph is used for two things: producing a topological solve order for
//! equations with a single candidate target, and surfacing strongly
//! connected components (coupled unknowns) that the topological pass cannot
//! resolve and must hand to the residual solver (§4.6).

use std::collections::BTreeSet;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use rustc_hash::FxHashMap;

use crate::equation::Equation;

/// How one equation was classified while building the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum EquationRole {
    /// Exactly one of the equation's free variables is currently unknown:
    /// that variable is its target, solvable by analytic inversion once
    /// every other free variable is known.
    SingleTarget(String),
    /// More than one free variable is unknown; this equation can only be
    /// resolved as part of a residual subsystem.
    Coupled(Vec<String>),
    /// Every free variable is already known; this equation contributes no
    /// dependency edges.
    FullyKnown,
}

/// A variable-level dependency graph over one solve attempt's equations.
pub struct DependencyGraph {
    graph: DiGraphMap<u32, ()>,
    index_of: FxHashMap<String, u32>,
    symbols: Vec<String>,
    roles: Vec<EquationRole>,
}

impl DependencyGraph {
    fn intern(&mut self, symbol: &str) -> u32 {
        if let Some(&idx) = self.index_of.get(symbol) {
            return idx;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "a single Problem will never carry anywhere near u32::MAX variables"
        )]
        let idx = self.symbols.len() as u32;
        self.symbols.push(symbol.to_owned());
        self.index_of.insert(symbol.to_owned(), idx);
        self.graph.add_node(idx);
        idx
    }

    /// Build the graph from `equations`, given the set of currently unknown
    /// variable symbols and the Problem's variable declaration order (used
    /// only to break ties in the multi-unknown heuristic below).
    #[must_use]
    pub fn build(equations: &[Equation], unknowns: &BTreeSet<String>, variable_order: &[String]) -> Self {
        let mut this = Self {
            graph: DiGraphMap::new(),
            index_of: FxHashMap::default(),
            symbols: Vec::new(),
            roles: Vec::with_capacity(equations.len()),
        };

        let declaration_rank: FxHashMap<&str, usize> =
            variable_order.iter().map(String::as_str).enumerate().collect();

        // How many equations reference each unknown at all; used as the
        // "unblocks the most downstream equations" heuristic from §9's open
        // question, for equations with more than one unknown (where there is
        // no unique analytic target to assign edges from).
        let mut reference_count: FxHashMap<String, usize> = FxHashMap::default();
        for eq in equations {
            for symbol in eq.free_variables() {
                if unknowns.contains(&symbol) {
                    *reference_count.entry(symbol).or_insert(0) += 1;
                }
            }
        }

        for eq in equations {
            let free = eq.free_variables();
            let eq_unknowns: Vec<String> = free.iter().filter(|s| unknowns.contains(*s)).cloned().collect();

            let role = match eq_unknowns.len() {
                0 => EquationRole::FullyKnown,
                1 => {
                    let target = eq_unknowns[0].clone();
                    let target_idx = this.intern(&target);
                    for symbol in &free {
                        if symbol != &target {
                            let source_idx = this.intern(symbol);
                            this.graph.add_edge(source_idx, target_idx, ());
                        }
                    }
                    EquationRole::SingleTarget(target)
                }
                _ => {
                    let mut ranked = eq_unknowns.clone();
                    ranked.sort_by(|a, b| {
                        let count_a = reference_count.get(a).copied().unwrap_or(0);
                        let count_b = reference_count.get(b).copied().unwrap_or(0);
                        count_b
                            .cmp(&count_a)
                            .then_with(|| declaration_rank.get(a.as_str()).cmp(&declaration_rank.get(b.as_str())))
                    });
                    if let Some(target) = ranked.first() {
                        let target_idx = this.intern(target);
                        for symbol in &eq_unknowns {
                            if symbol != target {
                                let source_idx = this.intern(symbol);
                                this.graph.add_edge(source_idx, target_idx, ());
                            }
                        }
                    }
                    EquationRole::Coupled(eq_unknowns)
                }
            };
            this.roles.push(role);
        }
        this
    }

    /// Per-equation classification, in declaration order.
    #[must_use]
    pub fn roles(&self) -> &[EquationRole] {
        &self.roles
    }

    /// A topological order over every variable that appears in the graph
    /// (dependencies before dependents), or the members of one cyclic
    /// strongly connected component if the graph is not a DAG.
    ///
    /// # Errors
    /// Returns the symbols forming a cycle when the dependency graph is not
    /// acyclic.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|idx| self.symbols[idx as usize].clone()).collect()),
            Err(cycle) => {
                let offending = cycle.node_id();
                let members = tarjan_scc(&self.graph)
                    .into_iter()
                    .find(|scc| scc.contains(&offending))
                    .unwrap_or_else(|| vec![offending]);
                Err(members.into_iter().map(|idx| self.symbols[idx as usize].clone()).collect())
            }
        }
    }

    /// Every strongly connected component of size greater than one, plus any
    /// single-node component with a self-loop. These are the coupled
    /// subsystems the topological pass cannot resolve variable-by-variable.
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| scc.into_iter().map(|idx| self.symbols[idx as usize].clone()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::Dimension;
    use crate::expr::Expr;
    use crate::quantity::Quantity;

    fn eq(name: &str, lhs: Expr, rhs: Expr) -> Equation {
        Equation::new(name, lhs, rhs)
    }

    #[test]
    fn single_target_equations_produce_a_topological_order() {
        // a is known; b_eqn: b = a + 1; c_eqn: c = b * 2
        let equations = vec![
            eq(
                "b_eqn",
                Expr::var("b", Dimension::dimensionless()),
                Expr::var("a", Dimension::dimensionless()).add(Expr::constant(Quantity::dimensionless(1.0))),
            ),
            eq(
                "c_eqn",
                Expr::var("c", Dimension::dimensionless()),
                Expr::var("b", Dimension::dimensionless()).mul(Expr::constant(Quantity::dimensionless(2.0))),
            ),
        ];
        let unknowns: BTreeSet<String> = ["b".to_owned(), "c".to_owned()].into_iter().collect();
        let order = ["a".to_owned(), "b".to_owned(), "c".to_owned()];
        let graph = DependencyGraph::build(&equations, &unknowns, &order);
        let topo = graph.topological_order().expect("acyclic");
        let pos_b = topo.iter().position(|s| s == "b").expect("b present");
        let pos_c = topo.iter().position(|s| s == "c").expect("c present");
        assert!(pos_b < pos_c, "b must be solved before c depends on it");
    }

    #[test]
    fn mutual_dependency_is_reported_as_a_cycle() {
        // x_eqn: x = y + 1; y_eqn: y = x - 1 (coupled, neither resolvable alone)
        let equations = vec![
            eq(
                "x_eqn",
                Expr::var("x", Dimension::dimensionless()),
                Expr::var("y", Dimension::dimensionless()).add(Expr::constant(Quantity::dimensionless(1.0))),
            ),
            eq(
                "y_eqn",
                Expr::var("y", Dimension::dimensionless()),
                Expr::var("x", Dimension::dimensionless()).sub(Expr::constant(Quantity::dimensionless(1.0))),
            ),
        ];
        let unknowns: BTreeSet<String> = ["x".to_owned(), "y".to_owned()].into_iter().collect();
        let order = ["x".to_owned(), "y".to_owned()];
        let graph = DependencyGraph::build(&equations, &unknowns, &order);
        assert!(graph.topological_order().is_err());
        let sccs = graph.strongly_connected_components();
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }

    #[test]
    fn multi_unknown_equation_is_marked_coupled() {
        let equations = vec![eq(
            "sum_eqn",
            Expr::var("x", Dimension::dimensionless()).add(Expr::var("y", Dimension::dimensionless())),
            Expr::constant(Quantity::dimensionless(10.0)),
        )];
        let unknowns: BTreeSet<String> = ["x".to_owned(), "y".to_owned()].into_iter().collect();
        let order = ["x".to_owned(), "y".to_owned()];
        let graph = DependencyGraph::build(&equations, &unknowns, &order);
        assert!(matches!(graph.roles()[0], EquationRole::Coupled(_)));
    }
}
