//! The expression tree: a closed sum type that evaluates to a [`Quantity`]
//! given a variable environment.
//!
//! Unlike a computer-algebra expression tree, nodes here are never rewritten
//! or simplified after construction — there is no canonicalization, no
//! flattening of nested sums, no structural hashing. The tree is built once
//! and walked by [`evaluate`](evaluate::evaluate) and by the equation
//! inverter; that is the full extent of what this engine does with it.

mod evaluate;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::dimension::Dimension;
use crate::quantity::Quantity;

pub use evaluate::{evaluate, Env};

/// The arithmetic binary operators an [`Expr::BinaryOp`] node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `left + right`
    Add,
    /// `left - right`
    Sub,
    /// `left * right`
    Mul,
    /// `left / right`
    Div,
    /// `left ^ right`
    Pow,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
        };
        write!(f, "{s}")
    }
}

/// The unary functions an [`Expr::UnaryFn`] node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFnKind {
    /// Sine, argument in radians (dimensionless).
    Sin,
    /// Cosine, argument in radians (dimensionless).
    Cos,
    /// Tangent, argument in radians (dimensionless).
    Tan,
    /// Natural logarithm, dimensionless argument.
    Ln,
    /// Base-10 logarithm, dimensionless argument.
    Log10,
    /// Exponential, dimensionless argument.
    Exp,
    /// Square root; halves the argument's dimension exponents.
    Sqrt,
    /// Absolute value; preserves dimension.
    Abs,
    /// Unary negation; preserves dimension.
    Neg,
}

impl fmt::Display for UnaryFnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryFnKind::Sin => "sin",
            UnaryFnKind::Cos => "cos",
            UnaryFnKind::Tan => "tan",
            UnaryFnKind::Ln => "ln",
            UnaryFnKind::Log10 => "log10",
            UnaryFnKind::Exp => "exp",
            UnaryFnKind::Sqrt => "sqrt",
            UnaryFnKind::Abs => "abs",
            UnaryFnKind::Neg => "neg",
        };
        write!(f, "{s}")
    }
}

/// The relational operators an [`Expr::Comparison`] node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        };
        write!(f, "{s}")
    }
}

/// A non-`Quantity` value a [`Expr::Summation`] body may close over, e.g. a
/// coefficient matrix indexed by the summation variables.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtraValue {
    /// A single scalar.
    Scalar(f64),
    /// A one-dimensional array, indexed by the innermost summation index.
    Vector(Vec<f64>),
    /// A two-dimensional array, indexed by the two outermost summation indices.
    Matrix(Vec<Vec<f64>>),
}

/// Non-`Quantity` bindings available to a [`Expr::Summation`] body.
pub type ExtraEnv = FxHashMap<String, ExtraValue>;

/// The bound specification for one axis of a [`Expr::Summation`]. Several
/// axes compose into a Cartesian product for nested sums.
#[derive(Debug, Clone)]
pub enum SumBound {
    /// `0..=n` (inclusive), step 1.
    Upper(i64),
    /// `(lo, hi, step)`, inclusive of `hi` when it lands exactly on a step.
    Range {
        /// Inclusive lower bound.
        lo: i64,
        /// Inclusive upper bound.
        hi: i64,
        /// Stride between successive indices; must be positive.
        step: i64,
    },
}

impl SumBound {
    pub(crate) fn indices(&self) -> Vec<i64> {
        match *self {
            SumBound::Upper(n) => (0..=n).collect(),
            SumBound::Range { lo, hi, step } => {
                debug_assert!(step > 0, "summation step must be positive");
                let mut out = Vec::new();
                let mut i = lo;
                while i <= hi {
                    out.push(i);
                    i += step;
                }
                out
            }
        }
    }
}

/// One arm of a [`Expr::RangeCase`]: the interval `[lower, upper]` (with
/// configurable endpoint inclusivity) mapped to `case_expr`. A missing bound
/// means unbounded on that side.
#[derive(Debug, Clone)]
pub struct RangeArm {
    /// Inclusive/exclusive lower bound, compared against the evaluated
    /// value's SI magnitude. `None` means unbounded below.
    pub lower: Option<f64>,
    /// Inclusive/exclusive upper bound. `None` means unbounded above.
    pub upper: Option<f64>,
    /// Whether `lower` is inclusive. Defaults to `true` (half-open-from-below
    /// ranges are the common case in engineering lookup tables).
    pub lower_inclusive: bool,
    /// Whether `upper` is inclusive. Defaults to `false`, so consecutive
    /// arms' shared boundary belongs to the higher arm exactly once.
    pub upper_inclusive: bool,
    /// The expression to evaluate when the value falls in this arm.
    pub case_expr: Arc<Expr>,
}

impl RangeArm {
    fn contains(&self, value: f64) -> bool {
        let above_lower = match self.lower {
            None => true,
            Some(lo) if self.lower_inclusive => value >= lo,
            Some(lo) => value > lo,
        };
        let below_upper = match self.upper {
            None => true,
            Some(hi) if self.upper_inclusive => value <= hi,
            Some(hi) => value < hi,
        };
        above_lower && below_upper
    }
}

/// A lazily-evaluated, dimensionally-aware expression tree.
///
/// `Expr` is a plain value type: every variant owns its children (via
/// `Arc` for sharing, not for interior mutability), and the tree is walked
/// fresh on every `evaluate` call rather than cached or rewritten.
#[derive(Clone)]
pub enum Expr {
    /// A literal, already-dimensioned value.
    Const(Quantity),
    /// A reference to a variable by symbol, with the dimension it is
    /// expected to carry once bound.
    VariableRef {
        /// The symbol to look up in the environment.
        symbol: String,
        /// The dimension the bound value must carry.
        expected_dimension: Dimension,
    },
    /// A binary arithmetic operation.
    BinaryOp {
        /// Which operator.
        op: BinOp,
        /// Left operand.
        left: Arc<Expr>,
        /// Right operand.
        right: Arc<Expr>,
    },
    /// A unary function application.
    UnaryFn {
        /// Which function.
        func: UnaryFnKind,
        /// The argument.
        arg: Arc<Expr>,
    },
    /// `if condition then then_branch else else_branch`. `condition` must
    /// evaluate to a dimensionless `0.0` or `1.0`.
    Conditional {
        /// The condition, evaluating to dimensionless 0/1.
        condition: Arc<Expr>,
        /// Evaluated when the condition is `1.0`.
        then_branch: Arc<Expr>,
        /// Evaluated when the condition is `0.0`.
        else_branch: Arc<Expr>,
    },
    /// A relational comparison, yielding dimensionless `0.0`/`1.0`.
    Comparison {
        /// Which relational operator.
        op: CompareOp,
        /// Left operand.
        left: Arc<Expr>,
        /// Right operand.
        right: Arc<Expr>,
    },
    /// Selects one of several expressions based on the current discrete
    /// value of a `SelectVariable`-style variable.
    Match {
        /// The symbol of the discrete selector variable.
        selector: String,
        /// `(option value, expression to use when selected)` pairs, tried
        /// in order.
        cases: Vec<(String, Arc<Expr>)>,
        /// Used when the selector's value matches no case.
        default: Option<Arc<Expr>>,
    },
    /// A (possibly nested/Cartesian-product) summation. `body` builds a
    /// fresh expression for each index tuple; it may close over
    /// `extra_env` for non-`Quantity` data (e.g. coefficient tables).
    Summation {
        /// One bound specification per summation axis; more than one axis
        /// sums over the Cartesian product of all axes' indices.
        bounds: Vec<SumBound>,
        /// Builds the per-point expression from the current index tuple.
        body: Arc<dyn Fn(&[i64], &ExtraEnv) -> Expr + Send + Sync>,
        /// Non-`Quantity` values available to `body`.
        extra_env: ExtraEnv,
    },
    /// A piecewise expression keyed by which interval `value_expr` falls in.
    RangeCase {
        /// The expression whose value selects an arm.
        value_expr: Arc<Expr>,
        /// The arms, tried in order; the first containing arm wins.
        cases: Vec<RangeArm>,
        /// Used when no arm contains the value.
        otherwise: Option<Arc<Expr>>,
    },
    /// A late-binding expression, built by invoking `thunk` at evaluation
    /// time rather than at construction time. Used during Problem
    /// composition, when an expression must reference variables that do
    /// not exist yet. The thunk must be idempotent and side-effect-free.
    Deferred(Arc<dyn Fn() -> Expr + Send + Sync>),
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(q) => f.debug_tuple("Const").field(q).finish(),
            Expr::VariableRef { symbol, expected_dimension } => f
                .debug_struct("VariableRef")
                .field("symbol", symbol)
                .field("expected_dimension", expected_dimension)
                .finish(),
            Expr::BinaryOp { op, left, right } => f
                .debug_struct("BinaryOp")
                .field("op", op)
                .field("left", left)
                .field("right", right)
                .finish(),
            Expr::UnaryFn { func, arg } => {
                f.debug_struct("UnaryFn").field("func", func).field("arg", arg).finish()
            }
            Expr::Conditional { condition, then_branch, else_branch } => f
                .debug_struct("Conditional")
                .field("condition", condition)
                .field("then_branch", then_branch)
                .field("else_branch", else_branch)
                .finish(),
            Expr::Comparison { op, left, right } => f
                .debug_struct("Comparison")
                .field("op", op)
                .field("left", left)
                .field("right", right)
                .finish(),
            Expr::Match { selector, cases, default } => f
                .debug_struct("Match")
                .field("selector", selector)
                .field("cases", cases)
                .field("default", default)
                .finish(),
            Expr::Summation { bounds, .. } => {
                f.debug_struct("Summation").field("bounds", bounds).finish_non_exhaustive()
            }
            Expr::RangeCase { value_expr, cases, otherwise } => f
                .debug_struct("RangeCase")
                .field("value_expr", value_expr)
                .field("cases", cases)
                .field("otherwise", otherwise)
                .finish(),
            Expr::Deferred(_) => f.debug_tuple("Deferred").finish_non_exhaustive(),
        }
    }
}

impl Expr {
    /// Build a constant node.
    #[must_use]
    pub const fn constant(value: Quantity) -> Self {
        Expr::Const(value)
    }

    /// Build a variable-reference node.
    #[must_use]
    pub fn var(symbol: impl Into<String>, expected_dimension: Dimension) -> Self {
        Expr::VariableRef {
            symbol: symbol.into(),
            expected_dimension,
        }
    }

    fn binary(op: BinOp, left: Self, right: Self) -> Self {
        Expr::BinaryOp {
            op,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    /// `self + other`
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::binary(BinOp::Add, self, other)
    }

    /// `self - other`
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::binary(BinOp::Sub, self, other)
    }

    /// `self * other`
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self::binary(BinOp::Mul, self, other)
    }

    /// `self / other`
    #[must_use]
    pub fn div(self, other: Self) -> Self {
        Self::binary(BinOp::Div, self, other)
    }

    /// `self ^ other`
    #[must_use]
    pub fn pow(self, other: Self) -> Self {
        Self::binary(BinOp::Pow, self, other)
    }

    fn unary(func: UnaryFnKind, arg: Self) -> Self {
        Expr::UnaryFn { func, arg: Arc::new(arg) }
    }

    /// `sin(self)`
    #[must_use]
    pub fn sin(self) -> Self {
        Self::unary(UnaryFnKind::Sin, self)
    }

    /// `cos(self)`
    #[must_use]
    pub fn cos(self) -> Self {
        Self::unary(UnaryFnKind::Cos, self)
    }

    /// `tan(self)`
    #[must_use]
    pub fn tan(self) -> Self {
        Self::unary(UnaryFnKind::Tan, self)
    }

    /// `ln(self)`
    #[must_use]
    pub fn ln(self) -> Self {
        Self::unary(UnaryFnKind::Ln, self)
    }

    /// `log10(self)`
    #[must_use]
    pub fn log10(self) -> Self {
        Self::unary(UnaryFnKind::Log10, self)
    }

    /// `exp(self)`
    #[must_use]
    pub fn exp(self) -> Self {
        Self::unary(UnaryFnKind::Exp, self)
    }

    /// `sqrt(self)`
    #[must_use]
    pub fn sqrt(self) -> Self {
        Self::unary(UnaryFnKind::Sqrt, self)
    }

    /// `abs(self)`
    #[must_use]
    pub fn abs(self) -> Self {
        Self::unary(UnaryFnKind::Abs, self)
    }

    /// `-self`
    #[must_use]
    pub fn neg(self) -> Self {
        Self::unary(UnaryFnKind::Neg, self)
    }

    /// `if condition { then_branch } else { else_branch }`
    #[must_use]
    pub fn conditional(condition: Self, then_branch: Self, else_branch: Self) -> Self {
        Expr::Conditional {
            condition: Arc::new(condition),
            then_branch: Arc::new(then_branch),
            else_branch: Arc::new(else_branch),
        }
    }

    fn compare(op: CompareOp, left: Self, right: Self) -> Self {
        Expr::Comparison {
            op,
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    /// `self < other`
    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        Self::compare(CompareOp::Lt, self, other)
    }

    /// `self <= other`
    #[must_use]
    pub fn le(self, other: Self) -> Self {
        Self::compare(CompareOp::Le, self, other)
    }

    /// `self > other`
    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        Self::compare(CompareOp::Gt, self, other)
    }

    /// `self >= other`
    #[must_use]
    pub fn ge(self, other: Self) -> Self {
        Self::compare(CompareOp::Ge, self, other)
    }

    /// The smaller of `a` and `b`, implemented as `if a <= b { a } else { b }`
    /// so it defers to the residual solver exactly like any other
    /// multi-branch conditional when the solve target appears in both arms.
    #[must_use]
    pub fn min(a: Self, b: Self) -> Self {
        Self::conditional(a.clone().le(b.clone()), a, b)
    }

    /// The larger of `a` and `b`, the `max` counterpart of [`Self::min`].
    #[must_use]
    pub fn max(a: Self, b: Self) -> Self {
        Self::conditional(a.clone().gt(b.clone()), a, b)
    }

    /// Build a `Match` node.
    #[must_use]
    pub fn select_match(
        selector: impl Into<String>,
        cases: Vec<(String, Self)>,
        default: Option<Self>,
    ) -> Self {
        Expr::Match {
            selector: selector.into(),
            cases: cases.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
            default: default.map(Arc::new),
        }
    }

    /// Build a `RangeCase` node.
    #[must_use]
    pub fn range_case(value_expr: Self, cases: Vec<RangeArm>, otherwise: Option<Self>) -> Self {
        Expr::RangeCase {
            value_expr: Arc::new(value_expr),
            cases,
            otherwise: otherwise.map(Arc::new),
        }
    }

    /// Build a late-binding expression.
    #[must_use]
    pub fn deferred(thunk: impl Fn() -> Self + Send + Sync + 'static) -> Self {
        Expr::Deferred(Arc::new(thunk))
    }

    /// The set of variable symbols this expression references, computed
    /// recursively. For [`Expr::Summation`] and [`Expr::Deferred`] nodes the
    /// body/thunk is sampled once (at the first index point, or invoked
    /// directly) as a best-effort approximation, since their true reference
    /// set cannot be known without evaluating the closure.
    #[must_use]
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free_variables(&mut out);
        out
    }

    fn collect_free_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_) => {}
            Expr::VariableRef { symbol, .. } => {
                out.insert(symbol.clone());
            }
            Expr::BinaryOp { left, right, .. } | Expr::Comparison { left, right, .. } => {
                left.collect_free_variables(out);
                right.collect_free_variables(out);
            }
            Expr::UnaryFn { arg, .. } => arg.collect_free_variables(out),
            Expr::Conditional { condition, then_branch, else_branch } => {
                condition.collect_free_variables(out);
                then_branch.collect_free_variables(out);
                else_branch.collect_free_variables(out);
            }
            Expr::Match { selector, cases, default } => {
                out.insert(selector.clone());
                for (_, case) in cases {
                    case.collect_free_variables(out);
                }
                if let Some(default) = default {
                    default.collect_free_variables(out);
                }
            }
            Expr::Summation { bounds, body, extra_env } => {
                let first_index = bounds.first().map(SumBound::indices).unwrap_or_default();
                let indices = vec![first_index.first().copied().unwrap_or(0); bounds.len()];
                body(&indices, extra_env).collect_free_variables(out);
            }
            Expr::RangeCase { value_expr, cases, otherwise } => {
                value_expr.collect_free_variables(out);
                for arm in cases {
                    arm.case_expr.collect_free_variables(out);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_free_variables(out);
                }
            }
            Expr::Deferred(thunk) => thunk().collect_free_variables(out),
        }
    }

    /// Rebuild this expression with every referenced symbol (variable
    /// references and `Match` selectors) rewritten through `mapping`.
    /// Symbols absent from `mapping` are left untouched. Used during
    /// `Problem` composition to re-parent a sub-problem's equations under
    /// its `{prefix}_{symbol}` namespace.
    #[must_use]
    pub fn rename_symbols(&self, mapping: &FxHashMap<String, String>) -> Self {
        let renamed = |s: &str| mapping.get(s).cloned().unwrap_or_else(|| s.to_owned());
        match self {
            Expr::Const(q) => Expr::Const(q.clone()),
            Expr::VariableRef { symbol, expected_dimension } => Expr::VariableRef {
                symbol: renamed(symbol),
                expected_dimension: *expected_dimension,
            },
            Expr::BinaryOp { op, left, right } => Expr::BinaryOp {
                op: *op,
                left: Arc::new(left.rename_symbols(mapping)),
                right: Arc::new(right.rename_symbols(mapping)),
            },
            Expr::UnaryFn { func, arg } => Expr::UnaryFn {
                func: *func,
                arg: Arc::new(arg.rename_symbols(mapping)),
            },
            Expr::Conditional { condition, then_branch, else_branch } => Expr::Conditional {
                condition: Arc::new(condition.rename_symbols(mapping)),
                then_branch: Arc::new(then_branch.rename_symbols(mapping)),
                else_branch: Arc::new(else_branch.rename_symbols(mapping)),
            },
            Expr::Comparison { op, left, right } => Expr::Comparison {
                op: *op,
                left: Arc::new(left.rename_symbols(mapping)),
                right: Arc::new(right.rename_symbols(mapping)),
            },
            Expr::Match { selector, cases, default } => Expr::Match {
                selector: renamed(selector),
                cases: cases
                    .iter()
                    .map(|(k, v)| (k.clone(), Arc::new(v.rename_symbols(mapping))))
                    .collect(),
                default: default.as_ref().map(|d| Arc::new(d.rename_symbols(mapping))),
            },
            Expr::Summation { bounds, body, extra_env } => {
                let body = Arc::clone(body);
                let mapping = mapping.clone();
                Expr::Summation {
                    bounds: bounds.clone(),
                    body: Arc::new(move |indices, extra| body(indices, extra).rename_symbols(&mapping)),
                    extra_env: extra_env.clone(),
                }
            }
            Expr::RangeCase { value_expr, cases, otherwise } => Expr::RangeCase {
                value_expr: Arc::new(value_expr.rename_symbols(mapping)),
                cases: cases
                    .iter()
                    .map(|arm| RangeArm {
                        lower: arm.lower,
                        upper: arm.upper,
                        lower_inclusive: arm.lower_inclusive,
                        upper_inclusive: arm.upper_inclusive,
                        case_expr: Arc::new(arm.case_expr.rename_symbols(mapping)),
                    })
                    .collect(),
                otherwise: otherwise.as_ref().map(|o| Arc::new(o.rename_symbols(mapping))),
            },
            Expr::Deferred(thunk) => {
                let thunk = Arc::clone(thunk);
                let mapping = mapping.clone();
                Expr::Deferred(Arc::new(move || thunk().rename_symbols(&mapping)))
            }
        }
    }
}

/// Enumerate every index tuple in the Cartesian product of `bounds`, in
/// declaration order (outermost axis varies slowest).
pub(crate) fn cartesian_indices(bounds: &[SumBound]) -> Vec<Vec<i64>> {
    let axes: Vec<Vec<i64>> = bounds.iter().map(SumBound::indices).collect();
    let mut out = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(out.len() * axis.len());
        for prefix in &out {
            for &i in &axis {
                let mut point = prefix.clone();
                point.push(i);
                next.push(point);
            }
        }
        out = next;
    }
    out
}
