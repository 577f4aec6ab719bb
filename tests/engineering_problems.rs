//! End-to-end worked scenarios exercising `Problem` the way a caller would:
//! declare variables, wire equations, solve, and read back preferred units.
//! These sit above the per-module `#[cfg(test)]` suites, which already cover
//! each operator and invariant in isolation.

mod common;

use qnty_core::{Dimension, Equation, Expr, Problem, Quantity};

fn dimensionless(value: f64) -> Quantity {
    Quantity::dimensionless(value)
}

/// ASME-style pipe wall thickness sizing: `T = T̄·(1 − Uₘ)`, a pressure
/// design thickness `t`, and a maximum allowable pressure `Pmax` derived
/// from the corroded, tolerance-reduced wall thickness. All three equations
/// are single-target and resolve analytically in one topological pass.
#[test]
fn pipe_wall_thickness_resolves_analytically() {
    let length = Dimension::base(common::LENGTH);
    let pressure = common::pressure_dimension();

    let mut problem = Problem::new("Pipe wall thickness", "ASME B31.3 straight-pipe sizing");
    problem.add_known_variable("Design pressure", "P", pressure, Quantity::new(90.0, &common::psi())).unwrap();
    problem.add_known_variable("Outside diameter", "D", length, Quantity::new(0.84, &common::inch())).unwrap();
    problem.add_known_variable("Nominal wall thickness", "Tbar", length, Quantity::new(0.147, &common::inch())).unwrap();
    problem.add_known_variable("Mill tolerance", "Um", Dimension::dimensionless(), dimensionless(0.125)).unwrap();
    problem.add_known_variable("Allowable stress", "S", pressure, Quantity::new(20_000.0, &common::psi())).unwrap();
    problem.add_known_variable("Joint efficiency", "E", Dimension::dimensionless(), dimensionless(0.8)).unwrap();
    problem.add_known_variable("Weld joint factor", "W", Dimension::dimensionless(), dimensionless(1.0)).unwrap();
    problem.add_known_variable("Y coefficient", "Y", Dimension::dimensionless(), dimensionless(0.4)).unwrap();
    problem.add_known_variable("Corrosion allowance", "c", length, Quantity::new(0.0, &common::inch())).unwrap();

    problem.add_variable("Corroded, tolerance-reduced wall thickness", "T", length).unwrap();
    problem.add_variable("Pressure design thickness", "t", length).unwrap();
    problem.add_variable("Maximum allowable pressure", "Pmax", pressure).unwrap();

    problem.variable_mut("T").unwrap().set_output_unit(common::inch());
    problem.variable_mut("t").unwrap().set_output_unit(common::inch());
    problem.variable_mut("Pmax").unwrap().set_output_unit(common::psi());

    // T = Tbar * (1 - Um)
    problem.add_equation(Equation::new(
        "wall thickness reduction",
        Expr::var("T", length),
        Expr::var("Tbar", length).mul(Expr::constant(dimensionless(1.0)).sub(Expr::var("Um", Dimension::dimensionless()))),
    ));

    // t = P * D / (2 * (S*E*W + P*Y))
    problem.add_equation(Equation::new(
        "pressure design thickness",
        Expr::var("t", length),
        Expr::var("P", pressure).mul(Expr::var("D", length)).div(Expr::constant(dimensionless(2.0)).mul(
            Expr::var("S", pressure)
                .mul(Expr::var("E", Dimension::dimensionless()))
                .mul(Expr::var("W", Dimension::dimensionless()))
                .add(Expr::var("P", pressure).mul(Expr::var("Y", Dimension::dimensionless()))),
        )),
    ));

    // Pmax = 2 * (T - c) * S * E * W / (D - 2 * (T - c) * Y)
    let net_thickness = || Expr::var("T", length).sub(Expr::var("c", length));
    problem.add_equation(Equation::new(
        "maximum allowable pressure",
        Expr::var("Pmax", pressure),
        Expr::constant(dimensionless(2.0))
            .mul(net_thickness())
            .mul(Expr::var("S", pressure))
            .mul(Expr::var("E", Dimension::dimensionless()))
            .mul(Expr::var("W", Dimension::dimensionless()))
            .div(Expr::var("D", length).sub(Expr::constant(dimensionless(2.0)).mul(net_thickness()).mul(Expr::var("Y", Dimension::dimensionless())))),
    ));

    problem.solve().expect("pipe sizing problem solves");

    let t_value = problem.variable("T").unwrap().quantity().unwrap().preferred_value();
    assert!((t_value - 0.128_625).abs() < 1e-9, "T = {t_value}");

    let thickness_value = problem.variable("t").unwrap().quantity().unwrap().preferred_value();
    assert!((thickness_value - 0.002_357_196_308_306_311).abs() < 1e-9, "t = {thickness_value}");

    let pmax_value = problem.variable("Pmax").unwrap().quantity().unwrap().preferred_value();
    assert!((pmax_value - 5584.045_584_045_584).abs() < 1e-6, "Pmax = {pmax_value}");
}

/// `Quantity::div` must always recombine dimensions, even when the divisor's
/// SI-base value happens to be exactly `1.0` — a prior regression treated a
/// divisor of `1.0` as a no-op and returned the dividend's own dimension
/// instead of cancelling it against the divisor's.
#[test]
fn dividing_two_lengths_whose_si_values_agree_still_yields_dimensionless() {
    let length = Dimension::base(common::LENGTH);
    let radius = Quantity::new(5.0, &common::meter());
    let one_meter = Quantity::new(1.0, &common::meter());

    let ratio = radius.div(&one_meter).expect("length / length is dimensionless");
    assert_eq!(ratio.dimension(), Dimension::dimensionless());
    assert!((ratio.preferred_value() - 5.0).abs() < 1e-12);

    // Same check driven through a solved Problem rather than raw Quantity
    // arithmetic, so the regression is also caught at the composition layer.
    let mut problem = Problem::new("Ratio check", "R / D stays dimensionless");
    problem.add_known_variable("Radius", "R", length, radius).unwrap();
    problem.add_known_variable("Reference length", "D", length, one_meter).unwrap();
    problem.add_variable("Ratio", "ratio", Dimension::dimensionless()).unwrap();
    problem.add_equation(Equation::new("ratio", Expr::var("ratio", Dimension::dimensionless()), Expr::var("R", length).div(Expr::var("D", length))));
    problem.solve().expect("ratio problem solves");
    let solved_ratio = problem.variable("ratio").unwrap().quantity().unwrap();
    assert_eq!(solved_ratio.dimension(), Dimension::dimensionless());
    assert!((solved_ratio.preferred_value() - 5.0).abs() < 1e-9);
}

/// A parent `Problem` composed from two sub-problems, sharing one given
/// value between them via `add_shared_binding`, each solved by its own
/// single-target analytic pass.
#[test]
fn composed_problem_propagates_a_shared_binding_into_both_children() {
    let length = Dimension::base(common::LENGTH);

    let mut left = Problem::new("Left leg", "doubles the shared length");
    left.add_variable("Shared length", "shared", length).unwrap();
    left.add_variable("Doubled length", "out", length).unwrap();
    left.add_equation(Equation::new("double", Expr::var("out", length), Expr::constant(dimensionless(2.0)).mul(Expr::var("shared", length))));

    let mut right = Problem::new("Right leg", "triples the shared length");
    right.add_variable("Shared length", "shared", length).unwrap();
    right.add_variable("Tripled length", "out", length).unwrap();
    right.add_equation(Equation::new("triple", Expr::var("out", length), Expr::constant(dimensionless(3.0)).mul(Expr::var("shared", length))));

    let mut parent = Problem::new("Parent", "shares one length into two sub-problems");
    parent.add_known_variable("Shared length", "shared", length, Quantity::new(2.0, &common::meter())).unwrap();
    parent.add_sub_problem("left", left).unwrap();
    parent.add_sub_problem("right", right).unwrap();
    parent.add_shared_binding("shared", vec!["left_shared".to_owned(), "right_shared".to_owned()]).unwrap();

    parent.solve().expect("composed problem solves");

    let meter = common::meter();
    let left_out = parent.variable("left_out").unwrap().quantity().unwrap().value_in(meter.as_ref()).unwrap();
    let right_out = parent.variable("right_out").unwrap().quantity().unwrap().value_in(meter.as_ref()).unwrap();
    assert!((left_out - 4.0).abs() < 1e-9, "left_out = {left_out}");
    assert!((right_out - 6.0).abs() < 1e-9, "right_out = {right_out}");
}
