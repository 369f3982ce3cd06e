//! End-to-end scenarios driving the public API: model building, propagation
//! to a fixpoint, search, and assignment round-trips.

use gourd_solver::constraints;
use gourd_solver::predicates::PredicateConstructor;
use gourd_solver::results::IteratedSolution;
use gourd_solver::results::SatisfactionResult;
use gourd_solver::termination::DecisionBudget;
use gourd_solver::termination::Indefinite;
use gourd_solver::ProblemSolution;
use gourd_solver::Solver;

#[test]
fn a_sum_propagates_to_bound_consistency() {
    let mut solver = Solver::default();
    let a = solver.new_bounded_integer(0, 10);
    let b = solver.new_bounded_integer(0, 10);

    solver
        .add_constraint(constraints::equals(vec![a, b], 7))
        .post()
        .expect("consistent at the root");

    assert_eq!((0, 7), (solver.lower_bound(a), solver.upper_bound(a)));
    assert_eq!((0, 7), (solver.lower_bound(b), solver.upper_bound(b)));
}

#[test]
fn solving_a_sum_finds_a_consistent_assignment() {
    let mut solver = Solver::default();
    let a = solver.new_bounded_integer(0, 10);
    let b = solver.new_bounded_integer(0, 10);

    solver
        .add_constraint(constraints::equals(vec![a, b], 7))
        .post()
        .expect("consistent at the root");

    let mut brancher = solver.default_brancher();
    let mut termination = Indefinite;

    match solver.satisfy(&mut brancher, &mut termination) {
        SatisfactionResult::Satisfiable(solution) => {
            assert_eq!(
                7,
                solution.get_integer_value(a) + solution.get_integer_value(b)
            );
        }
        _ => panic!("expected a solution"),
    }
}

#[test]
fn boolean_at_most_one_forces_the_rest_to_zero() {
    let mut solver = Solver::default();
    let literals: Vec<_> = (0..5).map(|_| solver.new_literal()).collect();

    solver
        .add_constraint(constraints::at_most_one(literals.clone()))
        .post()
        .expect("consistent at the root");

    // Forcing one literal to true through a constraint drives the others to
    // false at the next fixpoint.
    solver
        .add_constraint(constraints::equals(vec![literals[2].domain_id()], 1))
        .post()
        .expect("consistent");

    for (i, literal) in literals.iter().enumerate() {
        if i != 2 {
            assert_eq!(0, solver.upper_bound(literal.domain_id()));
        }
    }
}

#[test]
fn boolean_scalar_product_rejects_an_oversized_coefficient() {
    let mut solver = Solver::default();
    let literals: Vec<_> = (0..4).map(|_| solver.new_literal()).collect();

    solver
        .add_constraint(constraints::scalar_product_less_than_or_equals(
            literals.iter().map(|l| l.domain_id()).collect(),
            vec![1, 2, 4, 8],
            7,
        ))
        .post()
        .expect("consistent at the root");

    // The literal with coefficient 8 can never be true.
    assert_eq!(0, solver.upper_bound(literals[3].domain_id()));

    // Fixing it to true is a contradiction.
    let result = solver
        .add_constraint(constraints::equals(vec![literals[3].domain_id()], 1))
        .post();
    assert!(result.is_err());

    // The remaining literals stay free.
    for literal in &literals[0..3] {
        assert_eq!(0, solver.lower_bound(literal.domain_id()));
        assert_eq!(1, solver.upper_bound(literal.domain_id()));
    }
}

#[test]
fn the_minimum_aggregate_matches_the_specified_fixpoints() {
    let mut solver = Solver::default();
    let x0 = solver.new_bounded_integer(2, 5);
    let x1 = solver.new_bounded_integer(3, 7);
    let x2 = solver.new_bounded_integer(1, 4);
    let y = solver.new_bounded_integer(-100, 100);

    solver
        .add_constraint(constraints::minimum(vec![x0, x1, x2], y))
        .post()
        .expect("consistent at the root");

    assert_eq!((1, 4), (solver.lower_bound(y), solver.upper_bound(y)));

    solver
        .add_constraint(constraints::scalar_product_less_than_or_equals(
            vec![y],
            vec![-1],
            -3,
        ))
        .post()
        .expect("consistent");

    assert_eq!(3, solver.lower_bound(x0));
    assert_eq!(3, solver.lower_bound(x1));
    assert_eq!(3, solver.lower_bound(x2));
    assert_eq!((3, 4), (solver.lower_bound(y), solver.upper_bound(y)));
}

#[test]
fn interval_projection_keeps_the_three_ranges_consistent() {
    let mut solver = Solver::default();
    let interval = solver
        .new_interval_variable((0, 10), (3, 5), (0, 20), true, "task")
        .expect("consistent at the root");

    assert_eq!(
        (3, 15),
        (
            solver.lower_bound(interval.end),
            solver.upper_bound(interval.end)
        )
    );
    assert_eq!(
        (0, 10),
        (
            solver.lower_bound(interval.start),
            solver.upper_bound(interval.start)
        )
    );

    solver
        .add_constraint(constraints::scalar_product_less_than_or_equals(
            vec![interval.end],
            vec![1],
            4,
        ))
        .post()
        .expect("consistent");

    assert_eq!(
        (0, 1),
        (
            solver.lower_bound(interval.start),
            solver.upper_bound(interval.start)
        )
    );
    assert_eq!(
        (3, 4),
        (
            solver.lower_bound(interval.duration),
            solver.upper_bound(interval.duration)
        )
    );
}

#[test]
fn two_unit_squares_on_a_line_separate_under_search() {
    let mut solver = Solver::default();
    let x0 = solver.new_bounded_integer(0, 2);
    let x1 = solver.new_bounded_integer(0, 2);
    let y0 = solver.new_bounded_integer(0, 0);
    let y1 = solver.new_bounded_integer(0, 0);
    let unit0 = solver.new_bounded_integer(1, 1);
    let unit1 = solver.new_bounded_integer(1, 1);

    solver
        .add_constraint(constraints::non_overlap(vec![
            gourd_solver::constraints::Rectangle {
                x: x0,
                y: y0,
                width: unit0,
                height: unit0,
            },
            gourd_solver::constraints::Rectangle {
                x: x1,
                y: y1,
                width: unit1,
                height: unit1,
            },
        ]))
        .post()
        .expect("consistent at the root");

    let mut brancher = solver.default_brancher();
    let mut termination = Indefinite;

    match solver.satisfy(&mut brancher, &mut termination) {
        SatisfactionResult::Satisfiable(solution) => {
            let left = solution.get_integer_value(x0);
            let right = solution.get_integer_value(x1);
            assert!((left - right).abs() >= 1, "the squares must not overlap");
        }
        _ => panic!("two unit squares fit on a segment of width three"),
    }
}

#[test]
fn the_solution_iterator_enumerates_every_solution_once() {
    let mut solver = Solver::default();
    let a = solver.new_bounded_integer(0, 2);
    let b = solver.new_bounded_integer(0, 2);

    solver
        .add_constraint(constraints::equals(vec![a, b], 2))
        .post()
        .expect("consistent at the root");

    let mut brancher = solver.default_brancher();
    let mut termination = Indefinite;
    let mut iterator = solver.get_solution_iterator(&mut brancher, &mut termination);

    let mut known_solutions = Vec::new();
    loop {
        match iterator.next_solution() {
            IteratedSolution::Solution(solution) => {
                let pair = (solution.get_integer_value(a), solution.get_integer_value(b));
                assert!(!known_solutions.contains(&pair), "solutions repeat");
                known_solutions.push(pair);
            }
            IteratedSolution::Finished => break,
            _ => panic!("the problem has solutions"),
        }
    }

    assert_eq!(3, known_solutions.len());
}

#[test]
fn an_exhausted_budget_reports_unknown_rather_than_unsatisfiable() {
    let mut solver = Solver::default();
    let a = solver.new_bounded_integer(0, 100);
    let b = solver.new_bounded_integer(0, 100);

    solver
        .add_constraint(constraints::equals(vec![a, b], 100))
        .post()
        .expect("consistent at the root");

    let mut brancher = solver.default_brancher();
    let mut termination = DecisionBudget::new(0);

    assert!(matches!(
        solver.satisfy(&mut brancher, &mut termination),
        SatisfactionResult::Unknown
    ));
}

#[test]
fn assignments_round_trip_through_the_wire_format() {
    let mut solver = Solver::default();
    let a = solver.new_named_bounded_integer(0, 10, "a");
    let b = solver.new_named_bounded_integer(0, 10, "b");
    let interval = solver
        .new_optional_fixed_duration_interval(0, 8, 3, "task")
        .expect("consistent at the root");

    solver
        .add_constraint(constraints::equals(vec![a, b], 7))
        .post()
        .expect("consistent at the root");

    let mut assignment = solver.new_assignment();
    solver.add_to_assignment(&mut assignment, a);
    solver.add_to_assignment(&mut assignment, b);
    solver.add_interval_to_assignment(&mut assignment, interval);
    solver.save_to(&mut assignment);

    let mut bytes = Vec::new();
    assignment.save(&mut bytes).expect("serialization succeeds");

    let mut reloaded = assignment.clone();
    reloaded.load(&mut bytes.as_slice()).expect("deserialization succeeds");

    assert_eq!(assignment, reloaded);
}

#[test]
fn restoring_an_assignment_reinstates_the_stored_bounds() {
    // A first solver with narrower domains writes an assignment; loading it
    // by name into a second solver and restoring pushes the stored bounds
    // into the wider domains there.
    let mut narrow_solver = Solver::default();
    let narrow_a = narrow_solver.new_named_bounded_integer(3, 5, "a");

    let mut narrow_assignment = narrow_solver.new_assignment();
    narrow_solver.add_to_assignment(&mut narrow_assignment, narrow_a);
    narrow_solver.save_to(&mut narrow_assignment);

    let mut bytes = Vec::new();
    narrow_assignment
        .save(&mut bytes)
        .expect("serialization succeeds");

    let mut solver = Solver::default();
    let a = solver.new_named_bounded_integer(0, 10, "a");

    let mut assignment = solver.new_assignment();
    solver.add_to_assignment(&mut assignment, a);
    solver.save_to(&mut assignment);
    assignment.load(&mut bytes.as_slice()).expect("load succeeds");

    solver.restore_from(&assignment).expect("consistent restore");
    assert_eq!(3, solver.lower_bound(a));
    assert_eq!(5, solver.upper_bound(a));
}

#[test]
fn ranking_a_sequence_orders_the_remaining_intervals() {
    let mut solver = Solver::default();
    let a = solver
        .new_fixed_duration_interval(0, 10, 3, "a")
        .expect("consistent at the root");
    let b = solver
        .new_fixed_duration_interval(0, 10, 2, "b")
        .expect("consistent at the root");

    let sequence = solver
        .new_sequence(vec![a, b], "route")
        .expect("consistent at the root");

    solver.rank_first(sequence, 0).expect("consistent ranking");

    // b comes after a's earliest end.
    assert_eq!(3, solver.lower_bound(b.start));

    let mut order = Vec::new();
    solver.fill_sequence(sequence, &mut order);
    assert_eq!(vec![0, 1], order);
}

#[test]
fn decisions_can_be_expressed_as_predicates() {
    // The branching layer works on predicates; their negation is the
    // complementary branch.
    let mut solver = Solver::default();
    let a = solver.new_bounded_integer(0, 10);

    let decision = a.lower_bound_predicate(5);
    let refutation = !decision;

    assert_eq!(a.upper_bound_predicate(4), refutation);
}
