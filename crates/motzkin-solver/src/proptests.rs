//! Property-based tests for rational arithmetic and elimination laws.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{
        EliminationStep, Eliminator, Equation, Pairing, Rational, Relation, StepOutcome, System,
    };

    fn small_int() -> impl Strategy<Value = i64> {
        -1000i64..1000i64
    }

    fn non_zero_int() -> impl Strategy<Value = i64> {
        prop_oneof![(-1000i64..=-1i64), (1i64..=1000i64)]
    }

    fn rational() -> impl Strategy<Value = Rational> {
        (small_int(), non_zero_int()).prop_map(|(n, d)| Rational::new(n, d).unwrap())
    }

    fn non_zero_rational() -> impl Strategy<Value = Rational> {
        (non_zero_int(), non_zero_int()).prop_map(|(n, d)| Rational::new(n, d).unwrap())
    }

    /// Multiplication by a scalar, used only to check division against it.
    fn scale(a: Rational, b: Rational) -> Rational {
        a.checked_mul(b).unwrap()
    }

    fn row_with(coeffs: Vec<i64>, constant: i64, relation: Relation) -> Equation {
        Equation::new(
            coeffs.into_iter().map(|c| Rational::from_integer(c).unwrap()).collect(),
            Rational::from_integer(constant).unwrap(),
            relation,
        )
    }

    fn upper_row(coeffs: Vec<i64>, constant: i64) -> Equation {
        row_with(coeffs, constant, Relation::LessOrEqual)
    }

    fn eliminate_last(system: &mut System) -> System {
        let column = system.n_vars() - 1;
        match EliminationStep::new(column).apply(system).unwrap() {
            StepOutcome::Partitioned(partition) => {
                Pairing::new(column).apply(system, &partition).unwrap()
            }
            StepOutcome::Vacuous => System::empty(column),
        }
    }

    proptest! {
        #[test]
        fn divide_undoes_scaling(a in rational(), b in non_zero_rational()) {
            prop_assert_eq!(scale(a, b).checked_div(b).unwrap(), a);
        }

        #[test]
        fn denominator_stays_positive(a in rational(), b in non_zero_rational()) {
            for q in [
                a.checked_add(b).unwrap(),
                a.checked_sub(b).unwrap(),
                a.checked_div(b).unwrap(),
                a.negate(),
            ] {
                prop_assert!(q.denominator() > 0);
            }
        }

        #[test]
        fn add_then_subtract(a in rational(), b in rational()) {
            prop_assert_eq!(a.checked_add(b).unwrap().checked_sub(b).unwrap(), a);
        }

        #[test]
        fn add_commutative(a in rational(), b in rational()) {
            prop_assert_eq!(a.checked_add(b).unwrap(), b.checked_add(a).unwrap());
        }

        #[test]
        fn ordering_agrees_with_evaluation(a in rational(), b in rational()) {
            if a.evaluate() < b.evaluate() {
                prop_assert!(a < b);
            }
            if a == b {
                prop_assert_eq!(a.evaluate(), b.evaluate());
            }
        }

        #[test]
        fn zero_coefficient_passes_through(
            coeffs in prop::collection::vec(-50i64..50, 1..5),
            constant in -50i64..50,
            le in any::<bool>(),
        ) {
            // put a zero in the column about to be eliminated
            let mut with_zero = coeffs.clone();
            with_zero.push(0);
            let relation = if le { Relation::LessOrEqual } else { Relation::GreaterOrEqual };
            let original = row_with(with_zero, constant, relation);
            let mut system = System::new(original.n_vars(), vec![original.clone()]).unwrap();

            let next = eliminate_last(&mut system);
            prop_assert_eq!(next.len(), 1);
            let carried = &next.equations()[0];
            prop_assert_eq!(carried.coefficients(), &original.coefficients()[..coeffs.len()]);
            prop_assert_eq!(carried.constant(), original.constant());
            prop_assert_eq!(carried.relation(), relation);
        }

        #[test]
        fn zero_column_keeps_row_count(
            rows in prop::collection::vec((prop::collection::vec(-20i64..20, 2), -20i64..20), 1..8),
        ) {
            let equations = rows
                .into_iter()
                .map(|(mut coeffs, constant)| {
                    coeffs.push(0);
                    upper_row(coeffs, constant)
                })
                .collect::<Vec<_>>();
            let count = equations.len();
            let mut system = System::new(3, equations).unwrap();
            let next = eliminate_last(&mut system);
            prop_assert_eq!(next.len(), count);
            prop_assert_eq!(next.n_vars(), 2);
        }

        #[test]
        fn interval_is_exactly_the_feasible_set(
            rows in prop::collection::vec((non_zero_int(), small_int(), any::<bool>()), 1..6),
        ) {
            let equations = rows
                .iter()
                .map(|&(a, c, le)| {
                    let relation = if le {
                        Relation::LessOrEqual
                    } else {
                        Relation::GreaterOrEqual
                    };
                    Equation::new(
                        vec![Rational::from_integer(a).unwrap()],
                        Rational::from_integer(c).unwrap(),
                        relation,
                    )
                })
                .collect::<Vec<_>>();
            let system = System::new(1, equations).unwrap();
            let solution = Eliminator::new().solve(system.clone()).unwrap();

            let satisfies_all = |x: Rational| {
                system.equations().iter().all(|e| e.is_satisfied_by(&[x]).unwrap())
            };

            let epsilon = Rational::new(1, 1000).unwrap();
            match solution.interval {
                Some(interval) => {
                    prop_assert!(solution.is_feasible());
                    for x in [interval.lower, interval.upper].into_iter().flatten() {
                        prop_assert!(satisfies_all(x));
                    }
                    if let Some(lower) = interval.lower {
                        let below = lower.checked_sub(epsilon).unwrap();
                        prop_assert!(!satisfies_all(below));
                    }
                    if let Some(upper) = interval.upper {
                        let above = upper.checked_add(epsilon).unwrap();
                        prop_assert!(!satisfies_all(above));
                    }
                }
                None => {
                    prop_assert!(!solution.is_feasible());
                    prop_assert!(!solution.conflicts.is_empty());
                }
            }
        }
    }
}
