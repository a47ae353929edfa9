//! Engine scenario tests: the guard discipline, splitting, and the
//! builtin set, exercised through complete programs.

use crate::machine::{Machine, Solution};
use crate::program::{load_string, Program};
use akl_ir::write::print_term;
use std::sync::Arc;

fn machine(db: &str, goal: &str) -> Machine {
    let mut program = Program::new();
    load_string(&mut program, db).unwrap();
    Machine::from_source(Arc::new(program), goal).unwrap()
}

fn format_solution(m: &Machine, s: &Solution) -> String {
    if s.bindings.is_empty() {
        return "true".to_string();
    }
    s.bindings
        .iter()
        .map(|(name, term)| format!("{} = {}", name, print_term(&m.heap, term)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Runs a query to exhaustion, formatting each answer.
fn query_all(db: &str, goal: &str) -> Vec<String> {
    let mut m = machine(db, goal);
    let solutions = m.all_solutions();
    solutions.iter().map(|s| format_solution(&m, s)).collect()
}

const MEMBER: &str = "member(X, [X|_]). member(X, [_|T]) :- member(X, T).";
const APPEND: &str = "append([], L, L). append([H|T], L, [H|R]) :- append(T, L, R).";
const PERM: &str = "perm([], []).\n\
                    perm([H|T], P) :- perm(T, PT), insert(H, PT, P).\n\
                    insert(X, L, [X|L]).\n\
                    insert(X, [H|T], [H|R]) :- insert(X, T, R).";

mod facts_and_rules {
    use super::*;

    #[test]
    fn single_fact() {
        assert_eq!(query_all("p(1).", "p(1)"), vec!["true"]);
        assert_eq!(query_all("p(1).", "p(2)"), Vec::<String>::new());
    }

    #[test]
    fn fact_binds_query_var() {
        assert_eq!(query_all("p(1).", "p(X)"), vec!["X = 1"]);
    }

    #[test]
    fn chained_rules() {
        let db = "a(X) :- b(X). b(X) :- c(X). c(42).";
        assert_eq!(query_all(db, "a(X)"), vec!["X = 42"]);
    }

    #[test]
    fn conjunction_in_body() {
        let db = "p(X, Y) :- q(X), r(Y). q(1). r(2).";
        assert_eq!(query_all(db, "p(X, Y)"), vec!["X = 1, Y = 2"]);
    }

    #[test]
    fn unknown_predicate_is_failure() {
        assert_eq!(query_all("p(1).", "nosuch(1)"), Vec::<String>::new());
    }

    #[test]
    fn true_goal_answers_once() {
        assert_eq!(query_all("", "true"), vec!["true"]);
        assert_eq!(query_all("", "fail"), Vec::<String>::new());
    }
}

mod splitting {
    use super::*;

    #[test]
    fn member_enumerates_in_order() {
        assert_eq!(
            query_all(MEMBER, "member(X, [a, b, c])"),
            vec!["X = a", "X = b", "X = c"]
        );
    }

    #[test]
    fn member_checks_membership() {
        assert_eq!(query_all(MEMBER, "member(b, [a, b, c])"), vec!["true"]);
        assert_eq!(
            query_all(MEMBER, "member(d, [a, b, c])"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn append_concatenates() {
        assert_eq!(
            query_all(APPEND, "append([1, 2], [3, 4], R)"),
            vec!["R = [1, 2, 3, 4]"]
        );
    }

    #[test]
    fn append_splits_into_four() {
        assert_eq!(
            query_all(APPEND, "append(X, Y, [1, 2, 3])"),
            vec![
                "X = [], Y = [1, 2, 3]",
                "X = [1], Y = [2, 3]",
                "X = [1, 2], Y = [3]",
                "X = [1, 2, 3], Y = []",
            ]
        );
    }

    #[test]
    fn disjunction_enumerates_both_branches() {
        assert_eq!(query_all("", "(X = 1 ; X = 2)"), vec!["X = 1", "X = 2"]);
    }

    #[test]
    fn permutations_of_three() {
        let solutions = query_all(PERM, "perm([1, 2, 3], P)");
        assert_eq!(solutions.len(), 6);
        let mut distinct = solutions.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 6);
        assert!(solutions.contains(&"P = [1, 2, 3]".to_string()));
        assert!(solutions.contains(&"P = [3, 2, 1]".to_string()));
    }

    #[test]
    fn permutations_of_five() {
        let solutions = query_all(PERM, "perm([1, 2, 3, 4, 5], P)");
        assert_eq!(solutions.len(), 120);
        let mut distinct = solutions;
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 120);
    }

    #[test]
    fn four_queens() {
        let db = format!(
            "{}\n\
             safe([]).\n\
             safe([Q|Qs]) :- safe(Qs), noattack(Q, Qs, 1).\n\
             noattack(_, [], _).\n\
             noattack(Q, [Q1|Qs], D) :-\n\
                 D1 is Q1 - Q, D1 =\\= D,\n\
                 D2 is Q - Q1, D2 =\\= D,\n\
                 D3 is D + 1,\n\
                 noattack(Q, Qs, D3).\n\
             queens(N, Qs) :- range(1, N, Rs), perm(Rs, Qs), safe(Qs).\n\
             range(From, To, []) :- From > To.\n\
             range(From, To, [From|R]) :- From =< To, From1 is From + 1, range(From1, To, R).",
            PERM
        );
        let mut solutions = query_all(&db, "queens(4, Q)");
        solutions.sort();
        assert_eq!(solutions, vec!["Q = [2, 4, 1, 3]", "Q = [3, 1, 4, 2]"]);
    }
}

mod guards {
    use super::*;

    #[test]
    fn wait_guard_succeeds_and_fails() {
        assert_eq!(query_all("p(X) :- true ? X = 1.", "p(X)"), vec!["X = 1"]);
        assert_eq!(
            query_all("p(X) :- fail ? X = 1.", "p(X)"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn wait_guard_keeps_all_alternatives() {
        let db = "p(1) :- true ? true. p(2) :- true ? true. p(3) :- true ? true.";
        assert_eq!(query_all(db, "p(X)"), vec!["X = 1", "X = 2", "X = 3"]);
    }

    #[test]
    fn commit_prunes_all_siblings() {
        // Scenario: `|` commits after the first success.
        let db = "choose(a) :- true | true. choose(b) :- true | true.";
        assert_eq!(query_all(db, "choose(X)"), vec!["X = a"]);
    }

    #[test]
    fn arrow_prunes_right_siblings() {
        let db = "p(1) :- true -> true. p(2).";
        assert_eq!(query_all(db, "p(X)"), vec!["X = 1"]);
    }

    #[test]
    fn arrow_falls_through_on_guard_failure() {
        let db = "p(1) :- fail -> true. p(2) :- true -> true.";
        assert_eq!(query_all(db, "p(X)"), vec!["X = 2"]);
    }

    #[test]
    fn cut_prunes_right() {
        let db = "test(1) :- true ! true. test(2). test(3).";
        assert_eq!(query_all(db, "test(X)"), vec!["X = 1"]);
    }

    #[test]
    fn cut_retries_after_guard_failure() {
        let db = "test(1) :- fail ! true. test(2) :- true ! true. test(3).";
        assert_eq!(query_all(db, "test(X)"), vec!["X = 2"]);
    }

    #[test]
    fn quiet_guard_rejects_external_binding_in_guard() {
        // The first clause's guard would bind the external Y; a quiet
        // commit may not do that, so only the fact answers.
        let db = "p(X) :- X = 1 | true. p(2).";
        assert_eq!(query_all(db, "p(Y)"), vec!["Y = 2"]);
    }

    #[test]
    fn noisy_guard_allows_external_binding_in_guard() {
        let db = "p(X) :- X = 1 ? true. p(2).";
        let solutions = query_all(db, "p(Y)");
        assert!(!solutions.is_empty());
        assert_eq!(solutions[0], "Y = 1");
    }

    #[test]
    fn quiet_guard_may_bind_locals() {
        let db = "local_bind(R) :- X = 1, X > 0 | R = X.";
        assert_eq!(query_all(db, "local_bind(R)"), vec!["R = 1"]);
    }

    #[test]
    fn head_unification_is_not_noisy() {
        // Output unification in the head must not block a quiet commit.
        let db = "max(X, Y, X) :- X >= Y -> true.\n\
                  max(X, Y, Y) :- X < Y -> true.";
        assert_eq!(query_all(db, "max(5, 3, M)"), vec!["M = 5"]);
        assert_eq!(query_all(db, "max(2, 7, M)"), vec!["M = 7"]);
    }

    #[test]
    fn deep_quiet_guard_blocks_external_binding() {
        // The guard calls q/1, which would bind the external argument:
        // with an unbound caller argument the clause may never commit.
        let db = "r(X) :- q(X) | true. q(a).";
        assert_eq!(query_all(db, "r(Y)"), Vec::<String>::new());
        assert_eq!(query_all(db, "r(a)"), vec!["true"]);
        assert_eq!(query_all(db, "r(b)"), Vec::<String>::new());
    }

    #[test]
    fn quiet_wait_needs_quietness() {
        let db = "p(X) :- X = 1 ?? true. p(X) :- X = 2 ?? true.";
        // Binding the external query variable in the guard suspends both
        // alternatives for good.
        assert_eq!(query_all(db, "p(Y)"), Vec::<String>::new());
        // With a bound argument the guards are quiet and the losing
        // alternative fails, leaving a determinate commit.
        assert_eq!(query_all(db, "p(1)"), vec!["true"]);
    }

    #[test]
    fn commit_selects_first_member() {
        let db = "first_member(X, [X|_]) :- true | true.\n\
                  first_member(X, [_|T]) :- true | first_member(X, T).";
        assert_eq!(query_all(db, "first_member(X, [1, 2, 3])"), vec!["X = 1"]);
    }

    #[test]
    fn guarded_merge_is_determinate() {
        let db = "merge([], Ys, Ys) :- true | true.\n\
                  merge(Xs, [], Xs) :- true | true.\n\
                  merge([X|Xs], [Y|Ys], [X|Zs]) :- X =< Y | merge(Xs, [Y|Ys], Zs).\n\
                  merge([X|Xs], [Y|Ys], [Y|Zs]) :- X > Y | merge([X|Xs], Ys, Zs).";
        assert_eq!(
            query_all(db, "merge([1, 3, 5], [2, 4], R)"),
            vec!["R = [1, 2, 3, 4, 5]"]
        );
    }
}

mod control {
    use super::*;

    #[test]
    fn if_then_else_takes_then() {
        let db = "test(X, R) :- (X > 0 -> R = positive ; R = non_positive).";
        assert_eq!(query_all(db, "test(5, R)"), vec!["R = positive"]);
    }

    #[test]
    fn if_then_else_takes_else() {
        let db = "test(X, R) :- (X > 0 -> R = positive ; R = non_positive).";
        assert_eq!(query_all(db, "test(-5, R)"), vec!["R = non_positive"]);
    }

    #[test]
    fn bare_if_then() {
        assert_eq!(query_all("", "(1 < 2 -> X = yes)"), vec!["X = yes"]);
        assert_eq!(query_all("", "(2 < 1 -> X = yes)"), Vec::<String>::new());
    }

    #[test]
    fn negation_as_failure() {
        assert_eq!(query_all(MEMBER, "\\+ member(d, [a, b, c])"), vec!["true"]);
        assert_eq!(
            query_all(MEMBER, "\\+ member(a, [a, b, c])"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn negation_binds_nothing() {
        // The inner goal has solutions, so the negation fails; either way
        // X must stay unbound in the caller.
        let solutions = query_all(MEMBER, "\\+ member(X, [a]), X = kept");
        assert_eq!(solutions, Vec::<String>::new());
        let solutions = query_all(MEMBER, "\\+ member(x, []), X = kept");
        assert_eq!(solutions, vec!["X = kept"]);
    }

    #[test]
    fn halt_stops_the_machine() {
        let mut m = machine("", "halt(3)");
        assert!(m.next_solution().is_none());
        assert_eq!(m.halted(), Some(3));
    }

    #[test]
    fn consult_fails_during_solve() {
        assert_eq!(query_all("", "consult(foo)"), Vec::<String>::new());
    }

    #[test]
    fn higher_order_apply() {
        let db = "plus(A, B, C) :- C is A + B.";
        assert_eq!(query_all(db, "F = plus, F(1, 2, S)"), vec!["F = plus, S = 3"]);
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn evaluation() {
        assert_eq!(query_all("", "X is 2 + 3 * 4"), vec!["X = 14"]);
        assert_eq!(query_all("", "X is (2 + 3) * 4"), vec!["X = 20"]);
        assert_eq!(query_all("", "X is 10 / 4"), vec!["X = 2.5"]);
        assert_eq!(query_all("", "X is 10 / 5"), vec!["X = 2"]);
        assert_eq!(query_all("", "X is 10 // 4"), vec!["X = 2"]);
        assert_eq!(query_all("", "X is -3 mod 5"), vec!["X = 2"]);
        assert_eq!(query_all("", "X is 2 ** 10"), vec!["X = 1024"]);
        assert_eq!(query_all("", "X is abs(-7)"), vec!["X = 7"]);
        assert_eq!(query_all("", "X is min(3, 2)"), vec!["X = 2"]);
        assert_eq!(query_all("", "X is 5 /\\ 3"), vec!["X = 1"]);
        assert_eq!(query_all("", "X is 5 \\/ 3"), vec!["X = 7"]);
        assert_eq!(query_all("", "X is xor(5, 3)"), vec!["X = 6"]);
        assert_eq!(query_all("", "X is 1 << 4"), vec!["X = 16"]);
        assert_eq!(query_all("", "X is float(2)"), vec!["X = 2.0"]);
        assert_eq!(query_all("", "X is truncate(2.7)"), vec!["X = 2"]);
        assert_eq!(query_all("", "X is round(2.5)"), vec!["X = 3"]);
        assert_eq!(query_all("", "X is ceiling(2.1)"), vec!["X = 3"]);
        assert_eq!(query_all("", "X is floor(2.9)"), vec!["X = 2"]);
    }

    #[test]
    fn comparisons() {
        assert_eq!(query_all("", "1 < 2"), vec!["true"]);
        assert_eq!(query_all("", "2 < 1"), Vec::<String>::new());
        assert_eq!(query_all("", "3 =:= 3.0"), vec!["true"]);
        assert_eq!(query_all("", "3 =\\= 4"), vec!["true"]);
        assert_eq!(query_all("", "2 =< 2, 3 >= 2"), vec!["true"]);
    }

    #[test]
    fn errors_degrade_to_failure() {
        assert_eq!(query_all("", "X is 1 / 0"), Vec::<String>::new());
        assert_eq!(query_all("", "X is foo + 1"), Vec::<String>::new());
        assert_eq!(query_all("", "X is 1 mod 0"), Vec::<String>::new());
    }

    #[test]
    fn evaluation_suspends_on_unbound_operands() {
        // `is` waits for Y; the binding arrives afterwards in goal order.
        assert_eq!(query_all("", "X is Y + 1, Y = 2"), vec!["X = 3, Y = 2"]);
        assert_eq!(query_all("", "Y > 1, Y = 2"), vec!["Y = 2"]);
        assert_eq!(query_all("", "Y > 3, Y = 2"), Vec::<String>::new());
    }

    #[test]
    fn producer_consumer_chain() {
        let db = "double([], []).\n\
                  double([X|Xs], [Y|Ys]) :- Y is 2 * X, double(Xs, Ys).";
        assert_eq!(
            query_all(db, "double([1, 2, 3], R)"),
            vec!["R = [2, 4, 6]"]
        );
    }
}

mod terms {
    use super::*;

    #[test]
    fn structural_identity() {
        assert_eq!(query_all("", "f(X) == f(X)"), vec!["X = X"]);
        assert_eq!(query_all("", "X == Y"), Vec::<String>::new());
        assert_eq!(query_all("", "X \\== Y"), vec!["X = X, Y = Y"]);
    }

    #[test]
    fn not_unify_is_one_shot() {
        assert_eq!(query_all("", "foo \\= bar"), vec!["true"]);
        assert_eq!(query_all("", "foo \\= foo"), Vec::<String>::new());
        // An unbound variable can unify with anything, so `\=` fails.
        assert_eq!(query_all("", "X \\= 42"), Vec::<String>::new());
        assert_eq!(query_all("", "dif(f(X), g(X))"), vec!["X = X"]);
    }

    #[test]
    fn standard_order() {
        assert_eq!(query_all("", "compare(O, 1, 2)"), vec!["O = <"]);
        assert_eq!(query_all("", "compare(O, f(a), f(a))"), vec!["O = ="]);
        // Var < Float < Int < Atom < Compound.
        assert_eq!(query_all("", "X @< 1.5, 1.5 @< 1, 1 @< a, a @< f(a)"), {
            vec!["X = X"]
        });
        assert_eq!(query_all("", "f(a) @> a"), vec!["true"]);
        assert_eq!(query_all("", "a @=< a, a @>= a"), vec!["true"]);
    }

    #[test]
    fn functor_and_arg() {
        assert_eq!(
            query_all("", "functor(foo(a, b), N, A)"),
            vec!["N = foo, A = 2"]
        );
        assert_eq!(query_all("", "functor(foo, N, A)"), vec!["N = foo, A = 0"]);
        assert_eq!(query_all("", "functor(7, N, A)"), vec!["N = 7, A = 0"]);
        assert_eq!(
            query_all("", "functor(T, foo, 2), arg(1, T, x), arg(2, T, y)"),
            vec!["T = foo(x, y)"]
        );
        assert_eq!(
            query_all("", "arg(2, foo(a, b), X)"),
            vec!["X = b"]
        );
        assert_eq!(query_all("", "arg(3, foo(a, b), X)"), Vec::<String>::new());
    }

    #[test]
    fn univ_round_trip() {
        assert_eq!(
            query_all("", "foo(a, b) =.. L"),
            vec!["L = [foo, a, b]"]
        );
        assert_eq!(query_all("", "T =.. [bar, 1, 2]"), vec!["T = bar(1, 2)"]);
        assert_eq!(
            query_all("", "foo(a, b) =.. L, T =.. L"),
            vec!["L = [foo, a, b], T = foo(a, b)"]
        );
        assert_eq!(query_all("", "atom =.. L"), vec!["L = [atom]"]);
    }

    #[test]
    fn copy_term_freshens() {
        assert_eq!(
            query_all("", "copy_term(f(X, X), C), C = f(1, One)"),
            vec!["X = X, C = f(1, 1), One = 1"]
        );
    }

    #[test]
    fn type_tests() {
        assert_eq!(query_all("", "var(X)"), vec!["X = X"]);
        assert_eq!(query_all("", "X = 1, var(X)"), Vec::<String>::new());
        assert_eq!(query_all("", "nonvar(foo)"), vec!["true"]);
        assert_eq!(query_all("", "atom(foo), \\+ atom(1)"), vec!["true"]);
        assert_eq!(
            query_all("", "number(1), number(1.5), integer(1), float(1.5)"),
            vec!["true"]
        );
        assert_eq!(query_all("", "compound(f(x)), compound([a])"), vec!["true"]);
        assert_eq!(query_all("", "atomic(foo), atomic(3)"), vec!["true"]);
        assert_eq!(
            query_all("", "is_list([a, b]), is_list([])"),
            vec!["true"]
        );
        assert_eq!(query_all("", "is_list([a|T])"), Vec::<String>::new());
    }

    #[test]
    fn data_synchronizes() {
        assert_eq!(query_all("", "data(X), X = 5"), vec!["X = 5"]);
        assert_eq!(query_all("", "data(foo)"), vec!["true"]);
    }

    #[test]
    fn length_modes() {
        assert_eq!(query_all("", "length([a, b, c], N)"), vec!["N = 3"]);
        assert_eq!(query_all("", "length(L, 0)"), vec!["L = []"]);
        assert_eq!(
            query_all("", "length(L, 2), L = [a, b]"),
            vec!["L = [a, b]"]
        );
        assert_eq!(query_all("", "length([a], 2)"), Vec::<String>::new());
    }
}

mod aggregation_and_ports {
    use super::*;

    #[test]
    fn numberof_counts_solutions() {
        assert_eq!(
            query_all(MEMBER, "numberof(member(X, [a, b, c]), N)"),
            vec!["X = X, N = 3"]
        );
        assert_eq!(
            query_all(MEMBER, "numberof(member(x, []), N)"),
            vec!["N = 0"]
        );
    }

    #[test]
    fn port_sends_extend_the_stream() {
        let solutions = query_all("", "open_port(P, S), send(a, P), send(b, P)");
        assert_eq!(solutions.len(), 1);
        // S = [a, b | Tail] with the tail still open while P lives.
        assert!(
            solutions[0].contains("S = [a, b | "),
            "unexpected: {}",
            solutions[0]
        );
    }

    #[test]
    fn send3_threads_the_port() {
        let solutions = query_all("", "open_port(P, S), send(a, P, P1), send(b, P1)");
        assert_eq!(solutions.len(), 1);
        assert!(solutions[0].contains("S = [a, b | "));
    }

    #[test]
    fn reflective_call_emits_first_solution() {
        let solutions = query_all(MEMBER, "reflective_call(R, member(X, [a, b]), S)");
        assert_eq!(solutions.len(), 1);
        assert!(
            solutions[0].contains("S = [solution(['X' = a]) | "),
            "unexpected: {}",
            solutions[0]
        );
    }

    #[test]
    fn reflective_next_advances() {
        let solutions = query_all(
            MEMBER,
            "reflective_call(R, member(X, [a]), S), reflective_next(R, R1), reflective_next(R1, R2)",
        );
        assert_eq!(solutions.len(), 1);
        assert!(
            solutions[0].contains("S = [solution(['X' = a]), fail, fail | "),
            "unexpected: {}",
            solutions[0]
        );
    }
}
