//! Surface-syntax reader for AKL.
//!
//! The lexer and Pratt parser turn source text into `akl_ir` terms,
//! allocating variable cells on the caller's heap. Clause splitting on the
//! guard operators happens in `akl-engine`; this crate only reads terms.

#[macro_use]
extern crate failure;

use akl_ir::{EnvId, Heap, Term, VarId};

pub mod lexer;
pub mod parser;

pub use crate::parser::Parser;

#[derive(Fail, Debug, Clone, PartialEq)]
#[fail(display = "{} at line {}, col {}", message, line, col)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

/// Parses a single term, requiring the whole input to be consumed.
pub fn parse_term(heap: &mut Heap, env: EnvId, source: &str) -> Result<Term, ParseError> {
    let (term, _) = parse_term_with_vars(heap, env, source)?;
    Ok(term)
}

/// Parses a single term, also returning its named variables in order of
/// first occurrence (the query-variable table).
pub fn parse_term_with_vars(
    heap: &mut Heap,
    env: EnvId,
    source: &str,
) -> Result<(Term, Vec<(String, VarId)>), ParseError> {
    let mut parser = Parser::new(heap, env, source)?;
    let term = parser.parse_term(akl_ir::ops::MAX_PREC)?;
    if parser.at_dot() {
        parser.skip_dot()?;
    }
    if !parser.at_eof() {
        return Err(ParseError {
            message: "unexpected input after term".to_string(),
            line: 0,
            col: 0,
        });
    }
    let vars = parser.named_vars().to_vec();
    Ok((term, vars))
}

/// Parses a sequence of clauses, each terminated by `.`. Variable scope
/// resets between clauses.
pub fn parse_clauses(heap: &mut Heap, env: EnvId, source: &str) -> Result<Vec<Term>, ParseError> {
    let mut parser = Parser::new(heap, env, source)?;
    let mut clauses = Vec::new();

    while !parser.at_eof() {
        parser.reset_var_scope();
        let clause = parser.parse_term(akl_ir::ops::MAX_PREC)?;
        clauses.push(clause);
        if parser.at_dot() {
            parser.skip_dot()?;
        } else if !parser.at_eof() {
            return Err(ParseError {
                message: "expected `.` at end of clause".to_string(),
                line: 0,
                col: 0,
            });
        }
    }

    Ok(clauses)
}

#[cfg(test)]
mod test {
    use super::*;
    use akl_ir::write::print_term;
    use akl_ir::{Atom, Term};

    fn parse(source: &str) -> (Heap, Term) {
        let mut heap = Heap::new();
        let env = heap.root_env();
        let term = parse_term(&mut heap, env, source).unwrap();
        (heap, term)
    }

    fn round_trip(source: &str) -> String {
        let (heap, term) = parse(source);
        print_term(&heap, &term)
    }

    #[test]
    fn simple_terms() {
        assert_eq!(round_trip("foo"), "foo");
        assert_eq!(round_trip("foo(a, b)"), "foo(a, b)");
        assert_eq!(round_trip("[1, 2, 3]"), "[1, 2, 3]");
        assert_eq!(round_trip("[H | T]"), "[H | T]");
        assert_eq!(round_trip("{X}"), "{X}");
        assert_eq!(round_trip("'Hello'"), "'Hello'");
    }

    #[test]
    fn same_name_same_cell() {
        let (_, term) = parse("p(X, X, Y)");
        match term {
            Term::Compound(c) => {
                assert_eq!(c.args[0], c.args[1]);
                assert_ne!(c.args[0], c.args[2]);
            }
            _ => panic!("expected compound"),
        }
    }

    #[test]
    fn anonymous_always_fresh() {
        let (_, term) = parse("p(_, _)");
        match term {
            Term::Compound(c) => assert_ne!(c.args[0], c.args[1]),
            _ => panic!("expected compound"),
        }
    }

    #[test]
    fn operator_precedence() {
        // 1 + 2 * 3 reads as 1 + (2 * 3).
        let (_, term) = parse("1 + 2 * 3");
        match term {
            Term::Compound(c) => {
                assert_eq!(c.functor, Atom::new("+"));
                assert_eq!(c.args[0], Term::Int(1));
            }
            _ => panic!("expected compound"),
        }
        assert_eq!(round_trip("1 + 2 * 3"), "1 + 2 * 3");
        assert_eq!(round_trip("(1 + 2) * 3"), "(1 + 2) * 3");
    }

    #[test]
    fn clause_with_guard_operator() {
        let (_, term) = parse("p(X) :- X = 1 | true");
        match term {
            Term::Compound(c) => {
                assert_eq!(c.functor, Atom::new(":-"));
                match &c.args[1] {
                    Term::Compound(inner) => assert_eq!(inner.functor, Atom::new("|")),
                    other => panic!("expected guard, got {:?}", other),
                }
            }
            _ => panic!("expected clause"),
        }
    }

    #[test]
    fn cut_atom_in_conjunction() {
        // `!` in goal position is an atom, not a prefix application; as an
        // argument of `,` the printer protects it with parentheses.
        assert_eq!(round_trip("(!, foo)"), "(!), foo");
    }

    #[test]
    fn higher_order_call() {
        assert_eq!(round_trip("X(a, b)"), "apply(X, [a, b])");
    }

    #[test]
    fn strings_become_code_lists() {
        assert_eq!(round_trip("\"ab\""), "[97, 98]");
    }

    #[test]
    fn negative_literal_is_prefix_minus() {
        assert_eq!(round_trip("-4"), "-4");
        let (_, term) = parse("-4");
        match term {
            Term::Compound(c) => assert_eq!(c.functor, Atom::new("-")),
            _ => panic!("expected -(4)"),
        }
    }

    #[test]
    fn clause_sequences() {
        let mut heap = Heap::new();
        let env = heap.root_env();
        let clauses = parse_clauses(
            &mut heap,
            env,
            "p(1).\np(2) :- q. % trailing comment\nq.",
        )
        .unwrap();
        assert_eq!(clauses.len(), 3);
    }

    #[test]
    fn guard_round_trips() {
        for src in &[
            "p(X) :- X = 1 ? true",
            "p(X) :- X = 1 ?? true",
            "p(X) :- X = 1 -> true",
            "p(X) :- X = 1 | true",
            "p(X) :- X = 1 ! true",
        ] {
            assert_eq!(&round_trip(src), src);
        }
    }

    #[test]
    fn errors_carry_position() {
        let mut heap = Heap::new();
        let env = heap.root_env();
        let err = parse_term(&mut heap, env, "foo(").unwrap_err();
        assert!(err.message.contains("unexpected token"));
    }
}
