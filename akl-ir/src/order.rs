//! The standard order of terms.
//!
//! `Var < Float < Int < Atom < Compound`, with ties broken on value, name,
//! and arity/functor/arguments respectively. Cons cells take part as
//! `'.'/2`; ports and reflections sort after everything else by identity.
//! This order backs `compare/3` and the `@<` family.

use crate::{Atom, Heap, Term};
use std::cmp::Ordering;

fn type_rank(term: &Term) -> u8 {
    match term {
        Term::Var(_) => 0,
        Term::Float(_) => 1,
        Term::Int(_) => 2,
        Term::Atom(_) => 3,
        Term::Compound(_) | Term::Cons(_) => 4,
        Term::Port(_) => 5,
        Term::Reflection(_) => 6,
    }
}

fn atom_cmp(a: Atom, b: Atom) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.text().cmp(&b.text())
    }
}

/// Compares two terms in the standard order under the current bindings.
pub fn compare(heap: &Heap, a: &Term, b: &Term) -> Ordering {
    let a = heap.deref(a);
    let b = heap.deref(b);

    let rank = type_rank(&a).cmp(&type_rank(&b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (&a, &b) {
        (Term::Var(x), Term::Var(y)) => x.cmp(y),
        (Term::Float(x), Term::Float(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Term::Int(x), Term::Int(y)) => x.cmp(y),
        (Term::Atom(x), Term::Atom(y)) => atom_cmp(*x, *y),
        _ => {
            let (fa, args_a) = functor_view(&a);
            let (fb, args_b) = functor_view(&b);
            args_a
                .len()
                .cmp(&args_b.len())
                .then_with(|| atom_cmp(fa, fb))
                .then_with(|| {
                    for (x, y) in args_a.iter().zip(args_b.iter()) {
                        let ord = compare(heap, x, y);
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                    Ordering::Equal
                })
        }
    }
}

/// Structural view of a compound-class term as functor plus arguments.
fn functor_view(term: &Term) -> (Atom, Vec<Term>) {
    match term {
        Term::Compound(c) => (c.functor, c.args.to_vec()),
        Term::Cons(cell) => (Atom::new("."), vec![cell.head.clone(), cell.tail.clone()]),
        Term::Port(p) => (Atom::new("$port"), vec![Term::Int(p.id().as_usize() as i64)]),
        Term::Reflection(r) => (
            Atom::new("$reflection"),
            vec![Term::Int(r.as_usize() as i64)],
        ),
        _ => panic!("functor_view on non-compound term: {:?}", term),
    }
}

/// Structural identity under the current bindings (`==/2`).
pub fn identical(heap: &Heap, a: &Term, b: &Term) -> bool {
    compare(heap, a, b) == Ordering::Equal
}
