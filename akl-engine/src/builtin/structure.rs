//! Structure reflection: `functor/3`, `arg/3`, `=../2`, `copy_term/2`.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use crate::unify;
use akl_ir::{list_to_vec, make_list, Atom, Term};

pub fn register(table: &mut BuiltinTable) {
    table.register("functor", 3, builtin_functor);
    table.register("arg", 3, builtin_arg);
    table.register("=..", 2, builtin_univ);
    table.register("copy_term", 2, builtin_copy_term);
}

fn unify_or_fail(machine: &mut Machine, ab: AndBoxId, a: &Term, b: &Term) -> BuiltinResult {
    if machine.unify_in(ab, a, b) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

fn builtin_functor(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    match machine.heap.deref(&args[0]) {
        Term::Var(term_var) => {
            // Construction mode: both name and arity must be known.
            let name = match machine.heap.deref(&args[1]) {
                Term::Var(v) => return BuiltinResult::Suspended(v),
                name => name,
            };
            let arity = match machine.heap.deref(&args[2]) {
                Term::Var(v) => return BuiltinResult::Suspended(v),
                Term::Int(n) if n >= 0 => n as usize,
                _ => return BuiltinResult::Failed,
            };
            let built = match (&name, arity) {
                (_, 0) => name.clone(),
                (Term::Atom(a), n) => {
                    let fresh = (0..n)
                        .map(|_| Term::Var(machine.new_local_var(ab, None)))
                        .collect::<Vec<_>>();
                    if *a == Atom::new(".") && n == 2 {
                        Term::cons(fresh[0].clone(), fresh[1].clone())
                    } else {
                        Term::compound(*a, fresh)
                    }
                }
                _ => return BuiltinResult::Failed,
            };
            unify_or_fail(machine, ab, &Term::Var(term_var), &built)
        }
        Term::Compound(c) => {
            let functor = Term::Atom(c.functor);
            let arity = Term::Int(c.args.len() as i64);
            match unify_or_fail(machine, ab, &args[1], &functor) {
                BuiltinResult::Succeeded => unify_or_fail(machine, ab, &args[2], &arity),
                other => other,
            }
        }
        Term::Cons(_) => {
            match unify_or_fail(machine, ab, &args[1], &Term::atom(".")) {
                BuiltinResult::Succeeded => unify_or_fail(machine, ab, &args[2], &Term::Int(2)),
                other => other,
            }
        }
        atomic => match unify_or_fail(machine, ab, &args[1], &atomic) {
            BuiltinResult::Succeeded => unify_or_fail(machine, ab, &args[2], &Term::Int(0)),
            other => other,
        },
    }
}

fn builtin_arg(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let n = match machine.heap.deref(&args[0]) {
        Term::Var(v) => return BuiltinResult::Suspended(v),
        Term::Int(n) => n,
        _ => return BuiltinResult::Failed,
    };
    match machine.heap.deref(&args[1]) {
        Term::Var(v) => BuiltinResult::Suspended(v),
        Term::Compound(c) => {
            if n < 1 || n as usize > c.args.len() {
                return BuiltinResult::Failed;
            }
            let arg = c.args[n as usize - 1].clone();
            unify_or_fail(machine, ab, &args[2], &arg)
        }
        Term::Cons(cell) => match n {
            1 => {
                let head = cell.head.clone();
                unify_or_fail(machine, ab, &args[2], &head)
            }
            2 => {
                let tail = cell.tail.clone();
                unify_or_fail(machine, ab, &args[2], &tail)
            }
            _ => BuiltinResult::Failed,
        },
        _ => BuiltinResult::Failed,
    }
}

fn builtin_univ(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    match machine.heap.deref(&args[0]) {
        Term::Var(term_var) => {
            // Construction: the list side must be proper and start with an
            // atom (or be a singleton atomic).
            let items = match list_to_vec(&machine.heap, &args[1]) {
                Some(items) => items,
                None => match machine.heap.deref(&args[1]) {
                    Term::Var(v) => return BuiltinResult::Suspended(v),
                    _ => return BuiltinResult::Failed,
                },
            };
            let built = match items.split_first() {
                None => return BuiltinResult::Failed,
                Some((first, [])) => match first {
                    Term::Compound(_) | Term::Cons(_) => return BuiltinResult::Failed,
                    atomic => atomic.clone(),
                },
                Some((Term::Atom(f), rest)) => {
                    if *f == Atom::new(".") && rest.len() == 2 {
                        Term::cons(rest[0].clone(), rest[1].clone())
                    } else {
                        Term::compound(*f, rest.to_vec())
                    }
                }
                Some(_) => return BuiltinResult::Failed,
            };
            unify_or_fail(machine, ab, &Term::Var(term_var), &built)
        }
        Term::Compound(c) => {
            let mut items = vec![Term::Atom(c.functor)];
            items.extend(c.args.iter().cloned());
            let list = make_list(items, Term::nil());
            unify_or_fail(machine, ab, &args[1], &list)
        }
        Term::Cons(cell) => {
            let items = vec![Term::atom("."), cell.head.clone(), cell.tail.clone()];
            let list = make_list(items, Term::nil());
            unify_or_fail(machine, ab, &args[1], &list)
        }
        atomic => {
            let list = make_list(vec![atomic], Term::nil());
            unify_or_fail(machine, ab, &args[1], &list)
        }
    }
}

fn builtin_copy_term(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let env = machine.tree[ab].env;
    let mut fresh = Vec::new();
    let copy = unify::copy_term(&mut machine.heap, env, &args[0], &mut fresh);
    machine.tree[ab].vars.extend(fresh);
    unify_or_fail(machine, ab, &args[1], &copy)
}
