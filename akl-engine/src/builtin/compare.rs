//! Unification tests and the standard order of terms.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::order;
use akl_ir::{Atom, Term};
use std::cmp::Ordering;

pub fn register(table: &mut BuiltinTable) {
    table.register("\\=", 2, builtin_not_unify);
    table.register("dif", 2, builtin_not_unify);
    table.register("==", 2, builtin_identical);
    table.register("\\==", 2, builtin_not_identical);
    table.register("@<", 2, |m, ab, a| order_test(m, ab, a, &[Ordering::Less]));
    table.register("@>", 2, |m, ab, a| {
        order_test(m, ab, a, &[Ordering::Greater])
    });
    table.register("@=<", 2, |m, ab, a| {
        order_test(m, ab, a, &[Ordering::Less, Ordering::Equal])
    });
    table.register("@>=", 2, |m, ab, a| {
        order_test(m, ab, a, &[Ordering::Greater, Ordering::Equal])
    });
    table.register("compare", 3, builtin_compare);
}

/// One-shot syntactic disequality: succeeds iff the arguments cannot be
/// unified here and now. `dif/2` shares this behavior by declaration.
fn builtin_not_unify(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    let mut unifier = machine.unifier();
    if unifier.can_unify(&args[0], &args[1]) {
        BuiltinResult::Failed
    } else {
        BuiltinResult::Succeeded
    }
}

fn builtin_identical(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    if order::identical(&machine.heap, &args[0], &args[1]) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

fn builtin_not_identical(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    if order::identical(&machine.heap, &args[0], &args[1]) {
        BuiltinResult::Failed
    } else {
        BuiltinResult::Succeeded
    }
}

fn order_test(
    machine: &mut Machine,
    _: AndBoxId,
    args: &[Term],
    accept: &[Ordering],
) -> BuiltinResult {
    let ord = order::compare(&machine.heap, &args[0], &args[1]);
    if accept.contains(&ord) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

fn builtin_compare(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let ord = order::compare(&machine.heap, &args[1], &args[2]);
    let atom = match ord {
        Ordering::Less => Atom::new("<"),
        Ordering::Equal => Atom::new("="),
        Ordering::Greater => Atom::new(">"),
    };
    if machine.unify_in(ab, &args[0], &Term::Atom(atom)) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}
