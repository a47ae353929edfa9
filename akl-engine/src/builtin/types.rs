//! Type tests. These inspect the current binding state and never bind
//! anything; only `data/1` synchronizes, suspending until its argument is
//! instantiated.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::Term;

pub fn register(table: &mut BuiltinTable) {
    table.register("var", 1, builtin_var);
    table.register("nonvar", 1, builtin_nonvar);
    table.register("atom", 1, builtin_atom);
    table.register("number", 1, builtin_number);
    table.register("integer", 1, builtin_integer);
    table.register("float", 1, builtin_float);
    table.register("compound", 1, builtin_compound);
    table.register("atomic", 1, builtin_atomic);
    table.register("is_list", 1, builtin_is_list);
    table.register("data", 1, builtin_data);
}

fn test(ok: bool) -> BuiltinResult {
    if ok {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

fn builtin_var(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(machine.heap.deref(&args[0]), Term::Var(_)))
}

fn builtin_nonvar(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(!matches!(machine.heap.deref(&args[0]), Term::Var(_)))
}

fn builtin_atom(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(machine.heap.deref(&args[0]), Term::Atom(_)))
}

fn builtin_number(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(
        machine.heap.deref(&args[0]),
        Term::Int(_) | Term::Float(_)
    ))
}

fn builtin_integer(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(machine.heap.deref(&args[0]), Term::Int(_)))
}

fn builtin_float(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(machine.heap.deref(&args[0]), Term::Float(_)))
}

fn builtin_compound(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(
        machine.heap.deref(&args[0]),
        Term::Compound(_) | Term::Cons(_)
    ))
}

fn builtin_atomic(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    test(matches!(
        machine.heap.deref(&args[0]),
        Term::Atom(_) | Term::Int(_) | Term::Float(_)
    ))
}

fn builtin_is_list(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    let mut current = machine.heap.deref(&args[0]);
    loop {
        match current {
            Term::Cons(cell) => current = machine.heap.deref(&cell.tail),
            ref t if t.is_nil() => return BuiltinResult::Succeeded,
            _ => return BuiltinResult::Failed,
        }
    }
}

/// Synchronization: wait until the argument is instantiated to anything.
fn builtin_data(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    match machine.heap.deref(&args[0]) {
        Term::Var(v) => BuiltinResult::Suspended(v),
        _ => BuiltinResult::Succeeded,
    }
}
