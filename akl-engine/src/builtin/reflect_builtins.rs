//! Aggregation and reflection builtins.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::reflect::{self, Reflection};
use crate::tree::AndBoxId;
use akl_ir::Term;
use tracing::info;

pub fn register(table: &mut BuiltinTable) {
    table.register("numberof", 2, builtin_numberof);
    table.register("reflective_call", 3, builtin_reflective_call);
    table.register("reflective_next", 2, builtin_reflective_next);
}

/// `numberof(Goal, N)`: N is the number of solutions of Goal, counted in a
/// detached sub-computation.
fn builtin_numberof(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let goal = machine.heap.deref(&args[0]);
    if let Term::Var(v) = goal {
        return BuiltinResult::Suspended(v);
    }
    let count = machine.detached_count(&goal) as i64;
    info!("numberof: {} solutions", count);
    if machine.unify_in(ab, &args[1], &Term::Int(count)) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

/// `reflective_call(R, Goal, Stream)`: starts a paused sub-computation for
/// Goal, emits its first answer (`solution(Bindings)` or `fail`) on
/// Stream, and binds R to the handle.
fn builtin_reflective_call(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let goal = machine.heap.deref(&args[1]);
    if let Term::Var(v) = goal {
        return BuiltinResult::Suspended(v);
    }

    let sub = reflect::detach(machine, &goal);
    let tail = machine.new_local_var(ab, None);
    if !machine.unify_in(ab, &args[2], &Term::Var(tail)) {
        return BuiltinResult::Failed;
    }

    let id = machine.new_reflection(Reflection { machine: sub, tail });
    reflect::advance(machine, ab, id.as_usize());

    if machine.unify_in(ab, &args[0], &Term::Reflection(id)) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

/// `reflective_next(R, R1)`: emits the next answer of the paused
/// sub-computation on its stream and passes the handle along.
fn builtin_reflective_next(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let id = match machine.heap.deref(&args[0]) {
        Term::Var(v) => return BuiltinResult::Suspended(v),
        Term::Reflection(id) => id,
        _ => return BuiltinResult::Failed,
    };
    reflect::advance(machine, ab, id.as_usize());
    if machine.unify_in(ab, &args[1], &Term::Reflection(id)) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}
