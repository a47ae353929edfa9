//! List builtins.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::{make_list, Term};

pub fn register(table: &mut BuiltinTable) {
    table.register("length", 2, builtin_length);
}

/// `length/2` in proper-list mode: measures a proper list, or builds one
/// of fresh variables when the length is known. With both sides open it
/// waits for the list.
fn builtin_length(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let mut seen = 0i64;
    let mut current = machine.heap.deref(&args[0]);
    loop {
        match current {
            Term::Cons(cell) => {
                seen += 1;
                current = machine.heap.deref(&cell.tail);
            }
            ref t if t.is_nil() => {
                return if machine.unify_in(ab, &args[1], &Term::Int(seen)) {
                    BuiltinResult::Succeeded
                } else {
                    BuiltinResult::Failed
                };
            }
            Term::Var(tail) => {
                // Partial list: with a known total we can close it.
                match machine.heap.deref(&args[1]) {
                    Term::Int(total) => {
                        let remaining = total - seen;
                        if remaining < 0 {
                            return BuiltinResult::Failed;
                        }
                        let fresh = (0..remaining)
                            .map(|_| Term::Var(machine.new_local_var(ab, None)))
                            .collect::<Vec<_>>();
                        let closed = make_list(fresh, Term::nil());
                        return if machine.unify_in(ab, &Term::Var(tail), &closed) {
                            BuiltinResult::Succeeded
                        } else {
                            BuiltinResult::Failed
                        };
                    }
                    Term::Var(_) => return BuiltinResult::Suspended(tail),
                    _ => return BuiltinResult::Failed,
                }
            }
            _ => return BuiltinResult::Failed,
        }
    }
}
