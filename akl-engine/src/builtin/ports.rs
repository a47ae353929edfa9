//! Port builtins. A port is a multi-sender channel whose receiving side is
//! an ordinary stream: each send binds the current tail to a new cons cell
//! and advances the tail. The stream is closed with `[]` when the last
//! handle to the port drops.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::Term;
use tracing::debug;

pub fn register(table: &mut BuiltinTable) {
    table.register("open_port", 2, builtin_open_port);
    table.register("send", 2, builtin_send2);
    table.register("send", 3, builtin_send3);
}

fn builtin_open_port(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let env = machine.tree[ab].env;
    let (handle, stream_head) = machine.heap.new_port(env);
    machine.tree[ab].vars.push(stream_head);
    debug!("open_port {:?}", handle.id());

    if !machine.unify_in(ab, &args[0], &Term::Port(handle)) {
        return BuiltinResult::Failed;
    }
    if machine.unify_in(ab, &args[1], &Term::Var(stream_head)) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

fn send(machine: &mut Machine, message: &Term, port: &Term) -> BuiltinResult {
    let handle = match machine.heap.deref(port) {
        Term::Var(v) => return BuiltinResult::Suspended(v),
        Term::Port(handle) => handle,
        _ => return BuiltinResult::Failed,
    };
    let id = handle.id();
    if machine.heap.port(id).closed {
        return BuiltinResult::Failed;
    }

    let tail = machine.heap.port(id).tail;
    let tail = match machine.heap.deref(&Term::Var(tail)) {
        Term::Var(v) => v,
        t if t.is_nil() => {
            machine.heap.port_mut(id).closed = true;
            return BuiltinResult::Failed;
        }
        _ => return BuiltinResult::Failed,
    };

    let env = machine.heap.var(tail).env;
    let new_tail = machine.heap.new_var(None, env);
    let cell = Term::cons(message.clone(), Term::Var(new_tail));
    machine.unifier().bind(tail, cell);
    machine.heap.port_mut(id).tail = new_tail;
    BuiltinResult::Succeeded
}

fn builtin_send2(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    send(machine, &args[0], &args[1])
}

/// `send/3` threads the port: the third argument is the same port, for
/// code that passes a "state" along.
fn builtin_send3(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    match send(machine, &args[0], &args[1]) {
        BuiltinResult::Succeeded => {
            let port = machine.heap.deref(&args[1]);
            if machine.unify_in(ab, &args[2], &port) {
                BuiltinResult::Succeeded
            } else {
                BuiltinResult::Failed
            }
        }
        other => other,
    }
}
