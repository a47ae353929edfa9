//! Control builtins. `,/2`, `;/2`, `->/2`, `\+/1`, `=/2` and `halt` are
//! handled by goal expansion itself; what remains here is the trivial
//! trio and `consult/1`.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::Term;

pub fn register(table: &mut BuiltinTable) {
    table.register("true", 0, builtin_true);
    table.register("fail", 0, builtin_fail);
    table.register("false", 0, builtin_fail);
    table.register("consult", 1, builtin_consult);
}

fn builtin_true(_: &mut Machine, _: AndBoxId, _: &[Term]) -> BuiltinResult {
    BuiltinResult::Succeeded
}

fn builtin_fail(_: &mut Machine, _: AndBoxId, _: &[Term]) -> BuiltinResult {
    BuiltinResult::Failed
}

/// The clause database is read-only while a goal runs; consulting from
/// inside a solve is refused rather than racing live and-boxes against a
/// moving predicate table.
fn builtin_consult(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    let what = akl_ir::write::print_term(&machine.heap, &args[0]);
    eprintln!("consult({}): cannot consult during a running goal", what);
    BuiltinResult::Failed
}
