//! Builtin dispatch.
//!
//! Builtins are registered in a table keyed by `(name, arity)`;
//! registration is data, not code. A builtin receives the machine, the
//! current and-box and the argument vector, and reports success, failure,
//! or suspension on a variable it needs bound. Builtins respect the trail
//! discipline: anything that probes bindings snapshots and restores.

use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::{Atom, Term, VarId};
use rustc_hash::FxHashMap;

pub mod arith;
pub mod compare;
pub mod control;
pub mod io;
pub mod lists;
pub mod ports;
pub mod reflect_builtins;
pub mod structure;
pub mod types;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuiltinResult {
    Succeeded,
    Failed,
    /// The and-box must wait for this cell; the goal is re-queued.
    Suspended(VarId),
}

pub type BuiltinFn = fn(&mut Machine, AndBoxId, &[Term]) -> BuiltinResult;

#[derive(Default)]
pub struct BuiltinTable {
    table: FxHashMap<(Atom, usize), BuiltinFn>,
}

impl BuiltinTable {
    /// The standard registry.
    pub fn standard() -> BuiltinTable {
        let mut table = BuiltinTable::default();
        control::register(&mut table);
        compare::register(&mut table);
        arith::register(&mut table);
        structure::register(&mut table);
        types::register(&mut table);
        lists::register(&mut table);
        io::register(&mut table);
        ports::register(&mut table);
        reflect_builtins::register(&mut table);
        table
    }

    pub fn register(&mut self, name: &str, arity: usize, f: BuiltinFn) {
        self.table.insert((Atom::new(name), arity), f);
    }

    pub fn lookup(&self, name: Atom, arity: usize) -> Option<BuiltinFn> {
        self.table.get(&(name, arity)).copied()
    }

    pub fn contains(&self, name: Atom, arity: usize) -> bool {
        self.table.contains_key(&(name, arity))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn standard_registry_has_the_required_set() {
        let table = BuiltinTable::standard();
        for (name, arity) in &[
            ("\\=", 2),
            ("==", 2),
            ("\\==", 2),
            ("@<", 2),
            ("@>", 2),
            ("@=<", 2),
            ("@>=", 2),
            ("compare", 3),
            ("is", 2),
            ("=:=", 2),
            ("=\\=", 2),
            ("<", 2),
            (">", 2),
            ("=<", 2),
            (">=", 2),
            ("functor", 3),
            ("arg", 3),
            ("=..", 2),
            ("copy_term", 2),
            ("var", 1),
            ("nonvar", 1),
            ("atom", 1),
            ("number", 1),
            ("integer", 1),
            ("float", 1),
            ("compound", 1),
            ("is_list", 1),
            ("atomic", 1),
            ("data", 1),
            ("length", 2),
            ("write", 1),
            ("writeln", 1),
            ("nl", 0),
            ("put", 1),
            ("format", 1),
            ("format", 2),
            ("fflush", 1),
            ("read_term", 2),
            ("getc", 2),
            ("open_port", 2),
            ("send", 2),
            ("send", 3),
            ("numberof", 2),
            ("reflective_call", 3),
            ("reflective_next", 2),
            ("dif", 2),
            ("consult", 1),
        ] {
            assert!(
                table.contains(Atom::new(name), *arity),
                "missing builtin {}/{}",
                name,
                arity
            );
        }
    }
}
