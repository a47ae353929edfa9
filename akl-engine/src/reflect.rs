//! Detached sub-computations and reflections.
//!
//! Negation, `numberof/2` and the reflection builtins all evaluate a goal
//! in a fresh machine sharing the clause database. The goal crosses heaps
//! by value: bound structure is resolved, each distinct unbound variable
//! becomes a fresh cell in the sub-machine. Nothing a sub-computation does
//! can bind a caller variable.

use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::{Atom, Heap, Term, VarId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// A paused sub-computation: the machine, and the outer-heap stream tail
/// the next message goes to.
pub struct Reflection {
    pub machine: Box<Machine>,
    pub tail: VarId,
}

/// Builds a detached machine solving `goal` against the current bindings.
pub fn detach(outer: &mut Machine, goal: &Term) -> Box<Machine> {
    let mut sub = Box::new(Machine::new(outer.program.clone()));
    let (exported, vars) = export_goal(&outer.heap, &mut sub, goal);
    debug!("detached goal with {} free vars", vars.len());
    sub.set_goal(exported, vars);
    sub
}

/// Copies `goal` into the sub-machine's goal environment. Returns the
/// copied term and the named free variables (for solution reporting).
pub fn export_goal(
    outer_heap: &Heap,
    sub: &mut Machine,
    goal: &Term,
) -> (Term, Vec<(String, VarId)>) {
    let env = sub.goal_env();
    let mut map: FxHashMap<VarId, VarId> = FxHashMap::default();
    let term = export_rec(outer_heap, &mut sub.heap, env, goal, &mut map);

    let mut named = Vec::new();
    for (&outer_var, &sub_var) in map.iter() {
        if let Some(name) = outer_heap.var(outer_var).name {
            named.push((name.to_string(), sub_var));
        }
    }
    named.sort_by(|a, b| a.0.cmp(&b.0));
    (term, named)
}

fn export_rec(
    outer: &Heap,
    sub: &mut Heap,
    env: akl_ir::EnvId,
    term: &Term,
    map: &mut FxHashMap<VarId, VarId>,
) -> Term {
    match outer.deref(term) {
        Term::Var(v) => {
            if let Some(&mapped) = map.get(&v) {
                return Term::Var(mapped);
            }
            let fresh = sub.new_var(outer.var(v).name, env);
            map.insert(v, fresh);
            Term::Var(fresh)
        }
        Term::Compound(c) => {
            let args = c
                .args
                .iter()
                .map(|a| export_rec(outer, sub, env, a, map))
                .collect::<Vec<_>>();
            Term::compound(c.functor, args)
        }
        Term::Cons(cell) => {
            let head = export_rec(outer, sub, env, &cell.head, map);
            let tail = export_rec(outer, sub, env, &cell.tail, map);
            Term::cons(head, tail)
        }
        other => other,
    }
}

/// Copies a (resolved) sub-machine term back into the caller's heap;
/// unbound sub-variables become fresh locals of `ab`.
pub fn import_term(outer: &mut Machine, ab: AndBoxId, term: &Term) -> Term {
    let mut map = FxHashMap::default();
    import_rec(outer, ab, term, &mut map)
}

fn import_rec(
    outer: &mut Machine,
    ab: AndBoxId,
    term: &Term,
    map: &mut FxHashMap<VarId, VarId>,
) -> Term {
    match term {
        Term::Var(v) => {
            if let Some(&mapped) = map.get(v) {
                return Term::Var(mapped);
            }
            let fresh = outer.new_local_var(ab, None);
            map.insert(*v, fresh);
            Term::Var(fresh)
        }
        Term::Compound(c) => {
            let args = c
                .args
                .iter()
                .map(|a| import_rec(outer, ab, a, map))
                .collect::<Vec<_>>();
            Term::compound(c.functor, args)
        }
        Term::Cons(cell) => {
            let head = import_rec(outer, ab, &cell.head, map);
            let tail = import_rec(outer, ab, &cell.tail, map);
            Term::cons(head, tail)
        }
        other => other.clone(),
    }
}

/// Advances a reflection one answer: emits `solution(Bindings)` or `fail`
/// on its stream and returns the message emitted.
pub fn advance(outer: &mut Machine, ab: AndBoxId, reflection: usize) -> Term {
    let next = {
        let r = &mut outer.reflections[reflection];
        r.machine.next_solution()
    };
    let message = match next {
        Some(solution) => outer.solution_message(ab, &solution),
        None => Term::atom("fail"),
    };
    emit(outer, ab, reflection, message.clone());
    message
}

/// Binds the reflection's current stream tail to `[Message | Tail']`.
fn emit(outer: &mut Machine, ab: AndBoxId, reflection: usize, message: Term) {
    let tail = outer.reflections[reflection].tail;
    let new_tail = outer.new_local_var(ab, None);
    let cell = Term::cons(message, Term::Var(new_tail));
    if !outer.unify_in(ab, &Term::Var(tail), &cell) {
        // The caller closed or corrupted the stream; drop the message.
        debug!("reflection stream not extensible");
    }
    outer.reflections[reflection].tail = new_tail;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::program::Program;
    use std::sync::Arc;

    #[test]
    fn export_freshens_unbound_vars() {
        let mut outer = Machine::new(Arc::new(Program::new()));
        let env = outer.goal_env();
        let x = outer
            .heap
            .new_var(Some(Atom::new("X").interned()), env);
        let goal = Term::compound(Atom::new("p"), vec![Term::Var(x), Term::Var(x)]);

        let mut sub = Machine::new(Arc::new(Program::new()));
        let (exported, named) = export_goal(&outer.heap, &mut sub, &goal);
        match exported {
            Term::Compound(c) => {
                assert_eq!(c.args[0], c.args[1]);
                assert_ne!(c.args[0], Term::Var(x));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].0, "X");
    }

    #[test]
    fn export_resolves_current_bindings() {
        let mut outer = Machine::new(Arc::new(Program::new()));
        let env = outer.goal_env();
        let x = outer.heap.new_var(None, env);
        outer.heap.bind(x, Term::Int(3));
        let goal = Term::compound(Atom::new("p"), vec![Term::Var(x)]);

        let mut sub = Machine::new(Arc::new(Program::new()));
        let (exported, named) = export_goal(&outer.heap, &mut sub, &goal);
        assert_eq!(
            exported,
            Term::compound(Atom::new("p"), vec![Term::Int(3)])
        );
        assert!(named.is_empty());
    }
}
