//! Robinson unification over heap terms.
//!
//! `unify` extends the trail with every binding it performs and schedules
//! the suspensions of every cell it binds. It does not inspect
//! environments: the external/local discipline of deferred bindings is the
//! engine's responsibility, not the unifier's. Probing callers (`\=`,
//! `can_unify`) run in quiet mode, which trails bindings without firing
//! suspensions so that a subsequent undo is observationally a no-op.

use crate::trail::Trail;
use crate::tree::{Tree, WakeTarget};
use akl_ir::{Atom, Heap, Term, VarId};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

pub struct Unifier<'a> {
    pub heap: &'a mut Heap,
    pub trail: &'a mut Trail,
    pub tree: &'a mut Tree,
    pub wake: &'a mut VecDeque<crate::tree::AndBoxId>,
    pub recall: &'a mut VecDeque<crate::tree::ChoiceBoxId>,
    /// Quiet probes bind without waking, so an undo leaves no trace.
    pub probe: bool,
    pub occurs_check: bool,
}

impl<'a> Unifier<'a> {
    /// Unifies two terms, returning true on success. On failure some
    /// bindings may have been performed; callers that care snapshot the
    /// trail and undo.
    pub fn unify(&mut self, a: &Term, b: &Term) -> bool {
        let a = self.heap.deref(a);
        let b = self.heap.deref(b);

        match (&a, &b) {
            (Term::Var(x), Term::Var(y)) => {
                if x == y {
                    return true;
                }
                // Deterministic tie-break: the younger cell points at the
                // older one.
                if x > y {
                    self.bind(*x, Term::Var(*y))
                } else {
                    self.bind(*y, Term::Var(*x))
                }
            }
            (Term::Var(x), other) => self.bind_checked(*x, other.clone()),
            (other, Term::Var(y)) => self.bind_checked(*y, other.clone()),
            _ => self.unify_nonvar(&a, &b),
        }
    }

    fn unify_nonvar(&mut self, a: &Term, b: &Term) -> bool {
        match (a, b) {
            (Term::Atom(x), Term::Atom(y)) => x == y,
            (Term::Int(x), Term::Int(y)) => x == y,
            (Term::Float(x), Term::Float(y)) => x == y,
            (Term::Compound(x), Term::Compound(y)) => {
                x.functor == y.functor
                    && x.args.len() == y.args.len()
                    && x.args
                        .iter()
                        .zip(y.args.iter())
                        .all(|(p, q)| self.unify(p, q))
            }
            (Term::Cons(x), Term::Cons(y)) => {
                self.unify(&x.head, &y.head) && self.unify(&x.tail, &y.tail)
            }
            (Term::Port(x), Term::Port(y)) => x == y,
            (Term::Reflection(x), Term::Reflection(y)) => x == y,
            _ => false,
        }
    }

    fn bind_checked(&mut self, var: VarId, value: Term) -> bool {
        if self.occurs_check && occurs(self.heap, var, &value) {
            return false;
        }
        self.bind(var, value)
    }

    /// Writes the cell, trails the write, and wakes everything suspended
    /// on the cell (unless probing).
    pub fn bind(&mut self, var: VarId, value: Term) -> bool {
        self.trail.push(var, None);
        self.heap.bind(var, value);
        if !self.probe {
            self.wake_suspensions(var);
        }
        true
    }

    fn wake_suspensions(&mut self, var: VarId) {
        let mut node = self.heap.var(var).wake;
        self.heap.var_mut(var).wake = None;
        while let Some(id) = node {
            let susp = self.tree.suspension(id);
            match susp.target {
                WakeTarget::AndBox(ab) => {
                    if !self.tree.is_dead_and(ab) {
                        self.wake.push_back(ab);
                    }
                }
                WakeTarget::ChoiceBox(cb) => {
                    if !self.tree.is_dead_choice(cb) {
                        self.recall.push_back(cb);
                    }
                }
            }
            node = susp.next;
        }
    }

    /// Checks unifiability without net effect: bindings are trailed
    /// quietly and undone.
    pub fn can_unify(&mut self, a: &Term, b: &Term) -> bool {
        let mark = self.trail.mark();
        let was_probe = self.probe;
        self.probe = true;
        let result = self.unify(a, b);
        self.probe = was_probe;
        self.trail.undo_to(self.heap, mark);
        result
    }
}

/// Occurs check: true iff `var` occurs in `term` under current bindings.
pub fn occurs(heap: &Heap, var: VarId, term: &Term) -> bool {
    match heap.deref(term) {
        Term::Var(v) => v == var,
        Term::Compound(c) => c.args.iter().any(|a| occurs(heap, var, a)),
        Term::Cons(cell) => occurs(heap, var, &cell.head) || occurs(heap, var, &cell.tail),
        _ => false,
    }
}

/// Copies a term with fresh variables: every distinct unbound variable in
/// `term` maps to one fresh cell in `env`, bound structure is followed.
/// The cells created are reported through `fresh` so the caller can index
/// them in the owning and-box.
pub fn copy_term(
    heap: &mut Heap,
    env: akl_ir::EnvId,
    term: &Term,
    fresh: &mut Vec<VarId>,
) -> Term {
    let mut map = FxHashMap::default();
    copy_rec(heap, env, term, &mut map, fresh)
}

fn copy_rec(
    heap: &mut Heap,
    env: akl_ir::EnvId,
    term: &Term,
    map: &mut FxHashMap<VarId, VarId>,
    fresh: &mut Vec<VarId>,
) -> Term {
    match heap.deref(term) {
        Term::Var(v) => {
            if let Some(&new) = map.get(&v) {
                return Term::Var(new);
            }
            let name = heap.var(v).name;
            let new = heap.new_var(name, env);
            map.insert(v, new);
            fresh.push(new);
            Term::Var(new)
        }
        Term::Compound(c) => {
            let args = c
                .args
                .iter()
                .map(|a| copy_rec(heap, env, a, map, fresh))
                .collect::<Vec<_>>();
            Term::compound(c.functor, args)
        }
        Term::Cons(cell) => {
            let head = copy_rec(heap, env, &cell.head, map, fresh);
            let tail = copy_rec(heap, env, &cell.tail, map, fresh);
            Term::cons(head, tail)
        }
        other => other,
    }
}

/// True iff the terms are identical up to a consistent renaming of
/// variables.
pub fn variant(heap: &Heap, a: &Term, b: &Term) -> bool {
    let mut ab = FxHashMap::default();
    let mut ba = FxHashMap::default();
    variant_rec(heap, a, b, &mut ab, &mut ba)
}

fn variant_rec(
    heap: &Heap,
    a: &Term,
    b: &Term,
    ab: &mut FxHashMap<VarId, VarId>,
    ba: &mut FxHashMap<VarId, VarId>,
) -> bool {
    match (heap.deref(a), heap.deref(b)) {
        (Term::Var(x), Term::Var(y)) => {
            if let Some(&mapped) = ab.get(&x) {
                return mapped == y;
            }
            if ba.contains_key(&y) {
                return false;
            }
            ab.insert(x, y);
            ba.insert(y, x);
            true
        }
        (Term::Var(_), _) | (_, Term::Var(_)) => false,
        (Term::Atom(x), Term::Atom(y)) => x == y,
        (Term::Int(x), Term::Int(y)) => x == y,
        (Term::Float(x), Term::Float(y)) => x == y,
        (Term::Compound(x), Term::Compound(y)) => {
            x.functor == y.functor
                && x.args.len() == y.args.len()
                && x.args
                    .iter()
                    .zip(y.args.iter())
                    .all(|(p, q)| variant_rec(heap, p, q, ab, ba))
        }
        (Term::Cons(x), Term::Cons(y)) => {
            variant_rec(heap, &x.head, &y.head, ab, ba)
                && variant_rec(heap, &x.tail, &y.tail, ab, ba)
        }
        _ => false,
    }
}

/// Renames a clause template: substitutes template variables by their
/// fresh counterparts. Templates are never bound, so no deref is needed;
/// every variable of the clause is in the map.
pub fn rename(term: &Term, map: &FxHashMap<VarId, VarId>) -> Term {
    match term {
        Term::Var(v) => match map.get(v) {
            Some(&new) => Term::Var(new),
            None => panic!("clause template variable {:?} not collected", v),
        },
        Term::Compound(c) => {
            let args = c.args.iter().map(|a| rename(a, map)).collect::<Vec<_>>();
            Term::compound(c.functor, args)
        }
        Term::Cons(cell) => Term::cons(rename(&cell.head, map), rename(&cell.tail, map)),
        other => other.clone(),
    }
}

/// Is `f` the functor of `term` with the given arity?
pub fn has_functor(term: &Term, name: &str, arity: usize) -> bool {
    match term {
        Term::Compound(c) => c.functor == Atom::new(name) && c.args.len() == arity,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::program::GuardKind;
    use akl_ir::make_list;

    struct Fixture {
        heap: Heap,
        trail: Trail,
        tree: Tree,
        wake: VecDeque<crate::tree::AndBoxId>,
        recall: VecDeque<crate::tree::ChoiceBoxId>,
    }

    impl Fixture {
        fn new() -> Fixture {
            Fixture {
                heap: Heap::new(),
                trail: Trail::new(),
                tree: Tree::new(),
                wake: VecDeque::new(),
                recall: VecDeque::new(),
            }
        }

        fn unifier(&mut self) -> Unifier<'_> {
            Unifier {
                heap: &mut self.heap,
                trail: &mut self.trail,
                tree: &mut self.tree,
                wake: &mut self.wake,
                recall: &mut self.recall,
                probe: false,
                occurs_check: false,
            }
        }
    }

    #[test]
    fn unify_binds_var_to_value() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        assert!(fx.unifier().unify(&Term::Var(x), &Term::Int(42)));
        assert_eq!(fx.heap.deref(&Term::Var(x)), Term::Int(42));
        assert_eq!(fx.trail.len(), 1);
    }

    #[test]
    fn unify_structures_argument_wise() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        let a = Term::compound(Atom::new("f"), vec![Term::Var(x), Term::Int(2)]);
        let b = Term::compound(Atom::new("f"), vec![Term::Int(1), Term::Int(2)]);
        assert!(fx.unifier().unify(&a, &b));
        assert_eq!(fx.heap.deref(&Term::Var(x)), Term::Int(1));

        let c = Term::compound(Atom::new("g"), vec![Term::Int(1), Term::Int(2)]);
        assert!(!fx.unifier().unify(&a, &c));
    }

    #[test]
    fn unify_lists() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let h = fx.heap.new_var(None, env);
        let t = fx.heap.new_var(None, env);
        let pattern = Term::cons(Term::Var(h), Term::Var(t));
        let list = make_list(vec![Term::Int(1), Term::Int(2)], Term::nil());
        assert!(fx.unifier().unify(&pattern, &list));
        assert_eq!(fx.heap.deref(&Term::Var(h)), Term::Int(1));
        assert_eq!(
            fx.heap.resolve(&Term::Var(t)),
            make_list(vec![Term::Int(2)], Term::nil())
        );
    }

    #[test]
    fn trail_symmetry_on_failed_attempt() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        let y = fx.heap.new_var(None, env);
        let a = Term::compound(Atom::new("f"), vec![Term::Var(x), Term::Var(y), Term::Int(1)]);
        let b = Term::compound(Atom::new("f"), vec![Term::Int(7), Term::Int(8), Term::Int(2)]);

        let mark = fx.trail.mark();
        assert!(!fx.unifier().unify(&a, &b));
        // Partial bindings happened; undo restores the pre-attempt state.
        let heap = &mut fx.heap;
        fx.trail.undo_to(heap, mark);
        assert!(!heap.is_bound(x));
        assert!(!heap.is_bound(y));
    }

    #[test]
    fn occurs_check_rejects_cycles() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        let fx_term = Term::compound(Atom::new("f"), vec![Term::Var(x)]);

        let mut u = fx.unifier();
        u.occurs_check = true;
        assert!(!u.unify(&Term::Var(x), &fx_term));

        // Without the check the cyclic binding is tolerated.
        let mut fx2 = Fixture::new();
        let env = fx2.heap.root_env();
        let y = fx2.heap.new_var(None, env);
        let fy = Term::compound(Atom::new("f"), vec![Term::Var(y)]);
        assert!(fx2.unifier().unify(&Term::Var(y), &fy));
    }

    #[test]
    fn can_unify_has_no_side_effects() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);

        // Register a suspension; a quiet probe must not consume it.
        let ab = fx.tree.new_and_box(env, GuardKind::None);
        let node = fx.tree.new_suspension(WakeTarget::AndBox(ab), None);
        fx.heap.var_mut(x).wake = Some(node);

        assert!(fx.unifier().can_unify(&Term::Var(x), &Term::Int(1)));
        assert!(!fx.heap.is_bound(x));
        assert!(fx.heap.var(x).wake.is_some());
        assert!(fx.wake.is_empty());

        assert!(!fx.unifier().can_unify(&Term::atom("a"), &Term::atom("b")));
    }

    #[test]
    fn binding_wakes_suspended_boxes() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        let ab1 = fx.tree.new_and_box(env, GuardKind::None);
        let ab2 = fx.tree.new_and_box(env, GuardKind::None);
        let first = fx.tree.new_suspension(WakeTarget::AndBox(ab1), None);
        let second = fx.tree.new_suspension(WakeTarget::AndBox(ab2), Some(first));
        fx.heap.var_mut(x).wake = Some(second);

        assert!(fx.unifier().unify(&Term::Var(x), &Term::Int(3)));
        assert_eq!(fx.wake.iter().copied().collect::<Vec<_>>(), vec![ab2, ab1]);
        assert!(fx.heap.var(x).wake.is_none());
    }

    #[test]
    fn copy_term_is_a_fresh_variant() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        let t = Term::compound(Atom::new("f"), vec![Term::Var(x), Term::Var(x), Term::Int(1)]);

        let mut fresh = Vec::new();
        let heap = &mut fx.heap;
        let copy = copy_term(heap, env, &t, &mut fresh);
        assert_eq!(fresh.len(), 1);
        assert!(variant(heap, &t, &copy));
        // Shared variable stays shared in the copy, but cells are disjoint.
        match &copy {
            Term::Compound(c) => {
                assert_eq!(c.args[0], c.args[1]);
                assert_ne!(c.args[0], Term::Var(x));
            }
            _ => panic!("expected compound"),
        }
    }

    #[test]
    fn variant_distinguishes_inconsistent_renaming() {
        let mut fx = Fixture::new();
        let env = fx.heap.root_env();
        let x = fx.heap.new_var(None, env);
        let y = fx.heap.new_var(None, env);
        let z = fx.heap.new_var(None, env);

        let xx = Term::compound(Atom::new("f"), vec![Term::Var(x), Term::Var(x)]);
        let yz = Term::compound(Atom::new("f"), vec![Term::Var(y), Term::Var(z)]);
        let zz = Term::compound(Atom::new("f"), vec![Term::Var(z), Term::Var(z)]);
        let heap = &fx.heap;
        assert!(variant(heap, &xx, &zz));
        assert!(!variant(heap, &xx, &yz));
    }
}
