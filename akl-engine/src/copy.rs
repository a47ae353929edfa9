//! Deep copy of a mother and-box subtree, the heart of splitting.
//!
//! Cells whose environment lies inside the mother's env subtree are local
//! and get fresh instances; external cells stay shared between original
//! and copy. Atoms, numbers and immutable structure are shared by
//! construction. Every intra-subtree reference is retargeted through
//! identity maps built during the traversal.

use crate::tree::{AndBoxId, ChoiceBoxId, Constraint, Tree, WakeTarget};
use akl_ir::{EnvId, Heap, SuspensionId, Term, VarId};
use rustc_hash::FxHashMap;
use tracing::debug;

pub struct CopyOutcome {
    pub root: AndBoxId,
    pub and_map: FxHashMap<AndBoxId, AndBoxId>,
    pub choice_map: FxHashMap<ChoiceBoxId, ChoiceBoxId>,
}

struct Copier<'a> {
    heap: &'a mut Heap,
    tree: &'a mut Tree,
    mother_env: EnvId,
    env_map: FxHashMap<EnvId, EnvId>,
    var_map: FxHashMap<VarId, VarId>,
    and_map: FxHashMap<AndBoxId, AndBoxId>,
    choice_map: FxHashMap<ChoiceBoxId, ChoiceBoxId>,
}

pub fn copy_subtree(heap: &mut Heap, tree: &mut Tree, mother: AndBoxId) -> CopyOutcome {
    let mother_env = tree[mother].env;
    let mut copier = Copier {
        heap,
        tree,
        mother_env,
        env_map: FxHashMap::default(),
        var_map: FxHashMap::default(),
        and_map: FxHashMap::default(),
        choice_map: FxHashMap::default(),
    };

    // First pass: clone the box skeleton so every intra-subtree id has a
    // counterpart before terms are copied.
    let root = copier.clone_and_skeleton(mother);
    // Second pass: fill contents, remapping cells and suspensions.
    copier.fill_boxes();

    debug!(
        "copied subtree of {:?}: {} and-boxes, {} choice-boxes, {} cells",
        mother,
        copier.and_map.len(),
        copier.choice_map.len(),
        copier.var_map.len()
    );

    CopyOutcome {
        root,
        and_map: copier.and_map,
        choice_map: copier.choice_map,
    }
}

impl<'a> Copier<'a> {
    fn clone_and_skeleton(&mut self, ab: AndBoxId) -> AndBoxId {
        let env = self.copy_env(self.tree[ab].env);
        let status = self.tree[ab].status;
        let in_guard = self.tree[ab].in_guard;
        let new = self.tree.new_and_box(env, self.tree[ab].guard_kind);
        self.and_map.insert(ab, new);

        self.tree[new].status = status;
        self.tree[new].in_guard = in_guard;

        for chb in self.tree.children(ab) {
            if self.tree.is_dead_choice(chb) {
                continue;
            }
            let new_chb = self.clone_choice_skeleton(chb);
            self.tree.add_child(new, new_chb);
        }
        new
    }

    fn clone_choice_skeleton(&mut self, chb: ChoiceBoxId) -> ChoiceBoxId {
        let new = self.tree.new_choice_box(self.tree[chb].guard_kind);
        self.choice_map.insert(chb, new);

        for alt in self.tree.alternatives(chb) {
            if self.tree.is_dead_and(alt) {
                continue;
            }
            let new_alt = self.clone_and_skeleton(alt);
            self.tree.add_alternative(new, new_alt);
        }
        new
    }

    fn fill_boxes(&mut self) {
        let entries: Vec<(AndBoxId, AndBoxId)> =
            self.and_map.iter().map(|(&k, &v)| (k, v)).collect();
        for (old, new) in entries {
            let goals: Vec<Term> = self.tree[old].goals.iter().cloned().collect();
            for goal in goals {
                let copied = self.copy_term(&goal);
                self.tree[new].goals.push_back(copied);
            }

            let parked: Vec<Term> = self.tree[old].parked.clone();
            for goal in parked {
                let copied = self.copy_term(&goal);
                self.tree[new].parked.push(copied);
            }

            let head: Vec<(Term, Term)> = self.tree[old].head.clone();
            for (a, b) in head {
                let a = self.copy_term(&a);
                let b = self.copy_term(&b);
                self.tree[new].head.push((a, b));
            }

            let body: Vec<Term> = self.tree[old].body.iter().cloned().collect();
            for goal in body {
                let copied = self.copy_term(&goal);
                self.tree[new].body.push_back(copied);
            }

            let constraints: Vec<Constraint> = self.tree[old].constraints.clone();
            for c in constraints {
                let var = self.copy_var(c.var);
                let value = self.copy_term(&c.value);
                self.tree[new].constraints.push(Constraint {
                    var,
                    value,
                    noisy: c.noisy,
                });
            }

            let vars: Vec<VarId> = self.tree[old].vars.clone();
            for v in vars {
                let copied = self.copy_var(v);
                self.tree[new].vars.push(copied);
            }

            let suspended: Vec<VarId> = self.tree[old].suspended_on.clone();
            for v in suspended {
                let copied = self.copy_var(v);
                self.tree[new].suspended_on.push(copied);
            }

            let query_vars: Vec<(String, VarId)> = self.tree[old].query_vars.clone();
            for (name, v) in query_vars {
                let copied = self.copy_var(v);
                self.tree[new].query_vars.push((name, copied));
            }
        }
    }

    fn is_local_env(&self, env: EnvId) -> bool {
        self.heap.env_is_ancestor(self.mother_env, env)
    }

    fn copy_env(&mut self, env: EnvId) -> EnvId {
        if !self.is_local_env(env) {
            return env;
        }
        if let Some(&mapped) = self.env_map.get(&env) {
            return mapped;
        }
        let parent = self
            .heap
            .env_parent(env)
            .map(|p| self.copy_env(p));
        let new = self.heap.new_env(parent);
        self.env_map.insert(env, new);
        new
    }

    /// Local cells clone (binding included, suspensions retargeted);
    /// external cells are shared.
    fn copy_var(&mut self, v: VarId) -> VarId {
        if !self.is_local_env(self.heap.var(v).env) {
            return v;
        }
        if let Some(&mapped) = self.var_map.get(&v) {
            return mapped;
        }
        let name = self.heap.var(v).name;
        let env = self.copy_env(self.heap.var(v).env);
        let new = self.heap.new_var(name, env);
        // Map before descending into the binding: a cyclic binding chain
        // must close onto the copy, not recurse forever.
        self.var_map.insert(v, new);

        if let Some(binding) = self.heap.var(v).binding.clone() {
            let copied = self.copy_term(&binding);
            self.heap.bind(new, copied);
        }

        let wake = self.heap.var(v).wake;
        let copied_wake = self.copy_suspensions(wake);
        self.heap.var_mut(new).wake = copied_wake;

        new
    }

    fn copy_suspensions(&mut self, head: Option<SuspensionId>) -> Option<SuspensionId> {
        let mut nodes = Vec::new();
        let mut current = head;
        while let Some(id) = current {
            let node = self.tree.suspension(id);
            nodes.push(node.target);
            current = node.next;
        }

        // Rebuild back-to-front to preserve order; targets outside the
        // copied subtree (dead boxes skipped by the skeleton pass) drop.
        let mut new_head = None;
        for target in nodes.into_iter().rev() {
            let mapped = match target {
                WakeTarget::AndBox(ab) => self.and_map.get(&ab).map(|&n| WakeTarget::AndBox(n)),
                WakeTarget::ChoiceBox(cb) => {
                    self.choice_map.get(&cb).map(|&n| WakeTarget::ChoiceBox(n))
                }
            };
            if let Some(target) = mapped {
                new_head = Some(self.tree.new_suspension(target, new_head));
            }
        }
        new_head
    }

    fn copy_term(&mut self, term: &Term) -> Term {
        match term {
            Term::Var(v) => Term::Var(self.copy_var(*v)),
            Term::Compound(c) => {
                let args = c
                    .args
                    .iter()
                    .map(|a| self.copy_term(a))
                    .collect::<Vec<_>>();
                Term::compound(c.functor, args)
            }
            Term::Cons(cell) => {
                let head = self.copy_term(&cell.head);
                let tail = self.copy_term(&cell.tail);
                Term::cons(head, tail)
            }
            other => other.clone(),
        }
    }
}
