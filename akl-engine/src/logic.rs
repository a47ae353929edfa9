//! The rewriting engine: goal expansion, the guard discipline, promotion,
//! failure propagation and the split candidate scan.

use crate::builtin::BuiltinResult;
use crate::machine::{Machine, Solution};
use crate::program::{flatten_conjunction, Clause, GuardKind};
use crate::tree::{AndBoxId, ChoiceBoxId, Constraint, Status, Task};
use crate::unify::{has_functor, rename};
use akl_ir::{make_list, Atom, Term, VarId};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// Outcome of dispatching one goal.
enum Flow {
    /// Keep expanding this and-box.
    Continue,
    /// The and-box yielded (failed, suspended, or halted); leave it.
    Stop,
}

impl Machine {
    /// The engine-level unification discipline: local cells bind on the
    /// spot, a binding of an external cell is deferred onto the and-box's
    /// unifier list and the box suspends on that cell.
    pub(crate) fn unify_in(&mut self, ab: AndBoxId, a: &Term, b: &Term) -> bool {
        let noisy = self.tree[ab].in_guard;
        self.unify_in_phase(ab, a, b, noisy)
    }

    pub(crate) fn unify_in_phase(&mut self, ab: AndBoxId, a: &Term, b: &Term, noisy: bool) -> bool {
        let a = self.heap.deref(a);
        let b = self.heap.deref(b);

        match (&a, &b) {
            (Term::Var(x), Term::Var(y)) if x == y => true,
            (Term::Var(x), Term::Var(y)) => {
                if self.is_local(*x, ab) {
                    self.unifier().bind(*x, Term::Var(*y))
                } else if self.is_local(*y, ab) {
                    self.unifier().bind(*y, Term::Var(*x))
                } else {
                    self.defer(ab, *x, Term::Var(*y), noisy);
                    true
                }
            }
            (Term::Var(x), other) | (other, Term::Var(x)) => {
                if self.is_local(*x, ab) {
                    self.unifier().bind(*x, other.clone())
                } else {
                    self.defer(ab, *x, other.clone(), noisy);
                    true
                }
            }
            (Term::Atom(x), Term::Atom(y)) => x == y,
            (Term::Int(x), Term::Int(y)) => x == y,
            (Term::Float(x), Term::Float(y)) => x == y,
            (Term::Compound(x), Term::Compound(y)) => {
                x.functor == y.functor
                    && x.args.len() == y.args.len()
                    && x.args
                        .iter()
                        .zip(y.args.iter())
                        .all(|(p, q)| self.unify_in_phase(ab, p, q, noisy))
            }
            (Term::Cons(x), Term::Cons(y)) => {
                self.unify_in_phase(ab, &x.head, &y.head, noisy)
                    && self.unify_in_phase(ab, &x.tail, &y.tail, noisy)
            }
            (Term::Port(x), Term::Port(y)) => x == y,
            (Term::Reflection(x), Term::Reflection(y)) => x == y,
            _ => false,
        }
    }

    fn defer(&mut self, ab: AndBoxId, var: VarId, value: Term, noisy: bool) {
        debug!("defer {:?} on {:?} (noisy: {})", var, ab, noisy);
        // A variable-variable pair can be decided from either end.
        if let Term::Var(other) = &value {
            self.suspend_on(ab, *other);
        }
        self.tree[ab].constraints.push(Constraint { var, value, noisy });
        self.suspend_on(ab, var);
    }

    /// Parks a goal that needs `var` bound and suspends the and-box on
    /// that cell. Parked goals re-enter the queue on wake.
    fn park(&mut self, ab: AndBoxId, goal: Term, var: VarId) {
        debug!("park {:?} on {:?}", goal, var);
        self.tree[ab].parked.push(goal);
        self.suspend_on(ab, var);
    }

    pub(crate) fn run_task(&mut self, task: Task) {
        match task {
            Task::Start(ab) => {
                if self.tree.is_dead_and(ab) {
                    return;
                }
                // Head unification first; only then does the guard run.
                let head = std::mem::take(&mut self.tree[ab].head);
                for (call_arg, head_arg) in head {
                    if !self.unify_in_phase(ab, &call_arg, &head_arg, false) {
                        debug!("head unification failed for {:?}", ab);
                        self.fail(ab);
                        return;
                    }
                }
                self.tree[ab].in_guard = true;
                self.run_box(ab);
            }
            Task::Promote(ab) => {
                if self.tree.is_dead_and(ab) || !self.tree.is_solved(ab) {
                    return;
                }
                self.check_commit(ab);
            }
            Task::Split(m) => {
                if self.tree.is_dead_and(m) {
                    return;
                }
                let candidate = self
                    .tree
                    .children(m)
                    .into_iter()
                    .find_map(|cb| self.scan_choice_box(cb));
                if let Some(c) = candidate {
                    self.split(c);
                }
            }
        }
    }

    /// An and-box whose suspension fired: re-attempt the deferred
    /// unifications whose cell got bound, then continue expansion.
    pub(crate) fn resume(&mut self, ab: AndBoxId) {
        let pending = std::mem::take(&mut self.tree[ab].constraints);
        for c in pending {
            let value_ready = match &c.value {
                Term::Var(v) => self.heap.is_bound(*v),
                _ => false,
            };
            if self.heap.is_bound(c.var) || value_ready {
                if !self.unify_in_phase(ab, &Term::Var(c.var), &c.value, c.noisy) {
                    debug!("deferred unification failed for {:?}", ab);
                    self.fail(ab);
                    return;
                }
            } else {
                self.tree[ab].constraints.push(c);
            }
        }

        let heap = &self.heap;
        self.tree[ab]
            .suspended_on
            .retain(|&v| !heap.is_bound(v));
        self.tree[ab].status = if self.tree[ab].suspended_on.is_empty() {
            Status::Stable
        } else {
            Status::Unstable
        };

        // Parked goals go back in front; those still blocked re-park.
        let parked = std::mem::take(&mut self.tree[ab].parked);
        for goal in parked.into_iter().rev() {
            self.tree[ab].goals.push_front(goal);
        }

        self.run_box(ab);
    }

    /// A choice-box that gained information: re-test its leftmost
    /// alternative's commit rule.
    pub(crate) fn recall_choice(&mut self, cb: ChoiceBoxId) {
        if let Some(first) = self.tree[cb].tried {
            self.tasks.push_back(Task::Promote(first));
        }
    }

    fn run_box(&mut self, ab: AndBoxId) {
        self.execute(ab);
        if !self.tree.is_dead_and(ab) && self.tree.is_solved(ab) {
            self.check_commit(ab);
        }
    }

    /// Goal expansion: pops the leftmost pending goal and dispatches until
    /// the queue drains or the box yields.
    fn execute(&mut self, ab: AndBoxId) {
        loop {
            if self.tree.is_dead_and(ab) || self.halted.is_some() {
                return;
            }
            let goal = match self.tree[ab].goals.pop_front() {
                Some(goal) => goal,
                None => return,
            };
            let goal = self.heap.deref(&goal);
            debug!("expand {:?}: {:?}", ab, goal);

            let flow = match &goal {
                Term::Atom(name) => self.dispatch(ab, *name, &[], &goal),
                Term::Compound(c) => {
                    let args = c.args.to_vec();
                    self.dispatch(ab, c.functor, &args, &goal)
                }
                Term::Var(v) => {
                    // Unbound callee: park until someone tells us what to
                    // call; the rest of the conjunction keeps going.
                    self.park(ab, goal.clone(), *v);
                    Flow::Continue
                }
                _ => {
                    debug!("non-callable goal {:?}", goal);
                    self.fail(ab);
                    Flow::Stop
                }
            };

            match flow {
                Flow::Continue => continue,
                Flow::Stop => return,
            }
        }
    }

    fn dispatch(&mut self, ab: AndBoxId, name: Atom, args: &[Term], goal: &Term) -> Flow {
        let text = name.text();
        match (text.as_str(), args.len()) {
            (",", 2) => {
                self.tree[ab].goals.push_front(args[1].clone());
                self.tree[ab].goals.push_front(args[0].clone());
                Flow::Continue
            }

            (";", 2) => {
                if has_functor(&self.heap.deref(&args[0]), "->", 2) {
                    let cond = self.heap.deref(&args[0]);
                    let (c, t) = match &cond {
                        Term::Compound(ite) => (ite.args[0].clone(), ite.args[1].clone()),
                        _ => unreachable!(),
                    };
                    self.if_then_else(ab, c, t, Some(args[1].clone()));
                } else {
                    self.disjunction(ab, args[0].clone(), args[1].clone());
                }
                Flow::Continue
            }

            ("->", 2) => {
                self.if_then_else(ab, args[0].clone(), args[1].clone(), None);
                Flow::Continue
            }

            ("\\+", 1) => {
                // Negation as failure over a detached sub-computation.
                if self.detached_has_solution(&args[0]) {
                    self.fail(ab);
                    Flow::Stop
                } else {
                    Flow::Continue
                }
            }

            ("true", 0) => Flow::Continue,

            ("fail", 0) | ("false", 0) => {
                self.fail(ab);
                Flow::Stop
            }

            ("=", 2) => {
                if self.unify_in(ab, &args[0], &args[1]) {
                    Flow::Continue
                } else {
                    self.fail(ab);
                    Flow::Stop
                }
            }

            ("apply", 2) => self.apply(ab, args, goal),

            ("halt", 0) => {
                self.halted = Some(0);
                Flow::Stop
            }
            ("halt", 1) => {
                let code = match self.heap.deref(&args[0]) {
                    Term::Int(n) => n as i32,
                    _ => 0,
                };
                self.halted = Some(code);
                Flow::Stop
            }

            _ => {
                if let Some(f) = self.builtins.clone().lookup(name, args.len()) {
                    match f(self, ab, args) {
                        BuiltinResult::Succeeded => Flow::Continue,
                        BuiltinResult::Failed => {
                            self.fail(ab);
                            Flow::Stop
                        }
                        BuiltinResult::Suspended(v) => {
                            self.park(ab, goal.clone(), v);
                            Flow::Continue
                        }
                    }
                } else if self.program.contains(name, args.len()) {
                    self.call_predicate(ab, name, args);
                    Flow::Continue
                } else {
                    // Unknown predicate: failure, and nothing is logged.
                    self.fail(ab);
                    Flow::Stop
                }
            }
        }
    }

    /// Higher-order call: `apply(F, [A...])` turns into `F(A...)`.
    fn apply(&mut self, ab: AndBoxId, args: &[Term], goal: &Term) -> Flow {
        let callee = self.heap.deref(&args[0]);
        let extra = match akl_ir::list_to_vec(&self.heap, &args[1]) {
            Some(extra) => extra,
            None => {
                self.fail(ab);
                return Flow::Stop;
            }
        };
        let call = match callee {
            Term::Var(v) => {
                self.park(ab, goal.clone(), v);
                return Flow::Continue;
            }
            Term::Atom(a) => {
                if extra.is_empty() {
                    Term::Atom(a)
                } else {
                    Term::compound(a, extra)
                }
            }
            Term::Compound(c) => {
                let mut all = c.args.to_vec();
                all.extend(extra);
                Term::compound(c.functor, all)
            }
            _ => {
                self.fail(ab);
                return Flow::Stop;
            }
        };
        self.tree[ab].goals.push_front(call);
        Flow::Continue
    }

    /// Creates the choice-box for a user predicate call, one alternative
    /// per clause, and queues their START tasks in declaration order.
    fn call_predicate(&mut self, ab: AndBoxId, name: Atom, args: &[Term]) {
        let program = self.program.clone();
        let pred = program
            .lookup(name, args.len())
            .expect("caller checked the predicate exists");

        info!("call {}/{} -> {} clauses", name, args.len(), pred.clauses.len());
        let chb = self.tree.new_choice_box(pred.clauses[0].guard_kind);
        self.tree.add_child(ab, chb);
        for clause in &pred.clauses {
            let alt = self.instantiate_clause(ab, chb, clause, args);
            self.tasks.push_back(Task::Start(alt));
        }
    }

    /// Clause instantiation: a fresh and-box with a fresh child env,
    /// a deep copy of the clause with fresh local cells (same source name,
    /// same fresh cell within the one copy), the head unifications pending,
    /// the guard as its goals, and the body out-of-band.
    fn instantiate_clause(
        &mut self,
        caller: AndBoxId,
        chb: ChoiceBoxId,
        clause: &Clause,
        args: &[Term],
    ) -> AndBoxId {
        let env = self.heap.new_env(Some(self.tree[caller].env));
        let alt = self.tree.new_and_box(env, clause.guard_kind);

        let mut map = FxHashMap::default();
        for &template in &clause.vars {
            let name = self.program.heap().var(template).name;
            let fresh = self.heap.new_var(name, env);
            self.tree[alt].vars.push(fresh);
            map.insert(template, fresh);
        }

        let head = rename(&clause.head, &map);
        if let Term::Compound(h) = &head {
            for (call_arg, head_arg) in args.iter().zip(h.args.iter()) {
                self.tree[alt].head.push((call_arg.clone(), head_arg.clone()));
            }
        }
        for goal in &clause.guard {
            let goal = rename(goal, &map);
            self.tree[alt].goals.push_back(goal);
        }
        for goal in &clause.body {
            let goal = rename(goal, &map);
            self.tree[alt].body.push_back(goal);
        }

        self.tree.add_alternative(chb, alt);
        alt
    }

    /// `(C -> T ; E)`: a choice-box whose first alternative runs the
    /// condition as an ARROW guard with `T` as body; the else branch waits
    /// behind it with an empty guard.
    fn if_then_else(&mut self, ab: AndBoxId, cond: Term, then: Term, els: Option<Term>) {
        let chb = self.tree.new_choice_box(GuardKind::Arrow);
        self.tree.add_child(ab, chb);

        let then_env = self.heap.new_env(Some(self.tree[ab].env));
        let then_alt = self.tree.new_and_box(then_env, GuardKind::Arrow);
        let mut guard = Vec::new();
        flatten_conjunction(&cond, &mut guard);
        for goal in guard {
            self.tree[then_alt].goals.push_back(goal);
        }
        let mut body = Vec::new();
        flatten_conjunction(&then, &mut body);
        for goal in body {
            self.tree[then_alt].body.push_back(goal);
        }
        self.tree.add_alternative(chb, then_alt);
        self.tasks.push_back(Task::Start(then_alt));

        if let Some(els) = els {
            let else_env = self.heap.new_env(Some(self.tree[ab].env));
            let else_alt = self.tree.new_and_box(else_env, GuardKind::Arrow);
            let mut body = Vec::new();
            flatten_conjunction(&els, &mut body);
            for goal in body {
                self.tree[else_alt].body.push_back(goal);
            }
            self.tree.add_alternative(chb, else_alt);
            self.tasks.push_back(Task::Start(else_alt));
        }
    }

    /// Plain `;/2`: a two-alternative wait choice-box. Each branch has an
    /// empty guard and carries its goal as body, so commitment goes through
    /// the ordinary determinacy or splitting paths.
    fn disjunction(&mut self, ab: AndBoxId, left: Term, right: Term) {
        let chb = self.tree.new_choice_box(GuardKind::None);
        self.tree.add_child(ab, chb);

        for branch in &[left, right] {
            let env = self.heap.new_env(Some(self.tree[ab].env));
            let alt = self.tree.new_and_box(env, GuardKind::None);
            let mut body = Vec::new();
            flatten_conjunction(branch, &mut body);
            for goal in body {
                self.tree[alt].body.push_back(goal);
            }
            self.tree.add_alternative(chb, alt);
            self.tasks.push_back(Task::Start(alt));
        }
    }

    /// Tests the commit rule of a solved and-box and promotes on success.
    fn check_commit(&mut self, ab: AndBoxId) {
        let chb = match self.tree[ab].father {
            Some(chb) => chb,
            None => return,
        };

        if self.tree[chb].father.is_none() {
            // Direct child of the root choice-box: a solution.
            self.record_solution(ab);
            return;
        }

        let kind = self.tree[ab].guard_kind;
        let committable = match kind {
            GuardKind::None | GuardKind::Wait => self.tree.is_determinate(chb),
            GuardKind::QuietWait => self.tree.is_determinate(chb) && self.tree.is_quiet(ab),
            GuardKind::Arrow => self.tree.is_leftmost(ab) && self.tree.is_quiet(ab),
            GuardKind::Commit => self.tree.is_quiet(ab),
            GuardKind::Cut => self.tree.is_leftmost(ab),
        };

        debug!(
            "check_commit {:?} kind {:?}: committable = {}",
            ab, kind, committable
        );
        if committable {
            self.promote(ab, chb);
        }
    }

    /// Merges a committed and-box into its parent: discharge the deferred
    /// unifiers, re-home the local cells, hand over the body, prune per the
    /// guard table, and drop the now-empty choice-box.
    fn promote(&mut self, ab: AndBoxId, chb: ChoiceBoxId) {
        let m = self.tree[chb].father.expect("promotion below the root");
        info!("promote {:?} into {:?}", ab, m);

        // Deferred unifiers: pairs whose cell is within the parent's reach
        // are unified now; pairs still external travel up one level.
        let pairs = std::mem::take(&mut self.tree[ab].constraints);
        for c in pairs {
            if self.is_local(c.var, m) || self.heap.is_bound(c.var) {
                if !self.unify_in(m, &Term::Var(c.var), &c.value) {
                    debug!("discharge failed, killing parent {:?}", m);
                    self.fail(m);
                    return;
                }
            } else {
                let noisy = self.tree[m].in_guard;
                self.tree[m].constraints.push(Constraint {
                    var: c.var,
                    value: c.value,
                    noisy,
                });
                self.suspend_on(m, c.var);
            }
        }

        // Re-home local cells one level up, so body goals referencing them
        // do not spuriously look external at the parent.
        let promoted_env = self.tree[ab].env;
        let parent_env = self.tree[m].env;
        let vars = std::mem::take(&mut self.tree[ab].vars);
        for v in vars {
            if self.heap.var(v).env == promoted_env {
                self.heap.set_env(v, parent_env);
            }
            self.tree[m].vars.push(v);
        }

        // Body goals go to the front of the parent's queue, in order.
        let body = std::mem::take(&mut self.tree[ab].body);
        for goal in body.into_iter().rev() {
            self.tree[m].goals.push_front(goal);
        }

        // Pruning per the guard table.
        match self.tree[ab].guard_kind {
            GuardKind::Arrow | GuardKind::Cut => {
                let mut sib = self.tree[ab].next;
                while let Some(s) = sib {
                    sib = self.tree[s].next;
                    debug!("pruning right sibling {:?}", s);
                    self.tree.kill_and_box(s);
                    self.tree.remove_alternative(chb, s);
                }
            }
            GuardKind::Commit => {
                for s in self.tree.alternatives(chb) {
                    if s != ab {
                        debug!("pruning sibling {:?}", s);
                        self.tree.kill_and_box(s);
                        self.tree.remove_alternative(chb, s);
                    }
                }
            }
            _ => {}
        }

        self.tree.remove_alternative(chb, ab);
        self.tree[ab].status = Status::Dead;

        debug_assert!(
            self.tree[chb].tried.is_none(),
            "promotion left alternatives behind"
        );
        self.tree.remove_child(m, chb);
        self.tree[chb].status = Status::Dead;

        self.wake.push_back(m);
    }

    fn record_solution(&mut self, ab: AndBoxId) {
        debug_assert!(
            self.tree[ab].constraints.is_empty(),
            "root alternative with deferred unifiers"
        );
        let bindings = self.tree[ab]
            .query_vars
            .iter()
            .map(|(name, v)| (name.clone(), self.heap.resolve(&Term::Var(*v))))
            .collect();
        info!("solution: {:?}", bindings);
        self.solutions.push_back(Solution { bindings });

        let root = self.root;
        self.tree.remove_alternative(root, ab);
        self.tree[ab].status = Status::Dead;
    }

    /// Kills an and-box and propagates: an emptied choice-box is removed
    /// and fails its own parent in turn.
    pub(crate) fn fail(&mut self, ab: AndBoxId) {
        if self.tree.is_dead_and(ab) {
            return;
        }
        debug!("fail {:?}", ab);
        self.tree.kill_and_box(ab);

        let chb = match self.tree[ab].father {
            Some(chb) => chb,
            None => return,
        };
        self.tree.remove_alternative(chb, ab);

        match self.tree[chb].tried {
            None => {
                self.tree[chb].status = Status::Dead;
                match self.tree[chb].father {
                    None => {
                        // The root choice-box emptied: no more answers.
                        debug!("root choice-box exhausted");
                    }
                    Some(parent) => {
                        self.tree.remove_child(parent, chb);
                        self.fail(parent);
                    }
                }
            }
            Some(first) => {
                // The new leftmost alternative may now be committable.
                self.tasks.push_back(Task::Promote(first));
            }
        }
    }

    /// Depth-first, left-to-right scan for the leftmost split candidate:
    /// a solved wait-class alternative of a nondeterminate choice-box whose
    /// mother is stable.
    pub(crate) fn find_split_candidate(&mut self) -> Option<AndBoxId> {
        let root = self.root;
        self.scan_choice_box(root)
    }

    pub(crate) fn scan_choice_box(&mut self, cb: ChoiceBoxId) -> Option<AndBoxId> {
        for ab in self.tree.alternatives(cb) {
            if self.tree.is_dead_and(ab) {
                continue;
            }
            if self.tree.is_solved(ab) {
                if self.is_split_candidate(ab, cb) {
                    return Some(ab);
                }
            } else {
                for child in self.tree.children(ab) {
                    if let Some(found) = self.scan_choice_box(child) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    fn is_split_candidate(&mut self, ab: AndBoxId, cb: ChoiceBoxId) -> bool {
        if !self.tree[ab].guard_kind.is_wait() {
            return false;
        }
        if self.tree.is_determinate(cb) {
            return false;
        }
        let m = match self.tree[cb].father {
            Some(m) => m,
            // Root alternatives are recorded, never split.
            None => return false,
        };
        match self.mother_stability(m) {
            Ok(()) => true,
            Err(blocking) => {
                // The mother waits on outside information; retry the
                // choice-box when that cell is bound.
                self.suspend_choice_on(cb, blocking);
                false
            }
        }
    }

    /// A mother is stable when nothing in its subtree waits on a variable
    /// external to it.
    fn mother_stability(&self, m: AndBoxId) -> Result<(), VarId> {
        let mut stack = vec![m];
        while let Some(ab) = stack.pop() {
            if self.tree.is_dead_and(ab) {
                continue;
            }
            for &v in &self.tree[ab].suspended_on {
                if !self.heap.is_bound(v) && !self.is_local(v, m) {
                    return Err(v);
                }
            }
            for cb in self.tree.children(ab) {
                stack.extend(self.tree.alternatives(cb));
            }
        }
        Ok(())
    }

    /// Splitting: copy the mother, commit the candidate in the copy, and
    /// leave the remaining alternatives to the original.
    pub(crate) fn split(&mut self, c: AndBoxId) {
        let f = self.tree[c].father.expect("candidate has a choice-box");
        let m = self.tree[f].father.expect("candidate below the root");
        info!("split: candidate {:?} under {:?} in mother {:?}", c, f, m);

        let outcome = crate::copy::copy_subtree(&mut self.heap, &mut self.tree, m);
        let m_copy = outcome.root;
        let f_copy = outcome.choice_map[&f];
        let c_copy = outcome.and_map[&c];

        // Keep only the candidate's copy in the copied choice-box.
        for alt in self.tree.alternatives(f_copy) {
            if alt != c_copy {
                self.tree.remove_alternative(f_copy, alt);
                self.tree.kill_and_box(alt);
            }
        }

        // The copy goes immediately to the left of the mother.
        let parent_chb = self.tree[m].father.expect("mother is an alternative");
        self.insert_before(parent_chb, m_copy, m);

        // The original loses the candidate.
        self.tree.remove_alternative(f, c);
        self.tree.kill_and_box(c);

        // Commit the copy first so leftmost answers come out first.
        self.tasks.push_back(Task::Promote(c_copy));

        if self.tree.is_determinate(f) {
            let rest = self.tree[f].tried.expect("determinate choice-box");
            self.tasks.push_back(Task::Promote(rest));
        } else {
            self.tasks.push_back(Task::Split(m));
        }
    }

    fn insert_before(&mut self, chb: ChoiceBoxId, new: AndBoxId, before: AndBoxId) {
        let prev = self.tree[before].prev;
        self.tree[new].father = Some(chb);
        self.tree[new].prev = prev;
        self.tree[new].next = Some(before);
        self.tree[before].prev = Some(new);
        match prev {
            Some(p) => self.tree[p].next = Some(new),
            None => self.tree[chb].tried = Some(new),
        }
    }

    /// Evaluates a goal in a detached sub-computation over a copy of its
    /// current bindings; used by negation as failure.
    pub(crate) fn detached_has_solution(&mut self, goal: &Term) -> bool {
        let mut sub = crate::reflect::detach(self, goal);
        sub.next_solution().is_some()
    }

    /// Counts every solution of a detached sub-computation.
    pub(crate) fn detached_count(&mut self, goal: &Term) -> usize {
        let mut sub = crate::reflect::detach(self, goal);
        sub.all_solutions().len()
    }

    /// Builds the `solution(Bindings)` message a reflection emits.
    pub(crate) fn solution_message(&mut self, ab: AndBoxId, solution: &Solution) -> Term {
        let pairs = solution
            .bindings
            .iter()
            .map(|(name, value)| {
                let imported = crate::reflect::import_term(self, ab, value);
                Term::compound(Atom::new("="), vec![Term::atom(name), imported])
            })
            .collect::<Vec<_>>();
        Term::compound(Atom::new("solution"), vec![make_list(pairs, Term::nil())])
    }
}
