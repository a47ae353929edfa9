//! The worker: owns the heap, the execution tree, the trail and the
//! scheduling queues, and drives the cooperative rewriting loop.
//!
//! Each iteration serves, in priority order: the wake queue (an and-box
//! whose suspension fired), the recall queue (a choice-box that gained new
//! information), the task queue (START / PROMOTE / SPLIT), and finally a
//! scan for a split candidate. When none of these yields work the tree is
//! in normal form and the worker halts.

use crate::builtin::BuiltinTable;
use crate::error::AklError;
use crate::program::{GuardKind, Program};
use crate::reflect::Reflection;
use crate::trail::Trail;
use crate::tree::{AndBoxId, ChoiceBoxId, Status, Task, Tree, WakeTarget};
use crate::unify::Unifier;
use akl_ir::{EnvId, Heap, Identifier, ReflectionId, Term, VarId};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

/// One answer: the named query variables with their resolved bindings.
#[derive(Clone, Debug)]
pub struct Solution {
    pub bindings: Vec<(String, Term)>,
}

pub struct Machine {
    pub heap: Heap,
    pub tree: Tree,
    pub trail: Trail,
    pub program: Arc<Program>,
    pub(crate) tasks: VecDeque<Task>,
    pub(crate) wake: VecDeque<AndBoxId>,
    pub(crate) recall: VecDeque<ChoiceBoxId>,
    pub(crate) root: ChoiceBoxId,
    pub(crate) root_alt: AndBoxId,
    pub(crate) solutions: VecDeque<Solution>,
    pub(crate) builtins: Arc<BuiltinTable>,
    pub(crate) reflections: Vec<Reflection>,
    pub(crate) halted: Option<i32>,
}

impl Machine {
    pub fn new(program: Arc<Program>) -> Machine {
        let mut heap = Heap::new();
        let mut tree = Tree::new();

        let root = tree.new_choice_box(GuardKind::Wait);
        let env = heap.new_env(Some(heap.root_env()));
        let root_alt = tree.new_and_box(env, GuardKind::None);
        tree.add_alternative(root, root_alt);
        // The top-level goal has no head phase.
        tree[root_alt].in_guard = true;

        Machine {
            heap,
            tree,
            trail: Trail::new(),
            program,
            tasks: VecDeque::new(),
            wake: VecDeque::new(),
            recall: VecDeque::new(),
            root,
            root_alt,
            solutions: VecDeque::new(),
            builtins: Arc::new(BuiltinTable::standard()),
            reflections: Vec::new(),
            halted: None,
        }
    }

    /// Builds a machine for a goal given in source syntax. The goal's
    /// variables live in the root alternative's environment, so they are
    /// local to the whole computation.
    pub fn from_source(program: Arc<Program>, goal: &str) -> Result<Machine, AklError> {
        let mut machine = Machine::new(program);
        let env = machine.goal_env();
        let (term, vars) = akl_parse::parse_term_with_vars(&mut machine.heap, env, goal)?;
        machine.set_goal(term, vars);
        Ok(machine)
    }

    /// Environment of the root alternative; goal terms belong here.
    pub fn goal_env(&self) -> EnvId {
        self.tree[self.root_alt].env
    }

    /// Installs the goal and queues the initial START task.
    pub fn set_goal(&mut self, goal: Term, query_vars: Vec<(String, VarId)>) {
        let alt = self.root_alt;
        let mut vars = Vec::new();
        collect_goal_vars(&goal, &mut vars);
        self.tree[alt].vars = vars;
        self.tree[alt].goals.push_back(goal);
        self.tree[alt].query_vars = query_vars;
        self.tasks.push_back(Task::Start(alt));
        info!("goal installed, {} query vars", self.tree[alt].query_vars.len());
    }

    /// Runs the rewriting loop until the next solution, or until the tree
    /// reaches a normal form with no solution to offer.
    pub fn next_solution(&mut self) -> Option<Solution> {
        loop {
            if let Some(solution) = self.solutions.pop_front() {
                return Some(solution);
            }
            if self.halted.is_some() {
                return None;
            }
            if !self.step() {
                return self.solutions.pop_front();
            }
        }
    }

    /// Enumerates every remaining solution.
    pub fn all_solutions(&mut self) -> Vec<Solution> {
        let mut out = Vec::new();
        while let Some(s) = self.next_solution() {
            out.push(s);
        }
        out
    }

    pub fn halted(&self) -> Option<i32> {
        self.halted
    }

    /// One scheduling event. Returns false at normal form.
    pub(crate) fn step(&mut self) -> bool {
        self.close_dead_ports();

        if let Some(ab) = self.wake.pop_front() {
            if !self.tree.is_dead_and(ab) {
                debug!("wake {:?}", ab);
                self.resume(ab);
            }
            return true;
        }

        if let Some(cb) = self.recall.pop_front() {
            if !self.tree.is_dead_choice(cb) {
                debug!("recall {:?}", cb);
                self.recall_choice(cb);
            }
            return true;
        }

        if let Some(task) = self.tasks.pop_front() {
            debug!("task {:?}", task);
            self.run_task(task);
            return true;
        }

        if let Some(candidate) = self.find_split_candidate() {
            info!("split candidate {:?}", candidate);
            self.split(candidate);
            return true;
        }

        false
    }

    /// Ports whose last handle dropped get their stream closed with `[]`.
    fn close_dead_ports(&mut self) {
        for id in self.heap.take_dead_ports() {
            if self.heap.port(id).closed {
                continue;
            }
            self.heap.port_mut(id).closed = true;
            let tail = self.heap.port(id).tail;
            if !self.heap.is_bound(tail) {
                debug!("closing stream of dead port {:?}", id);
                self.unifier().bind(tail, Term::nil());
            }
        }
    }

    pub(crate) fn unifier(&mut self) -> Unifier<'_> {
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

    /// Is the variable local to the and-box (owning env inside the box's
    /// env subtree)?
    pub(crate) fn is_local(&self, var: VarId, ab: AndBoxId) -> bool {
        self.heap
            .env_is_ancestor(self.tree[ab].env, self.heap.var(var).env)
    }

    /// Allocates a fresh variable in the and-box's environment and indexes
    /// it there, so promotion re-homes it.
    pub(crate) fn new_local_var(&mut self, ab: AndBoxId, name: Option<Identifier>) -> VarId {
        let env = self.tree[ab].env;
        let v = self.heap.new_var(name, env);
        self.tree[ab].vars.push(v);
        v
    }

    /// Registers a suspension of `ab` on `var` and marks the box unstable.
    pub(crate) fn suspend_on(&mut self, ab: AndBoxId, var: VarId) {
        let head = self.heap.var(var).wake;
        let node = self.tree.new_suspension(WakeTarget::AndBox(ab), head);
        self.heap.var_mut(var).wake = Some(node);
        self.tree[ab].suspended_on.push(var);
        if self.tree[ab].status != Status::Dead {
            self.tree[ab].status = Status::Unstable;
        }
    }

    pub(crate) fn suspend_choice_on(&mut self, cb: ChoiceBoxId, var: VarId) {
        let head = self.heap.var(var).wake;
        let node = self.tree.new_suspension(WakeTarget::ChoiceBox(cb), head);
        self.heap.var_mut(var).wake = Some(node);
    }

    pub(crate) fn new_reflection(&mut self, reflection: Reflection) -> ReflectionId {
        let id = ReflectionId::from_usize(self.reflections.len());
        self.reflections.push(reflection);
        id
    }
}

fn collect_goal_vars(term: &Term, out: &mut Vec<VarId>) {
    match term {
        Term::Var(v) => {
            if !out.contains(v) {
                out.push(*v);
            }
        }
        Term::Compound(c) => {
            for arg in c.args.iter() {
                collect_goal_vars(arg, out);
            }
        }
        Term::Cons(cell) => {
            collect_goal_vars(&cell.head, out);
            collect_goal_vars(&cell.tail, out);
        }
        _ => {}
    }
}
