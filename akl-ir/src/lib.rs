//! Term representation for the AKL execution engine.
//!
//! This crate is the bottom layer of the engine: the term algebra, the heap
//! of variable cells, the environment tree used for the local/external
//! variable discipline, the operator table, the standard order of terms and
//! the term printer. It knows nothing about and-boxes or scheduling; the
//! execution tree lives in `akl-engine`.

use lalrpop_intern::InternedString;
use std::fmt;
use std::sync::{Arc, Mutex};

#[macro_use]
mod macros;

pub mod interner;
pub mod ops;
pub mod order;
pub mod write;

pub use crate::interner::Atom;

/// Display names for variables and atoms are interned strings.
pub type Identifier = InternedString;

index_struct!(VarId);
index_struct!(EnvId);
index_struct!(SuspensionId);
index_struct!(PortId);
index_struct!(ReflectionId);

/// An AKL term. Terms are cheap to clone: compound arguments and cons cells
/// sit behind `Arc`, atoms are interned, and variables are indices into the
/// [`Heap`].
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// A logic variable, identified by cell identity (never by name).
    Var(VarId),
    Atom(Atom),
    Int(i64),
    Float(f64),
    Compound(Compound),
    Cons(Arc<ConsCell>),
    /// A finalizable multi-sender channel. The handle participates in
    /// reference counting: when the last handle drops, the port id lands on
    /// the heap's graveyard and the engine closes the stream.
    Port(PortRef),
    /// A handle to a paused sub-computation, resolved by the engine.
    Reflection(ReflectionId),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compound {
    pub functor: Atom,
    pub args: Arc<[Term]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConsCell {
    pub head: Term,
    pub tail: Term,
}

impl Term {
    pub fn atom(name: &str) -> Term {
        Term::Atom(Atom::new(name))
    }

    /// The empty list, the distinguished atom `[]`.
    pub fn nil() -> Term {
        Term::Atom(Atom::nil())
    }

    pub fn compound(functor: Atom, args: Vec<Term>) -> Term {
        Term::Compound(Compound {
            functor,
            args: args.into(),
        })
    }

    pub fn cons(head: Term, tail: Term) -> Term {
        Term::Cons(Arc::new(ConsCell { head, tail }))
    }

    pub fn is_nil(&self) -> bool {
        match self {
            Term::Atom(a) => *a == Atom::nil(),
            _ => false,
        }
    }

    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Term::Var(v) => Some(*v),
            _ => None,
        }
    }
}

/// Builds a list term from `elements`, ending in `tail`.
pub fn make_list<I>(elements: I, tail: Term) -> Term
where
    I: IntoIterator<Item = Term>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut result = tail;
    for elem in elements.into_iter().rev() {
        result = Term::cons(elem, result);
    }
    result
}

/// Collects a proper list into a vector, or `None` if the term is not a
/// proper list under the current bindings.
pub fn list_to_vec(heap: &Heap, term: &Term) -> Option<Vec<Term>> {
    let mut out = Vec::new();
    let mut current = heap.deref(term);
    loop {
        match current {
            Term::Cons(cell) => {
                out.push(heap.deref(&cell.head));
                current = heap.deref(&cell.tail);
            }
            ref t if t.is_nil() => return Some(out),
            _ => return None,
        }
    }
}

/// One variable cell. The binding slot is written exactly once per trail
/// entry; `wake` heads an intrusive list of suspension nodes owned by the
/// engine.
#[derive(Clone, Debug)]
pub struct VarCell {
    pub name: Option<Identifier>,
    pub env: EnvId,
    pub binding: Option<Term>,
    pub wake: Option<SuspensionId>,
}

#[derive(Clone, Debug)]
struct EnvNode {
    parent: Option<EnvId>,
}

/// Port state survives the handles; the stream tail advances on every send.
#[derive(Clone, Debug)]
pub struct PortState {
    pub tail: VarId,
    pub closed: bool,
}

type Graveyard = Arc<Mutex<Vec<PortId>>>;

/// A reference-counted handle to a port. Dropping the last handle records
/// the port on the heap's graveyard; the engine drains the graveyard and
/// terminates the stream with `[]`.
#[derive(Clone, Debug)]
pub struct PortRef(Arc<PortCell>);

#[derive(Debug)]
struct PortCell {
    id: PortId,
    graveyard: Graveyard,
}

impl PortRef {
    pub fn id(&self) -> PortId {
        self.0.id
    }
}

impl PartialEq for PortRef {
    fn eq(&self, other: &PortRef) -> bool {
        self.0.id == other.0.id
    }
}

impl Drop for PortCell {
    fn drop(&mut self) {
        if let Ok(mut dead) = self.graveyard.lock() {
            dead.push(self.id);
        }
    }
}

/// Arena of variable cells and environment nodes.
///
/// Environments form a tree; a variable is *local* to an environment `e` if
/// its own environment is `e` or a descendant of `e`, and *external*
/// otherwise. Cells never move to a non-ancestor environment; promotion
/// re-homes them one level up.
pub struct Heap {
    vars: Vec<VarCell>,
    envs: Vec<EnvNode>,
    ports: Vec<PortState>,
    graveyard: Graveyard,
    root_env: EnvId,
}

impl Heap {
    pub fn new() -> Heap {
        let mut heap = Heap {
            vars: Vec::new(),
            envs: Vec::new(),
            ports: Vec::new(),
            graveyard: Arc::new(Mutex::new(Vec::new())),
            root_env: EnvId::from_usize(0),
        };
        heap.root_env = heap.new_env(None);
        heap
    }

    /// The environment at the top of the tree; clause templates and query
    /// variables live here until instantiation gives them a home.
    pub fn root_env(&self) -> EnvId {
        self.root_env
    }

    pub fn new_env(&mut self, parent: Option<EnvId>) -> EnvId {
        let id = EnvId::from_usize(self.envs.len());
        self.envs.push(EnvNode { parent });
        id
    }

    pub fn env_parent(&self, env: EnvId) -> Option<EnvId> {
        self.envs[env.as_usize()].parent
    }

    /// True iff `ancestor` is `env` or a proper ancestor of `env`.
    pub fn env_is_ancestor(&self, ancestor: EnvId, env: EnvId) -> bool {
        let mut current = Some(env);
        while let Some(e) = current {
            if e == ancestor {
                return true;
            }
            current = self.envs[e.as_usize()].parent;
        }
        false
    }

    pub fn new_var(&mut self, name: Option<Identifier>, env: EnvId) -> VarId {
        let id = VarId::from_usize(self.vars.len());
        self.vars.push(VarCell {
            name,
            env,
            binding: None,
            wake: None,
        });
        id
    }

    pub fn var(&self, v: VarId) -> &VarCell {
        &self.vars[v.as_usize()]
    }

    pub fn var_mut(&mut self, v: VarId) -> &mut VarCell {
        &mut self.vars[v.as_usize()]
    }

    pub fn is_bound(&self, v: VarId) -> bool {
        self.vars[v.as_usize()].binding.is_some()
    }

    /// Writes the binding slot. Callers are responsible for trailing; a
    /// bound cell is never rebound without a matching trail entry.
    pub fn bind(&mut self, v: VarId, term: Term) {
        let cell = &mut self.vars[v.as_usize()];
        debug_assert!(cell.binding.is_none(), "rebinding bound cell {:?}", v);
        cell.binding = Some(term);
    }

    pub fn set_binding(&mut self, v: VarId, binding: Option<Term>) {
        self.vars[v.as_usize()].binding = binding;
    }

    /// Re-homes a cell. Only used by promotion, which may only move a cell
    /// to an ancestor of its current environment.
    pub fn set_env(&mut self, v: VarId, env: EnvId) {
        self.vars[v.as_usize()].env = env;
    }

    /// Follows the binding chain of `term`. Walks chains of variables, not
    /// term structure, so `deref(deref(t)) = deref(t)`.
    pub fn deref(&self, term: &Term) -> Term {
        let mut current = term.clone();
        while let Term::Var(v) = current {
            match &self.vars[v.as_usize()].binding {
                Some(bound) => current = bound.clone(),
                None => return Term::Var(v),
            }
        }
        current
    }

    /// Deep snapshot of `term` with every bound variable substituted by its
    /// value. Used for recording solutions.
    pub fn resolve(&self, term: &Term) -> Term {
        match self.deref(term) {
            Term::Compound(c) => Term::Compound(Compound {
                functor: c.functor,
                args: c.args.iter().map(|a| self.resolve(a)).collect(),
            }),
            Term::Cons(cell) => Term::cons(self.resolve(&cell.head), self.resolve(&cell.tail)),
            other => other,
        }
    }

    pub fn new_port(&mut self, env: EnvId) -> (PortRef, VarId) {
        let tail = self.new_var(None, env);
        let id = PortId::from_usize(self.ports.len());
        self.ports.push(PortState {
            tail,
            closed: false,
        });
        let handle = PortRef(Arc::new(PortCell {
            id,
            graveyard: self.graveyard.clone(),
        }));
        (handle, tail)
    }

    pub fn port(&self, id: PortId) -> &PortState {
        &self.ports[id.as_usize()]
    }

    pub fn port_mut(&mut self, id: PortId) -> &mut PortState {
        &mut self.ports[id.as_usize()]
    }

    /// Drains the graveyard of ports whose last handle has dropped.
    pub fn take_dead_ports(&mut self) -> Vec<PortId> {
        let mut dead = self.graveyard.lock().unwrap_or_else(|e| e.into_inner());
        dead.drain(..).collect()
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Heap")
            .field("vars", &self.vars.len())
            .field("envs", &self.envs.len())
            .field("ports", &self.ports.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deref_is_idempotent() {
        let mut heap = Heap::new();
        let env = heap.root_env();
        let x = heap.new_var(None, env);
        let y = heap.new_var(None, env);
        heap.bind(x, Term::Var(y));
        heap.bind(y, Term::Int(7));

        let once = heap.deref(&Term::Var(x));
        let twice = heap.deref(&once);
        assert_eq!(once, twice);
        assert_eq!(once, Term::Int(7));
    }

    #[test]
    fn env_ancestry() {
        let mut heap = Heap::new();
        let e1 = heap.root_env();
        let e2 = heap.new_env(Some(e1));
        let e3 = heap.new_env(Some(e2));

        assert!(heap.env_is_ancestor(e1, e1));
        assert!(heap.env_is_ancestor(e1, e3));
        assert!(heap.env_is_ancestor(e2, e3));
        assert!(!heap.env_is_ancestor(e3, e1));
        assert!(!heap.env_is_ancestor(e2, e1));
    }

    #[test]
    fn dead_port_reaches_graveyard() {
        let mut heap = Heap::new();
        let env = heap.root_env();
        let (port, _tail) = heap.new_port(env);
        let id = port.id();
        assert!(heap.take_dead_ports().is_empty());
        drop(port);
        assert_eq!(heap.take_dead_ports(), vec![id]);
    }

    #[test]
    fn resolve_substitutes_bindings() {
        let mut heap = Heap::new();
        let env = heap.root_env();
        let x = heap.new_var(None, env);
        heap.bind(x, Term::atom("a"));
        let t = Term::compound(Atom::new("f"), vec![Term::Var(x), Term::Int(1)]);
        let resolved = heap.resolve(&t);
        assert_eq!(
            resolved,
            Term::compound(Atom::new("f"), vec![Term::atom("a"), Term::Int(1)])
        );
    }
}
