//! The clause database.
//!
//! Clauses are compiled from parsed terms into head / guard / guard kind /
//! body, with conjunctions flattened. The database is loaded before
//! execution and read-only during it; `consult/1` appends between solves
//! under the same append-only discipline.

use crate::error::AklError;
use akl_ir::{Atom, Heap, Term, VarId};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::Path;
use tracing::debug;

/// The six guard kinds, with their two orthogonal properties.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GuardKind {
    /// `H :- B`
    None,
    /// `H :- G ? B`
    Wait,
    /// `H :- G ?? B`
    QuietWait,
    /// `H :- G -> B`
    Arrow,
    /// `H :- G | B`
    Commit,
    /// `H :- G ! B`
    Cut,
}

impl GuardKind {
    pub fn from_operator(name: &str) -> Option<GuardKind> {
        match name {
            "?" => Some(GuardKind::Wait),
            "??" => Some(GuardKind::QuietWait),
            "->" => Some(GuardKind::Arrow),
            "|" => Some(GuardKind::Commit),
            "!" => Some(GuardKind::Cut),
            _ => None,
        }
    }

    /// Quiet kinds may not constrain external variables in their guard.
    pub fn is_quiet(self) -> bool {
        matches!(self, GuardKind::QuietWait | GuardKind::Arrow | GuardKind::Commit)
    }

    /// Pruning kinds kill sibling alternatives on commit.
    pub fn is_pruning(self) -> bool {
        matches!(self, GuardKind::Arrow | GuardKind::Commit | GuardKind::Cut)
    }

    /// Wait-class alternatives (`?` or no guard) are the ones splitting
    /// may commit to nondeterministically.
    pub fn is_wait(self) -> bool {
        matches!(self, GuardKind::None | GuardKind::Wait)
    }
}

/// A preprocessed clause. The stored terms are templates: their variables
/// are never bound, and instantiation substitutes each one with a fresh
/// cell in the callee environment.
#[derive(Clone, Debug)]
pub struct Clause {
    pub head: Term,
    pub guard: Vec<Term>,
    pub guard_kind: GuardKind,
    pub body: Vec<Term>,
    /// Every template variable, for the instantiation map.
    pub vars: Vec<VarId>,
}

impl Clause {
    pub fn is_fact(&self) -> bool {
        self.guard.is_empty() && self.body.is_empty()
    }

    pub fn functor(&self) -> (Atom, usize) {
        functor_of(&self.head).expect("clause head was validated at compile time")
    }
}

#[derive(Debug)]
pub struct Predicate {
    pub name: Atom,
    pub arity: usize,
    pub clauses: Vec<Clause>,
}

/// The clause database, together with the heap that owns the clause
/// template variables. Template cells are never bound; instantiation maps
/// them to fresh cells in the calling machine's heap.
#[derive(Default, Debug)]
pub struct Program {
    predicates: FxHashMap<(Atom, usize), Predicate>,
    heap: Heap,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    /// The heap holding clause templates (for variable names).
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn add_clause(&mut self, clause: Clause) {
        let (name, arity) = clause.functor();
        self.predicates
            .entry((name, arity))
            .or_insert_with(|| Predicate {
                name,
                arity,
                clauses: Vec::new(),
            })
            .clauses
            .push(clause);
    }

    pub fn lookup(&self, name: Atom, arity: usize) -> Option<&Predicate> {
        self.predicates.get(&(name, arity))
    }

    pub fn contains(&self, name: Atom, arity: usize) -> bool {
        self.predicates.contains_key(&(name, arity))
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

fn functor_of(head: &Term) -> Option<(Atom, usize)> {
    match head {
        Term::Atom(a) => Some((*a, 0)),
        Term::Compound(c) => Some((c.functor, c.args.len())),
        _ => None,
    }
}

/// Flattens a `,/2` chain into a goal list, textual order.
pub fn flatten_conjunction(term: &Term, out: &mut Vec<Term>) {
    match term {
        Term::Compound(c) if c.functor == Atom::new(",") && c.args.len() == 2 => {
            flatten_conjunction(&c.args[0], out);
            flatten_conjunction(&c.args[1], out);
        }
        _ => out.push(term.clone()),
    }
}

fn collect_vars(term: &Term, seen: &mut FxHashSet<VarId>, out: &mut Vec<VarId>) {
    match term {
        Term::Var(v) => {
            if seen.insert(*v) {
                out.push(*v);
            }
        }
        Term::Compound(c) => {
            for arg in c.args.iter() {
                collect_vars(arg, seen, out);
            }
        }
        Term::Cons(cell) => {
            collect_vars(&cell.head, seen, out);
            collect_vars(&cell.tail, seen, out);
        }
        _ => {}
    }
}

/// Compiles one parsed clause term.
pub fn compile_clause(term: &Term) -> Result<Clause, AklError> {
    let (head, rest) = match term {
        Term::Compound(c) if c.functor == Atom::new(":-") && c.args.len() == 2 => {
            (c.args[0].clone(), Some(c.args[1].clone()))
        }
        _ => (term.clone(), None),
    };

    if functor_of(&head).is_none() {
        return Err(AklError::Consult(format!("invalid clause head: {:?}", head)));
    }

    let (guard, guard_kind, body) = match rest {
        None => (Vec::new(), GuardKind::None, Vec::new()),
        Some(rest) => {
            let guard_split = match &rest {
                Term::Compound(c) if c.args.len() == 2 => {
                    GuardKind::from_operator(&c.functor.text())
                        .map(|kind| (c.args[0].clone(), kind, c.args[1].clone()))
                }
                _ => None,
            };
            match guard_split {
                Some((guard_term, kind, body_term)) => {
                    let mut guard = Vec::new();
                    flatten_conjunction(&guard_term, &mut guard);
                    let mut body = Vec::new();
                    flatten_conjunction(&body_term, &mut body);
                    (guard, kind, body)
                }
                None => {
                    let mut body = Vec::new();
                    flatten_conjunction(&rest, &mut body);
                    (Vec::new(), GuardKind::None, body)
                }
            }
        }
    };

    let mut seen = FxHashSet::default();
    let mut vars = Vec::new();
    collect_vars(&head, &mut seen, &mut vars);
    for goal in guard.iter().chain(body.iter()) {
        collect_vars(goal, &mut seen, &mut vars);
    }

    Ok(Clause {
        head,
        guard,
        guard_kind,
        body,
        vars,
    })
}

/// Loads clauses from source text into the program. Clause templates are
/// allocated in the program heap's root environment, where nothing ever
/// binds them.
pub fn load_string(program: &mut Program, source: &str) -> Result<(), AklError> {
    let env = program.heap.root_env();
    let terms = akl_parse::parse_clauses(&mut program.heap, env, source)?;
    for term in &terms {
        // `:- Goal` directives are accepted and skipped.
        if let Term::Compound(c) = term {
            if c.functor == Atom::new(":-") && c.args.len() == 1 {
                debug!("skipping directive {:?}", term);
                continue;
            }
        }
        program.add_clause(compile_clause(term)?);
    }
    Ok(())
}

pub fn load_file(program: &mut Program, path: impl AsRef<Path>) -> Result<(), AklError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|e| AklError::Consult(format!("{}: {}", path.display(), e)))?;
    load_string(program, &source)
}
