//! The execution tree: and-boxes and choice-boxes.
//!
//! Two alternating node kinds form the tree. An and-box is a conjunctive
//! frame: a goal queue, a local environment, a deferred-unifier list and a
//! chain of child choice-boxes. A choice-box is a disjunctive frame holding
//! the alternative and-boxes for one call. Nodes live in arenas and refer
//! to each other by id; sibling order is a doubly linked list, leftmost
//! first.

use crate::program::GuardKind;
use akl_ir::{index_struct, EnvId, SuspensionId, Term, VarId};
use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

index_struct!(AndBoxId);
index_struct!(ChoiceBoxId);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Stable,
    Unstable,
    /// Terminal. A dead node is unreachable for scheduling.
    Dead,
}

/// A deferred binding of an external variable. `noisy` records whether the
/// pair was produced while the and-box was evaluating its guard (as opposed
/// to head unification); only noisy pairs block a quiet commit.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub var: VarId,
    pub value: Term,
    pub noisy: bool,
}

#[derive(Debug)]
pub struct AndBox {
    pub status: Status,
    pub env: EnvId,
    pub guard_kind: GuardKind,
    /// Pending goals, leftmost first.
    pub goals: VecDeque<Term>,
    /// Goals suspended on an unbound cell, parked so the rest of the
    /// conjunction keeps running; re-queued on wake.
    pub parked: Vec<Term>,
    /// Head unifications to discharge before the guard runs.
    pub head: Vec<(Term, Term)>,
    /// Deferred unifier list: bindings of external variables promised for
    /// promotion time.
    pub constraints: Vec<Constraint>,
    /// Clause body, added to the parent's goal queue on promotion.
    pub body: VecDeque<Term>,
    /// False until head unification has been discharged.
    pub in_guard: bool,
    /// First child choice-box; siblings chain through `ChoiceBox::next`.
    pub tried: Option<ChoiceBoxId>,
    pub father: Option<ChoiceBoxId>,
    pub next: Option<AndBoxId>,
    pub prev: Option<AndBoxId>,
    /// Local variable index: cells allocated in this box, for re-homing.
    pub vars: Vec<VarId>,
    /// Variables this box is suspended on (deferred pairs and suspending
    /// builtins alike).
    pub suspended_on: Vec<VarId>,
    /// Only on alternatives of the root choice-box: the named query
    /// variables whose bindings a solution reports.
    pub query_vars: Vec<(String, VarId)>,
}

#[derive(Debug)]
pub struct ChoiceBox {
    pub status: Status,
    /// Guard kind of the matched predicate (first clause), kept for
    /// diagnostics; commit decisions use the per-alternative kind.
    pub guard_kind: GuardKind,
    /// First alternative and-box.
    pub tried: Option<AndBoxId>,
    pub father: Option<AndBoxId>,
    pub next: Option<ChoiceBoxId>,
    pub prev: Option<ChoiceBoxId>,
}

/// A back-pointer from a variable cell to a node that must be re-scheduled
/// when the cell is bound. Nodes form intrusive lists headed in the cell.
#[derive(Copy, Clone, Debug)]
pub struct SuspensionNode {
    pub target: WakeTarget,
    pub next: Option<SuspensionId>,
}

#[derive(Copy, Clone, Debug)]
pub enum WakeTarget {
    AndBox(AndBoxId),
    ChoiceBox(ChoiceBoxId),
}

/// Scheduling events beyond the wake and recall queues.
#[derive(Copy, Clone, Debug)]
pub enum Task {
    /// Discharge head unification and start the guard of a fresh
    /// alternative.
    Start(AndBoxId),
    /// Re-test the commit rule of a solved alternative and promote it if
    /// the rule holds.
    Promote(AndBoxId),
    /// Look for a split candidate below this and-box.
    Split(AndBoxId),
}

#[derive(Default, Debug)]
pub struct Tree {
    and_boxes: Vec<AndBox>,
    choice_boxes: Vec<ChoiceBox>,
    suspensions: Vec<SuspensionNode>,
}

impl Index<AndBoxId> for Tree {
    type Output = AndBox;
    fn index(&self, id: AndBoxId) -> &AndBox {
        &self.and_boxes[id.as_usize()]
    }
}

impl IndexMut<AndBoxId> for Tree {
    fn index_mut(&mut self, id: AndBoxId) -> &mut AndBox {
        &mut self.and_boxes[id.as_usize()]
    }
}

impl Index<ChoiceBoxId> for Tree {
    type Output = ChoiceBox;
    fn index(&self, id: ChoiceBoxId) -> &ChoiceBox {
        &self.choice_boxes[id.as_usize()]
    }
}

impl IndexMut<ChoiceBoxId> for Tree {
    fn index_mut(&mut self, id: ChoiceBoxId) -> &mut ChoiceBox {
        &mut self.choice_boxes[id.as_usize()]
    }
}

impl Tree {
    pub fn new() -> Tree {
        Tree::default()
    }

    pub fn new_and_box(&mut self, env: EnvId, guard_kind: GuardKind) -> AndBoxId {
        let id = AndBoxId::from_usize(self.and_boxes.len());
        self.and_boxes.push(AndBox {
            status: Status::Stable,
            env,
            guard_kind,
            goals: VecDeque::new(),
            parked: Vec::new(),
            head: Vec::new(),
            constraints: Vec::new(),
            body: VecDeque::new(),
            in_guard: false,
            tried: None,
            father: None,
            next: None,
            prev: None,
            vars: Vec::new(),
            suspended_on: Vec::new(),
            query_vars: Vec::new(),
        });
        id
    }

    pub fn new_choice_box(&mut self, guard_kind: GuardKind) -> ChoiceBoxId {
        let id = ChoiceBoxId::from_usize(self.choice_boxes.len());
        self.choice_boxes.push(ChoiceBox {
            status: Status::Stable,
            guard_kind,
            tried: None,
            father: None,
            next: None,
            prev: None,
        });
        id
    }

    pub fn new_suspension(&mut self, target: WakeTarget, next: Option<SuspensionId>) -> SuspensionId {
        let id = SuspensionId::from_usize(self.suspensions.len());
        self.suspensions.push(SuspensionNode { target, next });
        id
    }

    pub fn suspension(&self, id: SuspensionId) -> SuspensionNode {
        self.suspensions[id.as_usize()]
    }

    /// Appends an alternative at the right end of a choice-box.
    pub fn add_alternative(&mut self, chb: ChoiceBoxId, andb: AndBoxId) {
        self[andb].father = Some(chb);
        self[andb].next = None;
        match self[chb].tried {
            None => {
                self[andb].prev = None;
                self[chb].tried = Some(andb);
            }
            Some(first) => {
                let mut last = first;
                while let Some(next) = self[last].next {
                    last = next;
                }
                self[last].next = Some(andb);
                self[andb].prev = Some(last);
            }
        }
    }

    /// Unlinks an alternative from its choice-box. The and-box keeps its
    /// contents; callers decide whether it is dead or promoted.
    pub fn remove_alternative(&mut self, chb: ChoiceBoxId, andb: AndBoxId) {
        let prev = self[andb].prev;
        let next = self[andb].next;
        match prev {
            Some(p) => self[p].next = next,
            None => self[chb].tried = next,
        }
        if let Some(n) = next {
            self[n].prev = prev;
        }
        self[andb].father = None;
        self[andb].prev = None;
        self[andb].next = None;
    }

    /// Appends a child choice-box at the right end of an and-box's chain.
    /// Creation order is goal order, which the split scan relies on.
    pub fn add_child(&mut self, andb: AndBoxId, chb: ChoiceBoxId) {
        self[chb].father = Some(andb);
        self[chb].next = None;
        match self[andb].tried {
            None => {
                self[chb].prev = None;
                self[andb].tried = Some(chb);
            }
            Some(first) => {
                let mut last = first;
                while let Some(next) = self[last].next {
                    last = next;
                }
                self[last].next = Some(chb);
                self[chb].prev = Some(last);
            }
        }
    }

    pub fn remove_child(&mut self, andb: AndBoxId, chb: ChoiceBoxId) {
        let prev = self[chb].prev;
        let next = self[chb].next;
        match prev {
            Some(p) => self[p].next = next,
            None => self[andb].tried = next,
        }
        if let Some(n) = next {
            self[n].prev = prev;
        }
        self[chb].father = None;
        self[chb].prev = None;
        self[chb].next = None;
    }

    pub fn alternatives(&self, chb: ChoiceBoxId) -> Vec<AndBoxId> {
        let mut out = Vec::new();
        let mut current = self[chb].tried;
        while let Some(ab) = current {
            out.push(ab);
            current = self[ab].next;
        }
        out
    }

    pub fn children(&self, andb: AndBoxId) -> Vec<ChoiceBoxId> {
        let mut out = Vec::new();
        let mut current = self[andb].tried;
        while let Some(cb) = current {
            out.push(cb);
            current = self[cb].next;
        }
        out
    }

    /// Exactly one alternative left.
    pub fn is_determinate(&self, chb: ChoiceBoxId) -> bool {
        match self[chb].tried {
            Some(first) => self[first].next.is_none(),
            None => false,
        }
    }

    /// Goal queue exhausted (nothing parked either), head discharged and
    /// no child choice-boxes.
    pub fn is_solved(&self, andb: AndBoxId) -> bool {
        let ab = &self[andb];
        ab.goals.is_empty() && ab.parked.is_empty() && ab.head.is_empty() && ab.tried.is_none()
    }

    /// No guard-phase deferred bindings pending. Head-phase pairs are
    /// output unifications and do not make a guard noisy.
    pub fn is_quiet(&self, andb: AndBoxId) -> bool {
        self[andb].constraints.iter().all(|c| !c.noisy)
    }

    pub fn is_leftmost(&self, andb: AndBoxId) -> bool {
        self[andb].prev.is_none()
    }

    pub fn is_dead_and(&self, andb: AndBoxId) -> bool {
        self[andb].status == Status::Dead
    }

    pub fn is_dead_choice(&self, chb: ChoiceBoxId) -> bool {
        self[chb].status == Status::Dead
    }

    /// Marks a whole subtree DEAD. DEAD is terminal; the scheduler skips
    /// dead nodes and the queues drop them lazily.
    pub fn kill_and_box(&mut self, andb: AndBoxId) {
        if self[andb].status == Status::Dead {
            return;
        }
        self[andb].status = Status::Dead;
        for chb in self.children(andb) {
            self.kill_choice_box(chb);
        }
    }

    pub fn kill_choice_box(&mut self, chb: ChoiceBoxId) {
        if self[chb].status == Status::Dead {
            return;
        }
        self[chb].status = Status::Dead;
        for ab in self.alternatives(chb) {
            self.kill_and_box(ab);
        }
    }

    pub fn and_box_count(&self) -> usize {
        self.and_boxes.len()
    }
}
