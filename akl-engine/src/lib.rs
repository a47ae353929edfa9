//! The AKL execution engine.
//!
//! Execution is tree rewriting, not SLD resolution with backtracking: a
//! tree of alternating and-boxes (conjunctions) and choice-boxes (clause
//! alternatives) is rewritten by goal expansion, guard commitment,
//! promotion of solved guards, and splitting (subtree copy) for true
//! nondeterminism. Bindings of variables external to an and-box are
//! deferred onto the box and discharged at promotion, which is what gives
//! the quiet/noisy guard discipline its meaning.

#[macro_use]
extern crate failure;

pub mod builtin;
pub mod copy;
pub mod error;
pub mod machine;
pub mod program;
pub mod reflect;
pub mod trail;
pub mod tree;
pub mod unify;

mod logic;

#[cfg(test)]
mod tests;

pub use crate::error::AklError;
pub use crate::machine::{Machine, Solution};
pub use crate::program::{load_file, load_string, GuardKind, Program};
