//! Interned atom symbols.
//!
//! Atoms are interned in a process-global, append-only table: equal names
//! imply identical symbols, so atom comparison is a word comparison.

use lalrpop_intern::{intern, InternedString};
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Atom(InternedString);

impl Atom {
    pub fn new(name: &str) -> Atom {
        Atom(intern(name))
    }

    /// The empty list atom `[]`.
    pub fn nil() -> Atom {
        Atom::new("[]")
    }

    pub fn interned(self) -> InternedString {
        self.0
    }

    pub fn text(self) -> String {
        self.0.to_string()
    }
}

impl From<InternedString> for Atom {
    fn from(s: InternedString) -> Atom {
        Atom(s)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}
