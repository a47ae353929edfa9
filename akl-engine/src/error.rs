//! Engine-level error kinds.
//!
//! Goal-level trouble (arithmetic domain errors, badly typed builtin
//! arguments, unknown predicates) degrades to failure of the offending
//! goal and propagates through the normal failure path. The kinds below
//! are the ones that surface to a caller. Violations of the structural
//! invariants (a DEAD node reached, a rebound cell) abort the worker with
//! a panic and are deliberately not represented here.

use akl_parse::ParseError;

#[derive(Fail, Debug)]
pub enum AklError {
    #[fail(display = "syntax error: {}", _0)]
    Parse(#[cause] ParseError),

    #[fail(display = "consult error: {}", _0)]
    Consult(String),

    #[fail(display = "{}", _0)]
    Io(String),
}

impl From<ParseError> for AklError {
    fn from(err: ParseError) -> AklError {
        AklError::Parse(err)
    }
}

impl From<std::io::Error> for AklError {
    fn from(err: std::io::Error) -> AklError {
        AklError::Io(err.to_string())
    }
}
