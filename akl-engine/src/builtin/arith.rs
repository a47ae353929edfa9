//! Arithmetic evaluation: `is/2` and the numeric comparisons.
//!
//! Evaluation over an unbound variable suspends the and-box on that cell,
//! so producer/consumer programs synchronize on data. Domain errors and
//! badly typed operands on bound arguments degrade to failure.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::{Heap, Term, VarId};
use tracing::debug;

pub fn register(table: &mut BuiltinTable) {
    table.register("is", 2, builtin_is);
    table.register("=:=", 2, |m, ab, a| compare_eval(m, ab, a, |o| o == 0.0));
    table.register("=\\=", 2, |m, ab, a| compare_eval(m, ab, a, |o| o != 0.0));
    table.register("<", 2, |m, ab, a| compare_eval(m, ab, a, |o| o < 0.0));
    table.register(">", 2, |m, ab, a| compare_eval(m, ab, a, |o| o > 0.0));
    table.register("=<", 2, |m, ab, a| compare_eval(m, ab, a, |o| o <= 0.0));
    table.register(">=", 2, |m, ab, a| compare_eval(m, ab, a, |o| o >= 0.0));
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    pub fn into_term(self) -> Term {
        match self {
            Num::Int(n) => Term::Int(n),
            Num::Float(f) => Term::Float(f),
        }
    }
}

pub enum Eval {
    Num(Num),
    /// The expression needs this cell bound.
    Suspend(VarId),
    /// Type error, domain error or division by zero.
    Error,
}

macro_rules! eval_try {
    ($e:expr) => {
        match $e {
            Eval::Num(n) => n,
            other => return other,
        }
    };
}

/// Evaluates a ground arithmetic expression.
pub fn eval(heap: &Heap, term: &Term) -> Eval {
    match heap.deref(term) {
        Term::Var(v) => Eval::Suspend(v),
        Term::Int(n) => Eval::Num(Num::Int(n)),
        Term::Float(f) => Eval::Num(Num::Float(f)),
        Term::Compound(c) => {
            let name = c.functor.text();
            match (name.as_str(), c.args.len()) {
                (_, 1) => {
                    let x = eval_try!(eval(heap, &c.args[0]));
                    eval_unary(&name, x)
                }
                (_, 2) => {
                    let x = eval_try!(eval(heap, &c.args[0]));
                    let y = eval_try!(eval(heap, &c.args[1]));
                    eval_binary(&name, x, y)
                }
                _ => Eval::Error,
            }
        }
        _ => Eval::Error,
    }
}

fn eval_unary(name: &str, x: Num) -> Eval {
    let out = match (name, x) {
        ("-", Num::Int(a)) => Num::Int(-a),
        ("-", Num::Float(a)) => Num::Float(-a),
        ("+", a) => a,
        ("abs", Num::Int(a)) => Num::Int(a.abs()),
        ("abs", Num::Float(a)) => Num::Float(a.abs()),
        ("sign", Num::Int(a)) => Num::Int(a.signum()),
        ("sign", Num::Float(a)) => Num::Float(if a > 0.0 {
            1.0
        } else if a < 0.0 {
            -1.0
        } else {
            0.0
        }),
        ("\\", Num::Int(a)) => Num::Int(!a),
        ("sqrt", a) => Num::Float(a.as_f64().sqrt()),
        ("sin", a) => Num::Float(a.as_f64().sin()),
        ("cos", a) => Num::Float(a.as_f64().cos()),
        ("float", a) => Num::Float(a.as_f64()),
        ("integer", Num::Int(a)) => Num::Int(a),
        ("integer", Num::Float(a)) => Num::Int(a as i64),
        ("truncate", Num::Int(a)) => Num::Int(a),
        ("truncate", Num::Float(a)) => Num::Int(a.trunc() as i64),
        ("round", Num::Int(a)) => Num::Int(a),
        ("round", Num::Float(a)) => Num::Int(a.round() as i64),
        ("ceiling", Num::Int(a)) => Num::Int(a),
        ("ceiling", Num::Float(a)) => Num::Int(a.ceil() as i64),
        ("floor", Num::Int(a)) => Num::Int(a),
        ("floor", Num::Float(a)) => Num::Int(a.floor() as i64),
        _ => return Eval::Error,
    };
    Eval::Num(out)
}

fn eval_binary(name: &str, x: Num, y: Num) -> Eval {
    use self::Num::*;
    let out = match (name, x, y) {
        ("+", Int(a), Int(b)) => match a.checked_add(b) {
            Some(n) => Int(n),
            None => return Eval::Error,
        },
        ("+", a, b) => Float(a.as_f64() + b.as_f64()),
        ("-", Int(a), Int(b)) => match a.checked_sub(b) {
            Some(n) => Int(n),
            None => return Eval::Error,
        },
        ("-", a, b) => Float(a.as_f64() - b.as_f64()),
        ("*", Int(a), Int(b)) => match a.checked_mul(b) {
            Some(n) => Int(n),
            None => return Eval::Error,
        },
        ("*", a, b) => Float(a.as_f64() * b.as_f64()),

        ("/", Int(a), Int(b)) => {
            if b == 0 {
                return Eval::Error;
            }
            if a % b == 0 {
                Int(a / b)
            } else {
                Float(a as f64 / b as f64)
            }
        }
        ("/", a, b) => {
            if b.as_f64() == 0.0 {
                return Eval::Error;
            }
            Float(a.as_f64() / b.as_f64())
        }

        ("//", Int(a), Int(b)) => {
            if b == 0 {
                return Eval::Error;
            }
            Int(a.wrapping_div(b))
        }
        ("mod", Int(a), Int(b)) => {
            if b == 0 {
                return Eval::Error;
            }
            // Floored modulus: the result takes the divisor's sign.
            Int(((a % b) + b) % b)
        }

        ("**", Int(a), Int(b)) if b >= 0 => match a.checked_pow(b as u32) {
            Some(n) => Int(n),
            None => return Eval::Error,
        },
        ("**", a, b) => Float(a.as_f64().powf(b.as_f64())),

        ("min", Int(a), Int(b)) => Int(a.min(b)),
        ("min", a, b) => {
            if a.as_f64() <= b.as_f64() {
                a
            } else {
                b
            }
        }
        ("max", Int(a), Int(b)) => Int(a.max(b)),
        ("max", a, b) => {
            if a.as_f64() >= b.as_f64() {
                a
            } else {
                b
            }
        }

        ("/\\", Int(a), Int(b)) => Int(a & b),
        ("\\/", Int(a), Int(b)) => Int(a | b),
        ("xor", Int(a), Int(b)) => Int(a ^ b),
        ("<<", Int(a), Int(b)) if (0..64).contains(&b) => Int(a << b),
        (">>", Int(a), Int(b)) if (0..64).contains(&b) => Int(a >> b),

        _ => return Eval::Error,
    };
    Eval::Num(out)
}

fn builtin_is(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    match eval(&machine.heap, &args[1]) {
        Eval::Num(n) => {
            if machine.unify_in(ab, &args[0], &n.into_term()) {
                BuiltinResult::Succeeded
            } else {
                BuiltinResult::Failed
            }
        }
        Eval::Suspend(v) => BuiltinResult::Suspended(v),
        Eval::Error => {
            debug!("arithmetic error in {:?}", args[1]);
            BuiltinResult::Failed
        }
    }
}

fn compare_eval(
    machine: &mut Machine,
    _: AndBoxId,
    args: &[Term],
    accept: fn(f64) -> bool,
) -> BuiltinResult {
    let x = match eval(&machine.heap, &args[0]) {
        Eval::Num(n) => n,
        Eval::Suspend(v) => return BuiltinResult::Suspended(v),
        Eval::Error => return BuiltinResult::Failed,
    };
    let y = match eval(&machine.heap, &args[1]) {
        Eval::Num(n) => n,
        Eval::Suspend(v) => return BuiltinResult::Suspended(v),
        Eval::Error => return BuiltinResult::Failed,
    };
    // Mixed comparisons go through f64; exact for every value seen here.
    let delta = match (x, y) {
        (Num::Int(a), Num::Int(b)) => {
            if a < b {
                -1.0
            } else if a > b {
                1.0
            } else {
                0.0
            }
        }
        _ => x.as_f64() - y.as_f64(),
    };
    if accept(delta) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}
