//! Term printer.
//!
//! Converts terms back to AKL surface syntax with operator notation and
//! precedence-driven parenthesization, so that `parse(print(t))` is `t` up
//! to variable identity and float formatting.

use crate::ops::{self, Assoc, ARG_PREC, MAX_PREC};
use crate::{Atom, Heap, Term, VarId};
use itertools::Itertools;

/// True if an atom name requires single quotes in source syntax.
pub fn needs_quoting(name: &str) -> bool {
    if name.is_empty() {
        return true;
    }
    match name {
        "[]" | "{}" | "!" | ";" => return false,
        _ => {}
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if first.is_ascii_lowercase() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }

    // A pure symbol-char sequence stands on its own, unless it would open
    // a comment.
    const SYMBOL_CHARS: &str = "+-*/\\^<>=`~:.?@#$&|";
    if name.chars().all(|c| SYMBOL_CHARS.contains(c)) && !name.starts_with("/*") {
        return false;
    }

    true
}

pub fn quote_atom(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// Prints `term` in AKL syntax, quoting atoms where the reader requires it.
pub fn print_term(heap: &Heap, term: &Term) -> String {
    write_out(heap, term, MAX_PREC, true)
}

/// Prints `term` without atom quoting (the `write/1` convention).
pub fn display_term(heap: &Heap, term: &Term) -> String {
    write_out(heap, term, MAX_PREC, false)
}

fn var_name(heap: &Heap, v: VarId) -> String {
    match heap.var(v).name {
        Some(name) => name.to_string(),
        None => format!("_G{}", v.as_usize()),
    }
}

fn write_atom(name: &str, quoted: bool) -> String {
    if quoted && needs_quoting(name) {
        quote_atom(name)
    } else {
        name.to_string()
    }
}

fn write_out(heap: &Heap, term: &Term, priority: u32, quoted: bool) -> String {
    match heap.deref(term) {
        Term::Var(v) => var_name(heap, v),

        Term::Atom(a) => {
            let name = a.text();
            // An atom that is also an operator of looser priority than the
            // context must be protected.
            if let Some(info) = ops::infix(&name).or_else(|| ops::prefix(&name)) {
                if info.prec > priority && !needs_quoting(&name) {
                    return format!("({})", name);
                }
            }
            write_atom(&name, quoted)
        }

        Term::Int(n) => n.to_string(),

        Term::Float(f) => {
            let s = f.to_string();
            if s.contains('.') || s.contains('e') || s.contains('E') {
                s
            } else {
                format!("{}.0", s)
            }
        }

        Term::Cons(_) => write_list(heap, term, quoted),

        Term::Compound(c) => write_compound(heap, &c.functor, &c.args, priority, quoted),

        Term::Port(p) => format!("{{port:{}}}", p.id().as_usize()),

        Term::Reflection(r) => format!("{{reflection: {}}}", r.as_usize()),
    }
}

fn write_compound(heap: &Heap, functor: &Atom, args: &[Term], priority: u32, quoted: bool) -> String {
    let name = functor.text();

    // {}(X) prints as {X}.
    if name == "{}" && args.len() == 1 {
        return format!("{{{}}}", write_out(heap, &args[0], MAX_PREC, quoted));
    }

    if args.len() == 2 {
        if let Some(info) = ops::infix(&name) {
            return write_infix(heap, &name, info.prec, info.assoc, args, priority, quoted);
        }
    }

    if args.len() == 1 {
        if let Some(info) = ops::prefix(&name) {
            return write_prefix(heap, &name, info.prec, info.assoc, &args[0], priority, quoted);
        }
    }

    let args_str = args
        .iter()
        .map(|a| write_out(heap, a, ARG_PREC, quoted))
        .join(", ");
    if args.is_empty() {
        format!("{}()", write_atom(&name, quoted))
    } else {
        format!("{}({})", write_atom(&name, quoted), args_str)
    }
}

fn write_infix(
    heap: &Heap,
    op: &str,
    op_prec: u32,
    assoc: Assoc,
    args: &[Term],
    priority: u32,
    quoted: bool,
) -> String {
    let (left_prec, right_prec) = match assoc {
        Assoc::Xfy => (op_prec - 1, op_prec),
        Assoc::Yfx => (op_prec, op_prec - 1),
        _ => (op_prec - 1, op_prec - 1),
    };

    let left = write_out(heap, &args[0], left_prec, quoted);
    let right = write_out(heap, &args[1], right_prec, quoted);

    let result = if op == "," {
        format!("{}, {}", left, right)
    } else {
        format!("{} {} {}", left, op, right)
    };

    if op_prec > priority {
        format!("({})", result)
    } else {
        result
    }
}

fn write_prefix(
    heap: &Heap,
    op: &str,
    op_prec: u32,
    assoc: Assoc,
    arg: &Term,
    priority: u32,
    quoted: bool,
) -> String {
    let arg_prec = if assoc == Assoc::Fy { op_prec } else { op_prec - 1 };
    let arg = write_out(heap, arg, arg_prec, quoted);

    // Negative numbers read better without the space.
    let result = if op == "-" && arg.starts_with(|c: char| c.is_ascii_digit()) {
        format!("-{}", arg)
    } else {
        format!("{} {}", op, arg)
    };

    if op_prec > priority {
        format!("({})", result)
    } else {
        result
    }
}

fn write_list(heap: &Heap, list: &Term, quoted: bool) -> String {
    let mut elements = Vec::new();
    let mut current = heap.deref(list);

    while let Term::Cons(cell) = current {
        elements.push(write_out(heap, &cell.head, ARG_PREC, quoted));
        current = heap.deref(&cell.tail);
    }

    if current.is_nil() {
        format!("[{}]", elements.join(", "))
    } else {
        format!(
            "[{} | {}]",
            elements.join(", "),
            write_out(heap, &current, ARG_PREC, quoted)
        )
    }
}
