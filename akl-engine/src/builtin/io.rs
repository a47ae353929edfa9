//! Terminal I/O and formatting.
//!
//! stdin/stdout are addressed through the atoms `stdin` and `stdout`;
//! `read_term/2` answers `term(T)` or `exception(end_of_file)`.

use super::{BuiltinResult, BuiltinTable};
use crate::machine::Machine;
use crate::tree::AndBoxId;
use akl_ir::write::{display_term, print_term};
use akl_ir::{list_to_vec, Term};
use std::io::{BufRead, Read, Write};

pub fn register(table: &mut BuiltinTable) {
    table.register("write", 1, builtin_write);
    table.register("print", 1, builtin_write);
    table.register("writeln", 1, builtin_writeln);
    table.register("nl", 0, builtin_nl);
    table.register("put", 1, builtin_put);
    table.register("format", 1, builtin_format1);
    table.register("format", 2, builtin_format2);
    table.register("fflush", 1, builtin_fflush);
    table.register("read_term", 2, builtin_read_term);
    table.register("getc", 2, builtin_getc);
}

fn builtin_write(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    print!("{}", display_term(&machine.heap, &args[0]));
    BuiltinResult::Succeeded
}

fn builtin_writeln(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    println!("{}", display_term(&machine.heap, &args[0]));
    BuiltinResult::Succeeded
}

fn builtin_nl(_: &mut Machine, _: AndBoxId, _: &[Term]) -> BuiltinResult {
    println!();
    BuiltinResult::Succeeded
}

fn builtin_put(machine: &mut Machine, _: AndBoxId, args: &[Term]) -> BuiltinResult {
    match machine.heap.deref(&args[0]) {
        Term::Var(v) => BuiltinResult::Suspended(v),
        Term::Int(code) => match std::char::from_u32(code as u32) {
            Some(c) => {
                print!("{}", c);
                BuiltinResult::Succeeded
            }
            None => BuiltinResult::Failed,
        },
        _ => BuiltinResult::Failed,
    }
}

fn builtin_fflush(_: &mut Machine, _: AndBoxId, _: &[Term]) -> BuiltinResult {
    let _ = std::io::stdout().flush();
    BuiltinResult::Succeeded
}

fn builtin_format1(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let control = args[0].clone();
    format_impl(machine, ab, &control, &[])
}

fn builtin_format2(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let control = args[0].clone();
    let fmt_args = match list_to_vec(&machine.heap, &args[1]) {
        Some(list) => list,
        // A single non-list argument stands for a one-element list.
        None => vec![machine.heap.deref(&args[1])],
    };
    format_impl(machine, ab, &control, &fmt_args)
}

/// Control codes: `~w` write, `~q` quoted, `~a` atom text, `~d` integer,
/// `~n` newline, `~~` tilde.
fn format_impl(
    machine: &mut Machine,
    _: AndBoxId,
    control: &Term,
    args: &[Term],
) -> BuiltinResult {
    let text = match machine.heap.deref(control) {
        Term::Atom(a) => a.text(),
        list @ Term::Cons(_) => match codes_to_string(machine, &list) {
            Some(text) => text,
            None => return BuiltinResult::Failed,
        },
        Term::Var(v) => return BuiltinResult::Suspended(v),
        _ => return BuiltinResult::Failed,
    };

    let mut out = String::new();
    let mut next_arg = args.iter();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('w') => match next_arg.next() {
                Some(arg) => out.push_str(&display_term(&machine.heap, arg)),
                None => return BuiltinResult::Failed,
            },
            Some('q') => match next_arg.next() {
                Some(arg) => out.push_str(&print_term(&machine.heap, arg)),
                None => return BuiltinResult::Failed,
            },
            Some('a') => match next_arg.next().map(|a| machine.heap.deref(a)) {
                Some(Term::Atom(a)) => out.push_str(&a.text()),
                _ => return BuiltinResult::Failed,
            },
            Some('d') => match next_arg.next().map(|a| machine.heap.deref(a)) {
                Some(Term::Int(n)) => out.push_str(&n.to_string()),
                _ => return BuiltinResult::Failed,
            },
            Some('n') => out.push('\n'),
            Some('~') => out.push('~'),
            _ => return BuiltinResult::Failed,
        }
    }
    print!("{}", out);
    BuiltinResult::Succeeded
}

fn codes_to_string(machine: &Machine, list: &Term) -> Option<String> {
    let codes = list_to_vec(&machine.heap, list)?;
    codes
        .iter()
        .map(|c| match c {
            Term::Int(n) => std::char::from_u32(*n as u32),
            _ => None,
        })
        .collect()
}

/// Reads one clause-terminated term from stdin.
fn builtin_read_term(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let mut source = String::new();
    let stdin = std::io::stdin();
    let mut saw_any = false;
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        saw_any = true;
        source.push_str(&line);
        source.push('\n');
        if line.trim_end().ends_with('.') {
            break;
        }
    }

    let reply = if !saw_any {
        Term::compound(
            akl_ir::Atom::new("exception"),
            vec![Term::atom("end_of_file")],
        )
    } else {
        let env = machine.tree[ab].env;
        match akl_parse::parse_term(&mut machine.heap, env, &source) {
            Ok(term) => {
                let mut vars = Vec::new();
                collect_term_vars(&term, &mut vars);
                machine.tree[ab].vars.extend(vars);
                Term::compound(akl_ir::Atom::new("term"), vec![term])
            }
            Err(_) => return BuiltinResult::Failed,
        }
    };

    if machine.unify_in(ab, &args[1], &reply) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}

fn collect_term_vars(term: &Term, out: &mut Vec<akl_ir::VarId>) {
    match term {
        Term::Var(v) => out.push(*v),
        Term::Compound(c) => c.args.iter().for_each(|a| collect_term_vars(a, out)),
        Term::Cons(cell) => {
            collect_term_vars(&cell.head, out);
            collect_term_vars(&cell.tail, out);
        }
        _ => {}
    }
}

/// Reads one character; -1 at end of input.
fn builtin_getc(machine: &mut Machine, ab: AndBoxId, args: &[Term]) -> BuiltinResult {
    let mut buf = [0u8; 1];
    let code = match std::io::stdin().read(&mut buf) {
        Ok(0) | Err(_) => -1,
        Ok(_) => buf[0] as i64,
    };
    if machine.unify_in(ab, &args[1], &Term::Int(code)) {
        BuiltinResult::Succeeded
    } else {
        BuiltinResult::Failed
    }
}
