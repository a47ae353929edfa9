//! Pratt parser for AKL terms.
//!
//! Precedence climbing over the operator table in `akl_ir::ops`. Higher
//! precedence numbers bind looser, the Prolog convention. Variables are
//! scoped to one parse: the same name yields the same cell within a clause,
//! `_` is always fresh.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::ParseError;
use akl_ir::ops::{self, Assoc, ARG_PREC, MAX_PREC};
use akl_ir::{make_list, Atom, EnvId, Heap, Term, VarId};
use rustc_hash::FxHashMap;

pub struct Parser<'h> {
    lexer: Lexer,
    current: Token,
    heap: &'h mut Heap,
    env: EnvId,
    var_map: FxHashMap<String, VarId>,
    /// Named variables in first-occurrence order, for query binding output.
    var_order: Vec<(String, VarId)>,
}

impl<'h> Parser<'h> {
    pub fn new(heap: &'h mut Heap, env: EnvId, source: &str) -> Result<Parser<'h>, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            heap,
            env,
            var_map: FxHashMap::default(),
            var_order: Vec::new(),
        })
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.current.line,
            col: self.current.col,
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?}, got {:?}",
                kind, self.current.kind
            )))
        }
    }

    pub fn at_eof(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    pub fn at_dot(&self) -> bool {
        self.current.kind == TokenKind::Dot
    }

    pub fn skip_dot(&mut self) -> Result<(), ParseError> {
        self.advance()?;
        Ok(())
    }

    /// Named variables of everything parsed so far, in order of first
    /// occurrence. Anonymous `_` variables are not recorded.
    pub fn named_vars(&self) -> &[(String, VarId)] {
        &self.var_order
    }

    pub fn reset_var_scope(&mut self) {
        self.var_map.clear();
        self.var_order.clear();
    }

    fn var(&mut self, name: &str) -> VarId {
        if name == "_" {
            return self.heap.new_var(None, self.env);
        }
        if let Some(&v) = self.var_map.get(name) {
            return v;
        }
        let v = self
            .heap
            .new_var(Some(Atom::new(name).interned()), self.env);
        self.var_map.insert(name.to_string(), v);
        self.var_order.push((name.to_string(), v));
        v
    }

    /// Current token viewed as an infix/special operator name, if any.
    fn current_op_name(&self) -> Option<String> {
        match &self.current.kind {
            TokenKind::Operator(name) => Some(name.clone()),
            TokenKind::Atom(name) if ops::infix(name).is_some() => Some(name.clone()),
            TokenKind::Comma => Some(",".to_string()),
            TokenKind::Pipe => Some("|".to_string()),
            _ => None,
        }
    }

    /// Parses a term with operators up to `max_prec`.
    pub fn parse_term(&mut self, max_prec: u32) -> Result<Term, ParseError> {
        let mut left = self.parse_prefix_or_primary()?;

        while let Some(op_name) = self.current_op_name() {
            let info = match ops::infix(&op_name) {
                Some(info) => info,
                None => break,
            };
            if info.prec > max_prec {
                break;
            }
            self.advance()?;

            let right_prec = match info.assoc {
                Assoc::Xfy => info.prec,
                _ => info.prec - 1,
            };
            let right = self.parse_term(right_prec)?;
            left = Term::compound(Atom::new(&op_name), vec![left, right]);
        }

        Ok(left)
    }

    fn can_start_term(&self) -> bool {
        match &self.current.kind {
            TokenKind::Variable(_)
            | TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Atom(_)
            | TokenKind::QuotedAtom(_)
            | TokenKind::Str(_)
            | TokenKind::LBracket
            | TokenKind::LParen
            | TokenKind::LBrace => true,
            TokenKind::Operator(name) => ops::prefix(name).is_some(),
            TokenKind::Pipe => ops::prefix("|").is_some(),
            _ => false,
        }
    }

    /// A prefix operator is demoted to a plain atom when what follows
    /// cannot be its argument, or when a looser infix operator would take
    /// over (the "peepop" rule).
    fn prefix_is_atom(&self, op_prec: u32) -> bool {
        if !self.can_start_term() {
            return true;
        }
        if let Some(op_name) = self.current_op_name() {
            if let Some(info) = ops::infix(&op_name) {
                if info.prec >= op_prec {
                    return true;
                }
            }
        }
        false
    }

    fn parse_prefix_or_primary(&mut self) -> Result<Term, ParseError> {
        let op_name = match &self.current.kind {
            TokenKind::Operator(name) => Some(name.clone()),
            TokenKind::Pipe => Some("|".to_string()),
            TokenKind::Atom(name) if ops::prefix(name).is_some() => Some(name.clone()),
            _ => None,
        };

        if let Some(op_name) = op_name {
            if let Some(info) = ops::prefix(&op_name) {
                self.advance()?;

                if self.prefix_is_atom(info.prec) {
                    return Ok(Term::atom(&op_name));
                }

                let arg_prec = if info.assoc == Assoc::Fy {
                    info.prec
                } else {
                    info.prec - 1
                };
                let arg = self.parse_term(arg_prec)?;
                return Ok(Term::compound(Atom::new(&op_name), vec![arg]));
            }
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Term, ParseError> {
        match self.current.kind.clone() {
            TokenKind::Variable(name) => {
                self.advance()?;
                let var = Term::Var(self.var(&name));
                // Higher-order call: X(Args) reads as apply(X, [Args]).
                if self.current.kind == TokenKind::LParen {
                    self.advance()?;
                    if self.current.kind == TokenKind::RParen {
                        self.advance()?;
                        return Ok(Term::compound(
                            Atom::new("apply"),
                            vec![var, Term::nil()],
                        ));
                    }
                    let args = self.parse_arg_list()?;
                    self.expect(&TokenKind::RParen)?;
                    return Ok(Term::compound(
                        Atom::new("apply"),
                        vec![var, make_list(args, Term::nil())],
                    ));
                }
                Ok(var)
            }

            TokenKind::Int(value) => {
                self.advance()?;
                Ok(Term::Int(value))
            }

            TokenKind::Float(value) => {
                self.advance()?;
                Ok(Term::Float(value))
            }

            TokenKind::Atom(_) | TokenKind::QuotedAtom(_) | TokenKind::Operator(_) => {
                self.parse_atom_or_struct()
            }

            TokenKind::LBracket => self.parse_list(),

            TokenKind::LParen => {
                self.advance()?;
                let term = self.parse_term(MAX_PREC)?;
                self.expect(&TokenKind::RParen)?;
                Ok(term)
            }

            TokenKind::LBrace => {
                self.advance()?;
                let inner = self.parse_term(MAX_PREC)?;
                self.expect(&TokenKind::RBrace)?;
                Ok(Term::compound(Atom::new("{}"), vec![inner]))
            }

            TokenKind::Str(text) => {
                self.advance()?;
                let codes = text.chars().map(|c| Term::Int(c as i64));
                Ok(make_list(codes.collect::<Vec<_>>(), Term::nil()))
            }

            ref kind => Err(self.error(format!("unexpected token: {:?}", kind))),
        }
    }

    fn parse_atom_or_struct(&mut self) -> Result<Term, ParseError> {
        let name = match self.advance()?.kind {
            TokenKind::Atom(name) | TokenKind::QuotedAtom(name) | TokenKind::Operator(name) => name,
            kind => return Err(self.error(format!("expected atom, got {:?}", kind))),
        };
        let atom = Atom::new(&name);

        if self.current.kind == TokenKind::LParen {
            self.advance()?;
            if self.current.kind == TokenKind::RParen {
                self.advance()?;
                return Ok(Term::compound(atom, vec![]));
            }
            let args = self.parse_arg_list()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Term::compound(atom, args));
        }

        Ok(Term::Atom(atom))
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Term>, ParseError> {
        // Inside parentheses the comma separates arguments, so arguments
        // parse just below its precedence.
        let mut args = vec![self.parse_term(ARG_PREC)?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            args.push(self.parse_term(ARG_PREC)?);
        }
        Ok(args)
    }

    fn parse_list(&mut self) -> Result<Term, ParseError> {
        self.expect(&TokenKind::LBracket)?;

        if self.current.kind == TokenKind::RBracket {
            self.advance()?;
            return Ok(Term::nil());
        }

        let mut elements = vec![self.parse_term(ARG_PREC)?];
        while self.current.kind == TokenKind::Comma {
            self.advance()?;
            elements.push(self.parse_term(ARG_PREC)?);
        }

        let tail = if self.current.kind == TokenKind::Pipe {
            self.advance()?;
            self.parse_term(ARG_PREC)?
        } else {
            Term::nil()
        };

        self.expect(&TokenKind::RBracket)?;
        Ok(make_list(elements, tail))
    }
}
