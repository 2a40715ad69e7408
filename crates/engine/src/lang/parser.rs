// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Recursive-descent parser for the snippet language.
//!
//! Precedence, loosest first: conditional expression, `or`, `and`, `not`,
//! comparisons, `|`, `^`, `&`, shifts, `+ -`, `* / // %`, unary `- + ~`,
//! `**`, calls/subscripts/attributes, atoms.

use std::rc::Rc;

use etp_common::{Position, Span};

use super::{
    ast::*,
    scope::frame_locals,
    token::{tokenize, Token, TokenKind},
};
use crate::ParseError;

/// Expression nesting deeper than this is rejected.
const MAX_NESTING: usize = 100;

/// Parse a whole snippet
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        loop_depth: 0,
        function_depth: 0,
        last_end: Position::new(1, 0),
    };
    let body = parser.file()?;
    let locals = frame_locals(&[], &body);
    Ok(Program { body, locals })
}

type Parsed<T> = Result<T, ParseError>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    loop_depth: usize,
    function_depth: usize,
    last_end: Position,
}

impl Parser {
    // ---- token helpers ----

    fn peek(&self) -> &Token {
        // the token stream always ends with EndOfFile
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn nth_kind(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        self.last_end = token.span.end;
        token
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Op(o) if *o == op)
    }

    fn at_keyword(&self, kw: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        let found = self.at_keyword(kw);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Parsed<Token> {
        if self.at_op(op) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected '{op}'")))
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Parsed<Token> {
        if self.at_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(self.error_here(format!("expected '{kw}'")))
        }
    }

    fn expect_name(&mut self) -> Parsed<(String, Span)> {
        match self.peek_kind().clone() {
            TokenKind::Name(name) => {
                let token = self.advance();
                Ok((name, token.span))
            }
            _ => Err(self.error_here("expected a name")),
        }
    }

    fn expect_newline(&mut self) -> Parsed<()> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::EndOfFile => Ok(()),
            _ => Err(self.error_here("invalid syntax")),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.peek().span.start)
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.last_end)
    }

    fn enter(&mut self) -> Parsed<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error_here("too many nested expressions"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Whether the next token can begin an expression
    fn starts_expr(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Name(_) | TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) => true,
            TokenKind::Keyword(kw) => matches!(*kw, "True" | "False" | "None" | "not" | "lambda"),
            TokenKind::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+" | "~"),
            _ => false,
        }
    }

    // ---- statements ----

    fn file(&mut self) -> Parsed<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::EndOfFile => break,
                TokenKind::Newline => {
                    self.advance();
                }
                _ => body.extend(self.statement()?),
            }
        }
        Ok(body)
    }

    fn statement(&mut self) -> Parsed<Vec<Stmt>> {
        match self.peek_kind() {
            TokenKind::Keyword("if") => Ok(vec![self.if_stmt()?]),
            TokenKind::Keyword("while") => Ok(vec![self.while_stmt()?]),
            TokenKind::Keyword("for") => Ok(vec![self.for_stmt()?]),
            TokenKind::Keyword("def") => Ok(vec![self.def_stmt()?]),
            TokenKind::Keyword(
                kw @ ("class" | "try" | "with" | "async" | "import" | "from" | "global" | "nonlocal"
                | "del" | "raise" | "yield" | "await"),
            ) => Err(self.error_here(format!("'{kw}' statements are not supported"))),
            TokenKind::Keyword(kw @ ("elif" | "else" | "except" | "finally")) => {
                Err(self.error_here(format!("unexpected '{kw}'")))
            }
            TokenKind::Indent => Err(self.error_here("unexpected indent")),
            TokenKind::Op("@") => Err(self.error_here("decorators are not supported")),
            _ => self.simple_line(false),
        }
    }

    /// One or more `;`-separated simple statements ending the line.
    fn simple_line(&mut self, inline_first: bool) -> Parsed<Vec<Stmt>> {
        let mut stmts = Vec::new();
        let mut inline = inline_first;
        loop {
            let mut stmt = self.small_stmt()?;
            stmt.inline = inline;
            stmts.push(stmt);
            inline = true;

            if !self.eat_op(";") || matches!(self.peek_kind(), TokenKind::Newline | TokenKind::EndOfFile) {
                break;
            }
        }
        self.expect_newline()?;
        Ok(stmts)
    }

    fn small_stmt(&mut self) -> Parsed<Stmt> {
        let start = self.peek().span.start;
        let kind = match self.peek_kind() {
            TokenKind::Keyword("pass") => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Keyword(kw @ ("break" | "continue")) if self.loop_depth == 0 => {
                return Err(self.error_here(format!("'{kw}' outside loop")))
            }
            TokenKind::Keyword("return") if self.function_depth == 0 => {
                return Err(self.error_here("'return' outside function"))
            }
            TokenKind::Keyword("break") => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Keyword("continue") => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Keyword("return") => {
                self.advance();
                let value = if self.starts_expr() { Some(self.testlist()?) } else { None };
                StmtKind::Return(value)
            }
            TokenKind::Keyword("assert") => {
                self.advance();
                let test = self.test()?;
                let msg = if self.eat_op(",") { Some(self.test()?) } else { None };
                StmtKind::Assert { test, msg }
            }
            TokenKind::Keyword(
                kw @ ("import" | "from" | "global" | "nonlocal" | "del" | "raise" | "yield"),
            ) => return Err(self.error_here(format!("'{kw}' statements are not supported"))),
            _ => self.expr_stmt()?,
        };
        Ok(Stmt { kind, span: self.span_from(start), inline: false })
    }

    fn expr_stmt(&mut self) -> Parsed<StmtKind> {
        let first = self.testlist()?;

        if self.at_op("=") {
            let mut exprs = vec![first];
            while self.eat_op("=") {
                exprs.push(self.testlist()?);
            }
            let value = exprs.pop().ok_or_else(|| self.error_here("invalid syntax"))?;
            let targets = exprs.into_iter().map(into_store).collect::<Parsed<Vec<_>>>()?;
            return Ok(StmtKind::Assign { targets, value });
        }

        let augmented = match self.peek_kind() {
            TokenKind::Op(op) => BinOp::from_augmented(op),
            _ => None,
        };
        if let Some(op) = augmented {
            if !matches!(first.kind, ExprKind::Name { .. } | ExprKind::Subscript { .. }) {
                return Err(ParseError::new(
                    "illegal expression for augmented assignment",
                    first.span.start,
                ));
            }
            self.advance();
            let target = into_store(first)?;
            let value = self.testlist()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }
        if self.at_op(":") {
            return Err(self.error_here("annotations are not supported"));
        }

        Ok(StmtKind::Expr(first))
    }

    fn if_stmt(&mut self) -> Parsed<Stmt> {
        // `if` or `elif`
        let start = self.advance().span.start;
        let test = self.test()?;
        self.expect_op(":")?;
        let span = self.span_from(start);
        let body = self.suite()?;

        let orelse = if self.at_keyword("elif") {
            vec![self.if_stmt()?]
        } else if self.eat_keyword("else") {
            self.expect_op(":")?;
            self.suite()?
        } else {
            Vec::new()
        };

        Ok(Stmt { kind: StmtKind::If { test, body, orelse }, span, inline: false })
    }

    fn while_stmt(&mut self) -> Parsed<Stmt> {
        let start = self.expect_keyword("while")?.span.start;
        let test = self.test()?;
        self.expect_op(":")?;
        let span = self.span_from(start);
        let body = self.loop_body()?;
        let orelse = self.else_clause()?;
        Ok(Stmt { kind: StmtKind::While { test, body, orelse }, span, inline: false })
    }

    fn for_stmt(&mut self) -> Parsed<Stmt> {
        let start = self.expect_keyword("for")?.span.start;
        let target = into_store(self.target_list()?)?;
        self.expect_keyword("in")?;
        let iter = self.testlist()?;
        self.expect_op(":")?;
        let span = self.span_from(start);
        let body = self.loop_body()?;
        let orelse = self.else_clause()?;
        Ok(Stmt { kind: StmtKind::For { target, iter, body, orelse }, span, inline: false })
    }

    fn loop_body(&mut self) -> Parsed<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        body
    }

    fn else_clause(&mut self) -> Parsed<Vec<Stmt>> {
        if self.eat_keyword("else") {
            self.expect_op(":")?;
            self.suite()
        } else {
            Ok(Vec::new())
        }
    }

    fn def_stmt(&mut self) -> Parsed<Stmt> {
        let start = self.expect_keyword("def")?.span.start;
        let (name, name_span) = self.expect_name()?;
        self.expect_op("(")?;

        let mut params: Vec<Param> = Vec::new();
        while !self.at_op(")") {
            if self.at_op("*") || self.at_op("**") || self.at_op("/") {
                return Err(self.error_here("variadic and positional-only parameters are not supported"));
            }
            let (param, span) = self.expect_name()?;
            if params.iter().any(|p| p.name == param) {
                return Err(ParseError::new(
                    format!("duplicate argument '{param}' in function definition"),
                    span.start,
                ));
            }
            let default = if self.eat_op("=") { Some(self.test()?) } else { None };
            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(ParseError::new("non-default argument follows default argument", span.start));
            }
            params.push(Param { name: param, span, default });
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        if self.at_op("->") {
            return Err(self.error_here("annotations are not supported"));
        }
        self.expect_op(":")?;
        let span = self.span_from(start);
        let outer_loops = std::mem::take(&mut self.loop_depth);
        self.function_depth += 1;
        let body = self.suite();
        self.function_depth -= 1;
        self.loop_depth = outer_loops;
        let body = body?;
        let locals = frame_locals(&params, &body);

        let def = FunctionDef { name, name_span, params, body, locals };
        Ok(Stmt { kind: StmtKind::FunctionDef(Rc::new(def)), span, inline: false })
    }

    /// Block after a `:`, either indented on following lines or inline.
    fn suite(&mut self) -> Parsed<Vec<Stmt>> {
        if !matches!(self.peek_kind(), TokenKind::Newline) {
            return self.simple_line(true);
        }
        self.advance();
        if !matches!(self.peek_kind(), TokenKind::Indent) {
            return Err(self.error_here("expected an indented block"));
        }
        self.advance();

        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::EndOfFile => break,
                _ => body.extend(self.statement()?),
            }
        }
        Ok(body)
    }

    // ---- expressions ----

    /// Comma-separated expressions; more than one (or a trailing comma)
    /// makes an unparenthesized tuple.
    fn testlist(&mut self) -> Parsed<Expr> {
        let first = self.test()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let start = first.span.start;
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.starts_expr() {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(start)))
    }

    /// Loop targets: comma-separated expressions that stop before `in`.
    fn target_list(&mut self) -> Parsed<Expr> {
        let first = self.bitor()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let start = first.span.start;
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.starts_expr() {
                break;
            }
            items.push(self.bitor()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(start)))
    }

    fn test(&mut self) -> Parsed<Expr> {
        if self.at_keyword("lambda") {
            return Err(self.error_here("lambda expressions are not supported"));
        }
        self.enter()?;
        let result = self.conditional();
        self.leave();
        result
    }

    fn conditional(&mut self) -> Parsed<Expr> {
        let body = self.or_test()?;
        if !self.eat_keyword("if") {
            return Ok(body);
        }
        let test = self.or_test()?;
        self.expect_keyword("else")?;
        let orelse = self.test()?;
        let span = body.span.to(orelse.span);
        Ok(Expr::new(
            ExprKind::IfExp { test: Box::new(test), body: Box::new(body), orelse: Box::new(orelse) },
            span,
        ))
    }

    fn or_test(&mut self) -> Parsed<Expr> {
        self.logical("or", LogicalOp::Or, Self::and_test)
    }

    fn and_test(&mut self) -> Parsed<Expr> {
        self.logical("and", LogicalOp::And, Self::not_test)
    }

    fn logical(
        &mut self,
        keyword: &str,
        op: LogicalOp,
        next: fn(&mut Self) -> Parsed<Expr>,
    ) -> Parsed<Expr> {
        let first = next(self)?;
        if !self.at_keyword(keyword) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword(keyword) {
            values.push(next(self)?);
        }
        let span = values[0].span.to(values[values.len() - 1].span);
        Ok(Expr::new(ExprKind::Logical { op, values }, span))
    }

    fn not_test(&mut self) -> Parsed<Expr> {
        if !self.at_keyword("not") {
            return self.comparison();
        }
        let start = self.advance().span.start;
        self.enter()?;
        let operand = self.not_test();
        self.leave();
        let operand = operand?;
        let span = Span::new(start, operand.span.end);
        Ok(Expr::new(ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) }, span))
    }

    fn comparison(&mut self) -> Parsed<Expr> {
        let left = self.bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Op("<") => CmpOp::Lt,
                TokenKind::Op(">") => CmpOp::Gt,
                TokenKind::Op("<=") => CmpOp::LtE,
                TokenKind::Op(">=") => CmpOp::GtE,
                TokenKind::Op("==") => CmpOp::Eq,
                TokenKind::Op("!=") => CmpOp::NotEq,
                TokenKind::Keyword("in") => CmpOp::In,
                TokenKind::Keyword("not") if matches!(self.nth_kind(1), TokenKind::Keyword("in")) => {
                    self.advance();
                    CmpOp::NotIn
                }
                TokenKind::Keyword("is") => {
                    if matches!(self.nth_kind(1), TokenKind::Keyword("not")) {
                        self.advance();
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    }
                }
                _ => break,
            };
            self.advance();
            ops.push(op);
            comparators.push(self.bitor()?);
        }

        match comparators.last() {
            None => Ok(left),
            Some(last) => {
                let span = left.span.to(last.span);
                Ok(Expr::new(ExprKind::Compare { left: Box::new(left), ops, comparators }, span))
            }
        }
    }

    fn binary_level(
        &mut self,
        table: &[(&str, BinOp)],
        next: fn(&mut Self) -> Parsed<Expr>,
    ) -> Parsed<Expr> {
        let mut left = next(self)?;
        loop {
            let Some(op) = table.iter().find(|(sym, _)| self.at_op(sym)).map(|(_, op)| *op) else {
                return Ok(left);
            };
            self.advance();
            let right = next(self)?;
            let span = left.span.to(right.span);
            left = Expr::new(ExprKind::Binary { left: Box::new(left), op, right: Box::new(right) }, span);
        }
    }

    fn bitor(&mut self) -> Parsed<Expr> {
        self.binary_level(&[("|", BinOp::BitOr)], Self::bitxor)
    }

    fn bitxor(&mut self) -> Parsed<Expr> {
        self.binary_level(&[("^", BinOp::BitXor)], Self::bitand)
    }

    fn bitand(&mut self) -> Parsed<Expr> {
        self.binary_level(&[("&", BinOp::BitAnd)], Self::shift)
    }

    fn shift(&mut self) -> Parsed<Expr> {
        self.binary_level(&[("<<", BinOp::LShift), (">>", BinOp::RShift)], Self::arith)
    }

    fn arith(&mut self) -> Parsed<Expr> {
        self.binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::term)
    }

    fn term(&mut self) -> Parsed<Expr> {
        if self.at_op("@") {
            return Err(self.error_here("invalid syntax"));
        }
        let expr = self.binary_level(
            &[("*", BinOp::Mul), ("/", BinOp::Div), ("//", BinOp::FloorDiv), ("%", BinOp::Mod)],
            Self::factor,
        )?;
        if self.at_op("@") {
            return Err(self.error_here("matrix multiplication is not supported"));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Parsed<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Op("-") => UnaryOp::Neg,
            TokenKind::Op("+") => UnaryOp::Pos,
            TokenKind::Op("~") => UnaryOp::Invert,
            _ => return self.power(),
        };
        let start = self.advance().span.start;
        self.enter()?;
        let operand = self.factor();
        self.leave();
        let operand = operand?;
        let span = Span::new(start, operand.span.end);
        Ok(Expr::new(ExprKind::Unary { op, operand: Box::new(operand) }, span))
    }

    fn power(&mut self) -> Parsed<Expr> {
        let base = self.postfix()?;
        if !self.eat_op("**") {
            return Ok(base);
        }
        // right associative, binds tighter than a unary minus on its left
        let exponent = self.factor()?;
        let span = base.span.to(exponent.span);
        Ok(Expr::new(
            ExprKind::Binary { left: Box::new(base), op: BinOp::Pow, right: Box::new(exponent) },
            span,
        ))
    }

    fn postfix(&mut self) -> Parsed<Expr> {
        let mut expr = self.atom()?;
        loop {
            let start = expr.span.start;
            if self.eat_op("(") {
                let (args, keywords) = self.call_args()?;
                self.expect_op(")")?;
                expr = Expr::new(
                    ExprKind::Call { func: Box::new(expr), args, keywords },
                    self.span_from(start),
                );
            } else if self.eat_op("[") {
                let index = self.subscript_index()?;
                self.expect_op("]")?;
                expr = Expr::new(
                    ExprKind::Subscript { value: Box::new(expr), index: Box::new(index) },
                    self.span_from(start),
                );
            } else if self.eat_op(".") {
                let (attr, _) = self.expect_name()?;
                expr = Expr::new(ExprKind::Attribute { value: Box::new(expr), attr }, self.span_from(start));
            } else {
                return Ok(expr);
            }
        }
    }

    fn call_args(&mut self) -> Parsed<(Vec<Expr>, Vec<Keyword>)> {
        let mut args = Vec::new();
        let mut keywords: Vec<Keyword> = Vec::new();
        while !self.at_op(")") {
            if self.at_op("*") || self.at_op("**") {
                return Err(self.error_here("argument unpacking is not supported"));
            }

            let is_keyword = matches!(self.peek_kind(), TokenKind::Name(_))
                && matches!(self.nth_kind(1), TokenKind::Op("="));
            if is_keyword {
                let (name, span) = self.expect_name()?;
                self.advance();
                if keywords.iter().any(|k| k.name == name) {
                    return Err(ParseError::new(format!("keyword argument repeated: {name}"), span.start));
                }
                let value = self.test()?;
                keywords.push(Keyword { name, value });
            } else {
                if !keywords.is_empty() {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                let arg = self.test()?;
                if self.at_keyword("for") {
                    let generators = self.comprehension_clauses()?;
                    let span = self.span_from(arg.span.start);
                    args.push(Expr::new(
                        ExprKind::Comprehension {
                            kind: ComprehensionKind::Generator,
                            element: Box::new(arg),
                            generators,
                        },
                        span,
                    ));
                } else {
                    args.push(arg);
                }
            }

            if !self.eat_op(",") {
                break;
            }
        }
        Ok((args, keywords))
    }

    fn subscript_index(&mut self) -> Parsed<Expr> {
        let first = self.subscript_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let start = first.span.start;
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            items.push(self.subscript_item()?);
        }
        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(start)))
    }

    fn subscript_item(&mut self) -> Parsed<Expr> {
        let start = self.peek().span.start;
        let lower = if self.at_op(":") { None } else { Some(self.test()?) };
        if !self.at_op(":") {
            return lower.ok_or_else(|| self.error_here("invalid syntax"));
        }
        self.advance();

        let bound = |p: &mut Self| -> Parsed<Option<Box<Expr>>> {
            if p.at_op(":") || p.at_op("]") || p.at_op(",") {
                Ok(None)
            } else {
                Ok(Some(Box::new(p.test()?)))
            }
        };
        let upper = bound(self)?;
        let step = if self.eat_op(":") { bound(self)? } else { None };
        Ok(Expr::new(
            ExprKind::Slice { lower: lower.map(Box::new), upper, step },
            self.span_from(start),
        ))
    }

    fn comprehension_clauses(&mut self) -> Parsed<Vec<Generator>> {
        let mut generators = Vec::new();
        while self.eat_keyword("for") {
            let target = into_store(self.target_list()?)?;
            self.expect_keyword("in")?;
            let iter = self.or_test()?;
            let mut conds = Vec::new();
            while self.eat_keyword("if") {
                conds.push(self.or_test()?);
            }
            generators.push(Generator { target, iter, conds });
        }
        Ok(generators)
    }

    fn atom(&mut self) -> Parsed<Expr> {
        let token = self.peek().clone();
        let start = token.span.start;
        let kind = match token.kind {
            TokenKind::Name(id) => {
                self.advance();
                ExprKind::Name { id, ctx: ExprContext::Load }
            }
            TokenKind::Int(value) => {
                self.advance();
                ExprKind::Int(value)
            }
            TokenKind::Float(value) => {
                self.advance();
                ExprKind::Float(value)
            }
            TokenKind::Str(_) => {
                let mut text = String::new();
                while let TokenKind::Str(part) = self.peek_kind() {
                    text.push_str(part);
                    self.advance();
                }
                ExprKind::Str(Rc::from(text))
            }
            TokenKind::Keyword("True") => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::Keyword("False") => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::Keyword("None") => {
                self.advance();
                ExprKind::NoneLit
            }
            TokenKind::Op("(") => return self.paren(),
            TokenKind::Op("[") => return self.list_display(),
            TokenKind::Op("{") => return self.dict_display(),
            TokenKind::Keyword(kw @ ("yield" | "await" | "lambda")) => {
                return Err(self.error_here(format!("'{kw}' expressions are not supported")))
            }
            TokenKind::Newline | TokenKind::EndOfFile => {
                return Err(self.error_here("unexpected end of line"))
            }
            TokenKind::Indent => return Err(self.error_here("unexpected indent")),
            _ => return Err(self.error_here("invalid syntax")),
        };
        Ok(Expr::new(kind, self.span_from(start)))
    }

    fn paren(&mut self) -> Parsed<Expr> {
        let start = self.expect_op("(")?.span.start;
        if self.eat_op(")") {
            return Ok(Expr::new(ExprKind::Tuple(Vec::new()), self.span_from(start)));
        }

        let first = self.test()?;
        if self.at_keyword("for") {
            let generators = self.comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(Expr::new(
                ExprKind::Comprehension {
                    kind: ComprehensionKind::Generator,
                    element: Box::new(first),
                    generators,
                },
                self.span_from(start),
            ));
        }

        if !self.at_op(",") {
            self.expect_op(")")?;
            // the parentheses belong to the operand
            return Ok(Expr { kind: first.kind, span: self.span_from(start) });
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op(")") {
                break;
            }
            items.push(self.test()?);
        }
        self.expect_op(")")?;
        Ok(Expr::new(ExprKind::Tuple(items), self.span_from(start)))
    }

    fn list_display(&mut self) -> Parsed<Expr> {
        let start = self.expect_op("[")?.span.start;
        if self.eat_op("]") {
            return Ok(Expr::new(ExprKind::List(Vec::new()), self.span_from(start)));
        }

        let first = self.test()?;
        if self.at_keyword("for") {
            let generators = self.comprehension_clauses()?;
            self.expect_op("]")?;
            return Ok(Expr::new(
                ExprKind::Comprehension {
                    kind: ComprehensionKind::List,
                    element: Box::new(first),
                    generators,
                },
                self.span_from(start),
            ));
        }

        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            items.push(self.test()?);
        }
        self.expect_op("]")?;
        Ok(Expr::new(ExprKind::List(items), self.span_from(start)))
    }

    fn dict_display(&mut self) -> Parsed<Expr> {
        let start = self.expect_op("{")?.span.start;
        let mut pairs = Vec::new();
        while !self.at_op("}") {
            let key = self.test()?;
            if !self.at_op(":") {
                return Err(ParseError::new("set displays are not supported", start));
            }
            self.advance();
            let value = self.test()?;
            if self.at_keyword("for") {
                return Err(self.error_here("dict comprehensions are not supported"));
            }
            pairs.push((key, value));
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("}")?;
        Ok(Expr::new(ExprKind::Dict(pairs), self.span_from(start)))
    }
}

/// Convert a parsed expression into an assignment target
fn into_store(expr: Expr) -> Parsed<Expr> {
    let Expr { kind, span } = expr;
    let kind = match kind {
        ExprKind::Name { id, .. } => ExprKind::Name { id, ctx: ExprContext::Store },
        ExprKind::Tuple(items) => {
            ExprKind::Tuple(items.into_iter().map(into_store).collect::<Parsed<_>>()?)
        }
        ExprKind::List(items) => {
            ExprKind::List(items.into_iter().map(into_store).collect::<Parsed<_>>()?)
        }
        ExprKind::Subscript { value, index } => ExprKind::Subscript { value, index },
        ExprKind::Attribute { .. } => {
            return Err(ParseError::new("attribute assignment is not supported", span.start))
        }
        _ => return Err(ParseError::new("cannot assign to expression", span.start)),
    };
    Ok(Expr { kind, span })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_of(source: &str) -> Expr {
        let program = parse_program(source).unwrap();
        match program.body.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(expr)) => expr,
            Some(StmtKind::Assign { value, .. }) => value,
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = expr_of("a = 1 + 2 * 3");
        let ExprKind::Binary { op: BinOp::Add, right, .. } = expr.kind else {
            panic!("expected addition at the root");
        };
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));

        let expr = expr_of("-2 ** 2");
        assert!(matches!(expr.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_parenthesized_span_includes_parens() {
        let expr = expr_of("x = (a + b) * c");
        let ExprKind::Binary { left, op: BinOp::Mul, right } = expr.kind else {
            panic!("expected multiplication");
        };
        assert_eq!(left.span.start, Position::new(1, 4));
        assert_eq!(left.span.end, Position::new(1, 11));
        assert_eq!(right.span.start, Position::new(1, 14));
    }

    #[test]
    fn test_chained_comparison() {
        let expr = expr_of("0 < x <= 10 not in y");
        let ExprKind::Compare { ops, comparators, .. } = expr.kind else {
            panic!("expected comparison");
        };
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE, CmpOp::NotIn]);
        assert_eq!(comparators.len(), 3);
    }

    #[test]
    fn test_statement_forms() {
        let program = parse_program(
            "a = b = 1\nx, y = y, x\nxs[0] += 2\nfor i, v in enumerate(xs):\n    pass\nelse:\n    z = 1\n",
        )
        .unwrap();
        assert_eq!(program.body.len(), 4);
        let StmtKind::Assign { targets, .. } = &program.body[0].kind else { panic!() };
        assert_eq!(targets.len(), 2);
        assert!(matches!(program.body[2].kind, StmtKind::AugAssign { op: BinOp::Add, .. }));
        let StmtKind::For { target, orelse, .. } = &program.body[3].kind else { panic!() };
        assert!(matches!(target.kind, ExprKind::Tuple(_)));
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn test_elif_is_nested_if() {
        let program = parse_program("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n").unwrap();
        let StmtKind::If { orelse, .. } = &program.body[0].kind else { panic!() };
        assert_eq!(orelse.len(), 1);
        assert_eq!(orelse[0].line(), 3);
        let StmtKind::If { orelse: inner, .. } = &orelse[0].kind else { panic!() };
        assert_eq!(inner[0].line(), 6);
    }

    #[test]
    fn test_inline_statements() {
        let program = parse_program("a = 1; b = 2\nif a: c = 3\n").unwrap();
        assert!(!program.body[0].inline);
        assert!(program.body[1].inline);
        let StmtKind::If { body, .. } = &program.body[2].kind else { panic!() };
        assert!(body[0].inline);
    }

    #[test]
    fn test_multi_line_statement_span() {
        let program = parse_program("xs = [\n    1,\n    2,\n]\ny = 1").unwrap();
        assert_eq!(program.body[0].span.start.line, 1);
        assert_eq!(program.body[0].span.end.line, 4);
        assert_eq!(program.body[1].line(), 5);
    }

    #[test]
    fn test_comprehension_and_generator() {
        let expr = expr_of("ys = [x * 2 for x in xs if x > 1]");
        assert!(matches!(expr.kind, ExprKind::Comprehension { kind: ComprehensionKind::List, .. }));
        let expr = expr_of("total = sum(x for x in xs)");
        let ExprKind::Call { args, .. } = expr.kind else { panic!() };
        assert!(matches!(
            args[0].kind,
            ExprKind::Comprehension { kind: ComprehensionKind::Generator, .. }
        ));
    }

    #[test]
    fn test_slices_and_calls() {
        let expr = expr_of("ys = xs[1:-1:2]");
        let ExprKind::Subscript { index, .. } = expr.kind else { panic!() };
        assert!(matches!(index.kind, ExprKind::Slice { .. }));
        let expr = expr_of("print(a, b, sep='-')");
        let ExprKind::Call { args, keywords, .. } = expr.kind else { panic!() };
        assert_eq!(args.len(), 2);
        assert_eq!(keywords[0].name, "sep");
    }

    #[test]
    fn test_rejected_syntax() {
        for source in [
            "x = ",
            "import os",
            "class A:\n    pass",
            "f = lambda x: x",
            "s = {1, 2}",
            "1 = x",
            "def f(a=1, b):\n    pass",
            "if x:\ny = 1",
            "break",
            "return 1",
            "def f():\n    for i in xs:\n        pass\n    break",
            "  x = 1",
            "x = (1 + 2",
        ] {
            assert!(parse_program(source).is_err(), "{source:?} should not parse");
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("x = {}1{}", "(".repeat(150), ")".repeat(150));
        assert!(parse_program(&deep).is_err());
        let fine = format!("x = {}1{}", "(".repeat(20), ")".repeat(20));
        assert!(parse_program(&fine).is_ok());
    }
}
