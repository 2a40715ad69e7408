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

//! Syntax tree of the snippet language.
//!
//! Every node carries a [`Span`] with 1-based lines and 0-based character
//! columns. Parenthesized expressions have their span widened to include the
//! parentheses.

use std::{fmt, rc::Rc};

use etp_common::Span;

/// A parsed snippet (or prelude)
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements
    pub body: Vec<Stmt>,
    /// Names bound at module scope, in first-appearance order
    pub locals: Vec<String>,
}

/// A statement
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    /// What kind of statement
    pub kind: StmtKind,
    /// Source range (for compound statements, the header only)
    pub span: Span,
    /// Whether the statement starts on a line already occupied by an earlier
    /// statement (`a = 1; b = 2`, or `if c: x = 1`). Inline statements do not
    /// produce line events.
    pub inline: bool,
}

impl Stmt {
    /// Line on which the statement starts
    pub fn line(&self) -> usize {
        self.span.start.line
    }
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its side effects
    Expr(Expr),
    /// `t1 = t2 = value`
    Assign {
        /// One or more targets, assigned left to right
        targets: Vec<Expr>,
        /// Right-hand side
        value: Expr,
    },
    /// `target op= value`
    AugAssign {
        /// Name or subscript
        target: Expr,
        /// The arithmetic operator
        op: BinOp,
        /// Right-hand side
        value: Expr,
    },
    /// `if`/`elif`/`else`; an `elif` is a nested `If` as the only `orelse` item
    If {
        /// Condition
        test: Expr,
        /// Taken branch
        body: Vec<Stmt>,
        /// `elif`/`else` branch
        orelse: Vec<Stmt>,
    },
    /// `while test: ... else: ...`
    While {
        /// Loop condition
        test: Expr,
        /// Loop body
        body: Vec<Stmt>,
        /// Runs when the loop ends without `break`
        orelse: Vec<Stmt>,
    },
    /// `for target in iter: ... else: ...`
    For {
        /// Loop variable(s)
        target: Expr,
        /// Iterated expression
        iter: Expr,
        /// Loop body
        body: Vec<Stmt>,
        /// Runs when the loop ends without `break`
        orelse: Vec<Stmt>,
    },
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `pass`
    Pass,
    /// `return [value]`
    Return(Option<Expr>),
    /// `assert test[, msg]`
    Assert {
        /// Asserted condition
        test: Expr,
        /// Optional message
        msg: Option<Expr>,
    },
    /// `def name(params): body`
    FunctionDef(Rc<FunctionDef>),
}

/// A function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Span of the name token
    pub name_span: Span,
    /// Parameters in declaration order
    pub params: Vec<Param>,
    /// Function body
    pub body: Vec<Stmt>,
    /// Parameters followed by every other local, in first-appearance order
    pub locals: Vec<String>,
}

/// A function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Span of the name token
    pub span: Span,
    /// Default value, evaluated when the `def` executes
    pub default: Option<Expr>,
}

/// An expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// What kind of expression
    pub kind: ExprKind,
    /// Source range
    pub span: Span,
}

impl Expr {
    /// Build an expression node
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Whether a name is read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    /// Read
    Load,
    /// Write
    Store,
}

/// Kind of comprehension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    /// `[e for ...]`
    List,
    /// `(e for ...)`, evaluated eagerly
    Generator,
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal (adjacent literals already concatenated)
    Str(Rc<str>),
    /// `True` / `False`
    Bool(bool),
    /// `None`
    NoneLit,
    /// Variable reference
    Name {
        /// Identifier
        id: String,
        /// Read or write
        ctx: ExprContext,
    },
    /// `[a, b]`
    List(Vec<Expr>),
    /// `(a, b)` or `a, b`
    Tuple(Vec<Expr>),
    /// `{k: v}`
    Dict(Vec<(Expr, Expr)>),
    /// List comprehension or generator expression
    Comprehension {
        /// List or generator
        kind: ComprehensionKind,
        /// Produced element
        element: Box<Expr>,
        /// `for ... in ... if ...` clauses
        generators: Vec<Generator>,
    },
    /// `value[index]`
    Subscript {
        /// Indexed container
        value: Box<Expr>,
        /// Index, possibly a [`ExprKind::Slice`]
        index: Box<Expr>,
    },
    /// `lower:upper:step`, only valid as a subscript index
    Slice {
        /// Start bound
        lower: Option<Box<Expr>>,
        /// End bound
        upper: Option<Box<Expr>>,
        /// Stride
        step: Option<Box<Expr>>,
    },
    /// `func(args, name=value)`
    Call {
        /// Callee
        func: Box<Expr>,
        /// Positional arguments
        args: Vec<Expr>,
        /// Keyword arguments
        keywords: Vec<Keyword>,
    },
    /// `value.attr`, only valid as a method callee
    Attribute {
        /// Receiver
        value: Box<Expr>,
        /// Attribute name
        attr: String,
    },
    /// `-x`, `+x`, `~x`, `not x`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// `left op right`
    Binary {
        /// Left operand
        left: Box<Expr>,
        /// Operator
        op: BinOp,
        /// Right operand
        right: Box<Expr>,
    },
    /// `left op1 c1 op2 c2 ...`
    Compare {
        /// Leftmost operand
        left: Box<Expr>,
        /// Operators, one per comparator
        ops: Vec<CmpOp>,
        /// Remaining operands
        comparators: Vec<Expr>,
    },
    /// `a and b`, `a or b` (flattened)
    Logical {
        /// Operator
        op: LogicalOp,
        /// Two or more operands
        values: Vec<Expr>,
    },
    /// `body if test else orelse`
    IfExp {
        /// Condition
        test: Box<Expr>,
        /// Value when true
        body: Box<Expr>,
        /// Value when false
        orelse: Box<Expr>,
    },
}

/// One `for target in iter if cond...` clause of a comprehension
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    /// Loop variable(s)
    pub target: Expr,
    /// Iterated expression
    pub iter: Expr,
    /// Filters
    pub conds: Vec<Expr>,
}

/// `name=value` call argument
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// Argument name
    pub name: String,
    /// Argument value
    pub value: Expr,
}

/// Binary arithmetic and bitwise operators
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

impl BinOp {
    /// Source text of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::LShift => "<<",
            Self::RShift => ">>",
        }
    }

    /// Operator for an augmented assignment token such as `+=`
    pub fn from_augmented(token: &str) -> Option<Self> {
        Some(match token {
            "+=" => Self::Add,
            "-=" => Self::Sub,
            "*=" => Self::Mul,
            "/=" => Self::Div,
            "//=" => Self::FloorDiv,
            "%=" => Self::Mod,
            "**=" => Self::Pow,
            "&=" => Self::BitAnd,
            "|=" => Self::BitOr,
            "^=" => Self::BitXor,
            "<<=" => Self::LShift,
            ">>=" => Self::RShift,
            _ => return None,
        })
    }
}

/// Comparison operators
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CmpOp {
    /// Source text of the operator
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtE => "<=",
            Self::Gt => ">",
            Self::GtE => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Is => "is",
            Self::IsNot => "is not",
        }
    }
}

/// Unary operators
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Not,
}

/// Short-circuit boolean operators
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
