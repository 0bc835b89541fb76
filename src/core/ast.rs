// src/core/ast.rs
//! Expression tree for analyzed method bodies.
//!
//! This is the representation front-ends hand to the state machine trace. It
//! models the subset of Go syntax that step-builder code is written in; anything
//! else is carried as [`ExprKind::Verbatim`] (source span only) or
//! [`ExprKind::Unsupported`].

use serde::{Deserialize, Serialize};

/// Byte range in the source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    Ident(String),
    /// Literal kept exactly as written (`42`, `"text"`)
    BasicLit(String),
    Selector {
        base: Box<Expr>,
        member: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    FuncLit(Box<FuncLit>),
    Composite {
        ty: Option<Box<Expr>>,
        elements: Vec<Expr>,
    },
    KeyValue {
        key: Box<Expr>,
        value: Box<Expr>,
    },
    Paren(Box<Expr>),
    Index(Box<Expr>),
    Slice(Box<Expr>),
    TypeAssert(Box<Expr>),
    Star(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Known source range, no structural model
    Verbatim,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Addr,
    Not,
    Xor,
    Neg,
    Plus,
    Recv,
}

impl UnaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "&" => Some(Self::Addr),
            "!" => Some(Self::Not),
            "^" => Some(Self::Xor),
            "-" => Some(Self::Neg),
            "+" => Some(Self::Plus),
            "<-" => Some(Self::Recv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    LogAnd,
    LogOr,
    Eql,
    Neq,
    Lss,
    Gtr,
    Leq,
    Geq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Quo => "/",
            Self::Rem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::AndNot => "&^",
            Self::LogAnd => "&&",
            Self::LogOr => "||",
            Self::Eql => "==",
            Self::Neq => "!=",
            Self::Lss => "<",
            Self::Gtr => ">",
            Self::Leq => "<=",
            Self::Geq => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Quo,
            "%" => Self::Rem,
            "&" => Self::And,
            "|" => Self::Or,
            "^" => Self::Xor,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            "&^" => Self::AndNot,
            "&&" => Self::LogAnd,
            "||" => Self::LogOr,
            "==" => Self::Eql,
            "!=" => Self::Neq,
            "<" => Self::Lss,
            ">" => Self::Gtr,
            "<=" => Self::Leq,
            ">=" => Self::Geq,
            _ => return None,
        };
        Some(op)
    }
}

/// Anonymous function: `func(ctx smachine.ExecutionContext) smachine.StateUpdate { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncLit {
    pub params: Vec<Param>,
    pub body: Block,
}

/// One parameter group (`a, b int` has two names)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub names: Vec<String>,
    pub ty: Expr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Return(Vec<Expr>),
    If {
        cond: Expr,
        then: Block,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    Switch {
        #[serde(default)]
        tag: Option<Expr>,
        clauses: Vec<CaseClause>,
    },
    For {
        #[serde(default)]
        cond: Option<Expr>,
        body: Block,
    },
    Block(Block),
    Expr(Expr),
    Other,
}

/// `case a, b:` clause; no values means `default:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
}

impl CaseClause {
    pub fn is_default(&self) -> bool {
        self.values.is_empty()
    }
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { span, kind }
    }

    /// Node without a source position
    pub fn synthetic(kind: ExprKind) -> Self {
        Self { span: Span::default(), kind }
    }

    pub fn ident_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Splits `x` / `pkg.x` into `(qualifier, name)`; the qualifier is empty for a
    /// bare identifier. Any other shape yields two empty strings.
    pub fn selector_parts(&self) -> (String, String) {
        match &self.kind {
            ExprKind::Ident(name) => (String::new(), name.clone()),
            ExprKind::Selector { base, member } => match base.dotted_path() {
                Some(path) => (path, member.clone()),
                None => (String::new(), String::new()),
            },
            _ => (String::new(), String::new()),
        }
    }

    /// `pkg.Type{}` or `Type{}` for a composite literal of a named type
    pub fn literal_type_name(&self) -> Option<String> {
        let ExprKind::Composite { ty: Some(ty), .. } = &self.kind else {
            return None;
        };
        match ty.selector_parts() {
            (_, name) if name.is_empty() => None,
            (qualifier, name) if qualifier.is_empty() => Some(format!("{}{{}}", name)),
            (qualifier, name) => Some(format!("{}.{}{{}}", qualifier, name)),
        }
    }

    /// `a.b.c` for pure identifier/selector chains
    pub fn dotted_path(&self) -> Option<String> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name.clone()),
            ExprKind::Selector { base, member } => {
                base.dotted_path().map(|path| format!("{}.{}", path, member))
            }
            _ => None,
        }
    }
}
