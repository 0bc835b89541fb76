// src/core/test_support.rs
//! Expression tree builders and a scripted scanner for unit tests.

use std::collections::HashMap;

use super::ast::{BinaryOp, Block, Expr, ExprKind, FuncLit, Param, Span, Stmt, UnaryOp};
use super::state_machine::{MethodDecl, MethodKind, SourceScanner};

pub fn ident(name: &str) -> Expr {
    Expr::synthetic(ExprKind::Ident(name.to_string()))
}

pub fn lit(value: &str) -> Expr {
    Expr::synthetic(ExprKind::BasicLit(value.to_string()))
}

pub fn sel(base: Expr, member: &str) -> Expr {
    Expr::synthetic(ExprKind::Selector { base: Box::new(base), member: member.to_string() })
}

pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::Call { func: Box::new(func), args })
}

/// `receiver.method(args...)`
pub fn method(receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
    call(sel(receiver, name), args)
}

pub fn not(operand: Expr) -> Expr {
    unary(UnaryOp::Not, operand)
}

pub fn addr(operand: Expr) -> Expr {
    unary(UnaryOp::Addr, operand)
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::synthetic(ExprKind::Unary { op, operand: Box::new(operand) })
}

pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::synthetic(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) })
}

pub fn composite(ty: Expr, elements: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::Composite { ty: Some(Box::new(ty)), elements })
}

pub fn key_value(key: &str, value: Expr) -> Expr {
    Expr::synthetic(ExprKind::KeyValue { key: Box::new(ident(key)), value: Box::new(value) })
}

pub fn verbatim(start: usize, end: usize) -> Expr {
    Expr::new(ExprKind::Verbatim, Span::new(start, end))
}

pub fn param(name: &str, ty: Expr) -> Param {
    Param { names: vec![name.to_string()], ty }
}

pub fn exec_ctx_param() -> Param {
    param("ctx", sel(ident("smachine"), "ExecutionContext"))
}

pub fn func_lit(params: Vec<Param>, stmts: Vec<Stmt>) -> Expr {
    Expr::synthetic(ExprKind::FuncLit(Box::new(FuncLit { params, body: Block { stmts } })))
}

pub fn ret(expr: Expr) -> Stmt {
    Stmt::Return(vec![expr])
}

pub fn if_stmt(cond: Expr, then: Vec<Stmt>, otherwise: Option<Stmt>) -> Stmt {
    Stmt::If { cond, then: Block { stmts: then }, otherwise: otherwise.map(Box::new) }
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block { stmts }
}

/// `ctx.<verb>(args...)` with `ctx` as the context parameter
pub fn ctx_call(verb: &str, args: Vec<Expr>) -> Expr {
    method(ident("ctx"), verb, args)
}

/// Execution step of `SMTest` with `ctx` bound as its context argument
pub fn exec_step(name: &str) -> MethodDecl {
    let mut md = MethodDecl::new("SMTest", "*SMTest", "s", name, MethodKind::Execution);
    md.context_arg = Some("ctx".to_string());
    md
}

/// Scanner with scripted excerpts and the default context types
pub struct ScriptedScanner {
    source: String,
    context_types: HashMap<String, MethodKind>,
}

impl ScriptedScanner {
    pub fn new() -> Self {
        Self::with_source("")
    }

    pub fn with_source(source: &str) -> Self {
        let mut context_types = HashMap::new();
        context_types.insert("ExecutionContext".to_string(), MethodKind::Execution);
        context_types.insert("MigrationContext".to_string(), MethodKind::Migration);
        context_types.insert("ConstructionContext".to_string(), MethodKind::Construction);
        Self { source: source.to_string(), context_types }
    }
}

impl SourceScanner for ScriptedScanner {
    fn excerpt(&self, span: Span, max_len: usize) -> String {
        let end = span.end.min(self.source.len());
        let start = span.start.min(end);
        self.source[start..end].chars().take(max_len).collect()
    }

    fn find_context_arg(&self, params: &[Param]) -> Option<(MethodKind, String)> {
        params.iter().find_map(|p| {
            let (_, type_name) = p.ty.selector_parts();
            let kind = *self.context_types.get(&type_name)?;
            p.names.first().map(|name| (kind, name.clone()))
        })
    }
}
