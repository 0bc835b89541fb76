// src/core/state_machine/exec_trace.rs
use tracing::debug;

use crate::core::ast::{BinaryOp, Block, CaseClause, Expr, ExprKind, Stmt};
use super::condition::{CondensedRenderer, GuardFrame};
use super::state_update::StateUpdate;
use super::{MethodDecl, SourceScanner, TraceLimits};

/// Context call that sets the migration hook for the rest of the step
const SET_DEFAULT_MIGRATION: &str = "SetDefaultMigration";

/// Walks one step body and records its transitions into `md`.
///
/// Closures met along the way are traced by their own `ExecTrace` into
/// sub-steps of `md`.
pub struct ExecTrace<'a> {
    pub(super) md: &'a mut MethodDecl,
    pub(super) scanner: &'a dyn SourceScanner,
    pub(super) limits: TraceLimits,
    frames: Vec<GuardFrame>,
    migration: Option<Expr>,
}

impl<'a> ExecTrace<'a> {
    pub fn new(md: &'a mut MethodDecl, scanner: &'a dyn SourceScanner, limits: TraceLimits) -> Self {
        Self {
            md,
            scanner,
            limits,
            frames: Vec::new(),
            migration: None,
        }
    }

    pub fn parse_func_body(&mut self, body: &Block) {
        self.walk_stmts(&body.stmts);
    }

    pub(super) fn renderer(&self) -> CondensedRenderer<'a> {
        CondensedRenderer::new(self.scanner)
    }

    pub(super) fn nearest_frame(&self) -> Option<&GuardFrame> {
        self.frames.last()
    }

    pub(super) fn active_migration(&self) -> Option<&Expr> {
        self.migration.as_ref()
    }

    fn walk_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Return(results) => {
                if let Some(result) = results.first() {
                    self.walk_return(result);
                }
            }
            Stmt::If { cond, then, otherwise } => {
                self.walk_if(cond, then, otherwise.as_deref(), Vec::new());
            }
            Stmt::Switch { tag, clauses } => self.walk_switch(tag.as_ref(), clauses),
            Stmt::For { cond: Some(cond), body } => {
                self.with_frame(GuardFrame::new(vec![cond.clone()], false), |t| {
                    t.parse_func_body(body)
                });
            }
            Stmt::For { cond: None, body } => self.parse_func_body(body),
            Stmt::Block(block) => self.parse_func_body(block),
            Stmt::Expr(expr) => self.walk_expr_stmt(expr),
            Stmt::Other => {}
        }
    }

    fn with_frame(&mut self, frame: GuardFrame, walk: impl FnOnce(&mut Self)) {
        self.frames.push(frame);
        walk(self);
        self.frames.pop();
    }

    /// `previous` holds the conditions of the `if`/`else if` branches already seen
    fn walk_if(&mut self, cond: &Expr, then: &Block, otherwise: Option<&Stmt>, mut previous: Vec<Expr>) {
        self.with_frame(GuardFrame::new(vec![cond.clone()], false), |t| {
            t.parse_func_body(then)
        });

        previous.push(cond.clone());
        match otherwise {
            Some(Stmt::If { cond, then, otherwise }) => {
                self.walk_if(cond, then, otherwise.as_deref(), previous);
            }
            Some(stmt) => {
                self.with_frame(GuardFrame::new(previous, true), |t| t.walk_stmt(stmt));
            }
            None => {}
        }
    }

    fn walk_switch(&mut self, tag: Option<&Expr>, clauses: &[CaseClause]) {
        let case_conds = |clause: &CaseClause| -> Vec<Expr> {
            clause
                .values
                .iter()
                .map(|value| match tag {
                    Some(tag) => Expr::synthetic(ExprKind::Binary {
                        op: BinaryOp::Eql,
                        left: Box::new(tag.clone()),
                        right: Box::new(value.clone()),
                    }),
                    None => value.clone(),
                })
                .collect()
        };
        let all: Vec<Expr> = clauses.iter().flat_map(case_conds).collect();

        for clause in clauses {
            if !clause.is_default() {
                self.with_frame(GuardFrame::new(case_conds(clause), false), |t| {
                    t.walk_stmts(&clause.body)
                });
            } else if all.is_empty() {
                self.walk_stmts(&clause.body);
            } else {
                self.with_frame(GuardFrame::new(all.clone(), true), |t| {
                    t.walk_stmts(&clause.body)
                });
            }
        }
    }

    fn walk_return(&mut self, result: &Expr) {
        match StateUpdate::from_expr(result, self.md.context_arg.as_deref()) {
            Some(su) => self.add_transition(&su),
            None => debug!("{}: return value is not a call chain, skipped", self.md.name),
        }
    }

    fn walk_expr_stmt(&mut self, expr: &Expr) {
        let Some(su) = StateUpdate::from_expr(expr, self.md.context_arg.as_deref()) else {
            return;
        };

        if su.is_context && su.name == SET_DEFAULT_MIGRATION {
            self.migration = su
                .args
                .first()
                .filter(|arg| arg.ident_name() != Some("nil"))
                .cloned();
            return;
        }

        self.record_adapter_call(&su);
    }
}
