// src/core/state_machine/inline.rs
//! Resolution of "next step" and "migration hook" arguments to step names.

use crate::core::ast::{Expr, ExprKind, FuncLit, UnaryOp};
use super::exec_trace::ExecTrace;
use super::{MethodKind, TransitionTarget};

const SLOT_STEP_TYPE: &str = "SlotStep";

impl<'a> ExecTrace<'a> {
    /// Name of the step `expr` refers to, synthesizing a sub-step for closures and
    /// typed literals. Empty when the expression cannot be resolved.
    pub(crate) fn resolve_inline(&mut self, expr: &Expr, kind: MethodKind) -> String {
        match &expr.kind {
            ExprKind::Unary { op: UnaryOp::Addr, operand } if !kind.has_state_update() => {
                return self.resolve_inline(operand, kind);
            }
            ExprKind::Composite { .. } if kind == MethodKind::Other => {
                if let Some(name) = expr.literal_type_name() {
                    self.md.new_sub_step(&name, MethodKind::Other).is_subroutine = true;
                    return name;
                }
            }
            ExprKind::FuncLit(func) => return self.trace_closure(func, kind),
            _ => {}
        }

        match expr.selector_parts() {
            (qualifier, name) if !qualifier.is_empty() => format!("{}.{}", qualifier, name),
            (_, name) if name != "nil" => name,
            _ => String::new(),
        }
    }

    /// Trace an anonymous function into a new sub-step named `<owner>.<ordinal>`
    fn trace_closure(&mut self, func: &FuncLit, kind: MethodKind) -> String {
        let name = format!("{}.{}", self.md.name, self.md.next_sub_step_ordinal());
        let scanner = self.scanner;
        let limits = self.limits;

        let sub = self.md.new_sub_step(&name, kind);
        sub.bind_params(&func.params, scanner);
        ExecTrace::new(sub, scanner, limits).parse_func_body(&func.body);

        name
    }

    /// Name used for the state machine passed to `CallSubroutine`; never creates steps
    pub(crate) fn subroutine_name(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Unary { op: UnaryOp::Addr, operand } => return self.subroutine_name(operand),
            ExprKind::Composite { .. } => {
                if let Some(name) = expr.literal_type_name() {
                    return name;
                }
            }
            _ => {}
        }

        match expr.selector_parts() {
            (qualifier, name) if !qualifier.is_empty() => format!("{}.{}", qualifier, name),
            (_, name) if !name.is_empty() => name,
            _ => self.renderer().render(expr, self.limits.max_argument_len),
        }
    }

    /// Resolve a `SlotStep{Transition: ..., Migration: ...}` argument.
    ///
    /// Anything else is a runtime-computed target and comes back as `Dynamic`.
    pub(crate) fn resolve_slot_step(&mut self, expr: &Expr) -> (TransitionTarget, Option<String>) {
        if let ExprKind::Composite { ty: Some(ty), elements } = &expr.kind {
            if ty.selector_parts().1 == SLOT_STEP_TYPE {
                let mut target = TransitionTarget::Stay;
                let mut migration = None;

                for element in elements {
                    let ExprKind::KeyValue { key, value } = &element.kind else {
                        continue;
                    };
                    match key.selector_parts() {
                        (qualifier, _) if !qualifier.is_empty() => {}
                        (_, key) if key == "Transition" => {
                            target = TransitionTarget::step(
                                self.resolve_inline(value, MethodKind::Execution),
                            );
                        }
                        (_, key) if key == "Migration" => {
                            let hook = self.resolve_inline(value, MethodKind::Migration);
                            migration = Some(hook).filter(|h| !h.is_empty());
                        }
                        _ => {}
                    }
                }
                return (target, migration);
            }
        }

        let rendered = self.renderer().render(expr, self.limits.max_argument_len);
        (TransitionTarget::Dynamic(rendered), None)
    }
}
