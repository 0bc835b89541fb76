//! Step graph extraction for fluent state machine code.
//!
//! A step body is walked statement by statement. Every returned call chain
//! (`ctx.Sleep().ThenJump(s.stepNext)`) is matched against the known verbs and
//! recorded as a [`MethodTransition`] of the owning [`MethodDecl`]. Inline
//! closures and typed literals become synthesized sub-steps.

mod adapter;
mod condition;
mod exec_trace;
mod inline;
mod method_decl;
mod scanner;
mod state_update;
mod transition;

pub use condition::{CondensedRenderer, GuardFrame};
pub use exec_trace::ExecTrace;
pub use method_decl::{
    AdapterCall, MethodDecl, MethodKind, MethodTransition, StateMachineGraph, TransitionTarget,
    DYNAMIC_PREFIX, STOP_MARKER, UNKNOWN_MARKER,
};
pub use scanner::{SourceScanner, TraceLimits};
pub use state_update::{StateUpdate, Verb};

use crate::core::ast::FuncLit;

/// Bind the parameters of `func` to `md` and trace its body
pub fn trace_method(md: &mut MethodDecl, func: &FuncLit, scanner: &dyn SourceScanner, limits: TraceLimits) {
    md.bind_params(&func.params, scanner);
    ExecTrace::new(md, scanner, limits).parse_func_body(&func.body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast::Block;
    use crate::core::test_support::*;

    #[test]
    fn test_trace_method_binds_context_and_traces() {
        let mut md = MethodDecl::new("SMTest", "*SMTest", "s", "stepStart", MethodKind::Execution);
        let func = FuncLit {
            params: vec![exec_ctx_param()],
            body: Block {
                stmts: vec![ret(method(
                    ctx_call("Sleep", vec![]),
                    "ThenJump",
                    vec![sel(ident("s"), "stepWake")],
                ))],
            },
        };

        trace_method(&mut md, &func, &ScriptedScanner::new(), TraceLimits::default());

        assert_eq!(md.context_arg.as_deref(), Some("ctx"));
        assert_eq!(md.transitions.len(), 1);
        assert_eq!(md.transitions[0].target.to_string(), "s.stepWake");
    }

    #[test]
    fn test_wrong_context_type_leaves_chain_unbound() {
        let mut md = MethodDecl::new("SMTest", "*SMTest", "s", "migrateOld", MethodKind::Migration);
        let func = FuncLit {
            params: vec![exec_ctx_param()],
            body: Block { stmts: vec![ret(ctx_call("Stop", vec![]))] },
        };

        trace_method(&mut md, &func, &ScriptedScanner::new(), TraceLimits::default());

        // `ctx` is not the migration context, so the chain keeps `ctx` as its root
        assert_eq!(md.context_arg, None);
        assert_eq!(md.transitions[0].target, TransitionTarget::Stop);
    }
}
