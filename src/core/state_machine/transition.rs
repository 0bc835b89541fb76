// src/core/state_machine/transition.rs
//! Classification of returned call chains into transitions.

use super::exec_trace::ExecTrace;
use super::state_update::{StateUpdate, Verb};
use super::{MethodKind, MethodTransition, TransitionTarget};

impl<'a> ExecTrace<'a> {
    /// Record the transition produced by the chain ending at `su`
    pub(crate) fn add_transition(&mut self, su: &StateUpdate<'_>) {
        let mut mt = MethodTransition::default();
        if let Some(frame) = self.nearest_frame() {
            mt.condition = Some(self.renderer().build_condition(frame, self.limits.max_condition_len));
        }
        match self.active_migration().cloned() {
            Some(migration) => {
                let hook = self.resolve_inline(&migration, MethodKind::Execution);
                mt.migration = Some(hook).filter(|h| !h.is_empty());
            }
            None => mt.inherit_migration = true,
        }

        match self.md.kind {
            MethodKind::DeclarationInit | MethodKind::Construction => {
                mt.target = TransitionTarget::step(su.full_name());
            }
            MethodKind::Execution | MethodKind::Migration | MethodKind::Other => {
                if !self.add_context_op_transition(su, &mut mt) {
                    if mt.target.is_stay() {
                        return;
                    }
                    mt.target = TransitionTarget::Unknown;
                }
            }
        }
        self.md.add_transition(mt);
    }

    /// Fill `mt` according to the verb of `su`. Returns false when the chain
    /// could not be classified.
    fn add_context_op_transition(&mut self, su: &StateUpdate<'_>, mt: &mut MethodTransition) -> bool {
        match Verb::classify(&su.name) {
            Verb::CallSubroutine => return self.add_subroutine_call(su, mt),
            Verb::Error => {
                mt.operation = Some("Error".to_string());
                mt.target = TransitionTarget::Stop;
                mt.inherit_migration = false;
                return true;
            }
            Verb::Stay => {
                mt.operation = None;
                return false;
            }
            Verb::Stop => {
                mt.target = TransitionTarget::Stop;
                mt.inherit_migration = false;
                return true;
            }
            verb @ (Verb::Replace | Verb::ReplaceWith) => {
                mt.operation = Some("Replace".to_string());
                mt.inherit_migration = false;
                let kind = if verb == Verb::Replace {
                    MethodKind::Construction
                } else {
                    MethodKind::Other
                };
                let Some(arg) = su.args.first() else {
                    return false;
                };
                mt.target = TransitionTarget::step(self.resolve_inline(arg, kind));
                return !mt.target.is_stay();
            }
            Verb::ThenRepeatOrElse => {
                self.apply_parent_operation(su, mt);
                mt.target = TransitionTarget::Unsupported(su.name.clone());
                return false;
            }
            Verb::ThenRepeatOrJump => {
                self.apply_parent_operation(su, mt);
                let Some(arg) = su.args.first() else {
                    return false;
                };
                self.md.add_repeat_marker(mt.clone());
                mt.target = TransitionTarget::step(self.resolve_inline(arg, MethodKind::Execution));
                return !mt.target.is_stay();
            }
            Verb::ThenRepeatOrJumpExt => {
                self.apply_parent_operation(su, mt);
                self.md.add_repeat_marker(mt.clone());
            }
            Verb::Repeat => {
                if su.args.is_empty() {
                    return false;
                }
                let count = self.renderer().shorten_args(su.args, self.limits.max_argument_len);
                mt.operation = Some(format!("Repeat({})", count));
                return true;
            }
            Verb::RestoreStep => {
                mt.wait_transition = true;
                mt.operation = Some(su.name.clone());
            }
            verb @ (Verb::Then { ext } | Verb::Other { ext }) => {
                if matches!(verb, Verb::Then { .. }) {
                    if let Some(parent) = su.parent.as_deref() {
                        if parent.name == "Sleep" || parent.name.starts_with("Wait") {
                            mt.wait_transition = true;
                        }
                    }
                    self.apply_parent_operation(su, mt);
                }

                if !ext {
                    let Some(arg) = su.args.first() else {
                        // the transition exists but names no further step
                        return true;
                    };
                    mt.target = TransitionTarget::step(self.resolve_inline(arg, MethodKind::Execution));
                    return !mt.target.is_stay();
                }
            }
        }

        // extended verbs take a SlotStep argument
        let Some(arg) = su.args.first() else {
            return false;
        };
        let (target, migration) = self.resolve_slot_step(arg);
        if migration.is_some() {
            mt.migration = migration;
            mt.inherit_migration = false;
        }
        mt.target = target;
        !mt.target.is_stay()
    }

    fn apply_parent_operation(&mut self, su: &StateUpdate<'_>, mt: &mut MethodTransition) {
        let operation = su.parent.as_deref().and_then(|parent| self.build_operation(parent));
        if let Some(op) = operation {
            mt.delayed_start = op.adapter.is_some();
            mt.operation = Some(op.text);
        }
    }

    /// `CallSubroutine(subroutineSM, migrateFn, exitFn)`:
    /// this step -> synthesized subroutine step -> exit step
    fn add_subroutine_call(&mut self, su: &StateUpdate<'_>, mt: &mut MethodTransition) -> bool {
        let [machine, migrate, exit] = su.args else {
            return false;
        };

        mt.operation = Some("CallSubroutine".to_string());
        let hook = self.resolve_inline(migrate, MethodKind::Migration);
        if !hook.is_empty() {
            mt.migration = Some(hook);
            mt.inherit_migration = false;
        }

        let name = format!(
            "{}.{}.{}",
            self.md.name,
            self.subroutine_name(machine),
            self.md.next_sub_step_ordinal()
        );
        mt.target = TransitionTarget::Step(name.clone());

        let idx = self.md.sub_steps.len();
        let sub = self.md.new_sub_step(&name, MethodKind::Other);
        sub.is_subroutine = true;
        sub.add_migration(mt.migration.clone());

        let exit_step = self.resolve_inline(exit, MethodKind::Execution);
        self.md.sub_steps[idx].add_transition(MethodTransition::to(TransitionTarget::step(exit_step.clone())));

        // the subroutine's migration does not apply to the caller; the exit step
        // receives the caller's settings once the subroutine returns
        mt.migration = None;
        mt.hidden_propagate = Some(exit_step).filter(|s| !s.is_empty());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast::Stmt;
    use crate::core::state_machine::{MethodDecl, TraceLimits};
    use crate::core::test_support::*;

    fn trace(md: &mut MethodDecl, stmts: Vec<Stmt>) {
        let scanner = ScriptedScanner::new();
        ExecTrace::new(md, &scanner, TraceLimits::default()).parse_func_body(&block(stmts));
    }

    fn step(name: &str) -> TransitionTarget {
        TransitionTarget::Step(name.to_string())
    }

    #[test]
    fn test_stop_only_body() {
        let mut md = exec_step("stepDone");
        trace(&mut md, vec![ret(ctx_call("Stop", vec![]))]);

        assert_eq!(md.transitions.len(), 1);
        let mt = &md.transitions[0];
        assert_eq!(mt.target, TransitionTarget::Stop);
        assert_eq!(mt.condition, None);
        assert!(!mt.inherit_migration);
    }

    #[test]
    fn test_stop_and_error_ignore_guards_for_inheritance() {
        let mut md = exec_step("stepCheck");
        trace(
            &mut md,
            vec![
                if_stmt(ident("bad"), vec![ret(ctx_call("Errorf", vec![lit("\"failed\"")]))], None),
                if_stmt(
                    ident("done"),
                    vec![
                        Stmt::Expr(ctx_call("SetDefaultMigration", vec![ident("migrate")])),
                        ret(ctx_call("Stop", vec![])),
                    ],
                    None,
                ),
            ],
        );

        assert_eq!(md.transitions.len(), 2);
        for mt in &md.transitions {
            assert_eq!(mt.target, TransitionTarget::Stop);
            assert!(!mt.inherit_migration);
        }
        assert_eq!(md.transitions[0].operation.as_deref(), Some("Error"));
        assert_eq!(md.transitions[0].condition.as_deref(), Some("[bad]"));
    }

    #[test]
    fn test_stay_is_never_recorded() {
        let mut md = exec_step("stepIdle");
        trace(
            &mut md,
            vec![
                if_stmt(ident("busy"), vec![ret(ctx_call("Stay", vec![]))], None),
                ret(ctx_call("Stay", vec![])),
            ],
        );
        assert!(md.transitions.is_empty());
    }

    #[test]
    fn test_repeat_or_jump() {
        let mut md = exec_step("stepPoll");
        trace(
            &mut md,
            vec![ret(method(
                ctx_call("Poll", vec![]),
                "ThenRepeatOrJump",
                vec![sel(ident("s"), "stepNext")],
            ))],
        );

        assert_eq!(md.transitions.len(), 2);
        assert!(md.transitions[0].target.is_stay());
        assert_eq!(md.transitions[0].operation.as_deref(), Some("Poll"));
        assert_eq!(md.transitions[1].target, step("s.stepNext"));
    }

    #[test]
    fn test_repeat_or_jump_ext_uses_slot_step() {
        let mut md = exec_step("stepPoll");
        let slot = composite(
            ident("SlotStep"),
            vec![key_value("Transition", sel(ident("s"), "stepNext"))],
        );
        trace(
            &mut md,
            vec![ret(method(ctx_call("Poll", vec![]), "ThenRepeatOrJumpExt", vec![slot]))],
        );

        assert_eq!(md.transitions.len(), 2);
        assert!(md.transitions[0].target.is_stay());
        assert_eq!(md.transitions[1].target, step("s.stepNext"));
    }

    #[test]
    fn test_repeat_records_count() {
        let mut md = exec_step("stepRetry");
        trace(&mut md, vec![ret(ctx_call("Repeat", vec![lit("10")]))]);

        assert_eq!(md.transitions.len(), 1);
        assert_eq!(md.transitions[0].operation.as_deref(), Some("Repeat(10)"));
        assert!(md.transitions[0].target.is_stay());
    }

    #[test]
    fn test_sleep_then_jump_is_wait_transition() {
        let mut md = exec_step("stepSleep");
        trace(
            &mut md,
            vec![ret(method(
                ctx_call("Sleep", vec![]),
                "ThenJump",
                vec![sel(ident("s"), "stepWake")],
            ))],
        );

        let mt = &md.transitions[0];
        assert!(mt.wait_transition);
        assert!(!mt.delayed_start);
        assert_eq!(mt.operation.as_deref(), Some("Sleep"));
        assert_eq!(mt.target, step("s.stepWake"));
    }

    #[test]
    fn test_sleep_then_jump_ext_takes_slot_step() {
        let mut md = exec_step("stepSleep");
        let slot = composite(
            ident("SlotStep"),
            vec![
                key_value("Transition", sel(ident("s"), "stepWake")),
                key_value("Migration", sel(ident("s"), "migrateWake")),
            ],
        );
        trace(
            &mut md,
            vec![ret(method(ctx_call("Sleep", vec![]), "ThenJumpExt", vec![slot]))],
        );

        assert_eq!(md.transitions.len(), 1);
        let mt = &md.transitions[0];
        assert!(mt.wait_transition);
        assert_eq!(mt.operation.as_deref(), Some("Sleep"));
        assert_eq!(mt.target, step("s.stepWake"));
        assert_eq!(mt.migration.as_deref(), Some("s.migrateWake"));
        assert!(!mt.inherit_migration);
    }

    #[test]
    fn test_delayed_start_adapter_chain() {
        let mut md = exec_step("stepCall");
        let chain = method(
            method(
                method(ctx_call("SomeAdapter", vec![]), "PrepareAsync", vec![]),
                "DelayedStart",
                vec![],
            ),
            "ThenJump",
            vec![sel(ident("s"), "stepResult")],
        );
        trace(&mut md, vec![ret(chain)]);

        assert_eq!(md.adapters.len(), 1);
        let mt = &md.transitions[0];
        assert!(mt.delayed_start);
        assert_eq!(mt.operation.as_deref(), Some("PrepareAsync().DelayedStart"));
        assert_eq!(mt.target, step("s.stepResult"));
    }

    #[test]
    fn test_call_subroutine() {
        let mut md = exec_step("stepStart");
        trace(
            &mut md,
            vec![ret(ctx_call(
                "CallSubroutine",
                vec![
                    sel(ident("s"), "child"),
                    sel(ident("s"), "migrateChild"),
                    sel(ident("s"), "stepAfterChild"),
                ],
            ))],
        );

        assert_eq!(md.sub_steps.len(), 1);
        let sub = &md.sub_steps[0];
        assert_eq!(sub.name, "stepStart.s.child.1");
        assert!(sub.is_subroutine);
        assert_eq!(sub.migration.as_deref(), Some("s.migrateChild"));
        assert_eq!(sub.transitions.len(), 1);
        assert_eq!(sub.transitions[0].target, step("s.stepAfterChild"));

        let mt = &md.transitions[0];
        assert_eq!(mt.target, step("stepStart.s.child.1"));
        assert_eq!(mt.operation.as_deref(), Some("CallSubroutine"));
        assert_eq!(mt.hidden_propagate.as_deref(), Some("s.stepAfterChild"));
        assert_eq!(mt.migration, None);
        assert!(!mt.inherit_migration);
    }

    #[test]
    fn test_call_subroutine_with_wrong_arity() {
        let mut md = exec_step("stepStart");
        trace(
            &mut md,
            vec![ret(ctx_call("CallSubroutine", vec![sel(ident("s"), "child")]))],
        );
        assert!(md.transitions.is_empty());
        assert!(md.sub_steps.is_empty());
    }

    #[test]
    fn test_replace_with_literal() {
        let mut md = exec_step("stepSwap");
        trace(
            &mut md,
            vec![ret(ctx_call("ReplaceWith", vec![addr(composite(ident("SMOther"), vec![]))]))],
        );

        let mt = &md.transitions[0];
        assert_eq!(mt.target, step("SMOther{}"));
        assert_eq!(mt.operation.as_deref(), Some("Replace"));
        assert!(md.sub_steps[0].is_subroutine);
    }

    #[test]
    fn test_unresolved_replace_is_dropped() {
        let mut md = exec_step("stepSwap");
        trace(&mut md, vec![ret(ctx_call("Replace", vec![lit("1")]))]);
        assert!(md.transitions.is_empty());
    }

    #[test]
    fn test_deprecated_repeat_or_else_is_unknown() {
        let mut md = exec_step("stepOld");
        trace(
            &mut md,
            vec![ret(method(ctx_call("Poll", vec![]), "ThenRepeatOrElse", vec![]))],
        );
        assert_eq!(md.transitions.len(), 1);
        assert_eq!(md.transitions[0].target, TransitionTarget::Unknown);
    }

    #[test]
    fn test_jump_ext_with_migration_only_slot_is_dropped() {
        let mut md = exec_step("stepSlot");
        let slot = composite(
            ident("SlotStep"),
            vec![key_value("Migration", sel(ident("s"), "migrate"))],
        );
        trace(&mut md, vec![ret(ctx_call("JumpExt", vec![slot]))]);
        assert!(md.transitions.is_empty());
    }

    #[test]
    fn test_jump_ext_with_dynamic_argument() {
        let mut md = exec_step("stepSlot");
        trace(
            &mut md,
            vec![ret(ctx_call("JumpExt", vec![method(ident("s"), "pickSlot", vec![])]))],
        );
        assert_eq!(md.transitions[0].target.to_string(), "DYNAMIC s.pickSlot()");
    }

    #[test]
    fn test_restore_step_without_argument_is_dropped() {
        let mut md = exec_step("stepRestore");
        trace(&mut md, vec![ret(ctx_call("RestoreStep", vec![]))]);
        assert!(md.transitions.is_empty());
    }

    #[test]
    fn test_construction_uses_full_name() {
        let mut md = MethodDecl::new("SMTest", "*SMTest", "s", "GetInitStateFor", MethodKind::DeclarationInit);
        trace(&mut md, vec![ret(sel(ident("s"), "stepInit"))]);

        assert_eq!(md.transitions[0].target, step("s.stepInit"));
        assert!(md.transitions[0].inherit_migration);
    }

    #[test]
    fn test_closure_migration_is_resolved_per_transition() {
        let mut md = exec_step("stepInit");
        let hook = func_lit(vec![exec_ctx_param()], vec![ret(ctx_call("Stop", vec![]))]);
        trace(
            &mut md,
            vec![
                Stmt::Expr(ctx_call("SetDefaultMigration", vec![hook])),
                if_stmt(ident("a"), vec![ret(ctx_call("Jump", vec![ident("stepA")]))], None),
                ret(ctx_call("Jump", vec![ident("stepB")])),
            ],
        );

        assert_eq!(md.transitions[0].migration.as_deref(), Some("stepInit.1"));
        assert_eq!(md.transitions[1].migration.as_deref(), Some("stepInit.2"));
        assert_eq!(md.sub_steps.len(), 2);
    }
}
