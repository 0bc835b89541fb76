// src/core/state_machine/state_update.rs
use crate::core::ast::{Expr, ExprKind, UnaryOp};

/// One link of a call chain such as `ctx.Sleep(d).ThenJump(s.next)`.
///
/// Links point at their receiver. A chain invoked directly on the context
/// parameter has no link for the context itself; its head is marked `is_context`.
#[derive(Debug, Clone)]
pub struct StateUpdate<'e> {
    pub name: String,
    pub args: &'e [Expr],
    pub parent: Option<Box<StateUpdate<'e>>>,
    pub is_call: bool,
    pub is_context: bool,
}

/// Chain-building verbs with dedicated handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    CallSubroutine,
    Error,
    Stay,
    Stop,
    Replace,
    ReplaceWith,
    /// Deprecated, reported as unsupported
    ThenRepeatOrElse,
    ThenRepeatOrJump,
    ThenRepeatOrJumpExt,
    Repeat,
    RestoreStep,
    /// Any other `Then*` verb; `ext` verbs take a slot step argument
    Then { ext: bool },
    Other { ext: bool },
}

impl Verb {
    pub fn classify(name: &str) -> Self {
        match name {
            "CallSubroutine" => Self::CallSubroutine,
            "Error" | "Errorf" => Self::Error,
            "Stay" => Self::Stay,
            "Stop" => Self::Stop,
            "Replace" => Self::Replace,
            "ReplaceWith" => Self::ReplaceWith,
            "ThenRepeatOrElse" => Self::ThenRepeatOrElse,
            "ThenRepeatOrJump" => Self::ThenRepeatOrJump,
            "ThenRepeatOrJumpExt" => Self::ThenRepeatOrJumpExt,
            "Repeat" => Self::Repeat,
            "RestoreStep" => Self::RestoreStep,
            _ => {
                let ext = name.ends_with("Ext");
                if name.starts_with("Then") {
                    Self::Then { ext }
                } else {
                    Self::Other { ext }
                }
            }
        }
    }
}

impl<'e> StateUpdate<'e> {
    /// Build the chain ending at `expr`. Returns `None` for shapes that are not
    /// call chains (literals, operators, `nil`).
    pub fn from_expr(expr: &'e Expr, context_arg: Option<&str>) -> Option<Self> {
        match &expr.kind {
            ExprKind::Call { func, args } => match &func.kind {
                ExprKind::Selector { base, member } => {
                    Some(Self::link(member, args, true, base, context_arg))
                }
                ExprKind::Ident(name) => Some(Self::head(name.clone(), args, true)),
                ExprKind::Paren(inner) => {
                    let mut su = Self::from_expr(inner, context_arg)?;
                    su.args = args.as_slice();
                    su.is_call = true;
                    Some(su)
                }
                _ => None,
            },
            ExprKind::Selector { base, member } => {
                Some(Self::link(member, &[], false, base, context_arg))
            }
            ExprKind::Ident(name) => {
                if name == "nil" || Some(name.as_str()) == context_arg {
                    None
                } else {
                    Some(Self::head(name.clone(), &[], false))
                }
            }
            ExprKind::Composite { .. } => {
                expr.literal_type_name().map(|name| Self::head(name, &[], false))
            }
            ExprKind::Unary { op: UnaryOp::Addr, operand } => match operand.kind {
                ExprKind::Composite { .. } => Self::from_expr(operand, context_arg),
                _ => None,
            },
            ExprKind::Paren(inner) => Self::from_expr(inner, context_arg),
            _ => None,
        }
    }

    fn head(name: String, args: &'e [Expr], is_call: bool) -> Self {
        Self { name, args, parent: None, is_call, is_context: false }
    }

    fn link(
        member: &str,
        args: &'e [Expr],
        is_call: bool,
        base: &'e Expr,
        context_arg: Option<&str>,
    ) -> Self {
        let on_context = matches!(
            (&base.kind, context_arg),
            (ExprKind::Ident(name), Some(ctx)) if name == ctx
        );
        let parent = if on_context {
            None
        } else {
            Self::from_expr(base, context_arg).map(Box::new)
        };

        Self {
            name: member.to_string(),
            args,
            parent,
            is_call,
            is_context: on_context,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    /// This link followed by its receivers, up to the chain root
    pub fn ancestry(&self) -> Vec<&StateUpdate<'e>> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Dotted names from the root to this link: `s.stepNext`
    pub fn full_name(&self) -> String {
        let names: Vec<&str> = self.ancestry().iter().rev().map(|su| su.name.as_str()).collect();
        names.join(".")
    }
}
