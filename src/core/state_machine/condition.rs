// src/core/state_machine/condition.rs
//! Length-bounded rendering of guard conditions and call arguments.

use crate::core::ast::{Expr, ExprKind, UnaryOp};
use super::SourceScanner;

const ELLIPSIS: &str = "...";
const SEPARATOR: &str = " || ";
/// Remaining budget below which further guard entries are elided
const MIN_SEGMENT_BUDGET: usize = 3;

/// Guard expressions that hold for the statements currently being traced.
///
/// A frame with several entries stands for "any of them"; an inverted frame
/// stands for "none of them" (an `else` after an `if`/`else if` chain, or a
/// `default:` clause).
#[derive(Debug, Clone, PartialEq)]
pub struct GuardFrame {
    pub conds: Vec<Expr>,
    pub inverted: bool,
}

impl GuardFrame {
    pub fn new(conds: Vec<Expr>, inverted: bool) -> Self {
        Self { conds, inverted }
    }
}

pub struct CondensedRenderer<'s> {
    scanner: &'s dyn SourceScanner,
}

impl<'s> CondensedRenderer<'s> {
    pub fn new(scanner: &'s dyn SourceScanner) -> Self {
        Self { scanner }
    }

    /// Render `expr` within `budget`, falling back to a source excerpt when the
    /// structure yields nothing
    pub fn render(&self, expr: &Expr, budget: usize) -> String {
        let s = self.shorten(expr, budget);
        if !s.is_empty() {
            return s;
        }
        self.scanner.excerpt(expr.span, budget)
    }

    /// Only the first argument is shown
    pub fn shorten_args(&self, args: &[Expr], budget: usize) -> String {
        args.first()
            .map(|arg| self.render(arg, budget))
            .unwrap_or_default()
    }

    /// `[cond]`, `![cond]`, or `[a || b || ...]` for multi-entry frames
    pub fn build_condition(&self, frame: &GuardFrame, budget: usize) -> String {
        let text = match frame.conds.as_slice() {
            [] => String::new(),
            [single] => self.render(single, budget),
            [first, rest @ ..] => {
                let mut out = self.render(first, budget);
                for cond in rest {
                    let remaining = budget.saturating_sub(out.len());
                    if remaining > MIN_SEGMENT_BUDGET {
                        let segment = self.render(cond, remaining.saturating_sub(SEPARATOR.len()));
                        if SEPARATOR.len() + segment.len() <= remaining {
                            out.push_str(SEPARATOR);
                            out.push_str(&segment);
                            continue;
                        }
                    }
                    out.push_str(ELLIPSIS);
                    break;
                }
                clamp(out, budget)
            }
        };

        let quoted = format!("{:?}", text);
        let inner = &quoted[1..quoted.len() - 1];
        if frame.inverted {
            format!("![{}]", inner)
        } else {
            format!("[{}]", inner)
        }
    }

    fn shorten(&self, expr: &Expr, budget: usize) -> String {
        match &expr.kind {
            ExprKind::Selector { base, member } => {
                if member.len() >= budget {
                    return format!("(...).{}", member);
                }
                format!("{}.{}", self.shorten(base, budget - member.len() - 1), member)
            }
            ExprKind::Ident(name) => name.clone(),
            ExprKind::BasicLit(value) => value.clone(),
            ExprKind::Call { func, .. } => {
                format!("{}()", self.shorten(func, budget.saturating_sub(2)))
            }
            ExprKind::FuncLit(_) => "func(){}".to_string(),
            ExprKind::Composite { ty, .. } => {
                let ty = ty
                    .as_deref()
                    .map(|t| self.shorten(t, budget.saturating_sub(2)))
                    .unwrap_or_default();
                format!("{}{{}}", ty)
            }
            ExprKind::Paren(inner) => {
                format!("({})", self.shorten(inner, budget.saturating_sub(2)))
            }
            ExprKind::Index(base) | ExprKind::Slice(base) => {
                format!("{}[]", self.shorten(base, budget.saturating_sub(2)))
            }
            ExprKind::TypeAssert(inner) | ExprKind::Star(inner) => self.shorten(inner, budget),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => format!("!{}", self.shorten(operand, budget.saturating_sub(1))),
                UnaryOp::Xor => format!("^{}", self.shorten(operand, budget.saturating_sub(1))),
                UnaryOp::Neg => format!("-{}", self.shorten(operand, budget.saturating_sub(1))),
                UnaryOp::Addr | UnaryOp::Plus | UnaryOp::Recv => self.shorten(operand, budget),
            },
            ExprKind::Binary { op, left, right } => {
                let tok = op.symbol();
                let s = format!(
                    "{}{}",
                    tok,
                    self.shorten(right, budget.saturating_sub(1 + tok.len()))
                );
                if s.len() >= budget {
                    return format!("{}{}", ELLIPSIS, s);
                }
                format!("{}{}", self.shorten(left, budget - s.len()), s)
            }
            ExprKind::Verbatim => String::new(),
            ExprKind::KeyValue { .. } | ExprKind::Unsupported => "(...)".to_string(),
        }
    }
}

/// Cut `text` to `budget` bytes, marking the cut with an ellipsis
fn clamp(text: String, budget: usize) -> String {
    if text.len() <= budget {
        return text;
    }
    let mut cut = budget.saturating_sub(ELLIPSIS.len());
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ast::BinaryOp;
    use crate::core::test_support::*;

    fn frame(conds: Vec<Expr>, inverted: bool) -> GuardFrame {
        GuardFrame::new(conds, inverted)
    }

    #[test]
    fn test_identifier_is_unchanged() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        assert_eq!(renderer.render(&ident("ready"), 40), "ready");
    }

    #[test]
    fn test_selector_degrades_when_member_exceeds_budget() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        let expr = sel(ident("s"), "veryLongMemberName");

        assert_eq!(renderer.render(&expr, 40), "s.veryLongMemberName");
        assert_eq!(renderer.render(&expr, 10), "(...).veryLongMemberName");
    }

    #[test]
    fn test_structural_shapes() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);

        let check = method(sel(ident("s"), "link"), "IsReady", vec![ident("ctx")]);
        assert_eq!(renderer.render(&check, 40), "s.link.IsReady()");
        assert_eq!(renderer.render(&not(check), 40), "!s.link.IsReady()");
        assert_eq!(
            renderer.render(&func_lit(vec![], vec![ret(ident("x"))]), 40),
            "func(){}"
        );
        assert_eq!(
            renderer.render(&addr(composite(ident("SlotStep"), vec![])), 40),
            "SlotStep{}"
        );
    }

    #[test]
    fn test_binary_allocates_right_to_left() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        let expr = binary(sel(ident("s"), "count"), BinaryOp::Geq, lit("10"));

        assert_eq!(renderer.render(&expr, 40), "s.count>=10");
        assert_eq!(renderer.render(&expr, 3), "...>=10");
    }

    #[test]
    fn test_verbatim_falls_back_to_excerpt() {
        let scanner = ScriptedScanner::with_source("if len(s.items) > 0 {");
        let renderer = CondensedRenderer::new(&scanner);
        assert_eq!(renderer.render(&verbatim(3, 14), 40), "len(s.items");
    }

    #[test]
    fn test_single_condition() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);

        let cond = sel(ident("s"), "done");
        assert_eq!(renderer.build_condition(&frame(vec![cond.clone()], false), 40), "[s.done]");
        assert_eq!(renderer.build_condition(&frame(vec![cond], true), 40), "![s.done]");
    }

    #[test]
    fn test_condition_escapes_quotes() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        let cond = binary(ident("mode"), BinaryOp::Eql, lit("\"fast\""));

        assert_eq!(
            renderer.build_condition(&frame(vec![cond], false), 40),
            r#"[mode==\"fast\"]"#
        );
    }

    #[test]
    fn test_multiple_conditions_within_budget() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        let conds = vec![ident("a"), ident("b"), ident("c")];

        assert_eq!(renderer.build_condition(&frame(conds, true), 40), "![a || b || c]");
    }

    #[test]
    fn test_multiple_conditions_are_elided() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        let budget = 20;
        let conds = vec![
            sel(ident("s"), "firstFlag"),
            sel(ident("s"), "secondFlag"),
            sel(ident("s"), "thirdFlag"),
        ];

        let rendered = renderer.build_condition(&frame(conds, false), budget);
        let inner = &rendered[1..rendered.len() - 1];
        assert!(inner.starts_with("s.firstFlag"));
        assert!(inner.ends_with("..."));
        assert!(inner.len() <= budget);
    }

    #[test]
    fn test_long_first_condition_is_clamped() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        let budget = 12;
        let conds = vec![
            sel(ident("s"), "extremelyLongFlagName"),
            ident("b"),
        ];

        let rendered = renderer.build_condition(&frame(conds, false), budget);
        let inner = &rendered[1..rendered.len() - 1];
        assert!(inner.ends_with("..."));
        assert!(inner.len() <= budget);
    }

    #[test]
    fn test_shorten_args_uses_first_argument() {
        let scanner = ScriptedScanner::new();
        let renderer = CondensedRenderer::new(&scanner);
        assert_eq!(renderer.shorten_args(&[lit("3"), ident("x")], 20), "3");
        assert_eq!(renderer.shorten_args(&[], 20), "");
    }
}
