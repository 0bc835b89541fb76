use std::collections::BTreeMap;
use std::path::Path;
use tree_sitter::{Node, Parser};
use tracing::debug;

use crate::config::ParsingConfig;
use crate::core::ast::{
    BinaryOp, Block, CaseClause, Expr, ExprKind, FuncLit, Param, Span, Stmt, UnaryOp,
};
use crate::core::context_scanner::SourceFile;
use crate::core::state_machine::{trace_method, MethodDecl, MethodKind, SourceScanner, TraceLimits};
use crate::error::{SmtraceError, Result};
use super::LanguageParser;

/// Go step-builder parser using Tree-sitter
pub struct GoParser {
    parser: Parser,
    context_types: BTreeMap<String, MethodKind>,
    declaration_methods: Vec<String>,
    limits: TraceLimits,
}

impl GoParser {
    pub fn new(config: &ParsingConfig, limits: TraceLimits) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_go::LANGUAGE.into())
            .map_err(|e| SmtraceError::Parser(format!("Failed to set Go language: {}", e)))?;

        Ok(Self {
            parser,
            context_types: config.context_types.clone(),
            declaration_methods: config.declaration_methods.clone(),
            limits,
        })
    }
}

impl LanguageParser for GoParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Vec<MethodDecl>> {
        let tree = self.parser.parse(content, None).ok_or_else(|| {
            SmtraceError::Parser(format!("Failed to parse Go code in {}", file_path.display()))
        })?;

        let scanner = SourceFile::new(content, &self.context_types);
        let converter = Converter { source: content.as_bytes() };
        let mut methods = Vec::new();

        for node in named_children(tree.root_node()) {
            if node.kind() != "method_declaration" {
                continue;
            }
            let Some(method) = converter.method(node) else {
                continue;
            };

            let kind = if self.declaration_methods.contains(&method.name) {
                MethodKind::DeclarationInit
            } else {
                match scanner.find_context_arg(&method.func.params) {
                    Some((kind, _)) => kind,
                    None => continue,
                }
            };

            debug!("{}: tracing {:?} step {}.{}", file_path.display(), kind, method.state_machine, method.name);
            let mut md = MethodDecl::new(
                &method.state_machine,
                &method.receiver_type,
                &method.receiver_name,
                &method.name,
                kind,
            );
            trace_method(&mut md, &method.func, &scanner, self.limits);
            methods.push(md);
        }

        Ok(methods)
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn language_name(&self) -> &str {
        "go"
    }
}

/// A method declaration with its body converted
struct GoMethod {
    name: String,
    state_machine: String,
    receiver_type: String,
    receiver_name: String,
    func: FuncLit,
}

/// Converts Tree-sitter Go nodes into the trace expression tree
struct Converter<'s> {
    source: &'s [u8],
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn span_of(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

impl<'s> Converter<'s> {
    fn text(&self, node: Node<'_>) -> String {
        node.utf8_text(self.source).unwrap_or("").to_string()
    }

    fn method(&self, node: Node<'_>) -> Option<GoMethod> {
        let name = self.text(node.child_by_field_name("name")?);
        let receiver = named_children(node.child_by_field_name("receiver")?)
            .into_iter()
            .find(|child| child.kind() == "parameter_declaration")?;

        let receiver_name = receiver
            .child_by_field_name("name")
            .map(|n| self.text(n))
            .unwrap_or_default();
        let receiver_ty = receiver.child_by_field_name("type")?;
        let state_machine = self.base_type_name(receiver_ty)?;

        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();
        let body = node
            .child_by_field_name("body")
            .map(|b| self.block(b))
            .unwrap_or_default();

        Some(GoMethod {
            name,
            state_machine,
            receiver_type: self.text(receiver_ty),
            receiver_name,
            func: FuncLit { params, body },
        })
    }

    /// `SMTest` for `SMTest`, `*SMTest` and `*SMTest[T]`
    fn base_type_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "type_identifier" => Some(self.text(node)),
            "pointer_type" | "parenthesized_type" => {
                named_children(node).into_iter().next().and_then(|n| self.base_type_name(n))
            }
            "generic_type" => self.base_type_name(node.child_by_field_name("type")?),
            _ => None,
        }
    }

    fn params(&self, node: Node<'_>) -> Vec<Param> {
        named_children(node)
            .into_iter()
            .filter(|child| {
                matches!(child.kind(), "parameter_declaration" | "variadic_parameter_declaration")
            })
            .map(|decl| {
                let mut cursor = decl.walk();
                let names = decl
                    .children_by_field_name("name", &mut cursor)
                    .map(|n| self.text(n))
                    .collect();
                let ty = decl
                    .child_by_field_name("type")
                    .map(|t| self.expr(t))
                    .unwrap_or_else(|| Expr::new(ExprKind::Verbatim, span_of(decl)));
                Param { names, ty }
            })
            .collect()
    }

    fn block(&self, node: Node<'_>) -> Block {
        let mut stmts = Vec::new();
        for child in named_children(node) {
            self.push_stmt(child, &mut stmts);
        }
        Block { stmts }
    }

    fn push_stmt(&self, node: Node<'_>, out: &mut Vec<Stmt>) {
        match node.kind() {
            "statement_list" => {
                for child in named_children(node) {
                    self.push_stmt(child, out);
                }
            }
            "empty_statement" => {}
            _ => out.push(self.stmt(node)),
        }
    }

    fn stmt(&self, node: Node<'_>) -> Stmt {
        match node.kind() {
            "return_statement" => Stmt::Return(
                named_children(node)
                    .into_iter()
                    .next()
                    .map(|list| self.expr_list(list))
                    .unwrap_or_default(),
            ),
            "if_statement" => {
                let Some(cond) = node.child_by_field_name("condition") else {
                    return Stmt::Other;
                };
                let then = node
                    .child_by_field_name("consequence")
                    .map(|b| self.block(b))
                    .unwrap_or_default();
                let otherwise = node.child_by_field_name("alternative").map(|alt| {
                    let stmt = match alt.kind() {
                        "if_statement" => self.stmt(alt),
                        _ => Stmt::Block(self.block(alt)),
                    };
                    Box::new(stmt)
                });
                Stmt::If { cond: self.expr(cond), then, otherwise }
            }
            "expression_switch_statement" => Stmt::Switch {
                tag: node.child_by_field_name("value").map(|v| self.expr(v)),
                clauses: named_children(node)
                    .into_iter()
                    .filter(|c| matches!(c.kind(), "expression_case" | "default_case"))
                    .map(|c| self.case_clause(c))
                    .collect(),
            },
            "for_statement" => self.for_stmt(node),
            "block" => Stmt::Block(self.block(node)),
            "labeled_statement" => {
                let mut stmts = Vec::new();
                for child in named_children(node) {
                    if child.kind() != "label_name" {
                        self.push_stmt(child, &mut stmts);
                    }
                }
                Stmt::Block(Block { stmts })
            }
            "expression_statement" => match named_children(node).into_iter().next() {
                Some(expr) => Stmt::Expr(self.expr(expr)),
                None => Stmt::Other,
            },
            _ => Stmt::Other,
        }
    }

    fn case_clause(&self, node: Node<'_>) -> CaseClause {
        let values_node = node.child_by_field_name("value");
        let values = values_node.map(|v| self.expr_list(v)).unwrap_or_default();

        let mut body = Vec::new();
        for child in named_children(node) {
            if values_node.map(|v| v.id()) == Some(child.id()) {
                continue;
            }
            self.push_stmt(child, &mut body);
        }
        CaseClause { values, body }
    }

    fn for_stmt(&self, node: Node<'_>) -> Stmt {
        let body = node
            .child_by_field_name("body")
            .map(|b| self.block(b))
            .unwrap_or_default();

        let mut cond = None;
        for child in named_children(node) {
            match child.kind() {
                "block" | "range_clause" => {}
                "for_clause" => cond = child.child_by_field_name("condition").map(|c| self.expr(c)),
                _ => cond = Some(self.expr(child)),
            }
        }
        Stmt::For { cond, body }
    }

    fn expr_list(&self, node: Node<'_>) -> Vec<Expr> {
        match node.kind() {
            "expression_list" => named_children(node).into_iter().map(|e| self.expr(e)).collect(),
            _ => vec![self.expr(node)],
        }
    }

    fn first_child_expr(&self, node: Node<'_>) -> Option<Expr> {
        named_children(node).into_iter().next().map(|child| self.expr(child))
    }

    fn field_expr(&self, node: Node<'_>, field: &str) -> Option<Box<Expr>> {
        node.child_by_field_name(field).map(|n| Box::new(self.expr(n)))
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let span = span_of(node);
        let kind = self.expr_kind(node).unwrap_or(ExprKind::Verbatim);
        Expr::new(kind, span)
    }

    fn expr_kind(&self, node: Node<'_>) -> Option<ExprKind> {
        let kind = match node.kind() {
            "identifier" | "field_identifier" | "package_identifier" | "type_identifier"
            | "true" | "false" | "nil" | "iota" => ExprKind::Ident(self.text(node)),
            "int_literal" | "float_literal" | "imaginary_literal" | "rune_literal"
            | "interpreted_string_literal" | "raw_string_literal" => {
                ExprKind::BasicLit(self.text(node))
            }
            "selector_expression" => ExprKind::Selector {
                base: self.field_expr(node, "operand")?,
                member: self.text(node.child_by_field_name("field")?),
            },
            "qualified_type" => ExprKind::Selector {
                base: self.field_expr(node, "package")?,
                member: self.text(node.child_by_field_name("name")?),
            },
            "call_expression" => ExprKind::Call {
                func: self.field_expr(node, "function")?,
                args: node
                    .child_by_field_name("arguments")
                    .map(|args| named_children(args).into_iter().map(|a| self.expr(a)).collect())
                    .unwrap_or_default(),
            },
            "func_literal" => ExprKind::FuncLit(Box::new(FuncLit {
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| self.params(p))
                    .unwrap_or_default(),
                body: node
                    .child_by_field_name("body")
                    .map(|b| self.block(b))
                    .unwrap_or_default(),
            })),
            "composite_literal" => ExprKind::Composite {
                ty: self.field_expr(node, "type"),
                elements: node
                    .child_by_field_name("body")
                    .map(|body| self.literal_elements(body))
                    .unwrap_or_default(),
            },
            "literal_value" => ExprKind::Composite { ty: None, elements: self.literal_elements(node) },
            "keyed_element" => {
                let mut parts = named_children(node).into_iter();
                let key = parts.next()?;
                let value = parts.next()?;
                ExprKind::KeyValue {
                    key: Box::new(self.expr(key)),
                    value: Box::new(self.expr(value)),
                }
            }
            "literal_element" | "generic_type" => {
                return named_children(node).into_iter().next().and_then(|c| self.expr_kind(c));
            }
            "parenthesized_expression" => ExprKind::Paren(Box::new(self.first_child_expr(node)?)),
            "index_expression" => ExprKind::Index(self.field_expr(node, "operand")?),
            "slice_expression" => ExprKind::Slice(self.field_expr(node, "operand")?),
            "type_assertion_expression" => ExprKind::TypeAssert(self.field_expr(node, "operand")?),
            "pointer_type" => ExprKind::Star(Box::new(self.first_child_expr(node)?)),
            "unary_expression" => {
                let symbol = node.child_by_field_name("operator")?.kind();
                let operand = self.field_expr(node, "operand")?;
                match (symbol, UnaryOp::from_symbol(symbol)) {
                    ("*", _) => ExprKind::Star(operand),
                    (_, Some(op)) => ExprKind::Unary { op, operand },
                    (_, None) => ExprKind::Unsupported,
                }
            }
            "binary_expression" => {
                let symbol = node.child_by_field_name("operator")?.kind();
                match BinaryOp::from_symbol(symbol) {
                    Some(op) => ExprKind::Binary {
                        op,
                        left: self.field_expr(node, "left")?,
                        right: self.field_expr(node, "right")?,
                    },
                    None => ExprKind::Unsupported,
                }
            }
            _ => return None,
        };
        Some(kind)
    }

    fn literal_elements(&self, node: Node<'_>) -> Vec<Expr> {
        named_children(node).into_iter().map(|e| self.expr(e)).collect()
    }
}
