//! AST walker utilities.
//!
//! The source interpreter walks a schema-less, name-tagged parse tree
//! through five primitives: `is_tree`, `get_name`, `get_child`,
//! `get_child_value`, `retrieve_value`. This crate's [`super::ast`] is a
//! typed enum rather than a tagged tree, so the interpreter itself
//! (`crate::flow`, `crate::mapper`) matches on it directly instead of
//! walking through these primitives at runtime. This module provides them
//! anyway, as thin accessors over the typed AST, so the tree-introspection
//! surface SPEC_FULL.md §4.D names is a real, callable part of this crate
//! rather than only a doc-comment mention.
//!
//! Node tags match the grammar rule names used throughout SPEC_FULL.md
//! §3/§4.C: `head_line`, `for_loop`, `if_clause`, `section`, `list_body`,
//! `list_loop`, `expr`, `addition`, `multiplication`, `extvarname`,
//! `if_condition`, plus one tag per other record kind and leaf terminal.

use super::ast::{BoolExpr, Expr, ExtVarName, IfBranch, Instruction, ListItem, RecordLine};

/// A reference into the typed AST, uniformly addressable by tag name.
#[derive(Clone, Copy, Debug)]
pub enum AstNode<'a> {
    Instruction(&'a Instruction),
    RecordLine(&'a RecordLine),
    ListItem(&'a ListItem),
    IfBranch(&'a IfBranch),
    Expr(&'a Expr),
    BoolExpr(&'a BoolExpr),
    ExtVarName(&'a ExtVarName),
    /// A terminal: a bare name or number with no children of its own.
    Leaf(&'a str),
}

/// Whether `node` has children (as opposed to being a terminal value).
pub fn is_tree(node: &AstNode<'_>) -> bool {
    !matches!(node, AstNode::Leaf(_))
}

/// The grammar rule tag for `node`, matching SPEC_FULL.md §3's node-tag
/// vocabulary.
pub fn get_name(node: &AstNode<'_>) -> &'static str {
    match node {
        AstNode::Instruction(Instruction::Record(_)) => "endf_line",
        AstNode::Instruction(Instruction::ForLoop { .. }) => "for_loop",
        AstNode::Instruction(Instruction::IfClause { .. }) => "if_clause",
        AstNode::Instruction(Instruction::Section { .. }) => "section",
        AstNode::Instruction(Instruction::Stop(_)) => "stop_line",
        AstNode::RecordLine(RecordLine::Head { .. }) => "head_line",
        AstNode::RecordLine(RecordLine::Cont { .. }) => "cont_line",
        AstNode::RecordLine(RecordLine::Dir { .. }) => "dir_line",
        AstNode::RecordLine(RecordLine::Intg { .. }) => "intg_line",
        AstNode::RecordLine(RecordLine::Text { .. }) => "text_line",
        AstNode::RecordLine(RecordLine::List { .. }) => "list_body",
        AstNode::RecordLine(RecordLine::Tab1 { .. }) => "tab1_line",
        AstNode::RecordLine(RecordLine::Tab2 { .. }) => "tab2_line",
        AstNode::RecordLine(RecordLine::Send { .. }) => "send_line",
        AstNode::ListItem(ListItem::Loop { .. }) => "list_loop",
        AstNode::ListItem(ListItem::Value(_)) => "expr",
        AstNode::ListItem(ListItem::Padding) => "line_padding",
        AstNode::IfBranch(_) => "if_condition",
        AstNode::Expr(Expr::Add(..)) | AstNode::Expr(Expr::Sub(..)) => "addition",
        AstNode::Expr(Expr::Mul(..)) | AstNode::Expr(Expr::Div(..)) => "multiplication",
        AstNode::Expr(_) => "expr",
        AstNode::BoolExpr(_) => "if_condition",
        AstNode::ExtVarName(_) => "extvarname",
        AstNode::Leaf(_) => "leaf",
    }
}

/// Immediate children of `node`, each paired with its own tag-addressable
/// [`AstNode`].
fn children<'a>(node: &AstNode<'a>) -> Vec<AstNode<'a>> {
    match node {
        AstNode::Instruction(Instruction::Record(record)) => vec![AstNode::RecordLine(record)],
        AstNode::Instruction(Instruction::ForLoop { var, start, stop, body }) => {
            let mut out = vec![AstNode::Leaf(var.as_str()), AstNode::Expr(start), AstNode::Expr(stop)];
            out.extend(body.iter().map(AstNode::Instruction));
            out
        }
        AstNode::Instruction(Instruction::IfClause { branches, else_body }) => {
            let mut out: Vec<_> = branches.iter().map(AstNode::IfBranch).collect();
            if let Some(body) = else_body {
                out.extend(body.iter().map(AstNode::Instruction));
            }
            out
        }
        AstNode::Instruction(Instruction::Section { open, close, body }) => {
            let mut out = vec![AstNode::ExtVarName(open), AstNode::ExtVarName(close)];
            out.extend(body.iter().map(AstNode::Instruction));
            out
        }
        AstNode::Instruction(Instruction::Stop(message)) => vec![AstNode::Leaf(message.as_str())],
        AstNode::RecordLine(RecordLine::Head { fields, .. } | RecordLine::Cont { fields, .. }) => {
            fields.iter().map(AstNode::Expr).collect()
        }
        AstNode::RecordLine(RecordLine::Dir { fields, .. }) => fields.iter().map(AstNode::Expr).collect(),
        AstNode::RecordLine(RecordLine::Intg { ii, jj, ndigit, kij, .. }) => {
            vec![AstNode::Expr(ii), AstNode::Expr(jj), AstNode::Expr(ndigit), AstNode::ExtVarName(kij)]
        }
        AstNode::RecordLine(RecordLine::Text { hl, .. }) => vec![AstNode::ExtVarName(hl)],
        AstNode::RecordLine(RecordLine::List { fields, body, .. }) => {
            let mut out: Vec<_> = fields.iter().map(AstNode::Expr).collect();
            out.extend(body.iter().map(AstNode::ListItem));
            out
        }
        AstNode::RecordLine(RecordLine::Tab1 { fields, name, .. }) => {
            let mut out: Vec<_> = fields.iter().map(AstNode::Expr).collect();
            if let Some(name) = name {
                out.push(AstNode::ExtVarName(name));
            }
            out
        }
        AstNode::RecordLine(RecordLine::Tab2 { fields, name, .. }) => {
            let mut out: Vec<_> = fields.iter().map(AstNode::Expr).collect();
            if let Some(name) = name {
                out.push(AstNode::ExtVarName(name));
            }
            out
        }
        AstNode::RecordLine(RecordLine::Send { .. }) => vec![],
        AstNode::ListItem(ListItem::Value(expr)) => vec![AstNode::Expr(expr)],
        AstNode::ListItem(ListItem::Padding) => vec![],
        AstNode::ListItem(ListItem::Loop { var, start, stop, body }) => {
            let mut out = vec![AstNode::Leaf(var.as_str()), AstNode::Expr(start), AstNode::Expr(stop)];
            out.extend(body.iter().map(AstNode::ListItem));
            out
        }
        AstNode::IfBranch(IfBranch { condition, lookahead, body }) => {
            let mut out = vec![AstNode::BoolExpr(condition)];
            if let Some(n) = lookahead {
                out.push(AstNode::Expr(n));
            }
            out.extend(body.iter().map(AstNode::Instruction));
            out
        }
        AstNode::Expr(Expr::Lit(_)) => vec![],
        AstNode::Expr(Expr::Desired(inner) | Expr::Neg(inner)) => vec![AstNode::Expr(inner)],
        AstNode::Expr(
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b),
        ) => vec![AstNode::Expr(a), AstNode::Expr(b)],
        AstNode::Expr(Expr::Var(ev)) => vec![AstNode::ExtVarName(ev)],
        AstNode::BoolExpr(BoolExpr::Cmp(_, lhs, rhs)) => vec![AstNode::Expr(lhs), AstNode::Expr(rhs)],
        AstNode::BoolExpr(BoolExpr::And(a, b) | BoolExpr::Or(a, b)) => vec![AstNode::BoolExpr(a), AstNode::BoolExpr(b)],
        AstNode::ExtVarName(ev) => vec![AstNode::Leaf(ev.name.as_str())],
        AstNode::Leaf(_) => vec![],
    }
}

/// The first immediate child of `tree` tagged `name`.
///
/// `nofail` mirrors the source signature's optional flag: when `false` and
/// no such child exists, that is treated as a caller bug rather than a
/// normal "absent" outcome, so this still returns `None` — the distinction
/// is left to the caller, matching SPEC_FULL.md §4.D's "never panics on a
/// missing child" note.
pub fn get_child<'a>(tree: &AstNode<'a>, name: &str, _nofail: bool) -> Option<AstNode<'a>> {
    children(tree).into_iter().find(|child| get_name(child) == name)
}

/// The terminal string value of the first immediate child tagged `name`,
/// if that child is itself a leaf or an `extvarname`.
pub fn get_child_value<'a>(tree: &AstNode<'a>, name: &str) -> Option<&'a str> {
    match get_child(tree, name, true)? {
        AstNode::Leaf(value) => Some(value),
        AstNode::ExtVarName(ev) => Some(ev.name.as_str()),
        _ => None,
    }
}

/// The first terminal value found anywhere in `tree`'s subtree, depth
/// first, `tree` itself included.
pub fn retrieve_value<'a>(tree: &AstNode<'a>) -> Option<&'a str> {
    match tree {
        AstNode::Leaf(value) => Some(value),
        AstNode::ExtVarName(ev) => Some(ev.name.as_str()),
        other => children(other).iter().find_map(retrieve_value),
    }
}
