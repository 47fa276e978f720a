//! Diagnostic tree printer.
//!
//! Renders a node header (name, rule number or lexer origin, child and
//! sibling counts) followed by its structure, four spaces per level.
//! The code generator reuses the exact same rendering for its segment
//! output, so the format lives here.

use super::{Ast, NodeKind, NodeRef};

const INDENT: &str = "    ";

/// Render a whole tree to a string.
pub fn print_ast(ast: &Ast, root: NodeRef) -> String {
    let mut out = String::new();
    write_node(ast, root, "", "", &mut out);
    out
}

/// One header line: indentation, contextual prefix, display name, rule
/// number (or lexer-origin marker), child/sibling counts.
pub(crate) fn write_header(
    ast: &Ast,
    node_ref: NodeRef,
    pad: &str,
    extra: &str,
    out: &mut String,
) {
    let node = ast.node(node_ref);
    out.push_str(pad);
    out.push_str(extra);
    out.push_str(node.name.as_str());
    match node.rule {
        None => out.push_str(" (Lexer) "),
        Some(rule) => out.push_str(&format!(" ({}) ", rule.0)),
    }
    out.push_str(&format!("--- children: {}", node.children.len()));
    if !node.siblings.is_empty() {
        out.push_str(&format!(" --- siblings: {}", node.siblings.len()));
    }
    out.push('\n');
}

/// Render one node and its structure. `extra` is prepended to the
/// header line and not inherited by children.
pub(crate) fn write_node(ast: &Ast, node_ref: NodeRef, pad: &str, extra: &str, out: &mut String) {
    let kind = ast.node(node_ref).kind.clone();
    match kind {
        NodeKind::Program | NodeKind::Pattern | NodeKind::Expression | NodeKind::Empty => {
            write_generic(ast, node_ref, pad, extra, out);
        }
        NodeKind::Statement { keyword } => {
            let extra = format!("{}Statement {} ", extra, ast.node(keyword).name);
            write_generic(ast, node_ref, pad, &extra, out);
        }
        NodeKind::Operator { op, .. } => {
            let extra = format!("{}Operator {} ", extra, ast.node(op).name);
            write_generic(ast, node_ref, pad, &extra, out);
        }
        NodeKind::Ternary {
            cond,
            if_true,
            if_false,
            ..
        } => {
            write_slots(
                ast,
                node_ref,
                pad,
                extra,
                &[("Test:", cond), ("If True:", if_true), ("If False:", if_false)],
                out,
            );
        }
        NodeKind::Branch {
            cond,
            body,
            else_body,
            ..
        } => {
            let mut slots = vec![("Condition:", cond), ("True body:", body)];
            if let Some(else_body) = else_body {
                slots.push(("Else body:", else_body));
            }
            write_slots(ast, node_ref, pad, extra, &slots, out);
        }
        NodeKind::ForCounted {
            init,
            cond,
            step,
            body,
            ..
        } => {
            write_slots(
                ast,
                node_ref,
                pad,
                extra,
                &[
                    ("Initialise:", init),
                    ("Condition:", cond),
                    ("Increment:", step),
                    ("Body:", body),
                ],
                out,
            );
        }
        NodeKind::ForEach {
            element,
            array,
            body,
            ..
        } => {
            write_slots(
                ast,
                node_ref,
                pad,
                extra,
                &[("Element:", element), ("Array:", array), ("Body:", body)],
                out,
            );
        }
        NodeKind::Function { func, params, body } => {
            write_header(ast, node_ref, pad, extra, out);
            out.push_str(pad);
            out.push_str(&format!("function {}\n", ast.node(func).name));
            let inner = format!("{}{}", pad, INDENT);
            out.push_str(&inner);
            out.push_str("Parameters:\n");
            write_node(ast, params, &inner, "", out);
            out.push_str(&inner);
            out.push_str("Body:\n");
            write_node(ast, body, &inner, "", out);
            out.push_str(&inner);
            out.push_str("-------\n");
            write_siblings(ast, node_ref, pad, out);
        }
    }
}

fn write_generic(ast: &Ast, node_ref: NodeRef, pad: &str, extra: &str, out: &mut String) {
    write_header(ast, node_ref, pad, extra, out);
    let children: Vec<NodeRef> = ast.node(node_ref).children.iter().copied().collect();
    if !children.is_empty() {
        let inner = format!("{}{}", pad, INDENT);
        for child in children {
            write_node(ast, child, &inner, "", out);
        }
        out.push_str(&inner);
        out.push_str("-------\n");
    }
    write_siblings(ast, node_ref, pad, out);
}

fn write_slots(
    ast: &Ast,
    node_ref: NodeRef,
    pad: &str,
    extra: &str,
    slots: &[(&str, NodeRef)],
    out: &mut String,
) {
    write_header(ast, node_ref, pad, extra, out);
    let heading = format!("{}{}", pad, INDENT);
    let inner = format!("{}{}", heading, INDENT);
    for &(banner, slot) in slots {
        out.push_str(&heading);
        out.push_str(banner);
        out.push('\n');
        write_node(ast, slot, &inner, "", out);
    }
    out.push_str(&inner);
    out.push_str("-------\n");
    write_siblings(ast, node_ref, pad, out);
}

fn write_siblings(ast: &Ast, node_ref: NodeRef, pad: &str, out: &mut String) {
    let siblings: Vec<NodeRef> = ast.node(node_ref).siblings.iter().copied().collect();
    for sibling in siblings {
        write_node(ast, sibling, pad, "", out);
    }
}
