//! Tree normalization: pending-sibling promotion and dummy pruning.
//!
//! Parsing leaves some nodes attached to *sibling* lists because their
//! real parent was not known at reduction time. This pass promotes each
//! node's pending siblings into its parent's child list (when the
//! parent accepts extra children), then drops placeholder leaves that
//! never gained content. Running it on an already-normalized tree is a
//! no-op.

use log::debug;
use thin_vec::ThinVec;

use crate::ast::{Ast, NodeKind, NodeRef};

/// Normalize the whole tree rooted at `root` (which has no parent).
pub fn normalize(ast: &mut Ast, root: NodeRef) {
    debug!("normalize: starting at node {}", root.get());
    normalize_node(ast, root, None);
}

/// Normalize one node against its (possibly absent) parent.
///
/// Termination: recursion depth is bounded by tree depth, and each
/// promotion settles a sibling under a real parent exactly once.
fn normalize_node(ast: &mut Ast, node: NodeRef, parent: Option<NodeRef>) {
    promote_siblings(ast, node, parent);
    normalize_children(ast, node);
    match ast.node(node).kind.clone() {
        NodeKind::Program
        | NodeKind::Pattern
        | NodeKind::Expression
        | NodeKind::Empty
        | NodeKind::Statement { .. }
        | NodeKind::Operator { .. } => {}
        NodeKind::Ternary {
            cond,
            if_true,
            if_false,
            ..
        } => {
            normalize_node(ast, cond, Some(node));
            normalize_node(ast, if_true, Some(node));
            normalize_node(ast, if_false, Some(node));
        }
        NodeKind::Branch {
            cond,
            body,
            else_body,
            ..
        } => {
            normalize_node(ast, cond, Some(node));
            normalize_node(ast, body, Some(node));
            if let Some(else_body) = else_body {
                normalize_node(ast, else_body, Some(node));
            }
        }
        NodeKind::ForCounted {
            init,
            cond,
            step,
            body,
            ..
        } => {
            normalize_node(ast, init, Some(node));
            normalize_node(ast, cond, Some(node));
            normalize_node(ast, step, Some(node));
            normalize_node(ast, body, Some(node));
        }
        NodeKind::ForEach {
            element,
            array,
            body,
            ..
        } => {
            normalize_node(ast, element, Some(node));
            normalize_node(ast, array, Some(node));
            normalize_node(ast, body, Some(node));
        }
        NodeKind::Function { func, params, body } => {
            normalize_node(ast, func, Some(node));
            normalize_node(ast, params, Some(node));
            normalize_node(ast, body, Some(node));
        }
    }
}

/// Move the node's pending siblings into the parent's child list when
/// the parent accepts extra children; otherwise leave them attached but
/// still normalize each one (with the same refusing or absent parent).
fn promote_siblings(ast: &mut Ast, node: NodeRef, parent: Option<NodeRef>) {
    if ast.node(node).siblings.is_empty() {
        return;
    }
    match parent {
        Some(parent_ref) if ast.node(parent_ref).extra_children => {
            let siblings = std::mem::take(&mut ast.node_mut(node).siblings);
            debug!(
                "normalize: promoting {} sibling(s) of node {} into node {}",
                siblings.len(),
                node.get(),
                parent_ref.get()
            );
            for sibling in siblings {
                ast.node_mut(parent_ref).children.push(sibling);
                normalize_node(ast, sibling, Some(parent_ref));
            }
        }
        _ => {
            let siblings: Vec<NodeRef> = ast.node(node).siblings.iter().copied().collect();
            for sibling in siblings {
                normalize_node(ast, sibling, parent);
            }
        }
    }
}

/// Recurse into the generic child list, then filter out dummy leaves.
///
/// Promotion can splice new entries into the child list mid-traversal,
/// so the list is taken out and rebuilt entry by entry rather than
/// iterated in place.
fn normalize_children(ast: &mut Ast, node: NodeRef) {
    if ast.node(node).children.is_empty() {
        return;
    }
    if ast.node(node).extra_children {
        let children = std::mem::take(&mut ast.node_mut(node).children);
        for child in children {
            ast.node_mut(node).children.push(child);
            normalize_node(ast, child, Some(node));
        }
    } else {
        let children: Vec<NodeRef> = ast.node(node).children.iter().copied().collect();
        for child in children {
            normalize_node(ast, child, Some(node));
        }
    }

    let has_prunable = ast
        .node(node)
        .children
        .iter()
        .any(|&child| ast.node(child).is_prunable());
    if has_prunable {
        let kept: ThinVec<NodeRef> = ast
            .node(node)
            .children
            .iter()
            .copied()
            .filter(|&child| !ast.node(child).is_prunable())
            .collect();
        debug!(
            "normalize: pruned {} dummy leaf(s) under node {}",
            ast.node(node).children.len() - kept.len(),
            node.get()
        );
        ast.node_mut(node).children = kept;
    }
}
