//! Abstract syntax tree built while parsing.
//!
//! Nodes live in a flat arena and reference each other through
//! [`NodeRef`] indices; child and pending-sibling lists are index lists
//! on the arena entry. Grammar ambiguity during parsing can attach a
//! node to a *sibling* list before its real parent is known; the
//! [`crate::normalize`] pass later promotes pending siblings into the
//! proper child lists.
//!
//! The node variants form a closed set: consumers (printer, normalizer,
//! code generator) traverse with exhaustive `match` instead of virtual
//! dispatch.

use std::num::NonZeroU32;

use thin_vec::ThinVec;

use crate::symtab::SymbolId;
use crate::NameId;

pub mod printer;

/// Grammar rule that produced a node through a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleId(pub u16);

/// Index of a node in the [`Ast`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(NonZeroU32);

impl NodeRef {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn index(self) -> usize {
        (self.get() - 1) as usize
    }
}

/// Operator arity and placement, for the operator node family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    /// Operator with free-form children (e.g. a call).
    Plain,
    /// `-x`, `++y`
    Prefix,
    /// `x++`
    Postfix,
    /// `a + b`
    Binary,
}

/// Branch/loop statement shapes sharing the condition/body layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchForm {
    If,
    While,
    Do,
}

/// Node variants. Variants with named slots refuse generic extra
/// children; stray nodes attached to them by grammar ambiguity go
/// through the pending-sibling mechanism instead of being lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    /// A pattern-action rule: children are the pattern expression and
    /// the action block.
    Pattern,
    Expression,
    /// Structurally insignificant placeholder; pruned by normalization
    /// if it never gains content.
    Empty,
    Statement {
        keyword: NodeRef,
    },
    Operator {
        op: NodeRef,
        fixity: Fixity,
    },
    Ternary {
        op: NodeRef,
        cond: NodeRef,
        if_true: NodeRef,
        if_false: NodeRef,
    },
    Branch {
        form: BranchForm,
        keyword: NodeRef,
        cond: NodeRef,
        body: NodeRef,
        else_body: Option<NodeRef>,
    },
    ForCounted {
        keyword: NodeRef,
        init: NodeRef,
        cond: NodeRef,
        step: NodeRef,
        body: NodeRef,
    },
    ForEach {
        keyword: NodeRef,
        element: NodeRef,
        array: NodeRef,
        body: NodeRef,
    },
    Function {
        func: NodeRef,
        params: NodeRef,
        body: NodeRef,
    },
}

/// One arena entry.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Display name used by the diagnostic printer.
    pub name: NameId,
    /// Grammar rule of the reduction that built this node; `None` for
    /// nodes synthesized directly by the lexer.
    pub rule: Option<RuleId>,
    pub symbol: Option<SymbolId>,
    /// Placeholder flag; see [`NodeKind::Empty`].
    pub dummy: bool,
    /// Whether the node accepts additional generic children once built.
    pub extra_children: bool,
    pub children: ThinVec<NodeRef>,
    /// Pending siblings awaiting promotion into a parent's child list.
    pub siblings: ThinVec<NodeRef>,
}

impl Node {
    /// A dummy leaf with no children and no pending siblings; these are
    /// dropped from child lists during normalization.
    pub fn is_prunable(&self) -> bool {
        self.dummy && self.children.is_empty() && self.siblings.is_empty()
    }
}

/// Flattened AST storage.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub fn node(&self, node_ref: NodeRef) -> &Node {
        &self.nodes[node_ref.index()]
    }

    pub fn node_mut(&mut self, node_ref: NodeRef) -> &mut Node {
        &mut self.nodes[node_ref.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: Node) -> NodeRef {
        let index = self.nodes.len() as u32 + 1;
        self.nodes.push(node);
        NodeRef::new(index).expect("NodeRef overflow")
    }

    fn push_kind(
        &mut self,
        kind: NodeKind,
        name: &str,
        rule: Option<RuleId>,
        symbol: Option<SymbolId>,
        dummy: bool,
        extra_children: bool,
    ) -> NodeRef {
        self.push(Node {
            kind,
            name: NameId::new(name),
            rule,
            symbol,
            dummy,
            extra_children,
            children: ThinVec::new(),
            siblings: ThinVec::new(),
        })
    }

    /// Leaf node for a single scanned token, carrying its resolved
    /// symbol. Rule stays unset: the node did not come from a reduction.
    pub fn leaf(&mut self, symbol: SymbolId, name: &str) -> NodeRef {
        self.push_kind(NodeKind::Expression, name, None, Some(symbol), false, true)
    }

    /// Placeholder node satisfying grammar shape; pruned later if it
    /// stays a leaf.
    pub fn empty(&mut self, name: &str, rule: Option<RuleId>) -> NodeRef {
        self.push_kind(NodeKind::Empty, name, rule, None, true, true)
    }

    pub fn program(&mut self, rule: RuleId) -> NodeRef {
        self.push_kind(NodeKind::Program, "Program", Some(rule), None, false, true)
    }

    /// A pattern-action rule node; the pattern expression and action
    /// block are attached as generic children.
    pub fn pattern(&mut self, rule: RuleId) -> NodeRef {
        self.push_kind(NodeKind::Pattern, "Pattern", Some(rule), None, false, true)
    }

    /// Statement headed by a keyword token node (`print`, `delete`...).
    /// Operands are attached as generic children.
    pub fn statement(&mut self, keyword: NodeRef, rule: RuleId) -> NodeRef {
        let name = self.node(keyword).name;
        let symbol = self.node(keyword).symbol;
        self.push_kind(
            NodeKind::Statement { keyword },
            name.as_str(),
            Some(rule),
            symbol,
            false,
            true,
        )
    }

    pub fn unary_prefix(&mut self, op: NodeRef, operand: NodeRef, rule: RuleId) -> NodeRef {
        let node = self.push_kind(
            NodeKind::Operator {
                op,
                fixity: Fixity::Prefix,
            },
            "LEFT UNARY_OP",
            Some(rule),
            None,
            false,
            true,
        );
        self.add_child(node, operand);
        node
    }

    pub fn unary_postfix(&mut self, operand: NodeRef, op: NodeRef, rule: RuleId) -> NodeRef {
        let node = self.push_kind(
            NodeKind::Operator {
                op,
                fixity: Fixity::Postfix,
            },
            "RIGHT UNARY_OP",
            Some(rule),
            None,
            false,
            true,
        );
        self.add_child(node, operand);
        node
    }

    pub fn binary(&mut self, left: NodeRef, op: NodeRef, right: NodeRef, rule: RuleId) -> NodeRef {
        let node = self.push_kind(
            NodeKind::Operator {
                op,
                fixity: Fixity::Binary,
            },
            "BIN_OP",
            Some(rule),
            None,
            false,
            true,
        );
        self.add_child(node, left);
        self.add_child(node, right);
        node
    }

    /// Operator node with free-form children, e.g. a call with its
    /// argument list.
    pub fn operation(&mut self, name: &str, op: NodeRef, rule: RuleId) -> NodeRef {
        self.push_kind(
            NodeKind::Operator {
                op,
                fixity: Fixity::Plain,
            },
            name,
            Some(rule),
            None,
            false,
            true,
        )
    }

    pub fn ternary(
        &mut self,
        op: NodeRef,
        cond: NodeRef,
        if_true: NodeRef,
        if_false: NodeRef,
        rule: RuleId,
    ) -> NodeRef {
        self.push_kind(
            NodeKind::Ternary {
                op,
                cond,
                if_true,
                if_false,
            },
            "TERNARY_OP",
            Some(rule),
            None,
            false,
            false,
        )
    }

    pub fn branch(
        &mut self,
        form: BranchForm,
        keyword: NodeRef,
        cond: NodeRef,
        body: NodeRef,
        else_body: Option<NodeRef>,
        rule: RuleId,
    ) -> NodeRef {
        self.push_kind(
            NodeKind::Branch {
                form,
                keyword,
                cond,
                body,
                else_body,
            },
            "Branch_Loop",
            Some(rule),
            None,
            false,
            false,
        )
    }

    pub fn for_counted(
        &mut self,
        keyword: NodeRef,
        init: NodeRef,
        cond: NodeRef,
        step: NodeRef,
        body: NodeRef,
        rule: RuleId,
    ) -> NodeRef {
        self.push_kind(
            NodeKind::ForCounted {
                keyword,
                init,
                cond,
                step,
                body,
            },
            "Branch_Loop",
            Some(rule),
            None,
            false,
            false,
        )
    }

    pub fn for_each(
        &mut self,
        keyword: NodeRef,
        element: NodeRef,
        array: NodeRef,
        body: NodeRef,
        rule: RuleId,
    ) -> NodeRef {
        self.push_kind(
            NodeKind::ForEach {
                keyword,
                element,
                array,
                body,
            },
            "Branch_Loop",
            Some(rule),
            None,
            false,
            false,
        )
    }

    pub fn function(
        &mut self,
        name: &str,
        func: NodeRef,
        params: NodeRef,
        body: NodeRef,
        rule: RuleId,
    ) -> NodeRef {
        self.push_kind(
            NodeKind::Function { func, params, body },
            name,
            Some(rule),
            None,
            false,
            false,
        )
    }

    /// Append to the generic child list, propagating rule number and
    /// symbol: the parent keeps the first non-default rule and the first
    /// resolved symbol it sees, and never overwrites either.
    pub fn add_child(&mut self, parent: NodeRef, child: NodeRef) {
        self.adopt(parent, child);
        self.node_mut(parent).children.push(child);
    }

    pub fn add_children(&mut self, parent: NodeRef, children: &[NodeRef]) {
        for &child in children {
            self.add_child(parent, child);
        }
    }

    /// Append to the pending-sibling list; same propagation rules as
    /// [`Ast::add_child`].
    pub fn add_sibling(&mut self, node: NodeRef, adoptee: NodeRef) {
        self.adopt(node, adoptee);
        self.node_mut(node).siblings.push(adoptee);
    }

    fn adopt(&mut self, node: NodeRef, adoptee: NodeRef) {
        let (rule, symbol) = {
            let adoptee = self.node(adoptee);
            (adoptee.rule, adoptee.symbol)
        };
        let node = self.node_mut(node);
        if node.rule.is_none() {
            node.rule = rule;
        }
        if node.symbol.is_none() {
            node.symbol = symbol;
        }
    }
}

#[cfg(test)]
mod tests_ast;
