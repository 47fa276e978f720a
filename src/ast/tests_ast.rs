use super::printer::print_ast;
use super::*;
use crate::parser::TokenCode;
use crate::symtab::{Symbol, SymbolCategory, SymbolTable};

fn variable(table: &mut SymbolTable, name: &str) -> SymbolId {
    table.insert(Symbol::new(
        "",
        name,
        "",
        TokenCode::NAME,
        SymbolCategory::Variable,
    ))
}

#[test]
fn add_child_propagates_rule_and_symbol() {
    let mut table = SymbolTable::new();
    let sym = variable(&mut table, "a");

    let mut ast = Ast::new();
    let parent = ast.empty("holder", None);
    let child = ast.leaf(sym, "a");
    ast.node_mut(child).rule = Some(RuleId(7));
    ast.add_child(parent, child);

    let parent_node = ast.node(parent);
    assert_eq!(parent_node.rule, Some(RuleId(7)));
    assert_eq!(parent_node.symbol, Some(sym));
    assert_eq!(&parent_node.children[..], &[child][..]);
}

#[test]
fn propagation_never_overwrites() {
    let mut table = SymbolTable::new();
    let first = variable(&mut table, "first");
    let second = variable(&mut table, "second");

    let mut ast = Ast::new();
    let parent = ast.empty("holder", Some(RuleId(1)));
    let a = ast.leaf(first, "first");
    let b = ast.leaf(second, "second");
    ast.node_mut(b).rule = Some(RuleId(9));
    ast.add_child(parent, a);
    ast.add_sibling(parent, b);

    let parent_node = ast.node(parent);
    assert_eq!(parent_node.rule, Some(RuleId(1)));
    assert_eq!(parent_node.symbol, Some(first));
    assert_eq!(&parent_node.siblings[..], &[b][..]);
}

#[test]
fn statement_takes_keyword_name_and_symbol() {
    let mut table = SymbolTable::new();
    let print_sym = table.insert(Symbol::new(
        "",
        "print",
        "print",
        TokenCode::PRINT,
        SymbolCategory::Statement,
    ));

    let mut ast = Ast::new();
    let keyword = ast.leaf(print_sym, "print");
    let stmt = ast.statement(keyword, RuleId(12));

    let node = ast.node(stmt);
    assert_eq!(node.name.as_str(), "print");
    assert_eq!(node.symbol, Some(print_sym));
    assert!(node.extra_children);
}

#[test]
fn named_slot_variants_refuse_extra_children() {
    let mut table = SymbolTable::new();
    let if_sym = table.insert(Symbol::new(
        "",
        "if",
        "if",
        TokenCode::IF,
        SymbolCategory::Statement,
    ));

    let mut ast = Ast::new();
    let kw = ast.leaf(if_sym, "if");
    let cond = ast.empty("cond", None);
    let body = ast.empty("body", None);
    let branch = ast.branch(BranchForm::If, kw, cond, body, None, RuleId(3));
    assert!(!ast.node(branch).extra_children);

    let q = ast.empty("q", None);
    let t = ast.empty("t", None);
    let f = ast.empty("f", None);
    let op = ast.leaf(if_sym, "?");
    let ternary = ast.ternary(op, q, t, f, RuleId(4));
    assert!(!ast.node(ternary).extra_children);

    let func = ast.leaf(if_sym, "f");
    let params = ast.empty("params", None);
    let fbody = ast.empty("fbody", None);
    let function = ast.function("FUNCTION", func, params, fbody, RuleId(5));
    assert!(!ast.node(function).extra_children);
}

#[test]
fn prunable_requires_leaf_dummy() {
    let mut ast = Ast::new();
    let plain = ast.empty("placeholder", None);
    assert!(ast.node(plain).is_prunable());

    let with_child = ast.empty("parent", None);
    let child = ast.empty("child", None);
    ast.add_child(with_child, child);
    assert!(!ast.node(with_child).is_prunable());
}

#[test]
fn printer_marks_lexer_nodes_and_rule_numbers() {
    let mut table = SymbolTable::new();
    let sym = variable(&mut table, "x");

    let mut ast = Ast::new();
    let root = ast.program(RuleId(1));
    let leaf = ast.leaf(sym, "x");
    ast.add_child(root, leaf);

    let text = print_ast(&ast, root);
    assert!(text.contains("Program (1) --- children: 1"));
    assert!(text.contains("x (Lexer) --- children: 0"));
    assert!(text.contains("-------"));
}

#[test]
fn printer_banners_for_branch_slots() {
    let mut table = SymbolTable::new();
    let while_sym = table.insert(Symbol::new(
        "",
        "while",
        "while",
        TokenCode::WHILE,
        SymbolCategory::Statement,
    ));

    let mut ast = Ast::new();
    let kw = ast.leaf(while_sym, "while");
    let cond = ast.empty("cond", None);
    let body = ast.empty("body", None);
    let node = ast.branch(BranchForm::While, kw, cond, body, None, RuleId(8));

    let text = print_ast(&ast, node);
    assert!(text.contains("Condition:"));
    assert!(text.contains("True body:"));
    assert!(!text.contains("Else body:"));
}
