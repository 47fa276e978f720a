use super::*;
use crate::ast::RuleId;
use crate::parser::TokenCode;
use crate::symtab::{preload, Dialects, Scopes, SymbolCategory};

/// Program with one BEGIN block, one END block and one plain rule.
fn sample_program() -> (Ast, Scopes, NodeRef) {
    let mut scopes = Scopes::new();
    preload(&mut scopes, Dialects::default());
    let mut ast = Ast::new();
    let root = ast.program(RuleId(1));

    let begin_sym = scopes.get("", "BEGIN", TokenCode::NAME, false, SymbolCategory::Variable);
    let begin_kw = ast.leaf(begin_sym, "Awk::BEGIN");
    let begin_stmt = ast.statement(begin_kw, RuleId(2));
    let a_sym = scopes.get("", "a", TokenCode::NAME, false, SymbolCategory::Variable);
    let a_leaf = ast.leaf(a_sym, "Awk::a");
    ast.add_child(begin_stmt, a_leaf);
    ast.add_child(root, begin_stmt);

    let end_sym = scopes.get("", "END", TokenCode::NAME, false, SymbolCategory::Variable);
    let end_kw = ast.leaf(end_sym, "Awk::END");
    let end_stmt = ast.statement(end_kw, RuleId(3));
    ast.add_child(root, end_stmt);

    let rule = ast.pattern(RuleId(7));
    let nr_sym = scopes.get("", "NR", TokenCode::NAME, false, SymbolCategory::Variable);
    let nr_leaf = ast.leaf(nr_sym, "Awk::NR");
    ast.add_child(rule, nr_leaf);
    ast.add_child(root, rule);

    (ast, scopes, root)
}

#[test]
fn begin_and_end_blocks_route_to_their_segments() {
    let (ast, scopes, root) = sample_program();
    let segments = generate_segments(&ast, &scopes, root);
    assert!(segments[Segment::Begin.index()].contains("Awk::BEGIN"));
    assert!(segments[Segment::End.index()].contains("Awk::END"));
    // The plain rule stays in the body.
    assert!(segments[Segment::Body.index()].contains("Pattern"));
}

#[test]
fn body_records_where_special_blocks_went() {
    let (ast, scopes, root) = sample_program();
    let segments = generate_segments(&ast, &scopes, root);
    let body = &segments[Segment::Body.index()];
    assert!(body.contains("// begin block"));
    assert!(body.contains("// end block"));
}

#[test]
fn body_only_template_mentions_begin_and_end() {
    let (ast, scopes, root) = sample_program();
    let segments = generate_segments(&ast, &scopes, root);
    let output = splice_template("%body;\n", &segments);
    assert!(!output.is_empty());
    assert!(output.contains("begin"));
    assert!(output.contains("end"));
}

#[test]
fn used_builtin_includes_are_emitted() {
    let (ast, mut scopes, root) = sample_program();
    let sqrt = scopes.find("", "sqrt").unwrap();
    scopes.table_mut().mark_used(sqrt);
    let segments = generate_segments(&ast, &scopes, root);
    assert_eq!(segments[Segment::Includes.index()], "#include <cmath>\n");
}

#[test]
#[should_panic(expected = "segment array too short")]
fn short_segment_array_aborts_construction() {
    let (ast, scopes, _root) = sample_program();
    let _ = CodeGen::with_segments(&ast, &scopes, vec![String::new(); 3]);
}

#[test]
fn supplied_segment_array_is_extended_not_replaced() {
    let (ast, scopes, root) = sample_program();
    let mut pre = vec![String::new(); SEGMENT_COUNT];
    pre[Segment::Variables.index()] = "awkcc_variable a;\n".to_string();
    let segments = CodeGen::with_segments(&ast, &scopes, pre).generate(root);
    assert_eq!(segments[Segment::Variables.index()], "awkcc_variable a;\n");
    assert!(segments[Segment::Begin.index()].contains("Awk::BEGIN"));
}

#[test]
fn template_lines_pass_through_verbatim() {
    let segments: Vec<String> = (0..SEGMENT_COUNT).map(|i| format!("seg{}\n", i)).collect();
    let template = "int main() {\n%variables;\n%unknown;\nplain line\n%body;\n}\n";
    let output = splice_template(template, &segments);
    assert_eq!(
        output,
        "int main() {\nseg1\n%unknown;\nplain line\nseg5\n}\n"
    );
}

#[test]
fn begin_file_marker_is_not_confused_with_begin() {
    let mut segments = vec![String::new(); SEGMENT_COUNT];
    segments[Segment::Begin.index()] = "BEGIN-SEG\n".to_string();
    segments[Segment::BeginFile.index()] = "BEGINFILE-SEG\n".to_string();
    let output = splice_template("%begin_file;\n%begin;\n", &segments);
    assert_eq!(output, "BEGINFILE-SEG\nBEGIN-SEG\n");
}

#[test]
fn non_program_root_renders_into_body() {
    let mut scopes = Scopes::new();
    preload(&mut scopes, Dialects::default());
    let mut ast = Ast::new();
    let x = scopes.get("", "x", TokenCode::NAME, false, SymbolCategory::Variable);
    let leaf = ast.leaf(x, "Awk::x");
    let segments = generate_segments(&ast, &scopes, leaf);
    assert!(segments[Segment::Body.index()].contains("Awk::x (Lexer)"));
}
