use super::*;
use crate::ast::Ast;
use crate::parser::recording::RecordingEngine;
use crate::parser::{char_to_token, TokenCode};
use crate::symtab::{preload, Dialects, Scopes, Symbol, SymbolCategory};

struct Fixture {
    ast: Ast,
    scopes: Scopes,
    engine: RecordingEngine,
    diag: DiagnosticEngine,
}

fn lex(code: &str) -> Fixture {
    lex_with_paths(code, Vec::new())
}

fn lex_with_paths(code: &str, include_paths: Vec<std::path::PathBuf>) -> Fixture {
    let mut fx = Fixture {
        ast: Ast::new(),
        scopes: Scopes::new(),
        engine: RecordingEngine::new(),
        diag: DiagnosticEngine::new(),
    };
    preload(&mut fx.scopes, Dialects::default());
    let mut lexer = Lexer::new(include_paths);
    lexer
        .run(
            code,
            &mut fx.ast,
            &mut fx.scopes,
            &mut fx.engine,
            &mut fx.diag,
        )
        .unwrap();
    fx
}

fn symbol_of<'a>(fx: &'a Fixture, index: usize) -> &'a Symbol {
    let node = fx.engine.trace[index].1;
    let sym = fx.ast.node(node).symbol.unwrap();
    fx.scopes.symbol(sym)
}

#[test]
fn begin_is_a_single_begin_token() {
    let fx = lex("BEGIN\n");
    assert_eq!(fx.engine.trace[0].0, TokenCode::BEGIN);
    assert_eq!(
        fx.engine.codes(),
        vec![TokenCode::BEGIN, TokenCode::NEWLINE]
    );
}

#[test]
fn one_char_operator_uses_the_char_table() {
    let fx = lex("*\n");
    assert_eq!(fx.engine.trace[0].0, char_to_token('*').unwrap());
}

#[test]
fn leading_slash_scans_as_regex() {
    let fx = lex("/[A-Z]+[a-z0-9A-Z]/\n");
    assert_eq!(fx.engine.trace[0].0, TokenCode::ERE);
    assert_eq!(symbol_of(&fx, 0).category, SymbolCategory::Regex);
}

#[test]
fn slash_after_name_is_division() {
    let fx = lex("a/[A-Z]+[a-z0-9A-Z]/\n");
    assert_eq!(fx.engine.trace[0].0, TokenCode::NAME);
    assert_eq!(fx.engine.trace[1].0, char_to_token('/').unwrap());
}

#[test]
fn slash_after_name_is_division_before_number() {
    let fx = lex("a/7\n");
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::NAME,
            TokenCode::SLASH,
            TokenCode::NUMBER,
            TokenCode::NEWLINE
        ]
    );
}

#[test]
fn slash_equal_after_name_is_div_assign() {
    let fx = lex("a/=[A-Z]+[a-z0-9A-Z]/\n");
    assert_eq!(fx.engine.trace[0].0, TokenCode::NAME);
    assert_eq!(fx.engine.trace[1].0, TokenCode::DIV_ASSIGN);
}

#[test]
fn div_assign_applies_to_numbers_too() {
    let fx = lex("a/=7\n");
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::NAME,
            TokenCode::DIV_ASSIGN,
            TokenCode::NUMBER,
            TokenCode::NEWLINE
        ]
    );
}

#[test]
fn regex_allowed_again_after_operator() {
    let fx = lex("a = /x/\n");
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::NAME,
            TokenCode::ASSIGN,
            TokenCode::ERE,
            TokenCode::NEWLINE
        ]
    );
}

#[test]
fn regex_forbidden_after_closing_paren() {
    let fx = lex("(a)/2\n");
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::LPAREN,
            TokenCode::NAME,
            TokenCode::RPAREN,
            TokenCode::SLASH,
            TokenCode::NUMBER,
            TokenCode::NEWLINE
        ]
    );
}

#[test]
fn plus_equals_is_one_compound_token() {
    let fx = lex("+=");
    assert_eq!(fx.engine.trace[0].0, TokenCode::ADD_ASSIGN);
}

#[test]
fn identifier_resolves_as_variable() {
    let fx = lex("avariable");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.category, SymbolCategory::Variable);
}

#[test]
fn unqualified_variable_is_canonicalized() {
    let fx = lex("avariable");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.qualified_name(), "Awk::avariable");
    assert_eq!(sym.target_name.as_str(), "Awk__avariable");
}

#[test]
fn explicit_namespace_mangles_variable_name() {
    let fx = lex("xxx::avariable");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.qualified_name(), "xxx::avariable");
    assert_eq!(sym.target_name.as_str(), "xxx__avariable");
}

#[test]
fn namespace_directive_prefixes_variable_name() {
    let fx = lex("@namespace xxx avariable");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.target_name.as_str(), "xxx__avariable");
    assert_eq!(sym.qualified_name(), "xxx::avariable");
}

#[test]
fn namespace_directive_ignored_by_all_uppercase() {
    let fx = lex("@namespace xxx ABC");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.target_name.as_str(), "Awk__ABC");
    assert_eq!(sym.qualified_name(), "Awk::ABC");
}

#[test]
fn namespace_directive_ignored_by_reserved_word() {
    let fx = lex("@namespace xxx if");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.qualified_name(), "if");
    assert_eq!(sym.target_name.as_str(), "if");
}

#[test]
fn explicit_namespace_overrides_uppercase_exemption() {
    let fx = lex("xxx::ABC");
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.target_name.as_str(), "xxx__ABC");
}

#[test]
fn directives_produce_no_tokens() {
    let fx = lex("@namespace xxx\n");
    assert_eq!(fx.engine.codes(), vec![TokenCode::NEWLINE]);
}

#[test]
fn include_splices_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("prelude.awk"), "BEGIN\n").unwrap();
    let fx = lex_with_paths(
        "@include \"prelude.awk\"\nEND\n",
        vec![dir.path().to_path_buf()],
    );
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::BEGIN,
            TokenCode::NEWLINE,
            TokenCode::NEWLINE,
            TokenCode::END,
            TokenCode::NEWLINE
        ]
    );
}

#[test]
fn missing_include_is_fatal() {
    let mut ast = Ast::new();
    let mut scopes = Scopes::new();
    preload(&mut scopes, Dialects::default());
    let mut engine = RecordingEngine::new();
    let mut diag = DiagnosticEngine::new();
    let mut lexer = Lexer::new(Vec::new());
    let result = lexer.run(
        "@include \"no_such_file.awk\"\n",
        &mut ast,
        &mut scopes,
        &mut engine,
        &mut diag,
    );
    assert!(matches!(result, Err(LexError::IncludeNotFound(_))));
}

#[test]
fn unknown_character_is_reported_and_skipped() {
    let fx = lex("a ` b\n");
    assert!(fx.diag.has_errors());
    // Scanning continued past the bad character.
    assert_eq!(
        fx.engine.codes(),
        vec![TokenCode::NAME, TokenCode::NAME, TokenCode::NEWLINE]
    );
}

#[test]
fn comments_run_to_end_of_line() {
    let fx = lex("a # comment with / and \"text\"\nb\n");
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::NAME,
            TokenCode::NEWLINE,
            TokenCode::NAME,
            TokenCode::NEWLINE
        ]
    );
}

#[test]
fn string_literal_keeps_quotes_and_is_constant() {
    let fx = lex("\"hello\"\n");
    assert_eq!(fx.engine.trace[0].0, TokenCode::STRING);
    let sym = symbol_of(&fx, 0);
    assert_eq!(sym.category, SymbolCategory::Constant);
    assert_eq!(sym.name.as_str(), "\"hello\"");
}

#[test]
fn postfix_increment_forbids_regex() {
    let fx = lex("a++ /2\n");
    assert_eq!(
        fx.engine.codes(),
        vec![
            TokenCode::NAME,
            TokenCode::INCR,
            TokenCode::SLASH,
            TokenCode::NUMBER,
            TokenCode::NEWLINE
        ]
    );
}
