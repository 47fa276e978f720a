use super::*;
use crate::parser::TokenCode;

fn loaded_scopes() -> Scopes {
    let mut scopes = Scopes::new();
    preload(
        &mut scopes,
        Dialects {
            gawk: true,
            awkccc: true,
        },
    );
    scopes
}

#[test]
fn get_is_idempotent() {
    let mut scopes = loaded_scopes();
    let first = scopes.get("", "counter", TokenCode::NAME, false, SymbolCategory::Variable);
    let second = scopes.get("", "counter", TokenCode::NAME, false, SymbolCategory::Variable);
    assert_eq!(first, second);
    assert_eq!(
        scopes.symbol(first).target_name,
        scopes.symbol(second).target_name
    );
}

#[test]
fn unqualified_name_gets_default_namespace() {
    let mut scopes = loaded_scopes();
    let id = scopes.get("", "avariable", TokenCode::NAME, false, SymbolCategory::Variable);
    let sym = scopes.symbol(id);
    assert_eq!(sym.namespace.as_str(), "Awk");
    assert_eq!(sym.name.as_str(), "avariable");
    assert_eq!(sym.target_name.as_str(), "Awk__avariable");
    assert_eq!(sym.qualified_name(), "Awk::avariable");
}

#[test]
fn qualified_name_is_mangled_with_written_namespace() {
    let mut scopes = loaded_scopes();
    let id = scopes.get(
        "",
        "xxx::avariable",
        TokenCode::NAME,
        true,
        SymbolCategory::Variable,
    );
    let sym = scopes.symbol(id);
    assert_eq!(sym.namespace.as_str(), "xxx");
    assert_eq!(sym.target_name.as_str(), "xxx__avariable");
}

#[test]
fn namespace_split_is_at_most_once() {
    let mut scopes = loaded_scopes();
    let id = scopes.get(
        "",
        "a::b::c",
        TokenCode::NAME,
        true,
        SymbolCategory::Variable,
    );
    let sym = scopes.symbol(id);
    assert_eq!(sym.namespace.as_str(), "a");
    assert_eq!(sym.name.as_str(), "b::c");
}

#[test]
fn bare_lookup_finds_keywords_before_mangling() {
    let mut scopes = loaded_scopes();
    let id = scopes.get("", "if", TokenCode::NAME, false, SymbolCategory::Variable);
    let sym = scopes.symbol(id);
    assert_eq!(sym.category, SymbolCategory::Statement);
    assert_eq!(sym.token, TokenCode::IF);
    assert_eq!(sym.target_name.as_str(), "if");
}

#[test]
fn begin_resolves_to_preloaded_keyword() {
    let mut scopes = loaded_scopes();
    let id = scopes.get("", "BEGIN", TokenCode::NAME, false, SymbolCategory::Variable);
    let sym = scopes.symbol(id);
    assert_eq!(sym.category, SymbolCategory::Keyword);
    assert_eq!(sym.token, TokenCode::BEGIN);
}

#[test]
fn extension_names_mirror_into_default_namespace() {
    let mut scopes = loaded_scopes();
    // `nextfile` was loaded under gawk with also_load_global set.
    let mirrored = scopes.find("Awk", "nextfile");
    assert!(mirrored.is_some());
    let direct = scopes.find("gawk", "nextfile");
    assert!(direct.is_some());
    // The private awkccc knobs are not mirrored.
    assert!(scopes.find("awkccc", "blocksize").is_some());
    assert!(scopes.find("Awk", "blocksize").is_none());
}

#[test]
fn dialect_symbols_absent_without_flags() {
    let mut scopes = Scopes::new();
    preload(&mut scopes, Dialects::default());
    assert!(scopes.find("gawk", "nextfile").is_none());
    assert!(scopes.find("awkccc", "blocksize").is_none());
    assert!(scopes.find("Awk", "BEGIN").is_some());
}

#[test]
fn insert_overwrites_and_keeps_id() {
    let mut table = SymbolTable::new();
    let first = table.insert(Symbol::new(
        "",
        "x",
        "",
        TokenCode::NAME,
        SymbolCategory::Variable,
    ));
    let second = table.insert(Symbol::new(
        "",
        "x",
        "x_override",
        TokenCode::NAME,
        SymbolCategory::Constant,
    ));
    assert_eq!(first, second);
    assert_eq!(table.symbol(first).target_name.as_str(), "x_override");
    assert_eq!(table.symbol(first).category, SymbolCategory::Constant);
}

#[test]
fn set_category_reclassifies_in_place() {
    let mut scopes = loaded_scopes();
    let id = scopes.get("", "helper", TokenCode::NAME, false, SymbolCategory::Variable);
    scopes
        .table_mut()
        .set_category(id, SymbolCategory::Function, TokenCode::FUNC_NAME);
    let sym = scopes.symbol(id);
    assert_eq!(sym.category, SymbolCategory::Function);
    assert_eq!(sym.token, TokenCode::FUNC_NAME);
}

#[test]
fn scope_stack_swaps_tables() {
    let mut scopes = loaded_scopes();
    let outer = scopes.get("", "shared", TokenCode::NAME, false, SymbolCategory::Variable);
    let outer_target = scopes.symbol(outer).target_name;

    scopes.push_scope();
    // Fresh table: the keyword preloads are gone too, so a bare name
    // mangles straight into the default namespace.
    assert!(scopes.find("Awk", "shared").is_none());
    scopes.get("", "inner_only", TokenCode::NAME, false, SymbolCategory::Variable);
    assert!(scopes.find("Awk", "inner_only").is_some());

    scopes.pop_scope();
    assert!(scopes.find("Awk", "inner_only").is_none());
    let again = scopes.find("Awk", "shared").unwrap();
    assert_eq!(scopes.symbol(again).target_name, outer_target);

    // Popping past the outermost scope is a no-op.
    scopes.pop_scope();
    assert!(scopes.find("Awk", "shared").is_some());
}

#[test]
fn used_includes_deduplicates() {
    let mut scopes = loaded_scopes();
    let cos = scopes.find("", "cos").unwrap();
    let sin = scopes.find("", "sin").unwrap();
    let system = scopes.find("", "system").unwrap();
    scopes.table_mut().mark_used(cos);
    scopes.table_mut().mark_used(sin);
    scopes.table_mut().mark_used(system);
    let includes = scopes.table().used_includes();
    assert_eq!(includes, vec!["<cmath>", "<cstdlib>"]);
}
