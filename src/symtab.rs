//! Symbol table management and scope handling.
//!
//! Every named entity in a compiled program is registered here exactly
//! once per distinct (namespace, name) pair. Lookups are get-or-create:
//! the table never reports a missing symbol, it synthesizes one with a
//! deterministically mangled target name instead. Lexical scoping is
//! modeled by [`Scopes`], which swaps whole tables in and out rather
//! than rolling back individual inserts.

use hashbrown::HashMap;
use std::num::NonZeroU32;

use log::debug;

use crate::parser::TokenCode;
use crate::NameId;

/// Source namespace that unqualified identifiers are canonicalized into.
pub const DEFAULT_NAMESPACE: &str = "Awk";

/// Namespace separator in AWK source (`ns::name`).
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Namespace separator in generated C++ names (`ns__name`).
pub const MANGLE_SEPARATOR: &str = "__";

/// Reference to a symbol stored in a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(NonZeroU32);

impl SymbolId {
    fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Semantic category of a symbol.
///
/// Identifiers resolve as `Variable` by default; the category is
/// provisional until a later use (e.g. a call site) reclassifies it via
/// [`SymbolTable::set_category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolCategory {
    Variable,
    Constant,
    Regex,
    Function,
    Statement,
    Keyword,
    Operator,
    Other,
}

/// One named entity in the compiled program.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Source namespace; empty = global.
    pub namespace: NameId,
    /// Source name, without namespace qualification.
    pub name: NameId,
    /// Mangled name used in generated C++. Never empty after construction.
    pub target_name: NameId,
    pub category: SymbolCategory,
    /// Token code the parse engine understands for this symbol.
    pub token: TokenCode,
    pub is_builtin: bool,
    /// Whether a regex literal may directly follow this token.
    pub regex_may_follow: bool,
    /// Builtin argument-type signature ("FF" = two numbers, "S" = string...).
    pub args: &'static str,
    /// Builtin return-type tag.
    pub returns: &'static str,
    /// C++ header the builtin requires, e.g. `<cmath>`.
    pub include: &'static str,
    /// Set once code generation has to emit this symbol.
    pub is_used: bool,
}

impl Symbol {
    /// Construct a symbol, deriving the mangled target name when none is
    /// supplied: `ns::name` becomes `ns__name`, an unqualified name gets
    /// the default-namespace prefix.
    pub fn new(
        namespace: &str,
        name: &str,
        target_name: &str,
        token: TokenCode,
        category: SymbolCategory,
    ) -> Self {
        let target = if target_name.is_empty() {
            if namespace.is_empty() {
                format!("{}{}{}", DEFAULT_NAMESPACE, MANGLE_SEPARATOR, name)
            } else {
                format!("{}{}{}", namespace, MANGLE_SEPARATOR, name)
            }
        } else {
            target_name.to_string()
        };
        Symbol {
            namespace: NameId::new(namespace),
            name: NameId::new(name),
            target_name: NameId::new(&target),
            category,
            token,
            is_builtin: false,
            regex_may_follow: true,
            args: "",
            returns: "",
            include: "",
            is_used: false,
        }
    }

    /// Fully qualified source spelling (`ns::name`, or bare for globals).
    pub fn qualified_name(&self) -> String {
        if self.namespace.as_str().is_empty() {
            self.name.as_str().to_string()
        } else {
            format!(
                "{}{}{}",
                self.namespace.as_str(),
                NAMESPACE_SEPARATOR,
                self.name.as_str()
            )
        }
    }
}

/// Row format for bulk-loading global keywords, operators and builtins.
pub struct SymbolSpec {
    pub name: &'static str,
    pub target: &'static str,
    pub category: SymbolCategory,
    pub token: TokenCode,
    pub is_builtin: bool,
    pub regex_may_follow: bool,
    pub args: &'static str,
    pub returns: &'static str,
    pub include: &'static str,
}

impl SymbolSpec {
    pub const fn op(name: &'static str, token: TokenCode) -> Self {
        SymbolSpec {
            name,
            target: name,
            category: SymbolCategory::Operator,
            token,
            is_builtin: false,
            regex_may_follow: true,
            args: "",
            returns: "",
            include: "",
        }
    }

    pub const fn stmt(name: &'static str, token: TokenCode) -> Self {
        SymbolSpec {
            name,
            target: name,
            category: SymbolCategory::Statement,
            token,
            is_builtin: false,
            regex_may_follow: true,
            args: "",
            returns: "",
            include: "",
        }
    }

    pub const fn kw(name: &'static str, token: TokenCode) -> Self {
        SymbolSpec {
            name,
            target: name,
            category: SymbolCategory::Keyword,
            token,
            is_builtin: false,
            regex_may_follow: true,
            args: "",
            returns: "",
            include: "",
        }
    }

    pub const fn other(name: &'static str, token: TokenCode) -> Self {
        SymbolSpec {
            name,
            target: name,
            category: SymbolCategory::Other,
            token,
            is_builtin: false,
            regex_may_follow: true,
            args: "",
            returns: "",
            include: "",
        }
    }

    pub const fn builtin(
        name: &'static str,
        target: &'static str,
        regex_may_follow: bool,
        args: &'static str,
        returns: &'static str,
        include: &'static str,
    ) -> Self {
        SymbolSpec {
            name,
            target,
            category: SymbolCategory::Function,
            token: TokenCode::BUILTIN_FUNC_NAME,
            is_builtin: true,
            regex_may_follow,
            args,
            returns,
            include,
        }
    }
}

/// Row format for bulk-loading names into a namespace.
pub struct NsSymbolSpec {
    pub name: &'static str,
    pub category: SymbolCategory,
    pub token: TokenCode,
    pub is_builtin: bool,
}

impl NsSymbolSpec {
    pub const fn kw(name: &'static str, token: TokenCode) -> Self {
        NsSymbolSpec {
            name,
            category: SymbolCategory::Keyword,
            token,
            is_builtin: false,
        }
    }

    pub const fn stmt(name: &'static str, token: TokenCode) -> Self {
        NsSymbolSpec {
            name,
            category: SymbolCategory::Statement,
            token,
            is_builtin: false,
        }
    }

    pub const fn var(name: &'static str) -> Self {
        NsSymbolSpec {
            name,
            category: SymbolCategory::Variable,
            token: TokenCode::NAME,
            is_builtin: true,
        }
    }

    pub const fn func(name: &'static str) -> Self {
        NsSymbolSpec {
            name,
            category: SymbolCategory::Function,
            token: TokenCode::BUILTIN_FUNC_NAME,
            is_builtin: false,
        }
    }

    pub const fn plain_var(name: &'static str) -> Self {
        NsSymbolSpec {
            name,
            category: SymbolCategory::Variable,
            token: TokenCode::NAME,
            is_builtin: false,
        }
    }
}

/// Mapping from (namespace, name) to [`Symbol`], keys unique, last
/// insert wins. Duplicate keys are not an error: get-or-create is
/// idempotent and collisions only occur for identical pairs.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
    map: HashMap<(NameId, NameId), SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.entries[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.entries[id.index()]
    }

    /// Unconditional insert; an existing entry under the same key is
    /// overwritten in place and keeps its id.
    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let key = (symbol.namespace, symbol.name);
        if let Some(&id) = self.map.get(&key) {
            self.entries[id.index()] = symbol;
            return id;
        }
        let id = SymbolId::new(self.entries.len() as u32 + 1).expect("SymbolId overflow");
        debug!(
            "symtab: new symbol {:?} -> {}",
            key, symbol.target_name
        );
        self.entries.push(symbol);
        self.map.insert(key, id);
        id
    }

    /// Pure lookup; never creates.
    pub fn find(&self, namespace: &str, name: &str) -> Option<SymbolId> {
        let key = (NameId::new(namespace), NameId::new(name));
        self.map.get(&key).copied()
    }

    /// Return the existing symbol for (namespace, name) or create one.
    ///
    /// With `namespace_required` unset the bare name is first tried in
    /// the global namespace (where keywords and operators live); on a
    /// miss the name is split on `::` at most once to determine the
    /// effective namespace, defaulting to [`DEFAULT_NAMESPACE`] for
    /// unqualified names. A new symbol gets its target name mangled
    /// from the effective namespace and name.
    pub fn get(
        &mut self,
        namespace: &str,
        name: &str,
        token: TokenCode,
        namespace_required: bool,
        category: SymbolCategory,
    ) -> SymbolId {
        if !namespace_required && namespace.is_empty() {
            if let Some(id) = self.find("", name) {
                return id;
            }
        }

        let (ns, bare) = if !namespace.is_empty() {
            (namespace.to_string(), name.to_string())
        } else if let Some((ns, rest)) = name.split_once(NAMESPACE_SEPARATOR) {
            (ns.to_string(), rest.to_string())
        } else {
            (DEFAULT_NAMESPACE.to_string(), name.to_string())
        };

        if let Some(id) = self.find(&ns, &bare) {
            return id;
        }

        self.insert(Symbol::new(&ns, &bare, "", token, category))
    }

    /// Reclassify a symbol whose earlier category was provisional
    /// (e.g. a variable later used as a function).
    pub fn set_category(&mut self, id: SymbolId, category: SymbolCategory, token: TokenCode) {
        let sym = self.symbol_mut(id);
        sym.category = category;
        sym.token = token;
    }

    /// Flag a symbol as referenced by generated code.
    pub fn mark_used(&mut self, id: SymbolId) {
        self.symbol_mut(id).is_used = true;
    }

    /// C++ headers required by builtins the program actually uses.
    pub fn used_includes(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for sym in &self.entries {
            if sym.is_used && sym.is_builtin && !sym.include.is_empty() {
                if !seen.contains(&sym.include) {
                    seen.push(sym.include);
                }
            }
        }
        seen
    }

    /// Bulk insert of the fixed keyword/operator/builtin set.
    pub fn load(&mut self, specs: &[SymbolSpec]) {
        for spec in specs {
            let mut sym = Symbol::new("", spec.name, spec.target, spec.token, spec.category);
            sym.is_builtin = spec.is_builtin;
            sym.regex_may_follow = spec.regex_may_follow;
            sym.args = spec.args;
            sym.returns = spec.returns;
            sym.include = spec.include;
            self.insert(sym);
        }
    }

    /// Insert a batch of names under `namespace`, mangling each target
    /// name. With `also_load_global` the same batch is duplicated into
    /// the default namespace so the names resolve without qualification.
    pub fn load_namespace(
        &mut self,
        namespace: &str,
        also_load_global: bool,
        specs: &[NsSymbolSpec],
    ) {
        for spec in specs {
            let target = format!("{}{}{}", namespace, MANGLE_SEPARATOR, spec.name);
            let mut sym = Symbol::new(namespace, spec.name, &target, spec.token, spec.category);
            sym.is_builtin = spec.is_builtin;
            self.insert(sym);
        }
        if also_load_global {
            self.load_namespace(DEFAULT_NAMESPACE, false, specs);
        }
    }
}

/// Compilation-scoped stack of symbol tables.
///
/// Exactly one table is active at a time. `push_scope` swaps the active
/// table for a fresh one; `pop_scope` restores its predecessor. The
/// whole object is passed by reference through the pipeline; there is no
/// process-wide instance.
#[derive(Debug, Default)]
pub struct Scopes {
    active: SymbolTable,
    outer: Vec<SymbolTable>,
}

impl Scopes {
    pub fn new() -> Self {
        Scopes::default()
    }

    pub fn table(&self) -> &SymbolTable {
        &self.active
    }

    pub fn table_mut(&mut self) -> &mut SymbolTable {
        &mut self.active
    }

    /// Enter a fresh scope: the active table is shelved and replaced.
    pub fn push_scope(&mut self) {
        debug!("symtab: push scope (depth {})", self.outer.len() + 1);
        let previous = std::mem::take(&mut self.active);
        self.outer.push(previous);
    }

    /// Leave the current scope, restoring the previous table. Popping
    /// the outermost scope is a logged no-op.
    pub fn pop_scope(&mut self) {
        match self.outer.pop() {
            Some(previous) => {
                debug!("symtab: pop scope (depth {})", self.outer.len());
                self.active = previous;
            }
            None => {
                debug!("symtab: pop on outermost scope ignored");
            }
        }
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.active.symbol(id)
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<SymbolId> {
        self.active.find(namespace, name)
    }

    pub fn get(
        &mut self,
        namespace: &str,
        name: &str,
        token: TokenCode,
        namespace_required: bool,
        category: SymbolCategory,
    ) -> SymbolId {
        self.active
            .get(namespace, name, token, namespace_required, category)
    }
}

/// Dialect switches controlling which extension namespaces are loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dialects {
    pub gawk: bool,
    pub awkccc: bool,
}

/// POSIX operators, statement keywords and builtins.
const BASE_SYMBOLS: &[SymbolSpec] = &[
    SymbolSpec::other("\n", TokenCode::NEWLINE),
    // Dummy operator standing in for string concatenation in the AST.
    SymbolSpec::op("@@@", TokenCode::CONCATENATE),
    SymbolSpec::op("+=", TokenCode::ADD_ASSIGN),
    SymbolSpec::op("-=", TokenCode::SUB_ASSIGN),
    SymbolSpec::op("*=", TokenCode::MUL_ASSIGN),
    SymbolSpec::op("/=", TokenCode::DIV_ASSIGN),
    SymbolSpec::op("%=", TokenCode::MOD_ASSIGN),
    SymbolSpec::op("^=", TokenCode::POW_ASSIGN),
    SymbolSpec::op("||", TokenCode::OROR),
    SymbolSpec::op("&&", TokenCode::ANDAND),
    SymbolSpec::op("!~", TokenCode::NO_MATCH),
    SymbolSpec::op("==", TokenCode::EQ),
    SymbolSpec::op("<=", TokenCode::LE),
    SymbolSpec::op(">=", TokenCode::GE),
    SymbolSpec::op("!=", TokenCode::NE),
    SymbolSpec::op("++", TokenCode::INCR),
    SymbolSpec::op("--", TokenCode::DECR),
    SymbolSpec::op(">>", TokenCode::APPEND),
    SymbolSpec::stmt("break", TokenCode::BREAK),
    SymbolSpec::stmt("continue", TokenCode::CONTINUE),
    SymbolSpec::stmt("delete", TokenCode::DELETE),
    SymbolSpec::stmt("do", TokenCode::DO),
    SymbolSpec::stmt("else", TokenCode::ELSE),
    SymbolSpec::stmt("exit", TokenCode::EXIT),
    SymbolSpec::stmt("for", TokenCode::FOR),
    SymbolSpec::stmt("function", TokenCode::FUNCTION),
    SymbolSpec::stmt("if", TokenCode::IF),
    SymbolSpec::kw("in", TokenCode::IN),
    SymbolSpec::stmt("next", TokenCode::NEXT),
    SymbolSpec::stmt("print", TokenCode::PRINT),
    SymbolSpec::stmt("printf", TokenCode::PRINTF),
    SymbolSpec::stmt("return", TokenCode::RETURN),
    SymbolSpec::stmt("while", TokenCode::WHILE),
    SymbolSpec::stmt("getline", TokenCode::GETLINE),
    // Arithmetic builtins.
    SymbolSpec::builtin("atan2", "atan2", false, "FF", "F", "<cmath>"),
    SymbolSpec::builtin("cos", "cos", false, "F", "F", "<cmath>"),
    SymbolSpec::builtin("sin", "sin", false, "F", "F", "<cmath>"),
    SymbolSpec::builtin("exp", "exp", false, "F", "F", "<cmath>"),
    SymbolSpec::builtin("log", "log", false, "F", "F", "<cmath>"),
    SymbolSpec::builtin("sqrt", "sqrt", false, "F", "F", "<cmath>"),
    // A cast is close enough to int(); int_least64_t is a typedef.
    SymbolSpec::builtin("int", "int_least64_t", false, "F", "I", "<cstdint>"),
    SymbolSpec::builtin("rand", "rand", false, "-", "F", "<cmath>"),
    SymbolSpec::builtin("srand", "srand", false, "F", "F", "<cmath>"),
    // String builtins.
    SymbolSpec::builtin("gsub", "gsub", true, "RSV", "I", ""),
    SymbolSpec::builtin("index", "index", false, "SS", "I", ""),
    SymbolSpec::builtin("length", "length", false, "S", "I", ""),
    SymbolSpec::builtin("match", "match", true, "SR", "I", ""),
    SymbolSpec::builtin("split", "split", false, "SAS", "F", ""),
    SymbolSpec::builtin("sub", "sub", false, "RSV", "I", ""),
    SymbolSpec::builtin("substr", "substr", false, "SFF", "F", ""),
    SymbolSpec::builtin("tolower", "tolower", false, "S", "F", ""),
    SymbolSpec::builtin("toupper", "toupper", false, "S", "F", ""),
    SymbolSpec::builtin("sprintf", "sprintf", false, "SV", "S", ""),
    SymbolSpec::builtin("close", "close", false, "S", "I", ""),
    SymbolSpec::builtin("system", "std::system", false, "S", "I", "<cstdlib>"),
];

/// Special patterns and the POSIX variable set, under `Awk`.
const AWK_NAMESPACE_SYMBOLS: &[NsSymbolSpec] = &[
    NsSymbolSpec::kw("BEGIN", TokenCode::BEGIN),
    NsSymbolSpec::kw("END", TokenCode::END),
    NsSymbolSpec::var("ARGC"),
    NsSymbolSpec::var("ARGV"),
    NsSymbolSpec::var("CONVFMT"),
    NsSymbolSpec::var("ENVIRON"),
    NsSymbolSpec::var("FILENAME"),
    NsSymbolSpec::var("FNR"),
    NsSymbolSpec::var("FS"),
    NsSymbolSpec::var("NF"),
    NsSymbolSpec::var("NR"),
    NsSymbolSpec::var("OFMT"),
    NsSymbolSpec::var("OFS"),
    NsSymbolSpec::var("ORS"),
    NsSymbolSpec::var("RLENGTH"),
    NsSymbolSpec::var("RS"),
    NsSymbolSpec::var("RSTART"),
    NsSymbolSpec::var("SUBSEP"),
];

const GAWK_NAMESPACE_SYMBOLS: &[NsSymbolSpec] = &[
    NsSymbolSpec::kw("BEGINFILE", TokenCode::BEGIN_FILE),
    NsSymbolSpec::kw("ENDFILE", TokenCode::END_FILE),
    NsSymbolSpec::stmt("nextfile", TokenCode::NEXT_FILE),
    NsSymbolSpec::var("ARGIND"),
    NsSymbolSpec::var("ERRNO"),
    NsSymbolSpec::var("RT"),
];

const AWKCCC_NAMESPACE_SYMBOLS: &[NsSymbolSpec] = &[
    NsSymbolSpec::kw("BEGINFILE", TokenCode::BEGIN_FILE),
    NsSymbolSpec::kw("MAINLOOP", TokenCode::MAINLOOP),
    NsSymbolSpec::kw("ENDFILE", TokenCode::END_FILE),
    NsSymbolSpec::stmt("nextfile", TokenCode::NEXT_FILE),
    NsSymbolSpec::var("ARGIND"),
    NsSymbolSpec::var("ERRNO"),
    NsSymbolSpec::var("RT"),
];

/// Runtime tuning knobs, only reachable fully qualified.
const AWKCCC_PRIVATE_SYMBOLS: &[NsSymbolSpec] = &[
    NsSymbolSpec::plain_var("blocksize"),
    NsSymbolSpec::plain_var("wait_for_pipe_close"),
    NsSymbolSpec::plain_var("support_RS"),
    NsSymbolSpec::plain_var("local_environ"),
    NsSymbolSpec::func("to_string"),
];

/// Preload the fixed language symbol set into the active table.
pub fn preload(scopes: &mut Scopes, dialects: Dialects) {
    let table = scopes.table_mut();
    table.load(BASE_SYMBOLS);
    table.load_namespace(DEFAULT_NAMESPACE, false, AWK_NAMESPACE_SYMBOLS);
    if dialects.gawk {
        table.load_namespace("gawk", true, GAWK_NAMESPACE_SYMBOLS);
    }
    if dialects.awkccc {
        table.load_namespace("awkccc", true, AWKCCC_NAMESPACE_SYMBOLS);
        table.load_namespace("awkccc", false, AWKCCC_PRIVATE_SYMBOLS);
    }
}

#[cfg(test)]
mod tests_symtab;
