//! Context-sensitive scanner.
//!
//! The lexer owns the state the grammar cannot see: whether a `/` opens
//! a regex literal or a division, whether the next string is an include
//! filename, and which namespace prefix applies to unqualified
//! identifiers. Every classified token becomes exactly one
//! [`ParseEngine::advance`] call carrying the resolved symbol's token
//! code and a fresh AST leaf. Unknown characters are reported and
//! skipped; scanning always continues with the next token.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::ast::Ast;
use crate::diagnostic::DiagnosticEngine;
use crate::parser::{ParseEngine, ParseError, TokenCode};
use crate::symtab::{Scopes, SymbolCategory, SymbolId, NAMESPACE_SEPARATOR};

const MAX_INCLUDE_DEPTH: usize = 16;

const TWO_CHAR_OPERATORS: &[&str] = &[
    "+=", "-=", "*=", "/=", "%=", "^=", "||", "&&", "!~", "==", "<=", ">=", "!=", "++", "--", ">>",
];

/// Division/regex disambiguation state.
///
/// A program may open with a regex pattern but not with a division, so
/// the flag starts out permissive; it turns [`RegexHint::Forbidden`]
/// after any token usable as a division operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexHint {
    /// Nothing scanned yet.
    Initial,
    Allowed,
    Forbidden,
}

impl RegexHint {
    fn allows_regex(self) -> bool {
        !matches!(self, RegexHint::Forbidden)
    }
}

/// Scanner failures that abort the compilation (include-file I/O).
/// Character-level problems go to the [`DiagnosticEngine`] instead.
#[derive(Debug, Error)]
pub enum LexError {
    #[error("include file \"{0}\" not found on the include path")]
    IncludeNotFound(String),
    #[error("failed to read include file {path:?}: {source}")]
    IncludeIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("includes nested deeper than {0} levels")]
    IncludeTooDeep(usize),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The scanner. State survives across included files; the cursor is
/// per-buffer.
#[derive(Debug)]
pub struct Lexer {
    regex_hint: RegexHint,
    expect_include_filename: bool,
    expect_namespace_name: bool,
    /// Active namespace prefix including separator (`"ns::"`), set by
    /// the `@namespace` directive. Empty when no override is active.
    ns_prefix: String,
    include_paths: Vec<PathBuf>,
    line: u32,
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new(Vec::new())
    }
}

impl Lexer {
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        Lexer {
            regex_hint: RegexHint::Initial,
            expect_include_filename: false,
            expect_namespace_name: false,
            ns_prefix: String::new(),
            include_paths,
            line: 1,
        }
    }

    /// Scan a whole source buffer, feeding the engine token by token.
    /// The caller finishes the parse with [`ParseEngine::finish`] once
    /// every buffer has been scanned.
    pub fn run<E: ParseEngine>(
        &mut self,
        src: &str,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
        diag: &mut DiagnosticEngine,
    ) -> Result<(), LexError> {
        self.scan(src, ast, scopes, engine, diag, 0)
    }

    fn scan<E: ParseEngine>(
        &mut self,
        src: &str,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
        diag: &mut DiagnosticEngine,
        depth: usize,
    ) -> Result<(), LexError> {
        let bytes = src.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            match bytes[pos] {
                b' ' | b'\t' | b'\r' => pos += 1,
                // Line continuation.
                b'\\' if bytes.get(pos + 1) == Some(&b'\n') => {
                    self.line += 1;
                    pos += 2;
                }
                b'#' => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                }
                b'\n' => {
                    self.line += 1;
                    pos += 1;
                    self.emit(
                        "\n",
                        TokenCode::NEWLINE,
                        SymbolCategory::Other,
                        ast,
                        scopes,
                        engine,
                    )?;
                }
                b'"' => pos = self.scan_string(src, pos, ast, scopes, engine, diag, depth)?,
                b'/' => pos = self.scan_slash(src, pos, ast, scopes, engine, diag)?,
                b'@' => pos = self.scan_directive(src, pos, diag),
                b'_' | b'a'..=b'z' | b'A'..=b'Z' => {
                    pos = self.scan_identifier(src, pos, ast, scopes, engine)?
                }
                b'0'..=b'9' => pos = self.scan_number(src, pos, ast, scopes, engine)?,
                b'.' if bytes.get(pos + 1).is_some_and(|b| b.is_ascii_digit()) => {
                    pos = self.scan_number(src, pos, ast, scopes, engine)?
                }
                _ => pos = self.scan_operator(src, pos, ast, scopes, engine, diag)?,
            }
        }
        Ok(())
    }

    /// Resolve `text`, build a leaf, and make the one engine call for
    /// this token. The symbol's registered token code wins over the
    /// scanner's guess, so keywords keep their own codes.
    fn emit<E: ParseEngine>(
        &mut self,
        text: &str,
        code: TokenCode,
        category: SymbolCategory,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
    ) -> Result<(), LexError> {
        let sym = scopes.get("", text, code, false, category);
        self.emit_symbol(sym, ast, scopes, engine)
    }

    fn emit_symbol<E: ParseEngine>(
        &mut self,
        sym: SymbolId,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
    ) -> Result<(), LexError> {
        let display = scopes.symbol(sym).qualified_name();
        let code = scopes.symbol(sym).token;
        let leaf = ast.leaf(sym, &display);
        engine.advance(code, leaf, ast, scopes)?;
        self.update_regex_hint(code);
        Ok(())
    }

    /// A token that produces a value usable as a division operand
    /// forbids a following regex; everything else allows one.
    fn update_regex_hint(&mut self, code: TokenCode) {
        let value_like = matches!(
            code,
            TokenCode::NAME
                | TokenCode::FUNC_NAME
                | TokenCode::BUILTIN_FUNC_NAME
                | TokenCode::NUMBER
                | TokenCode::STRING
                | TokenCode::ERE
                | TokenCode::RPAREN
                | TokenCode::RBRACKET
                | TokenCode::INCR
                | TokenCode::DECR
        );
        self.regex_hint = if value_like {
            RegexHint::Forbidden
        } else {
            RegexHint::Allowed
        };
    }

    fn scan_identifier<E: ParseEngine>(
        &mut self,
        src: &str,
        start: usize,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
    ) -> Result<usize, LexError> {
        let bytes = src.as_bytes();
        let mut pos = start;
        while pos < bytes.len() && (bytes[pos] == b'_' || bytes[pos].is_ascii_alphanumeric()) {
            pos += 1;
        }
        // `ns::name` is a single qualified token.
        let mut qualified = false;
        if src[pos..].starts_with(NAMESPACE_SEPARATOR)
            && bytes
                .get(pos + 2)
                .is_some_and(|b| *b == b'_' || b.is_ascii_alphabetic())
        {
            qualified = true;
            pos += 2;
            while pos < bytes.len() && (bytes[pos] == b'_' || bytes[pos].is_ascii_alphanumeric()) {
                pos += 1;
            }
        }
        let text = &src[start..pos];

        if self.expect_namespace_name {
            debug!("lexer: namespace prefix set to {:?}", text);
            self.ns_prefix = format!("{}{}", text, NAMESPACE_SEPARATOR);
            self.expect_namespace_name = false;
            return Ok(pos);
        }

        let sym = if qualified {
            // An explicit namespace bypasses the active-prefix logic.
            scopes.get("", text, TokenCode::NAME, true, SymbolCategory::Variable)
        } else {
            self.unqualified_symbol(text, scopes)
        };
        self.emit_symbol(sym, ast, scopes, engine)?;
        Ok(pos)
    }

    /// Resolution precedence for unqualified identifiers: plain global
    /// when no namespace override is active or the name is all-caps;
    /// registered statement/keyword/operator names win unprefixed; the
    /// rest resolve under the active namespace.
    fn unqualified_symbol(&mut self, text: &str, scopes: &mut Scopes) -> SymbolId {
        if self.ns_prefix.is_empty() || is_upper_alpha(text) {
            return scopes.get("", text, TokenCode::NAME, false, SymbolCategory::Variable);
        }
        if let Some(id) = scopes.find("", text) {
            if matches!(
                scopes.symbol(id).category,
                SymbolCategory::Statement | SymbolCategory::Keyword | SymbolCategory::Operator
            ) {
                return id;
            }
        }
        let prefixed = format!("{}{}", self.ns_prefix, text);
        scopes.get(
            "",
            &prefixed,
            TokenCode::NAME,
            false,
            SymbolCategory::Variable,
        )
    }

    fn scan_number<E: ParseEngine>(
        &mut self,
        src: &str,
        start: usize,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
    ) -> Result<usize, LexError> {
        let bytes = src.as_bytes();
        let mut pos = start;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos < bytes.len() && bytes[pos] == b'.' {
            pos += 1;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
        if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
            let mut exp = pos + 1;
            if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
                exp += 1;
            }
            if exp < bytes.len() && bytes[exp].is_ascii_digit() {
                pos = exp;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
        }
        self.emit(
            &src[start..pos],
            TokenCode::NUMBER,
            SymbolCategory::Constant,
            ast,
            scopes,
            engine,
        )?;
        Ok(pos)
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_string<E: ParseEngine>(
        &mut self,
        src: &str,
        start: usize,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
        diag: &mut DiagnosticEngine,
        depth: usize,
    ) -> Result<usize, LexError> {
        let bytes = src.as_bytes();
        let mut pos = start + 1;
        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' => pos += 2,
                b'"' => break,
                b'\n' => break,
                _ => pos += 1,
            }
        }
        if pos >= bytes.len() || bytes[pos] != b'"' {
            diag.report_error("unterminated string literal".to_string(), self.line);
            return Ok(pos.min(bytes.len()));
        }
        let end = pos + 1;

        if self.expect_include_filename {
            // `@include "file"` consumes the string without producing a
            // token; the file's contents are scanned in place.
            self.expect_include_filename = false;
            let filename = &src[start + 1..pos];
            self.scan_include(filename, ast, scopes, engine, diag, depth)?;
            return Ok(end);
        }

        self.emit(
            &src[start..end],
            TokenCode::STRING,
            SymbolCategory::Constant,
            ast,
            scopes,
            engine,
        )?;
        Ok(end)
    }

    fn scan_include<E: ParseEngine>(
        &mut self,
        filename: &str,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
        diag: &mut DiagnosticEngine,
        depth: usize,
    ) -> Result<(), LexError> {
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(LexError::IncludeTooDeep(MAX_INCLUDE_DEPTH));
        }
        let path = self.resolve_include(filename)?;
        debug!("lexer: including {:?}", path);
        let content = fs::read_to_string(&path).map_err(|source| LexError::IncludeIo {
            path: path.clone(),
            source,
        })?;
        let saved_line = self.line;
        self.line = 1;
        self.scan(&content, ast, scopes, engine, diag, depth + 1)?;
        self.line = saved_line;
        Ok(())
    }

    fn resolve_include(&self, filename: &str) -> Result<PathBuf, LexError> {
        let direct = Path::new(filename);
        if direct.is_absolute() {
            if direct.exists() {
                return Ok(direct.to_path_buf());
            }
            return Err(LexError::IncludeNotFound(filename.to_string()));
        }
        for dir in &self.include_paths {
            let candidate = dir.join(filename);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        if direct.exists() {
            return Ok(direct.to_path_buf());
        }
        Err(LexError::IncludeNotFound(filename.to_string()))
    }

    /// A leading `/` is a regex literal when one may follow the previous
    /// token; otherwise it is re-scanned as `/=` or plain division and
    /// the cursor resumes just past the operator.
    fn scan_slash<E: ParseEngine>(
        &mut self,
        src: &str,
        start: usize,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
        diag: &mut DiagnosticEngine,
    ) -> Result<usize, LexError> {
        let bytes = src.as_bytes();
        if self.regex_hint.allows_regex() {
            let mut pos = start + 1;
            let mut in_class = false;
            while pos < bytes.len() {
                match bytes[pos] {
                    b'\\' => pos += 2,
                    b'[' => {
                        in_class = true;
                        pos += 1;
                    }
                    b']' if in_class => {
                        in_class = false;
                        pos += 1;
                    }
                    b'/' if !in_class => break,
                    b'\n' => break,
                    _ => pos += 1,
                }
            }
            if pos >= bytes.len() || bytes[pos] != b'/' {
                diag.report_error("unterminated regex literal".to_string(), self.line);
                return Ok(pos.min(bytes.len()));
            }
            self.emit(
                &src[start..=pos],
                TokenCode::ERE,
                SymbolCategory::Regex,
                ast,
                scopes,
                engine,
            )?;
            return Ok(pos + 1);
        }

        if bytes.get(start + 1) == Some(&b'=') {
            self.emit(
                "/=",
                TokenCode::DIV_ASSIGN,
                SymbolCategory::Operator,
                ast,
                scopes,
                engine,
            )?;
            return Ok(start + 2);
        }
        let code = engine.char_to_token('/').unwrap_or(TokenCode::SLASH);
        self.emit("/", code, SymbolCategory::Operator, ast, scopes, engine)?;
        Ok(start + 1)
    }

    /// `@include` and `@namespace` directives; neither produces a token.
    fn scan_directive(&mut self, src: &str, start: usize, diag: &mut DiagnosticEngine) -> usize {
        let bytes = src.as_bytes();
        let mut pos = start + 1;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        match &src[start + 1..pos] {
            "include" => self.expect_include_filename = true,
            "namespace" => self.expect_namespace_name = true,
            other => diag.report_bad_directive(other, self.line),
        }
        pos
    }

    fn scan_operator<E: ParseEngine>(
        &mut self,
        src: &str,
        start: usize,
        ast: &mut Ast,
        scopes: &mut Scopes,
        engine: &mut E,
        diag: &mut DiagnosticEngine,
    ) -> Result<usize, LexError> {
        if start + 2 <= src.len() && src.is_char_boundary(start + 2) {
            let two = &src[start..start + 2];
            if TWO_CHAR_OPERATORS.contains(&two) {
                if let Some(sym) = scopes.find("", two) {
                    self.emit_symbol(sym, ast, scopes, engine)?;
                    return Ok(start + 2);
                }
            }
        }

        let ch = src[start..].chars().next().unwrap_or('\0');
        match engine.char_to_token(ch) {
            Some(code) => {
                let text = ch.to_string();
                self.emit(&text, code, SymbolCategory::Operator, ast, scopes, engine)?;
                Ok(start + ch.len_utf8())
            }
            None => {
                // Recoverable: report and resume at the next character.
                diag.report_bad_char(ch, self.line);
                Ok(start + ch.len_utf8())
            }
        }
    }
}

/// All-uppercase alphabetic identifiers are never namespace-prefixed.
fn is_upper_alpha(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphabetic() && c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests_lexer;
