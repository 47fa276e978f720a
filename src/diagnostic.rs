//! Diagnostic collection and reporting.
//!
//! Lexical errors are recoverable: they are recorded here and scanning
//! continues with the next token. Everything else in the pipeline
//! (I/O, parse failures) is surfaced through `Result` instead.

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Note,
}

/// A single collected diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub line: u32,
}

/// Collects diagnostics during scanning and parsing.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        DiagnosticEngine {
            diagnostics: Vec::new(),
        }
    }

    /// Record a character the scanner could not map to any token.
    pub fn report_bad_char(&mut self, ch: char, line: u32) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: format!("unknown character {:?} in input", ch),
            line,
        });
    }

    /// Record an unrecognized `@` directive.
    pub fn report_bad_directive(&mut self, text: &str, line: u32) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: format!("unknown directive \"@{}\"", text),
            line,
        });
    }

    pub fn report_error(&mut self, message: String, line: u32) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message,
            line,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.level == DiagnosticLevel::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print every collected diagnostic to stderr.
    pub fn print_all(&self) {
        for diag in &self.diagnostics {
            let level = match diag.level {
                DiagnosticLevel::Error => "error",
                DiagnosticLevel::Warning => "warning",
                DiagnosticLevel::Note => "note",
            };
            eprintln!("{}: {} at line {}", level, diag.message, diag.line);
        }
    }
}
