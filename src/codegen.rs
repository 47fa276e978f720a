//! Code emission into named output segments, and template splicing.
//!
//! The generator walks a normalized tree and appends text to one of a
//! fixed set of segments. The text is the diagnostic rendering from
//! [`crate::ast::printer`] (the real C++ lowering grows inside that
//! skeleton). A template file then receives the segments: every line
//! starting with the marker sigil is matched against the ordered marker
//! table and replaced by the matching segment's contents; everything
//! else passes through verbatim.

use log::debug;

use crate::ast::printer::{write_header, write_node};
use crate::ast::{Ast, NodeKind, NodeRef};
use crate::parser::TokenCode;
use crate::symtab::Scopes;

/// Number of output segments a segment array must provide.
pub const SEGMENT_COUNT: usize = 8;

/// Named output segments, in marker-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Includes,
    Variables,
    Procedures,
    Begin,
    BeginFile,
    Body,
    EndFile,
    End,
}

impl Segment {
    pub const ALL: [Segment; SEGMENT_COUNT] = [
        Segment::Includes,
        Segment::Variables,
        Segment::Procedures,
        Segment::Begin,
        Segment::BeginFile,
        Segment::Body,
        Segment::EndFile,
        Segment::End,
    ];

    pub fn index(self) -> usize {
        match self {
            Segment::Includes => 0,
            Segment::Variables => 1,
            Segment::Procedures => 2,
            Segment::Begin => 3,
            Segment::BeginFile => 4,
            Segment::Body => 5,
            Segment::EndFile => 6,
            Segment::End => 7,
        }
    }

    /// Marker spelling recognized in template files.
    pub fn marker(self) -> &'static str {
        match self {
            Segment::Includes => "%includes;",
            Segment::Variables => "%variables;",
            Segment::Procedures => "%procedures;",
            Segment::Begin => "%begin;",
            Segment::BeginFile => "%begin_file;",
            Segment::Body => "%body;",
            Segment::EndFile => "%end_file;",
            Segment::End => "%end;",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Segment::Includes => "includes",
            Segment::Variables => "variables",
            Segment::Procedures => "procedures",
            Segment::Begin => "begin",
            Segment::BeginFile => "begin_file",
            Segment::Body => "body",
            Segment::EndFile => "end_file",
            Segment::End => "end",
        }
    }
}

/// Walks a normalized tree and fills the segment array.
pub struct CodeGen<'a> {
    ast: &'a Ast,
    scopes: &'a Scopes,
    segments: Vec<String>,
}

impl<'a> CodeGen<'a> {
    pub fn new(ast: &'a Ast, scopes: &'a Scopes) -> Self {
        CodeGen {
            ast,
            scopes,
            segments: vec![String::new(); SEGMENT_COUNT],
        }
    }

    /// Construct with a caller-supplied segment array (for tests and
    /// callers that pre-fill segments). A short array would silently
    /// misalign every emission, so it aborts construction.
    pub fn with_segments(ast: &'a Ast, scopes: &'a Scopes, segments: Vec<String>) -> Self {
        if segments.len() < SEGMENT_COUNT {
            panic!(
                "CodeGen segment array too short: {} segments, {} required",
                segments.len(),
                SEGMENT_COUNT
            );
        }
        CodeGen {
            ast,
            scopes,
            segments,
        }
    }

    /// Render the tree and hand back the filled segments.
    pub fn generate(mut self, root: NodeRef) -> Vec<String> {
        self.emit_includes();
        self.visit_root(root);
        self.segments
    }

    fn segment_mut(&mut self, segment: Segment) -> &mut String {
        &mut self.segments[segment.index()]
    }

    /// `#include` lines for every builtin the program referenced.
    fn emit_includes(&mut self) {
        for include in self.scopes.table().used_includes() {
            let line = format!("#include {}\n", include);
            self.segment_mut(Segment::Includes).push_str(&line);
        }
    }

    fn visit_root(&mut self, root: NodeRef) {
        let ast = self.ast;
        match ast.node(root).kind {
            NodeKind::Program => {
                write_header(ast, root, "", "", self.segment_mut(Segment::Body));
                let children: Vec<NodeRef> = ast.node(root).children.iter().copied().collect();
                for child in children {
                    self.route_item(child);
                }
            }
            _ => {
                write_node(ast, root, "", "", self.segment_mut(Segment::Body));
            }
        }
    }

    /// Send a program item to its segment. Special blocks leave a note
    /// in the body segment so the record order stays readable there.
    fn route_item(&mut self, item: NodeRef) {
        let ast = self.ast;
        let segment = self.segment_for(item);
        debug!("codegen: item {} -> {}", item.get(), segment.name());
        if segment != Segment::Body {
            let note = format!("// {} block\n", segment.name());
            self.segment_mut(Segment::Body).push_str(&note);
        }
        write_node(ast, item, "", "", self.segment_mut(segment));
    }

    fn segment_for(&self, item: NodeRef) -> Segment {
        let node = self.ast.node(item);
        if !matches!(node.kind, NodeKind::Statement { .. }) {
            return Segment::Body;
        }
        let Some(sym) = node.symbol else {
            return Segment::Body;
        };
        match self.scopes.symbol(sym).token {
            TokenCode::BEGIN => Segment::Begin,
            TokenCode::END => Segment::End,
            TokenCode::BEGIN_FILE => Segment::BeginFile,
            TokenCode::END_FILE => Segment::EndFile,
            _ => Segment::Body,
        }
    }
}

/// Convenience wrapper: render `root` into a fresh segment array.
pub fn generate_segments(ast: &Ast, scopes: &Scopes, root: NodeRef) -> Vec<String> {
    CodeGen::new(ast, scopes).generate(root)
}

/// Merge segments into a template. Lines starting with the marker
/// sigil are matched against the ordered marker table, first match
/// wins; a matching line is replaced by the segment's accumulated
/// contents. Unrecognized marker lines and ordinary lines pass through
/// verbatim, one line per input line.
pub fn splice_template(template: &str, segments: &[String]) -> String {
    if segments.len() < SEGMENT_COUNT {
        panic!(
            "template splice segment array too short: {} segments, {} required",
            segments.len(),
            SEGMENT_COUNT
        );
    }
    let mut out = String::new();
    for line in template.lines() {
        if line.starts_with('%') {
            if let Some(segment) = Segment::ALL
                .iter()
                .find(|segment| line.starts_with(segment.marker()))
            {
                out.push_str(&segments[segment.index()]);
                continue;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests_codegen;
