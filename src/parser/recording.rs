//! Engine test double that records the (token code, node) pairs the
//! lexer feeds it instead of parsing.

use super::{char_to_token, Advance, ParseEngine, ParseError, TokenCode};
use crate::ast::{Ast, NodeRef};
use crate::symtab::Scopes;

#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    pub trace: Vec<(TokenCode, NodeRef)>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        RecordingEngine::default()
    }

    pub fn codes(&self) -> Vec<TokenCode> {
        self.trace.iter().map(|t| t.0).collect()
    }
}

impl ParseEngine for RecordingEngine {
    fn advance(
        &mut self,
        code: TokenCode,
        node: NodeRef,
        _ast: &mut Ast,
        _scopes: &mut Scopes,
    ) -> Result<Advance, ParseError> {
        self.trace.push((code, node));
        Ok(Advance::MoreInput)
    }

    fn finish(
        &mut self,
        _ast: &mut Ast,
        _scopes: &mut Scopes,
    ) -> Result<Option<NodeRef>, ParseError> {
        Ok(None)
    }

    fn char_to_token(&self, ch: char) -> Option<TokenCode> {
        char_to_token(ch)
    }
}
