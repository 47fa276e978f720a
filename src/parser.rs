//! Parse engine contract and the grammar implementation behind it.
//!
//! The lexer talks to the engine through [`ParseEngine`]: one
//! [`ParseEngine::advance`] call per classified token, carrying the
//! integer [`TokenCode`] and a fresh AST leaf, plus a final
//! [`ParseEngine::finish`] that yields the root. The engine is
//! authoritative for grammar validity; the lexer never enforces grammar
//! itself. [`AwkParser`] is a hand-written recursive-descent
//! implementation of the contract; a table-driven automaton could be
//! dropped in without touching the lexer.

use std::fmt;

use log::debug;
use thiserror::Error;

use crate::ast::{Ast, BranchForm, NodeRef, RuleId};
use crate::symtab::{Scopes, SymbolCategory};

/// Integer token code understood by the parse engine.
///
/// Single-character punctuation occupies the low codes, handed out by
/// [`char_to_token`]; named tokens sit above them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenCode(pub u16);

impl fmt::Display for TokenCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TokenCode {
    pub const LBRACE: TokenCode = TokenCode(1);
    pub const RBRACE: TokenCode = TokenCode(2);
    pub const LPAREN: TokenCode = TokenCode(3);
    pub const RPAREN: TokenCode = TokenCode(4);
    pub const LBRACKET: TokenCode = TokenCode(5);
    pub const RBRACKET: TokenCode = TokenCode(6);
    pub const COMMA: TokenCode = TokenCode(7);
    pub const SEMICOLON: TokenCode = TokenCode(8);
    pub const NEWLINE: TokenCode = TokenCode(9);
    pub const PLUS: TokenCode = TokenCode(10);
    pub const MINUS: TokenCode = TokenCode(11);
    pub const STAR: TokenCode = TokenCode(12);
    pub const PERCENT: TokenCode = TokenCode(13);
    pub const CARET: TokenCode = TokenCode(14);
    pub const BANG: TokenCode = TokenCode(15);
    pub const GT: TokenCode = TokenCode(16);
    pub const LT: TokenCode = TokenCode(17);
    pub const PIPE: TokenCode = TokenCode(18);
    pub const QUESTION: TokenCode = TokenCode(19);
    pub const COLON: TokenCode = TokenCode(20);
    pub const TILDE: TokenCode = TokenCode(21);
    pub const DOLLAR: TokenCode = TokenCode(22);
    pub const ASSIGN: TokenCode = TokenCode(23);
    pub const AMP: TokenCode = TokenCode(33);
    pub const SLASH: TokenCode = TokenCode(34);

    pub const CONCATENATE: TokenCode = TokenCode(35);
    pub const ADD_ASSIGN: TokenCode = TokenCode(36);
    pub const SUB_ASSIGN: TokenCode = TokenCode(37);
    pub const MUL_ASSIGN: TokenCode = TokenCode(38);
    pub const DIV_ASSIGN: TokenCode = TokenCode(39);
    pub const MOD_ASSIGN: TokenCode = TokenCode(40);
    pub const POW_ASSIGN: TokenCode = TokenCode(41);
    pub const OROR: TokenCode = TokenCode(42);
    pub const ANDAND: TokenCode = TokenCode(43);
    pub const NO_MATCH: TokenCode = TokenCode(44);
    pub const EQ: TokenCode = TokenCode(45);
    pub const LE: TokenCode = TokenCode(46);
    pub const GE: TokenCode = TokenCode(47);
    pub const NE: TokenCode = TokenCode(48);
    pub const INCR: TokenCode = TokenCode(49);
    pub const DECR: TokenCode = TokenCode(50);
    pub const APPEND: TokenCode = TokenCode(51);

    pub const BEGIN: TokenCode = TokenCode(52);
    pub const END: TokenCode = TokenCode(53);
    pub const BEGIN_FILE: TokenCode = TokenCode(54);
    pub const END_FILE: TokenCode = TokenCode(55);
    pub const MAINLOOP: TokenCode = TokenCode(56);
    pub const BREAK: TokenCode = TokenCode(57);
    pub const CONTINUE: TokenCode = TokenCode(58);
    pub const DELETE: TokenCode = TokenCode(59);
    pub const DO: TokenCode = TokenCode(60);
    pub const ELSE: TokenCode = TokenCode(61);
    pub const EXIT: TokenCode = TokenCode(62);
    pub const FOR: TokenCode = TokenCode(63);
    pub const FUNCTION: TokenCode = TokenCode(64);
    pub const IF: TokenCode = TokenCode(65);
    pub const IN: TokenCode = TokenCode(66);
    pub const NEXT: TokenCode = TokenCode(67);
    pub const NEXT_FILE: TokenCode = TokenCode(68);
    pub const PRINT: TokenCode = TokenCode(69);
    pub const PRINTF: TokenCode = TokenCode(70);
    pub const RETURN: TokenCode = TokenCode(71);
    pub const WHILE: TokenCode = TokenCode(72);
    pub const GETLINE: TokenCode = TokenCode(73);
    pub const NAME: TokenCode = TokenCode(74);
    pub const NUMBER: TokenCode = TokenCode(75);
    pub const STRING: TokenCode = TokenCode(76);
    pub const ERE: TokenCode = TokenCode(77);
    pub const FUNC_NAME: TokenCode = TokenCode(78);
    pub const BUILTIN_FUNC_NAME: TokenCode = TokenCode(79);
}

/// Map a single punctuation character to its token code.
pub fn char_to_token(ch: char) -> Option<TokenCode> {
    let code = match ch {
        '{' => TokenCode::LBRACE,
        '}' => TokenCode::RBRACE,
        '(' => TokenCode::LPAREN,
        ')' => TokenCode::RPAREN,
        '[' => TokenCode::LBRACKET,
        ']' => TokenCode::RBRACKET,
        ',' => TokenCode::COMMA,
        ';' => TokenCode::SEMICOLON,
        '+' => TokenCode::PLUS,
        '-' => TokenCode::MINUS,
        '*' => TokenCode::STAR,
        '%' => TokenCode::PERCENT,
        '^' => TokenCode::CARET,
        '!' => TokenCode::BANG,
        '>' => TokenCode::GT,
        '<' => TokenCode::LT,
        '|' => TokenCode::PIPE,
        '?' => TokenCode::QUESTION,
        ':' => TokenCode::COLON,
        '~' => TokenCode::TILDE,
        '$' => TokenCode::DOLLAR,
        '=' => TokenCode::ASSIGN,
        '&' => TokenCode::AMP,
        '/' => TokenCode::SLASH,
        _ => return None,
    };
    Some(code)
}

/// Grammar rule numbers stamped on nodes at reduction time.
pub mod rules {
    use crate::ast::RuleId;

    pub const PROGRAM: RuleId = RuleId(1);
    pub const ITEM_BEGIN: RuleId = RuleId(2);
    pub const ITEM_END: RuleId = RuleId(3);
    pub const ITEM_BEGIN_FILE: RuleId = RuleId(4);
    pub const ITEM_END_FILE: RuleId = RuleId(5);
    pub const ITEM_MAINLOOP: RuleId = RuleId(6);
    pub const ITEM_RULE: RuleId = RuleId(7);
    pub const ITEM_FUNCTION: RuleId = RuleId(8);
    pub const BLOCK: RuleId = RuleId(9);
    pub const STMT_SIMPLE: RuleId = RuleId(10);
    pub const STMT_IF: RuleId = RuleId(11);
    pub const STMT_WHILE: RuleId = RuleId(12);
    pub const STMT_DO: RuleId = RuleId(13);
    pub const STMT_FOR: RuleId = RuleId(14);
    pub const STMT_FOR_IN: RuleId = RuleId(15);
    pub const STMT_PRINT: RuleId = RuleId(16);
    pub const STMT_DELETE: RuleId = RuleId(17);
    pub const REDIRECT: RuleId = RuleId(18);
    pub const PARAM_LIST: RuleId = RuleId(19);
    pub const EXPR_ASSIGN: RuleId = RuleId(20);
    pub const EXPR_TERNARY: RuleId = RuleId(21);
    pub const EXPR_OR: RuleId = RuleId(22);
    pub const EXPR_AND: RuleId = RuleId(23);
    pub const EXPR_IN: RuleId = RuleId(24);
    pub const EXPR_MATCH: RuleId = RuleId(25);
    pub const EXPR_REL: RuleId = RuleId(26);
    pub const EXPR_CONCAT: RuleId = RuleId(27);
    pub const EXPR_ADD: RuleId = RuleId(28);
    pub const EXPR_MUL: RuleId = RuleId(29);
    pub const EXPR_POW: RuleId = RuleId(30);
    pub const EXPR_UNARY: RuleId = RuleId(31);
    pub const EXPR_INCDEC: RuleId = RuleId(32);
    pub const EXPR_FIELD: RuleId = RuleId(33);
    pub const EXPR_CALL: RuleId = RuleId(34);
    pub const EXPR_INDEX: RuleId = RuleId(35);
    pub const EXPR_GETLINE: RuleId = RuleId(36);
}

/// Parse failures. Lexical errors are recovered in the lexer; a grammar
/// error is fatal for the compilation.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected token (code {0})")]
    UnexpectedToken(TokenCode),
    #[error("expected token code {expected}, found {found}")]
    Expected { expected: TokenCode, found: TokenCode },
    #[error("unexpected end of input")]
    UnexpectedEnd,
}

/// Outcome of feeding one token to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The engine needs more tokens.
    MoreInput,
    /// A complete program reduced to this root.
    Finished(NodeRef),
}

/// The grammar engine the lexer drives.
///
/// `advance` consumes one (token code, AST leaf) pair; `finish` signals
/// end of input and surrenders the root handle, if any. The symbol
/// table is lent for the duration of each call so reductions can
/// consult and reclassify symbols.
pub trait ParseEngine {
    fn advance(
        &mut self,
        code: TokenCode,
        node: NodeRef,
        ast: &mut Ast,
        scopes: &mut Scopes,
    ) -> Result<Advance, ParseError>;

    fn finish(&mut self, ast: &mut Ast, scopes: &mut Scopes)
        -> Result<Option<NodeRef>, ParseError>;

    fn char_to_token(&self, ch: char) -> Option<TokenCode>;
}

/// Hand-written grammar engine for the AWK subset.
///
/// Tokens are buffered as they arrive; the grammar runs as a single
/// descent over the buffer when `finish` is called.
#[derive(Debug, Default)]
pub struct AwkParser {
    buffer: Vec<(TokenCode, NodeRef)>,
}

impl AwkParser {
    pub fn new() -> Self {
        AwkParser::default()
    }
}

impl ParseEngine for AwkParser {
    fn advance(
        &mut self,
        code: TokenCode,
        node: NodeRef,
        _ast: &mut Ast,
        _scopes: &mut Scopes,
    ) -> Result<Advance, ParseError> {
        self.buffer.push((code, node));
        Ok(Advance::MoreInput)
    }

    fn finish(
        &mut self,
        ast: &mut Ast,
        scopes: &mut Scopes,
    ) -> Result<Option<NodeRef>, ParseError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        debug!("parser: reducing {} buffered token(s)", self.buffer.len());
        let tokens = std::mem::take(&mut self.buffer);
        let mut grammar = Grammar {
            tokens: &tokens,
            pos: 0,
            ast,
            scopes,
            no_greater: false,
        };
        let root = grammar.parse_program()?;
        Ok(Some(root))
    }

    fn char_to_token(&self, ch: char) -> Option<TokenCode> {
        char_to_token(ch)
    }
}

struct Grammar<'a> {
    tokens: &'a [(TokenCode, NodeRef)],
    pos: usize,
    ast: &'a mut Ast,
    scopes: &'a mut Scopes,
    /// Inside a print expression list a bare `>` is output redirection,
    /// not comparison.
    no_greater: bool,
}

impl<'a> Grammar<'a> {
    fn peek(&self) -> Option<TokenCode> {
        self.tokens.get(self.pos).map(|t| t.0)
    }

    fn peek_at(&self, offset: usize) -> Option<TokenCode> {
        self.tokens.get(self.pos + offset).map(|t| t.0)
    }

    fn at(&self, code: TokenCode) -> bool {
        self.peek() == Some(code)
    }

    fn bump(&mut self) -> Result<(TokenCode, NodeRef), ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .copied()
            .ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn bump_node(&mut self) -> Result<NodeRef, ParseError> {
        Ok(self.bump()?.1)
    }

    fn eat(&mut self, code: TokenCode) -> Option<NodeRef> {
        if self.at(code) {
            let node = self.tokens[self.pos].1;
            self.pos += 1;
            Some(node)
        } else {
            None
        }
    }

    fn expect(&mut self, code: TokenCode) -> Result<NodeRef, ParseError> {
        match self.peek() {
            Some(found) if found == code => self.bump_node(),
            Some(found) => Err(ParseError::Expected {
                expected: code,
                found,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenCode::NEWLINE) {
            self.pos += 1;
        }
    }

    fn skip_terminators(&mut self) {
        while self.at(TokenCode::NEWLINE) || self.at(TokenCode::SEMICOLON) {
            self.pos += 1;
        }
    }

    // program := (item | terminator)*
    fn parse_program(&mut self) -> Result<NodeRef, ParseError> {
        let root = self.ast.program(rules::PROGRAM);
        loop {
            self.skip_terminators();
            let Some(code) = self.peek() else { break };
            let item = match code {
                TokenCode::BEGIN => self.parse_special_block(rules::ITEM_BEGIN)?,
                TokenCode::END => self.parse_special_block(rules::ITEM_END)?,
                TokenCode::BEGIN_FILE => self.parse_special_block(rules::ITEM_BEGIN_FILE)?,
                TokenCode::END_FILE => self.parse_special_block(rules::ITEM_END_FILE)?,
                TokenCode::MAINLOOP => self.parse_special_block(rules::ITEM_MAINLOOP)?,
                TokenCode::FUNCTION => self.parse_function_item()?,
                _ => self.parse_rule_item()?,
            };
            self.ast.add_child(root, item);
        }
        Ok(root)
    }

    // BEGIN/END/BEGINFILE/ENDFILE/MAINLOOP block
    fn parse_special_block(&mut self, rule: RuleId) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        self.skip_newlines();
        let block = self.parse_block()?;
        let stmt = self.ast.statement(keyword, rule);
        self.ast.add_child(stmt, block);
        Ok(stmt)
    }

    // pattern-action rule: pattern, action, or both
    fn parse_rule_item(&mut self) -> Result<NodeRef, ParseError> {
        let item = self.ast.pattern(rules::ITEM_RULE);
        if !self.at(TokenCode::LBRACE) {
            let pattern = self.parse_expression()?;
            self.ast.add_child(item, pattern);
        }
        if self.at(TokenCode::LBRACE) {
            let block = self.parse_block()?;
            self.ast.add_child(item, block);
        }
        Ok(item)
    }

    // function NAME '(' params ')' block
    fn parse_function_item(&mut self) -> Result<NodeRef, ParseError> {
        self.bump()?; // `function` keyword
        let name = match self.peek() {
            Some(TokenCode::NAME) | Some(TokenCode::FUNC_NAME) => self.bump_node()?,
            Some(found) => return Err(ParseError::UnexpectedToken(found)),
            None => return Err(ParseError::UnexpectedEnd),
        };
        self.reclassify_as_function(name);
        self.expect(TokenCode::LPAREN)?;
        let params = self.ast.empty("parameters", Some(rules::PARAM_LIST));
        self.ast.node_mut(params).dummy = false;
        while !self.at(TokenCode::RPAREN) {
            let param = self.expect(TokenCode::NAME)?;
            self.ast.add_child(params, param);
            if self.eat(TokenCode::COMMA).is_none() {
                break;
            }
        }
        self.expect(TokenCode::RPAREN)?;
        self.skip_newlines();
        let body = self.parse_block()?;
        Ok(self
            .ast
            .function("Function", name, params, body, rules::ITEM_FUNCTION))
    }

    // '{' statement* '}'
    fn parse_block(&mut self) -> Result<NodeRef, ParseError> {
        self.expect(TokenCode::LBRACE)?;
        let block = self.ast.empty("block", Some(rules::BLOCK));
        loop {
            self.skip_terminators();
            if self.at(TokenCode::RBRACE) {
                break;
            }
            if self.peek().is_none() {
                return Err(ParseError::UnexpectedEnd);
            }
            let stmt = self.parse_statement()?;
            self.ast.add_child(block, stmt);
        }
        self.expect(TokenCode::RBRACE)?;
        Ok(block)
    }

    fn parse_statement(&mut self) -> Result<NodeRef, ParseError> {
        match self.peek().ok_or(ParseError::UnexpectedEnd)? {
            TokenCode::LBRACE => self.parse_block(),
            TokenCode::IF => self.parse_if(),
            TokenCode::WHILE => self.parse_while(),
            TokenCode::DO => self.parse_do(),
            TokenCode::FOR => self.parse_for(),
            TokenCode::PRINT | TokenCode::PRINTF => self.parse_print(),
            TokenCode::DELETE => self.parse_delete(),
            TokenCode::NEXT | TokenCode::NEXT_FILE | TokenCode::BREAK | TokenCode::CONTINUE => {
                let keyword = self.bump_node()?;
                Ok(self.ast.statement(keyword, rules::STMT_SIMPLE))
            }
            TokenCode::EXIT | TokenCode::RETURN => {
                let keyword = self.bump_node()?;
                let stmt = self.ast.statement(keyword, rules::STMT_SIMPLE);
                if self.starts_expression() {
                    let value = self.parse_expression()?;
                    self.ast.add_child(stmt, value);
                }
                Ok(stmt)
            }
            _ => self.parse_expression(),
        }
    }

    fn parse_if(&mut self) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        self.expect(TokenCode::LPAREN)?;
        let cond = self.parse_expression()?;
        self.expect(TokenCode::RPAREN)?;
        self.skip_newlines();
        let body = self.parse_statement()?;
        let else_body = self.parse_optional_else()?;
        Ok(self
            .ast
            .branch(BranchForm::If, keyword, cond, body, else_body, rules::STMT_IF))
    }

    fn parse_optional_else(&mut self) -> Result<Option<NodeRef>, ParseError> {
        let saved = self.pos;
        self.skip_terminators();
        if self.eat(TokenCode::ELSE).is_some() {
            self.skip_newlines();
            Ok(Some(self.parse_statement()?))
        } else {
            self.pos = saved;
            Ok(None)
        }
    }

    fn parse_while(&mut self) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        self.expect(TokenCode::LPAREN)?;
        let cond = self.parse_expression()?;
        self.expect(TokenCode::RPAREN)?;
        self.skip_newlines();
        let body = self.parse_statement()?;
        Ok(self
            .ast
            .branch(BranchForm::While, keyword, cond, body, None, rules::STMT_WHILE))
    }

    fn parse_do(&mut self) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        self.skip_newlines();
        let body = self.parse_statement()?;
        self.skip_terminators();
        self.expect(TokenCode::WHILE)?;
        self.expect(TokenCode::LPAREN)?;
        let cond = self.parse_expression()?;
        self.expect(TokenCode::RPAREN)?;
        Ok(self
            .ast
            .branch(BranchForm::Do, keyword, cond, body, None, rules::STMT_DO))
    }

    fn parse_for(&mut self) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        self.expect(TokenCode::LPAREN)?;

        // for (name in array) body
        if self.at(TokenCode::NAME) && self.peek_at(1) == Some(TokenCode::IN) {
            let element = self.bump_node()?;
            self.bump()?; // `in`
            let array = self.parse_expression()?;
            self.expect(TokenCode::RPAREN)?;
            self.skip_newlines();
            let body = self.parse_statement()?;
            return Ok(self
                .ast
                .for_each(keyword, element, array, body, rules::STMT_FOR_IN));
        }

        let init = if self.at(TokenCode::SEMICOLON) {
            self.ast.empty("for_init", Some(rules::STMT_FOR))
        } else {
            self.parse_expression()?
        };
        self.expect(TokenCode::SEMICOLON)?;
        let cond = if self.at(TokenCode::SEMICOLON) {
            self.ast.empty("for_cond", Some(rules::STMT_FOR))
        } else {
            self.parse_expression()?
        };
        self.expect(TokenCode::SEMICOLON)?;
        let step = if self.at(TokenCode::RPAREN) {
            self.ast.empty("for_step", Some(rules::STMT_FOR))
        } else {
            self.parse_expression()?
        };
        self.expect(TokenCode::RPAREN)?;
        self.skip_newlines();
        let body = self.parse_statement()?;
        Ok(self
            .ast
            .for_counted(keyword, init, cond, step, body, rules::STMT_FOR))
    }

    // print/printf expression list with optional output redirection
    fn parse_print(&mut self) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        let stmt = self.ast.statement(keyword, rules::STMT_PRINT);
        if self.starts_expression() {
            self.no_greater = true;
            loop {
                let arg = self.parse_expression()?;
                self.ast.add_child(stmt, arg);
                if self.eat(TokenCode::COMMA).is_none() {
                    break;
                }
                self.skip_newlines();
            }
            self.no_greater = false;
        }
        if self.at(TokenCode::GT) || self.at(TokenCode::APPEND) {
            let op = self.bump_node()?;
            let target = self.parse_expression()?;
            let redirect = self.ast.operation("REDIRECT", op, rules::REDIRECT);
            self.ast.add_child(redirect, target);
            self.ast.add_child(stmt, redirect);
        }
        Ok(stmt)
    }

    fn parse_delete(&mut self) -> Result<NodeRef, ParseError> {
        let keyword = self.bump_node()?;
        let target = self.parse_expression()?;
        let stmt = self.ast.statement(keyword, rules::STMT_DELETE);
        self.ast.add_child(stmt, target);
        Ok(stmt)
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenCode::NAME
                    | TokenCode::FUNC_NAME
                    | TokenCode::BUILTIN_FUNC_NAME
                    | TokenCode::NUMBER
                    | TokenCode::STRING
                    | TokenCode::ERE
                    | TokenCode::DOLLAR
                    | TokenCode::LPAREN
                    | TokenCode::BANG
                    | TokenCode::MINUS
                    | TokenCode::PLUS
                    | TokenCode::INCR
                    | TokenCode::DECR
                    | TokenCode::GETLINE
            )
        )
    }

    fn starts_operand(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenCode::NAME
                    | TokenCode::FUNC_NAME
                    | TokenCode::BUILTIN_FUNC_NAME
                    | TokenCode::NUMBER
                    | TokenCode::STRING
                    | TokenCode::ERE
                    | TokenCode::DOLLAR
                    | TokenCode::LPAREN
            )
        )
    }

    pub(crate) fn parse_expression(&mut self) -> Result<NodeRef, ParseError> {
        self.parse_assignment()
    }

    // right-associative
    fn parse_assignment(&mut self) -> Result<NodeRef, ParseError> {
        let lhs = self.parse_ternary()?;
        let is_assign_op = matches!(
            self.peek(),
            Some(
                TokenCode::ASSIGN
                    | TokenCode::ADD_ASSIGN
                    | TokenCode::SUB_ASSIGN
                    | TokenCode::MUL_ASSIGN
                    | TokenCode::DIV_ASSIGN
                    | TokenCode::MOD_ASSIGN
                    | TokenCode::POW_ASSIGN
            )
        );
        if is_assign_op {
            let op = self.bump_node()?;
            self.skip_newlines();
            let rhs = self.parse_assignment()?;
            return Ok(self.ast.binary(lhs, op, rhs, rules::EXPR_ASSIGN));
        }
        Ok(lhs)
    }

    fn parse_ternary(&mut self) -> Result<NodeRef, ParseError> {
        let cond = self.parse_or()?;
        if self.at(TokenCode::QUESTION) {
            let op = self.bump_node()?;
            self.skip_newlines();
            let if_true = self.parse_ternary()?;
            self.expect(TokenCode::COLON)?;
            self.skip_newlines();
            let if_false = self.parse_ternary()?;
            return Ok(self
                .ast
                .ternary(op, cond, if_true, if_false, rules::EXPR_TERNARY));
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.at(TokenCode::OROR) {
            let op = self.bump_node()?;
            self.skip_newlines();
            let rhs = self.parse_and()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_OR);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_in()?;
        while self.at(TokenCode::ANDAND) {
            let op = self.bump_node()?;
            self.skip_newlines();
            let rhs = self.parse_in()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_AND);
        }
        Ok(lhs)
    }

    fn parse_in(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_match()?;
        while self.at(TokenCode::IN) {
            let op = self.bump_node()?;
            let rhs = self.parse_match()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_IN);
        }
        Ok(lhs)
    }

    fn parse_match(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_relational()?;
        while self.at(TokenCode::TILDE) || self.at(TokenCode::NO_MATCH) {
            let op = self.bump_node()?;
            let rhs = self.parse_relational()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_MATCH);
        }
        Ok(lhs)
    }

    // non-associative: a < b < c is not a relational chain
    fn parse_relational(&mut self) -> Result<NodeRef, ParseError> {
        let lhs = self.parse_concat()?;
        let is_rel = match self.peek() {
            Some(TokenCode::LT | TokenCode::LE | TokenCode::EQ | TokenCode::NE | TokenCode::GE) => {
                true
            }
            Some(TokenCode::GT) => !self.no_greater,
            _ => false,
        };
        if is_rel {
            let op = self.bump_node()?;
            let rhs = self.parse_concat()?;
            return Ok(self.ast.binary(lhs, op, rhs, rules::EXPR_REL));
        }
        Ok(lhs)
    }

    // juxtaposition is string concatenation
    fn parse_concat(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_additive()?;
        while self.starts_operand() {
            let op = self.concat_op();
            let rhs = self.parse_additive()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_CONCAT);
        }
        Ok(lhs)
    }

    /// Leaf for the dummy `@@@` concatenation operator.
    fn concat_op(&mut self) -> NodeRef {
        let sym = self.scopes.get(
            "",
            "@@@",
            TokenCode::CONCATENATE,
            false,
            SymbolCategory::Operator,
        );
        self.ast.leaf(sym, "@@@")
    }

    fn parse_additive(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        while self.at(TokenCode::PLUS) || self.at(TokenCode::MINUS) {
            let op = self.bump_node()?;
            let rhs = self.parse_multiplicative()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_ADD);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<NodeRef, ParseError> {
        let mut lhs = self.parse_power()?;
        while self.at(TokenCode::STAR) || self.at(TokenCode::SLASH) || self.at(TokenCode::PERCENT)
        {
            let op = self.bump_node()?;
            let rhs = self.parse_power()?;
            lhs = self.ast.binary(lhs, op, rhs, rules::EXPR_MUL);
        }
        Ok(lhs)
    }

    // right-associative
    fn parse_power(&mut self) -> Result<NodeRef, ParseError> {
        let lhs = self.parse_unary()?;
        if self.at(TokenCode::CARET) {
            let op = self.bump_node()?;
            let rhs = self.parse_power()?;
            return Ok(self.ast.binary(lhs, op, rhs, rules::EXPR_POW));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeRef, ParseError> {
        match self.peek() {
            Some(TokenCode::BANG | TokenCode::MINUS | TokenCode::PLUS) => {
                let op = self.bump_node()?;
                let operand = self.parse_unary()?;
                Ok(self.ast.unary_prefix(op, operand, rules::EXPR_UNARY))
            }
            Some(TokenCode::INCR | TokenCode::DECR) => {
                let op = self.bump_node()?;
                let operand = self.parse_unary()?;
                Ok(self.ast.unary_prefix(op, operand, rules::EXPR_INCDEC))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<NodeRef, ParseError> {
        let mut node = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(TokenCode::INCR | TokenCode::DECR) => {
                    let op = self.bump_node()?;
                    node = self.ast.unary_postfix(node, op, rules::EXPR_INCDEC);
                }
                Some(TokenCode::LBRACKET) => {
                    let op = self.bump_node()?;
                    let index = self.ast.operation("INDEX", op, rules::EXPR_INDEX);
                    self.ast.add_child(index, node);
                    loop {
                        let subscript = self.parse_expression()?;
                        self.ast.add_child(index, subscript);
                        if self.eat(TokenCode::COMMA).is_none() {
                            break;
                        }
                    }
                    self.expect(TokenCode::RBRACKET)?;
                    node = index;
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<NodeRef, ParseError> {
        match self.peek().ok_or(ParseError::UnexpectedEnd)? {
            TokenCode::DOLLAR => {
                let op = self.bump_node()?;
                let operand = self.parse_primary()?;
                Ok(self.ast.unary_prefix(op, operand, rules::EXPR_FIELD))
            }
            TokenCode::LPAREN => {
                self.bump()?;
                let saved_no_greater = self.no_greater;
                self.no_greater = false;
                let inner = self.parse_expression()?;
                self.no_greater = saved_no_greater;
                self.expect(TokenCode::RPAREN)?;
                Ok(inner)
            }
            TokenCode::NUMBER | TokenCode::STRING | TokenCode::ERE => self.bump_node(),
            TokenCode::GETLINE => {
                let keyword = self.bump_node()?;
                let stmt = self.ast.statement(keyword, rules::EXPR_GETLINE);
                if self.at(TokenCode::NAME) || self.at(TokenCode::DOLLAR) {
                    let target = self.parse_primary()?;
                    self.ast.add_child(stmt, target);
                }
                Ok(stmt)
            }
            TokenCode::NAME | TokenCode::FUNC_NAME | TokenCode::BUILTIN_FUNC_NAME => {
                let name = self.bump_node()?;
                if self.at(TokenCode::LPAREN) {
                    self.reclassify_as_function(name);
                    let args = self.parse_call_args()?;
                    let call = self.ast.operation("CALL", name, rules::EXPR_CALL);
                    self.ast.add_children(call, &args);
                    return Ok(call);
                }
                Ok(name)
            }
            found => Err(ParseError::UnexpectedToken(found)),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<NodeRef>, ParseError> {
        self.expect(TokenCode::LPAREN)?;
        let saved_no_greater = self.no_greater;
        self.no_greater = false;
        let mut args = Vec::new();
        if !self.at(TokenCode::RPAREN) {
            loop {
                args.push(self.parse_expression()?);
                if self.eat(TokenCode::COMMA).is_none() {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.no_greater = saved_no_greater;
        self.expect(TokenCode::RPAREN)?;
        Ok(args)
    }

    /// A name used as a call target: its provisional `Variable`
    /// category becomes `Function` in place. Builtins keep their own
    /// category and are flagged as used instead.
    fn reclassify_as_function(&mut self, name: NodeRef) {
        let Some(sym) = self.ast.node(name).symbol else {
            return;
        };
        let (category, is_builtin) = {
            let symbol = self.scopes.symbol(sym);
            (symbol.category, symbol.is_builtin)
        };
        if is_builtin {
            self.scopes.table_mut().mark_used(sym);
            return;
        }
        if category == SymbolCategory::Variable {
            debug!("parser: reclassifying {:?} as function", sym);
            self.scopes
                .table_mut()
                .set_category(sym, SymbolCategory::Function, TokenCode::FUNC_NAME);
        }
    }
}

#[cfg(test)]
pub(crate) mod recording;
