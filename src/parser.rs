//! A stack-based parser for Scopus-style boolean queries.
//!
//! Grammar of query syntax:
//!
//! query -> ( term | operator | "(" query ")" )*
//! term -> FIELD "(" STRING ")" | STRING
//! operator -> "OR" | "AND" | "AND NOT"
//!
//! There is no precedence climbing. Every group (the whole line or one pair of
//! parentheses) is a `Branch` with an `AND`, an `OR` and an `AND_NOT` bucket. The
//! last operator seen selects the bucket that receives the following terms and
//! closed subgroups; a new group starts out in `AND`.
//!
//! Placement by operator state alone would turn `"a" OR "b"` into `AND: [a]` next to
//! `OR: [b]`. To keep a written disjunction in one node, an `OR` claims the operand
//! right before it when that operand was placed in `AND`. Operands in `AND_NOT` are
//! never moved.
//!
//! Examples: `TITLE("a") TITLE("b")`, `("deep learning" OR "neural network") AND
//! TITLE("survey")`, `TITLE-ABS-KEY("battery") AND NOT AUTHKEY("recycling")`

use std::mem;

use crate::error::Diagnostic;
use crate::expr::{Branch, Combinator, QueryNode};
use crate::normalize::normalize;
use crate::scanner::Token;
use crate::token_type::TokenType::*;

/// A group under construction together with its insertion mode.
#[derive(Debug, Default)]
struct Frame {
    group: Branch,
    operator: Combinator,
    last_operand: Option<Combinator>, // bucket of the operand inserted last
}

impl Frame {
    fn insert(&mut self, node: QueryNode) {
        self.group.push(self.operator, node);
        self.last_operand = Some(self.operator);
    }

    fn set_operator(&mut self, operator: Combinator) {
        if operator == Combinator::Or && self.last_operand == Some(Combinator::And) {
            if let Some(operand) = self.group.and.pop() {
                self.group.or.push(operand);
                self.last_operand = Some(Combinator::Or);
            }
        }
        self.operator = operator;
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    diagnostics: &'a mut Vec<Diagnostic>,
    stack: Vec<Frame>, // enclosing groups, innermost last
    current: Frame,
}

impl<'a> Parser<'a> {

    pub fn new(tokens: &'a [Token], diagnostics: &'a mut Vec<Diagnostic>) -> Self {
        Parser {
            tokens,
            diagnostics,
            stack: Vec::new(),
            current: Frame::default(),
        }
    }

    /// Builds the normalized tree for all tokens. Returns `None` if nothing is left after
    /// normalization. Dropped constructs are recorded in `self.diagnostics`.
    pub fn parse(mut self) -> Option<QueryNode> {
        let tokens = self.tokens;
        for token in tokens {
            match token.variant {
                Field => self.field(token),
                Or | And | AndNot => {
                    if let Some(operator) = Combinator::from_token(token.variant) {
                        self.current.set_operator(operator);
                    }
                }
                LeftParen => self.open_group(),
                RightParen => self.close_group(token),
            }
        }

        if !self.stack.is_empty() {
            tracing::debug!(open = self.stack.len(), "discarding unclosed groups");
        }
        normalize(QueryNode::Branch(self.current.group))
    }

    fn field(&mut self, token: &Token) {
        match &token.term {
            Some(term) => self.current.insert(QueryNode::Leaf(term.clone())),
            None => {
                tracing::debug!(lexeme = %token.lexeme, "dropping malformed field term");
                self.diagnostics.push(Diagnostic::MalformedField { span: token.span.clone() });
            }
        }
    }

    /// Saves the current group with its operator and starts a fresh one.
    fn open_group(&mut self) {
        let parent = mem::take(&mut self.current);
        self.stack.push(parent);
    }

    /// Normalizes the current group and attaches it to its parent using the operator
    /// the parent had when the group was opened.
    fn close_group(&mut self, token: &Token) {
        let Some(parent) = self.stack.pop() else {
            tracing::debug!(position = token.span.start, "ignoring unmatched ')'");
            self.diagnostics.push(Diagnostic::UnbalancedCloseParen { span: token.span.clone() });
            return;
        };

        let closed = mem::replace(&mut self.current, parent);
        if let Some(node) = normalize(QueryNode::Branch(closed.group)) {
            self.current.insert(node);
        }
    }
}

/// Convenience function for parsing a token sequence without collecting diagnostics.
pub fn parse_tokens(tokens: &[Token]) -> Option<QueryNode> {
    let mut diagnostics = Vec::new();
    Parser::new(tokens, &mut diagnostics).parse()
}
