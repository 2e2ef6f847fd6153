//! Converts Scopus-style boolean search queries into structured trees.
//!
//! One query line goes through three stages:
//!
//! - the [`scanner`] turns it into tokens, inserting implicit `AND`s,
//! - the [`parser`] sorts the tokens into nested `AND` / `OR` / `AND_NOT` buckets,
//! - the [`normalize`] pass drops empty groups and single-child wrappers.
//!
//! ```
//! use scopus_query::{parse_line, QueryNode, FieldName};
//!
//! let tree = parse_line("TITLE(\"a\") TITLE(\"b\")").unwrap();
//! assert_eq!(
//!     tree,
//!     QueryNode::and(vec![
//!         QueryNode::leaf(FieldName::Title, "a"),
//!         QueryNode::leaf(FieldName::Title, "b"),
//!     ])
//! );
//! ```

pub mod batch;
pub mod error;
pub mod expr;
pub mod normalize;
pub mod parser;
pub mod scanner;
pub mod token_type;

pub use error::{Diagnostic, QueryError, RunError};
pub use expr::{Branch, Combinator, FieldName, FieldTerm, QueryNode};
pub use normalize::normalize;
pub use parser::{Parser, parse_tokens};
pub use scanner::{Token, tokenize};

/// Everything learned from parsing a single line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineAnalysis {
    /// The line after preprocessing. Diagnostic spans point into this string.
    pub source: String,
    pub tree: Option<QueryNode>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LineAnalysis {
    pub fn into_result(self) -> Result<QueryNode, QueryError> {
        self.tree.ok_or(QueryError::EmptyResult)
    }
}

/// Parses one line and keeps the diagnostics for constructs that were dropped.
pub fn analyze_line(raw: &str) -> LineAnalysis {
    let source = scanner::preprocess(raw);
    let mut tokens = Vec::new();
    scanner::Scanner::new(&source, &mut tokens).scan();

    let mut diagnostics = Vec::new();
    let tree = Parser::new(&tokens, &mut diagnostics).parse();

    LineAnalysis { source, tree, diagnostics }
}

/// Parses one line into its normalized tree.
pub fn parse_line(raw: &str) -> Result<QueryNode, QueryError> {
    analyze_line(raw).into_result()
}
