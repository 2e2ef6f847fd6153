use std::fmt;
use std::ops::Range;

use crate::expr::{FieldName, FieldTerm};
use crate::token_type::TokenType::{self, *};

/// Operator keywords in the order they are tried. `AND_NOT` precedes `AND` so the
/// longer spelling wins.
const OPERATORS: [(&str, TokenType); 3] = [("OR", Or), ("AND_NOT", AndNot), ("AND", And)];

/// Rewrites a raw query line before scanning:
///
/// - missing `)` are appended until every `(` has a partner,
/// - spaces directly inside parentheses are dropped,
/// - the negation `AND NOT` becomes the single keyword `AND_NOT`.
pub fn preprocess(line: &str) -> String {
    let opens = line.matches('(').count();
    let closes = line.matches(')').count();

    let mut source = line.to_string();
    if opens > closes {
        source.push_str(&")".repeat(opens - closes));
    }

    source
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(" AND NOT ", " AND_NOT ")
}

/// Preprocesses and scans one query line.
pub fn tokenize(line: &str) -> Vec<Token> {
    let source = preprocess(line);
    let mut tokens = Vec::new();
    Scanner::new(&source, &mut tokens).scan();
    tokens
}

/// The `Scanner` walks a preprocessed query line and appends the recognized tokens
/// to `tokens`. At every position it tries, in order: a field function, an operator
/// keyword, a parenthesis and a bare quoted term. Positions matching none of these
/// are skipped one character at a time.
pub struct Scanner<'a> {
    source: &'a str,
    tokens: &'a mut Vec<Token>, // stores scanned tokens
    current: usize, // byte index into source
    implicit_and_from: Option<usize>, // end of a field term that may be followed by an implicit AND
}

/// A successful match at the current position.
struct Match {
    variant: TokenType,
    term: Option<FieldTerm>,
    end: usize,
}

impl<'a> Scanner<'a> {

    pub fn new(source: &'a str, tokens: &'a mut Vec<Token>) -> Self {
        Scanner {
            source,
            tokens,
            current: 0,
            implicit_and_from: None,
        }
    }

    pub fn scan(&mut self) {
        while !self.at_end() {
            let start = self.current;
            match self.scan_token() {
                Some(found) => {
                    self.add_token(start, found);
                }
                None => self.advance(),
            }
        }
    }

    fn scan_token(&self) -> Option<Match> {
        self.field_function()
            .or_else(|| self.operator())
            .or_else(|| self.paren())
            .or_else(|| self.quoted())
    }

    /// Matches `NAME\s*("VALUE")` for one of the field functions.
    fn field_function(&self) -> Option<Match> {
        let rest = self.rest();
        FieldName::functions().find_map(|field| {
            let after_name = rest.strip_prefix(field.as_str())?;
            let after_space = after_name.trim_start_matches(|c: char| c.is_ascii_whitespace());
            let inner = after_space.strip_prefix("(\"")?;
            let close = inner.find('"')?;
            if close == 0 || !inner[close + 1..].starts_with(')') {
                return None;
            }

            let value = &inner[..close];
            let consumed = rest.len() - inner.len() + close + 2;
            // A value ending in a dangling escape cannot be split into field and value.
            let term = (!has_dangling_escape(value)).then(|| FieldTerm::new(field, value));
            Some(Match { variant: Field, term, end: self.current + consumed })
        })
    }

    /// Matches `OR`, `AND_NOT` or `AND` as a whole word.
    fn operator(&self) -> Option<Match> {
        if self.source[..self.current].chars().next_back().is_some_and(is_word_char) {
            return None;
        }

        let rest = self.rest();
        OPERATORS.iter().find_map(|(keyword, variant)| {
            let after = rest.strip_prefix(keyword)?;
            if after.chars().next().is_some_and(is_word_char) {
                return None;
            }
            Some(Match { variant: *variant, term: None, end: self.current + keyword.len() })
        })
    }

    fn paren(&self) -> Option<Match> {
        let variant = match self.peek()? {
            '(' => LeftParen,
            ')' => RightParen,
            _ => return None,
        };
        Some(Match { variant, term: None, end: self.current + 1 })
    }

    /// Matches a non-empty `"VALUE"` without a field function.
    fn quoted(&self) -> Option<Match> {
        let inner = self.rest().strip_prefix('"')?;
        let close = inner.find('"')?;
        if close == 0 {
            return None;
        }

        let term = FieldTerm::new(FieldName::Any, &inner[..close]);
        Some(Match { variant: Field, term: Some(term), end: self.current + close + 2 })
    }

    fn add_token(&mut self, start: usize, found: Match) {
        // Implicit AND between a field term and the next match separated only by whitespace
        if let Some(gap_start) = self.implicit_and_from.take() {
            if self.source[gap_start..start].trim().is_empty() {
                self.tokens.push(Token {
                    variant: And,
                    lexeme: "AND".to_string(),
                    term: None,
                    span: gap_start..start,
                });
            }
        }

        let span = start..found.end;
        self.tokens.push(Token {
            variant: found.variant,
            lexeme: self.source[span.clone()].to_string(),
            term: found.term,
            span,
        });
        self.current = found.end;

        if found.variant == Field {
            let count = self.tokens.len();
            if count > 1 && !self.tokens[count - 2].variant.is_operator() {
                self.implicit_and_from = Some(found.end);
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.current..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Skips the current char.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.current += c.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `value` ends in an odd run of backslashes, i.e. an escape with nothing to escape.
fn has_dangling_escape(value: &str) -> bool {
    let trailing = value.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub variant: TokenType,
    pub lexeme: String,
    /// Payload of a `Field` token. `None` if the term is malformed.
    pub term: Option<FieldTerm>,
    /// Byte range in the preprocessed line.
    pub span: Range<usize>,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{} {}", self.variant, self.lexeme)?;
        if let Some(term) = &self.term {
            write!(f, " {}:{}", term.field, term.value)?;
        }
        Ok(())
    }
}
