#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TokenType {
    Field, // TITLE("..."), "..."
    Or, And, AndNot,
    LeftParen, RightParen, // ()
}

impl TokenType {
    pub fn is_operator(&self) -> bool {
        matches!(self, TokenType::Or | TokenType::And | TokenType::AndNot)
    }
}
