use super::error::PreprocessError;
use crate::token::{Token, TokenKind};

/// A pull-based pp-token stream. Implemented by the vector-backed reader
/// over a translation unit, the slice-backed reader used as the argument
/// source during function-like expansion, and `Preprocessor` itself.
pub trait PpTokenSource {
    /// End of input is an `EndOfFile` token, not an error.
    fn next_pp_token(&mut self) -> Result<Token, PreprocessError>;
}

/// One token of look-ahead for the concrete readers; macro invocation must
/// decide whether a `(` follows without consuming anything.
pub(crate) trait PeekPpToken {
    fn peek_pp_token(&self) -> Option<&Token>;
}

/// Cursor over one translation unit's pp-token vector.
pub(crate) struct UnitReader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> UnitReader<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn advance(&mut self) -> Token {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                token.clone()
            }
            None => Token::new(TokenKind::EndOfFile),
        }
    }

    /// True at the start of the unit or just after a `Newline` token.
    pub fn at_line_head(&self) -> bool {
        self.pos == 0 || self.tokens[self.pos - 1].kind.is_newline()
    }
}

impl PpTokenSource for UnitReader<'_> {
    fn next_pp_token(&mut self) -> Result<Token, PreprocessError> {
        Ok(self.advance())
    }
}

impl PeekPpToken for UnitReader<'_> {
    fn peek_pp_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
}

/// Cursor over a borrowed token slice. Exposes how far it read so the
/// caller can splice the unconsumed remainder back after an expansion.
pub(crate) struct SliceReader<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl PpTokenSource for SliceReader<'_> {
    fn next_pp_token(&mut self) -> Result<Token, PreprocessError> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Ok(Token::new(TokenKind::EndOfFile)),
        }
    }
}

impl PeekPpToken for SliceReader<'_> {
    fn peek_pp_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_reader_reports_line_heads() {
        let tokens = vec![
            Token::new(TokenKind::Identifier("a".into())),
            Token::new(TokenKind::Newline),
            Token::new(TokenKind::Identifier("b".into())),
        ];
        let mut reader = UnitReader::new(&tokens);

        assert!(reader.at_line_head());
        reader.advance();
        assert!(!reader.at_line_head());
        reader.advance();
        assert!(reader.at_line_head(), "just after a new-line");
    }

    #[test]
    fn exhausted_readers_return_end_of_file() {
        let tokens = vec![Token::new(TokenKind::Newline)];
        let mut reader = UnitReader::new(&tokens);
        reader.advance();

        assert!(reader.advance().kind.is_end_of_file());
        assert!(reader.advance().kind.is_end_of_file());
    }
}
