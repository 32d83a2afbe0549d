mod error;
mod literal;
mod number;

pub use error::LexError;

use crate::line_splice::LineSplicer;
use crate::look_ahead::LookAhead;
use crate::token::{Keyword, Number, Punctuator, Token, TokenKind};

/// Where in a directive line the tokenizer is. Only used to recognize
/// `#include`'s header-name argument, which lexes differently from `<` and
/// `"` everywhere else.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DirectiveState {
    /// Start of a logical line.
    LineStart,
    /// Just consumed a line-initial `#`.
    AfterHash,
    /// Just consumed `#include`; a header name is expected next.
    HeaderName,
    /// No header name can appear on the rest of this line.
    Inert,
}

struct Tokenizer<I>
where
    I: Iterator<Item = u8>,
{
    input: LookAhead<LineSplicer<I>>,
    directive_state: DirectiveState,
    is_space: bool,
    was_space: bool,
}

/// Tokenizes one translation unit into pp-tokens. The result always ends
/// with a `Newline` token so directive parsing terminates cleanly.
pub fn tokenize<I: IntoIterator<Item = u8>>(source: I) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(source.into_iter()).scan()
}

/// Strips the preprocessing `Newline` tokens and concatenates runs of
/// adjacent string literals (6.4.5). Used directly when no preprocessing is
/// requested; `preprocess` performs the same steps on its output.
pub fn finish_tokenize(tokens: Vec<Token>) -> Vec<Token> {
    join_string_literals(strip_newline_tokens(tokens))
}

impl<I: Iterator<Item = u8>> Tokenizer<I> {
    fn new(source: I) -> Self {
        Self {
            input: LookAhead::new(LineSplicer::new(source)),
            directive_state: DirectiveState::LineStart,
            is_space: false,
            was_space: false,
        }
    }

    fn scan(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        if tokens.last().map_or(true, |token| !token.kind.is_newline()) {
            tokens.push(TokenKind::Newline.at(!self.was_space));
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            if self.input.peek().is_none() {
                return Ok(None);
            }

            if let Some(kind) = self.next_kind()? {
                let token = kind.at(!self.was_space);
                self.update_directive_state(&token);
                return Ok(Some(token));
            }
        }
    }

    fn update_directive_state(&mut self, token: &Token) {
        self.directive_state = match &token.kind {
            TokenKind::Newline => DirectiveState::LineStart,
            TokenKind::Punctuator(Punctuator::Hash)
                if self.directive_state == DirectiveState::LineStart =>
            {
                DirectiveState::AfterHash
            }
            TokenKind::Identifier(name)
                if self.directive_state == DirectiveState::AfterHash && name == "include" =>
            {
                DirectiveState::HeaderName
            }
            _ => DirectiveState::Inert,
        };
    }

    fn header_name_expected(&self) -> bool {
        self.directive_state == DirectiveState::HeaderName
    }

    /// Classifies the next byte and consumes one token's worth of input.
    /// Whitespace and comments produce `None`.
    fn next_kind(&mut self) -> Result<Option<TokenKind>, LexError> {
        use Punctuator::*;

        let b = *self.input.peek().expect("tokenizer input not at end");

        self.was_space = self.is_space;
        self.is_space = matches!(b, b' ' | b'\t' | 0x0B | 0x0C | b'\r' | b'\n');

        let kind = match b {
            b'\n' => {
                self.input.discard(1);
                TokenKind::Newline
            }
            b' ' | b'\t' | 0x0B | 0x0C | b'\r' => {
                self.input.discard(1);
                return Ok(None);
            }
            b'/' if self.input.peek_nth(1) == Some(&b'/') => {
                // Line comment. Stops before the new-line so the Newline
                // token still terminates the logical line.
                self.input.discard(2);
                while let Some(&b) = self.input.peek() {
                    if b == b'\n' {
                        break;
                    }
                    self.input.discard(1);
                }
                return Ok(None);
            }
            b'/' if self.input.peek_nth(1) == Some(&b'*') => {
                self.input.discard(2);
                loop {
                    if self.input.peek().is_none() {
                        return Err(LexError::UnterminatedComment);
                    }
                    if self.input.eat(b"*/") {
                        break;
                    }
                    self.input.discard(1);
                }
                return Ok(None);
            }
            b'0'..=b'9' => self.number()?,
            b'.' if self.input.peek_nth(1).is_some_and(u8::is_ascii_digit) => self.number()?,
            b'\'' => {
                TokenKind::Number(Number::Int(literal::read_char_constant(&mut self.input)?))
            }
            b'<' | b'"' if self.header_name_expected() => {
                TokenKind::HeaderName(literal::read_header_name(&mut self.input)?)
            }
            b'"' => TokenKind::StringLiteral(literal::read_string_literal(&mut self.input)?),
            b'+' => self.punctuator(|input| {
                if input.eat(b"+") {
                    Increment
                } else if input.eat(b"=") {
                    AddAssign
                } else {
                    Add
                }
            }),
            b'-' => self.punctuator(|input| {
                if input.eat(b"-") {
                    Decrement
                } else if input.eat(b"=") {
                    SubtractAssign
                } else if input.eat(b">") {
                    Arrow
                } else {
                    Subtract
                }
            }),
            b'*' => self.punctuator(|input| if input.eat(b"=") { MultiplyAssign } else { Multiply }),
            b'/' => self.punctuator(|input| if input.eat(b"=") { DivideAssign } else { Divide }),
            b'%' => self.punctuator(|input| if input.eat(b"=") { ModulusAssign } else { Modulus }),
            b'=' => self.punctuator(|input| if input.eat(b"=") { DoubleEquals } else { Assign }),
            b'<' => self.punctuator(|input| {
                if input.eat(b"<=") {
                    LeftShiftAssign
                } else if input.eat(b"<") {
                    LeftShift
                } else if input.eat(b"=") {
                    LessThanEq
                } else {
                    LessThan
                }
            }),
            b'>' => self.punctuator(|input| {
                if input.eat(b">=") {
                    RightShiftAssign
                } else if input.eat(b">") {
                    RightShift
                } else if input.eat(b"=") {
                    GreaterThanEq
                } else {
                    GreaterThan
                }
            }),
            b'&' => self.punctuator(|input| {
                if input.eat(b"&") {
                    LogicalAnd
                } else if input.eat(b"=") {
                    BitAndAssign
                } else {
                    Ampersand
                }
            }),
            b'|' => self.punctuator(|input| {
                if input.eat(b"|") {
                    LogicalOr
                } else if input.eat(b"=") {
                    BitOrAssign
                } else {
                    BitOr
                }
            }),
            b'!' => self.punctuator(|input| if input.eat(b"=") { NotEquals } else { Not }),
            b'^' => self.punctuator(|input| if input.eat(b"=") { BitXorAssign } else { BitXor }),
            b'.' => self.punctuator(|input| if input.eat(b"..") { Ellipses } else { Dot }),
            b'#' => self.punctuator(|input| if input.eat(b"#") { HashConcat } else { Hash }),
            b'[' => self.punctuator(|_| OpenBracket),
            b']' => self.punctuator(|_| CloseBracket),
            b'(' => self.punctuator(|_| OpenParen),
            b')' => self.punctuator(|_| CloseParen),
            b'{' => self.punctuator(|_| OpenCurly),
            b'}' => self.punctuator(|_| CloseCurly),
            b',' => self.punctuator(|_| Comma),
            b':' => self.punctuator(|_| Colon),
            b';' => self.punctuator(|_| Semicolon),
            b'?' => self.punctuator(|_| Ternary),
            b'~' => self.punctuator(|_| BitComplement),
            b if literal::is_nondigit(b) => {
                let name = literal::read_identifier(&mut self.input);
                match Keyword::from_name(&name) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Identifier(name),
                }
            }
            b => return Err(LexError::InvalidByte(char::from(b))),
        };

        Ok(Some(kind))
    }

    fn punctuator(
        &mut self,
        rest: impl FnOnce(&mut LookAhead<LineSplicer<I>>) -> Punctuator,
    ) -> TokenKind {
        self.input.discard(1);
        TokenKind::Punctuator(rest(&mut self.input))
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let text = literal::read_pp_number(&mut self.input);
        Ok(TokenKind::Number(number::resolve_number(&text)?))
    }
}

fn strip_newline_tokens(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|token| !token.kind.is_newline())
        .collect()
}

pub(crate) fn join_string_literals(tokens: Vec<Token>) -> Vec<Token> {
    let mut result: Vec<Token> = Vec::with_capacity(tokens.len());

    for token in tokens {
        if let TokenKind::StringLiteral(next) = &token.kind {
            if let Some(Token {
                kind: TokenKind::StringLiteral(last),
                ..
            }) = result.last_mut()
            {
                last.push_str(next);
                continue;
            }
        }

        result.push(token);
    }

    result
}
