use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum LexError {
    #[error("invalid token: {0:?}")]
    InvalidByte(char),

    #[error("unclosed block comment")]
    UnterminatedComment,

    #[error("unterminated character constant")]
    UnterminatedCharacterConstant,

    #[error("empty character constant")]
    EmptyCharacterConstant,

    #[error("unterminated string literal")]
    UnterminatedStringLiteral,

    #[error("unterminated header name")]
    UnterminatedHeaderName,

    #[error("bad escape sequence")]
    BadEscapeSequence,

    #[error("string literal is not valid UTF-8")]
    InvalidUtf8,

    #[error("integer constant is out of range")]
    UnrepresentableInteger,

    #[error("invalid numeric constant '{0}'")]
    InvalidNumber(String),
}
