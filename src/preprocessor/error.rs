use crate::lexer::LexError;
use thiserror::Error;

/// Union of everything a `preprocess` call can fail with. Each kind is its
/// own discriminated enum; there is no hierarchy beyond this wrapper.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PreprocessError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error(transparent)]
    Macro(#[from] MacroError),

    #[error(transparent)]
    Include(#[from] IncludeError),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum DirectiveError {
    #[error("expected preprocessing directive name")]
    ExpectedName,

    #[error("expected macro name")]
    ExpectedMacroName,

    #[error("expected macro parameter name")]
    ExpectedParameter,

    #[error("expected ',' or ')' in macro parameter list")]
    ExpectedParameterSeparator,

    #[error("expected end of line")]
    ExpectedLineEnd,

    #[error("expected header name after #include")]
    ExpectedHeaderName,

    #[error("#error {0}")]
    ErrorDirective(String),

    #[error("#{0} is not implemented")]
    NotImplemented(String),

    #[error("invalid preprocessing directive #{0}")]
    Unknown(String),
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum MacroError {
    #[error("macro {name} expects {expected} argument(s), found {found}")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("'#' is not followed by a macro parameter")]
    StrayHash,

    #[error("unterminated argument list invoking macro {0}")]
    UnterminatedArguments(String),

    #[error("pasting formed '{0}', an invalid preprocessing token")]
    BadConcat(String),

    #[error("'##' is missing an operand")]
    ConcatMissingOperand,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum IncludeError {
    #[error("file not found: {0}")]
    UnknownPath(String),

    #[error("recursive #include: {0}")]
    Recursive(String),
}
