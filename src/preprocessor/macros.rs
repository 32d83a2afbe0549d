use super::error::{MacroError, PreprocessError};
use super::stream::{PeekPpToken, PpTokenSource, SliceReader};
use crate::lexer;
use crate::token::{Punctuator, Token, TokenKind};
use itertools::Itertools;
use std::collections::HashMap;

pub type MacroTable = HashMap<String, Macro>;

/// A preprocessor macro. Immutable once defined; `#define` of the same name
/// replaces the whole entry.
#[derive(Clone, Debug)]
pub struct Macro {
    pub name: String,

    /// `None` for object-like macros, `Some(0)` for `NAME()`.
    pub params_len: Option<usize>,

    /// Replacement list. Parameter references are rewritten to `Param`
    /// tokens at definition time, so the parameter names themselves are not
    /// kept.
    pub tokens: Vec<Token>,
}

impl Macro {
    pub fn new(
        name: String,
        params: Option<Vec<String>>,
        body: Vec<Token>,
    ) -> Result<Macro, PreprocessError> {
        let (params_len, tokens) = match params {
            Some(params) => (Some(params.len()), rewrite_parameters(body, &params)?),
            None => (None, body),
        };

        Ok(Macro {
            name,
            params_len,
            tokens,
        })
    }

    /// Expands one use of this macro. `caller` is the identifier token that
    /// named it; `src` supplies the tokens after it (the argument list, for
    /// function-like macros). Everything produced has `expanded_from`
    /// extended with the caller's set plus this macro's name, which is what
    /// makes rescanning terminate.
    pub(crate) fn apply<S>(
        &self,
        caller: &Token,
        src: &mut S,
        macros: &MacroTable,
    ) -> Result<Vec<Token>, PreprocessError>
    where
        S: PpTokenSource + PeekPpToken,
    {
        let mut produced = match self.params_len {
            None => paste(self.tokens.iter().map(plain_piece).collect())?,
            Some(params_len) => {
                if !src.peek_pp_token().is_some_and(Token::is_open_paren) {
                    // Not an invocation, just a use of the name. Paint it so
                    // rescanning emits it instead of retrying forever.
                    let mut token = caller.clone();
                    token.expanded_from.insert(self.name.clone());
                    return Ok(vec![token]);
                }
                src.next_pp_token()?;

                let mut args = read_arguments(&self.name, src)?;
                if params_len == 0 && args.len() == 1 && args[0].is_empty() {
                    args.clear();
                }
                if args.len() != params_len {
                    return Err(MacroError::WrongArgumentCount {
                        name: self.name.clone(),
                        expected: params_len,
                        found: args.len(),
                    }
                    .into());
                }

                // The expanded form feeds ordinary substitution; the
                // unexpanded form feeds stringization.
                let mut expanded = Vec::with_capacity(args.len());
                for arg in &args {
                    expanded.push(expand_tokens(arg.clone(), macros)?);
                }

                let pieces = self
                    .tokens
                    .iter()
                    .map(|token| match token.kind {
                        TokenKind::Param {
                            index,
                            stringize: true,
                        } => Piece::Tokens(vec![stringize(&args[index])]),
                        TokenKind::Param {
                            index,
                            stringize: false,
                        } => Piece::Tokens(expanded[index].clone()),
                        _ => plain_piece(token),
                    })
                    .collect();

                paste(pieces)?
            }
        };

        for token in produced.iter_mut() {
            token
                .expanded_from
                .extend(caller.expanded_from.iter().cloned());
            token.expanded_from.insert(self.name.clone());
        }

        Ok(produced)
    }
}

/// One step of rescanning `pending`: takes its head token and either yields
/// it or splices the head macro's expansion back onto the front.
/// `Ok(None)` means the caller should take another step.
pub(crate) fn rescan_step(
    pending: &mut Vec<Token>,
    macros: &MacroTable,
) -> Result<Option<Token>, PreprocessError> {
    let head = pending.remove(0);

    let name = match &head.kind {
        TokenKind::Identifier(name) => name,
        _ => return Ok(Some(head)),
    };

    let Some(macro_) = macros.get(name) else {
        return Ok(Some(head));
    };

    // The token came from this same macro: painted blue (6.10.3.4).
    if head.expanded_from.contains(name) {
        return Ok(Some(head));
    }

    let macro_ = macro_.clone();
    let mut reader = SliceReader::new(pending.as_slice());
    let mut produced = macro_.apply(&head, &mut reader, macros)?;
    let consumed = reader.pos();
    produced.extend_from_slice(&pending[consumed..]);
    *pending = produced;

    Ok(None)
}

/// Fully expands a token sequence (a macro argument) against the current
/// macro table. The caller's own name is deliberately not painted on, so a
/// macro may still appear expanded inside its own arguments.
fn expand_tokens(tokens: Vec<Token>, macros: &MacroTable) -> Result<Vec<Token>, PreprocessError> {
    let mut pending = tokens;
    let mut expanded = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        if let Some(token) = rescan_step(&mut pending, macros)? {
            expanded.push(token);
        }
    }

    Ok(expanded)
}

/// Collects the argument lists of a function-like invocation: tokens up to
/// the matching `)`, split on top-level commas. New-lines inside the list
/// are whitespace; an invocation may span lines.
fn read_arguments<S>(name: &str, src: &mut S) -> Result<Vec<Vec<Token>>, PreprocessError>
where
    S: PpTokenSource,
{
    let mut args: Vec<Vec<Token>> = vec![Vec::new()];
    let mut depth = 0usize;

    loop {
        let token = src.next_pp_token()?;

        match &token.kind {
            TokenKind::EndOfFile => {
                return Err(MacroError::UnterminatedArguments(name.to_string()).into())
            }
            TokenKind::Newline => continue,
            TokenKind::Punctuator(Punctuator::CloseParen) if depth == 0 => break,
            TokenKind::Punctuator(Punctuator::CloseParen) => {
                depth -= 1;
                args.last_mut().expect("argument in progress").push(token);
            }
            TokenKind::Punctuator(Punctuator::OpenParen) => {
                depth += 1;
                args.last_mut().expect("argument in progress").push(token);
            }
            TokenKind::Punctuator(Punctuator::Comma) if depth == 0 => args.push(Vec::new()),
            _ => args.last_mut().expect("argument in progress").push(token),
        }
    }

    Ok(args)
}

/// Rewrites a function-like macro body: `# param` becomes a stringizing
/// `Param` token, a bare `param` becomes a plain one. `#` not followed by a
/// parameter name is a definition-time error.
fn rewrite_parameters(
    body: Vec<Token>,
    params: &[String],
) -> Result<Vec<Token>, PreprocessError> {
    let mut out = Vec::with_capacity(body.len());
    let mut tokens = body.into_iter();

    while let Some(token) = tokens.next() {
        match &token.kind {
            TokenKind::Punctuator(Punctuator::Hash) => {
                let index = match tokens.next() {
                    Some(Token {
                        kind: TokenKind::Identifier(name),
                        ..
                    }) => params
                        .iter()
                        .find_position(|param| **param == name)
                        .map(|(index, _)| index)
                        .ok_or(MacroError::StrayHash)?,
                    _ => return Err(MacroError::StrayHash.into()),
                };

                out.push(
                    TokenKind::Param {
                        index,
                        stringize: true,
                    }
                    .at(token.adjacent),
                );
            }
            TokenKind::Identifier(name) => {
                match params.iter().find_position(|param| *param == name) {
                    Some((index, _)) => out.push(
                        TokenKind::Param {
                            index,
                            stringize: false,
                        }
                        .at(token.adjacent),
                    ),
                    None => out.push(token),
                }
            }
            _ => out.push(token),
        }
    }

    Ok(out)
}

/// Builds the string literal for `# param`: the unexpanded argument tokens
/// spelled out and joined by single spaces. Quotes and backslashes inside
/// string and character literals come out doubled because the spelling of
/// those tokens carries its own escapes.
fn stringize(tokens: &[Token]) -> Token {
    let content = tokens.iter().map(|token| token.to_string()).join(" ");
    Token::new(TokenKind::StringLiteral(content))
}

/// A unit of substituted replacement-list output. `Paste` is a `##` that
/// was written in the replacement list itself; a `##` arriving through an
/// argument is ordinary token content.
enum Piece {
    Paste,
    Tokens(Vec<Token>),
}

fn plain_piece(token: &Token) -> Piece {
    match token.kind {
        TokenKind::Punctuator(Punctuator::HashConcat) => Piece::Paste,
        _ => Piece::Tokens(vec![token.clone()]),
    }
}

/// Stitches substituted pieces together, resolving `##` by concatenating
/// the spellings of its two neighbor tokens. An empty argument next to `##`
/// is an error; placemarker tokens are not implemented.
fn paste(pieces: Vec<Piece>) -> Result<Vec<Token>, PreprocessError> {
    let mut out: Vec<Token> = Vec::new();
    let mut pending = false;
    let mut last_was_empty = false;

    for piece in pieces {
        match piece {
            Piece::Paste => {
                if pending || last_was_empty || out.is_empty() {
                    return Err(MacroError::ConcatMissingOperand.into());
                }
                pending = true;
            }
            Piece::Tokens(mut tokens) => {
                if pending {
                    pending = false;
                    if tokens.is_empty() {
                        return Err(MacroError::ConcatMissingOperand.into());
                    }
                    let left = out.pop().expect("left operand of '##'");
                    let right = tokens.remove(0);
                    out.push(concat(&left, &right)?);
                    out.extend(tokens);
                    last_was_empty = false;
                } else {
                    last_was_empty = tokens.is_empty();
                    out.extend(tokens);
                }
            }
        }
    }

    if pending {
        return Err(MacroError::ConcatMissingOperand.into());
    }

    Ok(out)
}

/// Concatenates two tokens' spellings and re-lexes the result, which must
/// form exactly one pp-token.
fn concat(left: &Token, right: &Token) -> Result<Token, PreprocessError> {
    let spelling = format!("{left}{right}");

    let lexed = lexer::tokenize(spelling.bytes()).ok().filter(|tokens| {
        tokens.len() == 2 && tokens[1].kind.is_newline()
    });

    match lexed {
        Some(mut tokens) => Ok(tokens.swap_remove(0)),
        None => Err(MacroError::BadConcat(spelling).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Number;

    fn tokens(source: &str) -> Vec<Token> {
        // Without the trailing newline sentinel; macro bodies never
        // contain one.
        let mut tokens = lexer::tokenize(source.bytes()).unwrap();
        assert!(tokens.pop().is_some_and(|token| token.kind.is_newline()));
        tokens
    }

    #[test]
    fn parameters_are_rewritten_to_indices() {
        let body = rewrite_parameters(tokens("a + b"), &["a".into(), "b".into()]).unwrap();
        assert_eq!(
            body.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                TokenKind::Param {
                    index: 0,
                    stringize: false
                },
                TokenKind::Punctuator(Punctuator::Add),
                TokenKind::Param {
                    index: 1,
                    stringize: false
                },
            ]
        );
    }

    #[test]
    fn hash_parameter_is_rewritten_to_stringize() {
        let body = rewrite_parameters(tokens("#x"), &["x".into()]).unwrap();
        assert_eq!(
            body[0].kind,
            TokenKind::Param {
                index: 0,
                stringize: true
            }
        );
    }

    #[test]
    fn hash_without_parameter_is_a_definition_error() {
        assert_eq!(
            rewrite_parameters(tokens("# y"), &["x".into()]).unwrap_err(),
            MacroError::StrayHash.into()
        );
        assert_eq!(
            rewrite_parameters(tokens("a #"), &["a".into()]).unwrap_err(),
            MacroError::StrayHash.into()
        );
    }

    #[test]
    fn stringize_joins_with_single_spaces() {
        assert_eq!(
            stringize(&tokens("hello   world")).kind,
            TokenKind::StringLiteral("hello world".into())
        );
    }

    #[test]
    fn stringize_doubles_quotes_in_string_literals() {
        assert_eq!(
            stringize(&tokens("\"hi\"")).kind,
            TokenKind::StringLiteral("\"hi\"".into())
        );
    }

    #[test]
    fn concat_forms_identifiers_and_numbers() {
        let left = Token::new(TokenKind::Identifier("foo".into()));
        let right = Token::new(TokenKind::Identifier("bar".into()));
        assert_eq!(
            concat(&left, &right).unwrap().kind,
            TokenKind::Identifier("foobar".into())
        );

        let left = Token::new(TokenKind::Number(Number::Int(1)));
        let right = Token::new(TokenKind::Number(Number::Int(2)));
        assert_eq!(
            concat(&left, &right).unwrap().kind,
            TokenKind::Number(Number::Int(12))
        );
    }

    #[test]
    fn concat_rejects_malformed_results() {
        let left = Token::new(TokenKind::Punctuator(Punctuator::Add));
        let right = Token::new(TokenKind::Identifier("x".into()));
        assert_eq!(
            concat(&left, &right).unwrap_err(),
            MacroError::BadConcat("+x".into()).into()
        );
    }

    #[test]
    fn arguments_split_on_top_level_commas_only() {
        let source = tokens("1, f(2, 3), 4)");
        let mut reader = SliceReader::new(&source);
        let args = read_arguments("F", &mut reader).unwrap();

        assert_eq!(args.len(), 3);
        assert_eq!(args[0].len(), 1);
        assert_eq!(args[1].len(), 6, "f ( 2 , 3 )");
        assert_eq!(args[2].len(), 1);
    }

    #[test]
    fn unterminated_arguments_fail() {
        let source = tokens("1, 2");
        let mut reader = SliceReader::new(&source);
        assert_eq!(
            read_arguments("F", &mut reader).unwrap_err(),
            MacroError::UnterminatedArguments("F".into()).into()
        );
    }
}
