mod error;
mod macros;
mod stream;

pub use error::{DirectiveError, IncludeError, MacroError, PreprocessError};
pub use macros::{Macro, MacroTable};
pub use stream::PpTokenSource;

use self::macros::rescan_step;
use self::stream::{PeekPpToken, UnitReader};
use crate::lexer::join_string_literals;
use crate::token::{Punctuator, Token, TokenKind};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Pre-tokenized translation units, keyed by include path. The caller
/// tokenizes each file once and hands the map in; the preprocessor itself
/// never touches the filesystem.
pub type TokenMap = HashMap<String, Vec<Token>>;

/// Preprocesses the translation unit at `start_path`, following includes
/// through `units`. The result has the preprocessing new-lines removed and
/// adjacent string literals concatenated.
pub fn preprocess(start_path: &str, units: &TokenMap) -> Result<Vec<Token>, PreprocessError> {
    let mut macros = MacroTable::new();
    let mut visited = HashSet::from([start_path.to_string()]);

    let mut preprocessor = Preprocessor::new(start_path, units, &mut macros, &mut visited)?;
    let tokens = preprocessor.drain()?;

    Ok(join_string_literals(tokens))
}

/// Macro-expanding pull stream over one translation unit.
///
/// The macro table and the include-stack guard are borrowed rather than
/// owned so that a nested `#include` preprocessor shares them with its
/// parent: macros defined inside an included unit stay visible afterwards,
/// and mutual inclusion cycles are caught no matter how deep.
pub struct Preprocessor<'u, 'e> {
    src: UnitReader<'u>,
    units: &'u TokenMap,

    /// Tokens produced by an expansion, still subject to rescanning. Always
    /// drained before new source tokens are read.
    sub: Vec<Token>,

    macros: &'e mut MacroTable,
    visited: &'e mut HashSet<String>,
}

impl<'u, 'e> Preprocessor<'u, 'e> {
    pub fn new(
        path: &str,
        units: &'u TokenMap,
        macros: &'e mut MacroTable,
        visited: &'e mut HashSet<String>,
    ) -> Result<Self, PreprocessError> {
        let tokens = units
            .get(path)
            .ok_or_else(|| IncludeError::UnknownPath(path.to_string()))?;

        Ok(Self {
            src: UnitReader::new(tokens),
            units,
            sub: Vec::new(),
            macros,
            visited,
        })
    }

    /// Pulls every remaining token through expansion, up to end of file.
    pub fn drain(&mut self) -> Result<Vec<Token>, PreprocessError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_pp_token()?;
            if token.kind.is_end_of_file() {
                break;
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// One step of the pull loop. `Ok(None)` means progress was made (an
    /// expansion was spliced or a directive was handled) without a token to
    /// hand out yet.
    fn next(&mut self) -> Result<Option<Token>, PreprocessError> {
        if !self.sub.is_empty() {
            return rescan_step(&mut self.sub, self.macros);
        }

        let was_line_head = self.src.at_line_head();
        let token = self.src.advance();

        match &token.kind {
            TokenKind::Identifier(name) => {
                let Some(macro_) = self.macros.get(name) else {
                    return Ok(Some(token));
                };

                let macro_ = macro_.clone();
                self.sub = macro_.apply(&token, &mut self.src, self.macros)?;
                Ok(None)
            }
            TokenKind::Punctuator(Punctuator::Hash) if was_line_head => self.directive(),
            _ => Ok(Some(token)),
        }
    }

    fn directive(&mut self) -> Result<Option<Token>, PreprocessError> {
        let token = self.src.advance();

        let name = match &token.kind {
            // Empty directive; the new-line is discarded upstream.
            TokenKind::Newline => return Ok(Some(token)),
            TokenKind::Identifier(name) => name.clone(),
            // Directive names like `if` and `else` arrive as keywords.
            TokenKind::Keyword(keyword) => keyword.as_str().to_string(),
            _ => return Err(DirectiveError::ExpectedName.into()),
        };

        match name.as_str() {
            "define" => self.define(),
            "undef" => self.undef(),
            "include" => self.include(),
            "error" => self.error_directive(),
            "if" | "ifdef" | "ifndef" | "else" | "elif" | "endif" | "line" | "pragma" => {
                Err(DirectiveError::NotImplemented(name).into())
            }
            _ => Err(DirectiveError::Unknown(name).into()),
        }
    }

    fn define(&mut self) -> Result<Option<Token>, PreprocessError> {
        let token = self.src.advance();
        let TokenKind::Identifier(name) = token.kind else {
            return Err(DirectiveError::ExpectedMacroName.into());
        };

        // `NAME(` introduces parameters only when the paren is adjacent;
        // `NAME (` starts an object-like replacement list.
        let params = match self.src.peek_pp_token() {
            Some(peeked) if peeked.is_open_paren() && peeked.adjacent => {
                self.src.advance();
                Some(self.parameter_list()?)
            }
            _ => None,
        };

        let mut body = Vec::new();
        loop {
            let token = self.src.advance();
            match token.kind {
                TokenKind::Newline | TokenKind::EndOfFile => break,
                _ => body.push(token),
            }
        }

        debug!(name = name.as_str(), "defining macro");
        let macro_ = Macro::new(name.clone(), params, body)?;
        if self.macros.insert(name.clone(), macro_).is_some() {
            warn!(name = name.as_str(), "macro redefined");
        }

        Ok(None)
    }

    fn parameter_list(&mut self) -> Result<Vec<String>, PreprocessError> {
        let mut params = Vec::new();

        if self
            .src
            .peek_pp_token()
            .is_some_and(|token| matches!(token.kind, TokenKind::Punctuator(Punctuator::CloseParen)))
        {
            self.src.advance();
            return Ok(params);
        }

        loop {
            let token = self.src.advance();
            let TokenKind::Identifier(param) = token.kind else {
                return Err(DirectiveError::ExpectedParameter.into());
            };
            params.push(param);

            let token = self.src.advance();
            match token.kind {
                TokenKind::Punctuator(Punctuator::CloseParen) => break,
                TokenKind::Punctuator(Punctuator::Comma) => continue,
                _ => return Err(DirectiveError::ExpectedParameterSeparator.into()),
            }
        }

        Ok(params)
    }

    fn undef(&mut self) -> Result<Option<Token>, PreprocessError> {
        let token = self.src.advance();
        let TokenKind::Identifier(name) = token.kind else {
            return Err(DirectiveError::ExpectedMacroName.into());
        };

        debug!(name = name.as_str(), "removing macro");
        // Undefining an unknown name is a no-op.
        self.macros.remove(&name);

        let token = self.src.advance();
        if !matches!(token.kind, TokenKind::Newline | TokenKind::EndOfFile) {
            return Err(DirectiveError::ExpectedLineEnd.into());
        }

        Ok(None)
    }

    fn include(&mut self) -> Result<Option<Token>, PreprocessError> {
        let token = self.src.advance();
        let TokenKind::HeaderName(path) = token.kind else {
            return Err(DirectiveError::ExpectedHeaderName.into());
        };

        if self.visited.contains(&path) {
            return Err(IncludeError::Recursive(path).into());
        }
        self.visited.insert(path.clone());

        debug!(path = path.as_str(), "entering include");
        let mut nested = Preprocessor::new(&path, self.units, self.macros, self.visited)?;
        let drained = nested.drain()?;
        self.visited.remove(&path);

        // The included unit's output is rescanned like any other expansion.
        self.sub = drained;
        Ok(None)
    }

    fn error_directive(&mut self) -> Result<Option<Token>, PreprocessError> {
        let mut message = Vec::new();

        loop {
            let token = self.src.advance();
            match token.kind {
                TokenKind::Newline | TokenKind::EndOfFile => break,
                _ => message.push(token),
            }
        }

        Err(DirectiveError::ErrorDirective(
            message.iter().map(|token| token.to_string()).join(" "),
        )
        .into())
    }
}

impl PpTokenSource for Preprocessor<'_, '_> {
    fn next_pp_token(&mut self) -> Result<Token, PreprocessError> {
        loop {
            match self.next()? {
                // New-line tokens exist only for directive parsing.
                Some(token) if token.kind.is_newline() => continue,
                Some(token) => return Ok(token),
                None => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::token::Number;

    fn single_unit(source: &str) -> TokenMap {
        TokenMap::from([("main.c".to_string(), tokenize(source.bytes()).unwrap())])
    }

    fn expand(source: &str) -> Result<Vec<TokenKind>, PreprocessError> {
        preprocess("main.c", &single_unit(source))
            .map(|tokens| tokens.into_iter().map(|token| token.kind).collect())
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.into())
    }

    fn int(value: i32) -> TokenKind {
        TokenKind::Number(Number::Int(value))
    }

    #[test]
    fn unknown_start_path_fails() {
        assert_eq!(
            preprocess("missing.c", &TokenMap::new()).unwrap_err(),
            IncludeError::UnknownPath("missing.c".into()).into()
        );
    }

    #[test]
    fn object_macro_body_is_spliced_unparenthesized() {
        assert_eq!(
            expand("#define A 1+2\nint x = A*A;\n").unwrap(),
            vec![
                TokenKind::Keyword(crate::token::Keyword::Int),
                ident("x"),
                TokenKind::Punctuator(Punctuator::Assign),
                int(1),
                TokenKind::Punctuator(Punctuator::Add),
                int(2),
                TokenKind::Punctuator(Punctuator::Multiply),
                int(1),
                TokenKind::Punctuator(Punctuator::Add),
                int(2),
                TokenKind::Punctuator(Punctuator::Semicolon),
            ]
        );
    }

    #[test]
    fn function_macro_substitutes_arguments() {
        assert_eq!(
            expand("#define F(a,b) a+b\nF(1,2)\n").unwrap(),
            vec![int(1), TokenKind::Punctuator(Punctuator::Add), int(2)]
        );
    }

    #[test]
    fn mutual_recursion_paints_both_names() {
        assert_eq!(
            expand("#define A B\n#define B A\nA\n").unwrap(),
            vec![ident("A")]
        );
    }

    #[test]
    fn self_reference_is_emitted_once() {
        assert_eq!(expand("#define A A\nA\n").unwrap(), vec![ident("A")]);
    }

    #[test]
    fn function_macro_name_without_parens_does_not_expand() {
        assert_eq!(
            expand("#define F(a) a\nF;\n").unwrap(),
            vec![ident("F"), TokenKind::Punctuator(Punctuator::Semicolon)]
        );
    }

    #[test]
    fn empty_directive_is_a_no_op() {
        assert_eq!(expand("#\nx\n").unwrap(), vec![ident("x")]);
    }

    #[test]
    fn undef_removes_a_macro() {
        assert_eq!(
            expand("#define A 1\n#undef A\nA\n").unwrap(),
            vec![ident("A")]
        );
    }

    #[test]
    fn undef_of_unknown_name_is_a_no_op() {
        assert_eq!(expand("#undef NEVER\nx\n").unwrap(), vec![ident("x")]);
    }

    #[test]
    fn redefinition_overwrites() {
        assert_eq!(
            expand("#define A 1\n#define A 2\nA\n").unwrap(),
            vec![int(2)]
        );
    }

    #[test]
    fn conditional_directives_are_not_implemented() {
        assert_eq!(
            expand("#if 1\n").unwrap_err(),
            DirectiveError::NotImplemented("if".into()).into()
        );
        assert_eq!(
            expand("#ifdef A\n").unwrap_err(),
            DirectiveError::NotImplemented("ifdef".into()).into()
        );
        assert_eq!(
            expand("#pragma once\n").unwrap_err(),
            DirectiveError::NotImplemented("pragma".into()).into()
        );
    }

    #[test]
    fn unknown_directives_are_rejected() {
        assert_eq!(
            expand("#frobnicate\n").unwrap_err(),
            DirectiveError::Unknown("frobnicate".into()).into()
        );
    }

    #[test]
    fn error_directive_reports_its_tokens() {
        assert_eq!(
            expand("#error out of cheese\n").unwrap_err(),
            DirectiveError::ErrorDirective("out of cheese".into()).into()
        );
    }

    #[test]
    fn hash_not_at_line_head_is_an_ordinary_token() {
        assert_eq!(
            expand("x # y\n").unwrap(),
            vec![
                ident("x"),
                TokenKind::Punctuator(Punctuator::Hash),
                ident("y")
            ]
        );
    }

    #[test]
    fn wrong_argument_count_fails() {
        assert_eq!(
            expand("#define F(a,b) a\nF(1)\n").unwrap_err(),
            MacroError::WrongArgumentCount {
                name: "F".into(),
                expected: 2,
                found: 1
            }
            .into()
        );
    }

    #[test]
    fn zero_parameter_macro_takes_empty_parens() {
        assert_eq!(expand("#define F() 9\nF()\n").unwrap(), vec![int(9)]);
    }

    #[test]
    fn single_parameter_macro_accepts_an_empty_argument() {
        assert_eq!(
            expand("#define F(a) x a y\nF()\n").unwrap(),
            vec![ident("x"), ident("y")]
        );
    }

    #[test]
    fn invocation_may_span_lines() {
        assert_eq!(
            expand("#define F(a,b) a b\nF(1,\n2)\n").unwrap(),
            vec![int(1), int(2)]
        );
    }
}
