/*!
C compiler front end: the lexical and preprocessing pipeline.

Raw source bytes flow leaves-first through three layers:

1. a line-splicing byte filter that deletes `\`-newline pairs,
2. a tokenizer producing preprocessing tokens (one vector per translation
   unit, always terminated by a new-line token),
3. a macro-expanding preprocessor implementing the ISO C 6.10 semantics of
   `#define`, `#undef`, `#include`, `#error`, stringization, token pasting,
   and the self-reference rule, as a pull-based rescanning token stream.

The preprocessor consumes a pre-populated map from include path to
pp-token vector; it never touches the filesystem.

```
use oxcc::{preprocess, tokenize, TokenMap};

let mut units = TokenMap::new();
units.insert(
    "main.c".to_string(),
    tokenize("#define TWICE(x) x x\nTWICE(ok)\n".bytes())?,
);

let tokens = preprocess("main.c", &units)?;
assert_eq!(tokens.len(), 2);
# Ok::<(), oxcc::PreprocessError>(())
```
*/

mod lexer;
mod line_splice;
mod look_ahead;
mod preprocessor;
mod token;

pub use lexer::{finish_tokenize, tokenize, LexError};
pub use preprocessor::{
    preprocess, DirectiveError, IncludeError, Macro, MacroError, MacroTable, PpTokenSource,
    PreprocessError, Preprocessor, TokenMap,
};
pub use token::{IntegerSuffix, Keyword, Number, Punctuator, Token, TokenKind};
