use lalrpop_util::{lalrpop_mod, ParseError};
use scopes_common::error::{Error, ErrorS, SyntaxError};

use crate::ast::Program;
use crate::lexer::{Lexer, Token};

lalrpop_mod!(
    #[allow(clippy::all)]
    grammar,
    "/grammar.rs"
);

pub type ParserError = ParseError<usize, Token, ErrorS>;

pub struct Parser {
    inner: grammar::ProgramParser,
}

impl Default for Parser {
    fn default() -> Self {
        Self { inner: grammar::ProgramParser::new() }
    }
}

impl Parser {
    pub fn parse(&self, source: &str) -> Result<Program, ErrorS> {
        self.inner.parse(Lexer::new(source)).map_err(|e| match e {
            ParseError::ExtraToken { token: (start, token, end) } => {
                (Error::SyntaxError(SyntaxError::ExtraToken { token: token.to_string() }), start..end)
            }
            ParseError::InvalidToken { location } => {
                (Error::SyntaxError(SyntaxError::InvalidToken), location..location)
            }
            ParseError::UnrecognizedEOF { location, expected } => {
                (Error::SyntaxError(SyntaxError::UnrecognizedEOF { expected }), location..location)
            }
            ParseError::UnrecognizedToken { token: (start, token, end), expected } => (
                Error::SyntaxError(SyntaxError::UnrecognizedToken {
                    token: token.to_string(),
                    expected,
                }),
                start..end,
            ),
            ParseError::User { error } => error,
        })
    }
}
