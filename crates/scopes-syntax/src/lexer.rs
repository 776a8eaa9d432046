use logos::Logos;
use scopes_common::error::{Error, ErrorS, SyntaxError};

use std::fmt::{self, Display, Formatter};
use std::num::{ParseFloatError, ParseIntError};

pub struct Lexer<'a> {
    inner: logos::Lexer<'a, Token>,
    pending: Option<(usize, Token, usize)>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { inner: Token::lexer(source), pending: None }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<(usize, Token, usize), ErrorS>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.take() {
            return Some(Ok(token));
        }

        match self.inner.next()? {
            Token::Error => {
                let mut span = self.inner.span();

                // Merge adjacent invalid input into a single error.
                while let Some(token) = self.inner.next() {
                    let span_new = self.inner.span();
                    if span.end == span_new.start && token == Token::Error {
                        span.end = span_new.end;
                    } else {
                        self.pending = Some((span_new.start, token, span_new.end));
                        break;
                    }
                }

                Some(Err((
                    Error::SyntaxError(SyntaxError::UnexpectedInput {
                        token: self.inner.source()[span.start..span.end].to_string(),
                    }),
                    span,
                )))
            }
            token => {
                let span = self.inner.span();
                Some(Ok((span.start, token, span.end)))
            }
        }
    }
}

#[derive(Clone, Debug, Logos, PartialEq)]
pub enum Token {
    // Delimiters.
    #[token("(")]
    LtParen,
    #[token(")")]
    RtParen,
    #[token("{")]
    LtBrace,
    #[token("}")]
    RtBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,

    // Operators.
    #[token("=")]
    Equal,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,

    // Literals.
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*", lex_identifier)]
    Identifier(String),
    #[regex("[0-9]+", lex_int)]
    IntLiteral(i64),
    #[regex(r"[0-9]+\.[0-9]+", lex_float)]
    FloatLiteral(f64),
    #[regex(r"'[^'\\]'", lex_char)]
    CharLiteral(char),

    // Keywords.
    #[token("char")]
    Char,
    #[token("def")]
    Def,
    #[token("float")]
    Float,
    #[token("int")]
    Int,
    #[token("print")]
    Print,

    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"[ \r\n\t\f]+", logos::skip)]
    #[error]
    Error,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::LtParen => write!(f, "("),
            Token::RtParen => write!(f, ")"),
            Token::LtBrace => write!(f, "{{"),
            Token::RtBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Equal => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Identifier(name) => write!(f, "{name}"),
            Token::IntLiteral(value) => write!(f, "{value}"),
            Token::FloatLiteral(value) => write!(f, "{value:?}"),
            Token::CharLiteral(value) => write!(f, "'{value}'"),
            Token::Char => write!(f, "char"),
            Token::Def => write!(f, "def"),
            Token::Float => write!(f, "float"),
            Token::Int => write!(f, "int"),
            Token::Print => write!(f, "print"),
            Token::Error => write!(f, "<error>"),
        }
    }
}

fn lex_identifier(lexer: &mut logos::Lexer<Token>) -> String {
    lexer.slice().to_string()
}

fn lex_int(lexer: &mut logos::Lexer<Token>) -> Result<i64, ParseIntError> {
    lexer.slice().parse::<i64>()
}

fn lex_float(lexer: &mut logos::Lexer<Token>) -> Result<f64, ParseFloatError> {
    lexer.slice().parse::<f64>()
}

fn lex_char(lexer: &mut logos::Lexer<Token>) -> Option<char> {
    lexer.slice().chars().nth(1)
}
