pub mod ast;
pub mod lexer;
pub mod parser;

use scopes_common::error::ErrorS;

use crate::ast::Program;
use crate::parser::Parser;

pub fn parse(source: &str) -> Result<Program, ErrorS> {
    Parser::default().parse(source)
}
