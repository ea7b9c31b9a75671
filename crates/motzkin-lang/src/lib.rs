pub mod ast;
pub mod compiler;
pub mod lexer;
pub mod matrix;
pub mod parser;

pub use ast::*;
pub use compiler::{CompileError, CompiledSystem, Compiler};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use matrix::{MatrixError, load_matrix, parse_matrix};
pub use parser::{ParseError, Parser};
