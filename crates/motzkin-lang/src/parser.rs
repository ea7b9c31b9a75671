use motzkin_solver::Rational;
use thiserror::Error;

use crate::ast::*;
use crate::lexer::{Span, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Invalid character '{text}' at position {span:?} (relations are <=, >= and =)")]
    InvalidCharacter { text: String, span: Span },
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = crate::lexer::Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn current_span(&self) -> Span {
        self.current().map(|t| t.span).unwrap_or(Span::new(0, 0))
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(last) => start.merge(last.span),
            None => start,
        }
    }

    /// Comments may appear anywhere; newlines end statements.
    fn skip_comments(&mut self) {
        while self.peek_kind() == TokenKind::Comment {
            self.advance();
        }
    }

    fn skip_newlines_and_comments(&mut self) {
        while matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Comment | TokenKind::Semicolon
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            None => ParseError::UnexpectedEof,
            Some(t) if t.kind == TokenKind::Eof => ParseError::UnexpectedEof,
            Some(t) if t.kind == TokenKind::Error => ParseError::InvalidCharacter {
                text: t.text.clone(),
                span: t.span,
            },
            Some(t) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{:?}", t.kind),
                span: t.span,
            },
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        self.skip_comments();
        if self.peek_kind() == kind {
            if let Some(token) = self.advance() {
                return Ok(token);
            }
        }
        Err(self.unexpected(&format!("{:?}", kind)))
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut items = Vec::new();

        loop {
            self.skip_newlines_and_comments();

            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Vars => items.push(Item::Vars(self.parse_vars()?)),
                _ => items.extend(self.parse_constraints()?.into_iter().map(Item::Constraint)),
            }

            self.expect_statement_end()?;
        }

        Ok(Program { items })
    }

    fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        self.skip_comments();
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn parse_vars(&mut self) -> Result<VarDecl, ParseError> {
        let start = self.expect(TokenKind::Vars)?.span;
        let mut names = vec![self.expect(TokenKind::Ident)?.text];

        loop {
            self.skip_comments();
            match self.peek_kind() {
                TokenKind::Comma => {
                    self.advance();
                    names.push(self.expect(TokenKind::Ident)?.text);
                }
                TokenKind::Ident => {
                    names.push(self.expect(TokenKind::Ident)?.text);
                }
                _ => break,
            }
        }

        Ok(VarDecl {
            span: self.span_from(start),
            names,
        })
    }

    /// Parses `a op b` and chains such as `0 <= x <= 5`, which yield one
    /// constraint per relation.
    fn parse_constraints(&mut self) -> Result<Vec<Constraint>, ParseError> {
        self.skip_comments();
        let start = self.current_span();

        let mut lhs = self.parse_expr()?;
        let op = self
            .peek_constraint_op()
            .ok_or_else(|| self.unexpected("<=, >= or ="))?;
        self.advance();
        let mut rhs = self.parse_expr()?;

        let mut parts = vec![(lhs.clone(), op, rhs.clone())];
        while let Some(op) = self.peek_constraint_op() {
            self.advance();
            lhs = rhs;
            rhs = self.parse_expr()?;
            parts.push((lhs.clone(), op, rhs.clone()));
        }

        let span = self.span_from(start);
        Ok(parts
            .into_iter()
            .map(|(lhs, op, rhs)| Constraint { span, lhs, op, rhs })
            .collect())
    }

    fn peek_constraint_op(&mut self) -> Option<ConstraintOp> {
        self.skip_comments();
        match self.peek_kind() {
            TokenKind::Le => Some(ConstraintOp::Le),
            TokenKind::Ge => Some(ConstraintOp::Ge),
            TokenKind::Eq => Some(ConstraintOp::Eq),
            _ => None,
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            self.skip_comments();
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            self.skip_comments();
            let op = match self.peek_kind() {
                TokenKind::Star | TokenKind::Slash => {
                    let op = if self.peek_kind() == TokenKind::Star {
                        BinaryOp::Mul
                    } else {
                        BinaryOp::Div
                    };
                    self.advance();
                    op
                }
                // juxtaposition: `2x`, `3 (x + y)`
                TokenKind::Ident | TokenKind::LParen => BinaryOp::Mul,
                _ => break,
            };
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_comments();
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_comments();

        match self.peek_kind() {
            TokenKind::Number => {
                let token = self.expect(TokenKind::Number)?;
                let value: Rational = token
                    .text
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(token.text.clone()))?;
                Ok(Expr::Number(value))
            }
            TokenKind::Ident => {
                let token = self.expect(TokenKind::Ident)?;
                Ok(Expr::Variable {
                    span: token.span,
                    name: token.text,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            _ => Err(self.unexpected("expression")),
        }
    }
}
