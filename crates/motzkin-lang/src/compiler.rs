use std::collections::HashMap;
use std::path::Path;

use log::debug;
use motzkin_solver::{Equation, Rational, RationalError, Relation, System, SystemError};
use thiserror::Error;

use crate::ast::*;
use crate::lexer::Span;
use crate::Parser;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unknown variable: {0} (not listed in vars)")]
    UnknownVariable(String),
    #[error("Variable declared twice: {0}")]
    DuplicateVariable(String),
    #[error("Nonlinear term: {0}")]
    Nonlinear(String),
    #[error("Division by zero in expression")]
    DivisionByZero,
    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] RationalError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error in {0}: {1}")]
    ParseError(String, String),
}

/// An affine expression `Σ coeffs[i] * var_i + constant`. Trailing columns
/// that were never mentioned are left out and read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
struct Linear {
    coeffs: Vec<Rational>,
    constant: Rational,
}

impl Linear {
    fn constant(value: Rational) -> Self {
        Self {
            coeffs: Vec::new(),
            constant: value,
        }
    }

    fn variable(index: usize) -> Self {
        let mut coeffs = vec![Rational::ZERO; index + 1];
        coeffs[index] = Rational::ONE;
        Self {
            coeffs,
            constant: Rational::ZERO,
        }
    }

    fn is_constant(&self) -> bool {
        self.coeffs.iter().all(Rational::is_zero)
    }

    fn add(mut self, other: &Linear) -> Result<Linear, RationalError> {
        if self.coeffs.len() < other.coeffs.len() {
            self.coeffs.resize(other.coeffs.len(), Rational::ZERO);
        }
        for (a, b) in self.coeffs.iter_mut().zip(&other.coeffs) {
            *a = a.checked_add(*b)?;
        }
        self.constant = self.constant.checked_add(other.constant)?;
        Ok(self)
    }

    fn scale(mut self, factor: Rational) -> Result<Linear, RationalError> {
        for a in &mut self.coeffs {
            *a = a.checked_mul(factor)?;
        }
        self.constant = self.constant.checked_mul(factor)?;
        Ok(self)
    }

    fn negate(mut self) -> Linear {
        for a in &mut self.coeffs {
            *a = a.negate();
        }
        self.constant = self.constant.negate();
        self
    }
}

#[derive(Debug, Clone)]
struct CompiledRow {
    linear: Linear,
    relation: Relation,
    span: Span,
}

/// A system ready for elimination, with the name of each column
#[derive(Debug, Clone)]
pub struct CompiledSystem {
    /// Variable names in column order
    pub variables: Vec<String>,
    pub system: System,
    /// Source location of the constraint each row came from
    pub spans: Vec<Span>,
}

/// Compiler for turning parsed constraints into a `System`.
///
/// Columns follow the `vars` declaration when there is one; otherwise
/// variables are numbered in order of first use. A constraint `lhs ◁ rhs`
/// becomes the row `(lhs - rhs) ◁ 0`, and `lhs = rhs` becomes two rows.
#[derive(Debug, Default)]
pub struct Compiler {
    variables: Vec<String>,
    index: HashMap<String, usize>,
    /// Set once a `vars` declaration was seen; undeclared names are then errors
    declared: bool,
    rows: Vec<CompiledRow>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and compile source text in one go
    pub fn compile_source(source: &str) -> Result<CompiledSystem, CompileError> {
        let program = Parser::parse(source)
            .map_err(|e| CompileError::ParseError("<input>".to_string(), e.to_string()))?;
        let mut compiler = Compiler::new();
        compiler.load(&program)?;
        compiler.compile()
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), CompileError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| CompileError::IoError(format!("{}: {}", path.display(), e)))?;

        let program = Parser::parse(&source)
            .map_err(|e| CompileError::ParseError(path.display().to_string(), e.to_string()))?;

        self.load(&program)
    }

    pub fn load(&mut self, program: &Program) -> Result<(), CompileError> {
        // Declarations first, so they fix the column order wherever they appear
        for item in &program.items {
            if let Item::Vars(decl) = item {
                self.declare(decl)?;
            }
        }

        for item in &program.items {
            if let Item::Constraint(constraint) = item {
                self.add_constraint(constraint)?;
            }
        }

        Ok(())
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Builds the system over every variable seen so far.
    pub fn compile(&self) -> Result<CompiledSystem, CompileError> {
        let n_vars = self.variables.len();
        let mut equations = Vec::with_capacity(self.rows.len());
        let mut spans = Vec::with_capacity(self.rows.len());

        for row in &self.rows {
            let mut coeffs = row.linear.coeffs.clone();
            coeffs.resize(n_vars, Rational::ZERO);
            equations.push(Equation::new(coeffs, row.linear.constant, row.relation));
            spans.push(row.span);
        }

        debug!("compiled {} rows over {} variables", equations.len(), n_vars);

        Ok(CompiledSystem {
            variables: self.variables.clone(),
            system: System::new(n_vars, equations)?,
            spans,
        })
    }

    fn declare(&mut self, decl: &VarDecl) -> Result<(), CompileError> {
        for name in &decl.names {
            if self.index.contains_key(name) {
                return Err(CompileError::DuplicateVariable(name.clone()));
            }
            self.index.insert(name.clone(), self.variables.len());
            self.variables.push(name.clone());
        }
        self.declared = true;
        Ok(())
    }

    fn variable(&mut self, name: &str) -> Result<usize, CompileError> {
        if let Some(&index) = self.index.get(name) {
            return Ok(index);
        }
        if self.declared {
            return Err(CompileError::UnknownVariable(name.to_string()));
        }
        let index = self.variables.len();
        self.index.insert(name.to_string(), index);
        self.variables.push(name.to_string());
        Ok(index)
    }

    fn add_constraint(&mut self, constraint: &Constraint) -> Result<(), CompileError> {
        let lhs = self.lower(&constraint.lhs)?;
        let rhs = self.lower(&constraint.rhs)?;
        let linear = lhs.add(&rhs.negate())?;

        let relations: &[Relation] = match constraint.op {
            ConstraintOp::Le => &[Relation::LessOrEqual],
            ConstraintOp::Ge => &[Relation::GreaterOrEqual],
            ConstraintOp::Eq => &[Relation::LessOrEqual, Relation::GreaterOrEqual],
        };
        for &relation in relations {
            self.rows.push(CompiledRow {
                linear: linear.clone(),
                relation,
                span: constraint.span,
            });
        }
        Ok(())
    }

    /// Reduces an expression to affine form, rejecting products of variables
    /// and division by anything but a nonzero constant.
    fn lower(&mut self, expr: &Expr) -> Result<Linear, CompileError> {
        match expr {
            Expr::Number(value) => Ok(Linear::constant(*value)),
            Expr::Variable { name, .. } => Ok(Linear::variable(self.variable(name)?)),
            Expr::Neg(inner) => Ok(self.lower(inner)?.negate()),
            Expr::Paren(inner) => self.lower(inner),
            Expr::BinaryOp { left, op, right } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                match op {
                    BinaryOp::Add => Ok(l.add(&r)?),
                    BinaryOp::Sub => Ok(l.add(&r.negate())?),
                    BinaryOp::Mul => {
                        if l.is_constant() {
                            Ok(r.scale(l.constant)?)
                        } else if r.is_constant() {
                            Ok(l.scale(r.constant)?)
                        } else {
                            Err(CompileError::Nonlinear(expr.to_string()))
                        }
                    }
                    BinaryOp::Div => {
                        if !r.is_constant() {
                            return Err(CompileError::Nonlinear(expr.to_string()));
                        }
                        if r.constant.is_zero() {
                            return Err(CompileError::DivisionByZero);
                        }
                        Ok(l.scale(Rational::ONE.checked_div(r.constant)?)?)
                    }
                }
            }
        }
    }
}
