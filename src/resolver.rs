//! Static resolution pass.
//!
//! This module performs a single AST walk to:
//! 1. **Build lexical scopes**: maintains a stack of `HashMap<&str,bool>`
//!    tracking declared (false) and fully defined (true) names in each nested
//!    block or function.
//! 2. **Enforce static rules**: reports errors such as redeclaration in the
//!    same scope, reading a variable in its own initializer, and invalid
//!    `return` outside functions.
//! 3. **Record binding distances**: for every variable occurrence
//!    (`Expr::Variable` or `Expr::Assign`), notes how many environment frames
//!    sit between the use and the declaring scope.  Names found in no scope
//!    are globals and stay out of the table.  This enables the runtime to
//!    climb exactly the right number of frames instead of searching.
//!
//! The pass runs after parsing and before interpretation:
//!
//! ```ignore
//! let locals = Resolver::new().resolve(&statements)?;
//! interpreter.add_resolved(locals);
//! ```

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::stmt::Stmt;
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances keyed by expression identity.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: HashMap<ExprId, usize>,
    current_function: FunctionType,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            current_function: FunctionType::None,
        }
    }

    /// Walk all top-level statements and hand back the binding-distance
    /// table.  Resolution halts on the first static error.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<HashMap<ExprId, usize>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }

        Ok(self.locals)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s)?;
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declare first so the initializer sees the name as
                // not-yet-defined, then resolve it, then define.
                self.declare(name)?;

                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                self.define(name);
            }

            Stmt::Function(decl) => {
                // Declared and defined up front so the function body can
                // refer to itself recursively.
                self.declare(&decl.name)?;
                self.define(&decl.name);

                self.resolve_function(&decl.params, &decl.body)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Cannot return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { id, name } => {
                // Reading a variable whose own initializer is still being
                // resolved (e.g. `var a = a;`) is a static error.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "Cannot read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // The right-hand side first, then the target binding.
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;

                for arg in arguments {
                    self.resolve_expr(arg)?;
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, params: &'a [Token], body: &'a [Stmt]) -> Result<()> {
        let enclosing: FunctionType = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();

        for param in params {
            self.declare(param)?;
            self.define(param);
        }

        for stmt in body {
            self.resolve_stmt(stmt)?;
        }

        self.end_scope();

        self.current_function = enclosing;

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token) -> Result<()> {
        // The global scope is not tracked; redeclaration is only an error
        // in local scopes.
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme.as_str()) {
                return Err(LoxError::resolve(
                    name.line,
                    "Variable already declared in this scope.",
                ));
            }

            scope.insert(&name.lexeme, false);
        }

        Ok(())
    }

    fn define(&mut self, name: &'a Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(&name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at the depth of the first
    /// enclosing scope that knows the name, or leave it out of the table
    /// entirely (meaning: global).
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        // rev().enumerate() counts outward from the innermost scope, so the
        // walk terminates cleanly when every scope has been checked.
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme.as_str()) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Resolver::new()
    }
}
