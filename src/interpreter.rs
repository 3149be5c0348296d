use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local exit from statement execution.  `Return` is control flow, not
/// a failure: it tunnels out of nested blocks and loops until the invocation
/// frame that owns the function body catches it.
#[derive(Debug)]
pub enum Unwind {
    Return { value: Value, line: usize },
    Error(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(error: LoxError) -> Self {
        Unwind::Error(error)
    }
}

type Execution = std::result::Result<(), Unwind>;

/// Recursive evaluator over the syntax tree.  Program output goes to the
/// injected writer so embedders and tests can capture it.
pub struct Interpreter<'out> {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    output: &'out mut dyn Write,
}

impl<'out> Interpreter<'out> {
    pub fn new(output: &'out mut dyn Write) -> Self {
        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock_native,
            },
        );

        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Merge a binding-distance table from the resolver.  The REPL resolves
    /// line by line, so the table grows across calls; identities never
    /// collide because the parser threads its ID watermark.
    pub fn add_resolved(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    /// Outermost entry point: runs the program to completion or surfaces
    /// the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                Err(Unwind::Error(e)) => return Err(e),

                // Statically rejected by the resolver; reaching this means
                // the pass was skipped or broken.
                Err(Unwind::Return { line, .. }) => {
                    return Err(LoxError::runtime(line, "Cannot return from top-level code."));
                }
            }
        }

        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Execution {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value: Value = if let Some(expr) = initializer {
                    self.evaluate(expr)?
                } else {
                    Value::Nil
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment: Rc<RefCell<Environment>> = Rc::new(RefCell::new(
                    Environment::with_enclosing(Rc::clone(&self.environment)),
                ));

                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(decl) => {
                // The closure captures the environment at the point of
                // definition, not the caller's.
                let function: Value = Value::Function {
                    declaration: Rc::clone(decl),
                    closure: Rc::clone(&self.environment),
                };

                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, function);

                Ok(())
            }

            Stmt::Return { keyword, value } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(Unwind::Return {
                    value,
                    line: keyword.line,
                })
            }
        }
    }

    /// Runs `statements` with `environment` installed as current, restoring
    /// the previous environment on every exit path, including errors and
    /// return unwinds.
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Execution {
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);

        self.environment = environment;

        for statement in statements {
            if let Err(interrupt) = self.execute(statement) {
                self.environment = previous;
                return Err(interrupt);
            }
        }

        self.environment = previous;

        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(token) => self.evaluate_literal(token),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(distance) => Environment::assign_at(
                        &self.environment,
                        *distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                // The assignment expression itself evaluates to the value.
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
        }
    }

    fn evaluate_literal(&self, token: &Token) -> Result<Value> {
        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Value::Number(*n)),

            TokenType::STRING(s) => Ok(Value::String(s.clone())),

            TokenType::TRUE => Ok(Value::Bool(true)),

            TokenType::FALSE => Ok(Value::Bool(false)),

            TokenType::NIL => Ok(Value::Nil),

            _ => Err(LoxError::runtime(token.line, "Invalid literal.")),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let value: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        // Left before right, both before dispatch.
        let left_val: Value = self.evaluate(left)?;
        let right_val: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a * b))
            }

            // Division by zero follows IEEE 754: it yields an infinity or
            // NaN rather than an error.
            TokenType::SLASH => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = check_number_operands(operator, &left_val, &right_val)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.")),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val: Value = self.evaluate(left)?;

        // The result is the last evaluated operand, never coerced to bool.
        match operator.token_type {
            TokenType::OR => {
                if left_val.is_truthy() {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            TokenType::AND => {
                if !left_val.is_truthy() {
                    Ok(left_val)
                } else {
                    self.evaluate(right)
                }
            }

            _ => Err(LoxError::runtime(
                operator.line,
                "Invalid logical operator.",
            )),
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Result<Value> {
        let callee_val: Value = self.evaluate(callee)?;

        let mut arg_values: Vec<Value> = Vec::new();

        for arg in arguments {
            arg_values.push(self.evaluate(arg)?);
        }

        match callee_val {
            Value::NativeFunction { arity, func, .. } => {
                check_arity(paren, arity, arg_values.len())?;

                func(&arg_values).map_err(|msg| LoxError::runtime(paren.line, msg))
            }

            Value::Function {
                declaration,
                closure,
            } => {
                check_arity(paren, declaration.params.len(), arg_values.len())?;

                self.call_function(&declaration, closure, arg_values)
            }

            _ => Err(LoxError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }

    fn call_function(
        &mut self,
        declaration: &Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        // A fresh frame per invocation, enclosed by the captured closure
        // environment rather than the caller's.
        let environment: Rc<RefCell<Environment>> =
            Rc::new(RefCell::new(Environment::with_enclosing(closure)));

        for (param, argument) in declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        match self.execute_block(&declaration.body, environment) {
            Ok(()) => Ok(Value::Nil),

            Err(Unwind::Return { value, .. }) => Ok(value),

            Err(Unwind::Error(e)) => Err(e),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => {
                Environment::get_at(&self.environment, *distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }
}

fn check_arity(paren: &Token, arity: usize, got: usize) -> Result<()> {
    if got != arity {
        return Err(LoxError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}.", arity, got),
        ));
    }

    Ok(())
}

fn check_number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),

        _ => Err(LoxError::runtime(operator.line, "Operands must be numbers.")),
    }
}

fn clock_native(_args: &[Value]) -> std::result::Result<Value, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}
