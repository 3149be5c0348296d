use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::token::TokenType;

/// Renders expressions and statements in parenthesized prefix form, e.g.
/// `(* (- 123) (group 45.67))`.  Used by the `--ast` dump and the parser
/// tests.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(token) => match &token.token_type {
                TokenType::NUMBER(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                TokenType::STRING(s) => s.to_string(),

                TokenType::TRUE => "true".to_string(),

                TokenType::FALSE => "false".to_string(),

                TokenType::NIL => "nil".to_string(),

                _ => "?".to_string(),
            },

            Expr::Grouping(inner) => format!("(group {})", self.print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print(left),
                self.print(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out: String = format!("(call {}", self.print(callee));

                for arg in arguments {
                    out.push(' ');
                    out.push_str(&self.print(arg));
                }

                out.push(')');
                out
            }
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} {})", name.lexeme, self.print(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let mut out: String = "(block".to_string();

                for s in statements {
                    out.push(' ');
                    out.push_str(&self.print_stmt(s));
                }

                out.push(')');
                out
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(eb) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(eb)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => {
                format!("(while {} {})", self.print(condition), self.print_stmt(body))
            }

            Stmt::Function(decl) => {
                let mut out: String = format!("(fun {} (", decl.name.lexeme);

                for (i, param) in decl.params.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(&param.lexeme);
                }

                out.push(')');

                for s in &decl.body {
                    out.push(' ');
                    out.push_str(&self.print_stmt(s));
                }

                out.push(')');
                out
            }

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", self.print(expr)),
                None => "(return)".to_string(),
            },
        }
    }
}
