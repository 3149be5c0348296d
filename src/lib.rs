//! A tree-walking interpreter for the Lox scripting language: lexical
//! scoping with closure-capturing first-class functions, one numeric type,
//! strings, booleans, and nil.
//!
//! The pipeline is scanner → parser → resolver → interpreter; [`run`] wires
//! the stages together over a persistent [`interpreter::Interpreter`].

pub mod ast_printer;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use crate::error::LoxError;
use crate::expr::ExprId;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;

/// Everything that went wrong in one [`run`] call, plus the parser's ID
/// watermark so a REPL keeps node identities unique across lines even after
/// a failed one.
#[derive(Debug)]
pub struct RunFailure {
    pub next_id: ExprId,
    pub errors: Vec<LoxError>,
}

impl RunFailure {
    /// Distinguishes exit code 70 from 65 in the CLI.
    pub fn is_runtime(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, LoxError::Runtime { .. }))
    }
}

/// Scans, parses, resolves and executes `source` against `interpreter`.
///
/// Lexical and syntactic diagnostics accumulate across the first two stages
/// and are all reported together; execution is skipped if any occurred.  On
/// success the returned watermark is the `base_id` for the next call.
pub fn run(
    source: &[u8],
    interpreter: &mut Interpreter<'_>,
    base_id: ExprId,
) -> std::result::Result<ExprId, RunFailure> {
    let (tokens, mut errors) = scanner::scan_tokens(source);

    let mut parser: Parser = Parser::with_base_id(tokens, base_id);
    let parsed = parser.parse();
    let next_id: ExprId = parser.next_id();

    let statements = match parsed {
        Ok(statements) => statements,

        Err(parse_errors) => {
            errors.extend(parse_errors);
            return Err(RunFailure { next_id, errors });
        }
    };

    if !errors.is_empty() {
        return Err(RunFailure { next_id, errors });
    }

    let locals = match Resolver::new().resolve(&statements) {
        Ok(locals) => locals,

        Err(e) => {
            return Err(RunFailure {
                next_id,
                errors: vec![e],
            })
        }
    };

    interpreter.add_resolved(locals);

    match interpreter.interpret(&statements) {
        Ok(()) => Ok(next_id),

        Err(e) => Err(RunFailure {
            next_id,
            errors: vec![e],
        }),
    }
}
