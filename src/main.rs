use std::fs::File;
use std::io;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use rlox::ast_printer::AstPrinter;
use rlox::error::LoxError;
use rlox::expr::ExprId;
use rlox::interpreter::Interpreter;
use rlox::parser::Parser;
use rlox::scanner;

use clap::Parser as ClapParser;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; starts an interactive session when omitted
    script: Vec<PathBuf>,

    /// Print the scanned token stream instead of executing
    #[arg(long)]
    tokens: bool,

    /// Print the parsed syntax tree instead of executing
    #[arg(long)]
    ast: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    if args.script.len() > 1 {
        eprintln!("Usage: rlox [script]");
        process::exit(64);
    }

    match args.script.first() {
        Some(path) => {
            let mut buf: Vec<u8> = Vec::new();
            let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
            reader.read_to_end(&mut buf)?;

            if args.tokens {
                dump_token_stream(&buf);
            } else if args.ast {
                dump_syntax_tree(&buf);
            } else {
                run_file(&buf);
            }
        }

        None => run_prompt()?,
    }

    Ok(())
}

fn run_file(source: &[u8]) {
    let mut stdout: io::Stdout = io::stdout();
    let mut interpreter: Interpreter = Interpreter::new(&mut stdout);

    if let Err(failure) = rlox::run(source, &mut interpreter, 0) {
        for e in &failure.errors {
            eprintln!("{}", e);
        }

        process::exit(if failure.is_runtime() { 70 } else { 65 });
    }
}

fn run_prompt() -> anyhow::Result<()> {
    let stdin: io::Stdin = io::stdin();
    let mut stdout: io::Stdout = io::stdout();
    let mut interpreter: Interpreter = Interpreter::new(&mut stdout);

    // Node identities must stay unique for the whole session because
    // closures defined on earlier lines are still callable.
    let mut next_id: ExprId = 0;
    let mut line: String = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }

        match rlox::run(line.as_bytes(), &mut interpreter, next_id) {
            Ok(id) => next_id = id,

            // Errors are reported and the session continues.
            Err(failure) => {
                next_id = failure.next_id;
                for e in &failure.errors {
                    eprintln!("{}", e);
                }
            }
        }
    }

    Ok(())
}

fn dump_token_stream(source: &[u8]) {
    let (tokens, errors) = scanner::scan_tokens(source);

    for e in &errors {
        eprintln!("{}", e);
    }

    for token in &tokens {
        println!("{}", token);
    }

    if !errors.is_empty() {
        process::exit(65);
    }
}

fn dump_syntax_tree(source: &[u8]) {
    let (tokens, lex_errors) = scanner::scan_tokens(source);

    let mut parser: Parser = Parser::new(tokens);
    let parsed = parser.parse();

    let mut errors: Vec<LoxError> = lex_errors;

    match parsed {
        Ok(statements) => {
            if errors.is_empty() {
                let printer: AstPrinter = AstPrinter;

                for stmt in &statements {
                    println!("{}", printer.print_stmt(stmt));
                }

                return;
            }
        }

        Err(parse_errors) => errors.extend(parse_errors),
    }

    for e in &errors {
        eprintln!("{}", e);
    }

    process::exit(65);
}
