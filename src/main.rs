use anyhow::Result;
use clap::Parser as ClapParser;
use dum_lang::config::{OutputMode, RuntimeConfig, CONTINUATION_PREFIX, PROMPT_PREFIX};
use dum_lang::diagnostics;
use dum_lang::host::StdHost;
use dum_lang::interpreter::environment::Environment;
use dum_lang::interpreter::native_function::global_environment;
use dum_lang::interpreter::value::Value;
use dum_lang::{evaluate, produce_ast, tokenize, DumError};
use log::{debug, LevelFilter};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(ClapParser)]
#[command(name = "dum")]
#[command(about = "The DUM programming language")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<String>,

    /// What to print for each input
    #[arg(short, long, value_enum, default_value_t = OutputMode::Result)]
    mode: OutputMode,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Log tokenizing, parsing and evaluation timings
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = RuntimeConfig {
        mode: cli.mode,
        debug: cli.debug,
        json: cli.json,
        ..RuntimeConfig::default()
    };

    let mut logger = env_logger::Builder::from_default_env();
    if config.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let env = global_environment(Rc::new(StdHost));

    match cli.script {
        None => {
            run_prompt(&config, &env)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(path) => run_file(&path, &config, &env),
    }
}

fn run_prompt(config: &RuntimeConfig, env: &Rc<Environment>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut buffer = String::new();

    if let Some(path) = &config.history_file {
        let _ = rl.load_history(path);
    }

    loop {
        let prompt = if buffer.is_empty() {
            PROMPT_PREFIX
        } else {
            CONTINUATION_PREFIX
        };

        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                if !is_complete(&buffer) {
                    continue;
                }
                let input = buffer.trim().to_string();
                buffer.clear();
                if input.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input.as_str());
                if input == "exit" || input == "exit()" {
                    break;
                }
                if let Err(e) = run(&input, config, env) {
                    eprint!("{}", diagnostics::report(&input, &e));
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &config.history_file {
        let _ = rl.save_history(path);
    }

    Ok(())
}

// Input is complete once every bracket is closed and no string is open.
fn is_complete(code: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut iter = code.chars().peekable();

    while let Some(c) = iter.next() {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' => {
                if iter.peek() == Some(&'/') {
                    while let Some(&next) = iter.peek() {
                        if next == '\n' || next == '\r' {
                            break;
                        }
                        iter.next();
                    }
                }
            }
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_string
}

fn run_file(path: &str, config: &RuntimeConfig, env: &Rc<Environment>) -> Result<ExitCode> {
    let contents = fs::read_to_string(path)?;
    debug!("running {}", path);
    match run(&contents, config, env) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprint!("{}", diagnostics::report(&contents, &e));
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run(source: &str, config: &RuntimeConfig, env: &Rc<Environment>) -> Result<(), DumError> {
    match config.mode {
        OutputMode::Tokens => {
            let tokens = tokenize(source)?;
            println!("{}", to_json(&tokens));
        }
        OutputMode::Ast => {
            let program = produce_ast(source)?;
            println!("{}", to_json(&program));
        }
        OutputMode::Result => {
            let program = produce_ast(source)?;
            match evaluate(&program, Rc::clone(env), false)? {
                Value::Null => {}
                value if config.json => println!("{}", to_json(&value.to_native())),
                value => println!("{}", value),
            }
        }
    }
    Ok(())
}

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable: {}>", e))
}
