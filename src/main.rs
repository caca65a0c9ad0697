use std::io::{self, BufRead, Write};

use algebra_eval::{
    AngleMode, Bindings, Error, History, Number, Pipeline, evaluate, free_variables,
    intermediate_representation, lex, parse, simplify, tokenize,
};
use clap::Parser;
use clap::Subcommand;
use miette::{IntoDiagnostic, Report, WrapErr, miette};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(version, about = "Tokenize, parse, simplify and evaluate algebraic expressions")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Read trigonometric arguments as radians instead of degrees
    #[arg(long, global = true)]
    radians: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the token stream
    Tokenize { expression: String },
    /// Print the expression tree
    Parse { expression: String },
    /// Print the expression tree after constant folding
    Simplify { expression: String },
    /// Evaluate an expression
    Eval {
        expression: String,
        /// Bind a variable, e.g. `--var x=2.5`
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, Number)>,
        /// Evaluate the parsed tree without simplifying it first
        #[arg(long)]
        no_simplify: bool,
    },
    /// Read expressions from stdin and prompt for their variables
    Repl {
        /// Number of past results to keep
        #[arg(long, default_value_t = algebra_eval::history::DEFAULT_CAPACITY)]
        history: usize,
    },
}

fn parse_binding(arg: &str) -> Result<(String, Number), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{arg}`"))?;
    let value = value.parse::<Number>().map_err(|e| e.to_string())?;
    Ok((name.trim().to_lowercase(), value))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Attaches the normalized expression so labels point into it.
fn report(error: impl Into<Error>, expression: &str) -> Report {
    Report::new(error.into()).with_source_code(lex::normalize(expression))
}

fn main() -> miette::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let angle_mode = if args.radians {
        AngleMode::Radians
    } else {
        AngleMode::Degrees
    };

    match args.command {
        Commands::Tokenize { expression } => {
            let tokens = tokenize(&expression).map_err(|e| report(e, &expression))?;
            for token in tokens {
                println!("{token}");
            }
        }
        Commands::Parse { expression } => {
            let tokens = tokenize(&expression).map_err(|e| report(e, &expression))?;
            let tree = parse(&tokens).map_err(|e| report(e, &expression))?;
            println!("{tree}");
            print!("{}", intermediate_representation(&tree));
        }
        Commands::Simplify { expression } => {
            let pipeline = Pipeline::new(&expression).map_err(|e| report(e, &expression))?;
            println!("{}", pipeline.simplified);
            print!("{}", intermediate_representation(&pipeline.simplified));
        }
        Commands::Eval {
            expression,
            vars,
            no_simplify,
        } => {
            let tokens = tokenize(&expression).map_err(|e| report(e, &expression))?;
            let mut tree = parse(&tokens).map_err(|e| report(e, &expression))?;
            if !no_simplify {
                tree = simplify(&tree).map_err(|e| report(e, &expression))?;
            }
            let bindings: Bindings = vars.into_iter().collect();
            let result =
                evaluate(&tree, &bindings, angle_mode).map_err(|e| report(e, &expression))?;
            println!("{result}");
        }
        Commands::Repl { history } => {
            repl(History::new(history), angle_mode)?;
        }
    }
    Ok(())
}

fn repl(mut history: History, angle_mode: AngleMode) -> miette::Result<()> {
    let mut lines = io::stdin().lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().into_diagnostic()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.into_diagnostic().wrap_err("reading expression failed")?;

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":history" => print_history(&history),
            expression => {
                if let Err(e) = evaluate_line(expression, &mut lines, &mut history, angle_mode) {
                    eprintln!("{e:?}");
                }
            }
        }
    }
    Ok(())
}

fn evaluate_line(
    expression: &str,
    lines: &mut impl Iterator<Item = io::Result<String>>,
    history: &mut History,
    angle_mode: AngleMode,
) -> miette::Result<()> {
    let pipeline = Pipeline::new(expression).map_err(|e| report(e, expression))?;

    println!("tree:");
    print!("{}", intermediate_representation(&pipeline.tree));
    println!("simplified: {}", pipeline.simplified);

    let mut bindings = Bindings::new();
    for name in free_variables(&pipeline.simplified) {
        let value = prompt_value(&name, lines)?;
        bindings.insert(&name, value);
    }

    let result = pipeline
        .evaluate(&bindings, angle_mode)
        .map_err(|e| report(e, expression))?;
    println!("result: {result}");

    history.push(expression, result);
    print_history(history);
    Ok(())
}

/// Asks for a variable's value until the answer parses as a number.
fn prompt_value(
    name: &str,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> miette::Result<Number> {
    loop {
        print!("value for `{name}`: ");
        io::stdout().flush().into_diagnostic()?;

        let line = lines
            .next()
            .ok_or_else(|| miette!("input ended while reading `{name}`"))?
            .into_diagnostic()?;

        match line.parse::<Number>() {
            Ok(value) => return Ok(value),
            Err(e) => eprintln!("{e}, try again"),
        }
    }
}

fn print_history(history: &History) {
    if history.is_empty() {
        return;
    }
    println!("history:");
    for (idx, entry) in history.iter().enumerate() {
        println!("{}. {entry}", idx + 1);
    }
}
