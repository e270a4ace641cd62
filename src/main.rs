// remespath command-line tool
// Parse a JSON file (or stdin), optionally query it, and print the result

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use remespath::json_parser::DEFAULT_MAX_DEPTH;
use remespath::{parse, parse_with_lint, ParserOptions, Query};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "remespath")]
#[command(about = "Parse JSON and query it with RemesPath", long_about = None)]
struct Args {
    /// JSON file to read; stdin when omitted
    file: Option<PathBuf>,

    /// RemesPath query to run against the document
    #[arg(short, long)]
    query: Option<String>,

    /// Print on one line
    #[arg(long)]
    compact: bool,

    /// Spaces per indentation level when pretty printing
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// Sort object keys (case-insensitive) in the output
    #[arg(long)]
    sort_keys: bool,

    /// Recover from malformed JSON and report every problem on stderr
    #[arg(long)]
    lint: bool,

    /// Accept // and /* */ comments
    #[arg(long)]
    allow_comments: bool,

    /// Accept single-quoted strings
    #[arg(long)]
    allow_single_quotes: bool,

    /// Read date and datetime strings as dates
    #[arg(long)]
    allow_datetimes: bool,

    /// Deepest array/object nesting accepted in the input
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

impl Args {
    fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            allow_comments: self.allow_comments,
            allow_single_quoted_strings: self.allow_single_quotes,
            allow_datetimes: self.allow_datetimes,
            max_depth: self.max_depth,
            ..ParserOptions::default()
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let text = read_input(args.file.as_ref())?;
    let options = args.parser_options();
    debug!(?options, bytes = text.len(), "parsing input");

    let root = if args.lint {
        let (root, lint) = parse_with_lint(&text, options).context("input is not JSON")?;
        for problem in &lint {
            eprintln!("lint: {}", problem);
        }
        if !lint.is_empty() {
            warn!(count = lint.len(), "input had syntax errors");
        }
        root
    } else {
        parse(&text, options).context("input is not valid JSON")?
    };

    let result = match &args.query {
        Some(query) => Query::compile(query)
            .with_context(|| format!("failed to compile query {:?}", query))?
            .evaluate(&root)
            .with_context(|| format!("failed to evaluate query {:?}", query))?,
        None => root,
    };

    let output = if args.compact {
        result.to_compact_string(args.sort_keys)
    } else {
        result.pretty_print(args.indent, args.sort_keys)
    };
    println!("{}", output);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remespath=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
