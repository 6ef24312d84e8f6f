mod loader;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::loader::{Document, expand_paths};
use rbk_ast::{
    DEFAULT_MAX_DEPTH, Diagnostic, Lexer, ParseOptions, RunbookRenderer, Severity, TokenKind,
    lower,
};

#[derive(Parser)]
#[command(name = "rbk")]
#[command(about = "Inspect and check runbook files", long_about = None)]
struct Cli {
    /// Nesting limit for brackets, calls and binary operators
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the token stream of a file
    Tokens {
        file: PathBuf,

        /// Include whitespace and comments
        #[arg(long)]
        trivia: bool,
    },

    /// Print the syntax tree of a file
    Tree {
        file: PathBuf,

        /// Output format: sexp or json
        #[arg(short, long, default_value = "sexp")]
        format: String,
    },

    /// Report diagnostics for one or more files (globs allowed)
    Check {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Print the typed runbook model of a file
    Lower {
        file: PathBuf,

        /// Output format: json or render
        #[arg(short, long, default_value = "json")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = ParseOptions::default().with_max_depth(cli.max_depth);

    match cli.command {
        Commands::Tokens { file, trivia } => {
            let doc = Document::load(&file)?;
            for token in Lexer::new(&doc.source) {
                if token.kind.is_trivia() && !trivia {
                    continue;
                }
                if token.kind == TokenKind::Eof {
                    break;
                }
                println!(
                    "{}:{} {:?} {:?}",
                    token.line,
                    token.column,
                    token.kind,
                    token.text(&doc.source)
                );
            }
        }

        Commands::Tree { file, format } => {
            let doc = Document::load(&file)?;
            let parse = doc.parse(options);
            match format.as_str() {
                "sexp" => {
                    println!("{}", parse.tree.to_sexp());
                    print_diagnostics(&doc, &parse.diagnostics);
                }
                "json" => println!("{}", serde_json::to_string_pretty(&parse)?),
                _ => anyhow::bail!("Unknown format: {}. Use sexp or json", format),
            }
        }

        Commands::Check { files } => {
            let paths = expand_paths(&files)?;
            let (checked, problems) = check(paths, options).await?;
            if problems > 0 {
                println!(
                    "{} {} problem(s) in {} file(s)",
                    "✗".red(),
                    problems,
                    checked
                );
                std::process::exit(1);
            }
            println!("{} {} file(s) checked", "✓".green(), checked);
        }

        Commands::Lower { file, format } => {
            let doc = Document::load(&file)?;
            let parse = doc.parse(options);
            let (runbook, lower_errors) = lower(&parse.tree);
            print_diagnostics(&doc, &parse.diagnostics);
            for err in &lower_errors {
                eprintln!(
                    "{}: {}: {}",
                    doc.location(err.span().start),
                    "warning".yellow().bold(),
                    err
                );
            }

            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&runbook)?),
                "render" => print!("{}", RunbookRenderer::new().render(&runbook)),
                _ => anyhow::bail!("Unknown format: {}. Use json or render", format),
            }

            if parse.errors().next().is_some() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Parse every file on the blocking pool, then report in argument order.
/// Returns the number of files and the number of diagnostics.
async fn check(paths: Vec<PathBuf>, options: ParseOptions) -> anyhow::Result<(usize, usize)> {
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            tokio::task::spawn_blocking(move || {
                let doc = Document::load(&path)?;
                let parse = doc.parse(options);
                Ok::<_, loader::LoadError>((doc, parse))
            })
        })
        .collect();

    let mut checked = 0;
    let mut problems = 0;
    for handle in handles {
        let (doc, parse) = handle.await??;
        debug!(
            path = %doc.path.display(),
            diagnostics = parse.diagnostics.len(),
            "checked"
        );
        print_diagnostics(&doc, &parse.diagnostics);
        checked += 1;
        problems += parse.diagnostics.len();
    }
    Ok((checked, problems))
}

fn print_diagnostics(doc: &Document, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        eprintln!(
            "{}: {}: {}",
            doc.location(diagnostic.offset()),
            severity,
            diagnostic.message
        );
    }
}
