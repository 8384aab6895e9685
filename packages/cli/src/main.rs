mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, check, init, outline, watch, ApplyArgs, CheckArgs, InitArgs, OutlineArgs, WatchArgs,
};

/// Sculpt - structural editing for component markup
#[derive(Parser, Debug)]
#[command(name = "sculpt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default sculpt.config.json
    Init(InitArgs),

    /// Print the node tree of a file with ids and locations
    Outline(OutlineArgs),

    /// Report parse errors in a file or directory
    Check(CheckArgs),

    /// Apply a mutation to a file
    Apply(ApplyArgs),

    /// Follow a file, re-rendering on every change
    Watch(WatchArgs),
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("{} cannot read current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Outline(args) => outline(args),
        Command::Check(args) => check(args),
        Command::Apply(args) => apply(args, &cwd),
        Command::Watch(args) => watch(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
