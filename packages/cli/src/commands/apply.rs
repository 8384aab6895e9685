use super::{read_source, report_errors};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use sculpt_editor::Mutation;
use sculpt_parser::parse;
use sculpt_workspace::EditorConfig;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Source file to edit
    pub input: PathBuf,

    /// Mutation as JSON, e.g. '{"type":"delete","nodeId":"h1-0.0"}'
    #[arg(short, long, conflicts_with = "mutation_file")]
    pub mutation: Option<String>,

    /// Read the mutation from a JSON file
    #[arg(long)]
    pub mutation_file: Option<PathBuf>,

    /// Write the result back instead of printing it
    #[arg(short, long)]
    pub write: bool,
}

pub fn apply(args: ApplyArgs, cwd: &Path) -> Result<()> {
    let json = match (&args.mutation, &args.mutation_file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => read_source(path)?,
        (None, None) => return Err(anyhow!("Pass --mutation or --mutation-file")),
    };
    let mutation: Mutation = serde_json::from_str(&json).context("Invalid mutation")?;

    let source = read_source(&args.input)?;
    report_errors(&args.input, &parse(&source))?;

    let engine = EditorConfig::load(cwd)?.engine();
    let outcome = engine.apply(&source, &mutation)?;

    if !args.write {
        print!("{}", outcome.source);
        return Ok(());
    }
    if outcome.noop {
        println!("{} {} unchanged", "✓".green(), args.input.display());
        return Ok(());
    }
    fs::write(&args.input, &outcome.source)
        .with_context(|| format!("Failed to write {}", args.input.display()))?;
    println!(
        "{} {} {}",
        "✓".green(),
        mutation.name().bright_white(),
        args.input.display()
    );
    Ok(())
}
