use super::read_source;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use sculpt_parser::{format_errors, parse};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSIONS: &[&str] = &["jsx", "tsx"];

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Source file or directory to check
    #[arg(default_value = ".")]
    pub input: PathBuf,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_sources(&args.input)
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let mut failed = 0;
    for file in &files {
        let source = read_source(file)?;
        let parsed = parse(&source);
        if parsed.has_errors() {
            failed += 1;
            eprintln!("  {} {}", "✗".red(), file.display());
            eprint!(
                "{}",
                format_errors(&source, &file.display().to_string(), &parsed.errors)
            );
        } else {
            let nodes = parsed.root.as_ref().map(|root| root.ids().len()).unwrap_or(0);
            println!("  {} {} ({} nodes)", "✓".green(), file.display(), nodes);
        }
    }

    println!();
    println!("Checked {} files, {} with errors", files.len(), failed);
    if failed > 0 {
        return Err(anyhow!("{} files failed to parse", failed));
    }
    Ok(())
}

fn find_sources(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !(name.starts_with('.') || name == "node_modules" || name == "target")
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
