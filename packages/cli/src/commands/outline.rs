use super::{read_source, report_errors};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sculpt_parser::{parse, Node};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct OutlineArgs {
    /// Source file to outline
    pub input: PathBuf,

    /// Print the parse result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn outline(args: OutlineArgs) -> Result<()> {
    let source = read_source(&args.input)?;
    let parsed = parse(&source);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    report_errors(&args.input, &parsed)?;
    if let Some(root) = &parsed.root {
        print_node(root, 0);
    }
    Ok(())
}

fn print_node(node: &Node, depth: usize) {
    let indent = "  ".repeat(depth);
    let span = format!("[{}..{}]", node.loc.start, node.loc.end).dimmed();

    if node.is_text {
        let text = node.text.as_deref().unwrap_or_default().trim();
        if !text.is_empty() {
            println!("{}{:?} {}", indent, text, span);
        }
        return;
    }

    let tag = if node.is_fragment() {
        "<>".to_string()
    } else {
        format!("<{}>", node.tag_name)
    };
    println!("{}{} {} {}", indent, tag.bright_blue(), node.id.bright_white(), span);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
