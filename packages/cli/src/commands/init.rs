use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sculpt_workspace::{EditorConfig, DEFAULT_CONFIG_NAME};
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Poll interval for open documents, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Indent unit for new children ("tab" for a tab)
    #[arg(long, default_value = "  ")]
    pub indent: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = EditorConfig {
        poll_interval_ms: args.poll_interval_ms,
        indent_unit: match args.indent.as_str() {
            "tab" => "\t".to_string(),
            _ => args.indent,
        },
        ..EditorConfig::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)? + "\n")?;

    println!("{} Created {}", "✓".green(), DEFAULT_CONFIG_NAME.bright_white());
    Ok(())
}
