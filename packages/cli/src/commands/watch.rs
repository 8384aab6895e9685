use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use sculpt_workspace::{
    EditorConfig, FsSourceStore, LivePreview, PreviewFrame, SourceStore, StructuralRenderer,
    Workspace,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Source file to follow
    pub input: PathBuf,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Print each frame as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn watch(args: WatchArgs, cwd: &Path) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(args, cwd))
}

async fn run(args: WatchArgs, cwd: &Path) -> Result<()> {
    let mut config = EditorConfig::load(cwd)?;
    if let Some(interval_ms) = args.interval_ms {
        config.poll_interval_ms = interval_ms;
    }

    let path = std::fs::canonicalize(&args.input)?;
    let (dir, name) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => (dir.to_path_buf(), name.to_string_lossy().into_owned()),
        _ => return Err(anyhow!("Cannot watch {}", path.display())),
    };

    let store: Arc<dyn SourceStore> = Arc::new(FsSourceStore::new(dir));
    let workspace = Workspace::new(Arc::clone(&store), config.clone());
    let sync = workspace.open(&name).await?;
    let preview = LivePreview::new(
        sync.clone(),
        Arc::new(StructuralRenderer::new(store)),
        config.render_props.clone(),
    );

    println!(
        "👀 {} {} (every {}ms, Ctrl-C to stop)",
        "Watching".green().bold(),
        path.display(),
        config.poll_interval_ms
    );

    let mut versions = sync.subscribe();
    if let Some(frame) = preview.render().await {
        print_frame(&frame, args.json)?;
    }

    loop {
        tokio::select! {
            changed = versions.changed() => {
                if changed.is_err() || sync.is_closed() {
                    break;
                }
                if let Some(frame) = preview.render().await {
                    print_frame(&frame, args.json)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    workspace.close_all().await;
    Ok(())
}

fn print_frame(frame: &PreviewFrame, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(frame)?);
        return Ok(());
    }

    if let Some(error) = &frame.error {
        println!("{} v{} {}", "✗".red(), frame.version, error);
        return Ok(());
    }
    let (matched, unmatched) = frame
        .report
        .as_ref()
        .map(|report| (report.matched, report.unmatched.len()))
        .unwrap_or_default();
    println!(
        "{} v{} {} matched, {} unmatched",
        "✓".green(),
        frame.version,
        matched,
        unmatched
    );
    println!("   {}", frame.order.join(" ").dimmed());
    Ok(())
}
