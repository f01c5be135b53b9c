//! Headless demo binary: loads a directory through the engine, prints the
//! listing, and optionally watches it for changes. No renderer — rendering
//! is out of scope for this crate, the same way the engine itself never
//! imports a TUI toolkit.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use dir_engine::{Config, Engine};

#[derive(Parser, Debug)]
#[command(name = "dir-engine-demo", about = "Load and optionally watch a directory through dir-engine")]
struct Cli {
    /// Directory to load. Defaults to the current directory.
    path: Option<PathBuf>,

    /// Flatten nested directories up to this many levels deep.
    #[arg(long, default_value_t = 0)]
    flatten: u32,

    /// Keep polling for reloads for this many seconds after the initial load.
    #[arg(long, default_value_t = 0)]
    watch_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cwd = cli.path.unwrap_or(std::env::current_dir()?);
    let config = Config::load();

    let mut engine = Engine::new(config, cwd.clone());
    engine.request_dir_load(cwd.clone(), cli.flatten);

    wait_for_load(&mut engine, &cwd).await;
    print_listing(&engine, &cwd);

    if cli.watch_secs > 0 {
        tracing::info!("watching {} for {}s", cwd.display(), cli.watch_secs);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.watch_secs);
        let mut ticker = tokio::time::interval(Duration::from_millis(100));
        while tokio::time::Instant::now() < deadline {
            ticker.tick().await;
            engine.poll_due_reloads(cli.flatten);
            let events = engine.drain_results();
            if !events.is_empty() {
                print_listing(&engine, &cwd);
            }
        }
    }

    engine.shutdown();
    Ok(())
}

async fn wait_for_load(engine: &mut Engine, path: &std::path::Path) {
    for _ in 0..200 {
        let events = engine.drain_results();
        if !events.is_empty() {
            if let Some(dir) = engine.dir_cache.get(path) {
                if dir.load_time.is_some() {
                    return;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn print_listing(engine: &Engine, path: &std::path::Path) {
    let Some(dir) = engine.dir_cache.get(path) else {
        println!("(not loaded: {})", path.display());
        return;
    };
    println!("{} ({} entries)", dir.path.display(), dir.length());
    for (i, file) in dir.files().iter().enumerate() {
        let marker = if Some(i) == dir.cursor_index() { ">" } else { " " };
        let kind = if file.is_dir() { "/" } else { "" };
        println!("{marker} {}{}", file.name, kind);
    }
}
