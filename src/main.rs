//! Command-line simulator for the scrollsync engine.
//!
//! Reads a script file, treats each stdin line as a transcript fragment,
//! runs a render ticker at the configured cadence, and prints engine events
//! as JSON lines. Useful for exercising matching and motion without a UI or
//! a speech recognizer.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use scrollsync::{EngineConfig, SessionRegistry, UniformLayout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

#[derive(Parser, Debug)]
#[command(name = "scrollsync", about = "Scroll a script by matching live transcript fragments")]
struct CliArgs {
    /// Script text file to prompt from
    script: PathBuf,

    /// Render tick interval in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Source confidence attached to every fragment
    #[arg(long, default_value_t = 1.0)]
    confidence: f64,

    /// Assumed characters per rendered line
    #[arg(long, default_value_t = 40)]
    chars_per_line: usize,

    /// Rendered line height in pixels
    #[arg(long, default_value_t = 48.0)]
    line_height: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CliArgs::parse();

    let script_text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;

    let registry = Arc::new(SessionRegistry::default());
    let layout = UniformLayout {
        chars_per_line: args.chars_per_line,
        line_height_px: args.line_height,
    };
    let id = registry.start_session_with(&script_text, EngineConfig::default(), Box::new(layout));
    info!("started {id}; type fragments, Ctrl-D to finish");

    let events = registry.events();
    let ticker_registry = registry.clone();
    let tick_ms = args.tick_ms;
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(tick_ms.max(1)));
        loop {
            interval.tick().await;
            // Stops once the session is gone
            if ticker_registry.tick(id).is_err() {
                break;
            }
            for event in events.try_iter() {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            }
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match registry.process_fragment(id, &line, args.confidence)? {
            Some(result) => info!(
                "matched tokens {}..={} score {:.2} via {:?}",
                result.start_index, result.end_index, result.score, result.strategy
            ),
            None => debug!("no match for fragment"),
        }
    }

    registry.stop_session(id)?;
    ticker.await?;

    // Anything emitted after the ticker stopped
    for event in registry.events().try_iter() {
        if let Ok(line) = serde_json::to_string(&event) {
            println!("{line}");
        }
    }
    Ok(())
}
