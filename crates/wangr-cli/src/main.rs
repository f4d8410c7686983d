use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde_json::Value;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use wangr_core::preload::spawn_preloads;
use wangr_core::{
    ConfigLoader, Fetcher, HttpFetcher, Market, SharedCache, SnapshotSink, SortDirection,
    ViewController, ViewFrame, ViewKind, ViewServices,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Dashboard,
    Whales,
    Woi,
    ArbFutures,
    ArbSpot,
    ArbDex,
}

impl From<ViewArg> for ViewKind {
    fn from(arg: ViewArg) -> Self {
        match arg {
            ViewArg::Dashboard => ViewKind::Dashboard,
            ViewArg::Whales => ViewKind::WhalesFull,
            ViewArg::Woi => ViewKind::WoiFull,
            ViewArg::ArbFutures => ViewKind::Arbitrage(Market::Futures),
            ViewArg::ArbSpot => ViewKind::Arbitrage(Market::Spot),
            ViewArg::ArbDex => ViewKind::ArbitrageDex,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(name = "wangr", author, version, about = "Wangr market dashboard data feed")]
struct Cli {
    #[clap(long, short, help = "Config file path (defaults to the user config directory)")]
    config: Option<PathBuf>,

    #[clap(long, short, value_enum, default_value = "dashboard")]
    view: ViewArg,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, help = "Log to stderr instead of wangr.log")]
    log_stderr: bool,

    #[clap(long, help = "Column to sort the view's table by")]
    sort: Option<String>,

    #[clap(long, help = "Sort ascending (default is descending)")]
    ascending: bool,

    #[clap(long, default_value = "5", help = "Rows to print per frame")]
    rows: usize,

    #[clap(long, help = "Exit after this many rendered frames")]
    frames: Option<usize>,

    #[clap(long, help = "Do not preload other views at startup")]
    no_preload: bool,
}

/// Prints a summary of every rendered frame to stdout.
struct PrintSink {
    rows: usize,
    frames: usize,
}

impl SnapshotSink for PrintSink {
    fn on_snapshot_ready(&mut self, frame: ViewFrame<'_>) {
        self.frames += 1;
        let populated = frame
            .snapshot
            .iter()
            .filter(|(_, document)| !document.is_empty())
            .count();
        println!(
            "[{}] {}/{} sources populated, {} rows, {}",
            frame.kind,
            populated,
            frame.snapshot.len(),
            frame.rows.len(),
            frame.sort
        );
        for row in frame.rows.iter().take(self.rows) {
            println!("  {}", summarize(row));
        }
    }

    fn on_refresh_started(&mut self) {
        log::debug!("Refresh started");
    }
}

fn summarize(row: &Value) -> String {
    let text = row.to_string();
    if text.chars().count() > 120 {
        let head: String = text.chars().take(117).collect();
        format!("{}...", head)
    } else {
        text
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    if cli.log_stderr {
        env_logger::Builder::new().filter_level(level).init();
        return Ok(());
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("wangr.log")
        .context("Failed to open wangr.log")?;
    env_logger::Builder::new()
        .filter_level(level)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = Arc::new(ConfigLoader::load(cli.config.as_deref()).await?);
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(Arc::clone(&config)));
    let services = ViewServices::new(fetcher, SharedCache::new(), config.refresh.clone());

    if !cli.no_preload {
        let preloads = spawn_preloads(&services);
        tokio::spawn(async move {
            for (kind, handle) in preloads {
                if let Err(e) = handle.await {
                    log::error!("Preload task for {} failed: {}", kind, e);
                }
            }
        });
    }

    let kind = ViewKind::from(cli.view);
    let sink = PrintSink {
        rows: cli.rows,
        frames: 0,
    };
    let mut view = ViewController::open_from_cache(kind, &services, sink);

    if let Some(column) = &cli.sort {
        let wanted = if cli.ascending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        if view.request_sort(column, false) && view.sort().direction() != wanted {
            view.toggle_sort_direction();
        }
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, closing {}", kind);
                view.close();
                break;
            }
            alive = view.pump() => {
                if !alive {
                    break;
                }
                if cli.frames.is_some_and(|limit| view.sink().frames >= limit) {
                    view.close();
                    break;
                }
            }
        }
    }

    Ok(())
}
