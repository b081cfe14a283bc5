use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use egrab_core::config::NetworkConfig;
use egrab_core::downloader::network_access::NetworkAccess;
use egrab_core::engine::engine::{load_catalog, Engine, StaticEngine};
use egrab_core::engine::engine_iterator::EngineList;
use egrab_core::types::types::{DownloadError, ShowVersionInfo};

mod terminal_observer;
use terminal_observer::TerminalObserver;

#[derive(Parser)]
#[command(name = "egrab", about = "Fetch an artifact from the first engine that serves it")]
struct Args {
    /// JSON engine catalog, tried in order
    #[arg(short, long)]
    engines: Option<PathBuf>,

    /// Direct download URL; repeat to add fallbacks
    #[arg(short, long)]
    url: Vec<String>,

    /// JSON network config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the artifact is written and unpacked into
    #[arg(short, long)]
    temp_dir: Option<PathBuf>,

    /// Label shown before an engine produces data
    #[arg(long)]
    default_engine: Option<String>,

    /// Show version info once the artifact is in place
    #[arg(long)]
    show_version_info: bool,
}

fn build_engines(args: &Args) -> Result<Vec<Arc<dyn Engine>>, DownloadError> {
    let mut engines = match &args.engines {
        Some(path) => load_catalog(path)?,
        None => Vec::new(),
    };
    for (i, url) in args.url.iter().enumerate() {
        engines.push(Arc::new(StaticEngine::direct(format!("mirror-{}", i + 1), url.clone())));
    }
    Ok(engines)
}

fn build_config(args: &Args) -> Result<NetworkConfig, DownloadError> {
    let mut config = match &args.config {
        Some(path) => NetworkConfig::from_json_file(path)?,
        None => NetworkConfig::default(),
    };
    if let Some(dir) = &args.temp_dir {
        config.temp_dir = dir.clone();
    }
    if let Some(name) = &args.default_engine {
        config.default_engine = name.clone();
    }
    Ok(config)
}

async fn run(args: Args) -> Result<bool, DownloadError> {
    let config = build_config(&args)?;
    let engines = build_engines(&args)?;
    let Some(list) = EngineList::new(engines) else {
        return Err(DownloadError::NoCandidate);
    };
    let list = list.with_default_engine(config.default_engine.clone());

    let access = NetworkAccess::new(config)?.with_observer(Arc::new(TerminalObserver::new()));

    let cancel = access.new_cancel_token();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, cancelling download");
            interrupt.cancel();
        }
    });

    let show = ShowVersionInfo {
        show: args.show_version_info,
        set_after_downloading: args.show_version_info,
    };

    let start = Instant::now();
    let completion = access
        .download_with_cancel(list.into_iterator(), show, cancel)
        .await;

    if completion.success {
        println!("{} in {:.2}s", completion.message, start.elapsed().as_secs_f64());
        if let Some(path) = &completion.file_path {
            println!("Written to {}", path.display());
        }
        if completion.show_version_info.show {
            if let Some(exe) = &completion.exe_path {
                println!("{} provides {}", completion.engine_name, exe.display());
            }
        }
    } else {
        eprintln!("{}", completion.message);
    }
    Ok(completion.success)
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("egrab: {}", e);
            std::process::exit(2);
        }
    }
}
