use std::path::PathBuf;
use std::process;
use std::thread;

use anyhow::{Context, anyhow, bail};
use clap::Parser;
use tiler_wm::actor;
use tiler_wm::actor::reactor::{self, Reactor, Record, SimWindow};
use tiler_wm::common::config::{Config, config_file};
use tiler_wm::common::log;
use tiler_wm::sys::window::WindowHandle;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "tiler-sim")]
#[command(about = "Replay window events against the tiling layout engine")]
struct Cli {
    /// Events to replay, one RON value per line.
    scenario: PathBuf,

    /// Config file to use instead of ~/.tiler.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Check the config file and exit.
    #[arg(long)]
    validate: bool,

    /// Record reactor events to the specified file path. Overwrites the file if
    /// it exists.
    #[arg(long)]
    record: Option<PathBuf>,

    /// Print the final engine state as JSON instead of a tree.
    #[arg(long)]
    json: bool,
}

fn main() {
    let opt: Cli = Parser::parse();
    log::init_logging();

    if let Err(err) = run(opt) {
        error!("{err:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let path = opt.config.or_else(config_file);
    let mut config = Config::load_or_default(path.as_deref())
        .with_context(|| format!("loading config {path:?}"))?;

    let problems = config.validate();
    if opt.validate {
        for problem in &problems {
            println!("{problem}");
        }
        if !problems.is_empty() {
            bail!("{} invalid config value(s)", problems.len());
        }
        println!("config ok");
        return Ok(());
    }
    for problem in &problems {
        warn!("{problem}");
    }
    config.auto_fix_values();

    let events = reactor::read_events::<SimWindow>(&opt.scenario)?;
    info!(count = events.len(), "Replaying scenario");

    let reactor = Reactor::new(config, Record::new(opt.record.as_deref())?);
    let (tx, rx) = actor::channel();
    let handle = thread::Builder::new()
        .name("reactor".to_string())
        .spawn(move || reactor.run(rx))
        .context("spawning reactor thread")?;
    for event in events {
        tx.send(event);
    }
    drop(tx);
    let reactor = handle.join().map_err(|_| anyhow!("reactor thread panicked"))?;

    let engine = reactor.layout_engine();
    if opt.json {
        println!("{}", engine.serialize_state()?);
        return Ok(());
    }
    println!("{}", engine.draw_tree());
    let mut windows: Vec<_> = reactor.windows().collect();
    windows.sort_by_key(|w| w.id());
    for window in windows {
        let frame = window.frame;
        println!(
            "{:?}: ({}, {}) {}x{}{}",
            window.id(),
            frame.x0,
            frame.y0,
            frame.width(),
            frame.height(),
            if window.activated > 0 { " [focused]" } else { "" },
        );
    }
    if let Some(preview) = reactor.drop_preview() {
        println!("drop preview: {} {:?}", preview.style.class_name(), preview.rect);
    }
    Ok(())
}
