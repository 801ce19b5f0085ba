use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tessera_wm::common::config::{Config, config_file};
use tessera_wm::common::geometry::Rect;
use tessera_wm::common::log;
use tessera_wm::sync::{DisplayEvent, RecordingDisplay};
use tessera_wm::wm::WindowManager;
use tracing::{debug, info};

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check whether the configuration can be loaded, print any issues and
    /// exit.
    #[arg(long)]
    validate: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed recorded display events into a window manager and print the
    /// resulting tree and every request it made.
    Replay {
        /// One RON-encoded event per line.
        file: PathBuf,

        /// Size of the single output events are replayed against.
        #[arg(long, default_value_t = 1920)]
        width: i32,
        #[arg(long, default_value_t = 1080)]
        height: i32,
    },
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    if let Err(err) = run(opt) {
        eprintln!("tessera: {err:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.clone().unwrap_or_else(config_file);

    if opt.validate {
        let config = Config::read(&config_path)?;
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
            return Ok(());
        }
        for issue in issues {
            eprintln!("{issue}");
        }
        process::exit(1);
    }

    let config = if config_path.exists() {
        Config::read(&config_path)?
    } else {
        debug!(path = %config_path.display(), "no config file, using defaults");
        Config::default()
    };

    match opt.command {
        Some(Commands::Replay { file, width, height }) => replay(config, &file, width, height),
        None => {
            println!("{}", toml::to_string_pretty(&config).context("serializing config")?);
            Ok(())
        }
    }
}

fn replay(config: Config, path: &Path, width: i32, height: i32) -> anyhow::Result<()> {
    let screen = Rect::new(0, 0, width, height);
    let mut wm = WindowManager::new(config, RecordingDisplay::new(), screen);
    wm.add_output("default", screen);
    wm.flush()?;

    let events = read_events(path)?;
    info!(count = events.len(), "replaying events");
    for (line, event) in events {
        wm.dispatch(event).with_context(|| format!("dispatching event on line {line}"))?;
    }

    print!("{}", wm.draw_tree());
    for request in wm.display_mut().take() {
        println!("{request:?}");
    }
    for command in wm.take_commands() {
        println!("command: {command}");
    }
    Ok(())
}

/// Events with the line they were read from.
fn read_events(path: &Path) -> anyhow::Result<Vec<(usize, DisplayEvent)>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut events = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = ron::from_str(line).with_context(|| format!("line {}: bad event", idx + 1))?;
        events.push((idx + 1, event));
    }
    Ok(events)
}
