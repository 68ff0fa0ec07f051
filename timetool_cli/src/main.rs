//! # timetool_cli
//!
//! Part of the timetool crate family.
//!
//! Replays a recorded fragment stream through the time tool feature extractor, the same way
//! an online host would, and optionally writes the published features to a YAML summary.
//!
//! ## Use
//!
//! Make a template configuration and edit it:
//!
//! ```bash
//! timetool_cli -p config.yml new
//! ```
//!
//! Then run the replay:
//!
//! ```bash
//! timetool_cli -p config.yml
//! ```
//!
//! Terminal output is kept short; the detailed library log is written to `timetool.log`.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};

use libtimetool::config::Config;
use libtimetool::process::process;
use libtimetool::worker_status::WorkerStatus;

const LOG_FILE: &str = "./timetool.log";

fn make_template_config(path: &Path) -> std::io::Result<()> {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut file = File::create(path)?;
    file.write_all(yaml_str.as_bytes())
}

/// Route the library's log to a file
fn setup_library_log() -> spdlog::Result<()> {
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from(LOG_FILE))
            .formatter(Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [thread: {tid}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()?,
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()?,
    );
    spdlog::set_default_logger(logger);
    Ok(())
}

fn main() {
    // Create a cli
    let matches = Command::new("timetool_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    if let Err(e) = setup_library_log() {
        log::warn!("Could not open {LOG_FILE}, library messages will be lost: {e}");
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration path is required (-p/--path)");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        match make_template_config(&config_path) {
            Ok(()) => log::info!("Done."),
            Err(e) => log::error!("Failed to write template config: {e}"),
        }
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Stream Path: {}", config.stream_path.to_string_lossy());
    match &config.summary_path {
        Some(p) => log::info!("Summary Path: {}", p.to_string_lossy()),
        None => log::info!("Summary Path: None"),
    }
    log::info!("Base Name: {}", config.fex.base_name);
    log::info!(
        "Veto Code: {} Laser Code: {}",
        config.fex.event_code_bykik,
        config.fex.event_code_no_laser
    );
    log::info!(
        "Write Image: {} Write Projections: {}",
        config.fex.write_image,
        config.fex.write_projections
    );

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    pb.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || process(config, tx));

    // The channel closes when the worker finishes
    for status in rx.iter() {
        pb.set_position((status.progress * 100.0) as u64);
        pb.set_message(format!(
            "{} events, {} analyzed",
            status.events, status.analyzed
        ));
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(summary) => log::info!(
                "Successfully replayed {} events ({} analyzed)!",
                summary.events,
                summary.analyzed
            ),
            Err(e) => log::error!("Replay failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join replay task!"),
    }

    pb.finish();

    log::info!("Done.");
}
