//! Junkyard - batch file-processing toolbox
//!
//! Headless shell: runs one tool on one target, shows progress and cancels
//! the job on Ctrl-C.

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use junkyard::cli::{Args, Commands};
use junkyard::config::Config;
use junkyard::engine::{BatchTool, JobSummary, ProcessEngine};
use junkyard::imaging::{ImageFormat, ImageOutputFormat, ResizeMode};
use junkyard::media::{EncoderFactory, VideoCodec, VideoFormat};
use junkyard::tools::{
    ArchiveTool, ChangeExtensionTool, ImageConvertTool, RarToZipTool, ResyncSubtitleTool,
    ThumbnailTool, VideoConvertTool,
};

const DEFAULT_CONFIG_FILE: &str = "junkyard.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging to both console and file
    let _guard = setup_logging(args.verbose)?;

    info!("Starting Junkyard");

    let mut config = load_config(args.config.as_deref())?;
    let path = args.command.path().clone();

    let summary = match args.command {
        Commands::Archive { include_parent, .. } => {
            if include_parent {
                config.archive.include_parent_directory = true;
            }
            run_tool(ArchiveTool::new(config.archive), &path).await?
        }
        Commands::RarToZip { .. } => run_tool(RarToZipTool::default(), &path).await?,
        Commands::ChangeExtension { from, to, case_sensitive, .. } => {
            let options = &mut config.change_extension;
            if let Some(from) = from {
                options.set_from(&from);
            }
            if let Some(to) = to {
                options.set_to(&to);
            }
            if case_sensitive {
                options.ignore_case = false;
            }
            run_tool(ChangeExtensionTool::new(config.change_extension), &path).await?
        }
        Commands::ImageConvert { from, to, include_archives, .. } => {
            let options = &mut config.image_convert;
            if let Some(from) = from {
                options.from = from.parse()?;
            }
            if let Some(to) = to {
                options.to = to.parse()?;
            }
            if include_archives {
                options.include_archive_files = true;
            }
            run_tool(ImageConvertTool::new(config.image_convert), &path).await?
        }
        Commands::Thumbnail { formats, output, mode, width, height, ratio, .. } => {
            let options = &mut config.thumbnail;
            if let Some(formats) = formats {
                options.target_formats = parse_image_formats(&formats)?;
            }
            if let Some(output) = output {
                options.output_format = output.parse::<ImageOutputFormat>()?;
            }
            if let Some(mode) = mode {
                options.resize_mode = mode.parse::<ResizeMode>()?;
            }
            if let Some(width) = width {
                options.set_width_input(&width);
            }
            if let Some(height) = height {
                options.set_height_input(&height);
            }
            if let Some(ratio) = ratio {
                options.set_ratio_input(&ratio);
            }
            run_tool(ThumbnailTool::new(config.thumbnail), &path).await?
        }
        Commands::ResyncSubtitle { shift, .. } => {
            if let Some(shift) = shift {
                config.subtitle.set_shift_input(&shift);
            }
            run_tool(ResyncSubtitleTool::new(config.subtitle), &path).await?
        }
        Commands::VideoConvert { codec, format, no_hardware, .. } => {
            let options = &mut config.video;
            if let Some(codec) = codec {
                options.codec = codec.parse::<VideoCodec>()?;
            }
            if let Some(format) = format {
                options.target_format = format.parse::<VideoFormat>()?;
            }
            if no_hardware {
                options.use_hardware_encoder = false;
            }
            let encoder = EncoderFactory::create_encoder(&config.encoder)?;
            run_tool(VideoConvertTool::new(config.video, encoder), &path).await?
        }
    };

    if args.json {
        println!("{}", summary.to_json()?);
    } else {
        println!(
            "{}: {} processed, {} failed, {} total{}",
            path.display(),
            summary.processed_count,
            summary.failed_count,
            summary.total_items,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
    }

    info!("Junkyard finished");
    Ok(())
}

/// Run one job of `tool` on `path`, cancelling it on Ctrl-C
async fn run_tool<T: BatchTool>(tool: T, path: &Path) -> Result<JobSummary> {
    let engine = Arc::new(ProcessEngine::new(tool));
    if !engine.handle_drop(&[path]) {
        bail!(
            "{} is not a valid target for {}",
            path.display(),
            engine.tool().name()
        );
    }

    let Some(handle) = engine.start_job()? else {
        bail!("No target selected");
    };

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut states = engine.subscribe();
    let bar = progress.clone();
    let reporter = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            bar.set_length(state.total_items as u64);
            bar.set_position(state.current_index as u64);
            bar.set_message(state.current_item.unwrap_or_default());
            if !state.is_running {
                break;
            }
        }
    });

    let canceller = Arc::clone(&engine);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling job");
            canceller.cancel();
        }
    });

    let result = handle.wait().await;
    interrupt.abort();
    reporter.abort();
    progress.finish_and_clear();

    Ok(result?)
}

/// Load `--config`, else `./junkyard.toml`, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            if local.exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(local)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".junkyard").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "junkyard.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("junkyard.log").display()
    );

    Ok(guard)
}

/// Parse a comma-separated list of image formats
fn parse_image_formats(list: &str) -> Result<Vec<ImageFormat>> {
    let mut formats = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let format: ImageFormat = name.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        bail!("At least one image format is required");
    }
    Ok(formats)
}
