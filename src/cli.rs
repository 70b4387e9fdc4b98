use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the job summary as JSON
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Zip every sub-directory of a directory
    Archive {
        /// Directory whose sub-directories are archived
        path: PathBuf,

        /// Keep the sub-directory as entry prefix and include nested files
        #[arg(long)]
        include_parent: bool,
    },

    /// Convert every RAR archive under a directory to ZIP
    RarToZip {
        /// Directory to scan recursively
        path: PathBuf,
    },

    /// Rename files from one extension to another
    ChangeExtension {
        /// Directory to scan recursively
        path: PathBuf,

        /// Extension to replace
        #[arg(short, long)]
        from: Option<String>,

        /// New extension
        #[arg(short, long)]
        to: Option<String>,

        /// Match the source extension exactly
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Convert images between formats
    ImageConvert {
        /// Directory to scan recursively
        path: PathBuf,

        /// Source format (jpeg, png, gif, webp)
        #[arg(short, long)]
        from: Option<String>,

        /// Target format (jpeg, png, gif, webp)
        #[arg(short, long)]
        to: Option<String>,

        /// Also convert images inside zip/cbz archives
        #[arg(long)]
        include_archives: bool,
    },

    /// Create resized copies of the images in a directory
    Thumbnail {
        /// Directory whose images are resized (not recursive)
        path: PathBuf,

        /// Source formats to include (comma-separated)
        #[arg(long)]
        formats: Option<String>,

        /// Output format (jpeg, png, webp, original)
        #[arg(short, long)]
        output: Option<String>,

        /// Resize mode (fixed-size, aspect-ratio, ratio)
        #[arg(short, long)]
        mode: Option<String>,

        /// Target width in pixels
        #[arg(long)]
        width: Option<String>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<String>,

        /// Percentage of the source width
        #[arg(long)]
        ratio: Option<String>,
    },

    /// Shift all timestamps of an SRT or SMI subtitle file
    ResyncSubtitle {
        /// Subtitle file
        path: PathBuf,

        /// Milliseconds to add, may be negative
        #[arg(short, long, allow_hyphen_values = true)]
        shift: Option<String>,
    },

    /// Transcode videos to MP4
    VideoConvert {
        /// Directory to scan recursively
        path: PathBuf,

        /// Video codec (h264, h265)
        #[arg(short, long)]
        codec: Option<String>,

        /// Source format filter (all, avi, m4v, ts, webm, wmv, mov, mpg)
        #[arg(short, long)]
        format: Option<String>,

        /// Use the software encoder even when a hardware one exists
        #[arg(long)]
        no_hardware: bool,
    },
}

impl Commands {
    /// Target path of the command
    pub fn path(&self) -> &PathBuf {
        match self {
            Commands::Archive { path, .. }
            | Commands::RarToZip { path }
            | Commands::ChangeExtension { path, .. }
            | Commands::ImageConvert { path, .. }
            | Commands::Thumbnail { path, .. }
            | Commands::ResyncSubtitle { path, .. }
            | Commands::VideoConvert { path, .. } => path,
        }
    }
}
