use thiserror::Error;

#[derive(Error, Debug)]
pub enum JunkyardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("RAR extraction error: {0}")]
    Rar(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Subtitle error: {0}")]
    Subtitle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("A job is already running for this tool")]
    JobAlreadyRunning,
}

pub type Result<T> = std::result::Result<T, JunkyardError>;
