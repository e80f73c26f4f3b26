use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for the defect classifier
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unknown classification label: {0}")]
    UnknownLabel(String),

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        state: String,
        action: &'static str,
    },

    #[error("{0} is not an unvisited sibling folder")]
    NotASibling(PathBuf),

    #[error("At least two shapes are needed to compare areas (found {found})")]
    NotEnoughShapes { found: usize },

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Crawl failed: {0}")]
    Crawl(String),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ClassifyError>;
