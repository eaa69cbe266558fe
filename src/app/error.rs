use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GleanerError {
    /// The reviews panel could not be entered; nothing can be harvested.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// The browser crashed or stopped answering in the middle of a run.
    #[error("Rendering engine fault: {0}")]
    RenderingEngine(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Input file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GleanerError>;
