use crate::browser::SessionError;
use crate::options::OutputFormat;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// The pipeline stage an [`Error`] belongs to.
///
/// Each stage maps to its own process exit code so calling scripts can tell a bad argument apart
/// from a browser that never started or a diagram that failed to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Input,
    Launch,
    Render,
    Capture,
    Save,
}

impl Stage {
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::Validation => 1,
            Stage::Input => 2,
            Stage::Launch => 3,
            Stage::Render => 4,
            Stage::Capture => 5,
            Stage::Save => 6,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input file \"{}\" doesn't exist", path.display())]
    InputNotFound { path: PathBuf },

    #[error(
        "Output file must end with \".svg\", \".png\" or \".pdf\" (got \"{}\")",
        path.display()
    )]
    InvalidOutputExtension { path: PathBuf },

    #[error("Output directory \"{}/\" doesn't exist", dir.display())]
    OutputDirectoryMissing { dir: PathBuf },

    #[error(
        "Output format \"{format}\" doesn't match the extension of \"{}\"",
        path.display()
    )]
    FormatMismatch { format: OutputFormat, path: PathBuf },

    #[error("{kind} file \"{}\" doesn't exist", path.display())]
    ConfigFileNotFound { kind: &'static str, path: PathBuf },

    #[error("{kind} file must end with \"{expected}\" (got \"{}\")", path.display())]
    InvalidConfigExtension {
        kind: &'static str,
        path: PathBuf,
        expected: &'static str,
    },

    #[error("failed to read {kind} file {}: {source}", path.display())]
    ConfigRead {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {kind} file {}: {source}", path.display())]
    InvalidConfigJson {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} \"{}\" doesn't exist", path.display())]
    AssetNotFound { kind: &'static str, path: PathBuf },

    #[error("{what} must be a positive number (got {value})")]
    InvalidDimension { what: &'static str, value: String },

    #[error("unknown theme \"{0}\" (expected default, forest, dark or neutral)")]
    UnknownTheme(String),

    #[error("unknown output format \"{0}\" (expected svg, png or pdf)")]
    UnknownFormat(String),

    #[error("failed to read diagram definition from {from}: {source}")]
    InputRead {
        from: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare the bootstrap page: {0}")]
    Bootstrap(#[source] std::io::Error),

    #[error("failed to launch browser: {0}")]
    BrowserLaunch(#[source] SessionError),

    #[error("failed to render diagram: {0}")]
    Render(#[source] SessionError),

    #[error("failed to capture {format} output: {source}")]
    Capture {
        format: OutputFormat,
        #[source]
        source: SessionError,
    },

    #[error("failed to save output to {to}: {source}")]
    Save {
        to: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::InputRead { .. } => Stage::Input,
            Error::Bootstrap(_) | Error::BrowserLaunch(_) => Stage::Launch,
            Error::Render(_) => Stage::Render,
            Error::Capture { .. } => Stage::Capture,
            Error::Save { .. } => Stage::Save,
            _ => Stage::Validation,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.stage().exit_code()
    }
}
