use dubby_export::ExportError;
use dubby_luamin::MinifyError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or writing a source directory
#[derive(Error, Debug)]
pub enum SrcDirError {
    #[error("Bad marker in {file} line {line}: {text}")]
    MalformedMarker {
        file: String,
        line: usize,
        text: String,
    },

    #[error("Marker without a matching counterpart in {file} line {line}: {text}")]
    MarkerMismatch {
        file: String,
        line: usize,
        text: String,
    },

    #[error("Handler opened in {file} line {line} is never closed")]
    UnclosedHandler { file: String, line: usize },

    #[error("Lib header mismatch! libs={libs} != headers={headers}")]
    LibHeaderMismatch { libs: usize, headers: usize },

    #[error("Slot file name should be <key>.<name>.lua: {0}")]
    InvalidSlotFile(String),

    #[error("Expected a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Expected a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Minify(#[from] MinifyError),

    #[error("Failed to list directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
