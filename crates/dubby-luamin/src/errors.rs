use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinifyError {
    #[error("luamin is not available at '{program}': {reason}")]
    Unavailable { program: String, reason: String },

    #[error("Failed to luamin (dumped to {}): {output}", dump_path.display())]
    Failed { output: String, dump_path: PathBuf },

    #[error("luamin produced invalid UTF-8 output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
