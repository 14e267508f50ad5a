//! Error type for the dubby commands

use dubby_config::ConfigError;
use dubby_export::ExportError;
use dubby_luamin::MinifyError;
use dubby_srcdir::SrcDirError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Unsupported file type: {} (expected .json, .conf, .yml or .yaml)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to access {}: {source}", path.display())]
    File { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    SrcDir(#[from] SrcDirError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Minify(#[from] MinifyError),
}
