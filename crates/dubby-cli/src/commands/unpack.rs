use clap::Args;
use dubby_config::{Config, LineEnding};
use dubby_export::FilterTable;
use dubby_logger as logger;
use dubby_srcdir::WriteOptions;
use std::path::PathBuf;

use crate::errors::CliError;
use crate::formats::read_export;

#[derive(Args, Debug, Clone)]
pub struct UnpackCommand {
    /// Export to unpack (.json, .conf, .yml or .yaml)
    pub input: PathBuf,
    /// Source directory to write; existing contents are replaced
    pub srcdir: PathBuf,
}

pub fn handle_unpack(cmd: UnpackCommand, config: &Config) -> Result<(), CliError> {
    let table = FilterTable::standard();

    logger::step(&format!("Reading {}", cmd.input.display()));
    let export = read_export(&cmd.input, table)?;
    logger::info(&format!(
        "Read {} slots and {} handlers",
        export.slots.len(),
        export.handlers.len()
    ));

    let options = WriteOptions {
        crlf: config.line_endings() == LineEnding::Crlf,
    };
    let summary = dubby_srcdir::write(&export, &cmd.srcdir, table, options)?;

    logger::success(&format!(
        "Unpacked {} handlers into {} ({} slot files, {} lib files)",
        export.handlers.len(),
        cmd.srcdir.display(),
        summary.slot_files,
        summary.lib_files
    ));
    Ok(())
}
