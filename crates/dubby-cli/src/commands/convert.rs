use clap::Args;
use dubby_export::FilterTable;
use dubby_logger as logger;
use std::path::PathBuf;

use crate::errors::CliError;
use crate::formats::{read_export, write_export};

#[derive(Args, Debug, Clone)]
pub struct ConvertCommand {
    /// Export to read (.json, .conf, .yml or .yaml)
    pub input: PathBuf,
    /// Export to write; the format follows the extension
    pub output: PathBuf,
    /// Indent JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub fn handle_convert(cmd: ConvertCommand) -> Result<(), CliError> {
    let table = FilterTable::standard();
    let export = read_export(&cmd.input, table)?;
    write_export(&export, &cmd.output, table, cmd.pretty)?;

    logger::success(&format!(
        "Converted {} -> {}",
        cmd.input.display(),
        cmd.output.display()
    ));
    Ok(())
}
