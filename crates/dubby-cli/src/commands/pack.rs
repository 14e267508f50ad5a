use clap::Args;
use dubby_config::Config;
use dubby_export::FilterTable;
use dubby_logger as logger;
use dubby_luamin::{Luamin, MinifyError};
use dubby_srcdir::{Report, SrcReader};
use std::path::PathBuf;

use crate::errors::CliError;
use crate::formats::write_export;

#[derive(Args, Debug, Clone)]
pub struct PackCommand {
    /// Source directory to read
    pub srcdir: PathBuf,
    /// Export to write (.json, .conf, .yml or .yaml)
    pub output: PathBuf,
    /// Run every handler through luamin
    #[arg(long)]
    pub minify: bool,
    /// Skip minifying even when the config enables it
    #[arg(long, conflicts_with = "minify")]
    pub no_minify: bool,
    /// Indent JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl PackCommand {
    fn should_minify(&self, config: &Config) -> bool {
        self.minify || (!self.no_minify && config.minify_by_default())
    }
}

pub fn handle_pack(cmd: PackCommand, config: &Config) -> Result<(), CliError> {
    let table = FilterTable::standard();
    let minify = cmd.should_minify(config);

    let (export, report) = if minify {
        let program = config
            .resolve_luamin_path()
            .ok_or_else(|| MinifyError::Unavailable {
                program: "luamin".to_string(),
                reason: "not found on PATH and luamin-path is not set".to_string(),
            })?;
        let luamin = Luamin::new(program);
        logger::debug(&format!(
            "Using {} {}",
            luamin.program().display(),
            luamin.version()?
        ));

        logger::spinner_start("Minifying handlers");
        match SrcReader::new(table).with_minifier(&luamin).read(&cmd.srcdir) {
            Ok(read) => {
                logger::spinner_success(&format!("Minified {} handlers", read.0.handlers.len()));
                read
            }
            Err(e) => {
                logger::spinner_error("Minifying failed");
                return Err(e.into());
            }
        }
    } else {
        SrcReader::new(table).read(&cmd.srcdir)?
    };

    write_export(&export, &cmd.output, table, cmd.pretty)?;

    if minify {
        println!("{}", savings_line(&report));
    }
    logger::success(&format!(
        "Packed {} handlers into {}",
        export.handlers.len(),
        cmd.output.display()
    ));
    Ok(())
}

fn savings_line(report: &Report) -> String {
    format!(
        "minified {} bytes of lua -> {} ({:.1}% saved)",
        report.src_len,
        report.minified_len,
        report.saved_percent()
    )
}

#[cfg(test)]
mod tests {
    use crate::commands::pack::*;

    fn pack(minify: bool, no_minify: bool) -> PackCommand {
        PackCommand {
            srcdir: PathBuf::from("src"),
            output: PathBuf::from("out.json"),
            minify,
            no_minify,
            pretty: false,
        }
    }

    #[test]
    fn test_minify_follows_flags_then_config() {
        let enabled = Config {
            minify: Some(true),
            ..Config::default()
        };
        let default = Config::default();

        assert!(pack(true, false).should_minify(&default));
        assert!(pack(false, false).should_minify(&enabled));
        assert!(!pack(false, true).should_minify(&enabled));
        assert!(!pack(false, false).should_minify(&default));
    }

    #[test]
    fn test_savings_line() {
        let report = Report {
            src_len: 200,
            minified_len: 50,
        };
        assert_eq!(
            savings_line(&report),
            "minified 200 bytes of lua -> 50 (75.0% saved)"
        );
    }
}
