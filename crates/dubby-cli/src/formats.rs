//! File formats an export can be read from or written to

use dubby_export::{autoconf, json, FilterTable, ScriptExport};
use std::fs;
use std::path::Path;

use crate::errors::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Autoconf,
}

impl Format {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match ext.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("conf" | "yml" | "yaml") => Ok(Format::Autoconf),
            _ => Err(CliError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Read and decode an export file
pub fn read_export(path: &Path, table: &FilterTable) -> Result<ScriptExport, CliError> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let export = match format {
        Format::Json => json::decode(&content)?,
        Format::Autoconf => autoconf::decode(&content, table)?,
    };
    Ok(export)
}

/// Encode an export and write it to `path`
pub fn write_export(
    export: &ScriptExport,
    path: &Path,
    table: &FilterTable,
    pretty: bool,
) -> Result<(), CliError> {
    let content = match Format::from_path(path)? {
        Format::Json if pretty => json::encode_pretty(export)?,
        Format::Json => json::encode(export)?,
        Format::Autoconf => autoconf::encode(export, table)?,
    };
    fs::write(path, content).map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use crate::formats::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert!(Format::from_path(Path::new("unit.json")).is_ok_and(|f| f == Format::Json));
        assert!(Format::from_path(Path::new("unit.CONF")).is_ok_and(|f| f == Format::Autoconf));
        assert!(Format::from_path(Path::new("unit.yml")).is_ok_and(|f| f == Format::Autoconf));
        assert!(matches!(
            Format::from_path(Path::new("unit.lua")),
            Err(CliError::UnsupportedFormat(p)) if p == PathBuf::from("unit.lua")
        ));
        assert!(Format::from_path(Path::new("unit")).is_err());
    }
}
