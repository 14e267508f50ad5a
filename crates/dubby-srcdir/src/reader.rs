//! Source directory -> script export

use dubby_export::signature::parse_filter_call;
use dubby_export::{
    autoconf, Filter, FilterTable, Handler, ScriptExport, Slot, SLOT_IDX_LIBRARY,
};
use dubby_luamin::Minifier;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::SrcDirError;
use crate::scanner::{scan, MAIN_MARKER};
use crate::{AUTOCONF_FILE, LIB_DIR, LIB_HEADER_PREFIX, SLOTS_DIR};

/// Byte counts of the Lua read, before and after minifying
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub src_len: usize,
    pub minified_len: usize,
}

impl Report {
    /// Share of the source removed by minifying, in percent
    pub fn saved_percent(&self) -> f64 {
        if self.src_len == 0 {
            return 0.0;
        }
        (self.src_len as f64 - self.minified_len as f64) / self.src_len as f64 * 100.0
    }
}

pub struct SrcReader<'a> {
    table: &'a FilterTable,
    minifier: Option<&'a dyn Minifier>,
    export: ScriptExport,
    report: Report,
}

impl<'a> SrcReader<'a> {
    pub fn new(table: &'a FilterTable) -> Self {
        SrcReader {
            table,
            minifier: None,
            export: ScriptExport::new(),
            report: Report::default(),
        }
    }

    /// Run every handler body through `minifier` as it is read
    pub fn with_minifier(mut self, minifier: &'a dyn Minifier) -> Self {
        self.minifier = Some(minifier);
        self
    }

    /// Read `dir` and return the export with its minify report
    pub fn read(mut self, dir: &Path) -> Result<(ScriptExport, Report), SrcDirError> {
        let slots_dir = dir.join(SLOTS_DIR);
        if !slots_dir.is_dir() {
            return Err(SrcDirError::NotADirectory(slots_dir));
        }
        for path in list_files(&slots_dir)? {
            self.read_slot_file(&path)?;
        }

        let lib_dir = dir.join(LIB_DIR);
        if lib_dir.exists() {
            if !lib_dir.is_dir() {
                return Err(SrcDirError::NotADirectory(lib_dir));
            }
            self.read_lib_dir(&lib_dir)?;
        }

        let autoconf_path = dir.join(AUTOCONF_FILE);
        if autoconf_path.is_file() {
            self.read_autoconf(&autoconf_path)?;
        }

        info!(
            "Read {} handlers across {} slots from {}",
            self.export.handlers.len(),
            self.export.slots.len(),
            dir.display()
        );
        Ok((self.export, self.report))
    }

    fn read_slot_file(&mut self, path: &Path) -> Result<(), SrcDirError> {
        let file_name = file_name(path);
        let (slot_key, slot_name) = parse_slot_file_name(&file_name)?;
        self.export
            .slots
            .entry(slot_key)
            .or_insert_with(|| Slot::new(slot_name));

        let content = read_normalized(path)?;
        let scanned = scan(&file_name, &content)?;

        let mut handlers = Vec::with_capacity(scanned.handlers.len() + 1);

        let mut main = scanned.main;
        while main.last().is_some_and(String::is_empty) {
            main.pop();
        }
        if !main.is_empty() {
            main.insert(0, MAIN_MARKER.to_string());
            let code = self.process_code(main.join("\n"))?;
            handlers.push((code, "start()".to_string(), Vec::new()));
        }

        for handler in scanned.handlers {
            let (signature, args) = parse_filter_call(self.table, &handler.call)?;
            let code = self.process_code(handler.body.join("\n"))?;
            handlers.push((code, signature, args));
        }

        debug!("{}: {} handlers", file_name, handlers.len());
        for (code, signature, args) in handlers {
            let key = self.export.handlers.len() as u32 + 1;
            self.export.handlers.push(Handler {
                code,
                filter: Filter {
                    args,
                    signature,
                    slot_key,
                },
                key,
            });
        }
        Ok(())
    }

    fn read_lib_dir(&mut self, lib_dir: &Path) -> Result<(), SrcDirError> {
        let mut pieces = Vec::new();
        for path in list_files(lib_dir)? {
            let name = file_name(&path);
            let name = name.strip_suffix(".lua").unwrap_or(&name);
            let content = read_normalized(&path)?;
            pieces.push(format!("{}{}\n\n{}", LIB_HEADER_PREFIX, name, content));
        }
        if pieces.is_empty() {
            return Ok(());
        }

        for handler in &mut self.export.handlers {
            handler.key += 1;
        }
        let code = self.process_code(pieces.join("\n"))?;
        self.export.handlers.insert(
            0,
            Handler {
                code,
                filter: Filter {
                    args: Vec::new(),
                    signature: "start()".to_string(),
                    slot_key: SLOT_IDX_LIBRARY,
                },
                key: 1,
            },
        );
        debug!("Aggregated {} lib files", pieces.len());
        Ok(())
    }

    fn read_autoconf(&mut self, path: &Path) -> Result<(), SrcDirError> {
        let content = fs::read_to_string(path)?;
        let declarations = autoconf::decode_declarations(&content)?;

        self.export.auto_conf_name = declarations.name;
        for (name, auto_conf) in declarations.slots {
            match self.export.slot_key_by_name(&name) {
                Some(key) => {
                    if let Some(slot) = self.export.slots.get_mut(&key) {
                        slot.auto_conf = Some(auto_conf);
                    }
                }
                None => {
                    let key = self.export.next_slot_key();
                    self.export
                        .slots
                        .insert(key, Slot::with_auto_conf(name, auto_conf));
                }
            }
        }
        Ok(())
    }

    fn process_code(&mut self, code: String) -> Result<String, SrcDirError> {
        self.report.src_len += code.len();
        let Some(minifier) = self.minifier else {
            return Ok(code);
        };
        let minified = minifier.minify(&code)?;
        self.report.minified_len += minified.len();
        Ok(minified)
    }
}

/// Read a source directory without minifying
pub fn read(dir: &Path, table: &FilterTable) -> Result<ScriptExport, SrcDirError> {
    Ok(SrcReader::new(table).read(dir)?.0)
}

/// `-1.unit.lua` -> `(-1, "unit")`
fn parse_slot_file_name(file_name: &str) -> Result<(i32, &str), SrcDirError> {
    let invalid = || SrcDirError::InvalidSlotFile(file_name.to_string());
    let stem = file_name.strip_suffix(".lua").ok_or_else(invalid)?;
    let (key, name) = stem.split_once('.').ok_or_else(invalid)?;
    if name.is_empty() {
        return Err(invalid());
    }
    let key = key.parse().map_err(|_| invalid())?;
    Ok((key, name))
}

/// Files directly inside `dir`, sorted by name
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, SrcDirError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            return Err(SrcDirError::NotAFile(entry.into_path()));
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn read_normalized(path: &Path) -> Result<String, SrcDirError> {
    Ok(fs::read_to_string(path)?.replace("\r\n", "\n"))
}
