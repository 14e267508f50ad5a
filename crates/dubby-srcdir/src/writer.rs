//! Script export -> source directory

use dubby_export::indenting::indent_lines;
use dubby_export::patterns::builtin;
use dubby_export::signature::render_filter_call;
use dubby_export::{autoconf, FilterTable, ScriptExport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::SrcDirError;
use crate::scanner::{classify, LineKind, MAIN_MARKER};
use crate::{AUTOCONF_FILE, LIB_DIR, LIB_HEADER_PREFIX, SLOTS_DIR};

static LIB_HEADER_RE: Lazy<Regex> = Lazy::new(|| builtin(r"-- !DU\[lib]: (.*?)\n\n?"));

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Terminate lines with `\r\n` instead of `\n`
    pub crlf: bool,
}

/// What ended up on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub slot_files: usize,
    pub lib_files: usize,
    pub autoconf: bool,
}

#[derive(Default)]
struct SlotSrc {
    main: Vec<String>,
    blocks: Vec<(String, Vec<String>)>,
}

impl SlotSrc {
    fn is_empty(&self) -> bool {
        self.main.is_empty() && self.blocks.is_empty()
    }

    /// Main lines, a blank line, then every fenced block followed by a blank
    fn render(&self) -> String {
        let mut out = self.main.clone();
        out.push(String::new());
        for (call, lines) in &self.blocks {
            out.push(format!("do -- !DU: {}", call));
            out.extend(indent_lines(lines, INDENT));
            out.push("end -- !DU: end".to_string());
            out.push(String::new());
        }
        out.join("\n")
    }

    /// Line numbers follow the layout `render` produces
    fn check(&self, file: &str) -> Result<(), SrcDirError> {
        check_body(file, 1, &self.main)?;
        // first `do` line sits after the main body and its blank separator
        let mut do_line = self.main.len() + 2;
        for (_, lines) in &self.blocks {
            check_body(file, do_line + 1, lines)?;
            do_line += lines.len() + 3;
        }
        Ok(())
    }
}

/// Write `export` into `dir`, replacing whatever was there
///
/// Bodies are checked before anything on disk changes. After that the
/// destination is cleared up front, so a failure part way leaves an
/// incomplete tree behind rather than a stale one.
pub fn write(
    export: &ScriptExport,
    dir: &Path,
    table: &FilterTable,
    options: WriteOptions,
) -> Result<WriteSummary, SrcDirError> {
    export.validate()?;

    let mut libs: Vec<&str> = Vec::new();
    let mut slots: BTreeMap<i32, SlotSrc> = BTreeMap::new();
    for handler in &export.handlers {
        if handler.code.starts_with(LIB_HEADER_PREFIX) {
            libs.push(&handler.code);
            continue;
        }

        let call = render_filter_call(table, &handler.filter.signature, &handler.filter.args)?;
        let mut lines: Vec<String> = handler.code.split('\n').map(String::from).collect();
        let slot = slots.entry(handler.filter.slot_key).or_default();

        if call == "start()" && lines.first().is_some_and(|line| line == MAIN_MARKER) {
            lines.remove(0);
            if lines.first().is_some_and(String::is_empty) {
                lines.remove(0);
            }
            slot.main.extend(lines);
        } else {
            slot.blocks.push((call, lines));
        }
    }

    let mut files = Vec::with_capacity(slots.len());
    for (slot_key, src) in &slots {
        if src.is_empty() {
            continue;
        }
        let Some(slot) = export.slots.get(slot_key) else {
            continue;
        };
        let file_name = format!("{}.{}.lua", slot_key, slot.name);
        src.check(&file_name)?;
        files.push((file_name, src.render()));
    }

    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir.join(SLOTS_DIR))?;
    fs::create_dir_all(dir.join(LIB_DIR))?;

    let mut summary = WriteSummary::default();

    if export.autoconf_name().is_some() {
        fs::write(
            dir.join(AUTOCONF_FILE),
            autoconf::project_declarations(export)?,
        )?;
        summary.autoconf = true;
    }

    for code in libs {
        summary.lib_files += write_libs(code, &dir.join(LIB_DIR), options)?;
    }

    for (file_name, content) in files {
        let path = dir.join(SLOTS_DIR).join(file_name);
        fs::write(&path, with_line_endings(&content, options))?;
        debug!("Wrote {}", path.display());
        summary.slot_files += 1;
    }

    info!(
        "Wrote {} slot files and {} lib files to {}",
        summary.slot_files,
        summary.lib_files,
        dir.display()
    );
    Ok(summary)
}

/// Fail on any body line the scanner would take for a marker
///
/// `first_line` is the 1-based line the body starts at in the slot file.
fn check_body(file: &str, first_line: usize, lines: &[String]) -> Result<(), SrcDirError> {
    for (offset, line) in lines.iter().enumerate() {
        if classify(line) != LineKind::Code {
            return Err(SrcDirError::MalformedMarker {
                file: file.to_string(),
                line: first_line + offset,
                text: line.clone(),
            });
        }
    }
    Ok(())
}

/// Split an aggregated library body back into `lib/<name>.lua` files
fn write_libs(code: &str, lib_dir: &Path, options: WriteOptions) -> Result<usize, SrcDirError> {
    let names: Vec<&str> = LIB_HEADER_RE
        .captures_iter(code)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    let bodies: Vec<&str> = LIB_HEADER_RE.split(code).skip(1).collect();

    if names.is_empty() || names.len() != bodies.len() {
        return Err(SrcDirError::LibHeaderMismatch {
            libs: bodies.len(),
            headers: names.len(),
        });
    }

    for (name, body) in names.iter().zip(&bodies) {
        let content = format!("{}\n", body.trim_end_matches('\n'));
        fs::write(
            lib_dir.join(format!("{}.lua", name)),
            with_line_endings(&content, options),
        )?;
    }
    Ok(names.len())
}

fn with_line_endings(content: &str, options: WriteOptions) -> String {
    if options.crlf {
        content.replace("\r\n", "\n").replace('\n', "\r\n")
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::reader::read;
    use crate::writer::*;
    use dubby_export::{
        Arg, Filter, Handler, Slot, SlotAutoConf, SLOT_IDX_LIBRARY, SLOT_IDX_SYSTEM,
        SLOT_IDX_UNIT,
    };
    use tempfile::TempDir;

    fn handler(code: &str, signature: &str, args: &[&str], slot_key: i32) -> Handler {
        Handler {
            code: code.to_string(),
            filter: Filter {
                args: args.iter().map(|a| Arg::new(*a)).collect(),
                signature: signature.to_string(),
                slot_key,
            },
            key: 0,
        }
    }

    fn sample_export() -> ScriptExport {
        let mut export = ScriptExport::new();
        export.slots.insert(
            1,
            Slot::with_auto_conf("screen", SlotAutoConf::new("ScreenUnit")),
        );
        export.auto_conf_name = Some("turret".to_string());
        export.handlers = vec![
            handler(
                "-- !DU[lib]: helpers\n\nfunction helper()\n  return 1\nend\n\n-- !DU[lib]: json\n\njson = {}\n",
                "start()",
                &[],
                SLOT_IDX_LIBRARY,
            ),
            handler("-- !DU: main\n\nlocal x = 1", "start()", &[], SLOT_IDX_UNIT),
            handler("if x then\n\trefresh()\nend\n", "tick(timerId)", &["Live"], SLOT_IDX_UNIT),
            handler("", "tick(timerId)", &["a,b"], SLOT_IDX_UNIT),
            handler("brake()", "actionStart(action)", &["it's"], SLOT_IDX_SYSTEM),
            handler("screen.clear()", "stop()", &[], 1),
        ];
        export.renumber_handlers();
        export
    }

    fn read_file(path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    #[test]
    fn test_bare_main_body_round_trips_byte_for_byte() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let src = temp_dir.path().join("src");
        let slot_file = src.join(SLOTS_DIR).join("-1.unit.lua");
        assert!(fs::create_dir_all(src.join(SLOTS_DIR)).is_ok());
        assert!(fs::write(&slot_file, "print(\"hi\")\n").is_ok());

        let table = FilterTable::standard();
        let Ok(export) = read(&src, table) else {
            panic!("read failed");
        };
        assert!(write(&export, &src, table, WriteOptions::default()).is_ok());
        assert_eq!(read_file(&slot_file), "print(\"hi\")\n");
    }

    #[test]
    fn test_layout() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let out = temp_dir.path().join("out");
        let table = FilterTable::standard();
        let result = write(&sample_export(), &out, table, WriteOptions::default());
        assert_eq!(
            result.ok(),
            Some(WriteSummary {
                slot_files: 3,
                lib_files: 2,
                autoconf: true,
            })
        );

        assert_eq!(
            read_file(&out.join("slots").join("-1.unit.lua")),
            "local x = 1\n\ndo -- !DU: tick([Live])\n    if x then\n    \trefresh()\n    end\n\nend -- !DU: end\n\ndo -- !DU: tick(['a,b'])\n\nend -- !DU: end\n"
        );
        assert_eq!(
            read_file(&out.join("slots").join("-2.system.lua")),
            "\ndo -- !DU: actionStart(['it''s'])\n    brake()\nend -- !DU: end\n"
        );
        assert_eq!(
            read_file(&out.join("lib").join("helpers.lua")),
            "function helper()\n  return 1\nend\n"
        );
        assert_eq!(read_file(&out.join("lib").join("json.lua")), "json = {}\n");
        assert!(read_file(&out.join("autoconf.yml")).contains("class: ScreenUnit"));
        assert!(!out.join("slots").join("-3.library.lua").exists());
    }

    #[test]
    fn test_write_then_read_keeps_handlers() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let out = temp_dir.path().join("out");
        let table = FilterTable::standard();
        let export = sample_export();
        assert!(write(&export, &out, table, WriteOptions::default()).is_ok());

        let Ok(again) = read(&out, table) else {
            panic!("read failed");
        };
        assert_eq!(again.autoconf_name(), Some("turret"));
        assert_eq!(again.handlers.len(), export.handlers.len());
        for (before, after) in export.handlers.iter().zip(&again.handlers) {
            assert_eq!(before.filter, after.filter);
            if before.code.starts_with(MAIN_MARKER) {
                // the blank line after the main marker is not stored
                assert_eq!(after.code, "-- !DU: main\nlocal x = 1");
            } else {
                assert_eq!(before.code, after.code);
            }
        }

        // a second cycle is byte-stable
        let first = read_file(&out.join("slots").join("-1.unit.lua"));
        assert!(write(&again, &out, table, WriteOptions::default()).is_ok());
        assert_eq!(read_file(&out.join("slots").join("-1.unit.lua")), first);
    }

    #[test]
    fn test_stale_files_removed_and_crlf() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let out = temp_dir.path().join("out");
        let stale = out.join("slots").join("7.gone.lua");
        assert!(fs::create_dir_all(out.join("slots")).is_ok());
        assert!(fs::write(&stale, "old").is_ok());

        let mut export = ScriptExport::new();
        export
            .handlers
            .push(handler("a()\nb()", "update()", &[], SLOT_IDX_SYSTEM));
        let options = WriteOptions { crlf: true };
        assert!(write(&export, &out, FilterTable::standard(), options).is_ok());

        assert!(!stale.exists());
        assert!(!out.join("autoconf.yml").exists());
        assert_eq!(
            read_file(&out.join("slots").join("-2.system.lua")),
            "\r\ndo -- !DU: update()\r\n    a()\r\n    b()\r\nend -- !DU: end\r\n"
        );
    }

    #[test]
    fn test_marker_text_in_body_fails_before_writing() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let out = temp_dir.path().join("out");
        let kept = out.join("slots").join("7.kept.lua");
        assert!(fs::create_dir_all(out.join("slots")).is_ok());
        assert!(fs::write(&kept, "old").is_ok());

        let mut export = ScriptExport::new();
        export.handlers = vec![
            handler("-- !DU: main\nprint(1)", "start()", &[], SLOT_IDX_UNIT),
            handler("x = '-- !DU: end'", "stop()", &[], SLOT_IDX_UNIT),
        ];
        let result = write(&export, &out, FilterTable::standard(), WriteOptions::default());
        assert!(matches!(
            result,
            Err(SrcDirError::MalformedMarker { ref file, line: 4, ref text })
                if file == "-1.unit.lua" && text == "x = '-- !DU: end'"
        ));
        assert!(kept.exists());

        export.handlers = vec![handler(
            "-- !DU: main\ndo -- !DU: stop()",
            "start()",
            &[],
            SLOT_IDX_UNIT,
        )];
        let result = write(&export, &out, FilterTable::standard(), WriteOptions::default());
        assert!(matches!(
            result,
            Err(SrcDirError::MalformedMarker { line: 1, .. })
        ));
    }

    #[test]
    fn test_shared_indentation_is_not_kept() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let out = temp_dir.path().join("out");
        let table = FilterTable::standard();
        let mut export = ScriptExport::new();
        export
            .handlers
            .push(handler("  a()\n  b()", "update()", &[], SLOT_IDX_SYSTEM));
        assert!(write(&export, &out, table, WriteOptions::default()).is_ok());

        let Ok(again) = read(&out, table) else {
            panic!("read failed");
        };
        assert_eq!(again.handlers.len(), 1);
        assert_eq!(again.handlers[0].code, "a()\nb()");
    }

    #[test]
    fn test_lib_header_without_body_separator() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let mut export = ScriptExport::new();
        export
            .handlers
            .push(handler("-- !DU[lib]: broken", "start()", &[], SLOT_IDX_LIBRARY));
        let result = write(
            &export,
            &temp_dir.path().join("out"),
            FilterTable::standard(),
            WriteOptions::default(),
        );
        assert!(matches!(
            result,
            Err(SrcDirError::LibHeaderMismatch { headers: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_signature_fails() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let mut export = ScriptExport::new();
        export
            .handlers
            .push(handler("x()", "mouseDown(x,y)", &["1", "2"], SLOT_IDX_UNIT));
        let result = write(
            &export,
            &temp_dir.path().join("out"),
            FilterTable::standard(),
            WriteOptions::default(),
        );
        assert!(matches!(result, Err(SrcDirError::Export(_))));
    }
}
