//! Marker scanner for slot files
//!
//! A slot file is plain Lua where handler bodies are fenced by marker
//! comments:
//!
//! ```lua
//! print("runs on start")
//!
//! do -- !DU: tick([Live])
//!     refresh()
//! end -- !DU: end
//! ```
//!
//! Lines outside any fence form the file's main body. The scanner is a two
//! state machine over the lines; every transition that does not fit is an
//! error rather than a silent skip.

use dubby_export::indenting::trim_consistent_indenting;
use dubby_export::patterns::builtin;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::SrcDirError;

/// Marker line that tags a stored main body
pub const MAIN_MARKER: &str = "-- !DU: main";

static START_RE: Lazy<Regex> =
    Lazy::new(|| builtin(r"^(?:do)? *-- ?!DU: *(?P<call>[A-Za-z0-9_-]+\(.*\)) *$"));
static END_RE: Lazy<Regex> = Lazy::new(|| builtin(r"^(?:end)? *-- ?!DU: end *$"));
static ANY_MARKER_RE: Lazy<Regex> = Lazy::new(|| builtin(r"-- ?!DU:"));

/// What a single line of a slot file is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `do -- !DU: <call>`
    Start(&'a str),
    /// `end -- !DU: end`
    End,
    /// Mentions the marker but is neither a start nor an end
    Malformed,
    Code,
}

pub fn classify(line: &str) -> LineKind<'_> {
    if let Some(caps) = START_RE.captures(line) {
        if let Some(call) = caps.name("call") {
            return LineKind::Start(call.as_str());
        }
    }
    if END_RE.is_match(line) {
        return LineKind::End;
    }
    if ANY_MARKER_RE.is_match(line) {
        return LineKind::Malformed;
    }
    LineKind::Code
}

/// A fenced handler: its call text and de-indented body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedHandler {
    pub call: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFile {
    pub main: Vec<String>,
    pub handlers: Vec<ScannedHandler>,
}

enum State {
    Outside,
    Inside {
        call: String,
        opened_at: usize,
        body: Vec<String>,
    },
}

/// Split slot file content into its main body and fenced handlers
///
/// `file` is only used in error messages; line numbers are 1-based.
pub fn scan(file: &str, content: &str) -> Result<ScannedFile, SrcDirError> {
    let mut scanned = ScannedFile::default();
    let mut state = State::Outside;

    for (idx, line) in content.split('\n').enumerate() {
        let line_no = idx + 1;
        state = match (state, classify(line)) {
            (State::Outside, LineKind::Start(call)) => State::Inside {
                call: call.to_string(),
                opened_at: line_no,
                body: Vec::new(),
            },
            (State::Outside, LineKind::Code) => {
                scanned.main.push(line.to_string());
                State::Outside
            }
            (State::Inside { call, mut body, .. }, LineKind::End) => {
                trim_consistent_indenting(&mut body);
                scanned.handlers.push(ScannedHandler { call, body });
                State::Outside
            }
            (
                State::Inside {
                    call,
                    opened_at,
                    mut body,
                },
                LineKind::Code,
            ) => {
                body.push(line.to_string());
                State::Inside {
                    call,
                    opened_at,
                    body,
                }
            }
            (State::Outside, LineKind::End) | (State::Inside { .. }, LineKind::Start(_)) => {
                return Err(SrcDirError::MarkerMismatch {
                    file: file.to_string(),
                    line: line_no,
                    text: line.to_string(),
                });
            }
            (_, LineKind::Malformed) => {
                return Err(SrcDirError::MalformedMarker {
                    file: file.to_string(),
                    line: line_no,
                    text: line.to_string(),
                });
            }
        };
    }

    if let State::Inside { opened_at, .. } = state {
        return Err(SrcDirError::UnclosedHandler {
            file: file.to_string(),
            line: opened_at,
        });
    }
    Ok(scanned)
}
