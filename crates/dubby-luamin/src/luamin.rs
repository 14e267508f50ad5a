use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use tracing::{debug, warn};

use crate::errors::MinifyError;
use crate::Minifier;

pub const LUAMIN_CMD: &str = "luamin";

static VERSION_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^v[0-9]+\.[0-9]+\.[0-9]+$"));

/// `-v` outcome per executable, shared by every `Luamin` in the process
static VERSIONS: Lazy<Mutex<HashMap<PathBuf, Result<String, String>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The `luamin` executable
///
/// Availability is checked with `luamin -v` the first time any value for the
/// same program needs it; the outcome is kept for the rest of the process.
#[derive(Debug, Clone)]
pub struct Luamin {
    program: PathBuf,
}

impl Luamin {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Luamin {
            program: program.into(),
        }
    }

    /// Locate `luamin` on PATH
    pub fn from_path() -> Result<Self, MinifyError> {
        which::which(LUAMIN_CMD)
            .map(Luamin::new)
            .map_err(|e| MinifyError::Unavailable {
                program: LUAMIN_CMD.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Version reported by `luamin -v`, e.g. `v1.0.4`
    pub fn version(&self) -> Result<String, MinifyError> {
        let version = match VERSIONS.lock() {
            Ok(mut versions) => versions
                .entry(self.program.clone())
                .or_insert_with(|| query_version(&self.program))
                .clone(),
            Err(_) => query_version(&self.program),
        };
        version.map_err(|reason| MinifyError::Unavailable {
            program: self.program.display().to_string(),
            reason,
        })
    }

    pub fn is_available(&self) -> bool {
        self.version().is_ok()
    }
}

fn query_version(program: &Path) -> Result<String, String> {
    let output = Command::new(program)
        .arg("-v")
        .output()
        .map_err(|e| e.to_string())?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.trim_end_matches(['\r', '\n']);
    let version_re = VERSION_RE.as_ref().map_err(|e| e.to_string())?;
    if version_re.is_match(version) {
        debug!("Found {} {}", program.display(), version);
        Ok(version.to_string())
    } else {
        Err(format!("unexpected version output '{}'", version))
    }
}

impl Minifier for Luamin {
    fn minify(&self, source: &str) -> Result<String, MinifyError> {
        self.version()?;

        let mut child = Command::new(&self.program)
            .arg("-c")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from a separate thread so a large script cannot deadlock
        // against a full stdout pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = source.to_owned();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let output = child.wait_with_output()?;
        if let Some(writer) = writer {
            // A failed write means luamin exited early; its output says why.
            let _ = writer.join();
        }
        dubby_logger::capture_output("luamin -c", &output);

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || !stderr.trim().is_empty() {
            let diagnostics = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).into_owned()
            } else {
                stderr.into_owned()
            };
            let dump_path = dump_source(source)?;
            warn!("luamin failed, input dumped to {}", dump_path.display());
            return Err(MinifyError::Failed {
                output: diagnostics.trim_end().to_string(),
                dump_path,
            });
        }

        String::from_utf8(output.stdout).map_err(|e| MinifyError::InvalidOutput(e.to_string()))
    }
}

/// Persist the offending input for postmortem inspection
fn dump_source(source: &str) -> Result<PathBuf, MinifyError> {
    let mut file = tempfile::Builder::new()
        .prefix("luamin")
        .suffix(".lua")
        .tempfile()?;
    file.write_all(source.as_bytes())?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use crate::luamin::*;

    #[cfg(unix)]
    fn fake_luamin(dir: &Path, version: &str) -> Option<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("luamin");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"-v\" ]; then echo {version}; exit 0; fi\ninput=$(cat)\ncase \"$input\" in\n  *blabla*) echo \"unexpected number '14' near 'blabla'\" >&2; exit 1;;\n  *) printf 'min:%s\\n' \"$input\";;\nesac\n"
        );
        std::fs::write(&path, script).ok()?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).ok()?;
        Some(path)
    }

    // One test drives every fake executable so no other test forks while a
    // script is still open for writing.
    #[cfg(unix)]
    #[test]
    fn test_fake_luamin_version_minify_and_failure() {
        let Ok(temp_dir) = tempfile::TempDir::new() else {
            return;
        };
        let Some(program) = fake_luamin(temp_dir.path(), "v1.0.4") else {
            return;
        };

        let luamin = Luamin::new(&program);
        assert!(luamin.version().is_ok_and(|v| v == "v1.0.4"));
        assert!(luamin.minify("print(1)").is_ok_and(|out| out == "min:print(1)\n"));

        let failed = luamin.minify("14.blabla");
        let Err(MinifyError::Failed { output, dump_path }) = failed else {
            panic!("expected a minify failure, got {failed:?}");
        };
        assert!(output.contains("unexpected number '14' near 'blabla'"));
        assert!(std::fs::read_to_string(&dump_path).is_ok_and(|dumped| dumped == "14.blabla"));
        let _ = std::fs::remove_file(dump_path);

        // the version outcome outlives both the value and the executable
        assert!(std::fs::remove_file(&program).is_ok());
        assert!(luamin.version().is_ok_and(|v| v == "v1.0.4"));
        assert!(Luamin::new(&program).is_available());

        let Ok(other_dir) = tempfile::TempDir::new() else {
            return;
        };
        let Some(bad_version) = fake_luamin(other_dir.path(), "luamin 1.0") else {
            return;
        };
        let luamin = Luamin::new(bad_version);
        assert!(!luamin.is_available());
        assert!(matches!(
            luamin.minify("print(1)"),
            Err(MinifyError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_missing_executable_is_unavailable() {
        let luamin = Luamin::new("/nonexistent/dubby/luamin");
        assert!(matches!(
            luamin.version(),
            Err(MinifyError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_real_luamin_when_installed() {
        let Ok(luamin) = Luamin::from_path() else {
            return;
        };
        if !luamin.is_available() {
            return;
        }
        let out = luamin.minify("function hiThere()\n--comment\nprint()end");
        assert!(out.is_ok_and(|min| min == "function hiThere()print()end\n"));
    }
}
