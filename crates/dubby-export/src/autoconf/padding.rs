//! Placeholder transform wrapped around the YAML writer
//!
//! Autoconf allows a slot to bind the same event twice, which a YAML mapping
//! cannot express, and wants `args` as flow lists, which the YAML writer never
//! emits. Before serializing, every event key gets a per-handler suffix and
//! every args list is replaced by a placeholder scalar; after serializing, a
//! single regex pass restores both. The tokens must never occur in real data.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::errors::ExportError;
use crate::patterns::builtin;

/// Marker shared by every placeholder
pub(crate) const TOKEN: &str = "DUPAD__";

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    builtin(r"DUPAD__(?:KEY__(?P<key>[A-Za-z0-9_-]+?)__(?P<n>[0-9]+)|ARGS__(?P<args>[0-9]+))__DUPAD")
});

/// Event key made unique by the handler's position
pub(crate) fn pad_key(event: &str, index: usize) -> String {
    format!("{TOKEN}KEY__{event}__{index}__DUPAD")
}

/// Scalar standing in for the flow-list args of handler `index`
pub(crate) fn args_placeholder(index: usize) -> String {
    format!("{TOKEN}ARGS__{index}__DUPAD")
}

/// Fail if `text` already contains the placeholder marker
pub(crate) fn ensure_absent(text: &str) -> Result<(), ExportError> {
    if text.contains(TOKEN) {
        return Err(ExportError::ReservedToken(TOKEN.to_string()));
    }
    Ok(())
}

/// Replace every placeholder: keys lose their suffix, args placeholders become
/// the flow list rendered for that handler
pub(crate) fn strip(serialized: &str, flow_args: &[Option<String>]) -> String {
    PLACEHOLDER_RE
        .replace_all(serialized, |caps: &Captures<'_>| {
            if let Some(key) = caps.name("key") {
                return key.as_str().to_string();
            }
            caps.name("args")
                .and_then(|idx| idx.as_str().parse::<usize>().ok())
                .and_then(|idx| flow_args.get(idx).cloned().flatten())
                .unwrap_or_else(|| "[]".to_string())
        })
        .into_owned()
}
