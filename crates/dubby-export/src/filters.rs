//! Declarative event table
//!
//! Maps short event names (`tick`) to their parameterized signatures
//! (`tick(timerId)`) and back. The standard table is built once and shared;
//! codecs take a `&FilterTable` so callers can supply their own.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::errors::ExportError;
use crate::signature::signature_params;

/// The events every unit understands
pub const STANDARD_FILTERS: [(&str, &str); 8] = [
    ("start", "start()"),
    ("stop", "stop()"),
    ("flush", "flush()"),
    ("update", "update()"),
    ("tick", "tick(timerId)"),
    ("actionStart", "actionStart(action)"),
    ("actionStop", "actionStop(action)"),
    ("actionLoop", "actionLoop(action)"),
];

static STANDARD: Lazy<FilterTable> = Lazy::new(|| FilterTable::new(STANDARD_FILTERS));

/// Immutable name <-> signature lookup
#[derive(Debug, Clone, Default)]
pub struct FilterTable {
    by_name: HashMap<String, String>,
    by_signature: HashMap<String, String>,
}

impl FilterTable {
    pub fn new<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = FilterTable::default();
        for (name, signature) in pairs {
            table.by_name.insert(name.to_string(), signature.to_string());
            table
                .by_signature
                .insert(signature.to_string(), name.to_string());
        }
        table
    }

    /// The shared standard table
    pub fn standard() -> &'static FilterTable {
        &STANDARD
    }

    pub fn signature_for_name(&self, name: &str) -> Result<&str, ExportError> {
        self.by_name
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ExportError::UnknownFilter(name.to_string()))
    }

    pub fn name_for_signature(&self, signature: &str) -> Result<&str, ExportError> {
        self.by_signature
            .get(signature)
            .map(String::as_str)
            .ok_or_else(|| ExportError::UnknownFilter(signature.to_string()))
    }

    /// Parameter names of a signature known to this table
    pub fn params(&self, signature: &str) -> Result<Vec<String>, ExportError> {
        self.name_for_signature(signature)?;
        signature_params(signature)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
