//! Call / signature text codec
//!
//! A *signature* names an event with its parameters (`tick(timerId)`); a
//! *call* binds values to it (`tick([Live])`). Argument lists follow YAML flow
//! scalar rules: values are plain unless they need quoting, in which case they
//! are single-quoted with `'` doubled.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ExportError;
use crate::filters::FilterTable;
use crate::patterns::builtin;
use crate::types::Arg;

static CALL_RE: Lazy<Regex> =
    Lazy::new(|| builtin(r"^\s*(?P<name>[A-Za-z0-9_-]+)\((?P<inner>.*)\)\s*$"));

static IDENT_RE: Lazy<Regex> = Lazy::new(|| builtin(r"^[A-Za-z0-9_-]+$"));

/// A parsed `name(args)` text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub name: String,
    pub args: Vec<String>,
}

/// Whether `text` is a bare event name such as `tick`
pub fn is_event_name(text: &str) -> bool {
    IDENT_RE.is_match(text)
}

/// Parse `name([a, b])` or `name(a, b)` into its name and argument values
pub fn parse_call(text: &str) -> Result<ParsedCall, ExportError> {
    let caps = CALL_RE
        .captures(text)
        .ok_or_else(|| ExportError::MalformedCall(text.to_string()))?;

    let name = caps["name"].to_string();
    let mut inner = caps["inner"].trim();
    match (inner.starts_with('['), inner.ends_with(']')) {
        (true, true) if inner.len() >= 2 => inner = inner[1..inner.len() - 1].trim(),
        (false, false) => {}
        _ => return Err(ExportError::MalformedCall(text.to_string())),
    }

    let args = split_flow_list(inner).ok_or_else(|| ExportError::MalformedCall(text.to_string()))?;
    Ok(ParsedCall { name, args })
}

/// Render a call; zero args give `name()`, otherwise `name([v1, v2])`
pub fn render_call<S: AsRef<str>>(name: &str, args: &[S]) -> String {
    if args.is_empty() {
        return format!("{}()", name);
    }
    format!("{}({})", name, render_flow_list(args))
}

/// Render values as a YAML flow sequence: `[a, 'b, c']`
pub fn render_flow_list<S: AsRef<str>>(values: &[S]) -> String {
    let rendered: Vec<String> = values
        .iter()
        .map(|value| render_flow_scalar(value.as_ref()))
        .collect();
    format!("[{}]", rendered.join(", "))
}

/// Render one flow scalar, quoting it when a plain scalar would be ambiguous
pub fn render_flow_scalar(value: &str) -> String {
    if needs_quoting(value) {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

/// Whether a value must be quoted to survive inside a flow list
pub fn needs_quoting(value: &str) -> bool {
    if value.is_empty() || value.trim() != value {
        return true;
    }
    if value
        .chars()
        .any(|c| matches!(c, ',' | '[' | ']' | '{' | '}' | '\'' | '"' | '#'))
    {
        return true;
    }
    if value.contains(": ") || value.ends_with(':') {
        return true;
    }
    value.starts_with(['-', '?', ':', '&', '*', '!', '|', '>', '%', '@', '`'])
}

/// Parameter names of a signature: `tick(timerId)` gives `["timerId"]`
pub fn signature_params(signature: &str) -> Result<Vec<String>, ExportError> {
    Ok(parse_call(signature)?.args)
}

/// Resolve a call text against the table into `(signature, args)`
///
/// The event name must be known and the number of arguments must match the
/// parameters of its signature.
pub fn parse_filter_call(
    table: &FilterTable,
    text: &str,
) -> Result<(String, Vec<Arg>), ExportError> {
    let call = parse_call(text)?;
    let signature = table.signature_for_name(&call.name)?;
    check_arity(signature, call.args.len())?;
    Ok((
        signature.to_string(),
        call.args.into_iter().map(Arg::new).collect(),
    ))
}

/// Render the call for a filter's signature and args, checking both
pub fn render_filter_call(
    table: &FilterTable,
    signature: &str,
    args: &[Arg],
) -> Result<String, ExportError> {
    let name = table.name_for_signature(signature)?;
    check_arity(signature, args.len())?;
    for arg in args {
        ensure_single_line(&arg.value)?;
    }
    let values: Vec<&str> = args.iter().map(|arg| arg.value.as_str()).collect();
    Ok(render_call(name, &values))
}

/// Arg values are always written on a single line
pub(crate) fn ensure_single_line(value: &str) -> Result<(), ExportError> {
    if value.contains(['\n', '\r']) {
        return Err(ExportError::UnsupportedArgValue(value.to_string()));
    }
    Ok(())
}

pub(crate) fn check_arity(signature: &str, found: usize) -> Result<(), ExportError> {
    let expected = signature_params(signature)?.len();
    if expected != found {
        return Err(ExportError::ArityMismatch {
            signature: signature.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Split a comma separated flow list; `None` on unbalanced quotes or junk
/// after a quoted value
fn split_flow_list(text: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    if text.trim().is_empty() {
        return Some(values);
    }

    let mut chars = text.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let value = match chars.peek() {
            Some('\'') => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next()? {
                        '\'' if chars.next_if_eq(&'\'').is_some() => value.push('\''),
                        '\'' => break,
                        c => value.push(c),
                    }
                }
                value
            }
            Some('"') => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next()? {
                        '\\' => value.push(chars.next()?),
                        '"' => break,
                        c => value.push(c),
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(c) = chars.next_if(|c| *c != ',') {
                    value.push(c);
                }
                value.trim().to_string()
            }
        };
        values.push(value);

        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        match chars.next() {
            None => return Some(values),
            Some(',') => continue,
            Some(_) => return None,
        }
    }
}
