//! Autoconf codec
//!
//! Autoconf is the YAML-like format units use to declare linked slots and the
//! handlers bound to them:
//!
//! ```yaml
//! name: turret
//! slots:
//!   screen:
//!     class: ScreenUnit
//! handlers:
//!   unit:
//!     tick:
//!       args: [Live]
//!       lua: screen.setHTML(html)
//! ```
//!
//! It is not quite YAML: one slot may bind the same event key more than once.
//! Decoding reads sections through a duplicate-tolerant visitor; encoding
//! pads keys before serializing and strips the padding afterwards.

mod ordered;
mod padding;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::ExportError;
use crate::filters::FilterTable;
use crate::signature::{
    check_arity, ensure_single_line, is_event_name, parse_call, render_flow_list,
};
use crate::types::{args_from, reserved_slot_key, Filter, Handler, ScriptExport, Slot, SlotAutoConf};
use ordered::OrderedEntries;

#[derive(Debug, Deserialize)]
struct AutoConfDoc {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slots: Option<OrderedEntries<SlotDecl>>,
    #[serde(default)]
    handlers: Option<OrderedEntries<Option<OrderedEntries<FilterEntry>>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SlotDecl {
    class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    select: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilterEntry {
    #[serde(default)]
    args: Option<Vec<String>>,
    #[serde(default)]
    lua: String,
}

#[derive(Debug, Serialize)]
struct AutoConfOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    slots: OrderedEntries<SlotDecl>,
    handlers: OrderedEntries<OrderedEntries<FilterOut<'a>>>,
}

#[derive(Debug, Serialize)]
struct DeclarationsOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    slots: OrderedEntries<SlotDecl>,
}

#[derive(Debug, Serialize)]
struct FilterOut<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<String>,
    lua: &'a str,
}

/// Slot declarations of an autoconf document, without its handlers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Declarations {
    pub name: Option<String>,
    pub slots: Vec<(String, SlotAutoConf)>,
}

/// Decode an autoconf document into a script export
///
/// Declared slots get keys 1, 2, ... in declaration order; `unit`, `system`
/// and `library` map onto the reserved slots. A handler section naming a slot
/// that was never declared creates that slot with the next free key.
/// Handlers are keyed in the order they appear across the whole document.
pub fn decode(input: &str, table: &FilterTable) -> Result<ScriptExport, ExportError> {
    padding::ensure_absent(input)?;
    let doc: AutoConfDoc = serde_yaml::from_str(input)?;

    let mut export = ScriptExport::new();
    export.auto_conf_name = doc.name;
    for (name, decl) in doc.slots.unwrap_or_default() {
        let key = export.next_slot_key();
        export.slots.insert(key, Slot::with_auto_conf(name, decl.into()));
    }

    for (slot_name, events) in doc.handlers.unwrap_or_default() {
        let slot_key = match reserved_slot_key(&slot_name)
            .or_else(|| export.slot_key_by_name(&slot_name))
        {
            Some(key) => key,
            None => {
                let key = export.next_slot_key();
                debug!("Slot '{}' has handlers but no declaration", slot_name);
                export.slots.insert(key, Slot::new(slot_name));
                key
            }
        };

        for (event_key, entry) in events.unwrap_or_default() {
            let (signature, call_args) = resolve_event(table, &event_key)?;
            let args = entry.args.or(call_args).unwrap_or_default();
            check_arity(&signature, args.len())?;

            let key = export.handlers.len() as u32 + 1;
            export.handlers.push(Handler {
                code: entry.lua,
                filter: Filter {
                    args: args_from(args),
                    signature,
                    slot_key,
                },
                key,
            });
        }
    }

    debug!(
        "Decoded autoconf with {} slots and {} handlers",
        export.slots.len(),
        export.handlers.len()
    );
    Ok(export)
}

/// Encode a script export as autoconf
///
/// Declared slots are listed alphabetically; handler sections follow slot key
/// order and slots without handlers are left out. Argument values containing
/// a comma or a line break are rejected.
pub fn encode(export: &ScriptExport, table: &FilterTable) -> Result<String, ExportError> {
    export.validate()?;
    ensure_no_reserved_text(export)?;

    let mut by_slot: BTreeMap<i32, OrderedEntries<FilterOut<'_>>> = BTreeMap::new();
    let mut flow_args = Vec::with_capacity(export.handlers.len());

    for (index, handler) in export.handlers.iter().enumerate() {
        let event = table.name_for_signature(&handler.filter.signature)?;
        check_arity(&handler.filter.signature, handler.filter.args.len())?;

        let flow = if handler.filter.args.is_empty() {
            None
        } else {
            let mut values = Vec::with_capacity(handler.filter.args.len());
            for arg in &handler.filter.args {
                if arg.value.contains(',') {
                    return Err(ExportError::UnsupportedArgValue(arg.value.clone()));
                }
                ensure_single_line(&arg.value)?;
                values.push(arg.value.as_str());
            }
            Some(render_flow_list(&values))
        };

        by_slot.entry(handler.filter.slot_key).or_default().push(
            padding::pad_key(event, index),
            FilterOut {
                args: flow.as_ref().map(|_| padding::args_placeholder(index)),
                lua: &handler.code,
            },
        );
        flow_args.push(flow);
    }

    let mut handlers = OrderedEntries::default();
    for (slot_key, entries) in by_slot {
        if entries.is_empty() {
            continue;
        }
        if let Some(slot) = export.slots.get(&slot_key) {
            handlers.push(slot.name.clone(), entries);
        }
    }

    let doc = AutoConfOut {
        name: export.auto_conf_name.as_deref(),
        slots: declared_slots(export),
        handlers,
    };
    let yaml = serde_yaml::to_string(&doc)?;

    debug!("Encoded {} handlers as autoconf", export.handlers.len());
    Ok(padding::strip(&yaml, &flow_args))
}

/// Render only the `name` and `slots` sections of an export
pub fn project_declarations(export: &ScriptExport) -> Result<String, ExportError> {
    let doc = DeclarationsOut {
        name: export.auto_conf_name.as_deref(),
        slots: declared_slots(export),
    };
    Ok(serde_yaml::to_string(&doc)?)
}

/// Read the `name` and `slots` sections of an autoconf document
pub fn decode_declarations(input: &str) -> Result<Declarations, ExportError> {
    padding::ensure_absent(input)?;
    let doc: AutoConfDoc = serde_yaml::from_str(input)?;
    Ok(Declarations {
        name: doc.name,
        slots: doc
            .slots
            .unwrap_or_default()
            .into_iter()
            .map(|(name, decl)| (name, decl.into()))
            .collect(),
    })
}

fn resolve_event(
    table: &FilterTable,
    event_key: &str,
) -> Result<(String, Option<Vec<String>>), ExportError> {
    if is_event_name(event_key) {
        return Ok((table.signature_for_name(event_key)?.to_string(), None));
    }
    let call = parse_call(event_key)?;
    let signature = table.signature_for_name(&call.name)?.to_string();
    let args = if call.args.is_empty() {
        None
    } else {
        Some(call.args)
    };
    Ok((signature, args))
}

fn declared_slots(export: &ScriptExport) -> OrderedEntries<SlotDecl> {
    let mut slots: Vec<(String, SlotDecl)> = export
        .slots
        .values()
        .filter_map(|slot| {
            slot.auto_conf.as_ref().map(|conf| {
                (
                    slot.name.clone(),
                    SlotDecl {
                        class: conf.class.clone(),
                        select: conf.select.clone().filter(|s| !s.is_empty()),
                    },
                )
            })
        })
        .collect();
    slots.sort_by(|a, b| a.0.cmp(&b.0));
    OrderedEntries(slots)
}

fn ensure_no_reserved_text(export: &ScriptExport) -> Result<(), ExportError> {
    if let Some(name) = &export.auto_conf_name {
        padding::ensure_absent(name)?;
    }
    for slot in export.slots.values() {
        padding::ensure_absent(&slot.name)?;
        if let Some(conf) = &slot.auto_conf {
            padding::ensure_absent(&conf.class)?;
            if let Some(select) = &conf.select {
                padding::ensure_absent(select)?;
            }
        }
    }
    for handler in &export.handlers {
        padding::ensure_absent(&handler.code)?;
        for arg in &handler.filter.args {
            padding::ensure_absent(&arg.value)?;
        }
    }
    Ok(())
}

impl From<SlotDecl> for SlotAutoConf {
    fn from(decl: SlotDecl) -> Self {
        SlotAutoConf {
            class: decl.class,
            select: decl.select.filter(|s| !s.is_empty()),
        }
    }
}
