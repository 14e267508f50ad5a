//! Canonical in-memory model of a unit's script configuration
//!
//! Every codec decodes into and encodes from [`ScriptExport`]. Slot keys are
//! kept in a `BTreeMap` so iteration is always in ascending key order, which
//! puts the reserved (negative) slots first.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::ExportError;

pub const SLOT_IDX_UNIT: i32 = -1;
pub const SLOT_IDX_SYSTEM: i32 = -2;
pub const SLOT_IDX_LIBRARY: i32 = -3;

/// Names of the reserved slots, paired with their keys
pub const RESERVED_SLOTS: [(&str, i32); 3] = [
    ("unit", SLOT_IDX_UNIT),
    ("system", SLOT_IDX_SYSTEM),
    ("library", SLOT_IDX_LIBRARY),
];

/// Look up the reserved key for `unit`, `system` or `library`
pub fn reserved_slot_key(name: &str) -> Option<i32> {
    RESERVED_SLOTS
        .iter()
        .find(|(reserved, _)| *reserved == name)
        .map(|(_, key)| *key)
}

/// Root aggregate: slots, the handlers bound to them and opaque extras
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptExport {
    /// Set when the export came from (or should render as) autoconf
    pub auto_conf_name: Option<String>,
    pub slots: BTreeMap<i32, Slot>,
    pub handlers: Vec<Handler>,
    /// Kept verbatim for forward compatibility
    pub methods: Vec<Value>,
    /// Kept verbatim for forward compatibility
    pub events: Vec<Value>,
}

impl Default for ScriptExport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptExport {
    /// Empty export holding only the three reserved slots
    pub fn new() -> Self {
        let mut export = ScriptExport {
            auto_conf_name: None,
            slots: BTreeMap::new(),
            handlers: Vec::new(),
            methods: Vec::new(),
            events: Vec::new(),
        };
        export.ensure_reserved_slots();
        export
    }

    /// Insert any reserved slot that is missing
    pub fn ensure_reserved_slots(&mut self) {
        for (name, key) in RESERVED_SLOTS {
            self.slots.entry(key).or_insert_with(|| Slot::new(name));
        }
    }

    /// The autoconf name, if present and non-empty
    pub fn autoconf_name(&self) -> Option<&str> {
        self.auto_conf_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Find the key of the slot with the given name
    pub fn slot_key_by_name(&self, name: &str) -> Option<i32> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.name == name)
            .map(|(key, _)| *key)
    }

    /// Smallest positive key greater than every existing key
    pub fn next_slot_key(&self) -> i32 {
        self.slots
            .keys()
            .next_back()
            .map_or(1, |last| (*last).max(0) + 1)
    }

    /// Handlers bound to `slot_key`, in model order
    pub fn handlers_for_slot(&self, slot_key: i32) -> impl Iterator<Item = &Handler> {
        self.handlers
            .iter()
            .filter(move |handler| handler.filter.slot_key == slot_key)
    }

    /// Check that every handler points at an existing slot
    pub fn validate(&self) -> Result<(), ExportError> {
        for handler in &self.handlers {
            if !self.slots.contains_key(&handler.filter.slot_key) {
                return Err(ExportError::MissingSlot {
                    handler: handler.key,
                    slot_key: handler.filter.slot_key,
                });
            }
        }
        Ok(())
    }

    /// Re-assign handler keys densely (1..=n) in current order
    pub fn renumber_handlers(&mut self) {
        for (idx, handler) in self.handlers.iter_mut().enumerate() {
            handler.key = idx as u32 + 1;
        }
    }
}

/// A bindable location: the unit, system, library or a linked element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(rename = "type", default)]
    pub slot_type: SlotType,
    /// Only present for slots declared through autoconf
    #[serde(skip)]
    pub auto_conf: Option<SlotAutoConf>,
}

impl Slot {
    pub fn new(name: impl Into<String>) -> Self {
        Slot {
            name: name.into(),
            slot_type: SlotType::default(),
            auto_conf: None,
        }
    }

    pub fn with_auto_conf(name: impl Into<String>, auto_conf: SlotAutoConf) -> Self {
        Slot {
            auto_conf: Some(auto_conf),
            ..Slot::new(name)
        }
    }
}

/// Declared capabilities of a slot (currently always empty)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotType {
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub methods: Vec<Value>,
}

/// Autoconf declaration of a slot: element class and optional selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAutoConf {
    pub class: String,
    pub select: Option<String>,
}

impl SlotAutoConf {
    pub fn new(class: impl Into<String>) -> Self {
        SlotAutoConf {
            class: class.into(),
            select: None,
        }
    }
}

/// One script body and the filter that triggers it
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub code: String,
    pub filter: Filter,
    pub key: u32,
}

/// Event binding; `signature` is always the parameterized form
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub args: Vec<Arg>,
    pub signature: String,
    pub slot_key: i32,
}

/// A positional argument, stored in its literal string form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub value: String,
}

impl Arg {
    pub fn new(value: impl Into<String>) -> Self {
        Arg {
            value: value.into(),
        }
    }
}

/// Convert plain string values into args
pub fn args_from<I, S>(values: I) -> Vec<Arg>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(Arg::new).collect()
}
