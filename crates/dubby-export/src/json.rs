//! JSON wire format codec
//!
//! Slot keys, handler keys and `slotKey` are accepted as quoted or bare
//! numbers on decode and are always written quoted.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::errors::ExportError;
use crate::types::{Arg, Filter, Handler, ScriptExport, Slot};

/// A JSON field holding an integer either as a number or as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(Number),
    Text(String),
}

impl NumberOrString {
    fn parse<T: FromStr>(&self) -> Option<T> {
        match self {
            NumberOrString::Number(n) => n.to_string().parse().ok(),
            NumberOrString::Text(s) => s.parse().ok(),
        }
    }

    fn raw(&self) -> String {
        match self {
            NumberOrString::Number(n) => n.to_string(),
            NumberOrString::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExportIn {
    #[serde(default)]
    slots: BTreeMap<String, Slot>,
    #[serde(default)]
    handlers: Vec<HandlerIn>,
    #[serde(default)]
    methods: Vec<Value>,
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct HandlerIn {
    #[serde(default)]
    code: String,
    filter: FilterIn,
    key: NumberOrString,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterIn {
    #[serde(default)]
    args: Vec<Arg>,
    signature: String,
    slot_key: NumberOrString,
}

#[derive(Debug, Serialize)]
struct ExportOut<'a> {
    slots: BTreeMap<String, &'a Slot>,
    handlers: Vec<HandlerOut<'a>>,
    methods: &'a [Value],
    events: &'a [Value],
}

#[derive(Debug, Serialize)]
struct HandlerOut<'a> {
    code: &'a str,
    filter: FilterOut<'a>,
    key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterOut<'a> {
    args: &'a [Arg],
    signature: &'a str,
    slot_key: String,
}

/// Decode a JSON export
pub fn decode(input: &str) -> Result<ScriptExport, ExportError> {
    let raw: ExportIn = serde_json::from_str(input)?;

    let mut export = ScriptExport::new();
    for (key, slot) in raw.slots {
        let slot_key: i32 = key
            .parse()
            .map_err(|_| ExportError::InvalidSlotKey(key.clone()))?;
        export.slots.insert(slot_key, slot);
    }
    export.ensure_reserved_slots();

    for handler in raw.handlers {
        let key = handler
            .key
            .parse()
            .ok_or_else(|| ExportError::InvalidHandlerKey(handler.key.raw()))?;
        let slot_key = handler
            .filter
            .slot_key
            .parse()
            .ok_or_else(|| ExportError::InvalidSlotKey(handler.filter.slot_key.raw()))?;
        export.handlers.push(Handler {
            code: handler.code,
            filter: Filter {
                args: handler.filter.args,
                signature: handler.filter.signature,
                slot_key,
            },
            key,
        });
    }
    export.methods = raw.methods;
    export.events = raw.events;
    export.validate()?;

    debug!(
        "Decoded JSON export with {} slots and {} handlers",
        export.slots.len(),
        export.handlers.len()
    );
    Ok(export)
}

/// Encode an export as compact JSON
pub fn encode(export: &ScriptExport) -> Result<String, ExportError> {
    Ok(serde_json::to_string(&to_wire(export)?)?)
}

/// Encode an export as indented JSON
pub fn encode_pretty(export: &ScriptExport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&to_wire(export)?)?)
}

fn to_wire(export: &ScriptExport) -> Result<ExportOut<'_>, ExportError> {
    export.validate()?;
    Ok(ExportOut {
        slots: export
            .slots
            .iter()
            .map(|(key, slot)| (key.to_string(), slot))
            .collect(),
        handlers: export
            .handlers
            .iter()
            .map(|handler| HandlerOut {
                code: &handler.code,
                filter: FilterOut {
                    args: &handler.filter.args,
                    signature: &handler.filter.signature,
                    slot_key: handler.filter.slot_key.to_string(),
                },
                key: handler.key.to_string(),
            })
            .collect(),
        methods: &export.methods,
        events: &export.events,
    })
}

#[cfg(test)]
mod tests {
    use crate::json::*;
    use crate::types::{SLOT_IDX_SYSTEM, SLOT_IDX_UNIT};

    const CANONICAL: &str = r#"{"slots":{"-1":{"name":"unit","type":{"events":[],"methods":[]}},"-2":{"name":"system","type":{"events":[],"methods":[]}},"-3":{"name":"library","type":{"events":[],"methods":[]}},"0":{"name":"core","type":{"events":[],"methods":[]}},"1":{"name":"screen","type":{"events":[],"methods":[]}}},"handlers":[{"code":"screen.activate()","filter":{"args":[],"signature":"start()","slotKey":"-1"},"key":"1"},{"code":"refresh()","filter":{"args":[{"value":"Live"}],"signature":"tick(timerId)","slotKey":"-1"},"key":"2"}],"methods":[],"events":[]}"#;

    #[test]
    fn test_canonical_input_is_byte_identical() {
        let Ok(export) = decode(CANONICAL) else {
            panic!("canonical input failed to decode");
        };
        assert_eq!(export.slots.len(), 5);
        assert_eq!(export.handlers[1].filter.args, vec![Arg::new("Live")]);
        assert!(encode(&export).is_ok_and(|out| out == CANONICAL));
    }

    #[test]
    fn test_bare_numbers_accepted() {
        let input = r#"{"slots":{"-1":{"name":"unit","type":{"events":[],"methods":[]}}},"handlers":[{"code":"x = 1","filter":{"args":[],"signature":"update()","slotKey":-2},"key":7}],"methods":[],"events":[]}"#;
        let Ok(export) = decode(input) else {
            panic!("bare numeric keys should decode");
        };
        assert_eq!(export.handlers[0].key, 7);
        assert_eq!(export.handlers[0].filter.slot_key, SLOT_IDX_SYSTEM);
        // reserved slots are filled in
        assert_eq!(export.slots.len(), 3);

        let Ok(out) = encode(&export) else {
            panic!("encode failed");
        };
        assert!(out.contains(r#""slotKey":"-2"},"key":"7""#));
    }

    #[test]
    fn test_invalid_keys() {
        let bad_slot = r#"{"slots":{"one":{"name":"x","type":{"events":[],"methods":[]}}},"handlers":[]}"#;
        assert!(matches!(decode(bad_slot), Err(ExportError::InvalidSlotKey(k)) if k == "one"));

        let bad_handler = r#"{"slots":{},"handlers":[{"code":"","filter":{"args":[],"signature":"start()","slotKey":"-1"},"key":"first"}]}"#;
        assert!(matches!(
            decode(bad_handler),
            Err(ExportError::InvalidHandlerKey(k)) if k == "first"
        ));

        let bad_filter = r#"{"slots":{},"handlers":[{"code":"","filter":{"args":[],"signature":"start()","slotKey":1.5},"key":"1"}]}"#;
        assert!(matches!(decode(bad_filter), Err(ExportError::InvalidSlotKey(_))));
    }

    #[test]
    fn test_missing_slot_rejected_both_ways() {
        let input = r#"{"slots":{},"handlers":[{"code":"","filter":{"args":[],"signature":"start()","slotKey":"4"},"key":"1"}]}"#;
        assert!(matches!(
            decode(input),
            Err(ExportError::MissingSlot { slot_key: 4, .. })
        ));

        let mut export = ScriptExport::new();
        export.handlers.push(Handler {
            code: String::new(),
            filter: Filter {
                args: Vec::new(),
                signature: "start()".to_string(),
                slot_key: 9,
            },
            key: 1,
        });
        assert!(matches!(encode(&export), Err(ExportError::MissingSlot { .. })));
    }

    #[test]
    fn test_opaque_extras_survive() {
        let input = r#"{"slots":{},"handlers":[],"methods":[{"code":"return 1","signature":"one()"}],"events":[{"zeta":1,"alpha":2}]}"#;
        let Ok(export) = decode(input) else {
            panic!("decode failed");
        };
        let Ok(out) = encode(&export) else {
            panic!("encode failed");
        };
        assert!(out.ends_with(
            r#""methods":[{"code":"return 1","signature":"one()"}],"events":[{"zeta":1,"alpha":2}]}"#
        ));
    }

    #[test]
    fn test_pretty_decodes_to_same_model() {
        let mut export = ScriptExport::new();
        export.slots.insert(1, Slot::new("screen"));
        export.handlers.push(Handler {
            code: "a()\nb()".to_string(),
            filter: Filter {
                args: vec![Arg::new("x")],
                signature: "tick(timerId)".to_string(),
                slot_key: SLOT_IDX_UNIT,
            },
            key: 1,
        });
        let Ok(pretty) = encode_pretty(&export) else {
            panic!("encode failed");
        };
        assert!(pretty.contains("\n  \"slots\""));
        assert!(decode(&pretty).is_ok_and(|again| again == export));
    }
}
