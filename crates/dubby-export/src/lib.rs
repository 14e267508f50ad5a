//! Dubby script export model
//!
//! This crate holds the canonical model of a unit's scripts (slots, handlers
//! and the filters binding them) together with the codecs that read and write
//! it: the JSON wire format and the autoconf format. The source-directory
//! layout lives in `dubby-srcdir`.
//!
//! Every codec decodes into [`ScriptExport`] and encodes from it, so
//! converting between formats is always decode-then-encode.

pub mod autoconf;
pub mod errors;
pub mod filters;
pub mod indenting;
pub mod json;
pub mod patterns;
pub mod signature;
pub mod types;

pub use errors::ExportError;
pub use filters::{FilterTable, STANDARD_FILTERS};
pub use types::{
    args_from, reserved_slot_key, Arg, Filter, Handler, ScriptExport, Slot, SlotAutoConf,
    SlotType, RESERVED_SLOTS, SLOT_IDX_LIBRARY, SLOT_IDX_SYSTEM, SLOT_IDX_UNIT,
};
