//! Source directory codec
//!
//! Lays a script export out as editable Lua files:
//!
//! ```text
//! <root>/
//!   autoconf.yml               only when the export has an autoconf name
//!   slots/<key>.<name>.lua     one per slot with handlers
//!   lib/<name>.lua             one per library body
//! ```
//!
//! and reads such a tree back into a [`ScriptExport`](dubby_export::ScriptExport).

pub mod errors;
pub mod reader;
pub mod scanner;
pub mod writer;

pub use errors::SrcDirError;
pub use reader::{read, Report, SrcReader};
pub use writer::{write, WriteOptions, WriteSummary};

pub const SLOTS_DIR: &str = "slots";
pub const LIB_DIR: &str = "lib";
pub const AUTOCONF_FILE: &str = "autoconf.yml";

/// Header that opens each library body inside the aggregated handler
pub const LIB_HEADER_PREFIX: &str = "-- !DU[lib]: ";
