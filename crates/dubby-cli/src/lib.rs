//! dubby library - expose modules for testing
//!
//! The binary is a thin layer over these commands; the conversion work lives
//! in the `dubby-export` and `dubby-srcdir` crates.

pub mod commands;
pub mod common;
pub mod errors;
pub mod formats;

pub use common::GlobalOpts;
pub use errors::CliError;
