//! Bridge to the `luamin` Lua minifier
//!
//! Codecs only see the [`Minifier`] trait; [`Luamin`] runs the external
//! executable and is the implementation the CLI uses.

pub mod errors;
pub mod luamin;

pub use errors::MinifyError;
pub use luamin::Luamin;

/// Something that turns Lua source into equivalent, shorter Lua source
pub trait Minifier {
    fn minify(&self, source: &str) -> Result<String, MinifyError>;
}
