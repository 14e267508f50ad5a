pub mod config;
pub mod convert;
pub mod pack;
pub mod unpack;
