//! Reference-data name resolution library - shared modules for the CLI.

pub mod models;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod source;
pub mod store;
pub mod synth;
