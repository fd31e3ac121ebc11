//! High-level operations: the one pipeline this crate runs, "configure".

pub mod configure;

pub use configure::{configure, ConfigureOptions, ConfigureOutcome, Generator};
