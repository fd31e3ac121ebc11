//! autoforge - a script-driven, autotools-style build configurator for
//! C/C++/Objective-C/assembly projects, emitting self-contained Makefiles.
//!
//! The pipeline is strictly sequential: load project scripts into a scoped
//! store, detect a toolchain and probe options, resolve the target graph,
//! then render configfiles and emit a Makefile. See [`ops::configure`] for
//! the single entry point that runs all of it.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use core::{EntityKind, Loader, Phase, Store, Target, TargetKind};
pub use ops::{configure, ConfigureOptions, ConfigureOutcome};
pub use util::ConfigureError;
