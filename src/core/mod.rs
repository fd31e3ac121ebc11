//! Core data structures: the scoped store, the script-loading state
//! machine, option probing inputs, toolchain vocabulary, and the resolved
//! target model.

pub mod loader;
pub mod option;
pub mod project;
pub mod store;
pub mod target;
pub mod toolchain;

pub use loader::{Loader, Phase, PlatformContext};
pub use option::{ProbeInputs, ShowMenu};
pub use store::{EntityKind, Store, ROOT_SCOPE};
pub use target::{CppStandard, CStandard, InstallEntry, SourceFile, Target, TargetKind};
pub use toolchain::{ToolKind, ToolName};
