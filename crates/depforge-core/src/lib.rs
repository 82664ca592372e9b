//! depforge core - prepares native third-party dependencies for a host build
//! system.
//!
//! # Architecture
//!
//! - **Pipeline**: [`pipeline::IcuDataPipeline`] drives `icupkg` and
//!   `pkgdata` to produce the ICU data library. Every step is gated on the
//!   existence of its output path, so re-running a finished pipeline spawns
//!   nothing.
//! - **Capabilities**: subprocesses go through [`process::ProcessRunner`] and
//!   host toolchain discovery through [`toolchain::ToolchainResolver`]; both
//!   are injected so tests can swap in fakes.
//! - **Descriptors**: modules describe their build inputs as a
//!   [`descriptor::ModuleDescriptor`] that serializes to JSON for the host.
//!
//! # Module directory layout
//!
//! ```text
//! <module>/
//! ├── Binaries/
//! │   ├── icupkg/default/icupkg[.exe]
//! │   ├── pkgdata/default/pkgdata[.exe]
//! │   └── icudt/default/icudt77.{a,lib,so,dll,dylib,dat}
//! ├── data/<little|big>/icudt77<l|b>.dat
//! └── temp/
//!     ├── pack_contents/
//!     ├── pack_contents.lst
//!     └── packaging_temp/
//! ```

pub mod config;
pub mod descriptor;
pub mod icu;
pub mod io;
pub mod mimalloc;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod reporter;
pub mod toolchain;

pub use paths::*;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("depforge-core/", env!("CARGO_PKG_VERSION"));
