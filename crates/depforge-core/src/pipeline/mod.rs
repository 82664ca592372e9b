//! The ICU data artifact pipeline.
//!
//! `icupkg` unpacks the prebuilt ICU data archive into individual resource
//! files, and `pkgdata` repackages them as a common archive, a static
//! library, or a shared library. Both tools are themselves built on demand
//! through a sub-build when their binaries are missing.
//!
//! Steps run strictly in order, each one reading what the previous one left
//! on disk:
//!
//! 1. ensure `icupkg`
//! 2. unpack contents into `temp/pack_contents` and write the manifest
//! 3. ensure `pkgdata`
//! 4. package and move the result into `Binaries/icudt/default`
//!
//! Each step is gated purely on the existence of its output path. A
//! half-written artifact from an interrupted run counts as done; delete it
//! to force the step again. Two runs over the same module directory must not
//! overlap; callers that need this should hold a lock around the run.

mod driver;
mod error;
mod layout;

pub use driver::{ArtifactSpec, IcuDataPipeline, PackageRequest, PackagedArtifacts};
pub use error::PipelineError;
pub use layout::{ICU_DATA_PACKAGE, ModuleLayout};
pub(crate) use layout::data_file_name;
