//! The `icu` umbrella module: no sources of its own, just the public
//! include directory and references to the real ICU libraries.

use std::path::PathBuf;

use depforge_schema::{OutputKind, PackageMode, SchemaError};

use crate::descriptor::{ModuleDescriptor, ModuleKind, ModuleReference};

/// Inputs for [`umbrella_descriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UmbrellaRequest {
    /// Module directory; `include` below it is exported.
    pub module_dir: PathBuf,
    /// Linkage for `icu-i18n` and `icu-common`.
    pub output: OutputKind,
    /// How `icu-data` is packaged.
    pub data_mode: PackageMode,
}

impl UmbrellaRequest {
    /// Request with statically packaged data.
    pub fn new(module_dir: impl Into<PathBuf>, output: OutputKind) -> Self {
        Self {
            module_dir: module_dir.into(),
            output,
            data_mode: PackageMode::Static,
        }
    }

    /// Package `icu-data` as `data_mode`.
    pub fn with_data_mode(mut self, data_mode: PackageMode) -> Self {
        self.data_mode = data_mode;
        self
    }
}

/// Build the `icu` descriptor. Only `static` and `shared` outputs are accepted.
///
/// # Errors
///
/// [`SchemaError::UnsupportedOutput`] for any other output.
pub fn umbrella_descriptor(request: &UmbrellaRequest) -> Result<ModuleDescriptor, SchemaError> {
    let mode = match request.output {
        OutputKind::Static | OutputKind::Shared => request.output.as_str(),
        other => {
            return Err(SchemaError::UnsupportedOutput {
                module: "icu",
                output: other,
                expected: "static, shared",
            });
        }
    };

    let dir = &request.module_dir;
    let mut desc = ModuleDescriptor::new("icu", ModuleKind::StaticLibrary);
    desc.includes.add_public("include");
    desc.dependencies
        .add_public(ModuleReference::latest(mode, dir.join("icu-i18n")));
    desc.dependencies
        .add_public(ModuleReference::latest(mode, dir.join("icu-common")));
    desc.dependencies.add_public(ModuleReference::latest(
        request.data_mode.as_str(),
        dir.join("icu-data"),
    ));
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_follow_modes() {
        let req = UmbrellaRequest::new("/m/icu", OutputKind::Shared).with_data_mode(PackageMode::Common);
        let desc = umbrella_descriptor(&req).unwrap();

        let deps: Vec<String> = desc.dependencies.public.iter().map(ToString::to_string).collect();
        assert_eq!(
            deps,
            vec!["shared:/m/icu/icu-i18n", "shared:/m/icu/icu-common", "common:/m/icu/icu-data"]
        );
        assert_eq!(desc.includes.public, vec![PathBuf::from("include")]);
        assert_eq!(desc.kind, ModuleKind::StaticLibrary);
    }

    #[test]
    fn test_default_data_mode_is_static() {
        let desc = umbrella_descriptor(&UmbrellaRequest::new("/m/icu", OutputKind::Static)).unwrap();
        assert_eq!(desc.dependencies.public[2].output, "static");
    }

    #[test]
    fn test_rejects_other_outputs() {
        for output in [OutputKind::Common, OutputKind::Default, OutputKind::Dynamic] {
            let err = umbrella_descriptor(&UmbrellaRequest::new("/m", output)).unwrap_err();
            assert!(matches!(err, SchemaError::UnsupportedOutput { module: "icu", .. }));
        }
    }
}
