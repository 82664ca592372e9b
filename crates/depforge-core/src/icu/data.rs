//! The `icudt` module: a library loader exposing the packaged data library.

use depforge_schema::{PackageMode, Platform};

use crate::descriptor::{ModuleDescriptor, ModuleKind};
use crate::pipeline::ModuleLayout;

/// Describe the packaged ICU data for dependents.
///
/// Static and shared modes export the library from the canonical binary
/// directory. On Windows a shared build links against its import library,
/// which carries the static extension. Common data is loaded at runtime
/// and exports nothing.
pub fn data_descriptor(layout: &ModuleLayout, mode: PackageMode) -> ModuleDescriptor {
    let mut desc = ModuleDescriptor::new("icudt", ModuleKind::LibraryLoader);
    desc.output_directory = Some("Binaries/icudt".to_string());

    let library = match mode {
        PackageMode::Common => None,
        PackageMode::Static => Some(layout.static_library_name()),
        PackageMode::Shared if layout.platform() == Platform::Windows => Some(layout.static_library_name()),
        PackageMode::Shared => Some(layout.shared_library_name()),
    };

    if let Some(name) = library {
        let path = layout.binary_dir().join(name);
        if !path.exists() {
            desc.warning(format!("{} has not been packaged yet", path.display()));
        }
        desc.libraries.add_public(path.to_string_lossy().into_owned());
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_exports_nothing() {
        let layout = ModuleLayout::new("/m", Platform::Linux);
        let desc = data_descriptor(&layout, PackageMode::Common);
        assert_eq!(desc.kind, ModuleKind::LibraryLoader);
        assert!(desc.libraries.public.is_empty());
        assert!(desc.diagnostics.is_empty());
    }

    #[test]
    fn test_static_exports_packaged_library() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ModuleLayout::new(dir.path(), Platform::Linux);
        std::fs::create_dir_all(layout.binary_dir()).unwrap();
        std::fs::write(layout.binary_dir().join("libicudt77.a"), b"").unwrap();

        let desc = data_descriptor(&layout, PackageMode::Static);
        assert_eq!(desc.libraries.public.len(), 1);
        assert!(desc.libraries.public[0].ends_with("libicudt77.a"));
        assert_eq!(desc.warnings().count(), 0);
    }

    #[test]
    fn test_shared_links_import_library_on_windows() {
        let win = ModuleLayout::new("/m", Platform::Windows);
        let desc = data_descriptor(&win, PackageMode::Shared);
        assert!(desc.libraries.public[0].ends_with("icudt77.lib"));
        assert_eq!(desc.warnings().count(), 1);

        let linux = ModuleLayout::new("/m", Platform::Linux);
        let desc = data_descriptor(&linux, PackageMode::Shared);
        assert!(desc.libraries.public[0].ends_with("libicudt77.so"));
    }
}
