//! Where the pipeline reads and writes inside a module directory.

use depforge_schema::{Endianness, PackageMode, Platform};
use std::path::{Path, PathBuf};

/// Package name and version token handed to `pkgdata` (`-p` / `-L`).
pub const ICU_DATA_PACKAGE: &str = "icudt77";

/// Directory conventions for one ICU module checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    root: PathBuf,
    platform: Platform,
}

impl ModuleLayout {
    /// Layout rooted at `root` for a `platform` target.
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    /// Module directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target platform, which decides file extensions.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// `Binaries/<tool>/default/<tool>[.exe]`
    pub fn tool_path(&self, tool: &str) -> PathBuf {
        self.root
            .join("Binaries")
            .join(tool)
            .join("default")
            .join(self.platform.executable_name(tool))
    }

    /// Module descriptor whose sub-build produces `tool`.
    pub fn tool_descriptor(&self, tool: &str) -> PathBuf {
        self.root.join(format!("icu-{tool}.ebuild.cs"))
    }

    /// `temp/`, holding everything the pipeline may regenerate.
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Unpacked data resources.
    pub fn contents_dir(&self) -> PathBuf {
        self.temp_dir().join("pack_contents")
    }

    /// Listing of the unpacked resources, consumed by `pkgdata`.
    pub fn manifest_path(&self) -> PathBuf {
        manifest_path_for(&self.contents_dir())
    }

    /// Scratch space for `pkgdata -T`.
    pub fn packaging_temp_dir(&self) -> PathBuf {
        self.temp_dir().join("packaging_temp")
    }

    /// Sub-build logs.
    pub fn log_dir(&self) -> PathBuf {
        self.temp_dir().join("logs")
    }

    /// Data archive path relative to the module root,
    /// e.g. `data/little/icudt77l.dat`.
    pub fn data_file(&self, endianness: Endianness) -> PathBuf {
        PathBuf::from("data")
            .join(endianness.as_str())
            .join(data_file_name(endianness))
    }

    /// Where `pkgdata -d` writes.
    pub fn tool_output_dir(&self) -> PathBuf {
        self.root.join("Binaries").join("icudt")
    }

    /// Canonical location for the packaged library.
    pub fn binary_dir(&self) -> PathBuf {
        self.tool_output_dir().join("default")
    }

    /// `icudt77.lib` on Windows, `libicudt77.a` elsewhere.
    pub fn static_library_name(&self) -> String {
        format!(
            "{}{ICU_DATA_PACKAGE}{}",
            self.platform.library_prefix(),
            self.platform.static_library_extension()
        )
    }

    /// `icudt77.dll`, `libicudt77.dylib` or `libicudt77.so`.
    pub fn shared_library_name(&self) -> String {
        format!(
            "{}{ICU_DATA_PACKAGE}{}",
            self.platform.library_prefix(),
            self.platform.shared_library_extension()
        )
    }

    /// `icudt77.dat`.
    pub fn common_data_name(&self) -> String {
        format!("{ICU_DATA_PACKAGE}.dat")
    }

    /// The file whose presence marks `mode` as already packaged.
    pub fn final_output(&self, mode: PackageMode) -> PathBuf {
        let name = match mode {
            PackageMode::Common => self.common_data_name(),
            PackageMode::Static => self.static_library_name(),
            PackageMode::Shared => self.shared_library_name(),
        };
        self.binary_dir().join(name)
    }
}

/// `icudt77l.dat` / `icudt77b.dat`
pub(crate) fn data_file_name(endianness: Endianness) -> String {
    format!("{ICU_DATA_PACKAGE}{}.dat", endianness.suffix())
}

/// Sibling listing file for an unpack destination: `<dir>.lst`.
pub(crate) fn manifest_path_for(dest_dir: &Path) -> PathBuf {
    let mut name = dest_dir.file_name().unwrap_or_default().to_os_string();
    name.push(".lst");
    dest_dir.with_file_name(name)
}
