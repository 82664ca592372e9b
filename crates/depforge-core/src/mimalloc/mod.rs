//! mimalloc module resolution.
//!
//! Turns a flat set of boolean build options plus a [`BuildTarget`] into a
//! [`ModuleDescriptor`]. Resolution runs in a fixed order:
//!
//! 1. Normalization: options that cannot coexist, or whose headers are
//!    missing on the host, are switched off with a diagnostic.
//! 2. The option table adds defines, flags, libraries and sources.
//! 3. Toolchain flags, TLS model and architecture optimization.
//! 4. Output-kind definitions.
//! 5. Platform libraries and the Windows redirect DLL.
//!
//! Host facts (header availability, `/proc/cpuinfo`) come from a
//! [`HostInfo`] so every rule can be exercised without a real toolchain.

mod resolve;
mod rules;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use depforge_schema::{Arch, OutputKind, Platform};

pub use resolve::resolve;

/// Pinned upstream release.
pub const MIMALLOC_SOURCE_URL: &str =
    "https://github.com/microsoft/mimalloc/archive/refs/tags/v3.1.5.zip";
/// Top-level directory inside the release archive.
pub const MIMALLOC_SOURCE_ROOT: &str = "mimalloc-3.1.5";

/// Core sources, relative to the source root.
pub(crate) const CORE_SOURCES: &[&str] = &[
    "src/alloc.c",
    "src/alloc-aligned.c",
    "src/alloc-posix.c",
    "src/arena.c",
    "src/arena-meta.c",
    "src/bitmap.c",
    "src/heap.c",
    "src/init.c",
    "src/libc.c",
    "src/options.c",
    "src/os.c",
    "src/page.c",
    "src/random.c",
    "src/stats.c",
    "src/prim/prim.c",
];

/// User-facing build options, read from the `[mimalloc]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MimallocOptions {
    /// Guard pages, encrypted free lists and randomized allocation.
    pub secure: bool,
    /// Pad allocations to detect heap overflows.
    pub padding: bool,
    /// Force padding off even in debug builds.
    pub no_padding: bool,
    /// Replace the system allocator.
    #[serde(rename = "override")]
    pub override_malloc: bool,
    /// Abort on out-of-memory instead of returning null.
    pub xmalloc: bool,
    /// Print errors and warnings in release builds.
    pub show_errors: bool,
    /// Integrate with Valgrind. Needs `valgrind/valgrind.h`.
    pub track_valgrind: bool,
    /// Integrate with `AddressSanitizer`. Needs `sanitizer/asan_interface.h`.
    pub track_asan: bool,
    /// Emit Event Tracing for Windows events.
    pub track_etw: bool,
    /// Compile the C sources as C++.
    pub use_cxx: bool,
    /// Tune code generation for the target architecture.
    pub optimize_for_arch: bool,
    /// Use interpose on macOS to override the allocator.
    pub osx_interpose: bool,
    /// Register a malloc zone on macOS.
    pub osx_zone: bool,
    /// Ship the redirect DLL so the override reaches the CRT.
    pub windows_redirect: bool,
    /// Use a fixed TLS slot on Windows.
    pub windows_use_fixed_tls: bool,
    /// Use the `local-dynamic` TLS model.
    pub local_dynamic_tls: bool,
    /// Target musl libc.
    pub libc_musl: bool,
    /// Guard pages behind sampled allocations. Implies `no_padding`.
    pub guarded: bool,
    /// Skip the final collection at process exit.
    pub skip_collect_on_exit: bool,
}

impl Default for MimallocOptions {
    fn default() -> Self {
        Self {
            secure: false,
            padding: false,
            no_padding: false,
            override_malloc: true,
            xmalloc: false,
            show_errors: false,
            track_valgrind: false,
            track_asan: false,
            track_etw: false,
            use_cxx: false,
            optimize_for_arch: false,
            osx_interpose: true,
            osx_zone: true,
            windows_redirect: true,
            windows_use_fixed_tls: false,
            local_dynamic_tls: false,
            libc_musl: false,
            guarded: false,
            skip_collect_on_exit: false,
        }
    }
}

/// What the module is being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    /// Target operating system.
    pub platform: Platform,
    /// Target architecture.
    pub arch: Arch,
    /// Architecture of the machine running the build; `None` when it is not
    /// one depforge recognizes.
    pub host_arch: Option<Arch>,
    /// Toolchain name as configured, e.g. `gcc`, `AppleClang`, `msvc`.
    pub toolchain: String,
    /// Requested linkage.
    pub output: OutputKind,
}

impl BuildTarget {
    /// Target for `platform`/`arch`, built on the current host.
    pub fn new(platform: Platform, arch: Arch, toolchain: impl Into<String>, output: OutputKind) -> Self {
        Self {
            platform,
            arch,
            host_arch: Arch::current(),
            toolchain: toolchain.into(),
            output,
        }
    }

    /// Override the host architecture.
    pub fn with_host_arch(mut self, arch: Arch) -> Self {
        self.host_arch = Some(arch);
        self
    }
}

/// Facts about the build host that rules depend on.
pub trait HostInfo: Send + Sync {
    /// Whether `header` (e.g. `valgrind/valgrind.h`) resolves on the include path.
    fn include_exists(&self, header: &str) -> bool;

    /// Contents of `/proc/cpuinfo`, when the host has one.
    fn cpuinfo(&self) -> Option<String>;
}

/// Reads the real host: system include directories and `/proc/cpuinfo`.
#[derive(Debug, Clone)]
pub struct SystemHost {
    include_dirs: Vec<PathBuf>,
}

impl Default for SystemHost {
    fn default() -> Self {
        let mut include_dirs = Vec::new();
        for var in ["CPATH", "C_INCLUDE_PATH", "INCLUDE"] {
            if let Some(value) = std::env::var_os(var) {
                include_dirs.extend(std::env::split_paths(&value));
            }
        }
        include_dirs.push(PathBuf::from("/usr/local/include"));
        include_dirs.push(PathBuf::from("/usr/include"));
        Self { include_dirs }
    }
}

impl SystemHost {
    /// Search only `include_dirs`.
    pub fn with_include_dirs(include_dirs: Vec<PathBuf>) -> Self {
        Self { include_dirs }
    }
}

impl HostInfo for SystemHost {
    fn include_exists(&self, header: &str) -> bool {
        self.include_dirs.iter().any(|dir| dir.join(header).is_file())
    }

    fn cpuinfo(&self) -> Option<String> {
        std::fs::read_to_string(Path::new("/proc/cpuinfo")).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = MimallocOptions::default();
        assert!(opts.override_malloc);
        assert!(opts.osx_interpose && opts.osx_zone && opts.windows_redirect);
        assert!(!opts.secure && !opts.guarded && !opts.use_cxx);
    }

    #[test]
    fn test_options_from_toml() {
        let opts: MimallocOptions = toml::from_str("override = false\nguarded = true").unwrap();
        assert!(!opts.override_malloc);
        assert!(opts.guarded);
        assert!(opts.osx_zone);
    }

    #[test]
    fn test_system_host_include_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("valgrind")).unwrap();
        std::fs::write(dir.path().join("valgrind/valgrind.h"), "").unwrap();

        let host = SystemHost::with_include_dirs(vec![dir.path().to_path_buf()]);
        assert!(host.include_exists("valgrind/valgrind.h"));
        assert!(!host.include_exists("valgrind/memcheck.h"));
    }
}
