//! Host toolchain discovery.
//!
//! The pipeline never reads compiler locations or `PATH` from ambient
//! globals directly; it asks a [`ToolchainResolver`]. [`HostToolchain`] is
//! the production implementation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{SubBuildConfig, ToolchainConfig};
use crate::process::ToolInvocation;

/// Capability for locating the compiler toolchain and building tools.
pub trait ToolchainResolver: Send + Sync {
    /// Toolchain family name, e.g. `clang` or `msvc`.
    fn name(&self) -> &str;

    /// Absolute path of the toolchain's compiler executable, when known.
    fn compiler_path(&self) -> Option<PathBuf>;

    /// Search path handed to child processes before depforge prepends to it.
    fn search_path(&self) -> Option<OsString>;

    /// Command that builds `tool` from its module `descriptor`.
    fn sub_build(&self, tool: &str, descriptor: &Path) -> ToolInvocation;
}

/// Resolver for the machine depforge runs on.
#[derive(Debug, Clone)]
pub struct HostToolchain {
    name: String,
    compiler: Option<PathBuf>,
    search_path: Option<OsString>,
    subbuild: SubBuildConfig,
}

impl HostToolchain {
    /// Resolve the toolchain described by `config`.
    ///
    /// An explicit `compiler` wins; otherwise the conventional driver for the
    /// family is looked up on `PATH`.
    pub fn discover(config: &ToolchainConfig, subbuild: SubBuildConfig) -> Self {
        let compiler = config.compiler.clone().or_else(|| {
            compiler_candidates(&config.name)
                .iter()
                .find_map(|candidate| which::which(candidate).ok())
        });
        debug!(toolchain = %config.name, compiler = ?compiler, "resolved toolchain");
        Self {
            name: config.name.clone(),
            compiler,
            search_path: std::env::var_os("PATH"),
            subbuild,
        }
    }

    /// Construct a resolver from explicit parts.
    pub fn new(
        name: impl Into<String>,
        compiler: Option<PathBuf>,
        search_path: Option<OsString>,
        subbuild: SubBuildConfig,
    ) -> Self {
        Self {
            name: name.into(),
            compiler,
            search_path,
            subbuild,
        }
    }
}

impl ToolchainResolver for HostToolchain {
    fn name(&self) -> &str {
        &self.name
    }

    fn compiler_path(&self) -> Option<PathBuf> {
        self.compiler.clone()
    }

    fn search_path(&self) -> Option<OsString> {
        self.search_path.clone()
    }

    fn sub_build(&self, tool: &str, descriptor: &Path) -> ToolInvocation {
        let mut invocation = ToolInvocation::new(&self.subbuild.program)
            .args(self.subbuild.expand_args(tool, descriptor));
        if let Some(dir) = descriptor.parent() {
            invocation = invocation.current_dir(dir);
        }
        invocation
    }
}

/// Compiler driver names to try, most specific first.
fn compiler_candidates(family: &str) -> &'static [&'static str] {
    let family = family.to_lowercase();
    if family.contains("msvc") {
        &["cl"]
    } else if family.contains("mingw") {
        &["x86_64-w64-mingw32-gcc", "gcc"]
    } else if family.contains("clang") {
        &["clang", "cc"]
    } else if family.contains("intel") {
        &["icx", "icc"]
    } else {
        &["gcc", "cc"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_candidates() {
        assert_eq!(compiler_candidates("AppleClang"), &["clang", "cc"]);
        assert_eq!(compiler_candidates("msvc"), &["cl"]);
        assert_eq!(compiler_candidates("gcc"), &["gcc", "cc"]);
    }

    #[test]
    fn test_explicit_compiler_wins() {
        let config = ToolchainConfig {
            name: "clang".to_string(),
            compiler: Some(PathBuf::from("/opt/llvm/bin/clang")),
        };
        let tc = HostToolchain::discover(&config, SubBuildConfig::default());
        assert_eq!(tc.compiler_path(), Some(PathBuf::from("/opt/llvm/bin/clang")));
        assert_eq!(tc.name(), "clang");
    }

    #[test]
    fn test_sub_build_invocation() {
        let sub = SubBuildConfig {
            program: "dotnet".to_string(),
            args: vec![
                "ebuild.dll".to_string(),
                "build".to_string(),
                "{descriptor}".to_string(),
                "-p".to_string(),
                "{jobs}".to_string(),
            ],
            jobs: 2,
        };
        let tc = HostToolchain::new("gcc", None, None, sub);
        let inv = tc.sub_build("pkgdata", Path::new("/mods/icu/icu-pkgdata.ebuild.cs"));
        assert_eq!(inv.program, PathBuf::from("dotnet"));
        assert_eq!(
            inv.args_lossy(),
            vec!["ebuild.dll", "build", "/mods/icu/icu-pkgdata.ebuild.cs", "-p", "2"]
        );
        assert_eq!(inv.cwd.as_deref(), Some(Path::new("/mods/icu")));
    }
}
