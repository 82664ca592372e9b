//! `forge.toml` configuration.
//!
//! ```toml
//! [subbuild]
//! program = "dotnet"
//! args = ["/opt/ebuild/ebuild.dll", "build", "{descriptor}", "-p", "{jobs}"]
//! jobs = 8
//!
//! [toolchain]
//! name = "clang"
//! compiler = "/usr/bin/clang"
//!
//! [mimalloc]
//! secure = true
//! track_asan = true
//! ```
//!
//! Every section is optional. `DEPFORGE_SUBBUILD_PROGRAM` overrides
//! `subbuild.program` after the file is read.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::mimalloc::MimallocOptions;

/// Top-level configuration parsed from a `forge.toml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ForgeConfig {
    /// How prerequisite tools are built when missing.
    pub subbuild: SubBuildConfig,
    /// Which compiler toolchain modules target.
    pub toolchain: ToolchainConfig,
    /// mimalloc build options.
    pub mimalloc: MimallocOptions,
}

/// Command template for building a prerequisite tool from its descriptor.
///
/// `args` may contain the placeholders `{descriptor}`, `{tool}` and `{jobs}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SubBuildConfig {
    /// Build driver executable.
    pub program: String,
    /// Argument template.
    pub args: Vec<String>,
    /// Parallel compile processes handed to the driver. Defaults to the CPU count.
    pub jobs: usize,
}

impl Default for SubBuildConfig {
    fn default() -> Self {
        Self {
            program: "ebuild".to_string(),
            args: vec![
                "build".to_string(),
                "{descriptor}".to_string(),
                "-p".to_string(),
                "{jobs}".to_string(),
            ],
            jobs: num_cpus::get(),
        }
    }
}

impl SubBuildConfig {
    /// Expand the argument template for one tool.
    pub fn expand_args(&self, tool: &str, descriptor: &Path) -> Vec<String> {
        let descriptor = descriptor.to_string_lossy();
        let jobs = self.jobs.to_string();
        self.args
            .iter()
            .map(|a| {
                a.replace("{descriptor}", &descriptor)
                    .replace("{tool}", tool)
                    .replace("{jobs}", &jobs)
            })
            .collect()
    }
}

/// Compiler toolchain selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Toolchain family name (`clang`, `gcc`, `msvc`, `AppleClang`, ...).
    pub name: String,
    /// Explicit compiler path; looked up on `PATH` by family when absent.
    pub compiler: Option<PathBuf>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        let name = if cfg!(target_os = "windows") {
            "msvc"
        } else if cfg!(target_vendor = "apple") {
            "AppleClang"
        } else {
            "gcc"
        };
        Self {
            name: name.to_string(),
            compiler: None,
        }
    }
}

impl ForgeConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse forge.toml")
    }

    /// Load configuration from `path`, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Load `path` when given, otherwise defaults; environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file cannot be read or parsed.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let mut config = Self::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(program) = std::env::var("DEPFORGE_SUBBUILD_PROGRAM") {
            if !program.is_empty() {
                self.subbuild.program = program;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = ForgeConfig::parse(
            r#"
            [subbuild]
            program = "dotnet"
            args = ["/opt/ebuild.dll", "build", "{descriptor}", "-p", "{jobs}"]
            jobs = 4

            [toolchain]
            name = "clang"
            compiler = "/usr/bin/clang"

            [mimalloc]
            secure = true
            override = false
            "#,
        )
        .unwrap();

        assert_eq!(config.subbuild.program, "dotnet");
        assert_eq!(config.subbuild.jobs, 4);
        assert_eq!(config.toolchain.name, "clang");
        assert_eq!(
            config.toolchain.compiler.as_deref(),
            Some(Path::new("/usr/bin/clang"))
        );
        assert!(config.mimalloc.secure);
        assert!(!config.mimalloc.override_malloc);
        // Untouched options keep their defaults.
        assert!(config.mimalloc.osx_zone);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ForgeConfig::parse("").unwrap();
        assert_eq!(config, ForgeConfig::default());
        assert_eq!(config.subbuild.program, "ebuild");
        assert!(config.subbuild.jobs >= 1);
    }

    #[test]
    fn test_expand_args() {
        let sub = SubBuildConfig {
            program: "dotnet".to_string(),
            args: vec![
                "ebuild.dll".to_string(),
                "build".to_string(),
                "{descriptor}".to_string(),
                "--target={tool}".to_string(),
                "-p".to_string(),
                "{jobs}".to_string(),
            ],
            jobs: 3,
        };
        let args = sub.expand_args("icupkg", Path::new("/m/icu-icupkg.ebuild.cs"));
        assert_eq!(
            args,
            vec![
                "ebuild.dll",
                "build",
                "/m/icu-icupkg.ebuild.cs",
                "--target=icupkg",
                "-p",
                "3"
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_types() {
        assert!(ForgeConfig::parse("[subbuild]\njobs = \"many\"").is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(&path, "[toolchain]\nname = \"msvc\"\n").unwrap();
        let config = ForgeConfig::load(&path).unwrap();
        assert_eq!(config.toolchain.name, "msvc");
        assert!(ForgeConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
