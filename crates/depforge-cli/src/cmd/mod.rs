//! Subcommand implementations.

pub mod icu;
pub mod icu_data;
pub mod mimalloc;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use depforge_core::Reporter;
use depforge_core::config::ForgeConfig;
use depforge_core::descriptor::{ModuleDescriptor, Severity};
use depforge_schema::{Arch, Platform};

use crate::ui::ConsoleReporter;

/// State shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: ForgeConfig,
    pub module_dir: PathBuf,
    pub reporter: Arc<ConsoleReporter>,
}

impl Context {
    pub fn load(config: Option<&Path>, module_dir: PathBuf, quiet: bool) -> Result<Self> {
        let config = ForgeConfig::load_or_default(config)?;
        let module_dir = std::path::absolute(&module_dir)
            .with_context(|| format!("Invalid module directory {}", module_dir.display()))?;
        Ok(Self {
            config,
            module_dir,
            reporter: Arc::new(ConsoleReporter::new(quiet)),
        })
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(depforge_core::USER_AGENT)
            .build()
            .context("Failed to build HTTP client")
    }
}

pub(crate) fn parse_platform(value: Option<&str>) -> Result<Platform> {
    value.map_or_else(|| Ok(Platform::current()), |v| Ok(v.parse::<Platform>()?))
}

pub(crate) fn parse_arch(value: Option<&str>) -> Result<Arch> {
    arch_or_host(value, Arch::current())
}

fn arch_or_host(value: Option<&str>, host: Option<Arch>) -> Result<Arch> {
    match value {
        Some(v) => Ok(v.parse::<Arch>()?),
        None => host.with_context(|| {
            format!(
                "Host architecture '{}' is not supported; pass --arch explicitly",
                std::env::consts::ARCH
            )
        }),
    }
}

/// Surface a descriptor's diagnostics, then print it to stdout as JSON.
pub(crate) fn emit(reporter: &dyn Reporter, descriptor: &ModuleDescriptor) -> Result<()> {
    for diag in &descriptor.diagnostics {
        match diag.severity {
            Severity::Info => reporter.info(&diag.message),
            Severity::Warning => reporter.warning(&diag.message),
        }
    }
    let json = descriptor.to_json().context("Failed to serialize descriptor")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_arch_wins_over_host() {
        assert_eq!(arch_or_host(Some("aarch64"), None).unwrap(), Arch::Arm64);
        assert_eq!(arch_or_host(Some("x86"), Some(Arch::X64)).unwrap(), Arch::X86);
    }

    #[test]
    fn test_unrecognized_host_arch_requires_flag() {
        let err = arch_or_host(None, None).unwrap_err();
        assert!(err.to_string().contains("pass --arch"), "{err}");
        assert_eq!(arch_or_host(None, Some(Arch::Arm)).unwrap(), Arch::Arm);
    }

    #[test]
    fn test_bad_arch_name_is_rejected() {
        assert!(arch_or_host(Some("sparc"), Some(Arch::X64)).is_err());
    }
}
