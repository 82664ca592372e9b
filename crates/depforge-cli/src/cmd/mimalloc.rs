//! `depforge mimalloc`

use anyhow::{Context as _, Result};

use depforge_core::Reporter;
use depforge_core::io::fetch::FetchRequest;
use depforge_core::mimalloc::{
    BuildTarget, MIMALLOC_SOURCE_ROOT, MIMALLOC_SOURCE_URL, SystemHost, resolve,
};
use depforge_schema::OutputKind;

use super::{Context, emit, parse_arch, parse_platform};

/// Fetch the pinned mimalloc release (unless skipped) and print the
/// resolved descriptor for the configured options.
pub async fn mimalloc(
    ctx: &Context,
    output: &str,
    platform: Option<&str>,
    arch: Option<&str>,
    toolchain: Option<&str>,
    skip_fetch: bool,
) -> Result<()> {
    let output: OutputKind = output.parse()?;
    let toolchain = toolchain.unwrap_or(&ctx.config.toolchain.name);
    let target = BuildTarget::new(parse_platform(platform)?, parse_arch(arch)?, toolchain, output);

    let source_dir = ctx.module_dir.join("source");
    if !skip_fetch {
        ctx.reporter.section("mimalloc");
        let client = ctx.http_client()?;
        FetchRequest::new(&client, MIMALLOC_SOURCE_URL, &source_dir)
            .with_reporter(&*ctx.reporter)
            .execute()
            .await
            .context("Failed to fetch mimalloc sources")?;
    }

    let descriptor = resolve(
        &ctx.config.mimalloc,
        &target,
        &source_dir.join(MIMALLOC_SOURCE_ROOT),
        &SystemHost::default(),
    );
    emit(&*ctx.reporter, &descriptor)
}
