//! `depforge icu-data`

use anyhow::{Context as _, Result};
use tracing::info;

use depforge_core::icu::data_descriptor;
use depforge_core::pipeline::{IcuDataPipeline, ModuleLayout, PackageRequest};
use depforge_core::process::SystemRunner;
use depforge_core::toolchain::HostToolchain;
use depforge_schema::OutputKind;

use super::{Context, emit, parse_arch, parse_platform};

/// Build the packaging tools if needed, unpack the data archive and
/// package it for `output`, then print the `icudt` descriptor.
pub async fn icu_data(
    ctx: &Context,
    output: &str,
    platform: Option<&str>,
    arch: Option<&str>,
) -> Result<()> {
    let output: OutputKind = output.parse()?;
    let platform = parse_platform(platform)?;
    let arch = parse_arch(arch)?;

    let layout = ModuleLayout::new(&ctx.module_dir, platform);
    let request = PackageRequest::from_output(platform, arch, output, layout.contents_dir())?;
    let resolver = HostToolchain::discover(&ctx.config.toolchain, ctx.config.subbuild.clone());
    let reporter = ctx.reporter.clone();

    let task_layout = layout.clone();
    let task_request = request.clone();
    let artifacts = tokio::task::spawn_blocking(move || {
        IcuDataPipeline::new(task_layout, &resolver, &SystemRunner)
            .with_reporter(&*reporter)
            .run(&task_request)
    })
    .await
    .context("ICU data pipeline task panicked")?
    .context("Failed to package ICU data")?;

    info!(?artifacts, "ICU data packaged");
    emit(&*ctx.reporter, &data_descriptor(&layout, request.mode))
}
