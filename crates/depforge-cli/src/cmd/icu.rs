//! `depforge icu` and `depforge icu-source`

use anyhow::{Context as _, Result};

use depforge_core::Reporter;
use depforge_core::icu::{IcuSource, StagedSource, UmbrellaRequest, umbrella_descriptor};
use depforge_schema::{OutputKind, PackageMode};

use super::{Context, emit};

async fn stage(ctx: &Context) -> Result<StagedSource> {
    let client = ctx.http_client()?;
    IcuSource::new(&ctx.module_dir)
        .with_reporter(&*ctx.reporter)
        .stage(&client)
        .await
        .context("Failed to stage ICU sources")
}

/// Download ICU sources and data into the module directory.
pub async fn icu_source(ctx: &Context) -> Result<()> {
    let staged = stage(ctx).await?;
    ctx.reporter.info(&format!(
        "data: {}, headers copied: {}",
        staged.data_file.display(),
        staged.headers_copied
    ));
    Ok(())
}

/// Stage sources (unless skipped) and print the umbrella descriptor.
pub async fn icu(ctx: &Context, output: &str, data_mode: &str, skip_fetch: bool) -> Result<()> {
    let output: OutputKind = output.parse()?;
    let data_mode: PackageMode = data_mode.parse()?;
    let request = UmbrellaRequest::new(&ctx.module_dir, output).with_data_mode(data_mode);
    let descriptor = umbrella_descriptor(&request)?;

    if !skip_fetch {
        stage(ctx).await?;
    }
    emit(&*ctx.reporter, &descriptor)
}
