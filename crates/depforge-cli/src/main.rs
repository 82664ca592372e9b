//! depforge CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use depforge_cli::cmd::{self, Context};
use depforge_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.config.as_deref(), cli.module_dir, cli.quiet)?;

    match cli.command {
        Commands::IcuData {
            output,
            platform,
            arch,
        } => cmd::icu_data::icu_data(&ctx, &output, platform.as_deref(), arch.as_deref()).await,
        Commands::IcuSource => cmd::icu::icu_source(&ctx).await,
        Commands::Icu {
            output,
            data_mode,
            skip_fetch,
        } => cmd::icu::icu(&ctx, &output, &data_mode, skip_fetch).await,
        Commands::Mimalloc {
            output,
            platform,
            arch,
            toolchain,
            skip_fetch,
        } => {
            cmd::mimalloc::mimalloc(
                &ctx,
                &output,
                platform.as_deref(),
                arch.as_deref(),
                toolchain.as_deref(),
                skip_fetch,
            )
            .await
        }
    }
}
