//! depforge - prepares native third-party dependencies for a host build system
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Every subcommand works inside one module directory (`--module-dir`,
//! default `.`). Progress goes to stderr; module descriptors are printed to
//! stdout as JSON so the host build system can consume them directly.

pub mod cmd;
pub mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "depforge")]
#[command(author, version, about = "depforge - native dependency preparation")]
pub struct Cli {
    /// Path to a forge.toml configuration file
    #[arg(long, global = true, env = "DEPFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Module directory to operate in
    #[arg(long, global = true, default_value = ".")]
    pub module_dir: PathBuf,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Package ICU data into a static, shared or common data library
    IcuData {
        /// Requested output: static, shared or common
        #[arg(long, default_value = "common")]
        output: String,
        /// Target platform (defaults to the host)
        #[arg(long)]
        platform: Option<String>,
        /// Target architecture (defaults to the host)
        #[arg(long)]
        arch: Option<String>,
    },
    /// Download ICU sources and data and stage the public headers
    IcuSource,
    /// Emit the ICU umbrella module descriptor
    Icu {
        /// Linkage for the ICU libraries: static or shared
        #[arg(long, default_value = "static")]
        output: String,
        /// How ICU data is packaged: static, shared or common
        #[arg(long, default_value = "static")]
        data_mode: String,
        /// Do not stage ICU sources first
        #[arg(long)]
        skip_fetch: bool,
    },
    /// Resolve mimalloc build options into a module descriptor
    Mimalloc {
        /// Requested output: static, shared, default or dynamic
        #[arg(long, default_value = "static")]
        output: String,
        /// Target platform (defaults to the host)
        #[arg(long)]
        platform: Option<String>,
        /// Target architecture (defaults to the host)
        #[arg(long)]
        arch: Option<String>,
        /// Toolchain name (defaults to the configured toolchain)
        #[arg(long)]
        toolchain: Option<String>,
        /// Do not download the mimalloc sources
        #[arg(long)]
        skip_fetch: bool,
    },
}
