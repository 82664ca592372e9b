//! Step execution for the ICU data pipeline.

use std::path::{Path, PathBuf};

use depforge_schema::{Arch, Endianness, OutputKind, PackageMode, Platform, SchemaError};
use tracing::{debug, info, warn};

use super::error::PipelineError;
use super::layout::{ICU_DATA_PACKAGE, ModuleLayout, manifest_path_for};
use crate::process::{ProcessRunner, ToolInvocation, ToolOutput, prepend_search_path};
use crate::reporter::{NullReporter, Reporter};
use crate::toolchain::ToolchainResolver;

/// A named on-disk artifact and the command that produces it.
///
/// Presence of `path` is the only completion signal; its contents are never
/// inspected.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    /// Tool or artifact name.
    pub name: String,
    /// Path whose existence marks the artifact as built.
    pub path: PathBuf,
    /// Command that produces `path` when it is missing.
    pub producer: ToolInvocation,
}

impl ArtifactSpec {
    /// Whether the artifact exists. Content is never inspected.
    pub fn is_present(&self) -> bool {
        self.path.exists()
    }
}

/// What to package and for which target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    /// Target platform.
    pub platform: Platform,
    /// Target architecture. Only passed to `pkgdata` for Windows DLLs.
    pub arch: Arch,
    /// How the data is bundled.
    pub mode: PackageMode,
    /// Directory holding the unpacked data resources.
    pub contents_dir: PathBuf,
}

impl PackageRequest {
    /// Build a request from the output kind a host asked for.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::UnsupportedOutput`] for `default` and
    /// `dynamic`, which have no data package mode.
    pub fn from_output(
        platform: Platform,
        arch: Arch,
        output: OutputKind,
        contents_dir: impl Into<PathBuf>,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            platform,
            arch,
            mode: PackageMode::try_from(output)?,
            contents_dir: contents_dir.into(),
        })
    }

    /// Arguments for `pkgdata`, in the order the tool expects them.
    pub fn packaging_args(
        &self,
        out_dir: &Path,
        temp_dir: &Path,
        manifest_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-c".to_string(),
            "-m".to_string(),
            self.mode.tool_flag().to_string(),
            "-v".to_string(),
            "-d".to_string(),
            out_dir.to_string_lossy().into_owned(),
            "-s".to_string(),
            self.contents_dir.to_string_lossy().into_owned(),
            "-p".to_string(),
            ICU_DATA_PACKAGE.to_string(),
            "-T".to_string(),
            temp_dir.to_string_lossy().into_owned(),
            "-L".to_string(),
            ICU_DATA_PACKAGE.to_string(),
        ];
        if self.platform == Platform::Windows && self.mode == PackageMode::Shared {
            args.push("-a".to_string());
            args.push(self.arch.as_str().to_string());
        }
        args.push(manifest_path.to_string_lossy().into_owned());
        args
    }
}

/// Files the packaging step left in the canonical binary directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedArtifacts {
    /// Static library, or the import library of a Windows DLL.
    pub static_lib: Option<PathBuf>,
    /// Shared library.
    pub shared_lib: Option<PathBuf>,
    /// Common `.dat` archive.
    pub common_data: Option<PathBuf>,
}

impl PackagedArtifacts {
    fn scan(layout: &ModuleLayout) -> Self {
        let present = |name: String| {
            let path = layout.binary_dir().join(name);
            path.exists().then_some(path)
        };
        Self {
            static_lib: present(layout.static_library_name()),
            shared_lib: present(layout.shared_library_name()),
            common_data: present(layout.common_data_name()),
        }
    }
}

/// Drives `icupkg` and `pkgdata` to produce the ICU data library.
///
/// See the [module-level documentation](super) for step order and the
/// idempotence contract.
pub struct IcuDataPipeline<'a> {
    layout: ModuleLayout,
    resolver: &'a dyn ToolchainResolver,
    runner: &'a dyn ProcessRunner,
    reporter: &'a dyn Reporter,
    endianness: Endianness,
}

impl std::fmt::Debug for IcuDataPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcuDataPipeline")
            .field("layout", &self.layout)
            .field("toolchain", &self.resolver.name())
            .field("endianness", &self.endianness)
            .finish_non_exhaustive()
    }
}

impl<'a> IcuDataPipeline<'a> {
    /// A pipeline over `layout` using the host byte order and no progress output.
    pub fn new(
        layout: ModuleLayout,
        resolver: &'a dyn ToolchainResolver,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            layout,
            resolver,
            runner,
            reporter: &NullReporter,
            endianness: Endianness::host(),
        }
    }

    /// Send progress to `reporter`.
    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Override the host byte order when selecting the data archive.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Paths this pipeline reads and writes.
    pub fn layout(&self) -> &ModuleLayout {
        &self.layout
    }

    /// Run every step in order and return the packaged files.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; later steps do not run.
    pub fn run(&self, request: &PackageRequest) -> Result<PackagedArtifacts, PipelineError> {
        self.reporter.section("icu-data");
        info!(
            module = %self.layout.root().display(),
            platform = %request.platform,
            arch = %request.arch,
            mode = %request.mode,
            "running icu data pipeline"
        );

        let icupkg = self.ensure_tool("icupkg")?;
        let data_file = self.layout.data_file(self.endianness);
        self.unpack_contents(&icupkg, &data_file, &self.layout.contents_dir())?;
        let pkgdata = self.ensure_tool("pkgdata")?;
        self.package_artifact(&pkgdata, request, &self.layout.manifest_path())
    }

    /// The artifact spec for a prerequisite tool.
    pub fn tool_spec(&self, tool: &str) -> ArtifactSpec {
        ArtifactSpec {
            name: tool.to_string(),
            path: self.layout.tool_path(tool),
            producer: self
                .resolver
                .sub_build(tool, &self.layout.tool_descriptor(tool)),
        }
    }

    /// Make sure `tool` is built, running its sub-build if the binary is missing.
    ///
    /// # Errors
    ///
    /// [`PipelineError::BuildToolFailure`] when the sub-build exits non-zero,
    /// [`PipelineError::ToolMissing`] when it succeeds without producing the binary.
    pub fn ensure_tool(&self, tool: &str) -> Result<PathBuf, PipelineError> {
        let spec = self.tool_spec(tool);
        if spec.is_present() {
            debug!(tool, path = %spec.path.display(), "tool already built");
            self.reporter.skipped(tool, "already built");
            return Ok(spec.path);
        }

        info!(tool, "tool not found, running sub-build");
        self.reporter.step(tool, "building");
        let output = self.invoke(&spec.producer)?;
        self.write_build_log(tool, &output)?;
        self.reporter.tool_output(tool, &output.stdout);

        if !output.success() {
            self.reporter.failed(tool, &format!("exit code {}", output.exit_code));
            return Err(PipelineError::BuildToolFailure {
                tool: tool.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        if !spec.is_present() {
            return Err(PipelineError::ToolMissing {
                tool: tool.to_string(),
                path: spec.path,
            });
        }

        self.reporter.done(tool, "built");
        Ok(spec.path)
    }

    /// Unpack `data_file` into `dest_dir` with `icupkg` and persist the listing.
    ///
    /// `data_file` is resolved against the module root. Returns the manifest
    /// text, or `None` when `dest_dir` already exists and nothing ran.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnpackFailure`] when `icupkg` exits non-zero,
    /// [`PipelineError::Spawn`] when it cannot be started, or an IO error
    /// writing the manifest. In every case the freshly created `dest_dir`
    /// is removed again so the next run retries.
    pub fn unpack_contents(
        &self,
        icupkg: &Path,
        data_file: &Path,
        dest_dir: &Path,
    ) -> Result<Option<String>, PipelineError> {
        if dest_dir.exists() {
            debug!(dest = %dest_dir.display(), "contents already unpacked");
            self.reporter.skipped("unpack", "data already unpacked");
            return Ok(None);
        }

        self.reporter.step("unpack", &data_file.display().to_string());
        std::fs::create_dir_all(dest_dir)?;

        match self.run_unpack(icupkg, data_file, dest_dir) {
            Ok(stdout) => {
                self.reporter.done("unpack", &manifest_path_for(dest_dir).display().to_string());
                Ok(Some(stdout))
            }
            Err(err) => {
                if let Err(e) = std::fs::remove_dir_all(dest_dir) {
                    warn!(dest = %dest_dir.display(), error = %e, "failed to clean up unpack directory");
                }
                self.reporter.failed("unpack", &err.to_string());
                Err(err)
            }
        }
    }

    /// Run `icupkg` and persist its listing. Any error leaves `dest_dir`
    /// for the caller to remove.
    fn run_unpack(&self, icupkg: &Path, data_file: &Path, dest_dir: &Path) -> Result<String, PipelineError> {
        let invocation = ToolInvocation::new(icupkg)
            .arg("-d")
            .arg(dest_dir)
            .args(["-x", "*", "-l"])
            .arg(data_file)
            .current_dir(self.layout.root());
        let output = self.invoke(&invocation)?;

        if !output.success() {
            return Err(PipelineError::UnpackFailure {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let manifest_path = manifest_path_for(dest_dir);
        std::fs::write(&manifest_path, &output.stdout)?;
        info!(manifest = %manifest_path.display(), entries = output.stdout.lines().count(), "wrote manifest");
        Ok(output.stdout)
    }

    /// Package the unpacked contents with `pkgdata` and move the result into
    /// the canonical binary directory.
    ///
    /// Skipped entirely when the output for `request.mode` already exists.
    ///
    /// # Errors
    ///
    /// [`PipelineError::PackagingFailure`] when `pkgdata` exits non-zero. No
    /// file is moved in that case.
    pub fn package_artifact(
        &self,
        pkgdata: &Path,
        request: &PackageRequest,
        manifest_path: &Path,
    ) -> Result<PackagedArtifacts, PipelineError> {
        let final_output = self.layout.final_output(request.mode);
        if final_output.exists() {
            debug!(output = %final_output.display(), "data library already packaged");
            self.reporter.skipped("package", "data library already built");
            return Ok(PackagedArtifacts::scan(&self.layout));
        }

        self.reporter.step("package", request.mode.as_str());
        let out_dir = self.layout.tool_output_dir();
        let temp_dir = self.layout.packaging_temp_dir();
        std::fs::create_dir_all(&out_dir)?;
        std::fs::create_dir_all(&temp_dir)?;

        let mut prepend: Vec<PathBuf> = Vec::new();
        if let Some(compiler_dir) = self
            .resolver
            .compiler_path()
            .and_then(|c| c.parent().map(Path::to_path_buf))
        {
            prepend.push(compiler_dir);
        }
        if let Some(tool_dir) = pkgdata.parent() {
            prepend.push(tool_dir.to_path_buf());
        }
        let prepend: Vec<&Path> = prepend.iter().map(PathBuf::as_path).collect();
        let search_path = prepend_search_path(&prepend, self.resolver.search_path().as_deref());
        debug!(path = ?search_path, "packaging search path");

        let invocation = ToolInvocation::new(pkgdata)
            .args(request.packaging_args(&out_dir, &temp_dir, manifest_path))
            .current_dir(self.layout.root())
            .env("PATH", search_path);
        let output = self.invoke(&invocation)?;
        self.reporter.tool_output("pkgdata", &output.stdout);

        if !output.success() {
            self.reporter.failed("package", &format!("exit code {}", output.exit_code));
            return Err(PipelineError::PackagingFailure {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        if !output.stderr.is_empty() {
            self.reporter.tool_output("pkgdata", &output.stderr);
        }

        let artifacts = self.relocate_outputs(&request.contents_dir)?;
        if !final_output.exists() {
            warn!(
                expected = %final_output.display(),
                "pkgdata succeeded but the expected output was not found"
            );
        }
        self.reporter.done("package", &self.layout.binary_dir().display().to_string());
        Ok(artifacts)
    }

    /// Move produced files into the binary directory, overwriting.
    fn relocate_outputs(&self, contents_dir: &Path) -> Result<PackagedArtifacts, PipelineError> {
        let binary_dir = self.layout.binary_dir();
        std::fs::create_dir_all(&binary_dir)?;

        let search_dirs = [self.layout.tool_output_dir(), contents_dir.to_path_buf()];
        let mut artifacts = PackagedArtifacts::default();

        for (canonical, slot) in [
            (self.layout.static_library_name(), &mut artifacts.static_lib),
            (self.layout.shared_library_name(), &mut artifacts.shared_lib),
            (self.layout.common_data_name(), &mut artifacts.common_data),
        ] {
            let bare = canonical
                .strip_prefix(self.layout.platform().library_prefix())
                .unwrap_or(canonical.as_str())
                .to_string();
            let Some(source) = search_dirs
                .iter()
                .flat_map(|dir| [dir.join(&canonical), dir.join(&bare)])
                .find(|p| p.is_file())
            else {
                continue;
            };
            let dest = binary_dir.join(&canonical);
            move_file(&source, &dest)?;
            debug!(from = %source.display(), to = %dest.display(), "relocated");
            *slot = Some(dest);
        }

        Ok(artifacts)
    }

    fn invoke(&self, invocation: &ToolInvocation) -> Result<ToolOutput, PipelineError> {
        debug!(command = %invocation.display(), "invoking");
        self.runner
            .run(invocation)
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })
    }

    fn write_build_log(&self, tool: &str, output: &ToolOutput) -> Result<(), PipelineError> {
        let log_dir = self.layout.log_dir();
        std::fs::create_dir_all(&log_dir)?;
        let log_path = log_dir.join(crate::paths::build_log_name(tool));
        std::fs::write(
            &log_path,
            format!(
                "exit code: {}\n--- stdout ---\n{}\n--- stderr ---\n{}\n",
                output.exit_code, output.stdout, output.stderr
            ),
        )?;
        debug!(log = %log_path.display(), "wrote sub-build log");
        Ok(())
    }
}

/// Move `src` to `dest`, replacing `dest`. Falls back to copy + delete when
/// a rename is not possible (e.g. across filesystems).
fn move_file(src: &Path, dest: &Path) -> std::io::Result<()> {
    if dest.exists() {
        std::fs::remove_file(dest)?;
    }
    if std::fs::rename(src, dest).is_err() {
        std::fs::copy(src, dest)?;
        std::fs::remove_file(src)?;
    }
    Ok(())
}
