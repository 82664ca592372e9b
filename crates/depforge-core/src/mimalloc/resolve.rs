use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use depforge_schema::{Arch, OutputKind, Platform};

use super::rules::{
    self, OPTION_RULES, Rule, RuleContext, TOOLCHAIN_RULES, ToolchainFamily, arch_optimization_flags,
};
use super::{BuildTarget, CORE_SOURCES, HostInfo, MimallocOptions};
use crate::descriptor::{AdditionalDependency, LanguageStandard, ModuleDescriptor, ModuleKind};

static SV39_MMU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^mmu[ \t]+:[ \t]+sv39\s*$").unwrap());

/// Collected compile inputs before they are split by output kind.
#[derive(Debug, Default)]
struct Accumulator {
    defines: Vec<String>,
    private_defines: Vec<String>,
    compiler_options: Vec<String>,
    static_options: Vec<String>,
    dynamic_options: Vec<String>,
    libraries: Vec<String>,
    sources: Vec<&'static str>,
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, items: impl IntoIterator<Item = T>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

fn owned(items: &[&str]) -> impl Iterator<Item = String> {
    items.iter().map(|s| (*s).to_string())
}

impl Accumulator {
    fn apply(&mut self, rule: &Rule, desc: &mut ModuleDescriptor) {
        extend_unique(&mut self.defines, owned(rule.defines));
        extend_unique(&mut self.private_defines, owned(rule.private_defines));
        extend_unique(&mut self.compiler_options, owned(rule.compiler_options));
        extend_unique(&mut self.static_options, owned(rule.static_options));
        extend_unique(&mut self.dynamic_options, owned(rule.dynamic_options));
        extend_unique(&mut self.libraries, owned(rule.libraries));
        extend_unique(&mut self.sources, rule.sources.iter().copied());
        if let Some(msg) = rule.info {
            desc.info(msg);
        }
        if let Some(msg) = rule.warning {
            desc.warning(msg);
        }
    }
}

/// Resolve mimalloc build options into a module descriptor.
///
/// `source_root` is the extracted release directory (containing `src/`
/// and `include/`). Options are normalized first; the returned
/// descriptor carries every diagnostic produced along the way.
pub fn resolve(
    options: &MimallocOptions,
    target: &BuildTarget,
    source_root: &Path,
    host: &dyn HostInfo,
) -> ModuleDescriptor {
    let kind = if target.output.is_shared() {
        ModuleKind::SharedLibrary
    } else {
        ModuleKind::StaticLibrary
    };
    let mut desc = ModuleDescriptor::new("mimalloc", kind);
    desc.output_directory = Some("Binaries/mimalloc".to_string());

    let (opts, notes) = rules::normalize(options, target, host);
    desc.diagnostics.extend(notes);

    let ctx = RuleContext {
        options: &opts,
        target,
        family: ToolchainFamily::detect(&target.toolchain),
    };
    let mut acc = Accumulator::default();

    for rule in OPTION_RULES.iter().chain(TOOLCHAIN_RULES) {
        if (rule.when)(&ctx) {
            acc.apply(rule, &mut desc);
        }
    }

    if host.cpuinfo().is_some_and(|info| SV39_MMU.is_match(&info)) {
        desc.info("Set virtual address bits to 39 (SV39 MMU detected).");
        extend_unique(&mut acc.defines, ["MI_DEFAULT_VIRTUAL_ADDRESS_BITS=39".to_string()]);
    }

    let arch_flags = arch_optimization_flags(&ctx);
    if !arch_flags.is_empty() {
        desc.info(format!(
            "Architecture specific optimization is enabled (with {}) (optimize_for_arch is enabled).",
            arch_flags.join(" ")
        ));
        extend_unique(&mut acc.compiler_options, owned(arch_flags));
    }

    extend_unique(&mut acc.libraries, owned(rules::platform_libraries(target.platform)));

    apply_output_kind(&opts, target, &mut acc, &mut desc);
    apply_windows_redirect(&opts, target, source_root, &mut desc);

    desc.sources = CORE_SOURCES
        .iter()
        .chain(acc.sources.iter())
        .map(|s| source_root.join(s))
        .collect();
    desc.language = Some(if opts.use_cxx {
        LanguageStandard::Cpp17
    } else {
        LanguageStandard::C11
    });
    for define in acc.defines {
        desc.definitions.add_public(define);
    }
    desc.includes.add_public(source_root.join("include"));
    desc.includes.add_private(source_root.join("src"));

    debug!(
        platform = target.platform.as_str(),
        arch = target.arch.as_str(),
        toolchain = %target.toolchain,
        output = %target.output,
        diagnostics = desc.diagnostics.len(),
        "resolved mimalloc module"
    );
    desc
}

fn apply_output_kind(
    opts: &MimallocOptions,
    target: &BuildTarget,
    acc: &mut Accumulator,
    desc: &mut ModuleDescriptor,
) {
    let mut options = std::mem::take(&mut acc.compiler_options);
    match target.output {
        OutputKind::Shared | OutputKind::Dynamic => {
            desc.definitions.add_public("MI_SHARED_LIB=1");
            desc.definitions.add_private("MI_SHARED_LIB_EXPORT=1");
            extend_unique(&mut options, acc.dynamic_options.drain(..));
            if opts.override_malloc {
                desc.definitions.add_private("MI_MALLOC_OVERRIDE=1");
            }
        }
        OutputKind::Static | OutputKind::Default => {
            desc.definitions.add_public("MI_STATIC_LIB=1");
            extend_unique(&mut options, acc.static_options.drain(..));
        }
        OutputKind::Common => {}
    }
    desc.compiler_options = options;

    for lib in acc.libraries.drain(..) {
        desc.libraries.add_private(lib);
    }
    for define in acc.private_defines.drain(..) {
        desc.definitions.add_private(define);
    }
    if target.platform != Platform::Windows && opts.override_malloc {
        desc.definitions.add_private("MI_MALLOC_OVERRIDE=1");
    }
}

fn apply_windows_redirect(
    opts: &MimallocOptions,
    target: &BuildTarget,
    source_root: &Path,
    desc: &mut ModuleDescriptor,
) {
    if target.platform != Platform::Windows || !opts.override_malloc {
        return;
    }
    if target.arch == Arch::X64 && target.host_arch == Some(Arch::Arm64) {
        desc.warning(
            "x64 code emulated on Windows for arm64 should use an arm64ec build of 'mimalloc.dll' \
             together with 'mimalloc-redirect-arm64ec.dll'. See 'bin/readme.md' for more information.",
        );
    }

    let name = rules::redirect_library_name(target.arch);
    let bin = source_root.join("bin");
    desc.libraries
        .add_private(bin.join(format!("{name}.lib")).to_string_lossy().into_owned());
    desc.additional_dependencies.push(AdditionalDependency {
        source: bin.join(format!("{name}.dll")),
        target: format!("${{RuntimeDir}}/{name}.dll"),
    });
}

#[cfg(test)]
mod tests {
    use super::super::rules::tests::{FakeHost, all_headers};
    use super::*;
    use std::path::PathBuf;

    fn root() -> PathBuf {
        PathBuf::from("/m/source/mimalloc-3.1.5")
    }

    fn resolve_for(opts: &MimallocOptions, target: &BuildTarget) -> ModuleDescriptor {
        resolve(opts, target, &root(), &all_headers())
    }

    #[test]
    fn test_linux_static_defaults() {
        let target = BuildTarget::new(Platform::Linux, Arch::X64, "gcc", OutputKind::Static);
        let desc = resolve_for(&MimallocOptions::default(), &target);

        assert_eq!(desc.kind, ModuleKind::StaticLibrary);
        assert_eq!(desc.language, Some(LanguageStandard::C11));
        assert_eq!(desc.sources.len(), CORE_SOURCES.len());
        assert_eq!(desc.sources[0], root().join("src/alloc.c"));
        assert_eq!(desc.definitions.public, vec!["MI_STATIC_LIB=1"]);
        assert_eq!(desc.definitions.private, vec!["MI_MALLOC_OVERRIDE=1"]);
        assert_eq!(
            desc.compiler_options,
            vec![
                "-Wno-unknown-pragmas",
                "-fvisibility=hidden",
                "-Wstrict-prototypes",
                "-ftls-model=initial-exec",
                "-fno-builtin-malloc",
            ]
        );
        assert_eq!(desc.libraries.private, vec!["libpthread.so", "librt.so", "libatomic.so"]);
        assert_eq!(desc.includes.public, vec![root().join("include")]);
        assert_eq!(desc.includes.private, vec![root().join("src")]);
        assert!(desc.additional_dependencies.is_empty());
    }

    #[test]
    fn test_shared_override_defines_once() {
        let target = BuildTarget::new(Platform::Linux, Arch::X64, "clang", OutputKind::Shared);
        let desc = resolve_for(&MimallocOptions::default(), &target);

        assert_eq!(desc.kind, ModuleKind::SharedLibrary);
        assert!(desc.definitions.public.contains(&"MI_SHARED_LIB=1".to_string()));
        let overrides = desc
            .definitions
            .private
            .iter()
            .filter(|d| *d == "MI_MALLOC_OVERRIDE=1")
            .count();
        assert_eq!(overrides, 1);
        assert!(desc.definitions.private.contains(&"MI_SHARED_LIB_EXPORT=1".to_string()));
        assert!(desc.compiler_options.contains(&"-Wno-static-in-inline".to_string()));
    }

    #[test]
    fn test_musl_splits_tls_model_by_output() {
        let opts = MimallocOptions {
            libc_musl: true,
            ..MimallocOptions::default()
        };
        let stat = resolve_for(&opts, &BuildTarget::new(Platform::Linux, Arch::X64, "gcc", OutputKind::Static));
        assert!(stat.compiler_options.contains(&"-ftls-model=local-dynamic".to_string()));
        assert!(!stat.compiler_options.contains(&"-ftls-model=initial-exec".to_string()));

        let shared = resolve_for(&opts, &BuildTarget::new(Platform::Linux, Arch::X64, "gcc", OutputKind::Shared));
        assert!(shared.compiler_options.contains(&"-ftls-model=initial-exec".to_string()));
        assert!(shared.definitions.public.contains(&"MI_LIBC_MUSL=1".to_string()));
    }

    #[test]
    fn test_windows_redirect_dependency() {
        let target = BuildTarget::new(Platform::Windows, Arch::X64, "msvc", OutputKind::Static)
            .with_host_arch(Arch::X64);
        let desc = resolve_for(&MimallocOptions::default(), &target);

        assert!(desc.compiler_options.contains(&"/Zc:__cplusplus".to_string()));
        assert!(desc.libraries.private.contains(&"bcrypt.lib".to_string()));
        let redirect = root().join("bin").join("mimalloc-redirect.lib");
        assert!(desc.libraries.private.contains(&redirect.to_string_lossy().into_owned()));
        assert_eq!(desc.additional_dependencies.len(), 1);
        assert_eq!(desc.additional_dependencies[0].target, "${RuntimeDir}/mimalloc-redirect.dll");
        assert!(!desc.definitions.private.contains(&"MI_MALLOC_OVERRIDE=1".to_string()));
        assert_eq!(desc.warnings().count(), 0);
    }

    #[test]
    fn test_windows_without_redirect() {
        let opts = MimallocOptions {
            windows_redirect: false,
            override_malloc: false,
            ..MimallocOptions::default()
        };
        let target = BuildTarget::new(Platform::Windows, Arch::X86, "msvc", OutputKind::Static);
        let desc = resolve_for(&opts, &target);
        assert!(desc.definitions.public.contains(&"MI_WIN_NOREDIRECT=1".to_string()));
        assert!(desc.additional_dependencies.is_empty());
    }

    #[test]
    fn test_emulated_x64_on_arm64_warns() {
        let target = BuildTarget::new(Platform::Windows, Arch::X64, "msvc", OutputKind::Static)
            .with_host_arch(Arch::Arm64);
        let desc = resolve_for(&MimallocOptions::default(), &target);
        assert_eq!(desc.warnings().count(), 1);
    }

    #[test]
    fn test_unrecognized_host_is_not_treated_as_arm64() {
        let target = BuildTarget {
            host_arch: None,
            ..BuildTarget::new(Platform::Windows, Arch::X64, "msvc", OutputKind::Static)
        };
        let desc = resolve_for(&MimallocOptions::default(), &target);
        assert_eq!(desc.warnings().count(), 0);
        assert_eq!(desc.additional_dependencies.len(), 1);
    }

    #[test]
    fn test_apple_zone_and_interpose() {
        let target = BuildTarget::new(Platform::Apple, Arch::Arm64, "AppleClang", OutputKind::Static);
        let desc = resolve_for(&MimallocOptions::default(), &target);

        assert!(desc.sources.contains(&root().join("src/prim/osx/alloc-override-zone.c")));
        assert!(desc.definitions.public.contains(&"MI_OSX_ZONE=1".to_string()));
        assert!(desc.definitions.public.contains(&"MI_OSX_INTERPOSE=1".to_string()));
        let opts = &desc.compiler_options;
        let xarch = opts.iter().position(|o| o == "-Xarch_arm64").unwrap();
        assert_eq!(opts[xarch + 1], "-march=armv8.1-a");

        let lonely_zone = MimallocOptions {
            osx_interpose: false,
            ..MimallocOptions::default()
        };
        let desc = resolve_for(&lonely_zone, &target);
        assert_eq!(desc.warnings().count(), 1);
    }

    #[test]
    fn test_guarded_emits_no_padding() {
        let opts = MimallocOptions {
            guarded: true,
            padding: true,
            ..MimallocOptions::default()
        };
        let desc = resolve_for(&opts, &BuildTarget::new(Platform::Linux, Arch::X64, "gcc", OutputKind::Static));
        let public = &desc.definitions.public;
        assert!(public.contains(&"MI_GUARDED=1".to_string()));
        assert!(public.contains(&"MI_PADDING=0".to_string()));
        assert!(!public.contains(&"MI_PADDING=1".to_string()));
    }

    #[test]
    fn test_asan_adds_flags() {
        let opts = MimallocOptions {
            track_asan: true,
            ..MimallocOptions::default()
        };
        let desc = resolve_for(&opts, &BuildTarget::new(Platform::Linux, Arch::X64, "clang", OutputKind::Static));
        assert!(desc.definitions.public.contains(&"MI_TRACK_ASAN=1".to_string()));
        assert!(desc.compiler_options.contains(&"-fsanitize=address".to_string()));
        assert!(desc.libraries.private.contains(&"-fsanitize=address".to_string()));
    }

    #[test]
    fn test_use_cxx_switches_language() {
        let opts = MimallocOptions {
            use_cxx: true,
            ..MimallocOptions::default()
        };
        let desc = resolve_for(&opts, &BuildTarget::new(Platform::Linux, Arch::X64, "clang", OutputKind::Static));
        assert_eq!(desc.language, Some(LanguageStandard::Cpp17));
        assert!(desc.compiler_options.contains(&"-Wno-deprecated".to_string()));
        assert!(!desc.compiler_options.contains(&"-Wstrict-prototypes".to_string()));
    }

    #[test]
    fn test_sv39_detection() {
        let host = FakeHost {
            headers: vec![],
            cpuinfo: Some("processor\t: 0\nisa\t\t: rv64imafdc\nmmu\t\t: sv39\n"),
        };
        let target = BuildTarget::new(Platform::Linux, Arch::X64, "gcc", OutputKind::Static);
        let desc = resolve(&MimallocOptions::default(), &target, &root(), &host);
        assert!(
            desc.definitions
                .public
                .contains(&"MI_DEFAULT_VIRTUAL_ADDRESS_BITS=39".to_string())
        );

        let sv48 = FakeHost {
            headers: vec![],
            cpuinfo: Some("mmu\t\t: sv48\n"),
        };
        let desc = resolve(&MimallocOptions::default(), &target, &root(), &sv48);
        assert!(desc.definitions.public.iter().all(|d| !d.contains("VIRTUAL_ADDRESS")));
    }

    #[test]
    fn test_haiku_skips_tls_flags() {
        let target = BuildTarget::new(Platform::Haiku, Arch::X64, "gcc", OutputKind::Static);
        let desc = resolve_for(&MimallocOptions::default(), &target);
        assert!(desc.compiler_options.iter().all(|o| !o.starts_with("-ftls-model")));
        assert!(!desc.compiler_options.contains(&"-fno-builtin-malloc".to_string()));
    }
}
