//! Declarative rule tables for mimalloc resolution.

use depforge_schema::{Arch, Platform};

use super::{BuildTarget, HostInfo, MimallocOptions};
use crate::descriptor::{Diagnostic, Severity};

/// Compiler families recognized from a toolchain name (case-insensitive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ToolchainFamily {
    pub clang: bool,
    pub gcc: bool,
    pub intel: bool,
    pub intel_llvm: bool,
    pub msvc: bool,
    pub mingw: bool,
}

impl ToolchainFamily {
    pub fn detect(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let intel = name.contains("intel");
        Self {
            clang: name.contains("clang"),
            gcc: name.contains("gcc") || name.contains("gnu"),
            intel,
            intel_llvm: intel && name.contains("llvm"),
            msvc: name.contains("msvc"),
            mingw: name.contains("mingw"),
        }
    }

    /// GCC-style command line: clang, gcc or the classic Intel compiler.
    pub fn gnu_like(self) -> bool {
        self.clang || self.gcc || self.intel
    }
}

/// Everything a rule predicate can look at.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RuleContext<'a> {
    pub options: &'a MimallocOptions,
    pub target: &'a BuildTarget,
    pub family: ToolchainFamily,
}

impl RuleContext<'_> {
    fn platform(&self) -> Platform {
        self.target.platform
    }

    fn apple_override(&self) -> bool {
        self.platform() == Platform::Apple && self.options.override_malloc
    }

    fn gnu_tls(&self) -> bool {
        self.family.gnu_like() && self.platform() != Platform::Haiku
    }
}

/// One row of a rule table: when `when` holds, everything listed is added.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Rule {
    pub when: fn(&RuleContext<'_>) -> bool,
    /// Public definitions.
    pub defines: &'static [&'static str],
    pub private_defines: &'static [&'static str],
    pub compiler_options: &'static [&'static str],
    /// Only added for static and default outputs.
    pub static_options: &'static [&'static str],
    /// Only added for shared and dynamic outputs.
    pub dynamic_options: &'static [&'static str],
    pub libraries: &'static [&'static str],
    pub sources: &'static [&'static str],
    pub info: Option<&'static str>,
    pub warning: Option<&'static str>,
}

const EMPTY: Rule = Rule {
    when: |_| false,
    defines: &[],
    private_defines: &[],
    compiler_options: &[],
    static_options: &[],
    dynamic_options: &[],
    libraries: &[],
    sources: &[],
    info: None,
    warning: None,
};

/// Option-driven definitions, flags, libraries and sources.
pub(crate) static OPTION_RULES: &[Rule] = &[
    Rule {
        when: |c| c.apple_override() && c.options.osx_zone,
        defines: &["MI_OSX_ZONE=1"],
        sources: &["src/prim/osx/alloc-override-zone.c"],
        ..EMPTY
    },
    Rule {
        when: |c| c.apple_override() && c.options.osx_zone && !c.options.osx_interpose,
        warning: Some("Zone overriding usually also needs interpose (enable osx_interpose)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.apple_override() && c.options.osx_interpose,
        defines: &["MI_OSX_INTERPOSE=1"],
        info: Some("Use interpose to override malloc (osx_interpose is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.apple_override() && c.options.osx_interpose && !c.options.osx_zone,
        warning: Some("Interpose usually also needs zone overriding (enable osx_zone)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.apple_override() && c.options.osx_interpose && c.options.use_cxx,
        warning: Some(
            "If dynamically overriding malloc/free, it is more reliable to build mimalloc as C code (disable use_cxx).",
        ),
        ..EMPTY
    },
    Rule {
        when: |c| c.platform() == Platform::Windows && !c.options.windows_redirect,
        defines: &["MI_WIN_NOREDIRECT=1"],
        ..EMPTY
    },
    Rule {
        when: |c| c.options.secure,
        defines: &["MI_SECURE=4"],
        info: Some("Set full secure build (secure is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.track_valgrind,
        defines: &["MI_TRACK_VALGRIND=1"],
        info: Some("Enable Valgrind support (track_valgrind is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.track_asan,
        defines: &["MI_TRACK_ASAN=1"],
        compiler_options: &["-fsanitize=address"],
        libraries: &["-fsanitize=address"],
        info: Some("Compile with address sanitizer support (track_asan is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.track_etw,
        defines: &["MI_TRACK_ETW=1"],
        info: Some("Compile with Windows event tracing support (track_etw is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.guarded,
        defines: &["MI_GUARDED=1"],
        info: Some("Compile guard pages behind certain object allocations (guarded is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.skip_collect_on_exit,
        defines: &["MI_SKIP_COLLECT_ON_EXIT=1"],
        info: Some("Skip collecting memory on program exit (skip_collect_on_exit is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.no_padding,
        defines: &["MI_PADDING=0"],
        info: Some("Suppress any padding of heap blocks (no_padding is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.padding && !c.options.no_padding,
        defines: &["MI_PADDING=1"],
        info: Some("Enable explicit padding of heap blocks (padding is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.xmalloc,
        defines: &["MI_XMALLOC=1"],
        info: Some("Enable abort() calls on memory allocation failure (xmalloc is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.show_errors,
        defines: &["MI_SHOW_ERRORS=1"],
        info: Some("Enable printing of error and warning messages by default (show_errors is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.use_cxx,
        info: Some("Use the C++ compiler to compile (use_cxx is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.libc_musl,
        defines: &["MI_LIBC_MUSL=1"],
        info: Some("Assume using musl libc (libc_musl is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.options.windows_use_fixed_tls,
        defines: &["MI_WIN_USE_FIXED_TLS=1"],
        info: Some("Use a fixed TLS slot on Windows (windows_use_fixed_tls is enabled)."),
        ..EMPTY
    },
];

/// Compiler flags keyed on the toolchain family.
pub(crate) static TOOLCHAIN_RULES: &[Rule] = &[
    Rule {
        when: |c| c.options.use_cxx && c.family.clang,
        compiler_options: &["-Wno-deprecated"],
        ..EMPTY
    },
    Rule {
        when: |c| c.options.use_cxx && c.family.intel && !c.family.intel_llvm,
        compiler_options: &["-Kc++"],
        ..EMPTY
    },
    Rule {
        when: |c| c.family.clang || c.family.gcc,
        compiler_options: &["-Wno-unknown-pragmas", "-fvisibility=hidden"],
        ..EMPTY
    },
    Rule {
        when: |c| (c.family.clang || c.family.gcc) && !c.options.use_cxx,
        compiler_options: &["-Wstrict-prototypes"],
        ..EMPTY
    },
    Rule {
        when: |c| c.family.clang,
        compiler_options: &["-Wno-static-in-inline"],
        ..EMPTY
    },
    Rule {
        when: |c| c.family.intel && !c.family.intel_llvm,
        compiler_options: &["-fvisibility=hidden"],
        ..EMPTY
    },
    Rule {
        when: |c| c.gnu_tls() && c.options.local_dynamic_tls,
        compiler_options: &["-ftls-model=local-dynamic"],
        ..EMPTY
    },
    Rule {
        when: |c| c.gnu_tls() && !c.options.local_dynamic_tls && c.options.libc_musl,
        static_options: &["-ftls-model=local-dynamic"],
        dynamic_options: &["-ftls-model=initial-exec"],
        info: Some("Use local dynamic TLS for the static build (since libc_musl is enabled)."),
        ..EMPTY
    },
    Rule {
        when: |c| c.gnu_tls() && !c.options.local_dynamic_tls && !c.options.libc_musl,
        compiler_options: &["-ftls-model=initial-exec"],
        ..EMPTY
    },
    Rule {
        when: |c| c.gnu_tls() && c.options.override_malloc,
        compiler_options: &["-fno-builtin-malloc"],
        ..EMPTY
    },
    Rule {
        when: |c| c.family.msvc,
        compiler_options: &["/Zc:__cplusplus"],
        ..EMPTY
    },
    Rule {
        when: |c| c.family.mingw,
        private_defines: &["_WIN32_WINNT=0x0600"],
        ..EMPTY
    },
];

/// Architecture optimization flags for the target, if any apply.
pub(crate) fn arch_optimization_flags(ctx: &RuleContext<'_>) -> &'static [&'static str] {
    if !ctx.options.optimize_for_arch || ctx.target.arch != Arch::Arm64 {
        return &[];
    }
    if ctx.family.msvc {
        return &["/arch:armv8.1"];
    }
    if !ctx.gnu_tls() {
        return &[];
    }
    if ctx.platform() == Platform::Apple && ctx.family.clang {
        &["-Xarch_arm64", "-march=armv8.1-a"]
    } else {
        &["-march=armv8.1-a"]
    }
}

/// System libraries linked privately.
pub(crate) fn platform_libraries(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows => &["psapi.lib", "shell32.lib", "user32.lib", "advapi32.lib", "bcrypt.lib"],
        _ => &["libpthread.so", "librt.so", "libatomic.so"],
    }
}

/// Base name of the prebuilt redirect library shipped in `bin/`.
pub(crate) fn redirect_library_name(arch: Arch) -> String {
    match arch {
        Arch::X64 => "mimalloc-redirect".to_string(),
        Arch::X86 => "mimalloc-redirect32".to_string(),
        other => format!("mimalloc-redirect-{}", other.as_str()),
    }
}

/// Switch off options that cannot take effect on this target or host.
///
/// Returns the effective options together with the diagnostics explaining
/// each change. Every rule is applied at most once, in a fixed order.
pub(crate) fn normalize(
    options: &MimallocOptions,
    target: &BuildTarget,
    host: &dyn HostInfo,
) -> (MimallocOptions, Vec<Diagnostic>) {
    let mut opts = options.clone();
    let mut notes = Vec::new();
    let mut warn = |msg: &str| notes.push(diag(Severity::Warning, msg));

    if target.arch == Arch::Arm64 {
        opts.optimize_for_arch = true;
    }

    if opts.track_valgrind
        && !(host.include_exists("valgrind/valgrind.h") && host.include_exists("valgrind/memcheck.h"))
    {
        opts.track_valgrind = false;
        warn("Cannot find 'valgrind/valgrind.h' and 'valgrind/memcheck.h'; disabling Valgrind support (track_valgrind=off).");
    }

    if opts.track_asan && target.platform == Platform::Apple && opts.override_malloc {
        opts.track_asan = false;
        warn("Cannot enable address sanitizer support on macOS when overriding malloc (track_asan=off).");
    }
    if opts.track_asan && opts.track_valgrind {
        opts.track_asan = false;
        warn("Cannot enable address sanitizer support with Valgrind support enabled (track_asan=off).");
    }
    if opts.track_asan && !host.include_exists("sanitizer/asan_interface.h") {
        opts.track_asan = false;
        warn("Cannot find 'sanitizer/asan_interface.h'; compiling without address sanitizer support (track_asan=off).");
    }

    if opts.track_etw && target.platform != Platform::Windows {
        opts.track_etw = false;
        warn("Can only enable ETW support on Windows (track_etw=off).");
    }
    if opts.track_etw && (opts.track_valgrind || opts.track_asan) {
        opts.track_etw = false;
        warn("Cannot enable ETW support with Valgrind or ASan support enabled (track_etw=off).");
    }

    if opts.guarded && !opts.no_padding {
        opts.no_padding = true;
        notes.push(diag(
            Severity::Info,
            "Disabling padding due to guard pages (no_padding=on).",
        ));
    }

    (opts, notes)
}

fn diag(severity: Severity, message: &str) -> Diagnostic {
    Diagnostic {
        severity,
        message: message.to_string(),
    }
}
