//! Declarative module output handed back to the host build system.

use serde::Serialize;
use std::path::PathBuf;

/// What kind of artifact a module produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    /// Objects archived into a static library.
    #[default]
    StaticLibrary,
    /// A shared library (DLL, dylib or so).
    SharedLibrary,
    /// Produces no objects itself; only exposes prebuilt libraries.
    LibraryLoader,
}

/// Language standard the module's sources compile with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LanguageStandard {
    /// ISO C11.
    #[serde(rename = "c11")]
    C11,
    /// ISO C++17.
    #[serde(rename = "c++17")]
    Cpp17,
    /// ISO C++20.
    #[serde(rename = "c++20")]
    Cpp20,
}

/// A list split by visibility to dependents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scoped<T> {
    /// Propagated to dependents.
    pub public: Vec<T>,
    /// Used by this module only.
    pub private: Vec<T>,
}

impl<T> Default for Scoped<T> {
    fn default() -> Self {
        Self {
            public: Vec::new(),
            private: Vec::new(),
        }
    }
}

impl<T: PartialEq> Scoped<T> {
    /// Add to the public list unless already present.
    pub fn add_public(&mut self, item: impl Into<T>) {
        let item = item.into();
        if !self.public.contains(&item) {
            self.public.push(item);
        }
    }

    /// Add to the private list unless already present.
    pub fn add_private(&mut self, item: impl Into<T>) {
        let item = item.into();
        if !self.private.contains(&item) {
            self.private.push(item);
        }
    }
}

/// Dependency on another module, rendered as `<output>:<path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReference {
    /// Requested output kind of the dependency, e.g. `static`.
    pub output: String,
    /// Directory of the referenced module.
    pub path: PathBuf,
    /// Version selector.
    pub version: String,
}

impl ModuleReference {
    /// Reference the latest version of the module at `path`.
    pub fn latest(output: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            path: path.into(),
            version: "latest".to_string(),
        }
    }
}

impl std::fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.output, self.path.display())
    }
}

/// A file that must be copied next to dependents' runtime outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalDependency {
    /// File to copy.
    pub source: PathBuf,
    /// Destination template, e.g. `${RuntimeDir}/mimalloc-redirect.dll`.
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// How much attention a [`Diagnostic`] deserves.
pub enum Severity {
    /// Informational note.
    Info,
    /// Something the user probably wants to change.
    Warning,
}

/// A message produced while resolving a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity of the message.
    pub severity: Severity,
    /// Human-readable text.
    pub message: String,
}

/// Everything the host needs to compile and link a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    /// Module name.
    pub name: String,
    /// Artifact kind.
    pub kind: ModuleKind,
    /// Output directory relative to the module, when not the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    /// Language standard for `sources`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageStandard>,
    /// Files to compile.
    pub sources: Vec<PathBuf>,
    /// Include directories.
    pub includes: Scoped<PathBuf>,
    /// Preprocessor definitions (`NAME` or `NAME=VALUE`).
    pub definitions: Scoped<String>,
    /// Extra compiler flags.
    pub compiler_options: Vec<String>,
    /// Libraries or linker flags.
    pub libraries: Scoped<String>,
    /// Other modules this one builds against.
    pub dependencies: Scoped<ModuleReference>,
    /// Files copied next to dependents' runtime outputs.
    pub additional_dependencies: Vec<AdditionalDependency>,
    /// Messages produced during resolution.
    pub diagnostics: Vec<Diagnostic>,
}

impl ModuleDescriptor {
    /// An empty descriptor.
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    /// Record an informational diagnostic.
    pub fn info(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Info,
            message: message.into(),
        });
    }

    /// Record a warning diagnostic.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    /// Messages of every warning diagnostic, in order.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.as_str())
    }

    /// Pretty JSON for the host build system.
    ///
    /// # Errors
    ///
    /// Only fails if serialization itself fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_dedupes() {
        let mut defs: Scoped<String> = Scoped::default();
        defs.add_private("MI_MALLOC_OVERRIDE=1");
        defs.add_private("MI_MALLOC_OVERRIDE=1");
        defs.add_public("MI_STATIC_LIB=1");
        assert_eq!(defs.private, vec!["MI_MALLOC_OVERRIDE=1"]);
        assert_eq!(defs.public, vec!["MI_STATIC_LIB=1"]);
    }

    #[test]
    fn test_json_shape() {
        let mut desc = ModuleDescriptor::new("icu", ModuleKind::StaticLibrary);
        desc.language = Some(LanguageStandard::Cpp17);
        desc.dependencies
            .add_public(ModuleReference::latest("static", "/m/icu-common"));
        desc.warning("careful");

        let json: serde_json::Value = serde_json::from_str(&desc.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "static_library");
        assert_eq!(json["language"], "c++17");
        assert_eq!(json["dependencies"]["public"][0]["output"], "static");
        assert_eq!(json["diagnostics"][0]["severity"], "warning");
        assert!(json.get("output_directory").is_none());
        assert_eq!(desc.warnings().collect::<Vec<_>>(), vec!["careful"]);
    }

    #[test]
    fn test_reference_display() {
        let r = ModuleReference::latest("common", "/m/icu-data");
        assert_eq!(r.to_string(), "common:/m/icu-data");
        assert_eq!(r.version, "latest");
    }
}
