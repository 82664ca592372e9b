//! Requested output kinds and the ICU data package modes derived from them.

use crate::SchemaError;

/// The output a host build system asks a module to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Static library.
    Static,
    /// Shared library.
    Shared,
    /// Standalone common data archive.
    Common,
    /// Whatever the module considers its default (treated as static).
    Default,
    /// Alias for shared used by some host configurations.
    Dynamic,
}

impl OutputKind {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Shared => "shared",
            Self::Common => "common",
            Self::Default => "default",
            Self::Dynamic => "dynamic",
        }
    }

    /// Whether this kind links as a shared library.
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared | Self::Dynamic)
    }

    /// Whether this kind links as a static library.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static | Self::Default)
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OutputKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "shared" => Ok(Self::Shared),
            "common" => Ok(Self::Common),
            "default" => Ok(Self::Default),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(SchemaError::UnknownOutput(s.to_string())),
        }
    }
}

/// How ICU locale data is bundled by the packaging tool.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PackageMode {
    /// A single `.dat` archive loaded at runtime.
    #[default]
    Common,
    /// A static library with the data compiled in.
    Static,
    /// A shared library with the data compiled in.
    Shared,
}

impl PackageMode {
    /// Value passed to `pkgdata -m`.
    pub fn tool_flag(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Static => "static",
            Self::Shared => "library",
        }
    }

    /// Name used in configuration and module references.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Static => "static",
            Self::Shared => "shared",
        }
    }
}

impl std::fmt::Display for PackageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<OutputKind> for PackageMode {
    type Error = SchemaError;

    /// Only `static`, `shared` and `common` name a data package mode.
    fn try_from(output: OutputKind) -> Result<Self, Self::Error> {
        match output {
            OutputKind::Static => Ok(Self::Static),
            OutputKind::Shared => Ok(Self::Shared),
            OutputKind::Common => Ok(Self::Common),
            OutputKind::Default | OutputKind::Dynamic => Err(SchemaError::UnsupportedOutput {
                module: "icu-data",
                output,
                expected: "static, shared or common",
            }),
        }
    }
}

impl std::str::FromStr for PackageMode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.parse::<OutputKind>()?)
    }
}
