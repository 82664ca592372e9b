//! Target operating system and its binary naming conventions.

use crate::SchemaError;

/// Operating system family a module is built for.
///
/// Names follow the host build system's platform identifiers
/// (`windows`, `linux`, `apple`, `haiku`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Linux and other ELF-based Unix systems.
    #[default]
    Linux,
    /// macOS and the other Apple operating systems.
    Apple,
    /// Haiku.
    Haiku,
}

impl Platform {
    /// Get the platform depforge itself was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_vendor = "apple") {
            Self::Apple
        } else if cfg!(target_os = "haiku") {
            Self::Haiku
        } else {
            Self::Linux
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Apple => "apple",
            Self::Haiku => "haiku",
        }
    }

    /// Suffix for executables (`.exe` on Windows, empty elsewhere).
    pub fn executable_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            _ => "",
        }
    }

    /// Suffix for static libraries.
    pub fn static_library_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".lib",
            _ => ".a",
        }
    }

    /// Suffix for shared libraries.
    pub fn shared_library_extension(&self) -> &'static str {
        match self {
            Self::Windows => ".dll",
            Self::Apple => ".dylib",
            Self::Linux | Self::Haiku => ".so",
        }
    }

    /// Prefix the platform's linkers expect on library file names.
    pub fn library_prefix(&self) -> &'static str {
        match self {
            Self::Windows => "",
            _ => "lib",
        }
    }

    /// File name of an executable called `stem` on this platform.
    pub fn executable_name(&self, stem: &str) -> String {
        format!("{stem}{}", self.executable_extension())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win32" | "win64" => Ok(Self::Windows),
            "linux" | "unix" => Ok(Self::Linux),
            "apple" | "macos" | "darwin" | "osx" => Ok(Self::Apple),
            "haiku" => Ok(Self::Haiku),
            _ => Err(SchemaError::UnknownPlatform(s.to_string())),
        }
    }
}
