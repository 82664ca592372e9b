//! Target architecture and byte order.

use crate::SchemaError;

/// CPU architecture a module is built for.
///
/// The names match what the ICU packaging tool and the mimalloc redirect
/// libraries use (`x64`, `x86`, `arm64`, `arm`).
///
/// # Example
///
/// ```
/// use depforge_schema::Arch;
///
/// let arch: Arch = "aarch64".parse().unwrap();
/// assert_eq!(arch.as_str(), "arm64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86 (`x86_64`, `amd64`).
    #[default]
    X64,
    /// 32-bit x86.
    X86,
    /// 64-bit ARM (`aarch64`).
    Arm64,
    /// 32-bit ARM.
    Arm,
}

impl Arch {
    /// Get the architecture depforge itself was compiled for, or `None` when
    /// it is not one modules can target (e.g. `riscv64`).
    pub fn current() -> Option<Self> {
        Self::from_target_arch(std::env::consts::ARCH)
    }

    /// Map a Rust `target_arch` name. Only exact target names are accepted,
    /// unlike [`FromStr`](std::str::FromStr) which also takes user aliases.
    pub fn from_target_arch(name: &str) -> Option<Self> {
        match name {
            "x86_64" => Some(Self::X64),
            "x86" => Some(Self::X86),
            "aarch64" => Some(Self::Arm64),
            "arm" => Some(Self::Arm),
            _ => None,
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm64 => "arm64",
            Self::Arm => "arm",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Self::X64),
            "x86" | "i386" | "i686" => Ok(Self::X86),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "arm" | "armv7" => Ok(Self::Arm),
            _ => Err(SchemaError::UnknownArch(s.to_string())),
        }
    }
}

/// Byte order of the machine that consumes prebuilt data files.
///
/// ICU ships its data archive in two variants; exactly one is used per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl Endianness {
    /// Byte order of the host running depforge.
    pub fn host() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }

    /// Directory name used for the data variant (`little` / `big`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Little => "little",
            Self::Big => "big",
        }
    }

    /// Single-letter suffix ICU appends to data file names (`l` / `b`).
    pub fn suffix(&self) -> char {
        match self {
            Self::Little => 'l',
            Self::Big => 'b',
        }
    }
}

impl std::fmt::Display for Endianness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_aliases() {
        assert_eq!("x86_64".parse::<Arch>().unwrap(), Arch::X64);
        assert_eq!("AMD64".parse::<Arch>().unwrap(), Arch::X64);
        assert_eq!("aarch64".parse::<Arch>().unwrap(), Arch::Arm64);
        assert_eq!("i686".parse::<Arch>().unwrap(), Arch::X86);
        assert_eq!("arm".parse::<Arch>().unwrap(), Arch::Arm);
    }

    #[test]
    fn test_arch_unknown() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert_eq!(err, SchemaError::UnknownArch("sparc".to_string()));
    }

    #[test]
    fn test_target_arch_mapping() {
        assert_eq!(Arch::from_target_arch("x86_64"), Some(Arch::X64));
        assert_eq!(Arch::from_target_arch("aarch64"), Some(Arch::Arm64));
        assert_eq!(Arch::from_target_arch("riscv64"), None);
        assert_eq!(Arch::from_target_arch("powerpc64"), None);
        // Aliases are for user input only.
        assert_eq!(Arch::from_target_arch("amd64"), None);
    }

    #[test]
    fn test_current_arch_matches_build_target() {
        let expected = if cfg!(target_arch = "x86_64") {
            Some(Arch::X64)
        } else if cfg!(target_arch = "aarch64") {
            Some(Arch::Arm64)
        } else if cfg!(target_arch = "x86") {
            Some(Arch::X86)
        } else if cfg!(target_arch = "arm") {
            Some(Arch::Arm)
        } else {
            None
        };
        assert_eq!(Arch::current(), expected);
    }

    #[test]
    fn test_host_endianness_matches_target() {
        let host = Endianness::host();
        assert_eq!(host == Endianness::Little, cfg!(target_endian = "little"));
        assert_eq!(host == Endianness::Big, cfg!(target_endian = "big"));
    }

    #[test]
    fn test_endianness_names_are_paired() {
        assert_eq!(Endianness::Little.as_str(), "little");
        assert_eq!(Endianness::Little.suffix(), 'l');
        assert_eq!(Endianness::Big.as_str(), "big");
        assert_eq!(Endianness::Big.suffix(), 'b');
    }
}
