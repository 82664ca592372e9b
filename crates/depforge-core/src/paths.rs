//! Well-known depforge locations.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the depforge state directory, or None if the user's home cannot be resolved.
pub fn try_depforge_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("DEPFORGE_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".depforge"))
}

/// Returns the depforge state directory (`~/.depforge`).
///
/// Falls back to `.depforge` under the current directory when neither
/// `DEPFORGE_HOME` is set nor a home directory can be resolved (e.g. in a
/// bare CI container).
pub fn depforge_home() -> PathBuf {
    try_depforge_home().unwrap_or_else(|| PathBuf::from(".depforge"))
}

/// Download cache: ~/.depforge/cache
pub fn cache_path() -> PathBuf {
    depforge_home().join("cache")
}

/// Timestamped log file name for a sub-build of `tool`
pub fn build_log_name(tool: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    format!("build-{tool}-{timestamp}.log")
}

/// Extract the filename from a URL.
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://example.com/release-77-1/icu4c-77_1-src.zip"),
            "icu4c-77_1-src.zip"
        );
        assert_eq!(filename_from_url(""), "");
    }

    #[test]
    fn test_build_log_name_names_tool() {
        let name = build_log_name("icupkg");
        assert!(name.starts_with("build-icupkg-"));
        assert!(name.ends_with(".log"));
    }
}
