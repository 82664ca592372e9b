//! ICU 77.1: source staging and the descriptors for the `icu` umbrella and
//! `icudt` data modules.

pub mod data;
pub mod source;
pub mod umbrella;

pub use data::data_descriptor;
pub use source::{IcuSource, SourceError, StagedSource};
pub use umbrella::{UmbrellaRequest, umbrella_descriptor};

/// Release tag the constants below belong to.
pub const ICU_VERSION: &str = "77.1";

/// icu4c source archive.
pub const ICU_SOURCE_URL: &str =
    "https://github.com/unicode-org/icu/releases/download/release-77-1/icu4c-77_1-src.zip";
/// SHA-256 of [`ICU_SOURCE_URL`].
pub const ICU_SOURCE_SHA256: &str = "D5CF533CF70CD49044D89EDA3E74880328EB9426E6FD2B3CC8F9A963D2AD480E";

/// Prebuilt little-endian data archive.
pub const ICU_DATA_LITTLE_URL: &str =
    "https://github.com/unicode-org/icu/releases/download/release-77-1/icu4c-77_1-data-bin-l.zip";
/// SHA-256 of [`ICU_DATA_LITTLE_URL`].
pub const ICU_DATA_LITTLE_SHA256: &str =
    "0913674FF673C585F8BC08370916B6A6CCC30FFB6408A5C1BC3EDBF5A687FD96";

/// Prebuilt big-endian data archive.
pub const ICU_DATA_BIG_URL: &str =
    "https://github.com/unicode-org/icu/releases/download/release-77-1/icu4c-77_1-data-bin-b.zip";
/// SHA-256 of [`ICU_DATA_BIG_URL`].
pub const ICU_DATA_BIG_SHA256: &str =
    "D8BE12E03F782DA350508B15354738ED97A3289008A787B6BD2A85434374BFF4";
