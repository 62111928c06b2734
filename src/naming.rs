//! Recognition of product names inside object keys
use crate::error::DownloadError;
use anyhow::Result;
use regex::Regex;

/// Sentinel-2 product names, e.g. `S2B_MSIL1C_20240430T153609_N0510_R110_T17QKA`
pub const SENTINEL2_PATTERN: &str = r"(S2[AB]_MSI.{3}_\d+T\d+_N\d+_R\d+_T[a-zA-Z0-9]+)";

pub const EODATA_PREFIX: &str = "/eodata/";

/// Maps an object key to the directory name its file is stored under.
pub trait ImageNaming {
    fn image_name<'a>(&self, key: &'a str) -> Result<&'a str, DownloadError>;
}

/// Naming strategy backed by a regular expression. The first capture group is
/// used when the pattern has one, the whole match otherwise.
#[derive(Debug, Clone)]
pub struct RegexNaming {
    re: Regex,
}

impl RegexNaming {
    pub fn new(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)?;
        Ok(Self { re })
    }

    pub fn sentinel2() -> Self {
        let re = Regex::new(SENTINEL2_PATTERN).expect("Regex pattern should always compile");
        Self { re }
    }

    pub fn pattern(&self) -> &str {
        self.re.as_str()
    }
}

impl Default for RegexNaming {
    fn default() -> Self {
        Self::sentinel2()
    }
}

impl ImageNaming for RegexNaming {
    fn image_name<'a>(&self, key: &'a str) -> Result<&'a str, DownloadError> {
        // An empty name would put files straight into the target directory
        self.re
            .captures(key)
            .and_then(|captures| captures.get(1).or_else(|| captures.get(0)))
            .map(|m| m.as_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DownloadError::NoImageName {
                key: key.to_string(),
                pattern: self.pattern().to_string(),
            })
    }
}

/// Removes `prefix` from the start of `path` if present.
pub fn remove_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}
