//! Four-part version numbers (major.minor.build.revision)

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::UpdateError;

/// A parsed version; missing trailing components are zero, so `1.2` equals `1.2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self { major, minor, build, revision }
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| UpdateError::InvalidVersion {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        // Release tags are usually "v1.2.3"
        let trimmed = value.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(invalid("empty version"));
        }

        let mut parts = [0u32; 4];
        for (i, component) in trimmed.split('.').enumerate() {
            if i >= parts.len() {
                return Err(invalid("more than four components"));
            }
            if component.is_empty() {
                return Err(invalid("empty component"));
            }
            parts[i] = component
                .parse::<u32>()
                .map_err(|_| invalid(&format!("'{}' is not a number", component)))?;
        }

        Ok(Version::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

/// Compare two version strings. `Greater` means `latest` is newer than `current`.
pub fn compare_versions(latest: &str, current: &str) -> Result<Ordering, UpdateError> {
    let latest: Version = latest.parse()?;
    let current: Version = current.parse()?;
    Ok(latest.cmp(&current))
}

/// Only a strictly newer release is offered; no downgrade or reinstall path.
pub fn is_newer_version(latest: &str, current: &str) -> Result<bool, UpdateError> {
    Ok(compare_versions(latest, current)? == Ordering::Greater)
}
