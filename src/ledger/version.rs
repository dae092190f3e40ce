//! Firmware versions of the TON device app.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid device version '{0}'")]
pub struct VersionParseError(pub String);

/// Dotted `major.minor.patch` version; missing components count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl DeviceVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Higher than any released firmware; features mapped here are never supported.
    pub const UNRELEASED: DeviceVersion = DeviceVersion::new(u32::MAX, u32::MAX, u32::MAX);
}

impl FromStr for DeviceVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || VersionParseError(s.to_string());
        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in s.trim().split('.') {
            if count == parts.len() {
                return Err(err());
            }
            parts[count] = part.parse().map_err(|_| err())?;
            count += 1;
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl TryFrom<String> for DeviceVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceVersion> for String {
    fn from(version: DeviceVersion) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DeviceVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(v("2.1"), DeviceVersion::new(2, 1, 0));
        assert_eq!(v("2"), v("2.0.0"));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(v("2.10.0") > v("2.9.9"));
        assert!(v("2.6.1") > v("2.6"));
        assert!(v("2.0") < v("2.1"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("2.x".parse::<DeviceVersion>().is_err());
        assert!("".parse::<DeviceVersion>().is_err());
        assert!("1.2.3.4".parse::<DeviceVersion>().is_err());
    }
}
