// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The registry of supported schema versions.

use thiserror::Error;

/// A schema version registered with the configuration core.
///
/// The ordering of variants is the ordering of the translation chain: a
/// document can only be lifted toward larger versions, one edge at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigVersion {
    V2_4,
    V3_1,
    V3_2,
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("unrecognized config version {0:?}")]
pub struct UnknownVersionError(pub String);

impl ConfigVersion {
    /// The newest registered version; the pipeline's terminal stage.
    pub const LATEST: Self = ConfigVersion::V3_2;

    /// All registered versions, oldest first.
    pub const ALL: [Self; 3] =
        [ConfigVersion::V2_4, ConfigVersion::V3_1, ConfigVersion::V3_2];

    /// The exact version tag documents of this version carry in
    /// `ignition.version`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigVersion::V2_4 => "2.4.0",
            ConfigVersion::V3_1 => "3.1.0",
            ConfigVersion::V3_2 => "3.2.0",
        }
    }

    /// The next version in the translation chain, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            ConfigVersion::V2_4 => Some(ConfigVersion::V3_1),
            ConfigVersion::V3_1 => Some(ConfigVersion::V3_2),
            ConfigVersion::V3_2 => None,
        }
    }

    /// Classifies a parsed semver triple. Version tags are matched exactly;
    /// there is no "compatible version" fuzzing because a document's shape
    /// is defined by the precise version it declares.
    pub fn from_semver(version: &semver::Version) -> Option<Self> {
        Self::ALL.into_iter().find(|v| {
            let tag: semver::Version =
                v.as_str().parse().expect("registered versions are semver");
            tag == *version
        })
    }
}

impl std::fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfigVersion {
    type Err = UnknownVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed: semver::Version =
            s.parse().map_err(|_| UnknownVersionError(s.to_owned()))?;
        Self::from_semver(&parsed)
            .ok_or_else(|| UnknownVersionError(s.to_owned()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_tags_roundtrip() {
        for version in ConfigVersion::ALL {
            assert_eq!(version.as_str().parse(), Ok(version));
        }
    }

    #[test]
    fn unregistered_versions_are_rejected() {
        assert!("2.3.0".parse::<ConfigVersion>().is_err());
        assert!("3.0.0".parse::<ConfigVersion>().is_err());
        assert!("not-a-version".parse::<ConfigVersion>().is_err());
        assert!("".parse::<ConfigVersion>().is_err());
    }

    #[test]
    fn chain_is_linear() {
        assert_eq!(ConfigVersion::V2_4.next(), Some(ConfigVersion::V3_1));
        assert_eq!(ConfigVersion::V3_1.next(), Some(ConfigVersion::V3_2));
        assert_eq!(ConfigVersion::LATEST.next(), None);
        assert!(ConfigVersion::V2_4 < ConfigVersion::LATEST);
    }
}
