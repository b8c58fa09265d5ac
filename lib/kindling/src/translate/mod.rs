// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The translator graph: single-hop edges between adjacent schema versions.
//!
//! [`translate`] walks a document forward along the registered chain until
//! it reaches the requested version. Each edge either produces a document
//! that is fully valid at its target version or fails without yielding a
//! partial document. Downgrades are never supported.

pub mod v24tov31;
pub mod v31tov32;

use std::collections::BTreeMap;

use thiserror::Error;

use kindling_config_types::{ConfigVersion, VersionedConfig};

use crate::error::ConfigError;

/// The mountpoint each 2.4 filesystem name stands for.
///
/// The 2.4 schema lets nodes say "file `/varfile` on filesystem `var`"
/// without the document ever recording where `var` is mounted; 3.x needs
/// the absolute path. This map carries that invented state. Callers may
/// pre-populate entries (which always win); [`v24tov31::check`] fills in
/// the rest from the document itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FsMap {
    entries: BTreeMap<String, String>,
}

impl FsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) {
        self.entries.insert(name.into(), path.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolves a node's filesystem reference; an empty reference means the
    /// root filesystem.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if name.is_empty() {
            self.get("root").or(Some("/"))
        } else {
            self.get(name)
        }
    }

    /// The root filesystem is always `/`, whatever a caller may have put in
    /// the map.
    pub(crate) fn canonicalize_root(&mut self) {
        self.entries.insert("root".to_owned(), "/".to_owned());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for FsMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Errors from individual translation edges. Every variant is a failed
/// precondition: no edge ever emits a partially translated document.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TranslateError {
    #[error("document declares version {found:?}, not {expected}")]
    SourceVersion { found: String, expected: ConfigVersion },

    #[error(
        "filesystem on {device:?} asks for create.force=false \
         (\"format only if unformatted\"), which 3.x cannot express"
    )]
    UnforcedCreate { device: String },

    #[error("node references unknown filesystem {0:?}")]
    UnknownFilesystem(String),

    #[error(
        "filesystem {name:?} is mapped to {existing:?} but the document \
         declares {declared:?}"
    )]
    FsMapConflict { name: String, existing: String, declared: String },
}

/// Lifts `doc` to `target` by applying single-hop edges along the forward
/// chain. `fs_map` seeds the 2.x → 3.x boundary crossing and is ignored by
/// every other edge.
pub fn translate(
    doc: VersionedConfig,
    target: ConfigVersion,
    fs_map: Option<&FsMap>,
) -> Result<VersionedConfig, ConfigError> {
    let from = doc.version();
    if from > target {
        return Err(ConfigError::UnreachableVersion { from, to: target });
    }

    let mut doc = doc;
    while doc.version() < target {
        doc = match doc {
            VersionedConfig::V2_4(config) => {
                let mut fs_map = fs_map.cloned().unwrap_or_default();
                VersionedConfig::V3_1(v24tov31::translate(
                    config,
                    &mut fs_map,
                )?)
            }
            VersionedConfig::V3_1(config) => {
                VersionedConfig::V3_2(v31tov32::translate(config))
            }
            VersionedConfig::V3_2(_) => {
                // The loop condition keeps the latest version out of here.
                unreachable!("no translation edge departs the latest version")
            }
        };
    }
    Ok(doc)
}

#[cfg(test)]
mod test {
    use kindling_config_types::{v2_4, v3_2};

    use super::*;

    fn minimal_2_4() -> v2_4::Config {
        v2_4::Config {
            ignition: v2_4::ignition::Ignition {
                version: "2.4.0".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn multi_hop_reaches_latest() {
        let doc = VersionedConfig::V2_4(minimal_2_4());
        let translated =
            translate(doc, ConfigVersion::LATEST, None).unwrap();
        let VersionedConfig::V3_2(config) = translated else {
            panic!("expected a 3.2 document");
        };
        assert_eq!(config.ignition.version, "3.2.0");
    }

    #[test]
    fn multi_hop_equals_composed_single_hops() {
        let mut fs_map = FsMap::new();
        let lifted =
            v24tov31::translate(minimal_2_4(), &mut fs_map).unwrap();
        let composed = v31tov32::translate(lifted);

        let via_graph = translate(
            VersionedConfig::V2_4(minimal_2_4()),
            ConfigVersion::LATEST,
            None,
        )
        .unwrap();
        assert_eq!(via_graph, VersionedConfig::V3_2(composed));
    }

    #[test]
    fn downgrades_are_unreachable() {
        let doc = VersionedConfig::V3_2(v3_2::Config::default());
        assert!(matches!(
            translate(doc, ConfigVersion::V3_1, None),
            Err(ConfigError::UnreachableVersion {
                from: ConfigVersion::V3_2,
                to: ConfigVersion::V3_1,
            })
        ));
    }

    #[test]
    fn translating_to_the_current_version_is_identity() {
        let doc = VersionedConfig::V2_4(minimal_2_4());
        let same = translate(doc.clone(), ConfigVersion::V2_4, None).unwrap();
        assert_eq!(doc, same);
    }
}
