// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural validation of typed documents.
//!
//! Validation is total: every check runs, every finding lands in the
//! returned [`Report`], and nothing short-circuits. Callers treat a report
//! with at least one error-severity entry as a failed document.
//!
//! The 3.1 validator is the 3.2 validator applied to the structural lift:
//! the lift is field-for-field, so every finding's path is valid against
//! the original document.

mod v2_4;
mod v3_2;

use kindling_config_types::VersionedConfig;

use crate::report::{ContextPath, Report, ValidationError};

/// Filesystem formats the execution stages know how to create.
pub(crate) const FILESYSTEM_FORMATS: [&str; 6] =
    ["ext4", "xfs", "btrfs", "swap", "none", "vfat"];

/// Supported RAID levels. The first two carry no redundancy and therefore
/// admit no spares.
pub(crate) const RAID_LEVELS: [&str; 7] =
    ["linear", "raid0", "raid1", "raid4", "raid5", "raid6", "raid10"];

pub(crate) const SPARELESS_RAID_LEVELS: [&str; 2] = ["linear", "raid0"];

/// Suffixes the service manager accepts for unit names.
pub(crate) const UNIT_SUFFIXES: [&str; 11] = [
    ".service",
    ".socket",
    ".device",
    ".mount",
    ".automount",
    ".swap",
    ".target",
    ".path",
    ".timer",
    ".slice",
    ".scope",
];

/// Walks `config` and reports everything a careful reader would flag.
pub fn validate(config: &VersionedConfig) -> Report {
    match config {
        VersionedConfig::V2_4(config) => v2_4::validate(config),
        VersionedConfig::V3_1(config) => {
            let tag = config.ignition.version.clone();
            let lifted: kindling_config_types::v3_2::Config =
                config.clone().into();
            v3_2::validate_lifted(
                &lifted,
                kindling_config_types::ConfigVersion::V3_1,
                &tag,
            )
        }
        VersionedConfig::V3_2(config) => v3_2::validate(config),
    }
}

/// Checks that a node path is absolute, lexically clean, and not `/`
/// itself.
pub(crate) fn check_node_path(
    path: &str,
    at: ContextPath,
    report: &mut Report,
) {
    if !path.starts_with('/') {
        report.add_error(at, ValidationError::PathNotAbsolute(path.to_owned()));
    } else if !crate::util::is_clean_abs_path(path) {
        report
            .add_error(at, ValidationError::PathNotCanonical(path.to_owned()));
    } else if path == "/" {
        report.add_error(at, ValidationError::PathIsRoot);
    }
}

pub(crate) fn check_mode(
    mode: Option<u32>,
    at: ContextPath,
    report: &mut Report,
) {
    if let Some(mode) = mode {
        if mode > 0o7777 {
            report.add_error(at, ValidationError::ModeOutOfRange(mode));
        }
    }
}

pub(crate) fn check_unit_name(
    name: &str,
    at: ContextPath,
    report: &mut Report,
) {
    if !UNIT_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)) {
        report.add_error(at, ValidationError::InvalidUnitName(name.to_owned()));
    }
}

pub(crate) fn check_dropin_name(
    name: &str,
    at: ContextPath,
    report: &mut Report,
) {
    if !name.ends_with(".conf") {
        report
            .add_error(at, ValidationError::InvalidDropinName(name.to_owned()));
    }
}

pub(crate) fn check_guid(guid: &str, at: ContextPath, report: &mut Report) {
    if uuid::Uuid::parse_str(guid).is_err() {
        report.add_error(at, ValidationError::InvalidGuid(guid.to_owned()));
    }
}

pub(crate) fn check_raid(
    level: &str,
    spares: u32,
    at: &ContextPath,
    report: &mut Report,
) {
    if !RAID_LEVELS.contains(&level) {
        report.add_error(
            at.field("level"),
            ValidationError::UnknownRaidLevel(level.to_owned()),
        );
    } else if spares > 0 && SPARELESS_RAID_LEVELS.contains(&level) {
        report.add_error(
            at.field("spares"),
            ValidationError::SparesUnsupportedForLevel(level.to_owned()),
        );
    }
}

pub(crate) fn check_filesystem_format(
    format: &str,
    at: ContextPath,
    report: &mut Report,
) {
    if !FILESYSTEM_FORMATS.contains(&format) {
        report.add_error(
            at,
            ValidationError::UnknownFilesystemFormat(format.to_owned()),
        );
    }
}

/// Which kind of node claims a path; used for duplicate detection across
/// the files/directories/links collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    File,
    Directory,
    Link,
}

#[derive(Default)]
pub(crate) struct NodeIndex {
    seen: std::collections::BTreeMap<String, NodeKind>,
}

impl NodeIndex {
    /// Records a node's path, reporting a duplicate-path error when two
    /// nodes of the same kind claim it and a path-conflict error when the
    /// kinds differ.
    pub(crate) fn claim(
        &mut self,
        path: &str,
        kind: NodeKind,
        at: ContextPath,
        report: &mut Report,
    ) {
        match self.seen.get(path) {
            Some(&existing) if existing == kind => {
                report.add_error(
                    at,
                    ValidationError::DuplicatePath(path.to_owned()),
                );
            }
            Some(_) => {
                report.add_error(
                    at,
                    ValidationError::PathConflict(path.to_owned()),
                );
            }
            None => {
                self.seen.insert(path.to_owned(), kind);
            }
        }
    }
}
